//! Store wiring, event capture, and error types shared by command handlers.

use std::cell::RefCell;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use consentry_core::{
    ConsentConfig, ConsentError, CookieJar, EventKind, JarContext, PolicyEvent, PolicyStore,
    StoreOptions, StoreRegistry, load_config,
};

use crate::cli::{OutputFormat, StoreArgs};
use crate::file_jar::FileJar;
use crate::output::render_event;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ConsentError> for CliError {
    fn from(error: ConsentError) -> Self {
        match error {
            ConsentError::InvalidOptions { field, reason } => {
                Self::validation(format!("invalid {field}: {reason}"))
            }
            ConsentError::ConfigIo { .. } | ConsentError::ConfigParse { .. } => {
                Self::validation(format!("{:#}", anyhow::Error::new(error)))
            }
            other => Self::failure(other),
        }
    }
}

/// Resolved store settings: configuration file values overridden by flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoreSettings {
    pub(crate) extra_policies: Vec<String>,
    pub(crate) options: StoreOptions,
}

impl StoreSettings {
    pub(crate) fn resolve(args: &StoreArgs) -> CliResult<Self> {
        let mut config = match &args.config {
            Some(path) => load_config(path)?,
            None => ConsentConfig::default(),
        };
        if let Some(key) = &args.policies_key {
            config.store.policies_key.clone_from(key);
        }
        if let Some(domain) = &args.domain {
            config.store.domain = Some(domain.clone());
        }
        if args.insecure {
            config.store.secure = false;
        }
        for extra in &args.extra_policy {
            if !config.extra_policies.contains(extra) {
                config.extra_policies.push(extra.clone());
            }
        }
        config.store.validate()?;
        Ok(Self {
            extra_policies: config.extra_policies,
            options: config.store,
        })
    }
}

/// Event lines captured while a command runs.
#[derive(Debug, Clone)]
pub(crate) struct EventLog {
    format: OutputFormat,
    lines: Rc<RefCell<Vec<String>>>,
}

impl EventLog {
    pub(crate) fn new(format: OutputFormat) -> Self {
        Self {
            format,
            lines: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Subscribe to every event kind on `store`.
    pub(crate) fn attach(&self, store: &PolicyStore) {
        for kind in EventKind::ALL {
            let lines = Rc::clone(&self.lines);
            let format = self.format;
            store.on(kind, move |event: &PolicyEvent| {
                lines.borrow_mut().push(render_event(event, format)?);
                Ok(())
            });
        }
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

/// Application context passed to command handlers.
#[derive(Debug)]
pub(crate) struct AppContext {
    pub(crate) registry: StoreRegistry,
    pub(crate) store: PolicyStore,
    pub(crate) settings: StoreSettings,
    pub(crate) output: OutputFormat,
    pub(crate) events: Option<EventLog>,
}

impl AppContext {
    /// Load the jar file and open the store described by `args`.
    pub(crate) fn open(
        args: &StoreArgs,
        output: OutputFormat,
        show_events: bool,
    ) -> CliResult<Self> {
        let settings = StoreSettings::resolve(args)?;
        let context = JarContext {
            host: args.host.clone(),
            path: args.document_path.clone(),
            secure: !args.insecure,
        };
        let jar: Rc<dyn CookieJar> =
            Rc::new(FileJar::open(&args.jar, context).map_err(CliError::failure)?);
        let registry = StoreRegistry::new(jar);
        let store = registry.open(&settings.extra_policies, settings.options.clone())?;
        let events = show_events.then(|| EventLog::new(output));
        if let Some(log) = &events {
            log.attach(&store);
        }
        tracing::debug!(
            jar = %args.jar.display(),
            policies_key = %store.policies_key(),
            "opened consent store"
        );
        Ok(Self {
            registry,
            store,
            settings,
            output,
            events,
        })
    }

    /// Destroy the current store and open a fresh one over the same jar.
    pub(crate) fn reopen(&mut self) -> CliResult<()> {
        self.registry.destroy(&self.store)?;
        self.store = self
            .registry
            .open(&self.settings.extra_policies, self.settings.options.clone())?;
        if let Some(log) = &self.events {
            log.attach(&self.store);
        }
        Ok(())
    }

    pub(crate) fn event_lines(&self) -> Vec<String> {
        self.events.as_ref().map(EventLog::lines).unwrap_or_default()
    }
}

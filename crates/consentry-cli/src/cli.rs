//! Argument parsing and command dispatch for the consent CLI.

use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use consentry_core::SameSite;
use consentry_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};

use crate::commands::cookies::{
    handle_cookie_delete, handle_cookie_delete_all, handle_cookie_get, handle_cookie_list,
    handle_cookie_set,
};
use crate::commands::policies::{
    handle_accept, handle_accept_all, handle_check, handle_reject, handle_reject_all,
    handle_reset, handle_status,
};
use crate::context::{AppContext, CliResult};

pub(crate) const DEFAULT_JAR_PATH: &str = "consentry-cookies.json";

/// Captured outcome of one CLI invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Process exit code: 0 on success, 2 for invalid input, 3 for failures.
    pub exit_code: i32,
    /// Text destined for stdout.
    pub stdout: String,
    /// Text destined for stderr: event lines, then any error message.
    pub stderr: String,
}

/// Parses CLI arguments, installs logging, executes the requested command,
/// and writes its output. Returns the process exit code.
#[must_use]
pub fn run() -> i32 {
    let cli = Cli::parse();
    let format = cli
        .log_format
        .as_deref()
        .map_or_else(LogFormat::infer, LogFormat::parse);
    let logging = LoggingConfig {
        level: &cli.log_level,
        format,
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err:#}");
    }

    let invocation = execute(cli);
    print!("{}", invocation.stdout);
    eprint!("{}", invocation.stderr);
    invocation.exit_code
}

/// Run the CLI against `args` (including the binary name) without touching
/// the process streams or the global logger.
#[must_use]
pub fn invoke<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => execute(cli),
        Err(err) => {
            let rendered = err.render().to_string();
            let (stdout, stderr) = if err.use_stderr() {
                (String::new(), rendered)
            } else {
                (rendered, String::new())
            };
            Invocation {
                exit_code: err.exit_code(),
                stdout,
                stderr,
            }
        }
    }
}

fn execute(cli: Cli) -> Invocation {
    let command_name = cli.command.label();
    let mut ctx = match AppContext::open(&cli.store, cli.output, cli.show_events) {
        Ok(ctx) => ctx,
        Err(err) => {
            return Invocation {
                exit_code: err.exit_code(),
                stdout: String::new(),
                stderr: format!("error: {}\n", err.display_message()),
            };
        }
    };

    let result = dispatch(&mut ctx, cli.command);
    let mut stderr = String::new();
    for line in ctx.event_lines() {
        let _ = writeln!(stderr, "{line}");
    }

    match result {
        Ok(stdout) => {
            tracing::debug!(command = command_name, "command completed");
            Invocation {
                exit_code: 0,
                stdout,
                stderr,
            }
        }
        Err(err) => {
            let message = err.display_message();
            tracing::debug!(command = command_name, error = %message, "command failed");
            let _ = writeln!(stderr, "error: {message}");
            Invocation {
                exit_code: err.exit_code(),
                stdout: String::new(),
                stderr,
            }
        }
    }
}

fn dispatch(ctx: &mut AppContext, command: Command) -> CliResult<String> {
    match command {
        Command::Status => handle_status(ctx),
        Command::Check(args) => handle_check(ctx, &args),
        Command::Accept(args) => handle_accept(ctx, &args),
        Command::Reject(args) => handle_reject(ctx, &args),
        Command::AcceptAll => handle_accept_all(ctx),
        Command::RejectAll => handle_reject_all(ctx),
        Command::Reset => handle_reset(ctx),
        Command::Cookies(cookies) => match cookies {
            CookieCommand::List => handle_cookie_list(ctx),
            CookieCommand::Get(args) => handle_cookie_get(ctx, &args),
            CookieCommand::Set(args) => handle_cookie_set(ctx, args),
            CookieCommand::Delete(args) => handle_cookie_delete(ctx, &args),
            CookieCommand::DeleteAll(args) => handle_cookie_delete_all(ctx, &args),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "consentry",
    about = "Inspect and record cookie consent decisions"
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) store: StoreArgs,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "CONSENTRY_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL
    )]
    pub(crate) log_level: String,
    #[arg(
        long,
        global = true,
        env = "CONSENTRY_LOG_FORMAT",
        help = "Log format: json or pretty (defaults by build profile)"
    )]
    pub(crate) log_format: Option<String>,
    #[arg(
        long,
        global = true,
        help = "Print every store event to stderr as it fires"
    )]
    pub(crate) show_events: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Flags describing the jar file, the document, and the store options.
#[derive(Args, Debug, Clone)]
pub(crate) struct StoreArgs {
    #[arg(long, global = true, env = "CONSENTRY_JAR", default_value = DEFAULT_JAR_PATH)]
    pub(crate) jar: PathBuf,
    #[arg(long, global = true, env = "CONSENTRY_CONFIG")]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, global = true, help = "Cookie holding the policy record")]
    pub(crate) policies_key: Option<String>,
    #[arg(long, global = true, help = "Domain cookies are registered with")]
    pub(crate) domain: Option<String>,
    #[arg(
        long,
        global = true,
        help = "Treat the document as plain HTTP and write non-secure cookies"
    )]
    pub(crate) insecure: bool,
    #[arg(long = "extra-policy", global = true, value_name = "POLICY")]
    pub(crate) extra_policy: Vec<String>,
    #[arg(long, global = true, default_value = "localhost")]
    pub(crate) host: String,
    #[arg(long, global = true, default_value = "/")]
    pub(crate) document_path: String,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Show every decision in the stored policy record.
    Status,
    /// Report whether a single policy is accepted.
    Check(PolicyArgs),
    /// Accept a policy.
    Accept(PolicyArgs),
    /// Reject a policy.
    Reject(PolicyArgs),
    /// Accept every known policy.
    AcceptAll,
    /// Reject every known policy except `essential`.
    RejectAll,
    /// Expire every visible cookie and reseed the policy record.
    Reset,
    /// Inspect or edit raw cookies.
    #[command(subcommand)]
    Cookies(CookieCommand),
}

impl Command {
    const fn label(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Check(_) => "check",
            Self::Accept(_) => "accept",
            Self::Reject(_) => "reject",
            Self::AcceptAll => "accept-all",
            Self::RejectAll => "reject-all",
            Self::Reset => "reset",
            Self::Cookies(CookieCommand::List) => "cookies list",
            Self::Cookies(CookieCommand::Get(_)) => "cookies get",
            Self::Cookies(CookieCommand::Set(_)) => "cookies set",
            Self::Cookies(CookieCommand::Delete(_)) => "cookies delete",
            Self::Cookies(CookieCommand::DeleteAll(_)) => "cookies delete-all",
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum CookieCommand {
    /// List every cookie visible to the document.
    List,
    /// Print one cookie's value.
    Get(CookieGetArgs),
    /// Write a cookie.
    Set(CookieSetArgs),
    /// Expire a cookie.
    Delete(CookieDeleteArgs),
    /// Expire every visible cookie, including the policy record.
    DeleteAll(CookieScopeArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct PolicyArgs {
    pub(crate) policy: String,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CookieGetArgs {
    pub(crate) name: String,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CookieSetArgs {
    pub(crate) name: String,
    pub(crate) value: String,
    #[arg(long, allow_negative_numbers = true, help = "Lifetime in seconds")]
    pub(crate) max_age: Option<i64>,
    #[arg(long)]
    pub(crate) path: Option<String>,
    #[arg(long, value_enum)]
    pub(crate) same_site: Option<SameSiteArg>,
    #[arg(long = "cookie-domain", help = "Domain for this cookie only")]
    pub(crate) domain: Option<String>,
    #[arg(long)]
    pub(crate) secure: Option<bool>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CookieDeleteArgs {
    pub(crate) name: String,
    #[command(flatten)]
    pub(crate) scope: CookieScopeArgs,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct CookieScopeArgs {
    #[arg(long, default_value = "/")]
    pub(crate) path: String,
    #[arg(long = "cookie-domain", help = "Domain the cookies were registered with")]
    pub(crate) domain: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum SameSiteArg {
    Lax,
    Strict,
    None,
}

impl From<SameSiteArg> for SameSite {
    fn from(value: SameSiteArg) -> Self {
        match value {
            SameSiteArg::Lax => Self::Lax,
            SameSiteArg::Strict => Self::Strict,
            SameSiteArg::None => Self::None,
        }
    }
}

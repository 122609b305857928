//! In-memory jar that follows browser cookie scoping rules.
//!
//! # Design
//! - Entries are keyed by `(name, domain, path)`; a write or delete only
//!   touches the entry with the same key, so a delete issued with a different
//!   path or domain leaves the original cookie in place.
//! - Visibility mirrors `document.cookie`: domain match against the jar host
//!   and path prefix match against the document path.
//! - Expiry is evaluated lazily against an injectable clock.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::cookie::{Cookie, SameSite, encode_component};
use crate::error::JarResult;
use crate::jar::CookieJar;

/// Longest lifetime a cookie may be granted, in seconds (400 days).
pub const MAX_COOKIE_AGE_SECS: i64 = 400 * 24 * 60 * 60;

/// Time source used to stamp and expire entries.
pub type Clock = Rc<dyn Fn() -> DateTime<Utc>>;

/// Document the jar is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JarContext {
    /// Host name of the current document.
    pub host: String,
    /// Path of the current document.
    pub path: String,
    /// Whether the document was served over secure transport.
    pub secure: bool,
}

impl Default for JarContext {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            path: "/".to_string(),
            secure: true,
        }
    }
}

/// A cookie held by the jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    /// Cookie name (unencoded).
    pub name: String,
    /// Cookie value (unencoded).
    pub value: String,
    /// Registration domain; `None` for host-only cookies.
    pub domain: Option<String>,
    /// Registration path.
    pub path: String,
    /// `SameSite` attribute.
    pub same_site: SameSite,
    /// Secure-transport flag.
    pub secure: bool,
    /// Instant after which the cookie is no longer visible.
    pub expires_at: DateTime<Utc>,
}

impl StoredCookie {
    fn same_slot(&self, name: &str, domain: Option<&str>, path: &str) -> bool {
        self.name == name && self.domain.as_deref() == domain && self.path == path
    }
}

/// Browser-like cookie jar kept in memory.
pub struct MemoryJar {
    context: JarContext,
    entries: RefCell<Vec<StoredCookie>>,
    clock: Clock,
}

impl MemoryJar {
    /// Jar for `localhost` at `/` over secure transport.
    #[must_use]
    pub fn new() -> Self {
        Self::with_context(JarContext::default())
    }

    /// Jar attached to the given document.
    #[must_use]
    pub fn with_context(context: JarContext) -> Self {
        Self::with_clock(context, Rc::new(Utc::now))
    }

    /// Jar using a custom time source.
    #[must_use]
    pub fn with_clock(context: JarContext, clock: Clock) -> Self {
        Self {
            context,
            entries: RefCell::new(Vec::new()),
            clock,
        }
    }

    /// Document the jar is attached to.
    #[must_use]
    pub const fn context(&self) -> &JarContext {
        &self.context
    }

    /// Unexpired entries, including ones not visible from the document path.
    #[must_use]
    pub fn snapshot(&self) -> Vec<StoredCookie> {
        let now = (self.clock)();
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.expires_at > now)
            .cloned()
            .collect()
    }

    /// Replace every entry with `entries`.
    pub fn restore(&self, entries: Vec<StoredCookie>) {
        *self.entries.borrow_mut() = entries;
    }

    /// Number of unexpired entries, visible or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the jar holds no unexpired entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_visible(&self, entry: &StoredCookie) -> bool {
        entry
            .domain
            .as_deref()
            .is_none_or(|domain| domain_matches(&self.context.host, domain))
            && path_matches(&self.context.path, &entry.path)
            && (self.context.secure || !entry.secure)
    }
}

impl Default for MemoryJar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryJar {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MemoryJar")
            .field("context", &self.context)
            .field("entries", &self.entries.borrow().len())
            .finish_non_exhaustive()
    }
}

impl CookieJar for MemoryJar {
    fn cookie_header(&self) -> String {
        let now = (self.clock)();
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.expires_at > now && self.is_visible(entry))
            .map(|entry| {
                format!(
                    "{}={}",
                    encode_component(&entry.name),
                    encode_component(&entry.value)
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn write(&self, cookie: &Cookie) -> JarResult<()> {
        if cookie.secure && !self.context.secure {
            tracing::debug!(
                name = %cookie.name,
                "dropping secure cookie written from an insecure document"
            );
            return Ok(());
        }

        let domain = cookie
            .domain
            .as_deref()
            .map(|domain| domain.trim_start_matches('.').to_ascii_lowercase());
        if let Some(domain) = domain.as_deref()
            && !domain_matches(&self.context.host, domain)
        {
            tracing::debug!(
                name = %cookie.name,
                domain,
                host = %self.context.host,
                "dropping cookie for a foreign domain"
            );
            return Ok(());
        }

        let mut entries = self.entries.borrow_mut();
        let existing = entries
            .iter()
            .position(|entry| entry.same_slot(&cookie.name, domain.as_deref(), &cookie.path));

        if cookie.is_expiry() {
            if let Some(index) = existing {
                entries.remove(index);
            }
            return Ok(());
        }

        let now = (self.clock)();
        let lifetime = cookie.max_age.min(MAX_COOKIE_AGE_SECS);
        let expires_at = TimeDelta::try_seconds(lifetime)
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(now);
        let stored = StoredCookie {
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            domain,
            path: cookie.path.clone(),
            same_site: cookie.same_site,
            secure: cookie.secure,
            expires_at,
        };
        match existing {
            Some(index) => entries[index] = stored,
            None => entries.push(stored),
        }
        Ok(())
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    host == domain
        || host
            .strip_suffix(domain.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn path_matches(document_path: &str, cookie_path: &str) -> bool {
    if document_path == cookie_path {
        return true;
    }
    document_path.strip_prefix(cookie_path).is_some_and(|rest| {
        cookie_path.ends_with('/') || rest.starts_with('/')
    })
}

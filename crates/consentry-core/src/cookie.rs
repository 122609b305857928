//! Cookie write descriptors and `document.cookie` string handling.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::config::StoreOptions;

/// Default cookie lifetime: one year, in seconds.
pub const DEFAULT_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 365;
/// Default cookie path.
pub const DEFAULT_PATH: &str = "/";
/// `max-age` used to expire a cookie immediately.
pub const EXPIRED_MAX_AGE: i64 = -1;

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// Sent on top-level navigations and same-site requests.
    #[default]
    Lax,
    /// Sent on same-site requests only.
    Strict,
    /// Sent on every request; browsers require `secure` alongside it.
    None,
}

impl SameSite {
    /// Attribute spelling used in the cookie string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lax => "Lax",
            Self::Strict => "Strict",
            Self::None => "None",
        }
    }
}

impl Display for SameSite {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Per-write overrides. Unset fields fall back to the cookie defaults or the
/// owning store's options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    /// Lifetime in seconds; non-positive values expire the cookie.
    pub max_age: Option<i64>,
    /// Path the cookie is registered on.
    pub path: Option<String>,
    /// `SameSite` attribute.
    pub same_site: Option<SameSite>,
    /// Domain the cookie is registered with.
    pub domain: Option<String>,
    /// Restrict the cookie to secure transport.
    pub secure: Option<bool>,
}

impl CookieOptions {
    /// Options that expire a cookie registered on `path` and `domain`.
    #[must_use]
    pub fn expire(path: impl Into<String>, domain: Option<String>) -> Self {
        Self {
            max_age: Some(EXPIRED_MAX_AGE),
            path: Some(path.into()),
            domain,
            ..Self::default()
        }
    }

    /// Resolve the overrides against the defaults into a concrete cookie.
    #[must_use]
    pub fn resolve(
        self,
        name: impl Into<String>,
        value: impl Into<String>,
        store: &StoreOptions,
    ) -> Cookie {
        Cookie {
            name: name.into(),
            value: value.into(),
            max_age: self.max_age.unwrap_or(DEFAULT_MAX_AGE_SECS),
            path: self.path.unwrap_or_else(|| DEFAULT_PATH.to_string()),
            same_site: self.same_site.unwrap_or_default(),
            domain: self
                .domain
                .or_else(|| store.domain.clone())
                .filter(|domain| !domain.is_empty()),
            secure: self.secure.unwrap_or(store.secure),
        }
    }
}

/// A single cookie write, as handed to a [`crate::jar::CookieJar`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name (unencoded).
    pub name: String,
    /// Cookie value (unencoded).
    pub value: String,
    /// Lifetime in seconds.
    pub max_age: i64,
    /// Registration path.
    pub path: String,
    /// `SameSite` attribute.
    pub same_site: SameSite,
    /// Registration domain; host-only when absent.
    pub domain: Option<String>,
    /// Secure-transport flag.
    pub secure: bool,
}

impl Cookie {
    /// Whether this write removes the cookie instead of storing it.
    #[must_use]
    pub const fn is_expiry(&self) -> bool {
        self.max_age <= 0
    }
}

impl Display for Cookie {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}={};",
            encode_component(&self.name),
            encode_component(&self.value)
        )?;
        if let Some(domain) = &self.domain {
            write!(formatter, " domain={domain};")?;
        }
        write!(
            formatter,
            " samesite={}; path={}; max-age={}",
            self.same_site, self.path, self.max_age
        )?;
        if self.secure {
            formatter.write_str("; secure")?;
        }
        Ok(())
    }
}

/// Percent-encode a cookie name or value.
#[must_use]
pub fn encode_component(raw: &str) -> Cow<'_, str> {
    urlencoding::encode(raw)
}

/// Percent-decode a cookie name or value. Returns `None` when the decoded
/// bytes are not valid UTF-8.
#[must_use]
pub fn decode_component(raw: &str) -> Option<String> {
    urlencoding::decode(raw).ok().map(Cow::into_owned)
}

/// Split a `name=value; name2=value2` header into a map.
///
/// Names are decoded, values are returned raw. Pairs with an empty name are
/// skipped and later duplicates win.
#[must_use]
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for pair in header.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        if name.is_empty() {
            continue;
        }
        let name = decode_component(name).unwrap_or_else(|| name.to_string());
        cookies.insert(name, value.to_string());
    }
    cookies
}

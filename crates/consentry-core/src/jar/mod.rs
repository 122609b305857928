//! Cookie jar backends.
//!
//! A jar is the durable store behind [`crate::PolicyStore`]. It is shared with
//! the rest of the page, so any other code may rewrite or expire entries
//! between two store calls.

pub mod memory;

#[cfg(target_arch = "wasm32")]
pub mod document;

use crate::cookie::Cookie;
use crate::error::JarResult;

pub use memory::{Clock, JarContext, MemoryJar, StoredCookie};

#[cfg(target_arch = "wasm32")]
pub use document::DocumentJar;

/// Backing storage with `document.cookie` semantics.
pub trait CookieJar {
    /// Visible cookies rendered as `name=value` pairs joined by `"; "`.
    ///
    /// Backends that cannot reach their storage log the failure and return an
    /// empty string.
    fn cookie_header(&self) -> String;

    /// Apply one write. Writes with a non-positive `max_age` expire the entry
    /// registered under the same name, path, and domain.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::JarError`] when the backend rejects the write.
    fn write(&self, cookie: &Cookie) -> JarResult<()>;
}

//! Browser jar backed by `document.cookie`.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlDocument;

use crate::cookie::Cookie;
use crate::error::{JarError, JarResult};
use crate::jar::CookieJar;

/// Jar reading and writing the current page's `document.cookie`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentJar;

impl DocumentJar {
    /// Handle to the page's cookie jar.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn document() -> JarResult<HtmlDocument> {
        web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JarError::Unavailable {
                detail: "no document attached to the window".to_string(),
            })?
            .dyn_into::<HtmlDocument>()
            .map_err(|_| JarError::Unavailable {
                detail: "document is not an HTML document".to_string(),
            })
    }
}

impl CookieJar for DocumentJar {
    fn cookie_header(&self) -> String {
        match Self::document().and_then(|document| document.cookie().map_err(js_error)) {
            Ok(header) => header,
            Err(err) => {
                tracing::warn!(error = %err, "document.cookie is unreadable");
                String::new()
            }
        }
    }

    fn write(&self, cookie: &Cookie) -> JarResult<()> {
        Self::document()?
            .set_cookie(&cookie.to_string())
            .map_err(js_error)
    }
}

fn js_error(value: JsValue) -> JarError {
    JarError::Unavailable {
        detail: format!("{value:?}"),
    }
}

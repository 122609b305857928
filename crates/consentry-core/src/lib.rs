#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Cookie consent policy management.
//!
//! Layout: `policy.rs` (policy names, decisions, record codec), `cookie.rs`
//! (cookie writes and `document.cookie` parsing), `jar/` (storage backends),
//! `events.rs` (observer hub), `store.rs` (`PolicyStore`), `registry.rs`
//! (`StoreRegistry`), `config.rs` (options and file loading).

pub mod config;
pub mod cookie;
pub mod error;
pub mod events;
pub mod jar;
pub mod policy;
pub mod registry;
pub mod store;

pub use config::{ConsentConfig, DEFAULT_POLICIES_KEY, StoreOptions, load_config};
pub use cookie::{Cookie, CookieOptions, SameSite};
pub use error::{BoxError, ConsentError, ConsentResult, JarError, JarResult};
pub use events::{EventHub, EventKind, ObserverResult, PolicyEvent, Subscription};
pub use jar::{CookieJar, JarContext, MemoryJar, StoredCookie};
pub use policy::{PolicyDecision, PolicyName, PolicyRecord};
pub use registry::StoreRegistry;
pub use store::PolicyStore;

#[cfg(target_arch = "wasm32")]
pub use jar::DocumentJar;

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
#![allow(clippy::redundant_pub_crate)]

//! Command-line inspector for cookie consent decisions.
//!
//! Layout:
//! - `cli.rs`: argument parsing and command dispatch
//! - `commands/`: command handlers grouped by concern
//! - `context.rs`: shared store wiring and error types
//! - `file_jar.rs`: cookie jar persisted to a JSON file
//! - `output.rs`: renderers and formatting helpers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod commands;
pub(crate) mod context;
pub(crate) mod file_jar;
pub(crate) mod output;

pub use cli::{Invocation, invoke, run};

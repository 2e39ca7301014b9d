#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Enact is declarative GUI automation: scripted clicks, keys, waits and
//! control flow replayed against the live desktop.
//!
//! Scripts are JSON documents describing a tree of actions; recorded
//! coordinate files give positions stable names. The engine resolves
//! targets, drives the input/screen/window backends, and keeps the run
//! cancellable at every pause. Most implementation details live under the
//! internal modules:
//! - `config`: Script and coordinate models, loaders, schema helpers.
//! - `driver`: Input, screen and window backends behind small traits.
//! - `engine`: Target resolution, condition polling, the interpreter and
//!   the run controller.
//! - `error`: The engine's error type and result alias.
//! - `utils`: Utilities such as capture file naming.
//!
//! Use `enact::prelude::*` to bring commonly used items into scope quickly.

/// Public module: configuration (models, loaders, schema helpers).
pub mod config;
/// Public module: desktop backends (input, screen, windows).
pub mod driver;
/// Public module: execution engine (resolver, conditions, interpreter,
/// controller).
pub mod engine;
/// Public module: error type and result alias.
pub mod error;
/// Public module: utilities (capture naming, etc.).
pub mod utils;

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "0.1.0").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Initialize tracing (logging) with a reasonable default.
/// - An explicit level (e.g. from a CLI flag) wins.
/// - Otherwise honors the `RUST_LOG` environment variable.
/// - Falls back to `info` level.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing(explicit: Option<&str>) {
    use tracing::Level;
    use tracing_subscriber::fmt;

    // Parse a simple level (trace|debug|info|warn|error)
    let parse = |s: &str| match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    };

    let level = explicit
        .and_then(parse)
        .or_else(|| std::env::var("RUST_LOG").ok().and_then(|s| parse(&s)))
        .unwrap_or(Level::INFO);

    // Ignore the error if the global subscriber was already set.
    let _ = fmt().with_max_level(level).try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use enact::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};

    // Serialization
    pub use serde::{Deserialize, Serialize};

    // Tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    // Timing helpers
    pub use std::time::Duration;
    pub use tokio::time::sleep;

    // External crates (namespaced) if callers want direct access
    pub use crate as enact;
    pub use enigo;

    // Frequently used internal modules
    pub use crate::{config, driver, engine, error, utils};
}

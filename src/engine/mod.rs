//! Script execution engine.
//!
//! This module wires together:
//! - `context`: per-run mutable state (window binding, coordinate namespace,
//!   time budget, cancellation, history)
//! - `resolve`: turning script targets into absolute screen positions
//! - `conditions`: polling evaluation of screen and window predicates
//! - `interpreter`: recursive execution of action trees against the drivers
//! - `recovery`: the per-action error bracket with diagnostic screenshots
//! - `controller`: the top-level run loop and the Ctrl-C aware async entry
//!
//! Typical usage:
//! - Build a `RunContext` from the script settings and a cancellation token.
//! - Call `run_with_interrupt`, handing it a closure that builds the `Runner`
//!   (real drivers, or your own doubles), or drive `Runner::run` directly from
//!   synchronous code.

pub mod conditions;
pub mod context;
pub mod controller;
pub mod interpreter;
pub mod recovery;
pub mod resolve;

// Re-export the run surface
pub use conditions::WaitOutcome;
pub use context::{HistoryEntry, RunContext, StepOutcome};
pub use controller::{RunSummary, run_with_interrupt};
pub use interpreter::Runner;
pub use resolve::resolve;

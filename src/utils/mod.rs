//! Utilities for Enact.
//!
//! This module aggregates utility helpers used across the crate.
//!
//! Submodules:
//! - `naming`: timestamped file names for screenshots and diagnostics.

pub mod naming;

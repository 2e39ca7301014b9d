//! Script and coordinate document handling.
//!
//! This module wires together the data models and loading/validation helpers used
//! throughout the crate. Import from here for a convenient, stable API.
//!
//! Example:
//! use enact::config::{Script, load_script};
//!
//! let script = load_script("scripts/login.json")?;

pub mod loader;
pub mod models;

// Re-export core data models
pub use models::{
    ActionKind, ActionNode, Condition, CoordinateDoc, CoordinateEntry, MouseButton, Namespace,
    Rect, Rgb, Script, Settings, Space, Target, TemplateKind,
};

// Re-export loader utilities
pub use loader::{
    generate_schema, load_coordinates, load_coordinates_async, load_coordinates_from_str,
    load_script, load_script_async, load_script_from_reader, load_script_from_str,
    validate_action_kinds, write_schema_to_writer,
};

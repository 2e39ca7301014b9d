//! Error taxonomy for script loading and execution.
//!
//! Driver traits return `anyhow::Result` so platform backends can attach
//! whatever context they like; the engine folds those failures into the
//! variants below at the point where it knows which phase was running.

use thiserror::Error;

/// Failures surfaced by the loader and the execution engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A named coordinate was referenced but is absent from the namespace.
    #[error("coordinate '{0}' is not defined in the coordinate document")]
    UnknownCoordinate(String),

    /// A window-relative position was requested while no window is bound.
    #[error("window-relative position requested but no target window is bound")]
    NoTargetWindow,

    /// The script declares an action kind the engine does not implement.
    #[error("unsupported action kind '{kind}' at {path}")]
    UnsupportedActionKind { kind: String, path: String },

    /// A collaborator failed while probing a condition.
    #[error("condition evaluation failed: {0}")]
    ConditionEvaluation(String),

    /// A collaborator failed while delivering input.
    #[error("input injection failed: {0}")]
    Injection(String),

    /// A screen capture failed outside of condition polling.
    #[error("screen capture failed: {0}")]
    Capture(String),

    /// An `exit_if` condition held; the run must stop with this code.
    #[error("exit requested (code {code}): {message}")]
    ExitRequested { code: i32, message: String },

    /// Action nesting went past the recursion guard.
    #[error("action nesting exceeds {0} levels")]
    NestingTooDeep(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the engine.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// True for errors that should bypass failure diagnostics: an exit
    /// request is a scripted outcome, not a fault.
    pub fn is_exit_request(&self) -> bool {
        matches!(self, Self::ExitRequested { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_missing_coordinate() {
        let err = EngineError::UnknownCoordinate("submit_button".into());
        assert!(err.to_string().contains("submit_button"));
    }

    #[test]
    fn exit_request_is_not_a_fault() {
        let exit = EngineError::ExitRequested {
            code: 2,
            message: "done".into(),
        };
        assert!(exit.is_exit_request());
        assert!(!EngineError::NoTargetWindow.is_exit_request());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = EngineError::from(io);
        assert!(matches!(err, EngineError::Io(_)));
    }
}

use std::path::Path;
use tracing::{error, info, warn};

use super::context::{HistoryEntry, RunContext, StepOutcome};
use super::interpreter::Runner;
use crate::config::models::ActionNode;
use crate::error::EngineResult;
use crate::utils::naming;

impl Runner {
    /// Run one top-level node with the error bracket around it: an
    /// outcome appends to the run history, a failure captures one
    /// diagnostic screenshot and propagates. A scripted exit passes
    /// through untouched; it is a verdict, not a failure.
    pub fn attempt(&mut self, node: &ActionNode, ctx: &mut RunContext) -> EngineResult<StepOutcome> {
        match self.execute(node, ctx, 0) {
            Ok(outcome) => {
                ctx.history.push(HistoryEntry {
                    action: node.kind.name().to_owned(),
                    comment: node.comment.clone(),
                    timestamp: chrono::Local::now().to_rfc3339(),
                    outcome,
                });
                Ok(outcome)
            }
            Err(err) if err.is_exit_request() => Err(err),
            Err(err) => {
                error!(
                    target: "enact::recovery",
                    kind = node.kind.name(),
                    error = %err,
                    "action failed"
                );
                if ctx.screenshot_on_error {
                    self.capture_diagnostic(ctx);
                }
                Err(err)
            }
        }
    }

    /// Best-effort screenshot of the failing desktop. Capture problems
    /// are logged and swallowed so the original error stays primary.
    fn capture_diagnostic(&mut self, ctx: &RunContext) {
        let file = naming::timestamped("error");
        match self.screen.save_screenshot(Path::new(&file)) {
            Ok(()) => {
                let window = ctx
                    .window
                    .as_ref()
                    .map_or("<full display>", |w| w.title.as_str());
                info!(
                    target: "enact::recovery",
                    file = %file, window,
                    "diagnostic screenshot saved"
                );
            }
            Err(save_err) => {
                warn!(
                    target: "enact::recovery",
                    error = %save_err,
                    "diagnostic screenshot failed"
                );
            }
        }
    }
}

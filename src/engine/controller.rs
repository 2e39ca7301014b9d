use std::io;
use std::time::Instant;
use tracing::{error, info, warn};

use super::context::{RunContext, StepOutcome};
use super::interpreter::Runner;
use crate::config::models::Script;
use crate::error::{EngineError, EngineResult};

/// What a finished run looked like from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Nodes that ran, nested ones included.
    pub executed: usize,
    /// The run stopped early on cancellation.
    pub cancelled: bool,
    /// The run stopped early on the global time budget.
    pub budget_exhausted: bool,
}

impl Runner {
    /// Drive the script's top-level sequence to its end, a stop signal,
    /// or the first error. Cancellation and the time budget are checked
    /// between nodes, so the current action always finishes cleanly.
    pub fn run(&mut self, script: &Script, ctx: &mut RunContext) -> EngineResult<RunSummary> {
        ctx.started = Instant::now();
        info!(target: "enact::controller", actions = script.actions.len(), "run started");

        let mut cancelled = false;
        let mut budget_exhausted = false;

        for node in &script.actions {
            if ctx.cancelled() {
                cancelled = true;
                break;
            }
            if ctx.over_budget() {
                warn!(
                    target: "enact::controller",
                    elapsed = ?ctx.elapsed(),
                    "time budget exhausted; stopping"
                );
                budget_exhausted = true;
                break;
            }
            match self.attempt(node, ctx) {
                Ok(StepOutcome::Interrupted) => {
                    cancelled = true;
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    error!(
                        target: "enact::controller",
                        executed = ctx.executed,
                        "run aborted by error"
                    );
                    return Err(err);
                }
            }
        }

        if cancelled {
            info!(target: "enact::controller", executed = ctx.executed, "run cancelled");
        } else {
            info!(
                target: "enact::controller",
                executed = ctx.executed,
                elapsed = ?ctx.elapsed(),
                "run finished"
            );
        }

        Ok(RunSummary {
            executed: ctx.executed,
            cancelled,
            budget_exhausted,
        })
    }
}

/// Run a script on a blocking worker while Ctrl-C cancels the context's
/// token. The first interrupt lets the current action finish; the run
/// stops at the next check.
///
/// The runner is built inside the worker because input backends are not
/// required to be `Send`.
pub async fn run_with_interrupt<F>(
    make_runner: F,
    script: Script,
    mut ctx: RunContext,
) -> EngineResult<RunSummary>
where
    F: FnOnce() -> Runner + Send + 'static,
{
    let token = ctx.cancel.clone();
    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(
                target: "enact::controller",
                "interrupt received; finishing the current action"
            );
            token.cancel();
        }
    });

    let outcome = tokio::task::spawn_blocking(move || {
        let mut runner = make_runner();
        runner.run(&script, &mut ctx)
    })
    .await;

    listener.abort();

    match outcome {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => std::panic::resume_unwind(join_err.into_panic()),
        Err(join_err) => Err(EngineError::Io(io::Error::other(join_err.to_string()))),
    }
}

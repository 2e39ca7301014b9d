use std::thread;
use std::time::{Duration, Instant};
use tracing::trace;

use super::context::{RunContext, duration_from_secs};
use super::interpreter::Runner;
use super::resolve;
use crate::config::models::Condition;
use crate::driver::WindowQuery;
use crate::error::{EngineError, EngineResult};

/// Cadence for condition polling and cancellable sleeps.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Window used when control flow needs a single near-immediate answer
/// from a condition instead of a scripted wait.
pub(crate) const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// How a polling wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The condition held before the window closed.
    Satisfied,
    /// The window closed with the condition still false.
    TimedOut,
    /// Cancellation surfaced mid-poll.
    Cancelled,
}

impl Runner {
    /// Poll `condition` every [`POLL_INTERVAL`] until it holds, the
    /// window closes, or the run is cancelled. A timeout is an outcome
    /// here, never an error; collaborator failures do propagate.
    pub fn wait_until(
        &mut self,
        condition: &Condition,
        timeout: Duration,
        ctx: &RunContext,
    ) -> EngineResult<WaitOutcome> {
        let started = Instant::now();
        loop {
            if ctx.cancelled() {
                return Ok(WaitOutcome::Cancelled);
            }
            if started.elapsed() >= timeout {
                return Ok(WaitOutcome::TimedOut);
            }
            if self.probe(condition, started, ctx)? {
                return Ok(WaitOutcome::Satisfied);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// One evaluation of the condition against live desktop state.
    /// `time_elapsed` counts from the start of the enclosing poll.
    fn probe(
        &mut self,
        condition: &Condition,
        polling_started: Instant,
        ctx: &RunContext,
    ) -> EngineResult<bool> {
        match condition {
            Condition::ColorMatch {
                target,
                color,
                tolerance,
            } => {
                let (x, y) = resolve::resolve(target, ctx)?;
                let actual = self
                    .screen
                    .pixel_at(x, y)
                    .map_err(|err| EngineError::ConditionEvaluation(format!("{err:#}")))?;
                trace!(
                    target: "enact::conditions",
                    x, y, ?actual, expected = ?color,
                    "color probe"
                );
                Ok(actual.matches(*color, *tolerance))
            }

            Condition::WindowExists { window_name } => {
                let found = self
                    .windows
                    .find(&WindowQuery::Title(window_name))
                    .map_err(|err| EngineError::ConditionEvaluation(format!("{err:#}")))?;
                Ok(found.is_some())
            }

            Condition::TimeElapsed { seconds } => {
                Ok(polling_started.elapsed() >= duration_from_secs(*seconds))
            }
        }
    }
}

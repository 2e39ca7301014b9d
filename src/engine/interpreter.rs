use image::RgbaImage;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use super::conditions::{PROBE_TIMEOUT, WaitOutcome};
use super::context::{RunContext, StepOutcome, duration_from_secs};
use super::resolve;
use crate::config::models::{ActionKind, ActionNode, Condition, MouseButton, Rect, Rgb, Target};
use crate::driver::{
    EnigoInput, InputDriver, ScreenDriver, WindowDriver, XcapScreen, XcapWindows,
};
use crate::error::{EngineError, EngineResult};
use crate::utils::naming;

/// Deepest allowed action nesting. Scripts are written by hand or by
/// `generate`; anything past this is a cycle or a generator bug.
pub(crate) const MAX_DEPTH: usize = 64;

/// Executes action trees against the drivers it owns.
///
/// All control flow is handled here by structural recursion over the
/// node; the drivers only ever see primitive operations.
pub struct Runner {
    pub(crate) input: Box<dyn InputDriver>,
    pub(crate) screen: Box<dyn ScreenDriver>,
    pub(crate) windows: Box<dyn WindowDriver>,
}

impl Runner {
    pub fn new(
        input: impl InputDriver + 'static,
        screen: impl ScreenDriver + 'static,
        windows: impl WindowDriver + 'static,
    ) -> Self {
        Self {
            input: Box::new(input),
            screen: Box::new(screen),
            windows: Box::new(windows),
        }
    }

    /// Runner wired to the real desktop.
    pub fn with_real_drivers(dry_run: bool) -> Self {
        Self::new(
            EnigoInput::new(dry_run),
            XcapScreen::new(),
            XcapWindows::new(),
        )
    }

    /// Execute one node, recursing into control-flow bodies.
    ///
    /// Cancellation is checked before any work happens; an interrupted
    /// outcome propagates out of every enclosing level without running
    /// anything further. The node's post-delay (or the run default)
    /// applies after the action itself completes.
    pub fn execute(
        &mut self,
        node: &ActionNode,
        ctx: &mut RunContext,
        depth: usize,
    ) -> EngineResult<StepOutcome> {
        if depth > MAX_DEPTH {
            return Err(EngineError::NestingTooDeep(MAX_DEPTH));
        }
        if ctx.cancelled() {
            trace!(
                target: "enact::interpreter",
                kind = node.kind.name(),
                "cancellation requested; skipping"
            );
            return Ok(StepOutcome::Interrupted);
        }

        if let Some(comment) = &node.comment {
            debug!(target: "enact::interpreter", kind = node.kind.name(), %comment, "note");
        }

        let outcome = self.dispatch(node, ctx, depth)?;
        ctx.executed += 1;

        if outcome != StepOutcome::Interrupted {
            let delay = node
                .wait
                .map(duration_from_secs)
                .unwrap_or(ctx.default_wait);
            if !delay.is_zero() {
                ctx.sleep_cancellable(delay);
            }
        }
        Ok(outcome)
    }

    fn dispatch(
        &mut self,
        node: &ActionNode,
        ctx: &mut RunContext,
        depth: usize,
    ) -> EngineResult<StepOutcome> {
        match &node.kind {
            ActionKind::Click { target } => {
                let (x, y) = resolve::resolve(target, ctx)?;
                info!(target: "enact::interpreter", x, y, "click");
                self.input.click(x, y, MouseButton::Left).map_err(injection)?;
                Ok(StepOutcome::Completed)
            }

            ActionKind::DoubleClick { target } => {
                let (x, y) = resolve::resolve(target, ctx)?;
                info!(target: "enact::interpreter", x, y, "double click");
                self.input.double_click(x, y).map_err(injection)?;
                Ok(StepOutcome::Completed)
            }

            ActionKind::RightClick { target } => {
                let (x, y) = resolve::resolve(target, ctx)?;
                info!(target: "enact::interpreter", x, y, "right click");
                self.input.right_click(x, y).map_err(injection)?;
                Ok(StepOutcome::Completed)
            }

            ActionKind::Drag {
                start,
                end,
                duration,
                button,
            } => self.run_drag(start, end, *duration, *button, ctx),

            ActionKind::Scroll { clicks, target } => {
                if !target.is_empty() {
                    let (x, y) = resolve::resolve(target, ctx)?;
                    self.input.move_to(x, y).map_err(injection)?;
                }
                info!(target: "enact::interpreter", clicks, "scroll");
                self.input.scroll(*clicks).map_err(injection)?;
                Ok(StepOutcome::Completed)
            }

            ActionKind::TypeText { text, interval } => {
                info!(target: "enact::interpreter", chars = text.chars().count(), "type text");
                self.input
                    .type_text(text, duration_from_secs(*interval))
                    .map_err(injection)?;
                Ok(StepOutcome::Completed)
            }

            ActionKind::Hotkey { keys } => {
                info!(target: "enact::interpreter", ?keys, "hotkey");
                self.input.hotkey(keys).map_err(injection)?;
                Ok(StepOutcome::Completed)
            }

            ActionKind::WaitFixed { seconds } => {
                info!(target: "enact::interpreter", seconds, "wait");
                if ctx.sleep_cancellable(duration_from_secs(*seconds)) {
                    Ok(StepOutcome::Completed)
                } else {
                    Ok(StepOutcome::Interrupted)
                }
            }

            ActionKind::WaitForCondition { condition, timeout } => {
                let outcome = self.wait_until(condition, duration_from_secs(*timeout), ctx)?;
                Ok(settle_wait(outcome, "condition", *timeout))
            }

            ActionKind::WaitForWindow {
                window_name,
                timeout,
            } => {
                info!(target: "enact::interpreter", window = %window_name, timeout, "waiting for window");
                let condition = Condition::WindowExists {
                    window_name: window_name.clone(),
                };
                let outcome = self.wait_until(&condition, duration_from_secs(*timeout), ctx)?;
                Ok(settle_wait(outcome, "window", *timeout))
            }

            ActionKind::Screenshot { filename } => {
                let file = filename
                    .clone()
                    .unwrap_or_else(|| naming::timestamped("screenshot"));
                self.screen
                    .save_screenshot(Path::new(&file))
                    .map_err(capture)?;
                info!(target: "enact::interpreter", file = %file, "screenshot saved");
                Ok(StepOutcome::Completed)
            }

            ActionKind::Log { message } => {
                info!(target: "enact::script", "{message}");
                Ok(StepOutcome::Completed)
            }

            ActionKind::Repeat {
                max_iterations,
                actions,
            } => self.run_repeat(*max_iterations, actions, ctx, depth),

            ActionKind::LoopUntil {
                condition,
                timeout,
                actions,
            } => self.run_loop_until(condition, *timeout, actions, ctx, depth),

            ActionKind::Conditional {
                condition,
                if_true,
                if_false,
            } => self.run_conditional(condition, if_true, if_false, ctx, depth),

            ActionKind::ExitIf {
                condition,
                exit_code,
                message,
            } => match self.wait_until(condition, PROBE_TIMEOUT, ctx)? {
                WaitOutcome::Satisfied => {
                    info!(target: "enact::interpreter", code = exit_code, "{message}");
                    Err(EngineError::ExitRequested {
                        code: *exit_code,
                        message: message.clone(),
                    })
                }
                WaitOutcome::Cancelled => Ok(StepOutcome::Interrupted),
                WaitOutcome::TimedOut => Ok(StepOutcome::Completed),
            },

            ActionKind::ClickOnColor {
                color,
                tolerance,
                search_region,
            } => self.run_click_on_color(*color, *tolerance, *search_region),
        }
    }

    /// Move to the start, then press-glide-release. When the combined
    /// driver drag fails, retry once with discrete press/move/release.
    fn run_drag(
        &mut self,
        start: &Target,
        end: &Target,
        duration: f64,
        button: MouseButton,
        ctx: &RunContext,
    ) -> EngineResult<StepOutcome> {
        let from = resolve::resolve(start, ctx)?;
        let to = resolve::resolve(end, ctx)?;
        let span = duration_from_secs(duration);
        info!(target: "enact::interpreter", ?from, ?to, secs = duration, "drag");

        self.input.move_to(from.0, from.1).map_err(injection)?;
        if let Err(err) = self.input.drag(from, to, span, button) {
            warn!(
                target: "enact::interpreter",
                error = %err,
                "combined drag failed; using discrete fallback"
            );
            // The failed attempt may have left the pointer mid-glide.
            self.input.move_to(from.0, from.1).map_err(injection)?;
            self.input.mouse_down(button).map_err(injection)?;
            self.input.move_to(to.0, to.1).map_err(injection)?;
            self.input.mouse_up(button).map_err(injection)?;
        }
        Ok(StepOutcome::Completed)
    }

    fn run_repeat(
        &mut self,
        max_iterations: u32,
        actions: &[ActionNode],
        ctx: &mut RunContext,
        depth: usize,
    ) -> EngineResult<StepOutcome> {
        info!(target: "enact::interpreter", max_iterations, "loop started");
        for iteration in 1..=max_iterations {
            if ctx.cancelled() {
                return Ok(StepOutcome::Interrupted);
            }
            trace!(target: "enact::interpreter", iteration, max_iterations, "loop pass");
            for child in actions {
                if self.execute(child, ctx, depth + 1)? == StepOutcome::Interrupted {
                    return Ok(StepOutcome::Interrupted);
                }
            }
        }
        Ok(StepOutcome::Completed)
    }

    /// The condition is probed before every pass, so a true condition
    /// stops the loop without running the body again.
    fn run_loop_until(
        &mut self,
        condition: &Condition,
        timeout: f64,
        actions: &[ActionNode],
        ctx: &mut RunContext,
        depth: usize,
    ) -> EngineResult<StepOutcome> {
        let overall = duration_from_secs(timeout);
        let started = Instant::now();
        loop {
            match self.wait_until(condition, PROBE_TIMEOUT, ctx)? {
                WaitOutcome::Satisfied => return Ok(StepOutcome::Completed),
                WaitOutcome::Cancelled => return Ok(StepOutcome::Interrupted),
                WaitOutcome::TimedOut => {}
            }
            if ctx.cancelled() {
                return Ok(StepOutcome::Interrupted);
            }
            if started.elapsed() > overall {
                warn!(target: "enact::interpreter", timeout, "loop_until timed out; continuing");
                return Ok(StepOutcome::TimedOut);
            }
            for child in actions {
                if self.execute(child, ctx, depth + 1)? == StepOutcome::Interrupted {
                    return Ok(StepOutcome::Interrupted);
                }
            }
        }
    }

    fn run_conditional(
        &mut self,
        condition: &Condition,
        if_true: &[ActionNode],
        if_false: &[ActionNode],
        ctx: &mut RunContext,
        depth: usize,
    ) -> EngineResult<StepOutcome> {
        let holds = match self.wait_until(condition, PROBE_TIMEOUT, ctx)? {
            WaitOutcome::Satisfied => true,
            WaitOutcome::Cancelled => return Ok(StepOutcome::Interrupted),
            WaitOutcome::TimedOut => false,
        };
        debug!(target: "enact::interpreter", holds, "conditional");

        let branch = if holds { if_true } else { if_false };
        for child in branch {
            if self.execute(child, ctx, depth + 1)? == StepOutcome::Interrupted {
                return Ok(StepOutcome::Interrupted);
            }
        }
        Ok(StepOutcome::Completed)
    }

    /// A miss is a logged no-op: the screen simply does not show the
    /// color right now, which scripts handle with waits around this.
    fn run_click_on_color(
        &mut self,
        color: Rgb,
        tolerance: u8,
        search_region: Option<Rect>,
    ) -> EngineResult<StepOutcome> {
        let (image, offset_x, offset_y) = match search_region {
            Some(region) => (
                self.screen.capture_region(region).map_err(capture)?,
                region.x,
                region.y,
            ),
            None => (self.screen.capture_full().map_err(capture)?, 0, 0),
        };

        match first_color_match(&image, color, tolerance) {
            Some((x, y)) => {
                let (x, y) = (x as i32 + offset_x, y as i32 + offset_y);
                info!(target: "enact::interpreter", x, y, ?color, "clicking matched pixel");
                self.input.click(x, y, MouseButton::Left).map_err(injection)?;
            }
            None => {
                debug!(
                    target: "enact::interpreter",
                    ?color, tolerance,
                    "no pixel within tolerance; skipping click"
                );
            }
        }
        Ok(StepOutcome::Completed)
    }
}

/// Row-major scan for the first pixel within tolerance of `expected`.
pub(crate) fn first_color_match(
    image: &RgbaImage,
    expected: Rgb,
    tolerance: u8,
) -> Option<(u32, u32)> {
    for y in 0..image.height() {
        for x in 0..image.width() {
            let pixel = image.get_pixel(x, y);
            if Rgb(pixel[0], pixel[1], pixel[2]).matches(expected, tolerance) {
                return Some((x, y));
            }
        }
    }
    None
}

fn settle_wait(outcome: WaitOutcome, what: &str, timeout: f64) -> StepOutcome {
    match outcome {
        WaitOutcome::Satisfied => StepOutcome::Completed,
        WaitOutcome::TimedOut => {
            warn!(target: "enact::interpreter", what, timeout, "wait timed out; continuing");
            StepOutcome::TimedOut
        }
        WaitOutcome::Cancelled => StepOutcome::Interrupted,
    }
}

fn injection(err: anyhow::Error) -> EngineError {
    EngineError::Injection(format!("{err:#}"))
}

fn capture(err: anyhow::Error) -> EngineError {
    EngineError::Capture(format!("{err:#}"))
}

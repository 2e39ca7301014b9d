use super::context::RunContext;
use crate::config::models::{Space, Target};
use crate::driver::WindowInfo;
use crate::error::{EngineError, EngineResult};

/// Resolve a target to an absolute screen position.
///
/// Named coordinates take precedence over literal pairs; lookups happen
/// here at execution time, so swapping the coordinate document between
/// runs retargets the same script. Window-relative positions require a
/// bound window and fail loudly without one.
pub fn resolve(target: &Target, ctx: &RunContext) -> EngineResult<(i32, i32)> {
    if let Some(name) = &target.coordinate {
        let entry = ctx
            .coordinates
            .get(name)
            .ok_or_else(|| EngineError::UnknownCoordinate(name.clone()))?;
        if entry.window_relative {
            let (ox, oy) = window_origin(ctx)?;
            return Ok((entry.x + ox, entry.y + oy));
        }
        return Ok((entry.x, entry.y));
    }

    let x = target.x.unwrap_or(0);
    let y = target.y.unwrap_or(0);
    match target.relative_to {
        Some(Space::Window) => {
            let (ox, oy) = window_origin(ctx)?;
            Ok((x + ox, y + oy))
        }
        Some(Space::Screen) | None => Ok((x, y)),
    }
}

fn window_origin(ctx: &RunContext) -> EngineResult<(i32, i32)> {
    ctx.window
        .as_ref()
        .map(WindowInfo::origin)
        .ok_or(EngineError::NoTargetWindow)
}

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::{WindowDriver, WindowInfo, WindowQuery, match_window};

/// Enumerates top-level windows through xcap and activates them with
/// the platform's own tooling.
#[derive(Debug, Default)]
pub struct XcapWindows;

impl XcapWindows {
    pub fn new() -> Self {
        Self
    }
}

impl WindowDriver for XcapWindows {
    fn list(&mut self) -> Result<Vec<WindowInfo>> {
        let windows = xcap::Window::all().context("Failed to enumerate windows")?;
        let infos = windows
            .iter()
            .map(|window| WindowInfo {
                id: window.id().unwrap_or_default(),
                app_name: window.app_name().unwrap_or_default(),
                title: window.title().unwrap_or_default(),
                x: window.x().unwrap_or_default(),
                y: window.y().unwrap_or_default(),
                width: window.width().unwrap_or_default(),
                height: window.height().unwrap_or_default(),
            })
            .collect();
        Ok(infos)
    }

    fn find(&mut self, query: &WindowQuery<'_>) -> Result<Option<WindowInfo>> {
        let windows = self.list()?;
        Ok(match_window(&windows, query).cloned())
    }

    fn activate(&mut self, window: &WindowInfo) -> Result<bool> {
        debug!(
            target: "enact::driver",
            app = %window.app_name,
            title = %window.title,
            "activate requested"
        );
        activate_impl(window)
    }
}

#[cfg(target_os = "macos")]
fn activate_impl(window: &WindowInfo) -> Result<bool> {
    // AppleScript can raise by process name; window ids are not scriptable.
    let app = window.app_name.replace('"', "\\\"");
    let script =
        format!("tell application \"System Events\" to set frontmost of process \"{app}\" to true");
    let output = std::process::Command::new("osascript")
        .arg("-e")
        .arg(&script)
        .output()
        .context("Failed to run osascript")?;
    if !output.status.success() {
        warn!(
            target: "enact::driver",
            app = %window.app_name,
            "osascript activation failed"
        );
    }
    Ok(output.status.success())
}

#[cfg(target_os = "linux")]
fn activate_impl(window: &WindowInfo) -> Result<bool> {
    let title = if window.title.is_empty() {
        &window.app_name
    } else {
        &window.title
    };
    let output = std::process::Command::new("wmctrl")
        .args(["-a", title])
        .output()
        .context("Failed to run wmctrl")?;
    if !output.status.success() {
        warn!(target: "enact::driver", %title, "wmctrl activation failed");
    }
    Ok(output.status.success())
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn activate_impl(window: &WindowInfo) -> Result<bool> {
    warn!(
        target: "enact::driver",
        title = %window.title,
        "window activation is not supported on this platform"
    );
    Ok(false)
}

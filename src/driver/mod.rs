//! Platform collaborators behind narrow traits.
//!
//! The engine only ever talks to these three seams:
//! - [`InputDriver`]: pointer and keyboard injection (Enigo-backed).
//! - [`ScreenDriver`]: display capture and pixel sampling (xcap-backed).
//! - [`WindowDriver`]: window enumeration, lookup, and activation.
//!
//! Tests swap in the scripted implementations from [`mock`].

use anyhow::Result;
use image::RgbaImage;
use std::path::Path;
use std::time::Duration;

use crate::config::models::{MouseButton, Rect, Rgb};

pub mod input;
pub mod screen;
pub mod window;

#[cfg(test)]
pub mod mock;

pub use input::EnigoInput;
pub use screen::XcapScreen;
pub use window::XcapWindows;

/// Pointer and keyboard injection.
pub trait InputDriver {
    /// Move the pointer to an absolute screen position.
    fn move_to(&mut self, x: i32, y: i32) -> Result<()>;

    /// Move to the position and click once.
    fn click(&mut self, x: i32, y: i32, button: MouseButton) -> Result<()>;

    /// Move to the position and click twice in quick succession.
    fn double_click(&mut self, x: i32, y: i32) -> Result<()>;

    /// Move to the position and right-click once.
    fn right_click(&mut self, x: i32, y: i32) -> Result<()>;

    /// Press a button without releasing it.
    fn mouse_down(&mut self, button: MouseButton) -> Result<()>;

    /// Release a previously pressed button.
    fn mouse_up(&mut self, button: MouseButton) -> Result<()>;

    /// Press at `start`, glide to `end` over `duration`, release.
    fn drag(
        &mut self,
        start: (i32, i32),
        end: (i32, i32),
        duration: Duration,
        button: MouseButton,
    ) -> Result<()>;

    /// Scroll the wheel vertically at the current pointer position.
    /// Positive clicks scroll down, negative up.
    fn scroll(&mut self, clicks: i32) -> Result<()>;

    /// Type literal text. A non-zero interval paces the characters.
    fn type_text(&mut self, text: &str, interval: Duration) -> Result<()>;

    /// Press a key chord: all but the last key held as modifiers while
    /// the last is tapped; modifiers released in reverse order.
    fn hotkey(&mut self, keys: &[String]) -> Result<()>;
}

/// Display capture and pixel sampling.
pub trait ScreenDriver {
    /// Capture the whole primary display.
    fn capture_full(&mut self) -> Result<RgbaImage>;

    /// Capture a region of the primary display, clamped to its bounds.
    fn capture_region(&mut self, region: Rect) -> Result<RgbaImage>;

    /// Sample one pixel at an absolute screen position.
    fn pixel_at(&mut self, x: i32, y: i32) -> Result<Rgb>;

    /// Capture the whole display straight to a file.
    fn save_screenshot(&mut self, path: &Path) -> Result<()>;
}

/// Window enumeration and activation.
pub trait WindowDriver {
    /// Every top-level window currently known to the platform.
    fn list(&mut self) -> Result<Vec<WindowInfo>>;

    /// Look up one window. Title queries match exactly first, then by
    /// substring; both passes are case-insensitive.
    fn find(&mut self, query: &WindowQuery<'_>) -> Result<Option<WindowInfo>>;

    /// Bring the window to the foreground. Best effort: `Ok(false)`
    /// means the platform could not comply, not that the run must stop.
    fn activate(&mut self, window: &WindowInfo) -> Result<bool>;
}

/// Snapshot of one top-level window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: u32,
    pub app_name: String,
    pub title: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowInfo {
    /// Top-left corner, the origin window-relative positions add onto.
    pub fn origin(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

/// How to select a target window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowQuery<'a> {
    /// Match on title or application name.
    Title(&'a str),
    /// Match on the platform window id.
    Id(u32),
}

/// Shared lookup used by the real and mock window drivers: id queries
/// match exactly; title queries try an exact case-insensitive match on
/// title or application name before falling back to substring.
pub fn match_window<'a>(
    windows: &'a [WindowInfo],
    query: &WindowQuery<'_>,
) -> Option<&'a WindowInfo> {
    match query {
        WindowQuery::Id(id) => windows.iter().find(|w| w.id == *id),
        WindowQuery::Title(name) => {
            let needle = name.to_lowercase();
            windows
                .iter()
                .find(|w| {
                    w.title.to_lowercase() == needle || w.app_name.to_lowercase() == needle
                })
                .or_else(|| {
                    windows.iter().find(|w| {
                        w.title.to_lowercase().contains(&needle)
                            || w.app_name.to_lowercase().contains(&needle)
                    })
                })
        }
    }
}

//! Scripted driver doubles for engine tests.
//!
//! `RecordingInput` journals every injection call and can fail or cancel
//! on cue; `CanvasScreen` serves frames from in-memory images;
//! `StaticWindows` serves a fixed window list, optionally delayed.

use anyhow::{Result, bail};
use image::{Rgba, RgbaImage};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::screen::{crop_region, sample_pixel};
use super::{InputDriver, ScreenDriver, WindowDriver, WindowInfo, WindowQuery, match_window};
use crate::config::models::{MouseButton, Rect, Rgb};

/// One recorded injection call.
#[derive(Debug, Clone, PartialEq)]
pub enum InputCall {
    MoveTo(i32, i32),
    Click(i32, i32, MouseButton),
    DoubleClick(i32, i32),
    RightClick(i32, i32),
    MouseDown(MouseButton),
    MouseUp(MouseButton),
    Drag((i32, i32), (i32, i32), MouseButton),
    Scroll(i32),
    TypeText(String),
    Hotkey(Vec<String>),
}

/// Shared journal handle kept by the test while the driver is owned by
/// the engine.
pub type Journal = Arc<Mutex<Vec<InputCall>>>;

/// Input driver that records every call instead of injecting.
#[derive(Default)]
pub struct RecordingInput {
    calls: Journal,
    /// Fail `click` calls after recording them.
    pub fail_clicks: bool,
    /// Fail the combined `drag` so callers exercise their fallback.
    pub fail_drag: bool,
    /// Cancel this token once the journal reaches the given length.
    pub cancel_at: Option<(usize, CancellationToken)>,
}

impl RecordingInput {
    pub fn new() -> (Self, Journal) {
        let driver = Self::default();
        let journal = driver.calls.clone();
        (driver, journal)
    }

    fn record(&mut self, call: InputCall) {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        if let Some((limit, token)) = &self.cancel_at {
            if calls.len() >= *limit {
                token.cancel();
            }
        }
    }
}

impl InputDriver for RecordingInput {
    fn move_to(&mut self, x: i32, y: i32) -> Result<()> {
        self.record(InputCall::MoveTo(x, y));
        Ok(())
    }

    fn click(&mut self, x: i32, y: i32, button: MouseButton) -> Result<()> {
        self.record(InputCall::Click(x, y, button));
        if self.fail_clicks {
            bail!("click injection refused");
        }
        Ok(())
    }

    fn double_click(&mut self, x: i32, y: i32) -> Result<()> {
        self.record(InputCall::DoubleClick(x, y));
        Ok(())
    }

    fn right_click(&mut self, x: i32, y: i32) -> Result<()> {
        self.record(InputCall::RightClick(x, y));
        Ok(())
    }

    fn mouse_down(&mut self, button: MouseButton) -> Result<()> {
        self.record(InputCall::MouseDown(button));
        Ok(())
    }

    fn mouse_up(&mut self, button: MouseButton) -> Result<()> {
        self.record(InputCall::MouseUp(button));
        Ok(())
    }

    fn drag(
        &mut self,
        start: (i32, i32),
        end: (i32, i32),
        _duration: Duration,
        button: MouseButton,
    ) -> Result<()> {
        self.record(InputCall::Drag(start, end, button));
        if self.fail_drag {
            bail!("combined drag unsupported");
        }
        Ok(())
    }

    fn scroll(&mut self, clicks: i32) -> Result<()> {
        self.record(InputCall::Scroll(clicks));
        Ok(())
    }

    fn type_text(&mut self, text: &str, _interval: Duration) -> Result<()> {
        self.record(InputCall::TypeText(text.to_string()));
        Ok(())
    }

    fn hotkey(&mut self, keys: &[String]) -> Result<()> {
        self.record(InputCall::Hotkey(keys.to_vec()));
        Ok(())
    }
}

/// Screen driver serving frames from in-memory canvases. The last frame
/// repeats once the sequence runs out, so a single-frame canvas is a
/// static screen.
pub struct CanvasScreen {
    frames: Vec<RgbaImage>,
    captures: Arc<Mutex<usize>>,
    saved: Arc<Mutex<Vec<String>>>,
    /// Fail saves after recording the attempt.
    pub fail_saves: bool,
    /// Fail every capture, for condition-evaluation error paths.
    pub fail_captures: bool,
}

impl CanvasScreen {
    pub fn new(frames: Vec<RgbaImage>) -> Self {
        Self {
            frames,
            captures: Arc::default(),
            saved: Arc::default(),
            fail_saves: false,
            fail_captures: false,
        }
    }

    /// Single static frame of one color.
    pub fn solid(width: u32, height: u32, color: Rgb) -> Self {
        Self::new(vec![canvas(width, height, color)])
    }

    /// Shared handle to the capture counter.
    pub fn captures(&self) -> Arc<Mutex<usize>> {
        self.captures.clone()
    }

    /// Shared handle to the list of attempted screenshot paths.
    pub fn saved(&self) -> Arc<Mutex<Vec<String>>> {
        self.saved.clone()
    }

    fn frame(&self) -> Result<RgbaImage> {
        if self.fail_captures {
            bail!("capture refused");
        }
        let mut captures = self.captures.lock().unwrap();
        *captures += 1;
        let index = (*captures - 1).min(self.frames.len() - 1);
        Ok(self.frames[index].clone())
    }
}

impl ScreenDriver for CanvasScreen {
    fn capture_full(&mut self) -> Result<RgbaImage> {
        self.frame()
    }

    fn capture_region(&mut self, region: Rect) -> Result<RgbaImage> {
        let full = self.frame()?;
        match crop_region(&full, region) {
            Some(image) => Ok(image),
            None => bail!("region outside the canvas"),
        }
    }

    fn pixel_at(&mut self, x: i32, y: i32) -> Result<Rgb> {
        let full = self.frame()?;
        match sample_pixel(&full, x, y) {
            Some(color) => Ok(color),
            None => bail!("pixel outside the canvas"),
        }
    }

    fn save_screenshot(&mut self, path: &Path) -> Result<()> {
        self.saved
            .lock()
            .unwrap()
            .push(path.display().to_string());
        if self.fail_saves {
            bail!("save refused");
        }
        Ok(())
    }
}

/// Uniform canvas of one color, full alpha.
pub fn canvas(width: u32, height: u32, color: Rgb) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([color.0, color.1, color.2, 255]))
}

/// Paint a single pixel, full alpha.
pub fn paint(image: &mut RgbaImage, x: u32, y: u32, color: Rgb) {
    image.put_pixel(x, y, Rgba([color.0, color.1, color.2, 255]));
}

/// Window driver serving a fixed list, optionally only after a number
/// of polls have happened.
#[derive(Default)]
pub struct StaticWindows {
    pub windows: Vec<WindowInfo>,
    /// Number of `list` calls that see an empty desktop first.
    pub visible_after: usize,
    polls: usize,
}

impl StaticWindows {
    pub fn with(windows: Vec<WindowInfo>) -> Self {
        Self {
            windows,
            ..Self::default()
        }
    }
}

impl WindowDriver for StaticWindows {
    fn list(&mut self) -> Result<Vec<WindowInfo>> {
        self.polls += 1;
        if self.polls <= self.visible_after {
            Ok(Vec::new())
        } else {
            Ok(self.windows.clone())
        }
    }

    fn find(&mut self, query: &WindowQuery<'_>) -> Result<Option<WindowInfo>> {
        let windows = self.list()?;
        Ok(match_window(&windows, query).cloned())
    }

    fn activate(&mut self, _window: &WindowInfo) -> Result<bool> {
        Ok(true)
    }
}

/// A window whose top-left corner sits at (`x`, `y`).
pub fn window_at(x: i32, y: i32) -> WindowInfo {
    WindowInfo {
        id: 1,
        app_name: "TestApp".into(),
        title: "Test Window".into(),
        x,
        y,
        width: 800,
        height: 600,
    }
}

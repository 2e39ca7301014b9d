use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::Path;
use tracing::trace;
use xcap::Monitor;

use super::ScreenDriver;
use crate::config::models::{Rect, Rgb};

/// Captures the primary display through xcap.
///
/// xcap only captures whole monitors, so region and pixel reads grab a
/// full frame and slice it. Pollers built on this pay a frame per probe.
#[derive(Debug, Default)]
pub struct XcapScreen;

impl XcapScreen {
    pub fn new() -> Self {
        Self
    }

    fn frame(&self) -> Result<RgbaImage> {
        let monitors = Monitor::all().context("Failed to enumerate monitors")?;
        let monitor = monitors
            .into_iter()
            .next()
            .context("No monitor available")?;
        trace!(target: "enact::driver", "capturing display");
        monitor.capture_image().context("Failed to capture display")
    }
}

impl ScreenDriver for XcapScreen {
    fn capture_full(&mut self) -> Result<RgbaImage> {
        self.frame()
    }

    fn capture_region(&mut self, region: Rect) -> Result<RgbaImage> {
        let full = self.frame()?;
        crop_region(&full, region).with_context(|| {
            format!(
                "Region {}x{} at ({}, {}) lies outside the display",
                region.width, region.height, region.x, region.y
            )
        })
    }

    fn pixel_at(&mut self, x: i32, y: i32) -> Result<Rgb> {
        let full = self.frame()?;
        sample_pixel(&full, x, y)
            .with_context(|| format!("Pixel ({x}, {y}) lies outside the display"))
    }

    fn save_screenshot(&mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let full = self.frame()?;
        full.save(path)
            .with_context(|| format!("Failed to write screenshot to {}", path.display()))?;
        Ok(())
    }
}

/// Crop `region` out of `image`, clamped to the image bounds. `None`
/// when the region starts outside the image or clamps down to nothing.
pub(crate) fn crop_region(image: &RgbaImage, region: Rect) -> Option<RgbaImage> {
    if region.x < 0 || region.y < 0 {
        return None;
    }
    let x = region.x as u32;
    let y = region.y as u32;
    if x >= image.width() || y >= image.height() {
        return None;
    }
    let width = region.width.min(image.width() - x);
    let height = region.height.min(image.height() - y);
    if width == 0 || height == 0 {
        return None;
    }
    Some(image::imageops::crop_imm(image, x, y, width, height).to_image())
}

/// Read one pixel as an RGB triple, alpha dropped.
pub(crate) fn sample_pixel(image: &RgbaImage, x: i32, y: i32) -> Option<Rgb> {
    if x < 0 || y < 0 {
        return None;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= image.width() || y >= image.height() {
        return None;
    }
    let pixel = image.get_pixel(x, y);
    Some(Rgb(pixel[0], pixel[1], pixel[2]))
}

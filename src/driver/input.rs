use anyhow::{Context, Result, bail};
use enigo::Keyboard as _;
use enigo::Mouse as _;
use enigo::{Axis, Button as EButton, Coordinate, Direction, Enigo, Key, Settings};
use std::thread;
use std::time::Duration;

use tracing::{info, trace};

use super::InputDriver;
use crate::config::models::MouseButton;

/// Pause after pressing modifiers so the target application registers
/// them before the main key arrives.
const MODIFIER_REGISTER_DELAY: Duration = Duration::from_millis(100);
/// Pause after the main key before modifiers are released.
const CHORD_SETTLE_DELAY: Duration = Duration::from_millis(50);
/// Step cadence for the glide phase of a drag.
const DRAG_STEP: Duration = Duration::from_millis(16);

/// Injects real input through Enigo, with optional dry-run mode.
/// In dry-run mode every call is only logged; Enigo is never initialized,
/// so a dry run works on headless machines too.
pub struct EnigoInput {
    dry_run: bool,
    enigo: Option<Enigo>,
}

impl EnigoInput {
    /// Create a new driver.
    /// - dry_run: when true, only logs instead of simulating real input.
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            enigo: None,
        }
    }

    /// Returns whether the driver is currently in dry-run mode.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn ensure_enigo(&mut self) -> Result<&mut Enigo> {
        if self.enigo.is_none() {
            trace!(target: "enact::driver", "Initializing Enigo");
            self.enigo =
                Some(Enigo::new(&Settings::default()).context("Failed to initialize Enigo")?);
        }
        Ok(self.enigo.as_mut().expect("Enigo must be initialized"))
    }
}

impl InputDriver for EnigoInput {
    fn move_to(&mut self, x: i32, y: i32) -> Result<()> {
        if self.dry_run {
            info!(target: "enact::driver", x, y, "DRY-RUN move_to");
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        trace!(target: "enact::driver", x, y, "move_to");
        enigo.move_mouse(x, y, Coordinate::Abs)?;
        Ok(())
    }

    fn click(&mut self, x: i32, y: i32, button: MouseButton) -> Result<()> {
        if self.dry_run {
            info!(target: "enact::driver", x, y, ?button, "DRY-RUN click");
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        trace!(target: "enact::driver", x, y, ?button, "click");
        enigo.move_mouse(x, y, Coordinate::Abs)?;
        enigo.button(map_mouse_button(button), Direction::Click)?;
        Ok(())
    }

    fn double_click(&mut self, x: i32, y: i32) -> Result<()> {
        if self.dry_run {
            info!(target: "enact::driver", x, y, "DRY-RUN double_click");
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        trace!(target: "enact::driver", x, y, "double_click");
        enigo.move_mouse(x, y, Coordinate::Abs)?;
        enigo.button(EButton::Left, Direction::Click)?;
        enigo.button(EButton::Left, Direction::Click)?;
        Ok(())
    }

    fn right_click(&mut self, x: i32, y: i32) -> Result<()> {
        if self.dry_run {
            info!(target: "enact::driver", x, y, "DRY-RUN right_click");
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        trace!(target: "enact::driver", x, y, "right_click");
        enigo.move_mouse(x, y, Coordinate::Abs)?;
        enigo.button(EButton::Right, Direction::Click)?;
        Ok(())
    }

    fn mouse_down(&mut self, button: MouseButton) -> Result<()> {
        if self.dry_run {
            info!(target: "enact::driver", ?button, "DRY-RUN mouse_down");
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        trace!(target: "enact::driver", ?button, "mouse_down");
        enigo.button(map_mouse_button(button), Direction::Press)?;
        Ok(())
    }

    fn mouse_up(&mut self, button: MouseButton) -> Result<()> {
        if self.dry_run {
            info!(target: "enact::driver", ?button, "DRY-RUN mouse_up");
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        trace!(target: "enact::driver", ?button, "mouse_up");
        enigo.button(map_mouse_button(button), Direction::Release)?;
        Ok(())
    }

    fn drag(
        &mut self,
        start: (i32, i32),
        end: (i32, i32),
        duration: Duration,
        button: MouseButton,
    ) -> Result<()> {
        if self.dry_run {
            info!(
                target: "enact::driver",
                ?start, ?end, ?duration, ?button,
                "DRY-RUN drag"
            );
            return Ok(());
        }
        let steps = drag_waypoints(start, end, duration);
        let pause = duration
            .checked_div(steps.len().max(1) as u32)
            .unwrap_or(Duration::ZERO);

        let enigo = self.ensure_enigo()?;
        trace!(target: "enact::driver", ?start, ?end, ?duration, "drag");
        enigo.move_mouse(start.0, start.1, Coordinate::Abs)?;
        enigo.button(map_mouse_button(button), Direction::Press)?;
        for (x, y) in steps {
            thread::sleep(pause);
            enigo.move_mouse(x, y, Coordinate::Abs)?;
        }
        enigo.button(map_mouse_button(button), Direction::Release)?;
        Ok(())
    }

    fn scroll(&mut self, clicks: i32) -> Result<()> {
        if self.dry_run {
            info!(target: "enact::driver", clicks, "DRY-RUN scroll");
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        trace!(target: "enact::driver", clicks, "scroll");
        enigo.scroll(clicks, Axis::Vertical)?;
        Ok(())
    }

    fn type_text(&mut self, text: &str, interval: Duration) -> Result<()> {
        if self.dry_run {
            info!(target: "enact::driver", %text, ?interval, "DRY-RUN type_text");
            return Ok(());
        }
        let enigo = self.ensure_enigo()?;
        trace!(target: "enact::driver", %text, ?interval, "type_text");
        if interval.is_zero() {
            enigo.text(text)?;
        } else {
            let mut buffer = [0u8; 4];
            for ch in text.chars() {
                enigo.text(ch.encode_utf8(&mut buffer))?;
                thread::sleep(interval);
            }
        }
        Ok(())
    }

    fn hotkey(&mut self, keys: &[String]) -> Result<()> {
        if self.dry_run {
            info!(target: "enact::driver", ?keys, "DRY-RUN hotkey");
            return Ok(());
        }
        let mut parsed = Vec::with_capacity(keys.len());
        for name in keys {
            match string_to_key(name) {
                Some(key) => parsed.push(key),
                None => bail!("Unknown key name '{name}'"),
            }
        }

        let enigo = self.ensure_enigo()?;
        trace!(target: "enact::driver", ?keys, "hotkey");
        for (key, direction) in chord_steps(&parsed) {
            if matches!(direction, Direction::Click) {
                // Let the target application register the modifiers.
                thread::sleep(MODIFIER_REGISTER_DELAY);
            }
            enigo.key(key, direction)?;
            if matches!(direction, Direction::Click) {
                thread::sleep(CHORD_SETTLE_DELAY);
            }
        }
        Ok(())
    }
}

/// Press/release sequence for a key chord: modifiers pressed in order,
/// the final key tapped, modifiers released in reverse order.
pub(crate) fn chord_steps(keys: &[Key]) -> Vec<(Key, Direction)> {
    let Some((main, modifiers)) = keys.split_last() else {
        return Vec::new();
    };
    let mut steps = Vec::with_capacity(keys.len() * 2 - 1);
    for key in modifiers {
        steps.push((*key, Direction::Press));
    }
    steps.push((*main, Direction::Click));
    for key in modifiers.iter().rev() {
        steps.push((*key, Direction::Release));
    }
    steps
}

/// Intermediate pointer positions for the glide phase of a drag,
/// endpoint included.
pub(crate) fn drag_waypoints(
    start: (i32, i32),
    end: (i32, i32),
    duration: Duration,
) -> Vec<(i32, i32)> {
    let count = (duration.as_millis() / DRAG_STEP.as_millis()).clamp(1, 200) as i32;
    (1..=count)
        .map(|step| {
            let t = f64::from(step) / f64::from(count);
            (
                start.0 + ((f64::from(end.0 - start.0)) * t).round() as i32,
                start.1 + ((f64::from(end.1 - start.1)) * t).round() as i32,
            )
        })
        .collect()
}

/// Convert a string key name to an enigo Key variant.
pub fn string_to_key(key_str: &str) -> Option<Key> {
    match key_str.to_lowercase().as_str() {
        // Modifier keys
        "shift" | "lshift" => Some(Key::Shift),
        "control" | "ctrl" | "lcontrol" => Some(Key::Control),
        "alt" | "option" | "lalt" => Some(Key::Alt),
        "meta" | "command" | "cmd" | "win" | "super" => Some(Key::Meta),

        // Function keys
        "f1" => Some(Key::F1),
        "f2" => Some(Key::F2),
        "f3" => Some(Key::F3),
        "f4" => Some(Key::F4),
        "f5" => Some(Key::F5),
        "f6" => Some(Key::F6),
        "f7" => Some(Key::F7),
        "f8" => Some(Key::F8),
        "f9" => Some(Key::F9),
        "f10" => Some(Key::F10),
        "f11" => Some(Key::F11),
        "f12" => Some(Key::F12),

        // Navigation keys
        "up" | "uparrow" => Some(Key::UpArrow),
        "down" | "downarrow" => Some(Key::DownArrow),
        "left" | "leftarrow" => Some(Key::LeftArrow),
        "right" | "rightarrow" => Some(Key::RightArrow),
        "home" => Some(Key::Home),
        "end" => Some(Key::End),
        "pageup" | "pgup" => Some(Key::PageUp),
        "pagedown" | "pgdn" => Some(Key::PageDown),

        // Special keys
        "return" | "enter" => Some(Key::Return),
        "escape" | "esc" => Some(Key::Escape),
        "tab" => Some(Key::Tab),
        "backspace" | "back" => Some(Key::Backspace),
        "delete" | "del" => Some(Key::Delete),
        "space" | " " => Some(Key::Space),
        "capslock" | "caps" => Some(Key::CapsLock),

        // If single character, return as Unicode key
        _ if key_str.chars().count() == 1 => key_str.chars().next().map(Key::Unicode),

        // Unknown key
        _ => None,
    }
}

fn map_mouse_button(btn: MouseButton) -> EButton {
    match btn {
        MouseButton::Left => EButton::Left,
        MouseButton::Middle => EButton::Middle,
        MouseButton::Right => EButton::Right,
    }
}

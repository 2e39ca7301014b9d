//! File naming helpers for captures.

use chrono::Local;

/// `<prefix>_YYYYMMDD_HHMMSS.png` in local time, matching the names the
/// `screenshot` action and the failure diagnostics produce.
pub fn timestamped(prefix: &str) -> String {
    format!("{prefix}_{}.png", Local::now().format("%Y%m%d_%H%M%S"))
}

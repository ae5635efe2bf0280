pub mod extract;
pub mod info;
pub mod merge;
pub mod outline;
pub mod plan;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

/// Log what lenient parsing threw away, so the user can fix their input
fn report_dropped(skipped: usize, out_of_range: usize, unit: &str) {
    if skipped > 0 {
        warn!(skipped, "ignored {} malformed {}(s)", skipped, unit);
    }
    if out_of_range > 0 {
        warn!(out_of_range, "ignored {} {}(s) out of range", out_of_range, unit);
    }
}

fn ensure_directory(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

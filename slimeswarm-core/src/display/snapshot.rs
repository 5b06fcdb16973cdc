use chrono::{DateTime, Local};
use image::{ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};

use crate::core::error::SlimeResult;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Saved(PathBuf),
    /// A file with the same timestamp already exists; nothing was written.
    Skipped(PathBuf),
}

/// `<dir>/Screenshot_<YYYY-MM-DD_HH-MM-SS>.png`
pub fn snapshot_path(dir: &Path, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("Screenshot_{}.png", now.format("%Y-%m-%d_%H-%M-%S")))
}

/// Encode `image` as PNG into `dir`, creating the directory if needed.
/// Never overwrites: a name collision within the same second is skipped.
pub fn write_snapshot(image: &RgbaImage, dir: &Path, now: DateTime<Local>) -> SlimeResult<SnapshotOutcome> {
    std::fs::create_dir_all(dir)?;
    let path = snapshot_path(dir, now);
    if path.exists() {
        return Ok(SnapshotOutcome::Skipped(path));
    }
    image.save_with_format(&path, ImageFormat::Png)?;
    Ok(SnapshotOutcome::Saved(path))
}

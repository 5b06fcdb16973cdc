//! Presentation: turns simulation state into an RGBA image and writes
//! snapshots. Nothing here mutates the field or the agents.

pub mod composite;
pub mod snapshot;

use image::RgbaImage;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::core::error::{try_alloc, SlimeError, SlimeResult};

pub use composite::{composite_agents, composite_trails};
pub use snapshot::{snapshot_path, write_snapshot, SnapshotOutcome};

/// Allocate a cleared RGBA image, reporting failure instead of aborting.
pub(crate) fn try_image(width: usize, height: usize) -> SlimeResult<RgbaImage> {
    let too_big = || SlimeError::Allocation {
        what: "display image",
        bytes: usize::MAX,
    };
    let w = u32::try_from(width).map_err(|_| too_big())?;
    let h = u32::try_from(height).map_err(|_| too_big())?;
    let len = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(too_big)?;
    let pixels = try_alloc(len, "display image")?;
    RgbaImage::from_raw(w, h, pixels).ok_or_else(too_big)
}

/// Latest presented image, shared with the host renderer.
///
/// `Arc<RwLock>` so a renderer thread can hold a clone while the simulation
/// publishes new frames.
#[derive(Clone, Debug)]
pub struct DisplayFrame {
    inner: Arc<RwLock<RgbaImage>>,
}

impl DisplayFrame {
    pub fn new(width: u32, height: u32) -> Self {
        DisplayFrame {
            inner: Arc::new(RwLock::new(RgbaImage::new(width, height))),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        DisplayFrame {
            inner: Arc::new(RwLock::new(image)),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.read().dimensions()
    }

    /// Swap a freshly composited image in; `image` receives the previous frame.
    pub fn publish(&self, image: &mut RgbaImage) {
        let mut front = self.inner.write();
        std::mem::swap(&mut *front, image);
    }

    /// Run `f` against the current frame under a read lock.
    pub fn with_image<R>(&self, f: impl FnOnce(&RgbaImage) -> R) -> R {
        f(&self.inner.read())
    }

    /// Owned copy of the current frame.
    pub fn snapshot(&self) -> RgbaImage {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn publish_swaps_buffers() {
        let frame = DisplayFrame::new(2, 2);
        let mut next = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
        frame.publish(&mut next);

        assert_eq!(frame.snapshot().get_pixel(1, 1), &Rgba([9, 9, 9, 255]));
        assert_eq!(next.get_pixel(1, 1), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn try_image_allocates_cleared_pixels() {
        let img = try_image(3, 2).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn try_image_rejects_sides_beyond_u32() {
        let err = try_image(u32::MAX as usize + 1, 1).unwrap_err();
        assert!(matches!(err, SlimeError::Allocation { what: "display image", .. }));
    }

    #[test]
    fn clones_share_the_same_frame() {
        let frame = DisplayFrame::new(1, 1);
        let host = frame.clone();
        frame.publish(&mut RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 4])));
        assert_eq!(host.with_image(|img| *img.get_pixel(0, 0)), Rgba([1, 2, 3, 4]));
        assert_eq!(host.dimensions(), (1, 1));
    }
}

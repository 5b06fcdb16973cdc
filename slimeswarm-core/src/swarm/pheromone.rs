use rayon::prelude::*;

use crate::core::error::{try_alloc, SlimeError, SlimeResult};

/// Double-buffered multi-channel trail field.
///
/// One channel per species, stored channel-planar:
/// `index = channel * width * height + y * width + x`.
/// `buffers[front]` is the readable current field, the other buffer is the
/// next field being written by [`TrailField::diffuse_and_decay`].
pub struct TrailField {
    buffers: [Vec<f32>; 2],
    front: usize,
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl TrailField {
    pub fn new(width: usize, height: usize, channels: usize) -> SlimeResult<Self> {
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels))
            .ok_or(SlimeError::Allocation {
                what: "trail buffer",
                bytes: usize::MAX,
            })?;
        Ok(Self {
            buffers: [
                try_alloc(len, "trail buffer")?,
                try_alloc(len, "trail buffer")?,
            ],
            front: 0,
            width,
            height,
            channels,
        })
    }

    #[inline]
    pub fn plane_len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, channel: usize) -> usize {
        assert!(
            x < self.width && y < self.height && channel < self.channels,
            "trail access out of bounds: ({x}, {y}, ch {channel}) in {}x{}x{}",
            self.width,
            self.height,
            self.channels
        );
        channel * self.plane_len() + y * self.width + x
    }

    pub fn read(&self, x: usize, y: usize, channel: usize) -> f32 {
        self.buffers[self.front][self.index(x, y, channel)]
    }

    pub fn write(&mut self, x: usize, y: usize, channel: usize, value: f32) {
        let idx = self.index(x, y, channel);
        self.buffers[self.front][idx] = value;
    }

    /// Exchange the current and next roles. O(1).
    pub fn swap(&mut self) {
        self.front ^= 1;
    }

    pub fn current(&self) -> &[f32] {
        &self.buffers[self.front]
    }

    pub fn current_mut(&mut self) -> &mut [f32] {
        &mut self.buffers[self.front]
    }

    pub fn channel(&self, channel: usize) -> &[f32] {
        let n = self.plane_len();
        &self.current()[channel * n..(channel + 1) * n]
    }

    /// Shared current buffer plus exclusive next buffer.
    pub fn split_mut(&mut self) -> (&[f32], &mut [f32]) {
        let (a, b) = self.buffers.split_at_mut(1);
        if self.front == 0 {
            (&a[0], &mut b[0])
        } else {
            (&b[0], &mut a[0])
        }
    }

    /// Density seen by an agent of species `own` at a cell: its own channel
    /// plus `cross_weight` times every other channel.
    #[inline]
    pub fn weighted(&self, x: usize, y: usize, own: usize, cross_weight: f32) -> f32 {
        let n = self.plane_len();
        let cell = y * self.width + x;
        let data = self.current();
        let mut total = 0.0;
        for ch in 0..self.channels {
            let v = data[ch * n + cell];
            total += if ch == own { v } else { cross_weight * v };
        }
        total
    }

    /// Sum of the weighted density over a `(2r+1)²` window centred on
    /// `(cx, cy)`. Coordinates outside the grid clamp to the nearest edge cell.
    pub fn sample_window(&self, cx: i64, cy: i64, radius: i64, own: usize, cross_weight: f32) -> f32 {
        let max_x = self.width as i64 - 1;
        let max_y = self.height as i64 - 1;
        let mut sum = 0.0;
        for oy in -radius..=radius {
            let y = cy.saturating_add(oy).clamp(0, max_y) as usize;
            for ox in -radius..=radius {
                let x = cx.saturating_add(ox).clamp(0, max_x) as usize;
                sum += self.weighted(x, y, own, cross_weight);
            }
        }
        sum
    }

    pub fn total_mass(&self) -> f64 {
        self.current().par_iter().map(|&v| v as f64).sum()
    }

    pub fn channel_mass(&self, channel: usize) -> f64 {
        self.channel(channel).par_iter().map(|&v| v as f64).sum()
    }

    pub fn clear(&mut self) {
        for buf in self.buffers.iter_mut() {
            buf.par_iter_mut().for_each(|v| *v = 0.0);
        }
        self.front = 0;
    }

    /// Reallocate both buffers for new dimensions. Contents are cleared.
    pub fn resize(&mut self, width: usize, height: usize) -> SlimeResult<()> {
        if width == self.width && height == self.height {
            self.clear();
            return Ok(());
        }
        *self = Self::new(width, height, self.channels)?;
        Ok(())
    }

    /// Box-blur diffusion and exponential decay from current into next, then swap.
    ///
    /// Each cell is blended with the mean of its 3×3 neighborhood (edges clamp)
    /// by `diffuse_rate * dt`, then scaled by `1 - decay_rate * dt` and clamped
    /// to be non-negative. Rows of `next` are written in parallel; every read
    /// comes from the pre-swap current buffer.
    pub fn diffuse_and_decay(&mut self, diffuse_rate: f32, decay_rate: f32, dt: f32) {
        let w = self.width;
        let h = self.height;
        let plane = self.plane_len();
        let blend = (diffuse_rate * dt).clamp(0.0, 1.0);
        let keep = 1.0 - decay_rate * dt;

        let (current, next) = self.split_mut();

        next.par_chunks_mut(w).enumerate().for_each(|(row, out)| {
            let ch = row / h;
            let y = row % h;
            let src = &current[ch * plane..(ch + 1) * plane];
            let rows = [y.saturating_sub(1), y, (y + 1).min(h - 1)];

            for (x, cell) in out.iter_mut().enumerate() {
                let cols = [x.saturating_sub(1), x, (x + 1).min(w - 1)];
                let mut sum = 0.0;
                for &ry in &rows {
                    let line = &src[ry * w..(ry + 1) * w];
                    for &cx in &cols {
                        sum += line[cx];
                    }
                }
                let original = src[y * w + x];
                let diffused = original * (1.0 - blend) + (sum / 9.0) * blend;
                *cell = (diffused * keep).max(0.0);
            }
        });

        self.swap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_with(width: usize, height: usize, values: &[(usize, usize, f32)]) -> TrailField {
        let mut field = TrailField::new(width, height, 1).unwrap();
        for &(x, y, v) in values {
            field.write(x, y, 0, v);
        }
        field
    }

    #[test]
    fn read_write_round_trip_per_channel() {
        let mut field = TrailField::new(5, 3, 2).unwrap();
        field.write(4, 2, 1, 0.75);
        assert_eq!(field.read(4, 2, 1), 0.75);
        assert_eq!(field.read(4, 2, 0), 0.0);
        assert_eq!(field.channel_mass(1), 0.75);
        assert_eq!(field.channel_mass(0), 0.0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn out_of_range_write_panics() {
        let mut field = TrailField::new(4, 4, 1).unwrap();
        field.write(4, 0, 0, 1.0);
    }

    #[test]
    fn swap_exchanges_roles() {
        let mut field = field_with(2, 2, &[(0, 0, 1.0)]);
        field.swap();
        assert_eq!(field.read(0, 0, 0), 0.0);
        field.swap();
        assert_eq!(field.read(0, 0, 0), 1.0);
    }

    #[test]
    fn zero_rates_are_identity() {
        let mut field = field_with(6, 5, &[(0, 0, 0.3), (3, 2, 1.0), (5, 4, 0.125)]);
        let before = field.current().to_vec();
        for _ in 0..7 {
            field.diffuse_and_decay(0.0, 0.0, 1.0);
            assert_eq!(field.current(), &before[..]);
        }
    }

    #[test]
    fn full_blend_is_clamped_box_blur() {
        let mut field = field_with(3, 3, &[(1, 1, 9.0)]);
        field.diffuse_and_decay(1.0, 0.0, 1.0);
        for y in 0..3 {
            for x in 0..3 {
                assert!((field.read(x, y, 0) - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn edge_clamping_conserves_mass() {
        let mut field = field_with(4, 3, &[(0, 0, 1.0), (3, 2, 2.0), (1, 1, 0.5)]);
        let before = field.total_mass();
        for _ in 0..20 {
            field.diffuse_and_decay(1.0, 0.0, 1.0);
        }
        assert!((field.total_mass() - before).abs() < 1e-4);
    }

    #[test]
    fn decay_never_increases_mass() {
        let mut field = field_with(8, 8, &[(0, 0, 1.0), (7, 7, 1.0), (4, 3, 0.6)]);
        let mut previous = field.total_mass();
        for _ in 0..30 {
            field.diffuse_and_decay(2.0, 0.1, 0.1);
            let mass = field.total_mass();
            assert!(mass <= previous + 1e-6, "{mass} > {previous}");
            previous = mass;
        }
        assert!(field.current().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn decay_is_exponential_factor() {
        let mut field = field_with(4, 4, &[(2, 2, 1.0)]);
        field.diffuse_and_decay(0.0, 0.1, 1.0);
        assert!((field.read(2, 2, 0) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn overdamped_decay_clamps_to_zero() {
        let mut field = field_with(2, 2, &[(0, 1, 1.0)]);
        field.diffuse_and_decay(0.0, 5.0, 1.0);
        assert_eq!(field.read(0, 1, 0), 0.0);
    }

    #[test]
    fn channels_diffuse_independently() {
        let mut field = TrailField::new(3, 3, 2).unwrap();
        field.write(0, 0, 1, 1.0);
        field.diffuse_and_decay(1.0, 0.0, 1.0);
        assert_eq!(field.channel_mass(0), 0.0);
        assert!((field.channel_mass(1) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn weighted_sampling_applies_cross_species_weight() {
        let mut field = TrailField::new(3, 3, 3).unwrap();
        field.write(1, 1, 0, 1.0);
        field.write(1, 1, 1, 0.5);
        field.write(1, 1, 2, 0.25);
        assert_eq!(field.weighted(1, 1, 0, 0.0), 1.0);
        assert_eq!(field.weighted(1, 1, 0, -1.0), 0.25);
        assert_eq!(field.weighted(1, 1, 1, 2.0), 0.5 + 2.0 * 1.25);
    }

    #[test]
    fn sample_window_clamps_at_edges() {
        let field = field_with(2, 2, &[(0, 0, 1.0)]);
        // A 3×3 window centred on the corner hits (0,0) four times after clamping.
        assert_eq!(field.sample_window(0, 0, 1, 0, 0.0), 4.0);
        // Far outside still reads the nearest edge cell.
        assert_eq!(field.sample_window(-50, -50, 0, 0, 0.0), 1.0);
    }

    #[test]
    fn oversized_field_fails_with_allocation_error() {
        let side = 1usize << 40;
        match TrailField::new(side, side, 1) {
            Err(SlimeError::Allocation { what, .. }) => assert_eq!(what, "trail buffer"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("allocation should fail"),
        }
    }

    #[test]
    fn sample_window_survives_extreme_centres() {
        let field = field_with(3, 3, &[(2, 2, 1.0), (0, 0, 0.5)]);
        assert_eq!(field.sample_window(i64::MAX, i64::MAX, 1, 0, 0.0), 9.0);
        assert_eq!(field.sample_window(i64::MIN, i64::MIN, 1, 0, 0.0), 4.5);
    }

    #[test]
    fn resize_reallocates_both_buffers() {
        let mut field = field_with(4, 4, &[(1, 1, 1.0)]);
        field.resize(8, 2).unwrap();
        assert_eq!((field.width, field.height), (8, 2));
        assert_eq!(field.current().len(), 16);
        field.swap();
        assert_eq!(field.current().len(), 16);
        assert_eq!(field.total_mass(), 0.0);
    }
}

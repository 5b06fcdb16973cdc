use std::f32::consts::TAU;

/// A single agent, copied out of the [`crate::swarm::AgentPool`] for inspection.
///
/// The pool stores agents as struct-of-arrays; this is the row view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Agent {
    pub position: [f32; 2],
    /// Radians in `[0, 2π)`
    pub heading: f32,
    pub species_index: u8,
    /// One-hot over trail channels
    pub species_mask: u8,
}

impl Agent {
    pub fn cell(&self) -> (usize, usize) {
        (self.position[0] as usize, self.position[1] as usize)
    }
}

/// One-hot channel mask for a species.
#[inline]
pub fn species_mask(species_index: u8) -> u8 {
    1u8 << species_index
}

/// Wrap an angle into `[0, 2π)`.
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly TAU
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Largest coordinate strictly inside `[0, extent)`.
#[inline]
pub fn max_coord(extent: f32) -> f32 {
    extent * (1.0 - f32::EPSILON)
}

//! Sense-and-move kernel.
//!
//! Every agent samples the trail field ahead of itself, steers toward the
//! densest sample, advances, bounces off the grid edges and emits one
//! [`Deposit`]. Agents are processed in parallel chunks; each agent only
//! touches its own slots in the pool and the deposit list, and reads the
//! field through a shared borrow.

use rayon::prelude::*;
use std::f32::consts::TAU;

use super::grid::Deposit;
use super::pheromone::TrailField;
use super::pool::AgentPool;
use crate::core::agent::{max_coord, wrap_angle};
use crate::core::config::SpeciesSettings;

/// Agents per rayon work unit.
pub const CHUNK_SIZE: usize = 1024;

/// Inputs shared by every agent for one tick.
#[derive(Clone, Copy, Debug)]
pub struct MoveParams<'a> {
    pub species: &'a [SpeciesSettings],
    pub trail_weight: f32,
    pub cross_species_weight: f32,
    pub dt: f32,
    pub seed: u64,
    pub tick: u64,
}

/// Sensor readings reduced to the three steering inputs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorReading {
    pub forward: f32,
    pub left: f32,
    pub right: f32,
}

/// Run the kernel over the whole pool. `deposits` must hold one slot per agent.
pub fn sense_and_move(pool: &mut AgentPool, field: &TrailField, params: &MoveParams, deposits: &mut [Deposit]) {
    assert_eq!(deposits.len(), pool.n_agents, "one deposit slot per agent");

    pool.x
        .par_chunks_mut(CHUNK_SIZE)
        .zip(pool.y.par_chunks_mut(CHUNK_SIZE))
        .zip(pool.heading.par_chunks_mut(CHUNK_SIZE))
        .zip(pool.species.par_chunks(CHUNK_SIZE))
        .zip(deposits.par_chunks_mut(CHUNK_SIZE))
        .enumerate()
        .for_each(|(chunk, ((((xs, ys), headings), species), out))| {
            for i in 0..xs.len() {
                let agent_index = (chunk * CHUNK_SIZE + i) as u64;
                let s = species[i] as usize;
                let settings = &params.species[s];

                let reading = sense(field, xs[i], ys[i], headings[i], settings, s, params.cross_species_weight);
                let r = agent_random(params.seed, params.tick, agent_index);
                let heading = steer(headings[i], reading, r, settings.turn_speed * TAU * params.dt);

                let (x, y, heading) = advance(
                    xs[i],
                    ys[i],
                    heading,
                    settings.move_speed * params.dt,
                    field.width as f32,
                    field.height as f32,
                );

                let cx = x as usize;
                let cy = y as usize;
                debug_assert!(cx < field.width && cy < field.height, "agent escaped the grid");

                xs[i] = x;
                ys[i] = y;
                headings[i] = heading;
                out[i] = Deposit {
                    index: s * field.plane_len() + cy * field.width + cx,
                    amount: params.trail_weight * settings.deposit_amount,
                };
            }
        });
}

/// Angular offset of sensor `k` of `count`; the middle sensor is 0, positive
/// offsets turn left (counter-clockwise).
#[inline]
pub fn sensor_offset(k: u32, count: u32, spread: f32) -> f32 {
    let half = (count / 2) as f32;
    (k as f32 - half) / half * spread
}

/// Sample the field at every sensor of the species and reduce to
/// forward / best-left / best-right.
pub fn sense(
    field: &TrailField,
    x: f32,
    y: f32,
    heading: f32,
    settings: &SpeciesSettings,
    own_channel: usize,
    cross_weight: f32,
) -> SensorReading {
    let count = settings.sensor_count;
    let spread = settings.sensor_angle_radians();
    let radius = settings.sensor_size as i64;
    let middle = count / 2;

    let mut reading = SensorReading {
        forward: 0.0,
        left: f32::NEG_INFINITY,
        right: f32::NEG_INFINITY,
    };

    for k in 0..count {
        let angle = heading + sensor_offset(k, count, spread);
        let (sin, cos) = angle.sin_cos();
        // Anything past the edge clamps to the edge cell anyway.
        let sx = (x + cos * settings.sensor_offset_distance).clamp(-1.0, field.width as f32);
        let sy = (y + sin * settings.sensor_offset_distance).clamp(-1.0, field.height as f32);
        let value = field.sample_window(sx.floor() as i64, sy.floor() as i64, radius, own_channel, cross_weight);

        if k == middle {
            reading.forward = value;
        } else if k > middle {
            reading.left = reading.left.max(value);
        } else {
            reading.right = reading.right.max(value);
        }
    }

    reading
}

/// Steering rule. `r` in `[0, 1)` scales the turn; `max_turn` is the largest
/// allowed rotation this tick.
///
/// Forward strictly best keeps the heading, forward strictly worst turns a
/// random amount either way, otherwise the agent turns toward the better side.
/// Exact ties between left and right keep the heading.
#[inline]
pub fn steer(heading: f32, reading: SensorReading, r: f32, max_turn: f32) -> f32 {
    let SensorReading { forward, left, right } = reading;
    let heading = if forward > left && forward > right {
        heading
    } else if forward < left && forward < right {
        heading + (r - 0.5) * 2.0 * max_turn
    } else if right > left {
        heading - r * max_turn
    } else if left > right {
        heading + r * max_turn
    } else {
        heading
    };
    wrap_angle(heading)
}

/// Move `distance` along `heading`, reflecting off the grid edges.
///
/// On each violated axis the position is mirrored back into range and the
/// heading's component on that axis is flipped. The result is always inside
/// `[0, width) × [0, height)`.
#[inline]
pub fn advance(x: f32, y: f32, heading: f32, distance: f32, width: f32, height: f32) -> (f32, f32, f32) {
    let (mut dy, mut dx) = heading.sin_cos();
    let mut nx = x + dx * distance;
    let mut ny = y + dy * distance;
    let mut bounced = false;

    if nx < 0.0 {
        nx = -nx;
        dx = -dx;
        bounced = true;
    } else if nx >= width {
        nx = 2.0 * width - nx;
        dx = -dx;
        bounced = true;
    }
    if ny < 0.0 {
        ny = -ny;
        dy = -dy;
        bounced = true;
    } else if ny >= height {
        ny = 2.0 * height - ny;
        dy = -dy;
        bounced = true;
    }

    // Steps longer than the grid can overshoot the mirror.
    let nx = nx.clamp(0.0, max_coord(width));
    let ny = ny.clamp(0.0, max_coord(height));
    let heading = if bounced { wrap_angle(dy.atan2(dx)) } else { heading };
    (nx, ny, heading)
}

/// Deterministic uniform sample in `[0, 1)` for one agent on one tick.
///
/// Independent of chunking and thread scheduling: it depends only on the run
/// seed, the tick number and the agent's index.
#[inline]
pub fn agent_random(seed: u64, tick: u64, agent_index: u64) -> f32 {
    let key = seed
        ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ agent_index.wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    (splitmix64(key) >> 40) as f32 / (1u64 << 24) as f32
}

#[inline(always)]
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

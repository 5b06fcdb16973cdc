//! Agent population, struct-of-arrays.
//!
//! Fixed size: created once by [`AgentPool::spawn`], mutated every tick by
//! the sense-and-move kernel, never resized.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, UnitDisc};
use std::f32::consts::TAU;

use crate::core::agent::{max_coord, species_mask, wrap_angle, Agent};
use crate::core::config::{SimulationConfig, SpawnMode};
use crate::core::error::{try_alloc, SlimeResult};

/// Disc radius of `InwardCircle`, as a fraction of grid height.
pub const INWARD_CIRCLE_RADIUS: f32 = 0.5;
/// Disc radius of `RandomCircle`, as a fraction of grid height.
pub const RANDOM_CIRCLE_RADIUS: f32 = 0.15;

pub struct AgentPool {
    pub n_agents: usize,

    // Kinematics
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub heading: Vec<f32>,

    // Species identity, fixed for the agent's lifetime
    pub species: Vec<u8>,
    pub mask: Vec<u8>,
}

impl AgentPool {
    /// Allocate a zeroed pool. Every agent starts at the origin as species 0.
    pub fn new(n_agents: usize) -> SlimeResult<Self> {
        let mut mask = try_alloc(n_agents, "agent masks")?;
        mask.fill(species_mask(0));
        Ok(Self {
            n_agents,
            x: try_alloc(n_agents, "agent positions")?,
            y: try_alloc(n_agents, "agent positions")?,
            heading: try_alloc(n_agents, "agent headings")?,
            species: try_alloc(n_agents, "agent species")?,
            mask,
        })
    }

    /// Create the population for `config` using its spawn mode.
    ///
    /// Agents are drawn in index order from `rng`, so the same seed always
    /// yields the same population.
    pub fn spawn(config: &SimulationConfig, rng: &mut StdRng) -> SlimeResult<Self> {
        let mut pool = Self::new(config.num_agents)?;

        let width = config.width as f32;
        let height = config.height as f32;
        let centre = (width / 2.0, height / 2.0);
        let num_species = config.num_species();

        for i in 0..pool.n_agents {
            let random_angle = rng.gen::<f32>() * TAU;

            let ((x, y), heading) = match config.spawn_mode {
                SpawnMode::Point => (centre, random_angle),
                SpawnMode::Random => ((rng.gen_range(0.0..width), rng.gen_range(0.0..height)), random_angle),
                SpawnMode::InwardCircle => {
                    let p = disc_point(rng, centre, height * INWARD_CIRCLE_RADIUS);
                    (p, (centre.1 - p.1).atan2(centre.0 - p.0))
                }
                SpawnMode::RandomCircle => {
                    (disc_point(rng, centre, height * RANDOM_CIRCLE_RADIUS), random_angle)
                }
            };

            let species_index = if num_species == 1 {
                0
            } else {
                // 1-based draw, stored 0-based
                (rng.gen_range(1..=num_species) - 1) as u8
            };

            // A disc of radius 0.5 * height overhangs grids narrower than they are tall.
            pool.x[i] = x.clamp(0.0, max_coord(width));
            pool.y[i] = y.clamp(0.0, max_coord(height));
            pool.heading[i] = wrap_angle(heading);
            pool.species[i] = species_index;
            pool.mask[i] = species_mask(species_index);
        }

        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.n_agents
    }

    pub fn is_empty(&self) -> bool {
        self.n_agents == 0
    }

    pub fn get(&self, i: usize) -> Agent {
        Agent {
            position: [self.x[i], self.y[i]],
            heading: self.heading[i],
            species_index: self.species[i],
            species_mask: self.mask[i],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Agent> + '_ {
        (0..self.n_agents).map(move |i| self.get(i))
    }

    /// Agents per species.
    pub fn species_counts(&self, num_species: usize) -> Vec<usize> {
        let mut counts = vec![0; num_species];
        for &s in &self.species {
            counts[s as usize] += 1;
        }
        counts
    }
}

fn disc_point(rng: &mut StdRng, centre: (f32, f32), radius: f32) -> (f32, f32) {
    let [dx, dy]: [f32; 2] = UnitDisc.sample(rng);
    (centre.0 + dx * radius, centre.1 + dy * radius)
}

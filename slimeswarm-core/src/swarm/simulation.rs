use chrono::Local;
use image::RgbaImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::grid::{Deposit, DepositBands};
use super::kernel::{self, MoveParams};
use super::pheromone::TrailField;
use super::pool::AgentPool;
use crate::core::config::{DisplayMode, SimulationConfig};
use crate::core::error::{try_alloc, SlimeResult};
use crate::display::{self, DisplayFrame, SnapshotOutcome};

/// Snapshot of run statistics for hosts and the CLI.
#[derive(Clone, Debug, PartialEq)]
pub struct TickStats {
    pub tick: u64,
    pub simulated_time: f64,
    pub last_tick: Duration,
    /// Total trail per species channel
    pub channel_mass: Vec<f64>,
}

/// The simulation core: agent pool, trail field and the per-tick pipeline.
///
/// One tick runs four phases separated by full barriers:
/// 1. sense-and-move (parallel over agent chunks), emitting one deposit per agent
/// 2. deposit application (parallel over row bands)
/// 3. diffuse-and-decay from current into next (parallel over rows)
/// 4. swap
pub struct Simulation {
    config: SimulationConfig,
    seed: u64,

    pub(crate) pool: AgentPool,
    pub(crate) field: TrailField,

    // Per-tick scratch, sized once
    deposits: Vec<Deposit>,
    bands: DepositBands,

    frame: DisplayFrame,
    back_buffer: RgbaImage,

    paused: bool,
    tick: u64,
    simulated_time: f64,
    last_tick: Duration,
}

impl Simulation {
    /// Validate `config`, then allocate and spawn everything. Same seed and
    /// config always produce the same run.
    pub fn initialize(config: SimulationConfig, seed: u64) -> SlimeResult<Self> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let field = TrailField::new(config.width, config.height, config.num_species())?;
        let pool = AgentPool::spawn(&config, &mut rng)?;
        let deposits = try_alloc(config.num_agents, "deposit scratch")?;
        let bands = DepositBands::for_field(&field);
        let front = display::try_image(config.width, config.height)?;
        let back_buffer = display::try_image(config.width, config.height)?;

        info!(
            "[Simulation] Initialized {} agents on {}x{} grid ({} species, {:?} spawn, seed {})",
            pool.n_agents,
            config.width,
            config.height,
            config.num_species(),
            config.spawn_mode,
            seed
        );

        Ok(Simulation {
            config,
            seed,
            pool,
            field,
            deposits,
            bands,
            frame: DisplayFrame::from_image(front),
            back_buffer,
            paused: false,
            tick: 0,
            simulated_time: 0.0,
            last_tick: Duration::ZERO,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn pool(&self) -> &AgentPool {
        &self.pool
    }

    pub fn field(&self) -> &TrailField {
        &self.field
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Handle to the presented image; clone it into the host renderer.
    pub fn frame(&self) -> DisplayFrame {
        self.frame.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Halt or resume tick execution. Nothing is released while paused.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            info!("[Simulation] {} at tick {}", if paused { "Paused" } else { "Resumed" }, self.tick);
        }
        self.paused = paused;
    }

    /// Run one full tick. Returns `false` without doing anything while paused.
    pub fn step(&mut self, dt: f32) -> bool {
        if self.paused {
            return false;
        }
        let start = Instant::now();

        self.sense_and_move(dt);
        self.diffuse_and_decay(dt);

        self.last_tick = start.elapsed();
        if self.tick % 100 == 0 {
            debug!(
                "[Simulation] Tick {}: {} agents in {:?}",
                self.tick, self.pool.n_agents, self.last_tick
            );
        }
        true
    }

    /// Phases 1 and 2: move every agent and apply their deposits to the
    /// current field. Advances the tick counter.
    pub fn sense_and_move(&mut self, dt: f32) {
        debug_assert!(dt.is_finite() && dt >= 0.0, "dt must be finite and non-negative");
        self.tick += 1;
        self.simulated_time += dt as f64;

        let params = MoveParams {
            species: &self.config.species,
            trail_weight: self.config.trail_weight,
            cross_species_weight: self.config.cross_species_weight,
            dt,
            seed: self.seed,
            tick: self.tick,
        };
        kernel::sense_and_move(&mut self.pool, &self.field, &params, &mut self.deposits);

        self.bands.rebuild(&self.deposits);
        self.bands.apply(&mut self.field, self.config.trail_cap);
    }

    /// Phases 3 and 4: diffuse and decay into the next buffer, then swap.
    pub fn diffuse_and_decay(&mut self, dt: f32) {
        self.field
            .diffuse_and_decay(self.config.diffuse_rate, self.config.decay_rate, dt);
    }

    /// Host entry point for one displayed frame: `steps_per_frame` ticks
    /// (none while paused), then present. Returns the number of ticks run.
    pub fn run_frame(&mut self, dt: f32) -> u32 {
        let mut ran = 0;
        for _ in 0..self.config.steps_per_frame {
            if !self.step(dt) {
                break;
            }
            ran += 1;
        }
        self.present();
        ran
    }

    /// Move to a new grid size.
    ///
    /// Reallocates the field, deposit bands and display images and re-spawns
    /// the population from the run seed. The tick counter, pause state and
    /// display handle carry over. On error nothing is changed.
    pub fn resize(&mut self, width: usize, height: usize) -> SlimeResult<()> {
        if width == self.config.width && height == self.config.height {
            return Ok(());
        }
        let config = SimulationConfig {
            width,
            height,
            ..self.config.clone()
        };
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let pool = AgentPool::spawn(&config, &mut rng)?;
        let mut front = display::try_image(width, height)?;
        let back_buffer = display::try_image(width, height)?;
        self.field.resize(width, height)?;

        self.bands = DepositBands::for_field(&self.field);
        self.pool = pool;
        self.back_buffer = back_buffer;
        self.frame.publish(&mut front);
        self.config = config;

        info!(
            "[Simulation] Resized to {}x{} at tick {}, respawned {} agents",
            width, height, self.tick, self.pool.n_agents
        );
        Ok(())
    }

    /// Composite the current state into the display frame.
    pub fn present(&mut self) {
        match self.config.display.mode {
            DisplayMode::Trails => {
                display::composite_trails(&self.field, &self.config.species, &mut self.back_buffer)
            }
            DisplayMode::AgentsOnly => {
                display::composite_agents(&self.pool, &self.config.species, &mut self.back_buffer)
            }
        }
        self.frame.publish(&mut self.back_buffer);
    }

    /// Write the current display frame to the snapshot directory.
    ///
    /// Failures are logged and swallowed; the simulation is never affected.
    pub fn save_snapshot(&self) -> Option<PathBuf> {
        let dir = &self.config.display.snapshot_dir;
        let image = self.frame.snapshot();
        match display::write_snapshot(&image, dir, Local::now()) {
            Ok(SnapshotOutcome::Saved(path)) => {
                info!("[Snapshot] Saved to {}", path.display());
                Some(path)
            }
            Ok(SnapshotOutcome::Skipped(path)) => {
                warn!("[Snapshot] {} already exists, skipping", path.display());
                None
            }
            Err(e) => {
                warn!("[Snapshot] Failed to save into {}: {}", dir.display(), e);
                None
            }
        }
    }

    pub fn stats(&self) -> TickStats {
        TickStats {
            tick: self.tick,
            simulated_time: self.simulated_time,
            last_tick: self.last_tick,
            channel_mass: (0..self.field.channels).map(|c| self.field.channel_mass(c)).collect(),
        }
    }

    /// Release every buffer.
    pub fn teardown(self) {
        info!(
            "[Simulation] Teardown after {} ticks ({:.2}s simulated)",
            self.tick, self.simulated_time
        );
    }
}

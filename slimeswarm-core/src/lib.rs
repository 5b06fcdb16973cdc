//! slimeswarm core: a multi-species Physarum (slime mold) simulation.
//!
//! Agents sense a shared trail field, steer toward stronger trail, move and
//! deposit. The field diffuses and decays every tick. All per-agent and
//! per-cell work runs on rayon; results do not depend on the thread count.

pub mod core;
pub mod display;
pub mod swarm;

pub use core::agent::Agent;
pub use core::config::{DisplayMode, DisplaySettings, SimulationConfig, SpawnMode, SpeciesSettings};
pub use core::error::{SlimeError, SlimeResult};
pub use display::DisplayFrame;
pub use swarm::{AgentPool, Simulation, TickStats, TrailField};

/// Initialize tracing for the library.
///
/// `level` is an env-filter directive such as `"info"` or `"slimeswarm_core=debug"`.
pub fn setup_logging(level: Option<String>) {
    let filter = level.unwrap_or_else(|| "info".to_string());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

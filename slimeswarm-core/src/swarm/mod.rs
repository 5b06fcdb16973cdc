//! Swarm Engine
//!
//! Agent population (SoA), trail field and the parallel tick pipeline.

pub mod grid;
pub mod kernel;
pub mod pheromone;
pub mod pool;
pub mod simulation;


pub use grid::{Deposit, DepositBands};
pub use pheromone::TrailField;
pub use pool::AgentPool;
pub use simulation::{Simulation, TickStats};

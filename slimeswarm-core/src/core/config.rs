use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{SlimeError, SlimeResult};

/// Maximum number of species. Each species owns one trail channel and one
/// display color component.
pub const MAX_SPECIES: usize = 4;

/// Largest accepted sensor reach, in cells.
pub const MAX_SENSOR_OFFSET_DISTANCE: f32 = 10_000.0;
/// Largest accepted sensor window half-width.
pub const MAX_SENSOR_SIZE: u32 = 32;

/// Initial position/heading distribution of the population.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnMode {
    Random,
    Point,
    #[default]
    InwardCircle,
    RandomCircle,
}

/// What the composite step draws.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    /// Species-colored trail density.
    #[default]
    Trails,
    /// Agent positions only, on a cleared image.
    AgentsOnly,
}

/// Per-species movement, sensing and deposit parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesSettings {
    /// Cells per second
    pub move_speed: f32,
    /// Maximum steering, in revolutions per second
    pub turn_speed: f32,
    pub sensor_angle_degrees: f32,
    pub sensor_offset_distance: f32,
    /// Half-width of the square sampling window; 0 samples a single cell.
    pub sensor_size: u32,
    /// Odd, at least 3. Sensors spread evenly across `[-angle, +angle]`.
    pub sensor_count: u32,
    /// Multiplier on the global trail weight
    pub deposit_amount: f32,
    /// Linear RGBA in `[0, 1]`
    pub color: [f32; 4],
}

impl Default for SpeciesSettings {
    fn default() -> Self {
        SpeciesSettings {
            move_speed: 30.0,
            turn_speed: 2.0,
            sensor_angle_degrees: 30.0,
            sensor_offset_distance: 35.0,
            sensor_size: 1,
            sensor_count: 3,
            deposit_amount: 1.0,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

impl SpeciesSettings {
    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn sensor_angle_radians(&self) -> f32 {
        self.sensor_angle_degrees.to_radians()
    }

    fn validate(&self, index: usize) -> SlimeResult<()> {
        let finite = [
            self.move_speed,
            self.turn_speed,
            self.sensor_angle_degrees,
            self.sensor_offset_distance,
            self.deposit_amount,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(SlimeError::invalid(format!(
                "species {index}: parameters must be finite"
            )));
        }
        if self.move_speed < 0.0 || self.deposit_amount < 0.0 || self.sensor_offset_distance < 0.0 {
            return Err(SlimeError::invalid(format!(
                "species {index}: speed, deposit and sensor distance must be non-negative"
            )));
        }
        if self.sensor_offset_distance > MAX_SENSOR_OFFSET_DISTANCE {
            return Err(SlimeError::invalid(format!(
                "species {index}: sensor_offset_distance must be <= {MAX_SENSOR_OFFSET_DISTANCE} (got {})",
                self.sensor_offset_distance
            )));
        }
        if self.sensor_size > MAX_SENSOR_SIZE {
            return Err(SlimeError::invalid(format!(
                "species {index}: sensor_size must be <= {MAX_SENSOR_SIZE} (got {})",
                self.sensor_size
            )));
        }
        if self.sensor_count < 3 || self.sensor_count % 2 == 0 {
            return Err(SlimeError::invalid(format!(
                "species {index}: sensor_count must be odd and >= 3 (got {})",
                self.sensor_count
            )));
        }
        Ok(())
    }
}

/// Presentation settings. Only the composite step and snapshot export read these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub mode: DisplayMode,
    pub snapshot_dir: PathBuf,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            mode: DisplayMode::Trails,
            snapshot_dir: PathBuf::from("images"),
        }
    }
}

/// Main parameters of a simulation run.
///
/// Read-only once the simulation is initialized; changing most values
/// requires a new [`crate::Simulation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub width: usize,
    pub height: usize,
    pub num_agents: usize,
    pub spawn_mode: SpawnMode,
    pub species: Vec<SpeciesSettings>,
    /// Base deposit per agent per tick, scaled by each species' `deposit_amount`.
    pub trail_weight: f32,
    /// Fraction of trail lost per simulated second
    pub decay_rate: f32,
    /// Blend weight per simulated second between a cell and its 3×3 mean
    pub diffuse_rate: f32,
    /// Saturation ceiling of deposits
    pub trail_cap: f32,
    /// How strongly an agent reacts to other species' channels when sensing.
    /// Negative repels, zero ignores, positive attracts.
    pub cross_species_weight: f32,
    pub steps_per_frame: u32,
    pub display: DisplaySettings,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            width: 1280,
            height: 720,
            num_agents: 250_000,
            spawn_mode: SpawnMode::InwardCircle,
            species: vec![SpeciesSettings::default()],
            trail_weight: 1.0,
            decay_rate: 0.2,
            diffuse_rate: 3.0,
            trail_cap: 1.0,
            cross_species_weight: -1.0,
            steps_per_frame: 1,
            display: DisplaySettings::default(),
        }
    }
}

impl SimulationConfig {
    /// Named starting points for the CLI and hosts.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "three_species" => Some(SimulationConfig {
                spawn_mode: SpawnMode::RandomCircle,
                num_agents: 300_000,
                species: vec![
                    SpeciesSettings::default().with_color([1.0, 0.25, 0.2, 1.0]),
                    SpeciesSettings {
                        move_speed: 40.0,
                        sensor_angle_degrees: 45.0,
                        ..SpeciesSettings::default()
                    }
                    .with_color([0.2, 1.0, 0.4, 1.0]),
                    SpeciesSettings {
                        move_speed: 20.0,
                        turn_speed: 4.0,
                        sensor_offset_distance: 20.0,
                        ..SpeciesSettings::default()
                    }
                    .with_color([0.3, 0.45, 1.0, 1.0]),
                ],
                ..Self::default()
            }),
            "dense" => Some(SimulationConfig {
                num_agents: 1_000_000,
                spawn_mode: SpawnMode::Random,
                decay_rate: 0.5,
                diffuse_rate: 5.0,
                steps_per_frame: 2,
                ..Self::default()
            }),
            _ => None,
        }
    }

    pub fn from_json_str(json: &str) -> SlimeResult<Self> {
        let cfg: SimulationConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SlimeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> SlimeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn num_species(&self) -> usize {
        self.species.len()
    }

    /// Reject unusable configurations before anything is allocated.
    pub fn validate(&self) -> SlimeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SlimeError::invalid(format!(
                "grid must be at least 1x1 (got {}x{})",
                self.width, self.height
            )));
        }
        let max_side = u32::MAX as usize;
        if self.width > max_side || self.height > max_side {
            return Err(SlimeError::invalid(format!(
                "grid sides must fit the display image (max {max_side}, got {}x{})",
                self.width, self.height
            )));
        }
        if self.num_agents == 0 {
            return Err(SlimeError::invalid("num_agents must be > 0"));
        }
        if self.species.is_empty() || self.species.len() > MAX_SPECIES {
            return Err(SlimeError::invalid(format!(
                "species count must be between 1 and {MAX_SPECIES} (got {})",
                self.species.len()
            )));
        }
        if self.steps_per_frame == 0 {
            return Err(SlimeError::invalid("steps_per_frame must be > 0"));
        }
        let rates = [
            ("trail_weight", self.trail_weight),
            ("decay_rate", self.decay_rate),
            ("diffuse_rate", self.diffuse_rate),
            ("trail_cap", self.trail_cap),
        ];
        for (name, value) in rates {
            if !value.is_finite() || value < 0.0 {
                return Err(SlimeError::invalid(format!(
                    "{name} must be finite and non-negative (got {value})"
                )));
            }
        }
        if !self.cross_species_weight.is_finite() {
            return Err(SlimeError::invalid("cross_species_weight must be finite"));
        }
        for (i, species) in self.species.iter().enumerate() {
            species.validate(i)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        SimulationConfig::default().validate().unwrap();
        for name in ["default", "three_species", "dense"] {
            SimulationConfig::preset(name).unwrap().validate().unwrap();
        }
        assert!(SimulationConfig::preset("nope").is_none());
    }

    #[test]
    fn rejects_empty_grid_and_population() {
        let cfg = SimulationConfig { width: 0, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(SlimeError::InvalidConfig(_))));

        let cfg = SimulationConfig { num_agents: 0, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(SlimeError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_species_count_out_of_range() {
        let cfg = SimulationConfig { species: vec![], ..Default::default() };
        assert!(cfg.validate().is_err());

        let cfg = SimulationConfig {
            species: vec![SpeciesSettings::default(); MAX_SPECIES + 1],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_even_sensor_count() {
        let cfg = SimulationConfig {
            species: vec![SpeciesSettings { sensor_count: 4, ..Default::default() }],
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("sensor_count"), "{err}");
    }

    #[test]
    fn rejects_unbounded_sensor_reach() {
        let cfg = SimulationConfig {
            species: vec![SpeciesSettings { sensor_offset_distance: 1e30, ..Default::default() }],
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("sensor_offset_distance"), "{err}");

        let cfg = SimulationConfig {
            species: vec![SpeciesSettings {
                sensor_offset_distance: MAX_SENSOR_OFFSET_DISTANCE,
                ..Default::default()
            }],
            ..Default::default()
        };
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_oversized_sensor_window() {
        let cfg = SimulationConfig {
            species: vec![SpeciesSettings { sensor_size: MAX_SENSOR_SIZE + 1, ..Default::default() }],
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("sensor_size"), "{err}");
    }

    #[test]
    fn rejects_sides_wider_than_an_image() {
        let cfg = SimulationConfig { width: u32::MAX as usize + 1, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(SlimeError::InvalidConfig(_))));
        let cfg = SimulationConfig { height: 1 << 40, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(SlimeError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_negative_rates() {
        let cfg = SimulationConfig { decay_rate: -0.1, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = SimulationConfig { diffuse_rate: f32::NAN, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn json_fills_missing_fields_from_defaults() {
        let cfg = SimulationConfig::from_json_str(
            r#"{ "width": 64, "height": 32, "num_agents": 10, "spawn_mode": "Point" }"#,
        )
        .unwrap();
        assert_eq!(cfg.width, 64);
        assert_eq!(cfg.height, 32);
        assert_eq!(cfg.spawn_mode, SpawnMode::Point);
        assert_eq!(cfg.species.len(), 1);
        assert_eq!(cfg.decay_rate, SimulationConfig::default().decay_rate);
    }

    #[test]
    fn json_validation_runs_on_load() {
        let err = SimulationConfig::from_json_str(r#"{ "width": 0 }"#).unwrap_err();
        assert!(matches!(err, SlimeError::InvalidConfig(_)));

        let err = SimulationConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SlimeError::Json(_)));
    }

    #[test]
    fn json_round_trip_preserves_presets() {
        let cfg = SimulationConfig::preset("three_species").unwrap();
        let json = cfg.to_json_pretty().unwrap();
        assert_eq!(SimulationConfig::from_json_str(&json).unwrap(), cfg);
    }
}

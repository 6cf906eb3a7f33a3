//! Configuration types for the simulation.

use crate::{Error, Result, Species, SpeciesTable};
use serde::{Deserialize, Serialize};

/// World configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the world grid
    pub width: i32,
    /// Height of the world grid
    pub height: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 300,
            height: 200,
        }
    }
}

impl WorldConfig {
    /// Number of cells in the grid (zero for invalid dimensions)
    pub fn cell_count(&self) -> usize {
        if self.width <= 0 || self.height <= 0 {
            return 0;
        }
        self.width as usize * self.height as usize
    }
}

/// Energy spent on each capacity and action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyCosts {
    /// Paid every turn for merely being able to move
    pub moving_capacity: f64,
    /// Paid when a move actually happens
    pub moving: f64,
    /// Paid every turn for merely being able to hunt
    pub hunting_capacity: f64,
    /// Paid after a successful kill
    pub hunting: f64,
    /// Paid every turn for merely being able to procreate
    pub procreating_capacity: f64,
    /// Paid by the parent after giving birth
    pub procreating: f64,
}

impl Default for EnergyCosts {
    fn default() -> Self {
        Self {
            moving_capacity: 2.0,
            moving: 5.0,
            hunting_capacity: 4.0,
            hunting: 10.0,
            procreating_capacity: 0.0,
            procreating: 15.0,
        }
    }
}

/// Capacity costs are only charged while energy is strictly above these levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyThresholds {
    pub moving: f64,
    pub hunting: f64,
    pub procreating: f64,
}

impl Default for EnergyThresholds {
    fn default() -> Self {
        Self {
            moving: 30.0,
            hunting: 30.0,
            procreating: 100.0,
        }
    }
}

/// Energy and cost configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Starting energy for organisms placed at initialization
    pub initial_energy: f64,
    /// Energy a plant gains per turn
    pub photosynthesis_yield: f64,
    pub costs: EnergyCosts,
    pub minimum_energy_to: EnergyThresholds,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            initial_energy: 10_000.0,
            photosynthesis_yield: 5.0,
            costs: EnergyCosts::default(),
            minimum_energy_to: EnergyThresholds::default(),
        }
    }
}

/// Per-species population parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesConfig {
    /// Organisms of each species placed at initialization
    pub initial_count: SpeciesTable<usize>,
    /// Upper bound of the death age drawn for every newborn
    pub max_lifespan: SpeciesTable<u32>,
    /// Chance (0.0 to 1.0) to procreate on each turn
    pub procreation_probability: SpeciesTable<f64>,
}

impl Default for SpeciesConfig {
    fn default() -> Self {
        Self {
            initial_count: SpeciesTable::new(1000, 300, 100),
            max_lifespan: SpeciesTable::new(40, 35, 100),
            procreation_probability: SpeciesTable::new(0.50, 0.10, 0.02),
        }
    }
}

/// Everything needed to build an ecosystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcosystemConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    pub world: WorldConfig,
    pub energy: EnergyConfig,
    pub species: SpeciesConfig,
}

impl Default for EcosystemConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            world: WorldConfig::default(),
            energy: EnergyConfig::default(),
            species: SpeciesConfig::default(),
        }
    }
}

impl EcosystemConfig {
    /// Parse a JSON document; absent fields take their default value
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check every setting before the world is built
    pub fn validate(&self) -> Result<()> {
        if self.world.width <= 0 || self.world.height <= 0 {
            return Err(Error::Validation(format!(
                "grid dimensions must be positive, got {}x{}",
                self.world.width, self.world.height
            )));
        }

        let capacity = self.world.cell_count();
        let requested: usize = self.species.initial_count.iter().map(|(_, n)| *n).sum();
        if requested > capacity {
            return Err(Error::Validation(format!(
                "initial population of {} exceeds grid capacity of {} cells",
                requested, capacity
            )));
        }

        for (species, p) in self.species.procreation_probability.iter() {
            if !(0.0..=1.0).contains(p) {
                return Err(Error::Validation(format!(
                    "procreation probability for {} must be in [0, 1], got {}",
                    species, p
                )));
            }
        }

        let energy = &self.energy;
        let costs = &energy.costs;
        let thresholds = &energy.minimum_energy_to;
        let amounts = [
            ("initial_energy", energy.initial_energy),
            ("photosynthesis_yield", energy.photosynthesis_yield),
            ("costs.moving_capacity", costs.moving_capacity),
            ("costs.moving", costs.moving),
            ("costs.hunting_capacity", costs.hunting_capacity),
            ("costs.hunting", costs.hunting),
            ("costs.procreating_capacity", costs.procreating_capacity),
            ("costs.procreating", costs.procreating),
            ("minimum_energy_to.moving", thresholds.moving),
            ("minimum_energy_to.hunting", thresholds.hunting),
            ("minimum_energy_to.procreating", thresholds.procreating),
        ];
        for (name, value) in amounts {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Validation(format!(
                    "{} must be a finite, non-negative number, got {}",
                    name, value
                )));
            }
        }

        if energy.initial_energy <= 0.0 && requested > 0 {
            return Err(Error::Validation(
                "initial_energy must be positive when organisms are placed".to_string(),
            ));
        }

        Ok(())
    }

    pub fn max_lifespan(&self, species: Species) -> u32 {
        *self.species.max_lifespan.get(species)
    }

    pub fn procreation_probability(&self, species: Species) -> f64 {
        *self.species.procreation_probability.get(species)
    }
}

/// Host loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory receiving settings, snapshots and checkpoints
    pub output_dir: String,
    /// Number of ticks to run (0 runs until interrupted or extinct)
    pub max_ticks: u64,
    /// Write an occupancy snapshot before every tick
    pub export_snapshots: bool,
    /// Ticks between census log lines
    pub census_interval: u64,
    /// Ticks between checkpoints (0 disables checkpointing)
    pub checkpoint_interval: u64,
    /// Number of checkpoint files kept on disk
    pub keep_checkpoints: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: "./data/experiment".to_string(),
            max_ticks: 0,
            export_snapshots: true,
            census_interval: 100,
            checkpoint_interval: 1000,
            keep_checkpoints: 3,
        }
    }
}

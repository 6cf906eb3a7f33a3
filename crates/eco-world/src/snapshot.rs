//! Serializable world state for checkpoints and restores.

use crate::biotope::Biotope;
use crate::ecosystem::Ecosystem;
use crate::organism::Organism;
use eco_core::{EcosystemConfig, Error, Position, Result, Species, VitalRecords};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub const STATE_VERSION: u32 = 1;

/// Serializable organism data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganismRecord {
    pub species: Species,
    pub position: Position,
    pub age: u32,
    pub death_age: u32,
    pub energy: f64,
}

impl From<&Organism> for OrganismRecord {
    fn from(org: &Organism) -> Self {
        Self {
            species: org.species,
            position: org.position,
            age: org.age,
            death_age: org.death_age,
            energy: org.energy,
        }
    }
}

/// Everything needed to resume an ecosystem exactly where it stopped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldState {
    pub version: u32,
    pub tick: u64,
    pub config: EcosystemConfig,
    pub rng: ChaCha8Rng,
    pub records: VitalRecords,
    /// Living organisms in position order
    pub organisms: Vec<OrganismRecord>,
}

impl WorldState {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl Ecosystem {
    pub fn to_state(&self) -> WorldState {
        let biotope = self.biotope();
        let organisms = biotope
            .grid()
            .occupants()
            .filter_map(|(_, id)| biotope.get(id).map(OrganismRecord::from))
            .collect();

        WorldState {
            version: STATE_VERSION,
            tick: self.tick(),
            config: self.config().clone(),
            rng: self.rng().clone(),
            records: self.records().clone(),
            organisms,
        }
    }

    /// Rebuild an ecosystem from a saved state, checking it for corruption
    pub fn from_state(state: WorldState) -> Result<Self> {
        if state.version != STATE_VERSION {
            return Err(Error::InvalidState(format!(
                "unsupported world state version {} (expected {})",
                state.version, STATE_VERSION
            )));
        }
        state.config.validate()?;

        let mut biotope = Biotope::with_records(
            state.config.world.width,
            state.config.world.height,
            state.records,
        );

        for record in state.organisms {
            if !(record.energy.is_finite() && record.energy > 0.0) {
                return Err(Error::InvalidState(format!(
                    "{} at {} has no energy left",
                    record.species, record.position
                )));
            }
            if record.age > record.death_age {
                return Err(Error::InvalidState(format!(
                    "{} at {} is older than its death age",
                    record.species, record.position
                )));
            }

            let mut organism =
                Organism::new(record.species, record.position, record.energy, record.death_age);
            organism.age = record.age;
            biotope.place(organism)?;
        }

        Ok(Ecosystem::from_parts(biotope, state.config, state.rng, state.tick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::{SpeciesTable, WorldConfig};

    fn config() -> EcosystemConfig {
        let mut config = EcosystemConfig::default();
        config.seed = 2024;
        config.world = WorldConfig {
            width: 16,
            height: 12,
        };
        config.species.initial_count = SpeciesTable::new(40, 15, 5);
        config
    }

    #[test]
    fn test_restored_world_continues_identically() {
        let mut original = Ecosystem::new(config()).unwrap();
        original.run(5).unwrap();

        let bytes = original.to_state().to_bytes().unwrap();
        let mut restored = Ecosystem::from_state(WorldState::from_bytes(&bytes).unwrap()).unwrap();
        assert_eq!(restored.tick(), original.tick());
        assert_eq!(restored.records(), original.records());

        original.run(10).unwrap();
        restored.run(10).unwrap();

        assert_eq!(
            original.occupancy().collect::<Vec<_>>(),
            restored.occupancy().collect::<Vec<_>>()
        );
        assert_eq!(original.to_state().organisms, restored.to_state().organisms);
    }

    #[test]
    fn test_state_lists_every_organism() {
        let ecosystem = Ecosystem::new(config()).unwrap();
        let state = ecosystem.to_state();
        assert_eq!(state.organisms.len(), 60);
        assert_eq!(state.version, STATE_VERSION);
        assert!(state.organisms.windows(2).all(|w| w[0].position < w[1].position));
    }

    #[test]
    fn test_rejects_duplicate_cells() {
        let mut state = Ecosystem::new(config()).unwrap().to_state();
        let duplicate = state.organisms[0].clone();
        state.organisms.push(duplicate);
        assert!(matches!(Ecosystem::from_state(state), Err(Error::CellOccupied(_))));
    }

    #[test]
    fn test_rejects_corrupt_organisms() {
        let mut state = Ecosystem::new(config()).unwrap().to_state();
        state.organisms[0].energy = -3.0;
        assert!(matches!(Ecosystem::from_state(state), Err(Error::InvalidState(_))));

        let mut state = Ecosystem::new(config()).unwrap().to_state();
        state.organisms[0].age = state.organisms[0].death_age + 1;
        assert!(matches!(Ecosystem::from_state(state), Err(Error::InvalidState(_))));

        let mut state = Ecosystem::new(config()).unwrap().to_state();
        state.organisms[0].position = Position::new(100, 0);
        assert!(matches!(Ecosystem::from_state(state), Err(Error::Validation(_))));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut state = Ecosystem::new(config()).unwrap().to_state();
        state.version = 99;
        assert!(Ecosystem::from_state(state).is_err());
    }
}

//! Population statistics.

use crate::{CauseOfDeath, Species, SpeciesTable};
use serde::{Deserialize, Serialize};

/// Running tally of births and deaths since the world was created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalRecords {
    /// Organisms born through procreation
    pub births: SpeciesTable<u64>,
    pub starvations: SpeciesTable<u64>,
    pub old_age_deaths: SpeciesTable<u64>,
    pub predations: SpeciesTable<u64>,
}

impl VitalRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_birth(&mut self, species: Species) {
        *self.births.get_mut(species) += 1;
    }

    pub fn record_death(&mut self, species: Species, cause: CauseOfDeath) {
        let table = match cause {
            CauseOfDeath::Starvation => &mut self.starvations,
            CauseOfDeath::OldAge => &mut self.old_age_deaths,
            CauseOfDeath::Predation => &mut self.predations,
        };
        *table.get_mut(species) += 1;
    }

    pub fn deaths(&self, species: Species) -> u64 {
        self.starvations.get(species) + self.old_age_deaths.get(species) + self.predations.get(species)
    }

    pub fn total_births(&self) -> u64 {
        self.births.iter().map(|(_, n)| n).sum()
    }

    pub fn total_deaths(&self) -> u64 {
        Species::ALL.iter().map(|s| self.deaths(*s)).sum()
    }
}

/// Point-in-time summary of the living population
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Census {
    pub tick: u64,
    pub population: SpeciesTable<usize>,
    energy_sum: SpeciesTable<f64>,
    age_sum: SpeciesTable<u64>,
}

impl Census {
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Default::default()
        }
    }

    /// Count one living organism
    pub fn add(&mut self, species: Species, energy: f64, age: u32) {
        *self.population.get_mut(species) += 1;
        *self.energy_sum.get_mut(species) += energy;
        *self.age_sum.get_mut(species) += u64::from(age);
    }

    pub fn total(&self) -> usize {
        self.population.iter().map(|(_, n)| n).sum()
    }

    pub fn mean_energy(&self, species: Species) -> f64 {
        match *self.population.get(species) {
            0 => 0.0,
            n => self.energy_sum.get(species) / n as f64,
        }
    }

    pub fn mean_age(&self, species: Species) -> f64 {
        match *self.population.get(species) {
            0 => 0.0,
            n => *self.age_sum.get(species) as f64 / n as f64,
        }
    }

    pub fn is_extinct(&self) -> bool {
        self.total() == 0
    }
}

//! Spatial grid plus the living population.

use crate::grid::SpatialGrid;
use crate::habitat::Habitat;
use crate::organism::Organism;
use eco_core::{CauseOfDeath, Error, OrganismId, Position, Result, Species, VitalRecords};
use std::collections::HashMap;
use tracing::debug;

/// Owns every living organism and the grid that locates them.
///
/// An organism is normally present both in `organisms` and in the grid.
/// While it takes its turn it is moved out of `organisms`; its cell stays
/// claimed in the grid.
#[derive(Debug, Clone)]
pub struct Biotope {
    grid: SpatialGrid,
    organisms: HashMap<OrganismId, Organism>,
    next_id: u64,
    records: VitalRecords,
}

impl Biotope {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            grid: SpatialGrid::new(width, height),
            organisms: HashMap::new(),
            next_id: 0,
            records: VitalRecords::new(),
        }
    }

    pub(crate) fn with_records(width: i32, height: i32, records: VitalRecords) -> Self {
        Self {
            records,
            ..Self::new(width, height)
        }
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn records(&self) -> &VitalRecords {
        &self.records
    }

    pub fn population(&self) -> usize {
        self.organisms.len()
    }

    pub fn get(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.get(&id)
    }

    /// Put a living organism on its cell without counting it as a birth
    pub fn place(&mut self, organism: Organism) -> Result<OrganismId> {
        if !organism.is_alive() {
            return Err(Error::InvalidState(format!(
                "cannot place a dead {} at {}",
                organism.species, organism.position
            )));
        }
        if !self.grid.contains(organism.position) {
            return Err(Error::Validation(format!(
                "position {} is outside the {}x{} grid",
                organism.position, self.grid.width, self.grid.height
            )));
        }

        let id = OrganismId(self.next_id);
        self.grid.insert(organism.position, id)?;
        self.next_id += 1;
        self.organisms.insert(id, organism);
        Ok(id)
    }

    /// Hand an organism out for its turn
    pub fn take(&mut self, id: OrganismId) -> Option<Organism> {
        self.organisms.remove(&id)
    }

    /// Return an organism after its turn
    pub fn restore(&mut self, id: OrganismId, organism: Organism) {
        self.organisms.insert(id, organism);
    }
}

impl Habitat for Biotope {
    fn free_neighbors(&self, center: Position) -> Vec<Position> {
        self.grid.free_neighbors(center)
    }

    fn occupied_neighbors(&self, center: Position) -> Vec<OrganismId> {
        self.grid.occupied_neighbors(center)
    }

    fn species_of(&self, id: OrganismId) -> Option<Species> {
        self.organisms.get(&id).map(|organism| organism.species)
    }

    fn relocate(&mut self, from: Position, to: Position) -> Result<()> {
        self.grid.relocate(from, to)
    }

    fn remove(&mut self, organism: &Organism) -> Result<()> {
        let cause = organism.cause_of_death().ok_or_else(|| {
            Error::InvalidState(format!(
                "living {} at {} cannot be removed",
                organism.species, organism.position
            ))
        })?;
        let id = self.grid.remove(organism.position)?;
        self.records.record_death(organism.species, cause);

        debug!(
            event = "organism_death",
            organism_id = %id,
            species = %organism.species,
            cause = %cause,
            age = organism.age,
            death_age = organism.death_age,
            energy = organism.energy,
            position_x = organism.position.x,
            position_y = organism.position.y,
            "Organism died"
        );
        Ok(())
    }

    fn devour(&mut self, prey: OrganismId) -> Result<f64> {
        let mut organism = self
            .organisms
            .remove(&prey)
            .ok_or_else(|| Error::NotFound(format!("prey {}", prey)))?;
        let energy = organism.energy;
        organism.die(CauseOfDeath::Predation, self)?;
        Ok(energy)
    }

    fn insert(&mut self, organism: Organism) -> Result<OrganismId> {
        let species = organism.species;
        let position = organism.position;
        let id = self.place(organism)?;
        self.records.record_birth(species);

        debug!(
            event = "organism_birth",
            organism_id = %id,
            species = %species,
            position_x = position.x,
            position_y = position.y,
            "Organism born"
        );
        Ok(id)
    }
}

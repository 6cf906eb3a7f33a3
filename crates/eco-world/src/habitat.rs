//! The world as seen by an acting organism.

use crate::organism::Organism;
use eco_core::{OrganismId, Position, Result, Species};

/// Spatial queries and mutations an organism may perform during its turn.
///
/// The acting organism is held outside the habitat while it acts; every
/// other living organism is reachable through its handle.
pub trait Habitat {
    /// Free cells in the Moore neighborhood of `center`
    fn free_neighbors(&self, center: Position) -> Vec<Position>;

    /// Organisms in the Moore neighborhood of `center`, in no particular order
    fn occupied_neighbors(&self, center: Position) -> Vec<OrganismId>;

    fn species_of(&self, id: OrganismId) -> Option<Species>;

    /// Move whatever occupies `from` to the free cell `to`
    fn relocate(&mut self, from: Position, to: Position) -> Result<()>;

    /// Release the cell of an organism that has just died
    fn remove(&mut self, organism: &Organism) -> Result<()>;

    /// Kill `prey` by predation and hand back the energy it held
    fn devour(&mut self, prey: OrganismId) -> Result<f64>;

    /// Add a newborn to the population at its own position
    fn insert(&mut self, organism: Organism) -> Result<OrganismId>;
}

//! World simulation engine.
//!
//! This module implements the toroidal grid where plants, herbivores and
//! carnivores live, feed on each other and procreate.

pub mod biotope;
pub mod ecosystem;
pub mod grid;
pub mod habitat;
pub mod organism;
pub mod snapshot;

pub use biotope::Biotope;
pub use ecosystem::Ecosystem;
pub use grid::SpatialGrid;
pub use habitat::Habitat;
pub use organism::Organism;
pub use snapshot::{OrganismRecord, WorldState};

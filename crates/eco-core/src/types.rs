//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of an organism inside one ecosystem.
///
/// Handles are handed out in increasing order and never reused, so a stale
/// handle can never alias a newborn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrganismId(pub u64);

impl fmt::Display for OrganismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 2D position in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Apply toroidal wrapping for given world dimensions
    pub fn wrap(&self, width: i32, height: i32) -> Self {
        Self {
            x: self.x.rem_euclid(width),
            y: self.y.rem_euclid(height),
        }
    }

    pub fn is_within(&self, width: i32, height: i32) -> bool {
        (0..width).contains(&self.x) && (0..height).contains(&self.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One step in the Moore neighborhood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, -1),
            Direction::NorthWest => (-1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
        }
    }

    pub fn all() -> [Direction; 8] {
        [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
            Direction::NorthEast,
            Direction::NorthWest,
            Direction::SouthEast,
            Direction::SouthWest,
        ]
    }
}

/// Trophic species of an organism
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Species {
    Plant,
    Herbivore,
    Carnivore,
}

/// What a species is able to do during its turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub photosynthesis: bool,
    pub movement: bool,
    pub hunting: bool,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::Plant, Species::Herbivore, Species::Carnivore];

    pub fn capabilities(self) -> Capabilities {
        match self {
            Species::Plant => Capabilities {
                photosynthesis: true,
                movement: false,
                hunting: false,
            },
            Species::Herbivore | Species::Carnivore => Capabilities {
                photosynthesis: false,
                movement: true,
                hunting: true,
            },
        }
    }

    /// The one species this species feeds on, if any
    pub fn prey(self) -> Option<Species> {
        match self {
            Species::Plant => None,
            Species::Herbivore => Some(Species::Plant),
            Species::Carnivore => Some(Species::Herbivore),
        }
    }

    pub fn eats(self, other: Species) -> bool {
        self.prey() == Some(other)
    }

    /// Numeric code used in exported snapshots
    pub fn code(self) -> u8 {
        match self {
            Species::Plant => 1,
            Species::Herbivore => 2,
            Species::Carnivore => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Species::Plant => "plant",
            Species::Herbivore => "herbivore",
            Species::Carnivore => "carnivore",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value for every species.
///
/// Used for per-species settings and counters so that every species is
/// always covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTable<T> {
    pub plant: T,
    pub herbivore: T,
    pub carnivore: T,
}

impl<T> SpeciesTable<T> {
    pub fn new(plant: T, herbivore: T, carnivore: T) -> Self {
        Self {
            plant,
            herbivore,
            carnivore,
        }
    }

    pub fn get(&self, species: Species) -> &T {
        match species {
            Species::Plant => &self.plant,
            Species::Herbivore => &self.herbivore,
            Species::Carnivore => &self.carnivore,
        }
    }

    pub fn get_mut(&mut self, species: Species) -> &mut T {
        match species {
            Species::Plant => &mut self.plant,
            Species::Herbivore => &mut self.herbivore,
            Species::Carnivore => &mut self.carnivore,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Species, &T)> + '_ {
        Species::ALL.into_iter().map(move |species| (species, self.get(species)))
    }
}

/// Why an organism left the ecosystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CauseOfDeath {
    Starvation,
    OldAge,
    Predation,
}

impl fmt::Display for CauseOfDeath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CauseOfDeath::Starvation => "starvation",
            CauseOfDeath::OldAge => "old_age",
            CauseOfDeath::Predation => "predation",
        })
    }
}

//! Organism state and the per-turn action pipeline.

use crate::habitat::Habitat;
use eco_core::{CauseOfDeath, EcosystemConfig, Error, Position, Result, Species};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

/// An organism in the simulation
#[derive(Debug, Clone, PartialEq)]
pub struct Organism {
    pub species: Species,
    /// Age past which the organism dies
    pub death_age: u32,
    pub position: Position,
    pub age: u32,
    pub energy: f64,
    alive: bool,
    cause_of_death: Option<CauseOfDeath>,
}

impl Organism {
    pub fn new(species: Species, position: Position, energy: f64, death_age: u32) -> Self {
        Self {
            species,
            death_age,
            position,
            age: 0,
            energy,
            alive: true,
            cause_of_death: None,
        }
    }

    /// Create an organism whose death age is drawn from `[0, max_lifespan]`
    pub fn newborn(
        species: Species,
        position: Position,
        energy: f64,
        max_lifespan: u32,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let death_age = rng.gen_range(0..=max_lifespan);
        Self::new(species, position, energy, death_age)
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn cause_of_death(&self) -> Option<CauseOfDeath> {
        self.cause_of_death
    }

    /// Run one turn: photosynthesis, move, hunt, procreate, age.
    ///
    /// Stops at the first stage that kills the organism.
    pub fn act<H: Habitat>(
        &mut self,
        habitat: &mut H,
        config: &EcosystemConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        if !self.alive {
            return Err(Error::InvalidState(format!(
                "dead {} at {} was asked to act",
                self.species, self.position
            )));
        }

        let capabilities = self.species.capabilities();

        if capabilities.photosynthesis {
            self.photosynthesize(config.energy.photosynthesis_yield);
        }

        if capabilities.movement {
            self.do_move(habitat, config, rng)?;
            if !self.alive {
                return Ok(());
            }
        }

        if capabilities.hunting {
            self.do_hunt(habitat, config, rng)?;
            if !self.alive {
                return Ok(());
            }
        }

        self.do_procreate(habitat, config, rng)?;
        if !self.alive {
            return Ok(());
        }

        self.do_age(habitat)
    }

    /// Mark the organism dead and free its cell.
    ///
    /// Returns `false` without touching the habitat if it was already dead.
    pub fn die<H: Habitat>(&mut self, cause: CauseOfDeath, habitat: &mut H) -> Result<bool> {
        if !self.alive {
            return Ok(false);
        }
        self.alive = false;
        self.cause_of_death = Some(cause);
        habitat.remove(self)?;
        Ok(true)
    }

    fn photosynthesize(&mut self, amount: f64) {
        self.energy += amount;
    }

    /// Pay `amount` of energy; returns whether the organism survived it
    fn spend_energy<H: Habitat>(&mut self, amount: f64, habitat: &mut H) -> Result<bool> {
        self.energy -= amount;
        if self.energy <= 0.0 {
            self.die(CauseOfDeath::Starvation, habitat)?;
        }
        Ok(self.alive)
    }

    /// Pay a capacity cost when energy is strictly above `threshold`
    fn pay_capacity<H: Habitat>(&mut self, threshold: f64, cost: f64, habitat: &mut H) -> Result<bool> {
        if self.energy > threshold {
            return self.spend_energy(cost, habitat);
        }
        Ok(self.alive)
    }

    fn do_move<H: Habitat>(
        &mut self,
        habitat: &mut H,
        config: &EcosystemConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        let costs = &config.energy.costs;
        let threshold = config.energy.minimum_energy_to.moving;
        if !self.pay_capacity(threshold, costs.moving_capacity, habitat)? {
            return Ok(());
        }

        let free = habitat.free_neighbors(self.position);
        if free.is_empty() {
            return Ok(());
        }
        if !self.spend_energy(costs.moving, habitat)? {
            return Ok(());
        }

        if let Some(&target) = free.choose(rng) {
            habitat.relocate(self.position, target)?;
            self.position = target;
        }
        Ok(())
    }

    fn do_hunt<H: Habitat>(
        &mut self,
        habitat: &mut H,
        config: &EcosystemConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        let costs = &config.energy.costs;
        let threshold = config.energy.minimum_energy_to.hunting;
        if !self.pay_capacity(threshold, costs.hunting_capacity, habitat)? {
            return Ok(());
        }

        let mut neighbors = habitat.occupied_neighbors(self.position);
        neighbors.shuffle(rng);

        for id in neighbors {
            let prey = habitat.species_of(id).ok_or_else(|| {
                Error::InvalidState(format!(
                    "organism {} occupies a cell next to {} but is not in the population",
                    id, self.position
                ))
            })?;
            if self.species.eats(prey) {
                self.energy += habitat.devour(id)?;
                self.spend_energy(costs.hunting, habitat)?;
                break;
            }
        }
        Ok(())
    }

    fn do_procreate<H: Habitat>(
        &mut self,
        habitat: &mut H,
        config: &EcosystemConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        let costs = &config.energy.costs;
        let threshold = config.energy.minimum_energy_to.procreating;
        if !self.pay_capacity(threshold, costs.procreating_capacity, habitat)? {
            return Ok(());
        }

        if rng.gen::<f64>() >= config.procreation_probability(self.species) {
            return Ok(());
        }

        let free = habitat.free_neighbors(self.position);
        let Some(&birthplace) = free.choose(rng) else {
            trace!(
                species = %self.species,
                position_x = self.position.x,
                position_y = self.position.y,
                "Procreation skipped: no free adjacent cell"
            );
            return Ok(());
        };

        self.energy /= 2.0;
        let offspring = Organism::newborn(
            self.species,
            birthplace,
            self.energy,
            config.max_lifespan(self.species),
            rng,
        );
        habitat.insert(offspring)?;

        self.spend_energy(costs.procreating, habitat)?;
        Ok(())
    }

    fn do_age<H: Habitat>(&mut self, habitat: &mut H) -> Result<()> {
        self.age += 1;
        if self.age > self.death_age {
            self.die(CauseOfDeath::OldAge, habitat)?;
        }
        Ok(())
    }
}

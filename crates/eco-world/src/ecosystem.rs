//! Simulation engine: population setup and the per-tick evolution pass.

use crate::biotope::Biotope;
use crate::grid::SpatialGrid;
use crate::organism::Organism;
use eco_core::{
    Census, EcosystemConfig, Error, OrganismId, Position, Result, Species, VitalRecords,
};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{event, info, instrument, Level};

/// A running world: the biotope, its configuration, the shared random
/// stream and the tick counter.
///
/// Independent ecosystems share nothing and can run side by side.
pub struct Ecosystem {
    biotope: Biotope,
    config: EcosystemConfig,
    rng: ChaCha8Rng,
    tick: u64,
}

impl Ecosystem {
    /// Build a world and place the initial population on distinct random cells
    #[instrument(skip(config), fields(seed = config.seed))]
    pub fn new(config: EcosystemConfig) -> Result<Self> {
        let mut ecosystem = Self::empty(config)?;
        ecosystem.populate()?;
        Ok(ecosystem)
    }

    /// Build a world with no organisms in it
    pub fn empty(config: EcosystemConfig) -> Result<Self> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let biotope = Biotope::new(config.world.width, config.world.height);

        Ok(Self {
            biotope,
            config,
            rng,
            tick: 0,
        })
    }

    pub(crate) fn from_parts(
        biotope: Biotope,
        config: EcosystemConfig,
        rng: ChaCha8Rng,
        tick: u64,
    ) -> Self {
        Self {
            biotope,
            config,
            rng,
            tick,
        }
    }

    fn populate(&mut self) -> Result<()> {
        let initial_energy = self.config.energy.initial_energy;

        for species in Species::ALL {
            let count = *self.config.species.initial_count.get(species);
            let free: Vec<Position> = self.biotope.grid().free_cells().collect();
            if count > free.len() {
                return Err(Error::ResourceExhausted(format!(
                    "{} {}s requested but only {} free cells remain",
                    count,
                    species,
                    free.len()
                )));
            }

            let max_lifespan = self.config.max_lifespan(species);
            for i in index::sample(&mut self.rng, free.len(), count).iter() {
                let organism =
                    Organism::newborn(species, free[i], initial_energy, max_lifespan, &mut self.rng);
                self.biotope.place(organism)?;
            }

            info!(species = %species, count, "Placed initial organisms");
        }

        Ok(())
    }

    /// Add a fully specified living organism on a free cell
    pub fn add_organism(&mut self, organism: Organism) -> Result<OrganismId> {
        if !(organism.energy.is_finite() && organism.energy > 0.0) {
            return Err(Error::Validation(format!(
                "{} at {} must start with positive energy, got {}",
                organism.species, organism.position, organism.energy
            )));
        }
        if organism.age > organism.death_age {
            return Err(Error::Validation(format!(
                "{} at {} is already past its death age",
                organism.species, organism.position
            )));
        }
        self.biotope.place(organism)
    }

    /// Advance the world by one tick.
    ///
    /// The actors are the organisms on the grid when the tick starts.
    /// Organisms killed before their turn are skipped; organisms born
    /// during the tick first act on the next one.
    pub fn evolve(&mut self) -> Result<()> {
        let actors: Vec<OrganismId> = self.biotope.grid().occupants().map(|(_, id)| id).collect();

        for id in actors {
            // Already eaten this tick
            let Some(mut organism) = self.biotope.take(id) else {
                continue;
            };

            organism.act(&mut self.biotope, &self.config, &mut self.rng)?;

            if organism.is_alive() {
                self.biotope.restore(id, organism);
            }
        }

        let occupied = self.biotope.grid().occupied_count();
        if occupied != self.biotope.population() {
            return Err(Error::InvalidState(format!(
                "tick {}: {} occupied cells but {} living organisms",
                self.tick,
                occupied,
                self.biotope.population()
            )));
        }

        self.tick += 1;
        Ok(())
    }

    /// Run up to `ticks` ticks, stopping early if every organism has died
    #[instrument(skip(self), fields(start_tick = self.tick))]
    pub fn run(&mut self, ticks: u64) -> Result<Census> {
        info!("Starting simulation for {} ticks", ticks);

        for _ in 0..ticks {
            self.evolve()?;

            if self.tick % 1000 == 0 {
                info!(tick = self.tick, population = self.population(), "Simulation progress");
            }
            if self.population() == 0 {
                info!(tick = self.tick, "Every organism has died");
                break;
            }
        }

        let census = self.census();
        self.emit_census(&census);
        Ok(census)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &EcosystemConfig {
        &self.config
    }

    pub fn grid(&self) -> &SpatialGrid {
        self.biotope.grid()
    }

    pub fn records(&self) -> &VitalRecords {
        self.biotope.records()
    }

    pub(crate) fn biotope(&self) -> &Biotope {
        &self.biotope
    }

    pub(crate) fn rng(&self) -> &ChaCha8Rng {
        &self.rng
    }

    pub fn population(&self) -> usize {
        self.biotope.population()
    }

    /// Species on every occupied cell, in position order
    pub fn occupancy(&self) -> impl Iterator<Item = (Position, Species)> + '_ {
        self.biotope
            .grid()
            .occupants()
            .filter_map(|(pos, id)| self.biotope.get(id).map(|organism| (pos, organism.species)))
    }

    /// Living organisms in position order
    fn living(&self) -> impl Iterator<Item = &Organism> + '_ {
        self.biotope
            .grid()
            .occupants()
            .filter_map(|(_, id)| self.biotope.get(id))
    }

    pub fn organism_at(&self, pos: Position) -> Option<&Organism> {
        self.biotope
            .grid()
            .occupant(pos)
            .and_then(|id| self.biotope.get(id))
    }

    pub fn free_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.biotope.grid().free_cells()
    }

    pub fn census(&self) -> Census {
        let mut census = Census::new(self.tick);
        for organism in self.living() {
            census.add(organism.species, organism.energy, organism.age);
        }
        census
    }

    /// Log a census together with gauges for each species
    pub fn emit_census(&self, census: &Census) {
        let records = self.records();

        info!(
            event = "population_census",
            tick = census.tick,
            total_population = census.total(),
            plants = census.population.plant,
            herbivores = census.population.herbivore,
            carnivores = census.population.carnivore,
            total_births = records.total_births(),
            total_deaths = records.total_deaths(),
            "Population census"
        );

        for species in Species::ALL {
            event!(
                Level::INFO,
                gauge_name = "population",
                gauge_value = *census.population.get(species),
                species = %species,
                mean_energy = census.mean_energy(species),
                mean_age = census.mean_age(species),
                tick = census.tick,
                "Population gauge"
            );
        }
    }
}

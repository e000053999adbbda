//! Speciated populations and their generational evolution.
//!
//! Genomes live inside [`Species`]; a generation is scored,
//! either sequentially with [`Population::evaluate_fitness`]
//! or in parallel with [`Population::epoch`], and then
//! replaced by the offspring of its fittest members.
mod config;
mod epoch;
mod errors;
pub mod logging;
mod offspring_factory;
mod species;

use crate::{Genome, PopulationInnovations};
pub use config::PopulationConfig;
pub use epoch::*;
pub use errors::*;
use offspring_factory::OffspringFactory;
pub use species::{Species, SpeciesID};

use ahash::RandomState;
use rand::Rng;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;

/// A speciated collection of genomes.
///
/// The _population index_ of a genome is its position
/// in [`Population::genomes`], which walks species in
/// order and each species' members in order. Structural
/// innovations are numbered through the population's
/// [`PopulationInnovations`], which is rebuilt from the
/// genomes themselves after deserialization.
#[derive(Serialize, Deserialize)]
#[serde(bound(
    serialize = "C: Serialize, G: Serialize",
    deserialize = "C: Deserialize<'de>, G: Deserialize<'de>"
))]
pub struct Population<C, G> {
    species: Vec<Species<G>>,
    #[serde(skip, default = "PopulationInnovations::new")]
    innovations: PopulationInnovations<G>,
    generation: usize,
    /// Generations in which at least one species was founded.
    historical_species_count: usize,
    population_config: PopulationConfig,
    genetic_config: C,
}

/// A species `SpeciesID(0, 0)` of `count` freshly generated genomes.
fn random_species<C, G>(count: usize, genetic_config: &C) -> Species<G>
where
    G: Genome<Config = C> + Clone,
{
    let mut species = Species::new(SpeciesID(0, 0), G::new(genetic_config));
    for _ in 1..count {
        species.add_genome(G::new(genetic_config));
    }
    species
}

impl<C, G> Population<C, G>
where
    G: Genome<Config = C> + Clone,
{
    /// Creates a population of [`size`] random genomes,
    /// all in a single species.
    ///
    /// `genetic_config` is only ever handed to `G`.
    ///
    /// [`size`]: PopulationConfig::size
    pub fn new(population_config: PopulationConfig, genetic_config: C) -> Population<C, G> {
        let founders = random_species(population_config.size.get(), &genetic_config);
        Population {
            species: vec![founders],
            innovations: PopulationInnovations::new(),
            generation: 0,
            historical_species_count: 1,
            population_config,
            genetic_config,
        }
    }

    /// Creates a population from groups of seed genomes.
    ///
    /// Each non-empty group becomes a species, led by its first
    /// genome, in the order given. Any room left up to [`size`]
    /// is filled by random genomes, in a species placed first.
    ///
    /// Returns `None` if there are more seeds than [`size`] or if
    /// some seed does not [conform] to `genetic_config`.
    ///
    /// # Examples
    /// ```
    /// use parneat::{Genome, Population, PopulationConfig};
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let genetic_config = GeneticConfig::zero();
    /// let seed = || NNGenome::new(&genetic_config);
    /// let population_config = PopulationConfig {
    ///     size: std::num::NonZeroUsize::new(100).unwrap(),
    ///     ..PopulationConfig::zero()
    /// };
    ///
    /// let seeds = vec![vec![seed(), seed()], vec![seed()]];
    /// let population = Population::new_seeded(seeds, population_config, genetic_config.clone())
    ///     .unwrap();
    /// let sizes: Vec<_> = population.species().map(|s| s.genomes().count()).collect();
    /// assert_eq!(sizes, [97, 2, 1]);
    /// ```
    ///
    /// [`size`]: PopulationConfig::size
    /// [conform]: Genome::conforms_to
    pub fn new_seeded(
        seeds: Vec<Vec<G>>,
        population_config: PopulationConfig,
        genetic_config: C,
    ) -> Option<Population<C, G>> {
        let seed_count: usize = seeds.iter().map(Vec::len).sum();
        let random_count = population_config.size.get().checked_sub(seed_count)?;
        if seeds.iter().flatten().any(|g| !g.conforms_to(&genetic_config)) {
            return None;
        }

        let mut species = Vec::with_capacity(seeds.len() + 1);
        if random_count > 0 {
            species.push(random_species(random_count, &genetic_config));
        }
        let groups = seeds.into_iter().filter(|group| !group.is_empty());
        for (ordinal, group) in groups.enumerate() {
            let mut group = group.into_iter();
            if let Some(leader) = group.next() {
                let mut seeded = Species::new(SpeciesID(0, ordinal + 1), leader);
                group.for_each(|g| seeded.add_genome(g));
                species.push(seeded);
            }
        }

        Some(Population {
            historical_species_count: species.len(),
            species,
            innovations: PopulationInnovations::new(),
            generation: 0,
            population_config,
            genetic_config,
        })
    }

    /// Scores every genome with `fitness`, one at a time
    /// and in population order.
    ///
    /// [`Population::epoch`] scores genomes in parallel
    /// and keeps track of the best of them.
    ///
    /// # Panics
    /// Panics if `fitness` returns a negative value.
    ///
    /// # Examples
    /// ```
    /// use parneat::{Genome, Population, PopulationConfig};
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    /// use parneat_nn::networks::FunctionApproximatorNetwork;
    ///
    /// let mut population = Population::<_, NNGenome>::new(
    ///     PopulationConfig::zero(),
    ///     GeneticConfig::zero(),
    /// );
    ///
    /// // Reward outputs close to 0.
    /// population.evaluate_fitness(|g| {
    ///     let mut network = FunctionApproximatorNetwork::<1>::from(g);
    ///     (1.0 - network.evaluate_at(&[1.0])[0]).powi(2)
    /// });
    /// assert_eq!(population.champion().fitness(), 1.0);
    /// ```
    pub fn evaluate_fitness<F>(&mut self, mut fitness: F)
    where
        F: FnMut(&G) -> f32,
    {
        for genome in self.genomes_mut() {
            let score = fitness(&*genome);
            assert!(score >= 0.0, "fitness function returned {}", score);
            genome.set_fitness(score);
        }
    }

    /// Replaces the scored generation with its offspring.
    ///
    /// Each species is allotted offspring in proportion to
    /// its [adjusted fitness], less any stagnation penalty.
    /// Its [elite] is copied unchanged and its [survivors]
    /// are mated, in parallel, into the rest. Structural
    /// innovations proposed while mating are resolved once
    /// every child is born, so that equal innovations share
    /// their numbers. Children then stay in the species they
    /// were born into or, with [`adoption_rate`] chance, move
    /// to the first species close enough to take them.
    ///
    /// # Panics
    /// Panics if a species is allotted more offspring than its
    /// elite covers but has no survivors to mate.
    ///
    /// # Errors
    /// Fails, leaving the population untouched, if the
    /// population's total fitness is zero.
    ///
    /// # Examples
    /// ```
    /// use parneat::{Population, PopulationConfig};
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let mut population = Population::<_, NNGenome>::new(
    ///     PopulationConfig {
    ///         size: std::num::NonZeroUsize::new(10).unwrap(),
    ///         survival_threshold: 1.0,
    ///         ..PopulationConfig::zero()
    ///     },
    ///     GeneticConfig::zero(),
    /// );
    ///
    /// population.evaluate_fitness(|_| 1.0);
    /// population.evolve().unwrap();
    /// assert_eq!(population.generation(), 1);
    /// assert_eq!(population.size(), 10);
    /// ```
    ///
    /// [adjusted fitness]: Species::adjusted_fitness
    /// [elite]: PopulationConfig::elitism
    /// [survivors]: PopulationConfig::survival_threshold
    /// [`adoption_rate`]: PopulationConfig::adoption_rate
    pub fn evolve(&mut self) -> Result<(), EvolutionError>
    where
        G: Send + Sync,
        C: Sync,
    {
        let allotted_offspring = self.allot_offspring()?;
        for species in &mut self.species {
            species.update_fitness();
        }
        self.generate_offspring(&allotted_offspring);
        self.respeciate_all();
        self.species.retain(|s| !s.members.is_empty());
        self.species.sort_by_key(Species::id);
        self.generation += 1;
        Ok(())
    }

    /// Offspring per species, summing to the population size.
    fn allot_offspring(&self) -> Result<Vec<usize>, EvolutionError> {
        let shares: Vec<f32> = self
            .species
            .iter()
            .map(|s| {
                s.adjusted_fitness() * self.population_config.stagnation_factor(s.time_stagnated())
            })
            .collect();
        let total: f32 = shares.iter().sum();
        if total == 0.0 {
            return Err(EvolutionError::DegeneratePopulation);
        }

        let size = self.population_config.size.get() as f32;
        let quotas: Vec<f32> = shares.iter().map(|share| share / total * size).collect();
        Ok(round_retain_sum(&quotas))
    }

    /// Mates the next generation and files each
    /// child under the species it was born into.
    fn generate_offspring(&mut self, allotted_offspring: &[usize])
    where
        G: Send + Sync,
        C: Sync,
    {
        for species in &mut self.species {
            species.sort_by_decreasing_fitness();
        }
        self.seed_innovations();

        let (mut offspring, birth_species) = OffspringFactory::new(
            &self.species,
            &self.innovations,
            &self.genetic_config,
            &self.population_config,
        )
        .generate_offspring(allotted_offspring);

        let resolved = self.innovations.apply(&mut offspring);
        log::debug!(
            "generation {}: {} offspring, {} structural innovations",
            self.generation,
            offspring.len(),
            resolved
        );

        let positions: HashMap<SpeciesID, usize, RandomState> = self
            .species
            .iter()
            .enumerate()
            .map(|(position, s)| (s.id(), position))
            .collect();
        for species in &mut self.species {
            species.members.clear();
        }
        for (child, species_id) in offspring.into_iter().zip(birth_species) {
            // Every child is born into a parent's species.
            self.species[positions[&species_id]].members.push(child);
        }
    }

    /// Starts the registry above every node id and
    /// innovation number held by members or representatives.
    fn seed_innovations(&mut self) {
        let start = (self.innovations.node_id(), self.innovations.innovation_num());
        let (node_id, innov_num) = self
            .species
            .iter()
            .flat_map(|s| s.members.iter().chain([&s.representative]))
            .map(G::innovation_bounds)
            .fold(start, |(node_id, innov_num), (n, i)| {
                (node_id.max(n), innov_num.max(i))
            });
        self.innovations.init(node_id, innov_num);
    }

    /// Moves adopted children too far from their species'
    /// representative to the first species close enough,
    /// founding a new species when none is.
    fn respeciate_all(&mut self) {
        let founding_generation = self.historical_species_count;
        let mut founded = 0;
        for genome in self.take_adoptees() {
            let home = self.species.iter_mut().find(|s| {
                s.genetic_distance(&genome, &self.genetic_config)
                    < self.population_config.distance_threshold
            });
            match home {
                Some(species) => species.add_genome(genome),
                None => {
                    let id = SpeciesID(founding_generation, founded);
                    self.species.push(Species::new(id, genome));
                    founded += 1;
                }
            }
        }
        if founded > 0 {
            self.historical_species_count += 1;
        }
    }

    /// Removes the members that are both incompatible with
    /// their species and picked for adoption.
    fn take_adoptees(&mut self) -> Vec<G> {
        let mut rng = rand::thread_rng();
        let mut adoptees = vec![];
        for species in &mut self.species {
            let members = std::mem::take(&mut species.members);
            for genome in members {
                let adopted = rng.gen::<f32>() < self.population_config.adoption_rate
                    && species.genetic_distance(&genome, &self.genetic_config)
                        >= self.population_config.distance_threshold;
                if adopted {
                    adoptees.push(genome);
                } else {
                    species.members.push(genome);
                }
            }
        }
        adoptees
    }

    /// Replaces the population with a freshly generated one,
    /// for instance after evolution fails on a population
    /// whose fitness is all zero.
    pub fn reset(&mut self)
    where
        C: Clone,
    {
        *self = Population::new(self.population_config.clone(), self.genetic_config.clone());
    }

    /// Returns the fittest genome.
    ///
    /// # Examples
    /// ```
    /// use parneat::{Genome, Population, PopulationConfig};
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let mut population = Population::<_, NNGenome>::new(
    ///     PopulationConfig {
    ///         size: std::num::NonZeroUsize::new(20).unwrap(),
    ///         ..PopulationConfig::zero()
    ///     },
    ///     GeneticConfig::zero(),
    /// );
    ///
    /// let mut next = 0.0;
    /// population.evaluate_fitness(move |_| {
    ///     next += 10.0;
    ///     next
    /// });
    /// assert_eq!(population.champion().fitness(), 200.0);
    /// ```
    pub fn champion(&self) -> &G {
        self.genomes()
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
            .unwrap_or_else(|| panic!("empty population has no champion"))
    }

    /// Iterates genomes in population order.
    pub fn genomes(&self) -> impl Iterator<Item = &G> {
        self.species.iter().flat_map(|s| &s.members)
    }

    pub(crate) fn genomes_mut(&mut self) -> impl Iterator<Item = &mut G> {
        self.species.iter_mut().flat_map(|s| &mut s.members)
    }

    /// Returns the genome at population index `index`.
    pub fn get(&self, index: usize) -> Option<&G> {
        self.genomes().nth(index)
    }

    pub fn size(&self) -> usize {
        self.species.iter().map(|s| s.members.len()).sum()
    }

    /// Iterates species by increasing [`SpeciesID`].
    pub fn species(&self) -> impl Iterator<Item = &Species<G>> {
        self.species.iter()
    }

    /// Number of generations evolved so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// The population's innovation registry. Between generations
    /// it holds no proposals, and its counters are the highest
    /// node id and innovation number handed out so far.
    pub fn innovations(&self) -> &PopulationInnovations<G> {
        &self.innovations
    }
}

/// Rounds non-negative `quotas` to whole numbers with the
/// same (rounded) total, giving the units lost to flooring
/// to the largest fractional parts. Ties go to the earliest.
fn round_retain_sum(quotas: &[f32]) -> Vec<usize> {
    let total = quotas.iter().sum::<f32>().round() as usize;
    let mut rounded: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();
    let shortfall = total.saturating_sub(rounded.iter().sum());

    let mut by_fraction: Vec<usize> = (0..quotas.len()).collect();
    by_fraction.sort_by(|&a, &b| quotas[b].fract().total_cmp(&quotas[a].fract()));
    for &i in by_fraction.iter().take(shortfall) {
        rounded[i] += 1;
    }
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Scripted;

    use std::num::NonZeroUsize;

    fn config(size: usize) -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(size).unwrap(),
            distance_threshold: 10.0,
            elitism: 1,
            survival_threshold: 0.5,
            sexual_reproduction_chance: 0.5,
            stagnation_threshold: NonZeroUsize::new(15).unwrap(),
            ..PopulationConfig::zero()
        }
    }

    fn seeded(values: &[f32]) -> Population<(), Scripted> {
        let seeds = values.iter().copied().map(Scripted::with_value).collect();
        Population::new_seeded(vec![seeds], config(values.len()), ()).unwrap()
    }

    #[test]
    fn rounding_keeps_the_total() {
        let quotas = [5.2, 9.5, 2.8, 1.3, 2.2, 2.7, 6.3, 1.0000001, 0.9999999];
        let rounded = round_retain_sum(&quotas);
        assert_eq!(rounded, [5, 10, 3, 1, 2, 3, 6, 1, 1]);
        assert_eq!(rounded.iter().sum::<usize>(), 32);
    }

    #[test]
    fn rounding_breaks_ties_by_position() {
        assert_eq!(round_retain_sum(&[0.5, 0.5, 1.0]), [1, 0, 1]);
        assert_eq!(round_retain_sum(&[]), Vec::<usize>::new());
    }

    #[test]
    fn seeding_keeps_seed_order() {
        let population = seeded(&[0.5, 3.0, 1.0]);
        assert_eq!(population.species().count(), 1);
        let values: Vec<f32> = population.genomes().map(|g| g.value).collect();
        assert_eq!(values, [0.5, 3.0, 1.0]);
        assert_eq!(population.get(1).map(|g| g.value), Some(3.0));
        assert_eq!(population.size(), 3);
    }

    #[test]
    fn seeding_fills_remaining_room_first() {
        let seeds = vec![vec![Scripted::with_value(4.0)], vec![], vec![Scripted::with_value(5.0)]];
        let population = Population::new_seeded(seeds, config(5), ()).unwrap();
        let ids: Vec<_> = population.species().map(Species::id).collect();
        assert_eq!(ids, [SpeciesID(0, 0), SpeciesID(0, 1), SpeciesID(0, 2)]);
        let values: Vec<f32> = population.genomes().map(|g| g.value).collect();
        assert_eq!(values, [1.0, 1.0, 1.0, 4.0, 5.0]);
    }

    #[test]
    fn seeding_rejects_nonconforming_or_oversized_seeds() {
        let nonconforming = vec![vec![Scripted::with_value(-1.0)]];
        assert!(Population::new_seeded(nonconforming, config(4), ()).is_none());
        let oversized = vec![vec![Scripted::with_value(1.0); 5]];
        assert!(Population::<(), Scripted>::new_seeded(oversized, config(4), ()).is_none());
    }

    #[test]
    fn evolve_keeps_size_and_shares_innovations() {
        let mut population = seeded(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        population.evaluate_fitness(|g| g.value);
        population.evolve().unwrap();

        assert_eq!(population.generation(), 1);
        assert_eq!(population.size(), 8);
        assert!(population.innovations().is_empty());

        // Every mated child proposed the same link.
        let genes: Vec<_> = population.genomes().flat_map(|g| g.genes.iter()).collect();
        assert!(!genes.is_empty());
        assert!(genes.iter().all(|&&gene| gene == 1));
        assert_eq!(population.innovations().innovation_num(), 1);
    }

    #[test]
    fn elites_and_matings_fill_the_allotment() {
        let values: Vec<f32> = (1..=10).map(|v| v as f32).collect();
        let mut population = seeded(&values);
        population.population_config.elitism = 2;
        population.evaluate_fitness(|g| g.value);
        population.evolve().unwrap();

        assert_eq!(population.size(), 10);
        assert_eq!(population.species().count(), 1);
        let (elites, mated): (Vec<&Scripted>, Vec<&Scripted>) =
            population.genomes().partition(|g| g.genes.is_empty());
        let mut elite_values: Vec<f32> = elites.iter().map(|g| g.value).collect();
        elite_values.sort_by(f32::total_cmp);
        assert_eq!(elite_values, [9.0, 10.0]);
        assert_eq!(mated.len(), 8);
        assert!(mated.iter().all(|g| g.genes == [1]));
    }

    #[test]
    fn distant_children_found_new_species() {
        let mut population = seeded(&[1.0, 50.0, 100.0, 150.0]);
        population.population_config.adoption_rate = 1.0;
        population.population_config.survival_threshold = 1.0;
        population.evaluate_fitness(|g| g.value);
        population.evolve().unwrap();

        for species in population.species() {
            for genome in species.genomes() {
                assert!(species.genetic_distance(genome, &()) < 10.0);
            }
        }
        assert!(population.species().all(|s| s.id().0 <= 1));
        assert_eq!(population.size(), 4);
    }

    #[test]
    fn innovation_numbers_grow_across_generations() {
        let mut population = seeded(&[1.0, 2.0, 3.0, 4.0]);
        for generation in 1..=3 {
            population.evaluate_fitness(|g| g.value);
            population.evolve().unwrap();
            assert_eq!(population.innovations().innovation_num(), generation);
        }
    }

    #[test]
    fn degenerate_population_does_not_evolve() {
        let mut population = seeded(&[1.0, 2.0]);
        population.evaluate_fitness(|_| 0.0);
        assert!(matches!(
            population.evolve(),
            Err(EvolutionError::DegeneratePopulation)
        ));
        assert_eq!(population.generation(), 0);
    }

    #[test]
    fn reset_starts_over() {
        let mut population = seeded(&[1.0, 2.0]);
        population.evaluate_fitness(|g| g.value);
        population.evolve().unwrap();
        population.reset();
        assert_eq!(population.generation(), 0);
        assert_eq!(population.species().count(), 1);
        assert!(population.genomes().all(|g| g.value == 1.0 && g.genes.is_empty()));
    }

    #[test]
    fn deserialized_population_reseeds_registry() {
        let mut population = seeded(&[1.0, 2.0, 3.0, 4.0]);
        population.evaluate_fitness(|g| g.value);
        population.evolve().unwrap();

        let json = serde_json::to_string(&population).unwrap();
        let mut restored: Population<(), Scripted> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.innovations().innovation_num(), 0);
        assert_eq!(restored.size(), population.size());

        restored.evaluate_fitness(|g| g.value);
        restored.evolve().unwrap();
        // Fresh numbers are allocated above those already in use.
        assert_eq!(restored.innovations().innovation_num(), 2);
    }
}

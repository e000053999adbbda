use crate::populations::PopulationConfig;
use crate::Genome;

use serde::{Deserialize, Serialize};

/// Identifies a species by the generation it appeared
/// in and its ordinal among the species that appeared
/// in that same generation.
///
/// The third species founded in generation 5 is `SpeciesID(5, 2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesID(pub usize, pub usize);

/// A group of genomes within [`distance_threshold`] of
/// its founding genome, the _representative_.
///
/// A species that goes [`stagnation_threshold`] generations
/// without raising its best fitness receives fewer offspring.
///
/// [`distance_threshold`]: PopulationConfig::distance_threshold
/// [`stagnation_threshold`]: PopulationConfig::stagnation_threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species<G> {
    id: SpeciesID,
    pub(super) members: Vec<G>,
    pub(super) representative: G,
    stagnant_generations: usize,
    best_fitness: f32,
}

impl<G: Genome + Clone> Species<G> {
    /// Founds a species, with `representative`
    /// as its first member.
    ///
    /// # Examples
    /// ```
    /// use parneat::{Genome, Species, SpeciesID};
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let species = Species::new(SpeciesID(1, 0), NNGenome::new(&GeneticConfig::zero()));
    /// assert_eq!(species.genomes().count(), 1);
    /// assert_eq!(species.time_stagnated(), 0);
    /// ```
    pub fn new(id: SpeciesID, representative: G) -> Species<G> {
        Species {
            id,
            members: vec![representative.clone()],
            representative,
            stagnant_generations: 0,
            best_fitness: 0.0,
        }
    }

    pub fn id(&self) -> SpeciesID {
        self.id
    }

    pub fn representative(&self) -> &G {
        &self.representative
    }

    /// Distance from the representative to `other`.
    pub fn genetic_distance<C>(&self, other: &G, config: &C) -> f32
    where
        G: Genome<Config = C>,
    {
        G::genetic_distance(&self.representative, other, config)
    }

    pub fn add_genome(&mut self, genome: G) {
        self.members.push(genome);
    }

    /// Records the generation's best fitness, counting
    /// one more stagnant generation unless it is a new high.
    pub(super) fn update_fitness(&mut self) {
        let best = self.members.iter().map(G::fitness).fold(0.0, f32::max);
        if best > self.best_fitness {
            self.best_fitness = best;
            self.stagnant_generations = 0;
        } else {
            self.stagnant_generations += 1;
        }
    }

    /// Mean fitness of the members, which shares a
    /// species' score among everyone in it.
    ///
    /// # Examples
    /// ```
    /// use parneat::{Genome, Species, SpeciesID};
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut species = Species::new(SpeciesID(1, 0), NNGenome::new(&config));
    /// for fitness in [20.0, 30.0] {
    ///     let mut genome = NNGenome::new(&config);
    ///     genome.set_fitness(fitness);
    ///     species.add_genome(genome);
    /// }
    ///
    /// // The representative has not been scored.
    /// assert_eq!(species.adjusted_fitness(), 50.0 / 3.0);
    /// ```
    pub fn adjusted_fitness(&self) -> f32 {
        let total: f32 = self.members.iter().map(G::fitness).sum();
        total / self.members.len() as f32
    }

    /// Generations since the best fitness last rose.
    pub fn time_stagnated(&self) -> usize {
        self.stagnant_generations
    }

    pub fn genomes(&self) -> impl Iterator<Item = &G> {
        self.members.iter()
    }

    /// Returns the fittest member.
    ///
    /// # Panics
    /// Panics if the species has no members.
    pub fn champion(&self) -> &G {
        self.members
            .iter()
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
            .unwrap_or_else(|| panic!("species {:?} has no members", self.id))
    }

    /// Members copied unchanged into the next generation.
    /// Assumes members are sorted fittest first.
    pub(super) fn elite(&self, config: &PopulationConfig) -> &[G] {
        &self.members[..config.elite_count(self.members.len())]
    }

    /// Members allowed to parent offspring.
    /// Assumes members are sorted fittest first.
    pub(super) fn survivors(&self, config: &PopulationConfig) -> &[G] {
        let count = config.survivor_count(self.members.len());
        &self.members[..count.min(self.members.len())]
    }

    pub(super) fn sort_by_decreasing_fitness(&mut self) {
        self.members.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Scripted;

    fn scored(fitness: f32) -> Scripted {
        let mut genome = Scripted::with_value(fitness);
        genome.set_fitness(fitness);
        genome
    }

    #[test]
    fn stagnation_resets_on_improvement() {
        let mut species = Species::new(SpeciesID(0, 0), scored(1.0));
        species.update_fitness();
        assert_eq!(species.time_stagnated(), 0);

        species.update_fitness();
        species.update_fitness();
        assert_eq!(species.time_stagnated(), 2);

        species.members[0].set_fitness(0.5);
        species.update_fitness();
        assert_eq!(species.time_stagnated(), 3);

        species.members[0].set_fitness(1.5);
        species.update_fitness();
        assert_eq!(species.time_stagnated(), 0);
    }

    #[test]
    fn elite_and_survivors_come_from_the_top() {
        let mut species = Species::new(SpeciesID(0, 0), scored(0.0));
        for fitness in 1..10 {
            species.add_genome(scored(fitness as f32));
        }
        species.sort_by_decreasing_fitness();
        let config = PopulationConfig {
            elitism: 3,
            survival_threshold: 0.25,
            ..PopulationConfig::zero()
        };

        let fitnesses =
            |genomes: &[Scripted]| genomes.iter().map(|g| g.fitness).collect::<Vec<_>>();
        assert_eq!(fitnesses(species.elite(&config)), [9.0, 8.0, 7.0]);
        assert_eq!(fitnesses(species.survivors(&config)), [9.0, 8.0, 7.0]);
        assert_eq!(species.champion().fitness, 9.0);

        let config = PopulationConfig {
            elitism: 20,
            survival_threshold: 1.0,
            ..config
        };
        assert_eq!(species.elite(&config).len(), 10);
        assert_eq!(species.survivors(&config).len(), 10);
    }

    #[test]
    fn distance_is_measured_from_the_representative() {
        let mut species = Species::new(SpeciesID(0, 0), Scripted::with_value(2.0));
        species.add_genome(Scripted::with_value(10.0));
        assert_eq!(species.genetic_distance(&Scripted::with_value(5.0), &()), 3.0);
    }
}

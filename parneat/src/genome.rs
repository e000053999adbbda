use crate::{InnovationNumber, InnovationSink, NodeId};

/// What a [`Population`] needs from the genomes it evolves.
///
/// [`Population`]: crate::Population
pub trait Genome: Sized {
    type Config;

    /// A genome for the first generation.
    fn new(config: &Self::Config) -> Self;

    /// Whether the genome fits `config`, e.g. has the
    /// configured inputs and outputs. Seeded populations
    /// reject genomes that do not.
    fn conforms_to(&self, config: &Self::Config) -> bool;

    /// Dissimilarity of two genomes, used to sort them into species.
    fn genetic_distance(first: &Self, second: &Self, config: &Self::Config) -> f32;

    /// Breeds a child from two parents, which may be the same genome.
    ///
    /// Structural mutations of the child go through `innovations`
    /// rather than being applied on the spot. They are committed
    /// to the child once every proposal of the generation has
    /// been resolved.
    fn mate(
        parent1: &Self,
        parent2: &Self,
        innovations: &InnovationSink<'_, Self>,
        config: &Self::Config,
    ) -> Self;

    /// Fitness must be non-negative.
    fn set_fitness(&mut self, fitness: f32);

    fn fitness(&self) -> f32;

    /// Highest node id and highest innovation number the
    /// genome uses or reserves. The registry is seeded past
    /// these every generation.
    fn innovation_bounds(&self) -> (NodeId, InnovationNumber);

    /// Expressed genes only.
    fn gene_count(&self) -> usize;

    fn node_count(&self) -> usize;
}

//! A parallel implementation of NeuroEvolution of Augmenting Topologies,
//! following the 2002 paper: <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//!
//! Two pieces make up the core of the crate:
//!
//! - [`PopulationInnovations`], a per-generation registry that gives every
//!   structural mutation (a new node or a new link) a single historical
//!   identity, no matter how many individuals discovered it independently
//!   or in which order they were mutated.
//! - [`Population::epoch`], a generational driver that scores every genome
//!   in parallel, keeps track of the best genome and of any genome solving
//!   the task, and then evolves the population.
//!
//! Genomic structure is left to implementors of the [`Genome`] trait.
//! A neural network-based genome, as in the original algorithm, is supplied
//! by the `parneat-nn` crate.
//!
//! # Example usage: Evolution of XOR function approximator, using `parneat-nn`
//! ```
//! use parneat::{Evaluation, Evaluator, FitnessTracker, Population, PopulationConfig, Trace};
//! use parneat_nn::{
//!     genomics::{ActivationType, GeneticConfig, NNGenome},
//!     networks::FunctionApproximatorNetwork,
//! };
//! use std::num::NonZeroUsize;
//!
//! // Answers this close to the target count as exact.
//! const TOLERANCE: f32 = 0.3;
//!
//! struct Xor;
//!
//! impl Evaluator<NNGenome> for Xor {
//!     fn trace_len(&self) -> usize {
//!         4
//!     }
//!
//!     fn evaluate(&self, genome: &NNGenome, trace: Trace<'_>) -> Evaluation {
//!         let mut network = FunctionApproximatorNetwork::<1>::from(genome);
//!         let values = [
//!             ([1.0, 0.0, 0.0], 0.0),
//!             ([1.0, 0.0, 1.0], 1.0),
//!             ([1.0, 1.0, 0.0], 1.0),
//!             ([1.0, 1.0, 1.0], 0.0),
//!         ];
//!
//!         for (i, (input, target)) in values.iter().enumerate() {
//!             let answer = network.evaluate_at(input)[0];
//!             let miss = (answer - target).abs();
//!             trace.activations[i] = answer;
//!             trace.errors[i] = if miss < TOLERANCE { 0.0 } else { miss };
//!         }
//!
//!         let error: f32 = trace.errors.iter().sum();
//!         Evaluation {
//!             fitness: (4.0 - error).powi(2),
//!             error,
//!             winner: error == 0.0,
//!         }
//!     }
//! }
//!
//! let genetic_config = GeneticConfig {
//!     input_count: NonZeroUsize::new(3).unwrap(),
//!     output_count: NonZeroUsize::new(1).unwrap(),
//!     activation_types: vec![ActivationType::Sigmoid],
//!     output_activation_types: vec![ActivationType::Sigmoid],
//!     child_mutation_chance: 0.65,
//!     mate_by_averaging_chance: 0.4,
//!     suppression_reset_chance: 1.0,
//!     initial_expression_chance: 1.0,
//!     weight_bound: 5.0,
//!     weight_reset_chance: 0.2,
//!     weight_nudge_chance: 0.9,
//!     weight_mutation_power: 2.5,
//!     node_addition_mutation_chance: 0.03,
//!     gene_addition_mutation_chance: 0.05,
//!     max_gene_addition_mutation_attempts: 20,
//!     recursion_chance: 0.0,
//!     excess_gene_factor: 1.0,
//!     disjoint_gene_factor: 1.0,
//!     common_weight_factor: 0.4,
//!     ..GeneticConfig::zero()
//! };
//!
//! let population_config = PopulationConfig {
//!     size: NonZeroUsize::new(150).unwrap(),
//!     distance_threshold: 3.0,
//!     elitism: 1,
//!     survival_threshold: 0.2,
//!     sexual_reproduction_chance: 0.6,
//!     adoption_rate: 1.0,
//!     interspecies_mating_chance: 0.001,
//!     stagnation_threshold: NonZeroUsize::new(15).unwrap(),
//!     stagnation_penalty: 1.0,
//! };
//!
//! let mut population = Population::<_, NNGenome>::new(population_config, genetic_config);
//! let mut tracker = FitnessTracker::new();
//! for _ in 0..100 {
//!     match population.epoch(&Xor, &mut tracker) {
//!         Ok(outcome) if outcome.success() => {
//!             println!("Solution found in generation {}", outcome.generation);
//!             break;
//!         }
//!         Ok(_) => {}
//!         Err(e) => {
//!             eprintln!("evolution stopped: {}", e);
//!             break;
//!         }
//!     }
//! }
//! ```

mod genome;
mod innovations;
mod populations;
#[cfg(test)]
mod testing;

pub use genome::*;
pub use innovations::*;
pub use populations::*;

/// Historical marking of a gene. Genes with the same
/// number stem from the same structural mutation, and
/// are aligned with each other when genomes are compared.
pub type InnovationNumber = usize;

/// Identifier type for nodes. Nodes created by
/// the same split of the same gene in the same
/// generation share their identifier.
pub type NodeId = usize;

//! # parneat-nn
//! A neural network-based implementation of the `parneat` crate's [`Genome`] trait.
//!
//! Provides a [`NNGenome`] type usable in `parneat` `Population`s, as well as two
//! neural network implementations which can be generated from an [`NNGenome`]:
//! - [`RealTimeNetwork`]: best suited for real-time control tasks, with new inputs
//!   set for each activation, and multiple time-steps involved.
//! - [`FunctionApproximatorNetwork`]: best suited for more instantaneous
//!   single-output-per-input function approximation tasks.
//!
//! Structural mutations of an [`NNGenome`] go through the population's
//! [`PopulationInnovations`], so that every genome splitting the same gene
//! in the same generation obtains the same node and genes.
//!
//! [`Genome`]: parneat::Genome
//! [`PopulationInnovations`]: parneat::PopulationInnovations
//! [`NNGenome`]: crate::genomics::NNGenome
//! [`RealTimeNetwork`]: crate::networks::RealTimeNetwork
//! [`FunctionApproximatorNetwork`]: crate::networks::FunctionApproximatorNetwork
//!
//! # Example usage: shared innovations
//! ```
//! use parneat::{Genome, PopulationInnovations};
//! use parneat_nn::genomics::{GeneticConfig, NNGenome};
//!
//! let config = GeneticConfig {
//!     initial_expression_chance: 1.0,
//!     weight_bound: 1.0,
//!     ..GeneticConfig::zero()
//! };
//!
//! // Both genomes hold the single sensor-actuator gene,
//! // the only one a node mutation can split.
//! let mut genomes = vec![NNGenome::new(&config), NNGenome::new(&config)];
//! let (node_id, innov_num) = genomes[0].innovation_bounds();
//!
//! let mut innovations = PopulationInnovations::new();
//! innovations.init(node_id, innov_num);
//! for (i, genome) in genomes.iter_mut().enumerate() {
//!     genome.mutate_add_node(&innovations.sink(i), &config).unwrap();
//! }
//! assert_eq!(innovations.apply(&mut genomes), 1);
//!
//! let structure = |g: &NNGenome| {
//!     let mut genes: Vec<_> = g.genes().map(|g| (g.innovation(), g.endpoints())).collect();
//!     genes.sort_unstable();
//!     genes
//! };
//! assert_eq!(structure(&genomes[0]), structure(&genomes[1]));
//! ```

pub mod genomics;
pub mod networks;

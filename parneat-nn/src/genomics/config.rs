use crate::genomics::ActivationType;

use parneat::ConfigError;
use rand::Rng;
use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Parameters of [`NNGenome`] construction, mutation,
/// mating and comparison.
///
/// Chances are probabilities and must lie in [0, 1];
/// see [`validate`](GeneticConfig::validate).
///
/// [`NNGenome`]: crate::genomics::NNGenome
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Sensor nodes per genome.
    pub input_count: NonZeroUsize,
    /// Actuator nodes per genome.
    pub output_count: NonZeroUsize,
    /// Activations a new hidden node may take. The index of
    /// the chosen one is the node innovation's trait,
    /// [`Sigmoid`] is used when empty.
    ///
    /// [`Sigmoid`]: ActivationType::Sigmoid
    pub activation_types: Vec<ActivationType>,
    /// Activation of each actuator, by position.
    /// Actuators past the end of the list use [`Sigmoid`].
    ///
    /// [`Sigmoid`]: ActivationType::Sigmoid
    pub output_activation_types: Vec<ActivationType>,

    // Mating.
    /// Chance a child is mutated after mating.
    pub child_mutation_chance: f32,
    /// Chance a gene held by both parents gets the mean of
    /// their weights, rather than one parent's weight.
    pub mate_by_averaging_chance: f32,
    /// Chance a suppressed gene of a child is expressed again.
    pub suppression_reset_chance: f32,

    // Weights.
    /// Chance each sensor-actuator gene is present
    /// in a freshly generated genome.
    pub initial_expression_chance: f32,
    /// Weights are kept within ±`weight_bound`.
    pub weight_bound: f32,
    /// Chance a mutated weight is drawn anew.
    pub weight_reset_chance: f32,
    /// Chance a mutated weight, if not redrawn, is shifted.
    pub weight_nudge_chance: f32,
    /// Largest shift of a nudged weight. Should not
    /// exceed [`weight_bound`](GeneticConfig::weight_bound).
    pub weight_mutation_power: f32,

    // Structure.
    pub node_addition_mutation_chance: f32,
    pub gene_addition_mutation_chance: f32,
    pub node_deletion_mutation_chance: f32,
    pub gene_deletion_mutation_chance: f32,
    /// Node pairs tried by a gene addition before giving up.
    pub max_gene_addition_mutation_attempts: usize,
    /// Chance a gene addition looks for a recurrent link,
    /// a self-loop first.
    pub recursion_chance: f32,

    // Genetic distance.
    pub excess_gene_factor: f32,
    pub disjoint_gene_factor: f32,
    /// Factor of the mean weight difference of common genes.
    pub common_weight_factor: f32,
}

impl GeneticConfig {
    /// Returns a configuration with every numeric field at 0,
    /// empty lists, and single-node inputs and outputs.
    ///
    /// Nothing evolves under it; it fills in the
    /// fields a test or experiment does not use:
    /// ```
    /// use parneat_nn::genomics::GeneticConfig;
    ///
    /// let config = GeneticConfig {
    ///     recursion_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// assert_eq!(config.output_count.get(), 1);
    /// ```
    pub const fn zero() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::MIN,
            output_count: NonZeroUsize::MIN,
            activation_types: vec![],
            output_activation_types: vec![],
            child_mutation_chance: 0.0,
            mate_by_averaging_chance: 0.0,
            suppression_reset_chance: 0.0,
            initial_expression_chance: 0.0,
            weight_bound: 0.0,
            weight_reset_chance: 0.0,
            weight_nudge_chance: 0.0,
            weight_mutation_power: 0.0,
            node_addition_mutation_chance: 0.0,
            gene_addition_mutation_chance: 0.0,
            node_deletion_mutation_chance: 0.0,
            gene_deletion_mutation_chance: 0.0,
            max_gene_addition_mutation_attempts: 0,
            recursion_chance: 0.0,
            excess_gene_factor: 0.0,
            disjoint_gene_factor: 0.0,
            common_weight_factor: 0.0,
        }
    }

    /// Checks every chance, bound and factor, returning
    /// the first one found out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chances = [
            ("child_mutation_chance", self.child_mutation_chance),
            ("mate_by_averaging_chance", self.mate_by_averaging_chance),
            ("suppression_reset_chance", self.suppression_reset_chance),
            ("initial_expression_chance", self.initial_expression_chance),
            ("weight_reset_chance", self.weight_reset_chance),
            ("weight_nudge_chance", self.weight_nudge_chance),
            ("node_addition_mutation_chance", self.node_addition_mutation_chance),
            ("gene_addition_mutation_chance", self.gene_addition_mutation_chance),
            ("node_deletion_mutation_chance", self.node_deletion_mutation_chance),
            ("gene_deletion_mutation_chance", self.gene_deletion_mutation_chance),
            ("recursion_chance", self.recursion_chance),
        ];
        for (field, value) in chances {
            ConfigError::check_chance(field, value)?;
        }

        let magnitudes = [
            ("weight_bound", self.weight_bound),
            ("weight_mutation_power", self.weight_mutation_power),
            ("excess_gene_factor", self.excess_gene_factor),
            ("disjoint_gene_factor", self.disjoint_gene_factor),
            ("common_weight_factor", self.common_weight_factor),
        ];
        for (field, value) in magnitudes {
            ConfigError::check_non_negative(field, value)?;
        }
        Ok(())
    }

    /// Activation of the actuator at position `o`.
    pub(crate) fn output_activation(&self, o: usize) -> ActivationType {
        self.output_activation_types
            .get(o)
            .copied()
            .unwrap_or(ActivationType::Sigmoid)
    }

    /// Picks a hidden node activation, returning
    /// it along with its index as trait id.
    pub(crate) fn random_hidden_activation(&self, rng: &mut impl Rng) -> (usize, ActivationType) {
        if self.activation_types.is_empty() {
            return (0, ActivationType::Sigmoid);
        }
        let trait_id = rng.gen_range(0..self.activation_types.len());
        (trait_id, self.activation_types[trait_id])
    }
}

use crate::genomics::GeneticConfig;
use parneat::{InnovationNumber, NodeId};

use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

use std::fmt;

/// A weighted link between two nodes, identified
/// across the population by its innovation number.
///
/// A suppressed gene is inherited but does not become
/// a link of the genome's network.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Gene {
    innovation: InnovationNumber,
    link: (NodeId, NodeId),
    weight: f32,
    suppressed: bool,
}

impl Gene {
    /// An expressed gene linking `input` to `output`.
    ///
    /// # Examples
    /// ```
    /// use parneat_nn::genomics::Gene;
    ///
    /// let gene = Gene::new(42, 3, 9, 2.0);
    /// assert_eq!(gene.innovation(), 42);
    /// assert_eq!(gene.endpoints(), (3, 9));
    /// assert!(!gene.suppressed());
    /// ```
    pub fn new(innovation: InnovationNumber, input: NodeId, output: NodeId, weight: f32) -> Gene {
        Gene {
            innovation,
            link: (input, output),
            weight,
            suppressed: false,
        }
    }

    /// Uniform in `[-weight_bound, weight_bound]`.
    pub(crate) fn random_weight(config: &GeneticConfig) -> f32 {
        let bound = config.weight_bound.abs();
        thread_rng().gen_range(-bound..=bound)
    }

    /// Replaces the weight with one drawn uniformly
    /// from `[-weight_bound, weight_bound]`.
    pub fn randomize_weight(&mut self, config: &GeneticConfig) {
        self.weight = Self::random_weight(config);
    }

    /// Shifts the weight by up to [`weight_mutation_power`] either
    /// way, then clamps it to [`weight_bound`].
    ///
    /// [`weight_mutation_power`]: crate::genomics::GeneticConfig::weight_mutation_power
    /// [`weight_bound`]: crate::genomics::GeneticConfig::weight_bound
    ///
    /// # Examples
    /// ```
    /// use parneat_nn::genomics::{Gene, GeneticConfig};
    ///
    /// let config = GeneticConfig {
    ///     weight_mutation_power: 2.5,
    ///     weight_bound: 5.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut gene = Gene::new(42, 3, 9, 4.0);
    /// gene.nudge_weight(&config);
    ///
    /// assert!(gene.weight() >= 1.5);
    /// assert!(gene.weight() <= 5.0);
    /// ```
    pub fn nudge_weight(&mut self, config: &GeneticConfig) {
        let power = config.weight_mutation_power.abs();
        let bound = config.weight_bound.abs();
        let shift = thread_rng().gen_range(-power..=power);
        self.weight = (self.weight + shift).clamp(-bound, bound);
    }

    pub fn innovation(&self) -> InnovationNumber {
        self.innovation
    }

    pub fn input(&self) -> NodeId {
        self.link.0
    }

    pub fn output(&self) -> NodeId {
        self.link.1
    }

    /// `(input, output)`
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        self.link
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    pub fn suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn set_suppressed(&mut self, suppressed: bool) {
        self.suppressed = suppressed;
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (input, output) = self.link;
        let body = format!("{}[{}->{}, {:.3}]", self.innovation, input, output, self.weight);
        if self.suppressed {
            write!(f, "({})", body)
        } else {
            f.write_str(&body)
        }
    }
}

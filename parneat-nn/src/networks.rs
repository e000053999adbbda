//! Phenotypes of [`NNGenome`]s.
//!
//! Every expressed gene becomes a weighted link and every
//! genome node a network node; suppressed genes are left out.
//! [`RealTimeNetwork`] is stepped by hand, with new inputs
//! set between steps, and suits control and sequence tasks.
//! [`FunctionApproximatorNetwork`] settles on its own for
//! each input and suits one-shot evaluations.
//!
//! [`NNGenome`]: crate::genomics::NNGenome
mod function_approximator;

pub use function_approximator::FunctionApproximatorNetwork;

use crate::genomics::{ActivationType, NNGenome, NodeType};
use parneat::NodeId;

use ahash::RandomState;

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

/// A weighted link to the node at index `to`.
#[derive(Clone, Copy, PartialEq)]
pub(crate) struct Link {
    pub to: usize,
    pub weight: f32,
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-> {} ({:.6})", self.to, self.weight)
    }
}

/// A recurrent network advanced one step at a time.
///
/// A step sends every node's current level along its
/// outgoing links, then recomputes each non-sensor level
/// from what it received. A signal therefore crosses one
/// link per step, and cycles feed back a step late.
///
/// Nodes are indexed sensors first, then actuators, then
/// hidden nodes, each group by increasing node id.
#[derive(Clone, Debug)]
pub struct RealTimeNetwork {
    sensors: usize,
    actuators: usize,
    node_ids: Box<[NodeId]>,
    activations: Box<[ActivationType]>,
    levels: Box<[f32]>,
    sums: Box<[f32]>,
    /// Outgoing links of each node, by increasing innovation number.
    links: Box<[Box<[Link]>]>,
}

fn group_rank(node_type: NodeType) -> u8 {
    match node_type {
        NodeType::Sensor => 0,
        NodeType::Actuator => 1,
        NodeType::Neuron => 2,
    }
}

impl From<&NNGenome> for RealTimeNetwork {
    /// # Examples
    /// ```
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    /// use parneat_nn::networks::RealTimeNetwork;
    /// use std::num::NonZeroUsize;
    ///
    /// let genome = NNGenome::new(&GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 5.0,
    ///     ..GeneticConfig::zero()
    /// });
    ///
    /// let network = RealTimeNetwork::from(&genome);
    /// assert_eq!(network.input_count(), 3);
    /// assert_eq!(network.outputs(), [0.0, 0.0]);
    /// ```
    fn from(genome: &NNGenome) -> RealTimeNetwork {
        let mut nodes: Vec<_> = genome.nodes().collect();
        nodes.sort_unstable_by_key(|n| (group_rank(n.node_type()), n.id()));
        let count_of = |node_type| nodes.iter().filter(|n| n.node_type() == node_type).count();
        let (sensors, actuators) = (count_of(NodeType::Sensor), count_of(NodeType::Actuator));

        let index_of: HashMap<NodeId, usize, RandomState> =
            nodes.iter().enumerate().map(|(i, n)| (n.id(), i)).collect();
        let mut genes: Vec<_> = genome.genes().filter(|g| !g.suppressed()).collect();
        genes.sort_unstable_by_key(|g| g.innovation());
        let mut links = vec![vec![]; nodes.len()];
        for gene in genes {
            links[index_of[&gene.input()]].push(Link {
                to: index_of[&gene.output()],
                weight: gene.weight(),
            });
        }

        RealTimeNetwork {
            sensors,
            actuators,
            node_ids: nodes.iter().map(|n| n.id()).collect(),
            activations: nodes.iter().map(|n| n.activation_type()).collect(),
            levels: vec![0.0; nodes.len()].into(),
            sums: vec![0.0; nodes.len()].into(),
            links: links.into_iter().map(Vec::into_boxed_slice).collect(),
        }
    }
}

impl RealTimeNetwork {
    /// Advances the network by one step.
    ///
    /// # Examples
    /// ```
    /// use parneat_nn::genomics::{ActivationType, GeneticConfig, NNGenome};
    /// use parneat_nn::networks::RealTimeNetwork;
    /// use std::num::NonZeroUsize;
    ///
    /// let mut genome = NNGenome::new(&GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     output_activation_types: vec![ActivationType::Identity],
    ///     ..GeneticConfig::zero()
    /// });
    /// genome.add_gene(0, 0, 2, 2.0);
    /// genome.add_gene(1, 1, 2, -0.5);
    ///
    /// let mut network = RealTimeNetwork::from(&genome);
    /// network.set_inputs(&[0.5, 1.0]);
    /// network.activate();
    /// assert_eq!(network.output(0), 0.5 * 2.0 - 1.0 * 0.5);
    /// ```
    pub fn activate(&mut self) {
        for (level, links) in self.levels.iter().zip(self.links.iter()) {
            for link in links.iter() {
                self.sums[link.to] += level * link.weight;
            }
        }
        for node in self.sensors..self.levels.len() {
            self.levels[node] = self.activations[node].apply(self.sums[node]);
            self.sums[node] = 0.0;
        }
    }

    /// Zeroes every level and pending sum, forgetting
    /// anything held in recurrent links.
    pub fn clear_state(&mut self) {
        self.levels.fill(0.0);
        self.sums.fill(0.0);
    }

    /// Sets the sensor levels.
    ///
    /// # Panics
    /// Panics unless `values` holds one value per sensor.
    pub fn set_inputs(&mut self, values: &[f32]) {
        self.levels[..self.sensors].copy_from_slice(values);
    }

    pub fn input_count(&self) -> usize {
        self.sensors
    }

    /// Current actuator levels, by increasing node id.
    pub fn outputs(&self) -> &[f32] {
        &self.levels[self.actuator_indices()]
    }

    /// # Panics
    /// Panics if there is no `index`th actuator.
    pub fn output(&self, index: usize) -> f32 {
        self.outputs()[index]
    }

    pub(crate) fn actuator_indices(&self) -> Range<usize> {
        self.sensors..self.sensors + self.actuators
    }

    pub(crate) fn node_count(&self) -> usize {
        self.levels.len()
    }

    pub(crate) fn links_from(&self, node: usize) -> &[Link] {
        &self.links[node]
    }
}

impl ActivationType {
    /// Level of a node of this type receiving `input_sum`.
    pub fn apply(self, input_sum: f32) -> f32 {
        match self {
            ActivationType::Sigmoid => 1.0 / (1.0 + (-4.9 * input_sum).exp()),
            ActivationType::Identity => input_sum,
            ActivationType::ReLU => input_sum.max(0.0),
            ActivationType::Gaussian => (-input_sum * input_sum).exp(),
            ActivationType::Sinusoidal => (std::f32::consts::PI * input_sum).sin(),
        }
    }
}

impl fmt::Display for RealTimeNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (node, links) in self.node_ids.iter().zip(self.links.iter()) {
            let targets: Vec<String> = links
                .iter()
                .map(|l| format!("{} ({:.3})", self.node_ids[l.to], l.weight))
                .collect();
            writeln!(f, "{} -> [{}]", node, targets.join(", "))?;
        }
        Ok(())
    }
}

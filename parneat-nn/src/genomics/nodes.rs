use parneat::{InnovationNumber, NodeId};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::HashSet;
use std::fmt;

/// Function a node applies to the weighted
/// sum of its inputs. See [`ActivationType::apply`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ActivationType {
    /// Steepened logistic curve, `1 / (1 + e^(-4.9x))`.
    Sigmoid,
    Identity,
    ReLU,
    /// `e^(-x²)`
    Gaussian,
    /// `sin(πx)`
    Sinusoidal,
}

/// Role of a node in the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Reads an input. Never the target of a gene.
    Sensor,
    /// Hidden node, created by splitting a gene.
    Neuron,
    /// Provides an output.
    Actuator,
}

/// A genome node, along with the innovation
/// numbers of the genes entering and leaving it.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    node_type: NodeType,
    activation_type: ActivationType,
    incoming: HashSet<InnovationNumber, RandomState>,
    outgoing: HashSet<InnovationNumber, RandomState>,
}

impl Node {
    /// A node with no genes attached.
    pub fn new(id: NodeId, node_type: NodeType, activation_type: ActivationType) -> Node {
        Node {
            id,
            node_type,
            activation_type,
            incoming: HashSet::default(),
            outgoing: HashSet::default(),
        }
    }

    /// Records gene `gene` as entering the node.
    /// Returns whether it was not recorded already.
    ///
    /// # Examples
    /// ```
    /// use parneat_nn::genomics::{ActivationType, Node, NodeType};
    ///
    /// let mut node = Node::new(5, NodeType::Neuron, ActivationType::Sigmoid);
    /// assert!(node.link_input(9));
    /// assert!(!node.link_input(9));
    /// assert_eq!(node.input_genes().collect::<Vec<_>>(), [&9]);
    /// ```
    pub fn link_input(&mut self, gene: InnovationNumber) -> bool {
        self.incoming.insert(gene)
    }

    /// Records gene `gene` as leaving the node.
    /// Returns whether it was not recorded already.
    pub fn link_output(&mut self, gene: InnovationNumber) -> bool {
        self.outgoing.insert(gene)
    }

    /// Forgets entering gene `gene`, returning whether it was recorded.
    pub fn unlink_input(&mut self, gene: InnovationNumber) -> bool {
        self.incoming.remove(&gene)
    }

    /// Forgets leaving gene `gene`, returning whether it was recorded.
    pub fn unlink_output(&mut self, gene: InnovationNumber) -> bool {
        self.outgoing.remove(&gene)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Innovation numbers of the genes entering the node, in no particular order.
    pub fn input_genes(&self) -> impl Iterator<Item = &InnovationNumber> {
        self.incoming.iter()
    }

    /// Innovation numbers of the genes leaving the node, in no particular order.
    pub fn output_genes(&self) -> impl Iterator<Item = &InnovationNumber> {
        self.outgoing.iter()
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn activation_type(&self) -> ActivationType {
        self.activation_type
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sorted = |genes: &HashSet<InnovationNumber, RandomState>| {
            let mut genes: Vec<_> = genes.iter().copied().collect();
            genes.sort_unstable();
            genes
        };
        write!(
            f,
            "{}[{:?}, {:?}, IN: {:?}, OUT: {:?}]",
            self.id,
            self.node_type,
            self.activation_type,
            sorted(&self.incoming),
            sorted(&self.outgoing),
        )
    }
}

use crate::{InnovationNumber, NodeId};

use std::fmt;

/// Fingerprint of a structural mutation.
///
/// Two proposals with equal `InnovationId`s within the same
/// generation describe the same historical event, and are given
/// the same innovation numbers (and node, for splits).
///
/// The ordering is total over all fields, node splits first,
/// so that resolution order never depends on proposal order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InnovationId {
    /// Splitting the gene with innovation number `split`,
    /// which goes from `input` to `output`.
    NewNode {
        input: NodeId,
        output: NodeId,
        split: InnovationNumber,
    },
    /// Adding a gene from `input` to `output`.
    NewLink {
        input: NodeId,
        output: NodeId,
        recurrent: bool,
    },
}

impl InnovationId {
    /// Returns the fingerprint of splitting a gene.
    ///
    /// # Examples
    /// ```
    /// use parneat::InnovationId;
    ///
    /// assert_eq!(
    ///     InnovationId::node(3, 7, 100),
    ///     InnovationId::NewNode { input: 3, output: 7, split: 100 },
    /// );
    /// ```
    pub fn node(input: NodeId, output: NodeId, split: InnovationNumber) -> InnovationId {
        InnovationId::NewNode {
            input,
            output,
            split,
        }
    }

    /// Returns the fingerprint of adding a gene.
    ///
    /// # Examples
    /// ```
    /// use parneat::InnovationId;
    ///
    /// assert_ne!(InnovationId::link(3, 7, false), InnovationId::link(3, 7, true));
    /// ```
    pub fn link(input: NodeId, output: NodeId, recurrent: bool) -> InnovationId {
        InnovationId::NewLink {
            input,
            output,
            recurrent,
        }
    }

    /// Returns the endpoints of the gene being split or added.
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        match *self {
            InnovationId::NewNode { input, output, .. }
            | InnovationId::NewLink { input, output, .. } => (input, output),
        }
    }
}

impl fmt::Display for InnovationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InnovationId::NewNode {
                input,
                output,
                split,
            } => write!(f, "split {}[{}->{}]", split, input, output),
            InnovationId::NewLink {
                input,
                output,
                recurrent,
            } => write!(
                f,
                "link [{}->{}]{}",
                input,
                output,
                if *recurrent { " (recurrent)" } else { "" }
            ),
        }
    }
}

/// Values to stamp onto the gene(s) created by a mutation.
///
/// These are chosen by each proposing individual and are
/// never unified: two individuals realizing the same
/// innovation may still give it different weights.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InnovationParms {
    /// Weight of the new gene.
    pub weight: f32,
    /// Implementation-defined trait of the new structure.
    pub trait_id: usize,
}

impl InnovationParms {
    pub fn new(weight: f32, trait_id: usize) -> InnovationParms {
        InnovationParms { weight, trait_id }
    }
}

/// Identifiers allotted to a resolved innovation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assignment {
    /// A single new gene.
    Link { gene: InnovationNumber },
    /// A split gene is replaced by `input_gene -> node -> output_gene`.
    Node {
        input_gene: InnovationNumber,
        node: NodeId,
        output_gene: InnovationNumber,
    },
}

/// The resolved historical record of a structural mutation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Innovation {
    pub id: InnovationId,
    pub parms: InnovationParms,
    pub assignment: Assignment,
}

impl Innovation {
    /// Returns the (first) gene innovation number.
    /// For node splits, this is the gene leading into the new node.
    pub fn innovation_num1(&self) -> InnovationNumber {
        match self.assignment {
            Assignment::Link { gene } => gene,
            Assignment::Node { input_gene, .. } => input_gene,
        }
    }

    /// Returns the innovation number of the gene leading out of
    /// the new node, or `None` for link innovations.
    pub fn innovation_num2(&self) -> Option<InnovationNumber> {
        match self.assignment {
            Assignment::Link { .. } => None,
            Assignment::Node { output_gene, .. } => Some(output_gene),
        }
    }

    /// Returns the new node's id, or `None` for link innovations.
    pub fn newnode_id(&self) -> Option<NodeId> {
        match self.assignment {
            Assignment::Link { .. } => None,
            Assignment::Node { node, .. } => Some(node),
        }
    }
}

impl fmt::Display for Innovation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.assignment {
            Assignment::Link { gene } => write!(f, "{} => gene {}", self.id, gene),
            Assignment::Node {
                input_gene,
                node,
                output_gene,
            } => write!(
                f,
                "{} => genes {}, {} through node {}",
                self.id, input_gene, output_gene, node
            ),
        }
    }
}

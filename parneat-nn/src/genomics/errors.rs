use parneat::{InnovationNumber, NodeId};

use std::error::Error;
use std::fmt;

/// A gene or node that cannot be added to a genome.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StructureError {
    /// A gene with this innovation number already exists.
    DuplicateGene(InnovationNumber),
    /// Another gene already links these endpoints.
    DuplicateLink(NodeId, NodeId),
    MissingEndpoint(NodeId, NodeId),
    /// Genes may not lead into a sensor.
    SensorTarget(NodeId),
    DuplicateNode(NodeId),
    /// The gene a new node was to split is gone.
    MissingSplitGene(InnovationNumber),
}

/// Reasons a gene addition mutation adds nothing.
#[derive(Debug, PartialEq, Eq)]
pub enum GeneAdditionMutationError {
    /// Every node already links to every node it may link to.
    GenomeFullyConnected,
    /// No unlinked pair was found within the allowed attempts.
    NoInputOutputPairFound,
}

/// Reasons a node addition mutation adds nothing.
#[derive(Debug, PartialEq, Eq)]
pub enum NodeAdditionMutationError {
    /// Every gene is suppressed, leaving nothing to split.
    NoExpressedGenes,
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateGene(gene) => write!(f, "gene {} already exists", gene),
            Self::DuplicateLink(input, output) => {
                write!(f, "nodes {} -> {} are already linked", input, output)
            }
            Self::MissingEndpoint(input, output) => {
                write!(f, "link {} -> {} has a missing endpoint", input, output)
            }
            Self::SensorTarget(sensor) => write!(f, "link into sensor {}", sensor),
            Self::DuplicateNode(node) => write!(f, "node {} already exists", node),
            Self::MissingSplitGene(gene) => write!(f, "split gene {} is missing", gene),
        }
    }
}

impl fmt::Display for GeneAdditionMutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenomeFullyConnected => write!(f, "genome is fully connected"),
            Self::NoInputOutputPairFound => write!(f, "no unlinked node pair found"),
        }
    }
}

impl fmt::Display for NodeAdditionMutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExpressedGenes => write!(f, "genome has no expressed gene to split"),
        }
    }
}

impl Error for StructureError {}
impl Error for GeneAdditionMutationError {}
impl Error for NodeAdditionMutationError {}

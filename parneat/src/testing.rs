//! A minimal genome for exercising populations
//! without any network machinery.
use crate::{
    Genome, InnovationId, InnovationNumber, InnovationParms, InnovationSink, NodeId,
};

use serde::{Deserialize, Serialize};

/// A genome whose score is fixed at creation.
///
/// Every mated child proposes the same link,
/// so that all children of a generation should
/// end up sharing its innovation number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Scripted {
    pub value: f32,
    pub fitness: f32,
    pub genes: Vec<InnovationNumber>,
}

impl Scripted {
    pub fn with_value(value: f32) -> Scripted {
        Scripted {
            value,
            fitness: 0.0,
            genes: vec![],
        }
    }
}

impl Genome for Scripted {
    type Config = ();

    fn new(_: &()) -> Scripted {
        Scripted::with_value(1.0)
    }

    fn conforms_to(&self, _: &()) -> bool {
        self.value >= 0.0
    }

    fn genetic_distance(first: &Scripted, second: &Scripted, _: &()) -> f32 {
        (first.value - second.value).abs()
    }

    fn mate(
        parent1: &Scripted,
        parent2: &Scripted,
        innovations: &InnovationSink<'_, Scripted>,
        _: &(),
    ) -> Scripted {
        let mut child = if parent1.fitness >= parent2.fitness {
            parent1.clone()
        } else {
            parent2.clone()
        };
        child.fitness = 0.0;
        innovations.propose(
            InnovationId::link(0, 1, false),
            InnovationParms::default(),
            |child: &mut Scripted, innovation| child.genes.push(innovation.innovation_num1()),
        );
        child
    }

    fn set_fitness(&mut self, fitness: f32) {
        self.fitness = fitness;
    }

    fn fitness(&self) -> f32 {
        self.fitness
    }

    fn innovation_bounds(&self) -> (NodeId, InnovationNumber) {
        (1, self.genes.iter().copied().max().unwrap_or(0))
    }

    fn gene_count(&self) -> usize {
        self.genes.len()
    }

    fn node_count(&self) -> usize {
        2
    }
}

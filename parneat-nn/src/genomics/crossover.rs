use super::{Gene, GeneticConfig, NNGenome};

use rand::Rng;

/// How the genes of two genomes line up by innovation number.
#[derive(Debug, PartialEq)]
pub(super) struct Alignment {
    pub matching: usize,
    /// Unmatched genes numbered below the highest match.
    pub disjoint: usize,
    /// Unmatched genes numbered above it.
    pub excess: usize,
    weight_difference: f32,
}

impl Alignment {
    pub fn of(first: &NNGenome, second: &NNGenome) -> Alignment {
        let mut matching = 0;
        let mut highest_match = None;
        let mut weight_difference = 0.0;
        for (id, gene) in &first.genes {
            if let Some(other) = second.genes.get(id) {
                matching += 1;
                highest_match = highest_match.max(Some(*id));
                weight_difference += (gene.weight() - other.weight()).abs();
            }
        }

        let unmatched_below = |genome: &NNGenome, other: &NNGenome| match highest_match {
            Some(highest) => genome
                .genes
                .keys()
                .filter(|id| **id < highest && !other.genes.contains_key(id))
                .count(),
            None => 0,
        };
        let disjoint = unmatched_below(first, second) + unmatched_below(second, first);
        let unmatched = first.genes.len() + second.genes.len() - 2 * matching;
        Alignment {
            matching,
            disjoint,
            excess: unmatched - disjoint,
            weight_difference,
        }
    }

    /// Zero when no genes match.
    pub fn mean_weight_difference(&self) -> f32 {
        if self.matching == 0 {
            0.0
        } else {
            self.weight_difference / self.matching as f32
        }
    }
}

impl NNGenome {
    /// Crosses `self`, a copy of the fitter parent, with `other`.
    pub(super) fn inherit_from(&mut self, other: &NNGenome, equally_fit: bool, config: &GeneticConfig) {
        if equally_fit {
            self.absorb_structure(other);
        }
        if rand::thread_rng().gen::<f32>() < config.mate_by_averaging_chance {
            self.average_matching_weights(other);
        } else {
            self.pick_matching_weights(other);
        }
    }

    /// Copies the nodes and genes of `other` that `self` lacks,
    /// in innovation order, skipping genes that would clash.
    fn absorb_structure(&mut self, other: &NNGenome) {
        for (id, node) in &other.nodes {
            if !self.nodes.contains_key(id) {
                self.insert_node(*id, node.activation_type());
            }
        }

        let mut genes: Vec<&Gene> = other.genes.values().collect();
        genes.sort_unstable_by_key(|g| g.innovation());
        for gene in genes {
            let (input, output) = gene.endpoints();
            if self.check_gene(gene.innovation(), input, output).is_ok() {
                self.insert_gene(gene.innovation(), input, output, gene.weight())
                    .set_suppressed(gene.suppressed());
            }
        }
    }

    fn average_matching_weights(&mut self, other: &NNGenome) {
        for (id, gene) in self.genes.iter_mut() {
            if let Some(theirs) = other.genes.get(id) {
                gene.set_weight((gene.weight() + theirs.weight()) / 2.0);
            }
        }
    }

    /// Takes each matching gene's weight from either parent, evenly.
    fn pick_matching_weights(&mut self, other: &NNGenome) {
        let mut rng = rand::thread_rng();
        for (id, gene) in self.genes.iter_mut() {
            match other.genes.get(id) {
                Some(theirs) if rng.gen::<bool>() => gene.set_weight(theirs.weight()),
                _ => {}
            }
        }
    }

    /// Expresses each suppressed gene again with
    /// probability [`suppression_reset_chance`].
    ///
    /// [`suppression_reset_chance`]: GeneticConfig::suppression_reset_chance
    pub(super) fn reexpress_genes(&mut self, config: &GeneticConfig) {
        let mut rng = rand::thread_rng();
        for gene in self.genes.values_mut().filter(|g| g.suppressed()) {
            if rng.gen::<f32>() < config.suppression_reset_chance {
                gene.set_suppressed(false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::tests::{assert_consistent, io_config, registry_for};
    use crate::genomics::{ActivationType, Node, NodeType};
    use parneat::Genome;

    /// Two genomes with a hidden node 3 and three matching genes.
    fn matched_pair() -> (NNGenome, NNGenome) {
        let mut first = NNGenome::new(&io_config(2, 1));
        first.add_node(3, ActivationType::Sigmoid);
        let mut second = first.clone();
        let genes = [
            (0, (0, 2), 1.0, 3.0),
            (1, (0, 3), 2.0, -2.0),
            (2, (3, 2), 3.0, 3.5),
        ];
        for (id, (input, output), mine, theirs) in genes {
            first.add_gene(id, input, output, mine);
            second.add_gene(id, input, output, theirs);
        }
        (first, second)
    }

    #[test]
    fn equally_fit_parents_share_structure() {
        let config = GeneticConfig {
            initial_expression_chance: 1.0,
            ..io_config(2, 1)
        };
        let mut first = NNGenome::new(&config);
        let mut second = first.clone();
        first.add_node(3, ActivationType::Sigmoid);
        second.add_node(3, ActivationType::Sigmoid);
        second.add_node(4, ActivationType::ReLU);
        first.add_gene(2, 0, 3, 1.0);
        // Same link as gene 2, so it is left out.
        second.add_gene(3, 0, 3, 1.0);
        second.add_gene(4, 0, 4, 2.0);
        second.add_gene(5, 3, 4, 3.0);
        second.add_gene(6, 4, 2, 4.0).set_suppressed(true);

        first.absorb_structure(&second);

        let mut node4 = Node::new(4, NodeType::Neuron, ActivationType::ReLU);
        node4.link_input(4);
        node4.link_input(5);
        node4.link_output(6);
        assert_eq!(first.nodes[&4], node4);
        assert_eq!(first.genes[&2], Gene::new(2, 0, 3, 1.0));
        assert!(!first.genes.contains_key(&3));
        assert_eq!(first.genes[&5], Gene::new(5, 3, 4, 3.0));
        assert!(first.genes[&6].suppressed());
        assert_consistent(&first);
    }

    #[test]
    fn averaging_matching_weights() {
        let (mut first, second) = matched_pair();
        first.average_matching_weights(&second);
        assert_eq!(first.genes[&0].weight(), 2.0);
        assert_eq!(first.genes[&1].weight(), 0.0);
        assert_eq!(first.genes[&2].weight(), 3.25);
    }

    #[test]
    fn picking_matching_weights() {
        let (mut first, second) = matched_pair();
        first.pick_matching_weights(&second);
        assert!([1.0, 3.0].contains(&first.genes[&0].weight()));
        assert!([2.0, -2.0].contains(&first.genes[&1].weight()));
        assert!([3.0, 3.5].contains(&first.genes[&2].weight()));
    }

    #[test]
    fn suppressed_genes_are_reexpressed() {
        let config = GeneticConfig {
            suppression_reset_chance: 1.0,
            ..io_config(2, 1)
        };
        let mut genome = NNGenome::new(&config);
        genome.add_gene(0, 0, 2, 3.0).set_suppressed(true);
        genome.add_gene(1, 1, 2, 4.0).set_suppressed(true);
        genome.add_gene(2, 2, 2, 5.0).set_suppressed(true);
        assert_eq!(genome.gene_count(), 0);

        genome.reexpress_genes(&config);
        assert_eq!(genome.gene_count(), 3);
    }

    #[test]
    fn child_comes_from_the_fitter_parent() {
        let config = GeneticConfig::zero();
        let mut weak = NNGenome::new(&config);
        let mut strong = NNGenome::new(&config);
        weak.add_node(2, ActivationType::Sigmoid);
        strong.add_gene(0, 0, 1, 1.0);
        weak.set_fitness(1.0);
        strong.set_fitness(2.0);

        let innovations = registry_for(&[weak.clone(), strong.clone()]);
        for (p1, p2) in [(&weak, &strong), (&strong, &weak)] {
            let child = NNGenome::mate(p1, p2, &innovations.sink(0), &config);
            assert_eq!(child.genes, strong.genes);
            assert_eq!(child.node_count(), 2);
            assert_eq!(child.fitness(), 0.0);
        }
    }

    #[test]
    fn alignment_counts() {
        let config = io_config(2, 1);
        let mut first = NNGenome::new(&config);
        let mut second = NNGenome::new(&config);
        first.add_node(3, ActivationType::Sigmoid);
        second.add_node(4, ActivationType::Sigmoid);

        first.add_gene(1, 0, 2, -2.0);
        second.add_gene(1, 0, 2, 2.0);
        first.add_gene(2, 1, 3, 5.0);
        second.add_gene(3, 2, 4, 5.0);
        first.add_gene(4, 1, 2, 3.0);
        second.add_gene(4, 1, 2, 6.0);
        first.add_gene(5, 2, 2, 5.0);
        second.add_gene(6, 4, 4, 1.0);

        let alignment = Alignment::of(&first, &second);
        assert_eq!((alignment.matching, alignment.disjoint, alignment.excess), (2, 2, 2));
        assert_eq!(alignment.mean_weight_difference(), 3.5);
        assert_eq!(alignment, Alignment::of(&second, &first));

        let config = GeneticConfig {
            common_weight_factor: 0.8,
            disjoint_gene_factor: 0.6,
            excess_gene_factor: 0.4,
            ..config
        };
        assert_eq!(
            NNGenome::genetic_distance(&first, &second, &config),
            0.6 * 2.0 + 0.4 * 2.0 + 0.8 * 3.5
        );
    }

    #[test]
    fn unmatched_genes_are_all_excess() {
        let config = io_config(2, 1);
        let mut first = NNGenome::new(&config);
        let second = NNGenome::new(&config);
        first.add_gene(0, 0, 2, 1.0);
        first.add_gene(1, 1, 2, 1.0);
        let alignment = Alignment::of(&first, &second);
        assert_eq!((alignment.matching, alignment.disjoint, alignment.excess), (0, 0, 2));
        assert_eq!(alignment.mean_weight_difference(), 0.0);
    }

    #[test]
    fn empty_genomes_are_identical() {
        let config = GeneticConfig {
            common_weight_factor: 1.0,
            excess_gene_factor: 1.0,
            ..GeneticConfig::zero()
        };
        let genome = NNGenome::new(&config);
        assert_eq!(NNGenome::genetic_distance(&genome, &genome, &config), 0.0);
    }
}

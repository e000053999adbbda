use super::{
    ActivationType, Gene, GeneAdditionMutationError, GeneticConfig, NNGenome, Node,
    NodeAdditionMutationError, NodeType, StructureError,
};
use parneat::{Innovation, InnovationId, InnovationNumber, InnovationParms, InnovationSink, NodeId};

use ahash::RandomState;
use rand::prelude::{IteratorRandom, Rng, SliceRandom};

use std::collections::HashSet;

impl NNGenome {
    /// Resets or nudges each gene's weight. Genes with lower
    /// innovation numbers are less likely to be reset.
    ///
    /// # Examples
    /// ```
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 5.0,
    ///     weight_mutation_power: 2.5,
    ///     weight_nudge_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut genome = NNGenome::new(&config);
    /// let before = genome.genes().next().unwrap().weight();
    ///
    /// genome.mutate_weights(&config);
    /// let after = genome.genes().next().unwrap().weight();
    /// assert!((after - before).abs() <= config.weight_mutation_power);
    /// ```
    pub fn mutate_weights(&mut self, config: &GeneticConfig) {
        let mut rng = rand::thread_rng();
        let newest = self.genes.keys().copied().max().unwrap_or_default().max(1) as f32;
        for gene in self.genes.values_mut() {
            let age_factor = ((gene.innovation() + 1) as f32 / newest).powi(2);
            if rng.gen::<f32>() < config.weight_reset_chance * age_factor {
                gene.randomize_weight(config);
            } else if rng.gen::<f32>() < config.weight_nudge_chance {
                gene.nudge_weight(config);
            }
        }
    }

    /// Picks a pair of unlinked nodes to link, and returns it.
    ///
    /// A sensor-actuator link takes its reserved number and is
    /// added at once. Any other link is proposed to `innovations`,
    /// flagged recurrent if it closes a cycle, and added once the
    /// generation's innovations are applied.
    ///
    /// # Errors
    ///
    /// Fails if every node is fully linked, or if the first
    /// [`max_gene_addition_mutation_attempts`] candidate inputs
    /// have nothing left to link to.
    ///
    /// [`max_gene_addition_mutation_attempts`]: GeneticConfig::max_gene_addition_mutation_attempts
    ///
    /// # Examples
    /// ```
    /// use parneat::{Genome, PopulationInnovations};
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 5.0,
    ///     max_gene_addition_mutation_attempts: 10,
    ///     recursion_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut genomes = vec![NNGenome::new(&config)];
    /// let (node_id, innov_num) = genomes[0].innovation_bounds();
    /// let mut innovations = PopulationInnovations::new();
    /// innovations.init(node_id, innov_num);
    ///
    /// // With every sensor linked, only actuator self-loops remain.
    /// let (input, output) = genomes[0].mutate_add_gene(&innovations.sink(0), &config).unwrap();
    /// assert_eq!(input, output);
    ///
    /// assert_eq!(genomes[0].genes().count(), 4);
    /// innovations.apply(&mut genomes);
    /// let gene = genomes[0].genes().find(|g| g.innovation() == innov_num + 1).unwrap();
    /// assert_eq!(gene.endpoints(), (input, output));
    /// ```
    pub fn mutate_add_gene(
        &mut self,
        innovations: &InnovationSink<'_, NNGenome>,
        config: &GeneticConfig,
    ) -> Result<(NodeId, NodeId), GeneAdditionMutationError> {
        let targets: HashSet<NodeId, RandomState> = self
            .nodes
            .values()
            .filter(|n| n.node_type() != NodeType::Sensor)
            .map(Node::id)
            .collect();
        let mut sources: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.output_genes().count() < targets.len())
            .map(Node::id)
            .collect();
        if sources.is_empty() {
            return Err(GeneAdditionMutationError::GenomeFullyConnected);
        }

        let mut rng = rand::thread_rng();
        sources.shuffle(&mut rng);
        let (input, output) = sources
            .iter()
            .take(config.max_gene_addition_mutation_attempts)
            .find_map(|&source| {
                self.choose_target(source, &targets, config)
                    .map(|target| (source, target))
            })
            .ok_or(GeneAdditionMutationError::NoInputOutputPairFound)?;

        let weight = Gene::random_weight(config);
        if let Some(innovation) = self.reserved_innovation(input, output) {
            self.insert_gene(innovation, input, output, weight);
        } else {
            innovations.propose(
                InnovationId::link(input, output, self.closes_cycle(input, output)),
                InnovationParms::new(weight, 0),
                |genome: &mut NNGenome, innovation| genome.commit_link(innovation),
            );
        }
        Ok((input, output))
    }

    /// An unlinked target for `source`. Links closing a cycle are
    /// only considered with probability [`recursion_chance`], in
    /// which case a self-loop is preferred.
    ///
    /// [`recursion_chance`]: GeneticConfig::recursion_chance
    fn choose_target(
        &self,
        source: NodeId,
        targets: &HashSet<NodeId, RandomState>,
        config: &GeneticConfig,
    ) -> Option<NodeId> {
        let mut rng = rand::thread_rng();
        let recurrent = rng.gen::<f32>() < config.recursion_chance;
        let is_sensor = self.nodes[&source].node_type() == NodeType::Sensor;
        if recurrent && !is_sensor && !self.links.contains(&(source, source)) {
            return Some(source);
        }

        targets
            .iter()
            .copied()
            .filter(|&t| t != source && !self.links.contains(&(source, t)))
            .filter(|&t| recurrent || !self.closes_cycle(source, t))
            .choose(&mut rng)
    }

    /// Whether expressed genes already lead from `output` back to `input`.
    pub(crate) fn closes_cycle(&self, input: NodeId, output: NodeId) -> bool {
        let mut seen: HashSet<NodeId, RandomState> = HashSet::default();
        let mut stack = vec![output];
        while let Some(id) = stack.pop() {
            if id == input {
                return true;
            }
            let node = match self.nodes.get(&id) {
                Some(node) if seen.insert(id) => node,
                _ => continue,
            };
            stack.extend(
                node.output_genes()
                    .filter_map(|g| self.genes.get(g))
                    .filter(|g| !g.suppressed())
                    .map(Gene::output),
            );
        }
        false
    }

    fn commit_link(&mut self, innovation: &Innovation) {
        let (input, output) = innovation.id.endpoints();
        let number = innovation.innovation_num1();
        match self.check_gene(number, input, output) {
            Ok(()) => {
                self.insert_gene(number, input, output, innovation.parms.weight);
            }
            Err(e) => log::debug!("skipping {}: {}", innovation, e),
        }
    }

    /// Proposes to split a random expressed gene, and returns
    /// the innovation number of that gene.
    ///
    /// Once innovations are applied, the gene is suppressed and
    /// bridged by a new node, entered by a gene of weight 1 and
    /// left by one with the split gene's weight.
    ///
    /// # Errors
    ///
    /// Fails if every gene is suppressed.
    ///
    /// # Examples
    /// ```
    /// use parneat::{Genome, PopulationInnovations};
    /// use parneat_nn::genomics::{ActivationType, GeneticConfig, NNGenome, NodeType};
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 3.0,
    ///     activation_types: vec![ActivationType::ReLU],
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut genomes = vec![NNGenome::new(&config)];
    /// let original = genomes[0].genes().next().unwrap().clone();
    ///
    /// let mut innovations = PopulationInnovations::new();
    /// innovations.init(50, 100);
    /// let split = genomes[0].mutate_add_node(&innovations.sink(0), &config).unwrap();
    /// assert_eq!(split, original.innovation());
    /// innovations.apply(&mut genomes);
    ///
    /// let genome = &genomes[0];
    /// let gene = |n| genome.genes().find(|g| g.innovation() == n).unwrap();
    /// assert!(gene(split).suppressed());
    /// assert_eq!(gene(101).endpoints(), (original.input(), 51));
    /// assert_eq!(gene(101).weight(), 1.0);
    /// assert_eq!(gene(102).endpoints(), (51, original.output()));
    /// assert_eq!(gene(102).weight(), original.weight());
    ///
    /// let node = genome.nodes().find(|n| n.node_type() == NodeType::Neuron).unwrap();
    /// assert_eq!(node.id(), 51);
    /// assert_eq!(node.activation_type(), ActivationType::ReLU);
    /// ```
    pub fn mutate_add_node(
        &mut self,
        innovations: &InnovationSink<'_, NNGenome>,
        config: &GeneticConfig,
    ) -> Result<InnovationNumber, NodeAdditionMutationError> {
        let mut rng = rand::thread_rng();
        let gene = self
            .genes
            .values()
            .filter(|g| !g.suppressed())
            .choose(&mut rng)
            .ok_or(NodeAdditionMutationError::NoExpressedGenes)?;
        let (trait_id, activation_type) = config.random_hidden_activation(&mut rng);

        let (input, output) = gene.endpoints();
        innovations.propose(
            InnovationId::node(input, output, gene.innovation()),
            InnovationParms::new(gene.weight(), trait_id),
            move |genome: &mut NNGenome, innovation| {
                genome.commit_split(innovation, activation_type)
            },
        );
        Ok(gene.innovation())
    }

    fn commit_split(&mut self, innovation: &Innovation, activation_type: ActivationType) {
        let split = match innovation.id {
            InnovationId::NewNode { split, .. } => split,
            InnovationId::NewLink { .. } => return,
        };
        let (node, leaving) = match (innovation.newnode_id(), innovation.innovation_num2()) {
            (Some(node), Some(leaving)) => (node, leaving),
            _ => return,
        };
        let entering = innovation.innovation_num1();
        if let Err(e) = self.check_split(split, node, [entering, leaving]) {
            log::debug!("skipping {}: {}", innovation, e);
            return;
        }

        let (input, output) = innovation.id.endpoints();
        if let Some(gene) = self.genes.get_mut(&split) {
            gene.set_suppressed(true);
        }
        self.insert_node(node, activation_type);
        self.insert_gene(entering, input, node, 1.0);
        self.insert_gene(leaving, node, output, innovation.parms.weight);
    }

    fn check_split(
        &self,
        split: InnovationNumber,
        node: NodeId,
        genes: [InnovationNumber; 2],
    ) -> Result<(), StructureError> {
        if !self.genes.contains_key(&split) {
            return Err(StructureError::MissingSplitGene(split));
        }
        if self.nodes.contains_key(&node) {
            return Err(StructureError::DuplicateNode(node));
        }
        match genes.into_iter().find(|g| self.genes.contains_key(g)) {
            Some(gene) => Err(StructureError::DuplicateGene(gene)),
            None => Ok(()),
        }
    }

    /// Removes a random gene, returning it, or `None`
    /// if the genome has no genes.
    ///
    /// # Examples
    /// ```
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut genome = NNGenome::new(&config);
    ///
    /// let removed = genome.mutate_delete_gene().unwrap();
    /// assert_eq!(genome.genes().count(), 0);
    /// assert!(genome.mutate_delete_gene().is_none());
    ///
    /// // The endpoints may be linked again.
    /// genome.add_gene(removed.innovation(), removed.input(), removed.output(), 1.0);
    /// ```
    pub fn mutate_delete_gene(&mut self) -> Option<Gene> {
        let innovation = self.genes.keys().copied().choose(&mut rand::thread_rng())?;
        self.remove_gene(innovation)
    }

    /// Removes a random hidden node along with the genes
    /// entering and leaving it, or returns `None` if the
    /// genome has no hidden nodes.
    ///
    /// # Examples
    /// ```
    /// use parneat_nn::genomics::{ActivationType, GeneticConfig, NNGenome};
    ///
    /// let mut genome = NNGenome::new(&GeneticConfig::zero());
    /// genome.add_node(42, ActivationType::Sigmoid);
    /// genome.add_gene(16, 0, 42, 1.0);
    /// genome.add_gene(17, 42, 1, 1.0);
    ///
    /// let (node, mut genes) = genome.mutate_delete_node().unwrap();
    /// genes.sort_by_key(|g| g.innovation());
    ///
    /// assert_eq!(node.id(), 42);
    /// assert_eq!(genes.iter().map(|g| g.innovation()).collect::<Vec<_>>(), [16, 17]);
    /// assert_eq!(genome.nodes().count(), 2);
    /// assert_eq!(genome.genes().count(), 0);
    /// ```
    pub fn mutate_delete_node(&mut self) -> Option<(Node, Vec<Gene>)> {
        let id = self
            .nodes
            .values()
            .filter(|n| n.node_type() == NodeType::Neuron)
            .map(Node::id)
            .choose(&mut rand::thread_rng())?;

        let node = self.nodes.remove(&id)?;
        let incident: HashSet<InnovationNumber, RandomState> =
            node.input_genes().chain(node.output_genes()).copied().collect();
        let genes = incident
            .into_iter()
            .filter_map(|g| self.remove_gene(g))
            .collect();
        Some((node, genes))
    }

    /// Rolls for every kind of mutation, in turn.
    pub(super) fn mutate_all(
        &mut self,
        innovations: &InnovationSink<'_, NNGenome>,
        config: &GeneticConfig,
    ) {
        let mut rng = rand::thread_rng();
        if rng.gen::<f32>() < config.node_deletion_mutation_chance {
            self.mutate_delete_node();
        }
        if rng.gen::<f32>() < config.gene_deletion_mutation_chance {
            self.mutate_delete_gene();
        }
        self.mutate_weights(config);
        if rng.gen::<f32>() < config.node_addition_mutation_chance {
            if let Err(e) = self.mutate_add_node(innovations, config) {
                log::trace!("individual {}: {}", innovations.population_index(), e);
            }
        }
        if rng.gen::<f32>() < config.gene_addition_mutation_chance {
            if let Err(e) = self.mutate_add_gene(innovations, config) {
                log::trace!("individual {}: {}", innovations.population_index(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::tests::{assert_consistent, io_config, registry_for};
    use parneat::Genome;

    fn linked_config() -> GeneticConfig {
        GeneticConfig {
            initial_expression_chance: 1.0,
            weight_bound: 3.0,
            max_gene_addition_mutation_attempts: 20,
            ..GeneticConfig::zero()
        }
    }

    #[test]
    fn zero_chances_leave_weights_alone() {
        let config = GeneticConfig {
            weight_bound: 5.0,
            ..linked_config()
        };
        let mut genome = NNGenome::new(&config);
        let before = genome.genes[&0].weight();
        genome.mutate_weights(&config);
        assert_eq!(genome.genes[&0].weight(), before);
    }

    #[test]
    fn new_links_are_proposed() {
        let config = linked_config();
        let mut genome = NNGenome::new(&config);
        genome.add_node(2, ActivationType::Sigmoid);
        let mut genomes = vec![genome];
        let mut innovations = registry_for(&genomes);

        let (input, output) = genomes[0]
            .mutate_add_gene(&innovations.sink(0), &config)
            .unwrap();
        assert_eq!(genomes[0].genes().count(), 1);
        assert_eq!(innovations.len(), 1);
        assert_eq!(innovations.apply(&mut genomes), 1);

        let gene = &genomes[0].genes[&1];
        assert_eq!(gene.endpoints(), (input, output));
        assert!(gene.weight().abs() <= 3.0);
        assert_consistent(&genomes[0]);
    }

    #[test]
    fn sensor_actuator_links_skip_the_registry() {
        let config = GeneticConfig {
            max_gene_addition_mutation_attempts: 20,
            ..io_config(3, 1)
        };
        let mut genome = NNGenome::new(&config);
        genome.add_gene(0, 0, 3, 1.0);
        genome.add_gene(1, 1, 3, 1.0);
        let innovations = registry_for(&[genome.clone()]);

        assert_eq!(genome.mutate_add_gene(&innovations.sink(0), &config), Ok((2, 3)));
        assert!(innovations.is_empty());
        assert_eq!(genome.genes[&2].endpoints(), (2, 3));
        assert_consistent(&genome);
    }

    #[test]
    fn cycle_closing_links_are_flagged() {
        let config = GeneticConfig {
            weight_bound: 1.0,
            max_gene_addition_mutation_attempts: 20,
            recursion_chance: 1.0,
            ..GeneticConfig::zero()
        };
        let mut genome = NNGenome::new(&config);
        genome.add_node(2, ActivationType::Sigmoid);
        genome.add_gene(0, 0, 1, 1.0);
        genome.add_gene(3, 1, 2, 1.0);
        genome.add_gene(4, 2, 2, 1.0);
        genome.add_gene(5, 1, 1, 1.0);
        genome.add_gene(6, 0, 2, 1.0);
        let mut genomes = vec![genome];
        let mut innovations = registry_for(&genomes);

        // 2 -> 1 is all that is left, closing 1 -> 2 -> 1.
        assert_eq!(
            genomes[0].mutate_add_gene(&innovations.sink(0), &config),
            Ok((2, 1))
        );
        assert!(genomes[0].closes_cycle(2, 1));
        assert!(!genomes[0].closes_cycle(0, 2));
        innovations.apply(&mut genomes);
        assert_eq!(genomes[0].genes[&7].endpoints(), (2, 1));
    }

    #[test]
    fn suppressed_genes_do_not_close_cycles() {
        let mut genome = NNGenome::new(&GeneticConfig::zero());
        genome.add_node(2, ActivationType::Sigmoid);
        genome.add_gene(5, 1, 2, 1.0).set_suppressed(true);
        assert!(!genome.closes_cycle(2, 1));
        genome.genes.get_mut(&5).unwrap().set_suppressed(false);
        assert!(genome.closes_cycle(2, 1));
    }

    #[test]
    fn fully_linked_genome_refuses_new_links() {
        let config = GeneticConfig {
            recursion_chance: 1.0,
            ..linked_config()
        };
        let mut genome = NNGenome::new(&config);
        genome.add_gene(42, 1, 1, 5.0);
        let innovations = registry_for(&[genome.clone()]);

        assert_eq!(
            genome.mutate_add_gene(&innovations.sink(0), &config),
            Err(GeneAdditionMutationError::GenomeFullyConnected)
        );
    }

    #[test]
    fn acyclic_only_search_can_come_up_empty() {
        // Only the self-loop 1 -> 1 is left, and it is never
        // allowed without recurrence.
        let config = linked_config();
        let mut genome = NNGenome::new(&config);
        let innovations = registry_for(&[genome.clone()]);
        assert_eq!(
            genome.mutate_add_gene(&innovations.sink(0), &config),
            Err(GeneAdditionMutationError::NoInputOutputPairFound)
        );
    }

    #[test]
    fn nothing_to_split() {
        let config = GeneticConfig::zero();
        let mut genome = NNGenome::new(&config);
        let innovations = registry_for(&[genome.clone()]);
        assert_eq!(
            genome.mutate_add_node(&innovations.sink(0), &config),
            Err(NodeAdditionMutationError::NoExpressedGenes)
        );
    }

    #[test]
    fn stale_split_is_skipped() {
        let config = linked_config();
        let mut genomes = vec![NNGenome::new(&config)];
        let mut innovations = registry_for(&genomes);
        genomes[0]
            .mutate_add_node(&innovations.sink(0), &config)
            .unwrap();
        genomes[0].mutate_delete_gene();

        assert_eq!(innovations.apply(&mut genomes), 1);
        assert_eq!(genomes[0].genes().count(), 0);
        assert_eq!(genomes[0].node_count(), 2);
    }

    #[test]
    fn split_checks() {
        let mut genome = NNGenome::new(&linked_config());
        genome.add_node(5, ActivationType::Sigmoid);
        assert_eq!(
            genome.check_split(9, 6, [7, 8]),
            Err(StructureError::MissingSplitGene(9))
        );
        assert_eq!(genome.check_split(0, 5, [7, 8]), Err(StructureError::DuplicateNode(5)));
        assert_eq!(genome.check_split(0, 6, [7, 0]), Err(StructureError::DuplicateGene(0)));
        assert_eq!(genome.check_split(0, 6, [7, 8]), Ok(()));
    }

    #[test]
    fn node_deletion_keeps_links_consistent() {
        let mut genome = NNGenome::new(&GeneticConfig::zero());
        genome.add_node(42, ActivationType::Sigmoid);
        genome.add_gene(16, 0, 42, 1.0);
        genome.add_gene(17, 42, 1, 1.0);
        genome.add_gene(18, 42, 42, 1.0);
        genome.add_gene(19, 0, 1, 1.0);

        let (node, genes) = genome.mutate_delete_node().unwrap();
        assert_eq!(node.id(), 42);
        assert_eq!(genes.len(), 3);
        assert_eq!(genome.genes().map(Gene::innovation).collect::<Vec<_>>(), [19]);
        assert_consistent(&genome);
        assert!(genome.mutate_delete_node().is_none());

        genome.add_node(42, ActivationType::Sigmoid);
        genome.add_gene(16, 0, 42, 1.0);
    }
}

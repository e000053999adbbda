//! Neural-network genomes: genes keyed by innovation number,
//! and the nodes they link.
//!
//! Structural mutations are not applied on the spot. They are
//! proposed to the population's innovation registry, which gives
//! identical mutations across the generation the same numbers,
//! and committed once the registry resolves them.

mod config;
mod crossover;
mod errors;
mod genes;
mod mutation;
mod nodes;

pub use config::GeneticConfig;
use errors::StructureError;
pub use errors::{GeneAdditionMutationError, NodeAdditionMutationError};
pub use genes::Gene;
pub use nodes::{ActivationType, Node, NodeType};

use parneat::{Genome, InnovationNumber, InnovationSink, NodeId};

use ahash::RandomState;
use rand::Rng;
use serde::{Deserialize, Serialize};

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Genes and nodes of a neural network, with a fitness score.
///
/// Sensors are numbered `0..input_count`, actuators
/// `input_count..input_count + output_count`, and hidden
/// nodes anything above.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NNGenome {
    genes: HashMap<InnovationNumber, Gene, RandomState>,
    nodes: HashMap<NodeId, Node, RandomState>,
    /// Endpoints of every gene, suppressed or not.
    links: HashSet<(NodeId, NodeId), RandomState>,
    fitness: f32,
}

impl NNGenome {
    /// A genome with the configured sensors and actuators. Each
    /// sensor-actuator gene is present with probability
    /// [`initial_expression_chance`].
    ///
    /// The gene from sensor `i` to the `o`-th actuator is numbered
    /// `o + i * output_count`. Those numbers are reserved for these
    /// genes whether a genome holds them or not.
    ///
    /// [`initial_expression_chance`]: GeneticConfig::initial_expression_chance
    ///
    /// # Examples
    /// ```
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome, NodeType};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 5.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let genome = NNGenome::new(&config);
    ///
    /// let count = |t| genome.nodes().filter(|n| n.node_type() == t).count();
    /// assert_eq!(count(NodeType::Sensor), 3);
    /// assert_eq!(count(NodeType::Actuator), 2);
    /// assert_eq!(count(NodeType::Neuron), 0);
    ///
    /// let mut numbers: Vec<_> = genome.genes().map(|g| g.innovation()).collect();
    /// numbers.sort_unstable();
    /// assert_eq!(numbers, [0, 1, 2, 3, 4, 5]);
    /// ```
    pub fn new(config: &GeneticConfig) -> NNGenome {
        let inputs = config.input_count.get();
        let outputs = config.output_count.get();
        let sensors = (0..inputs).map(|i| Node::new(i, NodeType::Sensor, ActivationType::Identity));
        let actuators = (0..outputs).map(|o| {
            Node::new(inputs + o, NodeType::Actuator, config.output_activation(o))
        });

        let mut genome = NNGenome {
            genes: HashMap::default(),
            nodes: sensors.chain(actuators).map(|n| (n.id(), n)).collect(),
            links: HashSet::default(),
            fitness: 0.0,
        };
        let mut rng = rand::thread_rng();
        for i in 0..inputs {
            for o in 0..outputs {
                if rng.gen::<f32>() < config.initial_expression_chance {
                    let weight = Gene::random_weight(config);
                    genome.insert_gene(o + i * outputs, i, inputs + o, weight);
                }
            }
        }
        genome
    }

    /// Counts sensors and actuators.
    fn io_counts(&self) -> (usize, usize) {
        let mut counts = (0, 0);
        for node in self.nodes.values() {
            match node.node_type() {
                NodeType::Sensor => counts.0 += 1,
                NodeType::Actuator => counts.1 += 1,
                NodeType::Neuron => {}
            }
        }
        counts
    }

    /// The number reserved for a sensor-actuator gene, or
    /// `None` if `input -> output` is not such a pair.
    fn reserved_innovation(&self, input: NodeId, output: NodeId) -> Option<InnovationNumber> {
        let (sensors, actuators) = self.io_counts();
        let actuator = output.checked_sub(sensors).filter(|o| *o < actuators)?;
        (input < sensors).then(|| actuator + input * actuators)
    }

    /// Adds gene `innovation` from `input` to `output`.
    ///
    /// # Panics
    ///
    /// Panics if the genome already has gene `innovation`
    /// or a gene from `input` to `output`, if either node
    /// is missing, or if `output` is a sensor.
    ///
    /// # Examples
    /// ```
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut genome = NNGenome::new(&config);
    ///
    /// let gene = genome.add_gene(42, 2, 4, 2.5).clone();
    /// assert_eq!(gene.endpoints(), (2, 4));
    ///
    /// // Cycles and self-loops are fine.
    /// genome.add_gene(43, 3, 4, -3.0);
    /// genome.add_gene(44, 4, 3, 1.0);
    /// genome.add_gene(45, 4, 4, -1.0);
    /// assert_eq!(genome.genes().count(), 4);
    /// ```
    pub fn add_gene(
        &mut self,
        innovation: InnovationNumber,
        input: NodeId,
        output: NodeId,
        weight: f32,
    ) -> &mut Gene {
        if let Err(e) = self.check_gene(innovation, input, output) {
            panic!("{} in {}", e, self);
        }
        self.insert_gene(innovation, input, output, weight)
    }

    /// Adds a gene without checking it, linking it to its endpoints.
    fn insert_gene(
        &mut self,
        innovation: InnovationNumber,
        input: NodeId,
        output: NodeId,
        weight: f32,
    ) -> &mut Gene {
        if let Some(node) = self.nodes.get_mut(&input) {
            node.link_output(innovation);
        }
        if let Some(node) = self.nodes.get_mut(&output) {
            node.link_input(innovation);
        }
        self.links.insert((input, output));
        self.genes
            .entry(innovation)
            .or_insert_with(|| Gene::new(innovation, input, output, weight))
    }

    fn check_gene(
        &self,
        innovation: InnovationNumber,
        input: NodeId,
        output: NodeId,
    ) -> Result<(), StructureError> {
        let target = self
            .nodes
            .get(&output)
            .filter(|_| self.nodes.contains_key(&input))
            .ok_or(StructureError::MissingEndpoint(input, output))?;
        if self.genes.contains_key(&innovation) {
            return Err(StructureError::DuplicateGene(innovation));
        }
        if self.links.contains(&(input, output)) {
            return Err(StructureError::DuplicateLink(input, output));
        }
        match target.node_type() {
            NodeType::Sensor => Err(StructureError::SensorTarget(output)),
            _ => Ok(()),
        }
    }

    /// Removes a gene and unlinks it from its endpoints.
    fn remove_gene(&mut self, innovation: InnovationNumber) -> Option<Gene> {
        let gene = self.genes.remove(&innovation)?;
        if let Some(node) = self.nodes.get_mut(&gene.input()) {
            node.unlink_output(innovation);
        }
        if let Some(node) = self.nodes.get_mut(&gene.output()) {
            node.unlink_input(innovation);
        }
        self.links.remove(&gene.endpoints());
        Some(gene)
    }

    /// Adds hidden node `id`, with no genes attached.
    ///
    /// # Panics
    ///
    /// Panics if the genome already has node `id`.
    ///
    /// # Examples
    /// ```
    /// use parneat_nn::genomics::{ActivationType, GeneticConfig, NNGenome, NodeType};
    ///
    /// let mut genome = NNGenome::new(&GeneticConfig::zero());
    /// let node = genome.add_node(42, ActivationType::Gaussian).clone();
    ///
    /// assert_eq!(genome.nodes().count(), 3);
    /// assert_eq!(node.node_type(), NodeType::Neuron);
    /// assert_eq!(node.activation_type(), ActivationType::Gaussian);
    /// ```
    pub fn add_node(&mut self, id: NodeId, activation_type: ActivationType) -> &mut Node {
        if self.nodes.contains_key(&id) {
            panic!("{} in {}", StructureError::DuplicateNode(id), self);
        }
        self.insert_node(id, activation_type)
    }

    fn insert_node(&mut self, id: NodeId, activation_type: ActivationType) -> &mut Node {
        self.nodes
            .entry(id)
            .or_insert_with(|| Node::new(id, NodeType::Neuron, activation_type))
    }

    /// All genes, suppressed or not, in no particular order.
    pub fn genes(&self) -> impl Iterator<Item = &Gene> {
        self.genes.values()
    }

    /// All nodes, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
}

impl Genome for NNGenome {
    type Config = GeneticConfig;

    fn new(config: &GeneticConfig) -> NNGenome {
        NNGenome::new(config)
    }

    /// Whether the sensors and actuators are exactly those
    /// [`NNGenome::new`] would create, and hidden nodes
    /// are numbered above them.
    fn conforms_to(&self, config: &GeneticConfig) -> bool {
        let inputs = config.input_count.get();
        let hidden = inputs + config.output_count.get();
        self.io_counts() == (inputs, config.output_count.get())
            && self.nodes.values().all(|n| {
                let id = n.id();
                match n.node_type() {
                    NodeType::Sensor => id < inputs,
                    NodeType::Actuator => (inputs..hidden).contains(&id),
                    NodeType::Neuron => id >= hidden,
                }
            })
    }

    /// `disjoint_gene_factor * D + excess_gene_factor * E +
    /// common_weight_factor * W`, where `D` and `E` count the
    /// genes of either genome that are missing from the other,
    /// below and above the highest shared innovation number,
    /// and `W` is the mean weight difference of shared genes.
    ///
    /// # Examples
    /// ```
    /// use parneat::Genome;
    /// use parneat_nn::genomics::{ActivationType, GeneticConfig, NNGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     excess_gene_factor: 2.0,
    ///     disjoint_gene_factor: 1.0,
    ///     common_weight_factor: 0.5,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut first = NNGenome::new(&config);
    /// let mut second = NNGenome::new(&config);
    ///
    /// // Shared, 2.0 apart.
    /// first.add_gene(0, 0, 2, 1.0);
    /// second.add_gene(0, 0, 2, -1.0);
    /// // Disjoint.
    /// first.add_gene(1, 1, 2, 0.0);
    /// // Shared, equal.
    /// first.add_gene(3, 2, 2, 1.0);
    /// second.add_gene(3, 2, 2, 1.0);
    /// // Excess.
    /// second.add_gene(4, 1, 2, 0.0);
    ///
    /// assert_eq!(NNGenome::genetic_distance(&first, &second, &config), 1.0 + 2.0 + 0.5);
    /// ```
    fn genetic_distance(first: &NNGenome, second: &NNGenome, config: &GeneticConfig) -> f32 {
        let alignment = crossover::Alignment::of(first, second);
        config.disjoint_gene_factor * alignment.disjoint as f32
            + config.excess_gene_factor * alignment.excess as f32
            + config.common_weight_factor * alignment.mean_weight_difference()
    }

    /// A child of the fitter parent, which also takes the other's
    /// structure when both are equally fit. With probability
    /// [`child_mutation_chance`] the child is then mutated, its
    /// structural mutations going through `innovations`.
    ///
    /// [`child_mutation_chance`]: GeneticConfig::child_mutation_chance
    ///
    /// # Examples
    /// ```
    /// use parneat::{Genome, PopulationInnovations};
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let parent = NNGenome::new(&config);
    /// let mut innovations = PopulationInnovations::new();
    /// innovations.init(1, 0);
    ///
    /// // Mating a genome with itself copies it.
    /// let child = NNGenome::mate(&parent, &parent, &innovations.sink(0), &config);
    /// assert!(child.genes().eq(parent.genes()));
    /// assert!(innovations.is_empty());
    /// ```
    fn mate(
        parent1: &NNGenome,
        parent2: &NNGenome,
        innovations: &InnovationSink<'_, NNGenome>,
        config: &GeneticConfig,
    ) -> NNGenome {
        let (fitter, other) = if parent2.fitness > parent1.fitness {
            (parent2, parent1)
        } else {
            (parent1, parent2)
        };

        let mut child = fitter.clone();
        child.fitness = 0.0;
        child.inherit_from(other, fitter.fitness == other.fitness, config);
        if rand::thread_rng().gen::<f32>() < config.child_mutation_chance {
            child.mutate_all(innovations, config);
        }
        child.reexpress_genes(config);
        child
    }

    /// # Panics
    /// Panics if `fitness` is negative or NaN.
    fn set_fitness(&mut self, fitness: f32) {
        assert!(fitness >= 0.0, "invalid fitness {}", fitness);
        self.fitness = fitness;
    }

    fn fitness(&self) -> f32 {
        self.fitness
    }

    /// Highest node and gene numbers, counting the
    /// sensor-actuator gene numbers as used.
    fn innovation_bounds(&self) -> (NodeId, InnovationNumber) {
        let (sensors, actuators) = self.io_counts();
        let highest_node = self.nodes.keys().copied().max().unwrap_or_default();
        let highest_gene = self.genes.keys().copied().max().unwrap_or_default();
        (
            highest_node.max((sensors + actuators).saturating_sub(1)),
            highest_gene.max((sensors * actuators).saturating_sub(1)),
        )
    }

    /// Counts expressed genes only.
    fn gene_count(&self) -> usize {
        self.genes.values().filter(|g| !g.suppressed()).count()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl fmt::Display for NNGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[&T]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }

        let mut genes: Vec<&Gene> = self.genes.values().collect();
        genes.sort_unstable_by_key(|g| g.innovation());
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_unstable_by_key(|n| n.id());

        f.write_str("NNGenome { genes: [")?;
        list(f, &genes)?;
        f.write_str("], nodes: [")?;
        list(f, &nodes)?;
        write!(f, "], fitness: {} }}", self.fitness)
    }
}

use crate::genomics::NNGenome;
use crate::networks::RealTimeNetwork;

/// A network evaluated one point at a time.
///
/// Each evaluation clears the network and activates it
/// once per link on the longest sensor-to-actuator path,
/// so every actuator settles before it is read.
///
/// `MAX_NODE_VISITS` caps how often a path may pass
/// through one node while that length is measured:
/// 0 measures nothing, 1 ignores cycles, 2 lets a path
/// go once around each cycle, and so on.
pub struct FunctionApproximatorNetwork<const MAX_NODE_VISITS: u8> {
    network: RealTimeNetwork,
    depth: usize,
}

impl<const MAX_NODE_VISITS: u8> From<&NNGenome> for FunctionApproximatorNetwork<MAX_NODE_VISITS> {
    /// Builds the network and measures its depth, which is
    /// exponential in the node count for cyclic networks.
    ///
    /// # Examples
    /// ```
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    /// use parneat_nn::networks::FunctionApproximatorNetwork;
    ///
    /// let genome = NNGenome::new(&GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// });
    /// let network = FunctionApproximatorNetwork::<1>::from(&genome);
    /// assert_eq!(network.depth(), 1);
    /// ```
    fn from(genome: &NNGenome) -> FunctionApproximatorNetwork<MAX_NODE_VISITS> {
        let network = RealTimeNetwork::from(genome);
        let depth = (0..network.input_count())
            .map(|sensor| Self::longest_path_from(&network, sensor))
            .max()
            .unwrap_or_default();
        FunctionApproximatorNetwork { network, depth }
    }
}

impl<const MAX_NODE_VISITS: u8> FunctionApproximatorNetwork<MAX_NODE_VISITS> {
    /// Length of the longest path from `sensor` ending on an
    /// actuator, 0 if no actuator is reachable.
    fn longest_path_from(network: &RealTimeNetwork, sensor: usize) -> usize {
        let actuators = network.actuator_indices();
        let mut visits = vec![0u8; network.node_count()];
        let mut longest = 0;

        // Each frame is a node on the current path and
        // the index of its next link to follow.
        let mut path = vec![(sensor, 0)];
        while let Some(frame) = path.last_mut() {
            let (node, next) = *frame;
            match network.links_from(node).get(next) {
                Some(link) => {
                    frame.1 += 1;
                    if visits[link.to] < MAX_NODE_VISITS {
                        visits[link.to] += 1;
                        path.push((link.to, 0));
                    }
                }
                None => {
                    path.pop();
                    if path.is_empty() {
                        break;
                    }
                    visits[node] -= 1;
                    if actuators.contains(&node) {
                        longest = longest.max(path.len());
                    }
                }
            }
        }
        longest
    }

    /// Number of activations per evaluation.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the actuator values for the point given by `inputs`.
    ///
    /// # Panics
    /// Panics if `inputs` does not hold one value per sensor.
    ///
    /// # Examples
    /// ```
    /// use parneat_nn::genomics::{ActivationType, GeneticConfig, NNGenome};
    /// use parneat_nn::networks::FunctionApproximatorNetwork;
    ///
    /// // sensor -> hidden sigmoid -> actuator sigmoid
    /// let mut genome = NNGenome::new(&GeneticConfig::zero());
    /// genome.add_node(2, ActivationType::Sigmoid);
    /// genome.add_gene(0, 0, 2, 1.0);
    /// genome.add_gene(1, 2, 1, 1.0);
    /// let mut network = FunctionApproximatorNetwork::<1>::from(&genome);
    ///
    /// let sigmoid = |x| ActivationType::Sigmoid.apply(x);
    /// assert_eq!(network.evaluate_at(&[0.3])[0], sigmoid(sigmoid(0.3)));
    /// ```
    pub fn evaluate_at(&mut self, inputs: &[f32]) -> &[f32] {
        self.network.clear_state();
        self.network.set_inputs(inputs);
        for _ in 0..self.depth {
            self.network.activate();
        }
        self.network.outputs()
    }
}

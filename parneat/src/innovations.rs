//! Innovation tracking for a generation of genomes.
//!
//! Structural mutations are not numbered on the spot. Each mutating
//! individual _proposes_ its mutation, together with a callback that
//! commits the mutation to its genome, and once the whole generation has
//! been mutated all proposals are resolved at once. Identical proposals
//! (same [`InnovationId`]) are given the same innovation numbers, so genes
//! created independently by different lineages still align during mating.
mod records;

pub use records::{Assignment, Innovation, InnovationId, InnovationParms};

use crate::{InnovationNumber, NodeId};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// One-shot callback committing a resolved innovation
/// into the proposing individual's genome.
pub type ApplyFn<G> = Box<dyn FnOnce(&mut G, &Innovation) + Send>;

/// An individual's pending proposal to realize a structural mutation.
pub struct IndividualInnovation<G> {
    /// Index of the proposing individual in the
    /// slice later passed to [`PopulationInnovations::apply`].
    pub population_index: usize,
    pub id: InnovationId,
    pub parms: InnovationParms,
    apply: ApplyFn<G>,
}

impl<G> IndividualInnovation<G> {
    /// Creates a new proposal. `apply` will be called exactly
    /// once, with the proposer's genome and the resolved innovation.
    pub fn new<F>(
        population_index: usize,
        id: InnovationId,
        parms: InnovationParms,
        apply: F,
    ) -> IndividualInnovation<G>
    where
        F: FnOnce(&mut G, &Innovation) + Send + 'static,
    {
        IndividualInnovation {
            population_index,
            id,
            parms,
            apply: Box::new(apply),
        }
    }
}

impl<G> fmt::Debug for IndividualInnovation<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndividualInnovation")
            .field("population_index", &self.population_index)
            .field("id", &self.id)
            .field("parms", &self.parms)
            .finish_non_exhaustive()
    }
}

/// Registry of a population's structural innovations
/// for the generation being bred.
///
/// Proposals may be [added] concurrently from any number of
/// threads. [Resolution] needs exclusive access, which guarantees
/// that every proposal of the generation has been received.
///
/// [added]: PopulationInnovations::add
/// [Resolution]: PopulationInnovations::apply
pub struct PopulationInnovations<G> {
    cur_node_id: NodeId,
    cur_innov_num: InnovationNumber,
    initialized: bool,
    pending: Mutex<BTreeMap<InnovationId, Vec<IndividualInnovation<G>>>>,
}

impl<G> PopulationInnovations<G> {
    /// Creates an empty registry. It must be
    /// [initialized] before receiving proposals.
    ///
    /// [initialized]: PopulationInnovations::init
    pub fn new() -> PopulationInnovations<G> {
        PopulationInnovations {
            cur_node_id: 0,
            cur_innov_num: 0,
            initialized: false,
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// Seeds the registry for a new generation.
    ///
    /// `node_id` and `innov_num` should be the highest node id and
    /// gene innovation number in use by the population; all identifiers
    /// handed out afterwards are strictly greater.
    ///
    /// # Examples
    /// ```
    /// use parneat::{InnovationId, InnovationParms, PopulationInnovations};
    ///
    /// let mut innovations = PopulationInnovations::<Vec<(usize, usize)>>::new();
    /// innovations.init(50, 100);
    /// innovations.sink(0).propose(
    ///     InnovationId::node(3, 7, 100),
    ///     InnovationParms::default(),
    ///     |log, innovation| log.push((innovation.newnode_id().unwrap(), innovation.innovation_num1())),
    /// );
    ///
    /// let mut genomes = vec![vec![]];
    /// innovations.apply(&mut genomes);
    /// assert_eq!(genomes[0], [(51, 101)]);
    /// ```
    pub fn init(&mut self, node_id: NodeId, innov_num: InnovationNumber) {
        let pending = self.pending.get_mut().unwrap_or_else(PoisonError::into_inner);
        debug_assert!(
            pending.is_empty(),
            "innovation registry reseeded with {} unresolved innovations",
            pending.len()
        );
        pending.clear();
        self.cur_node_id = node_id;
        self.cur_innov_num = innov_num;
        self.initialized = true;
    }

    /// Registers a proposal. Numbers are only assigned on [`apply`].
    ///
    /// [`apply`]: PopulationInnovations::apply
    pub fn add(&self, proposal: IndividualInnovation<G>) {
        debug_assert!(self.initialized, "innovation proposed before registry init");
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(proposal.id)
            .or_default()
            .push(proposal);
    }

    /// Returns a handle through which the individual at
    /// `population_index` can propose innovations.
    pub fn sink(&self, population_index: usize) -> InnovationSink<'_, G> {
        InnovationSink {
            registry: self,
            population_index,
        }
    }

    /// Resolves all pending proposals and commits them.
    ///
    /// Distinct innovations are numbered in [`InnovationId`] order,
    /// and every proposal sharing an id receives the same numbers,
    /// in ascending population index order. Each proposal's callback
    /// is invoked on `genomes[population_index]`. Returns the number
    /// of distinct innovations resolved.
    ///
    /// # Panics
    /// Panics if a proposal's population index is out of bounds
    /// for `genomes`.
    ///
    /// # Examples
    /// ```
    /// use parneat::{InnovationId, InnovationParms, PopulationInnovations};
    ///
    /// let mut innovations = PopulationInnovations::<Vec<usize>>::new();
    /// innovations.init(10, 20);
    ///
    /// for (individual, output) in [(0, 7), (1, 7), (2, 8)] {
    ///     innovations.sink(individual).propose(
    ///         InnovationId::link(3, output, false),
    ///         InnovationParms::default(),
    ///         |genes, innovation| genes.push(innovation.innovation_num1()),
    ///     );
    /// }
    ///
    /// let mut genomes = vec![vec![]; 3];
    /// assert_eq!(innovations.apply(&mut genomes), 2);
    /// assert_eq!(genomes[0], genomes[1]);
    /// assert_ne!(genomes[0], genomes[2]);
    ///
    /// // Nothing left to resolve.
    /// assert_eq!(innovations.apply(&mut genomes), 0);
    /// ```
    pub fn apply(&mut self, genomes: &mut [G]) -> usize {
        debug_assert!(self.initialized, "innovations applied before registry init");
        let pending = std::mem::take(self.pending.get_mut().unwrap_or_else(PoisonError::into_inner));
        let resolved = pending.len();

        for (id, mut proposals) in pending {
            proposals.sort_by_key(|p| p.population_index);
            let assignment = self.allocate(&id);
            log::trace!(
                "{} resolved to {:?} for {} individual(s)",
                id,
                assignment,
                proposals.len()
            );
            for proposal in proposals {
                let innovation = Innovation {
                    id,
                    parms: proposal.parms,
                    assignment,
                };
                let population_size = genomes.len();
                let genome = genomes
                    .get_mut(proposal.population_index)
                    .unwrap_or_else(|| {
                        panic!(
                            "{} proposed by individual {} of a population of {}",
                            id, proposal.population_index, population_size
                        )
                    });
                (proposal.apply)(genome, &innovation);
            }
        }

        resolved
    }

    /// Allocates fresh identifiers for an innovation.
    fn allocate(&mut self, id: &InnovationId) -> Assignment {
        match id {
            InnovationId::NewNode { .. } => {
                self.cur_node_id += 1;
                let input_gene = self.cur_innov_num + 1;
                let output_gene = self.cur_innov_num + 2;
                self.cur_innov_num += 2;
                Assignment::Node {
                    input_gene,
                    node: self.cur_node_id,
                    output_gene,
                }
            }
            InnovationId::NewLink { .. } => {
                self.cur_innov_num += 1;
                Assignment::Link {
                    gene: self.cur_innov_num,
                }
            }
        }
    }

    /// Returns the number of pending proposals.
    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Returns whether there are no pending proposals.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the highest node id handed out or seeded.
    pub fn node_id(&self) -> NodeId {
        self.cur_node_id
    }

    /// Returns the highest gene innovation number handed out or seeded.
    pub fn innovation_num(&self) -> InnovationNumber {
        self.cur_innov_num
    }
}

impl<G> Default for PopulationInnovations<G> {
    fn default() -> PopulationInnovations<G> {
        PopulationInnovations::new()
    }
}

impl<G> fmt::Debug for PopulationInnovations<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopulationInnovations")
            .field("cur_node_id", &self.cur_node_id)
            .field("cur_innov_num", &self.cur_innov_num)
            .field("pending", &self.len())
            .finish()
    }
}

/// A handle for a single individual to propose
/// innovations to its population's registry.
pub struct InnovationSink<'a, G> {
    registry: &'a PopulationInnovations<G>,
    population_index: usize,
}

impl<'a, G> InnovationSink<'a, G> {
    /// Returns the proposing individual's population index.
    pub fn population_index(&self) -> usize {
        self.population_index
    }

    /// Proposes an innovation. `apply` is called with the individual's
    /// genome once the generation's innovations are resolved.
    pub fn propose<F>(&self, id: InnovationId, parms: InnovationParms, apply: F)
    where
        F: FnOnce(&mut G, &Innovation) + Send + 'static,
    {
        self.registry.add(IndividualInnovation::new(
            self.population_index,
            id,
            parms,
            apply,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    type Log = Vec<Innovation>;

    fn record(log: &mut Log, innovation: &Innovation) {
        log.push(*innovation);
    }

    fn registry(node_id: NodeId, innov_num: InnovationNumber) -> PopulationInnovations<Log> {
        let mut innovations = PopulationInnovations::new();
        innovations.init(node_id, innov_num);
        innovations
    }

    #[test]
    fn identical_links_share_numbers() {
        let mut innovations = registry(10, 10);
        innovations.sink(0).propose(InnovationId::link(3, 7, false), InnovationParms::default(), record);
        innovations.sink(1).propose(InnovationId::link(3, 7, false), InnovationParms::default(), record);
        innovations.sink(2).propose(InnovationId::link(3, 8, false), InnovationParms::default(), record);

        let mut genomes = vec![Log::new(); 3];
        assert_eq!(innovations.apply(&mut genomes), 2);

        assert!(genomes.iter().all(|log| log.len() == 1));
        assert_eq!(genomes[0][0].assignment, genomes[1][0].assignment);
        assert_ne!(
            genomes[0][0].innovation_num1(),
            genomes[2][0].innovation_num1()
        );
        for log in &genomes {
            assert!(log[0].innovation_num1() > 10);
        }
    }

    #[test]
    fn node_split_allocates_node_and_two_genes() {
        let mut innovations = registry(50, 100);
        innovations.sink(0).propose(InnovationId::node(3, 7, 100), InnovationParms::default(), record);

        let mut genomes = vec![Log::new()];
        innovations.apply(&mut genomes);

        let innovation = genomes[0][0];
        assert_eq!(innovation.newnode_id(), Some(51));
        assert_eq!(innovation.innovation_num1(), 101);
        assert_eq!(innovation.innovation_num2(), Some(102));
        assert_eq!(innovations.node_id(), 51);
        assert_eq!(innovations.innovation_num(), 102);
    }

    #[test]
    fn identical_splits_share_node() {
        let mut innovations = registry(4, 6);
        for i in 0..4 {
            innovations.sink(i).propose(InnovationId::node(0, 3, 2), InnovationParms::default(), record);
        }
        innovations.sink(4).propose(InnovationId::node(1, 3, 5), InnovationParms::default(), record);

        let mut genomes = vec![Log::new(); 5];
        assert_eq!(innovations.apply(&mut genomes), 2);

        let shared = genomes[0][0].assignment;
        assert!(genomes[..4].iter().all(|log| log[0].assignment == shared));
        assert_ne!(genomes[4][0].newnode_id(), genomes[0][0].newnode_id());
        assert_eq!(innovations.node_id(), 6);
        assert_eq!(innovations.innovation_num(), 10);
    }

    #[test]
    fn parms_are_not_unified() {
        let mut innovations = registry(0, 0);
        innovations.sink(0).propose(InnovationId::link(0, 1, false), InnovationParms::new(1.5, 0), record);
        innovations.sink(1).propose(InnovationId::link(0, 1, false), InnovationParms::new(-2.0, 3), record);

        let mut genomes = vec![Log::new(); 2];
        innovations.apply(&mut genomes);

        assert_eq!(genomes[0][0].parms, InnovationParms::new(1.5, 0));
        assert_eq!(genomes[1][0].parms, InnovationParms::new(-2.0, 3));
        assert_eq!(genomes[0][0].assignment, genomes[1][0].assignment);
    }

    #[test]
    fn distinct_innovations_get_distinct_fresh_numbers() {
        let mut innovations = registry(20, 30);
        let ids = [
            InnovationId::link(0, 1, false),
            InnovationId::link(0, 1, true),
            InnovationId::link(1, 0, false),
            InnovationId::node(0, 1, 7),
            InnovationId::node(0, 1, 8),
        ];
        for (i, id) in ids.iter().enumerate() {
            innovations.sink(i).propose(*id, InnovationParms::default(), record);
        }

        let mut genomes = vec![Log::new(); ids.len()];
        innovations.apply(&mut genomes);

        let mut genes: Vec<InnovationNumber> = genomes
            .iter()
            .flat_map(|log| log[0].innovation_num1()..=log[0].innovation_num2().unwrap_or(log[0].innovation_num1()))
            .collect();
        genes.sort_unstable();
        genes.dedup();
        assert_eq!(genes.len(), 3 + 2 * 2);
        assert!(genes.iter().all(|g| *g > 30));

        let nodes: Vec<NodeId> = genomes.iter().filter_map(|log| log[0].newnode_id()).collect();
        assert_eq!(nodes.len(), 2);
        assert_ne!(nodes[0], nodes[1]);
        assert!(nodes.iter().all(|n| *n > 20));
    }

    #[test]
    fn second_apply_is_a_no_op() {
        let mut innovations = registry(0, 0);
        innovations.sink(0).propose(InnovationId::link(0, 1, false), InnovationParms::default(), record);

        let mut genomes = vec![Log::new()];
        assert_eq!(innovations.apply(&mut genomes), 1);
        assert!(innovations.is_empty());
        assert_eq!(innovations.apply(&mut genomes), 0);
        assert_eq!(genomes[0].len(), 1);
        assert_eq!(innovations.innovation_num(), 1);
    }

    #[test]
    fn empty_apply_keeps_counters() {
        let mut innovations = registry(5, 9);
        let mut genomes: Vec<Log> = vec![];
        assert_eq!(innovations.apply(&mut genomes), 0);
        assert_eq!(innovations.node_id(), 5);
        assert_eq!(innovations.innovation_num(), 9);
    }

    #[test]
    fn resolution_is_independent_of_proposal_order() {
        let ids = [
            InnovationId::link(4, 2, false),
            InnovationId::node(0, 2, 1),
            InnovationId::link(0, 5, true),
            InnovationId::link(4, 2, false),
            InnovationId::node(0, 2, 1),
        ];

        let resolve = |order: &[usize]| {
            let mut innovations = registry(6, 8);
            for i in order {
                innovations.sink(*i).propose(ids[*i], InnovationParms::default(), record);
            }
            let mut genomes = vec![Log::new(); ids.len()];
            innovations.apply(&mut genomes);
            genomes
        };

        assert_eq!(resolve(&[0, 1, 2, 3, 4]), resolve(&[4, 3, 2, 1, 0]));
        assert_eq!(resolve(&[0, 1, 2, 3, 4]), resolve(&[2, 0, 4, 1, 3]));
    }

    #[test]
    fn concurrent_proposals() {
        const INDIVIDUALS: usize = 1000;
        let mut innovations = registry(10, 100);

        (0..INDIVIDUALS).into_par_iter().for_each(|i| {
            innovations.sink(i).propose(
                InnovationId::link(i % 7, 10, false),
                InnovationParms::default(),
                record,
            );
        });
        assert_eq!(innovations.len(), INDIVIDUALS);

        let mut genomes = vec![Log::new(); INDIVIDUALS];
        assert_eq!(innovations.apply(&mut genomes), 7);

        for (i, log) in genomes.iter().enumerate() {
            assert_eq!(log.len(), 1);
            // Links are numbered in order of their input node.
            assert_eq!(log[0].innovation_num1(), 101 + i % 7);
        }
    }

    #[test]
    #[should_panic]
    fn proposal_from_missing_individual() {
        let mut innovations = registry(0, 0);
        innovations.sink(3).propose(InnovationId::link(0, 1, false), InnovationParms::default(), record);
        innovations.apply(&mut vec![Log::new()]);
    }
}

//! Snapshots of evolving populations and
//! summaries of repeated experiment runs.
use super::{Population, SpeciesID, Winner};

use crate::genome::Genome;

use std::fmt;

/// Which genomes a [`Snapshot`] keeps copies of.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportingLevel {
    AllGenomes,
    SpeciesChampions,
    PopulationChampion,
    NoGenomes,
}

/// The state of a population at the start of a generation.
#[derive(Clone, Debug)]
pub struct Snapshot<G> {
    pub generation: usize,
    pub species_count: usize,
    pub sample: Sample<G>,
    /// Named statistics over every genome.
    pub stats: Vec<(String, Stats)>,
}

impl<G> fmt::Display for Snapshot<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "generation {}: {} species", self.generation, self.species_count)?;
        self.stats
            .iter()
            .try_for_each(|(name, stats)| write!(f, "; {} {}", name, stats))
    }
}

/// Genomes copied into a [`Snapshot`], as
/// chosen by its [`ReportingLevel`].
#[derive(Clone, Debug)]
pub enum Sample<G> {
    /// Every species, with its members and stagnation.
    Species(Vec<(SpeciesID, Vec<G>, usize)>),
    /// Every species, with its champion and stagnation.
    SpeciesChampions(Vec<(SpeciesID, G, usize)>),
    PopulationChampion(G),
    None,
}

/// Extremes, mean and median of a sample.
/// All are 0 for an empty sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stats {
    pub minimum: f32,
    pub maximum: f32,
    pub mean: f32,
    pub median: f32,
}

impl FromIterator<f32> for Stats {
    /// # Examples
    /// ```
    /// use parneat::logging::Stats;
    ///
    /// let stats: Stats = [1.5, -2.0, 0.5, 1.0, -1.0].into_iter().collect();
    /// assert_eq!((stats.minimum, stats.maximum), (-2.0, 1.5));
    /// assert_eq!((stats.mean, stats.median), (0.0, 0.5));
    /// ```
    fn from_iter<I: IntoIterator<Item = f32>>(values: I) -> Stats {
        let mut sorted: Vec<f32> = values.into_iter().collect();
        sorted.sort_by(f32::total_cmp);
        let (first, last) = match (sorted.first(), sorted.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Stats::default(),
        };

        let len = sorted.len();
        let median = if len % 2 == 0 {
            (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
        } else {
            sorted[len / 2]
        };
        Stats {
            minimum: first,
            maximum: last,
            mean: sorted.iter().sum::<f32>() / len as f32,
            median,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[min {:.3}, median {:.3}, mean {:.3}, max {:.3}]",
            self.minimum, self.median, self.mean, self.maximum
        )
    }
}

/// Keeps a [`Snapshot`] of a population per call to [`log`].
///
/// [`log`]: EvolutionLogger::log
#[derive(Clone, Debug)]
pub struct EvolutionLogger<G> {
    level: ReportingLevel,
    snapshots: Vec<Snapshot<G>>,
}

impl<G: Genome + Clone> EvolutionLogger<G> {
    pub fn new(level: ReportingLevel) -> EvolutionLogger<G> {
        EvolutionLogger {
            level,
            snapshots: vec![],
        }
    }

    /// Records and returns a snapshot of `population`.
    ///
    /// `measure` maps each genome to `N` values, and a
    /// [`Stats`] of each is kept under the matching name.
    ///
    /// # Examples
    /// ```
    /// use parneat::{Genome, Population, PopulationConfig};
    /// use parneat::logging::{EvolutionLogger, ReportingLevel};
    /// use parneat_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let population = Population::<_, NNGenome>::new(PopulationConfig::zero(), GeneticConfig::zero());
    /// let mut logger = EvolutionLogger::new(ReportingLevel::NoGenomes);
    ///
    /// let snapshot = logger.log(&population, &|g| [g.gene_count() as f32], ["genes"]);
    /// assert_eq!(snapshot.to_string(), "generation 0: 1 species; genes [min 0.000, median 0.000, mean 0.000, max 0.000]");
    /// ```
    pub fn log<C, M, const N: usize>(
        &mut self,
        population: &Population<C, G>,
        measure: &M,
        names: [&str; N],
    ) -> &Snapshot<G>
    where
        G: Genome<Config = C>,
        M: Fn(&G) -> [f32; N],
    {
        let mut columns: Vec<Vec<f32>> = vec![Vec::with_capacity(population.size()); N];
        for values in population.genomes().map(measure) {
            for (column, value) in columns.iter_mut().zip(values) {
                column.push(value);
            }
        }
        let stats = names
            .iter()
            .zip(columns)
            .map(|(name, column)| (name.to_string(), column.into_iter().collect()))
            .collect();

        let sample = match self.level {
            ReportingLevel::AllGenomes => Sample::Species(
                population
                    .species()
                    .map(|s| (s.id(), s.genomes().cloned().collect(), s.time_stagnated()))
                    .collect(),
            ),
            ReportingLevel::SpeciesChampions => Sample::SpeciesChampions(
                population
                    .species()
                    .map(|s| (s.id(), s.champion().clone(), s.time_stagnated()))
                    .collect(),
            ),
            ReportingLevel::PopulationChampion => {
                Sample::PopulationChampion(population.champion().clone())
            }
            ReportingLevel::NoGenomes => Sample::None,
        };

        self.snapshots.push(Snapshot {
            generation: population.generation(),
            species_count: population.species().count(),
            sample,
            stats,
        });
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot<G>> {
        self.snapshots.iter()
    }
}

/// How a run that found a winner ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Solution {
    /// Number of organisms evaluated up to and including the winner.
    pub evals: usize,
    pub genes: usize,
    pub nodes: usize,
}

/// The result of a single evolutionary run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunRecord {
    /// Number of generations evaluated.
    pub generations: usize,
    pub solution: Option<Solution>,
}

impl RunRecord {
    /// Records a run won during `generation` (counting from 0)
    /// of a population of `population_size` organisms.
    ///
    /// # Examples
    /// ```
    /// use parneat::Winner;
    /// use parneat::logging::RunRecord;
    ///
    /// let winner = Winner { index: 4, gene_count: 12, node_count: 7 };
    /// let run = RunRecord::solved(2, 100, &winner);
    ///
    /// assert_eq!(run.generations, 3);
    /// assert_eq!(run.solution.map(|s| s.evals), Some(205));
    /// ```
    pub fn solved(generation: usize, population_size: usize, winner: &Winner) -> RunRecord {
        RunRecord {
            generations: generation + 1,
            solution: Some(Solution {
                evals: population_size * generation + winner.index + 1,
                genes: winner.gene_count,
                nodes: winner.node_count,
            }),
        }
    }

    /// Records a run which exhausted its generations.
    pub fn failed(generations: usize) -> RunRecord {
        RunRecord {
            generations,
            solution: None,
        }
    }
}

/// Aggregate results of repeated runs of an experiment.
///
/// Averages are taken over successful runs only,
/// and are 0 if no run succeeded.
#[derive(Clone, Debug, Default)]
pub struct ExperimentSummary {
    runs: Vec<RunRecord>,
}

impl ExperimentSummary {
    pub fn new() -> ExperimentSummary {
        ExperimentSummary::default()
    }

    pub fn record(&mut self, run: RunRecord) {
        self.runs.push(run);
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    fn solutions(&self) -> impl Iterator<Item = (usize, &Solution)> {
        self.runs
            .iter()
            .filter_map(|r| r.solution.as_ref().map(|s| (r.generations, s)))
    }

    /// Returns the number of runs that found no winner.
    pub fn failures(&self) -> usize {
        self.runs.iter().filter(|r| r.solution.is_none()).count()
    }

    pub fn average_generations(&self) -> f32 {
        self.average(|(generations, _)| generations)
    }

    pub fn average_nodes(&self) -> f32 {
        self.average(|(_, s)| s.nodes)
    }

    pub fn average_genes(&self) -> f32 {
        self.average(|(_, s)| s.genes)
    }

    pub fn average_evals(&self) -> f32 {
        self.average(|(_, s)| s.evals)
    }

    fn average(&self, value: impl Fn((usize, &Solution)) -> usize) -> f32 {
        let successes = self.runs.len() - self.failures();
        if successes == 0 {
            return 0.0;
        }
        self.solutions().map(value).sum::<usize>() as f32 / successes as f32
    }
}

impl fmt::Display for ExperimentSummary {
    /// Lists each run's solution, with 0 for runs that failed,
    /// followed by the failures and averages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: [(&str, fn(&Solution) -> usize); 3] = [
            ("Nodes", |s| s.nodes),
            ("Genes", |s| s.genes),
            ("Evals", |s| s.evals),
        ];
        for (name, value) in columns {
            writeln!(f, "{}:", name)?;
            for run in &self.runs {
                writeln!(f, "{}", run.solution.as_ref().map_or(0, value))?;
            }
        }
        writeln!(
            f,
            "Failures: {} out of {} runs",
            self.failures(),
            self.runs.len()
        )?;
        writeln!(f, "Average Generations: {}", self.average_generations())?;
        writeln!(f, "Average Nodes: {}", self.average_nodes())?;
        writeln!(f, "Average Genes: {}", self.average_genes())?;
        write!(f, "Average Evals: {}", self.average_evals())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populations::PopulationConfig;
    use crate::testing::Scripted;

    use std::num::NonZeroUsize;

    #[test]
    fn stats_of_even_and_empty_samples() {
        let stats: Stats = vec![4.0, 1.0, 3.0, 2.0].into_iter().collect();
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(std::iter::empty().collect::<Stats>(), Stats::default());
    }

    #[test]
    fn logger_samples_by_reporting_level() {
        let seeds = [1.0, 2.0, 3.0]
            .iter()
            .copied()
            .map(Scripted::with_value)
            .collect();
        let config = PopulationConfig {
            size: NonZeroUsize::new(3).unwrap(),
            ..PopulationConfig::zero()
        };
        let mut population = Population::new_seeded(vec![seeds], config, ()).unwrap();
        population.evaluate_fitness(|g| g.value);

        let mut logger = EvolutionLogger::new(ReportingLevel::PopulationChampion);
        let log = logger.log(&population, &|g: &Scripted| [g.fitness()], ["fitness"]);
        assert_eq!(log.species_count, 1);
        assert_eq!(log.stats[0].1.maximum, 3.0);
        assert!(matches!(
            &log.sample,
            Sample::PopulationChampion(g) if g.value == 3.0
        ));
        assert_eq!(logger.iter().count(), 1);
    }

    #[test]
    fn logger_keeps_every_generation() {
        let seeds = (1..=4).map(|v| Scripted::with_value(v as f32)).collect();
        let config = PopulationConfig {
            size: NonZeroUsize::new(4).unwrap(),
            distance_threshold: 10.0,
            elitism: 1,
            survival_threshold: 0.5,
            stagnation_threshold: NonZeroUsize::new(15).unwrap(),
            ..PopulationConfig::zero()
        };
        let mut population = Population::new_seeded(vec![seeds], config, ()).unwrap();
        let mut logger = EvolutionLogger::new(ReportingLevel::NoGenomes);
        for _ in 0..3 {
            logger.log(&population, &|g: &Scripted| [g.gene_count() as f32], ["genes"]);
            population.evaluate_fitness(|g| g.value);
            population.evolve().unwrap();
        }

        let generations: Vec<usize> = logger.iter().map(|s| s.generation).collect();
        assert_eq!(generations, [0, 1, 2]);
        assert_eq!(logger.iter().map(|s| s.species_count).max(), Some(1));
        let last = logger.iter().last().unwrap();
        assert!(last.stats[0].1.maximum >= 1.0);
        assert!(matches!(last.sample, Sample::None));
    }

    #[test]
    fn summary_averages_successful_runs() {
        let mut summary = ExperimentSummary::new();
        let winner = |index, gene_count, node_count| Winner {
            index,
            gene_count,
            node_count,
        };
        summary.record(RunRecord::solved(0, 10, &winner(3, 10, 5)));
        summary.record(RunRecord::failed(50));
        summary.record(RunRecord::solved(4, 10, &winner(0, 20, 7)));

        assert_eq!(summary.failures(), 1);
        assert_eq!(summary.average_generations(), 3.0);
        assert_eq!(summary.average_genes(), 15.0);
        assert_eq!(summary.average_nodes(), 6.0);
        assert_eq!(summary.average_evals(), (4.0 + 41.0) / 2.0);

        let printed = summary.to_string();
        assert!(printed.starts_with("Nodes:\n5\n0\n7\nGenes:\n10\n0\n20\nEvals:\n4\n0\n41\n"));
        assert!(printed.contains("Failures: 1 out of 3 runs"));
        assert!(printed.ends_with("Average Evals: 22.5"));
    }

    #[test]
    fn empty_summary_has_zero_averages() {
        let summary = ExperimentSummary::new();
        assert_eq!(summary.failures(), 0);
        assert_eq!(summary.average_evals(), 0.0);
    }
}

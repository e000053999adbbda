use super::*;

use rayon::prelude::*;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// An organism's own slices of the epoch's detail buffers.
///
/// Both slices have [`Evaluator::trace_len`] elements, and
/// are disjoint from those of every other organism.
#[derive(Debug)]
pub struct Trace<'a> {
    pub activations: &'a mut [f32],
    pub errors: &'a mut [f32],
}

/// Result of evaluating a single organism.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    /// Must be ≥0.
    pub fitness: f32,
    pub error: f32,
    /// Whether the organism solves the task.
    pub winner: bool,
}

/// A task against which organisms are scored.
///
/// Evaluators are shared between the threads evaluating
/// a population, and so must be `Sync`.
pub trait Evaluator<G>: Sync {
    /// Number of detail values written per organism
    /// to each of [`Trace::activations`] and [`Trace::errors`].
    fn trace_len(&self) -> usize {
        0
    }

    /// Scores `genome`, optionally recording the
    /// details of its behaviour into `trace`.
    fn evaluate(&self, genome: &G, trace: Trace<'_>) -> Evaluation;

    /// Reports an organism that beat the best fitness
    /// seen so far in the run.
    fn report(&self, best: &BestOrganism) {
        log::info!(
            "new best_fitness={}; fitness={}, errorsum={} -- activation (err)",
            best.fitness,
            best.fitness,
            best.error
        );
        log::info!(
            "{}",
            best.activations
                .iter()
                .zip(&best.errors)
                .map(|(a, e)| format!("{:.6} ({:.6})", a, e))
                .collect::<Vec<_>>()
                .join(" ")
        );
    }
}

/// The best fitness seen over a whole run,
/// across all of its epochs.
#[derive(Clone, Debug, Default)]
pub struct FitnessTracker {
    best: f32,
}

impl FitnessTracker {
    /// Returns a tracker for a new run.
    pub fn new() -> FitnessTracker {
        FitnessTracker { best: 0.0 }
    }

    /// Returns the best fitness seen so far.
    pub fn best(&self) -> f32 {
        self.best
    }

    fn record(&mut self, fitness: f32) {
        self.best = self.best.max(fitness);
    }
}

/// The organism solving the task with the smallest
/// population index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Winner {
    pub index: usize,
    pub gene_count: usize,
    pub node_count: usize,
}

/// An organism that improved on the run's best fitness.
#[derive(Clone, Debug, PartialEq)]
pub struct BestOrganism {
    pub index: usize,
    pub fitness: f32,
    pub error: f32,
    pub activations: Vec<f32>,
    pub errors: Vec<f32>,
}

/// What happened during an epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct EpochOutcome {
    /// The generation that was evaluated.
    pub generation: usize,
    pub winner: Option<Winner>,
    /// Set only when the run's best fitness improved.
    pub best: Option<BestOrganism>,
}

impl EpochOutcome {
    /// Returns whether a winner was found.
    pub fn success(&self) -> bool {
        self.winner.is_some()
    }
}

/// Epoch state shared between evaluating threads.
struct Shared {
    best_fitness: f32,
    best: Option<usize>,
    winner: Option<Winner>,
}

struct EpochState {
    /// Possibly stale copy of `Shared::best_fitness`. Only grows.
    best_fitness_bits: AtomicU32,
    shared: Mutex<Shared>,
}

impl EpochState {
    fn new(best_fitness: f32) -> EpochState {
        EpochState {
            best_fitness_bits: AtomicU32::new(best_fitness.to_bits()),
            shared: Mutex::new(Shared {
                best_fitness,
                best: None,
                winner: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observe<G: Genome>(&self, index: usize, genome: &G, evaluation: &Evaluation) {
        if evaluation.winner {
            let candidate = Winner {
                index,
                gene_count: genome.gene_count(),
                node_count: genome.node_count(),
            };
            let mut shared = self.lock();
            if shared.winner.map_or(true, |w| index < w.index) {
                shared.winner = Some(candidate);
            }
        }

        let fitness = evaluation.fitness;
        if fitness >= f32::from_bits(self.best_fitness_bits.load(Ordering::Relaxed)) {
            let mut shared = self.lock();
            let improves = fitness > shared.best_fitness
                || (fitness == shared.best_fitness && shared.best.map_or(false, |b| index < b));
            if improves {
                shared.best_fitness = fitness;
                shared.best = Some(index);
                self.best_fitness_bits
                    .store(fitness.to_bits(), Ordering::Relaxed);
            }
        }
    }

    fn into_inner(self) -> Shared {
        self.shared.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

fn scratch_buffer(len: usize) -> Result<Vec<f32>, EpochError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(EpochError::ScratchAllocation)?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}

impl<C, G> Population<C, G>
where
    G: Genome<Config = C> + Clone + Send + Sync,
    C: Sync,
{
    /// Runs one generation: scores every genome in parallel,
    /// reports any genome beating the run's best fitness,
    /// and then [evolves] the population.
    ///
    /// The returned outcome names the winner with the smallest
    /// population index, if any genome solved the task. Among
    /// genomes sharing the highest fitness, the one with the
    /// smallest index is the best.
    ///
    /// # Panics
    /// Panics if the evaluator returns a negative fitness.
    ///
    /// # Errors
    /// Returns an error if the trace buffers could not be
    /// allocated, in which case nothing was evaluated, or if
    /// the evaluated population could not be evolved.
    ///
    /// [evolves]: Population::evolve
    pub fn epoch<E>(
        &mut self,
        evaluator: &E,
        tracker: &mut FitnessTracker,
    ) -> Result<EpochOutcome, EpochError>
    where
        E: Evaluator<G>,
    {
        let generation = self.generation;
        let trace_len = evaluator.trace_len();
        let stride = trace_len.max(1);
        let size = self.size();
        let mut activations = scratch_buffer(size.saturating_mul(stride))?;
        let mut errors = scratch_buffer(size.saturating_mul(stride))?;

        let started = Instant::now();
        let state = EpochState::new(tracker.best());
        let mut organisms: Vec<&mut G> = self.genomes_mut().collect();
        let evaluations: Vec<Evaluation> = organisms
            .par_iter_mut()
            .zip(activations.par_chunks_mut(stride))
            .zip(errors.par_chunks_mut(stride))
            .enumerate()
            .map(|(index, ((genome, activations), errors))| {
                let genome: &mut G = genome;
                let evaluation = evaluator.evaluate(
                    genome,
                    Trace {
                        activations: &mut activations[..trace_len],
                        errors: &mut errors[..trace_len],
                    },
                );
                assert!(
                    evaluation.fitness >= 0.0,
                    "evaluator returned a negative fitness for organism {}",
                    index
                );
                genome.set_fitness(evaluation.fitness);
                state.observe(index, genome, &evaluation);
                evaluation
            })
            .collect();
        drop(organisms);
        log::debug!(
            "generation {}: evaluated {} organisms in {:?}",
            generation,
            size,
            started.elapsed()
        );

        let shared = state.into_inner();
        let best = shared.best.map(|index| {
            let trace = index * stride..index * stride + trace_len;
            BestOrganism {
                index,
                fitness: shared.best_fitness,
                error: evaluations[index].error,
                activations: activations[trace.clone()].to_vec(),
                errors: errors[trace].to_vec(),
            }
        });
        if let Some(best) = &best {
            tracker.record(best.fitness);
            evaluator.report(best);
        }
        if let Some(winner) = &shared.winner {
            log::info!(
                "generation {}: organism {} solves the task ({} genes, {} nodes)",
                generation,
                winner.index,
                winner.gene_count,
                winner.node_count
            );
        }

        self.evolve()?;
        Ok(EpochOutcome {
            generation,
            winner: shared.winner,
            best,
        })
    }
}

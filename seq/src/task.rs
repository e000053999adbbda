//! The sequence recall task.
//!
//! Each test presents three bits, one every other step,
//! waits a step, and then queries the network, which
//! must output the three bits it was shown.

use parneat::{BestOrganism, Evaluation, Evaluator, Trace};
use parneat_nn::{genomics::NNGenome, networks::RealTimeNetwork};

/// Network inputs: bias, signal, unused, query, bit, unused.
pub const INPUTS: usize = 6;
pub const OUTPUTS: usize = 3;
const STEPS_PER_TEST: usize = 7;
const TESTS: usize = 1 << OUTPUTS;

const ACTIVATIONS_PER_INPUT: usize = 10;
/// Squared errors below this are ignored.
const ERROR_THRESHOLD: f32 = 0.05 * 0.05;
const WINNING_FITNESS: f32 = 0.9999999;

const WEIGHT_SEQUENCE: f32 = 4.0;
const WEIGHT_DELAY: f32 = 25.0;
const WEIGHT_QUERY: f32 = 55.0;

const BIAS: f32 = 1.0;
const SIGNAL: f32 = 1.0;
const QUERY: f32 = 1.0;

#[derive(Clone, Debug)]
struct Step {
    input: [f32; INPUTS],
    output: [f32; OUTPUTS],
    weight: f32,
}

impl Step {
    fn signal(bit: f32) -> Step {
        Step {
            input: [BIAS, SIGNAL, 0.0, 0.0, bit, 0.0],
            output: [0.0; OUTPUTS],
            weight: WEIGHT_SEQUENCE,
        }
    }

    fn pause(weight: f32) -> Step {
        Step {
            input: [BIAS, 0.0, 0.0, 0.0, 0.0, 0.0],
            output: [0.0; OUTPUTS],
            weight,
        }
    }

    fn query(bits: [f32; OUTPUTS]) -> Step {
        Step {
            input: [BIAS, 0.0, 0.0, QUERY, 0.0, 0.0],
            output: bits,
            weight: WEIGHT_QUERY,
        }
    }
}

/// Scores networks on recalling every
/// sequence of three bits.
#[derive(Clone, Debug)]
pub struct SequenceTask {
    tests: Vec<[Step; STEPS_PER_TEST]>,
    max_error: f32,
}

impl SequenceTask {
    pub fn new() -> SequenceTask {
        let tests: Vec<_> = (0..TESTS)
            .map(|pattern| {
                let bit = |position: usize| ((pattern >> (OUTPUTS - 1 - position)) & 1) as f32;
                [
                    Step::signal(bit(0)),
                    Step::pause(WEIGHT_SEQUENCE),
                    Step::signal(bit(1)),
                    Step::pause(WEIGHT_SEQUENCE),
                    Step::signal(bit(2)),
                    Step::pause(WEIGHT_DELAY),
                    Step::query([bit(0), bit(1), bit(2)]),
                ]
            })
            .collect();
        let max_error: f32 = tests.iter().flatten().map(|s| s.weight).sum();
        SequenceTask { tests, max_error }
    }

    /// Scores the outputs `respond` gives to each step's inputs,
    /// filling in `trace` with every output and its error.
    ///
    /// `respond` is told when a test ends, so it may flush
    /// any state between tests.
    fn score<F>(&self, mut respond: F, trace: Trace<'_>) -> Evaluation
    where
        F: FnMut(Option<&[f32; INPUTS]>) -> [f32; OUTPUTS],
    {
        let mut details = trace.activations.iter_mut().zip(trace.errors.iter_mut());
        let mut error_sum = 0.0;
        for test in &self.tests {
            for step in test {
                let outputs = respond(Some(&step.input));
                let mut step_error = 0.0;
                for (activation, expected) in outputs.iter().zip(&step.output) {
                    let mut error = (activation - expected).powi(2);
                    if error < ERROR_THRESHOLD {
                        error = 0.0;
                    }
                    step_error += error;
                    if let Some((a, e)) = details.next() {
                        *a = *activation;
                        *e = error;
                    }
                }
                error_sum += step_error * step.weight;
            }
            respond(None);
        }

        let fitness = (1.0 - error_sum / self.max_error).max(0.0);
        let winner = fitness >= WINNING_FITNESS;
        if winner {
            log::info!("FOUND A WINNER: {}", fitness);
        }
        Evaluation {
            fitness,
            error: error_sum,
            winner,
        }
    }
}

impl Default for SequenceTask {
    fn default() -> SequenceTask {
        SequenceTask::new()
    }
}

impl Evaluator<NNGenome> for SequenceTask {
    fn trace_len(&self) -> usize {
        TESTS * STEPS_PER_TEST * OUTPUTS
    }

    fn evaluate(&self, genome: &NNGenome, trace: Trace<'_>) -> Evaluation {
        let mut network = RealTimeNetwork::from(genome);
        self.score(
            |input| match input {
                Some(input) => {
                    network.set_inputs(input);
                    for _ in 0..ACTIVATIONS_PER_INPUT {
                        network.activate();
                    }
                    let mut outputs = [0.0; OUTPUTS];
                    outputs.copy_from_slice(network.outputs());
                    outputs
                }
                None => {
                    network.clear_state();
                    [0.0; OUTPUTS]
                }
            },
            trace,
        )
    }

    fn report(&self, best: &BestOrganism) {
        log::info!(
            "new best_fitness={:.6}; fitness={:.6}, errorsum={:.6} -- activation (err)",
            best.fitness,
            best.fitness,
            best.error
        );
        let mut details = best.activations.iter().zip(&best.errors);
        for _ in 0..TESTS {
            for _ in 0..STEPS_PER_TEST {
                let line: Vec<String> = details
                    .by_ref()
                    .take(OUTPUTS)
                    .map(|(a, e)| format!("{:.6} ({:.6})", a, e))
                    .collect();
                log::info!("{}", line.join(" "));
            }
            log::info!("---");
        }
    }
}

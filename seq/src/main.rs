//! Evolves recurrent networks that recall a sequence of three bits,
//! over repeated independent runs, and prints the aggregate results.
//!
//! Usage: `seq [experiment.ron]`

mod config;
mod task;

use config::ExperimentConfig;
use task::SequenceTask;

use parneat::logging::{EvolutionLogger, ExperimentSummary, ReportingLevel, RunRecord};
use parneat::{FitnessTracker, Genome, Population};
use parneat_nn::genomics::{GeneticConfig, NNGenome};

use std::env;
use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::Instant;

type SeqPopulation = Population<GeneticConfig, NNGenome>;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match env::args_os().nth(1) {
        Some(path) => ExperimentConfig::load(Path::new(&path))?,
        None => ExperimentConfig::default(),
    };
    fs::create_dir_all(&config.output_dir)
        .map_err(|e| format!("{}: {}", config.output_dir.display(), e))?;

    log::info!("START SEQ_EXPERIMENT TEST");
    let task = SequenceTask::new();
    let mut summary = ExperimentSummary::new();
    for run in 0..config.runs {
        summary.record(run_experiment(&config, &task, run)?);
    }

    println!("{}", summary);
    Ok(())
}

/// Evolves a fresh population until it solves the
/// task or runs out of generations.
fn run_experiment(
    config: &ExperimentConfig,
    task: &SequenceTask,
    run: usize,
) -> Result<RunRecord, Box<dyn Error>> {
    let mut population = SeqPopulation::new(config.population.clone(), config.genetic.clone());
    let mut tracker = FitnessTracker::new();
    let mut logger = EvolutionLogger::new(ReportingLevel::NoGenomes);
    let mut record = RunRecord::failed(config.generations);

    let mut generation = 0;
    while generation < config.generations {
        log::info!("Run {}, epoch {}", run, generation + 1);
        let snapshot = logger.log(
            &population,
            &|g: &NNGenome| [g.gene_count() as f32, g.node_count() as f32],
            ["genes", "nodes"],
        );
        log::debug!("{}", snapshot);

        let started = Instant::now();
        let outcome = population.epoch(task, &mut tracker);
        log::info!("epoch took {:?}", started.elapsed());
        generation += 1;

        match outcome {
            Ok(outcome) => {
                if let Some(winner) = &outcome.winner {
                    record = RunRecord::solved(outcome.generation, population.size(), winner);
                    break;
                }
            }
            Err(e) => {
                log::error!("run {} stopped: {}", run, e);
                record = RunRecord::failed(generation);
                break;
            }
        }

        if generation % config.print_every.get() == 0 {
            dump(&population, &config.output_dir, generation)?;
        }
    }

    let peak_species = logger.iter().map(|s| s.species_count).max().unwrap_or(0);
    if let Some(last) = logger.iter().last() {
        log::info!(
            "run {} ended after {} generations, at most {} species; last {}",
            run,
            generation,
            peak_species,
            last
        );
    }

    dump(&population, &config.output_dir, generation)?;
    Ok(record)
}

/// Writes `population` as RON to `<dir>/gen_<generation>`.
fn dump(population: &SeqPopulation, dir: &Path, generation: usize) -> Result<(), Box<dyn Error>> {
    let path = dir.join(format!("gen_{}", generation));
    let text = ron::ser::to_string_pretty(population, ron::ser::PrettyConfig::new())?;
    fs::write(&path, text).map_err(|e| format!("{}: {}", path.display(), e))?;
    log::debug!("population written to {}", path.display());
    Ok(())
}

use crate::task::{INPUTS, OUTPUTS};
use parneat::{ConfigError, PopulationConfig};
use parneat_nn::genomics::{ActivationType, GeneticConfig};

use serde::{Deserialize, Serialize};

use std::error::Error;
use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Settings of a whole experiment.
///
/// Missing fields take their value from [`ExperimentConfig::default`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Number of independent runs.
    pub runs: usize,
    /// Maximum number of generations per run.
    pub generations: usize,
    /// A run's population is written out every
    /// `print_every` generations, until it succeeds.
    pub print_every: NonZeroUsize,
    /// Directory population dumps are written to.
    pub output_dir: PathBuf,
    pub population: PopulationConfig,
    pub genetic: GeneticConfig,
}

impl ExperimentConfig {
    /// Reads and validates a configuration from a RON file.
    pub fn load(path: &Path) -> Result<ExperimentConfig, Box<dyn Error>> {
        let in_file = |e: &dyn fmt::Display| format!("{}: {}", path.display(), e);
        let text = fs::read_to_string(path).map_err(|e| in_file(&e))?;
        let config: ExperimentConfig = ron::from_str(&text).map_err(|e| in_file(&e))?;
        config.validate().map_err(|e| in_file(&e))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.population.validate()?;
        self.genetic.validate()
    }
}

/// Zero is clamped to one.
const fn non_zero(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(n) => n,
        None => NonZeroUsize::MIN,
    }
}

impl Default for ExperimentConfig {
    fn default() -> ExperimentConfig {
        ExperimentConfig {
            runs: 10,
            generations: 1000,
            print_every: non_zero(50),
            output_dir: PathBuf::from("seq_output"),
            population: PopulationConfig {
                size: non_zero(1000),
                distance_threshold: 10.0,
                elitism: 1,
                survival_threshold: 0.2,
                adoption_rate: 1.0,
                sexual_reproduction_chance: 0.75,
                interspecies_mating_chance: 0.001,
                stagnation_threshold: non_zero(15),
                stagnation_penalty: 1.0,
            },
            genetic: GeneticConfig {
                input_count: non_zero(INPUTS),
                output_count: non_zero(OUTPUTS),
                activation_types: vec![ActivationType::Sigmoid],
                output_activation_types: vec![ActivationType::Sigmoid; OUTPUTS],
                child_mutation_chance: 0.75,
                mate_by_averaging_chance: 0.4,
                // Suppressed genes stay suppressed.
                suppression_reset_chance: 0.0,
                initial_expression_chance: 1.0,
                weight_bound: 5.0,
                weight_reset_chance: 0.1,
                weight_nudge_chance: 0.9,
                weight_mutation_power: 2.5,
                node_addition_mutation_chance: 0.03,
                gene_addition_mutation_chance: 0.3,
                node_deletion_mutation_chance: 0.001,
                gene_deletion_mutation_chance: 0.01,
                max_gene_addition_mutation_attempts: 20,
                recursion_chance: 0.2,
                excess_gene_factor: 1.0,
                disjoint_gene_factor: 1.0,
                common_weight_factor: 0.4,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn missing_fields_take_defaults() {
        let config: ExperimentConfig =
            ron::from_str("(runs: 3, output_dir: \"dumps\")").unwrap();
        let defaults = ExperimentConfig::default();

        assert_eq!(config.runs, 3);
        assert_eq!(config.output_dir, PathBuf::from("dumps"));
        assert_eq!(config.generations, defaults.generations);
        assert_eq!(config.population.distance_threshold, 10.0);
        assert_eq!(config.genetic.input_count.get(), INPUTS);
        assert_eq!(config.genetic.gene_deletion_mutation_chance, 0.01);
    }

    #[test]
    fn defaults_are_valid() {
        assert_eq!(ExperimentConfig::default().validate(), Ok(()));
    }

    #[test]
    fn load_rejects_out_of_range_chances() {
        let path = env::temp_dir().join(format!("seq_config_{}.ron", std::process::id()));
        let mut genetic = ExperimentConfig::default().genetic;
        genetic.child_mutation_chance = 2.0;
        let text = format!("(genetic: {})", ron::to_string(&genetic).unwrap());
        fs::write(&path, text).unwrap();
        let error = ExperimentConfig::load(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(error.to_string().ends_with("child_mutation_chance is 2, expected a chance in [0, 1]"));
    }

    #[test]
    fn load_names_the_offending_file() {
        let error = ExperimentConfig::load(Path::new("no/such/experiment.ron")).unwrap_err();
        assert!(error.to_string().starts_with("no/such/experiment.ron: "));
    }
}

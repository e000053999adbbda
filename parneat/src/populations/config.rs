use crate::populations::ConfigError;

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Parameters of speciation and reproduction.
///
/// Chances are probabilities and must lie in [0, 1];
/// see [`validate`](PopulationConfig::validate).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of organisms in every generation.
    pub size: NonZeroUsize,
    /// Two genomes whose genetic distance is
    /// below this value share a species.
    pub distance_threshold: f32,
    /// Best genomes of each species carried
    /// unchanged into the next generation.
    pub elitism: usize,
    /// Fraction of each species, from the top,
    /// allowed to become a parent.
    pub survival_threshold: f32,
    /// Chance that a child is placed by speciation rather
    /// than kept in the species of its parent.
    pub adoption_rate: f32,
    /// Chance that a child has two parents.
    pub sexual_reproduction_chance: f32,
    /// Chance that the second parent is drawn
    /// from another species.
    pub interspecies_mating_chance: f32,
    /// Generations a species may go without improving
    /// its best fitness before it is penalized.
    pub stagnation_threshold: NonZeroUsize,
    /// Fraction of its offspring a stagnated species loses.
    pub stagnation_penalty: f32,
}

impl PopulationConfig {
    /// Returns a configuration with every numeric field at 0,
    /// except for the non-zero fields, which are 1.
    ///
    /// Meant for filling the fields a test or
    /// experiment does not care about:
    /// ```
    /// use parneat::PopulationConfig;
    ///
    /// let config = PopulationConfig {
    ///     elitism: 2,
    ///     ..PopulationConfig::zero()
    /// };
    /// assert_eq!(config.size.get(), 1);
    /// ```
    pub const fn zero() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::MIN,
            distance_threshold: 0.0,
            elitism: 0,
            survival_threshold: 0.0,
            adoption_rate: 0.0,
            sexual_reproduction_chance: 0.0,
            interspecies_mating_chance: 0.0,
            stagnation_threshold: NonZeroUsize::MIN,
            stagnation_penalty: 0.0,
        }
    }

    /// Checks every chance and threshold, returning
    /// the first one found out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_non_negative("distance_threshold", self.distance_threshold)?;
        ConfigError::check_chance("survival_threshold", self.survival_threshold)?;
        ConfigError::check_chance("adoption_rate", self.adoption_rate)?;
        ConfigError::check_chance("sexual_reproduction_chance", self.sexual_reproduction_chance)?;
        ConfigError::check_chance("interspecies_mating_chance", self.interspecies_mating_chance)?;
        ConfigError::check_chance("stagnation_penalty", self.stagnation_penalty)
    }

    /// Number of elites kept from a species of `len` genomes.
    pub(crate) fn elite_count(&self, len: usize) -> usize {
        len.min(self.elitism)
    }

    /// Number of potential parents in a species of `len` genomes.
    pub(crate) fn survivor_count(&self, len: usize) -> usize {
        (len as f32 * self.survival_threshold).ceil() as usize
    }

    /// Multiplier applied to the offspring share of a species
    /// that has not improved for `time_stagnated` generations.
    pub(crate) fn stagnation_factor(&self, time_stagnated: usize) -> f32 {
        if time_stagnated >= self.stagnation_threshold.get() {
            1.0 - self.stagnation_penalty
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_valid() {
        assert_eq!(PopulationConfig::zero().validate(), Ok(()));
    }

    #[test]
    fn out_of_range_chances_are_rejected() {
        let config = PopulationConfig {
            adoption_rate: 1.5,
            ..PopulationConfig::zero()
        };
        let error = config.validate().unwrap_err();
        assert_eq!(error.field, "adoption_rate");
        assert_eq!(error.to_string(), "adoption_rate is 1.5, expected a chance in [0, 1]");

        let config = PopulationConfig {
            distance_threshold: f32::NAN,
            ..PopulationConfig::zero()
        };
        assert_eq!(config.validate().unwrap_err().field, "distance_threshold");
    }

    #[test]
    fn stagnation_factor_applies_past_threshold() {
        let config = PopulationConfig {
            stagnation_threshold: NonZeroUsize::new(3).unwrap(),
            stagnation_penalty: 0.25,
            ..PopulationConfig::zero()
        };
        assert_eq!(config.stagnation_factor(2), 1.0);
        assert_eq!(config.stagnation_factor(3), 0.75);
    }

    #[test]
    fn survivors_round_up() {
        let config = PopulationConfig {
            elitism: 2,
            survival_threshold: 0.2,
            ..PopulationConfig::zero()
        };
        assert_eq!(config.survivor_count(6), 2);
        assert_eq!(config.survivor_count(0), 0);
        assert_eq!(config.elite_count(1), 1);
        assert_eq!(config.elite_count(5), 2);
    }
}

use std::collections::TryReserveError;
use std::error::Error;
use std::fmt;

/// An error type indicating a failure to
/// evolve a population into its next generation.
#[derive(Debug)]
pub enum EvolutionError {
    /// The total fitness of the population is zero,
    /// so no offspring can be allotted.
    DegeneratePopulation,
}

/// A configuration value outside of its accepted range.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Name of the offending field.
    pub field: &'static str,
    pub value: f32,
    /// Human-readable description of the accepted range.
    pub expected: &'static str,
}

impl ConfigError {
    /// Checks that `value` is a probability.
    pub fn check_chance(field: &'static str, value: f32) -> Result<(), ConfigError> {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError {
                field,
                value,
                expected: "a chance in [0, 1]",
            })
        }
    }

    /// Checks that `value` is finite and not negative.
    pub fn check_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ConfigError {
                field,
                value,
                expected: "a finite non-negative value",
            })
        }
    }
}

/// An error type indicating a failed epoch.
#[derive(Debug)]
pub enum EpochError {
    /// The per-organism trace buffers could not be allocated.
    /// No organism was evaluated.
    ScratchAllocation(TryReserveError),
    /// All organisms were evaluated, but the
    /// population could not be evolved.
    Evolution(EvolutionError),
}

impl fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegeneratePopulation => write!(f, "attempted evolution on degenerate population"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is {}, expected {}", self.field, self.value, self.expected)
    }
}

impl fmt::Display for EpochError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScratchAllocation(e) => write!(f, "could not allocate evaluation traces: {}", e),
            Self::Evolution(e) => write!(f, "epoch evaluated but not evolved: {}", e),
        }
    }
}

impl Error for EvolutionError {}
impl Error for ConfigError {}

impl Error for EpochError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ScratchAllocation(e) => Some(e),
            Self::Evolution(e) => Some(e),
        }
    }
}

impl From<EvolutionError> for EpochError {
    fn from(e: EvolutionError) -> EpochError {
        EpochError::Evolution(e)
    }
}

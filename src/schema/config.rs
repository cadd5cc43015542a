//! Configuration types for the rotation search engine.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::FitnessWeights;

/// Top-level engine configuration, chosen once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of contiguous subpopulations the population is split into.
    #[serde(default = "default_pop_divider")]
    pub pop_divider: usize,
    /// Parent selection settings.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Probability that an offspring pair undergoes crossover (0.0-1.0).
    #[serde(default = "default_crossover_probability")]
    pub crossover_probability: f64,
    /// Probability that an offspring undergoes mutation (0.0-1.0).
    #[serde(default = "default_mutation_probability")]
    pub mutation_probability: f64,
    /// Length of the window exchanged by crossover.
    #[serde(default = "default_crossover_length")]
    pub crossover_length: usize,
    /// Maximum length of the window replaced by subsequence mutation.
    #[serde(default = "default_mutation_window")]
    pub mutation_window: usize,
    /// Mutation operators drawn uniformly by composite mutation.
    #[serde(default = "default_mutation_operators")]
    pub mutation_operators: Vec<MutationOperator>,
    /// Objective weights and ordering.
    #[serde(default)]
    pub fitness: FitnessWeights,
    /// Stagnation reset thresholds.
    #[serde(default)]
    pub stagnation: StagnationConfig,
    /// Maximum number of individuals kept in the hall of fame.
    #[serde(default = "default_hall_of_fame_size")]
    pub hall_of_fame_size: usize,
    /// Process subpopulations and evaluations on the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pop_divider: default_pop_divider(),
            selection: SelectionConfig::default(),
            crossover_probability: default_crossover_probability(),
            mutation_probability: default_mutation_probability(),
            crossover_length: default_crossover_length(),
            mutation_window: default_mutation_window(),
            mutation_operators: default_mutation_operators(),
            fitness: FitnessWeights::default(),
            stagnation: StagnationConfig::default(),
            hall_of_fame_size: default_hall_of_fame_size(),
            parallel: default_parallel(),
            random_seed: None,
        }
    }
}

fn default_pop_divider() -> usize {
    4
}
fn default_crossover_probability() -> f64 {
    0.5
}
fn default_mutation_probability() -> f64 {
    0.2
}
fn default_crossover_length() -> usize {
    2
}
fn default_mutation_window() -> usize {
    3
}
fn default_mutation_operators() -> Vec<MutationOperator> {
    MutationOperator::ALL.to_vec()
}
fn default_hall_of_fame_size() -> usize {
    10
}
fn default_parallel() -> bool {
    true
}

/// Tournament selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Individuals sampled per tournament. Larger is more elitist.
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            tournament_size: default_tournament_size(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}

/// Mutation strategies available to composite mutation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MutationOperator {
    /// Replace a random window with a freshly generated subsequence.
    ReplaceSubsequence,
    /// Exchange the actions at two random positions.
    Swap,
}

impl MutationOperator {
    pub const ALL: [MutationOperator; 2] = [Self::ReplaceSubsequence, Self::Swap];
}

/// Thresholds for resetting stagnant subpopulations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagnationConfig {
    /// Stagnant generations after which a non-leading subpopulation resets.
    #[serde(default = "default_reset_after")]
    pub reset_after: usize,
    /// Stagnant generations after which any subpopulation resets, including
    /// the one holding the best fitness.
    #[serde(default = "default_force_reset_after")]
    pub force_reset_after: usize,
}

impl Default for StagnationConfig {
    fn default() -> Self {
        Self {
            reset_after: default_reset_after(),
            force_reset_after: default_force_reset_after(),
        }
    }
}

fn default_reset_after() -> usize {
    20
}
fn default_force_reset_after() -> usize {
    80
}

/// Population and generation settings for the run loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Maximum number of generations.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Stop once the best weighted score reaches this value.
    #[serde(default)]
    pub target_score: Option<f64>,
    /// Stagnation limit: stop if the best individual is unchanged for N generations.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            target_score: None,
            stagnation_limit: None,
        }
    }
}

fn default_population_size() -> usize {
    40
}
fn default_max_generations() -> usize {
    200
}

/// Engine and population settings, as loaded from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub population: PopulationConfig,
}

impl RunConfig {
    /// Load and validate a run configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        if self.population.size < self.engine.pop_divider {
            return Err(ConfigError::PopulationTooSmall {
                size: self.population.size,
                divider: self.engine.pop_divider,
            });
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pop_divider == 0 {
            return Err(ConfigError::ZeroDivider);
        }
        if self.selection.tournament_size == 0 {
            return Err(ConfigError::ZeroTournament);
        }

        let check_probability = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidProbability { name, value })
            }
        };
        check_probability(self.crossover_probability, "crossover_probability")?;
        check_probability(self.mutation_probability, "mutation_probability")?;

        if self.crossover_length == 0 || self.mutation_window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.mutation_operators.is_empty() {
            return Err(ConfigError::NoMutationOperators);
        }
        if self.fitness.is_empty() {
            return Err(ConfigError::NoWeights);
        }
        for (index, weight) in self.fitness.weights.iter().enumerate() {
            if !weight.is_finite() || *weight == 0.0 {
                return Err(ConfigError::InvalidWeight {
                    index,
                    weight: *weight,
                });
            }
        }
        if self.stagnation.reset_after > self.stagnation.force_reset_after {
            return Err(ConfigError::InvalidStagnation {
                reset_after: self.stagnation.reset_after,
                force_reset_after: self.stagnation.force_reset_after,
            });
        }
        if self.hall_of_fame_size == 0 {
            return Err(ConfigError::ZeroHallOfFame);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population divider must be non-zero")]
    ZeroDivider,
    #[error("Tournament size must be non-zero")]
    ZeroTournament,
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("Crossover length and mutation window must be non-zero")]
    ZeroWindow,
    #[error("At least one mutation operator is required")]
    NoMutationOperators,
    #[error("No fitness weights specified")]
    NoWeights,
    #[error("Weight {index} must be finite and non-zero, got {weight}")]
    InvalidWeight { index: usize, weight: f64 },
    #[error("reset_after ({reset_after}) exceeds force_reset_after ({force_reset_after})")]
    InvalidStagnation {
        reset_after: usize,
        force_reset_after: usize,
    },
    #[error("Hall of fame size must be non-zero")]
    ZeroHallOfFame,
    #[error("Population of {size} cannot be split into {divider} subpopulations")]
    PopulationTooSmall { size: usize, divider: usize },
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_probability() {
        let config = EngineConfig {
            mutation_probability: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProbability {
                name: "mutation_probability",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_inverted_stagnation_thresholds() {
        let config = EngineConfig {
            stagnation: StagnationConfig {
                reset_after: 50,
                force_reset_after: 10,
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidStagnation { .. })
        ));
    }

    #[test]
    fn test_population_smaller_than_divider() {
        let config = RunConfig {
            engine: EngineConfig {
                pop_divider: 8,
                ..Default::default()
            },
            population: PopulationConfig {
                size: 4,
                ..Default::default()
            },
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PopulationTooSmall {
                size: 4,
                divider: 8
            })
        ));
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"engine": {{"pop_divider": 2, "fitness": {{"weights": [1.0, -0.5], "ordering": "Lexicographic"}}}}, "population": {{"size": 10}}}}"#
        )
        .unwrap();

        let config = RunConfig::load(file.path()).unwrap();
        assert_eq!(config.engine.pop_divider, 2);
        assert_eq!(config.engine.fitness.weights, vec![1.0, -0.5]);
        assert_eq!(config.engine.selection.tournament_size, 3);
        assert_eq!(config.engine.stagnation.reset_after, 20);
        assert_eq!(config.population.size, 10);
        assert_eq!(config.population.max_generations, 200);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = RunConfig::load(dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_serialization() {
        let config = RunConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.population.size, config.population.size);
        assert_eq!(parsed.engine.mutation_operators, MutationOperator::ALL);
    }
}

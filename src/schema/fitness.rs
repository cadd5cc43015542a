//! Multi-objective fitness vectors and their total order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// How weighted objective tuples are ordered.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum FitnessOrdering {
    /// Compare the sum of weighted objectives.
    #[default]
    WeightedSum,
    /// Compare weighted objectives element by element, first objective first.
    Lexicographic,
}

/// Objective weights shared by every fitness vector of a run.
///
/// Positive weights maximize an objective, negative weights minimize it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FitnessWeights {
    /// One weight per objective.
    #[serde(default = "default_weights")]
    pub weights: Vec<f64>,
    /// Ordering applied to weighted tuples.
    #[serde(default)]
    pub ordering: FitnessOrdering,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            ordering: FitnessOrdering::default(),
        }
    }
}

fn default_weights() -> Vec<f64> {
    vec![1.0]
}

impl FitnessWeights {
    /// Create weights with the given ordering.
    pub fn new(weights: Vec<f64>, ordering: FitnessOrdering) -> Self {
        Self { weights, ordering }
    }

    /// Number of objectives.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Check if no objective is configured.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Errors raised when assigning objective values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitnessError {
    #[error("Expected {expected} objective values, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("Objective {index} is not a finite number")]
    NonFinite { index: usize },
    #[error("Valid fitness carries no objective values")]
    Empty,
}

/// A possibly-invalid multi-objective fitness.
///
/// Non-finite objective values are rejected in [`Fitness::set_values`], so a
/// valid fitness never carries NaN. Invalid fitness orders below every valid
/// fitness. Deserialization re-checks these invariants.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "FitnessRecord")]
pub struct Fitness {
    values: Vec<f64>,
    weighted: Vec<f64>,
    ordering: FitnessOrdering,
    valid: bool,
}

/// Serialized form of [`Fitness`], checked before use.
#[derive(Deserialize)]
struct FitnessRecord {
    #[serde(default)]
    values: Vec<f64>,
    #[serde(default)]
    weighted: Vec<f64>,
    #[serde(default)]
    ordering: FitnessOrdering,
    #[serde(default)]
    valid: bool,
}

impl TryFrom<FitnessRecord> for Fitness {
    type Error = FitnessError;

    fn try_from(record: FitnessRecord) -> Result<Self, Self::Error> {
        if !record.valid {
            return Ok(Self::invalid());
        }
        if record.values.is_empty() {
            return Err(FitnessError::Empty);
        }
        if record.weighted.len() != record.values.len() {
            return Err(FitnessError::ArityMismatch {
                expected: record.values.len(),
                actual: record.weighted.len(),
            });
        }
        if let Some(index) = record
            .values
            .iter()
            .chain(&record.weighted)
            .position(|v| !v.is_finite())
        {
            return Err(FitnessError::NonFinite {
                index: index % record.values.len(),
            });
        }

        Ok(Self {
            values: record.values,
            weighted: record.weighted,
            ordering: record.ordering,
            valid: true,
        })
    }
}

impl Fitness {
    /// Create an invalid fitness.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Create a valid fitness from raw objective values.
    pub fn from_values(values: Vec<f64>, weights: &FitnessWeights) -> Result<Self, FitnessError> {
        let mut fitness = Self::invalid();
        fitness.set_values(values, weights)?;
        Ok(fitness)
    }

    /// Assign objective values, making the fitness valid.
    ///
    /// On error the fitness is left invalid.
    pub fn set_values(
        &mut self,
        values: Vec<f64>,
        weights: &FitnessWeights,
    ) -> Result<(), FitnessError> {
        self.invalidate();

        if values.len() != weights.len() {
            return Err(FitnessError::ArityMismatch {
                expected: weights.len(),
                actual: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(FitnessError::NonFinite { index });
        }

        self.weighted = values
            .iter()
            .zip(&weights.weights)
            .map(|(v, w)| v * w)
            .collect();
        self.values = values;
        self.ordering = weights.ordering;
        self.valid = true;
        Ok(())
    }

    /// Drop the objective values.
    pub fn invalidate(&mut self) {
        self.values.clear();
        self.weighted.clear();
        self.valid = false;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Raw objective values (empty when invalid).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Objective values multiplied by their weights (empty when invalid).
    pub fn weighted(&self) -> &[f64] {
        &self.weighted
    }

    /// Sum of weighted objectives, or negative infinity when invalid.
    pub fn score(&self) -> f64 {
        if self.valid {
            self.weighted.iter().sum()
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Total order over fitness; greater is better.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.valid, other.valid) {
            (false, false) => Ordering::Equal,
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (true, true) => match self.ordering {
                FitnessOrdering::WeightedSum => self.score().total_cmp(&other.score()),
                FitnessOrdering::Lexicographic => self
                    .weighted
                    .iter()
                    .zip(&other.weighted)
                    .map(|(a, b)| a.total_cmp(b))
                    .find(|o| o.is_ne())
                    .unwrap_or_else(|| self.weighted.len().cmp(&other.weighted.len())),
            },
        }
    }

    /// Check if both fitnesses rank equally.
    pub fn ranks_equal(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

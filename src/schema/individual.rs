//! Candidate action sequences.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use super::{Fitness, FitnessError, FitnessWeights};

/// Marker for types usable as action identifiers.
pub trait Gene: Clone + PartialEq + Debug + Send + Sync {}

impl<T: Clone + PartialEq + Debug + Send + Sync> Gene for T {}

/// A candidate action sequence with its cached fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual<A> {
    sequence: Vec<A>,
    #[serde(default)]
    fitness: Fitness,
}

impl<A: Gene> Individual<A> {
    /// Create an individual with invalid fitness.
    pub fn new(sequence: Vec<A>) -> Self {
        Self {
            sequence,
            fitness: Fitness::invalid(),
        }
    }

    pub fn sequence(&self) -> &[A] {
        &self.sequence
    }

    /// Mutable access to the sequence. Invalidates fitness.
    pub fn sequence_mut(&mut self) -> &mut Vec<A> {
        self.fitness.invalidate();
        &mut self.sequence
    }

    pub fn fitness(&self) -> &Fitness {
        &self.fitness
    }

    /// Record evaluated objective values.
    pub fn set_fitness(
        &mut self,
        values: Vec<f64>,
        weights: &FitnessWeights,
    ) -> Result<(), FitnessError> {
        self.fitness.set_values(values, weights)
    }

    pub fn invalidate(&mut self) {
        self.fitness.invalidate();
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_individual_is_invalid() {
        let ind = Individual::new(vec!["muscleMemory", "veneration"]);
        assert!(!ind.fitness().is_valid());
        assert_eq!(ind.len(), 2);
    }

    #[test]
    fn test_sequence_mut_invalidates() {
        let weights = FitnessWeights::default();
        let mut ind = Individual::new(vec![1u8, 2, 3]);
        ind.set_fitness(vec![3.0], &weights).unwrap();
        assert!(ind.fitness().is_valid());

        ind.sequence_mut().push(4);
        assert!(!ind.fitness().is_valid());
        assert_eq!(ind.sequence(), &[1, 2, 3, 4]);
    }
}

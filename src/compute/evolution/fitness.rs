//! Fitness evaluation for candidate rotations.
//!
//! Scoring is delegated to an external [`Evaluator`] (typically a crafting
//! simulator). This module batches the individuals whose fitness is invalid,
//! hands them to the evaluator and writes the results back once the whole
//! batch has finished.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use crate::schema::{FitnessError, FitnessWeights, Gene, Individual};

/// Errors reported for a single evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("Evaluation failed: {0}")]
    Failed(String),
    #[error("Evaluator returned no result for this sequence")]
    MissingResult,
    #[error(transparent)]
    Fitness(#[from] FitnessError),
}

/// Scores action sequences.
///
/// Implementations must be deterministic for a given sequence and safe to
/// call from several threads at once.
pub trait Evaluator<A: Gene>: Sync {
    /// Score one sequence, returning raw objective values.
    fn evaluate(&self, sequence: &[A]) -> Result<Vec<f64>, EvaluationError>;

    /// Score a batch of sequences. Results are returned in input order.
    ///
    /// Every bulk evaluation goes through this method. The default runs
    /// [`Evaluator::evaluate`] on the rayon pool when `parallel` is set and on
    /// the calling thread otherwise.
    fn evaluate_all(
        &self,
        sequences: &[&[A]],
        parallel: bool,
    ) -> Vec<Result<Vec<f64>, EvaluationError>> {
        if parallel {
            evaluate_parallel(self, sequences)
        } else {
            sequences.iter().map(|s| self.evaluate(s)).collect()
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn evaluate_parallel<A, E>(
    evaluator: &E,
    sequences: &[&[A]],
) -> Vec<Result<Vec<f64>, EvaluationError>>
where
    A: Gene,
    E: Evaluator<A> + ?Sized,
{
    sequences.par_iter().map(|s| evaluator.evaluate(s)).collect()
}

#[cfg(target_arch = "wasm32")]
fn evaluate_parallel<A, E>(
    evaluator: &E,
    sequences: &[&[A]],
) -> Vec<Result<Vec<f64>, EvaluationError>>
where
    A: Gene,
    E: Evaluator<A> + ?Sized,
{
    // Sequential evaluation for WASM
    sequences.iter().map(|s| evaluator.evaluate(s)).collect()
}

impl<A, F> Evaluator<A> for F
where
    A: Gene,
    F: Fn(&[A]) -> Result<Vec<f64>, EvaluationError> + Sync,
{
    fn evaluate(&self, sequence: &[A]) -> Result<Vec<f64>, EvaluationError> {
        self(sequence)
    }
}

/// A failed evaluation, indexed into the evaluated slice.
#[derive(Debug, Clone)]
pub struct EvaluationFailure {
    pub index: usize,
    pub error: EvaluationError,
}

/// Outcome of a bulk evaluation.
#[derive(Debug, Clone, Default)]
pub struct EvaluationReport {
    /// Number of individuals submitted to the evaluator.
    pub evaluated: usize,
    /// Individuals left with invalid fitness.
    pub failures: Vec<EvaluationFailure>,
}

/// Evaluate every individual whose fitness is invalid.
///
/// The whole batch is handed to [`Evaluator::evaluate_all`] in one call;
/// `parallel` is passed through. Failed individuals keep invalid fitness and
/// are listed in the report.
pub fn evaluate_invalid<A, E>(
    individuals: &mut [Individual<A>],
    evaluator: &E,
    weights: &FitnessWeights,
    parallel: bool,
) -> EvaluationReport
where
    A: Gene,
    E: Evaluator<A> + ?Sized,
{
    let pending: Vec<usize> = individuals
        .iter()
        .enumerate()
        .filter(|(_, ind)| !ind.fitness().is_valid())
        .map(|(i, _)| i)
        .collect();

    if pending.is_empty() {
        return EvaluationReport::default();
    }

    let results = {
        let sequences: Vec<&[A]> = pending.iter().map(|&i| individuals[i].sequence()).collect();
        evaluator.evaluate_all(&sequences, parallel)
    };

    let mut report = EvaluationReport {
        evaluated: pending.len(),
        failures: Vec::new(),
    };
    let mut results = results.into_iter();

    for index in pending {
        let outcome = results
            .next()
            .unwrap_or(Err(EvaluationError::MissingResult))
            .and_then(|values| {
                individuals[index]
                    .set_fitness(values, weights)
                    .map_err(EvaluationError::from)
            });

        if let Err(error) = outcome {
            log::warn!("Evaluation of individual {index} failed: {error}");
            report.failures.push(EvaluationFailure { index, error });
        }
    }

    report
}

//! Progress, summary and result types reported by the engine.

use serde::{Deserialize, Serialize};

use super::Individual;

/// Per-generation diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// Generation number after the step.
    pub generation: usize,
    /// Subpopulation holding the best individual this generation.
    pub winning_subpopulation: Option<usize>,
    /// Best weighted score per subpopulation.
    pub best_scores: Vec<f64>,
    /// Stagnation counter per subpopulation.
    pub stagnation: Vec<usize>,
    /// Member count per subpopulation after the step.
    pub sizes: Vec<usize>,
    /// Subpopulations reset to the initial guess this generation.
    pub resets: Vec<usize>,
    /// Subpopulations carried over unchanged because of unevaluated members.
    pub stalled: Vec<usize>,
    /// Number of fitness evaluations performed.
    pub evaluations: usize,
    /// Number of evaluations that failed.
    pub evaluation_failures: usize,
}

/// Progress update passed to run callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Current generation number.
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Best weighted score seen so far.
    pub best_score: f64,
    /// Mean weighted score of the valid part of the population.
    pub avg_score: f64,
    /// Generations since the best individual last changed.
    pub stagnation_count: usize,
    /// Diagnostics of the latest step.
    pub summary: GenerationSummary,
}

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best score per generation.
    pub best_score: Vec<f64>,
    /// Average score per generation.
    pub avg_score: Vec<f64>,
    /// Number of subpopulation resets per generation.
    pub resets: Vec<usize>,
}

/// Final result of an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult<A> {
    /// Best individual found.
    pub best: Individual<A>,
    /// Hall of fame, best first.
    pub hall_of_fame: Vec<Individual<A>>,
    /// Statistics from the run.
    pub stats: EvolutionStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

/// Statistics from an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Total generations run.
    pub generations: usize,
    /// Total evaluations performed.
    pub total_evaluations: u64,
    /// Best score achieved.
    pub best_score: f64,
    /// Average score of final population.
    pub final_avg_score: f64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Evaluations per second.
    pub evaluations_per_second: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Reached target score.
    TargetReached,
    /// Stagnation limit hit.
    Stagnation,
    /// User cancelled.
    Cancelled,
}

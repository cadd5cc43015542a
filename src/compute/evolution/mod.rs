//! Evolutionary search for crafting rotations.
//!
//! A population of action sequences is split into subpopulations that evolve
//! side by side. Each generation every subpopulation selects parents by
//! tournament, breeds offspring by crossover and mutation, and keeps the best
//! of parents and offspring. Subpopulations that stop improving are reset to
//! the initial guess, and a hall of fame keeps the best rotations seen.
//!
//! # Components
//!
//! - **Fitness** (`fitness`): Pluggable [`Evaluator`] and bulk evaluation
//! - **Genome Operations** (`genome`): Crossover, mutation and variation
//! - **Selection** (`selection`): Tournament and best-N selection
//! - **Subpopulations** (`subpopulation`): Partitioning and stagnation tracking
//! - **Hall of Fame** (`archive`): Best individuals across the run
//! - **Search** (`search`): Setup, generation step and run loop
//!
//! # Example
//!
//! ```rust,no_run
//! use rand::Rng;
//! use rand::rngs::StdRng;
//! use rotation_search::compute::evolution::{EvaluationError, EvolutionEngine};
//! use rotation_search::schema::{EngineConfig, Individual, PopulationConfig};
//!
//! let evaluator = |rotation: &[u8]| -> Result<Vec<f64>, EvaluationError> {
//!     Ok(vec![rotation.iter().map(|&a| a as f64).sum()])
//! };
//! let generator = |len: usize, rng: &mut StdRng| -> Vec<u8> {
//!     (0..len).map(|_| rng.gen_range(0..8)).collect()
//! };
//!
//! let engine = EvolutionEngine::new(
//!     EngineConfig::default(),
//!     evaluator,
//!     generator,
//!     Individual::new(vec![1, 2, 3]),
//! )?;
//!
//! let settings = PopulationConfig::default();
//! let result = engine.run_with_callback(engine.seed_population(settings.size), &settings, |progress| {
//!     println!("Generation {}: best score = {:.3}", progress.generation, progress.best_score);
//! })?;
//!
//! println!("Best rotation: {:?}", result.best.sequence());
//! # Ok::<(), rotation_search::compute::evolution::EngineError>(())
//! ```

mod archive;
mod fitness;
mod genome;
mod search;
mod selection;
mod subpopulation;

pub use archive::HallOfFame;
pub use fitness::{
    EvaluationError, EvaluationFailure, EvaluationReport, Evaluator, evaluate_invalid,
};
pub use genome::{GenomeRng, SequenceGenerator, UniformGenerator};
pub use search::{EngineError, EvolutionEngine, GenerationOutcome, RunState};
pub use selection::{SelectionError, select_best, select_tournament, sort_by_fitness};
pub use subpopulation::{SubpopulationState, max_fitness, segment_bounds};

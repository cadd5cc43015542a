//! Rotation search - Genetic algorithm search for crafting rotations.
//!
//! This crate evolves ordered action sequences (rotations) toward the best
//! score reported by an external evaluator, typically a crafting simulator.
//! The population is split into subpopulations with independent stagnation
//! tracking, so a stuck island is reset to the initial guess instead of
//! holding the search back.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, fitness and individual types
//! - `compute`: The evolution engine (selection, variation, generation step)
//!
//! # Example
//!
//! ```rust,no_run
//! use rand::rngs::StdRng;
//! use rotation_search::{
//!     compute::evolution::{EvaluationError, EvolutionEngine},
//!     schema::{Individual, RunConfig},
//! };
//!
//! let config = RunConfig::load("run.json")?;
//! let evaluator = |rotation: &[u32]| -> Result<Vec<f64>, EvaluationError> {
//!     Ok(vec![rotation.len() as f64])
//! };
//! let generator = |len: usize, _rng: &mut StdRng| vec![0u32; len];
//!
//! let engine = EvolutionEngine::new(config.engine, evaluator, generator, Individual::new(vec![0]))?;
//! let result = engine.run(engine.seed_population(config.population.size), &config.population)?;
//!
//! println!("Best score after {} generations: {}", result.stats.generations, result.stats.best_score);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EngineError, EvolutionEngine, RunState};
pub use schema::{EngineConfig, Fitness, Individual, RunConfig};

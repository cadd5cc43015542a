//! Rotation search CLI - Evolve a crafting rotation from JSON configuration.
//!
//! The bundled evaluator scores rotations against a fixed target rotation, so
//! the search can be watched converging without an external simulator.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::PathBuf;
use std::time::Instant;

use rotation_search::{
    compute::evolution::{EvaluationError, EvolutionEngine, UniformGenerator},
    schema::{FitnessOrdering, FitnessWeights, Individual, RunConfig},
};

const ACTIONS: [&str; 8] = [
    "basic_synthesis",
    "basic_touch",
    "masters_mend",
    "waste_not",
    "veneration",
    "innovation",
    "great_strides",
    "byregots_blessing",
];

const TARGET: [&str; 10] = [
    "waste_not",
    "veneration",
    "basic_synthesis",
    "basic_synthesis",
    "innovation",
    "basic_touch",
    "basic_touch",
    "masters_mend",
    "great_strides",
    "byregots_blessing",
];

const INITIAL_GUESS: [&str; 4] = [
    "basic_synthesis",
    "basic_touch",
    "basic_touch",
    "byregots_blessing",
];

/// Score a rotation: positions matching the target, and distance from the
/// target length.
fn score_rotation(rotation: &[String]) -> Result<Vec<f64>, EvaluationError> {
    if rotation.len() > TARGET.len() * 2 {
        return Err(EvaluationError::Failed(format!(
            "rotation of {} steps exceeds durability",
            rotation.len()
        )));
    }

    let matched = rotation
        .iter()
        .zip(TARGET.iter())
        .filter(|(action, target)| action.as_str() == **target)
        .count();
    let length_diff = rotation.len().abs_diff(TARGET.len());

    Ok(vec![matched as f64, length_diff as f64])
}

fn to_rotation(actions: &[&str]) -> Vec<String> {
    actions.iter().map(|a| a.to_string()).collect()
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <run.json> [generations]", args[0]);
        eprintln!();
        eprintln!("Search for a crafting rotation with a genetic algorithm.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  run.json     Path to run configuration file");
        eprintln!("  generations  Maximum number of generations (overrides config)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let mut config = RunConfig::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });
    if let Some(generations) = args.get(2).and_then(|s| s.parse().ok()) {
        config.population.max_generations = generations;
    }

    println!("Rotation Search");
    println!("===============");
    println!(
        "Population: {} in {} subpopulations",
        config.population.size, config.engine.pop_divider
    );
    println!("Generations: {}", config.population.max_generations);
    println!("Target: {} steps", TARGET.len());
    println!();

    let generator = UniformGenerator::new(to_rotation(&ACTIONS)).with_length_jitter(0.5);
    let engine = EvolutionEngine::new(
        config.engine.clone(),
        score_rotation,
        generator,
        Individual::new(to_rotation(&INITIAL_GUESS)),
    )
    .unwrap_or_else(|e| {
        eprintln!("Error creating engine: {}", e);
        std::process::exit(1);
    });

    println!("Running evolution...");
    let start = Instant::now();
    let report_every = (config.population.max_generations / 10).max(1);

    let population = engine.seed_population(config.population.size);
    let result = engine
        .run_with_callback(population, &config.population, |progress| {
            // Print progress every 10%
            if progress.generation % report_every == 0 {
                println!(
                    "  Generation {}/{}: best={:.1}, avg={:.2}, resets={:?}",
                    progress.generation,
                    progress.total_generations,
                    progress.best_score,
                    progress.avg_score,
                    progress.summary.resets
                );
            }
        })
        .unwrap_or_else(|e| {
            eprintln!("Error during evolution: {}", e);
            std::process::exit(1);
        });

    println!();
    println!("Stopped: {:?}", result.stats.stop_reason);
    println!(
        "Best score: {:.1} {:?}",
        result.stats.best_score,
        result.best.fitness().values()
    );
    println!("Best rotation:");
    for (i, action) in result.best.sequence().iter().enumerate() {
        println!("  {:>2}. {}", i + 1, action);
    }
    println!();
    println!(
        "Time: {:.2}s ({} evaluations, {:.0} evals/s)",
        start.elapsed().as_secs_f32(),
        result.stats.total_evaluations,
        result.stats.evaluations_per_second
    );
}

fn print_example_config() {
    let mut config = RunConfig::default();
    config.engine.fitness = FitnessWeights::new(vec![1.0, -1.0], FitnessOrdering::WeightedSum);

    println!("Example configuration (run.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}

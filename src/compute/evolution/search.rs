//! Generation driver for evolutionary rotation search.
//!
//! The population is split into contiguous subpopulations that evolve
//! independently each step. A subpopulation whose best fitness stops improving
//! is reset to the initial guess so it cannot drag the run down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{
    ConfigError, EngineConfig, EvolutionHistory, EvolutionProgress, EvolutionResult,
    EvolutionStats, Fitness, Gene, GenerationSummary, Individual, PopulationConfig, StopReason,
};

use super::archive::HallOfFame;
use super::fitness::{EvaluationError, Evaluator, evaluate_invalid};
use super::genome::{GenomeRng, SequenceGenerator};
use super::selection::{SelectionError, select_best, select_tournament, sort_by_fitness};
use super::subpopulation::{SubpopulationState, max_fitness, segment_bounds};

/// Errors raised by the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Initial guess could not be evaluated: {0}")]
    Template(EvaluationError),
    #[error("Population of {size} cannot be split into {divider} subpopulations")]
    PopulationTooSmall { size: usize, divider: usize },
    #[error("Run state tracks {actual} subpopulations, expected {expected}")]
    StateMismatch { expected: usize, actual: usize },
    #[error("No individual with valid fitness was found")]
    NoValidIndividual,
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// State threaded through every generation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState<A> {
    /// Completed generation steps.
    pub generation: usize,
    /// Stagnation bookkeeping, one entry per subpopulation.
    pub subpopulations: Vec<SubpopulationState>,
    /// Best individuals seen so far.
    pub hall_of_fame: HallOfFame<A>,
    /// Seed for the next step's random number generator.
    pub rng_seed: u64,
    /// Fitness evaluations performed so far.
    #[serde(default)]
    pub evaluations: u64,
}

/// Result of one generation step.
#[derive(Debug, Clone)]
pub struct GenerationOutcome<A> {
    pub population: Vec<Individual<A>>,
    pub state: RunState<A>,
    pub summary: GenerationSummary,
}

/// Work unit for one subpopulation.
struct SegmentJob<A> {
    index: usize,
    members: Vec<Individual<A>>,
    state: SubpopulationState,
    seed: u64,
}

/// Evolved subpopulation.
struct SegmentOutcome<A> {
    members: Vec<Individual<A>>,
    state: SubpopulationState,
    reset: bool,
    stalled: bool,
    evaluations: usize,
    failures: usize,
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine<A, E, G> {
    config: EngineConfig,
    evaluator: E,
    generator: G,
    template: Individual<A>,
    cancelled: Arc<AtomicBool>,
}

impl<A, E, G> EvolutionEngine<A, E, G>
where
    A: Gene,
    E: Evaluator<A>,
    G: SequenceGenerator<A>,
{
    /// Create a new evolution engine.
    ///
    /// The initial guess is evaluated here; it seeds stagnant subpopulations
    /// on reset.
    pub fn new(
        config: EngineConfig,
        evaluator: E,
        generator: G,
        template: Individual<A>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let mut template = template;
        let report = evaluate_invalid(
            std::slice::from_mut(&mut template),
            &evaluator,
            &config.fitness,
            false,
        );
        if let Some(failure) = report.failures.into_iter().next() {
            return Err(EngineError::Template(failure.error));
        }

        Ok(Self {
            config,
            evaluator,
            generator,
            template,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The evaluated initial guess.
    pub fn template(&self) -> &Individual<A> {
        &self.template
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn new_rng(&self) -> GenomeRng {
        self.config
            .random_seed
            .map(GenomeRng::new)
            .unwrap_or_else(GenomeRng::random)
    }

    /// Build an initial population around the initial guess.
    ///
    /// The first individual is the guess itself; every other one is the guess
    /// mutated once.
    pub fn seed_population(&self, size: usize) -> Vec<Individual<A>> {
        let mut rng = self.new_rng();

        (0..size)
            .map(|i| {
                let mut individual = self.template.clone();
                if i > 0 {
                    rng.mutate(
                        &mut individual,
                        &self.config.mutation_operators,
                        self.config.mutation_window,
                        &self.generator,
                    );
                }
                individual
            })
            .collect()
    }

    /// Evaluate the initial population and create the run state.
    pub fn setup(
        &self,
        population: Vec<Individual<A>>,
    ) -> Result<(Vec<Individual<A>>, RunState<A>), EngineError> {
        let mut population = population;
        let divider = self.config.pop_divider;
        if population.len() < divider {
            return Err(EngineError::PopulationTooSmall {
                size: population.len(),
                divider,
            });
        }

        let report = evaluate_invalid(
            &mut population,
            &self.evaluator,
            &self.config.fitness,
            self.config.parallel,
        );

        let mut hall_of_fame = HallOfFame::new(self.config.hall_of_fame_size);
        hall_of_fame.update(&population);

        log::info!(
            "Setup: {} individuals in {} subpopulations ({} evaluated, {} failed)",
            population.len(),
            divider,
            report.evaluated,
            report.failures.len()
        );

        let state = RunState {
            generation: 0,
            subpopulations: vec![SubpopulationState::default(); divider],
            hall_of_fame,
            rng_seed: self.new_rng().next_seed(),
            evaluations: report.evaluated as u64,
        };

        Ok((population, state))
    }

    /// Run a single generation step.
    pub fn step(
        &self,
        population: Vec<Individual<A>>,
        state: RunState<A>,
    ) -> Result<GenerationOutcome<A>, EngineError> {
        let mut state = state;
        let divider = self.config.pop_divider;
        if state.subpopulations.len() != divider {
            return Err(EngineError::StateMismatch {
                expected: divider,
                actual: state.subpopulations.len(),
            });
        }
        if population.len() < divider {
            return Err(EngineError::PopulationTooSmall {
                size: population.len(),
                divider,
            });
        }

        // Reset decisions use last generation's values only.
        let leader = max_fitness(&state.subpopulations);
        let mut rng = GenomeRng::new(state.rng_seed);

        let bounds = segment_bounds(population.len(), divider);
        let mut rest = population;
        let mut segments: Vec<Vec<Individual<A>>> = bounds
            .iter()
            .rev()
            .map(|range| rest.split_off(range.start))
            .collect();
        segments.reverse();

        let jobs: Vec<SegmentJob<A>> = segments
            .into_iter()
            .zip(state.subpopulations.iter().cloned())
            .enumerate()
            .map(|(index, (members, sub))| SegmentJob {
                index,
                members,
                state: sub,
                seed: rng.next_seed(),
            })
            .collect();

        let outcomes = self.evolve_segments(jobs, &leader)?;

        let mut summary = GenerationSummary {
            generation: state.generation + 1,
            ..Default::default()
        };
        let mut next_population = Vec::with_capacity(bounds.last().map_or(0, |r| r.end));
        let mut next_states = Vec::with_capacity(divider);
        let mut winner: Option<(usize, Fitness)> = None;

        for (index, outcome) in outcomes.into_iter().enumerate() {
            let best = outcome
                .members
                .iter()
                .map(|m| m.fitness())
                .fold(Fitness::invalid(), |best, f| {
                    if f.compare(&best).is_gt() {
                        f.clone()
                    } else {
                        best
                    }
                });

            summary.best_scores.push(best.score());
            summary.stagnation.push(outcome.state.stagnation_counter);
            summary.sizes.push(outcome.members.len());
            if outcome.reset {
                summary.resets.push(index);
            }
            if outcome.stalled {
                summary.stalled.push(index);
            }
            summary.evaluations += outcome.evaluations;
            summary.evaluation_failures += outcome.failures;

            if best.is_valid() && winner.as_ref().is_none_or(|(_, w)| best.compare(w).is_gt()) {
                winner = Some((index, best));
            }

            next_states.push(outcome.state);
            next_population.extend(outcome.members);
        }
        summary.winning_subpopulation = winner.map(|(index, _)| index);

        state.hall_of_fame.update(&next_population);
        state.subpopulations = next_states;
        state.generation += 1;
        state.evaluations += summary.evaluations as u64;
        state.rng_seed = rng.next_seed();

        log::debug!(
            "Generation {}: winning subpopulation {:?}, best scores {:?}, stagnation {:?}",
            summary.generation,
            summary.winning_subpopulation,
            summary.best_scores,
            summary.stagnation
        );

        Ok(GenerationOutcome {
            population: next_population,
            state,
            summary,
        })
    }

    /// Evolve all subpopulations on the rayon pool.
    #[cfg(not(target_arch = "wasm32"))]
    fn evolve_segments(
        &self,
        jobs: Vec<SegmentJob<A>>,
        leader: &Fitness,
    ) -> Result<Vec<SegmentOutcome<A>>, EngineError> {
        if self.config.parallel {
            jobs.into_par_iter()
                .map(|job| self.evolve_segment(job, leader))
                .collect()
        } else {
            jobs.into_iter()
                .map(|job| self.evolve_segment(job, leader))
                .collect()
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn evolve_segments(
        &self,
        jobs: Vec<SegmentJob<A>>,
        leader: &Fitness,
    ) -> Result<Vec<SegmentOutcome<A>>, EngineError> {
        // Sequential evolution for WASM
        jobs.into_iter()
            .map(|job| self.evolve_segment(job, leader))
            .collect()
    }

    /// Evolve one subpopulation.
    fn evolve_segment(
        &self,
        job: SegmentJob<A>,
        leader: &Fitness,
    ) -> Result<SegmentOutcome<A>, EngineError> {
        let SegmentJob {
            index,
            mut members,
            state: mut sub,
            seed,
        } = job;
        let mut rng = GenomeRng::new(seed);
        let size = members.len();

        let reset = sub.should_reset(leader, &self.config.stagnation);
        if reset {
            log::warn!(
                "Subpopulation {index} stagnated for {} generations, resetting to initial guess",
                sub.stagnation_counter
            );
            members = vec![self.template.clone(); size];
            sub.stagnation_counter = 0;
        }

        let report = evaluate_invalid(
            &mut members,
            &self.evaluator,
            &self.config.fitness,
            self.config.parallel,
        );
        let mut evaluations = report.evaluated;
        let mut failures = report.failures.len();

        if members.iter().any(|m| !m.fitness().is_valid()) {
            log::warn!("Subpopulation {index} has unevaluated members, carrying it over unchanged");
            // Counts toward stagnation so a permanently failing segment is reset.
            sub.stagnation_counter += 1;
            return Ok(SegmentOutcome {
                members,
                state: sub,
                reset,
                stalled: true,
                evaluations,
                failures,
            });
        }

        let parents = select_tournament(
            &members,
            size / 2,
            self.config.selection.tournament_size,
            rng.rng_mut(),
        )?;
        let mut offspring = rng.var_and(&parents, &self.config, &self.generator);

        let report = evaluate_invalid(
            &mut offspring,
            &self.evaluator,
            &self.config.fitness,
            self.config.parallel,
        );
        evaluations += report.evaluated;
        failures += report.failures.len();

        let valid_offspring = offspring.iter().filter(|o| o.fitness().is_valid()).count();
        let trimmed = select_best(&offspring, (offspring.len() / 2).min(valid_offspring))?;
        let mut next = select_best(&members, size - trimmed.len())?;
        next.extend(trimmed);
        sort_by_fitness(&mut next);

        let top = next
            .first()
            .map(|best| best.fitness().clone())
            .unwrap_or_default();
        sub.record_best(top);

        Ok(SegmentOutcome {
            members: next,
            state: sub,
            reset,
            stalled: false,
            evaluations,
            failures,
        })
    }

    /// Check if evolution should stop.
    fn should_stop(
        &self,
        generation: usize,
        best_score: f64,
        stagnation_count: usize,
        population: &PopulationConfig,
    ) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if generation >= population.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(target) = population.target_score
            && best_score >= target
        {
            return Some(StopReason::TargetReached);
        }

        if let Some(limit) = population.stagnation_limit
            && stagnation_count >= limit
        {
            return Some(StopReason::Stagnation);
        }

        None
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(
        &self,
        population: Vec<Individual<A>>,
        settings: &PopulationConfig,
        mut callback: F,
    ) -> Result<EvolutionResult<A>, EngineError>
    where
        F: FnMut(&EvolutionProgress),
    {
        let start_time = Instant::now();

        let (mut population, mut state) = self.setup(population)?;
        let mut history = EvolutionHistory::default();
        let mut best = hall_of_fame_best(&state);
        let mut stagnation_count = 0;

        // Evolution loop
        let stop_reason = loop {
            if let Some(reason) =
                self.should_stop(state.generation, best.score(), stagnation_count, settings)
            {
                break reason;
            }

            let outcome = self.step(population, state)?;
            population = outcome.population;
            state = outcome.state;

            let generation_best = hall_of_fame_best(&state);
            if generation_best.compare(&best).is_gt() {
                best = generation_best;
                stagnation_count = 0;
            } else {
                stagnation_count += 1;
            }

            let avg_score = average_score(&population);
            history.best_score.push(best.score());
            history.avg_score.push(avg_score);
            history.resets.push(outcome.summary.resets.len());

            // Report progress
            callback(&EvolutionProgress {
                generation: state.generation,
                total_generations: settings.max_generations,
                best_score: best.score(),
                avg_score,
                stagnation_count,
                summary: outcome.summary,
            });
        };

        let elapsed = start_time.elapsed().as_secs_f64();
        let best = state
            .hall_of_fame
            .best()
            .cloned()
            .ok_or(EngineError::NoValidIndividual)?;
        let best_score = best.fitness().score();

        log::info!(
            "Evolution stopped after {} generations ({:?}), best score {:.3}",
            state.generation,
            stop_reason,
            best_score
        );

        Ok(EvolutionResult {
            best,
            stats: EvolutionStats {
                generations: state.generation,
                total_evaluations: state.evaluations,
                best_score,
                final_avg_score: average_score(&population),
                elapsed_seconds: elapsed,
                evaluations_per_second: state.evaluations as f64 / elapsed.max(f64::EPSILON),
                stop_reason,
            },
            hall_of_fame: state.hall_of_fame.into_entries(),
            history,
        })
    }

    /// Run evolution (blocking).
    pub fn run(
        &self,
        population: Vec<Individual<A>>,
        settings: &PopulationConfig,
    ) -> Result<EvolutionResult<A>, EngineError> {
        self.run_with_callback(population, settings, |_| {})
    }
}

/// Fitness of the hall-of-fame leader, invalid when it is empty.
fn hall_of_fame_best<A: Gene>(state: &RunState<A>) -> Fitness {
    state
        .hall_of_fame
        .best()
        .map(|b| b.fitness().clone())
        .unwrap_or_default()
}

/// Mean score over individuals with valid fitness.
fn average_score<A: Gene>(population: &[Individual<A>]) -> f64 {
    let scores: Vec<f64> = population
        .iter()
        .filter(|i| i.fitness().is_valid())
        .map(|i| i.fitness().score())
        .collect();

    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

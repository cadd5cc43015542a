//! Genome manipulation utilities for evolutionary search.
//!
//! Provides crossover, mutation and the combined variation step over action
//! sequences, plus the sequence generator interface used to produce fresh
//! subsequences.

use rand::prelude::*;
use rand::seq::index;
use rand_distr::Normal;

use crate::schema::{EngineConfig, Gene, Individual, MutationOperator};

/// Produces domain-valid action sequences.
pub trait SequenceGenerator<A: Gene>: Sync {
    /// Generate a sequence of approximately `len` actions.
    fn generate(&self, len: usize, rng: &mut StdRng) -> Vec<A>;
}

impl<A, F> SequenceGenerator<A> for F
where
    A: Gene,
    F: Fn(usize, &mut StdRng) -> Vec<A> + Sync,
{
    fn generate(&self, len: usize, rng: &mut StdRng) -> Vec<A> {
        self(len, rng)
    }
}

/// Samples actions uniformly from a fixed alphabet.
#[derive(Debug, Clone)]
pub struct UniformGenerator<A> {
    actions: Vec<A>,
    length_jitter: f64,
}

impl<A: Gene> UniformGenerator<A> {
    pub fn new(actions: Vec<A>) -> Self {
        Self {
            actions,
            length_jitter: 0.0,
        }
    }

    /// Vary generated lengths with a normal distribution of this standard deviation.
    pub fn with_length_jitter(mut self, std_dev: f64) -> Self {
        self.length_jitter = std_dev;
        self
    }
}

impl<A: Gene> SequenceGenerator<A> for UniformGenerator<A> {
    fn generate(&self, len: usize, rng: &mut StdRng) -> Vec<A> {
        let len = match Normal::new(len as f64, self.length_jitter) {
            Ok(dist) if self.length_jitter > 0.0 => dist.sample(rng).round().max(1.0) as usize,
            _ => len,
        };

        (0..len)
            .filter_map(|_| self.actions.choose(rng).cloned())
            .collect()
    }
}

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Access the underlying generator.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Return true with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.r#gen::<f64>() < p
    }

    /// Swap a random window of `length` actions between clones of two parents.
    ///
    /// The window is clamped to the shorter parent, so both children keep
    /// their parent's length. Children always come back with invalid fitness.
    pub fn crossover<A: Gene>(
        &mut self,
        parent1: &Individual<A>,
        parent2: &Individual<A>,
        length: usize,
    ) -> (Individual<A>, Individual<A>) {
        let mut child1 = parent1.clone();
        let mut child2 = parent2.clone();

        let shortest = parent1.len().min(parent2.len());
        let length = length.min(shortest);
        if length > 0 {
            let start = self.rng.gen_range(0..=shortest - length);
            let window = start..start + length;
            child1.sequence_mut()[window.clone()]
                .swap_with_slice(&mut child2.sequence_mut()[window]);
        }

        child1.invalidate();
        child2.invalidate();
        (child1, child2)
    }

    /// Replace a random window of up to `max_window` actions with a freshly
    /// generated subsequence.
    pub fn mutate_replace<A, G>(
        &mut self,
        individual: &mut Individual<A>,
        max_window: usize,
        generator: &G,
    ) where
        A: Gene,
        G: SequenceGenerator<A> + ?Sized,
    {
        let max_window = max_window.max(1);
        let len = individual.len();

        let (start, window, generated_len) = if len == 0 {
            (0, 0, self.rng.gen_range(1..=max_window))
        } else {
            let window = self.rng.gen_range(1..=max_window.min(len));
            let start = self.rng.gen_range(0..=len - window);
            (start, window, window)
        };

        let replacement = generator.generate(generated_len, &mut self.rng);
        individual
            .sequence_mut()
            .splice(start..start + window, replacement);
    }

    /// Exchange the actions at two distinct random positions.
    pub fn mutate_swap<A: Gene>(&mut self, individual: &mut Individual<A>) {
        let len = individual.len();
        let sequence = individual.sequence_mut();
        if len >= 2 {
            let picked = index::sample(&mut self.rng, len, 2);
            sequence.swap(picked.index(0), picked.index(1));
        }
    }

    /// Apply one mutation operator drawn uniformly from `operators`.
    pub fn mutate<A, G>(
        &mut self,
        individual: &mut Individual<A>,
        operators: &[MutationOperator],
        max_window: usize,
        generator: &G,
    ) where
        A: Gene,
        G: SequenceGenerator<A> + ?Sized,
    {
        match operators.choose(&mut self.rng).copied() {
            Some(MutationOperator::ReplaceSubsequence) => {
                self.mutate_replace(individual, max_window, generator)
            }
            Some(MutationOperator::Swap) => self.mutate_swap(individual),
            None => {}
        }
    }

    /// Produce offspring from parents by crossover then mutation.
    ///
    /// Adjacent pairs of cloned parents are crossed with the configured
    /// crossover probability, then every offspring is mutated with the
    /// mutation probability. Offspring left untouched keep their fitness.
    pub fn var_and<A, G>(
        &mut self,
        parents: &[Individual<A>],
        config: &EngineConfig,
        generator: &G,
    ) -> Vec<Individual<A>>
    where
        A: Gene,
        G: SequenceGenerator<A> + ?Sized,
    {
        let mut offspring = parents.to_vec();

        for i in (1..offspring.len()).step_by(2) {
            if self.chance(config.crossover_probability) {
                let (a, b) =
                    self.crossover(&offspring[i - 1], &offspring[i], config.crossover_length);
                offspring[i - 1] = a;
                offspring[i] = b;
            }
        }

        for child in &mut offspring {
            if self.chance(config.mutation_probability) {
                self.mutate(
                    child,
                    &config.mutation_operators,
                    config.mutation_window,
                    generator,
                );
            }
        }

        offspring
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FitnessWeights;
    use proptest::prelude::*;

    fn evaluated(sequence: Vec<u32>) -> Individual<u32> {
        let mut ind = Individual::new(sequence);
        ind.set_fitness(vec![1.0], &FitnessWeights::default()).unwrap();
        ind
    }

    fn sevens(len: usize, _rng: &mut StdRng) -> Vec<u32> {
        vec![7; len]
    }

    #[test]
    fn test_crossover_exchanges_window() {
        let mut rng = GenomeRng::new(42);
        let p1 = evaluated(vec![1, 1, 1, 1, 1]);
        let p2 = evaluated(vec![2, 2, 2, 2, 2, 2, 2]);

        let (c1, c2) = rng.crossover(&p1, &p2, 2);

        assert_eq!(c1.len(), 5);
        assert_eq!(c2.len(), 7);
        assert_eq!(c1.sequence().iter().filter(|&&a| a == 2).count(), 2);
        assert_eq!(c2.sequence().iter().filter(|&&a| a == 1).count(), 2);
        assert!(!c1.fitness().is_valid());
        assert!(!c2.fitness().is_valid());
        // Parents are untouched.
        assert!(p1.fitness().is_valid());
        assert_eq!(p1.sequence(), &[1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_crossover_window_clamped_to_shorter_parent() {
        let mut rng = GenomeRng::new(7);
        let p1 = evaluated(vec![1]);
        let p2 = evaluated(vec![2, 2, 2]);

        let (c1, c2) = rng.crossover(&p1, &p2, 10);
        assert_eq!(c1.sequence(), &[2]);
        assert_eq!(c2.sequence().iter().filter(|&&a| a == 1).count(), 1);
        assert_eq!(c2.len(), 3);
    }

    #[test]
    fn test_mutate_replace_uses_generator() {
        let mut rng = GenomeRng::new(3);
        let mut ind = evaluated(vec![1, 2, 3, 4, 5, 6]);

        rng.mutate_replace(&mut ind, 3, &sevens);

        assert!(!ind.fitness().is_valid());
        assert_eq!(ind.len(), 6);
        let replaced = ind.sequence().iter().filter(|&&a| a == 7).count();
        assert!((1..=3).contains(&replaced));
    }

    #[test]
    fn test_mutate_replace_empty_sequence_inserts() {
        let mut rng = GenomeRng::new(3);
        let mut ind = Individual::<u32>::new(Vec::new());

        rng.mutate_replace(&mut ind, 2, &sevens);

        assert!((1..=2).contains(&ind.len()));
    }

    #[test]
    fn test_mutate_swap_keeps_actions() {
        let mut rng = GenomeRng::new(11);
        let mut ind = evaluated(vec![1, 2, 3, 4]);

        rng.mutate_swap(&mut ind);

        assert!(!ind.fitness().is_valid());
        let mut sorted = ind.sequence().to_vec();
        sorted.sort();
        assert_eq!(sorted, vec![1, 2, 3, 4]);
        assert_ne!(ind.sequence(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_mutate_swap_single_action() {
        let mut rng = GenomeRng::new(11);
        let mut ind = evaluated(vec![9]);
        rng.mutate_swap(&mut ind);
        assert_eq!(ind.sequence(), &[9]);
        assert!(!ind.fitness().is_valid());
    }

    #[test]
    fn test_var_and_without_variation_clones_parents() {
        let mut rng = GenomeRng::new(1);
        let config = EngineConfig {
            crossover_probability: 0.0,
            mutation_probability: 0.0,
            ..Default::default()
        };
        let parents = vec![evaluated(vec![1, 2]), evaluated(vec![3, 4]), evaluated(vec![5])];

        let offspring = rng.var_and(&parents, &config, &sevens);

        assert_eq!(offspring, parents);
    }

    #[test]
    fn test_var_and_always_cross_invalidates_pairs() {
        let mut rng = GenomeRng::new(1);
        let config = EngineConfig {
            crossover_probability: 1.0,
            mutation_probability: 0.0,
            ..Default::default()
        };
        let parents = vec![
            evaluated(vec![1, 1]),
            evaluated(vec![2, 2]),
            evaluated(vec![3, 3]),
        ];

        let offspring = rng.var_and(&parents, &config, &sevens);

        assert_eq!(offspring.len(), 3);
        assert!(!offspring[0].fitness().is_valid());
        assert!(!offspring[1].fitness().is_valid());
        // Odd one out has no partner.
        assert_eq!(offspring[2], parents[2]);
    }

    #[test]
    fn test_var_and_is_deterministic_for_seed() {
        let config = EngineConfig {
            crossover_probability: 0.7,
            mutation_probability: 0.7,
            ..Default::default()
        };
        let parents: Vec<_> = (0..6).map(|i| evaluated(vec![i, i + 1, i + 2, i + 3])).collect();

        let a = GenomeRng::new(99).var_and(&parents, &config, &sevens);
        let b = GenomeRng::new(99).var_and(&parents, &config, &sevens);
        assert_eq!(a, b);
    }

    #[test]
    fn test_uniform_generator() {
        let generator = UniformGenerator::new(vec!["basicSynth", "basicTouch"]);
        let mut rng = StdRng::seed_from_u64(5);

        let sequence = generator.generate(4, &mut rng);
        assert_eq!(sequence.len(), 4);
        assert!(sequence.iter().all(|a| *a == "basicSynth" || *a == "basicTouch"));

        let jittered = generator.with_length_jitter(2.0).generate(4, &mut rng);
        assert!(!jittered.is_empty());
    }

    proptest! {
        #[test]
        fn prop_crossover_preserves_lengths(
            a in proptest::collection::vec(0u32..10, 0..20),
            b in proptest::collection::vec(0u32..10, 0..20),
            length in 1usize..8,
            seed in any::<u64>(),
        ) {
            let mut rng = GenomeRng::new(seed);
            let (c1, c2) = rng.crossover(&Individual::new(a.clone()), &Individual::new(b.clone()), length);
            prop_assert_eq!(c1.len(), a.len());
            prop_assert_eq!(c2.len(), b.len());
        }
    }
}

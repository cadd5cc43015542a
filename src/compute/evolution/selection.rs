//! Parent and survivor selection.
//!
//! Tournament selection picks parents stochastically, with pressure tuned by
//! the tournament size. Best-N selection is deterministic and elitist; the
//! generation step uses it both to trim offspring and to retain survivors.
//!
//! Individuals with invalid fitness never take part in either strategy.

use std::cmp::Ordering;

use rand::prelude::*;
use rand::seq::index;

use crate::schema::{Gene, Individual};

/// Selection errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("Requested {requested} individuals but only {available} have valid fitness")]
    InsufficientPopulation { requested: usize, available: usize },
}

/// Indices of individuals with valid fitness, in pool order.
fn valid_indices<A: Gene>(pool: &[Individual<A>]) -> Vec<usize> {
    pool.iter()
        .enumerate()
        .filter(|(_, ind)| ind.fitness().is_valid())
        .map(|(i, _)| i)
        .collect()
}

/// Select `n` individuals by repeated tournaments of `tournament_size`.
///
/// Each tournament samples distinct individuals; the same individual may win
/// several tournaments. Tournaments larger than the valid pool use the whole
/// valid pool.
pub fn select_tournament<A: Gene, R: Rng + ?Sized>(
    pool: &[Individual<A>],
    n: usize,
    tournament_size: usize,
    rng: &mut R,
) -> Result<Vec<Individual<A>>, SelectionError> {
    if n == 0 {
        return Ok(Vec::new());
    }

    let valid = valid_indices(pool);
    if valid.is_empty() {
        return Err(SelectionError::InsufficientPopulation {
            requested: n,
            available: 0,
        });
    }

    let size = tournament_size.clamp(1, valid.len());
    let mut selected = Vec::with_capacity(n);

    for _ in 0..n {
        let winner = index::sample(rng, valid.len(), size)
            .into_iter()
            .map(|i| &pool[valid[i]])
            .reduce(|best, candidate| {
                if candidate.fitness().compare(best.fitness()) == Ordering::Greater {
                    candidate
                } else {
                    best
                }
            });

        if let Some(winner) = winner {
            selected.push(winner.clone());
        }
    }

    Ok(selected)
}

/// Select the `n` best individuals, best first.
///
/// Ties keep their pool order.
pub fn select_best<A: Gene>(
    pool: &[Individual<A>],
    n: usize,
) -> Result<Vec<Individual<A>>, SelectionError> {
    let mut ranked: Vec<&Individual<A>> = pool
        .iter()
        .filter(|ind| ind.fitness().is_valid())
        .collect();

    if n > ranked.len() {
        return Err(SelectionError::InsufficientPopulation {
            requested: n,
            available: ranked.len(),
        });
    }

    // `sort_by` is stable.
    ranked.sort_by(|a, b| b.fitness().compare(a.fitness()));
    Ok(ranked.into_iter().take(n).cloned().collect())
}

/// Sort individuals best first, keeping pool order among ties.
pub fn sort_by_fitness<A: Gene>(individuals: &mut [Individual<A>]) {
    individuals.sort_by(|a, b| b.fitness().compare(a.fitness()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FitnessWeights;
    use proptest::prelude::*;

    fn scored(tag: u32, score: f64) -> Individual<u32> {
        let mut ind = Individual::new(vec![tag]);
        ind.set_fitness(vec![score], &FitnessWeights::default()).unwrap();
        ind
    }

    fn tags(individuals: &[Individual<u32>]) -> Vec<u32> {
        individuals.iter().map(|i| i.sequence()[0]).collect()
    }

    #[test]
    fn test_best_n_is_stable() {
        let pool = vec![scored(0, 1.0), scored(1, 5.0), scored(2, 3.0), scored(3, 5.0)];

        let best = select_best(&pool, 3).unwrap();
        assert_eq!(tags(&best), vec![1, 3, 2]);
    }

    #[test]
    fn test_best_n_skips_invalid() {
        let pool = vec![Individual::new(vec![9]), scored(1, 2.0), scored(2, 1.0)];

        let best = select_best(&pool, 2).unwrap();
        assert_eq!(tags(&best), vec![1, 2]);

        assert_eq!(
            select_best(&pool, 3),
            Err(SelectionError::InsufficientPopulation {
                requested: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_best_zero() {
        let pool: Vec<Individual<u32>> = Vec::new();
        assert!(select_best(&pool, 0).unwrap().is_empty());
    }

    #[test]
    fn test_tournament_returns_n_valid() {
        let mut rng = StdRng::seed_from_u64(42);
        let pool = vec![scored(0, 1.0), Individual::new(vec![1]), scored(2, 3.0)];

        let selected = select_tournament(&pool, 10, 2, &mut rng).unwrap();
        assert_eq!(selected.len(), 10);
        assert!(selected.iter().all(|i| i.fitness().is_valid()));
    }

    #[test]
    fn test_tournament_of_whole_pool_picks_best() {
        let mut rng = StdRng::seed_from_u64(42);
        let pool = vec![scored(0, 1.0), scored(1, 4.0), scored(2, 3.0)];

        let selected = select_tournament(&pool, 5, 10, &mut rng).unwrap();
        assert_eq!(tags(&selected), vec![1; 5]);
    }

    #[test]
    fn test_tournament_requires_valid_individuals() {
        let mut rng = StdRng::seed_from_u64(42);
        let pool = vec![Individual::<u32>::new(vec![0])];

        assert_eq!(
            select_tournament(&pool, 1, 2, &mut rng),
            Err(SelectionError::InsufficientPopulation {
                requested: 1,
                available: 0
            })
        );
        assert!(select_tournament(&pool, 0, 2, &mut rng).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_best_n_matches_sorted_scores(
            scores in proptest::collection::vec(-5i32..5, 1..30),
            take in 0usize..30,
        ) {
            let pool: Vec<_> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| scored(i as u32, *s as f64))
                .collect();
            let n = take.min(pool.len());

            let best = select_best(&pool, n).unwrap();

            let mut expected: Vec<(i32, u32)> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| (-*s, i as u32))
                .collect();
            expected.sort();
            let expected: Vec<u32> = expected.into_iter().take(n).map(|(_, i)| i).collect();
            prop_assert_eq!(tags(&best), expected);
        }
    }
}

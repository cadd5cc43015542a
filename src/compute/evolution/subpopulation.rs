//! Subpopulation partitioning and stagnation tracking.

use std::ops::Range;

use serde::{Deserialize, Deserializer, Serialize};

use crate::schema::{Fitness, StagnationConfig};

/// Split `len` individuals into `divider` contiguous segments.
///
/// Every segment holds `len / divider` individuals; the remainder is attached
/// to the last segment.
pub fn segment_bounds(len: usize, divider: usize) -> Vec<Range<usize>> {
    let divider = divider.max(1);
    let size = len / divider;

    (0..divider)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 == divider { len } else { start + size };
            start..end
        })
        .collect()
}

/// Stagnation bookkeeping for one subpopulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubpopulationState {
    /// Generations since the best fitness of this segment last changed.
    #[serde(default, deserialize_with = "lenient_counter")]
    pub stagnation_counter: usize,
    /// Best fitness recorded last generation. Invalid until the first step.
    #[serde(default)]
    pub last_best: Fitness,
}

/// Counters that are not a non-negative integer restart from zero.
fn lenient_counter<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(0))
}

impl SubpopulationState {
    /// Check if this subpopulation must be reset to the initial guess.
    ///
    /// A stagnant segment resets once it reaches `reset_after`, unless it holds
    /// the best fitness of the run, in which case it is only reset at
    /// `force_reset_after`.
    pub fn should_reset(&self, max_fitness: &Fitness, config: &StagnationConfig) -> bool {
        self.stagnation_counter >= config.reset_after
            && (!self.last_best.ranks_equal(max_fitness)
                || self.stagnation_counter >= config.force_reset_after)
    }

    /// Record the top fitness of the freshly built segment.
    pub fn record_best(&mut self, best: Fitness) {
        if self.last_best.ranks_equal(&best) {
            self.stagnation_counter += 1;
        } else {
            self.stagnation_counter = 0;
        }
        self.last_best = best;
    }
}

/// Best `last_best` across subpopulations.
pub fn max_fitness(states: &[SubpopulationState]) -> Fitness {
    states
        .iter()
        .map(|s| &s.last_best)
        .max_by(|a, b| a.compare(b))
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FitnessWeights;
    use proptest::prelude::*;

    fn fitness(score: f64) -> Fitness {
        Fitness::from_values(vec![score], &FitnessWeights::default()).unwrap()
    }

    fn state(counter: usize, score: f64) -> SubpopulationState {
        SubpopulationState {
            stagnation_counter: counter,
            last_best: fitness(score),
        }
    }

    #[test]
    fn test_even_split() {
        assert_eq!(segment_bounds(12, 3), vec![0..4, 4..8, 8..12]);
    }

    #[test]
    fn test_remainder_goes_to_last_segment() {
        assert_eq!(segment_bounds(10, 3), vec![0..3, 3..6, 6..10]);
        assert_eq!(segment_bounds(5, 1), vec![0..5]);
    }

    #[test]
    fn test_more_segments_than_individuals() {
        assert_eq!(segment_bounds(2, 3), vec![0..0, 0..0, 0..2]);
    }

    #[test]
    fn test_counter_increments_when_unchanged() {
        let mut s = state(3, 5.0);
        s.record_best(fitness(5.0));
        assert_eq!(s.stagnation_counter, 4);
    }

    #[test]
    fn test_counter_resets_on_change() {
        let mut s = state(3, 5.0);
        s.record_best(fitness(6.0));
        assert_eq!(s.stagnation_counter, 0);
        assert_eq!(s.last_best, fitness(6.0));
    }

    #[test]
    fn test_first_record_from_sentinel() {
        let mut s = SubpopulationState::default();
        s.record_best(fitness(1.0));
        assert_eq!(s.stagnation_counter, 0);
    }

    #[test]
    fn test_missing_counter_deserializes_as_zero() {
        let s: SubpopulationState = serde_json::from_str("{}").unwrap();
        assert_eq!(s.stagnation_counter, 0);
        assert!(!s.last_best.is_valid());
    }

    #[test]
    fn test_malformed_counter_deserializes_as_zero() {
        for json in [
            r#"{"stagnation_counter": "seven"}"#,
            r#"{"stagnation_counter": null}"#,
            r#"{"stagnation_counter": -3}"#,
            r#"{"stagnation_counter": 2.5}"#,
        ] {
            let s: SubpopulationState = serde_json::from_str(json).unwrap();
            assert_eq!(s.stagnation_counter, 0, "{json}");
        }

        let s: SubpopulationState = serde_json::from_str(r#"{"stagnation_counter": 12}"#).unwrap();
        assert_eq!(s.stagnation_counter, 12);
    }

    #[test]
    fn test_reset_rule() {
        let config = StagnationConfig::default();
        let max = fitness(10.0);

        // Below the soft threshold nothing resets.
        assert!(!state(19, 1.0).should_reset(&max, &config));
        // Trailing segment resets at the soft threshold.
        assert!(state(20, 1.0).should_reset(&max, &config));
        // Leading segment gets extra leeway.
        assert!(!state(20, 10.0).should_reset(&max, &config));
        assert!(!state(79, 10.0).should_reset(&max, &config));
        assert!(state(80, 10.0).should_reset(&max, &config));
    }

    #[test]
    fn test_max_fitness() {
        let states = vec![state(0, 1.0), state(0, 7.0), SubpopulationState::default()];
        assert_eq!(max_fitness(&states), fitness(7.0));
        assert!(!max_fitness(&[]).is_valid());
    }

    proptest! {
        #[test]
        fn prop_segments_cover_population(len in 0usize..500, divider in 1usize..20) {
            let bounds = segment_bounds(len, divider);
            prop_assert_eq!(bounds.len(), divider);
            prop_assert_eq!(bounds.iter().map(|r| r.len()).sum::<usize>(), len);
            for pair in bounds.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
            for r in &bounds[..divider - 1] {
                prop_assert_eq!(r.len(), len / divider);
            }
        }
    }
}

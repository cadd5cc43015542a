//! Hall of fame: the best individuals seen during a run.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::schema::{Gene, Individual};

/// Bounded archive of the best individuals ever observed, best first.
///
/// An entry is only evicted by a strictly better individual, so the best
/// fitness never decreases across updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HallOfFame<A> {
    /// Stored individuals, best first.
    entries: Vec<Individual<A>>,
    /// Maximum archive size.
    max_size: usize,
}

impl<A: Gene> HallOfFame<A> {
    /// Create a new hall of fame.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_size),
            max_size,
        }
    }

    /// Offer every individual of a population. Returns how many were added.
    pub fn update(&mut self, population: &[Individual<A>]) -> usize {
        population.iter().filter(|ind| self.add(ind)).count()
    }

    /// Add an individual if it belongs among the best.
    pub fn add(&mut self, candidate: &Individual<A>) -> bool {
        if !candidate.fitness().is_valid() || self.max_size == 0 {
            return false;
        }

        // Check capacity
        if self.entries.len() >= self.max_size
            && let Some(worst) = self.entries.last()
            && candidate.fitness().compare(worst.fitness()) != Ordering::Greater
        {
            return false;
        }

        // Check if already stored
        if self
            .entries
            .iter()
            .any(|e| e.sequence() == candidate.sequence())
        {
            return false;
        }

        let position = self
            .entries
            .iter()
            .position(|e| candidate.fitness().compare(e.fitness()) == Ordering::Greater)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, candidate.clone());
        self.entries.truncate(self.max_size);
        true
    }

    /// Best individual seen so far.
    pub fn best(&self) -> Option<&Individual<A>> {
        self.entries.first()
    }

    /// Get top N individuals.
    pub fn top_n(&self, n: usize) -> &[Individual<A>] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Get all individuals, best first.
    pub fn entries(&self) -> &[Individual<A>] {
        &self.entries
    }

    /// Consume into the stored individuals, best first.
    pub fn into_entries(self) -> Vec<Individual<A>> {
        self.entries
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get archive size.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if archive is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

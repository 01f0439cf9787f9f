//! Parent selection.

use crate::base::{by_fitness_desc, Chromosome};
use rand::{Rng, RngCore};
use std::fmt;

/// Picks `count` parents from a generation.
pub trait Selection<C: Chromosome>: fmt::Debug + Send + Sync {
    fn select(&self, count: usize, generation: &[C], rng: &mut dyn RngCore) -> Vec<C>;
}

/// Repeated tournaments: each pick is the fittest of `size` random entrants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TournamentSelection {
    size: usize,
}

impl TournamentSelection {
    /// A tournament of at least one entrant.
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Default for TournamentSelection {
    fn default() -> Self {
        Self::new(2)
    }
}

impl<C: Chromosome> Selection<C> for TournamentSelection {
    fn select(&self, count: usize, generation: &[C], rng: &mut dyn RngCore) -> Vec<C> {
        if generation.is_empty() {
            return Vec::new();
        }

        (0..count)
            .map(|_| {
                let mut winner = &generation[rng.random_range(0..generation.len())];
                for _ in 1..self.size {
                    let entrant = &generation[rng.random_range(0..generation.len())];
                    if by_fitness_desc(entrant, winner).is_lt() {
                        winner = entrant;
                    }
                }
                winner.clone()
            })
            .collect()
    }
}

/// Deterministic truncation: the `count` fittest chromosomes.
///
/// When `count` exceeds the generation the ranking is cycled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EliteSelection;

impl<C: Chromosome> Selection<C> for EliteSelection {
    fn select(&self, count: usize, generation: &[C], _rng: &mut dyn RngCore) -> Vec<C> {
        let mut ranked: Vec<&C> = generation.iter().collect();
        ranked.sort_by(|a, b| by_fitness_desc(*a, *b));

        ranked.into_iter().cycle().take(count).cloned().collect()
    }
}

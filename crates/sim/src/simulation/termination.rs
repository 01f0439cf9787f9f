//! Termination conditions.

use std::fmt;
use std::time::Duration;

/// Progress of a run, as seen by terminations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatus {
    /// Generations evaluated since the last `start`.
    pub generations_number: usize,
    /// Wall time spent inside the evolution loop.
    pub time_evolving: Duration,
    /// Best fitness of each species, in species order.
    pub best_fitness: Vec<Option<f64>>,
}

impl RunStatus {
    /// Highest best fitness over all species.
    pub fn best_fitness_overall(&self) -> Option<f64> {
        self.best_fitness.iter().flatten().copied().reduce(f64::max)
    }
}

/// Decides when a run is finished.
pub trait Termination: fmt::Debug + Send + Sync {
    fn has_reached(&self, status: &RunStatus) -> bool;
}

/// Reached once `generations` generations have been evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationNumberTermination {
    generations: usize,
}

impl GenerationNumberTermination {
    pub fn new(generations: usize) -> Self {
        Self { generations }
    }

    pub fn generations(&self) -> usize {
        self.generations
    }
}

impl Default for GenerationNumberTermination {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Termination for GenerationNumberTermination {
    fn has_reached(&self, status: &RunStatus) -> bool {
        status.generations_number >= self.generations
    }
}

/// Reached when any species' best fitness meets the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessThresholdTermination {
    threshold: f64,
}

impl FitnessThresholdTermination {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Termination for FitnessThresholdTermination {
    fn has_reached(&self, status: &RunStatus) -> bool {
        status
            .best_fitness_overall()
            .is_some_and(|best| best >= self.threshold)
    }
}

/// Reached after spending `max` evolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEvolvingTermination {
    max: Duration,
}

impl TimeEvolvingTermination {
    pub fn new(max: Duration) -> Self {
        Self { max }
    }
}

impl Termination for TimeEvolvingTermination {
    fn has_reached(&self, status: &RunStatus) -> bool {
        status.time_evolving >= self.max
    }
}

/// Reached when any inner termination is.
#[derive(Debug, Default)]
pub struct OrTermination {
    terminations: Vec<Box<dyn Termination>>,
}

impl OrTermination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, termination: impl Termination + 'static) -> Self {
        self.terminations.push(Box::new(termination));
        self
    }
}

impl Termination for OrTermination {
    fn has_reached(&self, status: &RunStatus) -> bool {
        self.terminations.iter().any(|t| t.has_reached(status))
    }
}

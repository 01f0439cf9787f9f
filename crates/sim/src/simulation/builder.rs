//! Builder pattern for creating engines.
//!
//! Provides a fluent API for assembling species, the joint fitness and the
//! termination, with validation of every run-level parameter.

use crate::base::Chromosome;
pub use crate::errors::BuilderError;
use crate::evolution::CoevolutionFitness;
use crate::executor::{build_pool, TaskExecutor};
use crate::simulation::{
    CoevolutionEngine, ExecutionConfig, GenerationNumberTermination, Species, Termination,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builder for [`CoevolutionEngine`].
///
/// # Examples
///
/// ```
/// use coevo_sim::prelude::*;
/// use rand::SeedableRng;
/// use rand_xoshiro::Xoshiro256PlusPlus;
///
/// let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
/// let adam = VecChromosome::random(10, alphabet_generator(vec![0u8, 1]), &mut rng);
///
/// let engine = CoevolutionBuilder::new()
///     .species(Species::new("a", Population::new(4, 8, adam.clone()).unwrap()))
///     .species(Species::new("b", Population::new(4, 8, adam).unwrap()))
///     .fitness(|partners: &[&VecChromosome<u8>]| -> Result<f64, FitnessError> {
///         Ok(partners.iter().map(|c| c.genes().iter().map(|g| *g as f64).sum::<f64>()).sum())
///     })
///     .termination(GenerationNumberTermination::new(5))
///     .threads(2)
///     .seed(42)
///     .build()
///     .unwrap();
///
/// engine.start().unwrap();
/// assert_eq!(engine.state(), RunState::TerminationReached);
/// assert_eq!(engine.generations_number(), 5);
/// ```
pub struct CoevolutionBuilder<C: Chromosome> {
    species: Vec<Species<C>>,
    fitness: Option<Arc<dyn CoevolutionFitness<C>>>,
    termination: Option<Box<dyn Termination>>,
    execution: ExecutionConfig,
}

impl<C: Chromosome> Default for CoevolutionBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Chromosome> CoevolutionBuilder<C> {
    pub fn new() -> Self {
        Self {
            species: Vec::new(),
            fitness: None,
            termination: None,
            execution: ExecutionConfig::default(),
        }
    }

    /// Add a species (at least one is required). Order defines partner slots.
    pub fn species(mut self, species: Species<C>) -> Self {
        self.species.push(species);
        self
    }

    /// Set the joint fitness (required).
    pub fn fitness(mut self, fitness: impl CoevolutionFitness<C> + 'static) -> Self {
        self.fitness = Some(Arc::new(fitness));
        self
    }

    /// Set the termination (default: `total_generations`, or one generation).
    pub fn termination(mut self, termination: impl Termination + 'static) -> Self {
        self.termination = Some(Box::new(termination));
        self
    }

    /// Take threads, timeout, seed and generation count from a config.
    pub fn execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.execution.threads = Some(threads);
        self
    }

    /// Per-batch timeout for both reproduction and fitness evaluation,
    /// rounded up to whole milliseconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.execution.timeout_ms = Some(millis.try_into().unwrap_or(u64::MAX));
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.execution.seed = Some(seed);
        self
    }

    pub fn generations(mut self, generations: usize) -> Self {
        self.execution.total_generations = Some(generations);
        self
    }

    pub fn build(self) -> Result<CoevolutionEngine<C>, BuilderError> {
        if self.species.is_empty() {
            return Err(BuilderError::MissingRequired("species"));
        }
        let fitness = self.fitness.ok_or(BuilderError::MissingRequired("fitness"))?;

        let mut names = HashSet::new();
        for species in &self.species {
            if !names.insert(species.name()) {
                return Err(BuilderError::InvalidParameter(format!(
                    "duplicate species name '{}'",
                    species.name()
                )));
            }
        }

        self.execution
            .validate()
            .map_err(|e| BuilderError::InvalidParameter(e.to_string()))?;

        let termination = match (self.termination, self.execution.total_generations) {
            (Some(termination), _) => termination,
            (None, Some(generations)) => Box::new(GenerationNumberTermination::new(generations)),
            (None, None) => Box::new(GenerationNumberTermination::default()),
        };

        let threads = self.execution.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let pool = build_pool(threads)?;
        let timeout = self.execution.timeout();

        let rng = if let Some(seed) = self.execution.seed {
            Xoshiro256PlusPlus::seed_from_u64(seed)
        } else {
            Xoshiro256PlusPlus::from_seed(rand::rng().random())
        };

        debug!(
            species = self.species.len(),
            threads,
            ?timeout,
            seed = ?self.execution.seed,
            "Building co-evolution engine"
        );

        Ok(CoevolutionEngine::new(
            self.species,
            fitness,
            termination,
            TaskExecutor::with_pool(Arc::clone(&pool)).with_timeout(timeout),
            TaskExecutor::with_pool(pool).with_timeout(timeout),
            rng,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{alphabet_generator, VecChromosome};
    use crate::errors::FitnessError;
    use crate::simulation::{Population, RunState};

    type Chr = VecChromosome<u8>;

    fn species(name: &str) -> Species<Chr> {
        let adam = VecChromosome::new(vec![0; 8], alphabet_generator(vec![0, 1]));
        Species::new(name, Population::new(2, 4, adam).unwrap())
    }

    fn zero(_: &[&Chr]) -> Result<f64, FitnessError> {
        Ok(0.0)
    }

    #[test]
    fn test_sub_millisecond_timeout_rounds_up() {
        let builder = CoevolutionBuilder::<Chr>::new()
            .species(species("a"))
            .fitness(zero)
            .timeout(Duration::from_micros(500));
        assert_eq!(builder.execution.timeout_ms, Some(1));
        assert!(builder.build().is_ok());

        let builder = CoevolutionBuilder::<Chr>::new().timeout(Duration::from_micros(2_001));
        assert_eq!(builder.execution.timeout_ms, Some(3));
    }

    #[test]
    fn test_builder_minimal() {
        let engine = CoevolutionBuilder::new()
            .species(species("a"))
            .fitness(zero)
            .threads(1)
            .build()
            .unwrap();

        assert_eq!(engine.state(), RunState::NotStarted);
        assert_eq!(engine.species_names(), &["a".to_string()]);
        assert_eq!(engine.generations_number(), 0);
    }

    #[test]
    fn test_builder_missing_species() {
        let result = CoevolutionBuilder::<Chr>::new().fitness(zero).build();
        assert!(matches!(result, Err(BuilderError::MissingRequired("species"))));
    }

    #[test]
    fn test_builder_missing_fitness() {
        let result = CoevolutionBuilder::new().species(species("a")).build();
        assert!(matches!(result, Err(BuilderError::MissingRequired("fitness"))));
    }

    #[test]
    fn test_builder_duplicate_species() {
        let result = CoevolutionBuilder::new()
            .species(species("a"))
            .species(species("a"))
            .fitness(zero)
            .build();
        assert!(matches!(result, Err(BuilderError::InvalidParameter(_))));
    }

    #[test]
    fn test_builder_zero_threads() {
        let result = CoevolutionBuilder::new()
            .species(species("a"))
            .fitness(zero)
            .threads(0)
            .build();
        assert!(matches!(result, Err(BuilderError::InvalidParameter(_))));
    }

    #[test]
    fn test_builder_generations_from_execution_config() {
        let execution = ExecutionConfig {
            threads: Some(1),
            seed: Some(7),
            total_generations: Some(3),
            ..Default::default()
        };
        let engine = CoevolutionBuilder::new()
            .species(species("a"))
            .species(species("b"))
            .fitness(zero)
            .execution(execution)
            .build()
            .unwrap();

        engine.start().unwrap();
        assert_eq!(engine.generations_number(), 3);
        assert_eq!(engine.state(), RunState::TerminationReached);
    }
}

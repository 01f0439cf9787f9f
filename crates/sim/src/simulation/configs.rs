//! Engine and species configuration.
//!
//! The master [`EngineConfig`] can be read from a JSON file to reproduce a
//! run setup. Species configs only carry sizes, probabilities and the SVLC
//! segment cap; the other operators and the template chromosome are supplied
//! in code.

use crate::base::Chromosome;
use crate::errors::ConfigError;
use crate::evolution::{SvlcCrossover, MAX_SYNAPSING_SEGMENTS};
use crate::simulation::species::{DEFAULT_CROSSOVER_PROBABILITY, DEFAULT_MUTATION_PROBABILITY};
use crate::simulation::{Population, Species};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// The master configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub species: Vec<SpeciesConfig>,
}

/// Run-level parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Worker threads; `None` uses every logical CPU
    #[serde(default)]
    pub threads: Option<usize>,
    /// Per-batch timeout in milliseconds; `None` waits forever
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Optional RNG seed for reproducibility
    #[serde(default)]
    pub seed: Option<u64>,
    /// Generations to evaluate when no termination is given in code
    #[serde(default)]
    pub total_generations: Option<usize>,
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == Some(0) {
            return Err(ConfigError::Validation("threads must be at least 1".into()));
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::Validation("timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

fn default_crossover_probability() -> f32 {
    DEFAULT_CROSSOVER_PROBABILITY
}

fn default_mutation_probability() -> f32 {
    DEFAULT_MUTATION_PROBABILITY
}

/// Sizes and operator probabilities of one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    pub min_size: usize,
    pub max_size: usize,
    #[serde(default = "default_crossover_probability")]
    pub crossover_probability: f32,
    #[serde(default = "default_mutation_probability")]
    pub mutation_probability: f32,
    /// Cap on the segments the default SVLC crossover synapses; `None` is
    /// uncapped and the child count doubles with every shared segment
    #[serde(default)]
    pub max_segments: Option<usize>,
}

impl SpeciesConfig {
    pub fn new(name: impl Into<String>, min_size: usize, max_size: usize) -> Self {
        Self {
            name: name.into(),
            min_size,
            max_size,
            crossover_probability: DEFAULT_CROSSOVER_PROBABILITY,
            mutation_probability: DEFAULT_MUTATION_PROBABILITY,
            max_segments: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Validation("species name must not be empty".into()));
        }
        if self.min_size < 2 || self.max_size < self.min_size {
            return Err(ConfigError::Validation(format!(
                "species '{}': need 2 <= min_size <= max_size, got {} and {}",
                self.name, self.min_size, self.max_size
            )));
        }
        for (label, p) in [
            ("crossover_probability", self.crossover_probability),
            ("mutation_probability", self.mutation_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Validation(format!(
                    "species '{}': {label} must be within [0, 1], got {p}",
                    self.name
                )));
            }
        }
        if let Some(max) = self.max_segments {
            if !(1..=MAX_SYNAPSING_SEGMENTS).contains(&max) {
                return Err(ConfigError::Validation(format!(
                    "species '{}': max_segments must be within [1, {MAX_SYNAPSING_SEGMENTS}], got {max}",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Build a species with default operators around `adam`.
    pub fn build<C: Chromosome>(&self, adam: C) -> Result<Species<C>, ConfigError> {
        self.validate()?;
        let population = Population::new(self.min_size, self.max_size, adam)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        let mut species = Species::new(self.name.clone(), population)
            .with_crossover_probability(self.crossover_probability)
            .with_mutation_probability(self.mutation_probability);
        if let Some(max) = self.max_segments {
            species = species.with_crossover(SvlcCrossover::default().with_max_segments(max));
        }
        Ok(species)
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.execution.validate()?;

        let mut names = HashSet::new();
        for species in &self.species {
            species.validate()?;
            if !names.insert(species.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate species name '{}'",
                    species.name
                )));
            }
        }
        Ok(())
    }

    pub fn species_config(&self, name: &str) -> Option<&SpeciesConfig> {
        self.species.iter().find(|s| s.name == name)
    }
}

//! Error types for the co-evolution engine and its operators.
//!
//! One enum per concern. Operator errors ([`CrossoverError`],
//! [`ChromosomeError`], [`FitnessError`]) are raised inside worker tasks and
//! reach the caller wrapped in an [`EngineError`] that names the species and
//! chromosome involved.

use coevo_align::AlignError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by executor tasks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised when editing the genes of a chromosome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChromosomeError {
    #[error("Gene index {index} out of bounds (len = {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Gene range [{start}, {end}) exceeds chromosome length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
}

/// Errors raised by crossover operators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrossoverError {
    #[error("Crossover needs {expected} parents, got {actual}")]
    ParentCount { expected: usize, actual: usize },

    /// Child count is `2^(segments + 1) - 2`; beyond this the counter overflows.
    #[error("{segments} common segments exceed the supported maximum of {max}")]
    TooManySegments { segments: usize, max: usize },

    #[error("Segment matching failed: {0}")]
    Align(#[from] AlignError),

    #[error("Failed to build child: {0}")]
    Chromosome(#[from] ChromosomeError),
}

/// Errors raised by fitness functions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitnessError {
    #[error("Fitness evaluation failed: {0}")]
    Evaluation(String),

    #[error("Expected {expected} partners, got {actual}")]
    PartnerCount { expected: usize, actual: usize },
}

/// Why a single executor task did not complete.
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error("{0}")]
    Error(BoxError),

    #[error("task panicked: {0}")]
    Panicked(String),
}

/// First failing task of a batch.
#[derive(Debug, Error)]
#[error("Task {index} failed: {failure}")]
pub struct TaskError {
    /// Position of the task in the batch, in insertion order.
    pub index: usize,
    #[source]
    pub failure: TaskFailure,
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Failed to build worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
}

/// Errors raised while a species reproduces.
#[derive(Debug, Error)]
pub enum SpeciesError {
    #[error("Species '{0}' has no current generation")]
    NoGeneration(String),

    #[error("Invalid population size: min {min}, max {max} (need 2 <= min <= max)")]
    InvalidSize { min: usize, max: usize },

    #[error("Crossover failed: {0}")]
    Crossover(#[from] CrossoverError),

    #[error("Mutation failed: {0}")]
    Chromosome(#[from] ChromosomeError),
}

/// Errors that can occur while building an engine.
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("Missing required parameter: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Errors raised when loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Batch kind that hit a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Reproduction,
    FitnessEvaluation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reproduction => write!(f, "reproduction"),
            Self::FitnessEvaluation => write!(f, "fitness evaluation"),
        }
    }
}

/// Errors returned by the engine lifecycle operations.
///
/// The first three variants are usage errors and leave the run state
/// untouched. Every other variant aborts the run and leaves the engine
/// `Stopped`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("The engine has not been started")]
    NotStarted,

    #[error("The engine is already running")]
    AlreadyRunning,

    #[error("Termination already reached; set a new termination before resuming")]
    TerminationAlreadyReached,

    #[error("The {phase} reached the {timeout:?} timeout")]
    Timeout { phase: Phase, timeout: Duration },

    #[error("Reproduction of species '{species}' failed: {source}")]
    Reproduction {
        species: String,
        source: TaskFailure,
    },

    #[error("Fitness evaluation of chromosome {chromosome} in species '{species}' failed: {source}")]
    Evaluation {
        species: String,
        chromosome: usize,
        source: TaskFailure,
    },

    #[error("Species '{species}' has no chromosomes to pair with")]
    EmptySpecies { species: String },

    #[error("Failed to create the initial generation: {0}")]
    Initialization(#[from] ChromosomeError),
}

impl EngineError {
    /// Usage errors are rejected before the run state is touched.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::NotStarted | Self::AlreadyRunning | Self::TerminationAlreadyReached
        )
    }
}

//! Cooperative co-evolution engine.
//!
//! The engine advances several species generation by generation. Each
//! generation runs two task batches: one reproduction task per species, then
//! one fitness task per chromosome of each species in turn. An individual is
//! scored jointly with one partner drawn from every other species.
//!
//! A generation is staged outside the species and committed to all of them
//! at once after both batches succeed. A failed or timed-out generation
//! leaves every species at its last committed generation.
//!
//! Run state and the stop flag share one lock that is never held while a
//! batch runs or while listeners are called, so `stop` may be called from
//! any thread, including from inside a listener.

use crate::base::{by_fitness_desc, Chromosome};
use crate::errors::{EngineError, Phase, TaskError};
use crate::evolution::{cooperative_score, CoevolutionFitness};
use crate::executor::TaskExecutor;
use crate::simulation::{RunStatus, Species, Termination};
use parking_lot::{Mutex, RwLock};
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Lifecycle state of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    NotStarted,
    Started,
    Resumed,
    Stopped,
    TerminationReached,
}

impl RunState {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Started | Self::Resumed)
    }
}

#[derive(Debug, Default)]
struct Control {
    state: RunState,
    stop_requested: bool,
    /// An evaluated generation of the current run is committed.
    initialized: bool,
}

#[derive(Debug, Default)]
struct Clock {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl Clock {
    fn elapsed(&self) -> Duration {
        self.accumulated + self.running_since.map(|t| t.elapsed()).unwrap_or_default()
    }

    fn resume(&mut self) {
        self.running_since = Some(Instant::now());
    }

    fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }
}

/// Callback invoked synchronously on the driving thread.
pub type Listener<C> = Arc<dyn Fn(&CoevolutionEngine<C>) + Send + Sync>;

struct Listeners<C: Chromosome> {
    generation_ran: RwLock<Vec<Listener<C>>>,
    termination_reached: RwLock<Vec<Listener<C>>>,
    stopped: RwLock<Vec<Listener<C>>>,
}

impl<C: Chromosome> Default for Listeners<C> {
    fn default() -> Self {
        Self {
            generation_ran: RwLock::new(Vec::new()),
            termination_reached: RwLock::new(Vec::new()),
            stopped: RwLock::new(Vec::new()),
        }
    }
}

/// Index of the partner drawn from a species of `len` chromosomes.
///
/// Index 0 (the species' best after ordering) is only used when it is the
/// sole chromosome. `len` must be non-zero.
pub fn sample_partner_index(len: usize, rng: &mut dyn RngCore) -> usize {
    if len <= 1 {
        0
    } else {
        rng.random_range(1..len)
    }
}

/// Co-evolves a fixed set of species under a joint fitness.
///
/// Built with [`CoevolutionBuilder`](crate::simulation::CoevolutionBuilder).
pub struct CoevolutionEngine<C: Chromosome> {
    species: Vec<Arc<Mutex<Species<C>>>>,
    names: Vec<String>,
    fitness: Arc<dyn CoevolutionFitness<C>>,
    termination: RwLock<Box<dyn Termination>>,
    control: Mutex<Control>,
    generations_number: AtomicUsize,
    clock: Mutex<Clock>,
    rng: Mutex<Xoshiro256PlusPlus>,
    reproduction_executor: TaskExecutor,
    fitness_executor: TaskExecutor,
    listeners: Listeners<C>,
}

impl<C: Chromosome> CoevolutionEngine<C> {
    pub(crate) fn new(
        species: Vec<Species<C>>,
        fitness: Arc<dyn CoevolutionFitness<C>>,
        termination: Box<dyn Termination>,
        reproduction_executor: TaskExecutor,
        fitness_executor: TaskExecutor,
        rng: Xoshiro256PlusPlus,
    ) -> Self {
        let names = species.iter().map(|s| s.name().to_string()).collect();
        Self {
            species: species.into_iter().map(|s| Arc::new(Mutex::new(s))).collect(),
            names,
            fitness,
            termination: RwLock::new(termination),
            control: Mutex::new(Control::default()),
            generations_number: AtomicUsize::new(0),
            clock: Mutex::new(Clock::default()),
            rng: Mutex::new(rng),
            reproduction_executor,
            fitness_executor,
            listeners: Listeners::default(),
        }
    }

    pub fn state(&self) -> RunState {
        self.control.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Generations evaluated since the last `start`, the initial one included.
    pub fn generations_number(&self) -> usize {
        self.generations_number.load(Ordering::SeqCst)
    }

    /// Wall time spent evolving since the last `start`.
    pub fn time_evolving(&self) -> Duration {
        self.clock.lock().elapsed()
    }

    pub fn species_names(&self) -> &[String] {
        &self.names
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    /// Inspect one species. Blocks while that species is reproducing.
    pub fn with_species<R>(&self, index: usize, f: impl FnOnce(&Species<C>) -> R) -> Option<R> {
        self.species.get(index).map(|s| f(&s.lock()))
    }

    /// Best chromosome of every species, in species order.
    pub fn best_chromosome_set(&self) -> Vec<Option<C>> {
        self.species
            .iter()
            .map(|s| s.lock().best_chromosome().cloned())
            .collect()
    }

    pub fn status(&self) -> RunStatus {
        RunStatus {
            generations_number: self.generations_number(),
            time_evolving: self.time_evolving(),
            best_fitness: self
                .species
                .iter()
                .map(|s| s.lock().best_chromosome().and_then(|c| c.fitness()))
                .collect(),
        }
    }

    /// Replace the termination, e.g. to extend a finished run before `resume`.
    pub fn set_termination(&self, termination: impl Termination + 'static) {
        *self.termination.write() = Box::new(termination);
    }

    /// Tasks still queued on either executor.
    pub fn pending_tasks(&self) -> usize {
        self.reproduction_executor.pending_count() + self.fitness_executor.pending_count()
    }

    pub fn on_generation_ran(&self, listener: impl Fn(&Self) + Send + Sync + 'static) {
        self.listeners.generation_ran.write().push(Arc::new(listener));
    }

    pub fn on_termination_reached(&self, listener: impl Fn(&Self) + Send + Sync + 'static) {
        self.listeners.termination_reached.write().push(Arc::new(listener));
    }

    pub fn on_stopped(&self, listener: impl Fn(&Self) + Send + Sync + 'static) {
        self.listeners.stopped.write().push(Arc::new(listener));
    }

    /// Create fresh initial generations and evolve until termination or stop.
    #[instrument(level = "info", skip(self), fields(species = self.species.len()))]
    pub fn start(&self) -> Result<(), EngineError> {
        let created = {
            let mut control = self.control.lock();
            if control.state.is_running() {
                return Err(EngineError::AlreadyRunning);
            }

            control.state = RunState::Started;
            control.stop_requested = false;
            control.initialized = false;
            self.generations_number.store(0, Ordering::SeqCst);
            *self.clock.lock() = Clock::default();

            self.initial_chromosomes()
        };

        match created {
            Ok(initial) => self.run(Some(initial)),
            Err(err) => Err(self.abort(err)),
        }
    }

    /// Continue a stopped run from its current generations.
    #[instrument(level = "info", skip(self), fields(generation = self.generations_number()))]
    pub fn resume(&self) -> Result<(), EngineError> {
        {
            let mut control = self.control.lock();
            if !control.initialized {
                return Err(EngineError::NotStarted);
            }
            if control.state.is_running() {
                return Err(EngineError::AlreadyRunning);
            }

            let status = self.status();
            if self.termination.read().has_reached(&status) {
                return Err(EngineError::TerminationAlreadyReached);
            }

            control.state = RunState::Resumed;
            control.stop_requested = false;
        }

        self.run(None)
    }

    /// Ask the run to stop at the next generation boundary.
    pub fn stop(&self) -> Result<(), EngineError> {
        let mut control = self.control.lock();
        if !control.initialized {
            return Err(EngineError::NotStarted);
        }

        debug!("Stop requested");
        control.stop_requested = true;
        Ok(())
    }

    fn initial_chromosomes(&self) -> Result<Vec<Vec<C>>, EngineError> {
        let mut rng = self.rng.lock();
        self.species
            .iter()
            .map(|s| -> Result<Vec<C>, EngineError> { Ok(s.lock().initial_chromosomes(&mut *rng)?) })
            .collect()
    }

    /// `initial` holds the unevaluated first generation of a fresh run.
    fn run(&self, initial: Option<Vec<Vec<C>>>) -> Result<(), EngineError> {
        self.clock.lock().resume();
        let result = self.run_generations(initial);
        self.clock.lock().pause();

        result.map_err(|err| self.abort(err))
    }

    fn run_generations(&self, initial: Option<Vec<Vec<C>>>) -> Result<(), EngineError> {
        if let Some(initial) = initial {
            if self.end_current_generation(initial, true)? {
                return Ok(());
            }
        }

        loop {
            let stop_requested = self.control.lock().stop_requested;
            if stop_requested {
                self.set_state(RunState::Stopped);
                return Ok(());
            }

            if self.evolve_one_generation()? {
                return Ok(());
            }
        }
    }

    /// Reproduce every species, then evaluate. `Ok(true)` ends the loop.
    #[instrument(level = "debug", skip(self), fields(generation = self.generations_number() + 1))]
    fn evolve_one_generation(&self) -> Result<bool, EngineError> {
        let next = self.reproduce()?;
        self.end_current_generation(next, false)
    }

    /// Breed the next chromosomes of every species without installing them.
    fn reproduce(&self) -> Result<Vec<Vec<C>>, EngineError> {
        let seeds: Vec<u64> = {
            let mut rng = self.rng.lock();
            self.species.iter().map(|_| rng.random()).collect()
        };
        let slots: Arc<Vec<Mutex<Option<Vec<C>>>>> =
            Arc::new(self.species.iter().map(|_| Mutex::new(None)).collect());

        for (index, (species, seed)) in self.species.iter().zip(seeds).enumerate() {
            let species = Arc::clone(species);
            let slots = Arc::clone(&slots);
            self.reproduction_executor.add(move |_| {
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
                let next = species.lock().breed(&mut rng)?;
                *slots[index].lock() = Some(next);
                Ok(())
            });
        }

        let outcome = self.reproduction_executor.start();
        self.reproduction_executor.stop();
        self.reproduction_executor.clear();

        match outcome {
            Ok(true) => {}
            Ok(false) => return Err(timeout_error(Phase::Reproduction, &self.reproduction_executor)),
            Err(TaskError { index, failure }) => {
                return Err(EngineError::Reproduction {
                    species: self.names[index].clone(),
                    source: failure,
                })
            }
        }

        // A completed batch fills every slot.
        slots
            .iter()
            .map(|slot| slot.lock().take())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| timeout_error(Phase::Reproduction, &self.reproduction_executor))
    }

    /// Evaluate the staged generation of every species, then commit all of
    /// them together.
    ///
    /// Species are evaluated in order; later species sample partners from the
    /// already ordered and capped candidates of earlier ones. Nothing reaches
    /// a species unless every batch succeeded. Returns `Ok(true)` when the
    /// run must end, either because the termination was reached or because a
    /// stop was requested.
    fn end_current_generation(&self, candidates: Vec<Vec<C>>, fresh: bool) -> Result<bool, EngineError> {
        let best_set = if fresh { None } else { self.best_set_snapshot() };
        let max_sizes: Vec<usize> = self
            .species
            .iter()
            .map(|s| s.lock().population().max_size())
            .collect();

        let mut staged = candidates;
        for index in 0..staged.len() {
            let scores = self.evaluate_fitness(index, Arc::new(staged.clone()), best_set.as_ref())?;
            let generation = &mut staged[index];
            for (chromosome, score) in generation.iter_mut().zip(scores) {
                chromosome.set_fitness(score);
            }
            generation.sort_by(by_fitness_desc);
            generation.truncate(max_sizes[index]);
        }

        for (species, chromosomes) in self.species.iter().zip(staged) {
            species.lock().commit_generation(chromosomes, fresh);
        }
        if fresh {
            self.control.lock().initialized = true;
        }

        let generation = self.generations_number.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "Generation ran");
        self.fire(&self.listeners.generation_ran);

        let status = self.status();
        if self.termination.read().has_reached(&status) {
            info!(generation, best_fitness = ?status.best_fitness, "Termination reached");
            self.set_state(RunState::TerminationReached);
            self.fire(&self.listeners.termination_reached);
            return Ok(true);
        }

        let stop_requested = self.control.lock().stop_requested;
        if stop_requested {
            self.reproduction_executor.stop();
            self.fitness_executor.stop();
            self.set_state(RunState::Stopped);
            return Ok(true);
        }

        Ok(false)
    }

    /// Best chromosome of every species, or `None` unless all are evaluated.
    fn best_set_snapshot(&self) -> Option<Arc<Vec<C>>> {
        let mut best = Vec::with_capacity(self.species.len());
        for species in &self.species {
            let species = species.lock();
            match species.best_chromosome() {
                Some(chromosome) if chromosome.fitness().is_some() => best.push(chromosome.clone()),
                _ => return None,
            }
        }
        Some(Arc::new(best))
    }

    /// Score every chromosome `generations[index]` against sampled partners.
    #[instrument(level = "debug", skip(self, generations, best_set), fields(species = %self.names[index]))]
    fn evaluate_fitness(
        &self,
        index: usize,
        generations: Arc<Vec<Vec<C>>>,
        best_set: Option<&Arc<Vec<C>>>,
    ) -> Result<Vec<Option<f64>>, EngineError> {
        if let Some(empty) = generations
            .iter()
            .enumerate()
            .position(|(other, g)| other != index && g.is_empty())
        {
            return Err(EngineError::EmptySpecies {
                species: self.names[empty].clone(),
            });
        }

        let count = generations[index].len();
        let partners: Vec<Vec<usize>> = {
            let mut rng = self.rng.lock();
            (0..count)
                .map(|i| {
                    generations
                        .iter()
                        .enumerate()
                        .map(|(other, g)| {
                            if other == index {
                                i
                            } else {
                                sample_partner_index(g.len(), &mut *rng)
                            }
                        })
                        .collect()
                })
                .collect()
        };

        let slots: Arc<Vec<OnceLock<f64>>> = Arc::new((0..count).map(|_| OnceLock::new()).collect());

        for (i, partner_indices) in partners.into_iter().enumerate() {
            let generations = Arc::clone(&generations);
            let best_set = best_set.cloned();
            let fitness = Arc::clone(&self.fitness);
            let slots = Arc::clone(&slots);

            self.fitness_executor.add(move |token| {
                if token.is_cancelled() {
                    return Ok(());
                }

                let partners: Vec<&C> = partner_indices
                    .iter()
                    .enumerate()
                    .map(|(species, &p)| &generations[species][p])
                    .collect();
                let score = cooperative_score(&*fitness, &partners, best_set.as_deref().map(Vec::as_slice))?;
                // Each slot has exactly one writer.
                let _ = slots[i].set(score);
                Ok(())
            });
        }

        let outcome = self.fitness_executor.start();
        self.fitness_executor.stop();
        self.fitness_executor.clear();

        match outcome {
            Ok(true) => {}
            Ok(false) => return Err(timeout_error(Phase::FitnessEvaluation, &self.fitness_executor)),
            Err(TaskError { index: chromosome, failure }) => {
                return Err(EngineError::Evaluation {
                    species: self.names[index].clone(),
                    chromosome,
                    source: failure,
                })
            }
        }

        Ok(slots.iter().map(|slot| slot.get().copied()).collect())
    }

    fn set_state(&self, state: RunState) {
        let stopped = {
            let mut control = self.control.lock();
            let changed = control.state != state;
            control.state = state;
            changed && state == RunState::Stopped
        };

        if stopped {
            info!(generation = self.generations_number(), "Engine stopped");
            self.fire(&self.listeners.stopped);
        }
    }

    /// Force `Stopped` after a failed generation and hand the error back.
    fn abort(&self, err: EngineError) -> EngineError {
        error!(error = %err, "Run aborted");
        self.set_state(RunState::Stopped);
        err
    }

    fn fire(&self, listeners: &RwLock<Vec<Listener<C>>>) {
        let listeners = listeners.read().clone();
        for listener in listeners {
            listener(self);
        }
    }
}

fn timeout_error(phase: Phase, executor: &TaskExecutor) -> EngineError {
    let timeout = executor.timeout().unwrap_or_default();
    warn!(%phase, ?timeout, "Batch timed out");
    EngineError::Timeout { phase, timeout }
}

impl<C: Chromosome> fmt::Debug for CoevolutionEngine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoevolutionEngine")
            .field("species", &self.names)
            .field("state", &self.state())
            .field("generations_number", &self.generations_number())
            .field("termination", &*self.termination.read())
            .finish_non_exhaustive()
    }
}

//! Population management.
//!
//! A population owns the current generation of one species and tracks the
//! best chromosome seen at the end of the latest generation.

use crate::base::{by_fitness_desc, Chromosome};
use crate::errors::{ChromosomeError, SpeciesError};
use rand::RngCore;

/// One generation of chromosomes.
#[derive(Debug, Clone)]
pub struct Generation<C: Chromosome> {
    number: usize,
    chromosomes: Vec<C>,
}

impl<C: Chromosome> Generation<C> {
    pub fn new(number: usize, chromosomes: Vec<C>) -> Self {
        Self { number, chromosomes }
    }

    /// 1-based generation number within the population.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn chromosomes(&self) -> &[C] {
        &self.chromosomes
    }

    pub fn chromosomes_mut(&mut self) -> &mut [C] {
        &mut self.chromosomes
    }

    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    /// Stable sort by descending fitness, unevaluated chromosomes last.
    pub fn order(&mut self) {
        self.chromosomes.sort_by(by_fitness_desc);
    }
}

/// A resizable population between `min_size` and `max_size` chromosomes.
#[derive(Debug, Clone)]
pub struct Population<C: Chromosome> {
    min_size: usize,
    max_size: usize,
    adam: C,
    generations_number: usize,
    current: Option<Generation<C>>,
    best: Option<C>,
}

impl<C: Chromosome> Population<C> {
    /// `adam` is the template for the initial generation: its length and gene
    /// generator are reused, its genes are not.
    pub fn new(min_size: usize, max_size: usize, adam: C) -> Result<Self, SpeciesError> {
        if min_size < 2 || max_size < min_size {
            return Err(SpeciesError::InvalidSize {
                min: min_size,
                max: max_size,
            });
        }

        Ok(Self {
            min_size,
            max_size,
            adam,
            generations_number: 0,
            current: None,
            best: None,
        })
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn adam(&self) -> &C {
        &self.adam
    }

    /// Generations created since the initial one, inclusive.
    pub fn generations_number(&self) -> usize {
        self.generations_number
    }

    pub fn current_generation(&self) -> Option<&Generation<C>> {
        self.current.as_ref()
    }

    pub fn current_generation_mut(&mut self) -> Option<&mut Generation<C>> {
        self.current.as_mut()
    }

    /// Best chromosome of the last ended generation.
    pub fn best_chromosome(&self) -> Option<&C> {
        self.best.as_ref()
    }

    /// `min_size` random chromosomes shaped after `adam`. Leaves the
    /// population untouched.
    pub fn random_chromosomes(&self, rng: &mut dyn RngCore) -> Result<Vec<C>, ChromosomeError> {
        let len = self.adam.len();
        let mut chromosomes = Vec::with_capacity(self.min_size);

        for _ in 0..self.min_size {
            let genes: Vec<C::Gene> = (0..len).map(|i| self.adam.generate_gene(i, rng)).collect();
            let mut chromosome = self.adam.create_new();
            chromosome.resize(len);
            chromosome.replace_genes(0, &genes)?;
            chromosomes.push(chromosome);
        }

        Ok(chromosomes)
    }

    /// Replace any existing state with `min_size` random chromosomes.
    pub fn create_initial_generation(&mut self, rng: &mut dyn RngCore) -> Result<(), ChromosomeError> {
        let chromosomes = self.random_chromosomes(rng)?;
        self.restart(chromosomes);
        Ok(())
    }

    /// Drop all history and make `chromosomes` generation 1.
    pub fn restart(&mut self, chromosomes: Vec<C>) {
        self.generations_number = 0;
        self.best = None;
        self.create_new_generation(chromosomes);
    }

    pub fn create_new_generation(&mut self, chromosomes: Vec<C>) {
        self.generations_number += 1;
        self.current = Some(Generation::new(self.generations_number, chromosomes));
    }

    /// Order the current generation, cap it at `max_size` and refresh the best.
    pub fn end_current_generation(&mut self) {
        if let Some(generation) = self.current.as_mut() {
            generation.order();
            generation.chromosomes.truncate(self.max_size);
            self.best = generation.chromosomes.first().cloned();
        }
    }
}

use crate::errors::ChromosomeError;
use rand::{Rng, RngCore};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// An ordered, mutable gene sequence with an optional fitness.
///
/// Fitness is `None` until the chromosome has been evaluated. Any edit of the
/// genes clears it.
pub trait Chromosome: Clone + Send + Sync + fmt::Debug + 'static {
    type Gene: Clone + PartialEq + Send + Sync + fmt::Debug + 'static;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All genes, in order.
    fn genes(&self) -> &[Self::Gene];

    fn gene(&self, index: usize) -> Option<&Self::Gene> {
        self.genes().get(index)
    }

    /// A new, empty chromosome of the same kind (same gene generator).
    fn create_new(&self) -> Self;

    /// Grow or shrink in place. Existing genes keep their positions.
    fn resize(&mut self, len: usize);

    /// Overwrite `genes.len()` genes starting at `start`.
    fn replace_genes(&mut self, start: usize, genes: &[Self::Gene]) -> Result<(), ChromosomeError>;

    fn replace_gene(&mut self, index: usize, gene: Self::Gene) -> Result<(), ChromosomeError>;

    /// A fresh random gene suitable for `index`.
    fn generate_gene(&self, index: usize, rng: &mut dyn RngCore) -> Self::Gene;

    fn fitness(&self) -> Option<f64>;

    fn set_fitness(&mut self, fitness: Option<f64>);

    /// Replace every gene, resizing as needed.
    fn set_genes(&mut self, genes: &[Self::Gene]) -> Result<(), ChromosomeError> {
        self.resize(genes.len());
        self.replace_genes(0, genes)
    }
}

/// Descending fitness order, unevaluated chromosomes last.
pub fn by_fitness_desc<C: Chromosome>(a: &C, b: &C) -> Ordering {
    match (a.fitness(), b.fitness()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Produces a random gene for a position.
pub type GeneGenerator<G> = Arc<dyn Fn(usize, &mut dyn RngCore) -> G + Send + Sync>;

/// Generator drawing uniformly from a fixed set of symbols.
///
/// An empty symbol set yields `G::default()`.
pub fn alphabet_generator<G>(symbols: Vec<G>) -> GeneGenerator<G>
where
    G: Clone + Default + Send + Sync + 'static,
{
    Arc::new(move |_: usize, rng: &mut dyn RngCore| {
        if symbols.is_empty() {
            G::default()
        } else {
            symbols[rng.random_range(0..symbols.len())].clone()
        }
    })
}

/// Vector-backed chromosome.
///
/// # Examples
///
/// ```
/// use coevo_sim::base::{alphabet_generator, Chromosome, VecChromosome};
/// use rand::SeedableRng;
/// use rand_xoshiro::Xoshiro256PlusPlus;
///
/// let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
/// let adam = VecChromosome::random(8, alphabet_generator(vec![b'A', b'C']), &mut rng);
///
/// assert_eq!(adam.len(), 8);
/// assert!(adam.fitness().is_none());
/// assert!(adam.create_new().is_empty());
/// ```
#[derive(Clone)]
pub struct VecChromosome<G> {
    genes: Vec<G>,
    fitness: Option<f64>,
    generator: GeneGenerator<G>,
}

impl<G> VecChromosome<G>
where
    G: Clone + Default + PartialEq + Send + Sync + fmt::Debug + 'static,
{
    pub fn new(genes: Vec<G>, generator: GeneGenerator<G>) -> Self {
        Self {
            genes,
            fitness: None,
            generator,
        }
    }

    /// A chromosome of `length` genes drawn from `generator`.
    pub fn random(length: usize, generator: GeneGenerator<G>, rng: &mut dyn RngCore) -> Self {
        let genes = (0..length).map(|i| generator(i, &mut *rng)).collect();
        Self::new(genes, generator)
    }

    pub fn into_genes(self) -> Vec<G> {
        self.genes
    }

    fn touched(&mut self) {
        self.fitness = None;
    }
}

impl<G> Chromosome for VecChromosome<G>
where
    G: Clone + Default + PartialEq + Send + Sync + fmt::Debug + 'static,
{
    type Gene = G;

    fn len(&self) -> usize {
        self.genes.len()
    }

    fn genes(&self) -> &[G] {
        &self.genes
    }

    fn create_new(&self) -> Self {
        Self::new(Vec::new(), Arc::clone(&self.generator))
    }

    fn resize(&mut self, len: usize) {
        self.genes.resize(len, G::default());
        self.touched();
    }

    fn replace_genes(&mut self, start: usize, genes: &[G]) -> Result<(), ChromosomeError> {
        let len = self.genes.len();
        let end = start
            .checked_add(genes.len())
            .filter(|&end| end <= len)
            .ok_or(ChromosomeError::RangeOutOfBounds {
                start,
                end: start.saturating_add(genes.len()),
                len,
            })?;

        self.genes[start..end].clone_from_slice(genes);
        self.touched();
        Ok(())
    }

    fn replace_gene(&mut self, index: usize, gene: G) -> Result<(), ChromosomeError> {
        let len = self.genes.len();
        let slot = self
            .genes
            .get_mut(index)
            .ok_or(ChromosomeError::IndexOutOfBounds { index, len })?;
        *slot = gene;
        self.touched();
        Ok(())
    }

    fn generate_gene(&self, index: usize, rng: &mut dyn RngCore) -> G {
        (self.generator)(index, rng)
    }

    fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: Option<f64>) {
        self.fitness = fitness;
    }
}

impl<G: fmt::Debug> fmt::Debug for VecChromosome<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VecChromosome")
            .field("genes", &self.genes)
            .field("fitness", &self.fitness)
            .finish_non_exhaustive()
    }
}

impl<G: PartialEq> PartialEq for VecChromosome<G> {
    fn eq(&self, other: &Self) -> bool {
        self.genes == other.genes && self.fitness == other.fitness
    }
}

//! Mutation operators for variable-length chromosomes.
//!
//! Every operator fires with the given probability (`rng.random::<f32>() <
//! probability`). Block operators draw their block size uniformly from an
//! inclusive [`BlockSize`] range and do nothing when the chromosome is too
//! short for the drawn block.

use crate::base::Chromosome;
use crate::errors::ChromosomeError;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::{Rng, RngCore};
use std::fmt;

/// Mutates a chromosome in place.
pub trait Mutation<C: Chromosome>: fmt::Debug + Send + Sync {
    fn mutate(
        &self,
        chromosome: &mut C,
        probability: f32,
        rng: &mut dyn RngCore,
    ) -> Result<(), ChromosomeError>;
}

#[inline]
fn fires(probability: f32, rng: &mut dyn RngCore) -> bool {
    rng.random::<f32>() < probability
}

/// Inclusive block size range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSize {
    min: usize,
    max: usize,
}

impl BlockSize {
    /// Sizes are at least one and `max` is raised to `min` if needed.
    pub fn new(min: usize, max: usize) -> Self {
        let min = min.max(1);
        Self {
            min,
            max: max.max(min),
        }
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    fn sample(&self, rng: &mut dyn RngCore) -> usize {
        rng.random_range(self.min..=self.max)
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self::new(1, 5)
    }
}

/// Splice `block` into `genes` at `at`.
fn spliced<G: Clone>(genes: &[G], at: usize, block: &[G]) -> Vec<G> {
    let mut out = Vec::with_capacity(genes.len() + block.len());
    out.extend_from_slice(&genes[..at]);
    out.extend_from_slice(block);
    out.extend_from_slice(&genes[at..]);
    out
}

/// Replace one random gene with a freshly generated one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointMutationLarge;

impl<C: Chromosome> Mutation<C> for PointMutationLarge {
    fn mutate(
        &self,
        chromosome: &mut C,
        probability: f32,
        rng: &mut dyn RngCore,
    ) -> Result<(), ChromosomeError> {
        if chromosome.is_empty() || !fires(probability, rng) {
            return Ok(());
        }

        let index = rng.random_range(0..chromosome.len());
        let gene = chromosome.generate_gene(index, rng);
        chromosome.replace_gene(index, gene)
    }
}

/// Insert a block of fresh genes at a random position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertionMutation {
    pub size: BlockSize,
}

impl<C: Chromosome> Mutation<C> for InsertionMutation {
    fn mutate(
        &self,
        chromosome: &mut C,
        probability: f32,
        rng: &mut dyn RngCore,
    ) -> Result<(), ChromosomeError> {
        if !fires(probability, rng) {
            return Ok(());
        }

        let size = self.size.sample(rng);
        let at = rng.random_range(0..=chromosome.len());
        let block: Vec<C::Gene> = (0..size)
            .map(|i| chromosome.generate_gene(at + i, rng))
            .collect();

        let genes = spliced(chromosome.genes(), at, &block);
        chromosome.set_genes(&genes)
    }
}

/// Remove a random block. At least one gene always survives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionMutation {
    pub size: BlockSize,
}

impl<C: Chromosome> Mutation<C> for DeletionMutation {
    fn mutate(
        &self,
        chromosome: &mut C,
        probability: f32,
        rng: &mut dyn RngCore,
    ) -> Result<(), ChromosomeError> {
        if !fires(probability, rng) {
            return Ok(());
        }

        let size = self.size.sample(rng);
        let len = chromosome.len();
        if size >= len {
            return Ok(());
        }

        let start = rng.random_range(0..=len - size);
        let mut genes = chromosome.genes().to_vec();
        genes.drain(start..start + size);
        chromosome.set_genes(&genes)
    }
}

/// Copy a random block to a random position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicationMutation {
    pub size: BlockSize,
}

impl<C: Chromosome> Mutation<C> for ReplicationMutation {
    fn mutate(
        &self,
        chromosome: &mut C,
        probability: f32,
        rng: &mut dyn RngCore,
    ) -> Result<(), ChromosomeError> {
        if !fires(probability, rng) {
            return Ok(());
        }

        let size = self.size.sample(rng);
        let len = chromosome.len();
        if size > len {
            return Ok(());
        }

        let start = rng.random_range(0..=len - size);
        let at = rng.random_range(0..=len);
        let genes = chromosome.genes();
        let block = genes[start..start + size].to_vec();
        let genes = spliced(genes, at, &block);
        chromosome.set_genes(&genes)
    }
}

/// Tandem duplication: a random block is repeated right after itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlipMutation {
    pub size: BlockSize,
}

impl<C: Chromosome> Mutation<C> for SlipMutation {
    fn mutate(
        &self,
        chromosome: &mut C,
        probability: f32,
        rng: &mut dyn RngCore,
    ) -> Result<(), ChromosomeError> {
        if !fires(probability, rng) {
            return Ok(());
        }

        let size = self.size.sample(rng);
        let len = chromosome.len();
        if size > len {
            return Ok(());
        }

        let start = rng.random_range(0..=len - size);
        let genes = chromosome.genes();
        let block = genes[start..start + size].to_vec();
        let genes = spliced(genes, start + size, &block);
        chromosome.set_genes(&genes)
    }
}

/// Picks one mutation by relative weight and applies it with certainty.
///
/// With no positive weight the operator does nothing.
#[derive(Debug)]
pub struct MultipleMutations<C: Chromosome> {
    mutations: Vec<(Box<dyn Mutation<C>>, f32)>,
}

impl<C: Chromosome> Default for MultipleMutations<C> {
    fn default() -> Self {
        Self {
            mutations: Vec::new(),
        }
    }
}

impl<C: Chromosome> MultipleMutations<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mutation with the given relative weight.
    pub fn with(mut self, mutation: impl Mutation<C> + 'static, weight: f32) -> Self {
        self.mutations.push((Box::new(mutation), weight));
        self
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

impl<C: Chromosome> Mutation<C> for MultipleMutations<C> {
    fn mutate(
        &self,
        chromosome: &mut C,
        probability: f32,
        rng: &mut dyn RngCore,
    ) -> Result<(), ChromosomeError> {
        if !fires(probability, rng) {
            return Ok(());
        }

        let Ok(choice) = WeightedIndex::new(self.mutations.iter().map(|(_, w)| *w)) else {
            return Ok(());
        };
        let (mutation, _) = &self.mutations[choice.sample(rng)];
        mutation.mutate(chromosome, 1.0, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{alphabet_generator, VecChromosome};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    type Chr = VecChromosome<u8>;

    fn chr(genes: &[u8]) -> Chr {
        VecChromosome::new(genes.to_vec(), alphabet_generator(vec![b'x']))
    }

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(42)
    }

    fn is_subsequence(small: &[u8], big: &[u8]) -> bool {
        let mut it = big.iter();
        small.iter().all(|g| it.any(|h| h == g))
    }

    #[test]
    fn test_zero_probability_never_mutates() {
        let mut rng = rng();
        let mut c = chr(b"ABCDEFGH");

        for _ in 0..100 {
            PointMutationLarge.mutate(&mut c, 0.0, &mut rng).unwrap();
            InsertionMutation::default().mutate(&mut c, 0.0, &mut rng).unwrap();
            DeletionMutation::default().mutate(&mut c, 0.0, &mut rng).unwrap();
        }
        assert_eq!(c.genes(), b"ABCDEFGH");
    }

    #[test]
    fn test_point_mutation_keeps_length() {
        let mut rng = rng();
        let mut c = chr(b"ABCDEFGH");

        PointMutationLarge.mutate(&mut c, 1.0, &mut rng).unwrap();

        assert_eq!(c.len(), 8);
        assert_eq!(c.genes().iter().filter(|g| **g == b'x').count(), 1);
    }

    #[test]
    fn test_insertion_grows_by_block() {
        let mut rng = rng();
        let mut c = chr(b"ABCDEFGH");
        let op = InsertionMutation { size: BlockSize::new(3, 3) };

        op.mutate(&mut c, 1.0, &mut rng).unwrap();

        assert_eq!(c.len(), 11);
        assert!(c.genes().windows(3).any(|w| w == b"xxx"));
        assert!(is_subsequence(b"ABCDEFGH", c.genes()));
    }

    #[test]
    fn test_deletion_shrinks_and_preserves_order() {
        let mut rng = rng();
        let mut c = chr(b"ABCDEFGH");
        let op = DeletionMutation { size: BlockSize::new(2, 2) };

        op.mutate(&mut c, 1.0, &mut rng).unwrap();

        assert_eq!(c.len(), 6);
        assert!(is_subsequence(c.genes(), b"ABCDEFGH"));
    }

    #[test]
    fn test_deletion_never_empties_chromosome() {
        let mut rng = rng();
        let mut c = chr(b"AB");
        let op = DeletionMutation { size: BlockSize::new(2, 5) };

        for _ in 0..20 {
            op.mutate(&mut c, 1.0, &mut rng).unwrap();
        }
        assert_eq!(c.genes(), b"AB");
    }

    #[test]
    fn test_replication_copies_existing_block() {
        let mut rng = rng();
        let mut c = chr(b"ABCDEFGH");
        let op = ReplicationMutation { size: BlockSize::new(2, 2) };

        op.mutate(&mut c, 1.0, &mut rng).unwrap();

        assert_eq!(c.len(), 10);
        assert!(is_subsequence(b"ABCDEFGH", c.genes()));
        assert!(c.genes().iter().all(|g| b"ABCDEFGH".contains(g)));
    }

    #[test]
    fn test_slip_is_tandem_duplication() {
        let mut rng = rng();
        let mut c = chr(b"ABCDEFGH");
        let op = SlipMutation { size: BlockSize::new(3, 3) };

        op.mutate(&mut c, 1.0, &mut rng).unwrap();

        let genes = c.genes();
        assert_eq!(genes.len(), 11);
        let start = (0..=5)
            .find(|&s| genes[s..s + 3] == genes[s + 3..s + 6])
            .expect("duplicated block");
        let mut undone = genes.to_vec();
        undone.drain(start..start + 3);
        assert_eq!(undone, b"ABCDEFGH");
    }

    #[test]
    fn test_block_operators_skip_short_chromosomes() {
        let mut rng = rng();
        let mut c = chr(b"AB");

        ReplicationMutation { size: BlockSize::new(3, 5) }
            .mutate(&mut c, 1.0, &mut rng)
            .unwrap();
        SlipMutation { size: BlockSize::new(3, 5) }
            .mutate(&mut c, 1.0, &mut rng)
            .unwrap();
        PointMutationLarge.mutate(&mut chr(b""), 1.0, &mut rng).unwrap();

        assert_eq!(c.genes(), b"AB");
    }

    #[test]
    fn test_multiple_mutations_only_applies_weighted_choice() {
        let mut rng = rng();
        let op = MultipleMutations::<Chr>::new()
            .with(DeletionMutation { size: BlockSize::new(1, 1) }, 0.0)
            .with(InsertionMutation { size: BlockSize::new(1, 1) }, 1.0);

        let mut c = chr(b"ABCD");
        for _ in 0..10 {
            op.mutate(&mut c, 1.0, &mut rng).unwrap();
        }
        assert_eq!(c.len(), 14);
    }

    #[test]
    fn test_multiple_mutations_without_weights_is_noop() {
        let mut rng = rng();
        let op: MultipleMutations<Chr> = MultipleMutations::new();
        let mut c = chr(b"ABCD");

        op.mutate(&mut c, 1.0, &mut rng).unwrap();
        assert_eq!(c.genes(), b"ABCD");
    }

    #[test]
    fn test_block_size_normalises_bounds() {
        let size = BlockSize::new(0, 0);
        assert_eq!((size.min(), size.max()), (1, 1));

        let size = BlockSize::new(4, 2);
        assert_eq!((size.min(), size.max()), (4, 4));
    }
}

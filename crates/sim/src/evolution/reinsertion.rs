//! Reinsertion policies: how offspring and parents form the next generation.

use crate::base::{by_fitness_desc, Chromosome};
use std::fmt;

pub trait Reinsertion<C: Chromosome>: fmt::Debug + Send + Sync {
    fn select_chromosomes(
        &self,
        min_size: usize,
        max_size: usize,
        offspring: Vec<C>,
        parents: &[C],
    ) -> Vec<C>;
}

/// Offspring first; the fittest parents fill any shortfall up to `min_size`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElitistReinsertion;

impl<C: Chromosome> Reinsertion<C> for ElitistReinsertion {
    fn select_chromosomes(
        &self,
        min_size: usize,
        _max_size: usize,
        mut offspring: Vec<C>,
        parents: &[C],
    ) -> Vec<C> {
        let missing = min_size.saturating_sub(offspring.len());
        if missing > 0 {
            let mut ranked: Vec<&C> = parents.iter().collect();
            ranked.sort_by(|a, b| by_fitness_desc(*a, *b));
            offspring.extend(ranked.into_iter().take(missing).cloned());
        }
        offspring
    }
}

/// Offspring capped at `max_size`. When fewer than `min_size` offspring
/// exist, parents are carried over in selection order to reach it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PureReinsertion;

impl<C: Chromosome> Reinsertion<C> for PureReinsertion {
    fn select_chromosomes(
        &self,
        min_size: usize,
        max_size: usize,
        mut offspring: Vec<C>,
        parents: &[C],
    ) -> Vec<C> {
        let missing = min_size.saturating_sub(offspring.len());
        offspring.extend(parents.iter().take(missing).cloned());
        offspring.truncate(max_size);
        offspring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{alphabet_generator, VecChromosome};

    fn chr(id: u8, fitness: Option<f64>) -> VecChromosome<u8> {
        let mut c = VecChromosome::new(vec![id], alphabet_generator(vec![0]));
        c.set_fitness(fitness);
        c
    }

    fn ids(chromosomes: &[VecChromosome<u8>]) -> Vec<u8> {
        chromosomes.iter().map(|c| c.genes()[0]).collect()
    }

    #[test]
    fn test_elitist_fills_with_best_parents() {
        let parents = vec![chr(1, Some(1.0)), chr(2, Some(7.0)), chr(3, Some(4.0))];
        let offspring = vec![chr(10, None)];

        let next = ElitistReinsertion.select_chromosomes(3, 10, offspring, &parents);
        assert_eq!(ids(&next), vec![10, 2, 3]);
    }

    #[test]
    fn test_elitist_keeps_all_offspring_when_enough() {
        let parents = vec![chr(1, Some(9.0))];
        let offspring = vec![chr(10, None), chr(11, None), chr(12, None)];

        let next = ElitistReinsertion.select_chromosomes(2, 2, offspring, &parents);
        assert_eq!(ids(&next), vec![10, 11, 12]);
    }

    #[test]
    fn test_pure_reinsertion_caps_offspring() {
        let offspring = vec![chr(10, None), chr(11, None), chr(12, None)];

        let next = PureReinsertion.select_chromosomes(1, 2, offspring, &[]);
        assert_eq!(ids(&next), vec![10, 11]);
    }

    #[test]
    fn test_pure_reinsertion_survives_empty_offspring() {
        let parents = vec![chr(1, Some(1.0)), chr(2, Some(7.0)), chr(3, Some(4.0))];

        let next = PureReinsertion.select_chromosomes(2, 4, Vec::new(), &parents);
        assert_eq!(ids(&next), vec![1, 2]);

        let next = PureReinsertion.select_chromosomes(3, 4, vec![chr(10, None)], &parents);
        assert_eq!(ids(&next), vec![10, 1, 2]);
    }
}

//! A species: one population and the operators that evolve it.

use crate::base::Chromosome;
use crate::errors::{ChromosomeError, SpeciesError};
use crate::evolution::{
    Crossover, ElitistReinsertion, Mutation, PointMutationLarge, Reinsertion, Selection,
    SvlcCrossover, TournamentSelection,
};
use crate::simulation::Population;
use rand::{Rng, RngCore};
use tracing::trace;

/// Default probability that a parent group is crossed.
pub const DEFAULT_CROSSOVER_PROBABILITY: f32 = 0.75;
/// Default probability that an offspring is mutated.
pub const DEFAULT_MUTATION_PROBABILITY: f32 = 0.1;

/// One co-evolving sub-population with its own operator set.
///
/// Defaults: tournament selection of two, SVLC crossover, large point
/// mutation and elitist reinsertion.
///
/// The default SVLC crossover is uncapped: a parent pair sharing `k`
/// segments yields `2^(k+1) - 2` children, so long chromosomes over a small
/// alphabet can stall a generation. Set a cap with
/// `with_crossover(SvlcCrossover::default().with_max_segments(n))` or
/// [`SpeciesConfig::max_segments`](crate::simulation::SpeciesConfig).
#[derive(Debug)]
pub struct Species<C: Chromosome> {
    name: String,
    population: Population<C>,
    selection: Box<dyn Selection<C>>,
    crossover: Box<dyn Crossover<C>>,
    mutation: Box<dyn Mutation<C>>,
    reinsertion: Box<dyn Reinsertion<C>>,
    crossover_probability: f32,
    mutation_probability: f32,
}

impl<C: Chromosome> Species<C> {
    pub fn new(name: impl Into<String>, population: Population<C>) -> Self {
        Self {
            name: name.into(),
            population,
            selection: Box::new(TournamentSelection::default()),
            crossover: Box::new(SvlcCrossover::default()),
            mutation: Box::new(PointMutationLarge),
            reinsertion: Box::new(ElitistReinsertion),
            crossover_probability: DEFAULT_CROSSOVER_PROBABILITY,
            mutation_probability: DEFAULT_MUTATION_PROBABILITY,
        }
    }

    pub fn with_selection(mut self, selection: impl Selection<C> + 'static) -> Self {
        self.selection = Box::new(selection);
        self
    }

    pub fn with_crossover(mut self, crossover: impl Crossover<C> + 'static) -> Self {
        self.crossover = Box::new(crossover);
        self
    }

    pub fn with_mutation(mut self, mutation: impl Mutation<C> + 'static) -> Self {
        self.mutation = Box::new(mutation);
        self
    }

    pub fn with_reinsertion(mut self, reinsertion: impl Reinsertion<C> + 'static) -> Self {
        self.reinsertion = Box::new(reinsertion);
        self
    }

    pub fn with_crossover_probability(mut self, probability: f32) -> Self {
        self.crossover_probability = probability;
        self
    }

    pub fn with_mutation_probability(mut self, probability: f32) -> Self {
        self.mutation_probability = probability;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn population(&self) -> &Population<C> {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut Population<C> {
        &mut self.population
    }

    pub fn crossover_probability(&self) -> f32 {
        self.crossover_probability
    }

    pub fn mutation_probability(&self) -> f32 {
        self.mutation_probability
    }

    pub fn best_chromosome(&self) -> Option<&C> {
        self.population.best_chromosome()
    }

    /// Chromosomes of the current generation, empty before the first one.
    pub fn chromosomes(&self) -> &[C] {
        self.population
            .current_generation()
            .map(|g| g.chromosomes())
            .unwrap_or(&[])
    }

    pub fn create_initial_generation(&mut self, rng: &mut dyn RngCore) -> Result<(), ChromosomeError> {
        self.population.create_initial_generation(rng)
    }

    /// Random candidates for a fresh initial generation, not installed.
    pub fn initial_chromosomes(&self, rng: &mut dyn RngCore) -> Result<Vec<C>, ChromosomeError> {
        self.population.random_chromosomes(rng)
    }

    /// Compute the next generation from the current one: select, cross,
    /// mutate, reinsert. The population is left unchanged.
    pub fn breed(&self, rng: &mut dyn RngCore) -> Result<Vec<C>, SpeciesError> {
        let generation = self
            .population
            .current_generation()
            .ok_or_else(|| SpeciesError::NoGeneration(self.name.clone()))?;

        let parents = self
            .selection
            .select(self.population.min_size(), generation.chromosomes(), rng);

        let mut offspring = self.cross(&parents, rng)?;
        for child in &mut offspring {
            self.mutation.mutate(child, self.mutation_probability, rng)?;
        }

        trace!(
            species = %self.name,
            parents = parents.len(),
            offspring = offspring.len(),
            "Generated children"
        );

        Ok(self.reinsertion.select_chromosomes(
            self.population.min_size(),
            self.population.max_size(),
            offspring,
            &parents,
        ))
    }

    /// Breed and install the result as the new current generation.
    pub fn generate_children(&mut self, rng: &mut dyn RngCore) -> Result<(), SpeciesError> {
        let next = self.breed(rng)?;
        self.population.create_new_generation(next);
        Ok(())
    }

    /// Cross consecutive parent groups; incomplete trailing groups are skipped.
    fn cross(&self, parents: &[C], rng: &mut dyn RngCore) -> Result<Vec<C>, SpeciesError> {
        let group = self.crossover.parents_number().max(1);
        let mut offspring = Vec::new();

        for selected in parents.chunks(group) {
            if selected.len() == group && rng.random::<f32>() < self.crossover_probability {
                offspring.extend(self.crossover.cross(selected, rng)?);
            }
        }

        Ok(offspring)
    }

    /// Stable sort of the current generation by descending fitness.
    pub fn order_chromosomes(&mut self) {
        if let Some(generation) = self.population.current_generation_mut() {
            generation.order();
        }
    }

    /// Install an evaluated generation and close it. `fresh` restarts the
    /// population's history.
    pub fn commit_generation(&mut self, chromosomes: Vec<C>, fresh: bool) {
        if fresh {
            self.population.restart(chromosomes);
        } else {
            self.population.create_new_generation(chromosomes);
        }
        self.population.end_current_generation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{alphabet_generator, VecChromosome};
    use crate::errors::CrossoverError;
    use crate::evolution::EliteSelection;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    type Chr = VecChromosome<u8>;

    fn species(min: usize, max: usize) -> Species<Chr> {
        let adam = VecChromosome::new(vec![0; 12], alphabet_generator(vec![1, 2]));
        Species::new("test", Population::new(min, max, adam).unwrap())
    }

    /// Clones both parents, marking children with gene 0 at position 0.
    #[derive(Debug)]
    struct CloneCrossover;

    impl Crossover<Chr> for CloneCrossover {
        fn parents_number(&self) -> usize {
            2
        }

        fn cross(&self, parents: &[Chr], _rng: &mut dyn RngCore) -> Result<Vec<Chr>, CrossoverError> {
            parents
                .iter()
                .map(|p| -> Result<Chr, CrossoverError> {
                    let mut child = p.clone();
                    child.replace_gene(0, 0)?;
                    Ok(child)
                })
                .collect()
        }
    }

    #[test]
    fn test_generate_children_requires_generation() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut s = species(2, 4);

        let err = s.generate_children(&mut rng).unwrap_err();
        assert!(matches!(err, SpeciesError::NoGeneration(name) if name == "test"));
    }

    #[test]
    fn test_generate_children_crosses_every_pair() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut s = species(4, 10)
            .with_selection(EliteSelection)
            .with_crossover(CloneCrossover)
            .with_crossover_probability(1.0)
            .with_mutation_probability(0.0);

        s.create_initial_generation(&mut rng).unwrap();
        s.generate_children(&mut rng).unwrap();

        let generation = s.population().current_generation().unwrap();
        assert_eq!(generation.number(), 2);
        assert_eq!(generation.len(), 4);
        assert!(generation.chromosomes().iter().all(|c| c.genes()[0] == 0));
    }

    #[test]
    fn test_no_crossover_falls_back_to_parents() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut s = species(3, 10)
            .with_crossover(CloneCrossover)
            .with_crossover_probability(0.0)
            .with_mutation_probability(0.0);

        s.create_initial_generation(&mut rng).unwrap();
        s.generate_children(&mut rng).unwrap();

        let generation = s.population().current_generation().unwrap();
        assert_eq!(generation.len(), 3);
        assert!(generation.chromosomes().iter().all(|c| c.genes()[0] != 0));
    }

    #[test]
    fn test_breed_leaves_population_untouched() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let mut s = species(4, 10)
            .with_selection(EliteSelection)
            .with_crossover(CloneCrossover)
            .with_crossover_probability(1.0)
            .with_mutation_probability(0.0);
        s.create_initial_generation(&mut rng).unwrap();
        let before = s.chromosomes().to_vec();

        let next = s.breed(&mut rng).unwrap();

        assert_eq!(next.len(), 4);
        assert!(next.iter().all(|c| c.genes()[0] == 0));
        assert_eq!(s.chromosomes(), &before[..]);
        assert_eq!(s.population().generations_number(), 1);
    }

    #[test]
    fn test_commit_generation_orders_caps_and_sets_best() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
        let mut s = species(2, 3);
        s.create_initial_generation(&mut rng).unwrap();

        let mut next = s.initial_chromosomes(&mut rng).unwrap();
        next.extend(s.initial_chromosomes(&mut rng).unwrap());
        for (chr, value) in next.iter_mut().zip([1.0, 4.0, 2.0, 3.0]) {
            chr.set_fitness(Some(value));
        }

        s.commit_generation(next.clone(), false);
        assert_eq!(s.population().generations_number(), 2);
        let order: Vec<Option<f64>> = s.chromosomes().iter().map(|c| c.fitness()).collect();
        assert_eq!(order, vec![Some(4.0), Some(3.0), Some(2.0)]);
        assert_eq!(s.best_chromosome().unwrap().fitness(), Some(4.0));

        s.commit_generation(next, true);
        assert_eq!(s.population().generations_number(), 1);
    }

    #[test]
    fn test_order_chromosomes_is_descending_with_unset_last() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut s = species(4, 4);
        s.create_initial_generation(&mut rng).unwrap();

        let generation = s.population_mut().current_generation_mut().unwrap();
        let values = [Some(1.0), None, Some(3.0), Some(2.0)];
        for (chr, value) in generation.chromosomes_mut().iter_mut().zip(values) {
            chr.set_fitness(value);
        }

        s.order_chromosomes();
        let order: Vec<Option<f64>> = s.chromosomes().iter().map(|c| c.fitness()).collect();
        assert_eq!(order, vec![Some(3.0), Some(2.0), Some(1.0), None]);
    }
}

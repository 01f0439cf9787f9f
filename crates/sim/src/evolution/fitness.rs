//! Fitness functions.
//!
//! A [`CoevolutionFitness`] scores a *partner list*: one chromosome per
//! species, in species order. Plain closures implement both traits.

use crate::base::Chromosome;
use crate::errors::FitnessError;

/// Scores a single chromosome.
pub trait Fitness<C: Chromosome>: Send + Sync {
    fn evaluate(&self, chromosome: &C) -> Result<f64, FitnessError>;
}

impl<C, F> Fitness<C> for F
where
    C: Chromosome,
    F: Fn(&C) -> Result<f64, FitnessError> + Send + Sync,
{
    fn evaluate(&self, chromosome: &C) -> Result<f64, FitnessError> {
        self(chromosome)
    }
}

/// Scores a cooperating set of chromosomes, one per species.
pub trait CoevolutionFitness<C: Chromosome>: Send + Sync {
    fn evaluate(&self, partners: &[&C]) -> Result<f64, FitnessError>;
}

impl<C, F> CoevolutionFitness<C> for F
where
    C: Chromosome,
    F: Fn(&[&C]) -> Result<f64, FitnessError> + Send + Sync,
{
    fn evaluate(&self, partners: &[&C]) -> Result<f64, FitnessError> {
        self(partners)
    }
}

/// Joint fitness as the sum of one per-species fitness.
///
/// Component `i` scores the partner in slot `i`.
pub struct SumFitness<C: Chromosome> {
    components: Vec<Box<dyn Fitness<C>>>,
}

impl<C: Chromosome> SumFitness<C> {
    pub fn new(components: Vec<Box<dyn Fitness<C>>>) -> Self {
        Self { components }
    }

    pub fn with(mut self, component: impl Fitness<C> + 'static) -> Self {
        self.components.push(Box::new(component));
        self
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl<C: Chromosome> Default for SumFitness<C> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<C: Chromosome> CoevolutionFitness<C> for SumFitness<C> {
    fn evaluate(&self, partners: &[&C]) -> Result<f64, FitnessError> {
        if partners.len() != self.components.len() {
            return Err(FitnessError::PartnerCount {
                expected: self.components.len(),
                actual: partners.len(),
            });
        }

        self.components
            .iter()
            .zip(partners)
            .map(|(component, partner)| component.evaluate(partner))
            .sum()
    }
}

/// Score of one individual given its partners and the best set.
///
/// When `best_set` is present the result is the better of the two
/// evaluations, otherwise the partner evaluation alone.
pub fn cooperative_score<C: Chromosome>(
    fitness: &dyn CoevolutionFitness<C>,
    partners: &[&C],
    best_set: Option<&[C]>,
) -> Result<f64, FitnessError> {
    let partner_score = fitness.evaluate(partners)?;

    match best_set {
        Some(best) => {
            let best: Vec<&C> = best.iter().collect();
            Ok(partner_score.max(fitness.evaluate(&best)?))
        }
        None => Ok(partner_score),
    }
}

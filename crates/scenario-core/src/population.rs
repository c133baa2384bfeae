//! Population evolution: generation of the initial population, fitness
//! bookkeeping, elite retention and one mutate-derive-discard cycle at a
//! time.

use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::error::PopulationError;
use crate::generator::generate;
use crate::individual::{IdCounters, Individual, Stage};
use crate::mutation::mutate;

/// Children appended per cycle.
const CHILDREN_PER_CYCLE: usize = 2;

/// Scores one derived individual; lower is better.
pub trait Evaluator {
    fn evaluate(&mut self, individual: &Individual) -> f64;
}

#[derive(Clone, Debug)]
pub struct CycleTimings {
    pub ranking_us: u64,
    pub mutation_us: u64,
    pub derivation_us: u64,
    pub total_us: u64,
}

pub struct Population {
    config: GeneratorConfig,
    rng: ChaCha12Rng,
    counters: IdCounters,
    individuals: Vec<Individual>,
    discarded: Vec<Individual>,
    generation: usize,
}

impl Population {
    /// Validate `config` and fill the population with freshly generated,
    /// derived individuals.
    pub fn new(config: GeneratorConfig) -> Result<Self, PopulationError> {
        config.validate()?;
        let mut rng = ChaCha12Rng::seed_from_u64(config.seed);
        let mut counters = IdCounters::default();
        let individuals: Vec<Individual> = (0..config.population_size)
            .map(|_| {
                let mut individual = generate(&mut rng, &config, &mut counters);
                individual.derive(&config);
                individual
            })
            .collect();
        info!(
            size = individuals.len(),
            elites = config.number_elites,
            seed = config.seed,
            "population created"
        );
        Ok(Self {
            config,
            rng,
            counters,
            individuals,
            discarded: Vec::new(),
            generation: 0,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn get(&self, index: usize) -> Option<&Individual> {
        self.individuals.get(index)
    }

    /// Individuals dropped by the last cycle.
    pub fn discarded(&self) -> &[Individual] {
        &self.discarded
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Indices still waiting for a fitness value.
    pub fn pending(&self) -> Vec<usize> {
        self.individuals
            .iter()
            .enumerate()
            .filter(|(_, ind)| !ind.is_evaluated())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn record_fitness(&mut self, index: usize, fitness: f64) -> Result<(), PopulationError> {
        let len = self.individuals.len();
        let individual = self
            .individuals
            .get_mut(index)
            .ok_or(PopulationError::UnknownIndividual { index, len })?;
        if !fitness.is_finite() {
            return Err(PopulationError::InvalidFitness { index });
        }
        individual.fitness = fitness;
        individual.stage = Stage::Evaluated;
        Ok(())
    }

    /// Score every pending individual with `evaluator`.
    pub fn evaluate_with(&mut self, evaluator: &mut impl Evaluator) -> Result<(), PopulationError> {
        for index in self.pending() {
            let fitness = evaluator.evaluate(&self.individuals[index]);
            self.record_fitness(index, fitness)?;
        }
        Ok(())
    }

    pub fn elites(&self) -> Vec<&Individual> {
        self.individuals
            .iter()
            .filter(|ind| ind.stage == Stage::Elite)
            .collect()
    }

    /// Lowest fitness among evaluated individuals.
    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .filter(|ind| ind.is_evaluated())
            .min_by(|a, b| a.fitness.total_cmp(&b.fitness))
    }

    /// One evolution cycle. Every individual must carry a fitness value.
    pub fn evolve(&mut self) -> Result<CycleTimings, PopulationError> {
        if let Some(index) = self.individuals.iter().position(|ind| !ind.is_evaluated()) {
            return Err(PopulationError::NotEvaluated { index });
        }
        let total_start = Instant::now();

        // 1. Rank and mark elites
        let t0 = Instant::now();
        self.individuals
            .sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
        for (rank, individual) in self.individuals.iter_mut().enumerate() {
            individual.stage = if rank < self.config.number_elites {
                Stage::Elite
            } else {
                Stage::Evaluated
            };
        }
        let ranking_us = t0.elapsed().as_micros() as u64;

        // 2. Mutated children of random parents
        let t1 = Instant::now();
        for _ in 0..CHILDREN_PER_CYCLE {
            let parent = self.rng.random_range(0..self.individuals.len());
            let mut child = self.individuals[parent].clone();
            child.fitness = 0.0;
            child.stage = Stage::Generated;
            let report = mutate(&mut child, &mut self.rng, &self.config, &mut self.counters);
            debug!(parent, ?report, "child created");
            self.individuals.push(child);
        }
        let mutation_us = t1.elapsed().as_micros() as u64;

        // 3. Re-derive everything
        let t2 = Instant::now();
        for individual in &mut self.individuals {
            individual.derive(&self.config);
        }
        let derivation_us = t2.elapsed().as_micros() as u64;

        self.discarded.clear();
        while self.individuals.len() > self.config.population_size {
            let Some(victim) = self.next_victim() else {
                break;
            };
            let mut gone = self.individuals.remove(victim);
            gone.stage = Stage::Discarded;
            self.discarded.push(gone);
        }
        self.generation += 1;

        let timings = CycleTimings {
            ranking_us,
            mutation_us,
            derivation_us,
            total_us: total_start.elapsed().as_micros() as u64,
        };
        info!(
            generation = self.generation,
            best = ?self.best().map(|b| b.fitness),
            discarded = self.discarded.len(),
            total_us = timings.total_us,
            "evolution cycle complete"
        );
        Ok(timings)
    }

    /// Worst evaluated non-elite, or else the newest non-elite. Scores from
    /// the last evaluation are known for everyone but the fresh children, so
    /// the weakest scored member goes before an unscored child.
    fn next_victim(&self) -> Option<usize> {
        let candidates = self
            .individuals
            .iter()
            .enumerate()
            .filter(|(_, ind)| ind.stage != Stage::Elite);
        candidates
            .clone()
            .filter(|(_, ind)| ind.is_evaluated())
            .max_by(|(_, a), (_, b)| a.fitness.total_cmp(&b.fitness))
            .or_else(|| candidates.last())
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64);

    impl Evaluator for Constant {
        fn evaluate(&mut self, _individual: &Individual) -> f64 {
            self.0
        }
    }

    fn population(seed: u64) -> Population {
        Population::new(GeneratorConfig {
            seed,
            ..GeneratorConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn new_population_is_full_and_derived() {
        let pop = population(1);
        assert_eq!(pop.individuals().len(), 4);
        assert!(pop
            .individuals()
            .iter()
            .all(|ind| ind.stage == Stage::Derived && ind.scenario.is_some()));
        assert_eq!(pop.pending(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let result = Population::new(GeneratorConfig {
            number_elites: 9,
            ..GeneratorConfig::default()
        });
        assert!(matches!(result, Err(PopulationError::Config(_))));
    }

    #[test]
    fn evolve_requires_every_fitness() {
        let mut pop = population(2);
        pop.record_fitness(0, 1.0).unwrap();
        assert_eq!(pop.evolve().err(), Some(PopulationError::NotEvaluated { index: 1 }));
    }

    #[test]
    fn fitness_must_be_finite_and_indexed() {
        let mut pop = population(3);
        assert_eq!(
            pop.record_fitness(0, f64::NAN),
            Err(PopulationError::InvalidFitness { index: 0 })
        );
        assert_eq!(
            pop.record_fitness(10, 1.0),
            Err(PopulationError::UnknownIndividual { index: 10, len: 4 })
        );
    }

    #[test]
    fn cycle_keeps_size_and_returns_timings() {
        let mut pop = population(4);
        pop.evaluate_with(&mut Constant(5.0)).unwrap();
        let timings = pop.evolve().unwrap();
        assert!(timings.total_us >= timings.derivation_us);
        assert_eq!(pop.individuals().len(), 4);
        assert_eq!(pop.discarded().len(), 2);
        assert!(pop.discarded().iter().all(|ind| ind.stage == Stage::Discarded));
        assert_eq!(pop.generation(), 1);
        assert_eq!(pop.pending().len(), 2);
    }

    #[test]
    fn worst_scored_members_go_before_fresh_children() {
        let mut pop = population(5);
        for (index, fitness) in [3.0, 1.0, 4.0, 2.0].into_iter().enumerate() {
            pop.record_fitness(index, fitness).unwrap();
        }
        pop.evolve().unwrap();
        let gone: Vec<f64> = pop.discarded().iter().map(|ind| ind.fitness).collect();
        assert_eq!(gone, vec![4.0, 3.0]);
        let children = pop
            .individuals()
            .iter()
            .filter(|ind| ind.stage == Stage::Derived)
            .count();
        assert_eq!(children, 2);
    }
}

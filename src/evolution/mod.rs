pub mod bisection;
pub mod fitness;
pub mod individual;
pub mod operators;
pub mod tracker;

pub use fitness::FitnessFunction;
pub use individual::{FitnessState, Individual};
pub use operators::{CrossoverOperator, ReproductionEngine};
pub use tracker::{FailureReport, GenerationSummary, GenerationTracker, SuccessReport, Verdict};

use crate::config::{Config, GaConfig};
use crate::report::{FinalReport, Reporter};
use log::{debug, info};
use operators::tournament_winner;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use thiserror::Error;

/// Alias within crate for genome representation, one `u8` (0 or 1) per bit
pub type Genome = Vec<u8>;

/// Errors that abort a run. Running out of generations or stagnating are outcomes, not errors.
#[derive(Error, Debug, PartialEq)]
pub enum EvolutionError {
    #[error("Genome length mismatch: expected {expected}, found {found}")]
    GenomeLengthMismatch { expected: usize, found: usize },
    #[error("Cannot recombine empty genomes")]
    EmptyGenome,
    #[error("Tournament size must be at least 1, got {0}")]
    InvalidTournamentSize(usize),
    #[error("Probability '{name}' must be in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("Population must hold at least 2 individuals, got {0}")]
    PopulationTooSmall(usize),
    #[error("{members} individuals but {scores} fitness scores")]
    ScoreCountMismatch { members: usize, scores: usize },
    #[error("Genome length {genome_length} cannot be scored by the {fitness_function:?} fitness function")]
    IncompatibleGenomeLength {
        genome_length: usize,
        fitness_function: FitnessFunction,
    },
    #[error("No population size up to {limit} reached the target within the generation limit")]
    BisectionExhausted { limit: usize },
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The best individual reached the target fitness
    Success(SuccessReport),
    /// The stagnation rule ran out of tolerated failures
    Stagnated(FailureReport),
    /// The generation cap was hit first, carries the last generation's summary
    GenerationLimit(GenerationSummary),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }
}

/// Drives one run of the genetic algorithm: it owns the population and the random source and
/// replaces the whole population every generation.
pub struct EvolutionEngine<'a> {
    /// This is a reference to the user-defined config for a given run
    config: &'a GaConfig,
    reproduction: ReproductionEngine,
    /// The current generation, fully replaced by `next_generation`
    population: Vec<Individual>,
    rng: Pcg32,
    /// 1-based number of the current generation, 0 before initialization
    generation: usize,
}

impl<'a> EvolutionEngine<'a> {
    /// Creates a new EvolutionEngine instance
    ///
    /// # Arguments
    /// * `config` - Reference to a `GaConfig` struct containing all the parameters of the run.
    ///
    /// # Errors
    /// Refuses to build an engine that could only produce a corrupted population: fewer than two
    /// individuals, a genome length the fitness function cannot score, a zero tournament size or
    /// probabilities outside `[0, 1]`.
    pub fn new(config: &'a GaConfig) -> Result<Self, EvolutionError> {
        if config.population_size < 2 {
            return Err(EvolutionError::PopulationTooSmall(config.population_size));
        }
        if !config.fitness_function.supports_length(config.genome_length) {
            return Err(EvolutionError::IncompatibleGenomeLength {
                genome_length: config.genome_length,
                fitness_function: config.fitness_function,
            });
        }
        Ok(Self {
            config,
            reproduction: ReproductionEngine::new(config)?,
            population: Vec::with_capacity(config.population_size),
            rng: Pcg32::seed_from_u64(config.seed),
            generation: 0,
        })
    }

    /// Fitness a run has to reach to succeed
    pub fn target_fitness(&self) -> u32 {
        self.config
            .fitness_function
            .max_fitness(self.config.genome_length)
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Reseeds the random source and fills the population with random individuals.
    /// The new population is generation 1.
    pub fn initialize_population(&mut self) {
        self.rng = Pcg32::seed_from_u64(self.config.seed);
        let GaConfig {
            population_size,
            genome_length,
            fitness_function,
            ..
        } = *self.config;
        self.population = (0..population_size)
            .map(|_| Individual::random(genome_length, fitness_function, &mut self.rng))
            .collect();
        self.generation = 1;
        if log::log_enabled!(log::Level::Debug) {
            debug!("Initial Population");
            for individual in &self.population {
                debug!("{}", individual.genome_string());
            }
        }
    }

    /// Evaluates every individual that has no cached fitness.
    ///
    /// # Returns
    /// * `Vec<u32>` - Fitness of each individual, in population order
    pub fn evaluate_population(&mut self) -> Vec<u32> {
        self.population.iter_mut().map(Individual::fitness).collect()
    }

    /// Evaluates and summarizes the current generation.
    pub fn summarize(&mut self) -> Result<GenerationSummary, EvolutionError> {
        let scores = self.evaluate_population();
        GenerationSummary::from_scores(self.generation, &self.population, &scores)
            .ok_or(EvolutionError::PopulationTooSmall(self.population.len()))
    }

    /// Replaces the population with the next generation.
    ///
    /// `population_size / 2` parent pairs are bred, the first `population_size - 1` children
    /// are kept and the best individual of the current generation is appended unchanged.
    pub fn next_generation(&mut self) -> Result<(), EvolutionError> {
        let scores = self.evaluate_population();
        let elite = tournament_winner(&scores, 0..scores.len())
            .ok_or(EvolutionError::PopulationTooSmall(0))?;

        let population_size = self.config.population_size;
        let mut next_generation = Vec::with_capacity(population_size);
        for _ in 0..population_size / 2 {
            let children = self
                .reproduction
                .breed(&self.population, &scores, &mut self.rng)?;
            // Add the children to the next generation, up to capacity.
            let remaining_slots = (population_size - 1).saturating_sub(next_generation.len());
            next_generation.extend(children.into_iter().take(remaining_slots));
        }

        // Preserve the best for the next generation (exploitation)
        next_generation.push(self.population[elite].clone());
        self.population = next_generation;
        self.generation += 1;
        Ok(())
    }

    /// Runs generations until the tracker calls the run over or `max_generations` is reached.
    ///
    /// # Arguments
    /// * `tracker` - Decides success and stagnation from the generation summaries
    /// * `reporter` - Receives every generation summary
    /// * `max_generations` - Optional cap on the number of generations, the initial one included
    pub fn run(
        &mut self,
        tracker: &mut GenerationTracker,
        reporter: &mut dyn Reporter,
        max_generations: Option<usize>,
    ) -> Result<RunOutcome, EvolutionError> {
        info!(
            "Initializing population of size {}...",
            self.config.population_size
        );
        self.initialize_population();

        loop {
            let summary = self.summarize()?;
            reporter.generation(&summary, &self.population);

            match tracker.record(summary.clone()) {
                Verdict::Success(report) => return Ok(RunOutcome::Success(report)),
                Verdict::Stagnated(report) => return Ok(RunOutcome::Stagnated(report)),
                Verdict::FailureCharged { remaining } => {
                    reporter.failure_charged(summary.generation, remaining)
                }
                Verdict::Continue => {}
            }

            if max_generations.is_some_and(|max| self.generation >= max) {
                return Ok(RunOutcome::GenerationLimit(summary));
            }
            self.next_generation()?;
        }
    }
}

/// Runs the algorithm once with the stagnation rule and generation cap of `config.termination`
/// and hands the final report to `reporter`.
pub fn run_standard(
    config: &Config,
    reporter: &mut dyn Reporter,
) -> Result<RunOutcome, EvolutionError> {
    let mut engine = EvolutionEngine::new(&config.ga)?;
    let mut tracker = GenerationTracker::standard(engine.target_fitness(), &config.termination);
    let outcome = engine.run(
        &mut tracker,
        reporter,
        config.termination.max_generations,
    )?;
    info!("Run finished after {} generations", engine.generation());
    reporter.finished(&FinalReport::from(outcome.clone()));
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerminationConfig;
    use crate::report::SilentReporter;

    fn get_test_config() -> GaConfig {
        GaConfig {
            seed: 17,
            population_size: 10,
            genome_length: 16,
            crossover_rate: 0.8,
            mutation_rate: 1.0,
            tournament_size: 3,
            crossover_operator: CrossoverOperator::OnePoint,
            fitness_function: FitnessFunction::Simple,
        }
    }

    /// Records what the engine reports
    #[derive(Default)]
    struct RecordingReporter {
        summaries: Vec<GenerationSummary>,
        failures: Vec<u32>,
        finished: Vec<FinalReport>,
    }

    impl Reporter for RecordingReporter {
        fn generation(&mut self, summary: &GenerationSummary, _population: &[Individual]) {
            self.summaries.push(summary.clone());
        }

        fn failure_charged(&mut self, _generation: usize, remaining: u32) {
            self.failures.push(remaining);
        }

        fn finished(&mut self, report: &FinalReport) {
            self.finished.push(report.clone());
        }
    }

    #[test]
    fn test_initialize_population() {
        let config = get_test_config();
        let mut engine = EvolutionEngine::new(&config).unwrap();
        engine.initialize_population();

        assert_eq!(engine.population().len(), config.population_size);
        assert_eq!(engine.generation(), 1);
        for individual in engine.population() {
            assert_eq!(individual.len(), config.genome_length);
            assert_eq!(individual.fitness_state(), FitnessState::Unevaluated);
        }
    }

    #[test]
    fn test_engine_rejects_incompatible_genome_length() {
        let config = GaConfig {
            fitness_function: FitnessFunction::Block,
            genome_length: 10,
            ..get_test_config()
        };
        assert!(matches!(
            EvolutionEngine::new(&config),
            Err(EvolutionError::IncompatibleGenomeLength {
                genome_length: 10,
                ..
            })
        ));
    }

    #[test]
    fn test_engine_rejects_tiny_population() {
        let config = GaConfig {
            population_size: 1,
            ..get_test_config()
        };
        assert!(matches!(
            EvolutionEngine::new(&config),
            Err(EvolutionError::PopulationTooSmall(1))
        ));
    }

    #[test]
    fn test_population_size_maintained_through_generations() {
        for population_size in [2, 3, 10, 11] {
            let config = GaConfig {
                population_size,
                tournament_size: 2,
                ..get_test_config()
            };
            let mut engine = EvolutionEngine::new(&config).unwrap();
            engine.initialize_population();
            for _ in 0..5 {
                engine.next_generation().unwrap();
                assert_eq!(engine.population().len(), population_size);
            }
            assert_eq!(engine.generation(), 6);
        }
    }

    #[test]
    fn test_elitism_preservation() {
        let config = get_test_config();
        let mut engine = EvolutionEngine::new(&config).unwrap();
        engine.initialize_population();

        for _ in 0..10 {
            let before = engine.summarize().unwrap();
            engine.next_generation().unwrap();
            let elite = engine.population().last().unwrap();
            assert_eq!(elite.genome(), before.best.genome.as_slice());
            assert_eq!(elite.cached_fitness(), Some(before.best.fitness));

            let after = engine.summarize().unwrap();
            assert!(after.best.fitness >= before.best.fitness);
        }
    }

    #[test]
    fn test_same_seed_same_run() {
        let config = get_test_config();
        let history = || {
            let mut engine = EvolutionEngine::new(&config).unwrap();
            engine.initialize_population();
            let mut summaries = vec![engine.summarize().unwrap()];
            for _ in 0..8 {
                engine.next_generation().unwrap();
                summaries.push(engine.summarize().unwrap());
            }
            summaries
        };
        assert_eq!(history(), history());
    }

    #[test]
    fn test_different_seed_different_population() {
        let config = get_test_config();
        let other = GaConfig {
            seed: 18,
            ..get_test_config()
        };
        let mut first = EvolutionEngine::new(&config).unwrap();
        let mut second = EvolutionEngine::new(&other).unwrap();
        first.initialize_population();
        second.initialize_population();
        assert_ne!(first.population(), second.population());
    }

    #[test]
    fn test_seeded_onemax_run_finds_all_ones() {
        let config = Config {
            ga: GaConfig {
                seed: 123,
                population_size: 10,
                genome_length: 8,
                crossover_rate: 1.0,
                mutation_rate: 0.0,
                tournament_size: 2,
                crossover_operator: CrossoverOperator::Uniform,
                fitness_function: FitnessFunction::Simple,
            },
            termination: TerminationConfig {
                terminate_on_failure: false,
                failures_before_termination: 0,
                max_generations: Some(50),
            },
            ..Config::default()
        };
        let mut reporter = RecordingReporter::default();

        let outcome = run_standard(&config, &mut reporter).unwrap();
        assert!(outcome.is_success());
        match outcome {
            RunOutcome::Success(report) => {
                assert_eq!(report.best_fitness, 8);
                assert_eq!(report.best_genome, vec![1; 8]);
                assert!(report.generation <= 50);
                assert_eq!(report.population_size, 10);
                let summary = &reporter.summaries[report.generation - 1];
                assert_eq!(summary.best.index, report.best_index);
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(reporter.finished.len(), 1);
        assert!(matches!(reporter.finished[0], FinalReport::Success(_)));
    }

    #[test]
    fn test_block_fitness_target() {
        let config = GaConfig {
            fitness_function: FitnessFunction::Block,
            genome_length: 12,
            ..get_test_config()
        };
        let engine = EvolutionEngine::new(&config).unwrap();
        assert_eq!(engine.target_fitness(), 12);
    }

    #[test]
    fn test_frozen_population_stagnates() {
        // no crossover and no mutation: selection alone can only copy existing genomes
        let config = Config {
            ga: GaConfig {
                population_size: 4,
                genome_length: 64,
                crossover_rate: 0.0,
                mutation_rate: 0.0,
                tournament_size: 2,
                ..get_test_config()
            },
            termination: TerminationConfig {
                terminate_on_failure: true,
                failures_before_termination: 1,
                max_generations: Some(1_000),
            },
            ..Config::default()
        };
        let mut reporter = RecordingReporter::default();
        let outcome = run_standard(&config, &mut reporter).unwrap();

        assert!(matches!(outcome, RunOutcome::Stagnated(_)));
        assert!(!outcome.is_success());
        assert_eq!(reporter.failures, vec![0]);
        assert!(matches!(reporter.finished[0], FinalReport::Failed(_)));
    }

    #[test]
    fn test_generation_cap_stops_run() {
        let config = Config {
            ga: GaConfig {
                genome_length: 64,
                crossover_rate: 0.0,
                mutation_rate: 0.0,
                ..get_test_config()
            },
            termination: TerminationConfig {
                terminate_on_failure: false,
                failures_before_termination: 0,
                max_generations: Some(5),
            },
            ..Config::default()
        };
        let outcome = run_standard(&config, &mut SilentReporter).unwrap();
        match outcome {
            RunOutcome::GenerationLimit(summary) => assert_eq!(summary.generation, 5),
            other => panic!("expected generation limit, got {:?}", other),
        }
    }
}

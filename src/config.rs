use crate::evolution::fitness::FitnessFunction;
use crate::evolution::operators::CrossoverOperator;
use crate::settings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid value for setting '{key}' on line {line}: {reason}")]
    InvalidSetting {
        key: String,
        line: usize,
        reason: String,
    },
    #[error("Unknown setting '{key}' on line {line}")]
    UnknownSetting { key: String, line: usize },
    #[error("'{field}' must be at least {min}, got {value}")]
    TooSmall {
        field: &'static str,
        min: usize,
        value: usize,
    },
    #[error("'{field}' must be a probability in [0, 1], got {value}")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },
    #[error("Tournament size {tournament_size} exceeds population size {population_size}")]
    TournamentTooLarge {
        tournament_size: usize,
        population_size: usize,
    },
    #[error("Genome length {genome_length} is not supported by the {fitness_function:?} fitness function")]
    IncompatibleGenomeLength {
        genome_length: usize,
        fitness_function: FitnessFunction,
    },
    #[error("Bisection threshold must be in (0, 1], got {0}")]
    ThresholdOutOfRange(f64),
    #[error("Bisection population limit {limit} is below the starting population {starting}")]
    PopulationLimitTooSmall { limit: usize, starting: usize },
}

/// Parameters of a single genetic algorithm run.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GaConfig {
    /// Seed of the run's random source; the same seed and settings reproduce the same run
    pub seed: u64,
    pub population_size: usize,
    /// Number of bits in every genome
    pub genome_length: usize,
    /// Probability that a parent pair is recombined rather than copied
    pub crossover_rate: f64,
    /// Probability that a child is considered for mutation at all.
    /// A child selected for mutation flips each bit with probability 1 / `genome_length`.
    pub mutation_rate: f64,
    pub tournament_size: usize,
    pub crossover_operator: CrossoverOperator,
    pub fitness_function: FitnessFunction,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            seed: 123,
            population_size: 46,
            genome_length: 80,
            crossover_rate: 0.6,
            mutation_rate: 1.0,
            tournament_size: 2,
            crossover_operator: CrossoverOperator::Uniform,
            fitness_function: FitnessFunction::Simple,
        }
    }
}

/// When a standard run gives up.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TerminationConfig {
    /// Evaluate the stagnation rule every generation
    pub terminate_on_failure: bool,
    /// Stagnant windows tolerated before the run is terminated
    pub failures_before_termination: u32,
    /// Hard cap on the number of generations, unlimited when absent
    pub max_generations: Option<usize>,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            terminate_on_failure: true,
            failures_before_termination: 0,
            max_generations: None,
        }
    }
}

/// Search for the smallest population size that reaches the target in time.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BisectionConfig {
    pub enabled: bool,
    pub starting_population: usize,
    /// Generations a trial may take to reach the target
    pub max_generations: usize,
    /// The search stops once (high - low) / low falls below this value
    pub threshold: f64,
    /// Largest population size tried while bracketing
    pub population_limit: usize,
}

impl Default for BisectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            starting_population: 10,
            max_generations: 50,
            threshold: 0.1,
            population_limit: 65_536,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub ga: GaConfig,
    pub termination: TerminationConfig,
    pub bisection: BisectionConfig,
}

impl Config {
    /// Loads a configuration file.
    ///
    /// `.toml` files are parsed as TOML, anything else as a `key value` settings file
    /// (see `settings::parse`). Settings missing from the file keep their default value.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Result<Self, ConfigError>` - The (not yet validated) configuration
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        if is_toml(path) {
            Ok(toml::from_str(&content)?)
        } else {
            settings::parse(&content)
        }
    }

    /// Writes the default configuration in the format `load` expects for `path`:
    /// TOML for `.toml` files, `key value` lines otherwise.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        let config = Config::default();
        let content = if is_toml(path) {
            toml::to_string_pretty(&config)?
        } else {
            settings::render(&config)
        };
        fs::write(path, content)?;
        Ok(())
    }

    /// Checks every setting before a run is allowed to start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ga = &self.ga;
        at_least("population_size", ga.population_size, 2)?;
        at_least("genome_length", ga.genome_length, 1)?;
        at_least("tournament_size", ga.tournament_size, 2)?;
        probability("crossover_rate", ga.crossover_rate)?;
        probability("mutation_rate", ga.mutation_rate)?;

        if ga.tournament_size > ga.population_size {
            return Err(ConfigError::TournamentTooLarge {
                tournament_size: ga.tournament_size,
                population_size: ga.population_size,
            });
        }
        if !ga.fitness_function.supports_length(ga.genome_length) {
            return Err(ConfigError::IncompatibleGenomeLength {
                genome_length: ga.genome_length,
                fitness_function: ga.fitness_function,
            });
        }

        if let Some(max_generations) = self.termination.max_generations {
            at_least("termination.max_generations", max_generations, 1)?;
        }

        let bisection = &self.bisection;
        at_least(
            "bisection.starting_population",
            bisection.starting_population,
            2,
        )?;
        at_least("bisection.max_generations", bisection.max_generations, 2)?;
        if !(bisection.threshold > 0.0 && bisection.threshold <= 1.0) {
            return Err(ConfigError::ThresholdOutOfRange(bisection.threshold));
        }
        if bisection.population_limit < bisection.starting_population {
            return Err(ConfigError::PopulationLimitTooSmall {
                limit: bisection.population_limit,
                starting: bisection.starting_population,
            });
        }
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

fn at_least(field: &'static str, value: usize, min: usize) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::TooSmall { field, min, value });
    }
    Ok(())
}

fn probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ProbabilityOutOfRange { field, value });
    }
    Ok(())
}

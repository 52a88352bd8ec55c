//! Reader and writer for the plain `key value` settings format (`gasettings.dat` style).
//!
//! One setting per line, the key and its value separated by whitespace. Lines starting with `#`
//! and blank lines are ignored. Selector settings use integer codes:
//!
//! | key                 | values                                   |
//! |---------------------|------------------------------------------|
//! | `fitnessFunction`   | 0 = simple, 1 = block                    |
//! | `crossoverOperator` | 0 = uniform, 1 = one-point, 2 = two-point |
//! | `selectionMethod`   | 0 = tournament                           |
//! | `terminateOnFailure`, `bisection` | 0 = off, 1 = on            |

use crate::config::{Config, ConfigError};
use crate::evolution::fitness::FitnessFunction;
use crate::evolution::operators::CrossoverOperator;
use std::str::FromStr;

/// Parses a settings file into a `Config`; keys that do not appear keep their default value.
///
/// # Errors
/// `ConfigError::UnknownSetting` for an unrecognized key, `ConfigError::InvalidSetting` for a
/// value that does not parse or is not one of the allowed codes.
pub fn parse(content: &str) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            return Err(ConfigError::InvalidSetting {
                key: trimmed.to_string(),
                line,
                reason: "expected '<key> <value>'".to_string(),
            });
        };
        let setting = Setting { key, value, line };

        match key {
            "randSeed" => config.ga.seed = setting.number()?,
            "populationSizeN" => config.ga.population_size = setting.number()?,
            "stringSizeN" => config.ga.genome_length = setting.number()?,
            "probApplyCrossover" => config.ga.crossover_rate = setting.number()?,
            "probApplyMutation" => config.ga.mutation_rate = setting.number()?,
            "tournamentSizeK" => config.ga.tournament_size = setting.number()?,
            "selectionMethod" => {
                setting.code(&[0])?;
            }
            "fitnessFunction" => {
                config.ga.fitness_function = match setting.code(&[0, 1])? {
                    0 => FitnessFunction::Simple,
                    _ => FitnessFunction::Block,
                }
            }
            "crossoverOperator" => {
                config.ga.crossover_operator = match setting.code(&[0, 1, 2])? {
                    0 => CrossoverOperator::Uniform,
                    1 => CrossoverOperator::OnePoint,
                    _ => CrossoverOperator::TwoPoint,
                }
            }
            "terminateOnFailure" => {
                config.termination.terminate_on_failure = setting.code(&[0, 1])? == 1
            }
            "failuresBeforeTermination" => {
                config.termination.failures_before_termination = setting.number()?
            }
            "bisection" => config.bisection.enabled = setting.code(&[0, 1])? == 1,
            "bisectionThreshold" => config.bisection.threshold = setting.number()?,
            "bisectionStartingPopulation" => {
                config.bisection.starting_population = setting.number()?
            }
            "bisectionMaxGeneration" => config.bisection.max_generations = setting.number()?,
            _ => {
                return Err(ConfigError::UnknownSetting {
                    key: key.to_string(),
                    line,
                })
            }
        }
    }

    Ok(config)
}

/// Renders `config` as a settings file that `parse` reads back to the same value.
///
/// Only the settings the format knows are written; `termination.max_generations` and
/// `bisection.population_limit` have no key and fall back to their defaults on load.
pub fn render(config: &Config) -> String {
    let fitness_function = match config.ga.fitness_function {
        FitnessFunction::Simple => 0,
        FitnessFunction::Block => 1,
    };
    let crossover_operator = match config.ga.crossover_operator {
        CrossoverOperator::Uniform => 0,
        CrossoverOperator::OnePoint => 1,
        CrossoverOperator::TwoPoint => 2,
    };
    let lines = [
        format!("randSeed {}", config.ga.seed),
        format!("populationSizeN {}", config.ga.population_size),
        format!("stringSizeN {}", config.ga.genome_length),
        format!("probApplyCrossover {:?}", config.ga.crossover_rate),
        format!("probApplyMutation {:?}", config.ga.mutation_rate),
        "selectionMethod 0".to_string(),
        format!("tournamentSizeK {}", config.ga.tournament_size),
        format!("fitnessFunction {}", fitness_function),
        format!(
            "terminateOnFailure {}",
            u8::from(config.termination.terminate_on_failure)
        ),
        format!(
            "failuresBeforeTermination {}",
            config.termination.failures_before_termination
        ),
        format!("crossoverOperator {}", crossover_operator),
        format!("bisection {}", u8::from(config.bisection.enabled)),
        format!("bisectionThreshold {:?}", config.bisection.threshold),
        format!(
            "bisectionStartingPopulation {}",
            config.bisection.starting_population
        ),
        format!(
            "bisectionMaxGeneration {}",
            config.bisection.max_generations
        ),
    ];
    let mut content = lines.join("\n");
    content.push('\n');
    content
}

struct Setting<'a> {
    key: &'a str,
    value: &'a str,
    line: usize,
}

impl Setting<'_> {
    fn invalid(&self, reason: String) -> ConfigError {
        ConfigError::InvalidSetting {
            key: self.key.to_string(),
            line: self.line,
            reason,
        }
    }

    fn number<T>(&self) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.value
            .parse()
            .map_err(|e| self.invalid(format!("'{}': {}", self.value, e)))
    }

    fn code(&self, allowed: &[u8]) -> Result<u8, ConfigError> {
        let code: u8 = self.number()?;
        if !allowed.contains(&code) {
            return Err(self.invalid(format!("must be one of {:?}, got {}", allowed, code)));
        }
        Ok(code)
    }
}

//! Bisection search for the smallest population size that reaches the target fitness within a
//! generation limit.
//!
//! The search first doubles the population size until a trial converges, which brackets the
//! answer between the last failing size and the first converging one, and then halves that
//! bracket until its relative width falls below the configured threshold.

use super::{EvolutionEngine, EvolutionError, GenerationTracker};
use crate::config::{BisectionConfig, Config, GaConfig};
use crate::report::{FinalReport, Reporter};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// One population size tried by the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub population_size: usize,
    /// Whether the target fitness was reached within the generation limit
    pub converged: bool,
    /// Generations the trial ran, the initial one included
    pub generations: usize,
}

/// Result of a finished search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BisectionReport {
    /// Largest population size known not to converge in time
    pub low: usize,
    /// Smallest population size known to converge in time
    pub high: usize,
    /// `(high - low) / low` when the search stopped
    pub relative_gap: f64,
    /// Every trial in the order it was run
    pub trials: Vec<TrialRecord>,
}

pub struct BisectionSearch<'a> {
    config: &'a Config,
}

impl<'a> BisectionSearch<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Runs the search with real GA trials and hands the final report to `reporter`.
    pub fn run(&self, reporter: &mut dyn Reporter) -> Result<BisectionReport, EvolutionError> {
        info!(
            "Starting bisection search from population size {}",
            self.config.bisection.starting_population
        );
        let report = search_with(&self.config.bisection, |population_size| {
            reporter.trial_started(population_size);
            let trial = self.trial(population_size, &mut *reporter)?;
            reporter.trial_finished(&trial);
            Ok(trial)
        })?;
        reporter.finished(&FinalReport::Bisection(report.clone()));
        Ok(report)
    }

    /// Runs the GA once with `population_size` individuals, reseeded with the configured seed.
    /// The trial converges when the target is reached within `bisection.max_generations`.
    pub fn trial(
        &self,
        population_size: usize,
        reporter: &mut dyn Reporter,
    ) -> Result<TrialRecord, EvolutionError> {
        let ga = GaConfig {
            population_size,
            ..self.config.ga.clone()
        };
        let mut engine = EvolutionEngine::new(&ga)?;
        let mut tracker = GenerationTracker::bisection(engine.target_fitness());
        let outcome = engine.run(
            &mut tracker,
            reporter,
            Some(self.config.bisection.max_generations),
        )?;

        // the run is capped at max_generations, so any success is within the limit
        let converged = outcome.is_success();
        debug!(
            "Trial with population size {} finished: {:?}",
            population_size, outcome
        );
        Ok(TrialRecord {
            population_size,
            converged,
            generations: engine.generation(),
        })
    }
}

/// Runs the search with an arbitrary trial.
///
/// # Arguments
/// * `config` - Starting size, threshold and bracketing limit
/// * `trial` - Runs one population size and reports whether it converged
///
/// # Errors
/// `EvolutionError::BisectionExhausted` when no size up to `config.population_limit` converges,
/// and any error returned by `trial`.
pub fn search_with<F>(config: &BisectionConfig, mut trial: F) -> Result<BisectionReport, EvolutionError>
where
    F: FnMut(usize) -> Result<TrialRecord, EvolutionError>,
{
    let mut trials = Vec::new();

    // Phase 1: double until a size converges
    let mut population_size = config.starting_population;
    loop {
        if population_size > config.population_limit {
            return Err(EvolutionError::BisectionExhausted {
                limit: config.population_limit,
            });
        }
        let record = trial(population_size)?;
        let converged = record.converged;
        trials.push(record);
        if converged {
            break;
        }
        population_size *= 2;
    }
    let mut low = population_size / 2;
    let mut high = population_size;

    // Phase 2: halve the bracket
    loop {
        let gap = relative_gap(low, high);
        if gap < config.threshold || high - low <= 1 {
            info!(
                "Bisection converged: low {}, high {}, gap {}",
                low, high, gap
            );
            return Ok(BisectionReport {
                low,
                high,
                relative_gap: gap,
                trials,
            });
        }
        let middle = (low + high) / 2;
        let record = trial(middle)?;
        if record.converged {
            high = middle;
        } else {
            low = middle;
        }
        trials.push(record);
    }
}

fn relative_gap(low: usize, high: usize) -> f64 {
    if low == 0 {
        return f64::INFINITY;
    }
    (high - low) as f64 / low as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::{CrossoverOperator, FitnessFunction};
    use crate::report::SilentReporter;

    fn threshold_trial(minimum: usize) -> impl FnMut(usize) -> Result<TrialRecord, EvolutionError> {
        move |population_size| {
            Ok(TrialRecord {
                population_size,
                converged: population_size >= minimum,
                generations: 1,
            })
        }
    }

    fn tried(report: &BisectionReport) -> Vec<usize> {
        report.trials.iter().map(|t| t.population_size).collect()
    }

    #[test]
    fn test_search_brackets_minimum_population() {
        let config = BisectionConfig {
            starting_population: 10,
            threshold: 0.1,
            ..BisectionConfig::default()
        };
        let report = search_with(&config, threshold_trial(37)).unwrap();

        assert_eq!(tried(&report), vec![10, 20, 40, 30, 35, 37]);
        assert_eq!(report.low, 35);
        assert_eq!(report.high, 37);
        assert!(report.relative_gap < 0.1);
    }

    #[test]
    fn test_first_size_converging_still_bisects() {
        let config = BisectionConfig {
            starting_population: 16,
            threshold: 0.1,
            ..BisectionConfig::default()
        };
        let report = search_with(&config, threshold_trial(2)).unwrap();

        // everything converges, so the bracket only ever shrinks from above
        assert_eq!(tried(&report), vec![16, 12, 10, 9]);
        assert_eq!(report.low, 8);
        assert_eq!(report.high, 9);
    }

    #[test]
    fn test_adjacent_sizes_stop_search() {
        let config = BisectionConfig {
            starting_population: 2,
            threshold: 0.01,
            ..BisectionConfig::default()
        };
        let report = search_with(&config, threshold_trial(3)).unwrap();
        assert_eq!(tried(&report), vec![2, 4, 3]);
        assert_eq!((report.low, report.high), (2, 3));
    }

    #[test]
    fn test_search_gives_up_past_limit() {
        let config = BisectionConfig {
            starting_population: 10,
            population_limit: 100,
            ..BisectionConfig::default()
        };
        let mut calls = 0;
        let result = search_with(&config, |population_size| {
            calls += 1;
            Ok(TrialRecord {
                population_size,
                converged: false,
                generations: 50,
            })
        });
        assert_eq!(result, Err(EvolutionError::BisectionExhausted { limit: 100 }));
        // 10, 20, 40, 80
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_trial_errors_abort_search() {
        let config = BisectionConfig::default();
        let result = search_with(&config, |_| Err(EvolutionError::EmptyGenome));
        assert_eq!(result, Err(EvolutionError::EmptyGenome));
    }

    #[test]
    fn test_seeded_search_on_short_genomes() {
        let config = Config {
            ga: GaConfig {
                seed: 123,
                genome_length: 8,
                crossover_rate: 0.6,
                mutation_rate: 1.0,
                tournament_size: 2,
                crossover_operator: CrossoverOperator::Uniform,
                fitness_function: FitnessFunction::Simple,
                ..GaConfig::default()
            },
            bisection: BisectionConfig {
                enabled: true,
                starting_population: 4,
                max_generations: 50,
                threshold: 0.1,
                population_limit: 4_096,
            },
            ..Config::default()
        };
        let report = BisectionSearch::new(&config)
            .run(&mut SilentReporter)
            .unwrap();

        assert!(report.low < report.high);
        assert!(report.high - report.low <= 1usize.max(report.low / 10));
        let last_converging = report
            .trials
            .iter()
            .find(|t| t.population_size == report.high)
            .unwrap();
        assert!(last_converging.converged);
        assert!(last_converging.generations <= 50);
        for trial in &report.trials {
            assert!(trial.generations <= 50);
        }
    }
}

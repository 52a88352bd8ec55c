//! Reporting of generations and final outcomes.
//!
//! The engine pushes a `GenerationSummary` for every generation and a `FinalReport` when it
//! stops; what happens with them is up to the `Reporter` implementation.

use crate::config::Config;
use crate::evolution::bisection::{BisectionReport, TrialRecord};
use crate::evolution::individual::{genome_to_string, Individual};
use crate::evolution::tracker::{FailureReport, GenerationSummary, SuccessReport};
use crate::evolution::RunOutcome;
use log::{debug, log_enabled, Level};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report: {0}")]
    FileWriteError(#[from] std::io::Error),
    #[error("Failed to serialize report: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Terminal report of a run or of a bisection search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FinalReport {
    Success(SuccessReport),
    Failed(FailureReport),
    GenerationLimit(GenerationSummary),
    Bisection(BisectionReport),
}

impl From<RunOutcome> for FinalReport {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Success(report) => FinalReport::Success(report),
            RunOutcome::Stagnated(report) => FinalReport::Failed(report),
            RunOutcome::GenerationLimit(summary) => FinalReport::GenerationLimit(summary),
        }
    }
}

impl FinalReport {
    /// Human readable, multi-line rendering of the report
    pub fn lines(&self) -> Vec<String> {
        match self {
            FinalReport::Success(report) => vec![
                format!("Global Best Fitness = {}", report.best_fitness),
                format!(
                    "Global Best Solution = {}",
                    genome_to_string(&report.best_genome)
                ),
                format!(
                    "Global Best was at index {} of {}",
                    report.best_index, report.population_size
                ),
                format!("Average Fitness: {}", report.average_fitness),
                format!("Worst Fitness: {}", report.worst_fitness),
                "SUCCESS".to_string(),
            ],
            FinalReport::Failed(report) => vec![
                format!(
                    "Best Fitness in previous 3 generations = {}",
                    report.best_fitness
                ),
                format!(
                    "Best Solution in previous 3 generations = {}",
                    genome_to_string(&report.best_genome)
                ),
                format!(
                    "Worst Fitness in previous 3 generations = {}",
                    report.worst_fitness
                ),
                format!(
                    "Worst Solution in previous 3 generations = {}",
                    genome_to_string(&report.worst_genome)
                ),
                format!(
                    "Best Average Fitness in previous 3 generations: {}",
                    report.best_average
                ),
                format!(
                    "Worst Average Fitness in previous 3 generations: {}",
                    report.worst_average
                ),
                "FAILED".to_string(),
            ],
            FinalReport::GenerationLimit(summary) => vec![
                format!("Generation limit reached after {} generations", summary.generation),
                format!("Best Fitness = {}", summary.best.fitness),
                format!("Best Solution = {}", genome_to_string(&summary.best.genome)),
                format!("Average Fitness: {}", summary.average),
                "STOPPED".to_string(),
            ],
            FinalReport::Bisection(report) => vec![
                format!("Final Max N = {}", report.high),
                format!("Final Min N = {}", report.low),
                format!("Final Threshold = {}", report.relative_gap),
            ],
        }
    }
}

/// Sink for everything a run reports.
pub trait Reporter {
    /// Called once per generation, including the initial one
    fn generation(&mut self, summary: &GenerationSummary, population: &[Individual]);

    /// A stagnant window was charged against the failure budget
    fn failure_charged(&mut self, _generation: usize, _remaining: u32) {}

    /// A bisection trial is about to start
    fn trial_started(&mut self, _population_size: usize) {}

    /// A bisection trial completed
    fn trial_finished(&mut self, _trial: &TrialRecord) {}

    /// Called once when the run or the search is over
    fn finished(&mut self, report: &FinalReport);
}

/// Prints summaries to stdout; population dumps go to the `debug` log.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn generation(&mut self, summary: &GenerationSummary, population: &[Individual]) {
        println!("{}", summary.message());
        if log_enabled!(Level::Debug) {
            debug!("Current Population");
            for individual in population {
                debug!("{}", individual.genome_string());
            }
            debug!("Best Solution = {}", genome_to_string(&summary.best.genome));
            debug!("Worst Solution = {}", genome_to_string(&summary.worst.genome));
        }
    }

    fn failure_charged(&mut self, generation: usize, remaining: u32) {
        println!(
            "Generation {} failed to improve. Failures remaining before termination {}",
            generation, remaining
        );
    }

    fn trial_started(&mut self, population_size: usize) {
        println!("\nRunning bisection with population size: {}", population_size);
    }

    fn trial_finished(&mut self, trial: &TrialRecord) {
        let verdict = if trial.converged {
            "converged"
        } else {
            "did not converge"
        };
        println!(
            "Population size {} {} after {} generations",
            trial.population_size, verdict, trial.generations
        );
    }

    fn finished(&mut self, report: &FinalReport) {
        for line in report.lines() {
            println!("{}", line);
        }
    }
}

/// Reporter that ignores everything, for benchmarks and library callers that only need the
/// returned outcome.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn generation(&mut self, _summary: &GenerationSummary, _population: &[Individual]) {}

    fn finished(&mut self, _report: &FinalReport) {}
}

/// JSON document written by `--report-json`: the final report plus the configuration that
/// produced it, so a run can be reproduced.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportExport {
    pub schema_version: String,
    /// Unix timestamp when the export was generated
    pub generated_at: i64,
    pub config: Config,
    pub report: FinalReport,
}

impl ReportExport {
    pub fn new(config: Config, report: FinalReport) -> Self {
        Self {
            schema_version: "1.0.0".to_string(),
            generated_at: chrono::Utc::now().timestamp(),
            config,
            report,
        }
    }

    /// Writes the export as pretty printed JSON.
    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn success_report() -> SuccessReport {
        SuccessReport {
            generation: 4,
            best_fitness: 8,
            best_genome: vec![1; 8],
            best_index: 9,
            population_size: 10,
            average_fitness: 6.5,
            worst_fitness: 3,
        }
    }

    #[test]
    fn test_success_lines() {
        let lines = FinalReport::Success(success_report()).lines();
        assert_eq!(lines[0], "Global Best Fitness = 8");
        assert_eq!(lines[1], "Global Best Solution = 1,1,1,1,1,1,1,1");
        assert_eq!(lines[2], "Global Best was at index 9 of 10");
        assert_eq!(lines.last().map(String::as_str), Some("SUCCESS"));
    }

    #[test]
    fn test_bisection_lines() {
        let report = FinalReport::Bisection(BisectionReport {
            low: 35,
            high: 37,
            relative_gap: 2.0 / 35.0,
            trials: Vec::new(),
        });
        let lines = report.lines();
        assert_eq!(lines[0], "Final Max N = 37");
        assert_eq!(lines[1], "Final Min N = 35");
    }

    #[test]
    fn test_export_is_tagged_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        let export = ReportExport::new(Config::default(), FinalReport::Success(success_report()));
        export.write(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["report"]["outcome"], "success");
        assert_eq!(value["report"]["best_fitness"], 8);
        assert_eq!(value["config"]["ga"]["seed"], 123);

        let parsed: ReportExport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.report, export.report);
    }
}

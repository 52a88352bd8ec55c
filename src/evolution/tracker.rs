use super::individual::{genome_to_string, Individual};
use super::Genome;
use crate::config::TerminationConfig;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of generation summaries held when the stagnation rule is evaluated.
/// The oldest one is evicted as soon as the window fills up, so the rule compares
/// the oldest remaining summary against the two most recent ones.
pub const STAGNATION_WINDOW: usize = 4;

/// Position in the evaluated window at which a lack of progress is charged as a failure
const FAILURE_CHECK_INDEX: usize = 2;

/// A member of a generation singled out by its fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedIndividual {
    pub fitness: u32,
    pub index: usize,
    pub genome: Genome,
}

/// Summary statistics of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// 1-based generation number, the random initial population is generation 1
    pub generation: usize,
    pub population_size: usize,
    pub best: RankedIndividual,
    pub worst: RankedIndividual,
    pub average: f64,
}

impl GenerationSummary {
    /// Summarizes a scored generation. Ties for best and worst go to the lowest index.
    ///
    /// # Arguments
    /// * `generation` - The generation number
    /// * `population` - Members of the generation
    /// * `scores` - Fitness of every member, same order as `population`
    ///
    /// # Returns
    /// * `None` if the generation is empty or the scores do not line up with the members
    pub fn from_scores(generation: usize, population: &[Individual], scores: &[u32]) -> Option<Self> {
        if population.is_empty() || population.len() != scores.len() {
            return None;
        }
        let mut best = 0;
        let mut worst = 0;
        for (i, &score) in scores.iter().enumerate() {
            if score > scores[best] {
                best = i;
            }
            if score < scores[worst] {
                worst = i;
            }
        }
        let total: u64 = scores.iter().map(|&s| u64::from(s)).sum();
        let rank = |index: usize| RankedIndividual {
            fitness: scores[index],
            index,
            genome: population[index].genome().to_vec(),
        };

        Some(Self {
            generation,
            population_size: population.len(),
            best: rank(best),
            worst: rank(worst),
            average: total as f64 / scores.len() as f64,
        })
    }

    /// One line console summary, e.g. `Generation 3: (B: 7, A: 5.2, W: 3)`
    pub fn message(&self) -> String {
        format!(
            "Generation {}: (B: {}, A: {}, W: {})",
            self.generation, self.best.fitness, self.average, self.worst.fitness
        )
    }
}

/// Final report of a run that reached the target fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessReport {
    pub generation: usize,
    pub best_fitness: u32,
    pub best_genome: Genome,
    pub best_index: usize,
    pub population_size: usize,
    pub average_fitness: f64,
    pub worst_fitness: u32,
}

/// Final report of a run terminated for stagnation, covering the generations in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub generation: usize,
    pub best_fitness: u32,
    pub best_genome: Genome,
    pub worst_fitness: u32,
    pub worst_genome: Genome,
    pub best_average: f64,
    pub worst_average: f64,
}

/// Decision taken after recording a generation.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Continue,
    /// The window showed no progress, the budget was decremented to `remaining`
    FailureCharged { remaining: u32 },
    Success(SuccessReport),
    Stagnated(FailureReport),
}

/// Outcome of comparing the oldest summary of the window against the later ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowCheck {
    /// A later generation improved on both best and average fitness
    Improved,
    /// Neither best nor average fitness improved by the last generation
    Stagnant,
    /// Mixed signals, nothing is charged
    Inconclusive,
}

/// Applies the stagnation rule to a window (oldest first).
///
/// A later summary whose best fitness is at least the oldest one and whose average is
/// strictly higher counts as progress. Otherwise, if the summary at index 2 has neither a higher
/// best nor a higher average, the window is stagnant.
pub fn check_window<'a, I>(window: I) -> WindowCheck
where
    I: IntoIterator<Item = &'a GenerationSummary>,
{
    let mut summaries = window.into_iter();
    let Some(oldest) = summaries.next() else {
        return WindowCheck::Inconclusive;
    };
    for (index, summary) in summaries.enumerate().map(|(i, s)| (i + 1, s)) {
        if summary.best.fitness >= oldest.best.fitness && summary.average > oldest.average {
            return WindowCheck::Improved;
        }
        if index == FAILURE_CHECK_INDEX
            && summary.best.fitness <= oldest.best.fitness
            && summary.average <= oldest.average
        {
            return WindowCheck::Stagnant;
        }
    }
    WindowCheck::Inconclusive
}

/// Keeps the rolling window of generation summaries and decides when a run is over.
#[derive(Debug, Clone)]
pub struct GenerationTracker {
    target_fitness: u32,
    terminate_on_failure: bool,
    failures_remaining: u32,
    window: VecDeque<GenerationSummary>,
}

impl GenerationTracker {
    /// Tracker for a standard run: success detection plus the stagnation rule when enabled.
    pub fn standard(target_fitness: u32, termination: &TerminationConfig) -> Self {
        Self {
            target_fitness,
            terminate_on_failure: termination.terminate_on_failure,
            failures_remaining: termination.failures_before_termination,
            window: VecDeque::with_capacity(STAGNATION_WINDOW),
        }
    }

    /// Tracker for a bisection trial: success detection only.
    pub fn bisection(target_fitness: u32) -> Self {
        Self {
            target_fitness,
            terminate_on_failure: false,
            failures_remaining: 0,
            window: VecDeque::with_capacity(STAGNATION_WINDOW),
        }
    }

    pub fn failures_remaining(&self) -> u32 {
        self.failures_remaining
    }

    pub fn window(&self) -> impl Iterator<Item = &GenerationSummary> {
        self.window.iter()
    }

    /// Records a generation and returns what the run should do next.
    pub fn record(&mut self, summary: GenerationSummary) -> Verdict {
        let success = (summary.best.fitness == self.target_fitness).then(|| SuccessReport {
            generation: summary.generation,
            best_fitness: summary.best.fitness,
            best_genome: summary.best.genome.clone(),
            best_index: summary.best.index,
            population_size: summary.population_size,
            average_fitness: summary.average,
            worst_fitness: summary.worst.fitness,
        });
        let generation = summary.generation;

        self.window.push_back(summary);
        if self.window.len() < STAGNATION_WINDOW {
            return success.map_or(Verdict::Continue, Verdict::Success);
        }
        self.window.pop_front();

        if let Some(report) = success {
            return Verdict::Success(report);
        }
        if !self.terminate_on_failure {
            return Verdict::Continue;
        }

        match check_window(&self.window) {
            WindowCheck::Stagnant if self.failures_remaining == 0 => {
                info!("Generation {}: no progress and no failures left", generation);
                Verdict::Stagnated(self.failure_report(generation))
            }
            WindowCheck::Stagnant => {
                self.failures_remaining -= 1;
                debug!(
                    "Generation {}: no progress, {} failures remaining before termination",
                    generation, self.failures_remaining
                );
                Verdict::FailureCharged {
                    remaining: self.failures_remaining,
                }
            }
            WindowCheck::Improved | WindowCheck::Inconclusive => Verdict::Continue,
        }
    }

    /// Best and worst fitness and averages over the summaries currently in the window.
    fn failure_report(&self, generation: usize) -> FailureReport {
        let mut summaries = self.window.iter();
        let first = summaries.next();
        let mut best = first.map(|s| &s.best);
        let mut worst = first.map(|s| &s.worst);
        let mut best_average = first.map_or(0.0, |s| s.average);
        let mut worst_average = best_average;
        for summary in summaries {
            if best.map_or(true, |b| summary.best.fitness > b.fitness) {
                best = Some(&summary.best);
            }
            if worst.map_or(true, |w| summary.worst.fitness < w.fitness) {
                worst = Some(&summary.worst);
            }
            best_average = best_average.max(summary.average);
            worst_average = worst_average.min(summary.average);
        }
        debug!(
            "Window best genome {} / worst genome {}",
            best.map(|b| genome_to_string(&b.genome)).unwrap_or_default(),
            worst.map(|w| genome_to_string(&w.genome)).unwrap_or_default()
        );

        FailureReport {
            generation,
            best_fitness: best.map_or(0, |b| b.fitness),
            best_genome: best.map(|b| b.genome.clone()).unwrap_or_default(),
            worst_fitness: worst.map_or(0, |w| w.fitness),
            worst_genome: worst.map(|w| w.genome.clone()).unwrap_or_default(),
            best_average,
            worst_average,
        }
    }
}

use super::fitness::FitnessFunction;
use super::individual::{genome_to_string, Individual};
use super::{EvolutionError, Genome};
use crate::config::GaConfig;
use log::{log_enabled, trace, Level};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Recombination operator applied to a pair of parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverOperator {
    /// Every position independently picks which parent feeds which child
    #[default]
    Uniform,
    /// Tails after a single cut point are swapped
    OnePoint,
    /// The segment between two cut points is swapped
    TwoPoint,
}

impl CrossoverOperator {
    /// Recombines two equally long genomes into two children, drawing cut points (or the uniform
    /// swap mask) from `rng`.
    ///
    /// # Arguments
    /// * `first` - Genome of the first parent
    /// * `second` - Genome of the second parent, same length as `first`
    /// * `rng` - The run's random source
    ///
    /// # Returns
    /// * `(Genome, Genome)` - Child A and child B
    pub fn recombine<R: Rng + ?Sized>(
        &self,
        first: &[u8],
        second: &[u8],
        rng: &mut R,
    ) -> (Genome, Genome) {
        let length = first.len();
        match self {
            CrossoverOperator::Uniform => {
                let swap: Vec<bool> = (0..length).map(|_| rng.random::<bool>()).collect();
                uniform_crossover(first, second, &swap)
            }
            CrossoverOperator::OnePoint => {
                let cut = rng.random_range(0..length);
                trace!("Crossover point: {}", cut);
                one_point_crossover(first, second, cut)
            }
            CrossoverOperator::TwoPoint => {
                let mut cuts = [rng.random_range(0..length), rng.random_range(0..length)];
                cuts.sort_unstable();
                trace!("Crossover points: {}, {}", cuts[0], cuts[1]);
                two_point_crossover(first, second, cuts[0], cuts[1])
            }
        }
    }
}

/// Child A takes `second[i]` where `swap[i]` is set and `first[i]` otherwise, child B the other bit.
pub fn uniform_crossover(first: &[u8], second: &[u8], swap: &[bool]) -> (Genome, Genome) {
    first
        .iter()
        .zip(second)
        .zip(swap)
        .map(|((&a, &b), &swap)| if swap { (b, a) } else { (a, b) })
        .unzip()
}

/// A = first[..cut] + second[cut..], B = second[..cut] + first[cut..]
pub fn one_point_crossover(first: &[u8], second: &[u8], cut: usize) -> (Genome, Genome) {
    (
        [&first[..cut], &second[cut..]].concat(),
        [&second[..cut], &first[cut..]].concat(),
    )
}

/// A = first[..lo] + second[lo..hi] + first[hi..], B is the complement. Requires `lo <= hi`.
pub fn two_point_crossover(first: &[u8], second: &[u8], lo: usize, hi: usize) -> (Genome, Genome) {
    (
        [&first[..lo], &second[lo..hi], &first[hi..]].concat(),
        [&second[..lo], &first[lo..hi], &second[hi..]].concat(),
    )
}

/// Picks the fittest among `contestants` (indexes into `scores`).
/// On equal scores the contestant seen first wins.
pub fn tournament_winner<I>(scores: &[u32], contestants: I) -> Option<usize>
where
    I: IntoIterator<Item = usize>,
{
    contestants.into_iter().fold(None, |winner, contestant| match winner {
        Some(current) if scores[current] >= scores[contestant] => Some(current),
        _ => Some(contestant),
    })
}

/// Produces children from a scored generation: tournament selection, crossover, mutation.
#[derive(Debug, Clone)]
pub struct ReproductionEngine {
    tournament_size: usize,
    crossover_operator: CrossoverOperator,
    crossover_rate: f64,
    mutation_rate: f64,
    fitness_function: FitnessFunction,
}

impl ReproductionEngine {
    /// Creates the engine from the run configuration.
    ///
    /// # Errors
    /// Returns an error if the tournament size is 0 or a probability lies outside `[0, 1]`,
    /// none of which can produce a meaningful generation.
    pub fn new(config: &GaConfig) -> Result<Self, EvolutionError> {
        if config.tournament_size == 0 {
            return Err(EvolutionError::InvalidTournamentSize(config.tournament_size));
        }
        for (name, value) in [
            ("crossover_rate", config.crossover_rate),
            ("mutation_rate", config.mutation_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EvolutionError::InvalidProbability { name, value });
            }
        }
        Ok(Self {
            tournament_size: config.tournament_size,
            crossover_operator: config.crossover_operator,
            crossover_rate: config.crossover_rate,
            mutation_rate: config.mutation_rate,
            fitness_function: config.fitness_function,
        })
    }

    /// Tournament selection: draws `tournament_size` contestants uniformly with replacement
    /// and returns the index of the fittest one.
    ///
    /// # Arguments
    /// * `scores` - Fitness of every member of the current generation
    /// * `rng` - The run's random source
    pub fn select_parent<R: Rng + ?Sized>(
        &self,
        scores: &[u32],
        rng: &mut R,
    ) -> Result<usize, EvolutionError> {
        if scores.is_empty() {
            return Err(EvolutionError::PopulationTooSmall(0));
        }
        let contestants: Vec<usize> = (0..self.tournament_size)
            .map(|_| rng.random_range(0..scores.len()))
            .collect();
        let winner = tournament_winner(scores, contestants.iter().copied())
            .ok_or(EvolutionError::InvalidTournamentSize(self.tournament_size))?;
        trace!(
            "Tournament {:?} (fitness {:?}) selected index {}",
            contestants,
            contestants.iter().map(|&i| scores[i]).collect::<Vec<_>>(),
            winner
        );
        Ok(winner)
    }

    /// Applies the configured crossover with probability `crossover_rate`.
    ///
    /// When crossover is skipped the children are copies of the parents, cached fitness included,
    /// so unchanged genomes are never evaluated twice.
    ///
    /// # Errors
    /// `GenomeLengthMismatch` if the parents differ in length, `EmptyGenome` if they are empty.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        first: &Individual,
        second: &Individual,
        rng: &mut R,
    ) -> Result<[Individual; 2], EvolutionError> {
        if first.len() != second.len() {
            return Err(EvolutionError::GenomeLengthMismatch {
                expected: first.len(),
                found: second.len(),
            });
        }
        if first.is_empty() {
            return Err(EvolutionError::EmptyGenome);
        }

        trace!("p1: {}", first.genome_string());
        trace!("p2: {}", second.genome_string());
        if rng.random_bool(self.crossover_rate) {
            let (child_a, child_b) =
                self.crossover_operator
                    .recombine(first.genome(), second.genome(), rng);
            trace!("c1: {}", genome_to_string(&child_a));
            trace!("c2: {}", genome_to_string(&child_b));
            Ok([
                Individual::new(&child_a, self.fitness_function),
                Individual::new(&child_b, self.fitness_function),
            ])
        } else {
            trace!("Crossover skipped, children are copies of their parents");
            Ok([first.clone(), second.clone()])
        }
    }

    /// With probability `mutation_rate`, flips each bit of `child` with probability `1 / L`.
    ///
    /// # Returns
    /// * `Ok(usize)` - number of flipped bits
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        child: &mut Individual,
        rng: &mut R,
    ) -> Result<usize, EvolutionError> {
        if child.is_empty() || !rng.random_bool(self.mutation_rate) {
            return Ok(0);
        }
        let per_gene = 1.0 / child.len() as f64;
        let mask: Vec<bool> = (0..child.len()).map(|_| rng.random_bool(per_gene)).collect();
        let before = log_enabled!(Level::Trace).then(|| child.genome_string());
        let flipped = child.mutate(&mask)?;
        if let Some(before) = before.filter(|_| flipped > 0) {
            trace!("Before mutation: {}", before);
            trace!("After mutation: {}", child.genome_string());
        }
        Ok(flipped)
    }

    /// Selects two parents and turns them into two (possibly recombined and mutated) children.
    ///
    /// # Arguments
    /// * `population` - The current generation
    /// * `scores` - Fitness of every member of `population`, same order
    /// * `rng` - The run's random source
    pub fn breed<R: Rng + ?Sized>(
        &self,
        population: &[Individual],
        scores: &[u32],
        rng: &mut R,
    ) -> Result<[Individual; 2], EvolutionError> {
        if population.len() != scores.len() {
            return Err(EvolutionError::ScoreCountMismatch {
                members: population.len(),
                scores: scores.len(),
            });
        }
        let first = self.select_parent(scores, rng)?;
        let second = self.select_parent(scores, rng)?;
        let mut children = self.crossover(&population[first], &population[second], rng)?;
        for child in children.iter_mut() {
            self.mutate(child, rng)?;
        }
        Ok(children)
    }
}

use super::fitness::FitnessFunction;
use super::{EvolutionError, Genome};
use rand::Rng;

/// Cached fitness of an `Individual`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitnessState {
    /// The genome changed since the last evaluation (or was never evaluated)
    Unevaluated,
    /// Score of the current genome
    Evaluated(u32),
}

/// A single solution of the population: a fixed-length bit string and its lazily computed
/// fitness. The genome can only be changed through methods that also reset the cached fitness.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    genome: Genome,
    fitness_function: FitnessFunction,
    fitness: FitnessState,
}

impl Individual {
    /// Creates an individual from a copy of `genome`, fitness not yet evaluated.
    pub fn new(genome: &[u8], fitness_function: FitnessFunction) -> Self {
        Self {
            genome: genome.to_vec(),
            fitness_function,
            fitness: FitnessState::Unevaluated,
        }
    }

    /// Creates an individual with `genome_length` uniformly random bits.
    pub fn random<R: Rng + ?Sized>(
        genome_length: usize,
        fitness_function: FitnessFunction,
        rng: &mut R,
    ) -> Self {
        let genome: Genome = (0..genome_length)
            .map(|_| u8::from(rng.random::<bool>()))
            .collect();
        Self {
            genome,
            fitness_function,
            fitness: FitnessState::Unevaluated,
        }
    }

    pub fn genome(&self) -> &[u8] {
        &self.genome
    }

    pub fn len(&self) -> usize {
        self.genome.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genome.is_empty()
    }

    pub fn fitness_state(&self) -> FitnessState {
        self.fitness
    }

    /// Returns the cached fitness without evaluating.
    pub fn cached_fitness(&self) -> Option<u32> {
        match self.fitness {
            FitnessState::Evaluated(score) => Some(score),
            FitnessState::Unevaluated => None,
        }
    }

    /// Returns the fitness of the current genome, evaluating and caching it if needed.
    pub fn fitness(&mut self) -> u32 {
        match self.fitness {
            FitnessState::Evaluated(score) => score,
            FitnessState::Unevaluated => {
                let score = self.fitness_function.evaluate(&self.genome);
                self.fitness = FitnessState::Evaluated(score);
                score
            }
        }
    }

    /// Replaces the genome with a copy of `genome`, which must have the same length.
    ///
    /// # Errors
    /// `EvolutionError::GenomeLengthMismatch` if the lengths differ; the individual is left untouched.
    pub fn replace_genome(&mut self, genome: &[u8]) -> Result<(), EvolutionError> {
        if genome.len() != self.genome.len() {
            return Err(EvolutionError::GenomeLengthMismatch {
                expected: self.genome.len(),
                found: genome.len(),
            });
        }
        self.genome.copy_from_slice(genome);
        self.fitness = FitnessState::Unevaluated;
        Ok(())
    }

    /// Flips every bit whose entry in `mask` is `true`.
    ///
    /// The cached fitness is only discarded when at least one bit was flipped.
    ///
    /// # Returns
    /// * `Ok(usize)` - number of flipped bits
    ///
    /// # Errors
    /// `EvolutionError::GenomeLengthMismatch` if `mask` and the genome differ in length.
    pub fn mutate(&mut self, mask: &[bool]) -> Result<usize, EvolutionError> {
        if mask.len() != self.genome.len() {
            return Err(EvolutionError::GenomeLengthMismatch {
                expected: self.genome.len(),
                found: mask.len(),
            });
        }
        let mut flipped = 0;
        for (gene, _) in self.genome.iter_mut().zip(mask).filter(|(_, flip)| **flip) {
            *gene ^= 1;
            flipped += 1;
        }
        if flipped > 0 {
            self.fitness = FitnessState::Unevaluated;
        }
        Ok(flipped)
    }

    /// Genome rendered as comma separated bits, e.g. `1,0,1,1`
    pub fn genome_string(&self) -> String {
        genome_to_string(&self.genome)
    }
}

/// Renders a genome as comma separated bits.
pub fn genome_to_string(genome: &[u8]) -> String {
    genome
        .iter()
        .map(|bit| bit.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

use serde::{Deserialize, Serialize};

/// Number of genes scored together by the block fitness function
pub const BLOCK_SIZE: usize = 4;

/// Score of a block indexed by the number of 1-bits it contains.
/// Both the all-zero and the all-one block are rewarded, everything in between is penalized,
/// which makes the landscape deceptive for a hill climber.
const BLOCK_SCORES: [u32; BLOCK_SIZE + 1] = [3, 2, 1, 0, 4];

/// The fitness functions a run can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessFunction {
    /// Count of 1-bits in the genome
    #[default]
    Simple,
    /// Sum of per-block scores over consecutive 4-bit blocks
    Block,
}

impl FitnessFunction {
    /// Scores a genome.
    ///
    /// # Arguments
    /// * `genome` - Slice of bits (0 or 1)
    ///
    /// # Returns
    /// * `u32` - The fitness of the genome, higher is better
    pub fn evaluate(&self, genome: &[u8]) -> u32 {
        match self {
            FitnessFunction::Simple => genome.iter().map(|&bit| u32::from(bit)).sum(),
            FitnessFunction::Block => genome
                .chunks(BLOCK_SIZE)
                .map(|block| {
                    let ones = block.iter().filter(|&&bit| bit == 1).count();
                    BLOCK_SCORES[ones]
                })
                .sum(),
        }
    }

    /// Highest fitness a genome of `genome_length` bits can reach under this function.
    /// This is the success target of a run.
    pub fn max_fitness(&self, genome_length: usize) -> u32 {
        match self {
            FitnessFunction::Simple => genome_length as u32,
            FitnessFunction::Block => {
                let best_block = BLOCK_SCORES.iter().copied().max().unwrap_or(0);
                (genome_length / BLOCK_SIZE) as u32 * best_block
            }
        }
    }

    /// Checks whether genomes of `genome_length` bits can be scored by this function.
    pub fn supports_length(&self, genome_length: usize) -> bool {
        match self {
            FitnessFunction::Simple => genome_length > 0,
            FitnessFunction::Block => genome_length > 0 && genome_length % BLOCK_SIZE == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_fitness_extremes() {
        for length in 1..=64 {
            assert_eq!(
                FitnessFunction::Simple.evaluate(&vec![1; length]),
                length as u32
            );
            assert_eq!(FitnessFunction::Simple.evaluate(&vec![0; length]), 0);
        }
    }

    #[test]
    fn test_simple_fitness_counts_ones() {
        assert_eq!(FitnessFunction::Simple.evaluate(&[1, 0, 1, 1, 0]), 3);
    }

    #[test]
    fn test_block_fitness_mixed_blocks() {
        // block sums 4 and 0 -> scores 4 and 3
        let genome = [1, 1, 1, 1, 0, 0, 0, 0];
        assert_eq!(FitnessFunction::Block.evaluate(&genome), 7);
    }

    #[test]
    fn test_block_fitness_is_deceptive() {
        assert_eq!(FitnessFunction::Block.evaluate(&[1, 0, 0, 0]), 2);
        assert_eq!(FitnessFunction::Block.evaluate(&[1, 1, 0, 0]), 1);
        assert_eq!(FitnessFunction::Block.evaluate(&[0, 1, 1, 1]), 0);
        assert_eq!(FitnessFunction::Block.evaluate(&[0, 0, 0, 0]), 3);
    }

    #[test]
    fn test_max_fitness_matches_best_genome() {
        for length in [4, 8, 80] {
            let best = vec![1; length];
            assert_eq!(
                FitnessFunction::Simple.max_fitness(length),
                FitnessFunction::Simple.evaluate(&best)
            );
            assert_eq!(
                FitnessFunction::Block.max_fitness(length),
                FitnessFunction::Block.evaluate(&best)
            );
            assert_eq!(FitnessFunction::Block.max_fitness(length), length as u32);
        }
    }

    #[test]
    fn test_supports_length() {
        assert!(FitnessFunction::Simple.supports_length(7));
        assert!(!FitnessFunction::Simple.supports_length(0));
        assert!(FitnessFunction::Block.supports_length(8));
        assert!(!FitnessFunction::Block.supports_length(10));
    }
}

//! Seeded train/test partitioning and mini-batch scheduling.

use crate::common::*;

/// Sample indexes of the two disjoint partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndexes {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Randomly holds out `ceil(test_size * n)` of `n` samples for testing.
///
/// The permutation only depends on `n` and `seed`, so identical inputs
/// always yield identical partitions.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> Result<SplitIndexes> {
    ensure!(
        test_size > 0.0 && test_size < 1.0,
        "test_size must be in range of (0, 1), but get {}",
        test_size
    );

    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    ensure!(
        n_test > 0 && n_train > 0,
        "cannot split {} samples with test_size {}, both partitions must be non-empty",
        n,
        test_size
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indexes: Vec<usize> = (0..n).collect();
    indexes.shuffle(&mut rng);

    let train = indexes.split_off(n_test);
    Ok(SplitIndexes {
        train,
        test: indexes,
    })
}

/// Shuffles `0..n` and cuts it into batches of at most `batch_size` indexes.
pub fn batch_indexes<R>(n: usize, batch_size: usize, rng: &mut R) -> Vec<Vec<usize>>
where
    R: Rng,
{
    let mut indexes: Vec<usize> = (0..n).collect();
    indexes.shuffle(rng);
    indexes
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sizes() -> Result<()> {
        let split = train_test_split(10, 0.2, 7)?;
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 8);

        let split = train_test_split(11, 0.2, 7)?;
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 8);
        Ok(())
    }

    #[test]
    fn split_is_a_partition() -> Result<()> {
        let split = train_test_split(50, 0.2, 694_201_337)?;
        let all: Vec<_> = split
            .train
            .iter()
            .chain(split.test.iter())
            .copied()
            .sorted()
            .collect();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn split_is_deterministic() -> Result<()> {
        let lhs = train_test_split(100, 0.2, 694_201_337)?;
        let rhs = train_test_split(100, 0.2, 694_201_337)?;
        assert_eq!(lhs, rhs);
        Ok(())
    }

    #[test]
    fn split_rejects_degenerate_inputs() {
        assert!(train_test_split(1, 0.2, 0).is_err());
        assert!(train_test_split(10, 0.0, 0).is_err());
        assert!(train_test_split(10, 1.0, 0).is_err());
    }

    #[test]
    fn batches_cover_all_indexes() {
        let mut rng = StdRng::seed_from_u64(1);
        let batches = batch_indexes(70, 32, &mut rng);
        assert_eq!(
            batches.iter().map(|batch| batch.len()).collect::<Vec<_>>(),
            vec![32, 32, 6]
        );
        let all: Vec<_> = batches.into_iter().flatten().sorted().collect();
        assert_eq!(all, (0..70).collect::<Vec<_>>());
    }
}

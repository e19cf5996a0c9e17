//! Seeded train/test partitioning and k-fold cross-validation

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::FitError;

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn shuffled(n: usize, seed: u64) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(&mut StdRng::seed_from_u64(seed));
    perm
}

/// Shuffle `0..n` with `seed` and hold out `ceil(test_fraction · n)` rows
///
/// The first rows of the permutation form the test set. Both sides are
/// kept non-empty.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Result<TrainTestSplit, FitError> {
    if n < 2 {
        return Err(FitError::TooFewSamples {
            available: n,
            required: 2,
        });
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(FitError::InvalidParameter(format!(
            "test fraction must be in (0, 1), got {test_fraction}"
        )));
    }
    let n_test = ((test_fraction * n as f64).ceil() as usize).clamp(1, n - 1);
    let mut perm = shuffled(n, seed);
    let train = perm.split_off(n_test);
    Ok(TrainTestSplit { train, test: perm })
}

/// K-fold splitter with a seeded shuffle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    pub n_splits: usize,
    pub seed: u64,
}

impl KFold {
    #[must_use]
    pub const fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// `(train, validation)` index pairs
    ///
    /// The first `n % k` folds hold one extra row.
    pub fn split(&self, n: usize) -> Result<Vec<TrainTestSplit>, FitError> {
        if self.n_splits < 2 || n < self.n_splits {
            return Err(FitError::TooFewSamples {
                available: n,
                required: self.n_splits.max(2),
            });
        }
        let perm = shuffled(n, self.seed);
        let base = n / self.n_splits;
        let extra = n % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for k in 0..self.n_splits {
            let size = base + usize::from(k < extra);
            let test = perm[start..start + size].to_vec();
            let train = perm[..start]
                .iter()
                .chain(&perm[start + size..])
                .copied()
                .collect();
            folds.push(TrainTestSplit { train, test });
            start += size;
        }
        Ok(folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes_and_reproducibility() {
        let a = train_test_split(10, 0.3, 42).unwrap();
        assert_eq!(a.test.len(), 3);
        assert_eq!(a.train.len(), 7);
        assert_eq!(a, train_test_split(10, 0.3, 42).unwrap());

        let mut all: Vec<usize> = a.train.iter().chain(&a.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_ceil_of_test_fraction() {
        assert_eq!(train_test_split(11, 0.3, 0).unwrap().test.len(), 4);
    }

    #[test]
    fn test_kfold_partitions_rows() {
        let folds = KFold::new(3, 1).split(10).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.test.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert!(folds.iter().all(|f| f.train.len() + f.test.len() == 10));
    }

    #[test]
    fn test_too_few_rows() {
        assert!(KFold::new(5, 0).split(4).is_err());
        assert!(train_test_split(1, 0.3, 0).is_err());
    }
}

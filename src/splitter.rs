//! Percentage split of one dataset into training and test data.
//!
//! The first `round(N * P / 100)` instances become training data and the rest
//! test data. Source order is preserved; nothing is shuffled.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::arff::Dataset;
use crate::error::ConfigError;

/// Splits datasets by training percentage.
#[derive(Debug, Clone, Copy)]
pub struct DataSplitter {
    percentage_train: u8,
}

impl DataSplitter {
    pub fn new(percentage_train: i64) -> std::result::Result<Self, ConfigError> {
        if !(0..=100).contains(&percentage_train) {
            return Err(ConfigError::InvalidPercentage(percentage_train));
        }
        Ok(Self {
            percentage_train: percentage_train as u8,
        })
    }

    pub fn percentage_train(&self) -> u8 {
        self.percentage_train
    }

    /// Number of training instances for a dataset of `total` rows.
    pub fn training_size(&self, total: usize) -> usize {
        let size = (total as f64 * self.percentage_train as f64 / 100.0).round() as usize;
        size.min(total)
    }

    /// Returns `(training, test)`.
    pub fn split(&self, dataset: &Dataset) -> (Dataset, Dataset) {
        let train_size = self.training_size(dataset.len());
        let (train, test) = dataset.instances().split_at(train_size);
        debug!(
            "Split {} instances into {} training and {} test",
            dataset.len(),
            train.len(),
            test.len()
        );
        (
            dataset.with_instances(train.to_vec()),
            dataset.with_instances(test.to_vec()),
        )
    }

    /// Splits an ARFF file, writing `training.arff` and `test.arff` to `workdir`.
    pub fn split_file(&self, arff: &Path, workdir: &Path) -> Result<(PathBuf, PathBuf)> {
        let dataset = Dataset::load(arff)?;
        let (train, test) = self.split(&dataset);

        let train_path = workdir.join("training.arff");
        let test_path = workdir.join("test.arff");
        train.save(&train_path)?;
        test.save(&test_path)?;
        Ok((train_path, test_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arff::{Attribute, Instance};

    fn dataset(n: usize) -> Dataset {
        let mut ds = Dataset::new(
            "flows",
            vec![
                Attribute::numeric("id"),
                Attribute::nominal("Label", vec!["Normal".into(), "Botnet".into()]),
            ],
        );
        for i in 0..n {
            ds.push(Instance::new(vec![Some(i as f64), Some((i % 2) as f64)]))
                .unwrap();
        }
        ds
    }

    #[test]
    fn test_sizes_sum_to_total() {
        for (n, p) in [(10, 80), (7, 50), (3, 33), (101, 80), (1, 49), (0, 80)] {
            let splitter = DataSplitter::new(p).unwrap();
            let (train, test) = splitter.split(&dataset(n));
            let expected = (n as f64 * p as f64 / 100.0).round() as usize;
            assert_eq!(train.len(), expected, "n={} p={}", n, p);
            assert_eq!(train.len() + test.len(), n);
        }
    }

    #[test]
    fn test_split_is_disjoint_and_ordered() {
        let splitter = DataSplitter::new(80).unwrap();
        let (train, test) = splitter.split(&dataset(20));

        for a in train.instances() {
            assert!(!test.instances().contains(a));
        }
        assert_eq!(train.instances()[0].value(0), Some(0.0));
        assert_eq!(test.instances()[0].value(0), Some(16.0));
        assert_eq!(train.attributes(), test.attributes());
    }

    #[test]
    fn test_extreme_percentages() {
        let (train, test) = DataSplitter::new(0).unwrap().split(&dataset(5));
        assert!(train.is_empty());
        assert_eq!(test.len(), 5);

        let (train, test) = DataSplitter::new(100).unwrap().split(&dataset(5));
        assert_eq!(train.len(), 5);
        assert!(test.is_empty());
    }

    #[test]
    fn test_invalid_percentage() {
        assert_eq!(
            DataSplitter::new(101).unwrap_err(),
            ConfigError::InvalidPercentage(101)
        );
        assert!(DataSplitter::new(-1).is_err());
    }

    #[test]
    fn test_split_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("all.arff");
        dataset(10).save(&src).unwrap();

        let splitter = DataSplitter::new(70).unwrap();
        let (train, test) = splitter.split_file(&src, dir.path()).unwrap();
        assert_eq!(Dataset::load(&train).unwrap().len(), 7);
        assert_eq!(Dataset::load(&test).unwrap().len(), 3);
    }
}

//! Loads the training and test ARFF files of a prepared data folder.
//!
//! Layout: `<folder>/training/data.arff` and `<folder>/test/data.arff`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::arff::Dataset;
use crate::error::ConfigError;

pub const ARFF_FILENAME: &str = "data.arff";
pub const TRAINING_DIR: &str = "training";
pub const TEST_DIR: &str = "test";

/// Path of the training ARFF below `folder`.
pub fn training_path(folder: &Path) -> PathBuf {
    folder.join(TRAINING_DIR).join(ARFF_FILENAME)
}

/// Path of the test ARFF below `folder`.
pub fn test_path(folder: &Path) -> PathBuf {
    folder.join(TEST_DIR).join(ARFF_FILENAME)
}

/// Parses a comma-separated list of column indices such as `"3,6,9,10,"`.
/// Empty items are ignored.
pub fn parse_columns(list: &str) -> std::result::Result<Vec<usize>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<usize>()
                .map_err(|_| ConfigError::InvalidColumn(item.to_string()))
        })
        .collect()
}

/// Reads training/test data, converting the configured columns to nominal.
#[derive(Debug, Clone)]
pub struct ArffLoader {
    folder: PathBuf,
    nominal_columns: Vec<usize>,
}

impl ArffLoader {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            nominal_columns: Vec::new(),
        }
    }

    pub fn with_nominal_columns(folder: impl Into<PathBuf>, columns: Vec<usize>) -> Self {
        Self {
            folder: folder.into(),
            nominal_columns: columns,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn load_training(&self) -> Result<Dataset> {
        self.load(&training_path(&self.folder))
    }

    pub fn load_test(&self) -> Result<Dataset> {
        self.load(&test_path(&self.folder))
    }

    fn load(&self, path: &Path) -> Result<Dataset> {
        if !path.is_file() {
            anyhow::bail!("Arff file not found: {}", path.display());
        }
        let mut dataset = Dataset::load(path)?;
        if !self.nominal_columns.is_empty() {
            dataset
                .numeric_to_nominal(&self.nominal_columns)
                .with_context(|| format!("Failed to convert columns of {}", path.display()))?;
        }
        debug!(
            "Loaded {} from {} ({} instances, {} attributes)",
            dataset.relation(),
            path.display(),
            dataset.len(),
            dataset.num_attributes()
        );
        Ok(dataset)
    }
}

//! CTU-13 scenario lookup.
//!
//! The dataset folder holds one sub-folder per scenario, named by its number,
//! each containing the labelled flow CSV.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::ConfigError;

/// Locates scenario CSV files below a CTU-13 folder.
#[derive(Debug, Clone)]
pub struct CtuManager {
    folder: PathBuf,
    csv_filename: String,
}

impl CtuManager {
    pub fn new(folder: impl Into<PathBuf>, csv_filename: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            csv_filename: csv_filename.into(),
        }
    }

    /// Path of the flow file for one scenario (not checked for existence).
    pub fn scenario_path(&self, scenario: u32) -> PathBuf {
        self.folder
            .join(scenario.to_string())
            .join(&self.csv_filename)
    }

    /// Returns the flow files of `scenarios` in the given order.
    pub fn find(&self, scenarios: &[u32]) -> Result<Vec<PathBuf>> {
        if scenarios.is_empty() {
            return Err(ConfigError::NoScenarios.into());
        }
        if !self.folder.is_dir() {
            anyhow::bail!("CTU folder not found: {}", self.folder.display());
        }

        scenarios
            .iter()
            .map(|&scenario| {
                let path = self.scenario_path(scenario);
                ensure_file(&path)
                    .with_context(|| format!("Failed to locate CTU scenario {}", scenario))?;
                debug!("Scenario {} -> {}", scenario, path.display());
                Ok(path)
            })
            .collect()
    }
}

fn ensure_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        anyhow::bail!("File not found: {}", path.display())
    }
}

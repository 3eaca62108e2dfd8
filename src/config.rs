//! Configuration Module
//!
//! Provides TOML-based configuration for ctu-ids.
//! Configuration is optional - CLI arguments override file settings.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub prepare: PrepareConfig,
    pub ids: IdsConfig,
    pub labels: LabelConfig,
}

impl Config {
    /// Loads configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads configuration from file if given, otherwise returns defaults.
    ///
    /// An explicitly requested file that cannot be read is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Generates a default configuration file content
    pub fn generate_default() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| "# Failed to generate config".to_string())
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.prepare.percentage_train > 100 {
            anyhow::bail!("percentage_train must be between 0 and 100");
        }
        if self.prepare.csv_filename.trim().is_empty() {
            anyhow::bail!("csv_filename must not be empty");
        }
        if self.ids.classifier.trim().is_empty() {
            anyhow::bail!("classifier must not be empty");
        }
        let labels = [
            &self.labels.background,
            &self.labels.normal,
            &self.labels.botnet,
        ];
        if labels.iter().any(|l| l.trim().is_empty()) {
            anyhow::bail!("label names must not be empty");
        }
        if labels[0] == labels[1] || labels[0] == labels[2] || labels[1] == labels[2] {
            anyhow::bail!("label names must be distinct");
        }
        Ok(())
    }
}

/// Data preparation defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PrepareConfig {
    /// Folder holding one sub-folder per CTU-13 scenario
    pub ctu_folder: String,
    /// Flow file name inside each scenario folder
    pub csv_filename: String,
    /// Share of instances used for training
    pub percentage_train: u8,
    /// Parent of generated destination folders
    pub dest_parent: String,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            ctu_folder: "./CTU13/".to_string(),
            csv_filename: "netflow.csv".to_string(),
            percentage_train: 80,
            dest_parent: "./".to_string(),
        }
    }
}

/// Train/test defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdsConfig {
    /// Classifier used when --classifier is absent
    pub classifier: String,
    /// Hyperparameters used when --parameters is absent
    pub parameters: Vec<String>,
    /// Columns converted to nominal when --nominal is absent
    pub nominal: Option<String>,
}

impl Default for IdsConfig {
    fn default() -> Self {
        Self {
            classifier: "lnns".to_string(),
            parameters: Vec::new(),
            nominal: None,
        }
    }
}

/// Names of the three traffic classes in the label column
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LabelConfig {
    pub background: String,
    pub normal: String,
    pub botnet: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            background: "Background".to_string(),
            normal: "Normal".to_string(),
            botnet: "Botnet".to_string(),
        }
    }
}

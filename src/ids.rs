//! IDS run: train a classifier on an arff folder, evaluate it, or both.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::info;

use crate::classifier::{prepare, ClassifierRegistry, MlAlgo, Model};
use crate::error::ConfigError;
use crate::evaluation::{Evaluater, Evaluation};
use crate::export::{export_json, export_text};
use crate::labels::LabelRegistry;
use crate::loader::{parse_columns, ArffLoader};
use crate::persistence::{ModelPersistence, StagedResults};
use crate::selector::{decide, default_selector, ModelSelector};
use crate::visualizer::Visualizer;

const TRAIN: &str = "train";
const TEST: &str = "test";

/// Which stages a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Both,
    TrainOnly,
    TestOnly,
}

impl Stage {
    /// Absent `--only` means both stages.
    pub fn from_only(only: Option<&str>) -> Result<Self, ConfigError> {
        only.map_or(Ok(Self::Both), |s| s.parse())
    }

    pub fn trains(self) -> bool {
        self != Self::TestOnly
    }

    pub fn tests(self) -> bool {
        self != Self::TrainOnly
    }
}

impl FromStr for Stage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            TRAIN => Ok(Self::TrainOnly),
            TEST => Ok(Self::TestOnly),
            _ => Err(ConfigError::InvalidStage {
                value: s.to_string(),
            }),
        }
    }
}

/// Options of one `ids` run, CLI flags already merged with the config.
#[derive(Debug, Clone)]
pub struct IdsOptions {
    pub arff_folder: PathBuf,
    pub classifier: String,
    pub parameters: Vec<String>,
    pub only: Option<String>,
    pub nominal: Option<String>,
    /// Model file to evaluate when the folder holds several.
    pub model: Option<String>,
}

/// What a run produced.
#[derive(Debug)]
pub struct IdsOutcome {
    pub model: Option<PathBuf>,
    pub evaluation: Option<Evaluation>,
}

pub struct IdsCliManager<'a> {
    options: IdsOptions,
    classifiers: &'a ClassifierRegistry,
    labels: &'a LabelRegistry,
}

impl<'a> IdsCliManager<'a> {
    pub fn new(
        options: IdsOptions,
        classifiers: &'a ClassifierRegistry,
        labels: &'a LabelRegistry,
    ) -> Self {
        Self {
            options,
            classifiers,
            labels,
        }
    }

    /// Runs with the selector matching `--model` and the terminal.
    pub fn run(&self) -> Result<IdsOutcome> {
        let mut selector =
            default_selector(self.options.model.as_deref(), &self.options.arff_folder);
        self.run_with(selector.as_mut())
    }

    pub fn run_with(&self, selector: &mut dyn ModelSelector) -> Result<IdsOutcome> {
        let stage = Stage::from_only(self.options.only.as_deref())?;
        let loader = self.loader()?;

        let mut outcome = IdsOutcome {
            model: None,
            evaluation: None,
        };

        if stage.trains() {
            outcome.model = Some(self.train(&loader)?);
        }

        if stage.tests() {
            let model_path = match outcome.model.clone() {
                Some(path) => path,
                None => {
                    let candidates = ModelPersistence::list(loader.folder())?;
                    decide(&candidates, loader.folder(), selector)?
                }
            };
            outcome.evaluation = Some(self.test(&loader, &model_path)?);
            outcome.model = Some(model_path);
        }

        Ok(outcome)
    }

    fn loader(&self) -> Result<ArffLoader> {
        let folder = self.options.arff_folder.clone();
        Ok(match self.options.nominal.as_deref() {
            Some(columns) => ArffLoader::with_nominal_columns(folder, parse_columns(columns)?),
            None => ArffLoader::new(folder),
        })
    }

    fn train(&self, loader: &ArffLoader) -> Result<PathBuf> {
        info!("--- start {} ---", TRAIN);
        let params = prepare(&self.options.parameters)?;
        let mut model = self.classifiers.create(&self.options.classifier, &params)?;

        let training = loader
            .load_training()
            .context("Failed to load training data")?;
        model
            .train(&training)
            .context("Failed to train classifier")?;
        let path = ModelPersistence::save(&model, loader.folder()).context("Failed to save")?;

        info!("--- finished {} ---", TRAIN);
        Ok(path)
    }

    fn test(&self, loader: &ArffLoader, model_path: &Path) -> Result<Evaluation> {
        info!("--- start {} ---", TEST);
        let model: Model = ModelPersistence::load(model_path)?;
        info!("Evaluating {}", model_path.display());

        let file_name = model_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| model.filename());
        let training = loader
            .load_training()
            .context("Failed to load training data for evaluation")?;
        let test = loader.load_test().context("Failed to load test data")?;

        let evaluation = Evaluater::new(&model, &training, self.labels).evaluate(&test)?;

        let staged = StagedResults::new(loader.folder(), &file_name)?;
        let results = staged.persistence();
        results.save_summary(&export_text(&evaluation, self.labels))?;
        results.save_artifact("metrics.json", &export_json(&evaluation))?;
        Visualizer::new(results).plot_all(&evaluation)?;
        let dir = staged.dir().to_path_buf();
        staged.commit().context("Failed to save results")?;
        info!("Results written to {}", dir.display());

        info!("--- finished {} ---", TEST);
        Ok(evaluation)
    }
}

//! Filesystem persistence of trained models and evaluation results.
//!
//! Models live directly in the arff folder as `<model filename>.model`
//! (JSON). Evaluation artifacts go to `<arff folder>/results/` and are
//! prefixed with the model's file name, so results of different models
//! never collide. They are rendered into a scratch folder first and only
//! renamed into `results/` once every artifact of the run was written.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::classifier::{MlAlgo, Model};

pub const MODEL_EXTENSION: &str = "model";
pub const RESULTS_DIR: &str = "results";

/// Saves and restores trained models.
pub struct ModelPersistence;

impl ModelPersistence {
    /// Writes `model` to `<folder>/<model.filename()>.model`.
    pub fn save(model: &Model, folder: &Path) -> Result<PathBuf> {
        fs::create_dir_all(folder)
            .with_context(|| format!("Failed to create folder: {}", folder.display()))?;
        let path = folder.join(format!("{}.{}", model.filename(), MODEL_EXTENSION));

        let file = File::create(&path)
            .with_context(|| format!("Failed to create model file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, model)
            .with_context(|| format!("Failed to serialize model: {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to write model file: {}", path.display()))?;

        info!("Model saved to {}", path.display());
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Model> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open model file: {}", path.display()))?;
        let model = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to deserialize model: {}", path.display()))?;
        debug!("Model loaded from {}", path.display());
        Ok(model)
    }

    /// All model files directly under `folder`, sorted by name.
    pub fn list(folder: &Path) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(folder)
            .with_context(|| format!("Failed to read folder: {}", folder.display()))?;

        let mut models = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to read folder: {}", folder.display()))?
                .path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == MODEL_EXTENSION) {
                models.push(path);
            }
        }
        models.sort();
        Ok(models)
    }
}

/// Writes evaluation artifacts for one model.
#[derive(Debug, Clone)]
pub struct ResultPersistence {
    dir: PathBuf,
    model_name: String,
}

impl ResultPersistence {
    /// `model_file_name` is the persisted model's file name, with or
    /// without extension.
    pub fn new(arff_folder: &Path, model_file_name: &str) -> Self {
        let model_name = Path::new(model_file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| model_file_name.to_string());
        Self {
            dir: arff_folder.join(RESULTS_DIR),
            model_name,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact with the given suffix, e.g. `summary.txt`.
    pub fn artifact_path(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}_{}", self.model_name, suffix))
    }

    pub fn save_summary(&self, summary: &str) -> Result<PathBuf> {
        self.save_artifact("summary.txt", summary)
    }

    pub fn save_artifact(&self, suffix: &str, content: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create folder: {}", self.dir.display()))?;
        let path = self.artifact_path(suffix);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write result file: {}", path.display()))?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Result artifacts of one evaluation, staged in a scratch folder inside the
/// arff folder until [`StagedResults::commit`].
pub struct StagedResults {
    scratch: TempDir,
    staging: ResultPersistence,
    target: ResultPersistence,
}

impl StagedResults {
    pub fn new(arff_folder: &Path, model_file_name: &str) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix(".results-")
            .tempdir_in(arff_folder)
            .with_context(|| {
                format!("Failed to create scratch folder in {}", arff_folder.display())
            })?;
        let target = ResultPersistence::new(arff_folder, model_file_name);
        let staging = ResultPersistence {
            dir: scratch.path().to_path_buf(),
            model_name: target.model_name.clone(),
        };
        Ok(Self {
            scratch,
            staging,
            target,
        })
    }

    /// Where artifacts are written before the commit.
    pub fn persistence(&self) -> &ResultPersistence {
        &self.staging
    }

    /// Final location of the artifacts.
    pub fn dir(&self) -> &Path {
        self.target.dir()
    }

    /// Moves every staged artifact into `results/`. Dropping without a
    /// commit discards them.
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        let dir = self.target.dir();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create folder: {}", dir.display()))?;

        let entries = fs::read_dir(self.scratch.path()).with_context(|| {
            format!("Failed to read folder: {}", self.scratch.path().display())
        })?;
        let mut staged = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| {
                format!("Failed to read folder: {}", self.scratch.path().display())
            })?;
            staged.push(entry.file_name());
        }
        staged.sort();

        let mut written = Vec::with_capacity(staged.len());
        for name in staged {
            let from = self.scratch.path().join(&name);
            let to = dir.join(&name);
            fs::rename(&from, &to).with_context(|| {
                format!("Failed to move {} to {}", from.display(), to.display())
            })?;
            debug!("Committed {}", to.display());
            written.push(to);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arff::{Attribute, Dataset, Instance};
    use crate::classifier::{ClassifierRegistry, Param};

    fn trained_model(k: &str) -> Model {
        let mut ds = Dataset::new(
            "t",
            vec![
                Attribute::numeric("x"),
                Attribute::nominal("Label", vec!["Normal".into(), "Botnet".into()]),
            ],
        );
        for i in 0..4 {
            ds.push(Instance::new(vec![Some(i as f64), Some((i / 2) as f64)]))
                .unwrap();
        }
        let mut model = ClassifierRegistry::new()
            .create("lnns", &[Param::new("k", k)])
            .unwrap();
        model.train(&ds).unwrap();
        model
    }

    #[test]
    fn test_save_load_list() {
        let dir = tempfile::tempdir().unwrap();
        let a = ModelPersistence::save(&trained_model("3"), dir.path()).unwrap();
        let b = ModelPersistence::save(&trained_model("1"), dir.path()).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(
            a.file_name().unwrap(),
            "nearestNeighbour_k=3_n=4_distweight=none.model"
        );
        let listed = ModelPersistence::list(dir.path()).unwrap();
        assert_eq!(listed, vec![b.clone(), a.clone()]);

        let restored = ModelPersistence::load(&a).unwrap();
        assert_eq!(restored.filename(), "nearestNeighbour_k=3_n=4_distweight=none");
    }

    #[test]
    fn test_load_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.model");
        fs::write(&path, "not json").unwrap();
        assert!(ModelPersistence::load(&path).is_err());
    }

    #[test]
    fn test_result_files_named_after_model() {
        let dir = tempfile::tempdir().unwrap();
        let results = ResultPersistence::new(dir.path(), "nearestNeighbour_k=5_n=10_distweight=none.model");
        let path = results.save_summary("hello").unwrap();

        assert_eq!(
            path,
            dir.path()
                .join(RESULTS_DIR)
                .join("nearestNeighbour_k=5_n=10_distweight=none_summary.txt")
        );
        assert_eq!(fs::read_to_string(path).unwrap(), "hello");
    }

    #[test]
    fn test_staged_results_appear_only_on_commit() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedResults::new(dir.path(), "nearestNeighbour_k=1_n=4_distweight=none.model")
            .unwrap();
        staged.persistence().save_summary("summary").unwrap();
        staged.persistence().save_artifact("metrics.json", "{}").unwrap();
        assert!(!dir.path().join(RESULTS_DIR).exists());

        let written = staged.commit().unwrap();
        let results = dir.path().join(RESULTS_DIR);
        assert_eq!(
            written,
            vec![
                results.join("nearestNeighbour_k=1_n=4_distweight=none_metrics.json"),
                results.join("nearestNeighbour_k=1_n=4_distweight=none_summary.txt"),
            ]
        );
        assert_eq!(fs::read_to_string(&written[1]).unwrap(), "summary");
        // only results/ is left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_uncommitted_results_are_discarded() {
        let dir = tempfile::tempdir().unwrap();
        {
            let staged = StagedResults::new(dir.path(), "m.model").unwrap();
            staged.persistence().save_summary("partial").unwrap();
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

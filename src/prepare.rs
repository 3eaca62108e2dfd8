//! Data preparation: CTU-13 scenario CSVs to a training/test arff folder.
//!
//! Intermediate files live in a scratch directory that is removed when the
//! run ends. The final `training/data.arff` and `test/data.arff` are first
//! assembled in a staging folder next to the destination and only then put
//! in place, so a failed run never leaves half a folder behind.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::converter::{convert, CsvLoader};
use crate::ctu::CtuManager;
use crate::error::ConfigError;
use crate::labels::LabelRegistry;
use crate::loader::{test_path, training_path};
use crate::splitter::DataSplitter;

/// Options of one `prepare` run, CLI flags already merged with the config.
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    pub ctu_folder: PathBuf,
    pub csv_filename: String,
    pub scenarios: Vec<u32>,
    pub percentage_train: i64,
    /// Use the last scenario as the test set instead of splitting.
    pub separate_test_scenario: bool,
    pub remove_background: bool,
    /// Explicit destination; generated under `dest_parent` when absent.
    pub dest_folder: Option<PathBuf>,
    pub dest_parent: PathBuf,
}

impl PrepareOptions {
    pub fn destination(&self) -> PathBuf {
        match &self.dest_folder {
            Some(folder) => folder.clone(),
            None => self.dest_parent.join(dest_folder_name(
                &self.scenarios,
                self.percentage_train,
                self.separate_test_scenario,
            )),
        }
    }
}

/// Folder name describing the prepared data, e.g.
/// `scenarios=6,11,12_percentageTrain=80_separateTestScenario=false`.
pub fn dest_folder_name(scenarios: &[u32], percentage_train: i64, separate: bool) -> String {
    let scenarios: Vec<String> = scenarios.iter().map(|s| s.to_string()).collect();
    format!(
        "scenarios={}_percentageTrain={}_separateTestScenario={}",
        scenarios.join(","),
        percentage_train,
        separate
    )
}

/// Runs the data preparation.
pub struct DataCliManager<'a> {
    options: PrepareOptions,
    labels: &'a LabelRegistry,
}

impl<'a> DataCliManager<'a> {
    pub fn new(options: PrepareOptions, labels: &'a LabelRegistry) -> Self {
        Self { options, labels }
    }

    /// Produces the arff folder and returns its path.
    pub fn run(&self) -> Result<PathBuf> {
        debug!("start: run");
        let opts = &self.options;

        if opts.scenarios.is_empty() {
            return Err(ConfigError::NoScenarios.into());
        }
        if opts.separate_test_scenario && opts.scenarios.len() < 2 {
            return Err(ConfigError::TooFewScenarios(opts.scenarios.len()).into());
        }
        let splitter = DataSplitter::new(opts.percentage_train)?;
        let destination = opts.destination();

        let mut csvs = self.scenarios()?;
        let workdir = tempfile::tempdir().context("Failed to create scratch directory")?;
        let loader = CsvLoader::new(self.labels, opts.remove_background);

        if opts.separate_test_scenario {
            debug!("convert separate test scenario");
            let test_csv = csvs
                .pop()
                .ok_or(ConfigError::TooFewScenarios(0))?;
            debug!("extracted test scenario: {}", test_csv.display());
            let test_arff = convert(&[test_csv], &loader, workdir.path(), "test")
                .context("Failed to convert data from csv to arff")?;

            let training_arff = convert(&csvs, &loader, workdir.path(), "training")
                .context("Failed to convert data from csv to arff")?;

            place(&training_arff, &test_arff, &destination)?;
        } else {
            let arff = convert(&csvs, &loader, workdir.path(), "combined")
                .context("Failed to convert data from csv to arff")?;

            debug!(
                "split into training and test, {}% training",
                splitter.percentage_train()
            );
            let (training, test) = splitter
                .split_file(&arff, workdir.path())
                .context("Failed to split data into training and test instances")?;
            place(&training, &test, &destination)?;
        }

        info!("Arff files moved to: {}", destination.display());
        debug!("finished: run");
        Ok(destination)
    }

    fn scenarios(&self) -> Result<Vec<PathBuf>> {
        let ctu = CtuManager::new(&self.options.ctu_folder, self.options.csv_filename.as_str());
        let csvs = ctu
            .find(&self.options.scenarios)
            .context("Failed to load ctu scenarios")?;
        debug!("list of scenarios {:?}", csvs);
        Ok(csvs)
    }
}

/// Puts a training and a test arff into `destination`.
///
/// Both files are staged in a sibling folder first. A new destination is
/// created by renaming that folder; an existing one gets each file renamed
/// over the old one.
fn place(training: &Path, test: &Path, destination: &Path) -> Result<()> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .with_context(|| format!("Failed to create folder: {}", parent.display()))?;
    let staging = tempfile::Builder::new()
        .prefix(".prepare-")
        .tempdir_in(&parent)
        .with_context(|| format!("Failed to create staging folder in {}", parent.display()))?;

    move_to(training, &training_path(staging.path()))?;
    move_to(test, &test_path(staging.path()))?;

    if destination.exists() {
        for staged in [training_path(staging.path()), test_path(staging.path())] {
            let target = destination.join(staged.strip_prefix(staging.path())?);
            move_to(&staged, &target)?;
        }
    } else {
        fs::rename(staging.path(), destination).with_context(|| {
            format!(
                "Failed to move {} to {}",
                staging.path().display(),
                destination.display()
            )
        })?;
    }
    Ok(())
}

/// Moves `from` to `to`, creating parent folders. Falls back to copying when
/// the scratch directory is on another filesystem.
fn move_to(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create folder: {}", parent.display()))?;
    }
    if fs::rename(from, to).is_err() {
        fs::copy(from, to).with_context(|| {
            format!(
                "Failed to move arff file to destination folder, from: {}, to: {}",
                from.display(),
                to.display()
            )
        })?;
        fs::remove_file(from).with_context(|| format!("Failed to remove {}", from.display()))?;
    }
    debug!("moved {} to {}", from.display(), to.display());
    Ok(())
}

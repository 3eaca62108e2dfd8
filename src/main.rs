//! CTU-IDS: botnet detection on the CTU-13 flow dataset.
//!
//! Two stages, each a subcommand:
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌─────────────────┐
//! │ CTU-13 CSVs  │────>│    prepare    │────>│  arff folder    │
//! │ (scenarios)  │     │ convert+split │     │ training/ test/ │
//! └──────────────┘     └───────────────┘     └────────┬────────┘
//!                                                     │
//!                      ┌───────────────┐              │
//!                      │      ids      │<─────────────┘
//!                      │ train  / test │────> <model>.model, results/
//!                      └───────────────┘
//! ```
//!
//! - **prepare**: merges scenario CSVs, converts them to ARFF and splits
//!   them into training and test data
//! - **ids**: trains a nearest-neighbour classifier and evaluates it with
//!   Background flows excluded

mod arff;
mod classifier;
mod config;
mod converter;
mod ctu;
mod error;
mod evaluation;
mod export;
mod ids;
mod labels;
mod loader;
mod persistence;
mod prepare;
mod selector;
mod splitter;
mod visualizer;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::classifier::ClassifierRegistry;
use crate::config::Config;
use crate::error::ConfigError;
use crate::export::{export_evaluation, OutputFormat};
use crate::ids::{IdsCliManager, IdsOptions};
use crate::labels::LabelRegistry;
use crate::prepare::{DataCliManager, PrepareOptions};

/// CTU-IDS: intrusion detection on CTU-13 botnet flows.
#[derive(Parser, Debug)]
#[command(name = "ctu-ids")]
#[command(version = "0.1.0")]
#[command(about = "Prepare CTU-13 flow data and train/evaluate a nearest-neighbour IDS")]
#[command(long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (writes to stderr).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert CTU-13 scenarios into a training/test arff folder.
    Prepare {
        /// Path to the ctu13 folder.
        #[arg(short = 'c', long = "ctu")]
        ctu: Option<PathBuf>,

        /// Scenario numbers, e.g. "6,11,12".
        #[arg(short = 's', long = "scenarios", value_delimiter = ',', required = true)]
        scenarios: Vec<u32>,

        /// Percentage of the data for the training set.
        #[arg(short = 'p', long = "percentageTrain", allow_negative_numbers = true)]
        percentage_train: Option<i64>,

        /// Use the last scenario as the test scenario.
        #[arg(short = 't', long = "separateTestScenario")]
        separate_test_scenario: bool,

        /// Destination folder; by default named after its contents.
        #[arg(short = 'd', long = "destFolder")]
        dest_folder: Option<PathBuf>,

        /// Remove all Background instances.
        #[arg(short = 'r', long = "removeBackground")]
        remove_background: bool,
    },

    /// Train and/or evaluate a classifier on an arff folder.
    Ids {
        /// Path to the arff folder.
        #[arg(short = 'f', long = "arffFolder")]
        arff_folder: PathBuf,

        /// Name of the classifier, e.g. "lnns".
        #[arg(short = 'c', long = "classifier")]
        classifier: Option<String>,

        /// Classifier parameters, e.g. "k=5,distweight=inverse".
        #[arg(short = 'p', long = "parameters")]
        parameters: Vec<String>,

        /// Run only one stage: train or test.
        #[arg(short = 'o', long = "only")]
        only: Option<String>,

        /// Column indices to convert to nominal, e.g. "3,6,9".
        #[arg(short = 'n', long = "nominal")]
        nominal: Option<String>,

        /// Model file to evaluate when several exist.
        #[arg(short = 'm', long = "model")]
        model: Option<String>,

        /// Report format on stdout: text, json.
        #[arg(long, default_value = "text")]
        output: OutputFormat,
    },

    /// List the available classifiers.
    ListClassifiers,

    /// Print a default configuration file.
    GenerateConfig,
}

impl Commands {
    /// Name of the subcommand on the command line.
    fn name(&self) -> &'static str {
        match self {
            Self::Prepare { .. } => "prepare",
            Self::Ids { .. } => "ids",
            Self::ListClassifiers => "list-classifiers",
            Self::GenerateConfig => "generate-config",
        }
    }
}

/// Help text of `subcommand`, or of the whole tool when it is unknown.
fn subcommand_help(subcommand: &str) -> String {
    let mut command = Cli::command();
    command.build();
    match command.find_subcommand_mut(subcommand) {
        Some(sub) => sub.render_help().to_string(),
        None => command.render_help().to_string(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let subcommand = cli.command.name();
    match run(cli) {
        Ok(()) => Ok(()),
        Err(e) if e.downcast_ref::<ConfigError>().is_some() => {
            error!("{:#}", e);
            eprintln!("\n{}", subcommand_help(subcommand));
            std::process::exit(2);
        }
        Err(e) => Err(e),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load_or_default(path)?;
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Prepare {
            ctu,
            scenarios,
            percentage_train,
            separate_test_scenario,
            dest_folder,
            remove_background,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let labels = LabelRegistry::new(&config.labels);
            let options = PrepareOptions {
                ctu_folder: ctu.unwrap_or_else(|| PathBuf::from(&config.prepare.ctu_folder)),
                csv_filename: config.prepare.csv_filename.clone(),
                scenarios,
                percentage_train: percentage_train
                    .unwrap_or(i64::from(config.prepare.percentage_train)),
                separate_test_scenario,
                remove_background,
                dest_folder,
                dest_parent: PathBuf::from(&config.prepare.dest_parent),
            };
            let folder = DataCliManager::new(options, &labels).run()?;
            println!("{}", folder.display());
        }

        Commands::Ids {
            arff_folder,
            classifier,
            parameters,
            only,
            nominal,
            model,
            output,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let labels = LabelRegistry::new(&config.labels);
            let options = IdsOptions {
                arff_folder,
                classifier: classifier.unwrap_or_else(|| config.ids.classifier.clone()),
                parameters: if parameters.is_empty() {
                    config.ids.parameters.clone()
                } else {
                    parameters
                },
                only,
                nominal: nominal.or_else(|| config.ids.nominal.clone()),
                model,
            };
            let classifiers = ClassifierRegistry::new();
            let outcome = IdsCliManager::new(options, &classifiers, &labels).run()?;

            if let Some(evaluation) = outcome.evaluation {
                println!("{}", export_evaluation(&evaluation, &labels, output));
            } else if let Some(model) = outcome.model {
                info!("Trained model: {}", model.display());
            }
        }

        Commands::ListClassifiers => {
            println!("Available classifiers:\n");
            for line in ClassifierRegistry::new().description().lines() {
                println!("  {}", line);
            }
        }

        Commands::GenerateConfig => {
            println!("{}", Config::generate_default());
        }
    }

    Ok(())
}

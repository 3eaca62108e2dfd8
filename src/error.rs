//! Domain-specific error types for ctu-ids.
//!
//! Uses `thiserror` for ergonomic error definitions that integrate
//! with the broader `anyhow` error handling strategy.
//!
//! - [`ConfigError`]: operator mistakes (flags, hyperparameters, selection).
//! - [`ArffError`] and [`ClassifierError`]: the "library fault" category,
//!   raised when data cannot be parsed or a classifier rejects it.
//!
//! Plain I/O failures are wrapped with `anyhow::Context` at the call site.

use thiserror::Error;

/// Errors caused by invalid command-line or configuration input.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for --only, expected 'train' or 'test'")]
    InvalidStage { value: String },

    #[error("Malformed parameter '{0}', expected name=value")]
    MalformedParameter(String),

    #[error("Unknown parameter '{name}' for classifier '{classifier}'")]
    UnknownParameter { classifier: String, name: String },

    #[error("Invalid value '{value}' for parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Unknown classifier '{name}', options: {options}")]
    UnknownClassifier { name: String, options: String },

    #[error("Training percentage must be between 0 and 100, got {0}")]
    InvalidPercentage(i64),

    #[error("Invalid column index '{0}' in nominal column list")]
    InvalidColumn(String),

    #[error("At least one scenario is required")]
    NoScenarios,

    #[error("A separate test scenario needs at least two scenarios, got {0}")]
    TooFewScenarios(usize),

    #[error("No trained model found in '{0}'")]
    NoModel(String),

    #[error("Model '{0}' does not exist in the arff folder")]
    ModelNotFound(String),

    #[error("{count} models found in '{folder}', choose one with --model")]
    AmbiguousModel { folder: String, count: usize },

    #[error("Invalid model selection '{0}'")]
    InvalidSelection(String),
}

/// Errors raised while reading, writing or reshaping tabular data.
#[derive(Error, Debug)]
pub enum ArffError {
    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Missing @relation/@attribute header")]
    MissingHeader,

    #[error("Row {row} has {actual} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Column {index} out of range, dataset has {count} attributes")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("Training and test data are not compatible: {0}")]
    SchemaMismatch(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors raised by classifier training and prediction.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Cannot train on an empty dataset")]
    EmptyTrainingSet,

    #[error("Class attribute '{0}' is not nominal")]
    NonNominalClass(String),

    #[error("Instance has {actual} values, model expects {expected}")]
    InstanceWidth { expected: usize, actual: usize },

    #[error("Neighbour search failed: {0}")]
    Search(String),
}

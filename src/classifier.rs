//! Classifier training.
//!
//! Every algorithm family implements [`MlAlgo`] and is one variant of
//! [`Model`], which is what gets persisted. The only family today is
//! nearest-neighbour search over the full training set (`lnns`).
//!
//! # Nearest-neighbour distance
//!
//! For two instances the distance is
//! `sqrt(sum(diff_i^2) / attributes_used)` over all non-class attributes:
//! - numeric: difference of the values normalized by the training range
//! - nominal/string: 0 when equal, 1 otherwise
//! - missing: the largest possible difference
//!
//! The distance is a smartcore [`Distance`] and the `k` closest training
//! instances are found with smartcore's linear search. They vote for their
//! class, weighted by the configured [`DistanceWeighting`], on top of a
//! uniform prior of `1/n` per class.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smartcore::algorithm::neighbour::linear_search::LinearKNNSearch;
use smartcore::metrics::distance::Distance;
use tracing::{debug, warn};

use crate::arff::{Attribute, Dataset, Instance};
use crate::error::{ClassifierError, ConfigError};

/// One `name=value` hyperparameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub value: String,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parses encoded parameters. Each entry may hold several comma-separated
/// `name=value` pairs, e.g. `k=5,dist=20.0,distweight=none`.
pub fn prepare(encoded: &[String]) -> Result<Vec<Param>, ConfigError> {
    encoded
        .iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() && !value.trim().is_empty() => {
                Ok(Param::new(name.trim(), value.trim()))
            }
            _ => Err(ConfigError::MalformedParameter(pair.to_string())),
        })
        .collect()
}

/// Capability shared by all classifier families.
pub trait MlAlgo {
    /// Fits the classifier on the full training set.
    fn train(&mut self, training: &Dataset) -> Result<(), ClassifierError>;

    /// File name (without extension) identifying this model and its
    /// hyperparameters.
    fn filename(&self) -> String;

    /// Attributes of the data the model was trained on, `None` before
    /// training.
    fn schema(&self) -> Option<&[Attribute]>;

    /// Predicts the class label index of `instance`.
    fn classify(&self, instance: &Instance) -> Result<usize, ClassifierError>;

    /// Predicts every instance in order.
    fn classify_all(&self, instances: &[Instance]) -> Result<Vec<usize>, ClassifierError> {
        instances.iter().map(|inst| self.classify(inst)).collect()
    }

    /// Multi-line description for reports.
    fn describe(&self) -> String;
}

/// Vote weighting of the nearest neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceWeighting {
    #[default]
    None,
    /// weight = 1 / (distance + 0.001)
    Inverse,
    /// weight = 1 - distance
    Similarity,
}

impl DistanceWeighting {
    fn weight(&self, distance: f64) -> f64 {
        match self {
            Self::None => 1.0,
            Self::Inverse => 1.0 / (distance + 0.001),
            Self::Similarity => 1.0 - distance,
        }
    }
}

impl FromStr for DistanceWeighting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "inverse" => Ok(Self::Inverse),
            "similarity" => Ok(Self::Similarity),
            _ => Err("expected none, inverse or similarity".to_string()),
        }
    }
}

impl fmt::Display for DistanceWeighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Inverse => write!(f, "inverse"),
            Self::Similarity => write!(f, "similarity"),
        }
    }
}

/// Hyperparameters of the nearest-neighbour classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NnParams {
    pub k: usize,
    /// Validated but not used by the search.
    pub dist: Option<f64>,
    pub weighting: DistanceWeighting,
}

impl Default for NnParams {
    fn default() -> Self {
        Self {
            k: 1,
            dist: None,
            weighting: DistanceWeighting::None,
        }
    }
}

impl NnParams {
    pub fn from_params(classifier: &str, params: &[Param]) -> Result<Self, ConfigError> {
        let mut nn = Self::default();
        for param in params {
            let invalid = |reason: &str| ConfigError::InvalidParameter {
                name: param.name.clone(),
                value: param.value.clone(),
                reason: reason.to_string(),
            };
            match param.name.as_str() {
                "k" => {
                    nn.k = match param.value.parse::<usize>() {
                        Ok(k) if k > 0 => k,
                        _ => return Err(invalid("expected a positive integer")),
                    };
                }
                "dist" => {
                    let dist = match param.value.parse::<f64>() {
                        Ok(d) if d > 0.0 && d.is_finite() => d,
                        _ => return Err(invalid("expected a positive number")),
                    };
                    warn!(
                        "dist={} is accepted but has no effect on the nearest neighbour search",
                        dist
                    );
                    nn.dist = Some(dist);
                }
                "distweight" => {
                    nn.weighting = param
                        .value
                        .parse()
                        .map_err(|reason: String| invalid(&reason))?;
                }
                _ => {
                    return Err(ConfigError::UnknownParameter {
                        classifier: classifier.to_string(),
                        name: param.name.clone(),
                    })
                }
            }
        }
        Ok(nn)
    }
}

/// Value range of a numeric attribute in the training data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Range {
    min: f64,
    max: f64,
}

impl Range {
    fn normalize(&self, value: f64) -> f64 {
        let width = self.max - self.min;
        if width <= 0.0 {
            0.0
        } else {
            (value - self.min) / width
        }
    }
}

/// Range-normalized euclidean distance over feature vectors. `NaN` marks a
/// missing value; `None` ranges belong to nominal and string attributes.
#[derive(Debug, Clone)]
struct IbkDistance {
    ranges: Vec<Option<Range>>,
}

impl Distance<Vec<f64>> for IbkDistance {
    fn distance(&self, a: &Vec<f64>, b: &Vec<f64>) -> f64 {
        if self.ranges.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .ranges
            .iter()
            .zip(a.iter().zip(b))
            .map(|(range, (&x, &y))| {
                let diff = match (x.is_nan(), y.is_nan(), range) {
                    (false, false, Some(range)) => range.normalize(x) - range.normalize(y),
                    (false, true, Some(range)) | (true, false, Some(range)) => {
                        let norm = range.normalize(if x.is_nan() { y } else { x });
                        norm.max(1.0 - norm)
                    }
                    (false, false, None) if x == y => 0.0,
                    _ => 1.0,
                };
                diff * diff
            })
            .sum();
        (sum / self.ranges.len() as f64).sqrt()
    }
}

/// Non-class values of `instance`, missing ones as `NaN`.
fn features(instance: &Instance, class_index: usize) -> Vec<f64> {
    (0..instance.len())
        .filter(|&i| i != class_index)
        .map(|i| instance.value(i).unwrap_or(f64::NAN))
        .collect()
}

/// k-nearest-neighbour classifier with linear search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestNeighbour {
    params: NnParams,
    training: Option<Dataset>,
    ranges: Vec<Option<Range>>,
}

/// Linear search over one trained model's instances.
struct Neighbours<'a> {
    training: &'a Dataset,
    search: LinearKNNSearch<Vec<f64>, IbkDistance>,
}

impl NearestNeighbour {
    pub fn new(params: NnParams) -> Self {
        Self {
            params,
            training: None,
            ranges: Vec::new(),
        }
    }

    pub fn num_training(&self) -> usize {
        self.training.as_ref().map(Dataset::len).unwrap_or(0)
    }

    fn neighbours(&self) -> Result<Neighbours<'_>, ClassifierError> {
        let training = self
            .training
            .as_ref()
            .ok_or(ClassifierError::EmptyTrainingSet)?;
        let class_index = training.class_index();
        let distance = IbkDistance {
            ranges: self
                .ranges
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != class_index)
                .map(|(_, range)| *range)
                .collect(),
        };
        let points = training
            .instances()
            .iter()
            .map(|inst| features(inst, class_index))
            .collect();
        let search = LinearKNNSearch::new(points, distance)
            .map_err(|e| ClassifierError::Search(e.to_string()))?;
        Ok(Neighbours { training, search })
    }

    fn vote(&self, neighbours: &Neighbours<'_>, instance: &Instance) -> Result<usize, ClassifierError> {
        let training = neighbours.training;
        if instance.len() != training.num_attributes() {
            return Err(ClassifierError::InstanceWidth {
                expected: training.num_attributes(),
                actual: instance.len(),
            });
        }

        let k = self.params.k.min(training.len());
        let found = neighbours
            .search
            .find(&features(instance, training.class_index()), k)
            .map_err(|e| ClassifierError::Search(e.to_string()))?;

        let num_classes = training.num_classes();
        let prior = 1.0 / training.len().max(1) as f64;
        let mut distribution = vec![prior; num_classes];
        for (idx, distance, _) in found {
            if let Some(class) = training.instances()[idx].class_label_index() {
                distribution[class] += self.params.weighting.weight(distance);
            }
        }

        let predicted = distribution
            .iter()
            .enumerate()
            .fold((0usize, f64::NEG_INFINITY), |best, (class, &score)| {
                if score > best.1 {
                    (class, score)
                } else {
                    best
                }
            })
            .0;
        Ok(predicted)
    }
}

impl MlAlgo for NearestNeighbour {
    fn train(&mut self, training: &Dataset) -> Result<(), ClassifierError> {
        let class = training.class_attribute();
        if !class.is_nominal() {
            return Err(ClassifierError::NonNominalClass(class.name.clone()));
        }

        let data = training.filtered(|i| i.class_value().is_some());
        if data.is_empty() {
            return Err(ClassifierError::EmptyTrainingSet);
        }

        self.ranges = data
            .attributes()
            .iter()
            .enumerate()
            .map(|(i, attribute)| {
                if !attribute.is_numeric() {
                    return None;
                }
                data.instances()
                    .iter()
                    .filter_map(|inst| inst.value(i))
                    .fold(None, |acc: Option<Range>, v| {
                        Some(match acc {
                            None => Range { min: v, max: v },
                            Some(r) => Range {
                                min: r.min.min(v),
                                max: r.max.max(v),
                            },
                        })
                    })
                    // all values missing: every difference is maximal
                    .or(Some(Range { min: 0.0, max: 0.0 }))
            })
            .collect();

        debug!(
            "Trained nearest neighbour: k={}, n={}, distweight={}",
            self.params.k,
            data.len(),
            self.params.weighting
        );
        self.training = Some(data);
        Ok(())
    }

    fn filename(&self) -> String {
        format!(
            "nearestNeighbour_k={}_n={}_distweight={}",
            self.params.k,
            self.num_training(),
            self.params.weighting
        )
    }

    fn schema(&self) -> Option<&[Attribute]> {
        self.training.as_ref().map(Dataset::attributes)
    }

    fn classify(&self, instance: &Instance) -> Result<usize, ClassifierError> {
        self.vote(&self.neighbours()?, instance)
    }

    fn classify_all(&self, instances: &[Instance]) -> Result<Vec<usize>, ClassifierError> {
        let neighbours = self.neighbours()?;
        instances
            .iter()
            .map(|inst| self.vote(&neighbours, inst))
            .collect()
    }

    fn describe(&self) -> String {
        let mut desc = format!(
            "IBk instance-based classifier\nusing {} nearest neighbour(s) for classification\n\
             linear nearest neighbour search, normalized euclidean distance\n\
             distance weighting: {}\ntraining instances: {}",
            self.params.k,
            self.params.weighting,
            self.num_training()
        );
        if let Some(dist) = self.params.dist {
            desc.push_str(&format!("\ndist: {} (not applied)", dist));
        }
        desc
    }
}

/// A trained (or trainable) model of any supported family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Model {
    NearestNeighbour(NearestNeighbour),
}

impl MlAlgo for Model {
    fn train(&mut self, training: &Dataset) -> Result<(), ClassifierError> {
        match self {
            Self::NearestNeighbour(nn) => nn.train(training),
        }
    }

    fn filename(&self) -> String {
        match self {
            Self::NearestNeighbour(nn) => nn.filename(),
        }
    }

    fn schema(&self) -> Option<&[Attribute]> {
        match self {
            Self::NearestNeighbour(nn) => nn.schema(),
        }
    }

    fn classify(&self, instance: &Instance) -> Result<usize, ClassifierError> {
        match self {
            Self::NearestNeighbour(nn) => nn.classify(instance),
        }
    }

    fn classify_all(&self, instances: &[Instance]) -> Result<Vec<usize>, ClassifierError> {
        match self {
            Self::NearestNeighbour(nn) => nn.classify_all(instances),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::NearestNeighbour(nn) => nn.describe(),
        }
    }
}

/// Builds a model from its parameters.
type ModelFactory = fn(&str, &[Param]) -> Result<Model, ConfigError>;

struct ClassifierEntry {
    name: &'static str,
    description: &'static str,
    factory: ModelFactory,
}

/// Table of the classifiers selectable on the command line.
pub struct ClassifierRegistry {
    entries: Vec<ClassifierEntry>,
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self {
            entries: vec![ClassifierEntry {
                name: "lnns",
                description: "k-nearest neighbour with linear search (k, dist, distweight)",
                factory: |name, params| {
                    Ok(Model::NearestNeighbour(NearestNeighbour::new(
                        NnParams::from_params(name, params)?,
                    )))
                },
            }],
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.name).collect()
    }

    /// One `name: description` line per classifier.
    pub fn description(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}", e.name, e.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn create(&self, name: &str, params: &[Param]) -> Result<Model, ConfigError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| ConfigError::UnknownClassifier {
                name: name.to_string(),
                options: self.names().join(", "),
            })?;
        (entry.factory)(name, params)
    }
}

impl Default for ClassifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_NN_PARAMS: &str = "k=5,dist=20.0,distweight=none";

    fn schema() -> Dataset {
        Dataset::new(
            "synthetic",
            vec![
                Attribute::numeric("x"),
                Attribute::numeric("y"),
                Attribute::nominal(
                    "Label",
                    vec!["Background".into(), "Normal".into(), "Botnet".into()],
                ),
            ],
        )
    }

    /// Two well separated clusters on a deterministic grid.
    fn clusters(n: usize, offset: f64) -> Dataset {
        let mut ds = schema();
        for i in 0..n {
            let jitter_x = (i % 10) as f64 * 0.1 + offset;
            let jitter_y = ((i / 10) % 10) as f64 * 0.1 + offset;
            let (base, class) = if i % 2 == 0 { (0.0, 1.0) } else { (10.0, 2.0) };
            ds.push(Instance::new(vec![
                Some(base + jitter_x),
                Some(base + jitter_y),
                Some(class),
            ]))
            .unwrap();
        }
        ds
    }

    fn basic_model() -> Model {
        let params = prepare(&[BASIC_NN_PARAMS.to_string()]).unwrap();
        ClassifierRegistry::new().create("lnns", &params).unwrap()
    }

    #[test]
    fn test_prepare_params() {
        let params = prepare(&[BASIC_NN_PARAMS.to_string(), "k=3".to_string()]).unwrap();
        assert_eq!(params.len(), 4);
        assert_eq!(params[0], Param::new("k", "5"));
        assert_eq!(params[2], Param::new("distweight", "none"));
        assert_eq!(params[3], Param::new("k", "3"));
    }

    #[test]
    fn test_prepare_malformed() {
        assert_eq!(
            prepare(&["k5".to_string()]).unwrap_err(),
            ConfigError::MalformedParameter("k5".to_string())
        );
        assert!(prepare(&["=5".to_string()]).is_err());
        assert!(prepare(&["k=".to_string()]).is_err());
    }

    #[test]
    fn test_nn_params() {
        let params = prepare(&["k=7,distweight=inverse,dist=2.5".to_string()]).unwrap();
        let nn = NnParams::from_params("lnns", &params).unwrap();
        assert_eq!(nn.k, 7);
        assert_eq!(nn.weighting, DistanceWeighting::Inverse);
        assert_eq!(nn.dist, Some(2.5));
    }

    #[test]
    fn test_nn_params_rejects_bad_values() {
        for bad in ["k=0", "k=-1", "k=abc", "dist=0", "dist=-2", "distweight=square"] {
            let params = prepare(&[bad.to_string()]).unwrap();
            assert!(
                matches!(
                    NnParams::from_params("lnns", &params),
                    Err(ConfigError::InvalidParameter { .. })
                ),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_unknown_parameter_is_fatal() {
        let params = prepare(&["neighbours=3".to_string()]).unwrap();
        assert_eq!(
            NnParams::from_params("lnns", &params).unwrap_err(),
            ConfigError::UnknownParameter {
                classifier: "lnns".to_string(),
                name: "neighbours".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_classifier() {
        let err = ClassifierRegistry::new().create("svm", &[]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownClassifier { .. }));
        assert!(err.to_string().contains("lnns"));
    }

    #[test]
    fn test_filename_encodes_hyperparameters() {
        let mut model = basic_model();
        model.train(&clusters(100, 0.0)).unwrap();
        assert_eq!(model.filename(), "nearestNeighbour_k=5_n=100_distweight=none");
    }

    #[test]
    fn test_k5_separates_clusters() {
        let mut model = basic_model();
        model.train(&clusters(100, 0.0)).unwrap();

        let test = clusters(50, 0.05);
        let correct = test
            .instances()
            .iter()
            .filter(|inst| model.classify(inst).unwrap() == inst.class_label_index().unwrap())
            .count();
        assert!(correct >= 45, "only {} of 50 correct", correct);
    }

    #[test]
    fn test_weightings_agree_on_clear_cases() {
        for weighting in ["none", "inverse", "similarity"] {
            let params = prepare(&[format!("k=3,distweight={}", weighting)]).unwrap();
            let mut model = ClassifierRegistry::new().create("lnns", &params).unwrap();
            model.train(&clusters(40, 0.0)).unwrap();

            let near_botnet = Instance::new(vec![Some(10.2), Some(10.3), None]);
            assert_eq!(model.classify(&near_botnet).unwrap(), 2, "{}", weighting);
            let near_normal = Instance::new(vec![Some(0.1), Some(0.4), None]);
            assert_eq!(model.classify(&near_normal).unwrap(), 1, "{}", weighting);
        }
    }

    #[test]
    fn test_distance_normalizes_and_handles_missing() {
        let distance = IbkDistance {
            ranges: vec![Some(Range { min: 0.0, max: 10.0 }), None],
        };
        let a = vec![0.0, 1.0];
        assert_eq!(distance.distance(&a, &vec![0.0, 1.0]), 0.0);
        // half the range on one of two attributes
        let d = distance.distance(&a, &vec![5.0, 1.0]);
        assert!((d - (0.125f64).sqrt()).abs() < 1e-12);
        // a different label counts fully
        let d = distance.distance(&a, &vec![0.0, 2.0]);
        assert!((d - (0.5f64).sqrt()).abs() < 1e-12);
        // missing numeric: the larger side of the range, missing label: 1
        let d = distance.distance(&vec![2.0, f64::NAN], &vec![f64::NAN, 1.0]);
        assert!((d - ((0.64 + 1.0) / 2.0f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let params = prepare(&["k=50".to_string()]).unwrap();
        let mut model = ClassifierRegistry::new().create("lnns", &params).unwrap();
        model.train(&clusters(6, 0.0)).unwrap();
        let inst = Instance::new(vec![Some(10.0), Some(10.0), None]);
        // all six neighbours vote, three per class: lowest index wins
        assert_eq!(model.classify(&inst).unwrap(), 1);
    }

    #[test]
    fn test_classify_all_matches_classify() {
        let mut model = basic_model();
        model.train(&clusters(40, 0.0)).unwrap();
        let test = clusters(20, 0.05);

        let batch = model.classify_all(test.instances()).unwrap();
        let single: Vec<usize> = test
            .instances()
            .iter()
            .map(|inst| model.classify(inst).unwrap())
            .collect();
        assert_eq!(batch, single);
    }

    #[test]
    fn test_schema_is_the_training_header() {
        let mut model = basic_model();
        assert!(model.schema().is_none());
        let training = clusters(10, 0.0);
        model.train(&training).unwrap();
        assert_eq!(model.schema(), Some(training.attributes()));
    }

    #[test]
    fn test_wrong_instance_width() {
        let mut model = basic_model();
        model.train(&clusters(10, 0.0)).unwrap();
        assert!(matches!(
            model.classify(&Instance::new(vec![Some(1.0), None])),
            Err(ClassifierError::InstanceWidth {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_train_rejects_empty_data() {
        let mut model = basic_model();
        assert!(matches!(
            model.train(&schema()),
            Err(ClassifierError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn test_classify_before_training() {
        let model = basic_model();
        let inst = Instance::new(vec![Some(0.0), Some(0.0), None]);
        assert!(model.classify(&inst).is_err());
    }

    #[test]
    fn test_model_serde_roundtrip_predicts_same() {
        let mut model = basic_model();
        model.train(&clusters(30, 0.0)).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"family\":\"nearest_neighbour\""));

        let restored: Model = serde_json::from_str(&json).unwrap();
        let inst = Instance::new(vec![Some(9.8), Some(10.1), None]);
        assert_eq!(
            restored.classify(&inst).unwrap(),
            model.classify(&inst).unwrap()
        );
        assert_eq!(restored.filename(), model.filename());
    }
}

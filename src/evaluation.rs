//! Evaluation of a trained model against test data.
//!
//! Background flows are unlabelled noise and are removed before the model is
//! run. Metrics treat Botnet as the positive and Normal as the negative
//! class; their positions in the confusion matrix come from [`ClassIndexs`].

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::arff::Dataset;
use crate::classifier::{MlAlgo, Model};
use crate::error::ArffError;
use crate::labels::{ClassIndexs, LabelRegistry};

/// Square matrix of counts, rows = actual class, columns = predicted class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    labels: Vec<String>,
    counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn new(labels: Vec<String>) -> Self {
        let n = labels.len();
        Self {
            labels,
            counts: vec![vec![0; n]; n],
        }
    }

    pub fn add(&mut self, actual: usize, predicted: usize) {
        self.counts[actual][predicted] += 1;
    }

    pub fn get(&self, actual: usize, predicted: usize) -> u64 {
        self.counts
            .get(actual)
            .and_then(|row| row.get(predicted))
            .copied()
            .unwrap_or(0)
    }

    /// Count at the crossing of two optional class positions; 0 when
    /// either class is absent.
    fn at(&self, actual: Option<usize>, predicted: Option<usize>) -> u64 {
        match (actual, predicted) {
            (Some(a), Some(p)) => self.get(a, p),
            _ => 0,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn rows(&self) -> &[Vec<u64>] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> u64 {
        (0..self.counts.len()).map(|i| self.counts[i][i]).sum()
    }
}

/// Binary outcome counts with Botnet positive and Normal negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Metrics {
    pub tp: u64,
    pub fp: u64,
    pub tn: u64,
    pub fn_: u64,
}

impl Metrics {
    pub fn from_confusion(matrix: &ConfusionMatrix, idx: &ClassIndexs) -> Self {
        Self {
            tp: matrix.at(idx.botnet, idx.botnet),
            fn_: matrix.at(idx.botnet, idx.normal),
            fp: matrix.at(idx.normal, idx.botnet),
            tn: matrix.at(idx.normal, idx.normal),
        }
    }

    /// Recall.
    pub fn true_positive_rate(&self) -> Option<f64> {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn false_positive_rate(&self) -> Option<f64> {
        ratio(self.fp, self.fp + self.tn)
    }

    /// Specificity.
    pub fn true_negative_rate(&self) -> Option<f64> {
        ratio(self.tn, self.tn + self.fp)
    }

    pub fn false_negative_rate(&self) -> Option<f64> {
        ratio(self.fn_, self.fn_ + self.tp)
    }
}

fn ratio(num: u64, den: u64) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}

/// Outcome of one evaluation run.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub timestamp: DateTime<Utc>,
    pub classifier: String,
    /// Test set size before Background removal.
    pub size_with_background: usize,
    pub background_removed: usize,
    /// Remaining rows without a class label; not scored.
    pub unlabelled: usize,
    /// Rows actually run through the classifier.
    pub evaluated: usize,
    pub class_indexs: ClassIndexs,
    pub confusion: ConfusionMatrix,
    pub metrics: Metrics,
    pub duration: Duration,
}

impl Evaluation {
    pub fn has_test_data(&self) -> bool {
        self.evaluated > 0
    }

    pub fn correct(&self) -> u64 {
        self.confusion.correct()
    }

    pub fn incorrect(&self) -> u64 {
        self.confusion.total() - self.confusion.correct()
    }

    /// Share of correctly classified rows, `None` without test data.
    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.correct(), self.confusion.total())
    }
}

/// Runs a trained model over test data.
pub struct Evaluater<'a> {
    model: &'a Model,
    training: &'a Dataset,
    class_indexs: ClassIndexs,
}

impl<'a> Evaluater<'a> {
    /// `training` fixes the schema the test data must follow.
    pub fn new(model: &'a Model, training: &'a Dataset, registry: &LabelRegistry) -> Self {
        Self {
            model,
            training,
            class_indexs: ClassIndexs::from_dataset(training, registry),
        }
    }

    /// The loaded training header must be the one the model was fitted on.
    fn check_schema(&self) -> Result<(), ArffError> {
        let Some(schema) = self.model.schema() else {
            return Ok(());
        };
        if schema.len() != self.training.num_attributes() {
            return Err(ArffError::SchemaMismatch(format!(
                "model was trained on {} attributes, training data has {}",
                schema.len(),
                self.training.num_attributes()
            )));
        }
        match schema
            .iter()
            .zip(self.training.attributes())
            .find(|(model, loaded)| model != loaded)
        {
            Some((model, loaded)) if model.kind_name() != loaded.kind_name() => {
                Err(ArffError::SchemaMismatch(format!(
                    "attribute '{}' is {} in the model but {} in the training data, \
                     use the same nominal columns as for training",
                    model.name,
                    model.kind_name(),
                    loaded.kind_name()
                )))
            }
            Some((model, loaded)) => Err(ArffError::SchemaMismatch(format!(
                "attribute '{}' in the model differs from '{}' in the training data",
                model.name, loaded.name
            ))),
            None => Ok(()),
        }
    }

    /// Copy of `test` without Background rows.
    pub fn remove_background(&self, test: &Dataset) -> Dataset {
        test.filtered(|inst| !self.class_indexs.is_background(inst.class_label_index()))
    }

    pub fn evaluate(&self, test: &Dataset) -> Result<Evaluation> {
        debug!("start: evaluate");
        self.check_schema()?;
        let aligned = test
            .align_to(self.training)
            .context("Failed to start evaluation, probably wrong classifier or training data")?;

        let size_with_background = aligned.len();
        let filtered = self.remove_background(&aligned);
        let background_removed = size_with_background - filtered.len();
        let labelled = filtered.filtered(|inst| inst.class_value().is_some());
        let unlabelled = filtered.len() - labelled.len();
        let evaluated = labelled.len();

        let mut confusion = ConfusionMatrix::new(self.training.class_attribute().labels().to_vec());

        let start = Instant::now();
        let predictions = self
            .model
            .classify_all(labelled.instances())
            .context("Failed to do evaluation")?;
        for (instance, predicted) in labelled.instances().iter().zip(predictions) {
            if let Some(actual) = instance.class_label_index() {
                confusion.add(actual, predicted);
            }
        }
        let duration = start.elapsed();

        if evaluated == 0 {
            info!("No test data left after removing background rows");
        }

        let metrics = Metrics::from_confusion(&confusion, &self.class_indexs);
        debug!("finished: evaluate");

        Ok(Evaluation {
            timestamp: Utc::now(),
            classifier: self.model.describe(),
            size_with_background,
            background_removed,
            unlabelled,
            evaluated,
            class_indexs: self.class_indexs,
            confusion,
            metrics,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arff::{Attribute, Instance};
    use crate::classifier::{ClassifierRegistry, Param};

    const BACKGROUND: f64 = 0.0;
    const NORMAL: f64 = 1.0;
    const BOTNET: f64 = 2.0;

    fn schema() -> Dataset {
        Dataset::new(
            "flows",
            vec![
                Attribute::numeric("bytes"),
                Attribute::nominal(
                    "Label",
                    vec!["Background".into(), "Normal".into(), "Botnet".into()],
                ),
            ],
        )
    }

    fn dataset(rows: &[(f64, Option<f64>)]) -> Dataset {
        let mut ds = schema();
        for &(bytes, class) in rows {
            ds.push(Instance::new(vec![Some(bytes), class])).unwrap();
        }
        ds
    }

    fn trained(training: &Dataset) -> Model {
        let mut model = ClassifierRegistry::new()
            .create("lnns", &[Param::new("k", "1")])
            .unwrap();
        model.train(training).unwrap();
        model
    }

    #[test]
    fn test_metrics_from_confusion() {
        let mut cm = ConfusionMatrix::new(vec!["Normal".into(), "Botnet".into()]);
        let idx = ClassIndexs {
            background: None,
            normal: Some(0),
            botnet: Some(1),
        };
        for _ in 0..8 {
            cm.add(1, 1);
        }
        cm.add(1, 0);
        cm.add(1, 0);
        cm.add(0, 1);
        for _ in 0..9 {
            cm.add(0, 0);
        }

        let m = Metrics::from_confusion(&cm, &idx);
        assert_eq!((m.tp, m.fn_, m.fp, m.tn), (8, 2, 1, 9));
        assert_eq!(m.true_positive_rate(), Some(0.8));
        assert_eq!(m.false_positive_rate(), Some(0.1));
        assert_eq!(m.true_negative_rate(), Some(0.9));
        assert_eq!(m.false_negative_rate(), Some(0.2));
        assert_eq!(cm.total(), 20);
        assert_eq!(cm.correct(), 17);
    }

    #[test]
    fn test_rates_undefined_without_positives() {
        let m = Metrics::default();
        assert_eq!(m.true_positive_rate(), None);
        assert_eq!(m.false_positive_rate(), None);
    }

    #[test]
    fn test_background_excluded_and_counted_separately() {
        let training = dataset(&[
            (1.0, Some(NORMAL)),
            (2.0, Some(NORMAL)),
            (100.0, Some(BOTNET)),
            (101.0, Some(BOTNET)),
            (50.0, Some(BACKGROUND)),
        ]);
        let test = dataset(&[
            (1.5, Some(NORMAL)),
            (99.0, Some(BOTNET)),
            (50.0, Some(BACKGROUND)),
            (51.0, Some(BACKGROUND)),
            (3.0, None),
        ]);
        let model = trained(&training);
        let registry = LabelRegistry::default();
        let evaluater = Evaluater::new(&model, &training, &registry);

        assert_eq!(evaluater.remove_background(&test).len(), 3);

        let eval = evaluater.evaluate(&test).unwrap();
        assert_eq!(eval.size_with_background, 5);
        assert_eq!(eval.background_removed, 2);
        assert_eq!(eval.unlabelled, 1);
        assert_eq!(eval.evaluated, 2);
        assert_eq!(eval.confusion.total(), 2);
        assert_eq!(eval.metrics.tp, 1);
        assert_eq!(eval.metrics.tn, 1);
        assert_eq!(eval.accuracy(), Some(1.0));
    }

    #[test]
    fn test_only_background_means_no_test_data() {
        let training = dataset(&[(1.0, Some(NORMAL)), (100.0, Some(BOTNET))]);
        let test = dataset(&[(50.0, Some(BACKGROUND))]);
        let model = trained(&training);
        let registry = LabelRegistry::default();

        let eval = Evaluater::new(&model, &training, &registry)
            .evaluate(&test)
            .unwrap();
        assert!(!eval.has_test_data());
        assert_eq!(eval.accuracy(), None);
        assert_eq!(eval.metrics, Metrics::default());
    }

    #[test]
    fn test_schema_mismatch_is_fatal() {
        let training = dataset(&[(1.0, Some(NORMAL))]);
        let mut other = Dataset::new(
            "flows",
            vec![
                Attribute::numeric("packets"),
                Attribute::nominal("Label", vec!["Normal".into()]),
            ],
        );
        other
            .push(Instance::new(vec![Some(1.0), Some(0.0)]))
            .unwrap();
        let model = trained(&training);
        let registry = LabelRegistry::default();

        let err = Evaluater::new(&model, &training, &registry)
            .evaluate(&other)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("not compatible"));
    }

    #[test]
    fn test_training_header_must_match_model() {
        let mut nominal = dataset(&[(1.0, Some(NORMAL)), (100.0, Some(BOTNET))]);
        nominal.numeric_to_nominal(&[0]).unwrap();
        let model = trained(&nominal);
        let numeric = dataset(&[(1.0, Some(NORMAL)), (100.0, Some(BOTNET))]);
        let test = dataset(&[(1.0, Some(NORMAL))]);
        let registry = LabelRegistry::default();

        let err = Evaluater::new(&model, &numeric, &registry)
            .evaluate(&test)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ArffError>(),
            Some(ArffError::SchemaMismatch(_))
        ));
        assert!(format!("{:#}", err).contains("'bytes' is nominal in the model but numeric"));

        let mut nominal_test = test.clone();
        nominal_test.numeric_to_nominal(&[0]).unwrap();
        let eval = Evaluater::new(&model, &nominal, &registry)
            .evaluate(&nominal_test)
            .unwrap();
        assert_eq!(eval.incorrect(), 0);
    }

    #[test]
    fn test_test_labels_in_different_order() {
        let training = dataset(&[(1.0, Some(NORMAL)), (100.0, Some(BOTNET))]);
        let mut test = Dataset::new(
            "flows",
            vec![
                Attribute::numeric("bytes"),
                Attribute::nominal("Label", vec!["Botnet".into(), "Normal".into()]),
            ],
        );
        test.push(Instance::new(vec![Some(98.0), Some(0.0)])).unwrap();
        test.push(Instance::new(vec![Some(2.0), Some(1.0)])).unwrap();
        let model = trained(&training);
        let registry = LabelRegistry::default();

        let eval = Evaluater::new(&model, &training, &registry)
            .evaluate(&test)
            .unwrap();
        assert_eq!(eval.metrics.tp, 1);
        assert_eq!(eval.metrics.tn, 1);
        assert_eq!(eval.incorrect(), 0);
    }
}

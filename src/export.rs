//! Export Module
//!
//! Renders evaluation results as the text summary kept next to the data,
//! or as JSON for integration with other tools.

use serde::Serialize;

use crate::evaluation::Evaluation;
use crate::labels::{LabelRegistry, TrafficClass};

/// Output format for exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// JSON-serializable evaluation
#[derive(Serialize)]
pub struct JsonEvaluation {
    pub version: &'static str,
    pub timestamp: String,
    pub classifier: String,
    pub size_with_background: usize,
    pub background_removed: usize,
    pub unlabelled: usize,
    pub evaluated: usize,
    pub correct: u64,
    pub incorrect: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub tp: u64,
    pub fp: u64,
    pub tn: u64,
    pub fn_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_positive_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub false_positive_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_negative_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub false_negative_rate: Option<f64>,
    pub class_labels: Vec<String>,
    pub confusion_matrix: Vec<Vec<u64>>,
    pub duration_secs: f64,
}

impl From<&Evaluation> for JsonEvaluation {
    fn from(eval: &Evaluation) -> Self {
        let m = &eval.metrics;
        Self {
            version: "1.0",
            timestamp: eval.timestamp.to_rfc3339(),
            classifier: eval.classifier.clone(),
            size_with_background: eval.size_with_background,
            background_removed: eval.background_removed,
            unlabelled: eval.unlabelled,
            evaluated: eval.evaluated,
            correct: eval.correct(),
            incorrect: eval.incorrect(),
            accuracy: eval.accuracy(),
            tp: m.tp,
            fp: m.fp,
            tn: m.tn,
            fn_count: m.fn_,
            true_positive_rate: m.true_positive_rate(),
            false_positive_rate: m.false_positive_rate(),
            true_negative_rate: m.true_negative_rate(),
            false_negative_rate: m.false_negative_rate(),
            class_labels: eval.confusion.labels().to_vec(),
            confusion_matrix: eval.confusion.rows().to_vec(),
            duration_secs: eval.duration.as_secs_f64(),
        }
    }
}

/// Exports an evaluation in the specified format
pub fn export_evaluation(eval: &Evaluation, registry: &LabelRegistry, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => export_text(eval, registry),
        OutputFormat::Json => export_json(eval),
    }
}

/// Exports evaluation as pretty-printed JSON
pub fn export_json(eval: &Evaluation) -> String {
    serde_json::to_string_pretty(&JsonEvaluation::from(eval))
        .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// Exports evaluation as the text summary
pub fn export_text(eval: &Evaluation, registry: &LabelRegistry) -> String {
    let mut out = String::new();

    out.push_str("Information about evaluated classifier:\n");
    out.push_str(&eval.classifier);
    out.push_str("\n\n");
    out.push_str(&format!(
        "Evaluated at: {}\n\n",
        eval.timestamp.format("%Y-%m-%d %H:%M:%S")
    ));

    out.push_str(&format!(
        "Test Set size with background: {}\nBackground instances removed: {}\n",
        eval.size_with_background, eval.background_removed
    ));
    if eval.unlabelled > 0 {
        out.push_str(&format!("Instances without label: {}\n", eval.unlabelled));
    }
    out.push_str(&format!("Evaluated instances: {}\n\n", eval.evaluated));

    if !eval.has_test_data() {
        out.push_str("Results: no test data, nothing was evaluated\n");
        return out;
    }

    let total = eval.confusion.total();
    out.push_str("Results:\n\n");
    out.push_str(&format!(
        "Correctly Classified Instances     {:>8} {:>10}\n",
        eval.correct(),
        format_percent(eval.correct(), total)
    ));
    out.push_str(&format!(
        "Incorrectly Classified Instances   {:>8} {:>10}\n",
        eval.incorrect(),
        format_percent(eval.incorrect(), total)
    ));
    out.push_str(&format!("Total Number of Instances          {:>8}\n\n", total));

    let m = &eval.metrics;
    out.push_str(&format!("TP Count: {}\n", m.tp));
    out.push_str(&format!("FP Count: {}\n", m.fp));
    out.push_str(&format!("TN Count: {}\n", m.tn));
    out.push_str(&format!("FN Count: {}\n", m.fn_));
    out.push_str(&format!("TP Ratio, Recall: {}\n", format_rate(m.true_positive_rate())));
    out.push_str(&format!("FP Ratio: {}\n", format_rate(m.false_positive_rate())));
    out.push_str(&format!(
        "TN Ratio, Specificity: {}\n",
        format_rate(m.true_negative_rate())
    ));
    out.push_str(&format!("FN Ratio: {}\n", format_rate(m.false_negative_rate())));

    out.push_str("\nConfusion Matrix:\n");
    for class in [
        TrafficClass::Background,
        TrafficClass::Normal,
        TrafficClass::Botnet,
    ] {
        let position = eval
            .class_indexs
            .get(class)
            .map(|i| i.to_string())
            .unwrap_or_else(|| "absent".to_string());
        out.push_str(&format!(
            "Row, Column for {}({}) is: {}\n",
            registry.label(class),
            class,
            position
        ));
    }
    for row in eval.confusion.rows() {
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        out.push_str(&format!("[{}]\n", cells.join(", ")));
    }

    out.push_str(&format!(
        "\nTime duration of the test set evaluation of this classifier:\n{:.10} Seconds\n",
        eval.duration.as_secs_f64()
    ));
    out
}

fn format_percent(part: u64, total: u64) -> String {
    if total == 0 {
        "N/A".to_string()
    } else {
        format!("{:.4} %", part as f64 * 100.0 / total as f64)
    }
}

fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.6}", r),
        None => "N/A".to_string(),
    }
}

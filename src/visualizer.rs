//! Plot artifacts for an evaluation.
//!
//! Plots are plain-text bar charts so they can be read in a terminal or
//! diffed between runs; the confusion matrix is also written as CSV for
//! external plotting tools.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::evaluation::{Evaluation, Metrics};
use crate::persistence::ResultPersistence;

const BAR_WIDTH: usize = 50;

/// Renders `(label, value)` pairs as horizontal bars scaled to `max`.
pub fn bar_chart(title: &str, bars: &[(&str, f64)], max: f64, unit: &str) -> String {
    let label_width = bars.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    let mut out = format!("{}\n{}\n", title, "=".repeat(title.len()));

    for (label, value) in bars {
        let filled = if max > 0.0 {
            ((value / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let filled = filled.min(BAR_WIDTH);
        out.push_str(&format!(
            "{:<width$} |{}{}| {}{}\n",
            label,
            "#".repeat(filled),
            " ".repeat(BAR_WIDTH - filled),
            format_value(*value),
            unit,
            width = label_width
        ));
    }
    out
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as u64)
    } else {
        format!("{:.2}", value)
    }
}

/// Bar chart of TP/FP/TN/FN.
pub fn plot_counts(metrics: &Metrics) -> String {
    let bars = [
        ("TP", metrics.tp as f64),
        ("FP", metrics.fp as f64),
        ("TN", metrics.tn as f64),
        ("FN", metrics.fn_ as f64),
    ];
    let max = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    bar_chart("Outcome counts (Botnet positive)", &bars, max, "")
}

/// Bar chart of the four rates in percent; undefined rates are listed
/// separately.
pub fn plot_rates(metrics: &Metrics) -> String {
    let rates = [
        ("TP rate (recall)", metrics.true_positive_rate()),
        ("FP rate", metrics.false_positive_rate()),
        ("TN rate (specificity)", metrics.true_negative_rate()),
        ("FN rate", metrics.false_negative_rate()),
    ];
    let defined: Vec<(&str, f64)> = rates
        .iter()
        .filter_map(|(label, rate)| rate.map(|r| (*label, r * 100.0)))
        .collect();

    let mut out = bar_chart("Rates", &defined, 100.0, "%");
    for (label, rate) in &rates {
        if rate.is_none() {
            out.push_str(&format!("{}: undefined (no instances)\n", label));
        }
    }
    out
}

/// Writes the confusion matrix as CSV with a header of predicted labels.
pub fn confusion_csv(evaluation: &Evaluation) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["actual\\predicted".to_string()];
    header.extend(evaluation.confusion.labels().iter().cloned());
    writer.write_record(&header)?;

    for (label, row) in evaluation
        .confusion
        .labels()
        .iter()
        .zip(evaluation.confusion.rows())
    {
        let mut record = vec![label.clone()];
        record.extend(row.iter().map(|c| c.to_string()));
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish confusion csv: {}", e))?;
    String::from_utf8(bytes).context("Confusion csv is not valid UTF-8")
}

/// Writes all plots of an evaluation next to its summary.
pub struct Visualizer<'a> {
    persistence: &'a ResultPersistence,
}

impl<'a> Visualizer<'a> {
    pub fn new(persistence: &'a ResultPersistence) -> Self {
        Self { persistence }
    }

    pub fn plot_all(&self, evaluation: &Evaluation) -> Result<Vec<PathBuf>> {
        Ok(vec![
            self.persistence
                .save_artifact("plot_counts.txt", &plot_counts(&evaluation.metrics))?,
            self.persistence
                .save_artifact("plot_rates.txt", &plot_rates(&evaluation.metrics))?,
            self.persistence
                .save_artifact("confusion.csv", &confusion_csv(evaluation)?)?,
        ])
    }
}

//! ARFF Dataset Module
//!
//! In-memory representation of a tabular dataset (attributes plus instances)
//! together with a reader and writer for the ARFF text format.
//!
//! # Value encoding
//!
//! Every cell is an `Option<f64>`:
//! - numeric attributes store the number itself
//! - nominal attributes store the index into their value list
//! - string attributes store the index into their string table
//! - `None` marks a missing value (`?` in ARFF)
//!
//! The class attribute is always the last column.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ArffError;

/// Type of a single attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeKind {
    Numeric,
    /// Ordered list of allowed labels.
    Nominal(Vec<String>),
    /// Table of every distinct string seen, in first-appearance order.
    Text(Vec<String>),
}

/// A named column of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Numeric,
        }
    }

    pub fn nominal(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Nominal(values),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Text(Vec::new()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, AttributeKind::Numeric)
    }

    pub fn is_nominal(&self) -> bool {
        matches!(self.kind, AttributeKind::Nominal(_))
    }

    /// Labels of a nominal or string attribute, empty for numeric ones.
    pub fn labels(&self) -> &[String] {
        match &self.kind {
            AttributeKind::Numeric => &[],
            AttributeKind::Nominal(values) | AttributeKind::Text(values) => values,
        }
    }

    /// Position of `label` among the attribute's labels.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels().iter().position(|v| v == label)
    }

    /// Human-readable form of a stored value.
    pub fn format_value(&self, value: Option<f64>) -> String {
        match value {
            None => "?".to_string(),
            Some(v) => match &self.kind {
                AttributeKind::Numeric => format_number(v),
                AttributeKind::Nominal(values) | AttributeKind::Text(values) => values
                    .get(v as usize)
                    .cloned()
                    .unwrap_or_else(|| "?".to_string()),
            },
        }
    }

    /// Label to position lookup over the attribute's labels.
    pub fn label_index(&self) -> HashMap<String, usize> {
        self.labels()
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect()
    }

    /// Stores `label` in a string table, returning its index. `index` must
    /// be this attribute's [`Attribute::label_index`].
    fn intern(&mut self, label: &str, index: &mut HashMap<String, usize>) -> Option<usize> {
        match &mut self.kind {
            AttributeKind::Text(values) => Some(match index.get(label) {
                Some(&idx) => idx,
                None => {
                    values.push(label.to_string());
                    index.insert(label.to_string(), values.len() - 1);
                    values.len() - 1
                }
            }),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            AttributeKind::Numeric => "numeric",
            AttributeKind::Nominal(_) => "nominal",
            AttributeKind::Text(_) => "string",
        }
    }
}

/// One row of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    values: Vec<Option<f64>>,
}

impl Instance {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    /// Value of the last column.
    pub fn class_value(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    /// Class value as a label index, `None` when missing.
    pub fn class_label_index(&self) -> Option<usize> {
        self.class_value().map(|v| v as usize)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// An ordered set of instances sharing one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    relation: String,
    attributes: Vec<Attribute>,
    instances: Vec<Instance>,
}

impl Dataset {
    pub fn new(relation: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            relation: relation.into(),
            attributes,
            instances: Vec::new(),
        }
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, index: usize) -> &Attribute {
        &self.attributes[index]
    }

    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    /// The class attribute is always the last column.
    pub fn class_index(&self) -> usize {
        self.attributes.len().saturating_sub(1)
    }

    pub fn class_attribute(&self) -> &Attribute {
        &self.attributes[self.class_index()]
    }

    /// Number of class labels, zero when the class is not nominal.
    pub fn num_classes(&self) -> usize {
        match &self.class_attribute().kind {
            AttributeKind::Nominal(values) => values.len(),
            _ => 0,
        }
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Appends a row, checking its width against the schema.
    pub fn push(&mut self, instance: Instance) -> std::result::Result<(), ArffError> {
        if instance.len() != self.attributes.len() {
            return Err(ArffError::RowWidth {
                row: self.instances.len() + 1,
                expected: self.attributes.len(),
                actual: instance.len(),
            });
        }
        self.instances.push(instance);
        Ok(())
    }

    /// Same schema, the given instances.
    pub fn with_instances(&self, instances: Vec<Instance>) -> Self {
        Self {
            relation: self.relation.clone(),
            attributes: self.attributes.clone(),
            instances,
        }
    }

    /// Copy keeping only the rows accepted by `keep`.
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Instance) -> bool,
    {
        let instances = self.instances.iter().filter(|i| keep(i)).cloned().collect();
        self.with_instances(instances)
    }

    /// Converts the given numeric columns to nominal ones.
    ///
    /// Labels are the distinct values in ascending order. Columns that are
    /// already nominal or string are left untouched.
    pub fn numeric_to_nominal(&mut self, columns: &[usize]) -> std::result::Result<(), ArffError> {
        for &col in columns {
            if col >= self.attributes.len() {
                return Err(ArffError::ColumnOutOfRange {
                    index: col,
                    count: self.attributes.len(),
                });
            }
            if !self.attributes[col].is_numeric() {
                continue;
            }

            let mut distinct: Vec<f64> = self
                .instances
                .iter()
                .filter_map(|i| i.value(col))
                .collect();
            distinct.sort_by(|a, b| a.total_cmp(b));
            distinct.dedup();

            for instance in &mut self.instances {
                if let Some(v) = instance.values[col] {
                    let idx = distinct.partition_point(|d| d.total_cmp(&v).is_lt());
                    instance.values[col] = Some(idx as f64);
                }
            }

            let labels = distinct.into_iter().map(format_number).collect();
            self.attributes[col].kind = AttributeKind::Nominal(labels);
        }
        Ok(())
    }

    /// Re-expresses this dataset in the schema of `reference`.
    ///
    /// Attribute names and kinds must match. Nominal and string values are
    /// remapped by label, labels unknown to the reference become missing.
    pub fn align_to(&self, reference: &Dataset) -> std::result::Result<Dataset, ArffError> {
        if self.attributes.len() != reference.attributes.len() {
            return Err(ArffError::SchemaMismatch(format!(
                "{} attributes vs {} attributes",
                self.attributes.len(),
                reference.attributes.len()
            )));
        }

        let mut mappings: Vec<Option<Vec<Option<usize>>>> = Vec::new();
        for (own, other) in self.attributes.iter().zip(&reference.attributes) {
            if own.name != other.name {
                return Err(ArffError::SchemaMismatch(format!(
                    "attribute '{}' vs '{}'",
                    own.name, other.name
                )));
            }
            if own.kind_name() != other.kind_name() {
                return Err(ArffError::SchemaMismatch(format!(
                    "attribute '{}' is {} but {} is expected",
                    own.name,
                    own.kind_name(),
                    other.kind_name()
                )));
            }
            mappings.push(match own.kind {
                AttributeKind::Numeric => None,
                _ => {
                    let index = other.label_index();
                    Some(own.labels().iter().map(|l| index.get(l).copied()).collect())
                }
            });
        }

        let instances = self
            .instances
            .iter()
            .map(|instance| {
                let values = instance
                    .values
                    .iter()
                    .zip(&mappings)
                    .map(|(value, mapping)| match (value, mapping) {
                        (Some(v), Some(map)) => {
                            map.get(*v as usize).copied().flatten().map(|i| i as f64)
                        }
                        (value, None) => *value,
                        (None, Some(_)) => None,
                    })
                    .collect();
                Instance::new(values)
            })
            .collect();

        Ok(reference.with_instances(instances))
    }

    /// Parses ARFF text.
    pub fn parse_arff(content: &str) -> std::result::Result<Self, ArffError> {
        let mut relation: Option<String> = None;
        let mut attributes: Vec<Attribute> = Vec::new();
        let mut dataset: Option<Dataset> = None;
        let mut indexes: Vec<HashMap<String, usize>> = Vec::new();

        for (line_no, raw) in content.lines().enumerate() {
            let line_no = line_no + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }

            if let Some(ds) = dataset.as_mut() {
                if line.starts_with('{') {
                    return Err(ArffError::Parse {
                        line: line_no,
                        message: "sparse instances are not supported".to_string(),
                    });
                }
                let cells = split_values(line).map_err(|message| ArffError::Parse {
                    line: line_no,
                    message,
                })?;
                let instance = ds.instance_from_cells(&cells, line_no, &mut indexes)?;
                ds.push(instance)?;
                continue;
            }

            let lower = line.to_ascii_lowercase();
            if lower.starts_with("@relation") {
                let rest = line["@relation".len()..].trim();
                relation = Some(unquote(rest));
            } else if lower.starts_with("@attribute") {
                let rest = line["@attribute".len()..].trim();
                attributes.push(parse_attribute(rest).map_err(|message| ArffError::Parse {
                    line: line_no,
                    message,
                })?);
            } else if lower.starts_with("@data") {
                if attributes.is_empty() {
                    return Err(ArffError::MissingHeader);
                }
                indexes = attributes.iter().map(Attribute::label_index).collect();
                dataset = Some(Dataset::new(
                    relation.clone().unwrap_or_default(),
                    std::mem::take(&mut attributes),
                ));
            } else {
                return Err(ArffError::Parse {
                    line: line_no,
                    message: format!("unexpected header line '{}'", line),
                });
            }
        }

        dataset.ok_or(ArffError::MissingHeader)
    }

    /// Reads an ARFF file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read arff file: {}", path.display()))?;
        let dataset = Self::parse_arff(&content)
            .with_context(|| format!("Failed to parse arff file: {}", path.display()))?;
        Ok(dataset)
    }

    /// Renders the dataset as ARFF text.
    pub fn to_arff(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "@relation {}", quote(&self.relation));
        out.push('\n');

        for attribute in &self.attributes {
            let kind = match &attribute.kind {
                AttributeKind::Numeric => "numeric".to_string(),
                AttributeKind::Text(_) => "string".to_string(),
                AttributeKind::Nominal(values) => format!(
                    "{{{}}}",
                    values.iter().map(|v| quote(v)).collect::<Vec<_>>().join(",")
                ),
            };
            let _ = writeln!(out, "@attribute {} {}", quote(&attribute.name), kind);
        }

        out.push_str("\n@data\n");
        for instance in &self.instances {
            let row: Vec<String> = instance
                .values
                .iter()
                .zip(&self.attributes)
                .map(|(value, attribute)| match value {
                    None => "?".to_string(),
                    Some(_) if attribute.is_numeric() => attribute.format_value(*value),
                    Some(_) => quote(&attribute.format_value(*value)),
                })
                .collect();
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }

    /// Writes the dataset to `path` as ARFF.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_arff())
            .with_context(|| format!("Failed to write arff file: {}", path.display()))
    }

    fn instance_from_cells(
        &mut self,
        cells: &[Option<String>],
        line_no: usize,
        indexes: &mut [HashMap<String, usize>],
    ) -> std::result::Result<Instance, ArffError> {
        if cells.len() != self.attributes.len() {
            return Err(ArffError::RowWidth {
                row: line_no,
                expected: self.attributes.len(),
                actual: cells.len(),
            });
        }

        let mut values = Vec::with_capacity(cells.len());
        for ((cell, attribute), index) in cells
            .iter()
            .zip(self.attributes.iter_mut())
            .zip(indexes.iter_mut())
        {
            let Some(cell) = cell else {
                values.push(None);
                continue;
            };
            let value = if attribute.is_numeric() {
                match cell.parse::<f64>() {
                    Ok(v) if v.is_finite() => v,
                    _ => {
                        return Err(ArffError::Parse {
                            line: line_no,
                            message: format!(
                                "'{}' is not a finite number ({})",
                                cell, attribute.name
                            ),
                        })
                    }
                }
            } else if attribute.is_nominal() {
                index.get(cell.as_str()).copied().ok_or_else(|| ArffError::Parse {
                    line: line_no,
                    message: format!("'{}' is not a value of {}", cell, attribute.name),
                })? as f64
            } else {
                attribute.intern(cell, index).unwrap_or_default() as f64
            };
            values.push(Some(value));
        }
        Ok(Instance::new(values))
    }
}

/// Formats a number without a trailing `.0` for integral values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn parse_attribute(rest: &str) -> std::result::Result<Attribute, String> {
    let (name, kind) = take_token(rest)?;
    let kind = kind.trim();
    if kind.is_empty() {
        return Err(format!("attribute '{}' has no type", name));
    }

    if let Some(body) = kind.strip_prefix('{') {
        let body = body
            .strip_suffix('}')
            .ok_or_else(|| format!("unterminated nominal list for '{}'", name))?;
        let values = split_values(body)?
            .into_iter()
            .map(|v| v.unwrap_or_else(|| "?".to_string()))
            .collect();
        return Ok(Attribute::nominal(name, values));
    }

    match kind.to_ascii_lowercase().as_str() {
        "numeric" | "real" | "integer" => Ok(Attribute::numeric(name)),
        "string" => Ok(Attribute::text(name)),
        other => Err(format!("unsupported attribute type '{}'", other)),
    }
}

/// Splits off a (possibly quoted) leading token.
fn take_token(input: &str) -> std::result::Result<(String, &str), String> {
    let input = input.trim_start();
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, q)) if q == '\'' || q == '"' => {
            let mut token = String::new();
            let mut escaped = false;
            for (idx, c) in chars {
                if escaped {
                    token.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    return Ok((token, &input[idx + 1..]));
                } else {
                    token.push(c);
                }
            }
            Err("unterminated quote".to_string())
        }
        Some(_) => {
            let end = input
                .find(|c: char| c.is_whitespace() || c == '{')
                .unwrap_or(input.len());
            Ok((input[..end].to_string(), &input[end..]))
        }
        None => Err("missing token".to_string()),
    }
}

/// Splits a comma-separated ARFF value list, honouring quotes.
/// `?` outside quotes becomes `None`.
fn split_values(line: &str) -> std::result::Result<Vec<Option<String>>, String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut quoted = false;
    let mut escaped = false;

    for c in line.chars() {
        if let Some(q) = quote {
            if escaped {
                current.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            } else {
                current.push(c);
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                quoted = true;
            }
            ',' => {
                cells.push(finish_cell(&current, quoted));
                current.clear();
                quoted = false;
            }
            _ => current.push(c),
        }
    }
    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    cells.push(finish_cell(&current, quoted));
    Ok(cells)
}

fn finish_cell(raw: &str, quoted: bool) -> Option<String> {
    if quoted {
        return Some(raw.to_string());
    }
    let trimmed = raw.trim();
    if trimmed == "?" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn unquote(token: &str) -> String {
    take_token(token)
        .map(|(t, _)| t)
        .unwrap_or_else(|_| token.to_string())
}

/// Quotes a name or label when ARFF syntax requires it.
fn quote(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value == "?"
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ',' | '\'' | '"' | '{' | '}' | '%' | '\\'));
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"% flows
@relation 'ctu flows'

@attribute Dur numeric
@attribute Proto {tcp,udp}
@attribute SrcAddr numeric
@attribute State string
@attribute Label {Background,Normal,Botnet}

@data
1.5,tcp,167772161,'S_RA',Background
0.25,udp,167772162,CON,Botnet
?,tcp,167772161,CON,Normal
"#;

    #[test]
    fn test_parse_sample() {
        let ds = Dataset::parse_arff(SAMPLE).unwrap();
        assert_eq!(ds.relation(), "ctu flows");
        assert_eq!(ds.num_attributes(), 5);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.num_classes(), 3);
        assert!(ds.attribute(0).is_numeric());
        assert!(ds.attribute(1).is_nominal());
        assert!(matches!(ds.attribute(3).kind, AttributeKind::Text(_)));
        assert_eq!(ds.instances()[1].value(1), Some(1.0));
        assert_eq!(ds.instances()[2].value(0), None);
        assert_eq!(ds.instances()[1].class_label_index(), Some(2));
    }

    #[test]
    fn test_class_index_is_last_attribute() {
        let ds = Dataset::parse_arff(SAMPLE).unwrap();
        assert_eq!(ds.class_index(), ds.num_attributes() - 1);
        assert_eq!(ds.class_attribute().name, "Label");
    }

    #[test]
    fn test_write_then_parse_keeps_values() {
        let ds = Dataset::parse_arff(SAMPLE).unwrap();
        let text = ds.to_arff();
        assert!(text.contains("@attribute Label {Background,Normal,Botnet}"));
        assert!(text.contains("?,tcp,167772161,CON,Normal"));

        let reparsed = Dataset::parse_arff(&text).unwrap();
        assert_eq!(reparsed, ds);
    }

    #[test]
    fn test_numeric_to_nominal_only_listed_columns() {
        let mut ds = Dataset::parse_arff(SAMPLE).unwrap();
        ds.numeric_to_nominal(&[2]).unwrap();

        assert!(ds.attribute(2).is_nominal());
        assert!(ds.attribute(0).is_numeric());
        assert_eq!(
            ds.attribute(2).labels(),
            &["167772161".to_string(), "167772162".to_string()]
        );
        assert_eq!(ds.instances()[1].value(2), Some(1.0));
        assert_eq!(ds.instances()[2].value(2), Some(0.0));
    }

    #[test]
    fn test_numeric_to_nominal_out_of_range() {
        let mut ds = Dataset::parse_arff(SAMPLE).unwrap();
        assert!(matches!(
            ds.numeric_to_nominal(&[42]),
            Err(ArffError::ColumnOutOfRange { index: 42, .. })
        ));
    }

    #[test]
    fn test_align_remaps_nominal_labels() {
        let train = Dataset::parse_arff(SAMPLE).unwrap();
        let test = Dataset::parse_arff(
            "@relation t\n@attribute Dur numeric\n@attribute Proto {udp,tcp}\n\
             @attribute SrcAddr numeric\n@attribute State string\n\
             @attribute Label {Botnet,Normal}\n@data\n1,udp,1,X,Botnet\n",
        )
        .unwrap();

        let aligned = test.align_to(&train).unwrap();
        let row = &aligned.instances()[0];
        assert_eq!(row.value(1), Some(1.0));
        assert_eq!(row.value(3), None);
        assert_eq!(row.class_label_index(), Some(2));
        assert_eq!(aligned.attributes(), train.attributes());
    }

    #[test]
    fn test_align_rejects_different_schema() {
        let train = Dataset::parse_arff(SAMPLE).unwrap();
        let test = Dataset::parse_arff(
            "@relation t\n@attribute Dur numeric\n@attribute Label {Botnet}\n@data\n1,Botnet\n",
        )
        .unwrap();
        assert!(matches!(
            test.align_to(&train),
            Err(ArffError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Dataset::parse_arff("@relation x\n@data\n"),
            Err(ArffError::MissingHeader)
        ));
        assert!(matches!(
            Dataset::parse_arff("@relation x\n@attribute a numeric\n@data\nabc\n"),
            Err(ArffError::Parse { line: 4, .. })
        ));
        assert!(matches!(
            Dataset::parse_arff("@relation x\n@attribute a numeric\n@data\n1,2\n"),
            Err(ArffError::RowWidth { .. })
        ));
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        for cell in ["NaN", "inf", "-inf", "infinity"] {
            let content = format!("@relation x\n@attribute a numeric\n@data\n{}\n", cell);
            assert!(
                matches!(
                    Dataset::parse_arff(&content),
                    Err(ArffError::Parse { line: 4, .. })
                ),
                "{} should be rejected",
                cell
            );
        }
    }

    #[test]
    fn test_many_distinct_labels() {
        let n = 5000;
        let mut content = String::from("@relation x\n@attribute Host string\n@attribute Label {");
        let labels: Vec<String> = (0..n).map(|i| format!("L{}", i)).collect();
        content.push_str(&labels.join(","));
        content.push_str("}\n@data\n");
        for i in 0..n {
            content.push_str(&format!("h{},L{}\n", i % 7, n - 1 - i));
        }

        let ds = Dataset::parse_arff(&content).unwrap();
        assert_eq!(ds.len(), n);
        assert_eq!(ds.attribute(0).labels().len(), 7);
        assert_eq!(ds.instances()[8].value(0), Some(1.0));
        assert_eq!(ds.instances()[0].class_label_index(), Some(n - 1));

        // reversed label order on the other side
        let mut reversed = labels.clone();
        reversed.reverse();
        let reference = Dataset::new(
            "y",
            vec![Attribute::text("Host"), Attribute::nominal("Label", reversed)],
        );
        let aligned = ds.align_to(&reference).unwrap();
        assert_eq!(aligned.instances()[0].class_label_index(), Some(0));
        assert_eq!(aligned.instances()[0].value(0), None);
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("tcp"), "tcp");
        assert_eq!(quote("a b"), "'a b'");
        assert_eq!(quote("it's"), "'it\\'s'");
        assert_eq!(quote("?"), "'?'");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(6.0), "6");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(-3.0), "-3");
    }
}

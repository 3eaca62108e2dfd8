//! CSV to ARFF conversion.
//!
//! Scenario CSVs share one header. They are merged into a single CSV (the
//! header of every file after the first is removed) and loaded with a
//! schema-inferring reader:
//!
//! - a column whose non-missing cells all parse as numbers is numeric
//!   (`0x..` hex values included)
//! - any other column is nominal, labels in first-appearance order
//! - the last column is the class and is always nominal
//!
//! Source files are staged into a scratch directory first, so the in-place
//! header removal never touches the CTU folder.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use tracing::{debug, info};

use crate::arff::{Attribute, Dataset, Instance};
use crate::error::ArffError;
use crate::labels::LabelRegistry;

const COPY_BUFFER: usize = 16 * 1024;

/// Removes the first line of `path` by shifting the remaining bytes forward
/// and truncating the file.
pub fn strip_header_in_place(path: &Path) -> Result<()> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to open csv file: {}", path.display()))?;

    let header_len = {
        let mut reader = BufReader::new(&mut file);
        let mut header = Vec::new();
        reader
            .read_until(b'\n', &mut header)
            .with_context(|| format!("Failed to read csv header: {}", path.display()))?;
        header.len() as u64
    };

    let mut read_pos = header_len;
    let mut write_pos = 0u64;
    let mut buf = vec![0u8; COPY_BUFFER];
    loop {
        file.seek(SeekFrom::Start(read_pos))?;
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        file.seek(SeekFrom::Start(write_pos))?;
        file.write_all(&buf[..n])?;
        read_pos += n as u64;
        write_pos += n as u64;
    }
    file.set_len(write_pos)
        .with_context(|| format!("Failed to truncate csv file: {}", path.display()))?;

    Ok(())
}

/// Copies `csvs` into `workdir`, returning the copies in the same order.
pub fn stage(csvs: &[PathBuf], workdir: &Path) -> Result<Vec<PathBuf>> {
    csvs.iter()
        .enumerate()
        .map(|(i, src)| {
            let dst = workdir.join(format!("scenario_{}.csv", i));
            fs::copy(src, &dst).with_context(|| {
                format!("Failed to copy {} to {}", src.display(), dst.display())
            })?;
            Ok(dst)
        })
        .collect()
}

/// Concatenates `csvs` into `combination`, keeping only the first header.
///
/// The header of every file after the first is stripped in place.
pub fn combine(csvs: &[PathBuf], combination: &Path) -> Result<()> {
    let (first, rest) = csvs
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("No csv files to combine"))?;

    for csv in rest {
        strip_header_in_place(csv)?;
    }

    fs::copy(first, combination).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            first.display(),
            combination.display()
        )
    })?;

    for csv in rest {
        let mut destination = OpenOptions::new()
            .read(true)
            .append(true)
            .open(combination)
            .with_context(|| format!("Failed to open {}", combination.display()))?;
        ensure_trailing_newline(&mut destination)?;

        let mut source =
            File::open(csv).with_context(|| format!("Failed to open {}", csv.display()))?;
        io::copy(&mut source, &mut destination)
            .with_context(|| format!("Failed to append {}", csv.display()))?;
    }

    debug!("Combined {} csv files into {}", csvs.len(), combination.display());
    Ok(())
}

fn ensure_trailing_newline(file: &mut File) -> Result<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}

/// Schema-inferring CSV loader.
pub struct CsvLoader<'a> {
    labels: &'a LabelRegistry,
    remove_background: bool,
}

impl<'a> CsvLoader<'a> {
    pub fn new(labels: &'a LabelRegistry, remove_background: bool) -> Self {
        Self {
            labels,
            remove_background,
        }
    }

    /// Reads a CSV file into a dataset.
    pub fn load(&self, path: &Path) -> Result<Dataset> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open csv file: {}", path.display()))?;
        let relation = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "flows".to_string());
        let dataset = self
            .load_from_reader(file, &relation)
            .with_context(|| format!("Failed to convert csv file: {}", path.display()))?;
        Ok(dataset)
    }

    pub fn load_from_reader<R: Read>(
        &self,
        reader: R,
        relation: &str,
    ) -> std::result::Result<Dataset, ArffError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(ArffError::MissingHeader);
        }
        let class_col = headers.len() - 1;

        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut removed = 0usize;
        for record in rdr.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            let label = self.labels.canonicalize(&row[class_col]).to_string();
            if self.remove_background && self.labels.is_background(&label) {
                removed += 1;
                continue;
            }
            row[class_col] = label;
            rows.push(row);
        }
        if self.remove_background {
            debug!("Removed {} background rows", removed);
        }

        let attributes: Vec<Attribute> = headers
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let numeric = col != class_col
                    && rows
                        .iter()
                        .map(|r| r[col].as_str())
                        .filter(|c| !is_missing(c))
                        .all(|c| parse_numeric(c).is_some());
                if numeric {
                    Attribute::numeric(name.clone())
                } else {
                    Attribute::nominal(name.clone(), distinct_labels(&rows, col))
                }
            })
            .collect();

        let indexes: Vec<HashMap<String, usize>> =
            attributes.iter().map(Attribute::label_index).collect();
        let mut dataset = Dataset::new(relation, attributes);
        for row in rows {
            let values = row
                .iter()
                .enumerate()
                .map(|(col, cell)| {
                    if is_missing(cell) {
                        return None;
                    }
                    if dataset.attribute(col).is_numeric() {
                        parse_numeric(cell)
                    } else {
                        indexes[col].get(cell.as_str()).map(|&i| i as f64)
                    }
                })
                .collect();
            dataset.push(Instance::new(values))?;
        }
        Ok(dataset)
    }
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || cell == "?"
}

/// Non-missing values of column `col` in first-appearance order.
fn distinct_labels(rows: &[Vec<String>], col: usize) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    rows.iter()
        .map(|row| row[col].as_str())
        .filter(|cell| !is_missing(cell) && seen.insert(*cell))
        .map(str::to_string)
        .collect()
}

/// Parses decimal or `0x` hexadecimal numbers.
fn parse_numeric(cell: &str) -> Option<f64> {
    if let Some(hex) = cell
        .strip_prefix("0x")
        .or_else(|| cell.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Merges scenario CSVs and converts them to one ARFF file in `workdir`.
pub fn convert(
    csvs: &[PathBuf],
    loader: &CsvLoader<'_>,
    workdir: &Path,
    name: &str,
) -> Result<PathBuf> {
    let staging = workdir.join(format!("{}_staging", name));
    fs::create_dir_all(&staging)
        .with_context(|| format!("Failed to create {}", staging.display()))?;

    let staged = stage(csvs, &staging)?;
    let combination = workdir.join(format!("{}.netflow.csv", name));
    combine(&staged, &combination)?;

    let dataset = loader.load(&combination)?;
    info!(
        "Converted {} scenario file(s) into {} instances",
        csvs.len(),
        dataset.len()
    );

    let arff = workdir.join(format!("{}.arff", name));
    dataset.save(&arff)?;
    Ok(arff)
}

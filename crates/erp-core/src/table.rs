//! Trial-level feature table
//!
//! Fixed-schema rows: identity/label fields plus a feature column set that is
//! determined once per run from configuration. The modeling stage reads the
//! written table back as untyped text and re-infers numeric columns itself.

use crate::error::{ErpError, ErpResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity and label columns present in every trial row, in output order
pub const FIXED_COLUMNS: [&str; 11] = [
    "subject",
    "task",
    "run",
    "trial_index",
    "onset_sec",
    "duration_sec",
    "sample",
    "isi_sec",
    "event_code",
    "label",
    "label_binary",
];

/// One trial of the feature table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRow {
    pub subject: String,
    pub task: String,
    pub run: String,
    /// 1-based index over retained trials of one recording
    pub trial_index: usize,
    pub onset_sec: f64,
    pub duration_sec: f64,
    pub sample: i64,
    pub isi_sec: f64,
    /// Raw label code
    pub event_code: String,
    /// Mapped class name
    pub label: String,
    /// 1 iff `label` equals the configured rare class
    pub label_binary: u8,
    /// Waveform-derived features, keyed by column name
    pub features: BTreeMap<String, f64>,
    /// Per-subject z-scored features (`z_` prefixed), added post-pass
    pub z_features: BTreeMap<String, f64>,
}

impl TrialRow {
    /// Fixed-column values in `FIXED_COLUMNS` order
    fn fixed_values(&self) -> Vec<String> {
        vec![
            self.subject.clone(),
            self.task.clone(),
            self.run.clone(),
            self.trial_index.to_string(),
            self.onset_sec.to_string(),
            self.duration_sec.to_string(),
            self.sample.to_string(),
            self.isi_sec.to_string(),
            self.event_code.clone(),
            self.label.clone(),
            self.label_binary.to_string(),
        ]
    }
}

/// Ordered trial rows with a fixed column schema
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    /// Feature column names in output order (without the `z_` variants)
    pub feature_columns: Vec<String>,
    /// `z_` column names in output order; empty when normalization is off
    pub z_columns: Vec<String>,
    pub rows: Vec<TrialRow>,
}

impl FeatureTable {
    pub fn new(feature_columns: Vec<String>) -> Self {
        Self {
            feature_columns,
            z_columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Full header: fixed columns, then features, then z-features.
    /// Falls back to the fixed columns alone when no rows survived.
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
        if !self.rows.is_empty() {
            header.extend(self.feature_columns.iter().cloned());
            header.extend(self.z_columns.iter().cloned());
        }
        header
    }

    /// Serialize the table to CSV text
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(&join_csv(&self.header()));
        out.push('\n');

        for row in &self.rows {
            let mut values = row.fixed_values();
            for column in &self.feature_columns {
                values.push(
                    row.features
                        .get(column)
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                );
            }
            for column in &self.z_columns {
                values.push(
                    row.z_features
                        .get(column)
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                );
            }
            out.push_str(&join_csv(&values));
            out.push('\n');
        }
        out
    }
}

/// Untyped tabular data read back from a CSV artifact
#[derive(Debug, Clone)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Parse CSV text with minimal quote handling
    pub fn from_csv(text: &str) -> ErpResult<Self> {
        let mut lines = text.lines().filter(|line| !line.is_empty());
        let header = lines.next().ok_or_else(|| ErpError::TableError {
            message: "table has no header row".to_string(),
        })?;

        let columns = split_csv(header);
        let mut rows = Vec::new();
        for line in lines {
            let values = split_csv(line);
            if values.len() != columns.len() {
                return Err(ErpError::TableError {
                    message: format!(
                        "row has {} values, expected {}",
                        values.len(),
                        columns.len()
                    ),
                });
            }
            rows.push(values);
        }

        Ok(RawTable { columns, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell value by row index and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }
}

/// Join values into one CSV line, quoting where needed
pub fn join_csv(values: &[String]) -> String {
    values
        .iter()
        .map(|v| quote_csv(v))
        .collect::<Vec<_>>()
        .join(",")
}

fn quote_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn split_csv(line: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                values.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    values.push(current);
    values
}

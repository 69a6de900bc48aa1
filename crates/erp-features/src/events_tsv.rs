//! Events TSV parsing and target-column resolution

use erp_core::{ErpError, ErpResult};
use std::path::PathBuf;

/// One parsed events file with its recording identity
#[derive(Debug, Clone)]
pub struct EventsFile {
    pub subject: String,
    pub task: String,
    pub run: String,
    pub path: PathBuf,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl EventsFile {
    /// Cell value for one event row by column name
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.header.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx).map(|v| v.as_str())
    }
}

/// Parse tab-separated event annotations.
///
/// Short rows are padded with empty cells; extra cells are kept so column
/// lookups by header index stay valid.
pub fn parse_events_tsv(text: &str) -> ErpResult<(Vec<String>, Vec<Vec<String>>)> {
    let mut lines = text.lines();
    let header_line = lines.next().ok_or_else(|| ErpError::EventFileError {
        reason: "events file has no header row".to_string(),
    })?;

    let header: Vec<String> = header_line.split('\t').map(|c| c.trim().to_string()).collect();
    if header.is_empty() || header.iter().all(|c| c.is_empty()) {
        return Err(ErpError::EventFileError {
            reason: "events file header is empty".to_string(),
        });
    }

    let mut rows = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let mut values: Vec<String> = line.split('\t').map(|v| v.to_string()).collect();
        while values.len() < header.len() {
            values.push(String::new());
        }
        rows.push(values);
    }

    Ok((header, rows))
}

/// Resolve the active label column for one events file.
///
/// Ordered lookup evaluated once per file: the configured target column,
/// then each configured fallback, then the literal "value" and "trial_type".
/// When nothing matches the configured name is kept; lookups on it yield
/// empty raw labels.
pub fn resolve_target_column(
    header: &[String],
    target_column: &str,
    fallback_columns: &[String],
) -> String {
    let mut candidates: Vec<&str> = vec![target_column];
    candidates.extend(fallback_columns.iter().map(|c| c.as_str()));
    candidates.push("value");
    candidates.push("trial_type");

    for candidate in candidates {
        if header.iter().any(|c| c == candidate) {
            return candidate.to_string();
        }
    }
    target_column.to_string()
}

/// Parse `sub-`/`task-`/`run-` entities from an events file stem.
///
/// `run` defaults to "1" when absent.
pub fn parse_entities(file_stem: &str) -> (String, String, String) {
    let mut subject = String::new();
    let mut task = String::new();
    let mut run = "1".to_string();

    for part in file_stem.split('_') {
        if let Some((key, value)) = part.split_once('-') {
            match key {
                "sub" => subject = value.to_string(),
                "task" => task = value.to_string(),
                "run" => run = value.to_string(),
                _ => {}
            }
        }
    }

    (subject, task, run)
}

//! Dataset discovery and recording decoding
//!
//! Event files live under `<root>/sub-*/eeg/*_events.tsv`. Each pairs with a
//! tab-separated recording matrix next to it, named `*_eeg.tsv`: a sampling
//! rate line, a `label:type` montage line, then one row of samples per time
//! point.

use anyhow::{Context, Result};
use erp_core::{Channel, ChannelKind, ErpError, ErpResult, Recording};
use erp_features::{parse_events_tsv, EventsFile, RecordingSource};
use erp_features::events_tsv::parse_entities;
use std::path::{Path, PathBuf};
use tracing::info;

/// Find and parse every events file under the dataset root, path-sorted
pub fn discover_event_files(root: &Path) -> Result<Vec<EventsFile>> {
    let mut paths: Vec<PathBuf> = Vec::new();

    for entry in std::fs::read_dir(root)
        .with_context(|| format!("cannot read dataset root {}", root.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !entry.path().is_dir() || !name.starts_with("sub-") {
            continue;
        }

        let eeg_dir = entry.path().join("eeg");
        let listing = match std::fs::read_dir(&eeg_dir) {
            Ok(listing) => listing,
            Err(_) => continue, // subject without an eeg/ directory
        };
        for file in listing {
            let path = file?.path();
            if path
                .file_name()
                .map(|n| n.to_string_lossy().ends_with("_events.tsv"))
                .unwrap_or(false)
            {
                paths.push(path);
            }
        }
    }
    paths.sort();

    let mut event_files = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read events file {}", path.display()))?;
        let (header, rows) = parse_events_tsv(&text)
            .with_context(|| format!("cannot parse events file {}", path.display()))?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let (subject, task, run) = parse_entities(&stem);

        event_files.push(EventsFile {
            subject,
            task,
            run,
            path,
            header,
            rows,
        });
    }

    info!("discovered {} event files under {}", event_files.len(), root.display());
    Ok(event_files)
}

/// Loads the recording matrix sitting next to each events file
pub struct MatrixRecordingSource;

impl RecordingSource for MatrixRecordingSource {
    fn load(&self, events: &EventsFile) -> ErpResult<Recording> {
        let path = recording_path(&events.path)?;
        let text = std::fs::read_to_string(&path).map_err(|err| ErpError::RecordingError {
            reason: format!("cannot read {}: {}", path.display(), err),
        })?;
        parse_matrix_recording(&text)
    }
}

fn recording_path(events_path: &Path) -> ErpResult<PathBuf> {
    let name = events_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stripped = name
        .strip_suffix("_events.tsv")
        .ok_or_else(|| ErpError::RecordingError {
            reason: format!("unexpected events file name: {}", name),
        })?;
    Ok(events_path.with_file_name(format!("{}_eeg.tsv", stripped)))
}

/// Parse the tab-separated recording matrix format
pub fn parse_matrix_recording(text: &str) -> ErpResult<Recording> {
    let mut lines = text.lines().filter(|line| !line.is_empty());

    let rate_line = lines.next().ok_or_else(|| ErpError::RecordingError {
        reason: "recording matrix is empty".to_string(),
    })?;
    let sampling_rate = match rate_line.split('\t').collect::<Vec<_>>()[..] {
        ["sampling_rate", value] => {
            value.trim().parse::<f64>().map_err(|_| ErpError::RecordingError {
                reason: format!("invalid sampling rate: {}", value),
            })?
        }
        _ => {
            return Err(ErpError::RecordingError {
                reason: "recording matrix must start with a sampling_rate line".to_string(),
            })
        }
    };

    let montage_line = lines.next().ok_or_else(|| ErpError::RecordingError {
        reason: "recording matrix has no montage line".to_string(),
    })?;
    let channels: Vec<Channel> = montage_line
        .split('\t')
        .map(|spec| {
            let (label, kind) = spec.split_once(':').unwrap_or((spec, "eeg"));
            Channel {
                label: label.trim().to_string(),
                kind: ChannelKind::from_type(kind),
            }
        })
        .collect();

    let mut data = Vec::new();
    for (line_idx, line) in lines.enumerate() {
        let values: Vec<&str> = line.split('\t').collect();
        if values.len() != channels.len() {
            return Err(ErpError::RecordingError {
                reason: format!(
                    "sample row {} has {} values, expected {}",
                    line_idx + 1,
                    values.len(),
                    channels.len()
                ),
            });
        }
        for value in values {
            let sample = value.trim().parse::<f64>().map_err(|_| ErpError::RecordingError {
                reason: format!("invalid sample value on row {}: {}", line_idx + 1, value),
            })?;
            data.push(sample);
        }
    }

    Recording::new(data, channels, sampling_rate)
}

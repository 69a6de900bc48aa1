//! Feature table builder
//!
//! Orchestrates per-recording event iteration, class filtering, window
//! extraction and assembly into the trial-level feature table, with an
//! optional per-subject z-normalization post-pass.

use crate::events_tsv::{resolve_target_column, EventsFile};
use crate::extractor::{feature_columns, WindowExtractor};
use crate::filters::band_pass_recording;
use erp_core::{ErpResult, FeatureTable, IsiTracker, PipelineConfig, Recording, TrialRow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

const STD_EPSILON: f64 = 1e-12;

/// Provider of the continuous recording paired with one events file.
///
/// Decode errors are recoverable: the recording is skipped and counted,
/// never aborting the run.
pub trait RecordingSource {
    fn load(&self, events: &EventsFile) -> ErpResult<Recording>;
}

/// Feature stage summary consumed by downstream reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub n_event_files: usize,
    pub n_processed_eeg_files: usize,
    pub n_skipped_eeg_files: usize,
    pub n_rows: usize,
    pub class_counts: BTreeMap<String, usize>,
    pub subject_normalization_enabled: bool,
    pub base_feature_group_count: usize,
    pub z_feature_group_count: usize,
    pub target_column: String,
    pub task_name: String,
    pub windows: Vec<erp_core::TimeWindow>,
    pub bands: Vec<erp_core::FrequencyBand>,
}

/// Builds the trial-level feature table from event files and recordings
pub struct FeatureBuilder {
    config: PipelineConfig,
    extractor: WindowExtractor,
}

impl FeatureBuilder {
    pub fn new(config: &PipelineConfig) -> Self {
        FeatureBuilder {
            config: config.clone(),
            extractor: WindowExtractor::new(config.epoch.clone()),
        }
    }

    /// Process every events/recording pair and assemble the feature table
    pub fn build(
        &mut self,
        event_files: &[EventsFile],
        source: &dyn RecordingSource,
        levels: &BTreeMap<String, String>,
    ) -> ErpResult<(FeatureTable, FeatureSummary)> {
        let analysis = self.config.analysis.clone();
        let mut table = FeatureTable::new(feature_columns(&self.config.epoch));
        let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut n_processed = 0usize;
        let mut n_skipped = 0usize;

        for events in event_files {
            let recording = match self.load_preprocessed(events, source) {
                Some(recording) => recording,
                None => {
                    n_skipped += 1;
                    continue;
                }
            };
            n_processed += 1;

            let active_column = resolve_target_column(
                &events.header,
                &analysis.target_column,
                &analysis.fallback_target_columns,
            );

            let mut isi = IsiTracker::new();
            let mut trial_index = 0usize;

            for row_idx in 0..events.rows.len() {
                let raw_label = events
                    .value(row_idx, &active_column)
                    .unwrap_or("")
                    .trim()
                    .to_string();
                let mapped_label = levels.get(&raw_label).cloned().unwrap_or_else(|| raw_label.clone());

                let onset_sec = erp_core::coerce_f64(events.value(row_idx, "onset"), 0.0);
                let duration_sec = erp_core::coerce_f64(events.value(row_idx, "duration"), 0.0);
                let sample = erp_core::coerce_i64(events.value(row_idx, "sample"), 0);

                // The ISI pointer advances on every encountered event,
                // before class filtering
                let isi_sec = isi.advance(onset_sec);

                if !analysis.class_labels.is_empty()
                    && !analysis.class_labels.contains(&mapped_label)
                {
                    continue;
                }

                let features = match self.extractor.extract(&recording, onset_sec) {
                    Some(features) => features,
                    None => continue, // boundary reject: drop the trial
                };

                trial_index += 1;
                *class_counts.entry(mapped_label.clone()).or_insert(0) += 1;

                table.rows.push(TrialRow {
                    subject: events.subject.clone(),
                    task: events.task.clone(),
                    run: events.run.clone(),
                    trial_index,
                    onset_sec,
                    duration_sec,
                    sample,
                    isi_sec,
                    event_code: raw_label,
                    label_binary: u8::from(mapped_label == analysis.rare_class),
                    label: mapped_label,
                    features,
                    z_features: BTreeMap::new(),
                });
            }
        }

        if analysis.subject_normalization {
            normalize_per_subject(&mut table);
        }

        info!(
            "feature table built: {} rows from {} of {} event files",
            table.len(),
            n_processed,
            event_files.len()
        );

        let summary = FeatureSummary {
            n_event_files: event_files.len(),
            n_processed_eeg_files: n_processed,
            n_skipped_eeg_files: n_skipped,
            n_rows: table.len(),
            class_counts,
            subject_normalization_enabled: analysis.subject_normalization,
            base_feature_group_count: table.feature_columns.len(),
            z_feature_group_count: table.z_columns.len(),
            target_column: analysis.target_column.clone(),
            task_name: analysis.task_name.clone(),
            windows: self.config.epoch.windows.clone(),
            bands: self.config.epoch.bands.clone(),
        };

        Ok((table, summary))
    }

    /// Load, restrict to EEG channels and band-pass one recording.
    /// Any failure skips the whole recording.
    fn load_preprocessed(
        &self,
        events: &EventsFile,
        source: &dyn RecordingSource,
    ) -> Option<Recording> {
        let recording = match source.load(events) {
            Ok(recording) => recording,
            Err(err) => {
                warn!("skipping recording for {}: {}", events.path.display(), err);
                return None;
            }
        };
        let eeg_only = match recording.retain_eeg() {
            Ok(recording) => recording,
            Err(err) => {
                warn!("skipping recording for {}: {}", events.path.display(), err);
                return None;
            }
        };
        match band_pass_recording(
            &eeg_only,
            self.config.preprocess.low_cutoff_hz,
            self.config.preprocess.high_cutoff_hz,
        ) {
            Ok(recording) => Some(recording),
            Err(err) => {
                warn!("skipping recording for {}: {}", events.path.display(), err);
                None
            }
        }
    }
}

/// Add `z_` columns: per subject, per base feature, `(v - mean) / std` with
/// population std, substituting 1.0 for std below `1e-12`.
fn normalize_per_subject(table: &mut FeatureTable) {
    if table.rows.is_empty() {
        return;
    }

    let mut by_subject: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, row) in table.rows.iter().enumerate() {
        by_subject.entry(row.subject.clone()).or_default().push(idx);
    }

    let columns = table.feature_columns.clone();
    for indices in by_subject.values() {
        for column in &columns {
            let values: Vec<f64> = indices
                .iter()
                .map(|&idx| table.rows[idx].features[column])
                .collect();
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
            let std = if std < STD_EPSILON { 1.0 } else { std };

            for &idx in indices {
                let value = table.rows[idx].features[column];
                table.rows[idx]
                    .z_features
                    .insert(format!("z_{}", column), (value - mean) / std);
            }
        }
    }

    table.z_columns = columns.iter().map(|c| format!("z_{}", c)).collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_core::{Channel, ErpError};
    use std::path::PathBuf;

    struct MapSource {
        recordings: BTreeMap<String, Recording>,
    }

    impl RecordingSource for MapSource {
        fn load(&self, events: &EventsFile) -> ErpResult<Recording> {
            self.recordings
                .get(&events.subject)
                .cloned()
                .ok_or_else(|| ErpError::RecordingError {
                    reason: format!("no recording for subject {}", events.subject),
                })
        }
    }

    fn oddball_levels() -> BTreeMap<String, String> {
        let mut levels = BTreeMap::new();
        levels.insert("1".to_string(), "Frequent_NonTarget".to_string());
        levels.insert("2".to_string(), "Rare_Target".to_string());
        levels
    }

    fn events_file(subject: &str, onsets: &[f64], codes: &[&str]) -> EventsFile {
        let header = vec![
            "onset".to_string(),
            "duration".to_string(),
            "sample".to_string(),
            "value".to_string(),
        ];
        let rows = onsets
            .iter()
            .zip(codes)
            .map(|(onset, code)| {
                vec![
                    onset.to_string(),
                    "0.1".to_string(),
                    ((onset * 100.0) as i64).to_string(),
                    code.to_string(),
                ]
            })
            .collect();
        EventsFile {
            subject: subject.to_string(),
            task: "VisualOddball".to_string(),
            run: "1".to_string(),
            path: PathBuf::from(format!("sub-{}_task-VisualOddball_events.tsv", subject)),
            header,
            rows,
        }
    }

    /// 10 s, 2-channel, 100 Hz recording with mild per-sample variation
    fn synthetic_recording(seed: f64) -> Recording {
        let n = 1000;
        let mut data = Vec::with_capacity(2 * n);
        for i in 0..n {
            let t = i as f64 / 100.0;
            data.push((t + seed).powi(2) * 0.01);
            data.push((2.0 * std::f64::consts::PI * 6.0 * (t + seed)).sin());
        }
        Recording::new(data, vec![Channel::eeg("Cz"), Channel::eeg("Pz")], 100.0).unwrap()
    }

    fn oddball_source(subjects: &[&str]) -> MapSource {
        let recordings = subjects
            .iter()
            .enumerate()
            .map(|(i, s)| (s.to_string(), synthetic_recording(i as f64 * 0.3)))
            .collect();
        MapSource { recordings }
    }

    #[test]
    fn test_end_to_end_oddball_scenario() {
        let config = PipelineConfig::default();
        let mut builder = FeatureBuilder::new(&config);

        let onsets = [1.0, 2.0, 3.0, 4.0, 5.0];
        let codes = ["1", "2", "1", "2", "1"];
        let files: Vec<EventsFile> = ["001", "002", "003"]
            .iter()
            .map(|s| events_file(s, &onsets, &codes))
            .collect();
        let source = oddball_source(&["001", "002", "003"]);

        let (table, summary) = builder.build(&files, &source, &oddball_levels()).unwrap();

        assert_eq!(table.len(), 15);
        assert_eq!(summary.n_event_files, 3);
        assert_eq!(summary.n_processed_eeg_files, 3);
        assert_eq!(summary.n_skipped_eeg_files, 0);
        assert_eq!(summary.class_counts["Rare_Target"], 6);
        assert_eq!(summary.class_counts["Frequent_NonTarget"], 9);

        let binary_sum: u32 = table.rows.iter().map(|r| r.label_binary as u32).sum();
        assert_eq!(binary_sum, 6);

        // Per recording: trial_index 1..=5 and ISI [0, 1, 1, 1, 1]
        for subject in ["001", "002", "003"] {
            let rows: Vec<&TrialRow> = table
                .rows
                .iter()
                .filter(|r| r.subject == subject)
                .collect();
            assert_eq!(rows.len(), 5);
            let indices: Vec<usize> = rows.iter().map(|r| r.trial_index).collect();
            assert_eq!(indices, vec![1, 2, 3, 4, 5]);
            let isis: Vec<f64> = rows.iter().map(|r| r.isi_sec).collect();
            assert_eq!(isis, vec![0.0, 1.0, 1.0, 1.0, 1.0]);
        }

        // label_binary law holds on every row
        for row in &table.rows {
            assert_eq!(row.label_binary == 1, row.label == "Rare_Target");
        }
    }

    #[test]
    fn test_isi_reflects_filtered_out_events() {
        let mut config = PipelineConfig::default();
        config.analysis.class_labels = vec!["Frequent_NonTarget".to_string()];
        config.analysis.subject_normalization = false;
        let mut builder = FeatureBuilder::new(&config);

        // Middle event is filtered out, but still advances the ISI pointer
        let files = vec![events_file("001", &[1.0, 2.5, 3.0], &["1", "2", "1"])];
        let source = oddball_source(&["001"]);

        let (table, _) = builder.build(&files, &source, &oddball_levels()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].isi_sec, 0.0);
        // Gap from the filtered 2.5 s event, not from the retained 1.0 s one
        assert!((table.rows[1].isi_sec - 0.5).abs() < 1e-12);
        assert_eq!(table.rows[1].trial_index, 2);
    }

    #[test]
    fn test_boundary_rejected_trials_drop_without_index_gap() {
        let mut config = PipelineConfig::default();
        config.analysis.subject_normalization = false;
        let mut builder = FeatureBuilder::new(&config);

        // First onset is too close to the recording start and is dropped
        let files = vec![events_file("001", &[0.1, 2.0, 3.0], &["1", "1", "1"])];
        let source = oddball_source(&["001"]);

        let (table, _) = builder.build(&files, &source, &oddball_levels()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].trial_index, 1);
        assert_eq!(table.rows[0].onset_sec, 2.0);
        // ISI still measured from the dropped event
        assert!((table.rows[0].isi_sec - 1.9).abs() < 1e-12);
    }

    #[test]
    fn test_failed_recording_skips_whole_file() {
        let config = PipelineConfig::default();
        let mut builder = FeatureBuilder::new(&config);

        let files = vec![
            events_file("001", &[1.0, 2.0], &["1", "2"]),
            events_file("404", &[1.0, 2.0], &["1", "2"]),
        ];
        let source = oddball_source(&["001"]); // no recording for 404

        let (table, summary) = builder.build(&files, &source, &oddball_levels()).unwrap();
        assert_eq!(summary.n_event_files, 2);
        assert_eq!(summary.n_processed_eeg_files, 1);
        assert_eq!(summary.n_skipped_eeg_files, 1);
        assert!(table.rows.iter().all(|r| r.subject == "001"));
    }

    #[test]
    fn test_subject_normalization_moments() {
        let mut config = PipelineConfig::default();
        config.analysis.class_labels.clear(); // keep every event
        let mut builder = FeatureBuilder::new(&config);

        let onsets = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let codes = ["1"; 6];
        let files: Vec<EventsFile> = ["001", "002"]
            .iter()
            .map(|s| events_file(s, &onsets, &codes))
            .collect();
        let source = oddball_source(&["001", "002"]);

        let (table, summary) = builder.build(&files, &source, &oddball_levels()).unwrap();
        assert!(summary.subject_normalization_enabled);
        assert_eq!(
            summary.z_feature_group_count,
            summary.base_feature_group_count
        );

        for subject in ["001", "002"] {
            let rows: Vec<&TrialRow> = table
                .rows
                .iter()
                .filter(|r| r.subject == subject)
                .collect();
            for column in &table.feature_columns {
                let base: Vec<f64> = rows.iter().map(|r| r.features[column]).collect();
                let n = base.len() as f64;
                let base_mean = base.iter().sum::<f64>() / n;
                let base_std =
                    (base.iter().map(|v| (v - base_mean).powi(2)).sum::<f64>() / n).sqrt();

                let z_column = format!("z_{}", column);
                let z: Vec<f64> = rows.iter().map(|r| r.z_features[&z_column]).collect();
                let z_mean = z.iter().sum::<f64>() / n;
                let z_std = (z.iter().map(|v| (v - z_mean).powi(2)).sum::<f64>() / n).sqrt();

                assert!(z_mean.abs() < 1e-9, "{} mean {}", z_column, z_mean);
                if base_std >= STD_EPSILON {
                    assert!((z_std - 1.0).abs() < 1e-9, "{} std {}", z_column, z_std);
                } else {
                    // Constant column: division by the substituted 1.0
                    for (zv, bv) in z.iter().zip(&base) {
                        assert_eq!(*zv, bv - base_mean);
                    }
                }
            }
        }
    }

    #[test]
    fn test_normalization_disabled_adds_no_columns() {
        let mut config = PipelineConfig::default();
        config.analysis.subject_normalization = false;
        let mut builder = FeatureBuilder::new(&config);

        let files = vec![events_file("001", &[1.0, 2.0], &["1", "2"])];
        let source = oddball_source(&["001"]);

        let (table, summary) = builder.build(&files, &source, &oddball_levels()).unwrap();
        assert!(table.z_columns.is_empty());
        assert_eq!(summary.z_feature_group_count, 0);
        assert!(table.rows.iter().all(|r| r.z_features.is_empty()));
    }

    #[test]
    fn test_missing_target_column_yields_no_rows_with_allowlist() {
        let config = PipelineConfig::default();
        let mut builder = FeatureBuilder::new(&config);

        let mut file = events_file("001", &[1.0, 2.0], &["1", "2"]);
        file.header[3] = "unrelated".to_string(); // drop the value column
        let source = oddball_source(&["001"]);

        let (table, summary) = builder.build(&[file], &source, &oddball_levels()).unwrap();
        assert_eq!(summary.n_processed_eeg_files, 1);
        assert_eq!(table.len(), 0);
    }
}

//! Subject-grouped k-fold cross-validation
//!
//! Folds are built over subjects, never over trials, so no subject appears in
//! both a training and a test partition. Fold assignment is deterministic:
//! subjects ordered by trial count descending (name ascending on ties) are
//! placed one by one into the currently lightest fold.

use crate::model::{LogisticModel, MajorityBaseline, Predictor};
use erp_core::{join_csv, modeling_error, ErpResult, ModelingConfig, RawTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Columns never offered to the classifier
pub const EXCLUDED_COLUMNS: [&str; 6] = [
    "subject",
    "task",
    "run",
    "event_code",
    "label",
    "label_binary",
];

/// One evaluated fold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldRecord {
    pub fold: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub n_test_subjects: usize,
    /// Sorted, comma-joined test subject identifiers
    pub test_subjects: String,
    pub model_balanced_accuracy: f64,
    pub baseline_balanced_accuracy: f64,
}

/// Modeling stage summary consumed by downstream reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelingSummary {
    pub n_rows: usize,
    pub n_subjects: usize,
    pub n_splits: usize,
    pub feature_columns: Vec<String>,
    pub mean_model_balanced_accuracy: f64,
    pub std_model_balanced_accuracy: f64,
    pub mean_baseline_balanced_accuracy: f64,
    pub std_baseline_balanced_accuracy: f64,
}

/// Feature columns of a read-back table: every column outside the exclusion
/// set whose cells all parse as floats. Parse-only selection: "nan" and
/// "inf" cells keep a column numeric.
pub fn infer_feature_columns(table: &RawTable) -> Vec<String> {
    table
        .columns
        .iter()
        .filter(|column| !EXCLUDED_COLUMNS.contains(&column.as_str()))
        .filter(|column| {
            let idx = table
                .column_index(column)
                .expect("column taken from the table itself");
            table
                .rows
                .iter()
                .all(|row| row[idx].trim().parse::<f64>().is_ok())
        })
        .cloned()
        .collect()
}

/// Deterministic grouped fold assignment. Returns per-fold subject lists.
fn assign_folds(subject_counts: &BTreeMap<String, usize>, n_splits: usize) -> Vec<Vec<String>> {
    let mut ordered: Vec<(&String, &usize)> = subject_counts.iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut folds: Vec<Vec<String>> = vec![Vec::new(); n_splits];
    let mut loads = vec![0usize; n_splits];

    for (subject, &count) in ordered {
        let lightest = loads
            .iter()
            .enumerate()
            .min_by_key(|(idx, &load)| (load, *idx))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        folds[lightest].push(subject.clone());
        loads[lightest] += count;
    }
    folds
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() < 2 {
        0.0
    } else {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
    };
    (mean, std)
}

/// Runs the grouped cross-validation over a read-back feature table
pub struct CrossValidator {
    config: ModelingConfig,
}

impl CrossValidator {
    pub fn new(config: &ModelingConfig) -> Self {
        CrossValidator {
            config: config.clone(),
        }
    }

    pub fn run(&self, table: &RawTable) -> ErpResult<(Vec<FoldRecord>, ModelingSummary)> {
        if table.is_empty() {
            return Err(modeling_error!(
                "feature table is empty, nothing to cross-validate"
            ));
        }

        let feature_columns = infer_feature_columns(table);
        if feature_columns.is_empty() {
            return Err(modeling_error!(
                "no numeric feature columns found in the table"
            ));
        }

        let subject_idx = table
            .column_index("subject")
            .ok_or_else(|| modeling_error!("table has no subject column"))?;
        let label_idx = table
            .column_index("label_binary")
            .ok_or_else(|| modeling_error!("table has no label_binary column"))?;
        let feature_idx: Vec<usize> = feature_columns
            .iter()
            .map(|c| table.column_index(c).expect("column inferred from table"))
            .collect();

        let mut subject_counts: BTreeMap<String, usize> = BTreeMap::new();
        for row in &table.rows {
            *subject_counts.entry(row[subject_idx].clone()).or_insert(0) += 1;
        }
        let n_subjects = subject_counts.len();
        if n_subjects < 2 {
            return Err(modeling_error!(
                "need at least 2 subjects for subject-wise cross-validation, got {}",
                n_subjects
            ));
        }

        let n_splits = self.config.n_splits.clamp(2, n_subjects);
        let folds = assign_folds(&subject_counts, n_splits);
        info!(
            "cross-validating {} rows from {} subjects over {} folds",
            table.rows.len(),
            n_subjects,
            n_splits
        );

        let rows: Vec<(String, Vec<f64>, u8)> = table
            .rows
            .iter()
            .map(|row| {
                let features = feature_idx
                    .iter()
                    .map(|&idx| row[idx].trim().parse::<f64>().unwrap_or(0.0))
                    .collect();
                let label = u8::from(row[label_idx].trim() == "1");
                (row[subject_idx].clone(), features, label)
            })
            .collect();

        let mut records = Vec::with_capacity(n_splits);
        let mut model_scores = Vec::with_capacity(n_splits);
        let mut baseline_scores = Vec::with_capacity(n_splits);
        for (fold_idx, test_subjects) in folds.iter().enumerate() {
            let mut x_train = Vec::new();
            let mut y_train = Vec::new();
            let mut x_test = Vec::new();
            let mut y_test = Vec::new();

            for (subject, features, label) in &rows {
                if test_subjects.contains(subject) {
                    x_test.push(features.clone());
                    y_test.push(*label);
                } else {
                    x_train.push(features.clone());
                    y_train.push(*label);
                }
            }

            let mut model = LogisticModel::new(&self.config);
            model.fit(&x_train, &y_train)?;
            let mut baseline = MajorityBaseline::default();
            baseline.fit(&x_train, &y_train)?;

            let mut sorted_subjects = test_subjects.clone();
            sorted_subjects.sort();

            // Fold rows carry rounded scores; the aggregates below are
            // computed over the unrounded series
            let model_score = model.score(&x_test, &y_test);
            let baseline_score = baseline.score(&x_test, &y_test);
            model_scores.push(model_score);
            baseline_scores.push(baseline_score);

            records.push(FoldRecord {
                fold: fold_idx + 1,
                n_train: x_train.len(),
                n_test: x_test.len(),
                n_test_subjects: test_subjects.len(),
                test_subjects: sorted_subjects.join(","),
                model_balanced_accuracy: round6(model_score),
                baseline_balanced_accuracy: round6(baseline_score),
            });
        }

        let summary = summarize(
            table.rows.len(),
            n_subjects,
            n_splits,
            feature_columns,
            &model_scores,
            &baseline_scores,
        );

        Ok((records, summary))
    }
}

/// Aggregate unrounded per-fold score series into the run summary,
/// rounding only at this boundary
fn summarize(
    n_rows: usize,
    n_subjects: usize,
    n_splits: usize,
    feature_columns: Vec<String>,
    model_scores: &[f64],
    baseline_scores: &[f64],
) -> ModelingSummary {
    let (model_mean, model_std) = mean_and_std(model_scores);
    let (baseline_mean, baseline_std) = mean_and_std(baseline_scores);

    ModelingSummary {
        n_rows,
        n_subjects,
        n_splits,
        feature_columns,
        mean_model_balanced_accuracy: round6(model_mean),
        std_model_balanced_accuracy: round6(model_std),
        mean_baseline_balanced_accuracy: round6(baseline_mean),
        std_baseline_balanced_accuracy: round6(baseline_std),
    }
}

/// Serialize fold records to the fold-metrics CSV artifact
pub fn fold_metrics_csv(records: &[FoldRecord]) -> String {
    let mut out = String::new();
    out.push_str("fold,n_train,n_test,n_test_subjects,test_subjects,model_balanced_accuracy,baseline_balanced_accuracy\n");
    for record in records {
        let values = vec![
            record.fold.to_string(),
            record.n_train.to_string(),
            record.n_test.to_string(),
            record.n_test_subjects.to_string(),
            record.test_subjects.clone(),
            record.model_balanced_accuracy.to_string(),
            record.baseline_balanced_accuracy.to_string(),
        ];
        out.push_str(&join_csv(&values));
        out.push('\n');
    }
    out
}

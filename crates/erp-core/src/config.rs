//! Immutable run configuration for the ERP pipeline
//!
//! One `PipelineConfig` value is built up front and threaded explicitly into
//! every component; nothing reads configuration from ambient state.

use crate::error::{ErpError, ErpResult};
use serde::{Deserialize, Serialize};

/// Named time window relative to stimulus onset (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub name: String,
    pub start_sec: f64,
    pub end_sec: f64,
}

impl TimeWindow {
    pub fn new(name: &str, start_sec: f64, end_sec: f64) -> Self {
        Self {
            name: name.to_string(),
            start_sec,
            end_sec,
        }
    }
}

/// Frequency band definition for spectral analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub name: String,
    pub low_hz: f64,
    pub high_hz: f64,
}

impl FrequencyBand {
    pub fn new(name: &str, low_hz: f64, high_hz: f64) -> Self {
        Self {
            name: name.to_string(),
            low_hz,
            high_hz,
        }
    }

    /// Canonical EEG bands used by the oddball analysis
    pub fn eeg_bands() -> Vec<FrequencyBand> {
        vec![
            FrequencyBand::new("theta", 4.0, 7.0),
            FrequencyBand::new("alpha", 8.0, 12.0),
            FrequencyBand::new("beta", 13.0, 30.0),
        ]
    }
}

/// Event selection and labeling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Preferred label column in the events files
    pub target_column: String,
    /// Ordered fallback columns tried when the target column is absent
    pub fallback_target_columns: Vec<String>,
    /// Task name used to locate the events sidecar
    pub task_name: String,
    /// Allow-list of mapped class labels; empty keeps every event
    pub class_labels: Vec<String>,
    /// Class name that maps to `label_binary == 1`
    pub rare_class: String,
    /// Enable per-subject z-score normalization of feature columns
    pub subject_normalization: bool,
}

/// Epoch geometry and derived feature definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochConfig {
    /// Epoch start relative to onset (seconds, usually negative)
    pub tmin_sec: f64,
    /// Epoch end relative to onset (seconds)
    pub tmax_sec: f64,
    /// Baseline window relative to onset (seconds)
    pub baseline_start_sec: f64,
    pub baseline_end_sec: f64,
    /// Named sub-windows averaged into scalar features
    pub windows: Vec<TimeWindow>,
    /// Named frequency bands for band-power features
    pub bands: Vec<FrequencyBand>,
}

/// Band-pass preprocessing applied to EEG channels before epoching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub low_cutoff_hz: f64,
    pub high_cutoff_hz: f64,
}

/// Cross-validation and classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelingConfig {
    /// Requested fold count; clamped into `[2, n_subjects]` at run time
    pub n_splits: usize,
    /// Seed for classifier weight initialization
    pub random_seed: u64,
    /// L2 regularization strength
    pub l2_penalty: f64,
    /// Gradient descent iteration budget
    pub max_iterations: usize,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub analysis: AnalysisConfig,
    pub epoch: EpochConfig,
    pub preprocess: PreprocessConfig,
    pub modeling: ModelingConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_column: "value".to_string(),
            fallback_target_columns: vec!["trial_type".to_string()],
            task_name: "VisualOddball".to_string(),
            class_labels: vec![
                "Frequent_NonTarget".to_string(),
                "Rare_Target".to_string(),
            ],
            rare_class: "Rare_Target".to_string(),
            subject_normalization: true,
        }
    }
}

impl Default for EpochConfig {
    fn default() -> Self {
        Self {
            tmin_sec: -0.2,
            tmax_sec: 0.8,
            baseline_start_sec: -0.2,
            baseline_end_sec: 0.0,
            windows: vec![
                TimeWindow::new("n1", 0.08, 0.15),
                TimeWindow::new("p2", 0.15, 0.25),
                TimeWindow::new("p3", 0.25, 0.50),
            ],
            bands: FrequencyBand::eeg_bands(),
        }
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            low_cutoff_hz: 0.1,
            high_cutoff_hz: 30.0,
        }
    }
}

impl Default for ModelingConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            random_seed: 42,
            l2_penalty: 1e-3,
            max_iterations: 500,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            epoch: EpochConfig::default(),
            preprocess: PreprocessConfig::default(),
            modeling: ModelingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate the full configuration
    pub fn validate(&self) -> ErpResult<()> {
        if self.epoch.tmin_sec >= self.epoch.tmax_sec {
            return Err(ErpError::ConfigError {
                message: format!(
                    "epoch bounds inverted: tmin {} >= tmax {}",
                    self.epoch.tmin_sec, self.epoch.tmax_sec
                ),
            });
        }

        if self.epoch.baseline_start_sec >= self.epoch.baseline_end_sec {
            return Err(ErpError::ConfigError {
                message: format!(
                    "baseline bounds inverted: start {} >= end {}",
                    self.epoch.baseline_start_sec, self.epoch.baseline_end_sec
                ),
            });
        }

        for window in &self.epoch.windows {
            if window.start_sec >= window.end_sec {
                return Err(ErpError::ConfigError {
                    message: format!("window '{}' has inverted bounds", window.name),
                });
            }
        }

        for band in &self.epoch.bands {
            if band.low_hz >= band.high_hz || band.low_hz < 0.0 {
                return Err(ErpError::ConfigError {
                    message: format!("band '{}' has invalid bounds", band.name),
                });
            }
        }

        if self.preprocess.low_cutoff_hz >= self.preprocess.high_cutoff_hz {
            return Err(ErpError::ConfigError {
                message: "band-pass low cutoff must be below high cutoff".to_string(),
            });
        }

        if self.modeling.n_splits < 2 {
            return Err(ErpError::ConfigError {
                message: "cross-validation requires at least 2 folds".to_string(),
            });
        }

        if self.modeling.max_iterations == 0 {
            return Err(ErpError::ConfigError {
                message: "classifier iteration budget must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

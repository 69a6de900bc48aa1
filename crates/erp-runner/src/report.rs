//! Run artifacts and JSON reporting

use anyhow::{Context, Result};
use chrono::Utc;
use erp_core::PipelineConfig;
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// Identity block written alongside the run's metric artifacts
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub started_at: String,
    pub data_root: String,
    pub output_root: String,
    pub config: PipelineConfig,
}

impl RunInfo {
    pub fn new(data_root: &Path, output_root: &Path, config: &PipelineConfig) -> Self {
        RunInfo {
            run_id: Uuid::new_v4(),
            started_at: Utc::now().to_rfc3339(),
            data_root: data_root.display().to_string(),
            output_root: output_root.display().to_string(),
            config: config.clone(),
        }
    }
}

/// Serialize a value as pretty JSON into `path`
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("cannot serialize JSON artifact")?;
    std::fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

/// Write text into `path`, creating parent directories as needed
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_info_serializes_to_json() {
        let config = PipelineConfig::default();
        let info = RunInfo::new(Path::new("/data"), Path::new("outputs"), &config);

        let json = serde_json::to_string_pretty(&info).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["run_id"].is_string());
        assert_eq!(parsed["data_root"], "/data");
        assert_eq!(parsed["config"]["modeling"]["n_splits"], 5);
    }
}

//! Events sidecar loading
//!
//! The task-level events sidecar describes categorical levels for the
//! "value" column. A missing or malformed sidecar degrades silently to an
//! empty mapping; it never fails the run.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Load the `task-<name>_events.json` sidecar and return the raw-code →
/// semantic-label mapping, or an empty mapping if absent/malformed.
pub fn load_event_levels(root: &Path, task_name: &str) -> BTreeMap<String, String> {
    let sidecar_path = root.join(format!("task-{}_events.json", task_name));
    let text = match std::fs::read_to_string(&sidecar_path) {
        Ok(text) => text,
        Err(_) => {
            debug!("events sidecar not found at {}", sidecar_path.display());
            return BTreeMap::new();
        }
    };
    parse_event_levels(&text)
}

/// Parse the `value.Levels` block of an events sidecar document
pub fn parse_event_levels(text: &str) -> BTreeMap<String, String> {
    let payload: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            debug!("malformed events sidecar: {}", err);
            return BTreeMap::new();
        }
    };

    let levels = match payload.get("value").and_then(|v| v.get("Levels")) {
        Some(serde_json::Value::Object(map)) => map,
        _ => return BTreeMap::new(),
    };

    levels
        .iter()
        .map(|(key, value)| {
            let label = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), label)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        let text = r#"{
            "value": {
                "Description": "stimulus class",
                "Levels": {
                    "1": "Frequent_NonTarget",
                    "2": "Rare_Target"
                }
            }
        }"#;
        let levels = parse_event_levels(text);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels.get("1").unwrap(), "Frequent_NonTarget");
        assert_eq!(levels.get("2").unwrap(), "Rare_Target");
    }

    #[test]
    fn test_malformed_sidecar_is_empty() {
        assert!(parse_event_levels("not json at all").is_empty());
        assert!(parse_event_levels("{}").is_empty());
        assert!(parse_event_levels(r#"{"value": "not an object"}"#).is_empty());
        assert!(parse_event_levels(r#"{"value": {"Levels": [1, 2]}}"#).is_empty());
    }

    #[test]
    fn test_missing_sidecar_is_empty() {
        let levels = load_event_levels(Path::new("/nonexistent"), "VisualOddball");
        assert!(levels.is_empty());
    }

    #[test]
    fn test_non_string_level_values_coerced() {
        let levels = parse_event_levels(r#"{"value": {"Levels": {"1": 7}}}"#);
        assert_eq!(levels.get("1").unwrap(), "7");
    }
}

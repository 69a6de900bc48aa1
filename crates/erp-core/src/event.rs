//! Stimulus event annotation helpers
//!
//! Lenient numeric coercion for annotation fields and the running
//! inter-stimulus-interval tracker. Malformed fields are defaulted, never
//! fatal for the row.

/// Coerce an annotation field to f64, defaulting on empty/"n/a"/garbage
pub fn coerce_f64(value: Option<&str>, default: f64) -> f64 {
    let value = match value {
        Some(v) => v.trim(),
        None => return default,
    };
    if value.is_empty() || value.eq_ignore_ascii_case("n/a") {
        return default;
    }
    value.parse::<f64>().unwrap_or(default)
}

/// Coerce an annotation field to i64 via float parse, defaulting on garbage
pub fn coerce_i64(value: Option<&str>, default: i64) -> i64 {
    let value = match value {
        Some(v) => v.trim(),
        None => return default,
    };
    if value.is_empty() || value.eq_ignore_ascii_case("n/a") {
        return default;
    }
    match value.parse::<f64>() {
        Ok(parsed) => parsed as i64,
        Err(_) => default,
    }
}

/// Running inter-stimulus-interval tracker.
///
/// The previous-onset pointer advances on every encountered event, before
/// any class filtering, so the ISI of a retained trial can reflect the gap
/// from a filtered-out event.
#[derive(Debug, Clone, Default)]
pub struct IsiTracker {
    previous_onset: Option<f64>,
}

impl IsiTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an onset and return the ISI for this event.
    ///
    /// First event of a file yields 0.0; later events yield
    /// `max(0, onset - previous_onset)`.
    pub fn advance(&mut self, onset_sec: f64) -> f64 {
        let isi = match self.previous_onset {
            None => 0.0,
            Some(previous) => (onset_sec - previous).max(0.0),
        };
        self.previous_onset = Some(onset_sec);
        isi
    }
}

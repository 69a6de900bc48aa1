//! ERP-Features: trial-level feature extraction for event-locked EEG
//!
//! Event sidecar/TSV loading, band-pass preprocessing, epoch windowing and
//! the feature-table builder with per-subject normalization.

pub mod builder;
pub mod events_tsv;
pub mod extractor;
pub mod filters;
pub mod sidecar;

pub use builder::{FeatureBuilder, FeatureSummary, RecordingSource};
pub use events_tsv::{parse_events_tsv, resolve_target_column, EventsFile};
pub use extractor::{feature_columns, WindowExtractor};
pub use filters::{band_pass_recording, BandPassFilter};
pub use sidecar::{load_event_levels, parse_event_levels};

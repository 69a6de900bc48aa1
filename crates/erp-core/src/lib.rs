//! ERP-Core: Foundation types for trial-level EEG feature analysis
//!
//! Events, trial rows, recordings, tables and the shared run configuration.

pub mod config;
pub mod error;
pub mod event;
pub mod recording;
pub mod table;

pub use config::*;
pub use error::{ErpError, ErpResult};
pub use event::*;
pub use recording::*;
pub use table::*;

//! Error handling for the ERP pipeline
//!
//! One error type for all pipeline stages. Fatal preconditions carry a
//! specific message naming what is missing; recoverable conditions are
//! handled locally and never reach this type.

use core::fmt;

/// Result type alias for ERP pipeline operations
pub type ErpResult<T> = Result<T, ErpError>;

/// Error type for all ERP pipeline operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ErpError {
    /// Invalid pipeline configuration
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Malformed or unreadable event annotations
    EventFileError {
        /// Description of the event file issue
        reason: String,
    },

    /// Continuous recording could not be loaded or is inconsistent
    RecordingError {
        /// Description of the recording issue
        reason: String,
    },

    /// Feature table is malformed or missing required content
    TableError {
        /// Description of the table issue
        message: String,
    },

    /// Modeling precondition failed or a fold could not be fitted
    ModelingError {
        /// Description of the modeling failure
        message: String,
    },
}

impl fmt::Display for ErpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErpError::ConfigError { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
            ErpError::EventFileError { reason } => {
                write!(f, "Event file error: {}", reason)
            }
            ErpError::RecordingError { reason } => {
                write!(f, "Recording error: {}", reason)
            }
            ErpError::TableError { message } => {
                write!(f, "Feature table error: {}", message)
            }
            ErpError::ModelingError { message } => {
                write!(f, "Modeling error: {}", message)
            }
        }
    }
}

impl std::error::Error for ErpError {}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::error::ErpError::ConfigError {
            message: format!($($arg)*),
        }
    };
}

/// Convenience macro for creating modeling errors
#[macro_export]
macro_rules! modeling_error {
    ($($arg:tt)*) => {
        $crate::error::ErpError::ModelingError {
            message: format!($($arg)*),
        }
    };
}

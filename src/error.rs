//! Custom error types for the calibration controller.
//!
//! This module defines the primary error type, `CalibrationError`, for the
//! whole crate. Using the `thiserror` crate, it provides a centralized way to
//! handle the two classes of failure the controller distinguishes:
//!
//! - **Startup-time**: `Config` (file parsing, from the `config` crate) and
//!   `Configuration` (values that parse fine but are logically invalid, such
//!   as a probe wired as its own Z endstop). These prevent the controller
//!   from being constructed at all.
//! - **Command-time**: `NotHomed`, `AlignmentNotApplied`, `ProbeFailed`,
//!   `OffsetOutOfRange`, `EndstopOutOfRange`. These surface directly to the
//!   operator as the calibration command's failure message; none of them are
//!   retried automatically, and none of them leave a partial offset applied.

use thiserror::Error;

use crate::config::AlignmentMode;

/// Convenience alias for results using the crate error type.
pub type CalResult<T> = std::result::Result<T, CalibrationError>;

/// Which endstop bound a measurement violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndstopBound {
    /// Measurement below `endstop_min`.
    Min,
    /// Measurement above `endstop_max`.
    Max,
}

impl std::fmt::Display for EndstopBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndstopBound::Min => write!(f, "Min"),
            EndstopBound::Max => write!(f, "Max"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("You must home X, Y and Z axes first (unhomed: {unhomed})")]
    NotHomed {
        /// Comma-separated list of axes that are not homed.
        unhomed: String,
    },

    #[error("Perform {0} first")]
    AlignmentNotApplied(AlignmentMode),

    #[error("Probing failed: {0}")]
    ProbeFailed(#[source] anyhow::Error),

    #[error("Communication with the machine failed: {0}")]
    Host(#[source] anyhow::Error),

    #[error(
        "Calculated offset {offset:.3} mm is out of config limits! \
         (Min: {min:.3} mm | Max: {max:.3} mm) - abort"
    )]
    OffsetOutOfRange { offset: f64, min: f64, max: f64 },

    #[error(
        "Endstop value is out of config limits! \
         ({bound}: {limit:.3} mm | Measured: {measured:.3} mm) - abort"
    )]
    EndstopOutOfRange {
        bound: EndstopBound,
        limit: f64,
        measured: f64,
    },
}

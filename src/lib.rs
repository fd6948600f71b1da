//! Automatic Z-offset calibration for machines with a probe-based travel
//! endstop and a separate physical reference surface.
//!
//! The machine homes Z against a non-contact height sensor, but the sensor's
//! trigger point does not coincide with the true reference surface. This
//! library measures both heights, computes the discrepancy, and installs it
//! as a persistent Z coordinate offset so subsequent moves are accurate
//! relative to the real surface.
//!
//! The calibration run is strictly sequential: precondition validation,
//! two-point probing, offset arithmetic, limit checks, offset application.
//! Motion, sensing, leveling, and offset bookkeeping are external
//! collaborators injected through the traits in [`hardware`].

pub mod calibration;
pub mod config;
pub mod error;
pub mod hardware;

pub use calibration::{AutoOffsetZ, CalibrationOutcome};
pub use config::{AlignmentMode, CalibrationConfig};
pub use error::{CalResult, CalibrationError};

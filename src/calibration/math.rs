//! Offset arithmetic and the custom rounding rule.
//!
//! The offset is the negated difference between the endstop trigger height
//! and the reference-surface height, corrected by the sensor-trigger
//! compensation constant and the operator's manual adjustment, then rounded
//! to three decimals with [`round_half_away`].

use tracing::debug;

use crate::config::CalibrationConfig;
use crate::hardware::Position;

/// Result of one calibration run: the offset to install plus the diagnostic
/// values the operator report is built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOutcome {
    /// Final offset, mm, rounded to 3 decimals.
    pub offset: f64,
    /// Measured reference-surface height, mm.
    pub bed_z: f64,
    /// Measured endstop trigger height, mm.
    pub endstop_z: f64,
    /// `endstop_z - bed_z` before any correction, mm.
    pub raw_diff: f64,
    /// Operator manual adjustment that went into the offset, mm.
    pub manual_adjust: f64,
}

impl CalibrationOutcome {
    /// Human-readable report, all values to 3 decimal places.
    pub fn report(&self) -> String {
        format!(
            "AutoOffsetZ:\nBed: {:.3}\nEndstop: {:.3}\nDiff: {:.3}\n\
             Manual Adjust: {:.3}\nTotal Calculated Offset: {:.3}",
            self.bed_z, self.endstop_z, self.raw_diff, self.manual_adjust, self.offset
        )
    }
}

/// Rounds half away from zero at `decimals` places.
///
/// Scale by `10^decimals`; if the fractional part of the scaled magnitude is
/// strictly below 0.5, truncate toward zero, otherwise round away from zero.
/// An exact half always moves away from zero, unlike `f64::round_ties_even`
/// style banker's rounding.
pub fn round_half_away(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let magnitude = (value * scale).abs();
    let rounded = if magnitude - magnitude.floor() < 0.5 {
        magnitude.floor()
    } else {
        magnitude.ceil()
    };
    rounded.copysign(value) / scale
}

/// Computes the calibration outcome from the two measured positions,
/// endstop point first. Pure apart from diagnostic logging.
pub fn compute_offset(
    endstop: Position,
    bed: Position,
    config: &CalibrationConfig,
) -> CalibrationOutcome {
    let raw_diff = endstop.z - bed.z;
    let offset = round_half_away(
        -raw_diff + config.endstop_switch + config.offset_adjust,
        3,
    );

    debug!(
        bed_z = bed.z,
        endstop_z = endstop.z,
        raw_diff,
        offset,
        "computed Z offset"
    );

    CalibrationOutcome {
        offset,
        bed_z: bed.z,
        endstop_z: endstop.z,
        raw_diff,
        manual_adjust: config.offset_adjust,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalibrationConfig;

    fn test_config() -> CalibrationConfig {
        CalibrationConfig::from_toml_str(
            r#"
            [stepper_z]
            endstop_pin = "PG10"

            [safe_z_home]
            z_hop = 10.0

            [bltouch]
            x_offset = -40.0
            y_offset = -10.0

            [quad_gantry_level]

            [auto_offset_z]
            probe_points = [[205.0, 305.0], [150.0, 150.0]]
            "#,
        )
        .unwrap()
    }

    fn at(z: f64) -> Position {
        Position { x: 0.0, y: 0.0, z }
    }

    #[test]
    fn test_round_half_away_boundary() {
        // Exact halves round away from zero, not to even.
        assert_eq!(round_half_away(0.1235, 3), 0.124);
        assert_eq!(round_half_away(-0.1235, 3), -0.124);
        assert_eq!(round_half_away(1.0005, 3), 1.001);
    }

    #[test]
    fn test_round_half_away_below_boundary() {
        assert_eq!(round_half_away(0.1234, 3), 0.123);
        assert_eq!(round_half_away(-0.1234, 3), -0.123);
        assert_eq!(round_half_away(0.2004999, 3), 0.2);
    }

    #[test]
    fn test_round_half_away_is_stable_on_rounded_values() {
        assert_eq!(round_half_away(0.2, 3), 0.2);
        assert_eq!(round_half_away(-1.0, 3), -1.0);
        assert_eq!(round_half_away(0.0, 3), 0.0);
    }

    #[test]
    fn test_compute_offset_reference_scenario() {
        // bed 2.000, endstop 2.300, compensation 0.5, adjust 0.0
        let outcome = compute_offset(at(2.3), at(2.0), &test_config());
        assert_eq!(outcome.offset, 0.2);
        assert_eq!(outcome.bed_z, 2.0);
        assert_eq!(outcome.endstop_z, 2.3);
        assert!((outcome.raw_diff - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_compute_offset_includes_manual_adjust() {
        let mut config = test_config();
        config.offset_adjust = 0.05;
        let outcome = compute_offset(at(2.3), at(2.0), &config);
        assert_eq!(outcome.offset, 0.25);
        assert_eq!(outcome.manual_adjust, 0.05);
    }

    #[test]
    fn test_report_formats_three_decimals() {
        let outcome = compute_offset(at(2.3), at(2.0), &test_config());
        let report = outcome.report();
        assert!(report.contains("Bed: 2.000"));
        assert!(report.contains("Endstop: 2.300"));
        assert!(report.contains("Diff: 0.300"));
        assert!(report.contains("Manual Adjust: 0.000"));
        assert!(report.contains("Total Calculated Offset: 0.200"));
    }
}

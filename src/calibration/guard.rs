//! Limit checks gating offset application.

use super::math::CalibrationOutcome;
use crate::config::CalibrationConfig;
use crate::error::{CalResult, CalibrationError, EndstopBound};

/// Rejects the outcome if the rounded offset leaves the configured range or
/// the raw endstop reading violates a configured bound. Offset bounds are
/// inclusive; an endstop bound configured as exactly 0.0 is treated as unset
/// and never rejects, regardless of the measured value. Both checks run
/// against the raw measured endstop Z.
pub fn check_limits(outcome: &CalibrationOutcome, config: &CalibrationConfig) -> CalResult<()> {
    if outcome.offset < config.offset_min || outcome.offset > config.offset_max {
        return Err(CalibrationError::OffsetOutOfRange {
            offset: outcome.offset,
            min: config.offset_min,
            max: config.offset_max,
        });
    }

    if config.endstop_min != 0.0 && outcome.endstop_z < config.endstop_min {
        return Err(CalibrationError::EndstopOutOfRange {
            bound: EndstopBound::Min,
            limit: config.endstop_min,
            measured: outcome.endstop_z,
        });
    }

    if config.endstop_max != 0.0 && outcome.endstop_z > config.endstop_max {
        return Err(CalibrationError::EndstopOutOfRange {
            bound: EndstopBound::Max,
            limit: config.endstop_max,
            measured: outcome.endstop_z,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CalibrationConfig {
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

    fn outcome(offset: f64, endstop_z: f64) -> CalibrationOutcome {
        CalibrationOutcome {
            offset,
            bed_z: 2.0,
            endstop_z,
            raw_diff: endstop_z - 2.0,
            manual_adjust: 0.0,
        }
    }

    #[test]
    fn test_offset_bounds_inclusive() {
        let cfg = config();
        assert!(check_limits(&outcome(1.0, 2.3), &cfg).is_ok());
        assert!(check_limits(&outcome(-1.0, 2.3), &cfg).is_ok());
        assert!(matches!(
            check_limits(&outcome(1.001, 2.3), &cfg),
            Err(CalibrationError::OffsetOutOfRange { .. })
        ));
        assert!(matches!(
            check_limits(&outcome(-1.001, 2.3), &cfg),
            Err(CalibrationError::OffsetOutOfRange { .. })
        ));
    }

    #[test]
    fn test_endstop_bounds_zero_means_unset() {
        // Defaults leave both endstop bounds at 0.0 = disabled.
        let cfg = config();
        assert!(check_limits(&outcome(0.2, 100.0), &cfg).is_ok());
        assert!(check_limits(&outcome(0.2, -100.0), &cfg).is_ok());
    }

    #[test]
    fn test_endstop_min_enforced_when_set() {
        let mut cfg = config();
        cfg.endstop_min = 1.5;
        assert!(check_limits(&outcome(0.2, 2.3), &cfg).is_ok());
        assert!(matches!(
            check_limits(&outcome(0.2, 1.2), &cfg),
            Err(CalibrationError::EndstopOutOfRange {
                bound: EndstopBound::Min,
                ..
            })
        ));
    }

    #[test]
    fn test_endstop_max_enforced_when_set() {
        let mut cfg = config();
        cfg.endstop_max = 4.0;
        assert!(check_limits(&outcome(0.2, 2.3), &cfg).is_ok());
        assert!(matches!(
            check_limits(&outcome(0.2, 4.2), &cfg),
            Err(CalibrationError::EndstopOutOfRange {
                bound: EndstopBound::Max,
                ..
            })
        ));
    }
}

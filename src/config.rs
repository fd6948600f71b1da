//! Typed configuration for the calibration controller.
//!
//! The on-disk format mirrors the machine's section-based host configuration:
//! the controller's own options live in `[auto_offset_z]`, while geometry it
//! depends on is read from the sections that own it (`[stepper_z]`,
//! `[safe_z_home]`, and the sensor's own `[bltouch]` or `[probe]` section).
//! Which leveling section is present selects the alignment requirement.
//!
//! ## Configuration Example
//!
//! ```toml
//! [stepper_z]
//! position_max = 250.0
//! endstop_pin = "PG10"
//!
//! [safe_z_home]
//! z_hop = 10.0
//! z_hop_speed = 15.0
//!
//! [bltouch]
//! x_offset = -40.0
//! y_offset = -10.0
//!
//! [quad_gantry_level]
//!
//! [auto_offset_z]
//! probe_points = [[205.0, 305.0], [150.0, 150.0]]
//! speed = 50.0
//! offset_adjust = 0.0
//! offset_min = -1.0
//! offset_max = 1.0
//! endstop_min = 0.0
//! endstop_max = 0.0
//! endstop_switch = 0.5
//! ```
//!
//! Files are loaded with the `config` crate and deserialized into raw section
//! structs; semantic validation runs once at load and produces
//! [`CalibrationError::Configuration`] for every invalid combination. The
//! resulting [`CalibrationConfig`] is immutable for the process lifetime.

use std::path::Path;

use serde::Deserialize;

use crate::error::{CalResult, CalibrationError};
use crate::hardware::XyPoint;

/// Which alignment procedure must have run before calibration may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentMode {
    /// `[quad_gantry_level]` is configured; it must report applied.
    GantryLevel,
    /// `[z_tilt]` is configured; it must report applied.
    ZTilt,
    /// Alignment state is deliberately not checked.
    Ignore,
}

impl std::fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignmentMode::GantryLevel => write!(f, "quad gantry leveling"),
            AlignmentMode::ZTilt => write!(f, "Z tilt"),
            AlignmentMode::Ignore => write!(f, "ignore"),
        }
    }
}

/// Which sensor section supplied the mounting offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Offsets read from `[bltouch]`.
    BlTouch,
    /// Offsets read from `[probe]`.
    Probe,
}

// ---------------------------------------------------------------------------
// Raw file sections
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
struct StepperZSection {
    position_max: Option<f64>,
    endstop_pin: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SafeZHomeSection {
    z_hop: Option<f64>,
    z_hop_speed: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct SensorSection {
    x_offset: Option<f64>,
    y_offset: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct AutoOffsetZSection {
    probe_points: Option<Vec<[f64; 2]>>,
    speed: Option<f64>,
    offset_adjust: Option<f64>,
    offset_min: Option<f64>,
    offset_max: Option<f64>,
    endstop_min: Option<f64>,
    endstop_max: Option<f64>,
    endstop_switch: Option<f64>,
    ignore_alignment: Option<bool>,
}

/// The file as parsed, before semantic validation. Leveling sections carry no
/// options this crate reads; their presence alone selects the alignment mode.
#[derive(Debug, Deserialize)]
struct RawConfig {
    stepper_z: Option<StepperZSection>,
    safe_z_home: Option<SafeZHomeSection>,
    bltouch: Option<SensorSection>,
    probe: Option<SensorSection>,
    quad_gantry_level: Option<toml::Value>,
    z_tilt: Option<toml::Value>,
    auto_offset_z: Option<AutoOffsetZSection>,
}

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

/// Immutable, validated configuration for one controller instance.
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    /// Endstop-calibration point first, reference (bed) point second.
    pub probe_points: [XyPoint; 2],
    /// Which sensor section the mounting offsets came from.
    pub sensor: SensorKind,
    /// Sensor XY mounting offset relative to the nozzle.
    pub sensor_offset: XyPoint,
    /// XY travel speed between probe points, mm/s.
    pub speed: f64,
    /// Retract height between measurements, mm. Nonzero by validation.
    pub z_hop: f64,
    /// Retract speed, mm/s.
    pub z_hop_speed: f64,
    /// Operator fine-tuning added to the computed offset, mm.
    pub offset_adjust: f64,
    /// Inclusive lower bound for the final offset, mm.
    pub offset_min: f64,
    /// Inclusive upper bound for the final offset, mm.
    pub offset_max: f64,
    /// Raw endstop reading lower bound, mm. Exactly 0.0 means "no limit".
    pub endstop_min: f64,
    /// Raw endstop reading upper bound, mm. Exactly 0.0 means "no limit".
    pub endstop_max: f64,
    /// Sensor trigger compensation constant, mm.
    pub endstop_switch: f64,
    /// Alignment requirement derived from the configured sections.
    pub alignment: AlignmentMode,
    /// Z travel limit, carried for diagnostics only.
    pub max_z: f64,
}

impl CalibrationConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> CalResult<Self> {
        let raw: RawConfig = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        Self::validate(raw)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(text: &str) -> CalResult<Self> {
        let raw: RawConfig = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> CalResult<Self> {
        let invalid = |msg: &str| CalibrationError::Configuration(msg.to_string());

        let stepper_z = raw.stepper_z.unwrap_or_default();
        let max_z = stepper_z.position_max.unwrap_or(0.0);
        let endstop_pin = stepper_z.endstop_pin.unwrap_or_default();

        // The sensor cannot be its own physical end-of-travel stop.
        let (sensor, section) = if let Some(bltouch) = raw.bltouch {
            (SensorKind::BlTouch, bltouch)
        } else if let Some(probe) = raw.probe {
            (SensorKind::Probe, probe)
        } else {
            return Err(invalid(
                "No BLTouch or probe configured in your system - check your setup",
            ));
        };
        if endstop_pin.contains("virtual_endstop") {
            return Err(invalid(
                "The probe can't be used as the Z endstop with this command. \
                 Use a physical endstop instead",
            ));
        }

        let sensor_offset = XyPoint {
            x: section.x_offset.unwrap_or(0.0),
            y: section.y_offset.unwrap_or(0.0),
        };
        if sensor_offset.x == 0.0 && sensor_offset.y == 0.0 {
            return Err(invalid(
                "Check the sensor x and y offset - they both appear to be zero",
            ));
        }

        let safe_z_home = raw
            .safe_z_home
            .ok_or_else(|| invalid("safe_z_home has to be defined for safe probing"))?;
        let z_hop = safe_z_home.z_hop.unwrap_or(0.0);
        if z_hop == 0.0 {
            return Err(invalid(
                "z_hop has to be set in safe_z_home to avoid crashing the probe",
            ));
        }
        let z_hop_speed = safe_z_home.z_hop_speed.unwrap_or(15.0);

        let options = raw.auto_offset_z.unwrap_or_default();

        let ignore_alignment = options.ignore_alignment.unwrap_or(false);
        let alignment = if raw.quad_gantry_level.is_some() {
            AlignmentMode::GantryLevel
        } else if raw.z_tilt.is_some() {
            AlignmentMode::ZTilt
        } else if ignore_alignment {
            AlignmentMode::Ignore
        } else {
            return Err(invalid(
                "Your config must include [quad_gantry_level] or [z_tilt]",
            ));
        };

        let points = options
            .probe_points
            .ok_or_else(|| invalid("probe_points must be configured"))?;
        if points.len() != 2 {
            return Err(invalid(
                "probe_points must list exactly two points: endstop, then bed",
            ));
        }
        let probe_points = [
            XyPoint {
                x: points[0][0],
                y: points[0][1],
            },
            XyPoint {
                x: points[1][0],
                y: points[1][1],
            },
        ];

        let speed = options.speed.unwrap_or(50.0);
        if speed <= 0.0 {
            return Err(invalid("speed must be above zero"));
        }

        Ok(Self {
            probe_points,
            sensor,
            sensor_offset,
            speed,
            z_hop,
            z_hop_speed,
            offset_adjust: options.offset_adjust.unwrap_or(0.0),
            offset_min: options.offset_min.unwrap_or(-1.0),
            offset_max: options.offset_max.unwrap_or(1.0),
            endstop_min: options.endstop_min.unwrap_or(0.0),
            endstop_max: options.endstop_max.unwrap_or(0.0),
            endstop_switch: options.endstop_switch.unwrap_or(0.5),
            alignment,
            max_z,
        })
    }

    /// The XY targets actually driven to, endstop point first. The sensor is
    /// not mounted at the nozzle position, so each configured point is
    /// translated by the mounting offset to center the sensor over it.
    pub fn probe_targets(&self) -> [XyPoint; 2] {
        [
            self.probe_points[0].minus(self.sensor_offset),
            self.probe_points[1].minus(self.sensor_offset),
        ]
    }
}

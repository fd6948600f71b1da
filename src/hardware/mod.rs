//! Hardware capability traits consumed by the calibration controller.
//!
//! The controller never looks collaborators up by name at runtime; it
//! receives typed trait objects at construction time. Each trait covers one
//! capability of the host machine:
//!
//! - [`HomingStatus`]: which axes the kinematics report as homed
//! - [`AlignmentStatus`]: whether a leveling procedure has been applied
//! - [`ProbeDriver`]: raw point-to-point moves and single height triggers
//! - [`PointProber`]: the full multi-point probing protocol, including any
//!   built-in repeat-probe averaging and retry discipline
//! - [`OffsetSink`]: the host's persistent Z coordinate-offset mechanism
//!
//! All traits are object-safe, `Send + Sync`, and async; a calibration run
//! awaits them strictly in sequence.

pub mod mock;

use anyhow::Result;
use async_trait::async_trait;

/// An XY location on the bed, mm.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct XyPoint {
    pub x: f64,
    pub y: f64,
}

impl XyPoint {
    /// Component-wise subtraction.
    pub fn minus(self, other: XyPoint) -> XyPoint {
        XyPoint {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

/// A measured toolhead position, mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Homing state of the three primary axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HomedAxes {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl HomedAxes {
    /// True when every axis is homed.
    pub fn all(&self) -> bool {
        self.x && self.y && self.z
    }

    /// Comma-separated names of the axes that are not homed.
    pub fn unhomed(&self) -> String {
        let mut missing = Vec::new();
        if !self.x {
            missing.push("x");
        }
        if !self.y {
            missing.push("y");
        }
        if !self.z {
            missing.push("z");
        }
        missing.join(", ")
    }
}

/// Capability: report which axes the kinematics consider homed.
#[async_trait]
pub trait HomingStatus: Send + Sync {
    async fn homed_axes(&self) -> Result<HomedAxes>;
}

/// Capability: report whether a leveling procedure has been applied in the
/// current session.
#[async_trait]
pub trait AlignmentStatus: Send + Sync {
    async fn applied(&self) -> Result<bool>;
}

/// Capability: raw motion and single height-triggered measurements.
#[async_trait]
pub trait ProbeDriver: Send + Sync {
    /// Move to the given XY at `speed` mm/s, holding the current Z.
    async fn move_xy(&self, target: XyPoint, speed: f64) -> Result<()>;

    /// Lower until the sensor triggers and return the position at trigger.
    async fn probe(&self) -> Result<Position>;

    /// Retract `height` mm along Z at `speed` mm/s.
    async fn retract(&self, height: f64, speed: f64) -> Result<()>;
}

/// Capability: the host's reusable multi-point probing protocol. The
/// implementation owns motion between points, repeat-probe averaging, and
/// retries; it returns one measured position per requested point, in order.
#[async_trait]
pub trait PointProber: Send + Sync {
    async fn probe_points(&self, points: &[XyPoint], min_points: usize) -> Result<Vec<Position>>;
}

/// Capability: set the persistent Z coordinate offset to an absolute value.
#[async_trait]
pub trait OffsetSink: Send + Sync {
    async fn set_z_offset(&self, value: f64) -> Result<()>;
}

//! Mock Hardware Implementations
//!
//! Provides simulated machine capabilities for testing without physical
//! hardware. All mocks use async-safe interior mutability (tokio `RwLock`)
//! and record every call so tests can assert ordering and arguments.
//!
//! # Available Mocks
//!
//! - `MockKinematics` - scripted homing status
//! - `MockLeveling` - scripted leveling "applied" flag
//! - `MockProbeDriver` - scripted trigger heights, recorded moves/retracts
//! - `MockPointProber` - scripted multi-point results, recorded requests
//! - `MockOffsetSink` - records every offset set

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    AlignmentStatus, HomedAxes, HomingStatus, OffsetSink, PointProber, Position, ProbeDriver,
    XyPoint,
};

// =============================================================================
// MockKinematics
// =============================================================================

/// Homing status provider with a scriptable axis set.
pub struct MockKinematics {
    homed: Arc<RwLock<HomedAxes>>,
}

impl MockKinematics {
    /// Create with all three axes homed.
    pub fn homed() -> Self {
        Self::with_axes(HomedAxes {
            x: true,
            y: true,
            z: true,
        })
    }

    /// Create with an explicit homing state.
    pub fn with_axes(axes: HomedAxes) -> Self {
        Self {
            homed: Arc::new(RwLock::new(axes)),
        }
    }

    /// Change the reported homing state.
    pub async fn set_axes(&self, axes: HomedAxes) {
        *self.homed.write().await = axes;
    }
}

#[async_trait]
impl HomingStatus for MockKinematics {
    async fn homed_axes(&self) -> Result<HomedAxes> {
        Ok(*self.homed.read().await)
    }
}

// =============================================================================
// MockLeveling
// =============================================================================

/// Leveling subsystem with a scriptable "applied" flag.
pub struct MockLeveling {
    applied: Arc<RwLock<bool>>,
}

impl MockLeveling {
    /// Create with the given applied state.
    pub fn new(applied: bool) -> Self {
        Self {
            applied: Arc::new(RwLock::new(applied)),
        }
    }

    /// Change the reported applied state.
    pub async fn set_applied(&self, applied: bool) {
        *self.applied.write().await = applied;
    }
}

#[async_trait]
impl AlignmentStatus for MockLeveling {
    async fn applied(&self) -> Result<bool> {
        Ok(*self.applied.read().await)
    }
}

// =============================================================================
// MockProbeDriver
// =============================================================================

#[derive(Default)]
struct ProbeDriverState {
    position: XyPoint,
    heights: Vec<f64>,
    next_height: usize,
    moves: Vec<(XyPoint, f64)>,
    retracts: Vec<(f64, f64)>,
    fail_probe: bool,
}

/// Raw motion/sensor driver returning scripted trigger heights in order.
///
/// # Example
///
/// ```rust,ignore
/// let driver = MockProbeDriver::with_heights(vec![2.3, 2.0]);
/// driver.move_xy(XyPoint { x: 245.0, y: 315.0 }, 50.0).await?;
/// let pos = driver.probe().await?; // z = 2.3
/// ```
pub struct MockProbeDriver {
    state: Arc<RwLock<ProbeDriverState>>,
}

impl MockProbeDriver {
    /// Create with the trigger heights to report, one per probe call.
    pub fn with_heights(heights: Vec<f64>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ProbeDriverState {
                heights,
                ..Default::default()
            })),
        }
    }

    /// Make every subsequent probe call fail.
    pub async fn fail_probes(&self) {
        self.state.write().await.fail_probe = true;
    }

    /// Recorded `(target, speed)` pairs, in call order.
    pub async fn moves(&self) -> Vec<(XyPoint, f64)> {
        self.state.read().await.moves.clone()
    }

    /// Recorded `(height, speed)` retract pairs, in call order.
    pub async fn retracts(&self) -> Vec<(f64, f64)> {
        self.state.read().await.retracts.clone()
    }
}

#[async_trait]
impl ProbeDriver for MockProbeDriver {
    async fn move_xy(&self, target: XyPoint, speed: f64) -> Result<()> {
        let mut state = self.state.write().await;
        state.position = target;
        state.moves.push((target, speed));
        Ok(())
    }

    async fn probe(&self) -> Result<Position> {
        let mut state = self.state.write().await;
        if state.fail_probe {
            bail!("probe triggered no measurement");
        }
        let index = state.next_height;
        let Some(&z) = state.heights.get(index) else {
            bail!("no scripted height for probe #{}", index + 1);
        };
        state.next_height += 1;
        Ok(Position {
            x: state.position.x,
            y: state.position.y,
            z,
        })
    }

    async fn retract(&self, height: f64, speed: f64) -> Result<()> {
        self.state.write().await.retracts.push((height, speed));
        Ok(())
    }
}

// =============================================================================
// MockPointProber
// =============================================================================

#[derive(Default)]
struct PointProberState {
    heights: Vec<f64>,
    requests: Vec<(Vec<XyPoint>, usize)>,
    fail: bool,
}

/// Multi-point probing collaborator returning one scripted height per
/// requested point.
pub struct MockPointProber {
    state: Arc<RwLock<PointProberState>>,
}

impl MockPointProber {
    /// Create with the heights to report, one per requested point.
    pub fn with_heights(heights: Vec<f64>) -> Self {
        Self {
            state: Arc::new(RwLock::new(PointProberState {
                heights,
                ..Default::default()
            })),
        }
    }

    /// Make every subsequent request fail.
    pub async fn fail_requests(&self) {
        self.state.write().await.fail = true;
    }

    /// Recorded `(points, min_points)` requests, in call order.
    pub async fn requests(&self) -> Vec<(Vec<XyPoint>, usize)> {
        self.state.read().await.requests.clone()
    }
}

#[async_trait]
impl PointProber for MockPointProber {
    async fn probe_points(&self, points: &[XyPoint], min_points: usize) -> Result<Vec<Position>> {
        let mut state = self.state.write().await;
        state.requests.push((points.to_vec(), min_points));
        if state.fail {
            bail!("probing protocol aborted");
        }
        if state.heights.len() < points.len() {
            bail!(
                "requested {} points but only {} scripted heights",
                points.len(),
                state.heights.len()
            );
        }
        Ok(points
            .iter()
            .zip(state.heights.iter())
            .map(|(point, &z)| Position {
                x: point.x,
                y: point.y,
                z,
            })
            .collect())
    }
}

// =============================================================================
// MockOffsetSink
// =============================================================================

/// Coordinate-offset mechanism recording every absolute set.
#[derive(Default)]
pub struct MockOffsetSink {
    sets: Arc<RwLock<Vec<f64>>>,
}

impl MockOffsetSink {
    /// Create with an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every value passed to `set_z_offset`, in call order.
    pub async fn history(&self) -> Vec<f64> {
        self.sets.read().await.clone()
    }

    /// The value currently installed, if any set ever happened.
    pub async fn current(&self) -> Option<f64> {
        self.sets.read().await.last().copied()
    }
}

#[async_trait]
impl OffsetSink for MockOffsetSink {
    async fn set_z_offset(&self, value: f64) -> Result<()> {
        self.sets.write().await.push(value);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

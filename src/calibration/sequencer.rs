//! Probe sequencing strategies.
//!
//! A strategy measures exactly two heights, endstop point first, reference
//! point second, at XY targets already translated for the sensor mounting
//! offset. Two interchangeable implementations exist behind [`ProbeStrategy`]:
//!
//! - [`DelegatedStrategy`] (default): hands the two-point list to the host's
//!   multi-point probing collaborator with a minimum-points constraint of
//!   two, inheriting its repeat-probe averaging and retry discipline.
//! - [`ManualStrategy`]: issues raw moves and single height queries itself,
//!   retracting by the configured Z-hop after each measurement so a lowered
//!   sensor is never dragged across the bed.
//!
//! Neither strategy retries; a failed trigger propagates to the controller.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::config::CalibrationConfig;
use crate::hardware::{PointProber, Position, ProbeDriver, XyPoint};

/// The two measured positions, consumed once by the offset calculator.
#[derive(Debug, Clone, Copy)]
pub struct ProbeResult {
    /// Measurement above the endstop-calibration point.
    pub endstop: Position,
    /// Measurement above the reference surface.
    pub bed: Position,
}

/// Capability to measure two points and return two heights.
#[async_trait]
pub trait ProbeStrategy: Send + Sync {
    /// Measures both targets in order: endstop point, then reference point.
    async fn measure(&self, targets: [XyPoint; 2]) -> Result<ProbeResult>;
}

/// Delegates the full two-point protocol to the host's [`PointProber`].
pub struct DelegatedStrategy {
    prober: Arc<dyn PointProber>,
}

impl DelegatedStrategy {
    pub fn new(prober: Arc<dyn PointProber>) -> Self {
        Self { prober }
    }
}

#[async_trait]
impl ProbeStrategy for DelegatedStrategy {
    async fn measure(&self, targets: [XyPoint; 2]) -> Result<ProbeResult> {
        info!(
            endstop_point = ?targets[0],
            bed_point = ?targets[1],
            "starting delegated two-point probe"
        );

        let positions = self
            .prober
            .probe_points(&targets, 2)
            .await
            .context("multi-point probing protocol failed")?;

        if positions.len() < 2 {
            bail!(
                "probing protocol returned {} positions, expected 2",
                positions.len()
            );
        }

        Ok(ProbeResult {
            endstop: positions[0],
            bed: positions[1],
        })
    }
}

/// Drives the machine point to point and triggers single measurements.
pub struct ManualStrategy {
    driver: Arc<dyn ProbeDriver>,
    speed: f64,
    z_hop: f64,
    z_hop_speed: f64,
}

impl ManualStrategy {
    pub fn new(driver: Arc<dyn ProbeDriver>, config: &CalibrationConfig) -> Self {
        Self {
            driver,
            speed: config.speed,
            z_hop: config.z_hop,
            z_hop_speed: config.z_hop_speed,
        }
    }

    async fn probe_at(&self, target: XyPoint) -> Result<Position> {
        self.driver
            .move_xy(target, self.speed)
            .await
            .with_context(|| format!("failed to move to ({:.3}, {:.3})", target.x, target.y))?;

        let position = self
            .driver
            .probe()
            .await
            .context("height measurement did not trigger")?;

        // Retract before traveling so the sensor clears the bed.
        self.driver
            .retract(self.z_hop, self.z_hop_speed)
            .await
            .context("failed to retract after measurement")?;

        Ok(position)
    }
}

#[async_trait]
impl ProbeStrategy for ManualStrategy {
    async fn measure(&self, targets: [XyPoint; 2]) -> Result<ProbeResult> {
        info!(
            endstop_point = ?targets[0],
            bed_point = ?targets[1],
            "starting manual two-point probe"
        );

        let endstop = self.probe_at(targets[0]).await?;
        let bed = self.probe_at(targets[1]).await?;

        Ok(ProbeResult { endstop, bed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::{MockPointProber, MockProbeDriver};

    const TARGETS: [XyPoint; 2] = [
        XyPoint { x: 245.0, y: 315.0 },
        XyPoint { x: 190.0, y: 160.0 },
    ];

    fn manual_config() -> CalibrationConfig {
        CalibrationConfig::from_toml_str(
            r#"
            [stepper_z]
            endstop_pin = "PG10"

            [safe_z_home]
            z_hop = 10.0
            z_hop_speed = 15.0

            [bltouch]
            x_offset = -40.0
            y_offset = -10.0

            [quad_gantry_level]

            [auto_offset_z]
            probe_points = [[205.0, 305.0], [150.0, 150.0]]
            speed = 50.0
            "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_delegated_passes_two_points_min_two() {
        let prober = Arc::new(MockPointProber::with_heights(vec![2.3, 2.0]));
        let strategy = DelegatedStrategy::new(prober.clone());

        let result = strategy.measure(TARGETS).await.unwrap();
        assert_eq!(result.endstop.z, 2.3);
        assert_eq!(result.bed.z, 2.0);

        let requests = prober.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, TARGETS.to_vec());
        assert_eq!(requests[0].1, 2);
    }

    #[tokio::test]
    async fn test_delegated_propagates_failure() {
        let prober = Arc::new(MockPointProber::with_heights(vec![]));
        prober.fail_requests().await;
        let strategy = DelegatedStrategy::new(prober);

        assert!(strategy.measure(TARGETS).await.is_err());
    }

    #[tokio::test]
    async fn test_manual_interleaves_move_probe_retract() {
        let driver = Arc::new(MockProbeDriver::with_heights(vec![2.3, 2.0]));
        let strategy = ManualStrategy::new(driver.clone(), &manual_config());

        let result = strategy.measure(TARGETS).await.unwrap();
        assert_eq!(result.endstop.z, 2.3);
        assert_eq!(result.endstop.x, 245.0);
        assert_eq!(result.bed.z, 2.0);
        assert_eq!(result.bed.y, 160.0);

        let moves = driver.moves().await;
        assert_eq!(moves, vec![(TARGETS[0], 50.0), (TARGETS[1], 50.0)]);

        // One retract per measurement, both at the configured hop.
        assert_eq!(driver.retracts().await, vec![(10.0, 15.0), (10.0, 15.0)]);
    }

    #[tokio::test]
    async fn test_manual_propagates_trigger_failure() {
        let driver = Arc::new(MockProbeDriver::with_heights(vec![2.3, 2.0]));
        driver.fail_probes().await;
        let strategy = ManualStrategy::new(driver.clone(), &manual_config());

        assert!(strategy.measure(TARGETS).await.is_err());
        // Failure happened at the first point; no second move was issued.
        assert_eq!(driver.moves().await.len(), 1);
    }
}

//! The calibration controller.
//!
//! One run is strictly sequential: precondition validation, two-point
//! probing, offset arithmetic, limit checks, offset application. No state
//! survives a run; each invocation is independent and restartable.

pub mod guard;
pub mod math;
pub mod sequencer;

use std::sync::Arc;

use tracing::info;

pub use math::CalibrationOutcome;
pub use sequencer::{DelegatedStrategy, ManualStrategy, ProbeResult, ProbeStrategy};

use crate::config::{AlignmentMode, CalibrationConfig};
use crate::error::{CalResult, CalibrationError};
use crate::hardware::{AlignmentStatus, HomingStatus, OffsetSink};

/// The Z-offset calibration controller.
///
/// Collaborators are injected at construction; the controller performs no
/// runtime lookup. The configuration is immutable and shared for the process
/// lifetime.
pub struct AutoOffsetZ {
    config: Arc<CalibrationConfig>,
    kinematics: Arc<dyn HomingStatus>,
    alignment: Option<Arc<dyn AlignmentStatus>>,
    strategy: Arc<dyn ProbeStrategy>,
    offset_sink: Arc<dyn OffsetSink>,
}

impl AutoOffsetZ {
    /// Builds a controller.
    ///
    /// Fails with a configuration error when the config requires a leveling
    /// subsystem but none was supplied.
    pub fn new(
        config: Arc<CalibrationConfig>,
        kinematics: Arc<dyn HomingStatus>,
        alignment: Option<Arc<dyn AlignmentStatus>>,
        strategy: Arc<dyn ProbeStrategy>,
        offset_sink: Arc<dyn OffsetSink>,
    ) -> CalResult<Self> {
        if config.alignment != AlignmentMode::Ignore && alignment.is_none() {
            return Err(CalibrationError::Configuration(format!(
                "alignment mode {} requires its leveling subsystem",
                config.alignment
            )));
        }
        Ok(Self {
            config,
            kinematics,
            alignment,
            strategy,
            offset_sink,
        })
    }

    /// Runs one calibration: validate, probe, compute, guard, apply.
    ///
    /// On success the computed offset is installed and returned with its
    /// diagnostics. On failure nothing beyond the pre-probe zero-reset has
    /// been applied.
    pub async fn run(&self) -> CalResult<CalibrationOutcome> {
        self.validate_preconditions().await?;

        // Measure in the machine's native frame: clear any stale offset
        // before probing.
        self.offset_sink
            .set_z_offset(0.0)
            .await
            .map_err(CalibrationError::Host)?;

        let result = self
            .strategy
            .measure(self.config.probe_targets())
            .await
            .map_err(CalibrationError::ProbeFailed)?;

        let outcome = math::compute_offset(result.endstop, result.bed, &self.config);
        info!("{}", outcome.report());

        guard::check_limits(&outcome, &self.config)?;

        self.apply(outcome.offset).await?;
        Ok(outcome)
    }

    async fn validate_preconditions(&self) -> CalResult<()> {
        let homed = self
            .kinematics
            .homed_axes()
            .await
            .map_err(CalibrationError::Host)?;
        if !homed.all() {
            return Err(CalibrationError::NotHomed {
                unhomed: homed.unhomed(),
            });
        }

        match (&self.alignment, self.config.alignment) {
            (_, AlignmentMode::Ignore) => {
                info!("ignoring alignment as requested in the config");
            }
            (Some(subsystem), mode) => {
                let applied = subsystem
                    .applied()
                    .await
                    .map_err(CalibrationError::Host)?;
                if !applied {
                    return Err(CalibrationError::AlignmentNotApplied(mode));
                }
            }
            // Ruled out at construction.
            (None, mode) => {
                return Err(CalibrationError::Configuration(format!(
                    "alignment mode {mode} requires its leveling subsystem"
                )))
            }
        }

        Ok(())
    }

    /// Installs the offset: always reset to zero, then set the new value.
    /// The two-step sequence converges regardless of whatever offset state
    /// existed beforehand.
    async fn apply(&self, offset: f64) -> CalResult<()> {
        self.offset_sink
            .set_z_offset(0.0)
            .await
            .map_err(CalibrationError::Host)?;
        self.offset_sink
            .set_z_offset(offset)
            .await
            .map_err(CalibrationError::Host)?;
        info!(offset, "Z offset applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::{
        MockKinematics, MockLeveling, MockOffsetSink, MockPointProber,
    };
    use crate::hardware::HomedAxes;

    fn config() -> Arc<CalibrationConfig> {
        Arc::new(
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
            .unwrap(),
        )
    }

    fn controller(
        heights: Vec<f64>,
        homed: HomedAxes,
        leveled: bool,
    ) -> (AutoOffsetZ, Arc<MockPointProber>, Arc<MockOffsetSink>) {
        let prober = Arc::new(MockPointProber::with_heights(heights));
        let sink = Arc::new(MockOffsetSink::new());
        let controller = AutoOffsetZ::new(
            config(),
            Arc::new(MockKinematics::with_axes(homed)),
            Some(Arc::new(MockLeveling::new(leveled))),
            Arc::new(DelegatedStrategy::new(prober.clone())),
            sink.clone(),
        )
        .unwrap();
        (controller, prober, sink)
    }

    const ALL_HOMED: HomedAxes = HomedAxes {
        x: true,
        y: true,
        z: true,
    };

    #[tokio::test]
    async fn test_not_homed_short_circuits_before_probing() {
        let partial = HomedAxes {
            x: true,
            y: true,
            z: false,
        };
        let (controller, prober, sink) = controller(vec![2.3, 2.0], partial, true);

        let err = controller.run().await.unwrap_err();
        assert!(matches!(err, CalibrationError::NotHomed { .. }));
        assert!(prober.requests().await.is_empty());
        assert!(sink.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_alignment_gate() {
        let (controller, prober, _) = controller(vec![2.3, 2.0], ALL_HOMED, false);

        let err = controller.run().await.unwrap_err();
        assert!(matches!(
            err,
            CalibrationError::AlignmentNotApplied(AlignmentMode::GantryLevel)
        ));
        assert!(prober.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_successful_run_applies_offset() {
        let (controller, _, sink) = controller(vec![2.3, 2.0], ALL_HOMED, true);

        let outcome = controller.run().await.unwrap();
        assert_eq!(outcome.offset, 0.2);

        // Pre-probe reset, applier reset, applier set.
        assert_eq!(sink.history().await, vec![0.0, 0.0, 0.2]);
    }

    #[tokio::test]
    async fn test_missing_leveling_subsystem_rejected_at_construction() {
        let prober = Arc::new(MockPointProber::with_heights(vec![]));
        let result = AutoOffsetZ::new(
            config(),
            Arc::new(MockKinematics::homed()),
            None,
            Arc::new(DelegatedStrategy::new(prober)),
            Arc::new(MockOffsetSink::new()),
        );
        assert!(matches!(result, Err(CalibrationError::Configuration(_))));
    }
}

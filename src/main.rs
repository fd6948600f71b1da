//! Runs one Z-offset calibration against a simulated machine.
//!
//! Useful for exercising a configuration file end to end: the simulated
//! sensor reports the trigger heights given on the command line, and the
//! resulting operator report (or failure message) is printed.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use auto_offset_z::calibration::{AutoOffsetZ, DelegatedStrategy, ManualStrategy, ProbeStrategy};
use auto_offset_z::config::CalibrationConfig;
use auto_offset_z::hardware::mock::{
    MockKinematics, MockLeveling, MockOffsetSink, MockPointProber, MockProbeDriver,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    /// Delegate both points to the multi-point probing protocol.
    Delegated,
    /// Issue raw moves and single height queries.
    Manual,
}

#[derive(Parser, Debug)]
#[command(name = "auto_offset_z", about = "Z-offset calibration dry run")]
struct Args {
    /// Path to the machine configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Probing strategy to exercise.
    #[arg(long, value_enum, default_value_t = Strategy::Delegated)]
    strategy: Strategy,

    /// Simulated trigger height above the endstop point, mm.
    #[arg(long, default_value_t = 2.3)]
    endstop_z: f64,

    /// Simulated trigger height above the reference surface, mm.
    #[arg(long, default_value_t = 2.0)]
    bed_z: f64,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = match CalibrationConfig::load(&args.config) {
        Ok(config) => Arc::new(config),
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let heights = vec![args.endstop_z, args.bed_z];
    let strategy: Arc<dyn ProbeStrategy> = match args.strategy {
        Strategy::Delegated => Arc::new(DelegatedStrategy::new(Arc::new(
            MockPointProber::with_heights(heights),
        ))),
        Strategy::Manual => Arc::new(ManualStrategy::new(
            Arc::new(MockProbeDriver::with_heights(heights)),
            &config,
        )),
    };

    let sink = Arc::new(MockOffsetSink::new());
    let controller = match AutoOffsetZ::new(
        config,
        Arc::new(MockKinematics::homed()),
        Some(Arc::new(MockLeveling::new(true))),
        strategy,
        sink.clone(),
    ) {
        Ok(controller) => controller,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match controller.run().await {
        Ok(outcome) => {
            println!("{}", outcome.report());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

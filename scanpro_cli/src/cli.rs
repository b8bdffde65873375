//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

/// Keeps the non-blocking file writer alive; taken and dropped before exit to flush.
pub static FILE_GUARD: Mutex<Option<tracing_appender::non_blocking::WorkerGuard>> =
    Mutex::new(None);
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "scanpro", version, about = "mmWave raster scanner")]
pub struct Cli {
    /// Path to config TOML (built-in bench rig defaults when omitted)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and print results as JSON instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides logging.level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full raster scan, render the heatmap and classify it
    Scan {
        /// ADC sampling rate in Hz (falls back to scan.sampling_rate_hz)
        #[arg(long, value_name = "HZ")]
        rate: Option<f64>,
        /// Distance between raster rows in mm (falls back to scan.row_pitch_mm)
        #[arg(long, value_name = "MM")]
        pitch: Option<f64>,
        /// Auxiliary axis travel before the sweep in mm; 0 skips it
        #[arg(long, value_name = "MM")]
        aux: Option<f64>,
    },
    /// Classify an existing image locally and print the service JSON
    Analyze {
        #[arg(long, value_name = "FILE")]
        image: PathBuf,
    },
    /// Quick health check: assemble the stage and read one ADC sample
    SelfCheck,
    /// Serve the heuristic classifier over HTTP (`POST /analyze`)
    Serve {
        /// Listen address (falls back to service.bind)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
}

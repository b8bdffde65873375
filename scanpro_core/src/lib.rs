#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Raster scan engine (hardware-agnostic).
//!
//! All hardware goes through `scanpro_traits::Stepper` and
//! `scanpro_traits::Adc`, so the whole engine runs against simulated or mock
//! devices in tests.
//!
//! ## Architecture
//!
//! - **Motion**: blocking step trains per axis with a settle delay (`motion`)
//! - **Sampling**: one long-lived ADC thread, rows delimited by start/stop (`sampler`)
//! - **Controller**: reset, auxiliary positioning, zigzag sweep (`raster`)
//! - **Normalization**: jagged rows padded to a masked rectangle (`grid`)
//! - **Classification**: label and threat score from image brightness (`classification`)
//! - **Pipeline**: scan → grid → image → classification (`pipeline`)

pub mod abort;
pub mod classification;
pub mod config;
pub mod conversions;
pub mod error;
pub mod grid;
pub mod hw_error;
pub mod mocks;
pub mod motion;
pub mod pipeline;
pub mod raster;
pub mod sampler;
pub mod util;

pub use abort::AbortToken;
pub use classification::{
    ClassificationMetrics, ClassificationResult, ObjectClass, ServiceResponse, advisory,
};
pub use config::{MotionTiming, ScanParams, ScanPlan, StageGeometry};
pub use error::{BuildError, ClassifyError, Report, Result, ScanError};
pub use grid::NormalizedGrid;
pub use motion::{Axis, AxisId};
pub use pipeline::{Classifier, Renderer, ScanReport, run_pipeline};
pub use raster::{
    RasterMatrix, RasterScanner, RasterScannerBuilder, ScanOutcome, ScanPhase, VelocitySummary,
};
pub use sampler::{ContinuousSampler, RowCapture};

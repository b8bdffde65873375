#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
)]
//! Image side of the scanner: heatmap rendering and classification.
//!
//! `HeatmapRenderer` implements `scanpro_core::Renderer`; `HeuristicClassifier`
//! (local) and `HttpClassifier` (remote service) implement
//! `scanpro_core::Classifier`. `service` serves the same heuristics over
//! `POST /analyze`.

pub mod classifier;
pub mod heatmap;
pub mod metrics;
pub mod remote;
pub mod service;

pub use classifier::HeuristicClassifier;
pub use heatmap::HeatmapRenderer;
pub use metrics::compute_metrics;
pub use remote::HttpClassifier;

//! Command bodies: scan pipeline, local analysis, self-check and the
//! classification service.

use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::time::Duration;

use scanpro_config::{ClassifierMode, Config};
use scanpro_core::error::Result as CoreResult;
use scanpro_core::{
    AbortToken, Classifier, ScanError, ScanParams, ScanReport, ServiceResponse,
    VelocitySummary, run_pipeline,
};
use scanpro_vision::{HeatmapRenderer, HeuristicClassifier, HttpClassifier};
use eyre::WrapErr;
use serde_json::json;

use crate::stage::build_scanner;

/// Resolve operator inputs: CLI flag, then `[scan]` defaults.
pub fn resolve_params(
    cfg: &Config,
    rate: Option<f64>,
    pitch: Option<f64>,
    aux: Option<f64>,
) -> CoreResult<ScanParams> {
    let rate = rate.or(cfg.scan.sampling_rate_hz).ok_or_else(|| {
        ScanError::InvalidInput("sampling rate missing: pass --rate or set scan.sampling_rate_hz".into())
    })?;
    let pitch = pitch.or(cfg.scan.row_pitch_mm).ok_or_else(|| {
        ScanError::InvalidInput("row pitch missing: pass --pitch or set scan.row_pitch_mm".into())
    })?;
    let aux = aux.or(cfg.scan.aux_travel_mm).unwrap_or(0.0);
    Ok(ScanParams::new(rate, pitch, aux)?)
}

fn make_classifier(cfg: &Config) -> CoreResult<Box<dyn Classifier>> {
    let classifier: Box<dyn Classifier> = match cfg.classifier.mode {
        ClassifierMode::Local => Box::new(HeuristicClassifier::new()),
        ClassifierMode::Remote => Box::new(HttpClassifier::new(
            cfg.classifier.endpoint.clone(),
            Duration::from_millis(cfg.classifier.timeout_ms),
        )?),
    };
    tracing::debug!(mode = ?cfg.classifier.mode, "classifier ready");
    Ok(classifier)
}

fn fmt_velocity(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

pub fn velocity_line(v: &VelocitySummary) -> String {
    format!(
        "Velocity - X: {} mm/s | Y: {} mm/s",
        fmt_velocity(v.mean_x_mm_s),
        fmt_velocity(v.mean_y_mm_s)
    )
}

pub fn run_scan(
    cfg: &Config,
    params: &ScanParams,
    abort: &AbortToken,
    json_out: bool,
) -> CoreResult<()> {
    let mut scanner = build_scanner(cfg)?;
    let renderer = HeatmapRenderer::new(&cfg.output.image_dir)
        .with_size(cfg.output.width_px, cfg.output.height_px)
        .with_sigma(cfg.output.smoothing_sigma);
    let classifier = make_classifier(cfg)?;

    let result = run_pipeline(&mut scanner, params, abort, &renderer, &classifier);
    scanner.release();
    let report = result?;
    print_report(&report, json_out);
    Ok(())
}

fn print_report(report: &ScanReport, json_out: bool) {
    let v = &report.outcome.velocities;
    if json_out {
        let (classification, error) = match &report.classification {
            Ok(c) => (
                Some(json!({
                    "object": c.object,
                    "threat_score": c.threat_score,
                    "sharpness": c.sharpness,
                    "brightness": c.brightness,
                    "advisory": c.advisory(),
                })),
                None,
            ),
            Err(e) => (None, Some(e.to_string())),
        };
        let out = json!({
            "image": report.image_path.display().to_string(),
            "rows": report.grid.rows(),
            "cols": report.grid.cols(),
            "invalid_cells": report.grid.invalid_count(),
            "elapsed_ms": report.outcome.elapsed.as_millis() as u64,
            "velocity": v,
            "classification": classification,
            "classification_error": error,
        });
        println!("{out}");
        return;
    }

    match &report.classification {
        Ok(c) => {
            println!("Object: {}", c.object);
            println!("Threat: {:.2}", c.threat_score);
            println!("Sharpness: {:.2}", c.sharpness);
            println!("{}", c.advisory());
        }
        Err(e) => {
            eprintln!("Classification failed: {e}");
        }
    }
    println!("Heatmap: {}", report.image_path.display());
    println!(
        "Grid: {} rows x {} cols ({} padded)",
        report.grid.rows(),
        report.grid.cols(),
        report.grid.invalid_count()
    );
    println!("{}", velocity_line(v));
}

/// Classify an image in-process and print `{"heuristic": {...}}`.
pub fn run_analyze(image: &Path) -> CoreResult<()> {
    let heuristic = HeuristicClassifier::new().classify(image)?;
    let body = serde_json::to_string(&ServiceResponse { heuristic })?;
    println!("{body}");
    Ok(())
}

pub fn run_self_check(cfg: &Config, json_out: bool) -> CoreResult<()> {
    let mut scanner = build_scanner(cfg)?;
    let v = scanner.probe();
    scanner.release();
    let v = v?;
    if json_out {
        println!("{}", json!({ "status": "ok", "voltage": v }));
    } else {
        println!("OK: adc reads {v:.3} V");
    }
    Ok(())
}


/// Bind the service listener: `--bind`, then `service.bind`.
pub fn bind_service(cfg: &Config, bind: Option<&str>) -> CoreResult<TcpListener> {
    let raw = bind.unwrap_or(&cfg.service.bind);
    let addr: SocketAddr = raw.parse().map_err(|e| {
        eyre::eyre!("invalid service address {raw:?} ({e}); set --bind or service.bind in the config")
    })?;
    let listener = TcpListener::bind(addr).wrap_err_with(|| format!("bind {addr}"))?;
    Ok(listener)
}

/// Run the classification service until `shutdown` resolves.
pub fn run_serve<F>(listener: TcpListener, shutdown: F) -> CoreResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    if !crate::cli::JSON_MODE.get().copied().unwrap_or(false) {
        println!("Serving POST http://{addr}/analyze (Ctrl-C to stop)");
    }
    scanpro_vision::service::run(listener, shutdown).wrap_err("classification service failed")?;
    Ok(())
}

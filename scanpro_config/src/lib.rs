#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the raster scanner.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section is optional; omitted keys fall back to the bench rig's
//!   geometry (110 mm x 130 mm stage, 200-step motors on 10 mm pulleys).
use serde::Deserialize;
use std::path::Path;

/// Stage geometry. Fixed for a given mechanical build.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StageCfg {
    /// Axis-1 (X) sweep span per row, in mm.
    pub x_travel_mm: f64,
    /// Axis-2 (Y) total travel covered by the raster, in mm.
    pub y_travel_mm: f64,
    /// Margin subtracted from the X travel when homing.
    pub reset_margin_mm: f64,
    /// Raster axes calibration: full steps per millimetre.
    pub steps_per_mm: f64,
    /// Auxiliary (Z) axis calibration, independent of the raster axes.
    pub aux_steps_per_mm: f64,
}

impl Default for StageCfg {
    #[allow(clippy::approx_constant)]
    fn default() -> Self {
        Self {
            x_travel_mm: 110.0,
            y_travel_mm: 130.0,
            reset_margin_mm: 5.0,
            // 200 steps/rev on a 10 mm radius pulley
            steps_per_mm: 200.0 / (2.0 * 3.14 * 10.0),
            aux_steps_per_mm: 10.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimingCfg {
    /// Settle delay after each X/Y step (µs). Sets raster traversal velocity.
    pub step_delay_us: u64,
    /// Settle delay after each auxiliary step (µs).
    pub aux_step_delay_us: u64,
    /// Max wait for the sampler to hand back a row after stop (ms).
    pub row_stop_timeout_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            step_delay_us: 2_000,
            aux_step_delay_us: 10_000,
            row_stop_timeout_ms: 1_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HardwareCfg {
    pub i2c_bus: u8,
    /// Motor HAT carrying the X (stepper1) and Y (stepper2) motors.
    pub primary_kit_addr: u16,
    /// Motor HAT carrying the auxiliary (stepper1) motor.
    pub aux_kit_addr: u16,
    pub adc_addr: u16,
    /// Single-ended ADS1115 input (0..=3).
    pub adc_channel: u8,
    /// Max time to wait for one ADC conversion.
    pub adc_read_timeout_ms: u64,
}

impl Default for HardwareCfg {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            primary_kit_addr: 0x60,
            aux_kit_addr: 0x61,
            adc_addr: 0x48,
            adc_channel: 0,
            adc_read_timeout_ms: 50,
        }
    }
}

/// Defaults for the three operator inputs; CLI flags take precedence.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ScanDefaults {
    pub sampling_rate_hz: Option<f64>,
    pub row_pitch_mm: Option<f64>,
    pub aux_travel_mm: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    /// Run the heuristics in-process.
    #[default]
    Local,
    /// Upload the rendered image to the classification service.
    Remote,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassifierCfg {
    pub mode: ClassifierMode,
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for ClassifierCfg {
    fn default() -> Self {
        Self {
            mode: ClassifierMode::Local,
            endpoint: "http://127.0.0.1:8000/analyze".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Listener of `scanpro serve`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceCfg {
    pub bind: String,
}

impl Default for ServiceCfg {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputCfg {
    /// Directory receiving timestamped heatmap PNGs.
    pub image_dir: String,
    pub width_px: u32,
    pub height_px: u32,
    /// Gaussian smoothing applied by the renderer (0 disables).
    pub smoothing_sigma: f32,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            image_dir: "./heatmaps".to_string(),
            width_px: 800,
            height_px: 640,
            smoothing_sigma: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub stage: StageCfg,
    pub timing: TimingCfg,
    pub hardware: HardwareCfg,
    pub scan: ScanDefaults,
    pub classifier: ClassifierCfg,
    pub service: ServiceCfg,
    pub output: OutputCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Stage
        if !positive(self.stage.x_travel_mm) {
            eyre::bail!("stage.x_travel_mm must be > 0");
        }
        if !positive(self.stage.y_travel_mm) {
            eyre::bail!("stage.y_travel_mm must be > 0");
        }
        if !self.stage.reset_margin_mm.is_finite()
            || self.stage.reset_margin_mm < 0.0
            || self.stage.reset_margin_mm >= self.stage.x_travel_mm
        {
            eyre::bail!("stage.reset_margin_mm must be in [0, x_travel_mm)");
        }
        if !positive(self.stage.steps_per_mm) {
            eyre::bail!("stage.steps_per_mm must be > 0");
        }
        if !positive(self.stage.aux_steps_per_mm) {
            eyre::bail!("stage.aux_steps_per_mm must be > 0");
        }

        // Timing
        if self.timing.step_delay_us > 1_000_000 {
            eyre::bail!("timing.step_delay_us is unreasonably large (>1s)");
        }
        if self.timing.aux_step_delay_us > 1_000_000 {
            eyre::bail!("timing.aux_step_delay_us is unreasonably large (>1s)");
        }
        if self.timing.row_stop_timeout_ms == 0 {
            eyre::bail!("timing.row_stop_timeout_ms must be >= 1");
        }

        // Hardware
        if self.hardware.adc_channel > 3 {
            eyre::bail!("hardware.adc_channel must be in 0..=3");
        }
        if self.hardware.adc_read_timeout_ms == 0 {
            eyre::bail!("hardware.adc_read_timeout_ms must be >= 1");
        }
        if self.hardware.primary_kit_addr == self.hardware.aux_kit_addr {
            eyre::bail!("hardware.primary_kit_addr and hardware.aux_kit_addr must differ");
        }

        // Scan defaults (operator inputs are validated again at scan time)
        if let Some(r) = self.scan.sampling_rate_hz
            && !positive(r)
        {
            eyre::bail!("scan.sampling_rate_hz must be > 0");
        }
        if let Some(p) = self.scan.row_pitch_mm
            && !positive(p)
        {
            eyre::bail!("scan.row_pitch_mm must be > 0");
        }
        if let Some(z) = self.scan.aux_travel_mm
            && !(z.is_finite() && z >= 0.0)
        {
            eyre::bail!("scan.aux_travel_mm must be >= 0");
        }

        // Classifier
        if self.classifier.mode == ClassifierMode::Remote
            && !(self.classifier.endpoint.starts_with("http://")
                || self.classifier.endpoint.starts_with("https://"))
        {
            eyre::bail!("classifier.endpoint must be an http(s) URL");
        }
        if self.classifier.timeout_ms == 0 {
            eyre::bail!("classifier.timeout_ms must be >= 1");
        }

        // Service
        if self.service.bind.parse::<std::net::SocketAddr>().is_err() {
            eyre::bail!("service.bind must be a socket address such as 127.0.0.1:8000");
        }

        // Output
        if self.output.image_dir.trim().is_empty() {
            eyre::bail!("output.image_dir must not be empty");
        }
        if self.output.width_px == 0 || self.output.height_px == 0 {
            eyre::bail!("output.width_px and output.height_px must be >= 1");
        }
        if !self.output.smoothing_sigma.is_finite() || self.output.smoothing_sigma < 0.0 {
            eyre::bail!("output.smoothing_sigma must be >= 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_rig_defaults() {
        let cfg = load_toml("").unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.stage.x_travel_mm, 110.0);
        assert_eq!(cfg.hardware.primary_kit_addr, 0x60);
        assert_eq!(cfg.hardware.aux_kit_addr, 0x61);
        assert!((cfg.stage.steps_per_mm - 3.1847).abs() < 1e-3);
        assert_eq!(cfg.classifier.mode, ClassifierMode::Local);
        assert_eq!(cfg.service.bind, "127.0.0.1:8000");
    }

    #[test]
    fn classifier_mode_parses_lowercase() {
        let cfg = load_toml("[classifier]\nmode = \"remote\"\n").unwrap();
        assert_eq!(cfg.classifier.mode, ClassifierMode::Remote);
    }
}

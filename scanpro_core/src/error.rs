use thiserror::Error;

/// Failures of the acquisition side: motion, sampling, normalization, rendering.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScanError {
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("scan produced no samples")]
    EmptyScan,
    #[error("sampler already has an active row")]
    SamplerBusy,
    #[error("timeout waiting for {0}")]
    Timeout(&'static str),
    #[error("scan aborted")]
    Aborted,
    #[error("render failed: {0}")]
    Render(String),
}

/// Failures of the classification stage. These never discard a scan.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("image decode error: {0}")]
    ImageDecode(String),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing {0} axis stepper")]
    MissingAxis(&'static str),
    #[error("missing adc")]
    MissingAdc,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("adc conversion timeout")]
    ConversionTimeout,
    #[error("invalid adc channel {0} (expected 0..=3)")]
    InvalidChannel(u8),
    #[error("stepper fault: {0}")]
    StepperFault(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl From<rppal::i2c::Error> for HwError {
    fn from(e: rppal::i2c::Error) -> Self {
        HwError::I2c(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HwError>;

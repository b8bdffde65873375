//! Maps `Box<dyn Error>` from trait boundaries to typed `ScanError`.
//!
//! The traits in `scanpro_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `scanpro_hardware::HwError` downcasting.

use crate::error::ScanError;

/// Map a trait-boundary error raised by `device` to a typed `ScanError`.
pub fn map_hw_error(device: &str, e: &(dyn std::error::Error + 'static)) -> ScanError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<scanpro_hardware::HwError>() {
            return match hw {
                scanpro_hardware::HwError::ConversionTimeout => {
                    ScanError::Timeout("adc conversion")
                }
                other => ScanError::HardwareFault(format!("{device}: {other}")),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        ScanError::Timeout("hardware response")
    } else {
        ScanError::HardwareFault(format!("{device}: {s}"))
    }
}

//! Human-readable error descriptions, exit codes and structured JSON errors.

use scanpro_core::error::{BuildError, ClassifyError, ScanError};
use scanpro_hardware::HwError;

pub const EXIT_OTHER: i32 = 1;
pub const EXIT_INVALID_INPUT: i32 = 2;
pub const EXIT_HARDWARE: i32 = 3;
pub const EXIT_EMPTY_SCAN: i32 = 4;
pub const EXIT_ABORTED: i32 = 5;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(se) = err.downcast_ref::<ScanError>() {
        return match se {
            ScanError::InvalidInput(msg) => format!(
                "What happened: Invalid scan input ({msg}).\nLikely causes: Non-positive rate or pitch, negative auxiliary travel, or a missing value.\nHow to fix: Pass --rate and --pitch as positive numbers (e.g., `scanpro scan --rate 100 --pitch 10`)."
            ),
            ScanError::HardwareFault(msg) => format!(
                "What happened: Hardware fault during the scan ({msg}).\nLikely causes: Motor HAT or ADC not responding, loose I2C wiring, or missing motor power.\nHow to fix: Check the I2C addresses in [hardware], the wiring and the motor supply, then run `scanpro self-check`."
            ),
            ScanError::Timeout(what) => format!(
                "What happened: Timed out waiting for {what}.\nLikely causes: ADC conversion stalled or the sampler thread is blocked on the bus.\nHow to fix: Verify the ADS1115 wiring; consider raising hardware.adc_read_timeout_ms or timing.row_stop_timeout_ms."
            ),
            ScanError::EmptyScan => "What happened: The scan produced no samples.\nLikely causes: Row pitch larger than the Y travel, so no rows were swept.\nHow to fix: Use a --pitch smaller than stage.y_travel_mm.".to_string(),
            ScanError::Aborted => "What happened: The scan was aborted.\nLikely causes: Ctrl-C was pressed while the stage was moving.\nHow to fix: Start a new scan; the stage is re-homed at the beginning of every scan.".to_string(),
            ScanError::SamplerBusy => "What happened: The sampler already had an open row.\nLikely causes: Internal sequencing error.\nHow to fix: Re-run with --log-level=debug and report the log.".to_string(),
            ScanError::Render(msg) => format!(
                "What happened: The heatmap could not be written ({msg}).\nLikely causes: output.image_dir is not writable or the disk is full.\nHow to fix: Point output.image_dir at a writable directory."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<ClassifyError>() {
        return match ce {
            ClassifyError::ImageDecode(msg) => format!(
                "What happened: The image could not be read ({msg}).\nLikely causes: Wrong path or not a PNG/JPEG file.\nHow to fix: Pass a readable image with --image."
            ),
            ClassifyError::Transport(msg) => format!(
                "What happened: The classification service could not be reached ({msg}).\nLikely causes: Service not running or wrong classifier.endpoint.\nHow to fix: Start the service or set classifier.mode = \"local\"."
            ),
        };
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingAxis(axis) => format!(
                "What happened: No {axis} stepper was provided to the scanner.\nLikely causes: Motor HAT failed to initialize.\nHow to fix: Check [hardware] addresses and the I2C bus."
            ),
            BuildError::MissingAdc => "What happened: No ADC was provided to the scanner.\nLikely causes: ADS1115 failed to initialize.\nHow to fix: Check hardware.adc_addr and the I2C bus.".to_string(),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid stage configuration ({msg}).\nLikely causes: Out-of-range values in [stage] or [timing].\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(hw) = err.downcast_ref::<HwError>() {
        return format!(
            "What happened: Hardware initialization failed ({hw}).\nLikely causes: Wrong I2C bus/address, I2C disabled, or insufficient permissions.\nHow to fix: Enable I2C, check [hardware] in the config, and run as a user in the i2c group. Detail: {err}"
        );
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();
    if lower.contains("config") {
        return format!(
            "What happened: Configuration is invalid or unreadable.\nLikely causes: Missing file, TOML syntax error, or out-of-range values.\nHow to fix: Edit the TOML config and try again. Detail: {err:#}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error class.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(se) = err.downcast_ref::<ScanError>() {
        return match se {
            ScanError::InvalidInput(_) => EXIT_INVALID_INPUT,
            ScanError::HardwareFault(_) | ScanError::Timeout(_) => EXIT_HARDWARE,
            ScanError::EmptyScan => EXIT_EMPTY_SCAN,
            ScanError::Aborted => EXIT_ABORTED,
            ScanError::SamplerBusy | ScanError::Render(_) => EXIT_OTHER,
        };
    }
    if let Some(ClassifyError::ImageDecode(_)) = err.downcast_ref::<ClassifyError>() {
        return EXIT_INVALID_INPUT;
    }
    if err.downcast_ref::<HwError>().is_some() {
        return EXIT_HARDWARE;
    }
    if err.to_string().to_ascii_lowercase().contains("config") {
        return EXIT_INVALID_INPUT;
    }
    EXIT_OTHER
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(se) = err.downcast_ref::<ScanError>() {
        return match se {
            ScanError::HardwareFault(_) => "HardwareFault",
            ScanError::InvalidInput(_) => "InvalidInput",
            ScanError::EmptyScan => "EmptyScan",
            ScanError::SamplerBusy => "SamplerBusy",
            ScanError::Timeout(_) => "Timeout",
            ScanError::Aborted => "Aborted",
            ScanError::Render(_) => "Render",
        };
    }
    if let Some(ce) = err.downcast_ref::<ClassifyError>() {
        return match ce {
            ClassifyError::ImageDecode(_) => "ImageDecode",
            ClassifyError::Transport(_) => "Transport",
        };
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

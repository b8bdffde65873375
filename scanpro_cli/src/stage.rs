//! Hardware assembly: real Motor HATs + ADS1115 with the `hardware` feature
//! on Linux, otherwise the simulated stage.

use scanpro_core::error::Result as CoreResult;
use scanpro_core::{MotionTiming, RasterScanner, StageGeometry};
use scanpro_traits::{Adc, Stepper};

pub struct StageDevices {
    pub x: Box<dyn Stepper + Send>,
    pub y: Box<dyn Stepper + Send>,
    pub aux: Box<dyn Stepper + Send>,
    pub adc: Box<dyn Adc + Send>,
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open_devices(cfg: &scanpro_config::Config) -> CoreResult<StageDevices> {
    use eyre::WrapErr;
    use scanpro_hardware::hardware::{Ads1115, MotorKit, StepperPort};
    use std::time::Duration;

    let hw = &cfg.hardware;
    let primary = MotorKit::open(hw.i2c_bus, hw.primary_kit_addr)
        .wrap_err_with(|| format!("open motor kit 0x{:02x}", hw.primary_kit_addr))?;
    let aux_kit = MotorKit::open(hw.i2c_bus, hw.aux_kit_addr)
        .wrap_err_with(|| format!("open motor kit 0x{:02x}", hw.aux_kit_addr))?;
    let adc = Ads1115::open(
        hw.i2c_bus,
        hw.adc_addr,
        hw.adc_channel,
        Duration::from_millis(hw.adc_read_timeout_ms),
    )
    .wrap_err_with(|| format!("open adc 0x{:02x}", hw.adc_addr))?;
    tracing::info!(
        bus = hw.i2c_bus,
        primary = hw.primary_kit_addr,
        aux = hw.aux_kit_addr,
        adc = hw.adc_addr,
        "i2c stage opened"
    );
    Ok(StageDevices {
        x: Box::new(primary.stepper(StepperPort::One)?),
        y: Box::new(primary.stepper(StepperPort::Two)?),
        aux: Box::new(aux_kit.stepper(StepperPort::One)?),
        adc: Box::new(adc),
    })
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open_devices(cfg: &scanpro_config::Config) -> CoreResult<StageDevices> {
    use scanpro_hardware::{SimStage, SimTarget};

    let _ = cfg; // sim stage has no addresses
    let stage = SimStage::new();
    let mut x = stage.x_stepper();
    // Test hook: make the X driver fail after N pulses.
    if let Some(n) = std::env::var("SCANPRO_SIM_FAULT_AFTER")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
    {
        x = x.with_fault_after(n);
    }
    tracing::info!("using simulated stage");
    Ok(StageDevices {
        x: Box::new(x),
        y: Box::new(stage.y_stepper()),
        aux: Box::new(stage.aux_stepper()),
        adc: Box::new(stage.adc(SimTarget::default())),
    })
}

pub fn build_scanner(cfg: &scanpro_config::Config) -> CoreResult<RasterScanner> {
    let devices = open_devices(cfg)?;
    let scanner = RasterScanner::builder()
        .with_x_axis(devices.x)
        .with_y_axis(devices.y)
        .with_aux_axis(devices.aux)
        .with_adc(devices.adc)
        .with_geometry(StageGeometry::from(&cfg.stage))
        .with_timing(MotionTiming::from(&cfg.timing))
        .build()?;
    Ok(scanner)
}

//! Stage hardware backends: a simulated stage for development and tests, and
//! (with the `hardware` feature on Linux) Adafruit Motor HAT steppers plus an
//! ADS1115 ADC on the Raspberry Pi I2C bus.
pub mod error;
pub mod sim;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod ads1115;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod motorkit;

pub use error::HwError;
pub use sim::{SimStage, SimTarget, SimulatedAdc, SimulatedStepper};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hardware {
    pub use crate::ads1115::Ads1115;
    pub use crate::motorkit::{KitStepper, MotorKit, StepperPort};
}

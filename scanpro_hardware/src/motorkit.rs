//! Adafruit Motor HAT (PCA9685 PWM expander driving two TB6612 H-bridges).
//!
//! Each board exposes two bipolar stepper ports. Stepping is full-step,
//! single-coil: one winding energized per phase, four phases per electrical
//! cycle.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rppal::i2c::I2c;
use scanpro_traits::{Direction, HwResult, Stepper};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

const MODE1: u8 = 0x00;
const PRESCALE: u8 = 0xFE;
const LED0_ON_L: u8 = 0x06;

const MODE1_SLEEP: u8 = 0x10;
const MODE1_AUTO_INCREMENT: u8 = 0x20;
const MODE1_RESTART: u8 = 0x80;

const OSC_HZ: f32 = 25_000_000.0;
const PWM_HZ: f32 = 1600.0;

/// Raw PCA9685 register access.
pub struct Pca9685 {
    i2c: I2c,
}

impl Pca9685 {
    pub fn open(bus: u8, address: u16) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(address)?;
        let mut dev = Self { i2c };
        dev.reset()?;
        dev.set_frequency(PWM_HZ)?;
        debug!(bus, address, "pca9685 ready");
        Ok(dev)
    }

    fn reset(&mut self) -> Result<()> {
        self.i2c.smbus_write_byte(MODE1, 0x00)?;
        Ok(())
    }

    fn set_frequency(&mut self, hz: f32) -> Result<()> {
        let prescale = ((OSC_HZ / (4096.0 * hz)).round() - 1.0).clamp(3.0, 255.0) as u8;
        let old = self.i2c.smbus_read_byte(MODE1)?;
        self.i2c
            .smbus_write_byte(MODE1, (old & 0x7F) | MODE1_SLEEP)?;
        self.i2c.smbus_write_byte(PRESCALE, prescale)?;
        self.i2c.smbus_write_byte(MODE1, old)?;
        std::thread::sleep(Duration::from_millis(5));
        self.i2c
            .smbus_write_byte(MODE1, old | MODE1_RESTART | MODE1_AUTO_INCREMENT)?;
        Ok(())
    }

    /// Drive a channel fully on or fully off.
    fn set_pin(&mut self, channel: u8, high: bool) -> Result<()> {
        let regs = if high {
            [0x00, 0x10, 0x00, 0x00]
        } else {
            [0x00, 0x00, 0x00, 0x10]
        };
        self.i2c.block_write(LED0_ON_L + 4 * channel, &regs)?;
        Ok(())
    }
}

/// Which stepper header on the HAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperPort {
    One,
    Two,
}

#[derive(Debug, Clone, Copy)]
struct Channels {
    pwm_a: u8,
    ain1: u8,
    ain2: u8,
    pwm_b: u8,
    bin1: u8,
    bin2: u8,
}

impl StepperPort {
    fn channels(self) -> Channels {
        match self {
            StepperPort::One => Channels {
                pwm_a: 8,
                ain2: 9,
                ain1: 10,
                pwm_b: 13,
                bin2: 12,
                bin1: 11,
            },
            StepperPort::Two => Channels {
                pwm_a: 2,
                ain2: 3,
                ain1: 4,
                pwm_b: 7,
                bin2: 6,
                bin1: 5,
            },
        }
    }
}

/// One Motor HAT board; hands out steppers sharing the PWM chip.
#[derive(Clone)]
pub struct MotorKit {
    pca: Arc<Mutex<Pca9685>>,
}

impl MotorKit {
    pub fn open(bus: u8, address: u16) -> Result<Self> {
        Ok(Self {
            pca: Arc::new(Mutex::new(Pca9685::open(bus, address)?)),
        })
    }

    pub fn stepper(&self, port: StepperPort) -> Result<KitStepper> {
        let ch = port.channels();
        {
            let mut pca = self.lock()?;
            pca.set_pin(ch.pwm_a, true)?;
            pca.set_pin(ch.pwm_b, true)?;
        }
        Ok(KitStepper {
            pca: self.pca.clone(),
            ch,
            phase: 0,
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Pca9685>> {
        self.pca
            .lock()
            .map_err(|_| HwError::StepperFault("pca9685 lock poisoned".into()))
    }
}

pub struct KitStepper {
    pca: Arc<Mutex<Pca9685>>,
    ch: Channels,
    phase: u8,
}

impl KitStepper {
    fn apply_phase(&mut self) -> Result<()> {
        // (ain1, ain2, bin1, bin2) for A+, B+, A-, B-
        let coils = match self.phase & 3 {
            0 => [true, false, false, false],
            1 => [false, false, true, false],
            2 => [false, true, false, false],
            _ => [false, false, false, true],
        };
        let mut pca = self
            .pca
            .lock()
            .map_err(|_| HwError::StepperFault("pca9685 lock poisoned".into()))?;
        pca.set_pin(self.ch.ain1, coils[0])?;
        pca.set_pin(self.ch.ain2, coils[1])?;
        pca.set_pin(self.ch.bin1, coils[2])?;
        pca.set_pin(self.ch.bin2, coils[3])?;
        Ok(())
    }
}

impl Stepper for KitStepper {
    fn onestep(&mut self, direction: Direction) -> HwResult<()> {
        self.phase = match direction {
            Direction::Forward => self.phase.wrapping_add(1),
            Direction::Backward => self.phase.wrapping_sub(1),
        } & 3;
        trace!(phase = self.phase, ?direction, "motorkit step");
        self.apply_phase()?;
        Ok(())
    }

    fn release(&mut self) -> HwResult<()> {
        let mut pca = self
            .pca
            .lock()
            .map_err(|_| HwError::StepperFault("pca9685 lock poisoned".into()))?;
        for c in [self.ch.ain1, self.ch.ain2, self.ch.bin1, self.ch.bin2] {
            pca.set_pin(c, false)?;
        }
        Ok(())
    }
}

//! Test and helper mocks for scanpro_core

use scanpro_traits::{Adc, Direction, HwResult, Stepper};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Stepper that only counts pulses and tracks net position.
#[derive(Debug, Default, Clone)]
pub struct CountingStepper {
    pulses: Arc<AtomicU64>,
    position: Arc<AtomicI64>,
}

impl CountingStepper {
    /// Shared total pulse counter.
    pub fn counter(&self) -> Arc<AtomicU64> {
        self.pulses.clone()
    }

    /// Shared signed position (forward = +1).
    pub fn position(&self) -> Arc<AtomicI64> {
        self.position.clone()
    }
}

impl Stepper for CountingStepper {
    fn onestep(&mut self, direction: Direction) -> HwResult<()> {
        self.pulses.fetch_add(1, Ordering::Relaxed);
        let d = match direction {
            Direction::Forward => 1,
            Direction::Backward => -1,
        };
        self.position.fetch_add(d, Ordering::Relaxed);
        Ok(())
    }
}

/// Stepper whose every pulse fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct JammedStepper;

impl Stepper for JammedStepper {
    fn onestep(&mut self, _direction: Direction) -> HwResult<()> {
        Err("driver not responding".into())
    }
}

/// ADC returning 0.0, 1.0, 2.0, ... so acquisition order is visible in the data.
#[derive(Debug, Default, Clone)]
pub struct SequenceAdc {
    next: Arc<AtomicU64>,
}

impl SequenceAdc {
    pub fn reads(&self) -> Arc<AtomicU64> {
        self.next.clone()
    }
}

impl Adc for SequenceAdc {
    fn voltage(&mut self) -> HwResult<f32> {
        Ok(self.next.fetch_add(1, Ordering::Relaxed) as f32)
    }
}

/// ADC that always reads the same voltage.
#[derive(Debug, Clone, Copy)]
pub struct ConstAdc(pub f32);

impl Adc for ConstAdc {
    fn voltage(&mut self) -> HwResult<f32> {
        Ok(self.0)
    }
}

/// ADC whose every read fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeadAdc;

impl Adc for DeadAdc {
    fn voltage(&mut self) -> HwResult<f32> {
        Err(Box::new(std::io::Error::other("adc bus error")))
    }
}

//! Simulated stage: steppers that track a shared step counter and an ADC that
//! reads a synthetic intensity field at the current carriage position.

use scanpro_traits::{Adc, Direction, HwResult, Stepper};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::error::HwError;

/// Shared carriage position in steps, one counter per axis.
#[derive(Debug, Clone, Default)]
pub struct SimStage {
    pub x: Arc<AtomicI64>,
    pub y: Arc<AtomicI64>,
    pub aux: Arc<AtomicI64>,
}

impl SimStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current (x, y, aux) position in steps.
    pub fn position(&self) -> (i64, i64, i64) {
        (
            self.x.load(Ordering::Relaxed),
            self.y.load(Ordering::Relaxed),
            self.aux.load(Ordering::Relaxed),
        )
    }

    pub fn x_stepper(&self) -> SimulatedStepper {
        SimulatedStepper::new(self.x.clone())
    }

    pub fn y_stepper(&self) -> SimulatedStepper {
        SimulatedStepper::new(self.y.clone())
    }

    pub fn aux_stepper(&self) -> SimulatedStepper {
        SimulatedStepper::new(self.aux.clone())
    }

    pub fn adc(&self, target: SimTarget) -> SimulatedAdc {
        SimulatedAdc::new(self.clone(), target)
    }
}

/// Simulated stepper with a home stop at position 0; optionally faults after a
/// fixed number of pulses.
#[derive(Debug)]
pub struct SimulatedStepper {
    position: Arc<AtomicI64>,
    pulses: u64,
    fault_after: Option<u64>,
}

impl SimulatedStepper {
    pub fn new(position: Arc<AtomicI64>) -> Self {
        Self {
            position,
            pulses: 0,
            fault_after: None,
        }
    }

    /// Fail every pulse after the first `n` succeed.
    pub fn with_fault_after(mut self, n: u64) -> Self {
        self.fault_after = Some(n);
        self
    }

    pub fn pulses(&self) -> u64 {
        self.pulses
    }
}

impl Stepper for SimulatedStepper {
    fn onestep(&mut self, direction: Direction) -> HwResult<()> {
        if let Some(limit) = self.fault_after
            && self.pulses >= limit
        {
            return Err(Box::new(HwError::StepperFault(format!(
                "simulated driver fault after {limit} pulses"
            ))));
        }
        match direction {
            Direction::Forward => {
                self.position.fetch_add(1, Ordering::Relaxed);
            }
            // Home end-stop: pulses at the origin do not move the carriage.
            Direction::Backward => {
                let _ = self
                    .position
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |p| {
                        (p > 0).then(|| p - 1)
                    });
            }
        }
        self.pulses = self.pulses.saturating_add(1);
        Ok(())
    }
}

/// Synthetic reflector: a Gaussian bump over a constant background, in step
/// units measured from the home position.
#[derive(Debug, Clone, Copy)]
pub struct SimTarget {
    pub center_x: f32,
    pub center_y: f32,
    pub sigma: f32,
    pub peak_v: f32,
    pub base_v: f32,
}

impl Default for SimTarget {
    fn default() -> Self {
        Self {
            center_x: 175.0,
            center_y: 200.0,
            sigma: 60.0,
            peak_v: 2.5,
            base_v: 0.4,
        }
    }
}

impl SimTarget {
    /// A flat field that always reads `v`.
    pub fn constant(v: f32) -> Self {
        Self {
            peak_v: 0.0,
            base_v: v,
            ..Self::default()
        }
    }

    pub fn voltage_at(&self, x: i64, y: i64) -> f32 {
        if self.peak_v == 0.0 || self.sigma <= 0.0 {
            return self.base_v;
        }
        let dx = x as f32 - self.center_x;
        let dy = y as f32 - self.center_y;
        let d2 = dx * dx + dy * dy;
        self.base_v + self.peak_v * (-d2 / (2.0 * self.sigma * self.sigma)).exp()
    }
}

/// Simulated ADC reading the target field under the carriage.
#[derive(Debug)]
pub struct SimulatedAdc {
    stage: SimStage,
    target: SimTarget,
    reads: Arc<AtomicU64>,
    fault_after: Option<u64>,
}

impl SimulatedAdc {
    pub fn new(stage: SimStage, target: SimTarget) -> Self {
        Self {
            stage,
            target,
            reads: Arc::new(AtomicU64::new(0)),
            fault_after: None,
        }
    }

    /// Fail every read after the first `n` succeed.
    pub fn with_fault_after(mut self, n: u64) -> Self {
        self.fault_after = Some(n);
        self
    }

    /// Shared read counter, usable after the ADC moved into the sampler thread.
    pub fn read_counter(&self) -> Arc<AtomicU64> {
        self.reads.clone()
    }
}

impl Adc for SimulatedAdc {
    fn voltage(&mut self) -> HwResult<f32> {
        let n = self.reads.fetch_add(1, Ordering::Relaxed);
        if let Some(limit) = self.fault_after
            && n >= limit
        {
            return Err(Box::new(HwError::I2c("simulated adc nack".into())));
        }
        let (x, y, _) = self.stage.position();
        let v = self.target.voltage_at(x, y);
        tracing::trace!(x, y, v, "sim adc sample");
        Ok(v)
    }
}

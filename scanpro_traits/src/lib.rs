pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type crossing the hardware trait boundary.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Rotation direction of a single stepper pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// One stepper motor channel. Implementations issue exactly one step per call
/// and must not sleep; settle delays belong to the caller.
pub trait Stepper {
    fn onestep(&mut self, direction: Direction) -> HwResult<()>;

    /// De-energize the coils. Default is a no-op for drivers without holding torque control.
    fn release(&mut self) -> HwResult<()> {
        Ok(())
    }
}

/// Single-channel analog input returning volts.
pub trait Adc {
    fn voltage(&mut self) -> HwResult<f32>;
}

impl<S: Stepper + ?Sized> Stepper for Box<S> {
    fn onestep(&mut self, direction: Direction) -> HwResult<()> {
        (**self).onestep(direction)
    }

    fn release(&mut self) -> HwResult<()> {
        (**self).release()
    }
}

impl<A: Adc + ?Sized> Adc for Box<A> {
    fn voltage(&mut self) -> HwResult<f32> {
        (**self).voltage()
    }
}

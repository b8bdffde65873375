//! Motion primitive: blocking step trains on one axis.

use std::fmt;
use std::time::Duration;

use scanpro_traits::{Clock, Direction, Stepper};

use crate::abort::AbortToken;
use crate::error::ScanError;
use crate::hw_error::map_hw_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisId {
    X,
    Y,
    Aux,
}

impl AxisId {
    pub fn name(self) -> &'static str {
        match self {
            AxisId::X => "x",
            AxisId::Y => "y",
            AxisId::Aux => "aux",
        }
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stepper plus the settle delay that paces it.
pub struct Axis {
    id: AxisId,
    stepper: Box<dyn Stepper + Send>,
    step_delay: Duration,
}

impl fmt::Debug for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Axis")
            .field("id", &self.id)
            .field("step_delay", &self.step_delay)
            .finish_non_exhaustive()
    }
}

impl Axis {
    pub fn new(id: AxisId, stepper: Box<dyn Stepper + Send>, step_delay: Duration) -> Self {
        Self {
            id,
            stepper,
            step_delay,
        }
    }

    pub fn id(&self) -> AxisId {
        self.id
    }

    pub fn step_delay(&self) -> Duration {
        self.step_delay
    }

    /// Issue exactly `steps` pulses, sleeping the settle delay after each.
    /// Returns the elapsed time measured on `clock`. The abort token is
    /// checked before every pulse; a driver error aborts the move.
    pub fn move_steps<C: Clock + ?Sized>(
        &mut self,
        steps: u32,
        direction: Direction,
        clock: &C,
        abort: &AbortToken,
    ) -> Result<Duration, ScanError> {
        let start = clock.now();
        for done in 0..steps {
            if abort.is_cancelled() {
                tracing::warn!(axis = %self.id, done, steps, "move aborted");
                return Err(ScanError::Aborted);
            }
            if let Err(e) = self.stepper.onestep(direction) {
                let err = map_hw_error(self.id.name(), &*e);
                tracing::error!(axis = %self.id, done, error = %err, "step failed");
                return Err(err);
            }
            clock.sleep(self.step_delay);
        }
        let elapsed = clock.elapsed_since(start);
        tracing::trace!(axis = %self.id, steps, ?direction, ?elapsed, "move complete");
        Ok(elapsed)
    }

    /// De-energize the coils (best-effort).
    pub fn release(&mut self) -> Result<(), ScanError> {
        self.stepper
            .release()
            .map_err(|e| map_hw_error(self.id.name(), &*e))
    }
}

//! Raster scan controller.
//!
//! Drives the stage through reset, optional auxiliary positioning and the
//! zigzag sweep, opening one sampler row per X traversal. Every scan starts
//! from a fresh `ScanContext`; nothing carries over between invocations.

use std::time::{Duration, Instant};

use scanpro_traits::{Adc, Clock, Direction, MonotonicClock, Stepper};
use serde::Serialize;

use crate::abort::AbortToken;
use crate::config::{MotionTiming, ScanParams, ScanPlan, StageGeometry};
use crate::error::{BuildError, ScanError};
use crate::motion::{Axis, AxisId};
use crate::sampler::ContinuousSampler;
use crate::util::{mean, velocity_mm_s};

/// Jagged sample matrix in traversal order. Return-sweep rows are stored
/// reversed so every row reads left to right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RasterMatrix {
    rows: Vec<Vec<f32>>,
}

impl RasterMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a forward (left-to-right) row as acquired.
    pub fn push_forward(&mut self, row: Vec<f32>) {
        self.rows.push(row);
    }

    /// Append a return-sweep row, reversing it once into spatial order.
    pub fn push_backward(&mut self, mut row: Vec<f32>) {
        row.reverse();
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_lengths(&self) -> Vec<usize> {
        self.rows.iter().map(Vec::len).collect()
    }

    pub fn into_rows(self) -> Vec<Vec<f32>> {
        self.rows
    }
}

impl From<Vec<Vec<f32>>> for RasterMatrix {
    fn from(rows: Vec<Vec<f32>>) -> Self {
        Self { rows }
    }
}

/// Per-scan velocity samples (mm/s).
#[derive(Debug, Clone, Default)]
struct VelocityStats {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl VelocityStats {
    fn record(&mut self, axis: AxisId, mm: f64, elapsed: Duration) {
        let Some(v) = velocity_mm_s(mm, elapsed) else {
            return;
        };
        match axis {
            AxisId::X => self.x.push(v),
            AxisId::Y => self.y.push(v),
            AxisId::Aux => {}
        }
    }

    fn summary(&self) -> VelocitySummary {
        VelocitySummary {
            mean_x_mm_s: mean(&self.x),
            mean_y_mm_s: mean(&self.y),
            x_samples: self.x.len(),
            y_samples: self.y.len(),
        }
    }
}

/// Mean traversal velocities for one scan. `None` when no move on that axis
/// took measurable time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VelocitySummary {
    pub mean_x_mm_s: Option<f64>,
    pub mean_y_mm_s: Option<f64>,
    pub x_samples: usize,
    pub y_samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    ResetAxes,
    AuxiliaryPosition,
    RasterSweep { increment: u32 },
    Complete,
}

/// State owned by a single scan invocation.
#[derive(Debug)]
struct ScanContext {
    phase: ScanPhase,
    matrix: RasterMatrix,
    velocities: VelocityStats,
    started: Instant,
}

impl ScanContext {
    fn new(started: Instant) -> Self {
        Self {
            phase: ScanPhase::Idle,
            matrix: RasterMatrix::new(),
            velocities: VelocityStats::default(),
            started,
        }
    }

    fn enter(&mut self, phase: ScanPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "scan phase");
        self.phase = phase;
    }
}

/// Result of a completed acquisition.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub matrix: RasterMatrix,
    pub velocities: VelocitySummary,
    pub plan: ScanPlan,
    /// Duration of the whole scan on the scanner's clock.
    pub elapsed: Duration,
}

/// Owns the three axes and the sampler for the lifetime of the stage.
pub struct RasterScanner<C: Clock = MonotonicClock> {
    x: Axis,
    y: Axis,
    aux: Axis,
    sampler: ContinuousSampler,
    geometry: StageGeometry,
    clock: C,
}

impl RasterScanner<MonotonicClock> {
    pub fn builder() -> RasterScannerBuilder<MonotonicClock> {
        RasterScannerBuilder::default()
    }
}

impl<C: Clock> RasterScanner<C> {
    pub fn geometry(&self) -> &StageGeometry {
        &self.geometry
    }

    /// Run one complete scan. Any hardware fault or abort ends the scan
    /// without a partial matrix.
    pub fn scan(
        &mut self,
        params: &ScanParams,
        abort: &AbortToken,
    ) -> Result<ScanOutcome, ScanError> {
        let plan = self.geometry.plan(params);
        let mut ctx = ScanContext::new(self.clock.now());
        tracing::info!(
            rate_hz = params.sampling_rate_hz(),
            pitch_mm = params.row_pitch_mm(),
            aux_mm = params.aux_travel_mm(),
            increments = plan.increments,
            row_steps = plan.row_steps,
            "scan start"
        );

        ctx.enter(ScanPhase::ResetAxes);
        self.y
            .move_steps(plan.reset_y_steps, Direction::Backward, &self.clock, abort)?;
        self.x
            .move_steps(plan.reset_x_steps, Direction::Backward, &self.clock, abort)?;

        if plan.aux_steps > 0 {
            ctx.enter(ScanPhase::AuxiliaryPosition);
            self.aux
                .move_steps(plan.aux_steps, Direction::Forward, &self.clock, abort)?;
        }

        let x_mm = self.geometry.x_travel_mm;
        let pitch_mm = params.row_pitch_mm();
        for increment in 0..plan.increments {
            ctx.enter(ScanPhase::RasterSweep { increment });

            let (row, dt) = self.sweep_row(Direction::Forward, &plan, params, abort)?;
            tracing::debug!(increment, samples = row.len(), ?dt, "forward row");
            ctx.matrix.push_forward(row);
            ctx.velocities.record(AxisId::X, x_mm, dt);

            let dt = self
                .y
                .move_steps(plan.pitch_steps, Direction::Forward, &self.clock, abort)?;
            ctx.velocities.record(AxisId::Y, pitch_mm, dt);

            let (row, dt) = self.sweep_row(Direction::Backward, &plan, params, abort)?;
            tracing::debug!(increment, samples = row.len(), ?dt, "return row");
            ctx.matrix.push_backward(row);
            ctx.velocities.record(AxisId::X, x_mm, dt);

            // The final increment also advances Y, leaving the carriage one
            // pitch past the last row.
            let dt = self
                .y
                .move_steps(plan.pitch_steps, Direction::Forward, &self.clock, abort)?;
            ctx.velocities.record(AxisId::Y, pitch_mm, dt);
        }

        ctx.enter(ScanPhase::Complete);
        let velocities = ctx.velocities.summary();
        let elapsed = self.clock.elapsed_since(ctx.started);
        tracing::info!(
            rows = ctx.matrix.len(),
            mean_x_mm_s = velocities.mean_x_mm_s,
            mean_y_mm_s = velocities.mean_y_mm_s,
            ?elapsed,
            "scan complete"
        );
        Ok(ScanOutcome {
            matrix: ctx.matrix,
            velocities,
            plan,
            elapsed,
        })
    }

    /// One X traversal with the sampler open around it. The row is always
    /// closed, even when the move fails, so no sampler row outlives a sweep.
    fn sweep_row(
        &mut self,
        direction: Direction,
        plan: &ScanPlan,
        params: &ScanParams,
        abort: &AbortToken,
    ) -> Result<(Vec<f32>, Duration), ScanError> {
        let capture = self.sampler.start(params.sampling_rate_hz())?;
        let moved = self
            .x
            .move_steps(plan.row_steps, direction, &self.clock, abort);
        let row = self.sampler.stop(capture);
        let dt = moved?;
        Ok((row?, dt))
    }

    /// Read a single voltage through the sampler (used by health checks).
    pub fn probe(&mut self) -> Result<f32, ScanError> {
        let capture = self.sampler.start(1.0)?;
        let row = self.sampler.stop(capture)?;
        row.first().copied().ok_or(ScanError::EmptyScan)
    }

    /// De-energize all motors (best-effort).
    pub fn release(&mut self) {
        for axis in [&mut self.x, &mut self.y, &mut self.aux] {
            if let Err(e) = axis.release() {
                tracing::warn!(axis = %axis.id(), error = %e, "release failed");
            }
        }
    }
}

/// Builder for `RasterScanner`. All fields are validated on `build()`.
pub struct RasterScannerBuilder<C> {
    x: Option<Box<dyn Stepper + Send>>,
    y: Option<Box<dyn Stepper + Send>>,
    aux: Option<Box<dyn Stepper + Send>>,
    adc: Option<Box<dyn Adc + Send>>,
    geometry: StageGeometry,
    timing: MotionTiming,
    clock: C,
}

impl Default for RasterScannerBuilder<MonotonicClock> {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            aux: None,
            adc: None,
            geometry: StageGeometry::default(),
            timing: MotionTiming::default(),
            clock: MonotonicClock::new(),
        }
    }
}

impl<C: Clock> RasterScannerBuilder<C> {
    pub fn with_x_axis(mut self, s: impl Stepper + Send + 'static) -> Self {
        self.x = Some(Box::new(s));
        self
    }

    pub fn with_y_axis(mut self, s: impl Stepper + Send + 'static) -> Self {
        self.y = Some(Box::new(s));
        self
    }

    pub fn with_aux_axis(mut self, s: impl Stepper + Send + 'static) -> Self {
        self.aux = Some(Box::new(s));
        self
    }

    pub fn with_adc(mut self, a: impl Adc + Send + 'static) -> Self {
        self.adc = Some(Box::new(a));
        self
    }

    pub fn with_geometry(mut self, g: StageGeometry) -> Self {
        self.geometry = g;
        self
    }

    pub fn with_timing(mut self, t: MotionTiming) -> Self {
        self.timing = t;
        self
    }

    pub fn with_clock<C2: Clock>(self, clock: C2) -> RasterScannerBuilder<C2> {
        RasterScannerBuilder {
            x: self.x,
            y: self.y,
            aux: self.aux,
            adc: self.adc,
            geometry: self.geometry,
            timing: self.timing,
            clock,
        }
    }

    pub fn build(self) -> Result<RasterScanner<C>, BuildError> {
        let x = self.x.ok_or(BuildError::MissingAxis("x"))?;
        let y = self.y.ok_or(BuildError::MissingAxis("y"))?;
        let aux = self.aux.ok_or(BuildError::MissingAxis("aux"))?;
        let adc = self.adc.ok_or(BuildError::MissingAdc)?;
        self.geometry.validate().map_err(BuildError::InvalidConfig)?;
        if self.timing.row_stop_timeout.is_zero() {
            return Err(BuildError::InvalidConfig("row stop timeout must be > 0"));
        }
        Ok(RasterScanner {
            x: Axis::new(AxisId::X, x, self.timing.step_delay),
            y: Axis::new(AxisId::Y, y, self.timing.step_delay),
            aux: Axis::new(AxisId::Aux, aux, self.timing.aux_step_delay),
            sampler: ContinuousSampler::spawn(adc, self.timing.row_stop_timeout),
            geometry: self.geometry,
            clock: self.clock,
        })
    }
}

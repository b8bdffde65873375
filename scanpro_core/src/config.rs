//! Runtime configuration types for the scan engine.
//!
//! These are separate from the TOML-deserialized config in `scanpro_config`;
//! see `conversions` for the bridge.

use std::time::Duration;

use crate::error::ScanError;
use crate::util::steps_for_mm;

/// Mechanical description of the stage. Fixed at scanner construction.
#[derive(Debug, Clone, PartialEq)]
pub struct StageGeometry {
    /// Axis-1 sweep span per row (mm).
    pub x_travel_mm: f64,
    /// Axis-2 travel covered by the raster (mm).
    pub y_travel_mm: f64,
    /// Subtracted from the X travel while homing.
    pub reset_margin_mm: f64,
    pub steps_per_mm: f64,
    pub aux_steps_per_mm: f64,
}

impl Default for StageGeometry {
    #[allow(clippy::approx_constant)]
    fn default() -> Self {
        Self {
            x_travel_mm: 110.0,
            y_travel_mm: 130.0,
            reset_margin_mm: 5.0,
            steps_per_mm: 200.0 / (2.0 * 3.14 * 10.0),
            aux_steps_per_mm: 10.0,
        }
    }
}

impl StageGeometry {
    pub fn validate(&self) -> Result<(), &'static str> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if !ok(self.x_travel_mm) || !ok(self.y_travel_mm) {
            return Err("stage travel must be > 0");
        }
        if !ok(self.steps_per_mm) || !ok(self.aux_steps_per_mm) {
            return Err("steps per mm must be > 0");
        }
        if !(self.reset_margin_mm.is_finite()
            && self.reset_margin_mm >= 0.0
            && self.reset_margin_mm < self.x_travel_mm)
        {
            return Err("reset margin must be in [0, x travel)");
        }
        Ok(())
    }

    /// Step counts for one scan with these parameters.
    pub fn plan(&self, params: &ScanParams) -> ScanPlan {
        ScanPlan {
            reset_y_steps: steps_for_mm(self.y_travel_mm, self.steps_per_mm),
            reset_x_steps: steps_for_mm(
                self.x_travel_mm - self.reset_margin_mm,
                self.steps_per_mm,
            ),
            aux_steps: steps_for_mm(params.aux_travel_mm(), self.aux_steps_per_mm),
            row_steps: steps_for_mm(self.x_travel_mm, self.steps_per_mm),
            pitch_steps: steps_for_mm(params.row_pitch_mm(), self.steps_per_mm),
            increments: increments_for(self.y_travel_mm, params.row_pitch_mm()),
        }
    }
}

/// Number of zigzag increments: floor(travel / pitch).
pub fn increments_for(travel_mm: f64, pitch_mm: f64) -> u32 {
    if !(pitch_mm.is_finite() && pitch_mm > 0.0) {
        return 0;
    }
    let n = (travel_mm / pitch_mm).floor();
    if n.is_finite() && n > 0.0 {
        n.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Derived step counts for a single scan invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPlan {
    pub reset_y_steps: u32,
    pub reset_x_steps: u32,
    pub aux_steps: u32,
    pub row_steps: u32,
    pub pitch_steps: u32,
    pub increments: u32,
}

impl ScanPlan {
    /// Rows the finished matrix will hold (forward + return per increment).
    pub fn expected_rows(&self) -> usize {
        self.increments as usize * 2
    }
}

/// Settle delays and bounded waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionTiming {
    /// Delay after every X/Y pulse.
    pub step_delay: Duration,
    /// Delay after every auxiliary pulse.
    pub aux_step_delay: Duration,
    /// Max wait for the sampler to hand back a finished row.
    pub row_stop_timeout: Duration,
}

impl Default for MotionTiming {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(2),
            aux_step_delay: Duration::from_millis(10),
            row_stop_timeout: Duration::from_secs(1),
        }
    }
}

/// Operator inputs for one scan, validated once at the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanParams {
    sampling_rate_hz: f64,
    row_pitch_mm: f64,
    aux_travel_mm: f64,
}

impl ScanParams {
    /// Rate and pitch must be positive and finite; auxiliary travel must be
    /// finite and non-negative (zero skips auxiliary positioning).
    pub fn new(
        sampling_rate_hz: f64,
        row_pitch_mm: f64,
        aux_travel_mm: f64,
    ) -> Result<Self, ScanError> {
        if !(sampling_rate_hz.is_finite() && sampling_rate_hz > 0.0) {
            return Err(ScanError::InvalidInput(format!(
                "sampling rate must be a positive number, got {sampling_rate_hz}"
            )));
        }
        if !(row_pitch_mm.is_finite() && row_pitch_mm > 0.0) {
            return Err(ScanError::InvalidInput(format!(
                "row pitch must be a positive number of mm, got {row_pitch_mm}"
            )));
        }
        if !(aux_travel_mm.is_finite() && aux_travel_mm >= 0.0) {
            return Err(ScanError::InvalidInput(format!(
                "auxiliary travel must be a non-negative number of mm, got {aux_travel_mm}"
            )));
        }
        Ok(Self {
            sampling_rate_hz,
            row_pitch_mm,
            aux_travel_mm,
        })
    }

    /// Parse the three operator fields from text.
    pub fn parse(rate: &str, pitch: &str, aux: &str) -> Result<Self, ScanError> {
        let num = |name: &str, s: &str| {
            s.trim().parse::<f64>().map_err(|_| {
                ScanError::InvalidInput(format!("{name} must be numeric, got {s:?}"))
            })
        };
        Self::new(
            num("sampling rate", rate)?,
            num("row pitch", pitch)?,
            num("auxiliary travel", aux)?,
        )
    }

    pub fn sampling_rate_hz(&self) -> f64 {
        self.sampling_rate_hz
    }

    pub fn row_pitch_mm(&self) -> f64 {
        self.row_pitch_mm
    }

    pub fn aux_travel_mm(&self) -> f64 {
        self.aux_travel_mm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bench_rig_plan() {
        let geo = StageGeometry::default();
        let p = ScanParams::new(100.0, 10.0, 2.5).unwrap();
        let plan = geo.plan(&p);
        assert_eq!(plan.increments, 13);
        assert_eq!(plan.expected_rows(), 26);
        assert_eq!(plan.row_steps, 350);
        assert_eq!(plan.reset_y_steps, 414);
        assert_eq!(plan.reset_x_steps, 334);
        assert_eq!(plan.pitch_steps, 31);
        assert_eq!(plan.aux_steps, 25);
    }

    #[test]
    fn pitch_larger_than_travel_plans_no_rows() {
        let geo = StageGeometry::default();
        let p = ScanParams::new(100.0, 500.0, 0.0).unwrap();
        assert_eq!(geo.plan(&p).increments, 0);
    }

    #[test]
    fn rejects_non_positive_inputs() {
        assert!(matches!(
            ScanParams::new(0.0, 1.0, 0.0),
            Err(ScanError::InvalidInput(_))
        ));
        assert!(matches!(
            ScanParams::new(10.0, -1.0, 0.0),
            Err(ScanError::InvalidInput(_))
        ));
        assert!(matches!(
            ScanParams::new(10.0, 1.0, f64::INFINITY),
            Err(ScanError::InvalidInput(_))
        ));
    }

    #[test]
    fn parse_rejects_text() {
        let err = ScanParams::parse("fast", "10", "0").unwrap_err();
        assert!(err.to_string().contains("sampling rate must be numeric"));
        let ok = ScanParams::parse(" 50 ", "10", "1.5").unwrap();
        assert_eq!(ok.aux_travel_mm(), 1.5);
    }

    #[test]
    fn geometry_validation() {
        assert!(StageGeometry::default().validate().is_ok());
        let bad = StageGeometry {
            reset_margin_mm: 120.0,
            ..StageGeometry::default()
        };
        assert!(bad.validate().is_err());
    }
}

//! `From` implementations bridging `scanpro_config` types to `scanpro_core` types.

use std::time::Duration;

use crate::config::{MotionTiming, StageGeometry};

// ── StageGeometry ────────────────────────────────────────────────────────────

impl From<&scanpro_config::StageCfg> for StageGeometry {
    fn from(c: &scanpro_config::StageCfg) -> Self {
        Self {
            x_travel_mm: c.x_travel_mm,
            y_travel_mm: c.y_travel_mm,
            reset_margin_mm: c.reset_margin_mm,
            steps_per_mm: c.steps_per_mm,
            aux_steps_per_mm: c.aux_steps_per_mm,
        }
    }
}

// ── MotionTiming ─────────────────────────────────────────────────────────────

impl From<&scanpro_config::TimingCfg> for MotionTiming {
    fn from(c: &scanpro_config::TimingCfg) -> Self {
        Self {
            step_delay: Duration::from_micros(c.step_delay_us),
            aux_step_delay: Duration::from_micros(c.aux_step_delay_us),
            row_stop_timeout: Duration::from_millis(c.row_stop_timeout_ms),
        }
    }
}

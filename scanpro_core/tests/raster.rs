use std::sync::atomic::Ordering;
use std::time::Duration;

use rstest::rstest;
use scanpro_core::mocks::{ConstAdc, CountingStepper, DeadAdc, JammedStepper, SequenceAdc};
use scanpro_core::{
    AbortToken, BuildError, MotionTiming, NormalizedGrid, RasterScanner, ScanError, ScanParams,
    StageGeometry,
};
use scanpro_hardware::{SimStage, SimTarget};
use scanpro_traits::ManualClock;

fn fast_timing() -> MotionTiming {
    MotionTiming {
        step_delay: Duration::from_millis(2),
        aux_step_delay: Duration::from_millis(10),
        row_stop_timeout: Duration::from_secs(2),
    }
}

/// Small stage: 10 steps per row, 20 mm of Y travel.
fn small_geometry() -> StageGeometry {
    StageGeometry {
        x_travel_mm: 10.0,
        y_travel_mm: 20.0,
        reset_margin_mm: 1.0,
        steps_per_mm: 1.0,
        aux_steps_per_mm: 10.0,
    }
}

#[rstest]
#[case(10.0, 13)]
#[case(13.0, 10)]
#[case(26.0, 5)]
#[case(65.0, 2)]
#[case(130.0, 1)]
fn row_count_is_twice_the_increments(#[case] pitch: f64, #[case] increments: usize) {
    let mut scanner = RasterScanner::builder()
        .with_x_axis(CountingStepper::default())
        .with_y_axis(CountingStepper::default())
        .with_aux_axis(CountingStepper::default())
        .with_adc(ConstAdc(1.0))
        .with_clock(ManualClock::new())
        .build()
        .unwrap();
    let params = ScanParams::new(100.0, pitch, 0.0).unwrap();
    let out = scanner.scan(&params, &AbortToken::new()).unwrap();
    assert_eq!(out.matrix.len(), 2 * increments);
    assert!(out.matrix.rows().iter().all(|r| !r.is_empty()));
}

#[test]
fn return_rows_are_reversed_once() {
    let mut scanner = RasterScanner::builder()
        .with_x_axis(CountingStepper::default())
        .with_y_axis(CountingStepper::default())
        .with_aux_axis(CountingStepper::default())
        .with_adc(SequenceAdc::default())
        .with_geometry(small_geometry())
        .with_timing(fast_timing())
        .build()
        .unwrap();
    let params = ScanParams::new(1000.0, 10.0, 0.0).unwrap();
    let out = scanner.scan(&params, &AbortToken::new()).unwrap();
    let rows = out.matrix.rows();
    assert_eq!(rows.len(), 4);
    for (i, row) in rows.iter().enumerate() {
        // Acquisition order is strictly increasing, so a forward row ascends
        // and a once-reversed return row descends.
        if i % 2 == 0 {
            assert!(row.windows(2).all(|w| w[0] < w[1]), "row {i}: {row:?}");
        } else {
            assert!(row.windows(2).all(|w| w[0] > w[1]), "row {i}: {row:?}");
        }
    }
    // Rows were acquired one after another.
    let last_of_first = rows[0].last().copied().unwrap();
    assert!(rows[1].iter().all(|v| *v > last_of_first));
}

#[test]
fn velocities_come_from_the_clock() {
    let mut scanner = RasterScanner::builder()
        .with_x_axis(CountingStepper::default())
        .with_y_axis(CountingStepper::default())
        .with_aux_axis(CountingStepper::default())
        .with_adc(ConstAdc(0.5))
        .with_timing(fast_timing())
        .with_clock(ManualClock::new())
        .build()
        .unwrap();
    let params = ScanParams::new(50.0, 10.0, 0.0).unwrap();
    let out = scanner.scan(&params, &AbortToken::new()).unwrap();
    let v = out.velocities;
    // 350 steps * 2 ms per row, 31 steps * 2 ms per pitch.
    let x = v.mean_x_mm_s.unwrap();
    let y = v.mean_y_mm_s.unwrap();
    assert!((x - 110.0 / 0.7).abs() < 1e-6, "x = {x}");
    assert!((y - 10.0 / 0.062).abs() < 1e-6, "y = {y}");
    assert_eq!(v.x_samples, 26);
    assert_eq!(v.y_samples, 26);
}

#[test]
fn velocity_stats_reset_between_scans() {
    let mut scanner = RasterScanner::builder()
        .with_x_axis(CountingStepper::default())
        .with_y_axis(CountingStepper::default())
        .with_aux_axis(CountingStepper::default())
        .with_adc(ConstAdc(0.5))
        .with_clock(ManualClock::new())
        .build()
        .unwrap();
    let abort = AbortToken::new();
    let a = scanner
        .scan(&ScanParams::new(50.0, 10.0, 0.0).unwrap(), &abort)
        .unwrap();
    let b = scanner
        .scan(&ScanParams::new(50.0, 65.0, 0.0).unwrap(), &abort)
        .unwrap();
    assert_eq!(a.velocities.x_samples, 26);
    assert_eq!(b.velocities.x_samples, 4);
    assert_eq!(b.matrix.len(), 4);
}

#[test]
fn zero_step_delay_reports_no_velocity() {
    let mut scanner = RasterScanner::builder()
        .with_x_axis(CountingStepper::default())
        .with_y_axis(CountingStepper::default())
        .with_aux_axis(CountingStepper::default())
        .with_adc(ConstAdc(0.5))
        .with_timing(MotionTiming {
            step_delay: Duration::ZERO,
            aux_step_delay: Duration::ZERO,
            row_stop_timeout: Duration::from_secs(1),
        })
        .with_clock(ManualClock::new())
        .build()
        .unwrap();
    let out = scanner
        .scan(&ScanParams::new(50.0, 65.0, 0.0).unwrap(), &AbortToken::new())
        .unwrap();
    assert_eq!(out.velocities.mean_x_mm_s, None);
    assert_eq!(out.velocities.mean_y_mm_s, None);
}

#[test]
fn step_counts_and_final_positions() {
    let x = CountingStepper::default();
    let y = CountingStepper::default();
    let aux = CountingStepper::default();
    let (xp, yp, ap) = (x.position(), y.position(), aux.position());
    let mut scanner = RasterScanner::builder()
        .with_x_axis(x)
        .with_y_axis(y)
        .with_aux_axis(aux)
        .with_adc(ConstAdc(0.5))
        .with_clock(ManualClock::new())
        .build()
        .unwrap();
    scanner
        .scan(&ScanParams::new(50.0, 10.0, 2.5).unwrap(), &AbortToken::new())
        .unwrap();
    // Reset 334 back; every increment is a forward and a return sweep.
    assert_eq!(xp.load(Ordering::Relaxed), -334);
    // Reset 414 back; 13 increments advance twice by 31 steps.
    assert_eq!(yp.load(Ordering::Relaxed), -414 + 13 * 2 * 31);
    assert_eq!(ap.load(Ordering::Relaxed), 25);
}

#[test]
fn zero_aux_travel_skips_auxiliary_axis() {
    let aux = CountingStepper::default();
    let pulses = aux.counter();
    let mut scanner = RasterScanner::builder()
        .with_x_axis(CountingStepper::default())
        .with_y_axis(CountingStepper::default())
        .with_aux_axis(aux)
        .with_adc(ConstAdc(0.5))
        .with_clock(ManualClock::new())
        .build()
        .unwrap();
    scanner
        .scan(&ScanParams::new(50.0, 65.0, 0.0).unwrap(), &AbortToken::new())
        .unwrap();
    assert_eq!(pulses.load(Ordering::Relaxed), 0);
}

#[test]
fn stepper_fault_ends_the_scan() {
    let stage = SimStage::new();
    let mut scanner = RasterScanner::builder()
        .with_x_axis(stage.x_stepper().with_fault_after(400))
        .with_y_axis(stage.y_stepper())
        .with_aux_axis(stage.aux_stepper())
        .with_adc(stage.adc(SimTarget::default()))
        .with_clock(ManualClock::new())
        .build()
        .unwrap();
    let err = scanner
        .scan(&ScanParams::new(50.0, 10.0, 0.0).unwrap(), &AbortToken::new())
        .unwrap_err();
    assert!(matches!(err, ScanError::HardwareFault(ref m) if m.starts_with("x:")), "{err:?}");
}

#[test]
fn jammed_y_axis_fails_during_reset() {
    let mut scanner = RasterScanner::builder()
        .with_x_axis(CountingStepper::default())
        .with_y_axis(JammedStepper)
        .with_aux_axis(CountingStepper::default())
        .with_adc(ConstAdc(0.5))
        .with_clock(ManualClock::new())
        .build()
        .unwrap();
    let err = scanner
        .scan(&ScanParams::new(50.0, 10.0, 0.0).unwrap(), &AbortToken::new())
        .unwrap_err();
    assert!(matches!(err, ScanError::HardwareFault(_)));
}

#[test]
fn adc_fault_ends_the_scan_and_closes_the_row() {
    let mut scanner = RasterScanner::builder()
        .with_x_axis(CountingStepper::default())
        .with_y_axis(CountingStepper::default())
        .with_aux_axis(CountingStepper::default())
        .with_adc(DeadAdc)
        .with_clock(ManualClock::new())
        .build()
        .unwrap();
    let params = ScanParams::new(50.0, 65.0, 0.0).unwrap();
    let err = scanner.scan(&params, &AbortToken::new()).unwrap_err();
    assert!(matches!(err, ScanError::HardwareFault(ref m) if m.contains("adc")), "{err:?}");
    // The row was closed, so a retry reaches the sampler again instead of SamplerBusy.
    let again = scanner.scan(&params, &AbortToken::new()).unwrap_err();
    assert!(matches!(again, ScanError::HardwareFault(_)));
}

#[test]
fn cancelled_scan_moves_nothing() {
    let x = CountingStepper::default();
    let pulses = x.counter();
    let mut scanner = RasterScanner::builder()
        .with_x_axis(x)
        .with_y_axis(CountingStepper::default())
        .with_aux_axis(CountingStepper::default())
        .with_adc(ConstAdc(0.5))
        .with_clock(ManualClock::new())
        .build()
        .unwrap();
    let abort = AbortToken::new();
    abort.cancel();
    let err = scanner
        .scan(&ScanParams::new(50.0, 10.0, 0.0).unwrap(), &abort)
        .unwrap_err();
    assert_eq!(err, ScanError::Aborted);
    assert_eq!(pulses.load(Ordering::Relaxed), 0);
}

#[test]
fn pitch_beyond_travel_is_an_empty_scan() {
    let mut scanner = RasterScanner::builder()
        .with_x_axis(CountingStepper::default())
        .with_y_axis(CountingStepper::default())
        .with_aux_axis(CountingStepper::default())
        .with_adc(ConstAdc(0.5))
        .with_clock(ManualClock::new())
        .build()
        .unwrap();
    let out = scanner
        .scan(&ScanParams::new(50.0, 500.0, 0.0).unwrap(), &AbortToken::new())
        .unwrap();
    assert!(out.matrix.is_empty());
    assert_eq!(
        NormalizedGrid::normalize(&out.matrix).unwrap_err(),
        ScanError::EmptyScan
    );
}

#[test]
fn sim_stage_scan_sees_the_target() {
    let stage = SimStage::new();
    let mut scanner = RasterScanner::builder()
        .with_x_axis(stage.x_stepper())
        .with_y_axis(stage.y_stepper())
        .with_aux_axis(stage.aux_stepper())
        .with_adc(stage.adc(SimTarget::constant(1.5)))
        .with_clock(ManualClock::new())
        .build()
        .unwrap();
    let out = scanner
        .scan(&ScanParams::new(50.0, 26.0, 0.0).unwrap(), &AbortToken::new())
        .unwrap();
    let grid = NormalizedGrid::normalize(&out.matrix).unwrap();
    assert_eq!(grid.rows(), 10);
    assert_eq!(grid.valid_range(), Some((1.5, 1.5)));
}

#[test]
fn default_target_stands_out_of_a_homed_sweep() {
    let stage = SimStage::new();
    let mut scanner = RasterScanner::builder()
        .with_x_axis(stage.x_stepper())
        .with_y_axis(stage.y_stepper())
        .with_aux_axis(stage.aux_stepper())
        .with_adc(stage.adc(SimTarget::default()))
        .with_timing(MotionTiming {
            step_delay: Duration::from_micros(20),
            aux_step_delay: Duration::from_micros(20),
            row_stop_timeout: Duration::from_secs(2),
        })
        .build()
        .unwrap();
    let out = scanner
        .scan(&ScanParams::new(5000.0, 10.0, 0.0).unwrap(), &AbortToken::new())
        .unwrap();
    // Reset drove both axes into the home stop; every row ends back at x = 0.
    let (x, y, _) = stage.position();
    assert_eq!(x, 0);
    assert_eq!(y, 13 * 2 * 31);

    let grid = NormalizedGrid::normalize(&out.matrix).unwrap();
    let (lo, hi) = grid.valid_range().unwrap();
    assert!(hi - lo > 1.0, "flat field: {lo}..{hi}");
}

#[test]
fn probe_reads_one_voltage() {
    let mut scanner = RasterScanner::builder()
        .with_x_axis(CountingStepper::default())
        .with_y_axis(CountingStepper::default())
        .with_aux_axis(CountingStepper::default())
        .with_adc(ConstAdc(0.25))
        .build()
        .unwrap();
    assert_eq!(scanner.probe().unwrap(), 0.25);
    scanner.release();
}

#[rstest]
#[case::no_x(false, true, true, true, BuildError::MissingAxis("x"))]
#[case::no_y(true, false, true, true, BuildError::MissingAxis("y"))]
#[case::no_aux(true, true, false, true, BuildError::MissingAxis("aux"))]
#[case::no_adc(true, true, true, false, BuildError::MissingAdc)]
fn builder_requires_every_device(
    #[case] x: bool,
    #[case] y: bool,
    #[case] aux: bool,
    #[case] adc: bool,
    #[case] expected: BuildError,
) {
    let mut b = RasterScanner::builder();
    if x {
        b = b.with_x_axis(CountingStepper::default());
    }
    if y {
        b = b.with_y_axis(CountingStepper::default());
    }
    if aux {
        b = b.with_aux_axis(CountingStepper::default());
    }
    if adc {
        b = b.with_adc(ConstAdc(0.0));
    }
    let err = b.build().err().unwrap();
    assert_eq!(err.to_string(), expected.to_string());
}

#[test]
fn builder_rejects_bad_geometry() {
    let err = RasterScanner::builder()
        .with_x_axis(CountingStepper::default())
        .with_y_axis(CountingStepper::default())
        .with_aux_axis(CountingStepper::default())
        .with_adc(ConstAdc(0.0))
        .with_geometry(StageGeometry {
            steps_per_mm: 0.0,
            ..StageGeometry::default()
        })
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, BuildError::InvalidConfig(_)));
}

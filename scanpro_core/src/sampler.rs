//! Continuous background sampling.
//!
//! One long-lived thread owns the `Adc`. The controller opens a row with
//! `start`, moves the stage, then closes it with `stop`, which hands back
//! every voltage read in between. Rows are delimited by commands on a
//! bounded channel; finished rows come back on a second channel.
//!
//! The number of samples per row depends on how long the row stayed open and
//! is not fixed. Each row holds at least one sample: the worker reads before
//! it first looks for `Stop`.
//!
//! Safety: Each `ContinuousSampler` spawns exactly one thread that is shut
//! down when the sampler is dropped, preventing thread leaks.
use crossbeam_channel as xch;
use scanpro_traits::Adc;
use std::time::{Duration, Instant};

use crate::error::ScanError;
use crate::hw_error::map_hw_error;
use crate::util::interval_for_rate;

enum Command {
    Start { interval: Duration },
    Stop,
}

type RowResult = Result<Vec<f32>, ScanError>;

/// Proof that a row is open. Consumed by `ContinuousSampler::stop`.
#[derive(Debug)]
#[must_use = "an open row must be closed with ContinuousSampler::stop"]
pub struct RowCapture {
    id: u64,
    rate_hz: f64,
    started: Instant,
}

impl RowCapture {
    pub fn rate_hz(&self) -> f64 {
        self.rate_hz
    }
}

pub struct ContinuousSampler {
    cmd_tx: Option<xch::Sender<Command>>,
    row_rx: xch::Receiver<RowResult>,
    active: Option<u64>,
    next_id: u64,
    stop_timeout: Duration,
    /// Set when a row failed to come back in time or the worker refused a
    /// stop; the worker may be wedged and is no longer trusted.
    poisoned: bool,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl ContinuousSampler {
    pub fn spawn<A: Adc + Send + 'static>(adc: A, stop_timeout: Duration) -> Self {
        let (cmd_tx, cmd_rx) = xch::bounded(1);
        let (row_tx, row_rx) = xch::bounded(1);
        let join_handle = std::thread::spawn(move || worker(adc, cmd_rx, row_tx));
        Self {
            cmd_tx: Some(cmd_tx),
            row_rx,
            active: None,
            next_id: 0,
            stop_timeout,
            poisoned: false,
            join_handle: Some(join_handle),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Open a row sampled every `1 / rate_hz` seconds. Rejected while another
    /// row is open.
    pub fn start(&mut self, rate_hz: f64) -> Result<RowCapture, ScanError> {
        if self.active.is_some() {
            return Err(ScanError::SamplerBusy);
        }
        if self.poisoned {
            return Err(ScanError::HardwareFault(
                "sampler stalled on a previous row".into(),
            ));
        }
        if !(rate_hz.is_finite() && rate_hz > 0.0) {
            return Err(ScanError::InvalidInput(format!(
                "sampling rate must be > 0, got {rate_hz}"
            )));
        }
        let interval = interval_for_rate(rate_hz);
        self.send(Command::Start { interval })?;
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.active = Some(id);
        tracing::trace!(row = id, ?interval, "sampler row open");
        Ok(RowCapture {
            id,
            rate_hz,
            started: Instant::now(),
        })
    }

    /// Close the row and return its samples in acquisition order. Waits at
    /// most the configured stop timeout for the worker to hand the row back.
    pub fn stop(&mut self, capture: RowCapture) -> Result<Vec<f32>, ScanError> {
        if self.active != Some(capture.id) {
            return Err(ScanError::InvalidInput(
                "row handle does not belong to the open row".into(),
            ));
        }
        if let Err(e) = self.send(Command::Stop) {
            // The worker can no longer be told to close the row.
            self.active = None;
            self.poisoned = true;
            tracing::error!(row = capture.id, error = %e, "sampler did not accept stop");
            return Err(e);
        }
        let result = match self.row_rx.recv_timeout(self.stop_timeout) {
            Ok(row) => row,
            Err(xch::RecvTimeoutError::Timeout) => {
                self.poisoned = true;
                tracing::error!(row = capture.id, timeout = ?self.stop_timeout, "sampler did not return row");
                Err(ScanError::Timeout("sampler row"))
            }
            Err(xch::RecvTimeoutError::Disconnected) => {
                Err(ScanError::HardwareFault("sampler thread exited".into()))
            }
        };
        self.active = None;
        if let Ok(row) = &result {
            tracing::debug!(
                row = capture.id,
                samples = row.len(),
                open_for = ?capture.started.elapsed(),
                "sampler row closed"
            );
        }
        result
    }

    fn send(&self, cmd: Command) -> Result<(), ScanError> {
        let tx = self
            .cmd_tx
            .as_ref()
            .ok_or_else(|| ScanError::HardwareFault("sampler shut down".into()))?;
        tx.send_timeout(cmd, self.stop_timeout).map_err(|e| match e {
            xch::SendTimeoutError::Timeout(_) => ScanError::Timeout("sampler command"),
            xch::SendTimeoutError::Disconnected(_) => {
                ScanError::HardwareFault("sampler thread exited".into())
            }
        })
    }
}

fn worker<A: Adc>(mut adc: A, cmd_rx: xch::Receiver<Command>, row_tx: xch::Sender<RowResult>) {
    while let Ok(cmd) = cmd_rx.recv() {
        let interval = match cmd {
            Command::Start { interval } => interval,
            // Stop without an open row: nothing to hand back.
            Command::Stop => continue,
        };
        let Some(row) = capture_row(&mut adc, &cmd_rx, interval) else {
            break;
        };
        if row_tx.send(row).is_err() {
            tracing::debug!("Sampler consumer disconnected, exiting thread");
            break;
        }
    }
    tracing::trace!("Sampler thread exiting cleanly");
}

/// Poll until `Stop`. Returns `None` if the controller went away mid-row.
fn capture_row<A: Adc>(
    adc: &mut A,
    cmd_rx: &xch::Receiver<Command>,
    interval: Duration,
) -> Option<RowResult> {
    let mut buf = Vec::new();
    let mut fault: Option<ScanError> = None;
    loop {
        if fault.is_none() {
            match adc.voltage() {
                Ok(v) => buf.push(v),
                Err(e) => {
                    let err = map_hw_error("adc", &*e);
                    tracing::error!(error = %err, samples = buf.len(), "adc read failed");
                    fault = Some(err);
                }
            }
        }
        // After a fault only wait for the row to be closed.
        let next = if fault.is_some() {
            cmd_rx.recv().map_err(|_| xch::RecvTimeoutError::Disconnected)
        } else {
            cmd_rx.recv_timeout(interval)
        };
        match next {
            Ok(Command::Stop) => break,
            Ok(Command::Start { .. }) => {
                tracing::warn!("start received while a row is open; ignored");
            }
            Err(xch::RecvTimeoutError::Timeout) => {}
            Err(xch::RecvTimeoutError::Disconnected) => return None,
        }
    }
    Some(match fault {
        Some(e) => Err(e),
        None => Ok(buf),
    })
}

impl Drop for ContinuousSampler {
    fn drop(&mut self) {
        // Dropping the sender ends the worker's recv loop.
        self.cmd_tx.take();
        if let Some(handle) = self.join_handle.take() {
            if self.poisoned {
                tracing::warn!("Sampler thread stalled; detaching instead of joining");
                return;
            }
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("Sampler thread joined successfully");
                }
                Err(e) => {
                    // Thread panicked; log but don't propagate (we're in Drop)
                    tracing::warn!(?e, "Sampler thread panicked during shutdown");
                }
            }
        }
    }
}

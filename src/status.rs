//! Power-state model
//!
//! Tracks the last observed power status of the display, echoes it to the
//! output sink and persists the resolved on/off value to the status file.
use crate::output::Output;
use cec_linux::CecPowerStatus;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Power status of a CEC device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerStatus {
    On,
    Standby,
    /// In transition from standby to on
    TransitioningToOn,
    /// In transition from on to standby
    TransitioningToStandby,
    Unknown,
}

impl PowerStatus {
    /// Resolve to on (`Some(true)`) or off (`Some(false)`), if unambiguous
    pub fn resolved(self) -> Option<bool> {
        match self {
            PowerStatus::On | PowerStatus::TransitioningToOn => Some(true),
            PowerStatus::Standby | PowerStatus::TransitioningToStandby => Some(false),
            PowerStatus::Unknown => None,
        }
    }
}

/// Decode the power status operand of a `ReportPowerStatus` frame
impl From<u8> for PowerStatus {
    fn from(operand: u8) -> Self {
        match CecPowerStatus::try_from(operand) {
            Ok(status) => status.into(),
            Err(_) => PowerStatus::Unknown,
        }
    }
}

impl From<CecPowerStatus> for PowerStatus {
    fn from(status: CecPowerStatus) -> Self {
        match status {
            CecPowerStatus::On => PowerStatus::On,
            CecPowerStatus::Standby => PowerStatus::Standby,
            CecPowerStatus::InTransitionStandbyToOn => PowerStatus::TransitioningToOn,
            CecPowerStatus::InTransitionOnToStandby => PowerStatus::TransitioningToStandby,
        }
    }
}

/// Format the console line for a resolved status
pub fn status_line(on: bool) -> &'static str {
    if on { "Status: on" } else { "Status: off" }
}

/// Shared power-state model
///
/// Cheap to clone; all clones observe into the same state. `observe` may be
/// called from the command loop and from the adapter's receiver thread.
#[derive(Clone)]
pub struct StatusMonitor {
    inner: Arc<Mutex<PowerStatus>>,
    output: Output,
    status_path: Option<PathBuf>,
}

impl StatusMonitor {
    pub fn new(output: Output, status_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PowerStatus::Unknown)),
            output,
            status_path,
        }
    }

    /// Last observed status
    pub fn current(&self) -> PowerStatus {
        match self.inner.lock() {
            Ok(status) => *status,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Record a newly observed status
    ///
    /// Resolvable statuses print a `Status: on|off` line and overwrite the
    /// status file with `1\n` or `0\n`. `Unknown` leaves the file untouched
    /// so it keeps the last known value.
    pub fn observe(&self, status: PowerStatus) {
        let mut current = match self.inner.lock() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = status;

        let Some(on) = status.resolved() else {
            tracing::debug!("Ignoring unresolvable power status {:?}", status);
            return;
        };

        self.output.line(status_line(on));

        if let Some(path) = &self.status_path {
            let contents = if on { "1\n" } else { "0\n" };
            if let Err(e) = fs::write(path, contents) {
                tracing::error!("Failed to write status file {}: {}", path.display(), e);
            }
        }
    }
}

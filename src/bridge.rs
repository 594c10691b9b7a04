//! Callbacks invoked by the CEC adapter driver
//!
//! Runs on the driver's receiver thread, never on the command loop.
use crate::backend::{CecCallbacks, LogLevel};
use crate::frame::CecFrame;
use crate::status::{PowerStatus, StatusMonitor};
use cec_linux::{CecLogicalAddress, CecOpcode};

pub struct CallbackBridge {
    /// Only frames sent by this device update the status
    device: CecLogicalAddress,
    status: StatusMonitor,
}

impl CallbackBridge {
    pub fn new(device: CecLogicalAddress, status: StatusMonitor) -> Self {
        Self { device, status }
    }

    /// Power status implied by a frame from the watched device, if any
    fn status_for(&self, frame: &CecFrame) -> Option<PowerStatus> {
        if frame.initiator != self.device {
            return None;
        }
        match frame.opcode? {
            CecOpcode::RequestActiveSource => Some(PowerStatus::On),
            CecOpcode::Standby => Some(PowerStatus::Standby),
            CecOpcode::ReportPowerStatus => Some(
                frame
                    .parameters
                    .first()
                    .map_or(PowerStatus::Unknown, |&operand| PowerStatus::from(operand)),
            ),
            _ => None,
        }
    }
}

impl CecCallbacks for CallbackBridge {
    fn on_log(&self, level: LogLevel, timestamp: u64, message: &str) {
        match level {
            LogLevel::Error => tracing::error!(target: "cec", ts = timestamp, "{}", message),
            LogLevel::Warning => tracing::warn!(target: "cec", ts = timestamp, "{}", message),
            LogLevel::Notice => tracing::info!(target: "cec", ts = timestamp, "{}", message),
            LogLevel::Traffic | LogLevel::Debug => {
                tracing::debug!(target: "cec", ts = timestamp, "{}", message)
            }
        }
    }

    fn on_command(&self, raw: &str) {
        tracing::debug!("Command received: {}", raw);
        let frame = match raw.parse::<CecFrame>() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("Ignoring inbound frame: {}", e);
                return;
            }
        };
        if let Some(status) = self.status_for(&frame) {
            self.status.observe(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Captured;
    use std::fs;

    fn bridge() -> (CallbackBridge, Captured, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let captured = Captured::default();
        let status = StatusMonitor::new(captured.output(), Some(dir.path().join("status")));
        (CallbackBridge::new(CecLogicalAddress::Tv, status), captured, dir)
    }

    fn status_file(dir: &tempfile::TempDir) -> Option<String> {
        fs::read_to_string(dir.path().join("status")).ok()
    }

    #[test]
    fn request_active_source_means_on() {
        let (bridge, captured, dir) = bridge();
        bridge.on_command("0f:85");
        assert_eq!(status_file(&dir).as_deref(), Some("1\n"));
        assert_eq!(captured.lines(), vec!["Status: on"]);
    }

    #[test]
    fn standby_means_off() {
        let (bridge, captured, dir) = bridge();
        bridge.on_command("0f:36");
        assert_eq!(status_file(&dir).as_deref(), Some("0\n"));
        assert_eq!(captured.lines(), vec!["Status: off"]);
    }

    #[test]
    fn report_power_status_uses_operand() {
        let (bridge, _captured, dir) = bridge();
        bridge.on_command("0f:90:00");
        assert_eq!(status_file(&dir).as_deref(), Some("1\n"));
        bridge.on_command("0f:90:03");
        assert_eq!(status_file(&dir).as_deref(), Some("0\n"));
        bridge.on_command("0f:90:02");
        assert_eq!(status_file(&dir).as_deref(), Some("1\n"));
    }

    #[test]
    fn report_power_status_without_operand_is_unknown() {
        let (bridge, captured, dir) = bridge();
        bridge.on_command("0f:90");
        assert!(status_file(&dir).is_none());
        assert!(captured.lines().is_empty());
    }

    #[test]
    fn frames_from_other_initiators_are_ignored() {
        let (bridge, captured, dir) = bridge();
        bridge.on_command("4f:36");
        bridge.on_command("f0:90:00");
        assert!(status_file(&dir).is_none());
        assert!(captured.lines().is_empty());
    }

    #[test]
    fn other_opcodes_are_ignored() {
        let (bridge, captured, dir) = bridge();
        bridge.on_command("0f:82:00:00");
        bridge.on_command("00");
        assert!(status_file(&dir).is_none());
        assert!(captured.lines().is_empty());
    }

    #[test]
    fn malformed_frames_are_ignored() {
        let (bridge, captured, _dir) = bridge();
        bridge.on_command("0f:fe");
        bridge.on_command("garbage");
        assert!(captured.lines().is_empty());
    }

    #[test]
    fn log_events_never_touch_status() {
        let (bridge, captured, dir) = bridge();
        for level in [
            LogLevel::Error,
            LogLevel::Warning,
            LogLevel::Notice,
            LogLevel::Traffic,
            LogLevel::Debug,
        ] {
            bridge.on_log(level, 42, ">> 0f:36");
        }
        assert!(status_file(&dir).is_none());
        assert!(captured.lines().is_empty());
    }
}

//! Input command parsing and dispatch
use crate::backend::CecAdapter;
use crate::daemon::RunState;
use crate::output::{COMMAND_SENT, HELP_LINE, Output, SEND_FAILED};
use crate::session::AdapterSession;
use crate::status::{PowerStatus, StatusMonitor};
use cec_linux::CecOpcode;

/// One line of the command protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    PowerOn,
    PowerOff,
    Status,
    /// Raw frame text following `tx `
    Transmit(String),
    Unrecognized,
}

impl Command {
    /// Parse one input line; case and surrounding whitespace are ignored
    pub fn parse(line: &str) -> Self {
        let line = line.trim().to_lowercase();
        match line.as_str() {
            "q" | "quit" => Command::Quit,
            "help" => Command::Help,
            "on" => Command::PowerOn,
            "off" => Command::PowerOff,
            "status" => Command::Status,
            _ if line.starts_with("tx") => {
                // everything after the "tx " prefix
                let payload = line
                    .char_indices()
                    .nth(3)
                    .map(|(i, _)| &line[i..])
                    .unwrap_or("");
                Command::Transmit(payload.to_string())
            }
            _ => Command::Unrecognized,
        }
    }
}

/// Executes parsed commands against the adapter session
pub struct Dispatcher<'a, A: CecAdapter> {
    session: &'a AdapterSession<A>,
    status: StatusMonitor,
    output: Output,
}

impl<'a, A: CecAdapter> Dispatcher<'a, A> {
    pub fn new(session: &'a AdapterSession<A>, status: StatusMonitor, output: Output) -> Self {
        Self {
            session,
            status,
            output,
        }
    }

    pub fn help(&self) {
        self.output.line(HELP_LINE);
    }

    /// Ask the display for its power status; the answer arrives via the callbacks
    pub fn request_status(&self) {
        self.send(CecOpcode::GiveDevicePowerStatus);
    }

    /// Parse and execute one input line
    pub fn dispatch(&self, line: &str, state: &RunState) {
        let command = Command::parse(line);
        tracing::debug!("Dispatching {:?}", command);

        match command {
            Command::Quit => state.stop(),
            Command::Help => self.help(),
            Command::PowerOn => {
                self.status.observe(PowerStatus::TransitioningToOn);
                self.send(CecOpcode::ImageViewOn);
            }
            Command::PowerOff => {
                self.status.observe(PowerStatus::TransitioningToStandby);
                self.send(CecOpcode::Standby);
            }
            Command::Status => self.request_status(),
            Command::Transmit(payload) => {
                if self.session.transmit_raw(&payload) {
                    self.output.line(COMMAND_SENT);
                } else {
                    self.output.line(SEND_FAILED);
                }
            }
            Command::Unrecognized => {}
        }
    }

    fn send(&self, opcode: CecOpcode) {
        if !self.session.transmit(opcode) {
            self.output.line(SEND_FAILED);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockAdapter;
    use crate::bridge::CallbackBridge;
    use crate::output::Captured;
    use cec_linux::CecLogicalAddress;
    use std::sync::Arc;

    struct Fixture {
        mock: MockAdapter,
        captured: Captured,
        status: StatusMonitor,
        session: AdapterSession<MockAdapter>,
        state: RunState,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let captured = Captured::default();
            let status = StatusMonitor::new(captured.output(), Some(dir.path().join("status")));
            let mock = MockAdapter::with_ports(&["/dev/cec0"]);
            let bridge = CallbackBridge::new(CecLogicalAddress::Tv, status.clone());
            let session = AdapterSession::new(mock.clone(), CecLogicalAddress::Tv, Arc::new(bridge));
            Self {
                mock,
                captured,
                status,
                session,
                state: RunState::new().unwrap(),
                _dir: dir,
            }
        }

        fn dispatch(&self, line: &str) {
            let dispatcher =
                Dispatcher::new(&self.session, self.status.clone(), self.captured.output());
            dispatcher.dispatch(line, &self.state);
        }

        fn opcodes(&self) -> Vec<CecOpcode> {
            self.mock
                .transmitted()
                .iter()
                .filter_map(|f| f.opcode)
                .collect()
        }
    }

    #[test]
    fn parse_is_case_and_whitespace_insensitive() {
        for line in [" ON \n", "on", "On", "\toN"] {
            assert_eq!(Command::parse(line), Command::PowerOn, "{line:?}");
        }
        assert_eq!(Command::parse("QUIT\r\n"), Command::Quit);
        assert_eq!(Command::parse(" q "), Command::Quit);
        assert_eq!(Command::parse("Status"), Command::Status);
        assert_eq!(Command::parse("OFF"), Command::PowerOff);
        assert_eq!(Command::parse("help"), Command::Help);
    }

    #[test]
    fn parse_tx_forwards_text_after_prefix() {
        assert_eq!(
            Command::parse("tx 04:36"),
            Command::Transmit("04:36".to_string())
        );
        assert_eq!(
            Command::parse("TX 10:04\n"),
            Command::Transmit("10:04".to_string())
        );
        assert_eq!(Command::parse("tx"), Command::Transmit(String::new()));
    }

    #[test]
    fn parse_unrecognized() {
        for line in ["", "   ", "power", "onn", "quit now", "t x"] {
            assert_eq!(Command::parse(line), Command::Unrecognized, "{line:?}");
        }
    }

    #[test]
    fn exact_matches_take_priority_over_tx_prefix() {
        assert_eq!(Command::parse("q"), Command::Quit);
        assert_eq!(Command::parse("txt"), Command::Transmit(String::new()));
    }

    #[test]
    fn on_observes_transition_then_sends_image_view_on() {
        let fixture = Fixture::new();
        fixture.dispatch("on");
        assert_eq!(fixture.opcodes(), vec![CecOpcode::ImageViewOn]);
        assert_eq!(fixture.status.current(), PowerStatus::TransitioningToOn);
        assert_eq!(fixture.captured.lines(), vec!["Status: on"]);
    }

    #[test]
    fn off_observes_transition_then_sends_standby() {
        let fixture = Fixture::new();
        fixture.dispatch(" OFF ");
        assert_eq!(fixture.opcodes(), vec![CecOpcode::Standby]);
        assert_eq!(fixture.status.current(), PowerStatus::TransitioningToStandby);
        assert_eq!(fixture.captured.lines(), vec!["Status: off"]);
    }

    #[test]
    fn status_requests_power_status_without_writing() {
        let fixture = Fixture::new();
        fixture.dispatch("status");
        assert_eq!(fixture.opcodes(), vec![CecOpcode::GiveDevicePowerStatus]);
        assert_eq!(fixture.status.current(), PowerStatus::Unknown);
        assert!(fixture.captured.lines().is_empty());
    }

    #[test]
    fn status_reply_arrives_through_callback() {
        let fixture = Fixture::new();
        fixture.dispatch("status");
        fixture.mock.inject("0f:90:01");
        assert_eq!(fixture.status.current(), PowerStatus::Standby);
        assert_eq!(fixture.captured.lines(), vec!["Status: off"]);
    }

    #[test]
    fn quit_stops_without_transmitting() {
        let fixture = Fixture::new();
        fixture.dispatch("quit");
        assert!(!fixture.state.is_running());
        assert!(fixture.mock.transmitted().is_empty());
    }

    #[test]
    fn help_prints_banner_without_transmitting() {
        let fixture = Fixture::new();
        fixture.dispatch("help");
        assert_eq!(fixture.captured.lines(), vec![HELP_LINE]);
        assert!(fixture.mock.transmitted().is_empty());
    }

    #[test]
    fn tx_reports_command_sent() {
        let fixture = Fixture::new();
        fixture.dispatch("tx 04:36");
        let sent = fixture.mock.transmitted();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_string(), "04:36");
        assert_eq!(fixture.captured.lines(), vec![COMMAND_SENT]);
    }

    #[test]
    fn tx_with_bad_payload_reports_failure() {
        let fixture = Fixture::new();
        fixture.dispatch("tx zz");
        assert!(fixture.mock.transmitted().is_empty());
        assert_eq!(fixture.captured.lines(), vec![SEND_FAILED]);
    }

    #[test]
    fn transmit_failure_is_reported_and_loop_keeps_running() {
        let fixture = Fixture::new();
        fixture.mock.state.lock().unwrap().fail_transmit = true;
        fixture.dispatch("status");
        fixture.dispatch("tx 04:36");
        assert_eq!(fixture.captured.lines(), vec![SEND_FAILED, SEND_FAILED]);
        assert!(fixture.state.is_running());
    }

    #[test]
    fn unrecognized_lines_do_nothing() {
        let fixture = Fixture::new();
        fixture.dispatch("reboot");
        assert!(fixture.mock.transmitted().is_empty());
        assert!(fixture.captured.lines().is_empty());
        assert!(fixture.state.is_running());
    }
}

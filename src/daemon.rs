/// Daemon lifecycle management
///
/// This module owns the process-level concerns of cecd:
/// - SIGTERM/SIGINT: stop the input loop and unblock a pending read
/// - PID file: written at startup, removed on every exit path
/// - Input loop: read, dispatch, and re-open FIFO input after each writer leaves
use crate::backend::CecAdapter;
use crate::bridge::CallbackBridge;
use crate::command::Dispatcher;
use crate::config::DaemonConfig;
use crate::error::Error;
use crate::input::{InputSource, LineReader, ReadOutcome, is_fifo};
use crate::linux::LinuxCecAdapter;
use crate::logging;
use crate::output::{NO_ADAPTERS, OPEN_FAILED, Output};
use crate::session::AdapterSession;
use crate::status::StatusMonitor;
use nix::unistd::Pid;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use std::fs;
use std::io::{self, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Loop/shutdown flags shared between the input loop and the signal thread
pub struct RunState {
    running: AtomicBool,
    awaiting_input: AtomicBool,
    wake_tx: UnixStream,
    wake_rx: UnixStream,
}

impl RunState {
    pub fn new() -> io::Result<Self> {
        let (wake_tx, wake_rx) = UnixStream::pair()?;
        wake_tx.set_nonblocking(true)?;
        Ok(Self {
            running: AtomicBool::new(true),
            awaiting_input: AtomicBool::new(false),
            wake_tx,
            wake_rx,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop after the current line (the `quit` command)
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Stop, and wake the input loop if it is blocked waiting for a line
    pub fn shutdown(&self) {
        self.stop();
        if self.awaiting_input.swap(false, Ordering::SeqCst) {
            // a full socket buffer already means a pending wake-up
            let _ = (&self.wake_tx).write(&[1]);
        }
    }

    /// Mark the loop as blocked on input; false if shutdown already happened
    fn begin_read(&self) -> bool {
        self.awaiting_input.store(true, Ordering::SeqCst);
        if !self.is_running() {
            self.awaiting_input.store(false, Ordering::SeqCst);
            return false;
        }
        true
    }

    fn end_read(&self) {
        self.awaiting_input.store(false, Ordering::SeqCst);
    }

    fn cancel_fd(&self) -> BorrowedFd<'_> {
        self.wake_rx.as_fd()
    }
}

/// Background thread turning SIGINT/SIGTERM into [`RunState::shutdown`]
///
/// Dropping it unregisters the handlers and joins the thread.
pub struct SignalWatcher {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

/// Install signal handlers for SIGTERM and SIGINT
///
/// # Returns
/// - `Ok(SignalWatcher)` - Signal handlers installed successfully
/// - `Err(Error)` - Failed to install signal handlers
pub fn install_signal_handlers(state: Arc<RunState>) -> Result<SignalWatcher, Error> {
    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|e| Error::SignalError(format!("Failed to install signal handlers: {}", e)))?;
    let handle = signals.handle();

    let thread = thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                tracing::debug!("Received signal {}", signal);
                state.shutdown();
            }
        })
        .map_err(|e| Error::SignalError(format!("Failed to start signal thread: {}", e)))?;

    Ok(SignalWatcher {
        handle,
        thread: Some(thread),
    })
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Write PID to PID file
///
/// # Parameters
/// - `path`: Path to PID file
/// - `pid`: PID to write
///
/// # Returns
/// - `Ok(())` - PID was written successfully
/// - `Err(Error)` - Failed to write PID file
fn write_pid_file<P: AsRef<Path>>(path: P, pid: Pid) -> Result<(), Error> {
    let path = path.as_ref();

    let mut file = fs::File::create(path)
        .map_err(|e| Error::PidFileError(format!("Failed to create PID file: {}", e)))?;

    write!(file, "{}", pid)
        .map_err(|e| Error::PidFileError(format!("Failed to write PID: {}", e)))?;

    Ok(())
}

/// Remove PID file
///
/// # Returns
/// - `Ok(())` - PID file was removed or didn't exist
/// - `Err(Error)` - Failed to remove PID file
fn remove_pid_file<P: AsRef<Path>>(path: P) -> Result<(), Error> {
    match fs::remove_file(path.as_ref()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::PidFileError(format!(
            "Failed to remove PID file: {}",
            e
        ))),
    }
}

/// PID file that is removed when dropped
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn create(path: &Path) -> Result<Self, Error> {
        write_pid_file(path, Pid::this())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = remove_pid_file(&self.path) {
            tracing::error!("{}", e);
        }
    }
}

/// Fail at startup when the status file could never be written
fn check_status_path(path: &Path) -> Result<(), Error> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Status file directory {} does not exist", parent.display()),
            )))
        }
        _ => Ok(()),
    }
}

/// Input loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    PrintingHelp,
    AwaitingLine,
    Dispatching,
    Stopped,
}

/// Reads commands until quit, shutdown or end of input
///
/// A FIFO input is re-opened after every end-of-file, since each writer
/// disconnecting ends the stream but a new writer may connect later. Any
/// other input is read exactly once.
pub struct InputLoop<'a, A: CecAdapter> {
    dispatcher: Dispatcher<'a, A>,
    state: &'a RunState,
    input_path: Option<&'a Path>,
    loop_state: LoopState,
}

impl<'a, A: CecAdapter> InputLoop<'a, A> {
    pub fn new(dispatcher: Dispatcher<'a, A>, state: &'a RunState, input_path: Option<&'a Path>) -> Self {
        Self {
            dispatcher,
            state,
            input_path,
            loop_state: LoopState::Idle,
        }
    }

    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    fn transition(&mut self, next: LoopState) {
        tracing::trace!("Input loop {:?} -> {:?}", self.loop_state, next);
        self.loop_state = next;
    }

    pub fn run(&mut self) -> Result<(), Error> {
        self.transition(LoopState::PrintingHelp);
        self.dispatcher.help();

        let repeat_sessions = self.input_path.is_some_and(is_fifo);
        while self.state.is_running() {
            let result = self.session();
            if result.is_err() || !repeat_sessions {
                self.state.stop();
            }
            if let Err(e) = result {
                self.transition(LoopState::Stopped);
                return Err(e);
            }
        }

        self.transition(LoopState::Stopped);
        Ok(())
    }

    /// Open the input once and read it until it is exhausted or the loop stops
    fn session(&mut self) -> Result<(), Error> {
        let mut reader = LineReader::new(InputSource::open(self.input_path)?);

        loop {
            if !self.state.begin_read() {
                return Ok(());
            }
            self.transition(LoopState::AwaitingLine);
            let outcome = reader.read_line(self.state.cancel_fd());
            self.state.end_read();

            match outcome? {
                ReadOutcome::Line(line) => {
                    self.transition(LoopState::Dispatching);
                    self.dispatcher.dispatch(&line, self.state);
                    if !self.state.is_running() {
                        return Ok(());
                    }
                }
                ReadOutcome::Eof => {
                    tracing::debug!("End of input");
                    return Ok(());
                }
                ReadOutcome::Cancelled => {
                    tracing::info!("Caught shutdown request, shutting down now");
                    return Ok(());
                }
            }
        }
    }
}

/// Run the daemon against `adapter` until the input loop stops
///
/// The adapter is closed exactly once on the way out. Missing or unopenable
/// adapters are reported on the output sink and are not errors.
pub fn run_with_adapter<A: CecAdapter>(
    adapter: A,
    config: &DaemonConfig,
    output: Output,
    state: &RunState,
) -> Result<(), Error> {
    let status = StatusMonitor::new(output.clone(), config.status_path.clone());
    let bridge = CallbackBridge::new(config.device, status.clone());
    let mut session = AdapterSession::new(adapter, config.device, Arc::new(bridge));

    let port = match &config.adapter {
        Some(path) => Some(path.display().to_string()),
        None => session.detect_adapter(),
    };
    let Some(port) = port else {
        output.line(NO_ADAPTERS);
        return Ok(());
    };

    if let Err(e) = session.open(&port) {
        tracing::error!("{}", e);
        output.line(OPEN_FAILED);
        return Ok(());
    }

    let dispatcher = Dispatcher::new(&session, status.clone(), output);
    // refresh the status file before taking commands
    dispatcher.request_status();

    let mut input_loop = InputLoop::new(dispatcher, state, config.input_path.as_deref());
    let result = input_loop.run();
    tracing::debug!(
        "Input loop {:?}, last power status {:?}",
        input_loop.loop_state(),
        status.current()
    );
    result
}

/// Daemon entry point
///
/// Sets up the sinks, logging, signal handlers and PID file, then runs the
/// daemon on the Linux CEC adapter. Everything set up here is released on
/// return, whether the run succeeded or not.
pub fn run(config: &DaemonConfig) -> Result<(), Error> {
    let output = Output::open(config.output_path.as_deref())?;
    logging::init(config.error_path.as_deref(), &config.log_level)?;
    if let Some(path) = &config.status_path {
        check_status_path(path)?;
    }

    let state = Arc::new(RunState::new()?);
    let _signals = install_signal_handlers(Arc::clone(&state))?;
    let _pid_file = config.pid_path.as_deref().map(PidFile::create).transpose()?;

    let adapter = LinuxCecAdapter::new(&config.dev_dir, &config.osd_name, config.monitor_only);
    run_with_adapter(adapter, config, output, &state)
}

#![allow(clippy::enum_variant_names)]
/// Exit codes for cecd
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Daemon ran and shut down normally
    Success = 0,
    /// Startup or runtime error occurred
    Error = 1,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

/// Error types for cecd
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to open a connection to the CEC adapter '{port}': {reason}")]
    AdapterOpenFailed { port: String, reason: String },

    #[error("CEC adapter is not open")]
    AdapterNotOpen,

    #[error("Failed to send command: {0}")]
    TransmitFailed(String),

    #[error("Invalid CEC command '{input}': {reason}")]
    InvalidFrame { input: String, reason: String },

    #[error("Invalid logical address '{0}'")]
    InvalidAddress(String),

    #[error("Signal operation failed: {0}")]
    SignalError(String),

    #[error("PID file operation failed: {0}")]
    PidFileError(String),

    #[error("Logging setup failed: {0}")]
    LoggingError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        // usage errors exit with 2 from clap itself
        ExitCode::Error
    }
}

/// CecAdapter trait for the CEC adapter driver
///
/// This trait is the boundary to the component that owns the CEC bus:
/// adapter discovery, opening a logical connection, transmitting frames and
/// delivering inbound traffic and driver log events asynchronously.
///
/// Implementations:
/// - Linux backend: Uses the kernel CEC framework (`/dev/cecN`) via `cec_linux`
use crate::error::Error;
use crate::frame::CecFrame;
use cec_linux::CecLogicalAddress;
use std::sync::Arc;

/// Severity of a driver log event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Notice,
    /// Frames seen on or sent to the bus
    Traffic,
    Debug,
}

/// An adapter found during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Port identifier passed to [`CecAdapter::open`]
    pub port: String,
}

/// Hooks the driver invokes from its own thread
///
/// Implementations must be safe to call concurrently with the command loop.
pub trait CecCallbacks: Send + Sync {
    /// A driver log event; `timestamp` is milliseconds since the adapter was opened
    fn on_log(&self, level: LogLevel, timestamp: u64, message: &str);

    /// An inbound frame in its textual form (see [`CecFrame`])
    fn on_command(&self, raw: &str);
}

/// CecAdapter interface for a CEC adapter driver
pub trait CecAdapter {
    /// Library/driver description, logged after creation
    fn lib_info(&self) -> String;

    /// Enumerate available adapters
    fn detect_adapters(&self) -> Vec<AdapterInfo>;

    /// Register the callbacks delivered once the adapter is open
    fn set_callbacks(&mut self, callbacks: Arc<dyn CecCallbacks>);

    /// Open the logical connection to the adapter at `port`
    ///
    /// # Returns
    /// - `Ok(())` if the connection is ready for transmitting
    /// - `Err(Error::AdapterOpenFailed)` otherwise
    fn open(&mut self, port: &str) -> Result<(), Error>;

    /// Logical address this adapter transmits from
    fn logical_address(&self) -> CecLogicalAddress;

    /// Transmit one frame, blocking until the driver reports the result
    fn transmit(&self, frame: &CecFrame) -> Result<(), Error>;

    /// Release the connection; calling it again is a no-op
    fn close(&mut self);
}

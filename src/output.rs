//! Line-oriented output sink shared by the command loop and the CEC callbacks
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Help banner listing the accepted commands
pub const HELP_LINE: &str = "Enter command: q[uit], help, on, off, status, tx <data>";
pub const NO_ADAPTERS: &str = "No adapters found";
pub const OPEN_FAILED: &str = "Failed to open a connection to the CEC adapter";
pub const COMMAND_SENT: &str = "Command sent";
pub const SEND_FAILED: &str = "Failed to send command";

/// Cloneable handle on the output sink
///
/// Every line is written and flushed while holding the lock, so lines from
/// the callback thread never interleave with lines from the main loop.
#[derive(Clone)]
pub struct Output {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Output {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Standard output, or a freshly truncated file when `path` is given
    pub fn open(path: Option<&Path>) -> io::Result<Self> {
        match path {
            Some(path) => Ok(Self::new(File::create(path)?)),
            None => Ok(Self::new(io::stdout())),
        }
    }

    /// Write one line and flush it
    ///
    /// Write errors are logged rather than returned; a broken output sink
    /// must not stop the daemon from driving the adapter.
    pub fn line(&self, text: &str) {
        let mut sink = match self.sink.lock() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(sink, "{}", text).and_then(|_| sink.flush()) {
            tracing::warn!("Failed to write output line: {}", e);
        }
    }
}

/// In-memory writer for tests
#[cfg(test)]
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl Captured {
    pub fn output(&self) -> Output {
        Output::new(self.clone())
    }

    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

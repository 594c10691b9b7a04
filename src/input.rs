//! Command input source
//!
//! Reads newline-terminated commands from stdin, a regular file or a FIFO.
//! Every blocking wait goes through `poll(2)` together with a cancellation
//! descriptor, so a shutdown request can unblock a pending read.
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::Path;

const READ_CHUNK: usize = 4096;

/// Whether `path` names a FIFO
pub fn is_fifo(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.file_type().is_fifo())
        .unwrap_or(false)
}

/// An opened input source
pub enum InputSource {
    Stdin(io::Stdin),
    File(File),
}

impl InputSource {
    /// Open the configured input, or stdin when no path is given
    ///
    /// FIFOs are opened non-blocking: waiting for a writer then happens in
    /// `poll`, where it can be cancelled, instead of inside `open`.
    pub fn open(path: Option<&Path>) -> io::Result<Self> {
        let Some(path) = path else {
            return Ok(InputSource::Stdin(io::stdin()));
        };

        let mut options = OpenOptions::new();
        options.read(true);
        if is_fifo(path) {
            options.custom_flags(OFlag::O_NONBLOCK.bits());
        }
        Ok(InputSource::File(options.open(path)?))
    }
}

impl AsFd for InputSource {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            InputSource::Stdin(stdin) => stdin.as_fd(),
            InputSource::File(file) => file.as_fd(),
        }
    }
}

/// Result of waiting for the next line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line, including its terminator if one was read
    Line(String),
    /// The source is exhausted (last writer of a FIFO disconnected)
    Eof,
    /// The cancellation descriptor became readable first
    Cancelled,
}

/// Line reader over an [`InputSource`]
///
/// Buffers raw reads itself instead of using `BufRead`, so that no data is
/// hidden from `poll` in a userspace buffer.
pub struct LineReader {
    source: InputSource,
    pending: Vec<u8>,
    eof: bool,
}

impl LineReader {
    pub fn new(source: InputSource) -> Self {
        Self {
            source,
            pending: Vec::new(),
            eof: false,
        }
    }

    /// Wait for the next line or for `cancel` to become readable
    ///
    /// Input that is already available wins over cancellation.
    pub fn read_line(&mut self, cancel: BorrowedFd<'_>) -> io::Result<ReadOutcome> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=pos).collect();
                return Ok(ReadOutcome::Line(String::from_utf8_lossy(&line).into_owned()));
            }
            if self.eof {
                if self.pending.is_empty() {
                    return Ok(ReadOutcome::Eof);
                }
                let line = std::mem::take(&mut self.pending);
                return Ok(ReadOutcome::Line(String::from_utf8_lossy(&line).into_owned()));
            }

            let (input_ready, cancelled) = {
                let mut fds = [
                    PollFd::new(self.source.as_fd(), PollFlags::POLLIN),
                    PollFd::new(cancel, PollFlags::POLLIN),
                ];
                match poll(&mut fds, PollTimeout::NONE) {
                    Ok(_) => {}
                    Err(Errno::EINTR) => continue,
                    Err(e) => return Err(e.into()),
                }
                let ready = |fd: &PollFd| fd.revents().is_some_and(|r| !r.is_empty());
                (ready(&fds[0]), ready(&fds[1]))
            };

            if !input_ready {
                if cancelled {
                    return Ok(ReadOutcome::Cancelled);
                }
                continue;
            }

            match nix::unistd::read(self.source.as_fd().as_raw_fd(), &mut chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(Errno::EAGAIN) | Err(Errno::EINTR) => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}

//! Adapter session
//!
//! Owns the CEC adapter for the daemon's lifetime and guarantees it is closed
//! exactly once, on every exit path, when the session is dropped.
use crate::backend::{CecAdapter, CecCallbacks};
use crate::error::Error;
use crate::frame::CecFrame;
use cec_linux::{CecLogicalAddress, CecOpcode};
use std::sync::Arc;

pub struct AdapterSession<A: CecAdapter> {
    adapter: A,
    /// Display the session talks to
    device: CecLogicalAddress,
    closed: bool,
}

impl<A: CecAdapter> AdapterSession<A> {
    /// Configure the adapter and register the callback hooks
    pub fn new(mut adapter: A, device: CecLogicalAddress, callbacks: Arc<dyn CecCallbacks>) -> Self {
        adapter.set_callbacks(callbacks);
        tracing::debug!("CEC adapter driver loaded: {}", adapter.lib_info());
        Self {
            adapter,
            device,
            closed: false,
        }
    }

    /// Pick the adapter to open
    ///
    /// Every enumerated adapter is logged; the last one wins.
    pub fn detect_adapter(&self) -> Option<String> {
        let mut selected = None;
        for adapter in self.adapter.detect_adapters() {
            tracing::debug!("Found a CEC adapter on port: {}", adapter.port);
            selected = Some(adapter.port);
        }
        selected
    }

    pub fn open(&mut self, port: &str) -> Result<(), Error> {
        self.adapter.open(port)
    }

    /// Transmit `opcode` from this adapter to the configured device
    pub fn transmit(&self, opcode: CecOpcode) -> bool {
        let frame = CecFrame::new(self.adapter.logical_address(), self.device, opcode);
        self.send(&frame)
    }

    /// Parse a textual frame (`10:04`) and transmit it as given
    pub fn transmit_raw(&self, text: &str) -> bool {
        match text.parse::<CecFrame>() {
            Ok(frame) => self.send(&frame),
            Err(e) => {
                tracing::warn!("{}", e);
                false
            }
        }
    }

    fn send(&self, frame: &CecFrame) -> bool {
        match self.adapter.transmit(frame) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Transmit of {} failed: {}", frame, e);
                false
            }
        }
    }

    /// Release the adapter; later calls are no-ops
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.adapter.close();
        }
    }
}

impl<A: CecAdapter> Drop for AdapterSession<A> {
    fn drop(&mut self) {
        self.close();
    }
}

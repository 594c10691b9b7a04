/// Linux CEC backend
///
/// Drives a `/dev/cecN` node of the kernel CEC framework. Two file handles
/// are opened per adapter: one for transmitting and one that receives bus
/// traffic on a background thread and hands it to the registered callbacks.
use crate::backend::{AdapterInfo, CecAdapter, CecCallbacks, LogLevel};
use crate::error::Error;
use crate::frame::{CecFrame, hex_string};
use cec_linux::{
    CecDevice, CecLogAddrType, CecLogAddrs, CecLogicalAddress, CecModeFollower,
    CecModeInitiator, CecMsg, CecPrimDevType, VendorID, Version,
};
use nix::errno::Errno;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Receive timeout so the receiver thread notices `close` promptly
const RECEIVE_TIMEOUT_MS: u32 = 200;

/// Discover CEC adapter nodes
///
/// Scans `dir` for `cecN` device nodes and returns them sorted by adapter
/// number.
fn discover_cec_devices(dir: &Path) -> Vec<PathBuf> {
    let mut devices: Vec<(u32, PathBuf)> = Vec::new();

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if let Some(number) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("cec"))
                .and_then(|n| n.parse::<u32>().ok())
            {
                devices.push((number, path));
            }
        }
    }

    devices.sort_by_key(|(number, _)| *number);
    devices.into_iter().map(|(_, path)| path).collect()
}

/// Emits driver log events with a timestamp relative to open
#[derive(Clone)]
struct DriverLog {
    callbacks: Option<Arc<dyn CecCallbacks>>,
    opened: Instant,
}

impl DriverLog {
    fn emit(&self, level: LogLevel, message: &str) {
        if let Some(callbacks) = &self.callbacks {
            let timestamp = self.opened.elapsed().as_millis() as u64;
            callbacks.on_log(level, timestamp, message);
        }
    }
}

/// An open adapter
struct Connection {
    tx: CecDevice,
    address: CecLogicalAddress,
    log: DriverLog,
    stop: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
}

/// Linux CEC backend implementing CecAdapter trait
pub struct LinuxCecAdapter {
    dev_dir: PathBuf,
    osd_name: String,
    monitor_only: bool,
    callbacks: Option<Arc<dyn CecCallbacks>>,
    connection: Option<Connection>,
}

impl LinuxCecAdapter {
    pub fn new(dev_dir: impl Into<PathBuf>, osd_name: &str, monitor_only: bool) -> Self {
        Self {
            dev_dir: dev_dir.into(),
            osd_name: osd_name.to_string(),
            monitor_only,
            callbacks: None,
            connection: None,
        }
    }

    /// Claim a recording device logical address and return it
    fn claim_address(&self, cec: &CecDevice) -> io::Result<CecLogicalAddress> {
        // clear existing logical addresses
        cec.set_log(CecLogAddrs::default())?;

        let osd_name = self
            .osd_name
            .clone()
            .try_into()
            .map_err(|_| io::Error::other("OSD name must be ASCII"))?;
        let log = CecLogAddrs::new(
            VendorID::NONE,
            Version::V1_4,
            osd_name,
            &[CecPrimDevType::RECORD],
            &[CecLogAddrType::RECORD],
        );
        cec.set_log(log)?;

        let claimed = cec.get_log()?;
        Ok(claimed
            .addresses()
            .first()
            .copied()
            .unwrap_or(CecLogicalAddress::UnregisteredBroadcast))
    }

    /// Open the receiving handle, preferring monitor mode
    fn open_receiver(&self, port: &str, log: &DriverLog) -> io::Result<CecDevice> {
        let rx = CecDevice::open(port)?;
        if self.monitor_only {
            let (initiator, follower) = receiver_mode(true, false);
            match rx.set_mode(initiator, follower) {
                Ok(()) => return Ok(rx),
                Err(e) => log.emit(
                    LogLevel::Warning,
                    &format!("Monitor mode unavailable ({}), following instead", e),
                ),
            }
        }
        let (initiator, follower) = receiver_mode(self.monitor_only, true);
        rx.set_mode(initiator, follower)?;
        Ok(rx)
    }
}

/// Mode for the receiving handle
///
/// Monitor mode takes no initiator role but needs CAP_NET_ADMIN. Following
/// all messages is only accepted from a handle that may also send.
fn receiver_mode(
    monitor_only: bool,
    monitor_refused: bool,
) -> (CecModeInitiator, CecModeFollower) {
    if monitor_only && !monitor_refused {
        (CecModeInitiator::None, CecModeFollower::Monitor)
    } else {
        (CecModeInitiator::Send, CecModeFollower::All)
    }
}

/// Raw bytes of a received message (header, opcode, parameters)
fn msg_bytes(msg: &CecMsg) -> Vec<u8> {
    let header = (u8::from(msg.initiator()) << 4) | u8::from(msg.destination());
    let mut bytes = vec![header];
    match msg.opcode() {
        Some(Ok(opcode)) => bytes.push(opcode.into()),
        Some(Err(e)) => bytes.push(e.number),
        None => {}
    }
    bytes.extend_from_slice(msg.parameters());
    bytes
}

/// Receive frames until `stop` is set
fn receive_loop(
    rx: CecDevice,
    callbacks: Arc<dyn CecCallbacks>,
    log: DriverLog,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::SeqCst) {
        match rx.rec_for(RECEIVE_TIMEOUT_MS) {
            Ok(msg) => {
                let bytes = msg_bytes(&msg);
                if bytes.is_empty() || !msg.is_ok() {
                    log.emit(LogLevel::Debug, &format!("Dropping frame {:?}", msg));
                    continue;
                }
                let raw = hex_string(&bytes);
                log.emit(LogLevel::Traffic, &format!(">> {}", raw));
                callbacks.on_command(&raw);
            }
            Err(e)
                if e.raw_os_error() == Some(Errno::ETIMEDOUT as i32)
                    || e.raw_os_error() == Some(Errno::EINTR as i32) => {}
            Err(e) => {
                log.emit(LogLevel::Error, &format!("Receiving from adapter failed: {}", e));
                break;
            }
        }
    }
}

impl CecAdapter for LinuxCecAdapter {
    fn lib_info(&self) -> String {
        format!(
            "Linux CEC framework, adapters in {}, {}",
            self.dev_dir.display(),
            if self.monitor_only { "monitor only" } else { "recording device" }
        )
    }

    fn detect_adapters(&self) -> Vec<AdapterInfo> {
        discover_cec_devices(&self.dev_dir)
            .into_iter()
            .map(|path| AdapterInfo {
                port: path.display().to_string(),
            })
            .collect()
    }

    fn set_callbacks(&mut self, callbacks: Arc<dyn CecCallbacks>) {
        self.callbacks = Some(callbacks);
    }

    fn open(&mut self, port: &str) -> Result<(), Error> {
        self.close();

        let open_failed = |e: io::Error| Error::AdapterOpenFailed {
            port: port.to_string(),
            reason: e.to_string(),
        };
        let log = DriverLog {
            callbacks: self.callbacks.clone(),
            opened: Instant::now(),
        };

        let tx = CecDevice::open(port).map_err(open_failed)?;
        if let Ok(capas) = tx.get_capas() {
            log.emit(LogLevel::Debug, &format!("Adapter capabilities: {:?}", capas));
        }

        let address = if self.monitor_only {
            CecLogicalAddress::UnregisteredBroadcast
        } else {
            self.claim_address(&tx).map_err(open_failed)?
        };

        let rx = self.open_receiver(port, &log).map_err(open_failed)?;
        let stop = Arc::new(AtomicBool::new(false));
        let receiver = match self.callbacks.clone() {
            Some(callbacks) => {
                let (log, stop) = (log.clone(), Arc::clone(&stop));
                let handle = thread::Builder::new()
                    .name("cec-receiver".to_string())
                    .spawn(move || receive_loop(rx, callbacks, log, stop))
                    .map_err(open_failed)?;
                Some(handle)
            }
            None => None,
        };

        log.emit(
            LogLevel::Notice,
            &format!("Connection opened on {} as {:?}", port, address),
        );
        self.connection = Some(Connection {
            tx,
            address,
            log,
            stop,
            receiver,
        });
        Ok(())
    }

    fn logical_address(&self) -> CecLogicalAddress {
        self.connection
            .as_ref()
            .map(|c| c.address)
            .unwrap_or(CecLogicalAddress::UnregisteredBroadcast)
    }

    fn transmit(&self, frame: &CecFrame) -> Result<(), Error> {
        let connection = self.connection.as_ref().ok_or(Error::AdapterNotOpen)?;
        let opcode = frame
            .opcode
            .ok_or_else(|| Error::TransmitFailed("poll frames are not supported".to_string()))?;

        connection.log.emit(LogLevel::Traffic, &format!("<< {}", frame));
        connection
            .tx
            .transmit_data(frame.initiator, frame.destination, opcode, &frame.parameters)
            .map_err(|e| {
                connection
                    .log
                    .emit(LogLevel::Warning, &format!("Transmit of {} failed: {}", frame, e));
                Error::TransmitFailed(e.to_string())
            })
    }

    fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.stop.store(true, Ordering::SeqCst);
            if let Some(receiver) = connection.receiver.take() {
                let _ = receiver.join();
            }
            connection.log.emit(LogLevel::Notice, "Connection closed");
        }
    }
}

impl Drop for LinuxCecAdapter {
    fn drop(&mut self) {
        self.close();
    }
}

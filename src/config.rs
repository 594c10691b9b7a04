//! Daemon configuration
//!
//! `DaemonConfig` is populated once from the command line and treated as
//! read-only for the rest of the process lifetime.
use crate::error::Error;
use cec_linux::CecLogicalAddress;
use std::path::PathBuf;

/// OSD name announced when a logical address is claimed
pub const DEFAULT_OSD_NAME: &str = "cecd";

/// Directory scanned for `cecN` device nodes
pub const DEFAULT_DEV_DIR: &str = "/dev";

/// Default tracing filter
pub const DEFAULT_LOG_LEVEL: &str = "debug";

/// Immutable daemon configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Display whose power state is controlled and observed
    pub device: CecLogicalAddress,
    /// Run as an unregistered observer instead of claiming a recording address
    pub monitor_only: bool,
    pub osd_name: String,
    /// Explicit adapter node; skips enumeration when set
    pub adapter: Option<PathBuf>,
    pub dev_dir: PathBuf,
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub error_path: Option<PathBuf>,
    pub status_path: Option<PathBuf>,
    pub pid_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            device: CecLogicalAddress::Tv,
            monitor_only: true,
            osd_name: DEFAULT_OSD_NAME.to_string(),
            adapter: None,
            dev_dir: PathBuf::from(DEFAULT_DEV_DIR),
            input_path: None,
            output_path: None,
            error_path: None,
            status_path: None,
            pid_path: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

const ADDRESS_NAMES: [(&str, CecLogicalAddress); 16] = [
    ("tv", CecLogicalAddress::Tv),
    ("record1", CecLogicalAddress::Record1),
    ("record2", CecLogicalAddress::Record2),
    ("tuner1", CecLogicalAddress::Tuner1),
    ("playback1", CecLogicalAddress::Playback1),
    ("audiosystem", CecLogicalAddress::Audiosystem),
    ("tuner2", CecLogicalAddress::Tuner2),
    ("tuner3", CecLogicalAddress::Tuner3),
    ("playback2", CecLogicalAddress::Playback2),
    ("record3", CecLogicalAddress::Record3),
    ("tuner4", CecLogicalAddress::Tuner4),
    ("playback3", CecLogicalAddress::Playback3),
    ("backup1", CecLogicalAddress::Backup1),
    ("backup2", CecLogicalAddress::Backup2),
    ("specific", CecLogicalAddress::Specific),
    ("broadcast", CecLogicalAddress::UnregisteredBroadcast),
];

/// Parse a logical address given by name (`tv`, `playback1`, ...) or number (0..15)
pub fn parse_logical_address(value: &str) -> Result<CecLogicalAddress, Error> {
    let value = value.trim().to_ascii_lowercase();

    if let Some((_, address)) = ADDRESS_NAMES.iter().find(|(name, _)| *name == value) {
        return Ok(*address);
    }

    value
        .parse::<u8>()
        .ok()
        .and_then(|n| CecLogicalAddress::try_from(n).ok())
        .ok_or(Error::InvalidAddress(value))
}

use crate::config::{self, DaemonConfig};
use cec_linux::CecLogicalAddress;
use clap::Parser;
use std::path::PathBuf;

/// HDMI-CEC power control daemon
#[derive(Parser, Debug)]
#[command(name = "cecd")]
#[command(about = "CEC Daemon", long_about = None)]
struct Cli {
    /// Input file path (regular file or FIFO); stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file path; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Error file path; stderr when omitted
    #[arg(short, long)]
    error: Option<PathBuf>,

    /// Status file path
    #[arg(short, long)]
    status: Option<PathBuf>,

    /// PID file path
    #[arg(short, long)]
    pid: Option<PathBuf>,

    /// Logical address of the display to control (name or 0-15)
    #[arg(short, long, default_value = "tv", value_parser = config::parse_logical_address)]
    device: CecLogicalAddress,

    /// CEC adapter device node; auto-detected when omitted
    #[arg(long)]
    adapter: Option<PathBuf>,

    /// Claim a recording device logical address instead of monitoring only
    #[arg(long)]
    register: bool,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, default_value = config::DEFAULT_LOG_LEVEL)]
    log_level: String,

    /// Directory scanned for CEC adapters
    #[arg(long, hide = true, default_value = config::DEFAULT_DEV_DIR)]
    dev_dir: PathBuf,
}

/// Parse command-line arguments and return the daemon configuration
pub fn parse() -> DaemonConfig {
    let cli = Cli::parse();
    config_from_cli(cli)
}

/// Convert parsed arguments into the immutable configuration
fn config_from_cli(cli: Cli) -> DaemonConfig {
    DaemonConfig {
        device: cli.device,
        monitor_only: !cli.register,
        adapter: cli.adapter,
        dev_dir: cli.dev_dir,
        input_path: cli.input,
        output_path: cli.output,
        error_path: cli.error,
        status_path: cli.status,
        pid_path: cli.pid,
        log_level: cli.log_level,
        ..DaemonConfig::default()
    }
}

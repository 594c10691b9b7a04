mod backend;
mod bridge;
mod cli;
mod command;
mod config;
mod daemon;
mod error;
mod frame;
mod input;
mod linux;
mod logging;
mod output;
mod session;
mod status;

use std::process::ExitCode as StdExitCode;

fn main() -> StdExitCode {
    // Parse CLI arguments
    let config = cli::parse();

    match daemon::run(&config) {
        Ok(()) => error::ExitCode::Success.into(),
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code().into()
        }
    }
}

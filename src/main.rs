// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

// Serial ROM programmer client
mod error;
mod mode;
mod protocol;
mod reader;
mod serial;
mod session;
mod verify;
mod writer;

use clap::{Parser, Subcommand};
use log::error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use error::TransferError;
use mode::Timing;
use reader::ReadBack;
use serial::{PortSettings, SerialChannel};
use session::{open_source, print_report, Session};

#[derive(Parser)]
#[command(name = "romlink", version)]
#[command(about = "Write and dump ROM images over a serial link", long_about = None)]
#[command(after_help = "Note: dump outputs to stdout")]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Baud rate
    #[arg(short, long, default_value_t = protocol::DEFAULT_BAUD, global = true)]
    baud: u32,

    /// Delay in milliseconds before and after each mode code
    #[arg(long, default_value_t = protocol::MODE_SETTLE.as_millis() as u64, value_name = "MS", global = true)]
    settle_ms: u64,

    /// Delay in milliseconds after opening the port
    #[arg(long, default_value_t = protocol::OPEN_SETTLE.as_millis() as u64, value_name = "MS", global = true)]
    open_settle_ms: u64,

    /// Give up on an unresponsive device after this many seconds (default: wait forever)
    #[arg(long, value_name = "SECS", global = true)]
    timeout_secs: Option<u64>,

    /// Exit with failure on verification mismatches or a short read-back
    #[arg(long, global = true)]
    strict: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a file to the device and verify it
    Write {
        /// Serial device (e.g., /dev/ttyUSB0)
        device: String,
        /// File to send
        file: PathBuf,
    },
    /// Read bytes from the device to stdout
    Dump {
        /// Serial device (e.g., /dev/ttyUSB0)
        device: String,
        /// Number of bytes to read
        size: usize,
    },
}

impl Cli {
    fn port_settings(&self, device: &str) -> PortSettings {
        PortSettings {
            device: device.to_string(),
            baud_rate: self.baud,
            read_timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }

    fn timing(&self) -> Timing {
        Timing {
            open_settle: Duration::from_millis(self.open_settle_ms),
            mode_settle: Duration::from_millis(self.settle_ms),
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = match &cli.command {
        Commands::Write { device, file } => write_file(&cli, device, file),
        Commands::Dump { device, size } => dump(&cli, device, *size),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn write_file(cli: &Cli, device: &str, file: &Path) -> Result<ExitCode, TransferError> {
    let (mut source, len) = open_source(file)?;
    let timing = cli.timing();
    let channel = SerialChannel::open(&cli.port_settings(device), &timing)?;
    let mut session = Session::new(Box::new(channel), timing);

    println!("Starting file transfer: {} ({} bytes)", file.display(), len);
    let report = session.write_and_verify(&mut source, len)?;
    print_report(&report);

    Ok(exit_code(report.is_clean(), cli.strict))
}

fn dump(cli: &Cli, device: &str, size: usize) -> Result<ExitCode, TransferError> {
    let timing = cli.timing();
    let channel = SerialChannel::open(&cli.port_settings(device), &timing)?;
    let mut session = Session::new(Box::new(channel), timing);

    let read_back = session.dump(size, &mut std::io::stdout().lock())?;
    Ok(dump_exit_code(&read_back, cli.strict))
}

/// A short dump is reported but, like a short read-back in `write`, only
/// fails the command in strict mode.
fn dump_exit_code(read_back: &ReadBack, strict: bool) -> ExitCode {
    if read_back.is_truncated() {
        error!(
            "Serial EOF reached prematurely: {} of {} bytes",
            read_back.data.len(),
            read_back.requested
        );
    }
    exit_code(!read_back.is_truncated(), strict)
}

/// Verification problems only fail the command in strict mode.
fn exit_code(clean: bool, strict: bool) -> ExitCode {
    if clean || !strict {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

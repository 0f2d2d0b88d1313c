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

use std::time::Duration;
use log::debug;
use serialport::ClearBuffer;
use crate::error::TransferError;
use crate::protocol::*;
use crate::serial::Channel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Write,
    Read,
}

impl Mode {
    pub fn code(self) -> &'static [u8; 2] {
        match self {
            Mode::Write => MODE_WRITE,
            Mode::Read => MODE_READ,
        }
    }
}

/// Device settling delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Wait after the port is opened, before any traffic
    pub open_settle: Duration,
    /// Applied both before and after the mode code is sent
    pub mode_settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            open_settle: OPEN_SETTLE,
            mode_settle: MODE_SETTLE,
        }
    }
}

impl Timing {
    #[cfg(test)]
    pub fn immediate() -> Self {
        Timing {
            open_settle: Duration::ZERO,
            mode_settle: Duration::ZERO,
        }
    }
}

/// Switches the device into `mode`.
///
/// The device may print boot chatter while it changes state, so inbound
/// bytes are discarded on both sides of the mode code.
pub fn activate(channel: &mut dyn Channel, mode: Mode, timing: &Timing) -> Result<(), TransferError> {
    channel.discard(ClearBuffer::Input)
        .map_err(TransferError::channel("discarding input before mode code"))?;
    std::thread::sleep(timing.mode_settle);

    channel.write(mode.code())
        .map_err(TransferError::channel("sending mode code"))?;
    channel.drain()
        .map_err(TransferError::channel("draining mode code"))?;
    debug!("Sent mode code {:?}", mode);

    std::thread::sleep(timing.mode_settle);
    channel.discard(ClearBuffer::Input)
        .map_err(TransferError::channel("discarding input after mode code"))?;
    Ok(())
}

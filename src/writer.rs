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

use std::io::Read;
use log::{info, trace};
use crate::error::TransferError;
use crate::protocol::*;
use crate::serial::Channel;

/// Why the write loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every source byte was sent
    Exhausted,
    /// The device answered 'D' and wanted nothing more
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub bytes_sent: usize,
    pub chunks: usize,
    pub termination: Termination,
}

/// Streams `source` to the device in chunks, waiting for an ack after each.
///
/// Expects the device to already be in write mode.
pub fn write_all<R: Read + ?Sized>(
    channel: &mut dyn Channel,
    source: &mut R,
) -> Result<WriteSummary, TransferError> {
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut bytes_sent = 0;
    let mut chunks = 0;

    loop {
        let len = read_chunk(source, &mut buffer).map_err(TransferError::SourceRead)?;
        if len == 0 {
            break;
        }

        channel.write(&buffer[..len])
            .map_err(TransferError::channel("writing chunk"))?;
        channel.drain()
            .map_err(TransferError::channel("draining chunk"))?;
        bytes_sent += len;
        chunks += 1;

        match wait_for_ack(channel)? {
            Ack::Continue => {
                info!("Writing {} bytes ({} total) - OK", len, bytes_sent);
            }
            Ack::Done => {
                info!("Writing {} bytes ({} total) - device sent done, stopping transfer", len, bytes_sent);
                return Ok(WriteSummary { bytes_sent, chunks, termination: Termination::Done });
            }
        }
    }

    Ok(WriteSummary { bytes_sent, chunks, termination: Termination::Exhausted })
}

/// Reads single bytes until one of them is an acknowledgement.
///
/// A closed link can never produce 'O' or 'D', so `Ok(0)` is a fatal channel error.
fn wait_for_ack(channel: &mut dyn Channel) -> Result<Ack, TransferError> {
    let mut buf = [0u8; 1];
    loop {
        let n = channel.read(&mut buf)
            .map_err(TransferError::channel("waiting for ack"))?;
        if n == 0 {
            return Err(TransferError::ChannelIo {
                context: "waiting for ack",
                source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "channel closed"),
            });
        }
        match Ack::from_byte(buf[0]) {
            Some(ack) => return Ok(ack),
            None => trace!("Ignoring byte {:#04x} while waiting for ack", buf[0]),
        }
    }
}

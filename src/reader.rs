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

use log::{debug, warn};
use crate::error::TransferError;
use crate::mode::{activate, Mode, Timing};
use crate::protocol::{size_token, CHUNK_SIZE};
use crate::serial::Channel;

/// Upper bound on what is reserved before the device has sent anything
const MAX_PREALLOC: usize = 64 * 1024;

/// Bytes returned by the device for a read-back request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBack {
    pub data: Vec<u8>,
    pub requested: usize,
}

impl ReadBack {
    pub fn is_truncated(&self) -> bool {
        self.data.len() < self.requested
    }

    /// How many bytes the device never sent
    pub fn missing(&self) -> usize {
        self.requested - self.data.len()
    }
}

/// Puts the device in read mode and asks it for exactly `size` bytes.
///
/// The size goes over the wire as decimal text so the protocol can be driven
/// by hand from a terminal. If the link closes early the bytes received so
/// far are returned and the result reports itself as truncated.
pub fn read_exact(
    channel: &mut dyn Channel,
    size: usize,
    timing: &Timing,
) -> Result<ReadBack, TransferError> {
    activate(channel, Mode::Read, timing)?;

    channel.write(&size_token(size))
        .map_err(TransferError::channel("sending read-back size"))?;
    channel.drain()
        .map_err(TransferError::channel("draining read-back size"))?;
    debug!("Requested {} bytes", size);

    // the buffer grows with what actually arrives, never with what was asked for
    let mut data = Vec::with_capacity(size.min(MAX_PREALLOC));
    let mut block = [0u8; CHUNK_SIZE];
    while data.len() < size {
        let want = (size - data.len()).min(block.len());
        let n = channel.read(&mut block[..want])
            .map_err(TransferError::channel("reading back data"))?;
        if n == 0 {
            warn!("Serial link closed after {} of {} bytes", data.len(), size);
            break;
        }
        data.extend_from_slice(&block[..n]);
    }

    Ok(ReadBack { data, requested: size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::{bytes, Event, Inbound, MockChannel};

    #[test]
    fn test_exact_read_then_close() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(300).collect();
        let mut script = bytes(&payload);
        script.push(Inbound::Closed);
        let (mut channel, log) = MockChannel::new(script);

        let read_back = read_exact(&mut channel, 300, &Timing::immediate()).unwrap();

        assert_eq!(read_back.data, payload);
        assert!(!read_back.is_truncated());
        assert_eq!(read_back.missing(), 0);
        // stops at the requested size, the close is still pending
        let mut buf = [0u8; 1];
        assert_eq!(channel.read(&mut buf).unwrap(), 0);

        assert_eq!(
            log.lock().unwrap().events,
            vec![
                Event::DiscardInput,
                Event::Write(b"4\n".to_vec()),
                Event::Drain,
                Event::DiscardInput,
                Event::Write(b"300\n".to_vec()),
                Event::Drain,
            ]
        );
    }

    #[test]
    fn test_short_read_back_is_truncated() {
        let mut script = bytes(&[0xAA; 10]);
        script.push(Inbound::Closed);
        let (mut channel, _log) = MockChannel::new(script);

        let read_back = read_exact(&mut channel, 16, &Timing::immediate()).unwrap();

        assert!(read_back.is_truncated());
        assert_eq!(read_back.data, vec![0xAA; 10]);
        assert_eq!(read_back.requested, 16);
        assert_eq!(read_back.missing(), 6);
    }

    #[test]
    fn test_zero_size_sends_token_and_reads_nothing() {
        let (mut channel, log) = MockChannel::new(Vec::new());

        let read_back = read_exact(&mut channel, 0, &Timing::immediate()).unwrap();

        assert!(read_back.data.is_empty());
        assert!(!read_back.is_truncated());
        assert_eq!(log.lock().unwrap().writes().last().unwrap(), b"0\n");
    }

    #[test]
    fn test_huge_size_does_not_preallocate() {
        let mut script = bytes(b"xyz");
        script.push(Inbound::Closed);
        let (mut channel, log) = MockChannel::new(script);

        let read_back = read_exact(&mut channel, usize::MAX, &Timing::immediate()).unwrap();

        assert_eq!(read_back.data, b"xyz");
        assert_eq!(read_back.missing(), usize::MAX - 3);
        assert_eq!(
            log.lock().unwrap().writes().last().unwrap(),
            &size_token(usize::MAX)
        );
    }

    #[test]
    fn test_read_error_is_not_truncation() {
        let mut script = bytes(b"abcd");
        script.push(Inbound::Error);
        let (mut channel, _log) = MockChannel::new(script);

        match read_exact(&mut channel, 8, &Timing::immediate()) {
            Err(TransferError::ChannelIo { context, .. }) => assert_eq!(context, "reading back data"),
            other => panic!("Expected channel error, got {:?}", other),
        }
    }
}

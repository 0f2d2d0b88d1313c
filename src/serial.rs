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

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use log::debug;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use crate::error::TransferError;
use crate::mode::Timing;

/// How long a single port read waits before we check the deadline again
const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Channel Trait
// ============================================================================

/// Duplex byte stream to the device
pub trait Channel: Send {
    /// Blocks until at least one byte arrives. `Ok(0)` means the link closed.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    fn write(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Blocks until everything written has physically left the port.
    fn drain(&mut self) -> std::io::Result<()>;

    /// Throws away buffered bytes in the given direction.
    fn discard(&mut self, direction: ClearBuffer) -> std::io::Result<()>;
}

// ============================================================================
// Real Serial Port Implementation
// ============================================================================

pub struct PortSettings {
    pub device: String,
    pub baud_rate: u32,
    /// `None` blocks forever waiting on the device
    pub read_timeout: Option<Duration>,
}

/// Raw 8N1 serial line without flow control
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    read_timeout: Option<Duration>,
}

impl SerialChannel {
    pub fn open(settings: &PortSettings, timing: &Timing) -> Result<Self, TransferError> {
        let open_error = |source| TransferError::ChannelOpen {
            port: settings.device.clone(),
            source,
        };

        let port = serialport::new(&settings.device, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(POLL_INTERVAL)
            .open()
            .map_err(open_error)?;

        port.clear(ClearBuffer::All).map_err(open_error)?;
        debug!("Opened {} at {} baud, settling for {:?}", settings.device, settings.baud_rate, timing.open_settle);
        std::thread::sleep(timing.open_settle);

        Ok(SerialChannel {
            port,
            read_timeout: settings.read_timeout,
        })
    }
}

impl Channel for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let deadline = self.read_timeout.map(|t| Instant::now() + t);
        loop {
            match self.port.read(buf) {
                Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        return Err(std::io::Error::new(ErrorKind::TimedOut, "device did not respond"));
                    }
                }
                result => return result,
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.port.write_all(buf)
    }

    fn drain(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }

    fn discard(&mut self, direction: ClearBuffer) -> std::io::Result<()> {
        self.port.clear(direction)
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))
    }
}

// ============================================================================
// Mock Channel for Testing
// ============================================================================

#[cfg(test)]
pub use mock::*;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_read_stops_at_close_marker() {
        let mut script = bytes(b"abc");
        script.push(Inbound::Closed);
        let (mut channel, _log) = MockChannel::new(script);

        let mut buf = [0u8; 8];
        assert_eq!(channel.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(channel.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_mock_read_error_marker() {
        let (mut channel, _log) = MockChannel::new(vec![Inbound::Error]);
        let mut buf = [0u8; 1];
        assert!(channel.read(&mut buf).is_err());
    }

    #[test]
    fn test_mock_records_events_in_order() {
        let (mut channel, log) = MockChannel::new(Vec::new());
        channel.discard(ClearBuffer::Input).unwrap();
        channel.write(b"hi").unwrap();
        channel.drain().unwrap();

        let log = log.lock().unwrap();
        assert_eq!(
            log.events,
            vec![Event::DiscardInput, Event::Write(b"hi".to_vec()), Event::Drain]
        );
        assert_eq!(log.written(), b"hi");
    }

    #[test]
    fn test_open_missing_port_is_channel_open_error() {
        let settings = PortSettings {
            device: "/dev/romlink-does-not-exist".to_string(),
            baud_rate: 57600,
            read_timeout: None,
        };
        match SerialChannel::open(&settings, &Timing::immediate()) {
            Err(TransferError::ChannelOpen { port, .. }) => assert_eq!(port, settings.device),
            Err(e) => panic!("Unexpected error: {}", e),
            Ok(_) => panic!("Opening a missing port should fail"),
        }
    }
}

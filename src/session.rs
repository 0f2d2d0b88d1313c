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

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use log::{info, warn};
use crate::error::TransferError;
use crate::mode::{activate, Mode, Timing};
use crate::reader::{read_exact, ReadBack};
use crate::serial::Channel;
use crate::verify::{verify, MismatchRange, VerifyError};
use crate::writer::{write_all, WriteSummary};

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Mismatched(Vec<MismatchRange>),
    /// The read-back was too short to compare past `available` bytes.
    /// `mismatches` holds the ranges that differed before that point.
    Incomplete {
        mismatches: Vec<MismatchRange>,
        offset: usize,
        available: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub write: WriteSummary,
    /// Bytes of the read-back the device never sent
    pub missing: usize,
    pub outcome: VerifyOutcome,
}

impl WriteReport {
    pub fn is_clean(&self) -> bool {
        self.missing == 0 && self.outcome == VerifyOutcome::Verified
    }
}

// ============================================================================
// Session
// ============================================================================

/// One command's exclusive hold on the serial link. The link closes when the
/// session is dropped.
pub struct Session {
    channel: Box<dyn Channel>,
    timing: Timing,
}

impl Session {
    pub fn new(channel: Box<dyn Channel>, timing: Timing) -> Self {
        Session { channel, timing }
    }

    /// Writes `source` to the device, reads `declared_len` bytes back and
    /// compares them with the source.
    ///
    /// The read-back is requested even when the device stopped the write
    /// early. Mismatches and truncation are reported, not returned as errors.
    pub fn write_and_verify<S: Read + Seek>(
        &mut self,
        source: &mut S,
        declared_len: usize,
    ) -> Result<WriteReport, TransferError> {
        activate(self.channel.as_mut(), Mode::Write, &self.timing)?;
        let write = write_all(self.channel.as_mut(), source)?;
        info!("Sent {} bytes in {} chunks ({:?})", write.bytes_sent, write.chunks, write.termination);

        println!("File transfer complete. Verifying...");

        source.seek(SeekFrom::Start(0)).map_err(TransferError::SourceRead)?;
        let read_back = read_exact(self.channel.as_mut(), declared_len, &self.timing)?;
        if read_back.is_truncated() {
            warn!("Read-back is short by {} bytes", read_back.missing());
        }

        let outcome = match verify(source, &read_back.data) {
            Ok(ranges) if ranges.is_empty() => VerifyOutcome::Verified,
            Ok(ranges) => VerifyOutcome::Mismatched(ranges),
            Err(VerifyError::Truncated { offset, available, mismatches, .. }) => {
                VerifyOutcome::Incomplete { mismatches, offset, available }
            }
            Err(VerifyError::Source(e)) => return Err(TransferError::SourceRead(e)),
        };

        Ok(WriteReport {
            write,
            missing: read_back.missing(),
            outcome,
        })
    }

    /// Reads `size` bytes from the device into `sink`.
    pub fn dump<W: Write + ?Sized>(
        &mut self,
        size: usize,
        sink: &mut W,
    ) -> Result<ReadBack, TransferError> {
        let read_back = read_exact(self.channel.as_mut(), size, &self.timing)?;
        sink.write_all(&read_back.data).map_err(TransferError::Output)?;
        sink.flush().map_err(TransferError::Output)?;
        Ok(read_back)
    }
}

/// Opens the local file and returns it with its size.
pub fn open_source(path: &Path) -> Result<(File, usize), TransferError> {
    let source_error = |source| TransferError::SourceFile {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(source_error)?;
    let len = file.metadata().map_err(source_error)?.len();
    let len = usize::try_from(len).map_err(|_| {
        source_error(std::io::Error::new(std::io::ErrorKind::InvalidData, "file too large"))
    })?;
    Ok((file, len))
}

/// Prints the verification result the way an operator expects to read it.
pub fn print_report(report: &WriteReport) {
    if report.missing > 0 {
        println!("Device sent {} fewer bytes than requested", report.missing);
    }
    match &report.outcome {
        VerifyOutcome::Verified => println!("Verification OK"),
        VerifyOutcome::Mismatched(ranges) => print_mismatches(ranges),
        VerifyOutcome::Incomplete { mismatches, offset, available } => {
            print_mismatches(mismatches);
            println!(
                "Verification incomplete: read-back ends at byte {}, cannot compare from byte {}",
                available, offset
            );
        }
    }
}

fn print_mismatches(ranges: &[MismatchRange]) {
    for range in ranges {
        println!("{} DOES NOT MATCH!!!", range);
    }
}

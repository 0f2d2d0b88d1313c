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

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors. Any of these ends the session and the process exits non-zero.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to open serial port {port}: {source}")]
    ChannelOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("serial I/O error ({context}): {source}")]
    ChannelIo {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    SourceFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read source data: {0}")]
    SourceRead(#[source] std::io::Error),

    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

impl TransferError {
    /// Tags a channel I/O error with the protocol step it happened in.
    pub fn channel(context: &'static str) -> impl FnOnce(std::io::Error) -> TransferError {
        move |source| TransferError::ChannelIo { context, source }
    }
}

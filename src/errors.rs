// Sonata
// Copyright (c) 2019 The Sonata Project Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::error;
use std::fmt;
use std::io;
use std::result;

/// `Error` enumerates every way decoding an SWF stream can fail.
///
/// `LengthMismatch` is the only variant the dispatchers recover from locally;
/// every other variant aborts the parse (see the crate-level error handling
/// design).
#[derive(Debug)]
pub enum Error {
    /// An IO error occurred while reading the stream, including a primitive read that found
    /// fewer bytes than requested (`io::ErrorKind::UnexpectedEof`, raised by `BufStream` once the
    /// in-memory buffer is exhausted). There is no separate `EndOfStream` variant: every source
    /// this crate reads from is buffer-backed, so any `IoError` it raises already is an
    /// end-of-stream condition.
    IoError(io::Error),
    /// A handler consumed more or fewer bytes than its length prefix declared.
    LengthMismatch { name: &'static str, offset: u64, expected: u64, actual: u64 },
    /// A tag or action code has no registered handler (`unknown_alert` mode only).
    UnknownName { kind: &'static str, code: u32, offset: u64 },
    /// zlib inflate failed, or the inflated length disagreed with the header.
    DecompressionFailure(&'static str),
    /// A structurally required constant was absent (e.g. a JPEG SOI marker).
    ProtocolAssertionFailure { what: &'static str, offset: u64 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IoError(err) => err.fmt(f),
            Error::LengthMismatch { name, offset, expected, actual } => write!(
                f,
                "{} at offset {} consumed {} bytes, expected {}",
                name, offset, actual, expected
            ),
            Error::UnknownName { kind, code, offset } => {
                write!(f, "unknown {} code {} at offset {}", kind, code, offset)
            }
            Error::DecompressionFailure(msg) => {
                write!(f, "decompression failed: {}", msg)
            }
            Error::ProtocolAssertionFailure { what, offset } => {
                write!(f, "expected {} at offset {}", what, offset)
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create a length-mismatch error.
pub fn length_mismatch_error<T>(
    name: &'static str,
    offset: u64,
    expected: u64,
    actual: u64,
) -> Result<T> {
    Err(Error::LengthMismatch { name, offset, expected, actual })
}

/// Convenience function to create an unknown-name error.
pub fn unknown_name_error<T>(kind: &'static str, code: u32, offset: u64) -> Result<T> {
    Err(Error::UnknownName { kind, code, offset })
}

/// Convenience function to create a decompression-failure error.
pub fn decompression_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::DecompressionFailure(msg))
}

/// Convenience function to create a protocol-assertion error.
pub fn protocol_error<T>(what: &'static str, offset: u64) -> Result<T> {
    Err(Error::ProtocolAssertionFailure { what, offset })
}

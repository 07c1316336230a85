use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::Location;

/// The four ways a decompression call can fail, per the format's error taxonomy.
///
/// Every variant carries the call site that raised it so a caller chasing a
/// malformed file does not need a backtrace crate to find the failing check.
#[derive(Debug)]
pub enum DecodeError {
    /// Framing is inconsistent: bad magic, a size field out of range, a table
    /// offset exceeding the buffer.
    InvalidFormat {
        message: String,
        location: &'static Location<'static>,
    },
    /// Decoding violated an invariant the input itself should have upheld:
    /// an out-of-range Huffman code, a back-reference out of bounds, bitstream
    /// underflow, a sub-block overflow.
    Decompression {
        message: String,
        location: &'static Location<'static>,
    },
    /// Decoding completed but a trailing or embedded checksum disagreed.
    Verification {
        message: String,
        location: &'static Location<'static>,
    },
    /// XPK nesting exceeded the configured cap.
    RecursionLimit {
        depth: u32,
        cap: u32,
        location: &'static Location<'static>,
    },
}

pub type Result<T> = std::result::Result<T, DecodeError>;

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::InvalidFormat { message, location } => {
                write!(f, "invalid format at {location}: {message}")
            }
            DecodeError::Decompression { message, location } => {
                write!(f, "decompression error at {location}: {message}")
            }
            DecodeError::Verification { message, location } => {
                write!(f, "verification error at {location}: {message}")
            }
            DecodeError::RecursionLimit { depth, cap, location } => {
                write!(f, "recursion limit at {location}: depth {depth} exceeds cap {cap}")
            }
        }
    }
}

impl Error for DecodeError {}

#[track_caller]
pub(crate) fn invalid_format(message: impl Into<String>) -> DecodeError {
    DecodeError::InvalidFormat {
        message: message.into(),
        location: Location::caller(),
    }
}

#[track_caller]
pub(crate) fn decompression(message: impl Into<String>) -> DecodeError {
    DecodeError::Decompression {
        message: message.into(),
        location: Location::caller(),
    }
}

#[track_caller]
pub(crate) fn verification(message: impl Into<String>) -> DecodeError {
    DecodeError::Verification {
        message: message.into(),
        location: Location::caller(),
    }
}

#[track_caller]
pub(crate) fn recursion_limit(depth: u32, cap: u32) -> DecodeError {
    DecodeError::RecursionLimit {
        depth,
        cap,
        location: Location::caller(),
    }
}

//! Coarse error classification shared by every layer.
//!
//! Each module keeps its own `thiserror` enum with whatever detail it needs;
//! [`ErrorKind`] is the common vocabulary callers match on when they only
//! care about *what class* of failure happened (e.g. "was this just missing,
//! or is the data corrupt?").

use std::fmt;

/// The class of a failure, independent of which layer raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty or invalid caller input (signature, path, counter window)
    Input,
    /// Key derivation, encryption or decryption failed, or a key did not match
    Crypto,
    /// The block store failed for a reason other than a missing block
    Storage,
    /// A block, forest entry or path does not exist
    NotFound,
    /// Stored bytes could not be decoded into the expected structure
    CorruptData,
    /// A mutation collided with an entry of the wrong type
    PathConflict,
    /// No valid share exists at any scanned counter
    ShareNotFound,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Input => "input error",
            ErrorKind::Crypto => "crypto error",
            ErrorKind::Storage => "storage error",
            ErrorKind::NotFound => "not found",
            ErrorKind::CorruptData => "corrupt data",
            ErrorKind::PathConflict => "path conflict",
            ErrorKind::ShareNotFound => "share not found",
        };
        write!(f, "{}", s)
    }
}

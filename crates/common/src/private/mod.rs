//! Private nodes: encrypted directories and files living in a forest
//!
//! Every node is stored as a raw block encrypted under a key derived from
//! the node's [`Ratchet`]; the block's CID is filed in the forest under a
//! label derived from the node's name and the same ratchet state. Storing a
//! node that was already persisted advances its ratchet first, so every
//! revision gets a fresh label and key.
//!
//! All public operations take `&self` and return the new root together with
//! the new forest. The inputs are never modified.

mod access_key;
mod directory;
mod file;
mod link;
mod metadata;
mod node;
mod ratchet;

pub use access_key::{AccessKey, PrivateRef};
pub use directory::PrivateDirectory;
pub use file::{PrivateFile, CHUNK_SIZE, INLINE_LIMIT};
pub use link::PrivateLink;
pub use metadata::{Metadata, NodeKind};
pub use node::{PrivateNode, PrivateNodeHeader};
pub use ratchet::Ratchet;

use crate::crypto::SecretError;
use crate::error::ErrorKind;
use crate::forest::NameAccumulator;
use crate::linked_data::CodecError;
use crate::store::BlockStoreError;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("path is empty")]
    EmptyPath,
    #[error("invalid path segment: {0:?}")]
    InvalidSegment(String),
    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("path conflict at {0}")]
    PathConflict(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("not a file: {0}")]
    NotAFile(String),
    #[error("no revision stored under {0}")]
    RevisionNotFound(NameAccumulator),
    #[error("file content is truncated or inconsistent")]
    CorruptContent,
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
    #[error("block store error: {0}")]
    Store(#[from] BlockStoreError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::EmptyPath | FsError::InvalidSegment(_) => ErrorKind::Input,
            FsError::NotFound(_) | FsError::RevisionNotFound(_) => ErrorKind::NotFound,
            FsError::PathConflict(_) | FsError::NotADirectory(_) | FsError::NotAFile(_) => {
                ErrorKind::PathConflict
            }
            FsError::CorruptContent | FsError::Codec(_) => ErrorKind::CorruptData,
            FsError::Secret(_) => ErrorKind::Crypto,
            FsError::Store(e) => e.kind(),
        }
    }
}

/// Validate path segments: non-empty and free of `/`.
pub(crate) fn parse_path<P: AsRef<str>>(path: &[P]) -> Result<Vec<String>, FsError> {
    path.iter()
        .map(|segment| {
            let segment = segment.as_ref();
            if segment.is_empty() || segment.contains('/') {
                Err(FsError::InvalidSegment(segment.to_string()))
            } else {
                Ok(segment.to_string())
            }
        })
        .collect()
}

pub(crate) fn display_path(path: &[String]) -> String {
    format!("/{}", path.join("/"))
}

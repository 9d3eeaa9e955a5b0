use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Directory,
}

/// What `ls` reports about an entry.
///
/// `size` is the byte length for files and the entry count for directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub kind: NodeKind,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

impl Metadata {
    pub(crate) fn new(kind: NodeKind, time: DateTime<Utc>) -> Self {
        Self {
            kind,
            created: time,
            modified: time,
            size: 0,
        }
    }

    pub(crate) fn touch(&mut self, time: DateTime<Utc>, size: u64) {
        self.modified = time;
        self.size = size;
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::PrivateForest;
use crate::rng::Randomness;

/// Size of a name segment and of an accumulated label in bytes
pub const NAME_SEGMENT_SIZE: usize = 32;

/// One opaque component of a [`Name`]
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NameSegment(#[serde_as(as = "serde_with::Bytes")] [u8; NAME_SEGMENT_SIZE]);

impl fmt::Debug for NameSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameSegment({})", hex::encode(&self.0[..6]))
    }
}

impl NameSegment {
    /// A fresh random segment
    pub fn new(rng: &mut impl Randomness) -> Self {
        Self(rng.random_bytes())
    }

    /// A segment that is a pure function of `domain` and `parts`.
    ///
    /// Each part is length-prefixed before hashing, so moving bytes between
    /// adjacent parts changes the result.
    pub fn new_hashed(domain: &str, parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(domain);
        for part in parts {
            hasher.update(&(part.len() as u64).to_be_bytes());
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; NAME_SEGMENT_SIZE] {
        &self.0
    }
}

/// A path-like label inside a forest.
///
/// Names never contain cleartext path components; every segment is either
/// random (a node's inumber) or a hash of secret material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Name {
    segments: Vec<NameSegment>,
}

impl Name {
    pub fn new(segments: impl IntoIterator<Item = NameSegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    pub fn segments(&self) -> &[NameSegment] {
        &self.segments
    }

    /// A copy of this name with `segments` appended
    pub fn with_segments_added(&self, segments: &[NameSegment]) -> Self {
        let mut out = self.segments.clone();
        out.extend_from_slice(segments);
        Self { segments: out }
    }

    /// The forest label for this name
    pub fn accumulate(&self, forest: &PrivateForest) -> NameAccumulator {
        forest.accumulate(self)
    }
}

/// A [`Name`] hashed under a forest's namespace key; the key type of the
/// forest's index.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NameAccumulator(#[serde_as(as = "serde_with::Bytes")] [u8; NAME_SEGMENT_SIZE]);

impl fmt::Debug for NameAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameAccumulator({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for NameAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl NameAccumulator {
    pub(crate) fn from_bytes(bytes: [u8; NAME_SEGMENT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NAME_SEGMENT_SIZE] {
        &self.0
    }
}

use serde::{Deserialize, Serialize};

use crate::crypto::Secret;
use crate::forest::NameAccumulator;
use crate::linked_data::{BlockEncoded, Cid, CodecError};

/// Pointer to one stored revision of a private node
///
/// Enough to find the ciphertext in a forest and decrypt it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateRef {
    pub label: NameAccumulator,
    pub temporal_key: Secret,
    pub content_cid: Cid,
}

impl BlockEncoded for PrivateRef {}

/// Capability granting read access to a node revision and every revision
/// after it.
///
/// Only ever persisted in encrypted form, as the payload of a share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessKey(PrivateRef);

impl AccessKey {
    pub fn label(&self) -> &NameAccumulator {
        &self.0.label
    }

    pub fn content_cid(&self) -> &Cid {
        &self.0.content_cid
    }

    pub(crate) fn private_ref(&self) -> &PrivateRef {
        &self.0
    }

    /// DAG-CBOR encoding of the key
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        self.0.encode()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(Self(PrivateRef::decode(bytes)?))
    }
}

impl From<PrivateRef> for AccessKey {
    fn from(private_ref: PrivateRef) -> Self {
        Self(private_ref)
    }
}

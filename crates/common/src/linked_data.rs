//! Content identifiers and block codecs
//!
//! Every block in the store is addressed by a CIDv1 whose multihash is the
//! BLAKE3 digest of the block bytes. Encrypted blobs use the raw codec;
//! public structures (forest roots, exchange-key registries) are DAG-CBOR.

use ipld_core::codec::Codec;
use serde::{de::DeserializeOwned, Serialize};

pub use cid::multibase;
pub use cid::Cid;
pub use serde_ipld_dagcbor::codec::DagCborCodec;

/// Multicodec code for raw bytes
pub const LD_RAW_CODEC: u64 = 0x55;
/// Multicodec code for DAG-CBOR
pub const LD_CBOR_CODEC: u64 = 0x71;
/// Multihash code for BLAKE3-256
pub const BLAKE3_MH_CODE: u64 = 0x1e;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("dag-cbor codec error: {0}")]
    Cbor(#[from] serde_ipld_dagcbor::error::CodecError),
    #[error("multihash error: {0}")]
    Multihash(#[from] cid::multihash::Error),
    #[error("cid error: {0}")]
    Cid(#[from] cid::Error),
}

/// Compute the CID of `data` under `codec`.
///
/// Pure function of its inputs: the same bytes and codec always produce
/// the same CID.
pub fn cid_for(codec: u64, data: &[u8]) -> Result<Cid, CodecError> {
    let digest = blake3::hash(data);
    let mh = cid::multihash::Multihash::<64>::wrap(BLAKE3_MH_CODE, digest.as_bytes())?;
    Ok(Cid::new_v1(codec, mh))
}

/// Check that `data` hashes to `cid`.
pub fn verify_cid(cid: &Cid, data: &[u8]) -> bool {
    if cid.hash().code() != BLAKE3_MH_CODE {
        return false;
    }
    blake3::hash(data).as_bytes() == cid.hash().digest()
}

/// Render a CID the way we persist it as text
pub fn cid_to_string(cid: &Cid) -> String {
    cid.to_string_of_base(multibase::Base::Base32Lower)
        .unwrap_or_else(|_| cid.to_string())
}

/// Parse a CID from any multibase string
pub fn cid_from_str(s: &str) -> Result<Cid, CodecError> {
    Ok(Cid::try_from(s.trim())?)
}

/// Types that are stored as DAG-CBOR blocks
pub trait BlockEncoded: Serialize + DeserializeOwned + Sized {
    fn codec(&self) -> u64 {
        LD_CBOR_CODEC
    }

    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(DagCborCodec::encode_to_vec(self)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(DagCborCodec::decode_from_slice(bytes)?)
    }
}

//! Sharing and recovering access to a private tree
//!
//! An [`AccessKey`] is encrypted to a recipient's [`ExchangeKey`] and filed
//! in the forest under a name derived from `(counter, identity, modulus)`.
//! Everything needed to recompute that name comes from the recipient's
//! signature, so recovery is: derive keys, scan counters, decrypt.

use std::ops::Range;

use bytes::Bytes;

use crate::crypto::{ExchangeError, ExchangeKey, KeyError, PrivateKey};
use crate::error::ErrorKind;
use crate::forest::{Name, NameSegment, PrivateForest};
use crate::linked_data::{Cid, CodecError, LD_RAW_CODEC};
use crate::private::{AccessKey, FsError, PrivateNode};
use crate::store::{BlockStore, BlockStoreError};

mod exchange_root;

pub use exchange_root::{ExchangeRoot, DEFAULT_DEVICE_LABEL, EXCHANGE_KEY_ENTRY};

const SHARE_NAME_CONTEXT: &str = "sigvault share name v1";

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("no share found")]
    NotFound,
    #[error("exchange root lists no exchange keys")]
    NoExchangeKeys,
    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("block store error: {0}")]
    Store(#[from] BlockStoreError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("fs error: {0}")]
    Fs(#[from] FsError),
}

impl ShareError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShareError::NotFound => ErrorKind::ShareNotFound,
            ShareError::NoExchangeKeys => ErrorKind::Input,
            ShareError::Exchange(e) => e.kind(),
            ShareError::Key(e) => e.kind(),
            ShareError::Store(e) => e.kind(),
            ShareError::Codec(_) => ErrorKind::CorruptData,
            ShareError::Fs(e) => e.kind(),
        }
    }
}

/// Name of the share published at `counter` for the recipient identified
/// by `identity` and `modulus`.
pub fn create_share_name(
    counter: u64,
    identity: &str,
    modulus: &[u8],
    forest: &PrivateForest,
) -> Name {
    let segment = NameSegment::new_hashed(
        SHARE_NAME_CONTEXT,
        &[identity.as_bytes(), modulus, &counter.to_be_bytes()],
    );
    forest.empty_name().with_segments_added(&[segment])
}

/// Encrypt `access_key` to every key registered in the exchange root at
/// `exchange_root_cid` and file the ciphertexts at `counter`.
pub async fn share<S: BlockStore>(
    access_key: &AccessKey,
    counter: u64,
    identity: &str,
    exchange_root_cid: &Cid,
    forest: &PrivateForest,
    store: &S,
) -> Result<PrivateForest, ShareError> {
    let keys = ExchangeRoot::load(exchange_root_cid, store)
        .await?
        .exchange_keys(store)
        .await?;
    if keys.is_empty() {
        return Err(ShareError::NoExchangeKeys);
    }

    let payload = access_key.to_bytes()?;
    let mut forest = forest.clone();
    for (label, key) in keys {
        let ciphertext = key.encrypt(&payload)?;
        let cid = store
            .put_block(Bytes::from(ciphertext), LD_RAW_CODEC)
            .await?;
        let name = create_share_name(counter, identity, &key.modulus(), &forest);
        forest.put_encrypted(name.accumulate(&forest), cid);
        tracing::debug!("share: published counter {} for {:?}", counter, label);
    }
    Ok(forest)
}

/// Highest counter in `min..max` holding a share for the recipient.
///
/// A counter counts when its label is in the forest and at least one of
/// the CIDs filed there is present in the store. Every counter in the
/// window is probed, so gaps are tolerated. Store errors are logged and
/// treated as absence.
pub async fn find_latest_share_counter<S: BlockStore>(
    min: u64,
    max: u64,
    modulus: &[u8],
    identity: &str,
    forest: &PrivateForest,
    store: &S,
) -> Option<u64> {
    let mut latest = None;
    for counter in min..max {
        let label = create_share_name(counter, identity, modulus, forest).accumulate(forest);
        let Some(cids) = forest.get_encrypted(&label) else {
            continue;
        };
        for cid in cids {
            match store.has_block(cid).await {
                Ok(true) => {
                    latest = Some(counter);
                    break;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("share scan: treating counter {} as absent: {}", counter, e)
                }
            }
        }
    }
    latest
}

/// [`find_latest_share_counter`] over a window
pub async fn find_latest_share_counter_in<S: BlockStore>(
    window: &Range<u64>,
    key: &ExchangeKey,
    identity: &str,
    forest: &PrivateForest,
    store: &S,
) -> Option<u64> {
    find_latest_share_counter(
        window.start,
        window.end,
        &key.modulus(),
        identity,
        forest,
        store,
    )
    .await
}

/// Decrypt the share filed at `name` and load the node it grants.
pub async fn receive_share<S: BlockStore>(
    name: &Name,
    private_key: &PrivateKey,
    forest: &PrivateForest,
    store: &S,
) -> Result<PrivateNode, ShareError> {
    let label = name.accumulate(forest);
    let cids = forest.get_encrypted(&label).ok_or(ShareError::NotFound)?;

    let mut last_err = ShareError::NotFound;
    for cid in cids.iter().rev() {
        let ciphertext = match store.get_block(cid).await {
            Ok(bytes) => bytes,
            Err(e) => {
                last_err = e.into();
                continue;
            }
        };
        match private_key.decrypt(&ciphertext) {
            Ok(payload) => {
                let access_key = AccessKey::from_bytes(&payload)?;
                return Ok(PrivateNode::load(&access_key, forest, store).await?);
            }
            Err(e) => last_err = e.into(),
        }
    }
    Err(last_err)
}

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::ShareError;
use crate::crypto::ExchangeKey;
use crate::linked_data::{BlockEncoded, Cid, LD_RAW_CODEC};
use crate::store::BlockStore;

/// Entry name under each device label holding its exchange key
pub const EXCHANGE_KEY_ENTRY: &str = "v1.exchange_key";
/// Device label used for an owner's own key
pub const DEFAULT_DEVICE_LABEL: &str = "main";

/// Public registry of exchange keys
///
/// Laid out as `{label}/v1.exchange_key -> CID`, where the CID addresses
/// the raw modulus bytes. Nothing in here is secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeRoot {
    devices: BTreeMap<String, BTreeMap<String, Cid>>,
}

impl BlockEncoded for ExchangeRoot {}

impl ExchangeRoot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `key`'s modulus and register it under `label`
    pub async fn add_key<S: BlockStore>(
        &mut self,
        label: &str,
        key: &ExchangeKey,
        store: &S,
    ) -> Result<Cid, ShareError> {
        let cid = store
            .put_block(Bytes::copy_from_slice(&key.modulus()), LD_RAW_CODEC)
            .await?;
        self.devices
            .entry(label.to_string())
            .or_default()
            .insert(EXCHANGE_KEY_ENTRY.to_string(), cid);
        Ok(cid)
    }

    /// A registry holding just `key` under `label`, stored
    pub async fn publish<S: BlockStore>(
        label: &str,
        key: &ExchangeKey,
        store: &S,
    ) -> Result<Cid, ShareError> {
        let mut root = Self::new();
        root.add_key(label, key, store).await?;
        root.store(store).await
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// Resolve every registered exchange key
    pub async fn exchange_keys<S: BlockStore>(
        &self,
        store: &S,
    ) -> Result<Vec<(String, ExchangeKey)>, ShareError> {
        let mut keys = Vec::new();
        for (label, entries) in &self.devices {
            let Some(cid) = entries.get(EXCHANGE_KEY_ENTRY) else {
                continue;
            };
            let modulus = store.get_block(cid).await?;
            keys.push((label.clone(), ExchangeKey::from_modulus(&modulus)?));
        }
        Ok(keys)
    }

    pub async fn store<S: BlockStore>(&self, store: &S) -> Result<Cid, ShareError> {
        Ok(store.put_cbor(self).await?)
    }

    pub async fn load<S: BlockStore>(cid: &Cid, store: &S) -> Result<Self, ShareError> {
        Ok(store.get_cbor(cid).await?)
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use super::{BlockStore, BlockStoreError};
use crate::linked_data::Cid;

/// Block store held entirely in memory.
///
/// Clones share the same underlying map, so a clone handed to a second
/// session sees every block the first one wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    blocks: Arc<RwLock<HashMap<Cid, Bytes>>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blocks held
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn has_block(&self, cid: &Cid) -> Result<bool, BlockStoreError> {
        Ok(self.blocks.read().contains_key(cid))
    }

    async fn get_block(&self, cid: &Cid) -> Result<Bytes, BlockStoreError> {
        self.blocks
            .read()
            .get(cid)
            .cloned()
            .ok_or(BlockStoreError::NotFound(*cid))
    }

    async fn put_block_keyed(&self, cid: &Cid, bytes: Bytes) -> Result<(), BlockStoreError> {
        self.blocks.write().entry(*cid).or_insert(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use crate::linked_data::{cid_for, LD_RAW_CODEC};

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let store = MemoryBlockStore::new();
        let a = store
            .put_block(Bytes::from_static(b"block"), LD_RAW_CODEC)
            .await
            .unwrap();
        let b = store
            .put_block(Bytes::from_static(b"block"), LD_RAW_CODEC)
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert!(store.has_block(&a).await.unwrap());
        assert_eq!(store.get_block(&a).await.unwrap(), Bytes::from_static(b"block"));
    }

    #[tokio::test]
    async fn test_missing_block_is_not_found() {
        let store = MemoryBlockStore::new();
        let cid = cid_for(LD_RAW_CODEC, b"never stored").unwrap();
        assert!(!store.has_block(&cid).await.unwrap());
        let err = store.get_block(&cid).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_clones_share_blocks() {
        let store = MemoryBlockStore::new();
        let other = store.clone();
        let cid = store
            .put_block(Bytes::from_static(b"shared"), LD_RAW_CODEC)
            .await
            .unwrap();
        assert!(other.has_block(&cid).await.unwrap());
    }
}

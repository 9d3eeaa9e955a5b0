//! Content-addressed block storage
//!
//! The core only ever talks to a [`BlockStore`]; where the blocks actually
//! live is up to the backend. Two backends ship here: an in-memory map for
//! tests and short sessions, and a directory of files for the CLI.

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ErrorKind;
use crate::linked_data::{cid_for, BlockEncoded, Cid, CodecError, LD_CBOR_CODEC};

mod fs;
mod memory;

pub use fs::FsBlockStore;
pub use memory::MemoryBlockStore;

#[derive(Debug, thiserror::Error)]
pub enum BlockStoreError {
    #[error("block not found: {0}")]
    NotFound(Cid),
    #[error("block store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("block codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("block store error: {0}")]
    Default(#[from] anyhow::Error),
}

impl BlockStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlockStoreError::NotFound(_) => ErrorKind::NotFound,
            BlockStoreError::Codec(_) => ErrorKind::CorruptData,
            _ => ErrorKind::Storage,
        }
    }
}

/// Write-once, content-addressed storage for immutable blocks.
#[async_trait]
pub trait BlockStore: Debug + Send + Sync {
    async fn has_block(&self, cid: &Cid) -> Result<bool, BlockStoreError>;

    /// Fetch a block. A missing block is [`BlockStoreError::NotFound`].
    async fn get_block(&self, cid: &Cid) -> Result<Bytes, BlockStoreError>;

    /// Store `bytes` under a CID the caller already computed. Storing a CID
    /// that is already present leaves the existing block untouched.
    async fn put_block_keyed(&self, cid: &Cid, bytes: Bytes) -> Result<(), BlockStoreError>;

    /// Hash `bytes`, derive its CID under `codec` and store it.
    async fn put_block(&self, bytes: Bytes, codec: u64) -> Result<Cid, BlockStoreError> {
        let cid = cid_for(codec, &bytes)?;
        self.put_block_keyed(&cid, bytes).await?;
        Ok(cid)
    }

    /// Fetch and decode a DAG-CBOR block
    async fn get_cbor<T: BlockEncoded + Send>(&self, cid: &Cid) -> Result<T, BlockStoreError>
    where
        Self: Sized,
    {
        let bytes = self.get_block(cid).await?;
        Ok(T::decode(&bytes)?)
    }

    /// Encode a value as DAG-CBOR and store it
    async fn put_cbor<T: BlockEncoded + Sync>(&self, value: &T) -> Result<Cid, BlockStoreError>
    where
        Self: Sized,
    {
        let bytes = value.encode()?;
        self.put_block(Bytes::from(bytes), LD_CBOR_CODEC).await
    }
}

#[async_trait]
impl<S: BlockStore + ?Sized> BlockStore for std::sync::Arc<S> {
    async fn has_block(&self, cid: &Cid) -> Result<bool, BlockStoreError> {
        (**self).has_block(cid).await
    }

    async fn get_block(&self, cid: &Cid) -> Result<Bytes, BlockStoreError> {
        (**self).get_block(cid).await
    }

    async fn put_block_keyed(&self, cid: &Cid, bytes: Bytes) -> Result<(), BlockStoreError> {
        (**self).put_block_keyed(cid, bytes).await
    }
}

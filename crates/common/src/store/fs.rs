use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use super::{BlockStore, BlockStoreError};
use crate::linked_data::{cid_to_string, Cid};

/// Block store backed by a directory on disk.
///
/// Each block is one file named by its base32 CID. Writes go to a
/// temporary file first and are renamed into place, so a reader never
/// observes a partially written block.
#[derive(Debug, Clone)]
pub struct FsBlockStore {
    root: PathBuf,
}

impl FsBlockStore {
    /// Open (and create if needed) a block directory
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BlockStoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::debug!("FsBlockStore::open at {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn block_path(&self, cid: &Cid) -> PathBuf {
        self.root.join(cid_to_string(cid))
    }
}

#[async_trait]
impl BlockStore for FsBlockStore {
    async fn has_block(&self, cid: &Cid) -> Result<bool, BlockStoreError> {
        Ok(tokio::fs::try_exists(self.block_path(cid)).await?)
    }

    async fn get_block(&self, cid: &Cid) -> Result<Bytes, BlockStoreError> {
        match tokio::fs::read(self.block_path(cid)).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlockStoreError::NotFound(*cid))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put_block_keyed(&self, cid: &Cid, bytes: Bytes) -> Result<(), BlockStoreError> {
        let path = self.block_path(cid);
        if tokio::fs::try_exists(&path).await? {
            return Ok(());
        }
        let mut nonce = [0u8; 8];
        getrandom::getrandom(&mut nonce)
            .map_err(|e| anyhow::anyhow!("failed to name temp block: {}", e))?;
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", cid_to_string(cid), hex::encode(nonce)));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!("FsBlockStore: wrote {} ({} bytes)", cid, bytes.len());
        Ok(())
    }
}

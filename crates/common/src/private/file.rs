use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::access_key::PrivateRef;
use super::metadata::{Metadata, NodeKind};
use super::node::{seal_revision, PrivateNodeContent, PrivateNodeHeader};
use super::FsError;
use crate::crypto::Secret;
use crate::forest::{Name, PrivateForest};
use crate::linked_data::{Cid, LD_RAW_CODEC};
use crate::rng::Randomness;
use crate::store::BlockStore;

/// Content up to this many bytes is kept inside the encrypted file node
pub const INLINE_LIMIT: usize = 1024;
/// Larger content is split into separately encrypted blocks of this size
pub const CHUNK_SIZE: usize = 256 * 1024;

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum FileContent {
    Inline {
        #[serde_as(as = "serde_with::Bytes")]
        data: Vec<u8>,
    },
    External {
        key: Secret,
        size: u64,
        chunks: Vec<Cid>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct FileNodeContent {
    header: PrivateNodeHeader,
    metadata: Metadata,
    content: FileContent,
}

/// An encrypted file
#[derive(Debug, Clone)]
pub struct PrivateFile {
    header: PrivateNodeHeader,
    metadata: Metadata,
    content: FileContent,
    persisted_as: Option<PrivateRef>,
}

impl PrivateFile {
    /// An empty file placed under `parent_name`
    pub fn new(parent_name: &Name, time: DateTime<Utc>, rng: &mut impl Randomness) -> Self {
        Self {
            header: PrivateNodeHeader::new(parent_name, rng),
            metadata: Metadata::new(NodeKind::File, time),
            content: FileContent::Inline { data: Vec::new() },
            persisted_as: None,
        }
    }

    /// A file holding `content`. Large content is chunked into the store
    /// right away.
    pub async fn with_content<S: BlockStore>(
        parent_name: &Name,
        time: DateTime<Utc>,
        content: Vec<u8>,
        store: &S,
        rng: &mut impl Randomness,
    ) -> Result<Self, FsError> {
        let mut file = Self::new(parent_name, time, rng);
        file.metadata.touch(time, content.len() as u64);
        file.content = Self::prepare_content(content, store).await?;
        Ok(file)
    }

    pub(crate) fn from_content(content: FileNodeContent, private_ref: PrivateRef) -> Self {
        Self {
            header: content.header,
            metadata: content.metadata,
            content: content.content,
            persisted_as: Some(private_ref),
        }
    }

    pub fn header(&self) -> &PrivateNodeHeader {
        &self.header
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn persisted_as(&self) -> Option<&PrivateRef> {
        self.persisted_as.as_ref()
    }

    pub fn size(&self) -> u64 {
        self.metadata.size
    }

    /// Replace the content, making this a new revision of the same file
    pub async fn set_content<S: BlockStore>(
        &mut self,
        content: Vec<u8>,
        time: DateTime<Utc>,
        store: &S,
    ) -> Result<(), FsError> {
        if self.persisted_as.take().is_some() {
            self.header.advance_ratchet();
        }
        self.metadata.touch(time, content.len() as u64);
        self.content = Self::prepare_content(content, store).await?;
        Ok(())
    }

    async fn prepare_content<S: BlockStore>(
        content: Vec<u8>,
        store: &S,
    ) -> Result<FileContent, FsError> {
        if content.len() <= INLINE_LIMIT {
            return Ok(FileContent::Inline { data: content });
        }
        let key = Secret::generate()?;
        let mut chunks = Vec::with_capacity(content.len().div_ceil(CHUNK_SIZE));
        for chunk in content.chunks(CHUNK_SIZE) {
            let ciphertext = key.encrypt(chunk)?;
            chunks.push(store.put_block(Bytes::from(ciphertext), LD_RAW_CODEC).await?);
        }
        tracing::debug!(
            "file: chunked {} bytes into {} blocks",
            content.len(),
            chunks.len()
        );
        Ok(FileContent::External {
            key,
            size: content.len() as u64,
            chunks,
        })
    }

    /// Decrypt and return the whole file
    pub async fn get_content<S: BlockStore>(&self, store: &S) -> Result<Vec<u8>, FsError> {
        match &self.content {
            FileContent::Inline { data } => Ok(data.clone()),
            FileContent::External { key, size, chunks } => {
                let mut out = Vec::with_capacity(*size as usize);
                for cid in chunks {
                    let ciphertext = store.get_block(cid).await?;
                    out.extend_from_slice(&key.decrypt(&ciphertext)?);
                }
                if out.len() as u64 != *size {
                    return Err(FsError::CorruptContent);
                }
                Ok(out)
            }
        }
    }

    pub(crate) async fn store<S: BlockStore>(
        &mut self,
        forest: &mut PrivateForest,
        store: &S,
    ) -> Result<PrivateRef, FsError> {
        if let Some(private_ref) = &self.persisted_as {
            return Ok(private_ref.clone());
        }
        let content = PrivateNodeContent::File(FileNodeContent {
            header: self.header.clone(),
            metadata: self.metadata.clone(),
            content: self.content.clone(),
        });
        let private_ref = seal_revision(&self.header, &content, forest, store).await?;
        self.persisted_as = Some(private_ref.clone());
        Ok(private_ref)
    }
}

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use super::access_key::{AccessKey, PrivateRef};
use super::directory::{DirectoryContent, PrivateDirectory};
use super::file::{FileNodeContent, PrivateFile};
use super::metadata::Metadata;
use super::ratchet::Ratchet;
use super::FsError;
use crate::forest::{Name, NameAccumulator, NameSegment, PrivateForest};
use crate::linked_data::{BlockEncoded, LD_RAW_CODEC};
use crate::rng::Randomness;
use crate::store::BlockStore;

/// Identity and revision state shared by every private node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateNodeHeader {
    inumber: NameSegment,
    ratchet: Ratchet,
    name: Name,
}

impl PrivateNodeHeader {
    /// A fresh header for a node placed under `parent_name`
    pub fn new(parent_name: &Name, rng: &mut impl Randomness) -> Self {
        let inumber = NameSegment::new(rng);
        Self {
            inumber,
            ratchet: Ratchet::new(rng),
            name: parent_name.with_segments_added(&[inumber]),
        }
    }

    pub fn inumber(&self) -> &NameSegment {
        &self.inumber
    }

    pub fn ratchet(&self) -> &Ratchet {
        &self.ratchet
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Forest label for the revision named by `ratchet`
    pub fn label_at(&self, ratchet: &Ratchet, forest: &PrivateForest) -> NameAccumulator {
        self.name
            .with_segments_added(&[ratchet.revision_segment()])
            .accumulate(forest)
    }

    /// Forest label for the current revision
    pub fn revision_label(&self, forest: &PrivateForest) -> NameAccumulator {
        self.label_at(&self.ratchet, forest)
    }

    pub(crate) fn advance_ratchet(&mut self) {
        self.ratchet.inc();
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) enum PrivateNodeContent {
    Directory(DirectoryContent),
    File(FileNodeContent),
}

impl BlockEncoded for PrivateNodeContent {}

/// Encrypt a node revision, put it in the store and file it in the forest.
pub(crate) async fn seal_revision<S: BlockStore>(
    header: &PrivateNodeHeader,
    content: &PrivateNodeContent,
    forest: &mut PrivateForest,
    store: &S,
) -> Result<PrivateRef, FsError> {
    let bytes = content.encode()?;
    let temporal_key = header.ratchet.temporal_key();
    let ciphertext = temporal_key.encrypt(&bytes)?;
    let content_cid = store
        .put_block(Bytes::from(ciphertext), LD_RAW_CODEC)
        .await?;
    let label = header.revision_label(forest);
    forest.put_encrypted(label, content_cid);
    Ok(PrivateRef {
        label,
        temporal_key,
        content_cid,
    })
}

#[derive(Debug, Clone)]
pub enum PrivateNode {
    File(PrivateFile),
    Dir(PrivateDirectory),
}

impl PrivateNode {
    pub fn header(&self) -> &PrivateNodeHeader {
        match self {
            PrivateNode::File(file) => file.header(),
            PrivateNode::Dir(dir) => dir.header(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            PrivateNode::File(file) => file.metadata(),
            PrivateNode::Dir(dir) => dir.metadata(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, PrivateNode::Dir(_))
    }

    pub fn as_dir(&self) -> Option<&PrivateDirectory> {
        match self {
            PrivateNode::Dir(dir) => Some(dir),
            PrivateNode::File(_) => None,
        }
    }

    pub fn into_dir(self) -> Option<PrivateDirectory> {
        match self {
            PrivateNode::Dir(dir) => Some(dir),
            PrivateNode::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&PrivateFile> {
        match self {
            PrivateNode::File(file) => Some(file),
            PrivateNode::Dir(_) => None,
        }
    }

    /// The ref this node was loaded from or last stored as, if it has not
    /// changed since.
    pub fn persisted_as(&self) -> Option<&PrivateRef> {
        match self {
            PrivateNode::File(file) => file.persisted_as(),
            PrivateNode::Dir(dir) => dir.persisted_as(),
        }
    }

    /// Store this node and any changed descendants.
    pub fn store<'a, S: BlockStore>(
        &'a mut self,
        forest: &'a mut PrivateForest,
        store: &'a S,
    ) -> BoxFuture<'a, Result<PrivateRef, FsError>> {
        async move {
            match self {
                PrivateNode::File(file) => file.store(forest, store).await,
                PrivateNode::Dir(dir) => dir.store(forest, store).await,
            }
        }
        .boxed()
    }

    /// Load the node revision an [`AccessKey`] points at.
    pub async fn load<S: BlockStore>(
        access_key: &AccessKey,
        forest: &PrivateForest,
        store: &S,
    ) -> Result<PrivateNode, FsError> {
        Self::from_private_ref(access_key.private_ref(), forest, store).await
    }

    pub(crate) async fn from_private_ref<S: BlockStore>(
        private_ref: &PrivateRef,
        forest: &PrivateForest,
        store: &S,
    ) -> Result<PrivateNode, FsError> {
        let filed = forest
            .get_encrypted(&private_ref.label)
            .is_some_and(|cids| cids.contains(&private_ref.content_cid));
        if !filed {
            return Err(FsError::RevisionNotFound(private_ref.label));
        }

        let ciphertext = store.get_block(&private_ref.content_cid).await?;
        let bytes = private_ref.temporal_key.decrypt(&ciphertext)?;
        let node = match PrivateNodeContent::decode(&bytes)? {
            PrivateNodeContent::Directory(content) => {
                PrivateNode::Dir(PrivateDirectory::from_content(content, private_ref.clone()))
            }
            PrivateNodeContent::File(content) => {
                PrivateNode::File(PrivateFile::from_content(content, private_ref.clone()))
            }
        };
        Ok(node)
    }

    /// Follow this node's ratchet forward to its newest stored revision.
    ///
    /// Probes successive revision labels until one is missing from the
    /// forest. If the newest label holds more than one CID (two writers
    /// stored from the same base), the greatest CID that decrypts wins.
    pub async fn search_latest<S: BlockStore>(
        &self,
        forest: &PrivateForest,
        store: &S,
    ) -> Result<PrivateNode, FsError> {
        let header = self.header();
        let mut ratchet = header.ratchet().clone();
        let mut steps = 0u64;
        loop {
            let next = ratchet.next();
            if !forest.has(&header.label_at(&next, forest)) {
                break;
            }
            ratchet = next;
            steps += 1;
        }
        if steps == 0 {
            return Ok(self.clone());
        }
        tracing::debug!(
            "search_latest: advanced {} revisions to counter {}",
            steps,
            ratchet.counter()
        );

        let label = header.label_at(&ratchet, forest);
        let temporal_key = ratchet.temporal_key();
        let cids = forest
            .get_encrypted(&label)
            .cloned()
            .ok_or(FsError::RevisionNotFound(label))?;

        let mut last_err = None;
        for cid in cids.iter().rev() {
            let private_ref = PrivateRef {
                label,
                temporal_key: temporal_key.clone(),
                content_cid: *cid,
            };
            match Self::from_private_ref(&private_ref, forest, store).await {
                Ok(node) => return Ok(node),
                Err(e) => {
                    tracing::debug!("search_latest: skipping {}: {}", cid, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or(FsError::RevisionNotFound(label)))
    }
}

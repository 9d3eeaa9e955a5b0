use std::borrow::Cow;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use super::access_key::{AccessKey, PrivateRef};
use super::file::PrivateFile;
use super::link::PrivateLink;
use super::metadata::{Metadata, NodeKind};
use super::node::{seal_revision, PrivateNode, PrivateNodeContent, PrivateNodeHeader};
use super::{display_path, parse_path, FsError};
use crate::forest::{Name, PrivateForest};
use crate::rng::Randomness;
use crate::store::BlockStore;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DirectoryContent {
    header: PrivateNodeHeader,
    metadata: Metadata,
    entries: BTreeMap<String, PrivateRef>,
}

/// An encrypted directory
///
/// Children are held as [`PrivateLink`]s and only loaded from the forest
/// when a walk reaches them.
#[derive(Debug, Clone)]
pub struct PrivateDirectory {
    header: PrivateNodeHeader,
    metadata: Metadata,
    entries: BTreeMap<String, PrivateLink>,
    persisted_as: Option<PrivateRef>,
}

impl PrivateDirectory {
    /// An empty, unstored directory placed under `parent_name`
    pub fn new(parent_name: &Name, time: DateTime<Utc>, rng: &mut impl Randomness) -> Self {
        Self {
            header: PrivateNodeHeader::new(parent_name, rng),
            metadata: Metadata::new(NodeKind::Directory, time),
            entries: BTreeMap::new(),
            persisted_as: None,
        }
    }

    /// An empty directory, already stored into a copy of `forest`
    pub async fn new_and_store<S: BlockStore>(
        parent_name: &Name,
        time: DateTime<Utc>,
        forest: &PrivateForest,
        store: &S,
        rng: &mut impl Randomness,
    ) -> Result<(Self, PrivateForest), FsError> {
        let mut dir = Self::new(parent_name, time, rng);
        let mut forest = forest.clone();
        dir.store(&mut forest, store).await?;
        Ok((dir, forest))
    }

    pub(crate) fn from_content(content: DirectoryContent, private_ref: PrivateRef) -> Self {
        Self {
            header: content.header,
            metadata: content.metadata,
            entries: content
                .entries
                .into_iter()
                .map(|(name, private_ref)| (name, PrivateLink::Stored(private_ref)))
                .collect(),
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

    /// Names of the direct children, in order
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mark this directory as changed. A persisted directory moves on to
    /// its next revision.
    fn begin_revision(&mut self, time: DateTime<Utc>) -> &mut Self {
        if self.persisted_as.take().is_some() {
            self.header.advance_ratchet();
        }
        self.metadata.modified = time;
        self
    }

    /// Store this directory and every changed descendant into `forest`.
    pub async fn store<S: BlockStore>(
        &mut self,
        forest: &mut PrivateForest,
        store: &S,
    ) -> Result<PrivateRef, FsError> {
        if let Some(private_ref) = &self.persisted_as {
            return Ok(private_ref.clone());
        }
        let mut entries = BTreeMap::new();
        for (name, link) in self.entries.iter_mut() {
            entries.insert(name.clone(), link.store(forest, store).await?);
        }
        self.metadata.size = entries.len() as u64;
        let content = PrivateNodeContent::Directory(DirectoryContent {
            header: self.header.clone(),
            metadata: self.metadata.clone(),
            entries,
        });
        let private_ref = seal_revision(&self.header, &content, forest, store).await?;
        tracing::debug!(
            "directory: stored revision {} as {}",
            self.header.ratchet().counter(),
            private_ref.content_cid
        );
        self.persisted_as = Some(private_ref.clone());
        Ok(private_ref)
    }

    /// Store the subtree and mint an [`AccessKey`] for its current revision.
    pub async fn store_as_node<S: BlockStore>(
        &mut self,
        forest: &PrivateForest,
        store: &S,
    ) -> Result<(AccessKey, PrivateForest), FsError> {
        let mut forest = forest.clone();
        let private_ref = self.store(&mut forest, store).await?;
        Ok((AccessKey::from(private_ref), forest))
    }

    async fn lookup_node<S: BlockStore>(
        &self,
        name: &str,
        forest: &PrivateForest,
        store: &S,
    ) -> Result<Option<PrivateNode>, FsError> {
        match self.entries.get(name) {
            Some(link) => Ok(Some(link.resolve_node(forest, store).await?)),
            None => Ok(None),
        }
    }

    async fn get_dir<'a, S: BlockStore>(
        &'a self,
        path: &[String],
        forest: &PrivateForest,
        store: &S,
    ) -> Result<Cow<'a, PrivateDirectory>, FsError> {
        let mut current = Cow::Borrowed(self);
        for (depth, segment) in path.iter().enumerate() {
            let at = &path[..=depth];
            let child = current
                .lookup_node(segment, forest, store)
                .await?
                .ok_or_else(|| FsError::NotFound(display_path(at)))?;
            match child {
                PrivateNode::Dir(dir) => current = Cow::Owned(dir),
                PrivateNode::File(_) => return Err(FsError::NotADirectory(display_path(at))),
            }
        }
        Ok(current)
    }

    async fn child_dir_mut<'a, S: BlockStore>(
        &'a mut self,
        at: &[String],
        create: bool,
        time: DateTime<Utc>,
        forest: &PrivateForest,
        store: &S,
        rng: &mut impl Randomness,
    ) -> Result<&'a mut PrivateDirectory, FsError> {
        let segment = &at[at.len() - 1];
        let parent_name = self.header.name().clone();
        match self.entries.entry(segment.clone()) {
            Entry::Occupied(entry) => match entry.into_mut().resolve_node_mut(forest, store).await? {
                PrivateNode::Dir(dir) => Ok(dir.begin_revision(time)),
                PrivateNode::File(_) => Err(FsError::NotADirectory(display_path(at))),
            },
            Entry::Vacant(entry) if create => {
                let dir = PrivateDirectory::new(&parent_name, time, rng);
                match entry.insert(PrivateLink::Loaded(PrivateNode::Dir(dir))) {
                    PrivateLink::Loaded(PrivateNode::Dir(dir)) => Ok(dir),
                    _ => unreachable!("a directory was just inserted"),
                }
            }
            Entry::Vacant(_) => Err(FsError::NotFound(display_path(at))),
        }
    }

    /// Walk `path` for mutation, marking every directory on the way as
    /// changed.
    async fn get_dir_mut<'a, S: BlockStore>(
        &'a mut self,
        path: &[String],
        create_intermediate: bool,
        time: DateTime<Utc>,
        forest: &PrivateForest,
        store: &S,
        rng: &mut impl Randomness,
    ) -> Result<&'a mut PrivateDirectory, FsError> {
        let mut dir = self.begin_revision(time);
        for depth in 0..path.len() {
            dir = dir
                .child_dir_mut(
                    &path[..=depth],
                    create_intermediate,
                    time,
                    forest,
                    store,
                    rng,
                )
                .await?;
        }
        Ok(dir)
    }

    /// Create the directory at `path`.
    ///
    /// Succeeds without change if it already exists. Missing intermediate
    /// directories are created only when `create_intermediate` is set.
    pub async fn mkdir<P: AsRef<str>, S: BlockStore>(
        &self,
        path: &[P],
        create_intermediate: bool,
        time: DateTime<Utc>,
        forest: &PrivateForest,
        store: &S,
        rng: &mut impl Randomness,
    ) -> Result<(PrivateDirectory, PrivateForest), FsError> {
        let path = parse_path(path)?;
        if path.is_empty() {
            return Err(FsError::EmptyPath);
        }
        let conflict = |e| match e {
            FsError::NotADirectory(at) => FsError::PathConflict(at),
            e => e,
        };

        let mut root = self.clone();
        let parent = root
            .get_dir_mut(
                &path[..path.len() - 1],
                create_intermediate,
                time,
                forest,
                store,
                rng,
            )
            .await
            .map_err(conflict)?;
        parent
            .child_dir_mut(&path, true, time, forest, store, rng)
            .await
            .map_err(conflict)?;

        let mut forest = forest.clone();
        root.store(&mut forest, store).await?;
        Ok((root, forest))
    }

    /// Write `content` to the file at `path`, creating it or replacing its
    /// content with a new revision.
    #[allow(clippy::too_many_arguments)]
    pub async fn write<P: AsRef<str>, S: BlockStore>(
        &self,
        path: &[P],
        create_intermediate: bool,
        content: Vec<u8>,
        time: DateTime<Utc>,
        forest: &PrivateForest,
        store: &S,
        rng: &mut impl Randomness,
    ) -> Result<(PrivateDirectory, PrivateForest), FsError> {
        let path = parse_path(path)?;
        let Some((name, parents)) = path.split_last() else {
            return Err(FsError::EmptyPath);
        };

        let mut root = self.clone();
        let parent = root
            .get_dir_mut(parents, create_intermediate, time, forest, store, rng)
            .await?;
        let parent_name = parent.header.name().clone();
        match parent.entries.entry(name.clone()) {
            Entry::Occupied(entry) => match entry.into_mut().resolve_node_mut(forest, store).await? {
                PrivateNode::File(file) => file.set_content(content, time, store).await?,
                PrivateNode::Dir(_) => return Err(FsError::PathConflict(display_path(&path))),
            },
            Entry::Vacant(entry) => {
                let file =
                    PrivateFile::with_content(&parent_name, time, content, store, rng).await?;
                entry.insert(PrivateLink::Loaded(PrivateNode::File(file)));
            }
        }

        let mut forest = forest.clone();
        root.store(&mut forest, store).await?;
        Ok((root, forest))
    }

    /// Remove the file or directory at `path`
    pub async fn rm<P: AsRef<str>, S: BlockStore>(
        &self,
        path: &[P],
        time: DateTime<Utc>,
        forest: &PrivateForest,
        store: &S,
        rng: &mut impl Randomness,
    ) -> Result<(PrivateDirectory, PrivateForest), FsError> {
        let path = parse_path(path)?;
        let Some((name, parents)) = path.split_last() else {
            return Err(FsError::EmptyPath);
        };

        let mut root = self.clone();
        let parent = root
            .get_dir_mut(parents, false, time, forest, store, rng)
            .await?;
        if parent.entries.remove(name).is_none() {
            return Err(FsError::NotFound(display_path(&path)));
        }

        let mut forest = forest.clone();
        root.store(&mut forest, store).await?;
        Ok((root, forest))
    }

    /// List the directory at `path`.
    ///
    /// With `recursive`, descendants are included depth-first with names
    /// joined by `/`, relative to `path`.
    pub async fn ls<P: AsRef<str>, S: BlockStore>(
        &self,
        path: &[P],
        recursive: bool,
        forest: &PrivateForest,
        store: &S,
    ) -> Result<Vec<(String, Metadata)>, FsError> {
        let path = parse_path(path)?;
        let dir = self.get_dir(&path, forest, store).await?;
        let mut out = Vec::with_capacity(dir.len());
        dir.list_into(String::new(), recursive, forest, store, &mut out)
            .await?;
        Ok(out)
    }

    fn list_into<'a, S: BlockStore>(
        &'a self,
        prefix: String,
        recursive: bool,
        forest: &'a PrivateForest,
        store: &'a S,
        out: &'a mut Vec<(String, Metadata)>,
    ) -> BoxFuture<'a, Result<(), FsError>> {
        async move {
            for (name, link) in &self.entries {
                let node = link.resolve_node(forest, store).await?;
                let full = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}/{}", prefix, name)
                };
                out.push((full.clone(), node.metadata().clone()));
                if let (true, PrivateNode::Dir(dir)) = (recursive, &node) {
                    dir.list_into(full, true, forest, store, out).await?;
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// Read the whole file at `path`
    pub async fn read<P: AsRef<str>, S: BlockStore>(
        &self,
        path: &[P],
        forest: &PrivateForest,
        store: &S,
    ) -> Result<Vec<u8>, FsError> {
        let path = parse_path(path)?;
        let Some((name, parents)) = path.split_last() else {
            return Err(FsError::EmptyPath);
        };
        let dir = self.get_dir(parents, forest, store).await?;
        match dir.lookup_node(name, forest, store).await? {
            Some(PrivateNode::File(file)) => file.get_content(store).await,
            Some(PrivateNode::Dir(_)) => Err(FsError::NotAFile(display_path(&path))),
            None => Err(FsError::NotFound(display_path(&path))),
        }
    }
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;

    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryBlockStore;

    struct Fixture {
        store: MemoryBlockStore,
        rng: rand::rngs::StdRng,
        forest: PrivateForest,
        root: PrivateDirectory,
    }

    fn fixture() -> Fixture {
        let mut rng = rand::rngs::StdRng::seed_from_u64(21);
        let forest = PrivateForest::new(&mut rng);
        let root = PrivateDirectory::new(&forest.empty_name(), Utc::now(), &mut rng);
        Fixture {
            store: MemoryBlockStore::new(),
            rng,
            forest,
            root,
        }
    }

    #[tokio::test]
    async fn test_begin_revision_only_advances_persisted() {
        let mut f = fixture();
        let counter = f.root.header().ratchet().counter();
        f.root.begin_revision(Utc::now());
        assert_eq!(f.root.header().ratchet().counter(), counter);

        f.root.store(&mut f.forest, &f.store).await.unwrap();
        f.root.begin_revision(Utc::now());
        assert_eq!(f.root.header().ratchet().counter(), counter + 1);
        assert!(f.root.persisted_as().is_none());
    }

    #[tokio::test]
    async fn test_mkdir_without_intermediate() {
        let mut f = fixture();
        let err = f
            .root
            .mkdir(&["a", "b"], false, Utc::now(), &f.forest, &f.store, &mut f.rng)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let (root, forest) = f
            .root
            .mkdir(&["a"], false, Utc::now(), &f.forest, &f.store, &mut f.rng)
            .await
            .unwrap();
        let (root, forest) = root
            .mkdir(&["a", "b"], false, Utc::now(), &forest, &f.store, &mut f.rng)
            .await
            .unwrap();
        let listing = root.ls(&["a"], false, &forest, &f.store).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].0, "b");
        assert!(listing[0].1.is_dir());
    }

    #[tokio::test]
    async fn test_invalid_segments_rejected() {
        let mut f = fixture();
        for path in [vec![""], vec!["a/b"]] {
            let err = f
                .root
                .mkdir(&path, true, Utc::now(), &f.forest, &f.store, &mut f.rng)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input);
        }
        let empty: [&str; 0] = [];
        let err = f
            .root
            .write(&empty, true, vec![1], Utc::now(), &f.forest, &f.store, &mut f.rng)
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::EmptyPath));
    }

    #[tokio::test]
    async fn test_children_reload_lazily() {
        let mut f = fixture();
        let (root, forest) = f
            .root
            .write(
                &["docs", "note.txt"],
                true,
                b"hello".to_vec(),
                Utc::now(),
                &f.forest,
                &f.store,
                &mut f.rng,
            )
            .await
            .unwrap();
        let private_ref = root.persisted_as().unwrap().clone();
        let loaded = PrivateNode::from_private_ref(&private_ref, &forest, &f.store)
            .await
            .unwrap()
            .into_dir()
            .unwrap();
        assert!(matches!(
            loaded.entries.get("docs"),
            Some(PrivateLink::Stored(_))
        ));
        let content = loaded
            .read(&["docs", "note.txt"], &forest, &f.store)
            .await
            .unwrap();
        assert_eq!(content, b"hello");
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::name::{Name, NameAccumulator};
use crate::crypto::MODULUS_SIZE;
use crate::error::ErrorKind;
use crate::linked_data::{BlockEncoded, Cid};
use crate::rng::Randomness;
use crate::store::{BlockStore, BlockStoreError};

const NAMESPACE_CONTEXT: &str = "sigvault 2024-06 forest namespace v1";
const FOREST_VERSION: &str = "sigvault/forest/v1";

#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    #[error("forest root not found: {0}")]
    NotFound(Cid),
    #[error("forest store error: {0}")]
    Store(BlockStoreError),
    #[error("malformed forest root: {0}")]
    Corrupt(String),
    #[error("cannot merge forests with different namespaces")]
    NamespaceMismatch,
}

impl From<BlockStoreError> for ForestError {
    fn from(e: BlockStoreError) -> Self {
        match e {
            BlockStoreError::NotFound(cid) => ForestError::NotFound(cid),
            BlockStoreError::Codec(e) => ForestError::Corrupt(e.to_string()),
            e => ForestError::Store(e),
        }
    }
}

impl ForestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForestError::NotFound(_) => ErrorKind::NotFound,
            ForestError::Store(e) => e.kind(),
            ForestError::Corrupt(_) => ErrorKind::CorruptData,
            ForestError::NamespaceMismatch => ErrorKind::Input,
        }
    }
}

/// Material the forest's labels are keyed under.
///
/// When created for an owner, the owner's public modulus is mixed in
/// alongside a random generator, so labels are scoped both to the owner and
/// to this particular forest.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    #[serde_as(as = "Option<serde_with::Bytes>")]
    modulus: Option<[u8; MODULUS_SIZE]>,
    #[serde_as(as = "serde_with::Bytes")]
    generator: [u8; 32],
}

impl Namespace {
    fn key(&self) -> [u8; 32] {
        let mut material = Vec::with_capacity(MODULUS_SIZE + 33);
        match &self.modulus {
            Some(modulus) => {
                material.push(1);
                material.extend_from_slice(modulus);
            }
            None => material.push(0),
        }
        material.extend_from_slice(&self.generator);
        blake3::derive_key(NAMESPACE_CONTEXT, &material)
    }

    pub fn modulus(&self) -> Option<&[u8; MODULUS_SIZE]> {
        self.modulus.as_ref()
    }
}

/// Persistent, copy-on-write map from labels to encrypted block CIDs
///
/// Cloning is cheap: clones share the index until one of them is written
/// to, at which point only the writer gets a fresh copy. A forest value
/// never changes once another holder has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateForest {
    namespace: Namespace,
    key: [u8; 32],
    entries: Arc<BTreeMap<NameAccumulator, BTreeSet<Cid>>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ForestEntry {
    label: NameAccumulator,
    cids: Vec<Cid>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ForestRoot {
    version: String,
    namespace: Namespace,
    entries: Vec<ForestEntry>,
}

impl BlockEncoded for ForestRoot {}

impl PrivateForest {
    /// A forest with a purely random namespace
    pub fn new(rng: &mut impl Randomness) -> Self {
        Self::from_namespace(Namespace {
            modulus: None,
            generator: rng.random_bytes(),
        })
    }

    /// A forest whose namespace is seeded with an owner's public modulus
    pub fn new_with_modulus(rng: &mut impl Randomness, modulus: [u8; MODULUS_SIZE]) -> Self {
        Self::from_namespace(Namespace {
            modulus: Some(modulus),
            generator: rng.random_bytes(),
        })
    }

    fn from_namespace(namespace: Namespace) -> Self {
        let key = namespace.key();
        Self {
            namespace,
            key,
            entries: Arc::new(BTreeMap::new()),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The root name every directory tree in this forest hangs off
    pub fn empty_name(&self) -> Name {
        Name::default()
    }

    /// Hash a name into this forest's label space
    pub fn accumulate(&self, name: &Name) -> NameAccumulator {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(&(name.segments().len() as u64).to_be_bytes());
        for segment in name.segments() {
            hasher.update(segment.as_bytes());
        }
        NameAccumulator::from_bytes(*hasher.finalize().as_bytes())
    }

    pub fn has(&self, label: &NameAccumulator) -> bool {
        self.entries.contains_key(label)
    }

    /// CIDs stored under `label`, in ascending CID order
    pub fn get_encrypted(&self, label: &NameAccumulator) -> Option<&BTreeSet<Cid>> {
        self.entries.get(label)
    }

    /// Add `cid` under `label`. Other clones of this forest are unaffected.
    pub fn put_encrypted(&mut self, label: NameAccumulator, cid: Cid) {
        tracing::debug!("forest: put {:?} -> {}", label, cid);
        Arc::make_mut(&mut self.entries)
            .entry(label)
            .or_default()
            .insert(cid);
    }

    /// Union of two forests sharing a namespace
    pub fn merge(&self, other: &PrivateForest) -> Result<PrivateForest, ForestError> {
        if self.namespace != other.namespace {
            return Err(ForestError::NamespaceMismatch);
        }
        let mut merged = self.clone();
        for (label, cids) in other.entries.iter() {
            for cid in cids {
                if !merged.get_encrypted(label).is_some_and(|c| c.contains(cid)) {
                    merged.put_encrypted(*label, *cid);
                }
            }
        }
        Ok(merged)
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the forest root as a DAG-CBOR block
    pub async fn store(&self, store: &impl BlockStore) -> Result<Cid, ForestError> {
        let root = ForestRoot {
            version: FOREST_VERSION.to_string(),
            namespace: self.namespace.clone(),
            entries: self
                .entries
                .iter()
                .map(|(label, cids)| ForestEntry {
                    label: *label,
                    cids: cids.iter().copied().collect(),
                })
                .collect(),
        };
        let cid = store.put_cbor(&root).await?;
        tracing::debug!("forest: stored {} labels as {}", self.len(), cid);
        Ok(cid)
    }

    /// Load a forest persisted with [`PrivateForest::store`]
    pub async fn load(cid: &Cid, store: &impl BlockStore) -> Result<Self, ForestError> {
        let root: ForestRoot = store.get_cbor(cid).await?;
        if root.version != FOREST_VERSION {
            return Err(ForestError::Corrupt(format!(
                "unsupported forest version {:?}",
                root.version
            )));
        }
        let mut entries = BTreeMap::new();
        for entry in root.entries {
            entries
                .entry(entry.label)
                .or_insert_with(BTreeSet::new)
                .extend(entry.cids);
        }
        let mut forest = Self::from_namespace(root.namespace);
        forest.entries = Arc::new(entries);
        Ok(forest)
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use rand::SeedableRng;

    use super::*;
    use crate::error::ErrorKind;
    use crate::forest::NameSegment;
    use crate::linked_data::{cid_for, LD_CBOR_CODEC, LD_RAW_CODEC};
    use crate::store::MemoryBlockStore;

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(42)
    }

    fn label(forest: &PrivateForest, tag: &[u8]) -> NameAccumulator {
        let name = forest
            .empty_name()
            .with_segments_added(&[NameSegment::new_hashed("test", &[tag])]);
        forest.accumulate(&name)
    }

    #[test]
    fn test_put_is_copy_on_write() {
        let forest = PrivateForest::new(&mut rng());
        let cid = cid_for(LD_RAW_CODEC, b"node").unwrap();
        let l = label(&forest, b"a");

        let mut next = forest.clone();
        next.put_encrypted(l, cid);

        assert!(next.has(&l));
        assert!(!forest.has(&l));
        assert_eq!(forest.len(), 0);
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn test_namespace_scopes_labels() {
        let mut rng = rng();
        let a = PrivateForest::new_with_modulus(&mut rng, [1u8; MODULUS_SIZE]);
        let b = PrivateForest::new_with_modulus(&mut rng, [1u8; MODULUS_SIZE]);
        assert_ne!(label(&a, b"x"), label(&b, b"x"));
        assert_eq!(label(&a, b"x"), label(&a.clone(), b"x"));
    }

    #[test]
    fn test_merge() {
        let forest = PrivateForest::new(&mut rng());
        let mut left = forest.clone();
        let mut right = forest.clone();
        left.put_encrypted(label(&forest, b"l"), cid_for(LD_RAW_CODEC, b"l").unwrap());
        right.put_encrypted(label(&forest, b"r"), cid_for(LD_RAW_CODEC, b"r").unwrap());
        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.len(), 2);

        let foreign = PrivateForest::new(&mut rand::rngs::StdRng::seed_from_u64(9));
        let err = merged.merge(&foreign).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[tokio::test]
    async fn test_store_load_roundtrip() {
        let store = MemoryBlockStore::new();
        let mut forest = PrivateForest::new_with_modulus(&mut rng(), [7u8; MODULUS_SIZE]);
        let l = label(&forest, b"a");
        forest.put_encrypted(l, cid_for(LD_RAW_CODEC, b"one").unwrap());
        forest.put_encrypted(l, cid_for(LD_RAW_CODEC, b"two").unwrap());

        let cid = forest.store(&store).await.unwrap();
        let loaded = PrivateForest::load(&cid, &store).await.unwrap();
        assert_eq!(loaded, forest);
        assert_eq!(loaded.get_encrypted(&l).unwrap().len(), 2);
        assert_eq!(loaded.accumulate(&Name::default()), forest.accumulate(&Name::default()));
    }

    #[tokio::test]
    async fn test_load_missing_and_corrupt() {
        let store = MemoryBlockStore::new();
        let missing = cid_for(LD_CBOR_CODEC, b"nope").unwrap();
        let err = PrivateForest::load(&missing, &store).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let garbage = store
            .put_block(Bytes::from_static(b"\xff\x00garbage"), LD_CBOR_CODEC)
            .await
            .unwrap();
        let err = PrivateForest::load(&garbage, &store).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }
}

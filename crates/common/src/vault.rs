//! Session context tying keys, forest and root directory together
//!
//! A [`Vault`] is created at session start from a signature and a block
//! store, and is the only thing that holds the derived keys. Mutations go
//! through `&mut self`, so one vault is one writer for its lineage.

use std::fmt;
use std::ops::Range;

use chrono::Utc;
use rand::rngs::StdRng;

use crate::crypto::{derive_seed, ExchangeKey, KeyError, KeyPair, Seed};
use crate::error::ErrorKind;
use crate::forest::{ForestError, PrivateForest};
use crate::linked_data::Cid;
use crate::private::{AccessKey, FsError, Metadata, PrivateDirectory};
use crate::rng::os_rng;
use crate::share::{
    create_share_name, find_latest_share_counter, receive_share, share, ExchangeRoot, ShareError,
};
use crate::store::{BlockStore, BlockStoreError};

/// Counters probed when recovering, unless overridden
pub const DEFAULT_SCAN_WINDOW: Range<u64> = 0..1000;

/// The step of a session pipeline that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultOp {
    KeyDerivation,
    ForestCreation,
    ForestLoad,
    Mutation,
    Read,
    AccessKeyMint,
    SharePublish,
    ShareRecovery,
}

impl fmt::Display for VaultOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VaultOp::KeyDerivation => "key derivation",
            VaultOp::ForestCreation => "forest creation",
            VaultOp::ForestLoad => "forest load",
            VaultOp::Mutation => "directory mutation",
            VaultOp::Read => "directory read",
            VaultOp::AccessKeyMint => "access key mint",
            VaultOp::SharePublish => "share publish",
            VaultOp::ShareRecovery => "share recovery",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VaultCause {
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error(transparent)]
    Forest(#[from] ForestError),
    #[error(transparent)]
    Share(#[from] ShareError),
    #[error(transparent)]
    Store(#[from] BlockStoreError),
    #[error("invalid scan window {0:?}")]
    ScanWindow(Range<u64>),
    #[error("recovered node is not a directory")]
    NotADirectory,
}

impl VaultCause {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultCause::Key(e) => e.kind(),
            VaultCause::Fs(e) => e.kind(),
            VaultCause::Forest(e) => e.kind(),
            VaultCause::Share(e) => e.kind(),
            VaultCause::Store(e) => e.kind(),
            VaultCause::ScanWindow(_) => ErrorKind::Input,
            VaultCause::NotADirectory => ErrorKind::CorruptData,
        }
    }
}

/// A failed session operation, with the step it failed in
#[derive(Debug, thiserror::Error)]
#[error("{op} failed: {cause}")]
pub struct VaultError {
    pub op: VaultOp,
    #[source]
    pub cause: VaultCause,
}

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }
}

trait During<T> {
    fn during(self, op: VaultOp) -> Result<T, VaultError>;
}

impl<T, E: Into<VaultCause>> During<T> for Result<T, E> {
    fn during(self, op: VaultOp) -> Result<T, VaultError> {
        self.map_err(|e| VaultError {
            op,
            cause: e.into(),
        })
    }
}

/// One owner's session over a block store
pub struct Vault<S: BlockStore> {
    store: S,
    seed: Seed,
    keypair: KeyPair,
    identity: String,
    rng: StdRng,
    forest: PrivateForest,
    root: PrivateDirectory,
    scan: Range<u64>,
}

impl<S: BlockStore> fmt::Debug for Vault<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("identity", &self.identity)
            .field("forest_labels", &self.forest.len())
            .field("scan", &self.scan)
            .finish_non_exhaustive()
    }
}

impl<S: BlockStore> Vault<S> {
    fn derive(signature: &str) -> Result<(Seed, KeyPair, String), VaultError> {
        let seed = derive_seed(signature).during(VaultOp::KeyDerivation)?;
        let keypair = KeyPair::derive(&seed);
        let identity = seed.root_identity();
        Ok((seed, keypair, identity))
    }

    /// Create a fresh vault: a new forest seeded with the owner's modulus,
    /// an empty root directory, and a share of that root at counter 0 to
    /// the owner's key published under `device_label`.
    ///
    /// Returns the vault together with the CID of the stored forest.
    pub async fn init(
        signature: &str,
        device_label: &str,
        store: S,
    ) -> Result<(Self, Cid), VaultError> {
        let (seed, keypair, identity) = Self::derive(signature)?;
        let mut rng = os_rng();

        let forest = PrivateForest::new_with_modulus(&mut rng, keypair.exchange_key().modulus());
        let mut root = PrivateDirectory::new(&forest.empty_name(), Utc::now(), &mut rng);
        let (access_key, forest) = root
            .store_as_node(&forest, &store)
            .await
            .during(VaultOp::ForestCreation)?;

        let exchange_root = ExchangeRoot::publish(device_label, keypair.exchange_key(), &store)
            .await
            .during(VaultOp::SharePublish)?;
        let forest = share(&access_key, 0, &identity, &exchange_root, &forest, &store)
            .await
            .during(VaultOp::SharePublish)?;
        let forest_cid = forest.store(&store).await.during(VaultOp::ForestCreation)?;

        tracing::info!("vault: initialized for identity {}..", &identity[..8]);
        let vault = Self {
            store,
            seed,
            keypair,
            identity,
            rng,
            forest,
            root,
            scan: DEFAULT_SCAN_WINDOW,
        };
        Ok((vault, forest_cid))
    }

    /// Rebuild a vault from the signature and a persisted forest CID
    pub async fn reload(signature: &str, store: S, forest_cid: &Cid) -> Result<Self, VaultError> {
        Self::reload_within(signature, store, forest_cid, DEFAULT_SCAN_WINDOW).await
    }

    /// [`Vault::reload`] with a custom counter window
    pub async fn reload_within(
        signature: &str,
        store: S,
        forest_cid: &Cid,
        scan: Range<u64>,
    ) -> Result<Self, VaultError> {
        if scan.is_empty() {
            return Err(VaultError {
                op: VaultOp::ShareRecovery,
                cause: VaultCause::ScanWindow(scan),
            });
        }
        let (seed, keypair, identity) = Self::derive(signature)?;
        let forest = PrivateForest::load(forest_cid, &store)
            .await
            .during(VaultOp::ForestLoad)?;

        let modulus = keypair.exchange_key().modulus();
        let counter =
            find_latest_share_counter(scan.start, scan.end, &modulus, &identity, &forest, &store)
                .await
                .ok_or(ShareError::NotFound)
                .during(VaultOp::ShareRecovery)?;
        let name = create_share_name(counter, &identity, &modulus, &forest);
        let node = receive_share(&name, keypair.private_key(), &forest, &store)
            .await
            .during(VaultOp::ShareRecovery)?;
        let root = node
            .search_latest(&forest, &store)
            .await
            .during(VaultOp::ShareRecovery)?
            .into_dir()
            .ok_or(VaultCause::NotADirectory)
            .during(VaultOp::ShareRecovery)?;

        tracing::info!(
            "vault: recovered share {} at root revision {}",
            counter,
            root.header().ratchet().counter()
        );
        Ok(Self {
            store,
            seed,
            keypair,
            identity,
            rng: os_rng(),
            forest,
            root,
            scan,
        })
    }

    /// Bound later counter scans to `min..max`
    pub fn with_scan_window(mut self, min: u64, max: u64) -> Self {
        self.scan = min..max;
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn exchange_key(&self) -> &ExchangeKey {
        self.keypair.exchange_key()
    }

    pub fn forest(&self) -> &PrivateForest {
        &self.forest
    }

    pub fn root(&self) -> &PrivateDirectory {
        &self.root
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn mkdir<P: AsRef<str>>(
        &mut self,
        path: &[P],
        create_intermediate: bool,
    ) -> Result<(), VaultError> {
        let (root, forest) = self
            .root
            .mkdir(
                path,
                create_intermediate,
                Utc::now(),
                &self.forest,
                &self.store,
                &mut self.rng,
            )
            .await
            .during(VaultOp::Mutation)?;
        self.root = root;
        self.forest = forest;
        Ok(())
    }

    pub async fn write<P: AsRef<str>>(
        &mut self,
        path: &[P],
        create_intermediate: bool,
        content: Vec<u8>,
    ) -> Result<(), VaultError> {
        let (root, forest) = self
            .root
            .write(
                path,
                create_intermediate,
                content,
                Utc::now(),
                &self.forest,
                &self.store,
                &mut self.rng,
            )
            .await
            .during(VaultOp::Mutation)?;
        self.root = root;
        self.forest = forest;
        Ok(())
    }

    pub async fn rm<P: AsRef<str>>(&mut self, path: &[P]) -> Result<(), VaultError> {
        let (root, forest) = self
            .root
            .rm(path, Utc::now(), &self.forest, &self.store, &mut self.rng)
            .await
            .during(VaultOp::Mutation)?;
        self.root = root;
        self.forest = forest;
        Ok(())
    }

    pub async fn ls<P: AsRef<str>>(
        &self,
        path: &[P],
        recursive: bool,
    ) -> Result<Vec<(String, Metadata)>, VaultError> {
        self.root
            .ls(path, recursive, &self.forest, &self.store)
            .await
            .during(VaultOp::Read)
    }

    pub async fn read<P: AsRef<str>>(&self, path: &[P]) -> Result<Vec<u8>, VaultError> {
        self.root
            .read(path, &self.forest, &self.store)
            .await
            .during(VaultOp::Read)
    }

    /// Persist the forest root and return its CID
    pub async fn commit(&self) -> Result<Cid, VaultError> {
        let cid = self
            .forest
            .store(&self.store)
            .await
            .during(VaultOp::ForestCreation)?;
        tracing::info!("vault: committed forest {}", cid);
        Ok(cid)
    }

    /// Store the root, mint an access key for it and persist the forest
    pub async fn store_root(&mut self) -> Result<(AccessKey, Cid), VaultError> {
        let (access_key, forest) = self
            .root
            .store_as_node(&self.forest, &self.store)
            .await
            .during(VaultOp::AccessKeyMint)?;
        self.forest = forest;
        let cid = self.commit().await?;
        Ok((access_key, cid))
    }

    /// Share the current root with `recipient_identity` through every key
    /// in an exchange root, at the next counter unused by any of those keys,
    /// and commit. Returns that counter.
    ///
    /// Fails with [`VaultCause::ScanWindow`] once the next counter would
    /// fall outside the scan window.
    pub async fn share_root_with(
        &mut self,
        exchange_root_cid: &Cid,
        recipient_identity: &str,
    ) -> Result<u64, VaultError> {
        let keys = ExchangeRoot::load(exchange_root_cid, &self.store)
            .await
            .during(VaultOp::SharePublish)?
            .exchange_keys(&self.store)
            .await
            .during(VaultOp::SharePublish)?;

        let mut counter = self.scan.start;
        for (_, key) in &keys {
            let latest = find_latest_share_counter(
                self.scan.start,
                self.scan.end,
                &key.modulus(),
                recipient_identity,
                &self.forest,
                &self.store,
            )
            .await;
            if let Some(latest) = latest {
                counter = counter.max(latest + 1);
            }
        }
        if counter >= self.scan.end {
            return Err(VaultError {
                op: VaultOp::SharePublish,
                cause: VaultCause::ScanWindow(self.scan.clone()),
            });
        }

        let (access_key, _) = self.store_root().await?;
        self.forest = share(
            &access_key,
            counter,
            recipient_identity,
            exchange_root_cid,
            &self.forest,
            &self.store,
        )
        .await
        .during(VaultOp::SharePublish)?;
        self.commit().await?;
        tracing::info!("vault: shared root at counter {}", counter);
        Ok(counter)
    }
}

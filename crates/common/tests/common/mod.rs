//! Shared test utilities for private forest integration tests
#![allow(dead_code)]

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

use common::crypto::{derive_seed, KeyPair};
use common::forest::PrivateForest;
use common::private::{Metadata, PrivateDirectory};
use common::store::FsBlockStore;

/// Everything a forest test needs: an empty root in a fresh forest over a
/// filesystem block store.
pub struct TestEnv {
    pub root: PrivateDirectory,
    pub forest: PrivateForest,
    pub store: FsBlockStore,
    pub rng: StdRng,
    _temp: TempDir,
}

/// Set up a test environment with a new root directory, forest and block store
pub async fn setup_test_env() -> TestEnv {
    let temp_dir = TempDir::new().unwrap();
    let store = FsBlockStore::open(temp_dir.path().join("blocks"))
        .await
        .unwrap();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let forest = PrivateForest::new(&mut rng);
    let root = PrivateDirectory::new(&forest.empty_name(), Utc::now(), &mut rng);

    TestEnv {
        root,
        forest,
        store,
        rng,
        _temp: temp_dir,
    }
}

/// Derive the keypair and root identity for a signature
pub fn identity(signature: &str) -> (KeyPair, String) {
    let seed = derive_seed(signature).unwrap();
    (KeyPair::derive(&seed), seed.root_identity())
}

/// Just the names from a listing
pub fn names(listing: &[(String, Metadata)]) -> Vec<&str> {
    listing.iter().map(|(name, _)| name.as_str()).collect()
}

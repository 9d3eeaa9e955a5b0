//! Integration tests for sharing and recovering access keys

mod common;

use std::collections::HashSet;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use ::common::error::ErrorKind;
use ::common::forest::PrivateForest;
use ::common::linked_data::Cid;
use ::common::store::{BlockStore, BlockStoreError, FsBlockStore};
use ::common::private::AccessKey;
use ::common::share::{
    create_share_name, find_latest_share_counter, receive_share, share, ExchangeRoot,
    DEFAULT_DEVICE_LABEL,
};

#[tokio::test]
async fn test_share_and_receive() {
    let mut env = common::setup_test_env().await;
    let (keys, identity) = common::identity("sig-A");

    let (mut root, forest) = env
        .root
        .write(
            &["pictures", "cats", "tabby.png"],
            true,
            vec![1, 2, 3, 4, 5],
            Utc::now(),
            &env.forest,
            &env.store,
            &mut env.rng,
        )
        .await
        .unwrap();
    let (access_key, forest) = root.store_as_node(&forest, &env.store).await.unwrap();

    let exchange_root = ExchangeRoot::publish(DEFAULT_DEVICE_LABEL, keys.exchange_key(), &env.store)
        .await
        .unwrap();
    let forest = share(&access_key, 0, &identity, &exchange_root, &forest, &env.store)
        .await
        .unwrap();

    let modulus = keys.exchange_key().modulus();
    let counter =
        find_latest_share_counter(0, 10, &modulus, &identity, &forest, &env.store).await;
    assert_eq!(counter, Some(0));

    let name = create_share_name(0, &identity, &modulus, &forest);
    let node = receive_share(&name, keys.private_key(), &forest, &env.store)
        .await
        .unwrap();
    let dir = node.into_dir().unwrap();
    let data = dir
        .read(&["pictures", "cats", "tabby.png"], &forest, &env.store)
        .await
        .unwrap();
    assert_eq!(data, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_latest_counter_wins() {
    let mut env = common::setup_test_env().await;
    let (keys, identity) = common::identity("sig-A");
    let exchange_root = ExchangeRoot::publish(DEFAULT_DEVICE_LABEL, keys.exchange_key(), &env.store)
        .await
        .unwrap();

    let mut forest = env.forest.clone();
    let mut root = env.root.clone();
    for (counter, file) in ["one", "two", "three"].iter().enumerate() {
        let (next, next_forest) = root
            .write(&[*file], false, file.as_bytes().to_vec(), Utc::now(), &forest, &env.store, &mut env.rng)
            .await
            .unwrap();
        root = next;
        let (access_key, next_forest) = root.store_as_node(&next_forest, &env.store).await.unwrap();
        forest = share(&access_key, counter as u64, &identity, &exchange_root, &next_forest, &env.store)
            .await
            .unwrap();
    }

    let modulus = keys.exchange_key().modulus();
    let latest = find_latest_share_counter(0, 10, &modulus, &identity, &forest, &env.store).await;
    assert_eq!(latest, Some(2));

    let name = create_share_name(2, &identity, &modulus, &forest);
    let dir = receive_share(&name, keys.private_key(), &forest, &env.store)
        .await
        .unwrap()
        .into_dir()
        .unwrap();
    assert_eq!(dir.len(), 3);

    // Outside the window nothing is found
    let latest = find_latest_share_counter(3, 10, &modulus, &identity, &forest, &env.store).await;
    assert_eq!(latest, None);
    let latest = find_latest_share_counter(0, 2, &modulus, &identity, &forest, &env.store).await;
    assert_eq!(latest, Some(1));
}

#[tokio::test]
async fn test_counter_gaps_are_tolerated() {
    let mut env = common::setup_test_env().await;
    let (keys, identity) = common::identity("sig-A");
    let exchange_root = ExchangeRoot::publish(DEFAULT_DEVICE_LABEL, keys.exchange_key(), &env.store)
        .await
        .unwrap();

    let (access_key, forest) = env.root.store_as_node(&env.forest, &env.store).await.unwrap();
    let forest = share(&access_key, 0, &identity, &exchange_root, &forest, &env.store)
        .await
        .unwrap();
    let forest = share(&access_key, 5, &identity, &exchange_root, &forest, &env.store)
        .await
        .unwrap();

    let modulus = keys.exchange_key().modulus();
    let latest = find_latest_share_counter(0, 10, &modulus, &identity, &forest, &env.store).await;
    assert_eq!(latest, Some(5));
}

#[tokio::test]
async fn test_wrong_recipient_cannot_decrypt() {
    let env = common::setup_test_env().await;
    let (alice, alice_id) = common::identity("sig-A");
    let (bob, bob_id) = common::identity("sig-B");
    let exchange_root = ExchangeRoot::publish(DEFAULT_DEVICE_LABEL, alice.exchange_key(), &env.store)
        .await
        .unwrap();

    let mut root = env.root.clone();
    let (access_key, forest) = root.store_as_node(&env.forest, &env.store).await.unwrap();
    let forest = share(&access_key, 0, &alice_id, &exchange_root, &forest, &env.store)
        .await
        .unwrap();

    // Bob's own name has nothing filed under it
    let bob_modulus = bob.exchange_key().modulus();
    let latest = find_latest_share_counter(0, 10, &bob_modulus, &bob_id, &forest, &env.store).await;
    assert_eq!(latest, None);
    let name = create_share_name(0, &bob_id, &bob_modulus, &forest);
    let err = receive_share(&name, bob.private_key(), &forest, &env.store)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShareNotFound);

    // Alice's share does not open with Bob's key
    let name = create_share_name(0, &alice_id, &alice.exchange_key().modulus(), &forest);
    let err = receive_share(&name, bob.private_key(), &forest, &env.store)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Crypto);
}

#[tokio::test]
async fn test_share_to_every_device() {
    let env = common::setup_test_env().await;
    let (alice, identity) = common::identity("sig-A");
    let (laptop, _) = common::identity("sig-A-laptop");

    let mut registry = ExchangeRoot::new();
    registry
        .add_key(DEFAULT_DEVICE_LABEL, alice.exchange_key(), &env.store)
        .await
        .unwrap();
    registry
        .add_key("laptop", laptop.exchange_key(), &env.store)
        .await
        .unwrap();
    let exchange_root = registry.store(&env.store).await.unwrap();

    let mut root = env.root.clone();
    let (access_key, forest) = root.store_as_node(&env.forest, &env.store).await.unwrap();
    let forest = share(&access_key, 0, &identity, &exchange_root, &forest, &env.store)
        .await
        .unwrap();

    for keys in [&alice, &laptop] {
        let modulus = keys.exchange_key().modulus();
        let name = create_share_name(0, &identity, &modulus, &forest);
        let node = receive_share(&name, keys.private_key(), &forest, &env.store)
            .await
            .unwrap();
        assert_eq!(
            node.persisted_as().unwrap().content_cid,
            *access_key.content_cid()
        );
    }
}

#[tokio::test]
async fn test_share_requires_exchange_keys() {
    let env = common::setup_test_env().await;
    let (_, identity) = common::identity("sig-A");
    let exchange_root = ExchangeRoot::new().store(&env.store).await.unwrap();

    let mut root = env.root.clone();
    let (access_key, forest) = root.store_as_node(&env.forest, &env.store).await.unwrap();
    let err = share(&access_key, 0, &identity, &exchange_root, &forest, &env.store)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[tokio::test]
async fn test_access_key_bytes_roundtrip() {
    let env = common::setup_test_env().await;
    let mut root = env.root.clone();
    let (access_key, _) = root.store_as_node(&env.forest, &env.store).await.unwrap();
    let bytes = access_key.to_bytes().unwrap();
    assert_eq!(AccessKey::from_bytes(&bytes).unwrap(), access_key);
}

/// Block store whose `has_block` fails for a fixed set of CIDs
#[derive(Debug)]
struct FailingStore {
    inner: FsBlockStore,
    failing: HashSet<Cid>,
}

#[async_trait]
impl BlockStore for FailingStore {
    async fn has_block(&self, cid: &Cid) -> Result<bool, BlockStoreError> {
        if self.failing.contains(cid) {
            return Err(std::io::Error::other("disk unavailable").into());
        }
        self.inner.has_block(cid).await
    }

    async fn get_block(&self, cid: &Cid) -> Result<Bytes, BlockStoreError> {
        self.inner.get_block(cid).await
    }

    async fn put_block_keyed(&self, cid: &Cid, bytes: Bytes) -> Result<(), BlockStoreError> {
        self.inner.put_block_keyed(cid, bytes).await
    }
}

fn share_cids(counter: u64, identity: &str, modulus: &[u8], forest: &PrivateForest) -> Vec<Cid> {
    let label = create_share_name(counter, identity, modulus, forest).accumulate(forest);
    forest
        .get_encrypted(&label)
        .unwrap()
        .iter()
        .copied()
        .collect()
}

#[tokio::test]
async fn test_scan_treats_store_errors_as_absent() {
    let env = common::setup_test_env().await;
    let (keys, identity) = common::identity("sig-A");
    let exchange_root = ExchangeRoot::publish(DEFAULT_DEVICE_LABEL, keys.exchange_key(), &env.store)
        .await
        .unwrap();

    let mut root = env.root.clone();
    let (access_key, mut forest) = root.store_as_node(&env.forest, &env.store).await.unwrap();
    for counter in 0..3 {
        forest = share(&access_key, counter, &identity, &exchange_root, &forest, &env.store)
            .await
            .unwrap();
    }
    let modulus = keys.exchange_key().modulus();

    let mut store = FailingStore {
        inner: env.store.clone(),
        failing: share_cids(2, &identity, &modulus, &forest).into_iter().collect(),
    };
    let latest = find_latest_share_counter(0, 10, &modulus, &identity, &forest, &store).await;
    assert_eq!(latest, Some(1));

    store
        .failing
        .extend(share_cids(1, &identity, &modulus, &forest));
    let latest = find_latest_share_counter(0, 10, &modulus, &identity, &forest, &store).await;
    assert_eq!(latest, Some(0));

    store
        .failing
        .extend(share_cids(0, &identity, &modulus, &forest));
    let latest = find_latest_share_counter(0, 10, &modulus, &identity, &forest, &store).await;
    assert_eq!(latest, None);
}

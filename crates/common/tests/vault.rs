//! End-to-end session tests: init, mutate, commit, recover

use ::common::crypto::{derive_seed, KeyPair};
use ::common::error::ErrorKind;
use ::common::share::{ExchangeRoot, DEFAULT_DEVICE_LABEL};
use ::common::store::{BlockStore, MemoryBlockStore};
use ::common::vault::{Vault, VaultOp};

#[tokio::test]
async fn test_init_mutate_reload() {
    let store = MemoryBlockStore::new();

    let (mut vault, _) = Vault::init("sig-A", DEFAULT_DEVICE_LABEL, store.clone())
        .await
        .unwrap();
    vault.mkdir(&["pictures", "cats"], true).await.unwrap();
    vault
        .write(&["pictures", "cats", "tabby.png"], false, vec![1, 2, 3, 4, 5])
        .await
        .unwrap();
    let (_, forest_cid) = vault.store_root().await.unwrap();

    let reloaded = Vault::reload("sig-A", store.clone(), &forest_cid)
        .await
        .unwrap();
    assert_eq!(reloaded.identity(), vault.identity());

    let items = reloaded.ls(&["pictures", "cats"], false).await.unwrap();
    let names: Vec<_> = items.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["tabby.png"]);
    assert_eq!(
        reloaded
            .read(&["pictures", "cats", "tabby.png"])
            .await
            .unwrap(),
        vec![1, 2, 3, 4, 5]
    );
}

#[tokio::test]
async fn test_reload_sees_uncommitted_root_revisions() {
    let store = MemoryBlockStore::new();

    let (mut vault, _) = Vault::init("sig-A", DEFAULT_DEVICE_LABEL, store.clone())
        .await
        .unwrap();
    vault.write(&["a.txt"], false, b"one".to_vec()).await.unwrap();
    vault.write(&["a.txt"], false, b"two".to_vec()).await.unwrap();
    let forest_cid = vault.commit().await.unwrap();

    let reloaded = Vault::reload("sig-A", store, &forest_cid).await.unwrap();
    assert_eq!(reloaded.read(&["a.txt"]).await.unwrap(), b"two");
    assert_eq!(
        reloaded.root().header().ratchet().counter(),
        vault.root().header().ratchet().counter()
    );
}

#[tokio::test]
async fn test_wrong_signature_finds_nothing() {
    let store = MemoryBlockStore::new();
    let (_, forest_cid) = Vault::init("sig-A", DEFAULT_DEVICE_LABEL, store.clone())
        .await
        .unwrap();

    let err = Vault::reload("sig-B", store, &forest_cid).await.unwrap_err();
    assert_eq!(err.op, VaultOp::ShareRecovery);
    assert_eq!(err.kind(), ErrorKind::ShareNotFound);
}

#[tokio::test]
async fn test_empty_signature() {
    let err = Vault::init("", DEFAULT_DEVICE_LABEL, MemoryBlockStore::new())
        .await
        .unwrap_err();
    assert_eq!(err.op, VaultOp::KeyDerivation);
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[tokio::test]
async fn test_empty_scan_window() {
    let store = MemoryBlockStore::new();
    let (_, forest_cid) = Vault::init("sig-A", DEFAULT_DEVICE_LABEL, store.clone())
        .await
        .unwrap();

    let err = Vault::reload_within("sig-A", store, &forest_cid, 5..5)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[tokio::test]
async fn test_share_root_with_advances_counter() {
    let store = MemoryBlockStore::new();

    let (mut vault, _) = Vault::init("sig-A", DEFAULT_DEVICE_LABEL, store.clone())
        .await
        .unwrap();
    let identity = vault.identity().to_string();
    let exchange_root = ExchangeRoot::publish("main", vault.exchange_key(), &store)
        .await
        .unwrap();

    vault.write(&["first"], false, b"1".to_vec()).await.unwrap();
    assert_eq!(
        vault.share_root_with(&exchange_root, &identity).await.unwrap(),
        1
    );
    vault.write(&["second"], false, b"2".to_vec()).await.unwrap();
    assert_eq!(
        vault.share_root_with(&exchange_root, &identity).await.unwrap(),
        2
    );

    let forest_cid = vault.commit().await.unwrap();
    let reloaded = Vault::reload_within("sig-A", store, &forest_cid, 0..10)
        .await
        .unwrap();
    let items = reloaded.ls(&[] as &[&str], false).await.unwrap();
    let names: Vec<_> = items.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[tokio::test]
async fn test_mutation_errors_are_tagged() {
    let (mut vault, _) = Vault::init("sig-A", DEFAULT_DEVICE_LABEL, MemoryBlockStore::new())
        .await
        .unwrap();

    let err = vault.rm(&["missing"]).await.unwrap_err();
    assert_eq!(err.op, VaultOp::Mutation);
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().starts_with("directory mutation failed"));

    let err = vault.read(&["missing"]).await.unwrap_err();
    assert_eq!(err.op, VaultOp::Read);
}

#[tokio::test]
async fn test_init_returns_stored_forest() {
    let store = MemoryBlockStore::new();
    let (vault, forest_cid) = Vault::init("sig-A", "laptop", store.clone())
        .await
        .unwrap();
    assert_eq!(vault.commit().await.unwrap(), forest_cid);

    let reloaded = Vault::reload("sig-A", store.clone(), &forest_cid)
        .await
        .unwrap();
    assert!(reloaded.ls(&[] as &[&str], false).await.unwrap().is_empty());

    // The owner's key is registered under the requested device label only
    let scratch = MemoryBlockStore::new();
    let laptop = ExchangeRoot::publish("laptop", vault.exchange_key(), &scratch)
        .await
        .unwrap();
    let main = ExchangeRoot::publish(DEFAULT_DEVICE_LABEL, vault.exchange_key(), &scratch)
        .await
        .unwrap();
    assert!(store.has_block(&laptop).await.unwrap());
    assert!(!store.has_block(&main).await.unwrap());
}

#[tokio::test]
async fn test_share_with_another_signature() {
    let store = MemoryBlockStore::new();

    let (mut alice, _) = Vault::init("sig-A", DEFAULT_DEVICE_LABEL, store.clone())
        .await
        .unwrap();
    alice
        .write(&["tabby.png"], false, vec![1, 2, 3, 4, 5])
        .await
        .unwrap();

    let bob_seed = derive_seed("sig-B").unwrap();
    let bob_keys = KeyPair::derive(&bob_seed);
    let bob_root = ExchangeRoot::publish(DEFAULT_DEVICE_LABEL, bob_keys.exchange_key(), &store)
        .await
        .unwrap();

    let bob_identity = bob_seed.root_identity();
    assert_eq!(
        alice.share_root_with(&bob_root, &bob_identity).await.unwrap(),
        0
    );
    alice.write(&["notes.txt"], false, b"v2".to_vec()).await.unwrap();
    assert_eq!(
        alice.share_root_with(&bob_root, &bob_identity).await.unwrap(),
        1
    );
    let forest_cid = alice.commit().await.unwrap();

    let bob = Vault::reload("sig-B", store.clone(), &forest_cid)
        .await
        .unwrap();
    assert_eq!(bob.identity(), bob_identity);
    assert_eq!(bob.read(&["tabby.png"]).await.unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(bob.read(&["notes.txt"]).await.unwrap(), b"v2");

    // The owner still recovers through their own share
    let owner = Vault::reload("sig-A", store, &forest_cid).await.unwrap();
    assert_eq!(owner.read(&["tabby.png"]).await.unwrap(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_share_outside_scan_window_is_rejected() {
    let store = MemoryBlockStore::new();
    let (vault, _) = Vault::init("sig-A", DEFAULT_DEVICE_LABEL, store.clone())
        .await
        .unwrap();
    let mut vault = vault.with_scan_window(0, 2);
    let identity = vault.identity().to_string();
    let exchange_root = ExchangeRoot::publish(DEFAULT_DEVICE_LABEL, vault.exchange_key(), &store)
        .await
        .unwrap();

    assert_eq!(
        vault.share_root_with(&exchange_root, &identity).await.unwrap(),
        1
    );
    let err = vault
        .share_root_with(&exchange_root, &identity)
        .await
        .unwrap_err();
    assert_eq!(err.op, VaultOp::SharePublish);
    assert_eq!(err.kind(), ErrorKind::Input);
}

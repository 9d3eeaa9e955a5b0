/**
 * Cryptographic types and operations.
 *  - Signature-derived seeds and identities
 *  - Deterministic exchange keypairs
 *  - Symmetric block encryption
 */
pub mod crypto;
/**
 * Coarse error classes shared by every
 *  module's error type.
 */
pub mod error;
/**
 * The private forest: a persistent index from
 *  opaque labels to encrypted block CIDs.
 */
pub mod forest;
/**
 * CIDs and DAG-CBOR helpers for
 *  content-addressed blocks.
 */
pub mod linked_data;
/**
 * Encrypted directories and files stored
 *  inside a forest, plus the access keys
 *  that open them.
 */
pub mod private;
/**
 * Source of randomness for names, ratchets
 *  and forest namespaces.
 */
pub mod rng;
/**
 * Counter-indexed sharing and recovery of
 *  access keys, and the public exchange-key
 *  registry.
 */
pub mod share;
/**
 * Block storage contract and the memory and
 *  filesystem backends.
 */
pub mod store;
/**
 * Session context: one owner, one forest
 *  lineage, one writer.
 */
pub mod vault;

pub mod prelude {
    pub use crate::crypto::{derive_seed, ExchangeKey, KeyPair, PrivateKey, Seed};
    pub use crate::error::ErrorKind;
    pub use crate::forest::{Name, PrivateForest};
    pub use crate::linked_data::{cid_from_str, cid_to_string, multibase, Cid};
    pub use crate::private::{AccessKey, Metadata, NodeKind, PrivateDirectory, PrivateNode};
    pub use crate::share::{
        create_share_name, find_latest_share_counter, receive_share, share, ExchangeRoot,
    };
    pub use crate::store::{BlockStore, FsBlockStore, MemoryBlockStore};
    pub use crate::vault::{Vault, VaultError};
}

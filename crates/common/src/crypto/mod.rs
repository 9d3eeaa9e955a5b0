//! Cryptographic primitives for sigvault
//!
//! - **Seed & identity**: a signature is hashed twice into a [`Seed`]; its hex
//!   form is the owner's root identity
//! - **Exchange keys**: an X25519 keypair derived from the seed; the public
//!   half ([`ExchangeKey`]) encrypts shares, the private half decrypts them
//! - **Content encryption**: ChaCha20-Poly1305 [`Secret`]s for every
//!   encrypted block in the forest
//!
//! Nothing here is persisted. The same signature re-derives the same keys.

mod exchange;
mod keys;
mod secret;

pub use exchange::ExchangeError;
pub use keys::{
    derive_seed, ExchangeKey, KeyError, KeyPair, PrivateKey, Seed, MODULUS_SIZE, SEED_SIZE,
};
pub use secret::{Secret, SecretError, BLAKE3_HASH_SIZE, SECRET_SIZE};

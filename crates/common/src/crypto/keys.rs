use std::fmt;

use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ErrorKind;

/// Size of a derived seed in bytes
pub const SEED_SIZE: usize = 32;
/// Size of the public exchange modulus in bytes
pub const MODULUS_SIZE: usize = 32;
/// Size of the private exchange key in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;

const KEYPAIR_CONTEXT: &str = "sigvault 2024-06 exchange keypair v1";

/// Errors that can occur during key derivation and key parsing
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("signature is empty")]
    EmptySignature,
    #[error("invalid modulus size, expected {MODULUS_SIZE}, got {0}")]
    ModulusSize(usize),
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
}

impl KeyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeyError::EmptySignature => ErrorKind::Input,
            _ => ErrorKind::Crypto,
        }
    }
}

/// Seed material derived from an owner's signature
///
/// Two rounds of SHA-256 over the UTF-8 signature. The seed is the only
/// secret every other key is derived from, it never leaves memory and is
/// wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; SEED_SIZE]);

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

impl Seed {
    pub fn as_bytes(&self) -> &[u8; SEED_SIZE] {
        &self.0
    }

    /// Hex encoding of the seed, used as the owner's addressing namespace
    /// in share names.
    pub fn root_identity(&self) -> String {
        hex::encode(self.0)
    }
}

/// Derive the seed for a signature.
pub fn derive_seed(signature: &str) -> Result<Seed, KeyError> {
    if signature.is_empty() {
        return Err(KeyError::EmptySignature);
    }
    let first = Sha256::digest(signature.as_bytes());
    let second = Sha256::digest(first);
    let mut seed = [0u8; SEED_SIZE];
    seed.copy_from_slice(&second);
    Ok(Seed(seed))
}

/// Public, encrypt-only half of a derived keypair
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeKey(X25519PublicKey);

impl fmt::Debug for ExchangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExchangeKey({})", self.to_hex())
    }
}

impl ExchangeKey {
    /// The fixed-size public modulus bytes published to exchange roots
    pub fn modulus(&self) -> [u8; MODULUS_SIZE] {
        self.0.to_bytes()
    }

    pub fn from_modulus(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != MODULUS_SIZE {
            return Err(KeyError::ModulusSize(bytes.len()));
        }
        let mut buff = [0u8; MODULUS_SIZE];
        buff.copy_from_slice(bytes);
        Ok(Self(X25519PublicKey::from(buff)))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.modulus())
    }

    /// Parse an exchange key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes =
            hex::decode(hex).map_err(|_| anyhow::anyhow!("exchange key hex decode error"))?;
        Self::from_modulus(&bytes)
    }

    pub(crate) fn as_x25519(&self) -> &X25519PublicKey {
        &self.0
    }
}

/// Private, decrypt-only half of a derived keypair
#[derive(Clone)]
pub struct PrivateKey(StaticSecret);

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

impl PrivateKey {
    pub fn exchange_key(&self) -> ExchangeKey {
        ExchangeKey(X25519PublicKey::from(&self.0))
    }

    pub(crate) fn as_x25519(&self) -> &StaticSecret {
        &self.0
    }
}

/// Deterministic keypair derived from a [`Seed`]
///
/// The static secret is a BLAKE3 KDF of the seed under a fixed context, so
/// the same signature always yields a byte-identical modulus.
#[derive(Debug, Clone)]
pub struct KeyPair {
    private_key: PrivateKey,
    exchange_key: ExchangeKey,
}

impl KeyPair {
    pub fn derive(seed: &Seed) -> Self {
        let mut scalar = blake3::derive_key(KEYPAIR_CONTEXT, seed.as_bytes());
        let secret = StaticSecret::from(scalar);
        scalar.zeroize();
        let private_key = PrivateKey(secret);
        let exchange_key = private_key.exchange_key();
        Self {
            private_key,
            exchange_key,
        }
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn exchange_key(&self) -> &ExchangeKey {
        &self.exchange_key
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seed_is_deterministic() {
        let a = derive_seed("sig-A").unwrap();
        let b = derive_seed("sig-A").unwrap();
        let c = derive_seed("sig-B").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.root_identity(), b.root_identity());
        assert_eq!(a.root_identity().len(), 64);
    }

    #[test]
    fn test_seed_is_double_sha256() {
        let seed = derive_seed("abc").unwrap();
        let once = Sha256::digest(b"abc");
        let twice = Sha256::digest(once);
        assert_eq!(seed.as_bytes().as_slice(), twice.as_slice());
    }

    #[test]
    fn test_empty_signature_rejected() {
        let err = derive_seed("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_keypair_is_deterministic() {
        let a = KeyPair::derive(&derive_seed("sig-A").unwrap());
        let b = KeyPair::derive(&derive_seed("sig-A").unwrap());
        let c = KeyPair::derive(&derive_seed("sig-B").unwrap());
        assert_eq!(a.exchange_key().modulus(), b.exchange_key().modulus());
        assert_ne!(a.exchange_key().modulus(), c.exchange_key().modulus());
    }

    #[test]
    fn test_exchange_key_hex_roundtrip() {
        let pair = KeyPair::derive(&derive_seed("sig-A").unwrap());
        let hex = pair.exchange_key().to_hex();
        let recovered = ExchangeKey::from_hex(&hex).unwrap();
        assert_eq!(&recovered, pair.exchange_key());
        assert!(ExchangeKey::from_modulus(&[0u8; 16]).is_err());
    }
}

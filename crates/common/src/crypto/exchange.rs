//! Asymmetric encryption to an [`ExchangeKey`]
//!
//! To encrypt for a recipient:
//! 1. Generate an ephemeral X25519 secret
//! 2. Perform ECDH with the recipient's exchange key
//! 3. Derive a [`Secret`] from the shared point, bound to both public keys
//! 4. Seal the payload with that secret
//!
//! The recipient repeats the ECDH with their private key and the ephemeral
//! public key carried at the front of the ciphertext.
//!
//! # Wire Format
//!
//! ```text
//! [ ephemeral_pubkey: 32 bytes ][ nonce: 12 bytes ][ ciphertext + tag ]
//! ```

use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use super::keys::{ExchangeKey, PrivateKey, MODULUS_SIZE};
use super::secret::{Secret, SecretError};
use crate::error::ErrorKind;

const EXCHANGE_CONTEXT: &str = "sigvault 2024-06 exchange encryption v1";

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("exchange error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("ciphertext too short: {0} bytes")]
    Truncated(usize),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Crypto
    }
}

fn shared_secret(shared: &[u8; 32], ephemeral: &[u8; 32], recipient: &[u8; 32]) -> Secret {
    let mut material = Vec::with_capacity(96);
    material.extend_from_slice(shared);
    material.extend_from_slice(ephemeral);
    material.extend_from_slice(recipient);
    let secret = Secret::derive(EXCHANGE_CONTEXT, &material);
    material.zeroize();
    secret
}

impl ExchangeKey {
    /// Encrypt `data` so only the matching [`PrivateKey`] can read it.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, ExchangeError> {
        let mut ephemeral_bytes = [0u8; 32];
        getrandom::getrandom(&mut ephemeral_bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate ephemeral key: {}", e))?;
        let ephemeral = StaticSecret::from(ephemeral_bytes);
        ephemeral_bytes.zeroize();
        let ephemeral_public = X25519PublicKey::from(&ephemeral);

        let shared = ephemeral.diffie_hellman(self.as_x25519());
        if !shared.was_contributory() {
            return Err(anyhow::anyhow!("recipient exchange key is a low-order point").into());
        }
        let secret = shared_secret(
            shared.as_bytes(),
            ephemeral_public.as_bytes(),
            self.as_x25519().as_bytes(),
        );
        let sealed = secret.encrypt(data)?;

        let mut out = Vec::with_capacity(MODULUS_SIZE + sealed.len());
        out.extend_from_slice(ephemeral_public.as_bytes());
        out.extend_from_slice(&sealed);
        Ok(out)
    }
}

impl PrivateKey {
    /// Decrypt a ciphertext produced by [`ExchangeKey::encrypt`].
    ///
    /// A ciphertext meant for a different key fails authentication; no
    /// plaintext is returned in that case.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, ExchangeError> {
        if data.len() < MODULUS_SIZE {
            return Err(ExchangeError::Truncated(data.len()));
        }
        let mut ephemeral_bytes = [0u8; MODULUS_SIZE];
        ephemeral_bytes.copy_from_slice(&data[..MODULUS_SIZE]);
        let ephemeral_public = X25519PublicKey::from(ephemeral_bytes);

        let shared = self.as_x25519().diffie_hellman(&ephemeral_public);
        let recipient = self.exchange_key();
        let secret = shared_secret(
            shared.as_bytes(),
            ephemeral_public.as_bytes(),
            recipient.as_x25519().as_bytes(),
        );
        Ok(secret.decrypt(&data[MODULUS_SIZE..])?)
    }
}

//! Randomness provider
//!
//! Forest and name generation draw their entropy through [`Randomness`] so a
//! caller can hand in whatever CSPRNG fits the session (an OS-seeded
//! `StdRng` in production, a fixed seed in tests).

use rand::{CryptoRng, RngCore, SeedableRng};

/// Supplies cryptographically secure random bytes.
pub trait Randomness {
    /// Fill `dest` with random bytes
    fn fill_random(&mut self, dest: &mut [u8]);

    /// Return `N` random bytes
    fn random_bytes<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        self.fill_random(&mut out);
        out
    }
}

impl<R: RngCore + CryptoRng + ?Sized> Randomness for R {
    fn fill_random(&mut self, dest: &mut [u8]) {
        self.fill_bytes(dest)
    }
}

/// A fresh CSPRNG seeded from the operating system
pub fn os_rng() -> rand::rngs::StdRng {
    rand::rngs::StdRng::from_os_rng()
}

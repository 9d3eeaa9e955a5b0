use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::crypto::Secret;
use crate::forest::NameSegment;
use crate::rng::Randomness;

const RATCHET_STEP_CONTEXT: &str = "sigvault 2024-06 ratchet step v1";
const TEMPORAL_KEY_CONTEXT: &str = "sigvault 2024-06 temporal key v1";
const REVISION_SEGMENT_CONTEXT: &str = "sigvault 2024-06 revision segment v1";

/// Per-node hash chain
///
/// Each stored revision of a node is named and keyed by one state of its
/// ratchet. Holding a state lets you derive every later state, never an
/// earlier one.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratchet {
    #[serde_as(as = "serde_with::Bytes")]
    key: [u8; 32],
    counter: u64,
}

impl std::fmt::Debug for Ratchet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ratchet")
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

impl Ratchet {
    pub fn new(rng: &mut impl Randomness) -> Self {
        Self {
            key: rng.random_bytes(),
            counter: 0,
        }
    }

    /// Advance one step
    pub fn inc(&mut self) {
        self.key = blake3::derive_key(RATCHET_STEP_CONTEXT, &self.key);
        self.counter += 1;
    }

    /// The state one step ahead, leaving this one untouched
    pub fn next(&self) -> Self {
        let mut next = self.clone();
        next.inc();
        next
    }

    /// How many steps this ratchet has taken
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Key that encrypts the revision named by this state
    pub fn temporal_key(&self) -> Secret {
        Secret::derive(TEMPORAL_KEY_CONTEXT, &self.key)
    }

    /// Name segment distinguishing the revision named by this state
    pub fn revision_segment(&self) -> NameSegment {
        NameSegment::new_hashed(REVISION_SEGMENT_CONTEXT, &[&self.key])
    }
}

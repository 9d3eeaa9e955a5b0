//! The private forest
//!
//! A forest is a flat, persistent index from [`NameAccumulator`] labels to
//! the CIDs of encrypted blocks. Directory structure lives *inside* the
//! encrypted blocks; the forest itself reveals only how many labels exist.

mod forest;
mod name;

pub use forest::{ForestError, Namespace, PrivateForest};
pub use name::{Name, NameAccumulator, NameSegment, NAME_SEGMENT_SIZE};

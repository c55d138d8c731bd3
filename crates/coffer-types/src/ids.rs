use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one logical store within a working directory.
///
/// Stores with distinct ids coexist in the same directory; the id is part
/// of every file name the store touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for InstanceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Snapshot index within an instance's retention ring.
///
/// `0` always denotes the most recent snapshot; larger indices denote
/// progressively older retained snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotId(pub usize);

impl SnapshotId {
    /// The most recent snapshot.
    pub const CURRENT: Self = Self(0);
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for SnapshotId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

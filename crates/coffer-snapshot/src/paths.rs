//! Canonical snapshot file names.
//!
//! `<I>` and `<S>` are decimal with no padding. These helpers never touch
//! the filesystem.

use coffer_types::{InstanceId, SnapshotId};

/// Payload file name for a snapshot.
pub fn kvs_file_name(instance_id: InstanceId, snapshot_id: SnapshotId) -> String {
    format!("kvs_{instance_id}_{snapshot_id}.json")
}

/// Checksum sidecar file name for a snapshot.
pub fn hash_file_name(instance_id: InstanceId, snapshot_id: SnapshotId) -> String {
    format!("kvs_{instance_id}_{snapshot_id}.hash")
}

/// Defaults file name for an instance.
pub fn defaults_file_name(instance_id: InstanceId) -> String {
    format!("kvs_{instance_id}_default.json")
}

/// Staging name for a payload not yet part of the ring.
pub(crate) fn staged_kvs_file_name(instance_id: InstanceId) -> String {
    format!("kvs_{instance_id}_new.json")
}

/// Staging name for a sidecar not yet part of the ring.
pub(crate) fn staged_hash_file_name(instance_id: InstanceId) -> String {
    format!("kvs_{instance_id}_new.hash")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_decimal_unpadded() {
        let instance_id = InstanceId(7);
        assert_eq!(kvs_file_name(instance_id, SnapshotId(0)), "kvs_7_0.json");
        assert_eq!(hash_file_name(instance_id, SnapshotId(12)), "kvs_7_12.hash");
        assert_eq!(defaults_file_name(instance_id), "kvs_7_default.json");
    }

    #[test]
    fn staging_names_stay_outside_the_ring() {
        let instance_id = InstanceId(1);
        assert_eq!(staged_kvs_file_name(instance_id), "kvs_1_new.json");
        assert_eq!(staged_hash_file_name(instance_id), "kvs_1_new.hash");
    }
}

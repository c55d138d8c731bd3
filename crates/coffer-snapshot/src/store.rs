use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use coffer_codec::{decode, encode, Digest};
use coffer_types::{InstanceId, KvsError, KvsResult, SnapshotId, ValueMap};

use crate::paths;

/// Default retention bound of the snapshot ring.
pub const DEFAULT_SNAPSHOT_MAX_COUNT: usize = 3;

/// A staged payload/sidecar pair, written but not yet part of the ring.
///
/// Produced by [`SnapshotStore::stage`]; becomes observable only when
/// [`SnapshotStore::commit`] renames it to index 0.
#[derive(Debug)]
pub struct StagedSnapshot {
    kvs_path: PathBuf,
    hash_path: PathBuf,
}

/// Bounded ring of checksum-protected snapshots for one instance.
///
/// Snapshots are indexed `0..N-1` with `N <= max_count`; index 0 is the
/// most recent. The store computes canonical paths, writes new snapshots
/// atomically, rotates older ones, and verifies checksums on load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotStore {
    dir: PathBuf,
    instance_id: InstanceId,
    max_count: usize,
}

impl SnapshotStore {
    /// Create a store handle for `instance_id` under `dir`.
    ///
    /// No filesystem access happens here; files are touched lazily by the
    /// flush/load operations.
    pub fn new(dir: impl Into<PathBuf>, instance_id: InstanceId, max_count: usize) -> Self {
        Self {
            dir: dir.into(),
            instance_id,
            max_count,
        }
    }

    /// Working directory holding this instance's files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Instance this store belongs to.
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Configured retention bound.
    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Payload path for a snapshot. Never touches the filesystem.
    pub fn kvs_file_path(&self, snapshot_id: SnapshotId) -> PathBuf {
        self.dir
            .join(paths::kvs_file_name(self.instance_id, snapshot_id))
    }

    /// Sidecar path for a snapshot. Never touches the filesystem.
    pub fn hash_file_path(&self, snapshot_id: SnapshotId) -> PathBuf {
        self.dir
            .join(paths::hash_file_name(self.instance_id, snapshot_id))
    }

    /// Defaults file path. The file is external input; the store only
    /// ever reads it.
    pub fn defaults_file_path(&self) -> PathBuf {
        self.dir.join(paths::defaults_file_name(self.instance_id))
    }

    /// Whether a snapshot's payload file is present.
    pub fn snapshot_exists(&self, snapshot_id: SnapshotId) -> bool {
        self.kvs_file_path(snapshot_id).exists()
    }

    /// Whether the defaults file is present.
    pub fn defaults_file_exists(&self) -> bool {
        self.defaults_file_path().exists()
    }

    /// Number of present snapshots: contiguous complete payload/sidecar
    /// pairs from index 0 upward, capped at the retention bound.
    pub fn count(&self) -> usize {
        let mut count = 0;
        for idx in 0..self.max_count {
            let snapshot_id = SnapshotId(idx);
            if !self.kvs_file_path(snapshot_id).exists()
                || !self.hash_file_path(snapshot_id).exists()
            {
                break;
            }
            count += 1;
        }
        count
    }

    /// Write a new snapshot of `map` and rotate the ring.
    ///
    /// Equivalent to [`stage`](Self::stage) followed by
    /// [`commit`](Self::commit). Callers that need to distinguish the two
    /// failure phases (staging leaves the ring untouched; a commit
    /// failure may not) should call them separately.
    pub fn flush(&self, map: &ValueMap) -> KvsResult<()> {
        if self.max_count == 0 {
            warn!(instance = %self.instance_id, "snapshot retention is 0, flush ignored");
            return Ok(());
        }
        let staged = self.stage(map)?;
        self.commit(staged)
    }

    /// Materialize the encoded payload and its sidecar at staging paths.
    ///
    /// The ring is untouched: a failure here leaves the previous snapshot
    /// set fully observable at unchanged indices.
    pub fn stage(&self, map: &ValueMap) -> KvsResult<StagedSnapshot> {
        let payload = encode(map)?;
        let digest = Digest::compute(payload.as_bytes());

        let kvs_path = self.dir.join(paths::staged_kvs_file_name(self.instance_id));
        let hash_path = self
            .dir
            .join(paths::staged_hash_file_name(self.instance_id));

        write_synced(&kvs_path, payload.as_bytes())
            .map_err(|err| KvsError::KvsFileReadError(format!("{}: {err}", kvs_path.display())))?;
        write_synced(&hash_path, digest.to_sidecar().as_bytes()).map_err(|err| {
            KvsError::KvsHashFileReadError(format!("{}: {err}", hash_path.display()))
        })?;

        debug!(
            instance = %self.instance_id,
            payload_len = payload.len(),
            digest = %digest,
            "snapshot staged"
        );
        Ok(StagedSnapshot {
            kvs_path,
            hash_path,
        })
    }

    /// Rotate the ring and rename the staged pair to index 0.
    ///
    /// The rename of the new index-0 payload is the last step and the
    /// observability point. A failure in here may leave the ring
    /// partially rotated; callers must treat it as loss of the on-disk
    /// invariant.
    pub fn commit(&self, staged: StagedSnapshot) -> KvsResult<()> {
        if self.max_count == 0 {
            warn!(instance = %self.instance_id, "snapshot retention is 0, staged snapshot discarded");
            remove_ring_file(&staged.hash_path)?;
            remove_ring_file(&staged.kvs_path)?;
            return Ok(());
        }
        self.rotate()?;

        let kvs_path = self.kvs_file_path(SnapshotId::CURRENT);
        let hash_path = self.hash_file_path(SnapshotId::CURRENT);
        rename_ring_file(&staged.hash_path, &hash_path)?;
        rename_ring_file(&staged.kvs_path, &kvs_path)?;

        debug!(instance = %self.instance_id, "snapshot committed at index 0");
        Ok(())
    }

    /// Shift every pair one index older, dropping the pair that would
    /// pass the end of the ring.
    ///
    /// Sequence, oldest first: the pair at `max_count - 1` is deleted,
    /// then each pair `i` is renamed to `i + 1` (sidecar first, then
    /// payload). A pair with exactly one file present is a corrupt ring.
    fn rotate(&self) -> KvsResult<()> {
        let last = SnapshotId(self.max_count - 1);
        if self.pair_state(last)? == PairState::Present {
            remove_ring_file(&self.hash_file_path(last))?;
            remove_ring_file(&self.kvs_file_path(last))?;
            debug!(instance = %self.instance_id, index = last.0, "oldest snapshot dropped");
        }

        for idx in (1..self.max_count).rev() {
            let from = SnapshotId(idx - 1);
            let to = SnapshotId(idx);
            if self.pair_state(from)? == PairState::Absent {
                continue;
            }

            rename_ring_file(&self.hash_file_path(from), &self.hash_file_path(to))?;
            rename_ring_file(&self.kvs_file_path(from), &self.kvs_file_path(to))?;
            debug!(instance = %self.instance_id, from = from.0, to = to.0, "snapshot rotated");
        }

        Ok(())
    }

    fn pair_state(&self, snapshot_id: SnapshotId) -> KvsResult<PairState> {
        let kvs_exists = self.kvs_file_path(snapshot_id).exists();
        let hash_exists = self.hash_file_path(snapshot_id).exists();
        match (kvs_exists, hash_exists) {
            (true, true) => Ok(PairState::Present),
            (false, false) => Ok(PairState::Absent),
            _ => Err(KvsError::ValidationFailed(format!(
                "snapshot {snapshot_id} of instance {} has a half-written file pair",
                self.instance_id
            ))),
        }
    }

    /// Load and verify a snapshot.
    ///
    /// The payload's digest is recomputed and compared byte-for-byte
    /// against the sidecar before decoding.
    pub fn load(&self, snapshot_id: SnapshotId) -> KvsResult<ValueMap> {
        let kvs_path = self.kvs_file_path(snapshot_id);
        let payload = fs::read_to_string(&kvs_path)
            .map_err(|err| KvsError::KvsFileReadError(format!("{}: {err}", kvs_path.display())))?;

        let hash_path = self.hash_file_path(snapshot_id);
        let sidecar = fs::read_to_string(&hash_path).map_err(|err| {
            KvsError::KvsHashFileReadError(format!("{}: {err}", hash_path.display()))
        })?;

        let digest = Digest::compute(payload.as_bytes());
        if !digest.matches_sidecar(&sidecar) {
            warn!(
                instance = %self.instance_id,
                snapshot = snapshot_id.0,
                computed = %digest,
                "checksum mismatch"
            );
            return Err(KvsError::ValidationFailed(format!(
                "checksum mismatch for {}",
                kvs_path.display()
            )));
        }

        decode(&payload)
    }

    /// Load snapshot `snapshot_id`, rejecting ids outside the present
    /// range. Index 0 (the most recent snapshot) is a valid target.
    pub fn restore(&self, snapshot_id: SnapshotId) -> KvsResult<ValueMap> {
        let available = self.count();
        if snapshot_id.0 >= available {
            return Err(KvsError::InvalidSnapshotId {
                requested: snapshot_id.0,
                available,
            });
        }
        self.load(snapshot_id)
    }

    /// Parse the defaults file. Same encoding as a snapshot payload; no
    /// sidecar is consulted. Presence policy belongs to the caller.
    pub fn load_defaults(&self) -> KvsResult<ValueMap> {
        let path = self.defaults_file_path();
        let text = fs::read_to_string(&path)
            .map_err(|err| KvsError::KvsFileReadError(format!("{}: {err}", path.display())))?;
        decode(&text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PairState {
    Present,
    Absent,
}

/// Write contents and flush them to stable storage before returning.
fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

fn rename_ring_file(from: &Path, to: &Path) -> KvsResult<()> {
    fs::rename(from, to).map_err(|err| {
        KvsError::ValidationFailed(format!(
            "rename {} -> {} failed: {err}",
            from.display(),
            to.display()
        ))
    })
}

fn remove_ring_file(path: &Path) -> KvsResult<()> {
    fs::remove_file(path).map_err(|err| {
        KvsError::ValidationFailed(format!("remove {} failed: {err}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_types::Value;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> SnapshotStore {
        SnapshotStore::new(dir, InstanceId(1), DEFAULT_SNAPSHOT_MAX_COUNT)
    }

    fn counter_map(value: i32) -> ValueMap {
        ValueMap::from([("counter".to_string(), Value::I32(value))])
    }

    #[test]
    fn flush_creates_index_zero_pair() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.flush(&counter_map(1)).unwrap();

        assert!(store.kvs_file_path(SnapshotId(0)).exists());
        assert!(store.hash_file_path(SnapshotId(0)).exists());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn flushed_snapshot_verifies_and_decodes() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let map = counter_map(42);

        store.flush(&map).unwrap();

        assert_eq!(store.load(SnapshotId(0)).unwrap(), map);

        let payload = fs::read_to_string(store.kvs_file_path(SnapshotId(0))).unwrap();
        let sidecar = fs::read_to_string(store.hash_file_path(SnapshotId(0))).unwrap();
        assert!(Digest::compute(payload.as_bytes()).matches_sidecar(&sidecar));
    }

    #[test]
    fn count_tracks_flushes_up_to_max() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        assert_eq!(store.count(), 0);
        for flushes in 1..=store.max_count() {
            store.flush(&counter_map(flushes as i32)).unwrap();
            assert_eq!(store.count(), flushes);
        }

        store.flush(&counter_map(99)).unwrap();
        store.flush(&counter_map(100)).unwrap();
        assert_eq!(store.count(), store.max_count());
    }

    #[test]
    fn count_honors_small_retention_bounds() {
        for max_count in [1, 2] {
            let dir = tempdir().unwrap();
            let store = SnapshotStore::new(dir.path(), InstanceId(1), max_count);

            for flushes in 1..=max_count + 2 {
                store.flush(&counter_map(flushes as i32)).unwrap();
                assert_eq!(store.count(), flushes.min(max_count));
            }
        }
    }

    #[test]
    fn rotation_shifts_older_snapshots() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        for value in 1..=3 {
            store.flush(&counter_map(value)).unwrap();
        }

        assert_eq!(store.load(SnapshotId(0)).unwrap(), counter_map(3));
        assert_eq!(store.load(SnapshotId(1)).unwrap(), counter_map(2));
        assert_eq!(store.load(SnapshotId(2)).unwrap(), counter_map(1));
    }

    #[test]
    fn rotation_drops_the_oldest_beyond_the_bound() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        for value in 1..=4 {
            store.flush(&counter_map(value)).unwrap();
        }

        assert_eq!(store.count(), 3);
        assert_eq!(store.load(SnapshotId(2)).unwrap(), counter_map(2));
        assert!(!store.snapshot_exists(SnapshotId(3)));
    }

    #[test]
    fn zero_retention_makes_flush_a_no_op() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), InstanceId(1), 0);

        store.flush(&counter_map(1)).unwrap();

        assert_eq!(store.count(), 0);
        assert!(!store.snapshot_exists(SnapshotId(0)));
    }

    #[test]
    fn restore_returns_the_requested_snapshot() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        for value in 1..=3 {
            store.flush(&counter_map(value)).unwrap();
        }

        assert_eq!(store.restore(SnapshotId(0)).unwrap(), counter_map(3));
        assert_eq!(store.restore(SnapshotId(1)).unwrap(), counter_map(2));
    }

    #[test]
    fn restore_rejects_out_of_range_ids() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.flush(&counter_map(1)).unwrap();
        store.flush(&counter_map(2)).unwrap();

        assert!(matches!(
            store.restore(SnapshotId(2)),
            Err(KvsError::InvalidSnapshotId {
                requested: 2,
                available: 2
            })
        ));
        assert!(matches!(
            store.restore(SnapshotId(123)),
            Err(KvsError::InvalidSnapshotId { .. })
        ));
    }

    #[test]
    fn restore_rejects_everything_on_an_empty_ring() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        assert!(matches!(
            store.restore(SnapshotId(0)),
            Err(KvsError::InvalidSnapshotId {
                requested: 0,
                available: 0
            })
        ));
    }

    #[test]
    fn load_missing_payload_is_a_kvs_file_error() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        assert!(matches!(
            store.load(SnapshotId(0)),
            Err(KvsError::KvsFileReadError(_))
        ));
    }

    #[test]
    fn load_missing_sidecar_is_a_hash_file_error() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.flush(&counter_map(1)).unwrap();
        fs::remove_file(store.hash_file_path(SnapshotId(0))).unwrap();

        assert!(matches!(
            store.load(SnapshotId(0)),
            Err(KvsError::KvsHashFileReadError(_))
        ));
    }

    #[test]
    fn sidecar_byte_flip_fails_validation() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.flush(&counter_map(1)).unwrap();

        let hash_path = store.hash_file_path(SnapshotId(0));
        let mut sidecar = fs::read(&hash_path).unwrap();
        sidecar[0] = if sidecar[0] == b'0' { b'1' } else { b'0' };
        fs::write(&hash_path, sidecar).unwrap();

        assert!(matches!(
            store.load(SnapshotId(0)),
            Err(KvsError::ValidationFailed(_))
        ));
    }

    #[test]
    fn payload_edit_fails_validation() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.flush(&counter_map(1)).unwrap();

        let kvs_path = store.kvs_file_path(SnapshotId(0));
        let payload = fs::read_to_string(&kvs_path).unwrap();
        fs::write(&kvs_path, payload.replace('1', "2")).unwrap();

        assert!(matches!(
            store.load(SnapshotId(0)),
            Err(KvsError::ValidationFailed(_))
        ));
    }

    #[test]
    fn half_written_pair_fails_the_next_flush() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.flush(&counter_map(1)).unwrap();
        fs::remove_file(store.hash_file_path(SnapshotId(0))).unwrap();

        assert!(matches!(
            store.flush(&counter_map(2)),
            Err(KvsError::ValidationFailed(_))
        ));
    }

    #[test]
    fn staging_failure_leaves_the_ring_intact() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.flush(&counter_map(1)).unwrap();

        let bad = ValueMap::from([("bad".to_string(), Value::F64(f64::NAN))]);
        assert!(matches!(store.stage(&bad), Err(KvsError::InvalidValue(_))));

        assert_eq!(store.count(), 1);
        assert_eq!(store.load(SnapshotId(0)).unwrap(), counter_map(1));
    }

    #[test]
    fn load_defaults_parses_payload_encoding() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let defaults = counter_map(7);

        fs::write(
            store.defaults_file_path(),
            encode(&defaults).unwrap(),
        )
        .unwrap();

        assert_eq!(store.load_defaults().unwrap(), defaults);
    }

    #[test]
    fn load_defaults_missing_file_is_a_kvs_file_error() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        assert!(matches!(
            store.load_defaults(),
            Err(KvsError::KvsFileReadError(_))
        ));
    }

    #[test]
    fn instances_in_one_directory_stay_independent() {
        let dir = tempdir().unwrap();
        let first = SnapshotStore::new(dir.path(), InstanceId(1), 3);
        let second = SnapshotStore::new(dir.path(), InstanceId(2), 3);

        first.flush(&counter_map(1)).unwrap();
        second.flush(&counter_map(2)).unwrap();

        assert_eq!(first.load(SnapshotId(0)).unwrap(), counter_map(1));
        assert_eq!(second.load(SnapshotId(0)).unwrap(), counter_map(2));
    }

    #[test]
    fn path_accessors_do_not_touch_the_filesystem() {
        let store = SnapshotStore::new("/nonexistent", InstanceId(42), 3);
        assert_eq!(
            store.kvs_file_path(SnapshotId(1)),
            PathBuf::from("/nonexistent/kvs_42_1.json")
        );
        assert_eq!(
            store.hash_file_path(SnapshotId(1)),
            PathBuf::from("/nonexistent/kvs_42_1.hash")
        );
        assert_eq!(
            store.defaults_file_path(),
            PathBuf::from("/nonexistent/kvs_42_default.json")
        );
    }
}

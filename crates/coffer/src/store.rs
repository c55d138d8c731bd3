use std::path::PathBuf;

use tracing::{debug, warn};

use coffer_snapshot::SnapshotStore;
use coffer_types::{KvsError, KvsResult, SnapshotId, Value, ValueMap};

/// One open key-value store instance.
///
/// A `Kvs` exclusively owns its live map, its defaults and its snapshot
/// store; values read out are clones, no interior references escape.
/// Reads take `&self`, mutations take `&mut self`; callers that share an
/// instance across threads wrap it in their own synchronization.
///
/// A flush failure that may have left the on-disk ring partially rotated
/// poisons the instance: reads keep working, every further mutation fails
/// with `ValidationFailed`, and only reconstruction through the builder
/// recovers.
pub struct Kvs {
    live: ValueMap,
    defaults: ValueMap,
    store: SnapshotStore,
    poisoned: bool,
}

impl Kvs {
    pub(crate) fn new(live: ValueMap, defaults: ValueMap, store: SnapshotStore) -> Self {
        Self {
            live,
            defaults,
            store,
            poisoned: false,
        }
    }

    /// Whether a flush failure has poisoned this instance.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn guard_mutation(&self) -> KvsResult<()> {
        if self.poisoned {
            return Err(KvsError::ValidationFailed(
                "instance is poisoned after a failed flush; rebuild it to recover".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the value for `key`: the explicitly set value if present,
    /// otherwise the default.
    pub fn get_value(&self, key: &str) -> KvsResult<Value> {
        if let Some(value) = self.live.get(key) {
            Ok(value.clone())
        } else if let Some(value) = self.defaults.get(key) {
            Ok(value.clone())
        } else {
            Err(KvsError::KeyNotFound(key.to_string()))
        }
    }

    /// Get the value for `key` converted to a concrete payload type.
    ///
    /// A tag mismatch surfaces as `ValidationFailed`.
    pub fn get_as<T>(&self, key: &str) -> KvsResult<T>
    where
        T: for<'a> TryFrom<&'a Value, Error = KvsError>,
    {
        let value = self
            .live
            .get(key)
            .or_else(|| self.defaults.get(key))
            .ok_or_else(|| KvsError::KeyNotFound(key.to_string()))?;
        T::try_from(value)
    }

    /// Get the default value for `key`.
    pub fn get_default_value(&self, key: &str) -> KvsResult<Value> {
        self.defaults
            .get(key)
            .cloned()
            .ok_or_else(|| KvsError::KeyNotFound(key.to_string()))
    }

    /// Whether reading `key` currently yields its default value.
    ///
    /// `true` when no explicit value is set, or when the set value
    /// deep-equals the default. Errors when `key` has no default at all.
    pub fn is_default_value(&self, key: &str) -> KvsResult<bool> {
        let default = self
            .defaults
            .get(key)
            .ok_or_else(|| KvsError::KeyNotFound(key.to_string()))?;
        Ok(match self.live.get(key) {
            None => true,
            Some(value) => value == default,
        })
    }

    /// Whether `key` has an explicitly set value. Defaults do not count.
    pub fn key_exists(&self, key: &str) -> bool {
        self.live.contains_key(key)
    }

    /// Assign a value to `key`. Idempotent for equal values.
    ///
    /// Rejects the empty key and values outside the representable domain
    /// (non-finite floats, anywhere in the tree) with `InvalidValue`.
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<Value>) -> KvsResult<()> {
        self.guard_mutation()?;
        let key = key.into();
        if key.is_empty() {
            return Err(KvsError::InvalidValue("empty key".to_string()));
        }
        let value = value.into();
        value.validate()?;
        self.live.insert(key, value);
        Ok(())
    }

    /// Remove the explicitly set value for `key`, if any.
    pub fn remove_key(&mut self, key: &str) -> KvsResult<()> {
        self.guard_mutation()?;
        self.live.remove(key);
        Ok(())
    }

    /// Reset `key` back to its default.
    ///
    /// Errors with `KeyNotFound` when no default exists for the key.
    pub fn reset_key(&mut self, key: &str) -> KvsResult<()> {
        self.guard_mutation()?;
        if !self.defaults.contains_key(key) {
            return Err(KvsError::KeyNotFound(key.to_string()));
        }
        self.live.remove(key);
        Ok(())
    }

    /// Empty the live map; subsequent reads fall through to defaults.
    pub fn reset(&mut self) -> KvsResult<()> {
        self.guard_mutation()?;
        self.live.clear();
        Ok(())
    }

    /// All keys with explicitly set values, defaults not included.
    pub fn get_all_keys(&self) -> Vec<String> {
        self.live.keys().cloned().collect()
    }

    /// Serialize the live map as a new snapshot and rotate older ones.
    ///
    /// After a successful flush, the snapshot at index 0 reflects the
    /// live map exactly as it stood when the flush began.
    pub fn flush(&mut self) -> KvsResult<()> {
        self.guard_mutation()?;
        if self.store.max_count() == 0 {
            warn!(instance = %self.store.instance_id(), "snapshot retention is 0, flush ignored");
            return Ok(());
        }

        // Staging failures leave the previous ring observable, so the
        // instance stays usable; a commit failure forfeits that
        // guarantee.
        let staged = self.store.stage(&self.live)?;
        self.store.commit(staged).map_err(|err| {
            self.poisoned = true;
            warn!(instance = %self.store.instance_id(), error = %err, "flush poisoned the instance");
            err
        })?;

        debug!(
            instance = %self.store.instance_id(),
            keys = self.live.len(),
            snapshots = self.store.count(),
            "flushed"
        );
        Ok(())
    }

    /// Number of snapshots currently on disk.
    pub fn snapshot_count(&self) -> usize {
        self.store.count()
    }

    /// Configured retention bound of the snapshot ring.
    pub fn snapshot_max_count(&self) -> usize {
        self.store.max_count()
    }

    /// Replace the live map with the contents of snapshot `snapshot_id`.
    ///
    /// `0` denotes the most recent snapshot. Any load failure leaves the
    /// live map unchanged.
    pub fn snapshot_restore(&mut self, snapshot_id: SnapshotId) -> KvsResult<()> {
        self.guard_mutation()?;
        self.live = self.store.restore(snapshot_id)?;
        debug!(
            instance = %self.store.instance_id(),
            snapshot = snapshot_id.0,
            "restored"
        );
        Ok(())
    }

    /// Canonical payload path for a snapshot. Never touches the
    /// filesystem.
    pub fn kvs_filename(&self, snapshot_id: SnapshotId) -> PathBuf {
        self.store.kvs_file_path(snapshot_id)
    }

    /// Canonical sidecar path for a snapshot. Never touches the
    /// filesystem.
    pub fn hash_filename(&self, snapshot_id: SnapshotId) -> PathBuf {
        self.store.hash_file_path(snapshot_id)
    }
}

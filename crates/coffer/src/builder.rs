use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;

use coffer_snapshot::{SnapshotStore, DEFAULT_SNAPSHOT_MAX_COUNT};
use coffer_types::{InstanceId, KvsError, KvsResult, SnapshotId, ValueMap};

use crate::store::Kvs;

/// How the defaults file is treated at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultsMode {
    /// The defaults file must exist; construction fails without it.
    Required,
    /// The defaults file is loaded when present, otherwise the default
    /// map is empty.
    Optional,
    /// The defaults file is not consulted at all.
    Without,
}

impl FromStr for DefaultsMode {
    type Err = KvsError;

    fn from_str(text: &str) -> KvsResult<Self> {
        match text {
            "required" => Ok(Self::Required),
            "optional" => Ok(Self::Optional),
            "without" => Ok(Self::Without),
            // Accepted by legacy configurations but has no defined
            // semantics.
            "ignored" => Err(KvsError::ValidationFailed(
                "defaults mode \"ignored\" has no defined semantics".to_string(),
            )),
            other => Err(KvsError::ValidationFailed(format!(
                "unknown defaults mode: {other}"
            ))),
        }
    }
}

/// How an existing snapshot is treated at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadMode {
    /// Snapshot 0 must exist and verify; construction fails otherwise.
    Required,
    /// Snapshot 0 is loaded when present, otherwise the live map starts
    /// empty.
    Optional,
    /// Any existing snapshot is left alone; the live map starts empty.
    Without,
}

impl FromStr for LoadMode {
    type Err = KvsError;

    fn from_str(text: &str) -> KvsResult<Self> {
        match text {
            "required" => Ok(Self::Required),
            "optional" => Ok(Self::Optional),
            "without" => Ok(Self::Without),
            other => Err(KvsError::ValidationFailed(format!(
                "unknown load mode: {other}"
            ))),
        }
    }
}

/// Builder for [`Kvs`] instances.
///
/// Only the instance id is mandatory; every other setting has a default.
/// The builder is a stateless factory: each [`build`](Self::build)
/// produces an independent instance, and nothing is shared process-wide.
///
/// Construction is the only place where required-but-missing state is
/// distinguished from optional-missing state; all such failures surface
/// as builder errors.
pub struct KvsBuilder {
    instance_id: InstanceId,
    defaults: DefaultsMode,
    load: LoadMode,
    dir: Option<PathBuf>,
    snapshot_max_count: usize,
}

impl KvsBuilder {
    /// Start building an instance.
    ///
    /// Defaults: defaults file optional, snapshot load optional, working
    /// directory next to the process temp dir, retention bound
    /// [`DEFAULT_SNAPSHOT_MAX_COUNT`].
    pub fn new(instance_id: InstanceId) -> Self {
        Self {
            instance_id,
            defaults: DefaultsMode::Optional,
            load: LoadMode::Optional,
            dir: None,
            snapshot_max_count: DEFAULT_SNAPSHOT_MAX_COUNT,
        }
    }

    /// Configure defaults handling.
    pub fn defaults(mut self, mode: DefaultsMode) -> Self {
        self.defaults = mode;
        self
    }

    /// Configure snapshot load handling.
    pub fn load(mut self, mode: LoadMode) -> Self {
        self.load = mode;
        self
    }

    /// Set the working directory holding the instance's files.
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Override the retention bound of the snapshot ring.
    pub fn snapshot_max_count(mut self, max_count: usize) -> Self {
        self.snapshot_max_count = max_count;
        self
    }

    /// Validate the configuration, discover on-disk state, and open the
    /// instance.
    pub fn build(self) -> KvsResult<Kvs> {
        let dir = self.dir.unwrap_or_else(std::env::temp_dir);
        let store = SnapshotStore::new(dir, self.instance_id, self.snapshot_max_count);

        if self.defaults == DefaultsMode::Required && !store.defaults_file_exists() {
            return Err(KvsError::KvsFileReadError(format!(
                "required defaults file missing: {}",
                store.defaults_file_path().display()
            )));
        }

        let live = match self.load {
            LoadMode::Without => ValueMap::new(),
            LoadMode::Optional => {
                if store.snapshot_exists(SnapshotId::CURRENT) {
                    store.load(SnapshotId::CURRENT)?
                } else {
                    ValueMap::new()
                }
            }
            LoadMode::Required => store.load(SnapshotId::CURRENT)?,
        };

        let defaults = match self.defaults {
            DefaultsMode::Without => ValueMap::new(),
            DefaultsMode::Optional => {
                if store.defaults_file_exists() {
                    store.load_defaults()?
                } else {
                    ValueMap::new()
                }
            }
            DefaultsMode::Required => store.load_defaults()?,
        };

        debug!(
            instance = %self.instance_id,
            dir = %store.dir().display(),
            live_keys = live.len(),
            default_keys = defaults.len(),
            "instance opened"
        );
        Ok(Kvs::new(live, defaults, store))
    }
}

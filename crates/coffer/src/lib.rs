//! Embedded persistent key-value store with bounded snapshot history.
//!
//! A [`Kvs`] owns an in-memory live map of typed key/value bindings, a
//! read-only map of per-key defaults, and an on-disk ring of
//! checksum-protected snapshots. Reads fall through from the live map to
//! the defaults; mutations touch only the live map until [`Kvs::flush`]
//! writes a new snapshot and rotates older ones.
//!
//! Instances are constructed through [`KvsBuilder`], which validates the
//! configuration, discovers the current snapshot on disk, and loads the
//! defaults file if one is present.
//!
//! # Example
//!
//! ```no_run
//! use coffer::{InstanceId, KvsBuilder, Value};
//!
//! # fn main() -> coffer::KvsResult<()> {
//! let mut kvs = KvsBuilder::new(InstanceId(0)).dir("/var/lib/app").build()?;
//! kvs.set_value("greeting", "hello")?;
//! kvs.flush()?;
//! assert_eq!(kvs.get_value("greeting")?, Value::from("hello"));
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod store;

pub use builder::{DefaultsMode, KvsBuilder, LoadMode};
pub use store::Kvs;

pub use coffer_snapshot::DEFAULT_SNAPSHOT_MAX_COUNT;
pub use coffer_types::{InstanceId, KvsError, KvsResult, SnapshotId, Value, ValueMap, ValueTag};

//! On-disk snapshot storage for the coffer key-value store.
//!
//! A [`SnapshotStore`] owns a working directory and an instance id, and
//! keeps a bounded ring of checksum-protected snapshots of the live map.
//! Snapshot files are immutable once written; each flush stages a new
//! payload/sidecar pair at a temporary path, rotates the existing ring,
//! and only the final rename of the new index-0 pair makes the snapshot
//! observable. A crash before that rename leaves the previous ring
//! intact.
//!
//! # On-disk layout
//!
//! For working directory `D`, instance `I` and snapshot index `S`:
//!
//! - `D/kvs_<I>_<S>.json` — encoded payload
//! - `D/kvs_<I>_<S>.hash` — BLAKE3 sidecar (hex + newline)
//! - `D/kvs_<I>_default.json` — defaults, written externally, never by
//!   this crate

pub mod paths;
pub mod store;

pub use store::{SnapshotStore, StagedSnapshot, DEFAULT_SNAPSHOT_MAX_COUNT};

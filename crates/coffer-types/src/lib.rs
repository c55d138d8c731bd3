//! Foundation types for the coffer embedded key-value store.
//!
//! This crate provides the value domain model, the instance/snapshot
//! identifiers, and the error taxonomy used throughout the coffer system.
//! Every other coffer crate depends on `coffer-types`.
//!
//! # Key Types
//!
//! - [`Value`] — tagged recursive value carried by the store
//! - [`ValueMap`] — key to [`Value`] mapping (live data and defaults)
//! - [`InstanceId`] — identifies one logical store within a directory
//! - [`SnapshotId`] — snapshot index; `0` is the most recent snapshot
//! - [`KvsError`] — the closed error taxonomy surfaced to callers

pub mod error;
pub mod ids;
pub mod value;

pub use error::{KvsError, KvsResult};
pub use ids::{InstanceId, SnapshotId};
pub use value::{Value, ValueMap, ValueTag};

//! Deterministic snapshot encoding and content digests for coffer.
//!
//! The codec round-trips a [`coffer_types::ValueMap`] through a textual,
//! self-describing form: a single JSON object whose entries are tagged
//! value records. Encoding is byte-deterministic (equal maps produce
//! identical text on every run and platform), which is what makes the
//! digest in [`digest`] a stable integrity check for snapshot files.

pub mod codec;
pub mod digest;

pub use codec::{decode, encode};
pub use digest::Digest;

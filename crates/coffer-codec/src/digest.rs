//! Content digest for snapshot payloads.
//!
//! A snapshot's sidecar file holds the BLAKE3 digest of the encoded
//! payload as lowercase ASCII hex plus a trailing newline. Verification
//! recomputes the digest from the loaded payload and compares the
//! rendered sidecar byte-for-byte.

use std::fmt;

/// BLAKE3 digest of an encoded snapshot payload.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Compute the digest of a payload.
    pub fn compute(payload: &[u8]) -> Self {
        Self(*blake3::hash(payload).as_bytes())
    }

    /// Lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Sidecar file contents: hex digest plus a trailing newline.
    pub fn to_sidecar(&self) -> String {
        format!("{}\n", self.to_hex())
    }

    /// Compare against sidecar file contents, byte-for-byte.
    pub fn matches_sidecar(&self, contents: &str) -> bool {
        self.to_sidecar() == contents
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..8])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

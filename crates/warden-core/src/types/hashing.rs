//! Content hashing via xxh3.

use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// xxh3-64 digest of a byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub u64);

impl ContentHash {
    #[inline]
    pub fn of(content: &[u8]) -> Self {
        Self(xxh3_64(content))
    }

    #[inline]
    pub fn of_str(content: &str) -> Self {
        Self::of(content.as_bytes())
    }

    /// Fixed-width lowercase hex, the form written to audit records.
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        u64::from_str_radix(s, 16).ok().map(Self)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

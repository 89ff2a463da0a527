//! Content fingerprints used as persistent cache keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use xxhash_rust::xxh3::Xxh3;

/// A 128-bit content fingerprint computed using XXH3.
///
/// Two build requests with the same `Fingerprint` are assumed to produce the
/// same compiled binary. The hex rendering from [`Display`](fmt::Display) is
/// used directly as the cache file stem, so lookups are a path computation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    /// Computes a fingerprint of a single byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Error returned when parsing a fingerprint from its hex rendering fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fingerprint '{0}': expected 32 hex digits")]
pub struct ParseFingerprintError(pub String);

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 || !s.is_ascii() {
            return Err(ParseFingerprintError(s.to_string()));
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| ParseFingerprintError(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

/// Incremental fingerprint builder over a sequence of fields.
///
/// Each field is written with a length prefix, so adjacent fields cannot
/// alias: `("ab", "c")` and `("a", "bc")` produce different fingerprints.
pub struct FingerprintHasher {
    state: Xxh3,
}

impl FingerprintHasher {
    /// Creates a hasher seeded with a domain tag.
    pub fn new(domain: &str) -> Self {
        let mut hasher = Self { state: Xxh3::new() };
        hasher.write_field(domain.as_bytes());
        hasher
    }

    /// Appends one length-prefixed field.
    pub fn write_field(&mut self, data: &[u8]) -> &mut Self {
        self.state.update(&(data.len() as u64).to_le_bytes());
        self.state.update(data);
        self
    }

    /// Appends a string field.
    pub fn write_str(&mut self, s: &str) -> &mut Self {
        self.write_field(s.as_bytes())
    }

    /// Appends a count, used to delimit variable-length lists.
    pub fn write_len(&mut self, len: usize) -> &mut Self {
        self.state.update(&(len as u64).to_le_bytes());
        self
    }

    /// Finishes hashing and returns the fingerprint.
    pub fn finish(&self) -> Fingerprint {
        Fingerprint(self.state.digest128().to_le_bytes())
    }
}

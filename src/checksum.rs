//! Checksums of emitted schema text

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{Result, SchemaError};

/// SHA-256 of an emitted schema, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    pub fn from_text(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `text` hashes to this checksum
    pub fn verify(&self, text: &str) -> bool {
        *self == Self::from_text(text)
    }

    /// Like [`verify`](Self::verify), but fails with `ChecksumMismatch`
    pub fn ensure(&self, text: &str) -> Result<()> {
        let actual = Self::from_text(text);
        if *self != actual {
            return Err(SchemaError::ChecksumMismatch {
                expected: self.0.clone(),
                actual: actual.0,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Checksum {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

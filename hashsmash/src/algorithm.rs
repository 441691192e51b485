use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::errors::{CrackError, CrackResult};

/// Hash algorithms the engine can attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha256,
}

impl Algorithm {
    /// Digest size in bytes
    pub fn digest_len(&self) -> usize {
        match self {
            Algorithm::Md5 => 16,
            Algorithm::Sha1 => 20,
            Algorithm::Sha256 => 32,
        }
    }

    /// Length of the digest written as hex
    pub fn hex_len(&self) -> usize {
        self.digest_len() * 2
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha1 => "SHA1",
            Algorithm::Sha256 => "SHA256",
        }
    }

    fn from_hex_len(len: usize) -> Option<Self> {
        [Algorithm::Md5, Algorithm::Sha1, Algorithm::Sha256]
            .into_iter()
            .find(|algorithm| algorithm.hex_len() == len)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Infers the algorithm of a hex digest from its length.
///
/// The input must consist only of hex digits (either case) and have an even
/// length of 32, 40 or 64. Anything else is `InvalidHashFormat`.
pub fn classify(raw_hex: &str) -> CrackResult<Algorithm> {
    if raw_hex.is_empty() {
        return Err(CrackError::invalid_hash_format(raw_hex, "hash is empty"));
    }

    if let Some(bad) = raw_hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(CrackError::invalid_hash_format(
            raw_hex,
            format!("contains non-hex character {:?}", bad),
        ));
    }

    if raw_hex.len() % 2 != 0 {
        return Err(CrackError::invalid_hash_format(
            raw_hex,
            format!("odd number of hex digits ({})", raw_hex.len()),
        ));
    }

    Algorithm::from_hex_len(raw_hex.len()).ok_or_else(|| {
        CrackError::invalid_hash_format(
            raw_hex,
            format!(
                "unsupported length {} (expected 32 for MD5, 40 for SHA1 or 64 for SHA256)",
                raw_hex.len()
            ),
        )
    })
}

/// The digest being attacked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHash {
    raw_hex: String,
    decoded_bytes: Vec<u8>,
    algorithm: Algorithm,
}

impl TargetHash {
    /// Parses a target digest, ignoring surrounding whitespace and letter case
    pub fn parse(input: &str) -> CrackResult<Self> {
        let raw_hex = input.trim().to_ascii_lowercase();
        let algorithm = classify(&raw_hex)?;
        let decoded_bytes = hex::decode(&raw_hex)
            .map_err(|e| CrackError::invalid_hash_format(&raw_hex, e.to_string()))?;

        debug!("Target {} classified as {}", raw_hex, algorithm);
        Ok(Self {
            raw_hex,
            decoded_bytes,
            algorithm,
        })
    }

    pub fn raw_hex(&self) -> &str {
        &self.raw_hex
    }

    pub fn decoded_bytes(&self) -> &[u8] {
        &self.decoded_bytes
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl FromStr for TargetHash {
    type Err = CrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

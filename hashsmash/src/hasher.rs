//! Stateless digest computation.
//!
//! Each call builds its own hasher on the stack, so the functions here can be
//! invoked from any number of workers without synchronization.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::algorithm::Algorithm;

/// Computes the digest of `candidate`'s UTF-8 bytes
pub fn digest(algorithm: Algorithm, candidate: &str) -> Vec<u8> {
    let data = candidate.as_bytes();
    match algorithm {
        Algorithm::Md5 => Md5::digest(data).to_vec(),
        Algorithm::Sha1 => Sha1::digest(data).to_vec(),
        Algorithm::Sha256 => Sha256::digest(data).to_vec(),
    }
}

/// Compares the digest of `candidate` against `target` without allocating
pub fn digest_matches(algorithm: Algorithm, candidate: &str, target: &[u8]) -> bool {
    let data = candidate.as_bytes();
    match algorithm {
        Algorithm::Md5 => Md5::digest(data).as_slice() == target,
        Algorithm::Sha1 => Sha1::digest(data).as_slice() == target,
        Algorithm::Sha256 => Sha256::digest(data).as_slice() == target,
    }
}

//! Hashing for AlgoForge headers.
//!
//! SHA256d doubles as the block identity hash, so it ships built in. The
//! remaining proof-of-work functions (Scrypt, NIST5, Lyra2Z, X11, X16R) live
//! in the embedding node and are plugged into a [`HasherRegistry`].

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::core::types::{Algorithm, Hash256, SENTINEL_POW_HASH};

/// Signature of a proof-of-work hash over the serialized 80-byte header.
pub type PowHashFn = fn(&[u8]) -> Hash256;

pub fn double_sha256(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// Hash rendered the way block explorers show it: most significant byte first.
pub fn hash_hex(hash: &Hash256) -> String {
    let mut reversed = *hash;
    reversed.reverse();
    hex::encode(reversed)
}

/// Maps each algorithm to its PoW hash function.
#[derive(Clone)]
pub struct HasherRegistry {
    hashers: BTreeMap<Algorithm, PowHashFn>,
}

impl Default for HasherRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Algorithm::Sha256d, double_sha256);
        registry
    }
}

impl fmt::Debug for HasherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.hashers.keys()).finish()
    }
}

impl HasherRegistry {
    pub fn empty() -> Self { Self { hashers: BTreeMap::new() } }

    /// Install a hash function, returning the one it replaces.
    pub fn register(&mut self, algo: Algorithm, hasher: PowHashFn) -> Option<PowHashFn> {
        self.hashers.insert(algo, hasher)
    }

    pub fn contains(&self, algo: Algorithm) -> bool { self.hashers.contains_key(&algo) }

    /// Hash `header_bytes` with the algorithm selected by `version`. Unknown
    /// tags and unregistered algorithms yield the all-ones sentinel.
    pub fn pow_hash(&self, version: u32, header_bytes: &[u8]) -> Hash256 {
        let algo = Algorithm::from_version(version);
        match algo.and_then(|a| self.hashers.get(&a)) {
            Some(hasher) => hasher(header_bytes),
            None => {
                tracing::debug!("no PoW hasher for version {:#010x} ({:?})", version, algo);
                SENTINEL_POW_HASH
            }
        }
    }
}

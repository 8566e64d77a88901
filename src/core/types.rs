use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::params::ConsensusParams;
use crate::crypto::HasherRegistry;

/// A 32-byte hash used throughout the system
pub type Hash256 = [u8; 32];

/// Null hash (all zeros) used for genesis block's prev_hash
pub const NULL_HASH: Hash256 = [0u8; 32];

/// PoW hash reported for headers nobody can hash. Never meets a valid target.
pub const SENTINEL_POW_HASH: Hash256 = [0xff; 32];

/// Bits of the block version that carry the algorithm tag.
pub const ALGO_VERSION_MASK: u32 = 0x0000_0f00;

/// Number of algorithms mined in parallel. Drives the retarget windows and
/// the dead-lock protection grace period.
pub const ALGO_ACTIVE_COUNT: u32 = 5;

pub fn algo_tag(version: u32) -> u32 {
    version & ALGO_VERSION_MASK
}

// ─── Algorithms ──────────────────────────────────────────────────────

/// Proof-of-work algorithms known to consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Sha256d,
    Scrypt,
    Nist5,
    Lyra2z,
    X11,
    X16r,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Sha256d,
        Algorithm::Scrypt,
        Algorithm::Nist5,
        Algorithm::Lyra2z,
        Algorithm::X11,
        Algorithm::X16r,
    ];

    /// Version bits selecting this algorithm.
    pub const fn tag(self) -> u32 {
        match self {
            Algorithm::Sha256d => 0x000,
            Algorithm::Scrypt => 0x100,
            Algorithm::Nist5 => 0x200,
            Algorithm::Lyra2z => 0x300,
            Algorithm::X11 => 0x400,
            Algorithm::X16r => 0x500,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.tag() == tag)
    }

    pub fn from_version(version: u32) -> Option<Self> {
        Self::from_tag(algo_tag(version))
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Sha256d => "Sha256d",
            Algorithm::Scrypt => "Scrypt",
            Algorithm::Nist5 => "Nist5",
            Algorithm::Lyra2z => "Lyra2z",
            Algorithm::X11 => "X11",
            Algorithm::X16r => "X16R",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Block Types ─────────────────────────────────────────────────────

/// Block header, serialized as the classic 80-byte little-endian layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub prev_hash: Hash256,
    pub merkle_root: Hash256,
    pub time: u32,
    /// Compact difficulty target
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    pub const SERIALIZED_SIZE: usize = 80;

    /// Header skeleton carrying only what retargeting and subsidy look at.
    pub fn candidate(version: u32, time: u32, bits: u32) -> Self {
        BlockHeader {
            version,
            prev_hash: NULL_HASH,
            merkle_root: NULL_HASH,
            time,
            bits,
            nonce: 0,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        bincode::serialize(self).expect("header serialization failed")
    }

    /// Block identity: double SHA-256 of the serialized header.
    pub fn hash(&self) -> Hash256 {
        crate::crypto::double_sha256(&self.serialize())
    }

    /// Algorithm-dependent hash, only meaningful for PoW checks.
    pub fn pow_hash(&self, hashers: &HasherRegistry) -> Hash256 {
        hashers.pow_hash(self.version, &self.serialize())
    }

    pub fn check_pow(&self, hashers: &HasherRegistry, params: &ConsensusParams) -> bool {
        crate::pow::check_proof_of_work(&self.pow_hash(hashers), self.bits, params)
    }

    pub fn algo_tag(&self) -> u32 { algo_tag(self.version) }

    pub fn algorithm(&self) -> Option<Algorithm> { Algorithm::from_version(self.version) }

    pub fn block_time(&self) -> i64 { self.time as i64 }
}

//! Per-algorithm normalization constants.
//!
//! One unit of raw target on algorithm A is worth `efficiency(A)` normalized
//! units. Every historical block is re-normalized with this table, so entries
//! are append-only: a new algorithm adds a row, existing rows never change.

use crate::core::types::Algorithm;

/// Bumped whenever a row is appended.
pub const EFFICIENCY_TABLE_VERSION: u32 = 1;

const EFFICIENCY_TABLE: [(Algorithm, u64); 6] = [
    (Algorithm::Sha256d, 1),
    (Algorithm::Scrypt, 13_747),
    (Algorithm::Nist5, 2_631),
    (Algorithm::Lyra2z, 2_014_035),
    (Algorithm::X11, 477),
    (Algorithm::X16r, 1),
];

/// Normalization constant for the algorithm selected by `version`.
/// Unknown tags fall back to 1.
pub fn efficiency(version: u32) -> u64 {
    match Algorithm::from_version(version) {
        Some(algo) => algorithm_efficiency(algo),
        None => {
            tracing::debug!("efficiency requested for unknown algorithm, version {:#010x}", version);
            1
        }
    }
}

pub fn algorithm_efficiency(algo: Algorithm) -> u64 {
    EFFICIENCY_TABLE
        .iter()
        .find(|(a, _)| *a == algo)
        .map(|(_, e)| *e)
        .unwrap_or(1)
}

//! Proof-of-work validation and difficulty retargeting.
//!
//!   target      256-bit targets and the compact (nBits) encoding
//!   efficiency  per-algorithm normalization used by multi-algorithm averaging
//!   handbrake   per-algorithm difficulty divisor gated by sporks
//!   retarget    required bits for the next block

pub mod efficiency;
pub mod handbrake;
pub mod retarget;
pub mod target;

pub use retarget::next_work_required;
pub use target::Target;

use crate::core::params::ConsensusParams;
use crate::core::types::Hash256;

/// Check `hash` against the compact target `bits`.
///
/// Fails when `bits` decodes to a negative, zero or overflowed value, or to a
/// target easier than the network limit. The hash is read as a little-endian
/// 256-bit integer.
pub fn check_proof_of_work(hash: &Hash256, bits: u32, params: &ConsensusParams) -> bool {
    let decoded = Target::decode_compact(bits);
    if decoded.negative || decoded.overflow || decoded.target.is_zero() || decoded.target > params.pow_limit {
        return false;
    }
    Target::from_le_bytes(hash) <= decoded.target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SENTINEL_POW_HASH;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_target_below(rng: &mut StdRng, limit: &Target) -> Target {
        let mut bytes = [0u8; 32];
        rng.fill(&mut bytes[..]);
        let extra = rng.gen_range(0..200u32);
        let candidate = Target::from_le_bytes(&bytes).shr(256 - limit.bits() as u32 + extra);
        if candidate.is_zero() { Target::from_u64(1) } else { candidate }
    }

    #[test]
    fn test_hash_equal_to_target_passes() {
        let params = ConsensusParams::main();
        let bits = 0x1d00ffff;
        let target = Target::from_compact(bits);
        assert!(check_proof_of_work(&target.to_le_bytes(), bits, &params));
        let above = target.wrapping_add(&Target::from_u64(1));
        assert!(!check_proof_of_work(&above.to_le_bytes(), bits, &params));
    }

    #[test]
    fn test_rejects_malformed_bits() {
        let params = ConsensusParams::regtest();
        let zero_hash = [0u8; 32];
        // negative
        assert!(!check_proof_of_work(&zero_hash, 0x04923456, &params));
        // zero
        assert!(!check_proof_of_work(&zero_hash, 0x00000000, &params));
        assert!(!check_proof_of_work(&zero_hash, 0x03000000, &params));
        // overflow
        assert!(!check_proof_of_work(&zero_hash, 0xff123456, &params));
        // easier than the limit
        assert!(!check_proof_of_work(&zero_hash, 0x2100ffff, &params));
    }

    #[test]
    fn test_limit_itself_is_valid() {
        for params in [ConsensusParams::main(), ConsensusParams::regtest()] {
            assert!(check_proof_of_work(&[0u8; 32], params.pow_limit_compact(), &params));
        }
    }

    #[test]
    fn test_sentinel_never_passes() {
        let params = ConsensusParams::regtest();
        assert!(!check_proof_of_work(&SENTINEL_POW_HASH, params.pow_limit_compact(), &params));
    }

    #[test]
    fn test_random_hashes_against_random_targets() {
        let params = ConsensusParams::main();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..500 {
            let bits = random_target_below(&mut rng, &params.pow_limit).to_compact();
            let target = Target::from_compact(bits);
            if target.is_zero() {
                continue;
            }

            let mut bytes = [0u8; 32];
            rng.fill(&mut bytes[..]);
            let hash = Target::from_le_bytes(&bytes);
            assert_eq!(check_proof_of_work(&bytes, bits, &params), hash <= target);

            let below = target.shr(rng.gen_range(0..8));
            assert!(check_proof_of_work(&below.to_le_bytes(), bits, &params));
        }
    }
}

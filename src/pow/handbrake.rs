//! Difficulty divisor throttling individual algorithms.

use crate::core::spork::{ActivationGate, SporkId, MAX_HANDBRAKE_FORCE};
use crate::core::types::Algorithm;

/// Force applied to NIST5 before the alpha reward upgrade. Large enough that
/// no real hash rate can meet the resulting target.
pub const HANDBRAKE_DISABLED_FORCE: u64 = 4_070_908_800;

/// Divisor applied to the target of a block with `version` at `height`.
/// Always at least 1.
pub fn handbrake_force(version: u32, height: u32, gate: &dyn ActivationGate) -> u64 {
    let algo = Algorithm::from_version(version);

    // NIST5 stays braked until the alpha reward upgrade, whatever the force sporks say
    if algo == Some(Algorithm::Nist5) && !gate.is_active(SporkId::AlphaRewardStart, height) {
        return HANDBRAKE_DISABLED_FORCE;
    }

    if !gate.is_active(SporkId::HandbrakeHeight, height) {
        return 1;
    }

    let Some(algo) = algo else {
        tracing::warn!("handbrake requested for unknown algorithm, version {:#010x}", version);
        return 1;
    };
    let spork = SporkId::handbrake_force(algo);
    let force = gate.value(spork);
    if force < 1 {
        tracing::warn!("{} = {} is not a valid divisor, using 1", spork, force);
        return 1;
    }
    if force > MAX_HANDBRAKE_FORCE {
        tracing::warn!("{} = {} exceeds the 32-bit force range, capping", spork, force);
        return MAX_HANDBRAKE_FORCE as u64;
    }
    force as u64
}

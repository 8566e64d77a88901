use crate::core::params::{Amount, ConsensusParams, MAX_BLOCK_SUBSIDY};
use crate::core::spork::{ActivationGate, SporkId};
use crate::core::types::Algorithm;

/// Where a height sits in the halving schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalvingParameters {
    pub interval: u32,
    /// Halvings already applied; always 0 once unlimited subsidy is active.
    pub count: u32,
}

pub fn halving_parameters(height: u32, params: &ConsensusParams, gate: &dyn ActivationGate) -> HalvingParameters {
    let interval = params.subsidy_halving_interval;
    let count = if gate.is_active(SporkId::UnlimitedSubsidyStart, height) {
        0
    } else {
        height.checked_div(interval).unwrap_or(0)
    };
    HalvingParameters { interval, count }
}

/// Alpha reward cost factor in hundredths (125 = x1.25). Neutral before the
/// alpha reward upgrade and for unknown algorithms.
pub fn algo_cost_factor(version: u32, height: u32, gate: &dyn ActivationGate) -> u64 {
    if !gate.is_active(SporkId::AlphaRewardStart, height) {
        return 100;
    }
    match Algorithm::from_version(version) {
        Some(Algorithm::Sha256d) => 100,
        Some(Algorithm::Scrypt) => 125,
        Some(Algorithm::Nist5) => 150,
        Some(Algorithm::Lyra2z) => 200,
        Some(Algorithm::X11) => 175,
        Some(Algorithm::X16r) => 100,
        None => 100,
    }
}

/// Coinbase subsidy for a block at `height` mined with `version`.
pub fn block_subsidy(height: u32, version: u32, params: &ConsensusParams, gate: &dyn ActivationGate) -> Amount {
    let halving = halving_parameters(height, params, gate);
    let mut subsidy = params.initial_subsidy.checked_shr(halving.count).unwrap_or(0);
    subsidy = subsidy.max(params.minimum_subsidy);

    if gate.is_active(SporkId::AlphaRewardStart, height) {
        subsidy = subsidy.saturating_mul(algo_cost_factor(version, height, gate)) / 100;
        subsidy = subsidy.saturating_mul(params.alpha_rewards_multiplier);
    }

    subsidy = subsidy.max(params.minimum_subsidy);
    if subsidy > MAX_BLOCK_SUBSIDY {
        tracing::warn!("subsidy {} at height {} above cap, clamped to {}", subsidy, height, MAX_BLOCK_SUBSIDY);
        return MAX_BLOCK_SUBSIDY;
    }
    subsidy
}

//! AlgoForge Chain Parameters
//! All consensus-critical constants are defined here. One `ConsensusParams`
//! value exists per network and is never mutated after start-up.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pow::target::Target;

/// Amount in base units
pub type Amount = u64;

/// Base unit denomination (like satoshis for Bitcoin)
pub const COIN: Amount = 100_000_000;

/// Upper bound for any single block subsidy.
pub const MAX_BLOCK_SUBSIDY: Amount = 10_000 * COIN;

/// Networks with their own parameter tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Testnet,
    Regtest,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::Main => "main",
            Network::Testnet => "test",
            Network::Regtest => "regtest",
        })
    }
}

/// Retargeting used before the multi-algorithm chain starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyRetarget {
    /// Fixed interval, Bitcoin/Litecoin style
    Bitcoin,
    /// Dark Gravity Wave v3 over the last 24 blocks
    DarkGravityWave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusParams {
    pub network: Network,
    /// Easiest target a block may carry
    pub pow_limit: Target,
    /// Target block time in seconds
    pub pow_target_spacing: i64,
    /// Fixed-interval retarget window in seconds
    pub pow_target_timespan: i64,
    /// Allow min-difficulty blocks after a long gap (test networks)
    pub allow_min_difficulty_blocks: bool,
    /// Multi-algorithm retarget returns the tip's bits unchanged
    pub no_retargeting: bool,
    pub legacy_retarget: LegacyRetarget,
    pub subsidy_halving_interval: u32,
    /// Epoch-0 block subsidy
    pub initial_subsidy: Amount,
    /// Floor for the subsidy; halving never goes below it
    pub minimum_subsidy: Amount,
    /// Reward multiplier once the alpha reward upgrade is active
    pub alpha_rewards_multiplier: Amount,
    /// First block paying budget/superblock rewards (reported only)
    pub budget_payments_start_block: u32,
}

impl ConsensusParams {
    pub fn main() -> Self {
        ConsensusParams {
            network: Network::Main,
            pow_limit: Target::with_leading_zero_bits(20),
            pow_target_spacing: 60,
            pow_target_timespan: 24 * 60 * 60,
            allow_min_difficulty_blocks: false,
            no_retargeting: false,
            legacy_retarget: LegacyRetarget::DarkGravityWave,
            subsidy_halving_interval: 865_000,
            initial_subsidy: 10 * COIN,
            minimum_subsidy: 100,
            alpha_rewards_multiplier: 2,
            budget_payments_start_block: 5,
        }
    }

    pub fn testnet() -> Self {
        ConsensusParams {
            network: Network::Testnet,
            allow_min_difficulty_blocks: true,
            budget_payments_start_block: 4100,
            ..Self::main()
        }
    }

    pub fn regtest() -> Self {
        ConsensusParams {
            network: Network::Regtest,
            pow_limit: Target::with_leading_zero_bits(1),
            pow_target_spacing: 1,
            allow_min_difficulty_blocks: true,
            no_retargeting: true,
            subsidy_halving_interval: 150,
            budget_payments_start_block: 1000,
            ..Self::main()
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Main => Self::main(),
            Network::Testnet => Self::testnet(),
            Network::Regtest => Self::regtest(),
        }
    }

    /// Blocks between fixed-interval retargets
    pub fn difficulty_adjustment_interval(&self) -> i64 {
        self.pow_target_timespan / self.pow_target_spacing
    }

    pub fn pow_limit_compact(&self) -> u32 {
        self.pow_limit.to_compact()
    }
}

/// Render an amount with eight decimals, e.g. `0.00000100`
pub fn format_amount(amount: Amount) -> String {
    format!("{}.{:08}", amount / COIN, amount % COIN)
}

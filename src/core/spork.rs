//! Activation values ("sporks") gating height-dependent consensus rules.
//!
//! Retargeting and subsidy code only sees the [`ActivationGate`] trait.
//! [`SporkTable`] is the in-process implementation: per-network defaults plus
//! overrides supplied at start-up or while running.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::core::params::Network;
use crate::core::types::Algorithm;
use crate::error::SporkError;

/// Activation height above every `u32` block height.
pub const SPORK_DISABLED: i64 = u32::MAX as i64 + 1;

/// Largest value a force spork may carry.
pub const MAX_HANDBRAKE_FORCE: i64 = u32::MAX as i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SporkId {
    /// First height retargeted by the multi-algorithm engine
    MultiAlgoChainStart,
    /// From this height the subsidy stops halving
    UnlimitedSubsidyStart,
    /// Alpha reward upgrade: algorithm cost factors, NIST5 released
    AlphaRewardStart,
    /// From this height the per-algorithm handbrake forces apply
    HandbrakeHeight,
    HandbrakeForceSha256d,
    HandbrakeForceScrypt,
    HandbrakeForceNist5,
    HandbrakeForceLyra2z,
    HandbrakeForceX11,
    HandbrakeForceX16r,
}

impl SporkId {
    pub const ALL: [SporkId; 10] = [
        SporkId::MultiAlgoChainStart,
        SporkId::UnlimitedSubsidyStart,
        SporkId::AlphaRewardStart,
        SporkId::HandbrakeHeight,
        SporkId::HandbrakeForceSha256d,
        SporkId::HandbrakeForceScrypt,
        SporkId::HandbrakeForceNist5,
        SporkId::HandbrakeForceLyra2z,
        SporkId::HandbrakeForceX11,
        SporkId::HandbrakeForceX16r,
    ];

    pub fn handbrake_force(algo: Algorithm) -> SporkId {
        match algo {
            Algorithm::Sha256d => SporkId::HandbrakeForceSha256d,
            Algorithm::Scrypt => SporkId::HandbrakeForceScrypt,
            Algorithm::Nist5 => SporkId::HandbrakeForceNist5,
            Algorithm::Lyra2z => SporkId::HandbrakeForceLyra2z,
            Algorithm::X11 => SporkId::HandbrakeForceX11,
            Algorithm::X16r => SporkId::HandbrakeForceX16r,
        }
    }

    /// Height sporks switch rules on; the others carry plain values.
    pub fn is_activation_height(self) -> bool {
        matches!(
            self,
            SporkId::MultiAlgoChainStart
                | SporkId::UnlimitedSubsidyStart
                | SporkId::AlphaRewardStart
                | SporkId::HandbrakeHeight
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            SporkId::MultiAlgoChainStart => "multi_algo_chain_start",
            SporkId::UnlimitedSubsidyStart => "unlimited_subsidy_start",
            SporkId::AlphaRewardStart => "alpha_reward_start",
            SporkId::HandbrakeHeight => "handbrake_height",
            SporkId::HandbrakeForceSha256d => "handbrake_force_sha256d",
            SporkId::HandbrakeForceScrypt => "handbrake_force_scrypt",
            SporkId::HandbrakeForceNist5 => "handbrake_force_nist5",
            SporkId::HandbrakeForceLyra2z => "handbrake_force_lyra2z",
            SporkId::HandbrakeForceX11 => "handbrake_force_x11",
            SporkId::HandbrakeForceX16r => "handbrake_force_x16r",
        }
    }
}

impl fmt::Display for SporkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SporkId {
    type Err = SporkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SporkId::ALL
            .iter()
            .copied()
            .find(|id| id.name() == wanted)
            .ok_or_else(|| SporkError::UnknownSpork(s.to_string()))
    }
}

// ─── Gate ────────────────────────────────────────────────────────────

/// Source of activation values. Height values must only ever move forward
/// relative to the chain: a rule observed active at height H stays active for
/// every height ≥ H.
pub trait ActivationGate {
    fn value(&self, spork: SporkId) -> i64;

    fn is_active(&self, spork: SporkId, height: u32) -> bool {
        height as i64 >= self.value(spork)
    }
}

// ─── Spork table ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SporkTable {
    values: BTreeMap<SporkId, i64>,
}

impl SporkTable {
    pub fn defaults(network: Network) -> Self {
        let (chain_start, alpha_start, handbrake_height) = match network {
            Network::Main => (19_335, 60_000, 19_335),
            Network::Testnet => (100, 500, 100),
            Network::Regtest => (0, 200, 0),
        };
        let mut values = BTreeMap::new();
        values.insert(SporkId::MultiAlgoChainStart, chain_start);
        values.insert(SporkId::UnlimitedSubsidyStart, SPORK_DISABLED);
        values.insert(SporkId::AlphaRewardStart, alpha_start);
        values.insert(SporkId::HandbrakeHeight, handbrake_height);
        for algo in Algorithm::ALL {
            values.insert(SporkId::handbrake_force(algo), 1);
        }
        SporkTable { values }
    }

    fn check_value(spork: SporkId, value: i64) -> Result<(), SporkError> {
        let valid = if spork.is_activation_height() {
            value >= 0
        } else {
            (1..=MAX_HANDBRAKE_FORCE).contains(&value)
        };
        if valid { Ok(()) } else { Err(SporkError::InvalidValue { spork, value }) }
    }

    /// Configure a value before any block has been validated.
    pub fn set(&mut self, spork: SporkId, value: i64) -> Result<(), SporkError> {
        Self::check_value(spork, value)?;
        self.values.insert(spork, value);
        Ok(())
    }

    /// Change a value on a running node whose chain is at `tip_height`.
    /// Activation heights that already took effect are frozen, and new ones
    /// must lie above the tip.
    pub fn update(&mut self, spork: SporkId, value: i64, tip_height: u32) -> Result<(), SporkError> {
        Self::check_value(spork, value)?;
        if spork.is_activation_height() {
            let current = self.value(spork);
            if current <= tip_height as i64 && value != current {
                return Err(SporkError::AlreadyActive { spork, active_since: current });
            }
            if value <= tip_height as i64 && value != current {
                return Err(SporkError::RetroactiveActivation { spork, value, tip_height });
            }
        }
        tracing::info!("spork {} updated: {} -> {}", spork, self.value(spork), value);
        self.values.insert(spork, value);
        Ok(())
    }

    /// Apply a `NAME=VALUE` override.
    pub fn apply_override(&mut self, arg: &str) -> Result<(), SporkError> {
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| SporkError::MalformedOverride(arg.to_string()))?;
        let spork: SporkId = name.parse()?;
        let value: i64 = value
            .trim()
            .parse()
            .map_err(|_| SporkError::MalformedOverride(arg.to_string()))?;
        self.set(spork, value)
    }

    /// Apply overrides from a JSON object such as `{"alpha_reward_start": 1000}`.
    pub fn apply_json(&mut self, json: &str) -> Result<(), SporkError> {
        let overrides: BTreeMap<SporkId, i64> = serde_json::from_str(json)?;
        for (spork, value) in overrides {
            self.set(spork, value)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SporkId, i64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

impl ActivationGate for SporkTable {
    fn value(&self, spork: SporkId) -> i64 {
        // every id is seeded by defaults()
        self.values.get(&spork).copied().unwrap_or(SPORK_DISABLED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_spork() {
        for network in [Network::Main, Network::Testnet, Network::Regtest] {
            let table = SporkTable::defaults(network);
            assert_eq!(table.iter().count(), SporkId::ALL.len());
        }
    }

    #[test]
    fn test_is_active_is_monotonic_in_height() {
        let table = SporkTable::defaults(Network::Main);
        let start = table.value(SporkId::AlphaRewardStart) as u32;
        assert!(!table.is_active(SporkId::AlphaRewardStart, start - 1));
        for h in start..start + 100 {
            assert!(table.is_active(SporkId::AlphaRewardStart, h));
        }
    }

    #[test]
    fn test_unlimited_subsidy_disabled_by_default() {
        let table = SporkTable::defaults(Network::Main);
        assert!(!table.is_active(SporkId::UnlimitedSubsidyStart, u32::MAX));
        assert!(!table.is_active(SporkId::UnlimitedSubsidyStart, 4_070_908_800));
        for network in [Network::Main, Network::Testnet, Network::Regtest] {
            assert_eq!(SporkTable::defaults(network).value(SporkId::UnlimitedSubsidyStart), SPORK_DISABLED);
        }
    }

    #[test]
    fn test_force_range() {
        let mut table = SporkTable::defaults(Network::Main);
        table.set(SporkId::HandbrakeForceX16r, MAX_HANDBRAKE_FORCE).unwrap();
        assert!(matches!(
            table.set(SporkId::HandbrakeForceX16r, MAX_HANDBRAKE_FORCE + 1),
            Err(SporkError::InvalidValue { .. })
        ));
        assert!(matches!(
            table.apply_override("handbrake_force_x11=4294967296"),
            Err(SporkError::InvalidValue { .. })
        ));
        // heights are not capped
        table.set(SporkId::UnlimitedSubsidyStart, SPORK_DISABLED).unwrap();
    }

    #[test]
    fn test_names_round_trip() {
        for id in SporkId::ALL {
            assert_eq!(id.name().parse::<SporkId>().unwrap(), id);
        }
        assert!("no_such_spork".parse::<SporkId>().is_err());
    }

    #[test]
    fn test_apply_override() {
        let mut table = SporkTable::defaults(Network::Testnet);
        table.apply_override("handbrake_force_scrypt=8").unwrap();
        assert_eq!(table.value(SporkId::HandbrakeForceScrypt), 8);
        assert!(matches!(table.apply_override("handbrake_force_scrypt"), Err(SporkError::MalformedOverride(_))));
        assert!(matches!(table.apply_override("handbrake_force_scrypt=x"), Err(SporkError::MalformedOverride(_))));
        assert!(matches!(table.apply_override("handbrake_force_scrypt=0"), Err(SporkError::InvalidValue { .. })));
    }

    #[test]
    fn test_apply_json() {
        let mut table = SporkTable::defaults(Network::Regtest);
        table.apply_json(r#"{"alpha_reward_start": 1000, "handbrake_force_x11": 3}"#).unwrap();
        assert_eq!(table.value(SporkId::AlphaRewardStart), 1000);
        assert_eq!(table.value(SporkId::HandbrakeForceX11), 3);
        assert!(table.apply_json(r#"{"bogus": 1}"#).is_err());
    }

    #[test]
    fn test_update_refuses_to_move_active_height() {
        let mut table = SporkTable::defaults(Network::Regtest);
        // alpha_reward_start = 200, chain at 250: already active
        let err = table.update(SporkId::AlphaRewardStart, 300, 250).unwrap_err();
        assert!(matches!(err, SporkError::AlreadyActive { active_since: 200, .. }));
        // re-asserting the same value is fine
        table.update(SporkId::AlphaRewardStart, 200, 250).unwrap();
    }

    #[test]
    fn test_update_refuses_retroactive_activation() {
        let mut table = SporkTable::defaults(Network::Main);
        let err = table.update(SporkId::UnlimitedSubsidyStart, 100, 500).unwrap_err();
        assert!(matches!(err, SporkError::RetroactiveActivation { .. }));
        table.update(SporkId::UnlimitedSubsidyStart, 501, 500).unwrap();
        assert!(table.is_active(SporkId::UnlimitedSubsidyStart, 501));
    }

    #[test]
    fn test_update_force_values_freely() {
        let mut table = SporkTable::defaults(Network::Main);
        table.update(SporkId::HandbrakeForceSha256d, 20, 1_000_000).unwrap();
        table.update(SporkId::HandbrakeForceSha256d, 1, 1_000_000).unwrap();
        assert_eq!(table.value(SporkId::HandbrakeForceSha256d), 1);
    }
}

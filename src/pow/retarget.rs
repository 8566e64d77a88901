//! Required difficulty for the next block.
//!
//! Three strategies cover the chain's history:
//!
//!   - legacy fixed-interval retargeting (Bitcoin/Litecoin style)
//!   - legacy Dark Gravity Wave v3 over the last 24 blocks
//!   - multi-algorithm Dark Gravity Wave, from `MultiAlgoChainStart` onwards
//!
//! The multi-algorithm path normalizes every block's target by its
//! algorithm's efficiency so one average can span all algorithms, and it is
//! followed by dead-lock protection which relaxes difficulty when no block has
//! been found for a while.
//!
//! Everything here is consensus-critical: results must match bit for bit on
//! every node, including the wrapping behavior of 256-bit arithmetic.

use crate::core::chain::BlockIndex;
use crate::core::params::{ConsensusParams, LegacyRetarget};
use crate::core::spork::{ActivationGate, SporkId};
use crate::core::types::{algo_tag, BlockHeader, ALGO_ACTIVE_COUNT};
use crate::pow::efficiency::efficiency;
use crate::pow::handbrake::handbrake_force;
use crate::pow::target::Target;

/// Blocks averaged by the legacy Dark Gravity Wave.
pub const DGW_PAST_BLOCKS: u32 = 24;

/// Same-algorithm samples in the fast (instamine) average.
pub const ALGO_FAST_WINDOW: u32 = 5;
/// Same-algorithm samples in the full average.
pub const ALGO_WINDOW: u32 = ALGO_FAST_WINDOW * ALGO_ACTIVE_COUNT;
/// Blocks of any algorithm in the fast (instamine) average.
pub const CHAIN_FAST_WINDOW: u32 = ALGO_FAST_WINDOW * 2;
/// Blocks of any algorithm in the full average, stretched for stable spacing.
pub const CHAIN_WINDOW: u32 = CHAIN_FAST_WINDOW * ALGO_ACTIVE_COUNT * 100;

/// Compact bits the block after `tip` must carry.
///
/// `tip` is `None` only when `candidate` is the genesis block.
pub fn next_work_required(
    tip: Option<BlockIndex<'_>>,
    candidate: &BlockHeader,
    params: &ConsensusParams,
    gate: &dyn ActivationGate,
) -> u32 {
    let Some(tip) = tip else {
        return params.pow_limit_compact();
    };

    if !gate.is_active(SporkId::MultiAlgoChainStart, tip.height() + 1) {
        return match params.legacy_retarget {
            LegacyRetarget::Bitcoin => legacy_fixed_interval(tip, candidate, params),
            LegacyRetarget::DarkGravityWave => legacy_dark_gravity_wave(tip, params),
        };
    }

    let bits = multi_algo_dark_gravity_wave(tip, candidate, params, gate);
    dead_lock_protection(bits, tip, candidate, params)
}

/// `(avg * (n - 1) + sample) / n` with 256-bit wrapping.
fn running_average(avg: &Target, n: u32, sample: &Target) -> Target {
    avg.wrapping_mul((n - 1) as u64).wrapping_add(sample).div(n as u64)
}

fn clamp_timespan(actual: i64, min: i64, max: i64) -> i64 {
    if actual < min {
        min
    } else if actual > max {
        max
    } else {
        actual
    }
}

/// `target * actual / expected`. Both timespans are positive after clamping.
fn rescale(target: &Target, actual: i64, expected: i64) -> Target {
    target.wrapping_mul(actual as u64).div(expected as u64)
}

// ─── Legacy fixed interval ──────────────────────────────────────────

fn legacy_fixed_interval(tip: BlockIndex<'_>, candidate: &BlockHeader, params: &ConsensusParams) -> u32 {
    let limit_bits = params.pow_limit_compact();
    let interval = params.difficulty_adjustment_interval();
    let next_height = tip.height() as i64 + 1;

    if next_height % interval != 0 {
        if params.allow_min_difficulty_blocks {
            // testnet: a block more than two spacings late may be mined at minimum difficulty
            if candidate.block_time() > tip.block_time() + params.pow_target_spacing * 2 {
                return limit_bits;
            }
            let mut cursor = tip;
            while cursor.height() as i64 % interval != 0 && cursor.bits() == limit_bits {
                match cursor.prev() {
                    Some(prev) => cursor = prev,
                    None => break,
                }
            }
            return cursor.bits();
        }
        return tip.bits();
    }

    // go back a full interval, except on the first retarget after genesis
    let blocks_back = if next_height == interval { interval - 1 } else { interval };
    let mut first = tip;
    for _ in 0..blocks_back {
        first = first.expect_prev();
    }

    let timespan = params.pow_target_timespan;
    let actual = clamp_timespan(tip.block_time() - first.block_time(), timespan / 4, timespan * 4);

    let old = Target::from_compact(tip.bits());
    // the intermediate product can overflow by one bit
    let shift = old.bits() > 235;
    let mut new = if shift { old.shr(1) } else { old.clone() };
    new = rescale(&new, actual, timespan);
    if shift {
        new = new.wrapping_shl(1);
    }
    if new > params.pow_limit {
        new = params.pow_limit.clone();
    }

    tracing::debug!(
        "fixed-interval retarget at {}: timespan {} actual {}, {:08x} -> {:08x}",
        next_height,
        timespan,
        actual,
        tip.bits(),
        new.to_compact()
    );
    new.to_compact()
}

// ─── Legacy Dark Gravity Wave ───────────────────────────────────────

fn legacy_dark_gravity_wave(tip: BlockIndex<'_>, params: &ConsensusParams) -> u32 {
    if tip.height() == 0 || tip.height() < DGW_PAST_BLOCKS {
        return params.pow_limit_compact();
    }

    let mut average = Target::zero();
    let mut count = 0u32;
    let mut oldest = tip;
    let mut reading = Some(tip);
    while let Some(block) = reading {
        if block.height() == 0 || count >= DGW_PAST_BLOCKS {
            break;
        }
        count += 1;
        average = running_average(&average, count, &Target::from_compact(block.bits()));
        oldest = block;
        reading = block.prev();
    }

    let expected = count as i64 * params.pow_target_spacing;
    let actual = clamp_timespan(tip.block_time() - oldest.block_time(), expected / 3, expected * 3);

    let mut new = rescale(&average, actual, expected);
    if new > params.pow_limit {
        new = params.pow_limit.clone();
    }

    tracing::debug!(
        "DGW retarget at {}: expected {} actual {}, {:08x} -> {:08x}",
        tip.height() + 1,
        expected,
        actual,
        tip.bits(),
        new.to_compact()
    );
    new.to_compact()
}

// ─── Multi-algorithm Dark Gravity Wave ──────────────────────────────

/// One backward pass over the chain, collecting normalized averages.
struct History<'a> {
    count: u32,
    average: Target,
    /// Oldest block the chain-wide timespan is measured from
    anchor: BlockIndex<'a>,
    fast_count: u32,
    fast_average: Target,
    fast_anchor: BlockIndex<'a>,
    algo_count: u32,
    algo_average: Target,
    algo_anchor: Option<BlockIndex<'a>>,
    algo_fast_count: u32,
    algo_fast_average: Target,
    algo_fast_anchor: Option<BlockIndex<'a>>,
}

impl<'a> History<'a> {
    fn collect(tip: BlockIndex<'a>, algo: u32, past_blocks: u32) -> Self {
        let mut h = History {
            count: 0,
            average: Target::zero(),
            anchor: tip,
            fast_count: 0,
            fast_average: Target::zero(),
            fast_anchor: tip,
            algo_count: 0,
            algo_average: Target::zero(),
            algo_anchor: None,
            algo_fast_count: 0,
            algo_fast_average: Target::zero(),
            algo_fast_anchor: None,
        };

        let mut cursor = tip;
        while h.count < past_blocks && h.algo_count < ALGO_WINDOW {
            let normalized = Target::from_compact(cursor.bits()).div(efficiency(cursor.version()));

            if cursor.algo_tag() == algo {
                h.algo_count += 1;
                h.algo_anchor = Some(cursor);
                h.algo_average = running_average(&h.algo_average, h.algo_count, &normalized);
                if h.algo_count <= ALGO_FAST_WINDOW {
                    h.algo_fast_count += 1;
                    h.algo_fast_anchor = Some(cursor);
                    h.algo_fast_average = h.algo_average.clone();
                }
            }

            h.count += 1;
            h.average = running_average(&h.average, h.count, &normalized);
            if h.count <= CHAIN_FAST_WINDOW {
                h.fast_count += 1;
                h.fast_anchor = cursor;
                h.fast_average = h.average.clone();
            }

            // the cursor steps past the last sample unless the chain window filled up
            if h.count != past_blocks {
                cursor = cursor.expect_prev();
            }
        }
        h.anchor = cursor;
        h
    }
}

fn multi_algo_dark_gravity_wave(
    tip: BlockIndex<'_>,
    candidate: &BlockHeader,
    params: &ConsensusParams,
    gate: &dyn ActivationGate,
) -> u32 {
    let limit = &params.pow_limit;
    let spacing = params.pow_target_spacing;

    let mut past_blocks = CHAIN_WINDOW;
    if tip.height() < past_blocks {
        if tip.height() < ALGO_WINDOW {
            return limit.to_compact();
        }
        past_blocks = tip.height();
    }

    if params.no_retargeting {
        return tip.bits();
    }

    let mut h = History::collect(tip, algo_tag(candidate.version), past_blocks);

    // instamine protection for the whole chain
    if tip.block_time() - h.fast_anchor.block_time() < spacing / 2 {
        h.count = h.fast_count;
        h.anchor = h.fast_anchor;
        h.average = h.fast_average.clone();
    }

    // The chain-wide average never becomes the base: the algorithm average
    // (or the limit) replaces it and the chain-wide timespan is applied on top.
    // Consensus depends on this precedence.
    let base = match (h.algo_anchor, h.algo_fast_anchor) {
        (Some(mut algo_anchor), Some(algo_fast_anchor)) if h.algo_count > 1 => {
            // instamine protection for this algorithm
            if tip.block_time() - algo_fast_anchor.block_time() < spacing * ALGO_ACTIVE_COUNT as i64 / 2 {
                h.algo_count = h.algo_fast_count;
                algo_anchor = algo_fast_anchor;
                h.algo_average = h.algo_fast_average.clone();
            }

            // measured from the tip, not from the newest block of this algorithm
            let expected = h.algo_count as i64 * spacing * ALGO_ACTIVE_COUNT as i64;
            let actual = clamp_timespan(tip.block_time() - algo_anchor.block_time(), 1, expected * 2);
            rescale(&h.algo_average, actual, expected)
        }
        _ => limit.clone(),
    };

    let expected = h.count as i64 * spacing;
    let actual = clamp_timespan(tip.block_time() - h.anchor.block_time(), 1, expected * 2);
    let mut new = rescale(&base, actual, expected);

    // back from normalized units to the candidate's own algorithm
    let next_height = tip.height() + 1;
    let eff = efficiency(candidate.version);
    new = if limit.div(eff) > new { new.wrapping_mul(eff) } else { limit.clone() };

    let force = handbrake_force(candidate.version, next_height, gate);
    new = if limit.wrapping_mul(force) < new { limit.clone() } else { new.div(force) };

    tracing::debug!(
        "multi-algo retarget at {} for tag {:#05x}: {} blocks averaging {:08x} ({} same algo), handbrake {}, bits {:08x}",
        next_height,
        algo_tag(candidate.version),
        h.count,
        h.average.to_compact(),
        h.algo_count,
        force,
        new.to_compact()
    );
    new.to_compact()
}

// ─── Dead-lock protection ───────────────────────────────────────────

/// Halve the work once per two spacings of silence beyond the grace period
/// of `2 * spacing * (ALGO_ACTIVE_COUNT - 1)` seconds, never past the limit.
fn dead_lock_protection(bits: u32, tip: BlockIndex<'_>, candidate: &BlockHeader, params: &ConsensusParams) -> u32 {
    let silence = candidate.block_time() - tip.block_time();
    let halvings = silence / (params.pow_target_spacing * 2) - ALGO_ACTIVE_COUNT as i64 + 1;
    if halvings <= 0 {
        return bits;
    }

    let limit = &params.pow_limit;
    let shift = u32::try_from(halvings).unwrap_or(u32::MAX);
    let target = Target::from_compact(bits);
    let relaxed = if params.allow_min_difficulty_blocks || limit.shr(shift) < target {
        limit.clone()
    } else {
        target.wrapping_shl(shift)
    };

    tracing::debug!(
        "dead-lock protection: {}s since tip, {} halvings, {:08x} -> {:08x}",
        silence,
        halvings,
        bits,
        relaxed.to_compact()
    );
    relaxed.to_compact()
}

//! AlgoForge consensus core: proof-of-work validation, difficulty
//! retargeting and block subsidy for a multi-algorithm chain.
//!
//! The three validation entry points are [`pow::check_proof_of_work`],
//! [`pow::next_work_required`] and [`core::subsidy::block_subsidy`]. All of
//! them are pure functions over a read-only [`core::chain::ChainIndex`],
//! [`core::params::ConsensusParams`] and an [`core::spork::ActivationGate`].

pub mod core;
pub mod crypto;
pub mod error;
pub mod pow;

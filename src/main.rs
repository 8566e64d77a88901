use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use algoforge::core::chain::ChainIndex;
use algoforge::core::params::*;
use algoforge::core::spork::{ActivationGate, SporkId, SporkTable};
use algoforge::core::subsidy::{algo_cost_factor, block_subsidy, halving_parameters};
use algoforge::core::types::{Algorithm, BlockHeader};
use algoforge::crypto::hash_hex;
use algoforge::error::CliError;
use algoforge::pow::{check_proof_of_work, next_work_required, Target};

#[derive(Parser, Debug)]
#[command(name = "algoforge", version = "0.3.2")]
#[command(about = "AlgoForge - multi-algorithm retargeting and block subsidy diagnostics")]
struct Cli {
    /// Use testnet consensus parameters
    #[arg(long, global = true, conflicts_with = "regtest")]
    testnet: bool,
    /// Use regression-test consensus parameters
    #[arg(long, global = true)]
    regtest: bool,
    /// Override a spork, e.g. --spork alpha_reward_start=1000 (repeatable)
    #[arg(long = "spork", value_name = "NAME=VALUE", global = true)]
    sporks: Vec<String>,
    /// JSON object of spork overrides, applied before --spork flags
    #[arg(long, value_name = "FILE", global = true)]
    sporks_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Block subsidy for a height, compact bits and block version
    Subsidy {
        /// Print the halving state, algorithm and activation flags as well
        #[arg(short, long)]
        verbose: bool,
        height: u32,
        /// Compact bits in hex
        #[arg(value_parser = parse_hex_u32)]
        bits: u32,
        /// Block version in hex
        #[arg(id = "block_version", value_name = "VERSION", value_parser = parse_hex_u32)]
        version: u32,
    },
    /// Required bits for a block on top of a chain file
    NextWork {
        /// JSON array of {version, time, bits}, genesis first
        #[arg(long)]
        chain: PathBuf,
        /// Candidate block version in hex
        #[arg(id = "block_version", long = "version", value_name = "VERSION", value_parser = parse_hex_u32)]
        version: u32,
        /// Candidate block timestamp
        #[arg(long)]
        time: u32,
    },
    /// Check a PoW hash against compact bits
    CheckPow {
        /// Hash as big-endian hex
        #[arg(value_parser = parse_hash)]
        hash: Target,
        #[arg(value_parser = parse_hex_u32)]
        bits: u32,
    },
}

fn parse_hex_u32(s: &str) -> Result<u32, CliError> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|_| CliError::Hex(s.to_string()))
}

fn parse_hash(s: &str) -> Result<Target, CliError> {
    Target::from_hex(s).ok_or_else(|| CliError::Hash(s.to_string()))
}

fn network(cli: &Cli) -> Network {
    if cli.regtest {
        Network::Regtest
    } else if cli.testnet {
        Network::Testnet
    } else {
        Network::Main
    }
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io { path: path.to_path_buf(), source })
}

fn load_sporks(network: Network, overrides: &[String], file: Option<&Path>) -> Result<SporkTable, CliError> {
    let mut sporks = SporkTable::defaults(network);
    if let Some(path) = file {
        sporks.apply_json(&read_file(path)?)?;
    }
    for arg in overrides {
        sporks.apply_override(arg)?;
    }
    Ok(sporks)
}

fn yes_no(active: bool) -> &'static str { if active { "YES" } else { "NO" } }

fn subsidy_report(height: u32, bits: u32, version: u32, params: &ConsensusParams, sporks: &SporkTable) -> String {
    let halving = halving_parameters(height, params, sporks);
    let first_halving = sporks.value(SporkId::AlphaRewardStart) + halving.interval as i64;
    let algo = Algorithm::from_version(version).map_or("* unknown *", Algorithm::name);
    let cost_factor = algo_cost_factor(version, height, sporks) as f64 / 100.0;
    let spork = |id: SporkId| (yes_no(sporks.is_active(id, height)), sporks.value(id));

    let mut out = String::new();
    let _ = writeln!(out, "Input parameters:");
    let _ = writeln!(out, " Height: {}", height);
    let _ = writeln!(out, " Bits: {:04x} ({})", bits, bits);
    let _ = writeln!(out, " Version: {:04x} ({})", version, version);
    let _ = writeln!(out, " Algorithm: {}", algo);

    let _ = writeln!(out, "\nChain parameters:");
    let _ = writeln!(out, " Network: {}", params.network);
    let _ = writeln!(out, " Halvings interval: {} ({} already occurred)", halving.interval, halving.count);
    if height as i64 >= first_halving {
        let _ = writeln!(out, " First halving occurred on block:    {}", first_halving);
    } else {
        let _ = writeln!(out, " First halving will occur on block: {}", first_halving);
    }
    let _ = writeln!(out, " Alpha reward algo cost factor:     x {:.2}", cost_factor);
    let _ = writeln!(out, " Alpha reward multiplier:           x {}", params.alpha_rewards_multiplier);

    let _ = writeln!(out, "\nActivated hard forks / sporks:");
    let (active, at) = spork(SporkId::MultiAlgoChainStart);
    let _ = writeln!(out, " Multi-algo chain start spork:     {} (block {})", active, at);
    let (active, at) = spork(SporkId::AlphaRewardStart);
    let _ = writeln!(out, " Alpha reward upgrade hard fork:   {} (block {})", active, at);
    let (active, at) = spork(SporkId::HandbrakeHeight);
    let _ = writeln!(out, " Handbrake spork:                  {} (block {})", active, at);
    let _ = writeln!(
        out,
        " Budget/superblock hard fork:      {} (block {})",
        yes_no(height >= params.budget_payments_start_block),
        params.budget_payments_start_block
    );
    let (active, _) = spork(SporkId::UnlimitedSubsidyStart);
    let _ = writeln!(out, " Unlimited block subsidy spork:    {}", active);
    out
}

/// Required bits, as 8 hex digits, for a block on top of the chain in `chain_json`.
fn next_work_report(
    chain_json: &str,
    chain_path: &Path,
    version: u32,
    time: u32,
    params: &ConsensusParams,
    sporks: &SporkTable,
) -> Result<String, CliError> {
    let index = ChainIndex::from_json(chain_json)
        .map_err(|source| CliError::ChainFile { path: chain_path.to_path_buf(), source })?
        .ok_or_else(|| CliError::EmptyChain(chain_path.to_path_buf()))?;
    let candidate = BlockHeader::candidate(version, time, 0);
    let bits = next_work_required(Some(index.tip()), &candidate, params, sporks);
    Ok(format!("{:08x}", bits))
}

fn check_pow_report(hash: &Target, bits: u32, params: &ConsensusParams) -> &'static str {
    let hash = hash.to_le_bytes();
    let valid = check_proof_of_work(&hash, bits, params);
    tracing::debug!("hash {} against bits {:08x}: {}", hash_hex(&hash), bits, valid);
    if valid { "valid" } else { "invalid" }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let network = network(&cli);
    let params = ConsensusParams::for_network(network);
    let sporks = load_sporks(network, &cli.sporks, cli.sporks_file.as_deref())?;
    tracing::debug!("network {}, sporks {:?}", network, sporks);

    match cli.command {
        Commands::Subsidy { verbose, height, bits, version } => {
            let subsidy = block_subsidy(height, version, &params, &sporks);
            if verbose {
                print!("{}", subsidy_report(height, bits, version, &params, &sporks));
                print!("\nCalculated subsidy amount: ");
            }
            println!("{}", format_amount(subsidy));
        }

        Commands::NextWork { chain, version, time } => {
            let json = read_file(&chain)?;
            println!("{}", next_work_report(&json, &chain, version, time, &params, &sporks)?);
        }

        Commands::CheckPow { hash, bits } => {
            println!("{}", check_pow_report(&hash, bits, &params));
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("algoforge=warn")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

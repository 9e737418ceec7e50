//! ticketchain - inspect consensus rules of the ticketchain networks.

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use num_bigint::{BigInt, Sign};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use ticketchain_consensus::{
    big_to_compact, compact_to_big, estimate_supply, AiTickets, ChainParams, Network,
    RegularTickets, StakeDifficultyCalculator, SubsidyCache, TicketKind, ATOMS_PER_COIN,
};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;

/// Consensus rule calculator for ticketchain networks.
#[derive(Parser, Debug)]
#[command(name = "ticketchain")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a chain parameter file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Network preset (mainnet, testnet, simnet)
    #[arg(short, long)]
    network: Option<Network>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Block subsidy and its split at a height
    Subsidy {
        #[arg(long)]
        height: i64,
        /// Votes in the block, defaults to a full set
        #[arg(long)]
        voters: Option<u16>,
    },
    /// Estimated coin supply at a height
    Supply {
        #[arg(long)]
        height: i64,
    },
    /// Next stake difficulty from pool sizes
    StakeDiff {
        /// Height of the block the difficulty applies to
        #[arg(long)]
        height: i64,
        #[arg(long)]
        cur_diff: i64,
        /// Pool size plus immature tickets at the previous window start
        #[arg(long)]
        prev_pool: i64,
        /// Pool size plus immature tickets now
        #[arg(long)]
        cur_pool: i64,
        /// Use AI ticket parameters
        #[arg(long)]
        ai: bool,
    },
    /// Convert between compact bits and targets
    Compact(CompactArgs),
}

#[derive(ClapArgs, Debug)]
#[group(required = true, multiple = false)]
struct CompactArgs {
    /// Compact bits to expand, as hex
    #[arg(long)]
    decode: Option<String>,
    /// Target to compact, as hex
    #[arg(long)]
    encode: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("Invalid log level")?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let params = config::load_params(args.config.as_deref(), args.network)?;
    info!("Network: {}", params.network);

    let json = args.json;
    match args.command {
        Command::Subsidy { height, voters } => subsidy(params, height, voters, json),
        Command::Supply { height } => {
            let supply = estimate_supply(&params, height);
            if json {
                println!("{}", json!({ "height": height, "supply": supply }));
            } else {
                println!("height:  {}", height);
                println!("supply:  {} atoms ({} coins)", supply, format_coins(supply));
            }
            Ok(())
        }
        Command::StakeDiff {
            height,
            cur_diff,
            prev_pool,
            cur_pool,
            ai,
        } => {
            let next = if ai {
                next_stake_diff::<AiTickets>(&params, height, cur_diff, prev_pool, cur_pool)
            } else {
                next_stake_diff::<RegularTickets>(&params, height, cur_diff, prev_pool, cur_pool)
            };
            if json {
                println!("{}", json!({ "height": height, "ai": ai, "stake_difficulty": next }));
            } else {
                println!("stake difficulty: {} atoms ({} coins)", next, format_coins(next));
            }
            Ok(())
        }
        Command::Compact(compact) => {
            if let Some(bits) = compact.decode {
                let bits = parse_bits(&bits)?;
                let target = format_target(&compact_to_big(bits));
                if json {
                    println!("{}", json!({ "bits": format!("0x{:08x}", bits), "target": target }));
                } else {
                    println!("bits:   0x{:08x}", bits);
                    println!("target: {}", target);
                }
            } else if let Some(target) = compact.encode {
                let bits = big_to_compact(&parse_target(&target)?);
                if json {
                    println!("{}", json!({ "bits": format!("0x{:08x}", bits) }));
                } else {
                    println!("bits:   0x{:08x}", bits);
                }
            }
            Ok(())
        }
    }
}

fn subsidy(params: ChainParams, height: i64, voters: Option<u16>, json: bool) -> Result<()> {
    let voters = voters.unwrap_or(params.tickets.tickets_per_block);
    let cache = SubsidyCache::new(Arc::new(params));
    debug!(cached_epochs = cache.cached_epochs(), "Subsidy cache ready");

    let split = cache.split(height, voters);
    if json {
        let output = json!({
            "height": height,
            "version": format!("{:?}", cache.version_at(height)),
            "subsidy": cache.block_subsidy(height),
            "voters": voters,
            "split": split,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }
    println!("height:    {} ({:?})", height, cache.version_at(height));
    println!("subsidy:   {}", format_coins(cache.block_subsidy(height)));
    println!("work:      {}", format_coins(split.work));
    println!("votes:     {} ({} voters)", format_coins(split.vote), voters);
    println!("treasury:  {}", format_coins(split.treasury));
    Ok(())
}

fn next_stake_diff<K: TicketKind>(
    params: &ChainParams,
    height: i64,
    cur_diff: i64,
    prev_pool: i64,
    cur_pool: i64,
) -> i64 {
    StakeDifficultyCalculator::<K>::new(params).calc_next_stake_diff(
        height, cur_diff, prev_pool, cur_pool,
    )
}

fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}

fn parse_bits(s: &str) -> Result<u32> {
    u32::from_str_radix(strip_hex_prefix(s), 16)
        .with_context(|| format!("Invalid compact bits '{}'", s))
}

/// Largest target magnitude whose compact exponent fits in one byte, even
/// after the sign-bit renormalisation adds one.
const MAX_TARGET_BITS: u64 = 254 * 8;

fn parse_target(s: &str) -> Result<BigInt> {
    let digits = strip_hex_prefix(s);
    let padded = if digits.len() % 2 == 1 {
        format!("0{}", digits)
    } else {
        digits.to_string()
    };
    let bytes = hex::decode(&padded).with_context(|| format!("Invalid target '{}'", s))?;
    if bytes.is_empty() {
        bail!("Empty target");
    }
    let target = BigInt::from_bytes_be(Sign::Plus, &bytes);
    if target.bits() > MAX_TARGET_BITS {
        bail!("Target '{}' does not fit a compact exponent", s);
    }
    Ok(target)
}

fn format_target(target: &BigInt) -> String {
    let (sign, bytes) = target.to_bytes_be();
    let sign = if sign == Sign::Minus { "-" } else { "" };
    format!("{}0x{:0>64}", sign, hex::encode(bytes))
}

fn format_coins(atoms: i64) -> String {
    let sign = if atoms < 0 { "-" } else { "" };
    let abs = atoms.unsigned_abs();
    let per_coin = ATOMS_PER_COIN as u64;
    format!("{}{}.{:08}", sign, abs / per_coin, abs % per_coin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_compact_args() {
        let args = Args::try_parse_from(["ticketchain", "compact", "--decode", "1d00ffff"]).unwrap();
        assert!(matches!(args.command, Command::Compact(CompactArgs { decode: Some(_), .. })));
        assert!(
            Args::try_parse_from(["ticketchain", "compact", "--decode", "1", "--encode", "2"])
                .is_err()
        );
        assert!(Args::try_parse_from(["ticketchain", "compact"]).is_err());
    }

    #[test]
    fn test_parse_network() {
        let args = Args::try_parse_from(["ticketchain", "-n", "simnet", "supply", "--height", "5"])
            .unwrap();
        assert_eq!(args.network, Some(Network::Simnet));
        assert!(Args::try_parse_from(["ticketchain", "-n", "moon", "supply", "--height", "5"])
            .is_err());
    }

    #[test]
    fn test_json_flag_is_global() {
        let args =
            Args::try_parse_from(["ticketchain", "supply", "--height", "5", "--json"]).unwrap();
        assert!(args.json);
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(parse_bits("0x1d00ffff").unwrap(), 0x1d00ffff);
        assert_eq!(parse_bits(" 207fffff ").unwrap(), 0x207fffff);
        assert!(parse_bits("zz").is_err());
        assert_eq!(parse_target("0xfff").unwrap(), BigInt::from(0xfff));
        assert!(parse_target("0x").is_err());
        assert!(parse_target(&"ff".repeat(254)).is_ok());
        assert!(parse_target(&"01".repeat(255)).is_err());
        // Leading zero bytes do not count towards the exponent
        assert!(parse_target(&format!("{}{}", "00".repeat(10), "ff".repeat(254))).is_ok());
        assert_eq!(
            big_to_compact(&parse_target(&format_target(&compact_to_big(0x1d00ffff))).unwrap()),
            0x1d00ffff
        );
    }

    #[test]
    fn test_format_coins() {
        assert_eq!(format_coins(0), "0.00000000");
        assert_eq!(format_coins(150_000_001), "1.50000001");
        assert_eq!(format_coins(-ATOMS_PER_COIN), "-1.00000000");
    }
}

//! Chain parameters for ticketchain networks.
//!
//! ## Static Network Parameters (`ChainParams`)
//!
//! Consensus constants shared by every node on a network. They never change
//! while the process runs.
//! - `ChainParams::mainnet()`, `ChainParams::testnet()`, `ChainParams::simnet()`
//! - `ChainParams::from_config()` for a preset with overrides loaded from TOML
//!
//! ## Ticket Economics (`TicketEconomics`)
//!
//! Each ticket type carries its own pool size, maturity, per-block caps and
//! activation heights. The AI ticket type reuses the same algorithms with a
//! separate `TicketEconomics` value.

use crate::compact::compact_to_big;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Atoms per coin.
pub const ATOMS_PER_COIN: i64 = 100_000_000;

/// Known networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production network.
    #[default]
    Mainnet,
    /// Public test network with minimum-difficulty reduction.
    Testnet,
    /// Local simulation network with tiny windows.
    Simnet,
}

impl Network {
    /// Lowercase network name.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Simnet => "simnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = ChainParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "simnet" => Ok(Network::Simnet),
            other => Err(ChainParamsError {
                field: "network",
                message: format!("unknown network '{}'", other),
            }),
        }
    }
}

/// One subsidy parameter set.
///
/// For reduction epoch `e` below `epoch_threshold` the subsidy is
/// `base * (mul/div)^e * (threshold - e) / threshold`; from the threshold on it
/// decays tenfold per epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsidySchedule {
    /// Subsidy of epoch 0 in atoms.
    pub base_subsidy: i64,
    /// Geometric decay numerator.
    pub mul_subsidy: i64,
    /// Geometric decay denominator.
    pub div_subsidy: i64,
    /// First epoch of the tenfold-decay tail.
    pub epoch_threshold: u64,
}

/// A single hard-coded block one payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayout {
    /// Encoded destination address.
    pub address: String,
    /// Amount in atoms.
    pub amount: i64,
}

/// Ticket economics for one ticket type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketEconomics {
    /// Target number of live tickets.
    pub ticket_pool_size: u32,
    /// Blocks a purchase waits before joining the live pool.
    pub ticket_maturity: u16,
    /// Blocks a live ticket stays eligible before expiring.
    pub ticket_expiry: u32,
    /// Votes expected per block.
    pub tickets_per_block: u16,
    /// Maximum purchases a single block may include.
    pub max_fresh_stake_per_block: u8,
    /// Floor of the ticket price in atoms.
    pub minimum_stake_diff: i64,
    /// Blocks between ticket price retargets.
    pub stake_diff_window_size: i64,
    /// First height for which the ticket price is retargeted.
    pub stake_diff_start_height: i64,
    /// First height at which matured tickets can exist.
    pub stake_enabled_height: i64,
    /// First height at which blocks must carry votes.
    pub stake_validation_height: i64,
    /// Height from which this ticket type has a real pool; below it the pool
    /// is the null state.
    pub activation_height: i64,
}

impl TicketEconomics {
    /// Pool size the retarget steers towards, immature tickets included.
    pub fn target_pool_size_all(&self) -> i64 {
        self.tickets_per_block as i64 * (self.ticket_pool_size as i64 + self.ticket_maturity as i64)
    }

    /// Whether this ticket type is active at `height`.
    pub fn is_active(&self, height: i64) -> bool {
        height >= self.activation_height
    }
}

/// Error when constructing or validating ChainParams.
#[derive(Debug, Clone)]
pub struct ChainParamsError {
    /// The field that is missing or invalid.
    pub field: &'static str,
    /// Description of the error.
    pub message: String,
}

impl fmt::Display for ChainParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainParams error for '{}': {}", self.field, self.message)
    }
}

impl std::error::Error for ChainParamsError {}

fn invalid(field: &'static str, message: impl Into<String>) -> ChainParamsError {
    ChainParamsError {
        field,
        message: message.into(),
    }
}

/// Network-specific consensus parameters.
#[derive(Debug, Clone)]
pub struct ChainParams {
    /// Network these parameters belong to.
    pub network: Network,

    /// Highest allowed proof-of-work target.
    pub pow_limit: BigInt,
    /// Compact encoding used for the genesis target and min-difficulty blocks.
    pub pow_limit_bits: u32,
    /// Desired seconds between blocks.
    pub target_time_per_block: i64,
    /// Blocks per difficulty window; also the retarget interval.
    pub work_diff_window_size: i64,
    /// Number of windows weighed at each retarget.
    pub work_diff_windows: i64,
    /// Exponential weighting shift per window.
    pub work_diff_alpha: i64,
    /// Largest factor a single retarget may move the target.
    pub retarget_adjustment_factor: i64,
    /// Allow minimum-difficulty blocks after a long gap (test networks).
    pub reduce_min_difficulty: bool,
    /// Gap in seconds after which minimum-difficulty reduction starts.
    pub min_diff_reduction_time: i64,

    /// Blocks per subsidy reduction epoch.
    pub subsidy_reduction_interval: i64,
    /// Schedule in force before `subsidy_v2_activation_height`.
    pub subsidy_v1: SubsidySchedule,
    /// Schedule in force from `subsidy_v2_activation_height`.
    pub subsidy_v2: SubsidySchedule,
    /// Activation height of `subsidy_v2` (None = never).
    pub subsidy_v2_activation_height: Option<i64>,
    /// Share of the subsidy paid to the miner.
    pub work_reward_proportion: u16,
    /// Share of the subsidy paid to voters.
    pub stake_reward_proportion: u16,
    /// Share of the subsidy paid to the treasury.
    pub block_tax_proportion: u16,
    /// Payouts the block one coinbase must match exactly.
    pub block_one_ledger: Vec<TokenPayout>,
    /// Blocks before coinbase outputs become spendable.
    pub coinbase_maturity: u16,

    /// Regular ticket economics.
    pub tickets: TicketEconomics,
    /// AI ticket economics.
    pub ai_tickets: TicketEconomics,
}

fn pow_limit_from_shift(bits: u32) -> BigInt {
    (BigInt::one() << bits) - BigInt::one()
}

impl ChainParams {
    /// Create mainnet parameters.
    pub fn mainnet() -> Self {
        let coinbase_maturity = 256;
        let ai_activation = 262_144;
        Self {
            network: Network::Mainnet,
            pow_limit: pow_limit_from_shift(224),
            pow_limit_bits: 0x1d00ffff,
            target_time_per_block: 300, // 5 minutes
            work_diff_window_size: 144,
            work_diff_windows: 20,
            work_diff_alpha: 1,
            retarget_adjustment_factor: 4,
            reduce_min_difficulty: false,
            min_diff_reduction_time: 0,
            subsidy_reduction_interval: 6144,
            subsidy_v1: SubsidySchedule {
                base_subsidy: 3_119_582_664,
                mul_subsidy: 100,
                div_subsidy: 101,
                epoch_threshold: 1681,
            },
            subsidy_v2: SubsidySchedule {
                base_subsidy: 1_800_000_000,
                mul_subsidy: 1000,
                div_subsidy: 1002,
                epoch_threshold: 4205,
            },
            subsidy_v2_activation_height: Some(393_216), // 64 * 6144
            work_reward_proportion: 6,
            stake_reward_proportion: 3,
            block_tax_proportion: 1,
            block_one_ledger: vec![
                TokenPayout {
                    address: "TsaRrQ1xn9Kc4bWYd5MHj4K5uGEK6zpRoDo".to_string(),
                    amount: 840_000 * ATOMS_PER_COIN,
                },
                TokenPayout {
                    address: "TsZ7o9AMadKqoJb7Aot5uJgLU1XTGvTwRXR".to_string(),
                    amount: 420_000 * ATOMS_PER_COIN,
                },
                TokenPayout {
                    address: "TsTa5MVM8pQ2smkE8BCBDSKjv38Gp4C7dUT".to_string(),
                    amount: 420_000 * ATOMS_PER_COIN,
                },
            ],
            coinbase_maturity,
            tickets: TicketEconomics {
                ticket_pool_size: 8192,
                ticket_maturity: 256,
                ticket_expiry: 40_960,
                tickets_per_block: 5,
                max_fresh_stake_per_block: 20,
                minimum_stake_diff: 2 * ATOMS_PER_COIN,
                stake_diff_window_size: 144,
                stake_diff_start_height: coinbase_maturity as i64 + 1,
                stake_enabled_height: coinbase_maturity as i64 + 256,
                stake_validation_height: 4096,
                activation_height: 0,
            },
            ai_tickets: TicketEconomics {
                ticket_pool_size: 4096,
                ticket_maturity: 256,
                ticket_expiry: 20_480,
                tickets_per_block: 5,
                max_fresh_stake_per_block: 10,
                minimum_stake_diff: ATOMS_PER_COIN,
                stake_diff_window_size: 144,
                stake_diff_start_height: ai_activation,
                stake_enabled_height: ai_activation + 256,
                stake_validation_height: ai_activation + 2048,
                activation_height: ai_activation,
            },
        }
    }

    /// Create testnet parameters.
    pub fn testnet() -> Self {
        let coinbase_maturity = 16;
        let ai_activation = 20_000;
        Self {
            network: Network::Testnet,
            pow_limit: pow_limit_from_shift(232),
            pow_limit_bits: 0x1e00ffff,
            target_time_per_block: 120, // 2 minutes
            work_diff_window_size: 144,
            work_diff_windows: 20,
            work_diff_alpha: 1,
            retarget_adjustment_factor: 4,
            reduce_min_difficulty: true,
            min_diff_reduction_time: 600, // 10 minutes
            subsidy_reduction_interval: 2048,
            subsidy_v1: SubsidySchedule {
                base_subsidy: 2_500_000_000,
                mul_subsidy: 100,
                div_subsidy: 101,
                epoch_threshold: 1681,
            },
            subsidy_v2: SubsidySchedule {
                base_subsidy: 1_800_000_000,
                mul_subsidy: 1000,
                div_subsidy: 1002,
                epoch_threshold: 4205,
            },
            subsidy_v2_activation_height: Some(102_400),
            work_reward_proportion: 6,
            stake_reward_proportion: 3,
            block_tax_proportion: 1,
            block_one_ledger: vec![TokenPayout {
                address: "TsT7h1Q7fmZ3VyJzeX2HGdQnmhC2vpmWVB7".to_string(),
                amount: 100_000 * ATOMS_PER_COIN,
            }],
            coinbase_maturity,
            tickets: TicketEconomics {
                ticket_pool_size: 1024,
                ticket_maturity: 144,
                ticket_expiry: 6144,
                tickets_per_block: 5,
                max_fresh_stake_per_block: 20,
                minimum_stake_diff: 20_000_000,
                stake_diff_window_size: 144,
                stake_diff_start_height: coinbase_maturity as i64 + 1,
                stake_enabled_height: coinbase_maturity as i64 + 144,
                stake_validation_height: 768,
                activation_height: 0,
            },
            ai_tickets: TicketEconomics {
                ticket_pool_size: 512,
                ticket_maturity: 144,
                ticket_expiry: 3072,
                tickets_per_block: 5,
                max_fresh_stake_per_block: 10,
                minimum_stake_diff: 10_000_000,
                stake_diff_window_size: 144,
                stake_diff_start_height: ai_activation,
                stake_enabled_height: ai_activation + 144,
                stake_validation_height: ai_activation + 512,
                activation_height: ai_activation,
            },
        }
    }

    /// Create simnet parameters.
    pub fn simnet() -> Self {
        let coinbase_maturity = 16;
        let ai_activation = 200;
        Self {
            network: Network::Simnet,
            pow_limit: pow_limit_from_shift(255),
            pow_limit_bits: 0x207fffff,
            target_time_per_block: 1,
            work_diff_window_size: 8,
            work_diff_windows: 4,
            work_diff_alpha: 1,
            retarget_adjustment_factor: 4,
            reduce_min_difficulty: false,
            min_diff_reduction_time: 0,
            subsidy_reduction_interval: 128,
            subsidy_v1: SubsidySchedule {
                base_subsidy: 50_000_000_000,
                mul_subsidy: 100,
                div_subsidy: 101,
                epoch_threshold: 1681,
            },
            subsidy_v2: SubsidySchedule {
                base_subsidy: 20_000_000_000,
                mul_subsidy: 1000,
                div_subsidy: 1002,
                epoch_threshold: 4205,
            },
            subsidy_v2_activation_height: None,
            work_reward_proportion: 6,
            stake_reward_proportion: 3,
            block_tax_proportion: 1,
            block_one_ledger: vec![
                TokenPayout {
                    address: "Sspzuv5Y1PR7HbYRm2b4aUX2n34ealQ2Jtw".to_string(),
                    amount: 100_000 * ATOMS_PER_COIN,
                },
                TokenPayout {
                    address: "SsWKp7wtdTZYabYFYSc9cnxhwFEjA5g4pFc".to_string(),
                    amount: 200_000 * ATOMS_PER_COIN,
                },
            ],
            coinbase_maturity,
            tickets: TicketEconomics {
                ticket_pool_size: 64,
                ticket_maturity: 16,
                ticket_expiry: 384,
                tickets_per_block: 5,
                max_fresh_stake_per_block: 20,
                minimum_stake_diff: 20_000,
                stake_diff_window_size: 8,
                stake_diff_start_height: coinbase_maturity as i64 + 1,
                stake_enabled_height: coinbase_maturity as i64 + 16,
                stake_validation_height: 144,
                activation_height: 0,
            },
            ai_tickets: TicketEconomics {
                ticket_pool_size: 32,
                ticket_maturity: 16,
                ticket_expiry: 192,
                tickets_per_block: 5,
                max_fresh_stake_per_block: 10,
                minimum_stake_diff: 10_000,
                stake_diff_window_size: 8,
                stake_diff_start_height: ai_activation,
                stake_enabled_height: ai_activation + 16,
                stake_validation_height: ai_activation + 100,
                activation_height: ai_activation,
            },
        }
    }

    /// Preset for a network.
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::mainnet(),
            Network::Testnet => Self::testnet(),
            Network::Simnet => Self::simnet(),
        }
    }

    /// Seconds a full difficulty window should take.
    pub fn target_timespan(&self) -> i64 {
        self.target_time_per_block * self.work_diff_window_size
    }

    /// Sum of the work, stake and tax proportions.
    pub fn total_subsidy_proportions(&self) -> i64 {
        self.work_reward_proportion as i64
            + self.stake_reward_proportion as i64
            + self.block_tax_proportion as i64
    }

    /// Total amount paid by block one.
    pub fn block_one_subsidy(&self) -> i64 {
        self.block_one_ledger.iter().map(|p| p.amount).sum()
    }

    /// Check internal consistency of the parameters.
    ///
    /// Every algorithm in this crate assumes these hold; a violation is a
    /// configuration problem and is reported with the offending field name.
    pub fn validate(&self) -> Result<(), ChainParamsError> {
        if !self.pow_limit.is_positive() {
            return Err(invalid("pow_limit", "must be positive"));
        }
        if compact_to_big(self.pow_limit_bits) > self.pow_limit {
            return Err(invalid("pow_limit_bits", "decodes above pow_limit"));
        }
        if self.target_time_per_block <= 0 {
            return Err(invalid("target_time_per_block", "must be positive"));
        }
        if self.work_diff_window_size <= 0 {
            return Err(invalid("work_diff_window_size", "must be positive"));
        }
        if self.work_diff_windows <= 0 {
            return Err(invalid("work_diff_windows", "must be positive"));
        }
        // Weights are accumulated in a u64.
        if self.work_diff_alpha < 0 || self.work_diff_windows * self.work_diff_alpha >= 64 {
            return Err(invalid(
                "work_diff_alpha",
                "work_diff_windows * work_diff_alpha must be in [0, 64)",
            ));
        }
        if self.retarget_adjustment_factor < 1 {
            return Err(invalid("retarget_adjustment_factor", "must be at least 1"));
        }
        if self.reduce_min_difficulty && self.min_diff_reduction_time <= 0 {
            return Err(invalid(
                "min_diff_reduction_time",
                "must be positive when reduce_min_difficulty is set",
            ));
        }
        if self.subsidy_reduction_interval <= 0 {
            return Err(invalid("subsidy_reduction_interval", "must be positive"));
        }
        validate_schedule("subsidy_v1", &self.subsidy_v1)?;
        validate_schedule("subsidy_v2", &self.subsidy_v2)?;
        if self.total_subsidy_proportions() == 0 {
            return Err(invalid("work_reward_proportion", "subsidy proportions sum to zero"));
        }
        if self.block_one_ledger.iter().any(|p| p.amount < 0) {
            return Err(invalid("block_one_ledger", "negative payout amount"));
        }
        validate_tickets("tickets", &self.tickets)?;
        validate_tickets("ai_tickets", &self.ai_tickets)?;
        Ok(())
    }

    /// Create ChainParams from configuration.
    ///
    /// Starts from the preset named by `config.network` and applies every
    /// override that is set, then validates the result.
    pub fn from_config(config: &ChainParamsConfig) -> Result<Self, ChainParamsError> {
        let mut params = Self::for_network(config.network);

        if let Some(hex) = &config.pow_limit_hex {
            params.pow_limit = parse_hex_bigint("pow_limit_hex", hex)?;
        }
        if let Some(v) = config.pow_limit_bits {
            params.pow_limit_bits = v;
        }
        if let Some(v) = config.target_time_per_block {
            params.target_time_per_block = v;
        }
        if let Some(v) = config.work_diff_window_size {
            params.work_diff_window_size = v;
        }
        if let Some(v) = config.work_diff_windows {
            params.work_diff_windows = v;
        }
        if let Some(v) = config.work_diff_alpha {
            params.work_diff_alpha = v;
        }
        if let Some(v) = config.retarget_adjustment_factor {
            params.retarget_adjustment_factor = v;
        }
        if let Some(v) = config.reduce_min_difficulty {
            params.reduce_min_difficulty = v;
        }
        if let Some(v) = config.min_diff_reduction_time {
            params.min_diff_reduction_time = v;
        }
        if let Some(v) = config.subsidy_reduction_interval {
            params.subsidy_reduction_interval = v;
        }
        if let Some(v) = &config.subsidy_v1 {
            params.subsidy_v1 = v.clone();
        }
        if let Some(v) = &config.subsidy_v2 {
            params.subsidy_v2 = v.clone();
        }
        if let Some(v) = config.subsidy_v2_activation_height {
            // Negative disables the second schedule.
            params.subsidy_v2_activation_height = (v >= 0).then_some(v);
        }
        if let Some(v) = config.work_reward_proportion {
            params.work_reward_proportion = v;
        }
        if let Some(v) = config.stake_reward_proportion {
            params.stake_reward_proportion = v;
        }
        if let Some(v) = config.block_tax_proportion {
            params.block_tax_proportion = v;
        }
        if let Some(v) = &config.block_one_ledger {
            params.block_one_ledger = v.clone();
        }
        if let Some(v) = config.coinbase_maturity {
            params.coinbase_maturity = v;
        }
        if let Some(overrides) = &config.tickets {
            overrides.apply(&mut params.tickets);
        }
        if let Some(overrides) = &config.ai_tickets {
            overrides.apply(&mut params.ai_tickets);
        }

        params.validate()?;
        Ok(params)
    }
}

fn validate_schedule(field: &'static str, schedule: &SubsidySchedule) -> Result<(), ChainParamsError> {
    if schedule.base_subsidy <= 0 {
        return Err(invalid(field, "base_subsidy must be positive"));
    }
    if schedule.mul_subsidy <= 0 || schedule.div_subsidy <= schedule.mul_subsidy {
        return Err(invalid(field, "require 0 < mul_subsidy < div_subsidy"));
    }
    if schedule.epoch_threshold == 0 || schedule.epoch_threshold > u32::MAX as u64 {
        return Err(invalid(field, "epoch_threshold must be in [1, u32::MAX]"));
    }
    Ok(())
}

fn validate_tickets(field: &'static str, econ: &TicketEconomics) -> Result<(), ChainParamsError> {
    if econ.tickets_per_block == 0 {
        return Err(invalid(field, "tickets_per_block must be positive"));
    }
    if econ.ticket_pool_size == 0 {
        return Err(invalid(field, "ticket_pool_size must be positive"));
    }
    if econ.stake_diff_window_size <= 0 {
        return Err(invalid(field, "stake_diff_window_size must be positive"));
    }
    if econ.minimum_stake_diff <= 0 {
        return Err(invalid(field, "minimum_stake_diff must be positive"));
    }
    if econ.activation_height < 0 || econ.stake_diff_start_height < 0 {
        return Err(invalid(field, "heights must not be negative"));
    }
    Ok(())
}

fn parse_hex_bigint(field: &'static str, raw: &str) -> Result<BigInt, ChainParamsError> {
    // Hex hygiene: trim whitespace and strip optional 0x prefix
    let cleaned = raw.trim();
    let cleaned = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
        .unwrap_or(cleaned);
    let value = BigInt::parse_bytes(cleaned.as_bytes(), 16)
        .ok_or_else(|| invalid(field, format!("invalid hex string: '{}'", raw)))?;
    if value.is_zero() {
        return Err(invalid(field, "value cannot be zero"));
    }
    Ok(value)
}

/// Optional overrides for one ticket type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketEconomicsConfig {
    pub ticket_pool_size: Option<u32>,
    pub ticket_maturity: Option<u16>,
    pub ticket_expiry: Option<u32>,
    pub tickets_per_block: Option<u16>,
    pub max_fresh_stake_per_block: Option<u8>,
    pub minimum_stake_diff: Option<i64>,
    pub stake_diff_window_size: Option<i64>,
    pub stake_diff_start_height: Option<i64>,
    pub stake_enabled_height: Option<i64>,
    pub stake_validation_height: Option<i64>,
    pub activation_height: Option<i64>,
}

impl TicketEconomicsConfig {
    fn apply(&self, econ: &mut TicketEconomics) {
        if let Some(v) = self.ticket_pool_size {
            econ.ticket_pool_size = v;
        }
        if let Some(v) = self.ticket_maturity {
            econ.ticket_maturity = v;
        }
        if let Some(v) = self.ticket_expiry {
            econ.ticket_expiry = v;
        }
        if let Some(v) = self.tickets_per_block {
            econ.tickets_per_block = v;
        }
        if let Some(v) = self.max_fresh_stake_per_block {
            econ.max_fresh_stake_per_block = v;
        }
        if let Some(v) = self.minimum_stake_diff {
            econ.minimum_stake_diff = v;
        }
        if let Some(v) = self.stake_diff_window_size {
            econ.stake_diff_window_size = v;
        }
        if let Some(v) = self.stake_diff_start_height {
            econ.stake_diff_start_height = v;
        }
        if let Some(v) = self.stake_enabled_height {
            econ.stake_enabled_height = v;
        }
        if let Some(v) = self.stake_validation_height {
            econ.stake_validation_height = v;
        }
        if let Some(v) = self.activation_height {
            econ.activation_height = v;
        }
    }
}

/// Configuration for loading ChainParams from TOML.
///
/// `network` selects the preset; every other field overrides one constant of
/// that preset when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParamsConfig {
    pub network: Network,
    /// Proof-of-work limit as a hex string (optional "0x" prefix).
    pub pow_limit_hex: Option<String>,
    pub pow_limit_bits: Option<u32>,
    pub target_time_per_block: Option<i64>,
    pub work_diff_window_size: Option<i64>,
    pub work_diff_windows: Option<i64>,
    pub work_diff_alpha: Option<i64>,
    pub retarget_adjustment_factor: Option<i64>,
    pub reduce_min_difficulty: Option<bool>,
    pub min_diff_reduction_time: Option<i64>,
    pub subsidy_reduction_interval: Option<i64>,
    pub subsidy_v1: Option<SubsidySchedule>,
    pub subsidy_v2: Option<SubsidySchedule>,
    /// Negative disables the second schedule.
    pub subsidy_v2_activation_height: Option<i64>,
    pub work_reward_proportion: Option<u16>,
    pub stake_reward_proportion: Option<u16>,
    pub block_tax_proportion: Option<u16>,
    pub block_one_ledger: Option<Vec<TokenPayout>>,
    pub coinbase_maturity: Option<u16>,
    pub tickets: Option<TicketEconomicsConfig>,
    pub ai_tickets: Option<TicketEconomicsConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for network in [Network::Mainnet, Network::Testnet, Network::Simnet] {
            let params = ChainParams::for_network(network);
            assert_eq!(params.network, network);
            params.validate().unwrap_or_else(|e| panic!("{}: {}", network, e));
        }
    }

    #[test]
    fn test_mainnet_params() {
        let params = ChainParams::mainnet();
        assert_eq!(params.target_timespan(), 300 * 144);
        assert_eq!(params.total_subsidy_proportions(), 10);
        assert_eq!(params.block_one_subsidy(), 1_680_000 * ATOMS_PER_COIN);
        assert_eq!(params.pow_limit, (BigInt::from(1) << 224) - 1);
        assert_eq!(params.tickets.target_pool_size_all(), 5 * (8192 + 256));
    }

    #[test]
    fn test_stake_window_fits_in_maturity() {
        // The stake difficulty estimator requires this on every preset.
        for network in [Network::Mainnet, Network::Testnet, Network::Simnet] {
            let params = ChainParams::for_network(network);
            assert!(params.tickets.stake_diff_window_size <= params.tickets.ticket_maturity as i64);
            assert!(
                params.ai_tickets.stake_diff_window_size <= params.ai_tickets.ticket_maturity as i64
            );
        }
    }

    #[test]
    fn test_network_from_str() {
        assert_eq!("Testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!(" simnet ".parse::<Network>().unwrap(), Network::Simnet);
        let err = "regtest".parse::<Network>().unwrap_err();
        assert_eq!(err.field, "network");
    }

    #[test]
    fn test_from_config_applies_overrides() {
        let config = ChainParamsConfig {
            network: Network::Simnet,
            work_diff_window_size: Some(16),
            subsidy_v2_activation_height: Some(5000),
            tickets: Some(TicketEconomicsConfig {
                ticket_pool_size: Some(128),
                ..Default::default()
            }),
            ..Default::default()
        };
        let params = ChainParams::from_config(&config).unwrap();
        assert_eq!(params.work_diff_window_size, 16);
        assert_eq!(params.subsidy_v2_activation_height, Some(5000));
        assert_eq!(params.tickets.ticket_pool_size, 128);
        // Untouched values come from the preset
        assert_eq!(params.pow_limit_bits, 0x207fffff);
        assert_eq!(params.ai_tickets, ChainParams::simnet().ai_tickets);
    }

    #[test]
    fn test_from_config_negative_disables_v2() {
        let config = ChainParamsConfig {
            network: Network::Mainnet,
            subsidy_v2_activation_height: Some(-1),
            ..Default::default()
        };
        let params = ChainParams::from_config(&config).unwrap();
        assert_eq!(params.subsidy_v2_activation_height, None);
    }

    #[test]
    fn test_from_config_error_names_field() {
        let config = ChainParamsConfig {
            subsidy_v1: Some(SubsidySchedule {
                base_subsidy: 1,
                mul_subsidy: 101,
                div_subsidy: 100,
                epoch_threshold: 10,
            }),
            ..Default::default()
        };
        let err = ChainParams::from_config(&config).unwrap_err();
        assert_eq!(err.field, "subsidy_v1");

        let config = ChainParamsConfig {
            work_diff_windows: Some(0),
            ..Default::default()
        };
        assert_eq!(ChainParams::from_config(&config).unwrap_err().field, "work_diff_windows");

        let config = ChainParamsConfig {
            ai_tickets: Some(TicketEconomicsConfig {
                tickets_per_block: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(ChainParams::from_config(&config).unwrap_err().field, "ai_tickets");
    }

    #[test]
    fn test_from_config_hex_hygiene() {
        let config = ChainParamsConfig {
            network: Network::Simnet,
            pow_limit_hex: Some(" 0xFFFF ".to_string()),
            pow_limit_bits: Some(0x0200ffff),
            ..Default::default()
        };
        let params = ChainParams::from_config(&config).unwrap();
        assert_eq!(params.pow_limit, BigInt::from(0xffff));

        let config = ChainParamsConfig {
            pow_limit_hex: Some("zz".to_string()),
            ..Default::default()
        };
        let err = ChainParams::from_config(&config).unwrap_err();
        assert_eq!(err.field, "pow_limit_hex");
        assert!(err.message.contains("invalid hex"));
    }

    #[test]
    fn test_config_from_toml() {
        let raw = r#"
            network = "testnet"
            retarget_adjustment_factor = 2

            [ai_tickets]
            activation_height = 30000
        "#;
        let config: ChainParamsConfig = toml::from_str(raw).unwrap();
        let params = ChainParams::from_config(&config).unwrap();
        assert_eq!(params.network, Network::Testnet);
        assert_eq!(params.retarget_adjustment_factor, 2);
        assert_eq!(params.ai_tickets.activation_height, 30_000);
        assert!(params.reduce_min_difficulty);
    }
}

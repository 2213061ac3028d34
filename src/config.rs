//! TOML configuration.
//!
//! Every section is optional and falls back to the defaults below. Secrets can be
//! kept out of the file: `FIRESTATION_MNEMONIC` and `CMC_API_KEY` override the
//! wallet mnemonic and the CoinMarketCap key.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use bigdecimal::{BigDecimal, One, Signed};
use serde::{Deserialize, Deserializer};

use crate::client::coinmarketcap::CMC_API_BASE_URL;
use crate::client::{BroadcastMode, PriceIds};
use crate::engine::{PairTarget, StabilizerSettings, VolumeSettings};
use crate::error::{Error, Result};
use crate::market::{Coin, StabilizeCaps, VolumeParams};
use crate::tx::builder::DEFAULT_GAS_LIMIT;
use crate::tx::msg::is_valid_denom;
use crate::tx::TxBuilder;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "./config.toml";

/// Environment variable overriding `wallet.mnemonic`.
pub const MNEMONIC_ENV: &str = "FIRESTATION_MNEMONIC";

/// Environment variable overriding `coinmarketcap.api_key`.
pub const CMC_API_KEY_ENV: &str = "CMC_API_KEY";

/// Accepts decimals written as strings, integers or floats. Floats go through their
/// shortest textual form so `0.2` reads as exactly `0.2`.
fn de_decimal<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BigDecimal, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    let text = match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
    };
    BigDecimal::from_str(text.trim()).map_err(serde::de::Error::custom)
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Node REST endpoint
    pub lcd: LcdConfig,
    /// Reference price service
    pub coinmarketcap: CoinMarketCapConfig,
    /// Signing account
    pub wallet: WalletConfig,
    /// Stabilized pool and transaction fee
    pub firestation: FirestationConfig,
    /// Stabilizer loop knobs
    pub stabilizer: StabilizerConfig,
    /// Transaction envelope
    pub tx: TxConfig,
    /// Volume loop knobs
    pub volume: VolumeConfig,
    /// Extra or replacement denom to price id entries
    pub price_ids: HashMap<String, String>,
}

/// `[lcd]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LcdConfig {
    /// Base URL of the legacy REST server
    pub address: String,
}

impl Default for LcdConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:1317".to_string(),
        }
    }
}

/// `[coinmarketcap]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoinMarketCapConfig {
    /// API key
    pub api_key: String,
    /// API host
    pub base_url: String,
}

impl Default for CoinMarketCapConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: CMC_API_BASE_URL.to_string(),
        }
    }
}

/// `[wallet]`
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// BIP-39 recovery phrase
    pub mnemonic: String,
    /// Optional BIP-39 passphrase
    pub passphrase: String,
}

impl std::fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConfig")
            .field("mnemonic", &if self.mnemonic.is_empty() { "<unset>" } else { "<redacted>" })
            .finish_non_exhaustive()
    }
}

/// `[firestation]`: the pool the stabilizer watches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FirestationConfig {
    /// Price id of `denom_a`; looked up in the denom table when empty
    pub cmc_id_a: String,
    /// Price id of `denom_b`; looked up in the denom table when empty
    pub cmc_id_b: String,
    /// X denom
    pub denom_a: String,
    /// Y denom
    pub denom_b: String,
    /// Pool id
    pub pool_id: u64,
    /// Fee denom
    pub fee_denom: String,
    /// Fee amount; zero sends no fee coin
    pub fee_amount: u64,
}

impl Default for FirestationConfig {
    fn default() -> Self {
        Self {
            cmc_id_a: String::new(),
            cmc_id_b: String::new(),
            denom_a: "uatom".to_string(),
            denom_b: "uluna".to_string(),
            pool_id: 1,
            fee_denom: "stake".to_string(),
            fee_amount: 0,
        }
    }
}

/// `[stabilizer]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Divergence that triggers an order
    #[serde(deserialize_with = "de_decimal")]
    pub upper_threshold: BigDecimal,
    /// Cap on the fraction of the offered reserve per order
    #[serde(deserialize_with = "de_decimal")]
    pub max_order_fraction: BigDecimal,
    /// Divergence counted as converged
    #[serde(deserialize_with = "de_decimal")]
    pub convergence_tolerance: BigDecimal,
    /// Submission budget per session
    pub max_iterations: u64,
    /// Pause after each submission
    pub pacing_ms: u64,
    /// Pause after a session with nothing to do
    pub idle_interval_ms: u64,
    /// Pool swap fee rate
    #[serde(deserialize_with = "de_decimal")]
    pub swap_fee_rate: BigDecimal,
    /// Re-plan every iteration instead of replaying the first order
    pub replan_each_iteration: bool,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        let settings = StabilizerSettings::default();
        Self {
            upper_threshold: settings.caps.upper_threshold,
            max_order_fraction: settings.caps.max_order_fraction,
            convergence_tolerance: settings.convergence_tolerance,
            max_iterations: settings.max_iterations,
            pacing_ms: 1_000,
            idle_interval_ms: 10_000,
            swap_fee_rate: settings.caps.fee_rate,
            replan_each_iteration: settings.replan_each_iteration,
        }
    }
}

/// `[tx]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TxConfig {
    /// Gas limit of every transaction
    pub gas_limit: u64,
    /// Memo of every transaction
    pub memo: String,
    /// Broadcast mode
    pub broadcast_mode: BroadcastMode,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            memo: String::new(),
            broadcast_mode: BroadcastMode::Block,
        }
    }
}

/// `[volume]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Pools traded per cycle
    pub pool_count: usize,
    /// Buy/sell pairs per pool per tick
    pub orders_per_side: usize,
    /// Outer cycles
    pub duration: u32,
    /// Ticks per cycle
    pub frequency: u32,
    /// USD notional of each order
    #[serde(deserialize_with = "de_decimal")]
    pub notional_usd: BigDecimal,
    /// Price offset from the pool rate
    #[serde(deserialize_with = "de_decimal")]
    pub skew: BigDecimal,
    /// Aggregate notional the run aims for
    #[serde(deserialize_with = "de_decimal")]
    pub target_notional_usd: BigDecimal,
    /// USD value each reserve of a traded pool must exceed
    #[serde(deserialize_with = "de_decimal")]
    pub min_reserve_usd: BigDecimal,
    /// Base units per whole coin, as a power of ten
    pub base_unit_exponent: u32,
    /// Pause after each tick
    pub pacing_ms: u64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        let settings = VolumeSettings::default();
        Self {
            pool_count: settings.pool_count,
            orders_per_side: settings.params.orders_per_side,
            duration: settings.duration,
            frequency: settings.frequency,
            notional_usd: settings.params.notional_usd,
            skew: settings.params.skew,
            target_notional_usd: settings.target_notional_usd,
            min_reserve_usd: settings.min_reserve_usd,
            base_unit_exponent: settings.params.base_unit_exponent,
            pacing_ms: 1_000,
        }
    }
}

impl Config {
    /// Reads, parses, applies environment overrides and validates.
    ///
    /// # Errors
    /// `Config` if the file cannot be read, parsed or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("config: reading {}", path.display());
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config = Self::parse_str(&raw)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parses TOML text. Unknown sections are ignored.
    ///
    /// # Errors
    /// `Config` if the text is not valid TOML for this layout.
    pub fn parse_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("cannot parse config: {e}")))
    }

    /// Applies `FIRESTATION_MNEMONIC` and `CMC_API_KEY` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies secret overrides from `lookup`; empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(mnemonic) = lookup(MNEMONIC_ENV).filter(|v| !v.trim().is_empty()) {
            self.wallet.mnemonic = mnemonic;
        }
        if let Some(key) = lookup(CMC_API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.coinmarketcap.api_key = key;
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// `Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.lcd.address)?;

        let fs = &self.firestation;
        for (field, denom) in [("denom_a", &fs.denom_a), ("denom_b", &fs.denom_b)] {
            if !is_valid_denom(denom) {
                return Err(Error::Config(format!("firestation.{field} {denom:?} is not a denom")));
            }
        }
        if fs.denom_a == fs.denom_b {
            return Err(Error::Config("firestation.denom_a and denom_b are equal".to_string()));
        }
        if fs.fee_amount > 0 && !is_valid_denom(&fs.fee_denom) {
            return Err(Error::Config(format!(
                "firestation.fee_denom {:?} is not a denom",
                fs.fee_denom
            )));
        }

        let st = &self.stabilizer;
        if !st.upper_threshold.is_positive() {
            return Err(Error::Config("stabilizer.upper_threshold must be positive".to_string()));
        }
        if !st.max_order_fraction.is_positive() || st.max_order_fraction > BigDecimal::one() {
            return Err(Error::Config(
                "stabilizer.max_order_fraction must be in (0, 1]".to_string(),
            ));
        }
        if st.convergence_tolerance.is_negative() {
            return Err(Error::Config("stabilizer.convergence_tolerance is negative".to_string()));
        }
        if st.max_iterations == 0 {
            return Err(Error::Config("stabilizer.max_iterations must be positive".to_string()));
        }
        if st.swap_fee_rate.is_negative() || st.swap_fee_rate >= BigDecimal::one() {
            return Err(Error::Config("stabilizer.swap_fee_rate must be in [0, 1)".to_string()));
        }

        let vol = &self.volume;
        if vol.pool_count == 0 || vol.orders_per_side == 0 {
            return Err(Error::Config(
                "volume.pool_count and volume.orders_per_side must be positive".to_string(),
            ));
        }
        if !vol.notional_usd.is_positive() {
            return Err(Error::Config("volume.notional_usd must be positive".to_string()));
        }
        if vol.skew.is_negative() || vol.skew >= BigDecimal::one() {
            return Err(Error::Config("volume.skew must be in [0, 1)".to_string()));
        }
        if vol.min_reserve_usd.is_negative() {
            return Err(Error::Config("volume.min_reserve_usd must not be negative".to_string()));
        }
        if self.tx.gas_limit == 0 {
            return Err(Error::Config("tx.gas_limit must be positive".to_string()));
        }
        Ok(())
    }

    /// Denom table with the configured extras applied.
    pub fn price_ids(&self) -> PriceIds {
        PriceIds::with_overrides(&self.price_ids)
    }

    /// The stabilized pool, with price ids filled from the denom table when not given.
    ///
    /// # Errors
    /// `MissingReferencePrice` if a denom has neither an explicit nor a known id.
    pub fn pair_target(&self, ids: &PriceIds) -> Result<PairTarget> {
        let fs = &self.firestation;
        let id_or_lookup = |explicit: &str, denom: &str| -> Result<String> {
            if explicit.is_empty() {
                Ok(ids.resolve(&[denom])?.remove(0))
            } else {
                Ok(explicit.to_string())
            }
        };
        Ok(PairTarget {
            pool_id: fs.pool_id,
            denom_x: fs.denom_a.clone(),
            denom_y: fs.denom_b.clone(),
            price_id_x: id_or_lookup(&fs.cmc_id_a, &fs.denom_a)?,
            price_id_y: id_or_lookup(&fs.cmc_id_b, &fs.denom_b)?,
        })
    }

    /// Settings for the stabilizer loop.
    pub fn stabilizer_settings(&self) -> StabilizerSettings {
        let st = &self.stabilizer;
        StabilizerSettings {
            caps: StabilizeCaps {
                upper_threshold: st.upper_threshold.clone(),
                max_order_fraction: st.max_order_fraction.clone(),
                fee_rate: st.swap_fee_rate.clone(),
            },
            convergence_tolerance: st.convergence_tolerance.clone(),
            max_iterations: st.max_iterations,
            pacing: Duration::from_millis(st.pacing_ms),
            idle_interval: Duration::from_millis(st.idle_interval_ms),
            replan_each_iteration: st.replan_each_iteration,
        }
    }

    /// Settings for the volume loop.
    pub fn volume_settings(&self) -> VolumeSettings {
        let vol = &self.volume;
        VolumeSettings {
            params: VolumeParams {
                notional_usd: vol.notional_usd.clone(),
                skew: vol.skew.clone(),
                base_unit_exponent: vol.base_unit_exponent,
                orders_per_side: vol.orders_per_side,
                fee_rate: self.stabilizer.swap_fee_rate.clone(),
            },
            pool_count: vol.pool_count,
            duration: vol.duration,
            frequency: vol.frequency,
            target_notional_usd: vol.target_notional_usd.clone(),
            min_reserve_usd: vol.min_reserve_usd.clone(),
            pacing: Duration::from_millis(vol.pacing_ms),
        }
    }

    /// Transaction builder for `chain_id` with the configured fee, gas and memo.
    pub fn tx_builder(&self, chain_id: &str) -> TxBuilder {
        let fee = Coin::new(&self.firestation.fee_denom, u128::from(self.firestation.fee_amount));
        TxBuilder::new(chain_id, vec![fee])
            .with_gas_limit(self.tx.gas_limit)
            .with_memo(&self.tx.memo)
    }
}

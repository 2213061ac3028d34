//! Turnover generator: symmetric buy/sell pairs across a random set of pools.

use std::collections::HashMap;
use std::time::Duration;

use bigdecimal::{BigDecimal, Signed, Zero};
use itertools::Itertools;
use rand::Rng;

use super::selection::select_pools;
use crate::client::{LedgerClient, PriceIds, PriceSource};
use crate::error::{Error, Result};
use crate::market::{plan_volume, reserve_usd, Pool, ReferencePrice, VolumeParams};
use crate::tx::{AccountState, TxBuilder, TxSigner};

/// Knobs of the volume loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSettings {
    /// Per-order planning parameters
    pub params: VolumeParams,
    /// Pools traded per cycle
    pub pool_count: usize,
    /// Outer cycles; pools are re-drawn at the start of each
    pub duration: u32,
    /// Ticks per cycle
    pub frequency: u32,
    /// Aggregate USD notional the run aims for
    pub target_notional_usd: BigDecimal,
    /// A pool is traded only when each reserve is worth more than this many USD
    pub min_reserve_usd: BigDecimal,
    /// Pause after each tick
    pub pacing: Duration,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            params: VolumeParams::default(),
            pool_count: 4,
            duration: 10,
            frequency: 5,
            target_notional_usd: BigDecimal::from(100_000),
            min_reserve_usd: BigDecimal::from(1_000),
            pacing: Duration::from_secs(1),
        }
    }
}

/// Totals of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeReport {
    /// Cycles completed
    pub cycles: u32,
    /// Transactions broadcast
    pub transactions: u64,
    /// Swap messages carried by those transactions
    pub messages: u64,
    /// Target notional not yet covered, never negative
    pub remaining_notional_usd: BigDecimal,
}

/// Generates trading volume with an injected random source for pool selection.
pub struct VolumeGenerator<'a, R: Rng> {
    ledger: &'a dyn LedgerClient,
    prices: &'a dyn PriceSource,
    signer: &'a dyn TxSigner,
    builder: TxBuilder,
    ids: PriceIds,
    settings: VolumeSettings,
    rng: R,
}

impl<'a, R: Rng> VolumeGenerator<'a, R> {
    /// Wires a generator to its collaborators.
    pub fn new(
        ledger: &'a dyn LedgerClient,
        prices: &'a dyn PriceSource,
        signer: &'a dyn TxSigner,
        builder: TxBuilder,
        ids: PriceIds,
        settings: VolumeSettings,
        rng: R,
    ) -> Self {
        Self {
            ledger,
            prices,
            signer,
            builder,
            ids,
            settings,
            rng,
        }
    }

    /// Runs every cycle and tick.
    ///
    /// # Errors
    /// * `NotFound` if fewer than `pool_count` pools have prices and deep enough reserves
    /// * any collaborator, planning or signing error; a rejected broadcast is a
    ///   `Network` error
    pub async fn run(&mut self) -> Result<VolumeReport> {
        let mut account = self.ledger.account(self.signer.address()).await?;
        let mut report = VolumeReport {
            cycles: 0,
            transactions: 0,
            messages: 0,
            remaining_notional_usd: self.settings.target_notional_usd.clone(),
        };

        for cycle in 1..=self.settings.duration {
            let (candidates, quotes) = self.liquid_pools().await?;
            let pools =
                select_pools(candidates, &self.ids, self.settings.pool_count, &mut self.rng)?;
            log::info!(
                "volume: cycle {cycle}/{} on pools {}",
                self.settings.duration,
                pools.iter().map(|p| p.id).join(",")
            );

            for tick in 1..=self.settings.frequency {
                for pool in &pools {
                    self.trade(pool, &quotes, &mut account, &mut report).await?;
                }
                log::info!(
                    "volume: cycle {cycle} tick {tick} done, {} USD left of target",
                    report.remaining_notional_usd
                );
                tokio::time::sleep(self.settings.pacing).await;
            }
            report.cycles = cycle;
        }

        log::info!(
            "volume: finished {} cycles, {} transactions, {} messages",
            report.cycles,
            report.transactions,
            report.messages
        );
        Ok(report)
    }

    async fn fetch_quotes(&self, pools: &[Pool]) -> Result<HashMap<String, BigDecimal>> {
        let ids: Vec<String> = pools
            .iter()
            .flat_map(|p| p.reserve_coin_denoms.iter())
            .filter_map(|d| self.ids.id_for(d))
            .unique()
            .map(ToString::to_string)
            .collect();
        self.prices.prices(&ids).await
    }

    /// Priced pools whose reserves both exceed `min_reserve_usd`, with the quotes used
    /// to value them.
    async fn liquid_pools(&self) -> Result<(Vec<Pool>, HashMap<String, BigDecimal>)> {
        let priced: Vec<Pool> = self
            .ledger
            .pools()
            .await?
            .into_iter()
            .filter(|p| p.reserve_coin_denoms.iter().all(|d| self.ids.knows(d)))
            .collect();
        let quotes = self.fetch_quotes(&priced).await?;
        let exponent = self.settings.params.base_unit_exponent;

        let mut liquid = Vec::with_capacity(priced.len());
        for pool in priced {
            let [denom_x, denom_y] = &pool.reserve_coin_denoms;
            let reserves = self.ledger.reserves_of(&pool, denom_x, denom_y).await?;
            let price_x = self.reference_price(denom_x, &quotes)?;
            let price_y = self.reference_price(denom_y, &quotes)?;
            let value_x = reserve_usd(&reserves.reserve_x, &price_x, exponent);
            let value_y = reserve_usd(&reserves.reserve_y, &price_y, exponent);
            if value_x > self.settings.min_reserve_usd && value_y > self.settings.min_reserve_usd {
                liquid.push(pool);
            } else {
                log::debug!(
                    "volume: skipping pool {} with reserves {reserves} ({value_x} / {value_y} USD)",
                    pool.id
                );
            }
        }
        Ok((liquid, quotes))
    }

    fn reference_price(
        &self,
        denom: &str,
        quotes: &HashMap<String, BigDecimal>,
    ) -> Result<ReferencePrice> {
        self.ids
            .id_for(denom)
            .and_then(|id| quotes.get(id))
            .map(|usd| ReferencePrice::new(denom, usd.clone()))
            .ok_or_else(|| Error::MissingReferencePrice(denom.to_string()))
    }

    async fn trade(
        &self,
        pool: &Pool,
        quotes: &HashMap<String, BigDecimal>,
        account: &mut AccountState,
        report: &mut VolumeReport,
    ) -> Result<()> {
        let [denom_x, denom_y] = &pool.reserve_coin_denoms;
        let reserves = self.ledger.reserves_of(pool, denom_x, denom_y).await?;
        let price_x = self.reference_price(denom_x, quotes)?;
        let price_y = self.reference_price(denom_y, quotes)?;

        let intents = plan_volume(pool.id, &reserves, (&price_x, &price_y), &self.settings.params)?;
        let tx = self.builder.sign(account, self.signer, &intents)?;
        let result = self.ledger.broadcast(&tx).await?;
        if !result.is_ok() {
            return Err(Error::Network(format!(
                "transaction {} rejected with code {}: {}",
                result.tx_hash, result.code, result.raw_log
            )));
        }
        account.advance();

        let notional =
            &self.settings.params.notional_usd * BigDecimal::from(tx.message_count as u64);
        let remaining = &report.remaining_notional_usd - notional;
        report.remaining_notional_usd = if remaining.is_negative() {
            BigDecimal::zero()
        } else {
            remaining
        };
        report.transactions += 1;
        report.messages += tx.message_count as u64;

        log::info!(
            "volume: pool {} tx {} height {} seq {} ({} msgs)",
            pool.id,
            result.tx_hash,
            result.height,
            tx.sequence,
            tx.message_count
        );
        Ok(())
    }
}

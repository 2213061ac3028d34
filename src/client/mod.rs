//! # Client Module
//!
//! Collaborators the engine talks to: the ledger node and the reference price
//! service. Both are traits so the loops can run against in-memory doubles.

use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::market::{Coin, Pool, ReservePair};
use crate::tx::{AccountState, SignedTransaction};

/// CoinMarketCap quotes client
pub mod coinmarketcap;
/// Legacy REST (LCD) client
pub mod lcd;
/// Denom to price id table
pub mod metadata;

pub use coinmarketcap::CoinMarketCapClient;
pub use lcd::LcdClient;
pub use metadata::PriceIds;

/// How long the node holds the broadcast request open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Wait for the transaction to be committed in a block
    #[default]
    #[display("block")]
    Block,
    /// Wait for the mempool check only
    #[display("sync")]
    Sync,
    /// Return immediately
    #[display("async")]
    Async,
}

/// Node's answer to a broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    /// Transaction hash as reported by the node
    pub tx_hash: String,
    /// Inclusion height, zero when not yet committed
    pub height: u64,
    /// Result code, zero on success
    pub code: u32,
    /// Raw log from the node
    pub raw_log: String,
}

impl BroadcastResult {
    /// True when the chain accepted the transaction.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Read and write access to the ledger node.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Network identifier used in sign documents.
    async fn chain_id(&self) -> Result<String>;

    /// Account number and current sequence of `address`.
    async fn account(&self, address: &str) -> Result<AccountState>;

    /// Every liquidity pool on the network.
    async fn pools(&self) -> Result<Vec<Pool>>;

    /// Bank balances held by `address`.
    async fn balances(&self, address: &str) -> Result<Vec<Coin>>;

    /// Submits a signed transaction.
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastResult>;

    /// Reserves of the pool trading `denom_x` against `denom_y`, reported in the
    /// caller's orientation regardless of the pool's own denom order.
    ///
    /// # Errors
    /// `NotFound` if no pool trades the pair.
    async fn pool_reserves(&self, denom_x: &str, denom_y: &str) -> Result<(Pool, ReservePair)> {
        let pool = self
            .pools()
            .await?
            .into_iter()
            .find(|p| p.trades(denom_x, denom_y))
            .ok_or_else(|| Error::NotFound(format!("pool for {denom_x}/{denom_y}")))?;
        let reserves = self.reserves_of(&pool, denom_x, denom_y).await?;
        Ok((pool, reserves))
    }

    /// Reads the balances of a known pool's reserve account. Denoms the account does
    /// not hold read as zero.
    async fn reserves_of(&self, pool: &Pool, denom_x: &str, denom_y: &str) -> Result<ReservePair> {
        let balances = self.balances(&pool.reserve_account_address).await?;
        let balance_of = |denom: &str| {
            balances
                .iter()
                .find(|c| c.denom == denom)
                .map_or_else(BigDecimal::zero, |c| BigDecimal::from(c.amount))
        };

        Ok(ReservePair {
            denom_x: denom_x.to_string(),
            denom_y: denom_y.to_string(),
            reserve_x: balance_of(denom_x),
            reserve_y: balance_of(denom_y),
        })
    }
}

/// External USD quotes keyed by price-service id.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// USD price of every id in `ids`.
    ///
    /// # Errors
    /// `NotFound` if the service has no quote for one of the ids.
    async fn prices(&self, ids: &[String]) -> Result<HashMap<String, BigDecimal>>;

    /// USD price of a single id.
    async fn price(&self, id: &str) -> Result<BigDecimal> {
        let mut quotes = self.prices(&[id.to_string()]).await?;
        quotes
            .remove(id)
            .ok_or_else(|| Error::NotFound(format!("price id {id}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_helpers::{dec, MockLedger, MockPrices};

    #[tokio::test]
    async fn test_pool_reserves_follow_caller_orientation() {
        let ledger = MockLedger::new("cosmos1mock", 5, 1);
        ledger.add_pool(7, "uatom", "uluna", 100, 500);

        let (pool, forward) = ledger.pool_reserves("uatom", "uluna").await.unwrap();
        assert_eq!(pool.id, 7);
        assert_eq!(forward.reserve_x, dec("100"));
        assert_eq!(forward.reserve_y, dec("500"));

        let (_, backward) = ledger.pool_reserves("uluna", "uatom").await.unwrap();
        assert_eq!(backward, forward.reversed());
    }

    #[tokio::test]
    async fn test_pool_reserves_missing_pool() {
        let ledger = MockLedger::new("cosmos1mock", 5, 1);
        ledger.add_pool(7, "uatom", "uluna", 100, 500);
        assert!(matches!(
            ledger.pool_reserves("uatom", "uiris").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_single_price_lookup() {
        let prices = MockPrices::new(&[("3794", "10.5")]);
        assert_eq!(prices.price("3794").await.unwrap(), dec("10.5"));
        assert!(matches!(prices.price("1").await, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_broadcast_mode_wire_names() {
        assert_eq!(serde_json::to_string(&BroadcastMode::Block).unwrap(), "\"block\"");
        assert_eq!(BroadcastMode::Async.to_string(), "async");
        assert!(BroadcastResult::default().is_ok());
    }
}

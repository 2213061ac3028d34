//! Application context: configuration plus the live clients built from it.

use eyre::{eyre, Result};

use crate::client::{CoinMarketCapClient, LcdClient, LedgerClient, PriceIds};
use crate::config::{Config, MNEMONIC_ENV};
use crate::tx::{derive_account, KeySigner, TxBuilder};

/// Shared state handed to every command.
pub struct AppContext {
    /// Loaded and validated configuration
    pub config: Config,
    /// Node REST client
    pub ledger: LcdClient,
    /// Reference price client
    pub prices: CoinMarketCapClient,
    /// Denom to price id table
    pub price_ids: PriceIds,
}

impl AppContext {
    /// Builds the clients described by `config`.
    ///
    /// # Errors
    /// * If an endpoint URL is invalid
    /// * If an HTTP client cannot be built
    pub fn new(config: Config) -> Result<Self> {
        let ledger = LcdClient::new(&config.lcd.address, config.tx.broadcast_mode)?;
        let prices = CoinMarketCapClient::with_base_url(
            &config.coinmarketcap.base_url,
            &config.coinmarketcap.api_key,
        )?;
        let price_ids = config.price_ids();
        Ok(Self {
            config,
            ledger,
            prices,
            price_ids,
        })
    }

    /// Recovers the signing account from the configured mnemonic.
    ///
    /// # Errors
    /// * If no mnemonic is configured
    /// * If the mnemonic is invalid
    pub fn signer(&self) -> Result<KeySigner> {
        let wallet = &self.config.wallet;
        if wallet.mnemonic.trim().is_empty() {
            return Err(eyre!("wallet.mnemonic or {MNEMONIC_ENV} must be set"));
        }
        Ok(derive_account(&wallet.mnemonic, &wallet.passphrase)?)
    }

    /// Transaction builder for the network the node reports.
    ///
    /// # Errors
    /// * If the node cannot be reached
    pub async fn tx_builder(&self) -> Result<TxBuilder> {
        let chain_id = self.ledger.chain_id().await?;
        log::info!("connected to {chain_id} via {}", self.config.lcd.address);
        Ok(self.config.tx_builder(&chain_id))
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use url::Url;

use super::{BroadcastMode, BroadcastResult, LedgerClient};
use crate::error::{Error, Result};
use crate::market::{Coin, Pool};
use crate::tx::{AccountState, SignedTransaction};

/// Request timeout applied to every call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest page requested when listing pools.
const POOL_PAGE_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
struct NodeInfoResponse {
    #[serde(alias = "default_node_info")]
    node_info: NodeInfo,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    network: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account: BaseAccount,
}

#[derive(Debug, Deserialize)]
struct BaseAccount {
    address: String,
    #[serde(default)]
    account_number: String,
    #[serde(default)]
    sequence: String,
}

#[derive(Debug, Deserialize)]
struct PoolsResponse {
    pools: Vec<PoolRecord>,
}

#[derive(Debug, Deserialize)]
struct PoolRecord {
    id: String,
    type_id: u32,
    reserve_coin_denoms: Vec<String>,
    reserve_account_address: String,
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    balances: Vec<CoinRecord>,
}

#[derive(Debug, Deserialize)]
struct CoinRecord {
    denom: String,
    amount: String,
}

#[derive(Serialize)]
struct BroadcastRequest<'a> {
    tx: &'a RawValue,
    mode: BroadcastMode,
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    #[serde(default)]
    height: String,
    txhash: String,
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    raw_log: String,
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T> {
    if raw.is_empty() {
        return Err(Error::Network(format!("{field} missing from node response")));
    }
    raw.parse()
        .map_err(|_| Error::Network(format!("{field} is not a number: {raw:?}")))
}

impl TryFrom<PoolRecord> for Pool {
    type Error = Error;

    fn try_from(record: PoolRecord) -> Result<Self> {
        let [x, y]: [String; 2] =
            record
                .reserve_coin_denoms
                .try_into()
                .map_err(|denoms: Vec<String>| {
                    Error::Network(format!(
                        "pool {} has {} reserve denoms",
                        record.id,
                        denoms.len()
                    ))
                })?;
        Ok(Self {
            id: parse_number("pool id", &record.id)?,
            type_id: record.type_id,
            reserve_coin_denoms: [x, y],
            reserve_account_address: record.reserve_account_address,
        })
    }
}

/// Client for a node's legacy REST server.
#[derive(Debug, Clone)]
pub struct LcdClient {
    /// Base URL, always ending in `/`
    base: Url,
    /// HTTP client
    client: Client,
    /// Broadcast mode sent with every transaction
    mode: BroadcastMode,
}

impl LcdClient {
    /// Creates a client for the REST server at `address`.
    ///
    /// # Errors
    /// * `Config` if the address is not a URL
    /// * `Network` if the HTTP client cannot be built
    pub fn new(address: &str, mode: BroadcastMode) -> Result<Self> {
        let mut base = Url::parse(address)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { base, client, mode })
    }

    /// Endpoint URL for a path relative to the base.
    ///
    /// # Errors
    /// `Config` if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        log::debug!("lcd: GET {url}");
        let response = self.client.get(url).send().await?;
        Self::read(response, what).await
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Network(format!("{what}: HTTP {status}: {body}")));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl LedgerClient for LcdClient {
    async fn chain_id(&self) -> Result<String> {
        let info: NodeInfoResponse = self.get("node_info", "node info").await?;
        Ok(info.node_info.network)
    }

    async fn account(&self, address: &str) -> Result<AccountState> {
        let response: AccountResponse = self
            .get(
                &format!("cosmos/auth/v1beta1/accounts/{address}"),
                &format!("account {address}"),
            )
            .await?;
        let account = response.account;
        // Fresh accounts report an empty sequence until their first transaction
        let sequence = if account.sequence.is_empty() {
            0
        } else {
            parse_number("sequence", &account.sequence)?
        };
        Ok(AccountState::new(
            &account.address,
            sequence,
            parse_number("account_number", &account.account_number)?,
        ))
    }

    async fn pools(&self) -> Result<Vec<Pool>> {
        let response: PoolsResponse = self
            .get(
                &format!("tendermint/liquidity/v1beta1/pools?pagination.limit={POOL_PAGE_LIMIT}"),
                "liquidity pools",
            )
            .await?;
        response.pools.into_iter().map(Pool::try_from).collect()
    }

    async fn balances(&self, address: &str) -> Result<Vec<Coin>> {
        let response: BalancesResponse = self
            .get(
                &format!("cosmos/bank/v1beta1/balances/{address}"),
                &format!("balances of {address}"),
            )
            .await?;
        response
            .balances
            .into_iter()
            .map(|c| {
                let amount = parse_number(&format!("{} amount", c.denom), &c.amount)?;
                Ok(Coin::new(&c.denom, amount))
            })
            .collect()
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastResult> {
        let raw = std::str::from_utf8(&tx.bytes)
            .map_err(|e| Error::Network(format!("transaction is not utf-8: {e}")))?;
        let raw: &RawValue = serde_json::from_str(raw)?;
        let url = self.endpoint("txs")?;
        log::debug!(
            "lcd: POST {url} seq={} msgs={} mode={}",
            tx.sequence,
            tx.message_count,
            self.mode
        );

        let response = self
            .client
            .post(url)
            .json(&BroadcastRequest { tx: raw, mode: self.mode })
            .send()
            .await?;
        let response: BroadcastResponse = Self::read(response, "broadcast").await?;

        Ok(BroadcastResult {
            tx_hash: response.txhash,
            height: if response.height.is_empty() {
                0
            } else {
                parse_number("height", &response.height)?
            },
            code: response.code.unwrap_or_default(),
            raw_log: response.raw_log,
        })
    }
}

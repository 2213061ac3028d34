//! In-memory collaborators and shorthand constructors shared by unit tests.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc, missing_docs)]

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bigdecimal::BigDecimal;

use crate::client::{BroadcastResult, LedgerClient, PriceSource};
use crate::error::{Error, Result};
use crate::market::{Coin, Pool, ReferencePrice, ReservePair};
use crate::tx::{decode, AccountState, SignedTransaction, StdTx, TxSigner};

pub fn dec(raw: &str) -> BigDecimal {
    BigDecimal::from_str(raw).unwrap()
}

pub fn price(denom: &str, usd: &str) -> ReferencePrice {
    ReferencePrice::new(denom, dec(usd))
}

/// `uatom`/`uother` reserves.
pub fn reserves(x: u128, y: u128) -> ReservePair {
    ReservePair::new("uatom", "uother", x, y)
}

struct MockPool {
    pool: Pool,
    /// Upcoming reserve snapshots; the last one repeats forever
    script: VecDeque<(u128, u128)>,
}

/// Ledger double with scripted reserves and recorded broadcasts.
pub struct MockLedger {
    chain_id: String,
    account: AccountState,
    pools: Mutex<Vec<MockPool>>,
    broadcasts: Mutex<Vec<SignedTransaction>>,
    reject_code: Mutex<Option<u32>>,
    account_calls: AtomicUsize,
    balance_calls: AtomicUsize,
    fail_balances_at: Mutex<Option<usize>>,
}

impl MockLedger {
    pub fn new(address: &str, sequence: u64, account_number: u64) -> Self {
        Self {
            chain_id: "gravity-test".to_string(),
            account: AccountState::new(address, sequence, account_number),
            pools: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(Vec::new()),
            reject_code: Mutex::new(None),
            account_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
            fail_balances_at: Mutex::new(None),
        }
    }

    pub fn add_pool(
        &self,
        id: u64,
        denom_x: &str,
        denom_y: &str,
        reserve_x: u128,
        reserve_y: u128,
    ) {
        self.pools.lock().unwrap().push(MockPool {
            pool: Pool {
                id,
                type_id: 1,
                reserve_coin_denoms: [denom_x.to_string(), denom_y.to_string()],
                reserve_account_address: format!("cosmos1pool{id}"),
            },
            script: VecDeque::from([(reserve_x, reserve_y)]),
        });
    }

    /// Replaces the reserve snapshots served for `id`, one per balance query.
    pub fn script_reserves(&self, id: u64, snapshots: &[(u128, u128)]) {
        let mut pools = self.pools.lock().unwrap();
        let pool = pools.iter_mut().find(|p| p.pool.id == id).unwrap();
        pool.script = snapshots.iter().copied().collect();
    }

    /// Makes every following broadcast come back with `code`.
    pub fn reject_with(&self, code: u32) {
        *self.reject_code.lock().unwrap() = Some(code);
    }

    /// Makes the `nth` balance query (1-based) and every later one fail.
    pub fn fail_balances_at(&self, nth: usize) {
        *self.fail_balances_at.lock().unwrap() = Some(nth);
    }

    pub fn broadcasts(&self) -> Vec<SignedTransaction> {
        self.broadcasts.lock().unwrap().clone()
    }

    pub fn decoded(&self) -> Vec<StdTx> {
        self.broadcasts()
            .iter()
            .map(|tx| decode(&tx.bytes).unwrap())
            .collect()
    }

    pub fn sequences(&self) -> Vec<u64> {
        self.broadcasts().iter().map(|tx| tx.sequence).collect()
    }

    pub fn account_calls(&self) -> usize {
        self.account_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn chain_id(&self) -> Result<String> {
        Ok(self.chain_id.clone())
    }

    async fn account(&self, address: &str) -> Result<AccountState> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        if address == self.account.address {
            Ok(self.account.clone())
        } else {
            Err(Error::NotFound(format!("account {address}")))
        }
    }

    async fn pools(&self) -> Result<Vec<Pool>> {
        Ok(self
            .pools
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.pool.clone())
            .collect())
    }

    async fn balances(&self, address: &str) -> Result<Vec<Coin>> {
        let call = self.balance_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail_at = *self.fail_balances_at.lock().unwrap();
        if fail_at.is_some_and(|nth| call >= nth) {
            return Err(Error::Network(format!("balances of {address}: connection reset")));
        }
        let mut pools = self.pools.lock().unwrap();
        let Some(entry) = pools
            .iter_mut()
            .find(|p| p.pool.reserve_account_address == address)
        else {
            return Ok(Vec::new());
        };
        let (x, y) = if entry.script.len() > 1 {
            entry.script.pop_front().unwrap()
        } else {
            *entry.script.front().unwrap()
        };
        let [denom_x, denom_y] = &entry.pool.reserve_coin_denoms;
        Ok(vec![Coin::new(denom_x, x), Coin::new(denom_y, y)])
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastResult> {
        let mut broadcasts = self.broadcasts.lock().unwrap();
        broadcasts.push(tx.clone());
        let code = self.reject_code.lock().unwrap().unwrap_or(0);
        Ok(BroadcastResult {
            tx_hash: tx.hash.clone(),
            height: 100 + broadcasts.len() as u64,
            code,
            raw_log: if code == 0 {
                "[]".to_string()
            } else {
                "insufficient fee".to_string()
            },
        })
    }
}

/// Price source double that counts its queries.
pub struct MockPrices {
    quotes: HashMap<String, BigDecimal>,
    calls: AtomicUsize,
}

impl MockPrices {
    pub fn new(quotes: &[(&str, &str)]) -> Self {
        Self {
            quotes: quotes
                .iter()
                .map(|(id, usd)| ((*id).to_string(), dec(usd)))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for MockPrices {
    async fn prices(&self, ids: &[String]) -> Result<HashMap<String, BigDecimal>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ids.iter()
            .map(|id| {
                self.quotes
                    .get(id)
                    .map(|p| (id.clone(), p.clone()))
                    .ok_or_else(|| Error::NotFound(format!("price id {id}")))
            })
            .collect()
    }
}

/// Deterministic signer: the signature is the digest written twice.
pub struct MockSigner {
    address: String,
    public_key: Vec<u8>,
    fail: bool,
}

impl MockSigner {
    pub fn new(address: &str) -> Self {
        let mut public_key = vec![0x02];
        public_key.extend_from_slice(&[0xab; 32]);
        Self {
            address: address.to_string(),
            public_key,
            fail: false,
        }
    }

    /// Signer whose every signing attempt fails.
    pub fn failing(address: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(address)
        }
    }

    /// Signer that reports no public key.
    pub fn without_key(address: &str) -> Self {
        Self {
            public_key: Vec::new(),
            ..Self::new(address)
        }
    }
}

impl TxSigner for MockSigner {
    fn address(&self) -> &str {
        &self.address
    }

    fn public_key(&self) -> Vec<u8> {
        self.public_key.clone()
    }

    fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 64]> {
        if self.fail {
            return Err(Error::Signing("key store locked".to_string()));
        }
        let mut signature = [0u8; 64];
        signature[..32].copy_from_slice(digest);
        signature[32..].copy_from_slice(digest);
        Ok(signature)
    }
}

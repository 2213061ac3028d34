//! Legacy amino-JSON transaction assembly and signing.
//!
//! The node's legacy REST endpoint accepts a JSON `StdTx`. The signature covers the
//! canonical form of a `StdSignDoc`: every object's keys sorted, no whitespace, and
//! `<`, `>`, `&`, U+2028 and U+2029 written as `\uXXXX` escapes the way the node's
//! own encoder writes them.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::account::AccountState;
use super::msg::{AminoCoin, Msg, MsgSwapWithinBatch};
use super::signer::TxSigner;
use crate::error::{Error, Result};
use crate::market::{Coin, OrderIntent};

/// Gas limit attached when none is configured.
pub const DEFAULT_GAS_LIMIT: u64 = 100_000_000;

/// Amino type tag of a secp256k1 public key.
pub const SECP256K1_PUBKEY_TYPE: &str = "tendermint/PubKeySecp256k1";

/// Fee section of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    /// Fee coins
    pub amount: Vec<AminoCoin>,
    /// Gas limit as a decimal string
    pub gas: String,
}

/// Document the account signs.
#[derive(Debug, Clone, Serialize)]
pub struct StdSignDoc<'a> {
    /// Ledger account number
    pub account_number: String,
    /// Network identifier
    pub chain_id: &'a str,
    /// Fee section
    pub fee: &'a StdFee,
    /// Free-form memo
    pub memo: &'a str,
    /// Messages in submission order
    pub msgs: &'a [Msg],
    /// Account sequence
    pub sequence: String,
}

/// Amino-encoded public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey {
    /// Key type tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Base64 compressed key
    pub value: String,
}

/// One signature with the key that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    /// Signer's public key
    pub pub_key: PubKey,
    /// Base64 `r || s`
    pub signature: String,
}

/// Signed transaction as accepted by the legacy REST broadcast endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdTx {
    /// Messages
    pub msg: Vec<Msg>,
    /// Fee section
    pub fee: StdFee,
    /// Signatures, one per signer
    pub signatures: Vec<StdSignature>,
    /// Free-form memo
    pub memo: String,
}

/// Serialized, signed transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Canonical JSON bytes of the [`StdTx`]
    pub bytes: Vec<u8>,
    /// Sequence the transaction was signed with
    pub sequence: u64,
    /// Uppercase hex SHA-256 of `bytes`, used to identify the transaction in logs
    pub hash: String,
    /// Number of messages carried
    pub message_count: usize,
}

/// Builds and signs swap transactions for one network.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    chain_id: String,
    fees: Vec<Coin>,
    gas_limit: u64,
    memo: String,
}

impl TxBuilder {
    /// Creates a builder with the default gas limit and an empty memo.
    /// Zero-amount fee coins are dropped.
    pub fn new(chain_id: &str, fees: Vec<Coin>) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            fees: fees.into_iter().filter(|c| c.amount > 0).collect(),
            gas_limit: DEFAULT_GAS_LIMIT,
            memo: String::new(),
        }
    }

    /// Overrides the gas limit.
    #[must_use]
    pub const fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Overrides the memo.
    #[must_use]
    pub fn with_memo(mut self, memo: &str) -> Self {
        self.memo = memo.to_string();
        self
    }

    /// Network this builder signs for.
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn fee(&self) -> StdFee {
        StdFee {
            amount: self.fees.iter().map(AminoCoin::from).collect(),
            gas: self.gas_limit.to_string(),
        }
    }

    /// Canonical bytes the signer commits to.
    ///
    /// # Errors
    /// `Encoding` if serialization fails.
    pub fn sign_bytes(
        &self,
        account: &AccountState,
        fee: &StdFee,
        msgs: &[Msg],
    ) -> Result<Vec<u8>> {
        let doc = StdSignDoc {
            account_number: account.account_number.to_string(),
            chain_id: &self.chain_id,
            fee,
            memo: &self.memo,
            msgs,
            sequence: account.sequence.to_string(),
        };
        canonical_bytes(&doc)
    }

    /// Turns the intents into one signed transaction at the account's current sequence.
    ///
    /// # Errors
    /// * `InvalidOrder` if the list is empty or an intent fails validation
    /// * `Signing` if the signer fails
    /// * `Encoding` if serialization fails
    pub fn sign(
        &self,
        account: &AccountState,
        signer: &dyn TxSigner,
        intents: &[OrderIntent],
    ) -> Result<SignedTransaction> {
        if intents.is_empty() {
            return Err(Error::InvalidOrder("no orders to sign".to_string()));
        }

        let msgs = intents
            .iter()
            .map(|intent| {
                MsgSwapWithinBatch::from_intent(&account.address, intent).map(Msg::SwapWithinBatch)
            })
            .collect::<Result<Vec<_>>>()?;

        let public_key = signer.public_key();
        if public_key.is_empty() {
            return Err(Error::Signing("signer has no public key".to_string()));
        }

        let fee = self.fee();
        let digest: [u8; 32] = Sha256::digest(self.sign_bytes(account, &fee, &msgs)?).into();
        let signature = signer.sign_digest(&digest)?;

        let tx = StdTx {
            msg: msgs,
            fee,
            signatures: vec![StdSignature {
                pub_key: PubKey {
                    kind: SECP256K1_PUBKEY_TYPE.to_string(),
                    value: STANDARD.encode(public_key),
                },
                signature: STANDARD.encode(signature),
            }],
            memo: self.memo.clone(),
        };
        let bytes = canonical_bytes(&tx)?;
        let hash = hex::encode_upper(Sha256::digest(&bytes));

        Ok(SignedTransaction {
            bytes,
            sequence: account.sequence,
            hash,
            message_count: intents.len(),
        })
    }
}

/// Parses transaction bytes back into a [`StdTx`].
///
/// # Errors
/// `Encoding` if the bytes are not a valid transaction.
pub fn decode(bytes: &[u8]) -> Result<StdTx> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Serializes `value` with object keys sorted at every depth, no whitespace and
/// HTML-sensitive characters escaped.
///
/// # Errors
/// `Encoding` if serialization fails.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let value = canonicalize(serde_json::to_value(value)?);
    Ok(escape_html(&serde_json::to_string(&value)?).into_bytes())
}

/// Rewrites the characters the node's JSON encoder always escapes. None of them can
/// appear outside a string literal in JSON, so a plain character pass is enough.
fn escape_html(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

// Sorted explicitly: `serde_json::Map` keeps insertion order once any crate in the
// graph turns on its `preserve_order` feature.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::market::Side;
    use crate::test_helpers::{dec, MockSigner};

    fn intent(side: Side) -> OrderIntent {
        let (offer, demand) = match side {
            Side::Sell => ("uatom", "uluna"),
            Side::Buy => ("uluna", "uatom"),
        };
        OrderIntent {
            side,
            pool_id: 2,
            offer_denom: offer.to_string(),
            offer_amount: 1_000_000,
            demand_denom: demand.to_string(),
            limit_price: dec("0.2"),
            fee_rate: dec("0.003"),
        }
    }

    fn builder() -> TxBuilder {
        TxBuilder::new("gravity-test", vec![Coin::new("stake", 0)])
    }

    #[test]
    fn test_signed_tx_round_trip() {
        let signer = MockSigner::new("cosmos1mock");
        let account = AccountState::new("cosmos1mock", 9, 4);
        let original = intent(Side::Sell);

        let signed = builder().sign(&account, &signer, &[original.clone()]).unwrap();
        assert_eq!(signed.sequence, 9);
        assert_eq!(signed.message_count, 1);
        assert_eq!(signed.hash.len(), 64);

        let tx = decode(&signed.bytes).unwrap();
        assert_eq!(tx.signatures.len(), 1);
        assert_eq!(tx.fee.gas, "100000000");
        assert!(tx.fee.amount.is_empty());

        let Msg::SwapWithinBatch(msg) = &tx.msg[0];
        assert_eq!(msg.offer_coin.denom, original.offer_denom);
        assert_eq!(msg.offer_coin.amount, original.offer_amount.to_string());
        assert_eq!(msg.demand_coin_denom, original.demand_denom);
        assert_eq!(msg.order_price, "0.200000000000000000");
        assert_eq!(msg.swap_requester_address, "cosmos1mock");
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = MockSigner::new("cosmos1mock");
        let account = AccountState::new("cosmos1mock", 1, 1);
        let intents = [intent(Side::Buy), intent(Side::Sell)];
        let a = builder().sign(&account, &signer, &intents).unwrap();
        let b = builder().sign(&account, &signer, &intents).unwrap();
        assert_eq!(a, b);

        let mut next = account.clone();
        next.advance();
        let c = builder().sign(&next, &signer, &intents).unwrap();
        assert_ne!(a.hash, c.hash);
    }

    #[test]
    fn test_sign_doc_is_sorted_and_compact() {
        let account = AccountState::new("cosmos1mock", 3, 8);
        let builder = builder().with_memo("firestation");
        let msgs = vec![Msg::SwapWithinBatch(
            MsgSwapWithinBatch::from_intent("cosmos1mock", &intent(Side::Sell)).unwrap(),
        )];
        let bytes = builder.sign_bytes(&account, &builder.fee(), &msgs).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(!text.contains(' '));
        assert!(!text.contains('\n'));
        assert!(text.starts_with(r#"{"account_number":"8","chain_id":"gravity-test","fee":{"amount":[],"gas":"100000000"},"memo":"firestation","msgs":[{"type":"liquidity/MsgSwapWithinBatch","value":{"demand_coin_denom":"uluna""#));
        assert!(text.ends_with(r#""sequence":"3"}"#));
    }

    #[test]
    fn test_empty_intents_rejected() {
        let signer = MockSigner::new("cosmos1mock");
        let account = AccountState::new("cosmos1mock", 0, 0);
        assert!(matches!(
            builder().sign(&account, &signer, &[]),
            Err(Error::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_invalid_intent_rejected_before_signing() {
        let signer = MockSigner::new("cosmos1mock");
        let account = AccountState::new("cosmos1mock", 0, 0);
        let mut bad = intent(Side::Sell);
        bad.demand_denom = bad.offer_denom.clone();
        assert!(matches!(
            builder().sign(&account, &signer, &[bad]),
            Err(Error::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_memo_escapes_like_the_node() {
        let account = AccountState::new("cosmos1mock", 3, 8);
        let builder = builder().with_memo("<a&b>\u{2028}");
        let bytes = builder.sign_bytes(&account, &builder.fee(), &[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(r#""memo":"\u003ca\u0026b\u003e\u2028""#), "{text}");
        assert!(!text.contains('&'));

        let signer = MockSigner::new("cosmos1mock");
        let signed = builder.sign(&account, &signer, &[intent(Side::Buy)]).unwrap();
        assert!(!signed.bytes.contains(&b'<'));
        assert_eq!(decode(&signed.bytes).unwrap().memo, "<a&b>\u{2028}");
    }

    #[test]
    fn test_signer_failure_is_signing_error() {
        let account = AccountState::new("cosmos1mock", 0, 0);
        let failing = MockSigner::failing("cosmos1mock");
        assert!(matches!(
            builder().sign(&account, &failing, &[intent(Side::Sell)]),
            Err(Error::Signing(_))
        ));

        let keyless = MockSigner::without_key("cosmos1mock");
        let err = builder().sign(&account, &keyless, &[intent(Side::Sell)]).unwrap_err();
        assert!(matches!(err, Error::Signing(ref m) if m.contains("public key")));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(b"not json"), Err(Error::Encoding(_))));
    }
}

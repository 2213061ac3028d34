//! Amino-JSON wire types for the liquidity module's swap message.

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::market::decimal::{ceil_amount, format_ledger_dec};
use crate::market::{Coin, OrderIntent};

/// Swap type id of an instant swap against the pool's batch.
pub const INSTANT_SWAP_TYPE_ID: u32 = 1;

/// Coin as encoded in amino JSON (amounts are strings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AminoCoin {
    /// Denomination
    pub denom: String,
    /// Integer amount as a decimal string
    pub amount: String,
}

impl From<&Coin> for AminoCoin {
    fn from(coin: &Coin) -> Self {
        Self {
            denom: coin.denom.clone(),
            amount: coin.amount.to_string(),
        }
    }
}

/// `MsgSwapWithinBatch` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSwapWithinBatch {
    /// Address of the account placing the order
    pub swap_requester_address: String,
    /// Target pool id, string-encoded
    pub pool_id: String,
    /// Swap type; always [`INSTANT_SWAP_TYPE_ID`]
    pub swap_type_id: u32,
    /// Coin offered to the pool
    pub offer_coin: AminoCoin,
    /// Denom wanted in return
    pub demand_coin_denom: String,
    /// Half of the swap fee, reserved from the offer coin up front
    pub offer_coin_fee: AminoCoin,
    /// Limit price, 18 fractional digits
    pub order_price: String,
}

/// Messages this crate knows how to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Msg {
    /// Liquidity pool swap order
    #[serde(rename = "liquidity/MsgSwapWithinBatch")]
    SwapWithinBatch(MsgSwapWithinBatch),
}

/// Denom syntax accepted by the ledger: a letter followed by 2..=127 of
/// `[a-zA-Z0-9/:._-]`.
#[must_use]
pub fn is_valid_denom(denom: &str) -> bool {
    let mut chars = denom.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (3..=128).contains(&denom.len())
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'))
}

/// Checks the fields the ledger would reject in `ValidateBasic`.
///
/// # Errors
/// `InvalidOrder` describing the first problem found.
pub fn validate(requester: &str, intent: &OrderIntent) -> Result<()> {
    if requester.trim().is_empty() {
        return Err(Error::InvalidOrder("empty requester address".to_string()));
    }
    for denom in [&intent.offer_denom, &intent.demand_denom] {
        if !is_valid_denom(denom) {
            return Err(Error::InvalidOrder(format!("malformed denom {denom:?}")));
        }
    }
    if intent.offer_denom == intent.demand_denom {
        return Err(Error::InvalidOrder(format!(
            "offer and demand denom are both {}",
            intent.offer_denom
        )));
    }
    if intent.offer_amount == 0 {
        return Err(Error::InvalidOrder("offer amount is zero".to_string()));
    }
    if intent.limit_price <= BigDecimal::zero() {
        return Err(Error::InvalidOrder(format!(
            "order price {} is not positive",
            intent.limit_price
        )));
    }
    Ok(())
}

impl MsgSwapWithinBatch {
    /// Builds the message for `intent` placed by `requester`.
    ///
    /// # Errors
    /// `InvalidOrder` if the intent fails validation.
    pub fn from_intent(requester: &str, intent: &OrderIntent) -> Result<Self> {
        validate(requester, intent)?;

        let half_fee_rate = &intent.fee_rate / BigDecimal::from(2);
        let fee_amount = ceil_amount(&(BigDecimal::from(intent.offer_amount) * half_fee_rate))?;

        Ok(Self {
            swap_requester_address: requester.to_string(),
            pool_id: intent.pool_id.to_string(),
            swap_type_id: INSTANT_SWAP_TYPE_ID,
            offer_coin: AminoCoin::from(&intent.offer_coin()),
            demand_coin_denom: intent.demand_denom.clone(),
            offer_coin_fee: AminoCoin::from(&Coin::new(&intent.offer_denom, fee_amount)),
            order_price: format_ledger_dec(&intent.limit_price),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::market::Side;
    use crate::test_helpers::dec;

    fn intent() -> OrderIntent {
        OrderIntent {
            side: Side::Buy,
            pool_id: 1,
            offer_denom: "uluna".to_string(),
            offer_amount: 1_000,
            demand_denom: "uatom".to_string(),
            limit_price: dec("0.1"),
            fee_rate: dec("0.003"),
        }
    }

    #[test]
    fn test_denom_syntax() {
        for (denom, ok) in &[
            ("uatom", true),
            ("ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2", true),
            ("ua", false),
            ("", false),
            ("1atom", false),
            ("u atom", false),
        ] {
            assert_eq!(is_valid_denom(denom), *ok, "{denom}");
        }
    }

    #[test]
    fn test_offer_coin_fee_is_half_fee_rounded_up() {
        let msg = MsgSwapWithinBatch::from_intent("cosmos1requester", &intent()).unwrap();
        // 1000 * 0.0015 = 1.5 -> 2
        assert_eq!(msg.offer_coin_fee.amount, "2");
        assert_eq!(msg.offer_coin_fee.denom, "uluna");
        assert_eq!(msg.order_price, "0.100000000000000000");
        assert_eq!(msg.pool_id, "1");
        assert_eq!(msg.swap_type_id, 1);
    }

    #[test]
    fn test_rejects_bad_orders() {
        assert!(MsgSwapWithinBatch::from_intent("", &intent()).is_err());

        let mut bad = intent();
        bad.demand_denom = "uluna".to_string();
        assert!(matches!(
            MsgSwapWithinBatch::from_intent("cosmos1requester", &bad),
            Err(Error::InvalidOrder(_))
        ));

        let mut bad = intent();
        bad.offer_denom = "x".to_string();
        assert!(MsgSwapWithinBatch::from_intent("cosmos1requester", &bad).is_err());

        let mut bad = intent();
        bad.offer_amount = 0;
        assert!(MsgSwapWithinBatch::from_intent("cosmos1requester", &bad).is_err());
    }

    #[test]
    fn test_amino_envelope() {
        let msg = Msg::SwapWithinBatch(
            MsgSwapWithinBatch::from_intent("cosmos1requester", &intent()).unwrap(),
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "liquidity/MsgSwapWithinBatch");
        assert_eq!(value["value"]["offer_coin"]["amount"], "1000");
    }
}

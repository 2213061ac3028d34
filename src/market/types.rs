use std::fmt::{self, Display};

use bigdecimal::BigDecimal;

/// Type alias for an on-chain coin denomination such as `uatom`.
pub type Denom = String;

/// Reserve balances of a two-asset pool, oriented as (X, Y).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservePair {
    /// Denom of the X side
    pub denom_x: Denom,
    /// Denom of the Y side
    pub denom_y: Denom,
    /// Balance of the X side, in base units
    pub reserve_x: BigDecimal,
    /// Balance of the Y side, in base units
    pub reserve_y: BigDecimal,
}

impl ReservePair {
    /// Creates a reserve pair from integral base-unit balances.
    pub fn new(denom_x: &str, denom_y: &str, reserve_x: u128, reserve_y: u128) -> Self {
        Self {
            denom_x: denom_x.to_string(),
            denom_y: denom_y.to_string(),
            reserve_x: BigDecimal::from(reserve_x),
            reserve_y: BigDecimal::from(reserve_y),
        }
    }

    /// The same reserves seen from the other side of the pool.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            denom_x: self.denom_y.clone(),
            denom_y: self.denom_x.clone(),
            reserve_x: self.reserve_y.clone(),
            reserve_y: self.reserve_x.clone(),
        }
    }
}

impl Display for ReservePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} / {}{}",
            self.reserve_x, self.denom_x, self.reserve_y, self.denom_y
        )
    }
}

/// External USD price for one denom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePrice {
    /// Denom the price applies to
    pub denom: Denom,
    /// Price of one whole unit in USD
    pub usd_price: BigDecimal,
}

impl ReferencePrice {
    /// Creates a reference price.
    pub fn new(denom: &str, usd_price: BigDecimal) -> Self {
        Self {
            denom: denom.to_string(),
            usd_price,
        }
    }
}

/// An integral amount of one denom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coin {
    /// Denomination
    pub denom: Denom,
    /// Amount in base units
    pub amount: u128,
}

impl Coin {
    /// Creates a coin.
    pub fn new(denom: &str, amount: u128) -> Self {
        Self {
            denom: denom.to_string(),
            amount,
        }
    }
}

impl Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Liquidity pool metadata as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    /// Pool id
    pub id: u64,
    /// Pool type id (1 is the constant-product pool)
    pub type_id: u32,
    /// Reserve denoms, X first
    pub reserve_coin_denoms: [Denom; 2],
    /// Bech32 address of the account holding the reserves
    pub reserve_account_address: String,
}

impl Pool {
    /// Returns true when the pool trades exactly this pair, in either order.
    #[must_use]
    pub fn trades(&self, denom_a: &str, denom_b: &str) -> bool {
        let [x, y] = &self.reserve_coin_denoms;
        (x == denom_a && y == denom_b) || (x == denom_b && y == denom_a)
    }
}

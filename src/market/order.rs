use std::fmt::{self, Display};

use bigdecimal::BigDecimal;

use super::types::{Coin, Denom};

/// Which side of the pool an order trades.
///
/// `Sell` offers the X asset for Y, `Buy` offers the Y asset for X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Side {
    /// Offer Y, demand X
    #[display("buy")]
    Buy,
    /// Offer X, demand Y
    #[display("sell")]
    Sell,
}

/// A planned, not yet signed swap order against one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderIntent {
    /// Trade direction
    pub side: Side,
    /// Pool the order is sent to
    pub pool_id: u64,
    /// Denom given to the pool
    pub offer_denom: Denom,
    /// Amount given, in base units
    pub offer_amount: u128,
    /// Denom wanted in return
    pub demand_denom: Denom,
    /// Limit price in the pool's X/Y orientation
    pub limit_price: BigDecimal,
    /// Swap fee rate charged by the pool
    pub fee_rate: BigDecimal,
}

impl OrderIntent {
    /// The coin offered to the pool.
    #[must_use]
    pub fn offer_coin(&self) -> Coin {
        Coin::new(&self.offer_denom, self.offer_amount)
    }
}

impl Display for OrderIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} for {} in pool {} @ {} (fee {})",
            self.side,
            self.offer_coin(),
            self.demand_denom,
            self.pool_id,
            self.limit_price,
            self.fee_rate
        )
    }
}

//! Turns an evaluation into swap orders.
//!
//! Two policies live here: the price-stabilizing planner, which trades against a
//! divergence, and the volume planner, which emits symmetric buy/sell pairs around
//! the current pool rate.

use std::cmp::min;

use bigdecimal::{BigDecimal, One, Signed};

use super::decimal::{dec_with_prec, to_amount};
use super::divergence::{evaluate, Evaluation};
use super::order::{OrderIntent, Side};
use super::types::{ReferencePrice, ReservePair};
use crate::error::{Error, Result};

/// Limits applied by the stabilizing planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilizeCaps {
    /// Minimum `|divergence|` that triggers an order (inclusive)
    pub upper_threshold: BigDecimal,
    /// Largest fraction of the offered reserve a single order may take
    pub max_order_fraction: BigDecimal,
    /// Swap fee rate attached to each order
    pub fee_rate: BigDecimal,
}

impl Default for StabilizeCaps {
    fn default() -> Self {
        Self {
            upper_threshold: dec_with_prec(2, 1),
            max_order_fraction: dec_with_prec(1, 2),
            fee_rate: dec_with_prec(3, 3),
        }
    }
}

/// Outcome of the stabilizing planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Submit this order
    Order(OrderIntent),
    /// The pool is within tolerance; do nothing
    NoAction,
}

/// Fraction of the offered reserve to trade: `min(|divergence| / 2, max_fraction)`.
///
/// Halving aims to close about half of the observed gap per order.
#[must_use]
pub fn order_fraction(divergence: &BigDecimal, max_fraction: &BigDecimal) -> BigDecimal {
    let half_gap = divergence.abs() / BigDecimal::from(2);
    min(half_gap, max_fraction.clone())
}

/// Decides whether and how to trade against the observed divergence.
///
/// A positive divergence means the reference rate is above the pool rate: X is cheap
/// in the pool relative to the market view, so X is sold into the pool. A negative
/// divergence sells Y. The limit price is always the reference rate.
///
/// # Errors
/// `InvalidOrder` if the computed size cannot be represented as an amount.
pub fn plan(
    evaluation: &Evaluation,
    reserves: &ReservePair,
    caps: &StabilizeCaps,
    pool_id: u64,
) -> Result<Plan> {
    let divergence = &evaluation.divergence;
    let negative_threshold = -caps.upper_threshold.clone();

    let (side, offer_denom, demand_denom, reserve) = if *divergence >= caps.upper_threshold {
        (Side::Sell, &reserves.denom_x, &reserves.denom_y, &reserves.reserve_x)
    } else if *divergence <= negative_threshold {
        (Side::Buy, &reserves.denom_y, &reserves.denom_x, &reserves.reserve_y)
    } else {
        return Ok(Plan::NoAction);
    };

    let size = reserve * order_fraction(divergence, &caps.max_order_fraction);
    let offer_amount = to_amount(&size)?;
    if offer_amount == 0 {
        log::debug!("planner: order size {size} rounds to zero, skipping");
        return Ok(Plan::NoAction);
    }

    Ok(Plan::Order(OrderIntent {
        side,
        pool_id,
        offer_denom: offer_denom.clone(),
        offer_amount,
        demand_denom: demand_denom.clone(),
        limit_price: evaluation.reference_rate.clone(),
        fee_rate: caps.fee_rate.clone(),
    }))
}

/// Parameters of the volume planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeParams {
    /// USD notional of every single order
    pub notional_usd: BigDecimal,
    /// Relative price offset from the pool rate (0.05 = 5%)
    pub skew: BigDecimal,
    /// Base units per whole coin, as a power of ten
    pub base_unit_exponent: u32,
    /// Buy/sell pairs emitted per pool per tick
    pub orders_per_side: usize,
    /// Swap fee rate attached to each order
    pub fee_rate: BigDecimal,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            notional_usd: BigDecimal::from(100),
            skew: dec_with_prec(5, 2),
            base_unit_exponent: 6,
            orders_per_side: 2,
            fee_rate: dec_with_prec(3, 3),
        }
    }
}

impl VolumeParams {
    /// Number of messages planned per pool per tick.
    #[must_use]
    pub const fn messages_per_pool(&self) -> usize {
        self.orders_per_side * 2
    }

    /// USD notional carried by one pool's transaction.
    #[must_use]
    pub fn notional_per_pool(&self) -> BigDecimal {
        &self.notional_usd * BigDecimal::from(self.messages_per_pool() as u64)
    }
}

/// Converts a USD notional into integral base units of a coin priced at `usd_price`.
///
/// # Errors
/// * `MissingReferencePrice` if the price is not positive
/// * `InvalidOrder` if the amount does not fit
pub fn base_units(
    notional_usd: &BigDecimal,
    price: &ReferencePrice,
    exponent: u32,
) -> Result<u128> {
    if !price.usd_price.is_positive() {
        return Err(Error::MissingReferencePrice(price.denom.clone()));
    }
    let scale = BigDecimal::new(1.into(), -i64::from(exponent));
    to_amount(&(notional_usd / &price.usd_price * scale))
}

/// USD value of `amount` base units of a coin priced at `price`.
#[must_use]
pub fn reserve_usd(amount: &BigDecimal, price: &ReferencePrice, exponent: u32) -> BigDecimal {
    let scale = BigDecimal::new(1.into(), -i64::from(exponent));
    amount * &price.usd_price / scale
}

/// Plans symmetric buy/sell pairs around the pool's current rate.
///
/// Buys offer Y at `pool_rate * (1 + skew)`, sells offer X at `pool_rate * (1 - skew)`.
/// Divergence plays no role here.
///
/// # Errors
/// * `InvalidReserves` / `MissingReferencePrice` from the underlying evaluation
/// * `InvalidOrder` if an order rounds to nothing
pub fn plan_volume(
    pool_id: u64,
    reserves: &ReservePair,
    prices: (&ReferencePrice, &ReferencePrice),
    params: &VolumeParams,
) -> Result<Vec<OrderIntent>> {
    let evaluation = evaluate(reserves, prices)?;
    let (price_x, price_y) = prices;

    let buy_price = &evaluation.pool_rate * (BigDecimal::one() + &params.skew);
    let sell_price = &evaluation.pool_rate * (BigDecimal::one() - &params.skew);
    let buy_amount = base_units(&params.notional_usd, price_y, params.base_unit_exponent)?;
    let sell_amount = base_units(&params.notional_usd, price_x, params.base_unit_exponent)?;
    if buy_amount == 0 || sell_amount == 0 {
        return Err(Error::InvalidOrder(format!(
            "notional {} USD is below one base unit in pool {pool_id}",
            params.notional_usd
        )));
    }

    let buy = OrderIntent {
        side: Side::Buy,
        pool_id,
        offer_denom: reserves.denom_y.clone(),
        offer_amount: buy_amount,
        demand_denom: reserves.denom_x.clone(),
        limit_price: buy_price,
        fee_rate: params.fee_rate.clone(),
    };
    let sell = OrderIntent {
        side: Side::Sell,
        pool_id,
        offer_denom: reserves.denom_x.clone(),
        offer_amount: sell_amount,
        demand_denom: reserves.denom_y.clone(),
        limit_price: sell_price,
        fee_rate: params.fee_rate.clone(),
    };

    Ok((0..params.orders_per_side)
        .flat_map(|_| [buy.clone(), sell.clone()])
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_helpers::{dec, price, reserves};

    fn caps(threshold: &str, max_fraction: &str) -> StabilizeCaps {
        StabilizeCaps {
            upper_threshold: dec(threshold),
            max_order_fraction: dec(max_fraction),
            fee_rate: dec("0.003"),
        }
    }

    fn evaluation(divergence: &str) -> Evaluation {
        Evaluation {
            pool_rate: dec("1"),
            reference_rate: dec("1") + dec(divergence),
            divergence: dec(divergence),
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let pair = reserves(100, 100);
        let eval = evaluate(&pair, (&price("uatom", "10"), &price("uother", "11"))).unwrap();
        assert_eq!(eval.divergence, dec("0.1"));

        let plan_at = plan(&eval, &pair, &caps("0.1", "0.5"), 1).unwrap();
        assert!(matches!(plan_at, Plan::Order(_)));

        let below = evaluation("0.0999999");
        assert_eq!(
            plan(&below, &reserves(1_000_000, 1_000_000), &caps("0.1", "0.5"), 1).unwrap(),
            Plan::NoAction
        );
        let negative_below = evaluation("-0.0999999");
        assert_eq!(
            plan(&negative_below, &reserves(1_000_000, 1_000_000), &caps("0.1", "0.5"), 1).unwrap(),
            Plan::NoAction
        );

        let negative_at = evaluation("-0.1");
        let Plan::Order(order) =
            plan(&negative_at, &reserves(1_000_000, 1_000_000), &caps("0.1", "0.5"), 1).unwrap()
        else {
            panic!("expected an order at -threshold");
        };
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.offer_denom, "uother");
        assert_eq!(order.offer_amount, 50_000);
    }

    #[test]
    fn test_reserve_usd() {
        // 2.5 ATOM at $10
        assert_eq!(reserve_usd(&dec("2500000"), &price("uatom", "10"), 6), dec("25"));
        assert_eq!(reserve_usd(&dec("0"), &price("uatom", "10"), 6), dec("0"));
    }

    #[test]
    fn test_positive_divergence_sells_x() {
        let pair = reserves(1_000_000, 2_000_000);
        let Plan::Order(order) = plan(&evaluation("0.3"), &pair, &caps("0.2", "0.01"), 7).unwrap()
        else {
            unreachable!("expected an order");
        };
        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.pool_id, 7);
        assert_eq!(order.offer_denom, "uatom");
        assert_eq!(order.demand_denom, "uother");
        // 1_000_000 * min(0.15, 0.01)
        assert_eq!(order.offer_amount, 10_000);
        assert_eq!(order.limit_price, dec("1.3"));
        assert_eq!(order.fee_rate, dec("0.003"));
    }

    #[test]
    fn test_atom_other_scenario() {
        let pair = reserves(100, 500);
        let eval = evaluate(&pair, (&price("uatom", "10"), &price("uother", "1"))).unwrap();

        for (max_fraction, expected) in &[("0.01", 5), ("0.25", 125), ("0.5", 125), ("0.1", 50)] {
            let Plan::Order(order) = plan(&eval, &pair, &caps("0.1", max_fraction), 1).unwrap()
            else {
                unreachable!("expected an order");
            };
            assert_eq!(order.side, Side::Buy);
            assert_eq!(order.offer_denom, "uother");
            assert_eq!(order.demand_denom, "uatom");
            assert_eq!(order.offer_amount, *expected, "max fraction {max_fraction}");
            assert_eq!(order.limit_price, dec("0.1"));
        }
    }

    #[test]
    fn test_size_monotone_then_capped() {
        let pair = reserves(10_000_000, 10_000_000);
        let caps = caps("0.1", "0.2");
        let mut previous = 0;
        let mut sizes = Vec::new();
        for divergence in ["0.1", "0.15", "0.2", "0.3", "0.4", "0.5", "0.8", "2", "10"] {
            let Plan::Order(order) = plan(&evaluation(divergence), &pair, &caps, 1).unwrap() else {
                unreachable!("expected an order");
            };
            assert!(order.offer_amount >= previous, "divergence {divergence}");
            previous = order.offer_amount;
            sizes.push(order.offer_amount);
        }
        // divergence >= 2 * max_fraction stays at the cap
        assert_eq!(&sizes[4..], &[2_000_000; 5]);
        assert_eq!(sizes[0], 500_000);
    }

    #[test]
    fn test_zero_size_is_no_action() {
        let pair = reserves(10, 10);
        assert_eq!(
            plan(&evaluation("0.5"), &pair, &caps("0.1", "0.01"), 1).unwrap(),
            Plan::NoAction
        );
    }

    #[test]
    fn test_volume_pairs() {
        let pair = reserves(100_000_000, 500_000_000);
        let params = VolumeParams::default();
        let intents = plan_volume(
            3,
            &pair,
            (&price("uatom", "10"), &price("uother", "1")),
            &params,
        )
        .unwrap();

        assert_eq!(intents.len(), 4);
        let buys: Vec<_> = intents.iter().filter(|i| i.side == Side::Buy).collect();
        let sells: Vec<_> = intents.iter().filter(|i| i.side == Side::Sell).collect();
        assert_eq!(buys.len(), 2);
        assert_eq!(sells.len(), 2);

        // pool rate 0.2
        assert_eq!(buys[0].limit_price, dec("0.21"));
        assert_eq!(sells[0].limit_price, dec("0.19"));
        // 100 USD of uother at $1, 100 USD of uatom at $10
        assert_eq!(buys[0].offer_amount, 100_000_000);
        assert_eq!(buys[0].offer_denom, "uother");
        assert_eq!(sells[0].offer_amount, 10_000_000);
        assert_eq!(sells[0].offer_denom, "uatom");
        assert!(intents.iter().all(|i| i.pool_id == 3));
    }

    #[test]
    fn test_volume_notional_below_unit() {
        let params = VolumeParams {
            notional_usd: dec("0.0000001"),
            ..VolumeParams::default()
        };
        let err = plan_volume(
            1,
            &reserves(100, 500),
            (&price("uatom", "10"), &price("uother", "1")),
            &params,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidOrder(_)));
    }
}

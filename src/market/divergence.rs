//! Pool rate versus reference rate.

use bigdecimal::{BigDecimal, One, Signed, Zero};

use super::types::{ReferencePrice, ReservePair};
use crate::error::{Error, Result};

/// Result of comparing a pool against its reference prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// `reserve_x / reserve_y`
    pub pool_rate: BigDecimal,
    /// `usd_price_y / usd_price_x`
    pub reference_rate: BigDecimal,
    /// `reference_rate / pool_rate - 1`
    pub divergence: BigDecimal,
}

impl Evaluation {
    /// True when `|divergence| <= tolerance`.
    #[must_use]
    pub fn is_converged(&self, tolerance: &BigDecimal) -> bool {
        self.divergence.abs() <= *tolerance
    }
}

/// Implied exchange rate of the pool.
///
/// # Errors
/// `InvalidReserves` when either reserve is negative or zero.
pub fn pool_rate(reserves: &ReservePair) -> Result<BigDecimal> {
    if reserves.reserve_x.is_negative() || reserves.reserve_y.is_negative() {
        return Err(Error::InvalidReserves(format!(
            "negative reserve in {reserves}"
        )));
    }
    if reserves.reserve_y.is_zero() {
        return Err(Error::InvalidReserves(format!(
            "{} reserve is zero",
            reserves.denom_y
        )));
    }
    if reserves.reserve_x.is_zero() {
        return Err(Error::InvalidReserves(format!(
            "{} reserve is zero",
            reserves.denom_x
        )));
    }
    Ok(&reserves.reserve_x / &reserves.reserve_y)
}

/// Fair exchange rate derived from USD prices, oriented like [`pool_rate`].
///
/// # Errors
/// `MissingReferencePrice` when a price is not strictly positive.
pub fn reference_rate(price_x: &ReferencePrice, price_y: &ReferencePrice) -> Result<BigDecimal> {
    for price in [price_x, price_y] {
        if !price.usd_price.is_positive() {
            return Err(Error::MissingReferencePrice(format!(
                "{} (price {})",
                price.denom, price.usd_price
            )));
        }
    }
    Ok(&price_y.usd_price / &price_x.usd_price)
}

/// Computes pool rate, reference rate and their signed relative divergence.
///
/// The prices must be given in the pool's (X, Y) orientation.
///
/// # Errors
/// * `InvalidReserves` if the reserves cannot produce a rate
/// * `MissingReferencePrice` if a price is unusable or belongs to another denom
pub fn evaluate(
    reserves: &ReservePair,
    prices: (&ReferencePrice, &ReferencePrice),
) -> Result<Evaluation> {
    let (price_x, price_y) = prices;
    if price_x.denom != reserves.denom_x {
        return Err(Error::MissingReferencePrice(format!(
            "{} (got {})",
            reserves.denom_x, price_x.denom
        )));
    }
    if price_y.denom != reserves.denom_y {
        return Err(Error::MissingReferencePrice(format!(
            "{} (got {})",
            reserves.denom_y, price_y.denom
        )));
    }

    let pool_rate = pool_rate(reserves)?;
    let reference_rate = reference_rate(price_x, price_y)?;
    let divergence = &reference_rate / &pool_rate - BigDecimal::one();

    Ok(Evaluation {
        pool_rate,
        reference_rate,
        divergence,
    })
}

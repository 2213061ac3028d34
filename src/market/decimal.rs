//! Fixed-point helpers matching the ledger's decimal conventions.

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};

use crate::error::{Error, Result};

/// Decimal places of the ledger's `Dec` type.
pub const LEDGER_DEC_PRECISION: i64 = 18;

/// `value * 10^-prec`, mirroring the ledger SDK's `NewDecWithPrec`.
#[must_use]
pub fn dec_with_prec(value: i64, prec: i64) -> BigDecimal {
    BigDecimal::new(value.into(), prec)
}

/// Rounds to the nearest integer, ties to even (the SDK's `RoundInt`).
#[must_use]
pub fn round_int(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(0, RoundingMode::HalfEven)
}

/// Rounds to an integral base-unit amount.
///
/// # Errors
/// `InvalidOrder` if the value is negative or does not fit in `u128`.
pub fn to_amount(value: &BigDecimal) -> Result<u128> {
    round_int(value)
        .to_u128()
        .ok_or_else(|| Error::InvalidOrder(format!("amount {value} is not a valid integer amount")))
}

/// Smallest integer not below `value`.
///
/// # Errors
/// `InvalidOrder` if the value is negative or does not fit in `u128`.
pub fn ceil_amount(value: &BigDecimal) -> Result<u128> {
    value
        .with_scale_round(0, RoundingMode::Ceiling)
        .to_u128()
        .ok_or_else(|| Error::InvalidOrder(format!("amount {value} is not a valid integer amount")))
}

/// Renders `value` with exactly `precision` fractional digits and no exponent.
///
/// The ledger's amino JSON encodes decimals this way (`"0.100000000000000000"`).
#[must_use]
pub fn format_fixed(value: &BigDecimal, precision: i64) -> String {
    let scaled = value.with_scale_round(precision, RoundingMode::HalfEven);
    let (digits, _) = scaled.as_bigint_and_exponent();
    let digits = digits.to_string();
    let (sign, magnitude) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits.as_str()),
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let precision = precision.max(0) as usize;
    if precision == 0 {
        return format!("{sign}{magnitude}");
    }

    let padded = format!("{magnitude:0>width$}", width = precision + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - precision);
    format!("{sign}{int_part}.{frac_part}")
}

/// Renders `value` the way the ledger's `Dec` type does.
#[must_use]
pub fn format_ledger_dec(value: &BigDecimal) -> String {
    format_fixed(value, LEDGER_DEC_PRECISION)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round_int_ties_to_even() {
        for (input, expected) in &[
            ("2.5", 2),
            ("3.5", 4),
            ("2.4999", 2),
            ("2.51", 3),
            ("0", 0),
        ] {
            let value = BigDecimal::from_str(input).unwrap();
            assert_eq!(to_amount(&value).unwrap(), *expected, "{input}");
        }
    }

    #[test]
    fn test_negative_amount_rejected() {
        let value = BigDecimal::from_str("-3").unwrap();
        assert!(to_amount(&value).is_err());
    }

    #[test]
    fn test_ceil_amount() {
        assert_eq!(ceil_amount(&BigDecimal::from_str("7.0001").unwrap()).unwrap(), 8);
        assert_eq!(ceil_amount(&BigDecimal::from_str("7").unwrap()).unwrap(), 7);
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(
            format_ledger_dec(&dec_with_prec(1, 1)),
            "0.100000000000000000"
        );
        assert_eq!(
            format_ledger_dec(&BigDecimal::from(12)),
            "12.000000000000000000"
        );
        assert_eq!(format_fixed(&BigDecimal::from_str("-0.05").unwrap(), 3), "-0.050");
        assert_eq!(format_fixed(&BigDecimal::from_str("1.25").unwrap(), 0), "1");
    }
}

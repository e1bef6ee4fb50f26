//! Decimal helpers for statutory amounts.
//! All arithmetic stays in `BigDecimal`; nothing here goes through `f64`.

use bigdecimal::BigDecimal;

/// Number of decimal places challan amounts are rounded to.
pub const CURRENCY_SCALE: i64 = 2;

pub fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

/// Multiplies `amount` by `per_mille / 1000`.
pub fn per_mille(amount: &BigDecimal, per_mille: i64) -> BigDecimal {
    let (digits, scale) = (amount * BigDecimal::from(per_mille)).as_bigint_and_exponent();
    BigDecimal::new(digits, scale + 3)
}

/// Half-up rounding (ties away from zero) to two decimal places.
pub fn round_currency(amount: &BigDecimal) -> BigDecimal {
    let half_cent = per_mille(&BigDecimal::from(1), 5);
    if *amount < zero() {
        (amount - half_cent).with_scale(CURRENCY_SCALE)
    } else {
        (amount + half_cent).with_scale(CURRENCY_SCALE)
    }
}

pub fn max(left: BigDecimal, right: BigDecimal) -> BigDecimal {
    if left >= right {
        left
    } else {
        right
    }
}

pub fn is_negative(amount: &BigDecimal) -> bool {
    *amount < zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).expect("valid decimal")
    }

    #[test]
    fn per_mille_is_exact() {
        assert_eq!(per_mille(&dec("50000"), 5), dec("250"));
        assert_eq!(per_mille(&dec("123.45"), 5), dec("0.61725"));
        assert_eq!(per_mille(&zero(), 5), zero());
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_currency(&dec("0.61725")), dec("0.62"));
        assert_eq!(round_currency(&dec("1.005")), dec("1.01"));
        assert_eq!(round_currency(&dec("1.0049")), dec("1.00"));
        assert_eq!(round_currency(&dec("7")), dec("7.00"));
    }

    #[test]
    fn rounds_negative_ties_away_from_zero() {
        assert_eq!(round_currency(&dec("-1.005")), dec("-1.01"));
        assert_eq!(round_currency(&dec("-1.004")), dec("-1.00"));
    }

    #[test]
    fn max_picks_larger() {
        assert_eq!(max(dec("250"), dec("500")), dec("500"));
        assert_eq!(max(dec("750.5"), dec("500")), dec("750.5"));
    }
}

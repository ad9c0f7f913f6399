//! Amount helpers with decimal precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! All budget math runs on `rust_decimal::Decimal`; comparisons absorb
//! upstream rounding with a tolerance of half a currency minor unit.

use rust_decimal::Decimal;

/// Half a minor currency unit (0.005).
pub const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Number of decimal places amounts are rounded to.
pub const AMOUNT_SCALE: u32 = 2;

/// Stateless helpers for tolerant amount arithmetic.
pub struct Amount;

impl Amount {
    /// Returns true if `available` covers `required` within tolerance.
    #[must_use]
    pub fn covers(available: Decimal, required: Decimal) -> bool {
        available + AMOUNT_TOLERANCE >= required
    }

    /// Returns true if the amount is zero within tolerance.
    #[must_use]
    pub fn is_negligible(amount: Decimal) -> bool {
        amount.abs() < AMOUNT_TOLERANCE
    }

    /// Returns true if two amounts are equal within tolerance.
    #[must_use]
    pub fn approx_eq(left: Decimal, right: Decimal) -> bool {
        Self::is_negligible(left - right)
    }

    /// Returns true if the amount lies in `[min, max]` within tolerance.
    #[must_use]
    pub fn within(amount: Decimal, min: Decimal, max: Decimal) -> bool {
        amount + AMOUNT_TOLERANCE >= min && amount - AMOUNT_TOLERANCE <= max
    }

    /// Rounds to the currency scale using Banker's Rounding.
    #[must_use]
    pub fn round(amount: Decimal) -> Decimal {
        amount.round_dp(AMOUNT_SCALE)
    }

    /// Splits `total` across `weights` proportionally.
    ///
    /// Each share is rounded to the currency scale; the rounding remainder is
    /// pushed onto the last share so the shares always sum to `total`.
    /// Returns an empty vector when the weights sum to zero.
    #[must_use]
    pub fn pro_rata(total: Decimal, weights: &[Decimal]) -> Vec<Decimal> {
        let weight_sum: Decimal = weights.iter().copied().sum();
        if weights.is_empty() || weight_sum.is_zero() {
            return Vec::new();
        }

        let mut shares: Vec<Decimal> = weights
            .iter()
            .map(|w| Self::round(total * *w / weight_sum))
            .collect();

        let allocated: Decimal = shares.iter().copied().sum();
        if let Some(last) = shares.last_mut() {
            *last += total - allocated;
        }
        shares
    }
}

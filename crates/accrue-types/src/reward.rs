//! Multi-denomination reward amounts.
//!
//! A [`RewardVector`] maps denominations to non-negative decimal amounts.
//! Denominations absent from a vector are treated as zero, and zero entries
//! are never stored, so two vectors holding the same value always have the
//! same representation and the same encoding.
//!
//! Every arithmetic operation is checked: overflow, division by zero and
//! negative results come back as [`TypesError`] values.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::denom::validate_denom;
use crate::{Result, TypesError, DEC_PRECISION};

/// Ordered collection of non-negative amounts keyed by denomination.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Decimal>",
    into = "BTreeMap<String, Decimal>"
)]
pub struct RewardVector {
    amounts: BTreeMap<String, Decimal>,
}

impl RewardVector {
    /// Create an empty (all-zero) vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vector from `(denom, amount)` pairs.
    ///
    /// Repeated denominations are summed.
    ///
    /// # Errors
    ///
    /// - [`TypesError::InvalidDenom`] on a malformed denomination
    /// - [`TypesError::NegativeAmount`] on a negative amount
    /// - [`TypesError::Overflow`] if summing repeated entries overflows
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        let mut vector = Self::new();
        for (denom, amount) in pairs {
            let denom = denom.into();
            validate_denom(&denom)?;
            if amount < Decimal::ZERO {
                return Err(TypesError::NegativeAmount { denom, amount });
            }
            let sum = vector
                .amount_of(&denom)
                .checked_add(amount)
                .ok_or(TypesError::Overflow)?;
            vector.put(denom, sum);
        }
        Ok(vector)
    }

    /// Build a vector holding a single denomination.
    ///
    /// # Errors
    ///
    /// Same as [`RewardVector::from_pairs`].
    pub fn single(denom: impl Into<String>, amount: Decimal) -> Result<Self> {
        Self::from_pairs([(denom.into(), amount)])
    }

    /// Whether every component is zero.
    pub fn is_zero(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Number of non-zero denominations.
    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    /// Whether the vector has no non-zero denominations.
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    /// Amount held for `denom`, zero if absent.
    pub fn amount_of(&self, denom: &str) -> Decimal {
        self.amounts.get(denom).copied().unwrap_or(Decimal::ZERO)
    }

    /// Iterate non-zero components in denomination order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.amounts.iter().map(|(d, a)| (d.as_str(), *a))
    }

    /// Element-wise addition.
    ///
    /// # Errors
    ///
    /// - [`TypesError::Overflow`] if any component overflows
    pub fn add(&self, other: &RewardVector) -> Result<Self> {
        let mut out = self.clone();
        for (denom, amount) in other.iter() {
            let sum = out
                .amount_of(denom)
                .checked_add(amount)
                .ok_or(TypesError::Overflow)?;
            out.put(denom.to_string(), sum);
        }
        Ok(out)
    }

    /// Element-wise subtraction that refuses to go negative.
    ///
    /// # Errors
    ///
    /// - [`TypesError::NegativeComponent`] naming the first denomination
    ///   (in order) whose result would be negative
    pub fn safe_sub(&self, other: &RewardVector) -> Result<Self> {
        let mut out = self.clone();
        for (denom, requested) in other.iter() {
            let available = self.amount_of(denom);
            if requested > available {
                return Err(TypesError::NegativeComponent {
                    denom: denom.to_string(),
                    available,
                    requested,
                });
            }
            out.put(denom.to_string(), available - requested);
        }
        Ok(out)
    }

    /// Multiply every component by a non-negative scalar.
    ///
    /// # Errors
    ///
    /// - [`TypesError::NegativeAmount`] if `factor` is negative
    /// - [`TypesError::Overflow`] if any product overflows
    pub fn mul_dec(&self, factor: Decimal) -> Result<Self> {
        if factor < Decimal::ZERO {
            return Err(TypesError::NegativeAmount {
                denom: "<scalar>".to_string(),
                amount: factor,
            });
        }
        let mut out = Self::new();
        for (denom, amount) in self.iter() {
            let product = amount.checked_mul(factor).ok_or(TypesError::Overflow)?;
            out.put(denom.to_string(), product);
        }
        Ok(out)
    }

    /// Divide every component by a positive scalar.
    ///
    /// Quotients are rounded to the precision of [`Decimal`]; components too
    /// small to represent become zero.
    ///
    /// # Errors
    ///
    /// - [`TypesError::DivisionByZero`] if `divisor` is zero
    /// - [`TypesError::NegativeAmount`] if `divisor` is negative
    /// - [`TypesError::Overflow`] if any quotient overflows
    pub fn quo_dec(&self, divisor: Decimal) -> Result<Self> {
        if divisor.is_zero() {
            return Err(TypesError::DivisionByZero);
        }
        if divisor < Decimal::ZERO {
            return Err(TypesError::NegativeAmount {
                denom: "<scalar>".to_string(),
                amount: divisor,
            });
        }
        let mut out = Self::new();
        for (denom, amount) in self.iter() {
            let quotient = amount.checked_div(divisor).ok_or(TypesError::Overflow)?;
            out.put(denom.to_string(), quotient);
        }
        Ok(out)
    }

    /// Divide every component by a positive scalar, rounding toward zero at
    /// [`DEC_PRECISION`] decimal places.
    ///
    /// `quotient * divisor`, computed in [`Decimal`], never exceeds the
    /// original component. This holds up to the 28-digit precision of
    /// [`Decimal`]: for very large components the product is itself rounded,
    /// so the exact product may exceed the component in digits that cannot
    /// be represented.
    ///
    /// # Errors
    ///
    /// Same as [`RewardVector::quo_dec`].
    pub fn quo_dec_truncate(&self, divisor: Decimal) -> Result<Self> {
        let rounded = self.quo_dec(divisor)?;
        let mut out = Self::new();
        for (denom, quotient) in rounded.iter() {
            let amount = self.amount_of(denom);
            let mut quotient =
                quotient.round_dp_with_strategy(DEC_PRECISION, RoundingStrategy::ToZero);
            // Division rounds to nearest at full precision; step down by the
            // last representable digit until the product fits.
            while quotient.checked_mul(divisor).ok_or(TypesError::Overflow)? > amount {
                quotient -= Decimal::new(1, quotient.scale());
            }
            out.put(denom.to_string(), quotient);
        }
        Ok(out)
    }

    /// Split into `(integer part, fractional dust)`.
    ///
    /// The two halves always add back up to `self`.
    pub fn truncate(&self) -> (Self, Self) {
        let mut whole = Self::new();
        let mut dust = Self::new();
        for (denom, amount) in self.iter() {
            whole.put(denom.to_string(), amount.trunc());
            dust.put(denom.to_string(), amount.fract());
        }
        (whole, dust)
    }

    /// Whether any component of `self` is strictly greater than the
    /// corresponding component of `other`.
    pub fn is_any_gt(&self, other: &RewardVector) -> bool {
        self.iter()
            .any(|(denom, amount)| amount > other.amount_of(denom))
    }

    /// Insert a component, dropping zeros and normalizing the scale.
    fn put(&mut self, denom: String, amount: Decimal) {
        if amount.is_zero() {
            self.amounts.remove(&denom);
        } else {
            self.amounts.insert(denom, amount.normalize());
        }
    }
}

impl TryFrom<BTreeMap<String, Decimal>> for RewardVector {
    type Error = TypesError;

    fn try_from(map: BTreeMap<String, Decimal>) -> Result<Self> {
        Self::from_pairs(map)
    }
}

impl From<RewardVector> for BTreeMap<String, Decimal> {
    fn from(vector: RewardVector) -> Self {
        vector.amounts
    }
}

impl fmt::Display for RewardVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (denom, amount) in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{amount}{denom}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn rv(pairs: &[(&str, i64)]) -> RewardVector {
        RewardVector::from_pairs(pairs.iter().map(|(d, a)| (*d, dec(*a)))).expect("vector")
    }

    #[test]
    fn test_zero_components_are_pruned() {
        let v = rv(&[("uusdc", 0), ("uosmo", 3)]);
        assert_eq!(v.len(), 1);
        assert_eq!(v.amount_of("uusdc"), Decimal::ZERO);
        assert_eq!(v, rv(&[("uosmo", 3)]));
    }

    #[test]
    fn test_repeated_denoms_are_summed() {
        let v = rv(&[("uusdc", 2), ("uusdc", 5)]);
        assert_eq!(v.amount_of("uusdc"), dec(7));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let result = RewardVector::single("uusdc", dec(-1));
        assert!(matches!(result, Err(TypesError::NegativeAmount { .. })));
    }

    #[test]
    fn test_add_disjoint_denoms() {
        let osmo = rv(&[("uosmo", 2)]);
        let sum = rv(&[("uusdc", 1)]).add(&osmo).expect("add");
        assert_eq!(sum, rv(&[("uosmo", 2), ("uusdc", 1)]));
    }

    #[test]
    fn test_safe_sub_to_zero() {
        let a = rv(&[("uusdc", 10), ("uosmo", 4)]);
        let diff = a.safe_sub(&rv(&[("uusdc", 10)])).expect("sub");
        assert_eq!(diff, rv(&[("uosmo", 4)]));
    }

    #[test]
    fn test_safe_sub_reports_negative() {
        let a = rv(&[("uusdc", 10)]);
        let err = a.safe_sub(&rv(&[("uosmo", 1)])).expect_err("negative");
        assert_eq!(
            err,
            TypesError::NegativeComponent {
                denom: "uosmo".to_string(),
                available: Decimal::ZERO,
                requested: dec(1),
            }
        );
    }

    #[test]
    fn test_mul_and_quo() {
        let v = rv(&[("uusdc", 50)]);
        assert_eq!(v.quo_dec(dec(10)).expect("quo"), rv(&[("uusdc", 5)]));
        assert_eq!(v.mul_dec(dec(3)).expect("mul"), rv(&[("uusdc", 150)]));
        assert!(v.mul_dec(Decimal::ZERO).expect("mul zero").is_zero());
    }

    #[test]
    fn test_quo_truncate_never_rounds_up() {
        let v = rv(&[("uusdc", 10)]);
        let rounded = v.quo_dec(dec(6)).expect("quo");
        let truncated = v.quo_dec_truncate(dec(6)).expect("quo");
        assert!(truncated.amount_of("uusdc") < rounded.amount_of("uusdc"));
        let product = truncated.mul_dec(dec(6)).expect("mul");
        assert!(product.amount_of("uusdc") <= dec(10));

        assert_eq!(
            truncated.amount_of("uusdc"),
            Decimal::new(1_666_666_666_666_666_666, 18)
        );

        let exact = v.quo_dec_truncate(dec(4)).expect("quo");
        assert_eq!(exact.amount_of("uusdc"), Decimal::new(25, 1));
    }

    #[test]
    fn test_quo_truncate_beyond_eighteen_digits() {
        // 2e20 / 3 has more significant digits than Decimal can hold.
        let amount = Decimal::from_i128_with_scale(200_000_000_000_000_000_000, 0);
        let v = RewardVector::single("uusdc", amount).expect("vector");
        let truncated = v.quo_dec_truncate(dec(3)).expect("quo");
        let per_share = truncated.amount_of("uusdc");

        assert!(per_share * dec(3) <= amount);
        let whole = Decimal::from_i128_with_scale(66_666_666_666_666_666_666, 0);
        assert_eq!(per_share.trunc(), whole);
    }

    #[test]
    fn test_quo_by_zero() {
        let v = rv(&[("uusdc", 50)]);
        assert_eq!(v.quo_dec(Decimal::ZERO), Err(TypesError::DivisionByZero));
    }

    #[test]
    fn test_mul_overflow() {
        let v = RewardVector::single("uusdc", Decimal::MAX).expect("max");
        assert_eq!(v.mul_dec(dec(2)), Err(TypesError::Overflow));
    }

    #[test]
    fn test_truncate_splits_dust() {
        let v = RewardVector::from_pairs([
            ("uusdc", Decimal::new(12_345, 3)),
            ("uosmo", Decimal::new(4, 1)),
        ])
        .expect("vector");
        let (whole, dust) = v.truncate();
        assert_eq!(whole, rv(&[("uusdc", 12)]));
        assert_eq!(dust.amount_of("uusdc"), Decimal::new(345, 3));
        assert_eq!(dust.amount_of("uosmo"), Decimal::new(4, 1));
        assert_eq!(whole.add(&dust).expect("add"), v);
    }

    #[test]
    fn test_equal_values_equal_encoding() {
        let a = RewardVector::single("uusdc", Decimal::new(50, 1)).expect("a");
        let b = RewardVector::single("uusdc", dec(5)).expect("b");
        assert_eq!(
            serde_json::to_string(&a).expect("json a"),
            serde_json::to_string(&b).expect("json b")
        );
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        let result: std::result::Result<RewardVector, _> =
            serde_json::from_str(r#"{"uusdc":"-1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_is_any_gt() {
        let a = rv(&[("uusdc", 5), ("uosmo", 1)]);
        let b = rv(&[("uusdc", 5), ("uosmo", 2)]);
        assert!(!a.is_any_gt(&b));
        assert!(b.is_any_gt(&a));
        assert!(a.is_any_gt(&RewardVector::new()));
    }

    #[test]
    fn test_display() {
        let v = rv(&[("uusdc", 5), ("uosmo", 1)]);
        assert_eq!(v.to_string(), "1uosmo,5uusdc");
    }
}

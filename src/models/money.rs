//! Monetary amounts in integer minor units.
//!
//! Every price calculation works on whole cents. Stored documents and API
//! payloads carry decimal dollars, so `Money` serializes to and from a plain
//! number of dollars and converts at the boundary with half-away-from-zero
//! rounding.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Non-finite input maps to zero.
    pub fn from_dollars(dollars: f64) -> Self {
        if !dollars.is_finite() {
            return Money::ZERO;
        }
        Money((dollars * 100.0).round() as i64)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn to_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn times(self, factor: i64) -> Money {
        Money(self.0.saturating_mul(factor))
    }

    /// `percent` of this amount, rounded to the nearest cent.
    pub fn percent(self, percent: f64) -> Money {
        if !percent.is_finite() {
            return Money::ZERO;
        }
        Money((self.0 as f64 * percent / 100.0).round() as i64)
    }

    /// Multiply by a fractional factor (e.g. kilometres), rounded to the nearest cent.
    pub fn scale(self, factor: f64) -> Money {
        if !factor.is_finite() {
            return Money::ZERO;
        }
        Money((self.0 as f64 * factor).round() as i64)
    }

    /// Splits `self` across `weights` with the largest-remainder method.
    ///
    /// The returned shares always sum to exactly `self`. When every weight is
    /// zero the amount is split evenly. Ties on the remainder go to the
    /// earlier weight.
    pub fn allocate(self, weights: &[Money]) -> Vec<Money> {
        if weights.is_empty() {
            return Vec::new();
        }

        let total_weight: i128 = weights.iter().map(|w| w.0.max(0) as i128).sum();
        let effective: Vec<i128> = if total_weight == 0 {
            vec![1; weights.len()]
        } else {
            weights.iter().map(|w| w.0.max(0) as i128).collect()
        };
        let denominator: i128 = effective.iter().sum();

        let sign: i128 = if self.0 < 0 { -1 } else { 1 };
        let amount = (self.0 as i128).abs();

        let mut shares = Vec::with_capacity(effective.len());
        let mut remainders = Vec::with_capacity(effective.len());
        for (index, weight) in effective.iter().enumerate() {
            let product = amount * weight;
            shares.push(product / denominator);
            remainders.push((index, product % denominator));
        }

        let distributed: i128 = shares.iter().sum();
        let leftover = (amount - distributed) as usize;

        remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        for (index, _) in remainders.into_iter().take(leftover) {
            shares[index] += 1;
        }

        shares
            .into_iter()
            .map(|share| Money((share * sign) as i64))
            .collect()
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_dollars())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dollars = f64::deserialize(deserializer)?;
        if !dollars.is_finite() {
            return Err(serde::de::Error::custom("amount must be a finite number"));
        }
        Ok(Money::from_dollars(dollars))
    }
}

//! Rate table resolution for a single line item.
//!
//! A size carries one price per duration label. The "Daily" label is special:
//! its price is charged per started day of the booked range. Any other label
//! is a fixed-duration price charged once per unit, whatever the date span.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, PricingError};
use crate::models::draft::DateRange;
use crate::models::location::{Rate, StorageLocation, StorageSize};
use crate::models::money::Money;

pub const DAILY: &str = "daily";
const MS_PER_DAY: i64 = 86_400_000;

/// What the aggregator does when a size has no rate for the chosen duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRatePolicy {
    /// Record the miss and block the booking until it is resolved.
    #[default]
    Reject,
    /// Price the line at zero and log a warning.
    Zero,
}

impl FromStr for MissingRatePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(MissingRatePolicy::Reject),
            "zero" => Ok(MissingRatePolicy::Zero),
            other => Err(ConfigError::Invalid {
                key: "MISSING_RATE_POLICY",
                value: other.to_string(),
            }),
        }
    }
}

pub fn is_daily(duration: &str) -> bool {
    duration.eq_ignore_ascii_case(DAILY)
}

/// Number of started days in the range, never less than one.
pub fn billable_days(range: &DateRange) -> i64 {
    let ms = (range.end - range.start).num_milliseconds();
    if ms <= 0 {
        return 1;
    }
    ((ms + MS_PER_DAY - 1) / MS_PER_DAY).max(1)
}

pub fn find_rate<'a>(rates: &'a [Rate], duration: &str) -> Option<&'a Rate> {
    if is_daily(duration) {
        rates.iter().find(|rate| is_daily(&rate.duration))
    } else {
        rates.iter().find(|rate| rate.duration == duration)
    }
}

/// Price of `quantity` units of `size` for `duration` over `range`.
pub fn line_price(
    size: &StorageSize,
    duration: &str,
    range: &DateRange,
    quantity: u32,
) -> Result<Money, PricingError> {
    let rate = find_rate(&size.rates, duration).ok_or_else(|| PricingError::RateNotFound {
        size: size.name.clone(),
        duration: duration.to_string(),
    })?;

    let units = rate.price.times(quantity as i64);
    if is_daily(duration) {
        Ok(units.times(billable_days(range)))
    } else {
        Ok(units)
    }
}

/// Rejects negative prices and duplicate duration labels within a size.
pub fn validate_rates(size: &StorageSize) -> Result<(), PricingError> {
    let mut seen = HashSet::new();
    for rate in &size.rates {
        if rate.price < Money::ZERO {
            return Err(PricingError::InvalidPrice {
                size: size.name.clone(),
                duration: rate.duration.clone(),
            });
        }
        let key = if is_daily(&rate.duration) {
            DAILY.to_string()
        } else {
            rate.duration.clone()
        };
        if !seen.insert(key) {
            return Err(PricingError::DuplicateRate {
                size: size.name.clone(),
                duration: rate.duration.clone(),
            });
        }
    }
    Ok(())
}

pub fn validate_location(location: &StorageLocation) -> Result<(), PricingError> {
    location
        .categories
        .iter()
        .flat_map(|category| category.sizes.iter())
        .try_for_each(validate_rates)
}

use serde::Serialize;

use crate::error::PricingError;
use crate::models::draft::BookingDraft;
use crate::models::location::PricingSettings;
use crate::models::money::Money;
use crate::models::voucher::Voucher;
use crate::services::distance_service;
use crate::services::rate_service::{self, MissingRatePolicy};

/// Subtotal of one line item, identified by its position in `BookingDraft::line_items`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePrice {
    pub location_id: String,
    pub category: String,
    pub size: String,
    pub quantity: u32,
    pub subtotal: Money,
}

/// A line item's share of the aggregate fee and discount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineAllocation {
    pub location_id: String,
    pub subtotal: Money,
    pub pickup_fee: Money,
    pub discount: Money,
    pub final_price: Money,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PriceBreakdown {
    pub lines: Vec<LinePrice>,
    pub sub_total: Money,
    pub pickup_fee: Money,
    pub pickup_distance_km: Option<f64>,
    pub discount_amount: Money,
    pub final_price: Money,
    pub total_items: u32,
    #[serde(skip)]
    pub issues: Vec<PricingError>,
}

impl PriceBreakdown {
    pub fn price_before_discount(&self) -> Money {
        self.sub_total + self.pickup_fee
    }

    pub fn issue_messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    pub fn first_issue(&self) -> Option<&PricingError> {
        self.issues.first()
    }
}

pub struct PricingService;

impl PricingService {
    /// Subtotal per line item. Without a chosen duration every line is zero.
    pub fn line_prices(
        draft: &BookingDraft,
        policy: MissingRatePolicy,
    ) -> (Vec<LinePrice>, Vec<PricingError>) {
        let mut issues = Vec::new();
        let lines: Vec<LinePrice> = draft
            .line_items()
            .map(|(location, item)| {
                let subtotal = match draft.duration.as_deref() {
                    None => Money::ZERO,
                    Some(duration) => {
                        match rate_service::line_price(&item.size, duration, &draft.dates, item.quantity) {
                            Ok(price) => price,
                            Err(err) => {
                                if policy == MissingRatePolicy::Zero {
                                    log::warn!("{}, pricing line at zero", err);
                                } else {
                                    issues.push(err);
                                }
                                Money::ZERO
                            }
                        }
                    }
                };
                LinePrice {
                    location_id: location.id.clone(),
                    category: item.category.clone(),
                    size: item.size.name.clone(),
                    quantity: item.quantity,
                    subtotal,
                }
            })
            .collect();
        (lines, issues)
    }

    /// Pickup fee summed over every location in the cart.
    ///
    /// Returns no fee until the pickup point has been captured. A location
    /// without coordinates contributes nothing and is reported as an issue.
    pub fn pickup_fee(
        draft: &BookingDraft,
        settings: &PricingSettings,
    ) -> (Money, Option<f64>, Vec<PricingError>) {
        let pickup_point = match (&draft.pickup, draft.is_pickup()) {
            (Some(details), true) => details.geolocation,
            _ => return (Money::ZERO, None, Vec::new()),
        };

        let mut fee = Money::ZERO;
        let mut distance = 0.0;
        let mut issues = Vec::new();
        for cart in draft.locations_to_book.values() {
            match distance_service::quote_pickup(Some(pickup_point), &cart.location, settings) {
                Ok(quote) => {
                    fee += quote.fee;
                    distance += quote.distance_km;
                }
                Err(err) => issues.push(err),
            }
        }
        (fee, Some(distance), issues)
    }

    pub fn discount_amount(price_before_discount: Money, voucher: Option<&Voucher>) -> Money {
        match voucher {
            Some(voucher) => price_before_discount.percent(voucher.effective_percent()),
            None => Money::ZERO,
        }
    }

    /// Full recomputation of the draft's totals.
    pub fn calculate(
        draft: &BookingDraft,
        settings: &PricingSettings,
        policy: MissingRatePolicy,
    ) -> PriceBreakdown {
        let (lines, mut issues) = Self::line_prices(draft, policy);
        let (pickup_fee, pickup_distance_km, pickup_issues) = Self::pickup_fee(draft, settings);
        issues.extend(pickup_issues);

        let sub_total: Money = lines.iter().map(|line| line.subtotal).sum();
        let before_discount = sub_total + pickup_fee;
        let discount_amount = Self::discount_amount(before_discount, draft.voucher.as_ref());

        PriceBreakdown {
            sub_total,
            pickup_fee,
            pickup_distance_km,
            discount_amount,
            final_price: before_discount - discount_amount,
            total_items: draft.total_items(),
            issues,
            lines,
        }
    }

    /// Apportions the pickup fee and discount across line items in proportion
    /// to their subtotals. Both shares are computed with the largest-remainder
    /// method, so the allocated final prices sum exactly to `final_price`.
    pub fn allocate(breakdown: &PriceBreakdown) -> Vec<LineAllocation> {
        let weights: Vec<Money> = breakdown.lines.iter().map(|line| line.subtotal).collect();
        let fees = breakdown.pickup_fee.allocate(&weights);
        let discounts = breakdown.discount_amount.allocate(&weights);

        breakdown
            .lines
            .iter()
            .zip(fees)
            .zip(discounts)
            .map(|((line, pickup_fee), discount)| LineAllocation {
                location_id: line.location_id.clone(),
                subtotal: line.subtotal,
                pickup_fee,
                discount,
                final_price: line.subtotal + pickup_fee - discount,
            })
            .collect()
    }
}

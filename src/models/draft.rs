use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::models::location::{GeoPoint, StorageLocation, StorageSize};
use crate::models::voucher::Voucher;

/// Wizard position. `PickupDetails` is the address capture detour of step 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Schedule,
    Service,
    PickupDetails,
    Confirmation,
}

impl Step {
    pub fn number(self) -> u8 {
        match self {
            Step::Schedule => 1,
            Step::Service | Step::PickupDetails => 2,
            Step::Confirmation => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    #[serde(rename = "self-dropoff")]
    SelfDropoff,
    #[serde(rename = "pickup")]
    Pickup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    OnSite,
    Online,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, FlowError> {
        if end < start {
            return Err(FlowError::InvalidDateRange);
        }
        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub category: String,
    pub size: StorageSize,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCart {
    pub location: StorageLocation,
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupDetails {
    pub address: String,
    pub geolocation: GeoPoint,
    pub contact_number: String,
}

fn contact_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid contact number regex"))
}

impl PickupDetails {
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.address.trim().is_empty() {
            return Err(FlowError::PickupDetailsIncomplete("address"));
        }
        if !self.geolocation.is_valid() {
            return Err(FlowError::PickupDetailsIncomplete("geolocation"));
        }
        let compact: String = self
            .contact_number
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();
        if !contact_number_pattern().is_match(&compact) {
            return Err(FlowError::PickupDetailsIncomplete("contact number"));
        }
        Ok(())
    }
}

/// In-progress booking owned by a single wizard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub step: Step,
    pub dates: DateRange,
    pub duration: Option<String>,
    pub locations_to_book: BTreeMap<String, LocationCart>,
    pub service_type: Option<ServiceType>,
    pub pickup: Option<PickupDetails>,
    pub voucher: Option<Voucher>,
    #[serde(default)]
    pub notes: String,
    pub payment_method: Option<PaymentMethod>,
}

impl BookingDraft {
    pub fn new(dates: DateRange) -> Self {
        Self {
            step: Step::Schedule,
            dates,
            duration: None,
            locations_to_book: BTreeMap::new(),
            service_type: None,
            pickup: None,
            voucher: None,
            notes: String::new(),
            payment_method: None,
        }
    }

    /// Adds `quantity` of a size, merging with an existing line for the same size.
    /// The merged quantity must stay within the size's capacity.
    pub fn add_item(
        &mut self,
        location: &StorageLocation,
        category: &str,
        size_name: &str,
        quantity: u32,
    ) -> Result<(), FlowError> {
        let size = location
            .find_size(category, size_name)
            .ok_or_else(|| FlowError::UnknownSize {
                location: location.id.clone(),
                category: category.to_string(),
                size: size_name.to_string(),
            })?;

        let cart = self
            .locations_to_book
            .entry(location.id.clone())
            .or_insert_with(|| LocationCart {
                location: location.clone(),
                items: Vec::new(),
            });

        let existing = cart
            .items
            .iter()
            .position(|item| item.category == category && item.size.name == size_name);
        let current = existing.map(|i| cart.items[i].quantity).unwrap_or(0);
        let requested = current.saturating_add(quantity);

        if quantity == 0 || requested > size.capacity {
            if cart.items.is_empty() {
                self.locations_to_book.remove(&location.id);
            }
            return Err(FlowError::InvalidQuantity {
                size: size_name.to_string(),
                requested,
                capacity: size.capacity,
            });
        }

        match existing {
            Some(i) => cart.items[i].quantity = requested,
            None => cart.items.push(LineItem {
                category: category.to_string(),
                size: size.clone(),
                quantity,
            }),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.locations_to_book
            .values()
            .all(|cart| cart.items.is_empty())
    }

    /// Every line item paired with its location, in location-id order.
    pub fn line_items(&self) -> impl Iterator<Item = (&StorageLocation, &LineItem)> {
        self.locations_to_book
            .values()
            .flat_map(|cart| cart.items.iter().map(move |item| (&cart.location, item)))
    }

    pub fn total_items(&self) -> u32 {
        self.line_items().map(|(_, item)| item.quantity).sum()
    }

    pub fn is_pickup(&self) -> bool {
        self.service_type == Some(ServiceType::Pickup)
    }
}

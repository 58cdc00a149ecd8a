//! Pickup distance and fee calculation
//!
//! Distance between the customer's pickup point and a storage location is the
//! great-circle (haversine) distance over a spherical earth. The fee is either
//! a per-kilometre charge or, when no per-kilometre price is configured, the
//! flat pickup fee from the pricing settings.
//!
//! Coordinates come from the geocoding/maps collaborator on the client side;
//! this module never calls out to a maps API.

use serde::Serialize;

use crate::error::PricingError;
use crate::models::location::{GeoPoint, PricingSettings, StorageLocation};
use crate::models::money::Money;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickupQuote {
    pub location_id: String,
    pub distance_km: f64,
    pub fee: Money,
}

/// Great-circle distance in kilometres.
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let d_phi = (to.latitude - from.latitude).to_radians();
    let d_lambda = (to.longitude - from.longitude).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Per-kilometre fee when `km_fee` is set, otherwise the flat pickup fee.
///
/// The per-kilometre product is rounded half away from zero to whole cents, so
/// the fee only grows once the extra distance is worth at least half a cent:
/// it is non-decreasing in distance and strictly increasing at cent
/// granularity.
pub fn fee_for_distance(distance_km: f64, settings: &PricingSettings) -> Money {
    if settings.km_fee > Money::ZERO {
        settings.km_fee.scale(distance_km)
    } else {
        settings.pickup_fee
    }
}

pub fn quote_pickup(
    pickup: Option<GeoPoint>,
    location: &StorageLocation,
    settings: &PricingSettings,
) -> Result<PickupQuote, PricingError> {
    let pickup = pickup.ok_or(PricingError::MissingPickupGeolocation)?;
    let destination = location
        .geolocation
        .ok_or_else(|| PricingError::MissingLocationGeolocation(location.id.clone()))?;

    let distance_km = haversine_km(pickup, destination);
    Ok(PickupQuote {
        location_id: location.id.clone(),
        distance_km,
        fee: fee_for_distance(distance_km, settings),
    })
}

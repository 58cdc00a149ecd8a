use serde::{Deserialize, Serialize};

use crate::models::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub duration: String,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSize {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub capacity: u32,
    #[serde(default)]
    pub rates: Vec<Rate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageCategory {
    pub name: String,
    #[serde(default)]
    pub sizes: Vec<StorageSize>,
}

/// Read from the `StorageLocations` collection keyed by `_id`; serialized as `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageLocation {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub geolocation: Option<GeoPoint>,
    #[serde(default)]
    pub categories: Vec<StorageCategory>,
}

impl StorageLocation {
    pub fn find_size(&self, category: &str, size: &str) -> Option<&StorageSize> {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .and_then(|c| c.sizes.iter().find(|s| s.name == size))
    }
}

/// Stored under `Settings/pricing`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Charged per kilometre of pickup distance when non-zero.
    #[serde(default)]
    pub km_fee: Money,
    /// Flat pickup charge used when `km_fee` is zero.
    #[serde(default)]
    pub pickup_fee: Money,
}

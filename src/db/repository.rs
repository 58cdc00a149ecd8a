//! Storage seams used by the booking services.
//!
//! Each trait covers one document path of the store. `mongo.rs` provides the
//! production implementation and `memory.rs` an in-process one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::bookings::BookingRecord;
use crate::models::draft::BookingDraft;
use crate::models::location::{PricingSettings, StorageLocation};
use crate::models::voucher::Voucher;

/// A draft parked while its owner authenticates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftHandoff {
    #[serde(rename = "_id")]
    pub token: String,
    pub draft: BookingDraft,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn list_locations(
        &self,
        search: Option<String>,
        limit: Option<u16>,
    ) -> Result<Vec<StorageLocation>, StoreError>;
    async fn find_location(&self, id: &str) -> Result<Option<StorageLocation>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoucherStore: Send + Sync {
    async fn find_voucher(&self, code: &str) -> Result<Option<Voucher>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn pricing_settings(&self) -> Result<PricingSettings, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_booking(&self, record: &BookingRecord) -> Result<ObjectId, StoreError>;
    async fn delete_booking(&self, id: ObjectId) -> Result<(), StoreError>;
    async fn attach_invoice(&self, checkout_id: &str, invoice_url: &str)
        -> Result<(), StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HandoffStore: Send + Sync {
    async fn put_handoff(&self, handoff: &DraftHandoff) -> Result<(), StoreError>;
    /// Removes and returns the handoff; a token can be taken only once.
    async fn take_handoff(&self, token: &str) -> Result<Option<DraftHandoff>, StoreError>;
}

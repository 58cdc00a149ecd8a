//! In-process store, used for local development without MongoDB and by the
//! HTTP tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::db::repository::{
    BookingStore, DraftHandoff, HandoffStore, LocationStore, SettingsStore, VoucherStore,
};
use crate::error::StoreError;
use crate::models::bookings::BookingRecord;
use crate::models::location::{PricingSettings, StorageLocation};
use crate::models::voucher::Voucher;

#[derive(Default)]
struct Inner {
    locations: Vec<StorageLocation>,
    vouchers: HashMap<String, Voucher>,
    settings: PricingSettings,
    bookings: Vec<(ObjectId, BookingRecord)>,
    handoffs: HashMap<String, DraftHandoff>,
    insert_budget: Option<usize>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_location(self, location: StorageLocation) -> Self {
        self.lock().locations.push(location);
        self
    }

    pub fn with_voucher(self, voucher: Voucher) -> Self {
        self.lock().vouchers.insert(voucher.code.clone(), voucher);
        self
    }

    pub fn with_settings(self, settings: PricingSettings) -> Self {
        self.lock().settings = settings;
        self
    }

    /// After `n` successful inserts every further insert fails.
    pub fn fail_inserts_after(&self, n: usize) {
        self.lock().insert_budget = Some(n);
    }

    pub fn bookings(&self) -> Vec<BookingRecord> {
        self.lock()
            .bookings
            .iter()
            .map(|(id, record)| BookingRecord {
                id: Some(*id),
                ..record.clone()
            })
            .collect()
    }
}

#[async_trait]
impl LocationStore for InMemoryStore {
    async fn list_locations(
        &self,
        search: Option<String>,
        limit: Option<u16>,
    ) -> Result<Vec<StorageLocation>, StoreError> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let mut found: Vec<StorageLocation> = self
            .lock()
            .locations
            .iter()
            .filter(|location| match &needle {
                Some(needle) => location.name.to_lowercase().starts_with(needle),
                None => true,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(limit) = limit {
            found.truncate(usize::from(limit));
        }
        Ok(found)
    }

    async fn find_location(&self, id: &str) -> Result<Option<StorageLocation>, StoreError> {
        Ok(self.lock().locations.iter().find(|l| l.id == id).cloned())
    }
}

#[async_trait]
impl VoucherStore for InMemoryStore {
    async fn find_voucher(&self, code: &str) -> Result<Option<Voucher>, StoreError> {
        Ok(self.lock().vouchers.get(code).cloned())
    }
}

#[async_trait]
impl SettingsStore for InMemoryStore {
    async fn pricing_settings(&self) -> Result<PricingSettings, StoreError> {
        Ok(self.lock().settings)
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert_booking(&self, record: &BookingRecord) -> Result<ObjectId, StoreError> {
        let mut inner = self.lock();
        if let Some(budget) = inner.insert_budget.as_mut() {
            if *budget == 0 {
                return Err(StoreError::Unavailable("insert rejected".to_string()));
            }
            *budget -= 1;
        }
        let id = ObjectId::new();
        inner.bookings.push((id, record.clone()));
        Ok(id)
    }

    async fn delete_booking(&self, id: ObjectId) -> Result<(), StoreError> {
        self.lock().bookings.retain(|(existing, _)| *existing != id);
        Ok(())
    }

    async fn attach_invoice(
        &self,
        checkout_id: &str,
        invoice_url: &str,
    ) -> Result<(), StoreError> {
        for (_, record) in self.lock().bookings.iter_mut() {
            if record.checkout_id == checkout_id {
                record.invoice_url = Some(invoice_url.to_string());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl HandoffStore for InMemoryStore {
    async fn put_handoff(&self, handoff: &DraftHandoff) -> Result<(), StoreError> {
        self.lock()
            .handoffs
            .insert(handoff.token.clone(), handoff.clone());
        Ok(())
    }

    async fn take_handoff(&self, token: &str) -> Result<Option<DraftHandoff>, StoreError> {
        Ok(self.lock().handoffs.remove(token))
    }
}

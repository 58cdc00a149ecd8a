use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::db::repository::{
    BookingStore, DraftHandoff, HandoffStore, LocationStore, SettingsStore, VoucherStore,
};
use crate::error::StoreError;
use crate::models::bookings::BookingRecord;
use crate::models::location::{PricingSettings, StorageLocation};
use crate::models::voucher::Voucher;

const LOCATIONS: &str = "StorageLocations";
const VOUCHERS: &str = "Vouchers";
const SETTINGS: &str = "Settings";
const BOOKINGS: &str = "Bookings";
const HANDOFFS: &str = "DraftHandoffs";
const PRICING_SETTINGS_ID: &str = "pricing";

pub async fn create_mongo_client(uri: &str) -> Result<Arc<Client>, StoreError> {
    log::info!("Connecting to MongoDB");

    let mut client_options = ClientOptions::parse(uri).await?;

    client_options.connect_timeout = Some(Duration::from_secs(10));
    client_options.server_selection_timeout = Some(Duration::from_secs(10));
    client_options.max_pool_size = Some(10);
    client_options.min_pool_size = Some(1);

    let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
    client_options.server_api = Some(server_api);

    let client = Client::with_options(client_options)?;

    // A failed ping is not fatal; the driver reconnects on demand.
    match client
        .database("admin")
        .run_command(doc! {"ping": 1})
        .await
    {
        Ok(_) => log::info!("Successfully connected to MongoDB and verified with ping command"),
        Err(e) => log::warn!("Connected to MongoDB but ping test failed: {}", e),
    }

    Ok(Arc::new(client))
}

#[derive(Debug, Serialize, Deserialize)]
struct SettingsDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(flatten)]
    pricing: PricingSettings,
}

#[derive(Clone)]
pub struct MongoRepository {
    client: Arc<Client>,
    database: String,
}

impl MongoRepository {
    pub fn new(client: Arc<Client>, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
        }
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.client.database(&self.database).collection(name)
    }
}

#[async_trait]
impl LocationStore for MongoRepository {
    async fn list_locations(
        &self,
        search: Option<String>,
        limit: Option<u16>,
    ) -> Result<Vec<StorageLocation>, StoreError> {
        let collection: Collection<StorageLocation> = self.collection(LOCATIONS);

        let filter = match search {
            Some(search_text) if !search_text.trim().is_empty() => doc! {
                "name": {
                    "$regex": format!("^{}", regex::escape(search_text.trim())),
                    "$options": "i"
                }
            },
            _ => doc! {},
        };

        let mut find = collection.find(filter).sort(doc! { "name": 1 });
        if let Some(limit) = limit {
            find = find.limit(i64::from(limit));
        }
        let cursor = find.await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_location(&self, id: &str) -> Result<Option<StorageLocation>, StoreError> {
        let collection: Collection<StorageLocation> = self.collection(LOCATIONS);
        Ok(collection.find_one(doc! { "_id": id }).await?)
    }
}

#[async_trait]
impl VoucherStore for MongoRepository {
    async fn find_voucher(&self, code: &str) -> Result<Option<Voucher>, StoreError> {
        let collection: Collection<Voucher> = self.collection(VOUCHERS);
        Ok(collection.find_one(doc! { "_id": code }).await?)
    }
}

#[async_trait]
impl SettingsStore for MongoRepository {
    async fn pricing_settings(&self) -> Result<PricingSettings, StoreError> {
        let collection: Collection<SettingsDocument> = self.collection(SETTINGS);
        match collection
            .find_one(doc! { "_id": PRICING_SETTINGS_ID })
            .await?
        {
            Some(settings) => Ok(settings.pricing),
            None => {
                log::warn!("No pricing settings stored, pickup will be free");
                Ok(PricingSettings::default())
            }
        }
    }
}

#[async_trait]
impl BookingStore for MongoRepository {
    async fn insert_booking(&self, record: &BookingRecord) -> Result<ObjectId, StoreError> {
        let collection: Collection<BookingRecord> = self.collection(BOOKINGS);
        let result = collection.insert_one(record).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Unavailable("insert returned no object id".to_string()))
    }

    async fn delete_booking(&self, id: ObjectId) -> Result<(), StoreError> {
        let collection: Collection<BookingRecord> = self.collection(BOOKINGS);
        collection.delete_one(doc! { "_id": id }).await?;
        Ok(())
    }

    async fn attach_invoice(
        &self,
        checkout_id: &str,
        invoice_url: &str,
    ) -> Result<(), StoreError> {
        let collection: Collection<BookingRecord> = self.collection(BOOKINGS);
        collection
            .update_many(
                doc! { "checkout_id": checkout_id },
                doc! { "$set": { "invoice_url": invoice_url, "updated_at": DateTime::now() } },
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl HandoffStore for MongoRepository {
    async fn put_handoff(&self, handoff: &DraftHandoff) -> Result<(), StoreError> {
        let collection: Collection<DraftHandoff> = self.collection(HANDOFFS);
        collection.insert_one(handoff).await?;
        Ok(())
    }

    async fn take_handoff(&self, token: &str) -> Result<Option<DraftHandoff>, StoreError> {
        let collection: Collection<DraftHandoff> = self.collection(HANDOFFS);
        Ok(collection
            .find_one_and_delete(doc! { "_id": token })
            .await?)
    }
}

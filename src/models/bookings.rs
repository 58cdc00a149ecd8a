use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::models::draft::{PaymentMethod, ServiceType};
use crate::models::location::GeoPoint;
use crate::models::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    UnpaidOnSite,
    AwaitingPayment,
    Paid,
    Failed,
}

/// One persisted booking per checked-out line item. Location and size data is
/// a snapshot taken at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub checkout_id: String,
    pub user_id: String,
    pub location_id: String,
    pub location_name: String,
    pub category: String,
    pub storage_type: String,
    pub quantity: u32,
    pub duration: String,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub service_type: ServiceType,
    pub pickup_address: Option<String>,
    pub pickup_geolocation: Option<GeoPoint>,
    pub contact_number: Option<String>,
    pub notes: String,
    pub voucher_code: Option<String>,
    pub subtotal: Money,
    pub pickup_fee: Money,
    pub discount_amount: Money,
    pub total_price: Money,
    pub payment_method: PaymentMethod,
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub invoice_url: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

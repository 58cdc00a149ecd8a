//! Turns a confirmed draft into persisted bookings.
//!
//! One `BookingRecord` is written per line item. The writes form a small
//! saga: if any insert fails, or the payment gateway refuses to create an
//! invoice, every record already written for the checkout is deleted again
//! and the error is returned with the draft untouched.

use std::sync::Arc;

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository::BookingStore;
use crate::error::{CheckoutError, FlowError};
use crate::models::bookings::{BookingRecord, BookingStatus, PaymentStatus};
use crate::models::draft::{PaymentMethod, ServiceType};
use crate::models::money::Money;
use crate::services::booking_flow::BookingFlow;
use crate::services::payment::interface::{InvoiceRequest, PaymentGateway};
use crate::services::pricing_service::PricingService;

#[derive(Debug, Clone, PartialEq)]
pub struct Buyer {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CheckoutNext {
    RedirectToInvoice { invoice_url: String },
    RedirectToBookings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutOutcome {
    pub checkout_id: String,
    pub booking_ids: Vec<String>,
    pub total_price: Money,
    pub next: CheckoutNext,
}

/// Builds one record per line item with its allocated share of fee and discount.
pub fn build_records(
    flow: &BookingFlow,
    buyer: &Buyer,
    checkout_id: &str,
) -> Result<Vec<BookingRecord>, FlowError> {
    flow.validate_submission()?;

    let draft = flow.draft();
    let totals = flow.totals();
    let duration = draft.duration.clone().ok_or(FlowError::DurationMissing)?;
    let service_type = draft.service_type.ok_or(FlowError::ServiceTypeMissing)?;
    let payment_method = draft.payment_method.ok_or(FlowError::PaymentMethodMissing)?;
    let pickup = match service_type {
        ServiceType::Pickup => draft.pickup.clone(),
        ServiceType::SelfDropoff => None,
    };

    let (booking_status, payment_status) = match payment_method {
        PaymentMethod::OnSite => (BookingStatus::Confirmed, PaymentStatus::UnpaidOnSite),
        PaymentMethod::Online if totals.final_price.is_zero() => {
            (BookingStatus::Confirmed, PaymentStatus::Paid)
        }
        PaymentMethod::Online => (BookingStatus::Pending, PaymentStatus::AwaitingPayment),
    };

    let now = DateTime::now();
    let start_date = DateTime::from_chrono(draft.dates.start);
    let end_date = DateTime::from_chrono(draft.dates.end);
    let allocations = PricingService::allocate(totals);

    let records = draft
        .line_items()
        .zip(allocations)
        .map(|((location, item), allocation)| BookingRecord {
            id: None,
            checkout_id: checkout_id.to_string(),
            user_id: buyer.user_id.clone(),
            location_id: location.id.clone(),
            location_name: location.name.clone(),
            category: item.category.clone(),
            storage_type: item.size.name.clone(),
            quantity: item.quantity,
            duration: duration.clone(),
            start_date,
            end_date,
            service_type,
            pickup_address: pickup.as_ref().map(|p| p.address.clone()),
            pickup_geolocation: pickup.as_ref().map(|p| p.geolocation),
            contact_number: pickup.as_ref().map(|p| p.contact_number.clone()),
            notes: draft.notes.clone(),
            voucher_code: draft.voucher.as_ref().map(|v| v.code.clone()),
            subtotal: allocation.subtotal,
            pickup_fee: allocation.pickup_fee,
            discount_amount: allocation.discount,
            total_price: allocation.final_price,
            payment_method,
            booking_status,
            payment_status,
            invoice_url: None,
            created_at: now,
            updated_at: now,
        })
        .collect();
    Ok(records)
}

pub struct CheckoutService {
    bookings: Arc<dyn BookingStore>,
    payments: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    pub fn new(bookings: Arc<dyn BookingStore>, payments: Arc<dyn PaymentGateway>) -> Self {
        Self { bookings, payments }
    }

    pub async fn confirm(
        &self,
        flow: &BookingFlow,
        buyer: &Buyer,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let checkout_id = Uuid::new_v4().to_string();
        let records = build_records(flow, buyer, &checkout_id)?;
        let total_price = flow.totals().final_price;

        let inserted = self.insert_all(&records).await?;
        let booking_ids = inserted.iter().map(|id| id.to_hex()).collect();

        let needs_invoice = flow.draft().payment_method == Some(PaymentMethod::Online)
            && !total_price.is_zero();
        if !needs_invoice {
            log::info!(
                "Checkout {} stored {} booking(s) for user {}",
                checkout_id,
                inserted.len(),
                buyer.user_id
            );
            return Ok(CheckoutOutcome {
                checkout_id,
                booking_ids,
                total_price,
                next: CheckoutNext::RedirectToBookings,
            });
        }

        let request = InvoiceRequest {
            amount: total_price,
            reference_id: checkout_id.clone(),
            buyer_name: buyer.name.clone(),
            buyer_email: buyer.email.clone(),
            description: invoice_description(flow),
        };
        let invoice = match self.payments.create_invoice(request).await {
            Ok(invoice) => invoice,
            Err(err) => {
                log::error!("Invoice creation failed for checkout {}: {}", checkout_id, err);
                self.compensate(&inserted).await;
                return Err(err.into());
            }
        };

        if let Err(err) = self
            .bookings
            .attach_invoice(&checkout_id, &invoice.invoice_url)
            .await
        {
            log::warn!("Could not store invoice url for checkout {}: {}", checkout_id, err);
        }

        Ok(CheckoutOutcome {
            checkout_id,
            booking_ids,
            total_price,
            next: CheckoutNext::RedirectToInvoice {
                invoice_url: invoice.invoice_url,
            },
        })
    }

    async fn insert_all(&self, records: &[BookingRecord]) -> Result<Vec<ObjectId>, CheckoutError> {
        let mut inserted = Vec::with_capacity(records.len());
        for record in records {
            match self.bookings.insert_booking(record).await {
                Ok(id) => inserted.push(id),
                Err(err) => {
                    log::error!(
                        "Failed to insert booking {} of {}: {}",
                        inserted.len() + 1,
                        records.len(),
                        err
                    );
                    self.compensate(&inserted).await;
                    return Err(err.into());
                }
            }
        }
        Ok(inserted)
    }

    async fn compensate(&self, inserted: &[ObjectId]) {
        for id in inserted {
            if let Err(err) = self.bookings.delete_booking(*id).await {
                log::error!("Compensating delete of booking {} failed: {}", id, err);
            }
        }
    }
}

fn invoice_description(flow: &BookingFlow) -> String {
    let draft = flow.draft();
    let names: Vec<&str> = draft
        .locations_to_book
        .values()
        .map(|cart| cart.location.name.as_str())
        .collect();
    format!(
        "Storage booking: {} item(s) at {} from {}",
        draft.total_items(),
        names.join(", "),
        draft.dates.start.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::MockBookingStore;
    use crate::error::{PaymentError, StoreError};
    use crate::models::draft::{BookingDraft, DateRange};
    use crate::models::location::{
        GeoPoint, PricingSettings, Rate, StorageCategory, StorageLocation, StorageSize,
    };
    use crate::services::payment::interface::{Invoice, MockPaymentGateway};
    use crate::services::rate_service::MissingRatePolicy;
    use chrono::{Duration, TimeZone, Utc};

    fn location(id: &str, daily_cents: i64) -> StorageLocation {
        StorageLocation {
            id: id.to_string(),
            name: format!("Site {}", id),
            address: String::new(),
            geolocation: Some(GeoPoint::new(0.0, 0.0)),
            categories: vec![StorageCategory {
                name: "Box".to_string(),
                sizes: vec![StorageSize {
                    name: "Standard".to_string(),
                    description: String::new(),
                    capacity: 10,
                    rates: vec![Rate {
                        duration: "Daily".to_string(),
                        price: Money::from_cents(daily_cents),
                    }],
                }],
            }],
        }
    }

    fn buyer() -> Buyer {
        Buyer {
            user_id: "user-1".to_string(),
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
        }
    }

    fn ready_flow(method: PaymentMethod) -> BookingFlow {
        let start = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let mut draft = BookingDraft::new(DateRange::new(start, start).unwrap());
        draft.add_item(&location("a", 3_000), "Box", "Standard", 2).unwrap();
        draft.add_item(&location("b", 4_000), "Box", "Standard", 1).unwrap();
        let settings = PricingSettings {
            km_fee: Money::ZERO,
            pickup_fee: Money::from_cents(1_000),
        };
        let mut flow = BookingFlow::new(draft, settings, MissingRatePolicy::Reject).unwrap();
        flow.set_schedule(start, start + Duration::days(1), Some("Daily".to_string()))
            .unwrap();
        flow.next().unwrap();
        flow.set_service_type(ServiceType::SelfDropoff).unwrap();
        flow.next().unwrap();
        flow.set_payment(method, None).unwrap();
        flow
    }

    #[test]
    fn test_records_split_per_line_item() {
        let flow = ready_flow(PaymentMethod::OnSite);
        let records = build_records(&flow, &buyer(), "chk-1").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].total_price, Money::from_cents(6_000));
        assert_eq!(records[1].total_price, Money::from_cents(4_000));
        assert_eq!(records[0].payment_status, PaymentStatus::UnpaidOnSite);
        assert!(records.iter().all(|r| r.checkout_id == "chk-1"));
        let sum: Money = records.iter().map(|r| r.total_price).sum();
        assert_eq!(sum, flow.totals().final_price);
    }

    #[test]
    fn test_records_require_payment_method() {
        let mut flow = ready_flow(PaymentMethod::OnSite);
        flow.back().unwrap();
        assert!(build_records(&flow, &buyer(), "chk-1").is_err());
    }

    #[actix_rt::test]
    async fn test_on_site_checkout_skips_gateway() {
        let mut store = MockBookingStore::new();
        store
            .expect_insert_booking()
            .times(2)
            .returning(|_| Ok(ObjectId::new()));
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_invoice().never();

        let service = CheckoutService::new(Arc::new(store), Arc::new(gateway));
        let outcome = service
            .confirm(&ready_flow(PaymentMethod::OnSite), &buyer())
            .await
            .unwrap();
        assert_eq!(outcome.next, CheckoutNext::RedirectToBookings);
        assert_eq!(outcome.booking_ids.len(), 2);
    }

    #[actix_rt::test]
    async fn test_online_checkout_returns_invoice_url() {
        let mut store = MockBookingStore::new();
        store
            .expect_insert_booking()
            .times(2)
            .returning(|_| Ok(ObjectId::new()));
        store.expect_attach_invoice().times(1).returning(|_, _| Ok(()));
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_invoice()
            .withf(|req| req.amount == Money::from_cents(10_000) && req.buyer_email == "sam@example.com")
            .times(1)
            .returning(|_| {
                Ok(Invoice {
                    invoice_url: "https://pay.example/inv_1".to_string(),
                })
            });

        let service = CheckoutService::new(Arc::new(store), Arc::new(gateway));
        let outcome = service
            .confirm(&ready_flow(PaymentMethod::Online), &buyer())
            .await
            .unwrap();
        assert_eq!(
            outcome.next,
            CheckoutNext::RedirectToInvoice {
                invoice_url: "https://pay.example/inv_1".to_string()
            }
        );
    }

    #[actix_rt::test]
    async fn test_partial_insert_failure_is_compensated() {
        let first = ObjectId::new();
        let mut store = MockBookingStore::new();
        let mut calls = 0;
        store.expect_insert_booking().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(first)
            } else {
                Err(StoreError::Unavailable("disk full".to_string()))
            }
        });
        store
            .expect_delete_booking()
            .withf(move |id| *id == first)
            .times(1)
            .returning(|_| Ok(()));
        let gateway = MockPaymentGateway::new();

        let service = CheckoutService::new(Arc::new(store), Arc::new(gateway));
        let result = service.confirm(&ready_flow(PaymentMethod::OnSite), &buyer()).await;
        assert!(matches!(result, Err(CheckoutError::Store(_))));
    }

    #[actix_rt::test]
    async fn test_invoice_failure_rolls_back_records() {
        let mut store = MockBookingStore::new();
        store
            .expect_insert_booking()
            .times(2)
            .returning(|_| Ok(ObjectId::new()));
        store.expect_delete_booking().times(2).returning(|_| Ok(()));
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_invoice()
            .returning(|_| Err(PaymentError::Gateway("declined".to_string())));

        let service = CheckoutService::new(Arc::new(store), Arc::new(gateway));
        let result = service.confirm(&ready_flow(PaymentMethod::Online), &buyer()).await;
        assert!(matches!(result, Err(CheckoutError::Payment(_))));
    }
}

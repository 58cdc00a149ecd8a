#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;

use storage_booking_api::app::{self, AppState, Backends};
use storage_booking_api::db::memory::InMemoryStore;
use storage_booking_api::error::PaymentError;
use storage_booking_api::middleware::auth::Claims;
use storage_booking_api::models::location::{
    GeoPoint, PricingSettings, Rate, StorageCategory, StorageLocation, StorageSize,
};
use storage_booking_api::models::money::Money;
use storage_booking_api::models::voucher::{Voucher, VoucherScope};
use storage_booking_api::services::currency_service::CurrencyService;
use storage_booking_api::services::payment::interface::{Invoice, InvoiceRequest, PaymentGateway};
use storage_booking_api::services::rate_service::MissingRatePolicy;

pub const JWT_SECRET: &str = "test-secret";
pub const START: &str = "2026-03-01T00:00:00Z";
pub const END: &str = "2026-03-04T00:00:00Z";

/// Records invoice requests and either succeeds or declines all of them.
/// `yields` makes each call give up the executor that many times first.
#[derive(Default)]
pub struct FakeGateway {
    pub decline: bool,
    pub yields: usize,
    pub requests: Mutex<Vec<InvoiceRequest>>,
}

impl FakeGateway {
    pub fn declining() -> Self {
        Self {
            decline: true,
            ..Self::default()
        }
    }

    pub fn yielding(yields: usize) -> Self {
        Self {
            yields,
            ..Self::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<Invoice, PaymentError> {
        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }
        let reference = request.reference_id.clone();
        self.requests.lock().unwrap().push(request);
        if self.decline {
            return Err(PaymentError::Gateway("card declined".to_string()));
        }
        Ok(Invoice {
            invoice_url: format!("https://pay.example.com/{}", reference),
        })
    }
}

pub fn warehouse(id: &str, geolocation: Option<GeoPoint>) -> StorageLocation {
    StorageLocation {
        id: id.to_string(),
        name: format!("Warehouse {}", id),
        address: "Jl. Sunset Road 1".to_string(),
        geolocation,
        categories: vec![StorageCategory {
            name: "Boxes".to_string(),
            sizes: vec![StorageSize {
                name: "Medium".to_string(),
                description: "60x40x40".to_string(),
                capacity: 10,
                rates: vec![
                    Rate {
                        duration: "Daily".to_string(),
                        price: Money::from_cents(500),
                    },
                    Rate {
                        duration: "Monthly".to_string(),
                        price: Money::from_cents(9_000),
                    },
                ],
            }],
        }],
    }
}

pub fn seeded_store() -> InMemoryStore {
    InMemoryStore::new()
        .with_location(warehouse("loc-1", Some(GeoPoint::new(-8.65, 115.17))))
        .with_location(warehouse("loc-2", Some(GeoPoint::new(-8.70, 115.20))))
        .with_voucher(Voucher {
            code: "SPRING10".to_string(),
            discount_percent: 10.0,
            active: true,
            applies_to: VoucherScope::All,
            locations: None,
        })
        .with_voucher(Voucher {
            code: "FREE".to_string(),
            discount_percent: 100.0,
            active: true,
            applies_to: VoucherScope::All,
            locations: None,
        })
        .with_voucher(Voucher {
            code: "LOC2ONLY".to_string(),
            discount_percent: 20.0,
            active: true,
            applies_to: VoucherScope::Specific,
            locations: Some(vec!["loc-2".to_string()]),
        })
        .with_voucher(Voucher {
            code: "EXPIRED".to_string(),
            discount_percent: 50.0,
            active: false,
            applies_to: VoucherScope::All,
            locations: None,
        })
        .with_settings(PricingSettings {
            km_fee: Money::ZERO,
            pickup_fee: Money::from_cents(1_000),
        })
}

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub state: web::Data<AppState>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(seeded_store(), FakeGateway::default())
    }

    pub fn with(store: InMemoryStore, gateway: FakeGateway) -> Self {
        Self::with_draft_ttl(store, gateway, chrono::Duration::hours(1))
    }

    pub fn with_draft_ttl(
        store: InMemoryStore,
        gateway: FakeGateway,
        draft_ttl: chrono::Duration,
    ) -> Self {
        let store = Arc::new(store);
        let gateway = Arc::new(gateway);
        let state = web::Data::new(AppState::new(
            Backends {
                locations: store.clone(),
                vouchers: store.clone(),
                settings: store.clone(),
                bookings: store.clone(),
                handoffs: store.clone(),
                payments: gateway.clone(),
            },
            CurrencyService::new(None, "IDR"),
            MissingRatePolicy::Reject,
            chrono::Duration::minutes(30),
            draft_ttl,
        ));
        Self {
            store,
            gateway,
            state,
        }
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(self.state.clone())
            .configure(app::configure(JWT_SECRET))
    }
}

pub fn bearer_token(user_id: &str, email: &str) -> String {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: email.to_string(),
        exp: now + 3600,
        iat: now,
        user_id: user_id.to_string(),
        name: Some("Test Customer".to_string()),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

/// Calls the service and returns the status with the body parsed as JSON
/// (`Value::Null` for an empty or non-JSON body).
pub async fn send<S, R, B, E>(app: &S, req: R) -> (StatusCode, Value)
where
    S: Service<R, Response = ServiceResponse<B>, Error = E>,
    B: MessageBody,
    E: std::fmt::Debug,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub fn money(value: &Value) -> f64 {
    value.as_f64().unwrap_or_else(|| panic!("not a number: {}", value))
}

/// One Medium box per listed location over the default dates.
pub fn cart_body(locations: &[&str]) -> Value {
    let items: Vec<Value> = locations
        .iter()
        .map(|id| {
            serde_json::json!({
                "location_id": id,
                "category": "Boxes",
                "size": "Medium",
                "quantity": 1
            })
        })
        .collect();
    serde_json::json!({ "start_date": START, "end_date": END, "items": items })
}

/// Requests that take a fresh draft through a monthly self-dropoff booking
/// to the confirmation step with `payment_method` chosen.
pub fn walk_to_confirmation(id: &str, payment_method: &str) -> Vec<test::TestRequest> {
    vec![
        test::TestRequest::put()
            .uri(&format!("/api/drafts/{}/schedule", id))
            .set_json(serde_json::json!({ "start_date": START, "end_date": END, "duration": "Monthly" })),
        test::TestRequest::post().uri(&format!("/api/drafts/{}/next", id)),
        test::TestRequest::put()
            .uri(&format!("/api/drafts/{}/service", id))
            .set_json(serde_json::json!({ "service_type": "self-dropoff" })),
        test::TestRequest::post().uri(&format!("/api/drafts/{}/next", id)),
        test::TestRequest::put()
            .uri(&format!("/api/drafts/{}/payment", id))
            .set_json(serde_json::json!({ "payment_method": payment_method, "notes": "fragile" })),
    ]
}

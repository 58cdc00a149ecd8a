use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actix_web::web;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::db::repository::{BookingStore, HandoffStore, LocationStore, SettingsStore, VoucherStore};
use crate::error::ApiError;
use crate::middleware::auth::AuthMiddleware;
use crate::routes;
use crate::services::booking_flow::BookingFlow;
use crate::services::checkout_service::CheckoutService;
use crate::services::currency_service::CurrencyService;
use crate::services::handoff_service::HandoffService;
use crate::services::payment::interface::PaymentGateway;
use crate::services::rate_service::MissingRatePolicy;
use crate::services::voucher_service::VoucherService;

struct DraftEntry {
    flow: BookingFlow,
    touched: DateTime<Utc>,
}

/// In-progress booking wizards, keyed by draft id.
///
/// The lock is only held for synchronous work; handlers that need to await
/// either take a snapshot and write back through `update`, or `take` the flow
/// out so no other request can act on it meanwhile. A draft left alone for
/// `ttl` reads as missing and is dropped by the next `evict_expired_at`.
pub struct DraftRegistry {
    flows: Mutex<HashMap<String, DraftEntry>>,
    ttl: Duration,
}

impl DraftRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            flows: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn insert(&self, flow: BookingFlow) -> String {
        self.insert_at(flow, Utc::now())
    }

    pub fn insert_at(&self, flow: BookingFlow, now: DateTime<Utc>) -> String {
        let id = Uuid::new_v4().to_string();
        self.lock().insert(id.clone(), DraftEntry { flow, touched: now });
        id
    }

    pub fn snapshot(&self, id: &str) -> Result<BookingFlow, ApiError> {
        self.snapshot_at(id, Utc::now())
    }

    pub fn snapshot_at(&self, id: &str, now: DateTime<Utc>) -> Result<BookingFlow, ApiError> {
        let mut flows = self.lock();
        let entry = live(&mut flows, id, now, self.ttl)?;
        Ok(entry.flow.clone())
    }

    pub fn update<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut BookingFlow) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut flows = self.lock();
        let entry = live(&mut flows, id, Utc::now(), self.ttl)?;
        f(&mut entry.flow)
    }

    /// Removes a live draft and hands it to the caller. A second `take` for
    /// the same id fails until the flow is put back with `restore`.
    pub fn take(&self, id: &str) -> Result<BookingFlow, ApiError> {
        let mut flows = self.lock();
        live(&mut flows, id, Utc::now(), self.ttl)?;
        flows
            .remove(id)
            .map(|entry| entry.flow)
            .ok_or_else(|| draft_not_found(id))
    }

    pub fn restore(&self, id: &str, flow: BookingFlow) {
        self.lock().insert(
            id.to_string(),
            DraftEntry {
                flow,
                touched: Utc::now(),
            },
        );
    }

    pub fn remove(&self, id: &str) -> Option<BookingFlow> {
        self.lock().remove(id).map(|entry| entry.flow)
    }

    /// Drops every draft idle for at least `ttl` and returns their ids.
    pub fn evict_expired_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut expired = Vec::new();
        self.lock().retain(|id, entry| {
            let keep = now - entry.touched < self.ttl;
            if !keep {
                expired.push(id.clone());
            }
            keep
        });
        expired
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DraftEntry>> {
        self.flows.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Looks up a draft that has not expired and marks it as touched.
fn live<'a>(
    flows: &'a mut HashMap<String, DraftEntry>,
    id: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<&'a mut DraftEntry, ApiError> {
    match flows.get_mut(id) {
        Some(entry) if now - entry.touched < ttl => {
            entry.touched = now;
            Ok(entry)
        }
        _ => Err(draft_not_found(id)),
    }
}

fn draft_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("draft {} not found", id))
}

/// Everything the HTTP handlers share.
pub struct AppState {
    pub locations: Arc<dyn LocationStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub vouchers: VoucherService,
    pub checkout: CheckoutService,
    pub handoffs: HandoffService,
    pub currency: CurrencyService,
    pub drafts: DraftRegistry,
    pub policy: MissingRatePolicy,
}

/// Stores and gateways `AppState` is assembled from.
pub struct Backends {
    pub locations: Arc<dyn LocationStore>,
    pub vouchers: Arc<dyn VoucherStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub handoffs: Arc<dyn HandoffStore>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(
        backends: Backends,
        currency: CurrencyService,
        policy: MissingRatePolicy,
        handoff_ttl: Duration,
        draft_ttl: Duration,
    ) -> Self {
        Self {
            locations: backends.locations,
            settings: backends.settings,
            vouchers: VoucherService::new(backends.vouchers),
            checkout: CheckoutService::new(backends.bookings, backends.payments),
            handoffs: HandoffService::new(backends.handoffs, handoff_ttl),
            currency,
            drafts: DraftRegistry::new(draft_ttl),
            policy,
        }
    }

    /// Drops drafts idle past the draft TTL along with their local-price
    /// sequence entries.
    pub fn evict_idle_drafts(&self) -> usize {
        self.evict_idle_drafts_at(Utc::now())
    }

    pub fn evict_idle_drafts_at(&self, now: DateTime<Utc>) -> usize {
        let expired = self.drafts.evict_expired_at(now);
        for id in &expired {
            self.currency.forget(id);
        }
        if !expired.is_empty() {
            log::info!("Evicted {} idle draft(s)", expired.len());
        }
        expired.len()
    }
}

/// Registers the `/api` routes. `jwt_secret` verifies bearer sessions on the
/// draft endpoints.
pub fn configure(jwt_secret: &str) -> impl FnOnce(&mut web::ServiceConfig) + '_ {
    move |cfg| {
        cfg.route("/health", web::get().to(routes::health::health_check));
        cfg.service(
            web::scope("/api")
                .route("/locations", web::get().to(routes::location::get_locations))
                .route("/locations/{id}", web::get().to(routes::location::get_location))
                .route("/vouchers/{code}", web::get().to(routes::voucher::check_voucher))
                .service(
                    web::scope("/drafts")
                        .wrap(AuthMiddleware::new(jwt_secret))
                        .route("", web::post().to(routes::draft::create_draft))
                        .route(
                            "/resume/{token}",
                            web::post().to(routes::checkout::resume_draft),
                        )
                        .route("/{id}", web::get().to(routes::draft::get_draft))
                        .route("/{id}", web::delete().to(routes::draft::discard_draft))
                        .route("/{id}/schedule", web::put().to(routes::draft::set_schedule))
                        .route("/{id}/service", web::put().to(routes::draft::set_service))
                        .route("/{id}/pickup", web::put().to(routes::draft::confirm_pickup))
                        .route(
                            "/{id}/pickup/cancel",
                            web::post().to(routes::draft::cancel_pickup),
                        )
                        .route("/{id}/voucher", web::put().to(routes::draft::apply_voucher))
                        .route(
                            "/{id}/voucher",
                            web::delete().to(routes::draft::remove_voucher),
                        )
                        .route("/{id}/payment", web::put().to(routes::draft::set_payment))
                        .route("/{id}/next", web::post().to(routes::draft::next_step))
                        .route("/{id}/back", web::post().to(routes::draft::previous_step))
                        .route(
                            "/{id}/local-price",
                            web::get().to(routes::draft::local_price),
                        )
                        .route("/{id}/confirm", web::post().to(routes::checkout::confirm)),
                ),
        );
    }
}

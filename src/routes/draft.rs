use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::{ApiError, FlowError};
use crate::models::draft::{BookingDraft, DateRange, PaymentMethod, PickupDetails, ServiceType, Step};
use crate::models::location::StorageLocation;
use crate::services::booking_flow::BookingFlow;
use crate::services::pricing_service::PriceBreakdown;
use crate::services::rate_service::validate_location;

#[derive(Debug, Serialize)]
pub struct DraftView {
    pub draft_id: String,
    pub step: Step,
    pub step_number: u8,
    pub draft: BookingDraft,
    pub totals: PriceBreakdown,
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub reopen_modal: bool,
}

impl DraftView {
    pub fn of(draft_id: &str, flow: &BookingFlow) -> Self {
        Self {
            draft_id: draft_id.to_string(),
            step: flow.step(),
            step_number: flow.step().number(),
            draft: flow.draft().clone(),
            totals: flow.totals().clone(),
            issues: flow.totals().issue_messages(),
            reopen_modal: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Selection {
    pub location_id: String,
    pub category: String,
    pub size: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct CreateDraftRequest {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub items: Vec<Selection>,
}

pub async fn create_draft(
    state: web::Data<AppState>,
    body: web::Json<CreateDraftRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    let mut draft = BookingDraft::new(DateRange::new(request.start_date, request.end_date)?);

    let mut locations: BTreeMap<String, StorageLocation> = BTreeMap::new();
    for selection in &request.items {
        if !locations.contains_key(&selection.location_id) {
            let location = state
                .locations
                .find_location(&selection.location_id)
                .await?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("location {} not found", selection.location_id))
                })?;
            validate_location(&location).map_err(FlowError::from)?;
            locations.insert(location.id.clone(), location);
        }
        if let Some(location) = locations.get(&selection.location_id) {
            draft.add_item(
                location,
                &selection.category,
                &selection.size,
                selection.quantity,
            )?;
        }
    }

    let settings = state.settings.pricing_settings().await?;
    let flow = BookingFlow::new(draft, settings, state.policy)?;
    state.evict_idle_drafts();
    let id = state.drafts.insert(flow.clone());
    log::info!(
        "Created draft {} with {} item(s) across {} location(s)",
        id,
        flow.draft().total_items(),
        locations.len()
    );

    Ok(HttpResponse::Created().json(DraftView::of(&id, &flow)))
}

pub async fn get_draft(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let flow = state.drafts.snapshot(&id)?;
    Ok(HttpResponse::Ok().json(DraftView::of(&id, &flow)))
}

pub async fn discard_draft(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    state
        .drafts
        .remove(&id)
        .ok_or_else(|| ApiError::NotFound(format!("draft {} not found", id)))?;
    state.currency.forget(&id);
    Ok(HttpResponse::NoContent().finish())
}

/// Runs a synchronous wizard action and answers with the updated draft.
fn apply(
    state: &AppState,
    id: &str,
    action: impl FnOnce(&mut BookingFlow) -> Result<(), FlowError>,
) -> Result<HttpResponse, ApiError> {
    let view = state.drafts.update(id, |flow| {
        action(flow)?;
        Ok(DraftView::of(id, flow))
    })?;
    Ok(HttpResponse::Ok().json(view))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration: Option<String>,
}

pub async fn set_schedule(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ScheduleRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    apply(&state, &path, |flow| {
        flow.set_schedule(request.start_date, request.end_date, request.duration)
            .map(|_| ())
    })
}

#[derive(Debug, Deserialize)]
pub struct ServiceTypeRequest {
    pub service_type: ServiceType,
}

pub async fn set_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ServiceTypeRequest>,
) -> Result<HttpResponse, ApiError> {
    apply(&state, &path, |flow| {
        flow.set_service_type(body.service_type).map(|_| ())
    })
}

pub async fn confirm_pickup(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PickupDetails>,
) -> Result<HttpResponse, ApiError> {
    let details = body.into_inner();
    apply(&state, &path, |flow| flow.confirm_pickup(details).map(|_| ()))
}

pub async fn cancel_pickup(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    apply(&state, &path, |flow| flow.cancel_pickup().map(|_| ()))
}

#[derive(Debug, Deserialize)]
pub struct VoucherRequest {
    pub code: String,
}

pub async fn apply_voucher(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<VoucherRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let location_ids: Vec<String> = state
        .drafts
        .snapshot(&id)?
        .draft()
        .locations_to_book
        .keys()
        .cloned()
        .collect();

    let voucher = state.vouchers.resolve(&body.code, &location_ids).await?;
    log::info!("Applied voucher {} to draft {}", voucher.code, id);
    apply(&state, &id, |flow| {
        flow.apply_voucher(voucher);
        Ok(())
    })
}

pub async fn remove_voucher(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    apply(&state, &path, |flow| {
        flow.remove_voucher();
        Ok(())
    })
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

pub async fn set_payment(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PaymentRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    apply(&state, &path, |flow| {
        flow.set_payment(request.payment_method, request.notes)
            .map(|_| ())
    })
}

pub async fn next_step(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    apply(&state, &path, |flow| flow.next().map(|_| ()))
}

pub async fn previous_step(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    apply(&state, &path, |flow| flow.back().map(|_| ()))
}

pub async fn local_price(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let total = state.drafts.snapshot(&id)?.totals().final_price;
    let price = state.currency.convert(&id, total).await;
    Ok(HttpResponse::Ok().json(price))
}

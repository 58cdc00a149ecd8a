use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::routes::draft::DraftView;
use crate::services::booking_flow::BookingFlow;

/// Submits the draft. Guests get their draft parked under a handoff token and
/// a 401 telling the client to sign in and resume.
///
/// The flow is taken out of the registry for the duration of the submission,
/// so a repeated confirm for the same draft finds nothing to submit. On
/// failure it is put back for a retry.
pub async fn confirm(
    state: web::Data<AppState>,
    path: web::Path<String>,
    user: Option<AuthenticatedUser>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let flow = state.drafts.take(&id)?;
    if let Err(err) = flow.validate_submission() {
        state.drafts.restore(&id, flow);
        return Err(err.into());
    }

    let Some(user) = user else {
        let token = match state.handoffs.stash(flow.draft().clone()).await {
            Ok(token) => token,
            Err(err) => {
                state.drafts.restore(&id, flow);
                return Err(err.into());
            }
        };
        state.currency.forget(&id);
        return Ok(HttpResponse::Unauthorized().json(json!({
            "error": "Sign in to complete your booking",
            "handoff_token": token,
        })));
    };

    let outcome = match state.checkout.confirm(&flow, &user.buyer()).await {
        Ok(outcome) => outcome,
        Err(err) => {
            state.drafts.restore(&id, flow);
            return Err(err.into());
        }
    };
    state.currency.forget(&id);
    log::info!(
        "Draft {} checked out as {} for user {}",
        id,
        outcome.checkout_id,
        user.user_id
    );

    Ok(HttpResponse::Ok().json(outcome))
}

/// Restores a parked draft for the now signed-in customer, on the
/// confirmation step with prices recomputed against current settings.
pub async fn resume_draft(
    state: web::Data<AppState>,
    path: web::Path<String>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let token = path.into_inner();
    let draft = state.handoffs.redeem(&token).await?;
    let settings = state.settings.pricing_settings().await?;
    let flow = BookingFlow::resume(draft, settings, state.policy)?;

    state.evict_idle_drafts();
    let id = state.drafts.insert(flow.clone());
    log::info!("User {} resumed handed-off draft as {}", user.user_id, id);

    let mut view = DraftView::of(&id, &flow);
    view.reopen_modal = true;
    Ok(HttpResponse::Ok().json(view))
}

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct VoucherQuery {
    /// Comma separated location ids the voucher should cover.
    locations: Option<String>,
}

pub async fn check_voucher(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<VoucherQuery>,
) -> Result<HttpResponse, ApiError> {
    let location_ids: Vec<String> = query
        .locations
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    let voucher = state.vouchers.resolve(&path, &location_ids).await?;
    Ok(HttpResponse::Ok().json(voucher))
}

use actix_web::{web, HttpResponse};

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::rate_service::validate_location;

#[derive(serde::Deserialize)]
pub struct QueryParams {
    limit: Option<u16>,
    search: Option<String>,
}

pub async fn get_locations(
    state: web::Data<AppState>,
    params: web::Query<QueryParams>,
) -> Result<HttpResponse, ApiError> {
    let params = params.into_inner();
    let search = params.search.filter(|s| !s.trim().is_empty());
    let locations = state.locations.list_locations(search, params.limit).await?;

    // misconfigured rate tables are hidden rather than priced wrongly later
    let bookable: Vec<_> = locations
        .into_iter()
        .filter(|location| match validate_location(location) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Skipping location {}: {}", location.id, err);
                false
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(bookable))
}

pub async fn get_location(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let location = state
        .locations
        .find_location(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("location {} not found", id)))?;
    Ok(HttpResponse::Ok().json(location))
}

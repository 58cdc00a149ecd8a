use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::draft::Step;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("no '{duration}' rate configured for size {size}")]
    RateNotFound { size: String, duration: String },
    #[error("size {size} has more than one '{duration}' rate")]
    DuplicateRate { size: String, duration: String },
    #[error("size {size} has an invalid price for '{duration}'")]
    InvalidPrice { size: String, duration: String },
    #[error("pickup geolocation has not been captured")]
    MissingPickupGeolocation,
    #[error("location {0} has no geolocation")]
    MissingLocationGeolocation(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    #[error("no storage selected")]
    EmptyCart,
    #[error("size {size} not found in {category} at location {location}")]
    UnknownSize {
        location: String,
        category: String,
        size: String,
    },
    #[error("quantity {requested} for {size} must be between 1 and {capacity}")]
    InvalidQuantity {
        size: String,
        requested: u32,
        capacity: u32,
    },
    #[error("select a duration first")]
    DurationMissing,
    #[error("end date must not be before start date")]
    InvalidDateRange,
    #[error("select a service type first")]
    ServiceTypeMissing,
    #[error("pickup details incomplete: {0}")]
    PickupDetailsIncomplete(&'static str),
    #[error("select a payment method first")]
    PaymentMethodMissing,
    #[error("not allowed at step {actual:?}, expected {expected:?}")]
    WrongStep { expected: Step, actual: Step },
    #[error("already at the first step")]
    AtFirstStep,
    #[error("already at the last step")]
    AtLastStep,
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum VoucherError {
    #[error("voucher {0} does not exist")]
    NotFound(String),
    #[error("voucher {0} is no longer active")]
    Inactive(String),
    #[error("voucher {0} does not apply to the selected locations")]
    NotApplicable(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment gateway error: {0}")]
    Gateway(String),
    #[error("payment gateway returned no invoice url")]
    MissingInvoiceUrl,
    #[error("invalid invoice amount {0}")]
    InvalidAmount(String),
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("failed to persist booking: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("handoff token not found or already used")]
    NotFound,
    #[error("handoff token expired")]
    Expired,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum CurrencyError {
    #[error("exchange rate request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("exchange rate service error: {0}")]
    Api(String),
    #[error("no rate for currency {0}")]
    UnknownCurrency(String),
    #[error("currency conversion is not configured")]
    Disabled,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Error type returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error(transparent)]
    Voucher(#[from] VoucherError),
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
    #[error(transparent)]
    Handoff(#[from] HandoffError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Flow(FlowError::WrongStep { .. })
            | ApiError::Flow(FlowError::AtFirstStep)
            | ApiError::Flow(FlowError::AtLastStep) => StatusCode::CONFLICT,
            ApiError::Flow(_) => StatusCode::BAD_REQUEST,
            ApiError::Voucher(VoucherError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Voucher(VoucherError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Voucher(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Checkout(CheckoutError::Flow(_)) => StatusCode::BAD_REQUEST,
            ApiError::Checkout(CheckoutError::Payment(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Checkout(CheckoutError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Handoff(HandoffError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Handoff(HandoffError::Expired) => StatusCode::GONE,
            ApiError::Handoff(HandoffError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // internal details stay in the log
        let message = if status.is_server_error() {
            log::error!("{}", self);
            match status {
                StatusCode::BAD_GATEWAY => "Payment could not be started".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(serde_json::json!({ "error": message }))
    }
}

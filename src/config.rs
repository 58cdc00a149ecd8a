use std::str::FromStr;

use crate::error::ConfigError;
use crate::services::rate_service::MissingRatePolicy;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;
const DATABASE: &str = "StorageBooking";
const EXCHANGE_RATE_BASE_URL: &str = "https://v6.exchangerate-api.com/v6";
const LOCAL_CURRENCY: &str = "IDR";
const HANDOFF_TTL_SECS: i64 = 1800;
const DRAFT_TTL_SECS: i64 = 3600;
const HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub database: String,
    pub stripe_secret_key: String,
    pub payment_success_url: String,
    pub payment_cancel_url: String,
    pub exchange_rate_api_key: Option<String>,
    pub exchange_rate_base_url: String,
    pub local_currency: String,
    pub jwt_secret: String,
    pub missing_rate_policy: MissingRatePolicy,
    pub handoff_ttl_secs: i64,
    pub draft_ttl_secs: i64,
    pub http_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| HOST.to_string()),
            port: parse_or(&get, "PORT", PORT)?,
            mongodb_uri: required("MONGODB_URI")?,
            database: get("MONGODB_DATABASE").unwrap_or_else(|| DATABASE.to_string()),
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            payment_success_url: get("PAYMENT_SUCCESS_URL")
                .unwrap_or_else(|| "http://localhost:3000/bookings".to_string()),
            payment_cancel_url: get("PAYMENT_CANCEL_URL")
                .unwrap_or_else(|| "http://localhost:3000/checkout".to_string()),
            exchange_rate_api_key: get("EXCHANGE_RATE_API_KEY"),
            exchange_rate_base_url: get("EXCHANGE_RATE_BASE_URL")
                .unwrap_or_else(|| EXCHANGE_RATE_BASE_URL.to_string()),
            local_currency: get("LOCAL_CURRENCY").unwrap_or_else(|| LOCAL_CURRENCY.to_string()),
            jwt_secret: required("JWT_SECRET")?,
            missing_rate_policy: parse_or(&get, "MISSING_RATE_POLICY", MissingRatePolicy::Reject)?,
            handoff_ttl_secs: parse_or(&get, "HANDOFF_TTL_SECS", HANDOFF_TTL_SECS)?,
            draft_ttl_secs: parse_or(&get, "DRAFT_TTL_SECS", DRAFT_TTL_SECS)?,
            http_timeout_secs: parse_or(&get, "HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS)?,
        })
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

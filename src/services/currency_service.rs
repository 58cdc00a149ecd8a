//! Approximate local-currency display for a USD total.
//!
//! Purely informational: the USD amount stays authoritative and a failed
//! lookup only produces an "unavailable" notice. Lookups for the same draft
//! are sequenced so a slow response cannot replace a newer one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CurrencyError;
use crate::models::money::Money;

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Units of `currency` per one US dollar.
    async fn usd_rate(&self, currency: &str) -> Result<f64, CurrencyError>;
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: Option<String>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
}

pub struct ExchangeRateClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ExchangeRateClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CurrencyError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl RateSource for ExchangeRateClient {
    async fn usd_rate(&self, currency: &str) -> Result<f64, CurrencyError> {
        let url = format!(
            "{}/{}/latest/USD",
            self.base_url.trim_end_matches('/'),
            self.api_key
        );
        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CurrencyError::Api(format!("status {}", response.status())));
        }
        let body: LatestRatesResponse = response.json().await?;

        if body.result.as_deref() == Some("error") {
            return Err(CurrencyError::Api(
                body.error_type.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let code = currency.to_uppercase();
        body.conversion_rates
            .get(&code)
            .copied()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .ok_or(CurrencyError::UnknownCurrency(code))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocalPrice {
    Converted {
        usd: Money,
        currency: String,
        rate: f64,
        amount: f64,
    },
    Unavailable {
        usd: Money,
        notice: String,
    },
    /// A newer lookup for the same draft was started; the client should ignore this one.
    Stale { sequence: u64 },
}

/// Issues monotonically increasing tickets per key and tells whether a ticket
/// is still the latest one.
#[derive(Default)]
pub struct SequenceGuard {
    counter: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl SequenceGuard {
    pub fn issue(&self, key: &str) -> u64 {
        let ticket = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let mut latest = self.latest.lock().unwrap_or_else(|p| p.into_inner());
        latest.insert(key.to_string(), ticket);
        ticket
    }

    pub fn is_latest(&self, key: &str, ticket: u64) -> bool {
        let latest = self.latest.lock().unwrap_or_else(|p| p.into_inner());
        latest.get(key).copied() == Some(ticket)
    }

    pub fn forget(&self, key: &str) {
        let mut latest = self.latest.lock().unwrap_or_else(|p| p.into_inner());
        latest.remove(key);
    }
}

pub struct CurrencyService {
    source: Option<Arc<dyn RateSource>>,
    currency: String,
    guard: SequenceGuard,
}

impl CurrencyService {
    pub fn new(source: Option<Arc<dyn RateSource>>, currency: impl Into<String>) -> Self {
        Self {
            source,
            currency: currency.into().to_uppercase(),
            guard: SequenceGuard::default(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub async fn convert(&self, draft_key: &str, usd: Money) -> LocalPrice {
        let ticket = self.guard.issue(draft_key);

        let result = match &self.source {
            Some(source) => source.usd_rate(&self.currency).await,
            None => Err(CurrencyError::Disabled),
        };

        if !self.guard.is_latest(draft_key, ticket) {
            log::debug!("Dropping stale rate response {} for {}", ticket, draft_key);
            return LocalPrice::Stale { sequence: ticket };
        }

        match result {
            Ok(rate) => LocalPrice::Converted {
                usd,
                currency: self.currency.clone(),
                rate,
                amount: (usd.to_dollars() * rate * 100.0).round() / 100.0,
            },
            Err(err) => {
                log::warn!("Could not fetch {} rate: {}", self.currency, err);
                LocalPrice::Unavailable {
                    usd,
                    notice: "Could not fetch exchange rate".to_string(),
                }
            }
        }
    }

    pub fn forget(&self, draft_key: &str) {
        self.guard.forget(draft_key);
    }
}

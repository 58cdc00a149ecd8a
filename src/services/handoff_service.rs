use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::db::repository::{DraftHandoff, HandoffStore};
use crate::error::HandoffError;
use crate::models::draft::BookingDraft;

/// Parks a draft while an anonymous customer signs in. The token is handed to
/// the client and redeemed exactly once after authentication.
pub struct HandoffService {
    store: Arc<dyn HandoffStore>,
    ttl: Duration,
}

impl HandoffService {
    pub fn new(store: Arc<dyn HandoffStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn stash(&self, draft: BookingDraft) -> Result<String, HandoffError> {
        self.stash_at(draft, Utc::now()).await
    }

    pub async fn stash_at(
        &self,
        draft: BookingDraft,
        now: DateTime<Utc>,
    ) -> Result<String, HandoffError> {
        let handoff = DraftHandoff {
            token: Uuid::new_v4().to_string(),
            draft,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.store.put_handoff(&handoff).await?;
        log::info!("Parked draft under handoff token {}", handoff.token);
        Ok(handoff.token)
    }

    pub async fn redeem(&self, token: &str) -> Result<BookingDraft, HandoffError> {
        self.redeem_at(token, Utc::now()).await
    }

    pub async fn redeem_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<BookingDraft, HandoffError> {
        let handoff = self
            .store
            .take_handoff(token)
            .await?
            .ok_or(HandoffError::NotFound)?;
        if handoff.expires_at < now {
            log::info!("Handoff token {} expired", token);
            return Err(HandoffError::Expired);
        }
        Ok(handoff.draft)
    }
}

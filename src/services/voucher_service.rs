use std::sync::Arc;

use crate::db::repository::VoucherStore;
use crate::error::VoucherError;
use crate::models::voucher::Voucher;

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Looks vouchers up by code. Resolution is read-only: redemptions are not
/// recorded, so the same code can be applied any number of times.
pub struct VoucherService {
    store: Arc<dyn VoucherStore>,
}

impl VoucherService {
    pub fn new(store: Arc<dyn VoucherStore>) -> Self {
        Self { store }
    }

    /// Resolves `code` for a cart spanning `location_ids`. An empty slice skips
    /// the location scope check.
    pub async fn resolve(
        &self,
        code: &str,
        location_ids: &[String],
    ) -> Result<Voucher, VoucherError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(VoucherError::NotFound(code));
        }

        let voucher = self
            .store
            .find_voucher(&code)
            .await?
            .ok_or_else(|| VoucherError::NotFound(code.clone()))?;

        if !voucher.active {
            return Err(VoucherError::Inactive(code));
        }
        if !location_ids.is_empty() && !location_ids.iter().any(|id| voucher.covers_location(id)) {
            return Err(VoucherError::NotApplicable(code));
        }

        log::debug!("Resolved voucher {} ({}%)", code, voucher.discount_percent);
        Ok(voucher)
    }
}

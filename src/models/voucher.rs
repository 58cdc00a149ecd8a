use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherScope {
    #[default]
    All,
    Specific,
}

/// Read from the `Vouchers` collection, where the code is the document `_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    #[serde(alias = "_id")]
    pub code: String,
    pub discount_percent: f64,
    pub active: bool,
    #[serde(default)]
    pub applies_to: VoucherScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<String>>,
}

impl Voucher {
    /// Percentage clamped into 0..=100.
    pub fn effective_percent(&self) -> f64 {
        if self.discount_percent.is_finite() {
            self.discount_percent.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    pub fn covers_location(&self, location_id: &str) -> bool {
        match self.applies_to {
            VoucherScope::All => true,
            VoucherScope::Specific => self
                .locations
                .as_ref()
                .is_some_and(|ids| ids.iter().any(|id| id == location_id)),
        }
    }
}

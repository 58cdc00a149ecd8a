use async_trait::async_trait;
use serde::Serialize;

use crate::error::PaymentError;
use crate::models::money::Money;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRequest {
    pub amount: Money,
    pub reference_id: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub invoice_url: String,
}

/// Outbound payment gateway. Creating an invoice is the only operation the
/// booking flow needs; the customer is redirected to the returned url.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<Invoice, PaymentError>;
}

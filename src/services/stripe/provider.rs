use async_trait::async_trait;
use stripe::{
    CheckoutSession, CheckoutSessionMode, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData, CreateCheckoutSessionLineItemsPriceDataProductData,
    Currency,
};

use crate::error::PaymentError;
use crate::services::payment::interface::{Invoice, InvoiceRequest, PaymentGateway};

/// Hosted Stripe Checkout page standing in for a payment invoice.
pub struct StripeProvider {
    pub client: stripe::Client,
    success_url: String,
    cancel_url: String,
}

impl StripeProvider {
    pub fn new(
        api_key: impl Into<String>,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            client: stripe::Client::new(api_key.into()),
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeProvider {
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<Invoice, PaymentError> {
        if request.amount.cents() <= 0 {
            return Err(PaymentError::InvalidAmount(request.amount.to_string()));
        }

        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Payment);
        params.success_url = Some(self.success_url.as_str());
        params.cancel_url = Some(self.cancel_url.as_str());
        params.client_reference_id = Some(request.reference_id.as_str());
        params.customer_email = Some(request.buyer_email.as_str());
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: Currency::USD,
                unit_amount: Some(request.amount.cents()),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: request.description.clone(),
                    description: Some(format!("Booking for {}", request.buyer_name)),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = CheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| {
                log::error!("Error creating checkout session: {:?}", e);
                PaymentError::Gateway(e.to_string())
            })?;

        let invoice_url = session.url.ok_or(PaymentError::MissingInvoiceUrl)?;
        log::info!(
            "Created checkout session {} for reference {}",
            session.id,
            request.reference_id
        );
        Ok(Invoice { invoice_url })
    }
}

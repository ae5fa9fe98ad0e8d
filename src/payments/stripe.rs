//! Minimal Stripe client: PaymentIntent creation over the REST API.

use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, instrument, warn};

use crate::error::ApiError;

const STRIPE_API: &str = "https://api.stripe.com/v1";

#[derive(Clone)]
pub struct StripeClient {
    secret_key: String,
    http: reqwest::Client,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
    pub amount: i64,
    pub currency: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self { secret_key: secret_key.into(), http: reqwest::Client::new() }
    }

    /// `amount` is in minor units (cents).
    #[instrument(skip(self, metadata))]
    pub async fn create_payment_intent(&self, amount: i64, currency: &str, metadata: HashMap<String, String>) -> Result<PaymentIntent, ApiError> {
        let mut params: HashMap<String, String> = HashMap::new();
        params.insert("amount".into(), amount.to_string());
        params.insert("currency".into(), currency.to_lowercase());
        params.insert("automatic_payment_methods[enabled]".into(), "true".into());
        for (key, value) in metadata {
            params.insert(format!("metadata[{}]", key), value);
        }

        let response = self.http
            .post(format!("{}/payment_intents", STRIPE_API))
            .basic_auth(&self.secret_key, Some(""))
            .form(&params)
            .send()
            .await
            .map_err(|e| ApiError::Internal(format!("Stripe request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "Stripe rejected payment intent");
            return Err(if status.is_client_error() {
                ApiError::PaymentDeclined("Payment provider rejected the request".into())
            } else {
                ApiError::Internal(format!("Stripe error {}: {}", status, body))
            });
        }

        let intent: PaymentIntent = response.json().await.map_err(|e| ApiError::Internal(format!("Failed to parse Stripe response: {}", e)))?;
        info!(payment_intent = %intent.id, "payment intent created");
        Ok(intent)
    }
}

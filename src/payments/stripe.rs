use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};

pub const CURRENCY: &str = "gbp";

#[derive(Debug, Clone)]
pub struct PaymentMetadata {
    pub user_id: i64,
    pub username: String,
    pub plan_id: i64,
    pub frequency_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

pub struct StripeClient {
    client: Client,
    api_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(api_url: String, secret_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("infocrumbs/1.0")
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    /// Create a card payment intent for `amount_pence`. The metadata is
    /// echoed back on the webhook and drives reconciliation there.
    pub async fn create_payment_intent(
        &self,
        amount_pence: i64,
        metadata: &PaymentMetadata,
    ) -> Result<PaymentIntent> {
        let form = [
            ("amount", amount_pence.to_string()),
            ("currency", CURRENCY.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[user_id]", metadata.user_id.to_string()),
            ("metadata[username]", metadata.username.clone()),
            ("metadata[plan_id]", metadata.plan_id.to_string()),
            ("metadata[frequency_id]", metadata.frequency_id.to_string()),
        ];

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<StripeErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| format!("HTTP {}", status));
            tracing::error!("Stripe rejected payment intent: {}", message);
            return Err(AppError::Payment(message));
        }

        let intent: PaymentIntent = response.json().await?;
        tracing::info!("Created payment intent {} for {}", intent.id, metadata.username);
        Ok(intent)
    }
}

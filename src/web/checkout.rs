use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::calculate_subscription_price;
use crate::payments::{PaymentMetadata, WebhookHandler};

use super::auth::CurrentUser;
use super::{ApiError, ApiJson, AppState};

const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    plan_id: i64,
    frequency_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

/// Price the requested plan and open a payment intent for it.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let plan = state
        .repository
        .get_plan(body.plan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Plan {} not found", body.plan_id)))?;
    let frequency = state
        .repository
        .get_frequency(body.frequency_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Frequency {} not found", body.frequency_id)))?;

    let amount = calculate_subscription_price(&plan.name, frequency.duration_days)
        .ok_or_else(|| ApiError::BadRequest("Invalid plan and frequency combination.".into()))?;

    let stripe = state
        .stripe
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("Payments are not configured.".into()))?;

    let metadata = PaymentMetadata {
        user_id: user.id,
        username: user.username.clone(),
        plan_id: plan.id,
        frequency_id: frequency.id,
    };
    let intent = stripe
        .create_payment_intent(amount, &metadata)
        .await
        .map_err(|e| {
            tracing::warn!("Payment intent for {} failed: {}", user.username, e);
            ApiError::BadRequest(e.to_string())
        })?;

    Ok(Json(CheckoutResponse {
        client_secret: intent.client_secret,
    }))
}

/// Payment provider callback. Takes the raw body since the signature
/// covers the exact bytes.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let handler = WebhookHandler::new(&state.repository, state.webhook_secret.as_deref());
    match handler.handle(&body, signature, Utc::now()).await {
        Ok(message) => Ok(Json(json!({ "message": message }))),
        Err(e) => {
            tracing::warn!("Webhook refused: {}", e);
            Err(e.into())
        }
    }
}

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::db::{Reconciliation, Repository};
use crate::error::AppError;
use crate::models::User;

use super::signature::{verify_stripe_signature, SignatureError};

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// Why a webhook delivery was refused. Everything except `Internal` maps
/// to a 400 so the provider retries the delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Invalid signature: {0}")]
    Signature(String),

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error("{0}")]
    Metadata(String),

    #[error(transparent)]
    Internal(#[from] AppError),
}

impl From<SignatureError> for WebhookError {
    fn from(e: SignatureError) -> Self {
        WebhookError::Signature(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: EventData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EventData {
    object: PaymentIntentObject,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PaymentIntentObject {
    id: Option<String>,
    metadata: Map<String, Value>,
}

impl PaymentIntentObject {
    /// Metadata values are strings on the wire, but plain numbers are
    /// accepted too.
    fn metadata_id(&self, key: &str) -> Option<i64> {
        match self.metadata.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Applies verified payment events to user subscriptions.
pub struct WebhookHandler<'a> {
    repository: &'a Repository,
    secret: Option<&'a str>,
}

impl<'a> WebhookHandler<'a> {
    pub fn new(repository: &'a Repository, secret: Option<&'a str>) -> Self {
        Self { repository, secret }
    }

    /// Verify and apply one delivery. Returns the message to acknowledge
    /// it with.
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, WebhookError> {
        let secret = self
            .secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| WebhookError::Signature("webhook secret is not configured".into()))?;
        let signature = signature
            .ok_or_else(|| WebhookError::Signature("missing Stripe-Signature header".into()))?;
        verify_stripe_signature(payload, signature, secret, now.timestamp())?;

        let event: WebhookEvent =
            serde_json::from_slice(payload).map_err(|e| WebhookError::Payload(e.to_string()))?;

        match event.event_type.as_str() {
            PAYMENT_SUCCEEDED => self.payment_succeeded(&event.data.object, now).await,
            PAYMENT_FAILED => self.payment_failed(&event.data.object).await,
            other => {
                tracing::info!("Unhandled webhook event type {}", other);
                Ok(format!("Unhandled webhook received: {}", other))
            }
        }
    }

    async fn payment_succeeded(
        &self,
        intent: &PaymentIntentObject,
        now: DateTime<Utc>,
    ) -> Result<String, WebhookError> {
        let payment_intent_id = intent
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| WebhookError::Metadata("Missing payment intent id".into()))?;

        let (Some(plan_id), Some(frequency_id)) =
            (intent.metadata_id("plan_id"), intent.metadata_id("frequency_id"))
        else {
            tracing::warn!("Payment {} is missing plan or frequency metadata", payment_intent_id);
            return Err(WebhookError::Metadata(
                "Missing plan_id or frequency_id in metadata".into(),
            ));
        };

        let plan = self
            .repository
            .get_plan(plan_id)
            .await?
            .ok_or_else(|| WebhookError::Metadata(format!("Unknown plan {}", plan_id)))?;
        let frequency = self
            .repository
            .get_frequency(frequency_id)
            .await?
            .ok_or_else(|| WebhookError::Metadata(format!("Unknown frequency {}", frequency_id)))?;
        let user = self
            .resolve_user(intent)
            .await?
            .ok_or_else(|| WebhookError::Metadata("Missing or unknown user in metadata".into()))?;

        let outcome = self
            .repository
            .reconcile_payment(user.id, &plan, &frequency, payment_intent_id, now)
            .await?;

        let message = match outcome {
            Reconciliation::Replayed { repaired } => {
                tracing::info!(
                    "Payment {} already processed for {} (repaired: {})",
                    payment_intent_id,
                    user.username,
                    repaired
                );
                "Webhook received: payment already processed"
            }
            Reconciliation::Updated => {
                tracing::info!(
                    "Updated subscription for {} to {} ({})",
                    user.username,
                    plan.name,
                    frequency.name
                );
                "Webhook received: subscription updated"
            }
            Reconciliation::Created => {
                tracing::info!(
                    "Created {} ({}) subscription for {}",
                    plan.name,
                    frequency.name,
                    user.username
                );
                "Webhook received: subscription created"
            }
        };
        Ok(message.to_string())
    }

    async fn payment_failed(&self, intent: &PaymentIntentObject) -> Result<String, WebhookError> {
        match self.resolve_user(intent).await? {
            Some(user) => {
                if self.repository.deactivate_subscription(user.id).await? {
                    tracing::info!("Deactivated subscription for {} after failed payment", user.username);
                } else {
                    tracing::warn!("Failed payment for {} without a subscription", user.username);
                }
            }
            None => tracing::warn!("Failed payment {:?} names no known user", intent.id),
        }
        Ok("Webhook received: payment failed".to_string())
    }

    async fn resolve_user(&self, intent: &PaymentIntentObject) -> Result<Option<User>, AppError> {
        if let Some(user_id) = intent.metadata_id("user_id") {
            return self.repository.get_user(user_id).await;
        }
        match intent.metadata_str("username") {
            Some(username) => self.repository.get_user_by_username(username).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::signature::sign_payload;
    use serde_json::json;

    const SECRET: &str = "whsec_test";

    struct Fixture {
        repo: Repository,
        user: User,
    }

    async fn fixture() -> Fixture {
        let repo = Repository::in_memory().await.unwrap();
        let user = repo.create_user("grace", "grace@example.com").await.unwrap();
        Fixture { repo, user }
    }

    fn event(event_type: &str, id: &str, metadata: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "type": event_type,
            "data": {"object": {"id": id, "metadata": metadata}}
        }))
        .unwrap()
    }

    async fn deliver(f: &Fixture, body: &[u8]) -> Result<String, WebhookError> {
        let now = Utc::now();
        let header = sign_payload(body, SECRET, now.timestamp());
        WebhookHandler::new(&f.repo, Some(SECRET))
            .handle(body, Some(&header), now)
            .await
    }

    #[tokio::test]
    async fn replayed_success_creates_one_subscription() {
        let f = fixture().await;
        let body = event(
            PAYMENT_SUCCEEDED,
            "pi_1",
            json!({"plan_id": "1", "frequency_id": "2", "user_id": f.user.id.to_string()}),
        );

        let first = deliver(&f, &body).await.unwrap();
        let second = deliver(&f, &body).await.unwrap();

        assert!(first.contains("created"));
        assert!(second.contains("already processed"));
        assert_eq!(f.repo.count_subscriptions().await.unwrap(), 1);
        let sub = f.repo.get_subscription_for_user(f.user.id).await.unwrap().unwrap();
        assert!(sub.active);
        assert_eq!(sub.payment_intent_id.as_deref(), Some("pi_1"));
    }

    #[tokio::test]
    async fn username_is_a_fallback_user_key() {
        let f = fixture().await;
        let body = event(
            PAYMENT_SUCCEEDED,
            "pi_2",
            json!({"plan_id": 2, "frequency_id": 1, "username": "grace"}),
        );

        deliver(&f, &body).await.unwrap();

        let sub = f.repo.get_subscription_for_user(f.user.id).await.unwrap().unwrap();
        assert_eq!(sub.plan.id, 2);
    }

    #[tokio::test]
    async fn missing_metadata_is_rejected_without_a_row() {
        let f = fixture().await;
        let body = event(PAYMENT_SUCCEEDED, "pi_3", json!({"user_id": f.user.id}));

        let err = deliver(&f, &body).await.unwrap_err();

        assert!(matches!(err, WebhookError::Metadata(_)));
        assert_eq!(f.repo.count_subscriptions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_plan_or_user_is_rejected() {
        let f = fixture().await;
        let unknown_plan = event(
            PAYMENT_SUCCEEDED,
            "pi_4",
            json!({"plan_id": 99, "frequency_id": 1, "user_id": f.user.id}),
        );
        let unknown_user = event(
            PAYMENT_SUCCEEDED,
            "pi_5",
            json!({"plan_id": 1, "frequency_id": 1, "user_id": 999}),
        );

        assert!(matches!(deliver(&f, &unknown_plan).await, Err(WebhookError::Metadata(_))));
        assert!(matches!(deliver(&f, &unknown_user).await, Err(WebhookError::Metadata(_))));
        assert_eq!(f.repo.count_subscriptions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_payment_deactivates() {
        let f = fixture().await;
        let meta = json!({"plan_id": 1, "frequency_id": 1, "user_id": f.user.id});
        deliver(&f, &event(PAYMENT_SUCCEEDED, "pi_6", meta.clone())).await.unwrap();

        deliver(&f, &event(PAYMENT_FAILED, "pi_7", meta)).await.unwrap();

        let sub = f.repo.get_subscription_for_user(f.user.id).await.unwrap().unwrap();
        assert!(!sub.active);
    }

    #[tokio::test]
    async fn other_events_are_acknowledged() {
        let f = fixture().await;
        let body = serde_json::to_vec(&json!({"type": "charge.refunded", "data": {"object": {}}})).unwrap();

        let message = deliver(&f, &body).await.unwrap();

        assert_eq!(message, "Unhandled webhook received: charge.refunded");
    }

    #[tokio::test]
    async fn bad_signature_and_bad_json_are_refused() {
        let f = fixture().await;
        let handler = WebhookHandler::new(&f.repo, Some(SECRET));
        let now = Utc::now();

        let body = event(PAYMENT_SUCCEEDED, "pi_8", json!({}));
        let forged = sign_payload(&body, "whsec_wrong", now.timestamp());
        assert!(matches!(
            handler.handle(&body, Some(&forged), now).await,
            Err(WebhookError::Signature(_))
        ));
        assert!(matches!(
            handler.handle(&body, None, now).await,
            Err(WebhookError::Signature(_))
        ));

        let junk = b"not json";
        let header = sign_payload(junk, SECRET, now.timestamp());
        assert!(matches!(
            handler.handle(junk, Some(&header), now).await,
            Err(WebhookError::Payload(_))
        ));
    }

    #[tokio::test]
    async fn unconfigured_secret_refuses_everything() {
        let f = fixture().await;
        let body = b"{}";
        let now = Utc::now();
        let header = sign_payload(body, SECRET, now.timestamp());

        let result = WebhookHandler::new(&f.repo, None)
            .handle(body, Some(&header), now)
            .await;

        assert!(matches!(result, Err(WebhookError::Signature(_))));
    }
}

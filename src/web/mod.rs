mod auth;
mod checkout;
mod crumbs;
mod error;
mod feedback;
mod preferences;
mod subscriptions;

pub use auth::{CurrentUser, USER_HEADER};
pub use error::{ApiError, ApiJson};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::payments::StripeClient;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<Repository>,
    pub stripe: Option<Arc<StripeClient>>,
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn from_config(repository: Arc<Repository>, config: &Config) -> Result<Self> {
        let stripe = match config.stripe.secret_key.as_deref() {
            Some(key) if !key.is_empty() => Some(Arc::new(StripeClient::new(
                config.stripe.api_url.clone(),
                key.to_string(),
            )?)),
            _ => {
                tracing::warn!("STRIPE_SECRET_KEY not set, checkout is disabled");
                None
            }
        };
        if config.stripe.webhook_secret.is_none() {
            tracing::warn!("STRIPE_WH_SECRET not set, webhooks will be refused");
        }

        Ok(Self {
            repository,
            stripe,
            webhook_secret: config.stripe.webhook_secret.clone(),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/crumbs/", get(crumbs::list_crumbs))
        .route("/api/crumbs/:id/", get(crumbs::get_crumb))
        .route("/api/crumbs/:id/save/", post(crumbs::toggle_save))
        .route(
            "/api/crumbs/:id/comments/",
            get(feedback::list_comments).post(feedback::add_comment),
        )
        .route("/api/saved/", get(crumbs::list_saved))
        .route(
            "/api/preferences/",
            get(preferences::get_preferences).post(preferences::update_preferences),
        )
        .route("/api/subscriptions/plans/", get(subscriptions::list_plans))
        .route("/api/subscriptions/status/", get(subscriptions::subscription_status))
        .route(
            "/checkout/create-payment-intent/",
            post(checkout::create_payment_intent),
        )
        .route("/checkout/wh/", post(checkout::stripe_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

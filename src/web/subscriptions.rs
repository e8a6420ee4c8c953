use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::models::{
    calculate_subscription_price, PlanPrice, SubscriptionFrequency, SubscriptionPlan,
    UserSubscription,
};

use super::auth::CurrentUser;
use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct PlanCatalog {
    pub plans: Vec<SubscriptionPlan>,
    pub frequencies: Vec<SubscriptionFrequency>,
    pub prices: Vec<PlanPrice>,
}

pub async fn list_plans(State(state): State<AppState>) -> Result<Json<PlanCatalog>, ApiError> {
    let plans = state.repository.list_plans().await?;
    let frequencies = state.repository.list_frequencies().await?;

    let prices = plans
        .iter()
        .flat_map(|plan| {
            frequencies.iter().filter_map(move |frequency| {
                calculate_subscription_price(&plan.name, frequency.duration_days).map(
                    |amount_pence| PlanPrice {
                        plan_id: plan.id,
                        plan: plan.name.clone(),
                        frequency_id: frequency.id,
                        frequency: frequency.name.clone(),
                        amount_pence,
                    },
                )
            })
        })
        .collect();

    Ok(Json(PlanCatalog {
        plans,
        frequencies,
        prices,
    }))
}

/// The user's subscription while it is active and unexpired, else `null`.
pub async fn subscription_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Option<UserSubscription>>, ApiError> {
    let now = Utc::now();
    let subscription = state
        .repository
        .get_subscription_for_user(user.id)
        .await?
        .filter(|subscription| subscription.is_current(now));

    Ok(Json(subscription))
}

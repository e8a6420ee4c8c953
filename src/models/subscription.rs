use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Topic limit for users without a current subscription.
pub const DEFAULT_TOPIC_LIMIT: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: i64,
    pub name: String,
    /// `None` means unlimited.
    pub topic_limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFrequency {
    pub id: i64,
    pub name: String,
    pub duration_days: u32,
    pub discount_percent: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: i64,
    pub user_id: i64,
    pub plan: SubscriptionPlan,
    pub frequency: SubscriptionFrequency,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub active: bool,
    pub payment_intent_id: Option<String>,
}

impl UserSubscription {
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.active && self.end_date > now
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanPrice {
    pub plan_id: i64,
    pub plan: String,
    pub frequency_id: i64,
    pub frequency: String,
    pub amount_pence: i64,
}

/// Price in pence for a plan billed over `duration_days`.
///
/// Basic costs 5 GBP a week, anything else 10 GBP. Monthly billing is four
/// and a third weeks at 10% off, annual billing 52 weeks at 30% off. Other
/// durations have no price.
pub fn calculate_subscription_price(plan_name: &str, duration_days: u32) -> Option<i64> {
    let weekly: f64 = if plan_name.trim().eq_ignore_ascii_case("basic") {
        500.0
    } else {
        1000.0
    };

    let pence = match duration_days {
        7 => weekly,
        30 => weekly * 52.0 / 12.0 * 0.9,
        365 => weekly * 52.0 * 0.7,
        _ => return None,
    };

    Some(pence.round() as i64)
}

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{
    SubscriptionFrequency, SubscriptionPlan, UserSubscription, DEFAULT_TOPIC_LIMIT,
};

use super::repository::{datetime_column, format_datetime, parse_datetime, Repository};

const SUBSCRIPTION_QUERY: &str = r#"SELECT s.id, s.user_id, s.start_date, s.end_date, s.active, s.payment_intent_id,
              p.id, p.name, p.topic_limit,
              f.id, f.name, f.duration_days, f.discount_percent
       FROM user_subscriptions s
       JOIN subscription_plans p ON s.plan_id = p.id
       JOIN subscription_frequencies f ON s.frequency_id = f.id"#;

/// What a successful payment did to the subscription table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The payment was already applied; `repaired` is set when the stored
    /// row had drifted and was rewritten.
    Replayed { repaired: bool },
    /// The user's existing subscription now points at this payment.
    Updated,
    Created,
}

impl Repository {
    // Plans and frequencies

    pub async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>> {
        let plans = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, name, topic_limit FROM subscription_plans ORDER BY id")?;
                let plans = stmt
                    .query_map([], plan_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(plans)
            })
            .await?;
        Ok(plans)
    }

    pub async fn get_plan(&self, id: i64) -> Result<Option<SubscriptionPlan>> {
        let plan = self
            .conn
            .call(move |conn| {
                let plan = conn
                    .query_row(
                        "SELECT id, name, topic_limit FROM subscription_plans WHERE id = ?1",
                        params![id],
                        plan_from_row,
                    )
                    .optional()?;
                Ok(plan)
            })
            .await?;
        Ok(plan)
    }

    pub async fn list_frequencies(&self) -> Result<Vec<SubscriptionFrequency>> {
        let frequencies = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, duration_days, discount_percent FROM subscription_frequencies ORDER BY duration_days",
                )?;
                let frequencies = stmt
                    .query_map([], frequency_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(frequencies)
            })
            .await?;
        Ok(frequencies)
    }

    pub async fn get_frequency(&self, id: i64) -> Result<Option<SubscriptionFrequency>> {
        let frequency = self
            .conn
            .call(move |conn| {
                let frequency = conn
                    .query_row(
                        "SELECT id, name, duration_days, discount_percent FROM subscription_frequencies WHERE id = ?1",
                        params![id],
                        frequency_from_row,
                    )
                    .optional()?;
                Ok(frequency)
            })
            .await?;
        Ok(frequency)
    }

    // Subscriptions

    pub async fn get_subscription_for_user(&self, user_id: i64) -> Result<Option<UserSubscription>> {
        let subscription = self
            .conn
            .call(move |conn| {
                let sql = format!("{} WHERE s.user_id = ?1", SUBSCRIPTION_QUERY);
                let subscription = conn
                    .query_row(&sql, params![user_id], subscription_from_row)
                    .optional()?;
                Ok(subscription)
            })
            .await?;
        Ok(subscription)
    }

    pub async fn get_subscription_by_payment(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<UserSubscription>> {
        let payment_intent_id = payment_intent_id.to_string();
        let subscription = self
            .conn
            .call(move |conn| {
                let sql = format!("{} WHERE s.payment_intent_id = ?1", SUBSCRIPTION_QUERY);
                let subscription = conn
                    .query_row(&sql, params![payment_intent_id], subscription_from_row)
                    .optional()?;
                Ok(subscription)
            })
            .await?;
        Ok(subscription)
    }

    pub async fn count_subscriptions(&self) -> Result<u32> {
        let count = self
            .conn
            .call(|conn| {
                let count: u32 = conn.query_row(
                    "SELECT COUNT(*) FROM user_subscriptions",
                    [],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    /// Apply a succeeded payment for `user_id` inside one transaction.
    ///
    /// Lookup order: the payment id first (replays), then the user's row
    /// (renewals and plan changes), otherwise a new row. The validity window
    /// starts at `now` and lasts the frequency's duration.
    pub async fn reconcile_payment(
        &self,
        user_id: i64,
        plan: &SubscriptionPlan,
        frequency: &SubscriptionFrequency,
        payment_intent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Reconciliation> {
        let plan_id = plan.id;
        let frequency_id = frequency.id;
        let duration = Duration::days(i64::from(frequency.duration_days));
        let payment_intent_id = payment_intent_id.to_string();
        let start = format_datetime(now);
        let end = format_datetime(now + duration);

        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;

                let replayed = tx
                    .query_row(
                        "SELECT id, plan_id, frequency_id, start_date, end_date, active
                         FROM user_subscriptions WHERE payment_intent_id = ?1",
                        params![payment_intent_id],
                        |row| {
                            Ok((
                                row.get::<_, i64>(0)?,
                                row.get::<_, i64>(1)?,
                                row.get::<_, i64>(2)?,
                                row.get::<_, String>(3)?,
                                row.get::<_, String>(4)?,
                                row.get::<_, bool>(5)?,
                            ))
                        },
                    )
                    .optional()?;

                if let Some((id, stored_plan, stored_frequency, stored_start, stored_end, active)) =
                    replayed
                {
                    let expected_end = parse_datetime(&stored_start).map(|start| start + duration);
                    let stored_end = parse_datetime(&stored_end);
                    let window_short = match (stored_end, expected_end) {
                        (Some(stored), Some(expected)) => stored < expected,
                        _ => true,
                    };

                    let repaired = !active
                        || stored_plan != plan_id
                        || stored_frequency != frequency_id
                        || window_short;
                    if repaired {
                        tx.execute(
                            "UPDATE user_subscriptions
                             SET plan_id = ?1, frequency_id = ?2, start_date = ?3, end_date = ?4, active = 1
                             WHERE id = ?5",
                            params![plan_id, frequency_id, start, end, id],
                        )?;
                    }
                    tx.commit()?;
                    return Ok(Reconciliation::Replayed { repaired });
                }

                let updated = tx.execute(
                    "UPDATE user_subscriptions
                     SET plan_id = ?1, frequency_id = ?2, start_date = ?3, end_date = ?4,
                         active = 1, payment_intent_id = ?5
                     WHERE user_id = ?6",
                    params![plan_id, frequency_id, start, end, payment_intent_id, user_id],
                )?;

                let outcome = if updated > 0 {
                    Reconciliation::Updated
                } else {
                    tx.execute(
                        "INSERT INTO user_subscriptions
                             (user_id, plan_id, frequency_id, start_date, end_date, active, payment_intent_id)
                         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
                        params![user_id, plan_id, frequency_id, start, end, payment_intent_id],
                    )?;
                    Reconciliation::Created
                };

                tx.commit()?;
                Ok(outcome)
            })
            .await?;
        Ok(outcome)
    }

    /// Number of topics the user may follow, `None` for unlimited. Users
    /// without a current subscription get the default limit.
    pub async fn topic_limit_for(&self, user_id: i64, now: DateTime<Utc>) -> Result<Option<u32>> {
        let limit = match self.get_subscription_for_user(user_id).await? {
            Some(subscription) if subscription.is_current(now) => subscription.plan.topic_limit,
            _ => Some(DEFAULT_TOPIC_LIMIT),
        };
        Ok(limit)
    }

    /// Flag the user's subscription inactive. Returns false when the user
    /// has no subscription.
    pub async fn deactivate_subscription(&self, user_id: i64) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE user_subscriptions SET active = 0 WHERE user_id = ?1",
                    params![user_id],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(changed)
    }
}

fn plan_from_row(row: &Row) -> rusqlite::Result<SubscriptionPlan> {
    Ok(SubscriptionPlan {
        id: row.get(0)?,
        name: row.get(1)?,
        topic_limit: row.get(2)?,
    })
}

fn frequency_from_row(row: &Row) -> rusqlite::Result<SubscriptionFrequency> {
    Ok(SubscriptionFrequency {
        id: row.get(0)?,
        name: row.get(1)?,
        duration_days: row.get(2)?,
        discount_percent: row.get(3)?,
    })
}

fn subscription_from_row(row: &Row) -> rusqlite::Result<UserSubscription> {
    Ok(UserSubscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        start_date: datetime_column(row, 2)?,
        end_date: datetime_column(row, 3)?,
        active: row.get(4)?,
        payment_intent_id: row.get(5)?,
        plan: SubscriptionPlan {
            id: row.get(6)?,
            name: row.get(7)?,
            topic_limit: row.get(8)?,
        },
        frequency: SubscriptionFrequency {
            id: row.get(9)?,
            name: row.get(10)?,
            duration_days: row.get(11)?,
            discount_percent: row.get(12)?,
        },
    })
}

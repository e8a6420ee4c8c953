use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized record as returned by a source fetcher, before cleaning
/// and summarization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrumbRecord {
    pub title: String,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crumb {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub source: String,
    pub topic_id: i64,
    pub topic_name: String,
    pub published_at: DateTime<Utc>,
    pub added_on: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCrumb {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub source: String,
    pub topic_id: i64,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub crumb_id: i64,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

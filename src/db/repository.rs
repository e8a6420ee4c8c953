use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Crumb, NewCrumb, Topic};
use crate::pipeline::text::slugify;

use super::schema::SCHEMA;

pub(super) const CRUMB_COLUMNS: &str = "c.id, c.title, c.summary, c.url, c.source, c.topic_id, t.name, c.published_at, c.added_on";

pub struct Repository {
    pub(super) conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Topic operations

    pub async fn list_topics(&self) -> Result<Vec<Topic>> {
        let topics = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, name, slug, description FROM topics ORDER BY name")?;
                let topics = stmt
                    .query_map([], topic_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(topics)
            })
            .await?;
        Ok(topics)
    }

    pub async fn get_topic_by_slug(&self, slug: &str) -> Result<Option<Topic>> {
        let slug = slug.to_string();
        let topic = self
            .conn
            .call(move |conn| {
                let topic = conn
                    .query_row(
                        "SELECT id, name, slug, description FROM topics WHERE slug = ?1",
                        params![slug],
                        topic_from_row,
                    )
                    .optional()?;
                Ok(topic)
            })
            .await?;
        Ok(topic)
    }

    /// Find a topic by name, creating it when absent. A new topic gets
    /// `slug` (derived from the name when blank), or `slug-1`, `slug-2`, ...
    /// when that slug is already taken.
    pub async fn get_or_create_topic(&self, name: &str, slug: &str) -> Result<Topic> {
        let base_slug = match slugify(if slug.trim().is_empty() { name } else { slug }) {
            s if s.is_empty() => "topic".to_string(),
            s => s,
        };
        let name = name.to_string();

        let topic = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;

                let existing = tx
                    .query_row(
                        "SELECT id, name, slug, description FROM topics WHERE name = ?1",
                        params![name],
                        topic_from_row,
                    )
                    .optional()?;
                if let Some(topic) = existing {
                    return Ok(topic);
                }

                let mut candidate = base_slug.clone();
                let mut suffix = 1;
                loop {
                    let taken: bool = tx.query_row(
                        "SELECT EXISTS(SELECT 1 FROM topics WHERE slug = ?1)",
                        params![candidate],
                        |row| row.get(0),
                    )?;
                    if !taken {
                        break;
                    }
                    candidate = format!("{}-{}", base_slug, suffix);
                    suffix += 1;
                }

                tx.execute(
                    "INSERT INTO topics (name, slug) VALUES (?1, ?2)",
                    params![name, candidate],
                )?;
                let topic = Topic {
                    id: tx.last_insert_rowid(),
                    name,
                    slug: candidate,
                    description: String::new(),
                };
                tx.commit()?;
                Ok(topic)
            })
            .await?;
        Ok(topic)
    }

    // Crumb operations

    pub async fn crumb_exists(&self, title: &str, url: &str) -> Result<bool> {
        let title = title.to_string();
        let url = url.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM crumbs WHERE title = ?1 AND url = ?2)",
                    params![title, url],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await?;
        Ok(exists)
    }

    /// Insert a crumb unless `(title, url)` is already stored. Returns the
    /// new id, or `None` when the row already existed.
    pub async fn insert_crumb(&self, crumb: NewCrumb) -> Result<Option<i64>> {
        let id = self
            .conn
            .call(move |conn| {
                let inserted = conn.execute(
                    r#"INSERT INTO crumbs (title, summary, url, source, topic_id, published_at, added_on)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                       ON CONFLICT(title, url) DO NOTHING"#,
                    params![
                        crumb.title,
                        crumb.summary,
                        crumb.url,
                        crumb.source,
                        crumb.topic_id,
                        format_datetime(crumb.published_at),
                        format_datetime(Utc::now()),
                    ],
                )?;
                Ok((inserted > 0).then(|| conn.last_insert_rowid()))
            })
            .await?;
        Ok(id)
    }

    pub async fn add_crumb_tag(&self, crumb_id: i64, tag: &str) -> Result<()> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO crumb_tags (crumb_id, tag) VALUES (?1, ?2)",
                    params![crumb_id, tag],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_crumb_tags(&self, crumb_id: i64) -> Result<Vec<String>> {
        let tags = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT tag FROM crumb_tags WHERE crumb_id = ?1 ORDER BY tag")?;
                let tags = stmt
                    .query_map(params![crumb_id], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(tags)
            })
            .await?;
        Ok(tags)
    }

    pub async fn get_crumb(&self, id: i64) -> Result<Option<Crumb>> {
        let crumb = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {} FROM crumbs c JOIN topics t ON c.topic_id = t.id WHERE c.id = ?1",
                    CRUMB_COLUMNS
                );
                let crumb = conn
                    .query_row(&sql, params![id], crumb_from_row)
                    .optional()?;
                Ok(crumb)
            })
            .await?;
        Ok(crumb)
    }

    /// Crumbs newest first.
    pub async fn list_crumbs(&self, offset: u32, limit: u32) -> Result<Vec<Crumb>> {
        let crumbs = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {} FROM crumbs c JOIN topics t ON c.topic_id = t.id
                     ORDER BY c.published_at DESC, c.id DESC LIMIT ?1 OFFSET ?2",
                    CRUMB_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let crumbs = stmt
                    .query_map(params![limit, offset], crumb_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(crumbs)
            })
            .await?;
        Ok(crumbs)
    }

    pub async fn count_crumbs(&self) -> Result<u32> {
        let count = self
            .conn
            .call(|conn| {
                let count: u32 =
                    conn.query_row("SELECT COUNT(*) FROM crumbs", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }
}

pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

pub(super) fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid timestamp {:?}", raw).into(),
        )
    })
}

fn topic_from_row(row: &Row) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
    })
}

pub(super) fn crumb_from_row(row: &Row) -> rusqlite::Result<Crumb> {
    Ok(Crumb {
        id: row.get(0)?,
        title: row.get(1)?,
        summary: row.get(2)?,
        url: row.get(3)?,
        source: row.get(4)?,
        topic_id: row.get(5)?,
        topic_name: row.get(6)?,
        published_at: datetime_column(row, 7)?,
        added_on: datetime_column(row, 8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_crumb(title: &str, url: &str, topic_id: i64) -> NewCrumb {
        NewCrumb {
            title: title.to_string(),
            summary: "summary".to_string(),
            url: url.to_string(),
            source: "Test".to_string(),
            topic_id,
            published_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn seeded_topics_are_present() {
        let repo = Repository::in_memory().await.unwrap();
        let topics = repo.list_topics().await.unwrap();
        assert_eq!(topics.len(), 9);
        assert!(repo.get_topic_by_slug("trivia-and-fun").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn every_tagger_slug_is_seeded() {
        let repo = Repository::in_memory().await.unwrap();
        for (slug, _) in crate::pipeline::tagger::TOPIC_KEYWORDS {
            assert!(
                repo.get_topic_by_slug(slug).await.unwrap().is_some(),
                "{} not seeded",
                slug
            );
        }
    }

    #[tokio::test]
    async fn get_or_create_topic_reuses_existing_rows() {
        let repo = Repository::in_memory().await.unwrap();
        let seeded = repo.get_topic_by_slug("music").await.unwrap().unwrap();
        let found = repo.get_or_create_topic("music", "anything").await.unwrap();
        assert_eq!(seeded.id, found.id);
        assert_eq!(repo.list_topics().await.unwrap().len(), 9);
    }

    #[tokio::test]
    async fn slug_collision_appends_counter() {
        let repo = Repository::in_memory().await.unwrap();

        let first = repo.get_or_create_topic("Cars", "cars").await.unwrap();
        let second = repo.get_or_create_topic("Cars!", "cars").await.unwrap();
        let third = repo.get_or_create_topic("CARS", "cars").await.unwrap();

        assert_eq!(first.slug, "cars");
        assert_eq!(second.slug, "cars-1");
        assert_eq!(third.slug, "cars-2");
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn blank_slug_is_derived_from_name() {
        let repo = Repository::in_memory().await.unwrap();
        let topic = repo.get_or_create_topic("Board Games", " ").await.unwrap();
        assert_eq!(topic.slug, "board-games");
    }

    #[tokio::test]
    async fn insert_crumb_ignores_duplicate_title_and_url() {
        let repo = Repository::in_memory().await.unwrap();
        let topic = repo.get_topic_by_slug("music").await.unwrap().unwrap();

        let first = repo
            .insert_crumb(new_crumb("Song", "https://example.com/song", topic.id))
            .await
            .unwrap();
        let second = repo
            .insert_crumb(new_crumb("Song", "https://example.com/song", topic.id))
            .await
            .unwrap();
        let other_url = repo
            .insert_crumb(new_crumb("Song", "https://example.com/other", topic.id))
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert!(other_url.is_some());
        assert!(repo.crumb_exists("Song", "https://example.com/song").await.unwrap());
        assert_eq!(repo.count_crumbs().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn tags_are_unique_per_crumb() {
        let repo = Repository::in_memory().await.unwrap();
        let topic = repo.get_topic_by_slug("music").await.unwrap().unwrap();
        let id = repo
            .insert_crumb(new_crumb("Song", "https://example.com/song", topic.id))
            .await
            .unwrap()
            .unwrap();

        repo.add_crumb_tag(id, "technology").await.unwrap();
        repo.add_crumb_tag(id, "technology").await.unwrap();

        assert_eq!(repo.get_crumb_tags(id).await.unwrap(), vec!["technology"]);
        let crumb = repo.get_crumb(id).await.unwrap().unwrap();
        assert_eq!(crumb.topic_name, "music");
    }

    #[test]
    fn parses_rfc3339_and_sqlite_formats() {
        assert!(parse_datetime("2026-01-11T12:34:56+00:00").is_some());
        assert!(parse_datetime("2026-01-11 12:34:56").is_some());
        assert!(parse_datetime("yesterday").is_none());
    }

    #[tokio::test]
    async fn unreadable_timestamps_are_errors() {
        let repo = Repository::in_memory().await.unwrap();
        let topic = repo.get_topic_by_slug("music").await.unwrap().unwrap();
        let id = repo
            .insert_crumb(new_crumb("Broken", "https://example.com/broken", topic.id))
            .await
            .unwrap()
            .unwrap();
        repo.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE crumbs SET published_at = 'yesterday-ish' WHERE id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(repo.get_crumb(id).await.is_err());
        assert!(repo.list_crumbs(0, 10).await.is_err());
    }
}

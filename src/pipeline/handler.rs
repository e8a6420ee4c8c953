use chrono::Utc;

use crate::ai::Summarizer;
use crate::db::Repository;
use crate::error::Result;
use crate::models::{CrumbRecord, NewCrumb, Topic, TopicSpec};

use super::tagger::match_topic_slug;
use super::text::{clean_text, strip_html, truncate_chars};

pub const MAX_TITLE_CHARS: usize = 255;
/// Length of the cleaned-text fallback used when no model summary exists.
pub const FALLBACK_SUMMARY_CHARS: usize = 500;

/// Content area of a source. Decides the primary topic of its crumbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    WorldNews,
    Music,
    SportsFitness,
    Finance,
    Food,
    Technology,
    Plants,
    Environment,
    Trivia,
}

impl Domain {
    pub const ALL: [Domain; 9] = [
        Domain::WorldNews,
        Domain::Music,
        Domain::SportsFitness,
        Domain::Finance,
        Domain::Food,
        Domain::Technology,
        Domain::Plants,
        Domain::Environment,
        Domain::Trivia,
    ];

    pub fn topic(self) -> TopicSpec {
        let (name, slug) = match self {
            Domain::WorldNews => ("world news", "world-news"),
            Domain::Music => ("music", "music"),
            Domain::SportsFitness => ("sports and fitness", "sports-and-fitness"),
            Domain::Finance => ("stock crypto finance", "stock-crypto-finance"),
            Domain::Food => ("food and drink", "food-and-drink"),
            Domain::Technology => ("technology", "technology"),
            Domain::Plants => ("plants and gardening", "plants-and-gardening"),
            Domain::Environment => ("environment", "environment"),
            Domain::Trivia => ("trivia and fun", "trivia-and-fun"),
        };
        TopicSpec { name, slug }
    }
}

/// Persists fetched records for one domain: skips known `(title, url)`
/// pairs, summarizes, stores and tags the rest.
pub struct CrumbHandler<'a> {
    repository: &'a Repository,
    summarizer: Option<&'a Summarizer>,
}

impl<'a> CrumbHandler<'a> {
    pub fn new(repository: &'a Repository, summarizer: Option<&'a Summarizer>) -> Self {
        Self {
            repository,
            summarizer,
        }
    }

    /// Returns the number of crumbs created. Failures on one record are
    /// logged and do not stop the batch.
    pub async fn handle(
        &self,
        domain: Domain,
        default_source: &str,
        records: Vec<CrumbRecord>,
    ) -> usize {
        if records.is_empty() {
            return 0;
        }

        let spec = domain.topic();
        let topic = match self.repository.get_or_create_topic(spec.name, spec.slug).await {
            Ok(topic) => topic,
            Err(e) => {
                tracing::error!("Cannot resolve topic {:?}: {}", spec.slug, e);
                return 0;
            }
        };

        let mut created = 0;
        for record in records {
            let title = record.title.clone();
            match self.handle_record(&topic, default_source, record).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        "Error saving {} crumb (title: {}): {}",
                        spec.name,
                        truncate_chars(&title, 50),
                        e
                    );
                }
            }
        }

        created
    }

    async fn handle_record(
        &self,
        topic: &Topic,
        default_source: &str,
        record: CrumbRecord,
    ) -> Result<bool> {
        let title = truncate_chars(record.title.trim(), MAX_TITLE_CHARS).to_string();
        let url = record
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        let Some(url) = url.filter(|_| !title.is_empty()) else {
            tracing::debug!("Skipping {} record without title or URL", default_source);
            return Ok(false);
        };

        if self.repository.crumb_exists(&title, &url).await? {
            return Ok(false);
        }

        let cleaned = clean_text(&strip_html(record.summary.as_deref().unwrap_or_default()));

        let mut summary = match self.summarizer {
            Some(summarizer) if !cleaned.is_empty() => summarizer.summarize(&cleaned).await,
            _ => String::new(),
        };
        if summary.is_empty() {
            summary = truncate_chars(&cleaned, FALLBACK_SUMMARY_CHARS).to_string();
        }

        let source = record
            .source
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default_source.to_string());

        let crumb = NewCrumb {
            title: title.clone(),
            summary,
            url,
            source,
            topic_id: topic.id,
            published_at: record.published_at.unwrap_or_else(Utc::now),
        };

        let Some(crumb_id) = self.repository.insert_crumb(crumb).await? else {
            // Lost a race with another writer for the same (title, url)
            return Ok(false);
        };

        if let Err(e) = self.tag_crumb(crumb_id, topic, &format!("{} {}", title, cleaned)).await {
            tracing::warn!("Failed to tag crumb {}: {}", crumb_id, e);
        }

        Ok(true)
    }

    async fn tag_crumb(&self, crumb_id: i64, primary: &Topic, text: &str) -> Result<()> {
        let Some(slug) = match_topic_slug(text) else {
            return Ok(());
        };
        if let Some(tag_topic) = self.repository.get_topic_by_slug(slug).await? {
            if tag_topic.id != primary.id {
                self.repository.add_crumb_tag(crumb_id, &tag_topic.name).await?;
            }
        }
        Ok(())
    }
}

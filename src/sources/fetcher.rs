use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::SourcesConfig;
use crate::db::parse_datetime;
use crate::error::{AppError, Result};
use crate::models::CrumbRecord;

use super::payloads::*;
use super::Source;

const LASTFM_ARTIST_LIMIT: u32 = 10;
const LASTFM_PAUSE: Duration = Duration::from_millis(200);
const LASTFM_READ_MORE: &str = "<a href=\"https://www.last.fm/music/";
const LASTFM_FALLBACK_BIO: &str = "Top artist on Last.fm right now.";
const SPOONACULAR_RECIPE_COUNT: u32 = 10;
const PERMAPEOPLE_PLANT_URL: &str = "https://permapeople.org/plants";
const USELESS_FACTS_HOME: &str = "https://uselessfacts.jsph.pl/";
const CHUCKNORRIS_HOME: &str = "https://api.chucknorris.io/";

/// Pulls records from the upstream content APIs. Fetching never fails:
/// errors are logged and produce an empty batch.
pub struct Fetcher {
    client: Client,
    config: SourcesConfig,
}

impl Fetcher {
    pub fn new(config: SourcesConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent("infocrumbs/1.0")
            .build()?;

        Ok(Self { client, config })
    }

    pub async fn fetch(&self, source: Source) -> Vec<CrumbRecord> {
        match self.try_fetch(source).await {
            Ok(records) => {
                tracing::debug!("Fetched {} records from {}", records.len(), source);
                records
            }
            Err(e) => {
                tracing::warn!("{} fetch error: {}", source.default_name(), e);
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self, source: Source) -> Result<Vec<CrumbRecord>> {
        let cfg = &self.config;
        match source {
            Source::NewsDataWorld => {
                self.fetch_newsdata(source, &cfg.newsdata_world_url, "NEWSDATA_WORLD_NEWS_URL")
                    .await
            }
            Source::NewsDataMusic => {
                self.fetch_newsdata(source, &cfg.newsdata_music_url, "NEWSDATA_MUSIC_NEWS_URL")
                    .await
            }
            Source::NewsDataFitness => {
                self.fetch_newsdata(source, &cfg.newsdata_fitness_url, "NEWSDATA_FITNESS_URL")
                    .await
            }
            Source::NewsDataEnvironment => {
                self.fetch_newsdata(source, &cfg.newsdata_environment_url, "NEWSDATA_API_URL")
                    .await
            }
            Source::NewsApiWorld => self.fetch_newsapi(source).await,
            Source::LastFmArtists => self.fetch_lastfm_artists(source).await,
            Source::TheNewsApiSports => {
                self.fetch_data_articles(source, &cfg.thenewsapi_sports_url, "THENEWSAPI_SPORTS_URL")
                    .await
            }
            Source::MediastackTech => {
                self.fetch_data_articles(
                    source,
                    &cfg.mediastack_technology_url,
                    "MEDIASTACK_TECHNOLOGY_URL",
                )
                .await
            }
            Source::FinnhubNews => self.fetch_finnhub(source).await,
            Source::SpoonacularRecipes => self.fetch_spoonacular(source).await,
            Source::PerenualGuides => self.fetch_perenual(source).await,
            Source::TreflePlants => self.fetch_trefle(source).await,
            Source::PermaPeoplePlants => self.fetch_permapeople(source).await,
            Source::UselessFacts => self.fetch_useless_fact(source).await,
            Source::ChuckNorrisJokes => self.fetch_chucknorris_joke(source).await,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        source: Source,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = request.timeout(source.timeout()).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Source {
                source_id: source.id().to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        Ok(response.json::<T>().await?)
    }

    async fn fetch_newsdata(
        &self,
        source: Source,
        url: &Option<String>,
        setting: &str,
    ) -> Result<Vec<CrumbRecord>> {
        let url = require(source, url, setting)?;
        let data: NewsDataResponse = self.get_json(source, self.client.get(url)).await?;

        Ok(data
            .results
            .into_iter()
            .filter_map(|article| {
                record(
                    article.title,
                    article.link,
                    article.description,
                    article.source_id.or_else(|| Some(source.default_name().to_string())),
                    parse_published(article.pub_date.as_deref()),
                )
            })
            .collect())
    }

    async fn fetch_newsapi(&self, source: Source) -> Result<Vec<CrumbRecord>> {
        let url = require(source, &self.config.newsapi_world_url, "NEWS_API_URL")?;
        let data: NewsApiResponse = self.get_json(source, self.client.get(url)).await?;

        Ok(data
            .articles
            .into_iter()
            .filter_map(|article| {
                let source_name = article
                    .source
                    .and_then(|s| s.name)
                    .unwrap_or_else(|| source.default_name().to_string());
                record(
                    article.title,
                    article.url,
                    article.description,
                    Some(source_name),
                    parse_published(article.published_at.as_deref()),
                )
            })
            .collect())
    }

    async fn fetch_data_articles(
        &self,
        source: Source,
        url: &Option<String>,
        setting: &str,
    ) -> Result<Vec<CrumbRecord>> {
        let url = require(source, url, setting)?;
        let data: DataResponse<DataArticle> = self.get_json(source, self.client.get(url)).await?;

        Ok(data
            .data
            .into_iter()
            .filter_map(|article| {
                record(
                    article.title,
                    article.url,
                    article.description,
                    article.source.or_else(|| Some(source.default_name().to_string())),
                    parse_published(article.published_at.as_deref()),
                )
            })
            .collect())
    }

    async fn fetch_finnhub(&self, source: Source) -> Result<Vec<CrumbRecord>> {
        let url = require(source, &self.config.finnhub_url, "FINNHUB_API_URL")?;
        let articles: Vec<FinnhubArticle> = self.get_json(source, self.client.get(url)).await?;

        Ok(articles
            .into_iter()
            .filter_map(|article| {
                record(
                    article.headline,
                    article.url,
                    article.summary,
                    article.source.or_else(|| Some(source.default_name().to_string())),
                    article
                        .datetime
                        .and_then(|secs| DateTime::from_timestamp(secs, 0)),
                )
            })
            .collect())
    }

    /// Top chart artists, each with a second request for the biography.
    async fn fetch_lastfm_artists(&self, source: Source) -> Result<Vec<CrumbRecord>> {
        let base_url = require(source, &self.config.lastfm_base_url, "LASTFM_BASE_URL")?;
        let api_key = require(source, &self.config.lastfm_api_key, "LASTFM_API_KEY")?;

        let chart_url = format!(
            "{}?method=chart.gettopartists&api_key={}&format=json&limit={}",
            base_url,
            urlencoding::encode(api_key),
            LASTFM_ARTIST_LIMIT
        );
        let chart: LastFmTopArtists = self.get_json(source, self.client.get(chart_url)).await?;
        let artists = chart.artists.map(|a| a.artist).unwrap_or_default();

        let mut records = Vec::new();
        for artist in artists {
            let Some(name) = artist.name.filter(|n| !n.trim().is_empty()) else {
                continue;
            };

            // Last.fm allows about five requests per second
            tokio::time::sleep(LASTFM_PAUSE).await;

            let bio = match self.fetch_lastfm_bio(source, base_url, api_key, &name).await {
                Ok(bio) => bio,
                Err(e) => {
                    tracing::warn!("Last.fm bio for {:?} unavailable: {}", name, e);
                    None
                }
            };

            if let Some(r) = record(
                Some(format!("Artist Profile: {}", name)),
                artist.url,
                Some(bio.unwrap_or_else(|| LASTFM_FALLBACK_BIO.to_string())),
                Some(source.default_name().to_string()),
                None,
            ) {
                records.push(r);
            }
        }

        Ok(records)
    }

    async fn fetch_lastfm_bio(
        &self,
        source: Source,
        base_url: &str,
        api_key: &str,
        artist: &str,
    ) -> Result<Option<String>> {
        let info_url = format!(
            "{}?method=artist.getInfo&artist={}&api_key={}&format=json",
            base_url,
            urlencoding::encode(artist),
            urlencoding::encode(api_key)
        );
        let info: LastFmArtistInfo = self.get_json(source, self.client.get(info_url)).await?;

        let bio = info
            .artist
            .and_then(|a| a.bio)
            .and_then(|b| b.summary)
            .map(|summary| strip_read_more(&summary))
            .filter(|summary| !summary.is_empty());
        Ok(bio)
    }

    async fn fetch_spoonacular(&self, source: Source) -> Result<Vec<CrumbRecord>> {
        let url = require(source, &self.config.spoonacular_url, "SPOONACULAR_API_URL")?;
        let api_key = require(source, &self.config.spoonacular_api_key, "SPOONACULAR_API_KEY")?;

        let count = SPOONACULAR_RECIPE_COUNT.to_string();
        let request = self
            .client
            .get(url)
            .query(&[("apiKey", api_key), ("number", count.as_str())]);
        let data: SpoonacularResponse = self.get_json(source, request).await?;

        Ok(data
            .recipes
            .into_iter()
            .filter_map(|recipe| {
                let summary = recipe
                    .summary
                    .filter(|s| !s.trim().is_empty())
                    .or(recipe.instructions);
                record(
                    recipe.title,
                    recipe.source_url,
                    summary,
                    Some(source.default_name().to_string()),
                    None,
                )
            })
            .collect())
    }

    async fn fetch_perenual(&self, source: Source) -> Result<Vec<CrumbRecord>> {
        let url = require(source, &self.config.perenual_url, "PARENUAL_API_URL")?;
        let data: DataResponse<PerenualGuide> = self.get_json(source, self.client.get(url)).await?;

        Ok(data
            .data
            .into_iter()
            .filter_map(|guide| {
                let care_guide = guide.care_guide.filter(|g| !g.is_null())?;
                let description = care_guide
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                record(
                    Some(guide.common_name.unwrap_or_else(|| "Care Guide".to_string())),
                    guide.slug,
                    description,
                    Some(source.default_name().to_string()),
                    None,
                )
            })
            .collect())
    }

    async fn fetch_trefle(&self, source: Source) -> Result<Vec<CrumbRecord>> {
        let url = require(source, &self.config.trefle_url, "TREFLE_API_URL")?;
        let base = Url::parse(url).map_err(|e| AppError::Source {
            source_id: source.id().to_string(),
            message: format!("invalid URL {:?}: {}", url, e),
        })?;
        let data: DataResponse<TreflePlant> = self.get_json(source, self.client.get(url)).await?;

        Ok(data
            .data
            .into_iter()
            .filter_map(|plant| {
                // links.self is usually relative to the API host
                let link = plant
                    .links
                    .and_then(|l| l.self_link)
                    .and_then(|l| base.join(&l).ok())
                    .map(String::from);
                record(
                    Some(plant.common_name.unwrap_or_else(|| "Plant Info".to_string())),
                    link,
                    plant.scientific_name,
                    Some(source.default_name().to_string()),
                    None,
                )
            })
            .collect())
    }

    async fn fetch_permapeople(&self, source: Source) -> Result<Vec<CrumbRecord>> {
        let url = require(source, &self.config.permapeople_url, "PERMAPEOPLE_API_URL")?;
        let key_id = require(source, &self.config.permapeople_key_id, "PERMAPEOPLE_KEY_ID")?;
        let key_secret =
            require(source, &self.config.permapeople_key_secret, "PERMAPEOPLE_KEY_SECRET")?;

        let request = self
            .client
            .get(url)
            .header("x-permapeople-key-id", key_id)
            .header("x-permapeople-key-secret", key_secret);
        let data: DataResponse<PermaPeoplePlant> = self.get_json(source, request).await?;

        Ok(data
            .data
            .into_iter()
            .filter_map(|plant| {
                let id = match plant.id? {
                    Value::Number(n) => n.to_string(),
                    Value::String(s) if !s.is_empty() => s,
                    _ => return None,
                };
                record(
                    Some(plant.name.unwrap_or_else(|| "PermaPlant Info".to_string())),
                    Some(format!("{}/{}", PERMAPEOPLE_PLANT_URL, id)),
                    plant.description,
                    Some(source.default_name().to_string()),
                    None,
                )
            })
            .collect())
    }

    async fn fetch_useless_fact(&self, source: Source) -> Result<Vec<CrumbRecord>> {
        let url = require(source, &self.config.useless_facts_url, "USELESS_FACTS_API_URL")?;
        let fact: UselessFact = self.get_json(source, self.client.get(url)).await?;

        Ok(record(
            Some("Useless Fact".to_string()),
            fact.source_url.or_else(|| Some(USELESS_FACTS_HOME.to_string())),
            fact.text,
            Some(source.default_name().to_string()),
            None,
        )
        .into_iter()
        .collect())
    }

    async fn fetch_chucknorris_joke(&self, source: Source) -> Result<Vec<CrumbRecord>> {
        let url = require(source, &self.config.chucknorris_url, "CHUCKNORRIS_API_URL")?;
        let joke: ChuckNorrisJoke = self.get_json(source, self.client.get(url)).await?;

        Ok(record(
            Some("Chuck Norris Joke".to_string()),
            joke.url.or_else(|| Some(CHUCKNORRIS_HOME.to_string())),
            joke.value,
            Some(source.default_name().to_string()),
            None,
        )
        .into_iter()
        .collect())
    }
}

fn require<'a>(source: Source, value: &'a Option<String>, setting: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Source {
            source_id: source.id().to_string(),
            message: format!("{} is not set", setting),
        })
}

/// Build a record, dropping it when the title or URL is missing or blank.
fn record(
    title: Option<String>,
    url: Option<String>,
    summary: Option<String>,
    source: Option<String>,
    published_at: Option<DateTime<Utc>>,
) -> Option<CrumbRecord> {
    let title = title.filter(|t| !t.trim().is_empty())?;
    let url = url.filter(|u| !u.trim().is_empty())?;

    Some(CrumbRecord {
        title,
        summary,
        url: Some(url),
        source: source.filter(|s| !s.trim().is_empty()),
        published_at,
    })
}

fn parse_published(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    parse_datetime(value).or_else(|| {
        value
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    })
}

fn strip_read_more(bio: &str) -> String {
    bio.split(LASTFM_READ_MORE)
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

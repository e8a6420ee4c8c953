//! Response shapes of the upstream APIs. Only the fields that end up on a
//! crumb are modelled, and all of them are optional.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NewsDataResponse {
    pub results: Vec<NewsDataArticle>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NewsDataArticle {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub source_id: Option<String>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NewsApiResponse {
    pub articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NewsApiArticle {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub source: Option<NewsApiSource>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NewsApiSource {
    pub name: Option<String>,
}

/// TheNewsAPI and Mediastack share this `data[]` layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct DataResponse<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct DataArticle {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub published_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct FinnhubArticle {
    pub headline: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub source: Option<String>,
    pub datetime: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SpoonacularResponse {
    pub recipes: Vec<SpoonacularRecipe>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SpoonacularRecipe {
    pub title: Option<String>,
    #[serde(rename = "sourceUrl")]
    pub source_url: Option<String>,
    pub summary: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PerenualGuide {
    pub common_name: Option<String>,
    pub slug: Option<String>,
    pub care_guide: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct TreflePlant {
    pub common_name: Option<String>,
    pub scientific_name: Option<String>,
    pub links: Option<TrefleLinks>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct TrefleLinks {
    #[serde(rename = "self")]
    pub self_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PermaPeoplePlant {
    pub id: Option<Value>,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LastFmTopArtists {
    pub artists: Option<LastFmArtistList>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LastFmArtistList {
    pub artist: Vec<LastFmArtist>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LastFmArtist {
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LastFmArtistInfo {
    pub artist: Option<LastFmArtistDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LastFmArtistDetail {
    pub bio: Option<LastFmBio>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LastFmBio {
    pub summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct UselessFact {
    pub text: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ChuckNorrisJoke {
    pub value: Option<String>,
    pub url: Option<String>,
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

pub const DEFAULT_SUMMARIZER_URL: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-cnn";
pub const DEFAULT_STRIPE_API_URL: &str = "https://api.stripe.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub summarizer: SummarizerConfig,

    #[serde(default)]
    pub stripe: StripeConfig,

    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default = "default_summarizer_url")]
    pub api_url: String,
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    #[serde(default = "default_stripe_api_url")]
    pub api_url: String,
    pub secret_key: Option<String>,
    pub public_key: Option<String>,
    pub webhook_secret: Option<String>,
}

/// Endpoints and credentials for every content source. A source whose
/// URL is unset is skipped by its fetcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub newsdata_world_url: Option<String>,
    pub newsapi_world_url: Option<String>,
    pub lastfm_base_url: Option<String>,
    pub lastfm_api_key: Option<String>,
    pub newsdata_music_url: Option<String>,
    pub thenewsapi_sports_url: Option<String>,
    pub newsdata_fitness_url: Option<String>,
    pub finnhub_url: Option<String>,
    pub spoonacular_url: Option<String>,
    pub spoonacular_api_key: Option<String>,
    pub mediastack_technology_url: Option<String>,
    pub perenual_url: Option<String>,
    pub trefle_url: Option<String>,
    pub permapeople_url: Option<String>,
    pub permapeople_key_id: Option<String>,
    pub permapeople_key_secret: Option<String>,
    pub newsdata_environment_url: Option<String>,
    pub useless_facts_url: Option<String>,
    pub chucknorris_url: Option<String>,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("infocrumbs");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("infocrumbs.db").to_string_lossy().to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_summarizer_url() -> String {
    DEFAULT_SUMMARIZER_URL.to_string()
}

fn default_stripe_api_url() -> String {
    DEFAULT_STRIPE_API_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            port: default_port(),
            summarizer: SummarizerConfig::default(),
            stripe: StripeConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_url: default_summarizer_url(),
            api_token: None,
        }
    }
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_url: default_stripe_api_url(),
            secret_key: None,
            public_key: None,
            webhook_secret: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            config
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("infocrumbs")
            .join("config.toml")
    }

    /// Overlay values from `lookup` (the process environment in production)
    /// onto the loaded file. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("INFOCRUMBS_DB_PATH") {
            self.db_path = path;
        }
        if let Some(port) = get("INFOCRUMBS_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(e) => tracing::warn!("Ignoring invalid INFOCRUMBS_PORT {:?}: {}", port, e),
            }
        }
        if let Some(url) = get("HF_API_URL") {
            self.summarizer.api_url = url;
        }
        if let Some(url) = get("STRIPE_API_URL") {
            self.stripe.api_url = url;
        }

        let optional: [(&str, &mut Option<String>); 23] = [
            ("HF_API_TOKEN", &mut self.summarizer.api_token),
            ("STRIPE_SECRET_KEY", &mut self.stripe.secret_key),
            ("STRIPE_PUBLIC_KEY", &mut self.stripe.public_key),
            ("STRIPE_WH_SECRET", &mut self.stripe.webhook_secret),
            ("NEWSDATA_WORLD_NEWS_URL", &mut self.sources.newsdata_world_url),
            ("NEWS_API_URL", &mut self.sources.newsapi_world_url),
            ("LASTFM_BASE_URL", &mut self.sources.lastfm_base_url),
            ("LASTFM_API_KEY", &mut self.sources.lastfm_api_key),
            ("NEWSDATA_MUSIC_NEWS_URL", &mut self.sources.newsdata_music_url),
            ("THENEWSAPI_SPORTS_URL", &mut self.sources.thenewsapi_sports_url),
            ("NEWSDATA_FITNESS_URL", &mut self.sources.newsdata_fitness_url),
            ("FINNHUB_API_URL", &mut self.sources.finnhub_url),
            ("SPOONACULAR_API_URL", &mut self.sources.spoonacular_url),
            ("SPOONACULAR_API_KEY", &mut self.sources.spoonacular_api_key),
            ("MEDIASTACK_TECHNOLOGY_URL", &mut self.sources.mediastack_technology_url),
            ("PARENUAL_API_URL", &mut self.sources.perenual_url),
            ("TREFLE_API_URL", &mut self.sources.trefle_url),
            ("PERMAPEOPLE_API_URL", &mut self.sources.permapeople_url),
            ("PERMAPEOPLE_KEY_ID", &mut self.sources.permapeople_key_id),
            ("PERMAPEOPLE_KEY_SECRET", &mut self.sources.permapeople_key_secret),
            ("NEWSDATA_API_URL", &mut self.sources.newsdata_environment_url),
            ("USELESS_FACTS_API_URL", &mut self.sources.useless_facts_url),
            ("CHUCKNORRIS_API_URL", &mut self.sources.chucknorris_url),
        ];

        for (key, slot) in optional {
            if let Some(value) = get(key) {
                *slot = Some(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.port, 8000);
        assert_eq!(config.summarizer.api_url, DEFAULT_SUMMARIZER_URL);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
db_path = "/tmp/crumbs.db"

[sources]
finnhub_url = "https://finnhub.io/api/v1/news?category=general"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.db_path, "/tmp/crumbs.db");
        assert_eq!(config.stripe.api_url, DEFAULT_STRIPE_API_URL);
        assert!(config.sources.finnhub_url.is_some());
        assert!(config.sources.trefle_url.is_none());
    }

    #[test]
    fn overrides_replace_file_values_and_skip_blanks() {
        let mut config = Config {
            db_path: "file.db".to_string(),
            ..Config::default()
        };
        let env: HashMap<&str, &str> = [
            ("INFOCRUMBS_DB_PATH", "env.db"),
            ("INFOCRUMBS_PORT", "9090"),
            ("HF_API_TOKEN", "hf_token"),
            ("STRIPE_WH_SECRET", "whsec_123"),
            ("TREFLE_API_URL", "   "),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.db_path, "env.db");
        assert_eq!(config.port, 9090);
        assert_eq!(config.summarizer.api_token.as_deref(), Some("hf_token"));
        assert_eq!(config.stripe.webhook_secret.as_deref(), Some("whsec_123"));
        assert!(config.sources.trefle_url.is_none());
    }

    #[test]
    fn invalid_port_override_keeps_previous_value() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "INFOCRUMBS_PORT").then(|| "http".to_string()));
        assert_eq!(config.port, 8000);
    }
}

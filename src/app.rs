use std::sync::Arc;

use crate::ai::Summarizer;
use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::models::User;
use crate::pipeline::{IngestReport, Orchestrator};
use crate::sources::{Fetcher, Source};
use crate::web::{self, AppState};

/// Long-lived services built from the configuration, shared by every
/// command.
pub struct App {
    pub config: Config,
    pub repository: Arc<Repository>,
    fetcher: Fetcher,
    summarizer: Option<Summarizer>,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let repository = Arc::new(Repository::new(&config.db_path).await?);
        let fetcher = Fetcher::new(config.sources.clone())?;

        let summarizer = match config.summarizer.api_token.as_deref() {
            Some(token) if !token.is_empty() => Some(Summarizer::new(
                config.summarizer.api_url.clone(),
                token.to_string(),
            )?),
            _ => {
                tracing::warn!("HF_API_TOKEN not set, crumbs keep their cleaned source text");
                None
            }
        };

        Ok(Self {
            config,
            repository,
            fetcher,
            summarizer,
        })
    }

    pub async fn fetch_crumbs(&self, only: &[Source]) -> IngestReport {
        Orchestrator::new(&self.fetcher, &self.repository, self.summarizer.as_ref())
            .run(only)
            .await
    }

    pub async fn create_user(&self, username: &str, email: &str) -> Result<User> {
        let user = self.repository.create_user(username, email).await?;
        tracing::info!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn serve(&self, port: u16) -> Result<()> {
        let state = AppState::from_config(Arc::clone(&self.repository), &self.config)?;
        web::serve(state, port).await
    }
}

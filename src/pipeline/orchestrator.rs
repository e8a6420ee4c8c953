use crate::ai::Summarizer;
use crate::db::Repository;
use crate::sources::{Fetcher, Source};

use super::handler::CrumbHandler;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCount {
    pub source: Source,
    pub created: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub per_source: Vec<SourceCount>,
    pub total: usize,
}

/// Runs every selected source's fetch-then-handle pair, one after another.
pub struct Orchestrator<'a> {
    fetcher: &'a Fetcher,
    handler: CrumbHandler<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        fetcher: &'a Fetcher,
        repository: &'a Repository,
        summarizer: Option<&'a Summarizer>,
    ) -> Self {
        Self {
            fetcher,
            handler: CrumbHandler::new(repository, summarizer),
        }
    }

    /// Ingest the given sources, or all of them when `only` is empty.
    pub async fn run(&self, only: &[Source]) -> IngestReport {
        let mut report = IngestReport::default();

        for source in Source::ALL {
            if !only.is_empty() && !only.contains(&source) {
                continue;
            }

            tracing::info!("Fetching {}...", source.default_name());
            let records = self.fetcher.fetch(source).await;
            let created = self
                .handler
                .handle(source.domain(), source.default_name(), records)
                .await;
            tracing::info!("{} crumbs saved from {}", created, source.default_name());

            report.total += created;
            report.per_source.push(SourceCount { source, created });
        }

        tracing::info!("Total crumbs added: {}", report.total);
        report
    }
}

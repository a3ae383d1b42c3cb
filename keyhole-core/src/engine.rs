use crate::error::{EngineError, Result};
use crate::record::{DiscoveryReport, DomainRecord, domain_of};
use crate::store::KnowledgeStore;
use keyhole_extract::{classify, extract_embedded, extract_endpoints};
use tokio::task;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_API_MARKER: &str = "/api/";

/// Knobs for a discovery run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path substring that marks a link/form/script target as an API
    /// endpoint candidate.
    pub api_marker: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_marker: DEFAULT_API_MARKER.to_string(),
        }
    }
}

/// Composes the extractors and classifier against a fetched page and merges
/// the outcome into the knowledge store.
pub struct DiscoveryEngine {
    store: KnowledgeStore,
    config: EngineConfig,
}

impl DiscoveryEngine {
    pub fn new(store: KnowledgeStore) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: KnowledgeStore, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// Runs a full discovery pass over one fetched page.
    ///
    /// Extraction heuristics finding nothing is success with empty sets; the
    /// only failure modes are a bad page URL and store trouble.
    pub async fn discover(&self, url: &str, html: &str) -> Result<DiscoveryReport> {
        let page_url = Url::parse(url).map_err(|e| EngineError::InvalidUrl(e.to_string()))?;
        let domain = domain_of(&page_url);
        debug!("discovery run for {} ({})", domain, url);

        // Both extractors are pure; run them side by side off the async
        // worker threads.
        let endpoints_task = {
            let page_url = page_url.clone();
            let html = html.to_string();
            let marker = self.config.api_marker.clone();
            task::spawn_blocking(move || extract_endpoints(&page_url, &html, &marker))
        };
        let embedded_task = {
            let html = html.to_string();
            task::spawn_blocking(move || extract_embedded(&html))
        };
        let (endpoints, embedded) = (endpoints_task.await?, embedded_task.await?);

        let prior = self.store.snapshot(&domain).await?;
        let profile = classify(
            &page_url,
            html,
            &embedded,
            prior.as_ref().and_then(|r| r.authentication.as_ref()),
        );

        let (record, new_endpoints) = self
            .store
            .merge(&domain, endpoints, profile, embedded)
            .await?;

        info!(
            "{}: scheme {}, {} new endpoint(s) this run",
            domain,
            record
                .authentication
                .as_ref()
                .map(|a| a.scheme.as_str())
                .unwrap_or("unknown"),
            new_endpoints.len()
        );

        Ok(DiscoveryReport {
            record,
            new_endpoints,
        })
    }

    /// Prior knowledge for a URL's domain without re-running extraction.
    /// Never touches `discovery_count`.
    pub async fn cached(&self, url: &str) -> Result<Option<DomainRecord>> {
        let page_url = Url::parse(url).map_err(|e| EngineError::InvalidUrl(e.to_string()))?;
        Ok(self.store.snapshot(&domain_of(&page_url)).await?)
    }
}

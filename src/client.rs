//! High-level search client.

use std::sync::Arc;

use crate::config::Config;
use crate::error::KakenError;
use crate::models::{
    Project, ProjectSearchParams, Researcher, ResearcherSearchParams, SearchResponse,
};
use crate::parsers::{parse_projects, parse_researchers};
use crate::utils::{Fetcher, HttpTransport, RawResponse, ResponseCache, Transport};

/// Client for the KAKEN project and researcher search endpoints
#[derive(Debug, Clone)]
pub struct KakenClient {
    config: Config,
    fetcher: Arc<Fetcher>,
}

impl KakenClient {
    /// Create a client that talks HTTP
    pub fn new(config: Config) -> Result<Self, KakenError> {
        let transport = HttpTransport::with_user_agent(&config.network.user_agent)
            .map_err(|e| KakenError::request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let cache = ResponseCache::from_config(&config.cache);
        let fetcher = Fetcher::new(
            transport,
            cache,
            config.network.retry_config(),
            config.network.timeout(),
        );
        Self {
            config,
            fetcher: Arc::new(fetcher),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &ResponseCache {
        self.fetcher.cache()
    }

    /// Search grant projects
    pub async fn search_projects(
        &self,
        params: &ProjectSearchParams,
    ) -> Result<SearchResponse<Project>, KakenError> {
        let url = params.build_url(&self.config.projects_endpoint, self.config.app_id.as_deref())?;
        tracing::info!("Searching projects: {}", redact(url.as_str()));

        let response = self.get(url.as_str()).await?;
        parse_projects(&response.body)
    }

    /// Search researchers
    pub async fn search_researchers(
        &self,
        params: &ResearcherSearchParams,
    ) -> Result<SearchResponse<Researcher>, KakenError> {
        let url =
            params.build_url(&self.config.researchers_endpoint, self.config.app_id.as_deref())?;
        tracing::info!("Searching researchers: {}", redact(url.as_str()));

        let response = self.get(url.as_str()).await?;
        parse_researchers(&response.body)
    }

    /// Remove every cached response
    pub fn clear_cache(&self) {
        self.fetcher.cache().clear();
    }

    async fn get(&self, url: &str) -> Result<RawResponse, KakenError> {
        let response = self.fetcher.fetch(url).await?;
        if response.from_cache {
            tracing::debug!("Serving {} from cache", redact(url));
        }

        if response.is_success() {
            return Ok(response);
        }
        match response.status {
            404 => Err(KakenError::NotFound {
                message: format!("No resource at {}", redact(url)),
            }),
            status => Err(KakenError::Request {
                message: format!("HTTP {}", status),
                status: Some(status),
            }),
        }
    }
}

/// Hide the application id in logged URLs
fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            let pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .map(|(k, v)| {
                    let v = if k == "appid" { "***".into() } else { v };
                    (k.into_owned(), v.into_owned())
                })
                .collect();
            parsed.query_pairs_mut().clear().extend_pairs(pairs);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use watchfinder_core::config::SearchConfig;
use watchfinder_core::domain::product::{Product, ProductId, SearchResults};
use watchfinder_core::query::CompiledQuery;
use watchfinder_core::search::{CatalogSearch, SearchError};

/// Catalog search backed by a hosted Azure Cognitive Search index.
pub struct AzureSearchClient {
    client: Client,
    search_url: Url,
    api_key: SecretString,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    search: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
    count: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "@odata.count")]
    count: Option<usize>,
    #[serde(default)]
    value: Vec<SearchDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchDocument {
    product_id: String,
    product_name: String,
    #[serde(default)]
    product_image: String,
    #[serde(default)]
    product_url: String,
    #[serde(rename = "@search.score", default)]
    score: f64,
}

impl From<SearchDocument> for Product {
    fn from(document: SearchDocument) -> Self {
        Product {
            id: ProductId(document.product_id),
            name: document.product_name,
            image_url: document.product_image,
            detail_url: document.product_url,
            score: document.score,
        }
    }
}

impl AzureSearchClient {
    pub fn new(
        endpoint: &str,
        index_name: &str,
        api_version: &str,
        api_key: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, SearchError> {
        let search_url = search_url(endpoint, index_name, api_version)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|error| SearchError::Request(error.to_string()))?;
        Ok(Self { client, search_url, api_key, timeout_secs: timeout_secs.max(1) })
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| SearchError::Request("search.endpoint is not configured".to_string()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| SearchError::Request("search.api_key is not configured".to_string()))?;
        Self::new(endpoint, &config.index_name, &config.api_version, api_key, config.timeout_secs)
    }

    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    fn map_transport_error(&self, error: reqwest::Error) -> SearchError {
        if error.is_timeout() {
            SearchError::Timeout(self.timeout_secs)
        } else {
            SearchError::Request(error.to_string())
        }
    }
}

fn search_url(endpoint: &str, index_name: &str, api_version: &str) -> Result<Url, SearchError> {
    let base = endpoint.trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/indexes/{index_name}/docs/search"))
        .map_err(|error| SearchError::Request(format!("invalid search endpoint: {error}")))?;
    url.query_pairs_mut().append_pair("api-version", api_version);
    Ok(url)
}

fn request_body(query: &CompiledQuery) -> SearchRequest<'_> {
    let filter = (!query.filter.is_universal()).then(|| query.filter.render());
    SearchRequest { search: &query.free_text, filter, count: true }
}

#[async_trait]
impl CatalogSearch for AzureSearchClient {
    async fn search(&self, query: &CompiledQuery) -> Result<SearchResults, SearchError> {
        let body = request_body(query);
        debug!(
            event_name = "search.request",
            filter = body.filter.as_deref().unwrap_or(""),
            search = body.search,
            "issuing catalog search"
        );

        let response = self
            .client
            .post(self.search_url.clone())
            .header("api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| self.map_transport_error(error))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(
                event_name = "search.status_error",
                status = status.as_u16(),
                "catalog search returned an error status"
            );
            return Err(SearchError::Status { status: status.as_u16(), message });
        }

        let payload: SearchResponse = response.json().await.map_err(|error| {
            if error.is_timeout() {
                SearchError::Timeout(self.timeout_secs)
            } else {
                SearchError::Decode(error.to_string())
            }
        })?;

        let products = payload.value.into_iter().map(Product::from).collect();
        let results = SearchResults::new(products);
        Ok(match payload.count {
            Some(count) => results.with_total_count(count),
            None => results,
        })
    }
}

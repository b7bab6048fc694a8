use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::product::{Product, ProductId, SearchResults};
use crate::query::{CatalogField, CompiledQuery, FilterExpression, Predicate, MATCH_ALL};
use crate::router::SHORTLIST_LIMIT;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(String),
    #[error("search service returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("search response could not be decoded: {0}")]
    Decode(String),
    #[error("search request timed out after {0}s")]
    Timeout(u64),
    #[error("catalog could not be loaded: {0}")]
    Catalog(String),
}

/// External catalog search collaborator.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search(&self, query: &CompiledQuery) -> Result<SearchResults, SearchError>;

    /// Exact-name lookup used by the select step.
    async fn find_by_name(&self, name: &str) -> Result<SearchResults, SearchError> {
        self.search(&CompiledQuery::product_lookup(name)).await
    }
}

#[async_trait]
impl<T> CatalogSearch for Arc<T>
where
    T: CatalogSearch + ?Sized,
{
    async fn search(&self, query: &CompiledQuery) -> Result<SearchResults, SearchError> {
        (**self).search(query).await
    }

    async fn find_by_name(&self, name: &str) -> Result<SearchResults, SearchError> {
        (**self).find_by_name(name).await
    }
}

/// Catalog entry carrying the attributes the filter predicates inspect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub product_id: String,
    pub product_name: String,
    pub product_image: String,
    pub product_url: String,
    pub color: String,
    pub strap_material: String,
    pub case_width_mm: f32,
    #[serde(default)]
    pub description: String,
}

impl CatalogEntry {
    fn matches(&self, filter: &FilterExpression) -> bool {
        filter
            .groups
            .iter()
            .all(|group| group.predicates.iter().any(|predicate| self.satisfies(predicate)))
    }

    fn satisfies(&self, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::CaseWidthAtLeast(mm) => self.case_width_mm >= *mm as f32,
            Predicate::CaseWidthAtMost(mm) => self.case_width_mm <= *mm as f32,
            Predicate::Equals { field: CatalogField::Color, value } => &self.color == value,
            Predicate::Equals { field: CatalogField::StrapMaterial, value } => {
                &self.strap_material == value
            }
            Predicate::Equals { field: CatalogField::ProductName, value } => {
                &self.product_name == value
            }
        }
    }

    /// Number of free-text tokens found in the name or description.
    fn text_score(&self, tokens: &[String]) -> usize {
        let haystack =
            format!("{} {}", self.product_name, self.description).to_ascii_lowercase();
        tokens.iter().filter(|token| haystack.contains(token.as_str())).count()
    }

    fn to_product(&self, score: f64) -> Product {
        Product {
            id: ProductId(self.product_id.clone()),
            name: self.product_name.clone(),
            image_url: self.product_image.clone(),
            detail_url: self.product_url.clone(),
            score,
        }
    }
}

/// In-process catalog honouring the same query contract as the hosted index:
/// filters are exact, free text matches any token, results are ordered by score.
#[derive(Clone, Debug)]
pub struct InMemoryCatalog {
    entries: Vec<CatalogEntry>,
    page_size: usize,
}

impl InMemoryCatalog {
    pub const DEFAULT_PAGE_SIZE: usize = 50;

    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries, page_size: Self::DEFAULT_PAGE_SIZE }
    }

    /// Parses a JSON array of catalog entries (camelCase keys).
    pub fn from_json(raw: &str) -> Result<Self, SearchError> {
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(raw).map_err(|error| SearchError::Catalog(error.to_string()))?;
        Ok(Self::new(entries))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, SearchError> {
        let raw = fs::read_to_string(path).map_err(|error| {
            SearchError::Catalog(format!("could not read `{}`: {error}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Never smaller than a full shortlist, so every routed shortlist is complete.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(SHORTLIST_LIMIT);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evaluate(&self, query: &CompiledQuery) -> SearchResults {
        let tokens = text_tokens(&query.free_text);

        let mut scored = self
            .entries
            .iter()
            .filter(|entry| entry.matches(&query.filter))
            .filter_map(|entry| {
                if tokens.is_empty() {
                    return Some((entry, 1usize));
                }
                let score = entry.text_score(&tokens);
                (score > 0).then_some((entry, score))
            })
            .collect::<Vec<_>>();
        scored.sort_by(|left, right| right.1.cmp(&left.1));

        let total_count = scored.len();
        let products = scored
            .into_iter()
            .take(self.page_size)
            .map(|(entry, score)| entry.to_product(score as f64))
            .collect();

        SearchResults::new(products).with_total_count(total_count)
    }
}

#[async_trait]
impl CatalogSearch for InMemoryCatalog {
    async fn search(&self, query: &CompiledQuery) -> Result<SearchResults, SearchError> {
        Ok(self.evaluate(query))
    }
}

fn text_tokens(free_text: &str) -> Vec<String> {
    free_text
        .split_whitespace()
        .filter(|token| *token != MATCH_ALL)
        .map(str::to_ascii_lowercase)
        .collect()
}

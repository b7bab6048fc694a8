use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

/// A catalog record as returned by the search collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub image_url: String,
    pub detail_url: String,
    pub score: f64,
}

impl Product {
    /// Value posted back by the "reserve" card action. Spaces are carried as
    /// underscores so the recognizer sees the product name as a single token.
    pub fn reserve_action_value(&self) -> String {
        format!("Reserve {}", self.name.replace(' ', "_"))
    }
}

/// Ordered result page from one search call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub total_count: Option<usize>,
    pub products: Vec<Product>,
}

impl SearchResults {
    pub fn new(products: Vec<Product>) -> Self {
        Self { total_count: None, products }
    }

    pub fn with_total_count(mut self, total_count: usize) -> Self {
        self.total_count = Some(total_count);
        self
    }

    /// Number of matches the router should reason about. Prefers the count
    /// reported by the search service over the length of the returned page.
    pub fn cardinality(&self) -> usize {
        self.total_count.unwrap_or(self.products.len())
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn first(&self) -> Option<&Product> {
        self.products.first()
    }
}

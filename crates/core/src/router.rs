use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, SearchResults};
use crate::domain::slot::Slot;
use crate::preferences::PreferenceStore;

/// Largest result count presented as a browsable shortlist.
pub const SHORTLIST_LIMIT: usize = 5;

/// Slots checked, in order, when the result set is too large to present.
pub const NARROWING_PRIORITY: [Slot; 4] =
    [Slot::Gender, Slot::Colors, Slot::Bands, Slot::Impressions];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouterDecision {
    NoMatches,
    ShowSingle { product: Product },
    ShowShortlist { products: Vec<Product> },
    AskNarrowing { count: usize, next_slot: Slot },
    /// Too many matches and every narrowing slot is already filled.
    Exhausted { count: usize },
}

impl RouterDecision {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoMatches => "no_matches",
            Self::ShowSingle { .. } => "show_single",
            Self::ShowShortlist { .. } => "show_shortlist",
            Self::AskNarrowing { .. } => "ask_narrowing",
            Self::Exhausted { .. } => "exhausted",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResultRouter {
    priority: Vec<Slot>,
    shortlist_limit: usize,
}

impl Default for ResultRouter {
    fn default() -> Self {
        Self { priority: NARROWING_PRIORITY.to_vec(), shortlist_limit: SHORTLIST_LIMIT }
    }
}

impl ResultRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: Vec<Slot>) -> Self {
        self.priority = priority;
        self
    }

    pub fn route(&self, results: SearchResults, preferences: &PreferenceStore) -> RouterDecision {
        let count = results.cardinality();
        let mut products = results.products;

        match count {
            0 => RouterDecision::NoMatches,
            1 => match products.into_iter().next() {
                Some(product) => RouterDecision::ShowSingle { product },
                None => RouterDecision::NoMatches,
            },
            n if n <= self.shortlist_limit => {
                products.truncate(n);
                RouterDecision::ShowShortlist { products }
            }
            n => match self.next_narrowing_slot(preferences) {
                Some(next_slot) => RouterDecision::AskNarrowing { count: n, next_slot },
                None => RouterDecision::Exhausted { count: n },
            },
        }
    }

    pub fn next_narrowing_slot(&self, preferences: &PreferenceStore) -> Option<Slot> {
        self.priority.iter().copied().find(|slot| preferences.is_empty(*slot))
    }
}

#[cfg(test)]
mod tests {
    use super::{ResultRouter, RouterDecision};
    use crate::domain::product::{Product, ProductId, SearchResults};
    use crate::domain::slot::Slot;
    use crate::preferences::PreferenceStore;

    fn products(count: usize) -> SearchResults {
        SearchResults::new(
            (0..count)
                .map(|index| Product {
                    id: ProductId(format!("W-{index:03}")),
                    name: format!("Watch {index}"),
                    image_url: format!("https://img.example/{index}.png"),
                    detail_url: format!("https://shop.example/{index}"),
                    score: 1.0,
                })
                .collect(),
        )
    }

    fn filled_store() -> PreferenceStore {
        PreferenceStore {
            gender: Some("Mens".to_string()),
            colors: vec!["Black".to_string()],
            bands: vec!["Leather".to_string()],
            impressions: vec!["Elegant".to_string()],
            scenes: Vec::new(),
        }
    }

    #[test]
    fn zero_results_is_no_matches() {
        let decision = ResultRouter::new().route(products(0), &PreferenceStore::default());
        assert_eq!(decision, RouterDecision::NoMatches);
    }

    #[test]
    fn one_result_is_show_single() {
        let decision = ResultRouter::new().route(products(1), &PreferenceStore::default());
        assert!(matches!(
            decision,
            RouterDecision::ShowSingle { ref product } if product.name == "Watch 0"
        ));
    }

    #[test]
    fn five_results_is_shortlist_of_five() {
        let decision = ResultRouter::new().route(products(5), &PreferenceStore::default());
        assert!(matches!(
            decision,
            RouterDecision::ShowShortlist { ref products } if products.len() == 5
        ));
    }

    #[test]
    fn two_results_is_shortlist() {
        let decision = ResultRouter::new().route(products(2), &PreferenceStore::default());
        assert_eq!(decision.label(), "show_shortlist");
    }

    #[test]
    fn six_results_asks_for_narrowing_with_count() {
        let decision = ResultRouter::new().route(products(6), &PreferenceStore::default());
        assert_eq!(decision, RouterDecision::AskNarrowing { count: 6, next_slot: Slot::Gender });
    }

    #[test]
    fn reported_total_drives_routing_over_page_size() {
        let page = products(3).with_total_count(40);
        let decision = ResultRouter::new().route(page, &PreferenceStore::default());
        assert_eq!(decision, RouterDecision::AskNarrowing { count: 40, next_slot: Slot::Gender });
    }

    #[test]
    fn narrowing_walks_priority_order() {
        let router = ResultRouter::new();
        let mut store = PreferenceStore::default();
        assert_eq!(router.next_narrowing_slot(&store), Some(Slot::Gender));

        store.gender = Some("Mens".to_string());
        assert_eq!(router.next_narrowing_slot(&store), Some(Slot::Colors));

        store.colors.push("Red".to_string());
        assert_eq!(router.next_narrowing_slot(&store), Some(Slot::Bands));

        store.bands.push("Metal".to_string());
        assert_eq!(router.next_narrowing_slot(&store), Some(Slot::Impressions));
    }

    #[test]
    fn scenes_do_not_participate_in_narrowing() {
        let mut store = filled_store();
        store.scenes.clear();
        assert_eq!(ResultRouter::new().next_narrowing_slot(&store), None);
    }

    #[test]
    fn all_slots_filled_is_exhausted() {
        let decision = ResultRouter::new().route(products(12), &filled_store());
        assert_eq!(decision, RouterDecision::Exhausted { count: 12 });
    }

    #[test]
    fn priority_can_be_reordered() {
        let router = ResultRouter::new().with_priority(vec![Slot::Bands, Slot::Gender]);
        let decision = router.route(products(9), &PreferenceStore::default());
        assert_eq!(decision, RouterDecision::AskNarrowing { count: 9, next_slot: Slot::Bands });
    }

    #[test]
    fn routing_is_deterministic() {
        let router = ResultRouter::new();
        let store = PreferenceStore::default();
        assert_eq!(router.route(products(6), &store), router.route(products(6), &store));
    }
}

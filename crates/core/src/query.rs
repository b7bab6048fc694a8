//! Compiles accumulated preferences into a catalog search request.
//!
//! The categorical slots (gender, colors, bands) become a structured filter: an
//! AND over OR-groups, one group per populated slot, emitted in that fixed
//! order. Descriptive slots (impressions, scenes) become the free-text part of
//! the query. The filter renders to OData syntax for the hosted search index and
//! can also be evaluated directly against in-memory catalog entries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::slot::Gender;
use crate::preferences::PreferenceStore;

/// Free-text token meaning "no text constraint".
pub const MATCH_ALL: &str = "*";

/// Case width, in millimetres, separating the Mens and Womens ranges.
pub const CASE_WIDTH_THRESHOLD_MM: u32 = 34;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogField {
    Color,
    StrapMaterial,
    ProductName,
}

impl CatalogField {
    pub fn index_name(self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::StrapMaterial => "StrapMaterial",
            Self::ProductName => "ProductName",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    CaseWidthAtLeast(u32),
    CaseWidthAtMost(u32),
    Equals { field: CatalogField, value: String },
}

impl Predicate {
    pub fn render(&self) -> String {
        match self {
            Self::CaseWidthAtLeast(mm) => format!("CaseDimensions/width ge {mm}"),
            Self::CaseWidthAtMost(mm) => format!("CaseDimensions/width le {mm}"),
            Self::Equals { field, value } => {
                format!("{} eq '{}'", field.index_name(), escape_literal(value))
            }
        }
    }
}

/// Disjunction of predicates over one slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub predicates: Vec<Predicate>,
}

impl FilterGroup {
    fn any_of(predicates: Vec<Predicate>) -> Option<Self> {
        (!predicates.is_empty()).then_some(Self { predicates })
    }

    pub fn render(&self) -> String {
        let terms = self.predicates.iter().map(Predicate::render).collect::<Vec<_>>();
        format!("({})", terms.join(" or "))
    }
}

/// Conjunction of OR-groups. No groups means the universal filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterExpression {
    pub groups: Vec<FilterGroup>,
}

impl FilterExpression {
    pub fn universal() -> Self {
        Self::default()
    }

    pub fn is_universal(&self) -> bool {
        self.groups.is_empty()
    }

    /// Exact-equality lookup used to resolve a selected product.
    pub fn product_name(name: &str) -> Self {
        Self {
            groups: vec![FilterGroup {
                predicates: vec![Predicate::Equals {
                    field: CatalogField::ProductName,
                    value: name.to_string(),
                }],
            }],
        }
    }

    /// OData rendering; the universal filter renders as the empty string.
    pub fn render(&self) -> String {
        self.groups.iter().map(FilterGroup::render).collect::<Vec<_>>().join(" and ")
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub filter: FilterExpression,
    pub free_text: String,
}

impl CompiledQuery {
    pub fn product_lookup(name: &str) -> Self {
        Self { filter: FilterExpression::product_name(name), free_text: MATCH_ALL.to_string() }
    }

    pub fn is_match_all_text(&self) -> bool {
        self.free_text == MATCH_ALL
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct QueryCompiler;

impl QueryCompiler {
    pub fn new() -> Self {
        Self
    }

    pub fn compile(&self, preferences: &PreferenceStore) -> CompiledQuery {
        CompiledQuery {
            filter: compile_filter(preferences),
            free_text: compile_free_text(preferences),
        }
    }
}

fn compile_filter(preferences: &PreferenceStore) -> FilterExpression {
    let gender_group = preferences
        .gender
        .as_deref()
        .and_then(Gender::parse)
        .map(|gender| match gender {
            Gender::Mens => Predicate::CaseWidthAtLeast(CASE_WIDTH_THRESHOLD_MM),
            Gender::Womens => Predicate::CaseWidthAtMost(CASE_WIDTH_THRESHOLD_MM),
        })
        .and_then(|predicate| FilterGroup::any_of(vec![predicate]));

    let groups = [
        gender_group,
        FilterGroup::any_of(equality_terms(CatalogField::Color, &preferences.colors)),
        FilterGroup::any_of(equality_terms(CatalogField::StrapMaterial, &preferences.bands)),
    ];

    FilterExpression { groups: groups.into_iter().flatten().collect() }
}

fn equality_terms(field: CatalogField, values: &[String]) -> Vec<Predicate> {
    values.iter().map(|value| Predicate::Equals { field, value: value.clone() }).collect()
}

fn compile_free_text(preferences: &PreferenceStore) -> String {
    let tokens = preferences
        .impressions
        .iter()
        .chain(preferences.scenes.iter())
        .map(String::as_str)
        .collect::<Vec<_>>();

    if tokens.is_empty() {
        MATCH_ALL.to_string()
    } else {
        tokens.join(" ")
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::{CompiledQuery, QueryCompiler, MATCH_ALL};
    use crate::preferences::PreferenceStore;

    fn store() -> PreferenceStore {
        PreferenceStore::default()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn empty_preferences_compile_to_universal_filter_and_wildcard() {
        let query = QueryCompiler::new().compile(&store());

        assert!(query.filter.is_universal());
        assert_eq!(query.filter.render(), "");
        assert_eq!(query.free_text, MATCH_ALL);
        assert!(query.is_match_all_text());
    }

    #[test]
    fn mens_and_two_colors_compile_to_width_and_color_group() {
        let preferences = PreferenceStore {
            gender: Some("Mens".to_string()),
            colors: strings(&["Red", "Blue"]),
            ..store()
        };

        let query = QueryCompiler::new().compile(&preferences);

        assert_eq!(
            query.filter.render(),
            "(CaseDimensions/width ge 34) and (Color eq 'Red' or Color eq 'Blue')"
        );
    }

    #[test]
    fn womens_uses_upper_bound_and_bands_follow_colors() {
        let preferences = PreferenceStore {
            gender: Some("Womens".to_string()),
            colors: strings(&["Black"]),
            bands: strings(&["Leather", "Silicone"]),
            ..store()
        };

        let rendered = QueryCompiler::new().compile(&preferences).filter.render();

        assert_eq!(
            rendered,
            "(CaseDimensions/width le 34) and (Color eq 'Black') and \
             (StrapMaterial eq 'Leather' or StrapMaterial eq 'Silicone')"
        );
    }

    #[test]
    fn unrecognized_gender_emits_no_clause() {
        let preferences = PreferenceStore {
            gender: Some("Kids".to_string()),
            bands: strings(&["Metal"]),
            ..store()
        };

        let query = QueryCompiler::new().compile(&preferences);

        assert_eq!(query.filter.groups.len(), 1);
        assert_eq!(query.filter.render(), "(StrapMaterial eq 'Metal')");
    }

    #[test]
    fn duplicate_values_produce_duplicate_terms() {
        let preferences = PreferenceStore { colors: strings(&["Red", "Red"]), ..store() };

        assert_eq!(
            QueryCompiler::new().compile(&preferences).filter.render(),
            "(Color eq 'Red' or Color eq 'Red')"
        );
    }

    #[test]
    fn free_text_joins_impressions_then_scenes() {
        let compiler = QueryCompiler::new();

        let single = PreferenceStore { impressions: strings(&["Elegant"]), ..store() };
        assert_eq!(compiler.compile(&single).free_text, "Elegant");

        let both = PreferenceStore {
            impressions: strings(&["Elegant", "Sporty"]),
            scenes: strings(&["Office"]),
            ..store()
        };
        assert_eq!(compiler.compile(&both).free_text, "Elegant Sporty Office");
    }

    #[test]
    fn literals_with_quotes_are_escaped() {
        let preferences = PreferenceStore { colors: strings(&["Rock'n'Roll"]), ..store() };

        assert_eq!(
            QueryCompiler::new().compile(&preferences).filter.render(),
            "(Color eq 'Rock''n''Roll')"
        );
    }

    #[test]
    fn compile_is_pure() {
        let preferences = PreferenceStore {
            gender: Some("Mens".to_string()),
            colors: strings(&["Black"]),
            impressions: strings(&["Casual"]),
            ..store()
        };
        let compiler = QueryCompiler::new();

        let first = compiler.compile(&preferences);
        let second = compiler.compile(&preferences);

        assert_eq!(first, second);
    }

    #[test]
    fn product_lookup_is_exact_name_filter() {
        let lookup = CompiledQuery::product_lookup("Irony Big Chief");

        assert_eq!(lookup.filter.render(), "(ProductName eq 'Irony Big Chief')");
        assert_eq!(lookup.free_text, MATCH_ALL);
    }
}

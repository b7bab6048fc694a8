use serde::{Deserialize, Serialize};

use crate::domain::product::Product;

pub const RESERVE_ACTION_TITLE: &str = "Reserve";
pub const DETAILS_ACTION_TITLE: &str = "Details";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardAction {
    /// Sends `value` back as the user's next utterance.
    PostBack { title: String, value: String },
    OpenUrl { title: String, url: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCard {
    pub title: String,
    pub image_url: String,
    pub actions: Vec<CardAction>,
}

impl ProductCard {
    pub fn from_product(product: &Product) -> Self {
        Self {
            title: product.name.clone(),
            image_url: product.image_url.clone(),
            actions: vec![
                CardAction::PostBack {
                    title: RESERVE_ACTION_TITLE.to_string(),
                    value: product.reserve_action_value(),
                },
                CardAction::OpenUrl {
                    title: DETAILS_ACTION_TITLE.to_string(),
                    url: product.detail_url.clone(),
                },
            ],
        }
    }
}

/// Channel-neutral response handed to the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseDirective {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        suggested_actions: Vec<String>,
    },
    Card {
        card: ProductCard,
    },
    Carousel {
        cards: Vec<ProductCard>,
    },
    ActionLink {
        title: String,
        url: String,
    },
}

impl ResponseDirective {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into(), suggested_actions: Vec::new() }
    }

    pub fn text_with_suggestions(text: impl Into<String>, suggestions: &[&str]) -> Self {
        Self::Text {
            text: text.into(),
            suggested_actions: suggestions.iter().map(|value| value.to_string()).collect(),
        }
    }

    pub fn card(product: &Product) -> Self {
        Self::Card { card: ProductCard::from_product(product) }
    }

    pub fn carousel(products: &[Product]) -> Self {
        Self::Carousel { cards: products.iter().map(ProductCard::from_product).collect() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CardAction, ResponseDirective};
    use crate::domain::product::{Product, ProductId};

    #[test]
    fn product_cards_carry_reserve_and_detail_actions() {
        let product = Product {
            id: ProductId("YVS451".to_string()),
            name: "Irony Big Chief".to_string(),
            image_url: "https://img.example/chief.png".to_string(),
            detail_url: "https://shop.example/chief".to_string(),
            score: 1.0,
        };

        let ResponseDirective::Card { card } = ResponseDirective::card(&product) else {
            panic!("expected card directive");
        };
        assert_eq!(card.title, "Irony Big Chief");
        assert_eq!(
            card.actions,
            vec![
                CardAction::PostBack {
                    title: "Reserve".to_string(),
                    value: "Reserve Irony_Big_Chief".to_string(),
                },
                CardAction::OpenUrl {
                    title: "Details".to_string(),
                    url: "https://shop.example/chief".to_string(),
                },
            ]
        );
    }

    #[test]
    fn text_directive_serializes_with_type_tag() {
        let json = serde_json::to_value(ResponseDirective::text("hello")).expect("serialize");
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hello");
        assert!(json.get("suggested_actions").is_none());
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entity carrying the product chosen from a card.
pub const PRODUCT_NAME_ENTITY: &str = "productName";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Intent {
    Greeting,
    Reset,
    Help,
    Find,
    Select,
    Reserve,
    Unrecognized(String),
}

impl Intent {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "greeting" => Self::Greeting,
            "reset" => Self::Reset,
            "help" => Self::Help,
            "find" => Self::Find,
            "select" => Self::Select,
            "reserve" => Self::Reserve,
            _ => Self::Unrecognized(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Greeting => "Greeting",
            Self::Reset => "Reset",
            Self::Help => "Help",
            Self::Find => "Find",
            Self::Select => "Select",
            Self::Reserve => "Reserve",
            Self::Unrecognized(name) => name,
        }
    }
}

impl From<String> for Intent {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Intent> for String {
    fn from(value: Intent) -> Self {
        value.as_str().to_string()
    }
}

/// Extracted entity values keyed by lower-cased entity name.
///
/// Accepts both flat lists (`{"colors": ["Red"]}`) and the list-of-lists shape
/// produced by list-entity recognizers (`{"Colors": [["Red"], ["Blue"]]}`), in
/// which case the first value of each inner list is taken. Blank strings,
/// empty inner lists and non-string values carry no value and are dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>", into = "BTreeMap<String, Vec<String>>")]
pub struct Entities {
    values: BTreeMap<String, Vec<String>>,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, values: &[&str]) -> Self {
        self.insert(name, values.iter().map(|value| value.to_string()).collect());
        self
    }

    pub fn insert(&mut self, name: &str, values: Vec<String>) {
        let values = values
            .into_iter()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect::<Vec<_>>();
        if !values.is_empty() {
            self.values.entry(normalize_key(name)).or_default().extend(values);
        }
    }

    pub fn values(&self, name: &str) -> &[String] {
        self.values.get(&normalize_key(name)).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for Entities {
    fn from(raw: BTreeMap<String, Value>) -> Self {
        let mut entities = Self::new();
        for (name, value) in raw {
            entities.insert(&name, flatten_entity_value(&value));
        }
        entities
    }
}

impl From<Entities> for BTreeMap<String, Vec<String>> {
    fn from(value: Entities) -> Self {
        value.values
    }
}

fn normalize_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

fn flatten_entity_value(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => vec![text.clone()],
        Value::Array(items) => items.iter().filter_map(first_string).collect(),
        _ => Vec::new(),
    }
}

fn first_string(item: &Value) -> Option<String> {
    match item {
        Value::String(text) => Some(text.clone()),
        Value::Array(inner) => inner.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// One recognized user turn as delivered by the language-understanding layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedTurn {
    pub intent: Intent,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub text: String,
}

impl RecognizedTurn {
    pub fn new(intent: Intent) -> Self {
        Self { intent, entities: Entities::default(), text: String::new() }
    }

    pub fn with_entities(mut self, entities: Entities) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Entities, Intent, RecognizedTurn};

    #[test]
    fn intents_parse_case_insensitively() {
        assert_eq!(Intent::parse("Find"), Intent::Find);
        assert_eq!(Intent::parse("RESERVE"), Intent::Reserve);
        assert_eq!(Intent::parse("None"), Intent::Unrecognized("None".to_string()));
    }

    #[test]
    fn nested_list_entities_take_first_inner_value() {
        let turn: RecognizedTurn = serde_json::from_str(
            r#"{"intent":"Find","entities":{"Gender":[["Mens"]],"Colors":[["Red"],["Blue","Navy"]]}}"#,
        )
        .expect("decode turn");

        assert_eq!(turn.intent, Intent::Find);
        assert_eq!(turn.entities.first("gender"), Some("Mens"));
        assert_eq!(turn.entities.values("colors"), ["Red", "Blue"]);
    }

    #[test]
    fn malformed_entities_are_treated_as_absent() {
        let turn: RecognizedTurn = serde_json::from_str(
            r#"{"intent":"Find","entities":{"Gender":[[]],"Colors":[],"Bands":null,"Scenes":[42, " "]}}"#,
        )
        .expect("decode turn");

        assert!(turn.entities.is_empty());
        assert_eq!(turn.entities.first("gender"), None);
    }

    #[test]
    fn flat_values_and_plain_strings_are_accepted() {
        let turn: RecognizedTurn = serde_json::from_str(
            r#"{"intent":"Select","entities":{"productName":"Irony_Big_Chief","bands":["Leather"]},"text":"Irony_Big_Chief"}"#,
        )
        .expect("decode turn");

        assert_eq!(turn.entities.first("ProductName"), Some("Irony_Big_Chief"));
        assert_eq!(turn.entities.values("Bands"), ["Leather"]);
        assert_eq!(turn.text, "Irony_Big_Chief");
    }

    #[test]
    fn builder_drops_blank_values() {
        let entities = Entities::new().with("Colors", &["Red", "", "  "]);
        assert_eq!(entities.values("colors"), ["Red"]);
        assert!(entities.values("bands").is_empty());
    }
}

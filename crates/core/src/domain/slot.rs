use std::fmt;

use serde::{Deserialize, Serialize};

/// Named preference slots accumulated across `Find` turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Gender,
    Colors,
    Bands,
    Impressions,
    Scenes,
}

impl Slot {
    pub const ALL: [Slot; 5] =
        [Slot::Gender, Slot::Colors, Slot::Bands, Slot::Impressions, Slot::Scenes];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gender => "gender",
            Self::Colors => "colors",
            Self::Bands => "bands",
            Self::Impressions => "impressions",
            Self::Scenes => "scenes",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wearer category. Only these two values map to a catalog predicate; any other
/// token stored in the gender slot is kept but compiles to nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Mens,
    Womens,
}

impl Gender {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Mens" => Some(Self::Mens),
            "Womens" => Some(Self::Womens),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mens => "Mens",
            Self::Womens => "Womens",
        }
    }
}

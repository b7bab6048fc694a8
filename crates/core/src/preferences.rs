use serde::{Deserialize, Serialize};

use crate::dialog::intent::Entities;
use crate::domain::slot::Slot;

/// Slot values supplied by a single `Find` turn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreferenceUpdate {
    pub gender: Option<String>,
    pub colors: Vec<String>,
    pub bands: Vec<String>,
    pub impressions: Vec<String>,
    pub scenes: Vec<String>,
}

impl PreferenceUpdate {
    pub fn from_entities(entities: &Entities) -> Self {
        Self {
            gender: entities.first(Slot::Gender.as_str()).map(str::to_string),
            colors: entities.values(Slot::Colors.as_str()).to_vec(),
            bands: entities.values(Slot::Bands.as_str()).to_vec(),
            impressions: entities.values(Slot::Impressions.as_str()).to_vec(),
            scenes: entities.values(Slot::Scenes.as_str()).to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gender.is_none()
            && self.colors.is_empty()
            && self.bands.is_empty()
            && self.impressions.is_empty()
            && self.scenes.is_empty()
    }
}

/// Accumulated, multi-valued slot state for one conversation.
///
/// Multi-valued slots are ordered and keep duplicates: a value supplied twice
/// is stored twice and yields a repeated (harmless) OR term when compiled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceStore {
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub bands: Vec<String>,
    #[serde(default)]
    pub impressions: Vec<String>,
    #[serde(default)]
    pub scenes: Vec<String>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gender is last-write-wins; every other slot appends in arrival order.
    /// Tokens are accepted as-is, without vocabulary checks. Blank values are
    /// already dropped when entities are ingested.
    pub fn merge(&mut self, update: PreferenceUpdate) {
        if let Some(gender) = update.gender {
            self.gender = Some(gender);
        }
        self.colors.extend(update.colors);
        self.bands.extend(update.bands);
        self.impressions.extend(update.impressions);
        self.scenes.extend(update.scenes);
    }

    pub fn is_empty(&self, slot: Slot) -> bool {
        match slot {
            Slot::Gender => self.gender.as_deref().map_or(true, |value| value.is_empty()),
            Slot::Colors => self.colors.is_empty(),
            Slot::Bands => self.bands.is_empty(),
            Slot::Impressions => self.impressions.is_empty(),
            Slot::Scenes => self.scenes.is_empty(),
        }
    }

    pub fn is_filled(&self, slot: Slot) -> bool {
        !self.is_empty(slot)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

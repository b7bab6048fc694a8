use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::preferences::PreferenceStore;
use crate::selection::SelectionState;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conversational phase, derived from session data rather than stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    Greeting,
    Narrowing,
    Selected,
}

/// Everything persisted between turns of one conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub preferences: Option<PreferenceStore>,
    #[serde(default)]
    pub selection: Option<SelectionState>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            started: false,
            preferences: None,
            selection: None,
            updated_at: Utc::now(),
        }
    }

    pub fn phase(&self) -> ConversationPhase {
        if self.selection.is_some() {
            ConversationPhase::Selected
        } else if self.preferences.is_some() {
            ConversationPhase::Narrowing
        } else {
            ConversationPhase::Greeting
        }
    }

    /// Drops preferences and selection. The `started` flag survives so the
    /// opening prompt is not repeated.
    pub fn reset(&mut self) {
        self.preferences = None;
        self.selection = None;
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

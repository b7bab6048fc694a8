use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::Product;
use crate::session::ConversationId;

pub const RESERVATION_PATH: &str = "/reservation.html";

/// Product chosen by the user, held until a reservation completes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub selected_product_name: String,
    pub selected_product_image: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub product_name: String,
    pub product_image: String,
    pub phone_number: String,
}

impl ReservationRecord {
    /// Link to the printable reservation slip, every parameter URL-encoded.
    pub fn reservation_link(&self, origin: &Url) -> Url {
        let mut link = origin.clone();
        link.set_path(RESERVATION_PATH);
        link.set_fragment(None);
        link.query_pairs_mut()
            .clear()
            .append_pair("productName", &self.product_name)
            .append_pair("productImage", &self.product_image)
            .append_pair("phoneNumber", &self.phone_number);
        link
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub String);

impl ReservationId {
    pub fn generate() -> Self {
        Self(format!("RSV-{}", Uuid::new_v4()))
    }
}

/// Persisted form of a completed reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationEntry {
    pub id: ReservationId,
    pub conversation_id: ConversationId,
    pub record: ReservationRecord,
    pub created_at: DateTime<Utc>,
}

impl ReservationEntry {
    pub fn new(conversation_id: ConversationId, record: ReservationRecord) -> Self {
        Self { id: ReservationId::generate(), conversation_id, record, created_at: Utc::now() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved { record: ReservationRecord, link: Url },
    NothingSelected,
    MissingPhoneNumber,
}

/// Select → Reserve sub-flow. Independent of the preference slots.
#[derive(Clone, Debug)]
pub struct SelectionFlow {
    origin: Url,
}

impl SelectionFlow {
    pub fn new(origin: Url) -> Self {
        Self { origin }
    }

    pub fn select(&self, product: &Product) -> SelectionState {
        SelectionState {
            selected_product_name: product.name.clone(),
            selected_product_image: product.image_url.clone(),
        }
    }

    /// The phone number is taken verbatim (trimmed) from the turn text; no
    /// format validation is applied.
    pub fn reserve(&self, selection: Option<&SelectionState>, utterance: &str) -> ReserveOutcome {
        let Some(selection) = selection else {
            return ReserveOutcome::NothingSelected;
        };
        let phone_number = utterance.trim();
        if phone_number.is_empty() {
            return ReserveOutcome::MissingPhoneNumber;
        }

        let record = ReservationRecord {
            product_name: selection.selected_product_name.clone(),
            product_image: selection.selected_product_image.clone(),
            phone_number: phone_number.to_string(),
        };
        let link = record.reservation_link(&self.origin);
        ReserveOutcome::Reserved { record, link }
    }
}

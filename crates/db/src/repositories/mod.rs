use async_trait::async_trait;
use thiserror::Error;

use watchfinder_core::selection::ReservationEntry;
use watchfinder_core::session::{ConversationId, ConversationSession};

pub mod memory;
pub mod reservation;
pub mod session;

pub use memory::{InMemoryReservationRepository, InMemorySessionRepository};
pub use reservation::SqlReservationRepository;
pub use session::SqlSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Per-conversation session store. `load` never fails for an unknown id: a
/// fresh, empty session is returned instead.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn load(&self, id: &ConversationId) -> Result<ConversationSession, RepositoryError>;
    async fn save(&self, session: &ConversationSession) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &ConversationId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn save(&self, entry: &ReservationEntry) -> Result<(), RepositoryError>;
    async fn list_for_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Vec<ReservationEntry>, RepositoryError>;
}

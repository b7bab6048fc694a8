use std::collections::HashMap;

use tokio::sync::RwLock;

use watchfinder_core::selection::ReservationEntry;
use watchfinder_core::session::{ConversationId, ConversationSession};

use super::{RepositoryError, ReservationRepository, SessionRepository};

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, ConversationSession>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn load(&self, id: &ConversationId) -> Result<ConversationSession, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id.0).cloned().unwrap_or_else(|| ConversationSession::new(id.clone())))
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.conversation_id.0.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, id: &ConversationId) -> Result<bool, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryReservationRepository {
    reservations: RwLock<Vec<ReservationEntry>>,
}

#[async_trait::async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn save(&self, entry: &ReservationEntry) -> Result<(), RepositoryError> {
        let mut reservations = self.reservations.write().await;
        reservations.retain(|existing| existing.id != entry.id);
        reservations.push(entry.clone());
        Ok(())
    }

    async fn list_for_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Vec<ReservationEntry>, RepositoryError> {
        let reservations = self.reservations.read().await;
        Ok(reservations.iter().filter(|entry| &entry.conversation_id == id).cloned().collect())
    }
}

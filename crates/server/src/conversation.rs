//! Turn orchestration: load the session, run the dialog engine, save the result.
//!
//! Turns for one conversation are serialized through a per-conversation async
//! lock so preference accumulation never interleaves. Different conversations
//! only share the lock table, which is touched briefly and never across an
//! await point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use reqwest::Url;
use serde::Serialize;
use tracing::{info, warn};
use watchfinder_core::audit::{AuditContext, AuditSink};
use watchfinder_core::dialog::{DialogEngine, RecognizedTurn, ResponseDirective};
use watchfinder_core::errors::ApplicationError;
use watchfinder_core::router::RouterDecision;
use watchfinder_core::search::CatalogSearch;
use watchfinder_core::selection::ReservationEntry;
use watchfinder_core::session::{ConversationId, ConversationPhase};
use watchfinder_db::{RepositoryError, ReservationRepository, SessionRepository};

const ACTOR: &str = "watchfinder-server";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConversationReply {
    pub conversation_id: ConversationId,
    pub phase: ConversationPhase,
    pub decision: Option<RouterDecision>,
    pub directives: Vec<ResponseDirective>,
    /// Kind of the recoverable dialog error, when the turn failed.
    pub error: Option<&'static str>,
}

pub struct ConversationService {
    engine: DialogEngine<Arc<dyn CatalogSearch>>,
    sessions: Arc<dyn SessionRepository>,
    reservations: Arc<dyn ReservationRepository>,
    audit: Arc<dyn AuditSink>,
    locks: Mutex<HashMap<ConversationId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConversationService {
    pub fn new(
        search: Arc<dyn CatalogSearch>,
        origin: Url,
        sessions: Arc<dyn SessionRepository>,
        reservations: Arc<dyn ReservationRepository>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            engine: DialogEngine::new(search, origin),
            sessions,
            reservations,
            audit,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Welcome directives for a newly joined member. Session state is untouched.
    pub async fn open(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ConversationReply, ApplicationError> {
        let session = self.sessions.load(conversation_id).await.map_err(persistence)?;
        Ok(ConversationReply {
            conversation_id: conversation_id.clone(),
            phase: session.phase(),
            decision: None,
            directives: self.engine.welcome(),
            error: None,
        })
    }

    pub async fn handle_turn(
        &self,
        conversation_id: &ConversationId,
        turn: &RecognizedTurn,
        correlation_id: &str,
    ) -> Result<ConversationReply, ApplicationError> {
        let lock = self.lock_for(conversation_id);
        let reply = {
            let _guard = lock.lock().await;
            self.handle_locked(conversation_id, turn, correlation_id).await
        };
        drop(lock);
        self.release(conversation_id);
        reply
    }

    pub async fn reservations(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<ReservationEntry>, ApplicationError> {
        self.reservations.list_for_conversation(conversation_id).await.map_err(persistence)
    }

    async fn handle_locked(
        &self,
        conversation_id: &ConversationId,
        turn: &RecognizedTurn,
        correlation_id: &str,
    ) -> Result<ConversationReply, ApplicationError> {
        let mut session = self.sessions.load(conversation_id).await.map_err(persistence)?;
        let audit = AuditContext::new(Some(conversation_id.clone()), correlation_id, ACTOR);

        let outcome = self
            .engine
            .handle_turn_with_audit(&mut session, turn, self.audit.as_ref(), &audit)
            .await;

        match outcome {
            Ok(outcome) => {
                // Reservation first: the saved session no longer holds the selection.
                if let Some(record) = outcome.reservation.clone() {
                    let entry = ReservationEntry::new(conversation_id.clone(), record);
                    self.reservations.save(&entry).await.map_err(persistence)?;
                    info!(
                        event_name = "conversation.reservation_saved",
                        correlation_id = %correlation_id,
                        conversation_id = %conversation_id,
                        reservation_id = %entry.id.0,
                        "reservation stored"
                    );
                }
                self.sessions.save(&session).await.map_err(persistence)?;
                Ok(ConversationReply {
                    conversation_id: conversation_id.clone(),
                    phase: session.phase(),
                    decision: outcome.decision,
                    directives: outcome.directives,
                    error: None,
                })
            }
            Err(error) => {
                warn!(
                    event_name = "conversation.turn_failed",
                    correlation_id = %correlation_id,
                    conversation_id = %conversation_id,
                    error_kind = error.kind(),
                    error = %error,
                    "turn failed; session left unchanged"
                );
                Ok(ConversationReply {
                    conversation_id: conversation_id.clone(),
                    phase: session.phase(),
                    decision: None,
                    directives: vec![ResponseDirective::text(error.user_message())],
                    error: Some(error.kind()),
                })
            }
        }
    }

    fn lock_for(&self, conversation_id: &ConversationId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(conversation_id.clone()).or_default().clone()
    }

    /// Drops the lock entry once no turn holds or awaits it.
    fn release(&self, conversation_id: &ConversationId) {
        let mut locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        if locks.get(conversation_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(conversation_id);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

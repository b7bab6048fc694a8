use sqlx::Row;

use watchfinder_core::session::{ConversationId, ConversationSession};

use super::{RepositoryError, SessionRepository};
use crate::DbPool;

/// Sessions stored as one JSON document per conversation.
pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<ConversationSession, RepositoryError> {
    let state_json: String =
        row.try_get("state_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    serde_json::from_str(&state_json).map_err(|e| RepositoryError::Decode(e.to_string()))
}

#[async_trait::async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn load(&self, id: &ConversationId) -> Result<ConversationSession, RepositoryError> {
        let row = sqlx::query(
            "SELECT state_json FROM conversation_session WHERE conversation_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => row_to_session(r),
            None => Ok(ConversationSession::new(id.clone())),
        }
    }

    async fn save(&self, session: &ConversationSession) -> Result<(), RepositoryError> {
        let state_json =
            serde_json::to_string(session).map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO conversation_session (conversation_id, state_json, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(conversation_id) DO UPDATE SET
                 state_json = excluded.state_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&session.conversation_id.0)
        .bind(&state_json)
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            event_name = "persistence.session_saved",
            conversation_id = %session.conversation_id,
            "conversation session saved"
        );
        Ok(())
    }

    async fn delete(&self, id: &ConversationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM conversation_session WHERE conversation_id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use watchfinder_core::preferences::PreferenceStore;
    use watchfinder_core::selection::SelectionState;
    use watchfinder_core::session::{ConversationId, ConversationPhase, ConversationSession};

    use super::SqlSessionRepository;
    use crate::repositories::{RepositoryError, SessionRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn narrowing_session(id: &str) -> ConversationSession {
        let mut session = ConversationSession::new(ConversationId(id.to_string()));
        session.started = true;
        session.preferences = Some(PreferenceStore {
            gender: Some("Mens".to_string()),
            colors: vec!["Black".to_string(), "Black".to_string()],
            ..PreferenceStore::default()
        });
        session
    }

    #[tokio::test]
    async fn load_returns_default_for_unknown_conversation() {
        let repo = SqlSessionRepository::new(setup().await);

        let session = repo.load(&ConversationId("conv-unknown".to_string())).await.expect("load");

        assert!(!session.started);
        assert_eq!(session.phase(), ConversationPhase::Greeting);
    }

    #[tokio::test]
    async fn save_and_load_preserves_duplicate_slot_values() {
        let repo = SqlSessionRepository::new(setup().await);
        let session = narrowing_session("conv-1");

        repo.save(&session).await.expect("save");
        let found = repo.load(&session.conversation_id).await.expect("load");

        assert_eq!(found, session);
        assert_eq!(found.preferences.map(|p| p.colors.len()), Some(2));
    }

    #[tokio::test]
    async fn save_upserts_on_conflict() {
        let repo = SqlSessionRepository::new(setup().await);
        let mut session = narrowing_session("conv-1");
        repo.save(&session).await.expect("save");

        session.selection = Some(SelectionState {
            selected_product_name: "Irony Big Chief".to_string(),
            selected_product_image: "https://img.example/chief.png".to_string(),
        });
        session.touch();
        repo.save(&session).await.expect("upsert");

        let found = repo.load(&session.conversation_id).await.expect("load");
        assert_eq!(found.phase(), ConversationPhase::Selected);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let repo = SqlSessionRepository::new(setup().await);
        let session = narrowing_session("conv-1");
        repo.save(&session).await.expect("save");

        assert!(repo.delete(&session.conversation_id).await.expect("delete"));
        assert!(!repo.delete(&session.conversation_id).await.expect("delete again"));
    }

    #[tokio::test]
    async fn corrupt_state_surfaces_decode_error() {
        let pool = setup().await;
        sqlx::query(
            "INSERT INTO conversation_session (conversation_id, state_json, updated_at)
             VALUES ('conv-bad', '{not json', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert corrupt row");
        let repo = SqlSessionRepository::new(pool);

        let result = repo.load(&ConversationId("conv-bad".to_string())).await;

        assert!(matches!(result, Err(RepositoryError::Decode(_))));
    }
}

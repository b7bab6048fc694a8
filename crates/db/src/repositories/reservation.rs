use chrono::{DateTime, Utc};
use sqlx::Row;

use watchfinder_core::selection::{ReservationEntry, ReservationId, ReservationRecord};
use watchfinder_core::session::ConversationId;

use super::{RepositoryError, ReservationRepository};
use crate::DbPool;

pub struct SqlReservationRepository {
    pool: DbPool,
}

impl SqlReservationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_reservation(row: &sqlx::sqlite::SqliteRow) -> Result<ReservationEntry, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let conversation_id: String =
        row.try_get("conversation_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let product_name: String =
        row.try_get("product_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let product_image: String =
        row.try_get("product_image").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let phone_number: String =
        row.try_get("phone_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid created_at: {e}")))?;

    Ok(ReservationEntry {
        id: ReservationId(id),
        conversation_id: ConversationId(conversation_id),
        record: ReservationRecord { product_name, product_image, phone_number },
        created_at,
    })
}

#[async_trait::async_trait]
impl ReservationRepository for SqlReservationRepository {
    async fn save(&self, entry: &ReservationEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO reservation (id, conversation_id, product_name, product_image,
                                      phone_number, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&entry.id.0)
        .bind(&entry.conversation_id.0)
        .bind(&entry.record.product_name)
        .bind(&entry.record.product_image)
        .bind(&entry.record.phone_number)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Vec<ReservationEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, product_name, product_image, phone_number, created_at
             FROM reservation WHERE conversation_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_reservation).collect()
    }
}

#[cfg(test)]
mod tests {
    use watchfinder_core::selection::{ReservationEntry, ReservationRecord};
    use watchfinder_core::session::ConversationId;

    use super::SqlReservationRepository;
    use crate::repositories::ReservationRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_record(product: &str) -> ReservationRecord {
        ReservationRecord {
            product_name: product.to_string(),
            product_image: "https://img.example/watch.png?v=2".to_string(),
            phone_number: "080-1234-5678".to_string(),
        }
    }

    #[tokio::test]
    async fn save_and_list_for_conversation() {
        let repo = SqlReservationRepository::new(setup().await);
        let conversation = ConversationId("conv-1".to_string());
        let entry = ReservationEntry::new(conversation.clone(), sample_record("Irony Big Chief"));

        repo.save(&entry).await.expect("save");
        repo.save(&ReservationEntry::new(
            ConversationId("conv-2".to_string()),
            sample_record("Irony Chrono"),
        ))
        .await
        .expect("save other");

        let found = repo.list_for_conversation(&conversation).await.expect("list");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, entry.id);
        assert_eq!(found[0].record, entry.record);
    }

    #[tokio::test]
    async fn saving_same_reservation_twice_is_idempotent() {
        let repo = SqlReservationRepository::new(setup().await);
        let conversation = ConversationId("conv-1".to_string());
        let entry = ReservationEntry::new(conversation.clone(), sample_record("Irony Big Chief"));

        repo.save(&entry).await.expect("save");
        repo.save(&entry).await.expect("save again");

        assert_eq!(repo.list_for_conversation(&conversation).await.expect("list").len(), 1);
    }
}

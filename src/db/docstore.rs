use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::info;

use crate::services::doc_store::{DocumentAccess, DocumentStore, StoreError};

/// Document store backed by a PostgreSQL pool.
///
/// Only the slice of the schema needed for admission is touched here:
/// the owning user of a document and the user ids it is shared with.
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Connect to the database and build the store.
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        info!("Connected to document store database");
        Ok(Self { pool })
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_document_with_shares(
        &self,
        doc_id: &str,
    ) -> Result<Option<DocumentAccess>, StoreError> {
        let doc_row = sqlx::query(r#"SELECT owner_id FROM documents WHERE id = $1"#)
            .bind(doc_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let Some(doc_row) = doc_row else {
            return Ok(None);
        };
        let owner_id: String = doc_row.get("owner_id");

        let share_rows =
            sqlx::query(r#"SELECT user_id FROM document_shares WHERE document_id = $1"#)
                .bind(doc_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;

        let shared_user_ids = share_rows
            .iter()
            .map(|row| row.get::<String, _>("user_id"))
            .collect::<Vec<String>>();

        Ok(Some(DocumentAccess {
            owner_id,
            shared_user_ids,
        }))
    }
}

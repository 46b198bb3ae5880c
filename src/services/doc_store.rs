use async_trait::async_trait;

/// Ownership and share list of a document, as needed for admission.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentAccess {
    pub owner_id: String,
    pub shared_user_ids: Vec<String>,
}

impl DocumentAccess {
    /// Whether `user_id` may join the document's room.
    pub fn grants_access(&self, user_id: &str) -> bool {
        self.owner_id == user_id || self.shared_user_ids.iter().any(|u| u == user_id)
    }
}

#[derive(Debug)]
pub enum StoreError {
    Database(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Read-only view of the document store consumed during admission.
///
/// Looked up exactly once per connection attempt; the result is never
/// cached, so share-list changes take effect on the next connection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_document_with_shares(
        &self,
        doc_id: &str,
    ) -> Result<Option<DocumentAccess>, StoreError>;
}

use async_trait::async_trait;
use bson::Document;
use futures::stream::BoxStream;
use thiserror::Error;

use super::id::ResourceId;

/// Errors from a DocumentStore
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Document must not carry a key before insert")]
    KeyProvided,

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

impl StoreError {
    /// Whether the failure means the store could not be reached at all
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Mongo(err) => matches!(
                *err.kind,
                mongodb::error::ErrorKind::ServerSelection { .. }
            ),
            _ => false,
        }
    }
}

/// Lazy, single-pass sequence of documents returned by `find`
pub type DocumentStream = BoxStream<'static, Result<Document, StoreError>>;

/// Minimal document store surface used by the resource handlers.
///
/// Filters are equality maps (field -> expected value). Partial documents passed
/// to `update` only touch the fields they contain.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: &str, filter: Document) -> Result<DocumentStream, StoreError>;

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, StoreError>;

    async fn insert(&self, collection: &str, document: Document) -> Result<ResourceId, StoreError>;

    /// Returns the number of matched documents (0 or 1 for key lookups)
    async fn update(&self, collection: &str, filter: Document, partial: Document) -> Result<u64, StoreError>;

    /// Returns the number of deleted documents (0 or 1 for key lookups)
    async fn delete(&self, collection: &str, filter: Document) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

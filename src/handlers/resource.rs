use std::sync::Arc;

use bson::Bson;
use futures::{future, TryStreamExt};
use serde_json::Value;
use thiserror::Error;

use crate::auth::{Scope, SubjectId};
use crate::database::{DocumentStore, ResourceId, StoreError};
use crate::resources::schema::{CREATED_AT, UPDATED_AT};
use crate::resources::{FieldErrors, ResourceSchema};

/// Failures of a resource operation, before mapping to HTTP
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Invalid {} id format.", .label.to_lowercase())]
    InvalidIdentifier { label: &'static str },

    #[error("{label} not found.")]
    NotFound { label: &'static str },

    #[error("Invalid {} data", .label.to_lowercase())]
    Validation {
        label: &'static str,
        field_errors: FieldErrors,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Generic CRUD over one resource kind. Every operation resolves the caller's
/// scope, decodes the path key before touching the store, and performs at most
/// one store call.
#[derive(Clone)]
pub struct ResourceHandler {
    store: Arc<dyn DocumentStore>,
    schema: &'static ResourceSchema,
}

impl ResourceHandler {
    pub fn new(store: Arc<dyn DocumentStore>, schema: &'static ResourceSchema) -> Self {
        Self { store, schema }
    }

    pub fn schema(&self) -> &'static ResourceSchema {
        self.schema
    }

    pub async fn list(&self, subject: &SubjectId) -> Result<Vec<Value>, ResourceError> {
        let filter = self.scope(subject).filter();
        let documents = self.store.find(self.schema.collection, filter).await?;

        let results = documents
            .and_then(|document| future::ready(self.schema.represent(&document)))
            .try_collect::<Vec<_>>()
            .await?;
        Ok(results)
    }

    pub async fn get(&self, subject: &SubjectId, raw_id: &str) -> Result<Value, ResourceError> {
        let id = self.decode(raw_id)?;
        let filter = self.scope(subject).key_filter(id);

        let document = self
            .store
            .find_one(self.schema.collection, filter)
            .await?
            .ok_or_else(|| self.not_found())?;
        Ok(self.schema.represent(&document)?)
    }

    pub async fn create(&self, subject: &SubjectId, body: &Value) -> Result<ResourceId, ResourceError> {
        let mut document = self
            .schema
            .validate_create(body)
            .map_err(|field_errors| self.invalid(field_errors))?;
        self.scope(subject).stamp(&mut document);
        document.insert(CREATED_AT, Bson::DateTime(bson::DateTime::now()));

        let id = self.store.insert(self.schema.collection, document).await?;
        tracing::debug!("Created {} {} for {}", self.schema.label, id, subject);
        Ok(id)
    }

    /// Strict partial merge: only fields present in the body are written, and
    /// `updated_at` is refreshed even when the body is empty.
    pub async fn update(&self, subject: &SubjectId, raw_id: &str, body: &Value) -> Result<(), ResourceError> {
        let id = self.decode(raw_id)?;
        let patch = self
            .schema
            .validate_patch(body)
            .map_err(|field_errors| self.invalid(field_errors))?;
        if patch.is_empty() {
            tracing::debug!("Empty patch for {} {}; refreshing updated_at only", self.schema.label, id);
        }
        let filter = self.scope(subject).key_filter(id);

        let mut partial = patch.into_document();
        partial.insert(UPDATED_AT, Bson::DateTime(bson::DateTime::now()));

        let matched = self.store.update(self.schema.collection, filter, partial).await?;
        if matched == 0 {
            return Err(self.not_found());
        }
        Ok(())
    }

    pub async fn delete(&self, subject: &SubjectId, raw_id: &str) -> Result<(), ResourceError> {
        let id = self.decode(raw_id)?;
        let filter = self.scope(subject).key_filter(id);

        let deleted = self.store.delete(self.schema.collection, filter).await?;
        if deleted == 0 {
            return Err(self.not_found());
        }
        tracing::debug!("Deleted {} {} for {}", self.schema.label, id, subject);
        Ok(())
    }

    fn scope(&self, subject: &SubjectId) -> Scope {
        Scope::new(self.schema.scoped, subject)
    }

    fn decode(&self, raw_id: &str) -> Result<ResourceId, ResourceError> {
        ResourceId::decode(raw_id).map_err(|_| ResourceError::InvalidIdentifier {
            label: self.schema.label,
        })
    }

    fn not_found(&self) -> ResourceError {
        ResourceError::NotFound {
            label: self.schema.label,
        }
    }

    fn invalid(&self, field_errors: FieldErrors) -> ResourceError {
        ResourceError::Validation {
            label: self.schema.label,
            field_errors,
        }
    }
}

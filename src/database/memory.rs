use std::collections::HashMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::Document;
use futures::StreamExt;
use tokio::sync::RwLock;

use super::id::ResourceId;
use super::store::{DocumentStore, DocumentStream, StoreError};

/// In-process document store keeping each collection in insertion order.
///
/// Matches filters by field equality and applies single-document updates and
/// deletes under one write lock, so each call is atomic like its MongoDB
/// counterpart.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(field, expected)| document.get(field) == Some(expected))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, filter: Document) -> Result<DocumentStream, StoreError> {
        let collections = self.collections.read().await;
        let snapshot: Vec<Result<Document, StoreError>> = collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter(|doc| matches(doc, &filter))
            .cloned()
            .map(Ok)
            .collect();
        Ok(futures::stream::iter(snapshot).boxed())
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| matches(doc, &filter)))
            .cloned())
    }

    async fn insert(&self, collection: &str, mut document: Document) -> Result<ResourceId, StoreError> {
        if document.contains_key("_id") {
            return Err(StoreError::KeyProvided);
        }
        let oid = ObjectId::new();
        document.insert("_id", oid);

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(ResourceId::from(oid))
    }

    async fn update(&self, collection: &str, filter: Document, partial: Document) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| matches(doc, &filter)));

        match target {
            Some(doc) => {
                for (field, value) in partial {
                    doc.insert(field, value);
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        match docs.iter().position(|doc| matches(doc, &filter)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

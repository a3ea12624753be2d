use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::{StreamExt, TryStreamExt};
use mongodb::options::{ClientOptions, Tls};
use mongodb::{Client, Collection, Database};
use tracing::{info, warn};

use super::id::ResourceId;
use super::store::{DocumentStore, DocumentStream, StoreError};
use crate::config::DatabaseConfig;

/// MongoDB-backed store. The driver connects lazily and pools internally, so one
/// instance is built at startup and shared by every request.
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = client_options(config).await?;
        let client = Client::with_options(options)?;
        info!("MongoDB client created for database: {}", config.database_name);

        Ok(Self {
            database: client.database(&config.database_name),
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }
}

/// Driver options for the configured URI. Certificate checks are only relaxed
/// when the URI itself turns TLS on; a plaintext URI stays plaintext.
pub async fn client_options(config: &DatabaseConfig) -> Result<ClientOptions, StoreError> {
    let uri = config
        .mongo_uri
        .as_deref()
        .ok_or_else(|| StoreError::Unavailable("MONGO_URI is not configured".to_string()))?;

    let mut options = ClientOptions::parse(uri).await?;
    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
    if config.tls_allow_invalid_certificates {
        match options.tls.as_mut() {
            Some(Tls::Enabled(tls)) => tls.allow_invalid_certificates = Some(true),
            _ => warn!("MONGO_TLS_ALLOW_INVALID_CERTIFICATES ignored: URI does not enable TLS"),
        }
    }
    Ok(options)
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(&self, collection: &str, filter: Document) -> Result<DocumentStream, StoreError> {
        let cursor = self.collection(collection).find(filter).await?;
        Ok(cursor.map_err(StoreError::from).boxed())
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>, StoreError> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<ResourceId, StoreError> {
        if document.contains_key("_id") {
            return Err(StoreError::KeyProvided);
        }
        let result = self.collection(collection).insert_one(document).await?;
        match result.inserted_id {
            Bson::ObjectId(oid) => Ok(ResourceId::from(oid)),
            other => Err(StoreError::Malformed(format!("unexpected inserted id: {}", other))),
        }
    }

    async fn update(&self, collection: &str, filter: Document, partial: Document) -> Result<u64, StoreError> {
        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$set": partial })
            .await?;
        Ok(result.matched_count)
    }

    async fn delete(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let result = self.collection(collection).delete_one(filter).await?;
        Ok(result.deleted_count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;

    fn database(uri: Option<&str>, allow_invalid: bool) -> DatabaseConfig {
        DatabaseConfig {
            backend: StoreBackend::Mongo,
            mongo_uri: uri.map(str::to_string),
            database_name: "gas".to_string(),
            tls_allow_invalid_certificates: allow_invalid,
        }
    }

    #[tokio::test]
    async fn plaintext_uri_stays_plaintext_even_when_relaxed() {
        let options = client_options(&database(Some("mongodb://localhost:27017"), true))
            .await
            .unwrap();
        assert!(!matches!(options.tls, Some(Tls::Enabled(_))));
        assert_eq!(options.app_name.as_deref(), Some(env!("CARGO_PKG_NAME")));
    }

    #[tokio::test]
    async fn tls_uri_gets_relaxed_certificate_checks() {
        let options = client_options(&database(Some("mongodb://db.example.com:27017/?tls=true"), true))
            .await
            .unwrap();
        match options.tls {
            Some(Tls::Enabled(tls)) => assert_eq!(tls.allow_invalid_certificates, Some(true)),
            other => panic!("expected TLS enabled, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn tls_uri_keeps_certificate_checks_by_default() {
        let options = client_options(&database(Some("mongodb://db.example.com:27017/?tls=true"), false))
            .await
            .unwrap();
        match options.tls {
            Some(Tls::Enabled(tls)) => assert_ne!(tls.allow_invalid_certificates, Some(true)),
            other => panic!("expected TLS enabled, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_uri_is_unavailable() {
        let err = client_options(&database(None, false)).await.unwrap_err();
        assert!(err.is_unavailable());
    }
}

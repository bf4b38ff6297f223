//! MongoDB implementation of the store ports.
//!
//! Every operation is delegated to the `mongodb` driver. The `Client` and
//! BSON types are confined to this module.

mod convert;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{Document as BsonDocument, doc};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};

use docfix_core::{
    DEFAULT_CONNECT_TIMEOUT, Document, DocumentId, DocumentStore, Filter, HarnessConfig,
    StoreAddress, StoreConnector, StoreError,
};

/// Opens driver sessions against a MongoDB server.
#[derive(Debug, Clone)]
pub struct MongoConnector {
    connect_timeout: Duration,
    app_name: Option<String>,
}

impl Default for MongoConnector {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            app_name: None,
        }
    }
}

impl MongoConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector using the timeout and client name from `config`.
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            app_name: config.app_name.clone(),
        }
    }

    async fn client_options(&self, address: &StoreAddress) -> Result<ClientOptions, MongoError> {
        let mut options = ClientOptions::parse(address.server_uri()).await?;
        options.connect_timeout = Some(self.connect_timeout);
        options.server_selection_timeout = Some(self.connect_timeout);
        options.app_name.clone_from(&self.app_name);
        Ok(options)
    }
}

#[async_trait]
impl StoreConnector for MongoConnector {
    async fn connect(&self, address: &StoreAddress) -> Result<Box<dyn DocumentStore>, StoreError> {
        let connection_error = |e: MongoError| StoreError::Connection(e.to_string());

        let options = self
            .client_options(address)
            .await
            .map_err(connection_error)?;
        let client = Client::with_options(options).map_err(connection_error)?;
        let database = client.database(address.database());

        // The driver connects lazily; ping so an unreachable server fails here.
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(connection_error)?;

        tracing::debug!(%address, "Connected to MongoDB");
        Ok(Box::new(MongoStore {
            client,
            database,
            closed: AtomicBool::new(false),
        }))
    }
}

/// An open MongoDB session scoped to one database.
pub struct MongoStore {
    client: Client,
    database: Database,
    closed: AtomicBool,
}

impl MongoStore {
    fn collection(&self, name: &str) -> Result<Collection<BsonDocument>, StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(self.database.collection(name))
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<Vec<DocumentId>, StoreError> {
        let raw: Vec<BsonDocument> = documents.iter().map(convert::document_to_bson).collect();

        let result = self
            .collection(collection)?
            .insert_many(raw)
            .await
            .map_err(|e| classify(e, StoreError::Write))?;

        let mut ids: Vec<_> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(ids
            .into_iter()
            .map(|(_, id)| convert::id_from_bson(&id))
            .collect())
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let result = self
            .collection(collection)?
            .delete_many(convert::filter_to_bson(filter))
            .await
            .map_err(|e| classify(e, StoreError::Write))?;
        Ok(result.deleted_count)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        self.collection(collection)?
            .find_one(convert::filter_to_bson(filter))
            .await
            .map_err(|e| classify(e, StoreError::Query))?
            .map(convert::document_from_bson)
            .transpose()
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let raw: Vec<BsonDocument> = self
            .collection(collection)?
            .find(convert::filter_to_bson(filter))
            .await
            .map_err(|e| classify(e, StoreError::Query))?
            .try_collect()
            .await
            .map_err(|e| classify(e, StoreError::Query))?;

        raw.into_iter().map(convert::document_from_bson).collect()
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.collection(collection)?
            .count_documents(convert::filter_to_bson(filter))
            .await
            .map_err(|e| classify(e, StoreError::Query))
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }
        self.client.clone().shutdown().await;
        Ok(())
    }
}

/// Split driver errors into connectivity failures and operation failures.
fn classify(err: MongoError, operation: fn(String) -> StoreError) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::Authentication { .. } => StoreError::Connection(err.to_string()),
        _ => operation(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_copies_client_settings() {
        let config = HarnessConfig::with_defaults()
            .unwrap()
            .with_connect_timeout(Duration::from_millis(750))
            .with_app_name("docfix-tests");

        let connector = MongoConnector::from_config(&config);
        assert_eq!(connector.connect_timeout, Duration::from_millis(750));
        assert_eq!(connector.app_name.as_deref(), Some("docfix-tests"));
    }

    #[tokio::test]
    async fn test_client_options_apply_timeouts() {
        let connector = MongoConnector {
            connect_timeout: Duration::from_millis(300),
            app_name: Some("probe".to_string()),
        };
        let address: StoreAddress = "localhost:27017/digitalgateway".parse().unwrap();

        let options = connector.client_options(&address).await.unwrap();
        assert_eq!(options.connect_timeout, Some(Duration::from_millis(300)));
        assert_eq!(
            options.server_selection_timeout,
            Some(Duration::from_millis(300))
        );
        assert_eq!(options.app_name.as_deref(), Some("probe"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        // Port 9 (discard) is closed on test machines; selection fails fast.
        let connector = MongoConnector {
            connect_timeout: Duration::from_millis(200),
            app_name: None,
        };
        let address: StoreAddress = "127.0.0.1:9/digitalgateway".parse().unwrap();

        let err = connector.connect(&address).await.err().unwrap();
        assert!(matches!(err, StoreError::Connection(_)), "got {err:?}");
    }
}

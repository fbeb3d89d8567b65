//! Store implementation backed by the official MongoDB driver (blocking API).

use crate::config::MongoReaderConfig;
use crate::error::{ErrorKind, IntoReaderError, ReaderResult};
use crate::store::{DocumentCursor, DocumentStore, FindQuery, StoreConnector};
use bson::{doc, Document};
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::sync::{Client, Collection};
use std::sync::Arc;

/// Connects to the collection named by a [`MongoReaderConfig`].
pub struct MongoConnector {
    config: MongoReaderConfig,
}

impl MongoConnector {
    /// # Errors
    /// Returns a configuration error if the config does not validate.
    pub fn new(config: MongoReaderConfig) -> ReaderResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn client_options(&self) -> ReaderResult<ClientOptions> {
        let mut options = ClientOptions::default();
        options.hosts = self
            .config
            .hosts()?
            .into_iter()
            .map(|(host, port)| ServerAddress::Tcp {
                host,
                port: Some(port),
            })
            .collect();
        options.app_name = Some("ironbeam-mongo".to_string());
        if let Some(username) = &self.config.username {
            let mut credential = Credential::default();
            credential.username = Some(username.clone());
            credential.password.clone_from(&self.config.password);
            credential.source = Some(self.config.auth_source().to_string());
            options.credential = Some(credential);
        }
        Ok(options)
    }
}

impl StoreConnector for MongoConnector {
    fn connect(&self) -> ReaderResult<Arc<dyn DocumentStore>> {
        let client = Client::with_options(self.client_options()?)
            .into_reader_error(ErrorKind::Connection, "build MongoDB client")?;
        // Client construction is lazy; ping so unreachable or unauthenticated targets
        // fail here rather than on the first query.
        client
            .database(self.config.auth_source())
            .run_command(doc! { "ping": 1 })
            .run()
            .into_reader_error(ErrorKind::Connection, "ping MongoDB")?;
        let collection = client
            .database(&self.config.database)
            .collection::<Document>(&self.config.collection_name);
        Ok(Arc::new(MongoCollectionStore { collection }))
    }

    fn describe(&self) -> String {
        self.config.describe_target()
    }
}

struct MongoCollectionStore {
    collection: Collection<Document>,
}

impl DocumentStore for MongoCollectionStore {
    fn count_documents(&self, filter: Option<&Document>) -> ReaderResult<u64> {
        self.collection
            .count_documents(filter.cloned().unwrap_or_default())
            .run()
            .into_reader_error(ErrorKind::Read, "count documents")
    }

    fn find(&self, query: &FindQuery) -> ReaderResult<DocumentCursor> {
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let mut find = self
            .collection
            .find(query.filter.clone().unwrap_or_default())
            .skip(query.skip)
            .limit(limit);
        if let Some(batch_size) = query.batch_size {
            find = find.batch_size(batch_size);
        }
        let cursor = find.run().into_reader_error(ErrorKind::Read, "open cursor")?;
        Ok(Box::new(cursor.map(|item| {
            item.into_reader_error(ErrorKind::Read, "iterate cursor")
        })))
    }
}

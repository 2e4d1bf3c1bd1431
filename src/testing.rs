//! Test-support guard for MongoDB-backed test suites.
//!
//! [`TestDatabase::setup`] points the process at the `TEST_*` settings
//! triple, connects, and refuses to proceed when any opted-in collection
//! already contains documents. That refusal runs before any test body
//! executes; it is the safety rail against destructive tests hitting a
//! populated, possibly production, database. [`TestDatabase::teardown`]
//! purges exactly the opted-in collections and releases the connection.
//! Collections not listed are never touched.

use mongodb::bson::{Document, doc};
use mongodb::{Collection, Database};
use tracing::debug;

use crate::access::DbAccess;
use crate::env::{MongoEnv, TEST_PREFIX};
use crate::error::{EnvError, EnvResult};
use crate::settings::SettingsSource;

/// A connected test database with its opted-in collections bound.
#[derive(Debug)]
pub struct TestDatabase {
    access: DbAccess,
    collections: Vec<Collection<Document>>,
}

impl TestDatabase {
    /// Redirect `env` to the `TEST` environment, connect, and verify that
    /// every named collection is empty.
    ///
    /// The redirect is deliberately not scoped: the process stays pointed at
    /// the test environment for the duration of the test run, so test code
    /// that connects on its own also lands there.
    pub async fn setup<S: SettingsSource>(
        env: &mut MongoEnv<S>,
        collection_names: &[&str],
    ) -> EnvResult<Self> {
        let target = env.resolve_target(Some(TEST_PREFIX))?;
        env.set_active(target.address, target.database_name, target.secure);
        let access = env.connect().await?;

        let mut collections = Vec::with_capacity(collection_names.len());
        let mut nonzero: Vec<(String, u64)> = Vec::new();
        for name in collection_names {
            let collection = access.database().collection::<Document>(name);
            let count = match collection.count_documents(doc! {}).await {
                Ok(count) => count,
                Err(e) => {
                    access.shutdown().await;
                    return Err(e.into());
                }
            };
            if count > 0 {
                nonzero.push((collection.namespace().to_string(), count));
            }
            collections.push(collection);
        }

        if !nonzero.is_empty() {
            let target = env.active().to_string();
            access.shutdown().await;
            return Err(EnvError::guard(target, &nonzero));
        }

        Ok(Self {
            access,
            collections,
        })
    }

    pub fn access(&self) -> &DbAccess {
        &self.access
    }

    pub fn database(&self) -> &Database {
        self.access.database()
    }

    /// The bound collection with the given name, if it was opted in.
    pub fn collection(&self, name: &str) -> Option<&Collection<Document>> {
        self.collections.iter().find(|c| c.name() == name)
    }

    pub fn collections(&self) -> &[Collection<Document>] {
        &self.collections
    }

    /// Delete every document from each opted-in collection, then release the
    /// connection. The connection is released even when a purge fails.
    pub async fn teardown(self) -> EnvResult<()> {
        let Self {
            access,
            collections,
        } = self;

        let mut purge_result = Ok(());
        for collection in &collections {
            debug!(namespace = %collection.namespace(), "purging test collection");
            if let Err(e) = collection.delete_many(doc! {}).await {
                purge_result = Err(e.into());
                break;
            }
        }

        access.shutdown().await;
        purge_result
    }
}

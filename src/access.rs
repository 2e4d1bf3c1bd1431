//! Live database access handles.

use mongodb::{Client, Collection, Database};

/// A live client plus the database handle derived from it.
///
/// Driver handles are cheap to clone (state is shared internally), so the
/// clone handed to a scoped block stays usable until the scope terminates the
/// client on exit. Whoever created the access owns releasing it, exactly
/// once, via [`DbAccess::shutdown`].
#[derive(Debug, Clone)]
pub struct DbAccess {
    client: Client,
    database: Database,
}

impl DbAccess {
    pub(crate) fn new(client: Client, database: Database) -> Self {
        Self { client, database }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Convenience accessor for a typed collection on the bound database.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database.collection(name)
    }

    /// Terminate the underlying client and release its connections. All
    /// clones of this access become unusable once this completes.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }
}

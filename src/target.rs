//! Connection target value type.

use serde::{Deserialize, Serialize};

/// The cluster address, database name and transport-security flag describing
/// where database access currently points.
///
/// Exactly one target is active per [`MongoEnv`](crate::MongoEnv) at any
/// instant; it is replaced as a whole by `set_active` and never updated field
/// by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    /// Full `mongodb://`/`mongodb+srv://` URI or bare `host[:port]` address.
    pub address: String,
    pub database_name: String,
    /// `true` enables TLS with certificate verification disabled (existing
    /// behavior carried over from the wrapped deployments, not a
    /// recommendation); `false` connects without TLS.
    pub secure: bool,
}

impl ConnectionTarget {
    pub fn new(
        address: impl Into<String>,
        database_name: impl Into<String>,
        secure: bool,
    ) -> Self {
        Self {
            address: address.into(),
            database_name: database_name.into(),
            secure,
        }
    }
}

impl std::fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.address, self.database_name)
    }
}

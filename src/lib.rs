//! mongo-env
//!
//! Process-wide MongoDB connection-target configuration with scoped,
//! auto-reverting environment overrides.
//!
//! The crate holds one piece of state per [`MongoEnv`]: the currently active
//! cluster address, database name and transport-security flag. Code that
//! needs to reach a different environment (most commonly production from a
//! development checkout) runs inside a scoped override that installs the
//! other environment's settings, connects, and restores the previous target
//! on every exit path:
//!
//! ```rust,no_run
//! use mongo_env::{EnvSettings, MongoEnv};
//! use mongodb::bson::doc;
//!
//! # async fn example() -> mongo_env::EnvResult<()> {
//! let mut env = MongoEnv::from_settings(EnvSettings)?;
//!
//! let report = env
//!     .with_production(|access| async move {
//!         let analytics = access.collection::<mongodb::bson::Document>("analytics");
//!         Ok(analytics.find_one(doc! { "kind": "daily" }).await?)
//!     })
//!     .await?;
//! // Back on the development target here, even if the block had failed.
//! # Ok(())
//! # }
//! ```
//!
//! [`testing::TestDatabase`] is the companion for test suites: it redirects
//! the process to the `TEST_*` settings, refuses to run when the opted-in
//! collections already contain documents, and purges them on teardown.

pub mod access;
pub mod env;
pub mod error;
pub mod global;
pub mod settings;
pub mod target;
pub mod testing;

pub use access::DbAccess;
pub use env::{MongoEnv, PRODUCTION_PREFIX, TEST_PREFIX};
pub use error::{EnvError, EnvResult};
pub use settings::{EnvSettings, MemorySettings, SettingsSource};
pub use target::ConnectionTarget;
pub use testing::TestDatabase;

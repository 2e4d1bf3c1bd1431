//! Process-wide environment handle.
//!
//! Library code is expected to receive a [`MongoEnv`] explicitly; this module
//! exists for drop-in use where one process-wide connection target is
//! required. The mutex serializes access to the state, but scoped overrides
//! remain a single-owner contract: nesting overrides from multiple threads
//! at once is unsupported.

use std::sync::OnceLock;

use tokio::sync::Mutex;

use crate::env::MongoEnv;
use crate::settings::EnvSettings;
use crate::target::ConnectionTarget;

const FALLBACK_ADDRESS: &str = "mongodb://localhost:27017";
const FALLBACK_DATABASE_NAME: &str = "test";

static GLOBAL: OnceLock<Mutex<MongoEnv<EnvSettings>>> = OnceLock::new();

/// The process-wide environment, lazily seeded from the process environment
/// variables (`ADDRESS`/`HOST`, `DATABASE_NAME`, `SECURE`). When the base
/// keys are unset the handle falls back to a local development target.
pub fn handle() -> &'static Mutex<MongoEnv<EnvSettings>> {
    GLOBAL.get_or_init(|| {
        let env = MongoEnv::from_settings(EnvSettings).unwrap_or_else(|_| {
            MongoEnv::with_target(
                EnvSettings,
                ConnectionTarget::new(FALLBACK_ADDRESS, FALLBACK_DATABASE_NAME, false),
            )
        });
        Mutex::new(env)
    })
}

//! Connection target state, the connector, and scoped environment overrides.
//!
//! [`MongoEnv`] holds the currently active [`ConnectionTarget`] together with
//! the settings source it was resolved from. Application code either passes a
//! `MongoEnv` around explicitly or goes through the process-wide handle in
//! [`crate::global`].
//!
//! The scoped operations (`with_environment`, `with_production`,
//! `with_environment_database`) follow a strict save/override/restore
//! discipline: the target active before entry is reinstalled on every exit
//! path, including a failed connect and an `Err` returned by the scoped
//! block. A scoped override must never leak into subsequent state.

use std::future::Future;
use std::time::Duration;

use mongodb::Client;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, ServerAddress, Tls, TlsOptions, WriteConcern};
use tracing::{debug, info, warn};

use crate::access::DbAccess;
use crate::error::{EnvError, EnvResult};
use crate::settings::{
    self, ADDRESS_KEY, DATABASE_NAME_KEY, HOST_KEY, SECURE_KEY, SettingsSource,
};
use crate::target::ConnectionTarget;

/// Prefix selecting the production environment settings.
pub const PRODUCTION_PREFIX: &str = "PRODUCTION";
/// Prefix selecting the designated test environment settings.
pub const TEST_PREFIX: &str = "TEST";

/// Bound on server selection and TCP connect during the liveness check.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Connection target state plus the settings source behind it.
#[derive(Debug)]
pub struct MongoEnv<S: SettingsSource> {
    settings: S,
    active: ConnectionTarget,
    connect_timeout: Duration,
}

impl<S: SettingsSource> MongoEnv<S> {
    /// Seed the active target from the unqualified settings triple.
    ///
    /// Fails with a configuration error when neither `ADDRESS` nor the
    /// legacy `HOST` key is set, or when `DATABASE_NAME` is missing.
    pub fn from_settings(settings: S) -> EnvResult<Self> {
        let active = resolve_from(&settings, None)?;
        Ok(Self::with_target(settings, active))
    }

    /// Seed the state with an explicit target instead of the settings triple.
    pub fn with_target(settings: S, target: ConnectionTarget) -> Self {
        Self {
            settings,
            active: target,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Bound server selection and TCP connect for the liveness check. The
    /// driver default is generous; tests and fail-fast callers lower this.
    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    /// The currently active connection target.
    pub fn active(&self) -> &ConnectionTarget {
        &self.active
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// Replace the active target. All three fields change together.
    ///
    /// Side effect: the new values are written back into the settings source
    /// under the unqualified keys, so any other reader of the same source
    /// observes the switch.
    pub fn set_active(
        &mut self,
        address: impl Into<String>,
        database_name: impl Into<String>,
        secure: bool,
    ) {
        let target = ConnectionTarget::new(address, database_name, secure);
        debug!(
            address = %target.address,
            database = %target.database_name,
            secure = target.secure,
            "switching active connection target"
        );
        self.settings.set(ADDRESS_KEY, &target.address);
        self.settings.set(DATABASE_NAME_KEY, &target.database_name);
        self.settings
            .set(SECURE_KEY, if target.secure { "true" } else { "false" });
        self.active = target;
    }

    fn restore(&mut self, saved: ConnectionTarget) {
        self.set_active(saved.address, saved.database_name, saved.secure);
    }

    /// Resolve the settings triple for an environment prefix (`None` for the
    /// unqualified defaults) without touching the active target.
    pub fn resolve_target(&self, prefix: Option<&str>) -> EnvResult<ConnectionTarget> {
        resolve_from(&self.settings, prefix)
    }

    /// Re-resolve the unqualified triple and reinstall it as the active
    /// target. This is the explicit reset for test harnesses that mutate the
    /// settings source between cases.
    pub fn reload_from_settings(&mut self) -> EnvResult<()> {
        let target = self.resolve_target(None)?;
        self.set_active(target.address, target.database_name, target.secure);
        Ok(())
    }

    /// Connect to the active target and verify reachability with a `ping`.
    ///
    /// The caller owns the returned access and is responsible for releasing
    /// it via [`DbAccess::shutdown`]. No retries: any connect or liveness
    /// failure is surfaced immediately.
    pub async fn connect(&self) -> EnvResult<DbAccess> {
        let target = &self.active;
        let mut options = client_options(&target.address, self.connect_timeout).await?;
        options.write_concern = Some(WriteConcern::majority());
        if target.secure {
            // Existing behavior carried over from the wrapped deployments:
            // TLS without certificate verification.
            let tls = TlsOptions::builder()
                .allow_invalid_certificates(true)
                .build();
            options.tls = Some(Tls::Enabled(tls));
        }

        let client = Client::with_options(options).map_err(|e| {
            EnvError::connection(
                format!("failed to open client for '{target}': {e}"),
                "Check the address format and driver options",
            )
        })?;
        let database = client.database(&target.database_name);

        // Fail now if the deployment is unreachable.
        if let Err(e) = database.run_command(doc! { "ping": 1 }).await {
            warn!(address = %target.address, error = %e, "liveness check failed");
            client.shutdown().await;
            return Err(EnvError::connection(
                format!("ping against '{target}' failed: {e}"),
                "Check that the target cluster is reachable and the address is correct",
            ));
        }

        info!(
            address = %target.address,
            database = %target.database_name,
            "connected"
        );
        Ok(DbAccess::new(client, database))
    }

    /// Run `block` against a named environment, restoring the previously
    /// active target afterwards.
    ///
    /// Resolution reads `<PREFIX>_ADDRESS` (falling back to the legacy
    /// `<PREFIX>_HOST`) and `<PREFIX>_DATABASE_NAME`. `secure_override`
    /// forces the transport-security flag when `Some`; `None` uses the
    /// resolved `<PREFIX>_SECURE` value (default false).
    ///
    /// The restore is unconditional: a resolution failure leaves the state
    /// untouched, a connect failure restores before the error propagates,
    /// and a block failure restores before its error is returned.
    pub async fn with_environment<T, F, Fut>(
        &mut self,
        prefix: &str,
        secure_override: Option<bool>,
        block: F,
    ) -> EnvResult<T>
    where
        F: FnOnce(DbAccess) -> Fut,
        Fut: Future<Output = EnvResult<T>>,
    {
        let saved = self.active.clone();

        let mut target = self.resolve_target(Some(prefix))?;
        if let Some(secure) = secure_override {
            target.secure = secure;
        }

        debug!(prefix, address = %target.address, "entering scoped override");
        self.set_active(target.address, target.database_name, target.secure);

        let access = match self.connect().await {
            Ok(access) => access,
            Err(e) => {
                // No state leak on connection failure.
                self.restore(saved);
                return Err(e);
            }
        };

        let result = block(access.clone()).await;
        access.shutdown().await;
        self.restore(saved);
        debug!(prefix, "scoped override restored");
        result
    }

    /// Run `block` against the production environment in a limited scope.
    ///
    /// Equivalent to `with_environment("PRODUCTION", Some(true), block)`.
    pub async fn with_production<T, F, Fut>(&mut self, block: F) -> EnvResult<T>
    where
        F: FnOnce(DbAccess) -> Fut,
        Fut: Future<Output = EnvResult<T>>,
    {
        self.with_environment(PRODUCTION_PREFIX, Some(true), block)
            .await
    }

    /// Like [`with_production`](Self::with_production) but the block
    /// receives only the production database handle. Forces `secure=true`
    /// for the scope; same restore guarantee.
    pub async fn with_production_database<T, F, Fut>(&mut self, block: F) -> EnvResult<T>
    where
        F: FnOnce(mongodb::Database) -> Fut,
        Fut: Future<Output = EnvResult<T>>,
    {
        self.with_environment(PRODUCTION_PREFIX, Some(true), |access| {
            block(access.database().clone())
        })
        .await
    }

    /// Like [`with_environment`](Self::with_environment) but the block
    /// receives only the database handle. Same restore guarantee.
    pub async fn with_environment_database<T, F, Fut>(
        &mut self,
        prefix: &str,
        block: F,
    ) -> EnvResult<T>
    where
        F: FnOnce(mongodb::Database) -> Fut,
        Fut: Future<Output = EnvResult<T>>,
    {
        self.with_environment(prefix, None, |access| block(access.database().clone()))
            .await
    }
}

/// Resolve a connection target from a settings source. Cluster-style
/// `ADDRESS` wins over the legacy `HOST` spelling; `SECURE` is optional and
/// defaults to false. No default substitution for the required keys.
fn resolve_from<S: SettingsSource>(
    settings: &S,
    prefix: Option<&str>,
) -> EnvResult<ConnectionTarget> {
    let address_key = settings::prefixed_key(prefix, ADDRESS_KEY);
    let host_key = settings::prefixed_key(prefix, HOST_KEY);
    let address = settings
        .get(&address_key)
        .or_else(|| settings.get(&host_key))
        .ok_or_else(|| {
            EnvError::configuration(
                format!("neither '{address_key}' nor '{host_key}' is set"),
                "Define the cluster address for this environment in the settings source",
            )
        })?;

    let database_name_key = settings::prefixed_key(prefix, DATABASE_NAME_KEY);
    let database_name = settings.get(&database_name_key).ok_or_else(|| {
        EnvError::configuration(
            format!("'{database_name_key}' is not set"),
            "Define the database name for this environment in the settings source",
        )
    })?;

    let secure = settings
        .get(&settings::prefixed_key(prefix, SECURE_KEY))
        .map(|value| settings::parse_bool(&value))
        .unwrap_or(false);

    Ok(ConnectionTarget::new(address, database_name, secure))
}

/// Build client options from an address. Full connection strings are parsed
/// by the driver; bare `host[:port]` addresses are accepted alongside them,
/// matching what the wrapped deployments historically configured.
async fn client_options(address: &str, timeout: Duration) -> EnvResult<ClientOptions> {
    let mut options = if address.contains("://") {
        ClientOptions::parse(address).await.map_err(|e| {
            EnvError::connection(
                format!("invalid connection string '{address}': {e}"),
                "Use a mongodb:// or mongodb+srv:// URI, or a bare host[:port]",
            )
        })?
    } else {
        let host = ServerAddress::parse(address).map_err(|e| {
            EnvError::connection(
                format!("invalid host address '{address}': {e}"),
                "Use a mongodb:// or mongodb+srv:// URI, or a bare host[:port]",
            )
        })?;
        ClientOptions::builder().hosts(vec![host]).build()
    };
    options.server_selection_timeout = Some(timeout);
    options.connect_timeout = Some(timeout);
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettings;

    fn base_settings() -> MemorySettings {
        MemorySettings::new()
            .with(ADDRESS_KEY, "localhost")
            .with(DATABASE_NAME_KEY, "app")
    }

    #[test]
    fn test_from_settings_seeds_active_target() {
        let env = MongoEnv::from_settings(base_settings()).unwrap();
        assert_eq!(
            env.active(),
            &ConnectionTarget::new("localhost", "app", false)
        );
    }

    #[test]
    fn test_from_settings_missing_database_name() {
        let settings = MemorySettings::new().with(ADDRESS_KEY, "localhost");
        let err = MongoEnv::from_settings(settings).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("DATABASE_NAME"));
    }

    #[test]
    fn test_resolve_address_wins_over_host() {
        let settings = base_settings()
            .with("STAGING_ADDRESS", "stage.cluster")
            .with("STAGING_HOST", "stage.host")
            .with("STAGING_DATABASE_NAME", "app_stage");
        let env = MongoEnv::from_settings(settings).unwrap();

        let target = env.resolve_target(Some("STAGING")).unwrap();
        assert_eq!(target.address, "stage.cluster");
    }

    #[test]
    fn test_resolve_falls_back_to_legacy_host() {
        let settings = base_settings()
            .with("STAGING_HOST", "stage.host")
            .with("STAGING_DATABASE_NAME", "app_stage");
        let env = MongoEnv::from_settings(settings).unwrap();

        let target = env.resolve_target(Some("STAGING")).unwrap();
        assert_eq!(target.address, "stage.host");
        assert_eq!(target.database_name, "app_stage");
        assert!(!target.secure);
    }

    #[test]
    fn test_resolve_missing_both_address_variants() {
        let settings = base_settings().with("STAGING_DATABASE_NAME", "app_stage");
        let env = MongoEnv::from_settings(settings).unwrap();

        let err = env.resolve_target(Some("STAGING")).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("STAGING_ADDRESS"));
        assert!(err.to_string().contains("STAGING_HOST"));
    }

    #[test]
    fn test_resolve_secure_flag() {
        let settings = base_settings()
            .with("PRODUCTION_ADDRESS", "prod.cluster")
            .with("PRODUCTION_DATABASE_NAME", "app_prod")
            .with("PRODUCTION_SECURE", "true");
        let env = MongoEnv::from_settings(settings).unwrap();

        let target = env.resolve_target(Some("PRODUCTION")).unwrap();
        assert!(target.secure);
    }

    #[test]
    fn test_set_active_replaces_all_fields_and_writes_back() {
        let mut env = MongoEnv::from_settings(base_settings()).unwrap();

        env.set_active("prod.cluster", "app_prod", true);

        assert_eq!(
            env.active(),
            &ConnectionTarget::new("prod.cluster", "app_prod", true)
        );
        assert_eq!(
            env.settings().get(ADDRESS_KEY).as_deref(),
            Some("prod.cluster")
        );
        assert_eq!(
            env.settings().get(DATABASE_NAME_KEY).as_deref(),
            Some("app_prod")
        );
        assert_eq!(env.settings().get(SECURE_KEY).as_deref(), Some("true"));
    }

    #[test]
    fn test_active_is_idempotent() {
        let env = MongoEnv::from_settings(base_settings()).unwrap();

        let first = env.active().clone();
        // Resolution is read-only and must not disturb the active target.
        let _ = env.resolve_target(None).unwrap();
        let second = env.active().clone();

        assert_eq!(first, second);
        assert_eq!(first, ConnectionTarget::new("localhost", "app", false));
    }

    #[test]
    fn test_reload_from_settings() {
        let mut env = MongoEnv::from_settings(base_settings()).unwrap();
        env.set_active("elsewhere", "other", true);

        // Simulate a harness rewriting the source between cases.
        env.settings.set(ADDRESS_KEY, "localhost");
        env.settings.set(DATABASE_NAME_KEY, "app");
        env.settings.set(SECURE_KEY, "false");

        env.reload_from_settings().unwrap();
        assert_eq!(
            env.active(),
            &ConnectionTarget::new("localhost", "app", false)
        );
    }
}

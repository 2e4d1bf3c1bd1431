//! Settings source abstraction.
//!
//! Connection targets are resolved from a string key/value provider. The
//! provider is swappable: [`EnvSettings`] reads the process environment for
//! deployed code, [`MemorySettings`] backs tests and embedded configuration.
//!
//! Key naming convention: the unqualified keys (`ADDRESS`, `DATABASE_NAME`,
//! `SECURE`) describe the default environment; prefixed variants such as
//! `PRODUCTION_ADDRESS` describe named environments. `HOST` is the accepted
//! legacy spelling of `ADDRESS` and loses when both are present.

use std::collections::HashMap;

/// Cluster address key (full `mongodb://` URI or bare `host[:port]`).
pub const ADDRESS_KEY: &str = "ADDRESS";
/// Legacy alias for [`ADDRESS_KEY`]; cluster-style `ADDRESS` takes precedence.
pub const HOST_KEY: &str = "HOST";
/// Database name key.
pub const DATABASE_NAME_KEY: &str = "DATABASE_NAME";
/// Transport-security flag key. Optional, defaults to false.
pub const SECURE_KEY: &str = "SECURE";

/// A mutable mapping from setting names to values.
///
/// `set` exists because switching the active connection target writes the new
/// values back so any other reader of the same source observes the change.
pub trait SettingsSource {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// Build a prefixed key name. `prefixed_key(Some("PRODUCTION"), ADDRESS_KEY)`
/// yields `PRODUCTION_ADDRESS`; `None` yields the bare key.
pub fn prefixed_key(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}_{key}"),
        None => key.to_string(),
    }
}

/// Parse a boolean setting value. Only a case-insensitive "true" enables the
/// flag; anything else (including absence) is false.
pub fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

/// In-memory settings, primarily for tests and programmatic configuration.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: HashMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion for test setup.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl SettingsSource for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// Settings backed by the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSettings;

impl SettingsSource for EnvSettings {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn set(&mut self, key: &str, value: &str) {
        // SAFETY: mutating the process environment is the documented
        // write-back side effect of switching targets. The crate's contract
        // is single-owner, externally-serialized use; concurrent readers of
        // the environment during a switch are out of contract.
        unsafe { std::env::set_var(key, value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_key() {
        assert_eq!(prefixed_key(Some("PRODUCTION"), ADDRESS_KEY), "PRODUCTION_ADDRESS");
        assert_eq!(prefixed_key(Some("STAGING"), HOST_KEY), "STAGING_HOST");
        assert_eq!(prefixed_key(None, DATABASE_NAME_KEY), "DATABASE_NAME");
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("True"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("1"));
        assert!(!parse_bool("yes"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_memory_settings_roundtrip() {
        let mut settings = MemorySettings::new().with(ADDRESS_KEY, "localhost");
        assert_eq!(settings.get(ADDRESS_KEY).as_deref(), Some("localhost"));
        assert_eq!(settings.get(DATABASE_NAME_KEY), None);

        settings.set(ADDRESS_KEY, "prod.cluster");
        assert_eq!(settings.get(ADDRESS_KEY).as_deref(), Some("prod.cluster"));
    }
}

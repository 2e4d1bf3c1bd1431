//! Integration tests for the process-wide environment handle.
//!
//! This lives in its own file because it reads and mutates the process
//! environment; cargo runs each integration test file as its own process,
//! so nothing else observes the changes. One test function keeps the
//! environment mutations ordered.

use mongo_env::settings::{ADDRESS_KEY, DATABASE_NAME_KEY, HOST_KEY, SECURE_KEY};
use mongo_env::{ConnectionTarget, global};

#[tokio::test]
async fn test_handle_falls_back_to_local_target_and_writes_back() {
    // SAFETY: this is the only test in the binary; no other thread reads or
    // writes the environment while these run.
    for key in [ADDRESS_KEY, HOST_KEY, DATABASE_NAME_KEY, SECURE_KEY] {
        unsafe { std::env::remove_var(key) };
    }

    // With the base keys unset the handle seeds the local fallback target.
    {
        let env = global::handle().lock().await;
        assert_eq!(
            env.active(),
            &ConnectionTarget::new("mongodb://localhost:27017", "test", false)
        );
    }

    // Switching through the handle writes back into the process environment.
    {
        let mut env = global::handle().lock().await;
        env.set_active("prod.cluster", "app_prod", true);
    }
    assert_eq!(std::env::var(ADDRESS_KEY).as_deref(), Ok("prod.cluster"));
    assert_eq!(std::env::var(DATABASE_NAME_KEY).as_deref(), Ok("app_prod"));
    assert_eq!(std::env::var(SECURE_KEY).as_deref(), Ok("true"));

    // Relocking yields the same process-wide instance, not a fresh seed.
    {
        let env = global::handle().lock().await;
        assert_eq!(
            env.active(),
            &ConnectionTarget::new("prod.cluster", "app_prod", true)
        );
    }
}

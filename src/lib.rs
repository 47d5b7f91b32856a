//! Ephemeral database and cache containers for integration tests.
//!
//! Each fixture starts a throwaway Docker container, waits within a bounded
//! budget until the service inside accepts connections, and hands back a
//! connected client together with the container. The test owns the fixture
//! until it calls `release`, which closes the client and removes the
//! container; merely dropping the fixture also removes the container.
//!
//! ```no_run
//! use dbfixture::{prep_database, InitialDbSetup, MysqlDb};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut db = MysqlDb::start().await?;
//! prep_database(
//!     &mut db,
//!     &[InitialDbSetup {
//!         schema_sql: "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(255))".into(),
//!         initial_data: vec!["INSERT INTO users VALUES (1, 'Alice')".into()],
//!     }],
//! )
//! .await?;
//! // ... run the test against db.pool() ...
//! db.release().await;
//! # Ok(())
//! # }
//! ```

pub mod memcached;
pub mod mysql;
pub mod postgres;
pub mod readiness;
pub mod runtime;
pub mod seed;
pub mod spec;

// Re-export commonly used items
pub use memcached::{prep_memcached, MemcachedCache};
pub use mysql::MysqlDb;
pub use postgres::PostgresDb;
pub use seed::{prep_database, InitialDbSetup, TestDatabase};
pub use spec::{
    with_container_name, with_env, with_image, with_network, with_privileged,
    with_startup_timeout, with_tag, HostOverride, HostSettings, ResourceKind, RunSpec,
    SpecOverride,
};

use std::sync::Once;

static LOG_INIT: Once = Once::new();

/// Initialize logging for fixture-driven tests, once per process.
///
/// Safe to call from every test; only the first call has any effect.
pub fn init_test_logging() {
    LOG_INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

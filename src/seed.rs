use anyhow::{Context, Result};
use async_trait::async_trait;

/// One schema + seed-data bundle applied to a test database.
///
/// `schema_sql` holds DDL (table or index creation) executed directly,
/// outside any transaction. `initial_data` holds DML statements executed in
/// order inside a single all-or-nothing transaction.
#[derive(Debug, Clone, Default)]
pub struct InitialDbSetup {
    pub schema_sql: String,
    pub initial_data: Vec<String>,
}

/// The SQL operations the seeder needs from a connected fixture.
#[async_trait]
pub trait TestDatabase {
    /// Execute one statement directly (auto-committed).
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Execute the statements in order inside a single transaction,
    /// rolling back on the first failure.
    async fn execute_transaction(&mut self, statements: &[String]) -> Result<()>;
}

/// Prepare the test database by running each setup unit strictly in order:
/// schema first, then the seed statements in one transaction per unit.
///
/// The first failure aborts the whole operation; remaining statements in the
/// failing unit and all subsequent units are never attempted. Errors are not
/// retried, and the container is left running until the caller releases it.
pub async fn prep_database<D>(db: &mut D, setups: &[InitialDbSetup]) -> Result<()>
where
    D: TestDatabase + Send + ?Sized,
{
    for setup in setups {
        if !setup.schema_sql.is_empty() {
            db.execute(&setup.schema_sql)
                .await
                .context("failed to execute schema SQL")?;
        }
        if !setup.initial_data.is_empty() {
            db.execute_transaction(&setup.initial_data)
                .await
                .context("failed to execute initial data SQL")?;
        }
    }
    Ok(())
}

use super::generic::GenericDriver;
use super::Driver;
use crate::dialect::SqlDialect;
use crate::errors::Result;
use crate::native::NativeClient;
use std::sync::Arc;

impl<D: SqlDialect + Default> GenericDriver<D> {
    /// Disable integrity checks, drop every table, re-enable checks.
    ///
    /// The re-enable step runs exactly once whatever happened before it. The
    /// first failure is returned; a re-enable failure after an earlier failure
    /// is only logged.
    pub(super) async fn clear(&self) -> Result<()> {
        let client = self.client().await?;

        // The integrity toggles are per session, so keep everything on one
        let pinned = !self.in_transaction();
        if pinned {
            client.pin_session().await?;
        }

        let outcome = self.clear_on_session().await;

        if pinned {
            release(&client).await;
        }
        outcome
    }

    async fn clear_on_session(&self) -> Result<()> {
        let dialect = &self.inner.dialect;
        self.query(dialect.disable_integrity_checks_sql()).await?;

        let dropped = self.drop_all_tables().await;
        let enabled = self.query(dialect.enable_integrity_checks_sql()).await;

        match (dropped, enabled) {
            (Err(error), Err(enable_error)) => {
                tracing::warn!(
                    dialect = %dialect.kind(),
                    error = %enable_error,
                    "failed to re-enable integrity checks after clear_database failure"
                );
                Err(error)
            }
            (Err(error), Ok(_)) | (Ok(()), Err(error)) => Err(error),
            (Ok(()), Ok(_)) => Ok(()),
        }
    }

    /// Drop tables one at a time, in enumeration order
    async fn drop_all_tables(&self) -> Result<()> {
        let schema = self.create_schema_builder();
        for table in schema.list_tables().await? {
            schema.drop_table(&table).await?;
        }
        Ok(())
    }
}

async fn release(client: &Arc<dyn NativeClient>) {
    if let Err(error) = client.release_session().await {
        tracing::warn!(%error, "failed to release session after clear_database");
    }
}

//! Transaction bracketing
//!
//! A transaction is BEGIN ... COMMIT/ROLLBACK issued through `query` on one
//! pinned session. There are no savepoints: a second `begin` while a transaction
//! is open is rejected. Callers sharing a driver must serialize their
//! begin/query/commit sequences themselves.

use super::generic::GenericDriver;
use super::Driver;
use crate::dialect::SqlDialect;
use crate::errors::{Error, Result};
use crate::debug_log;
use std::sync::atomic::Ordering;

impl<D: SqlDialect + Default> GenericDriver<D> {
    pub(super) async fn begin(&self) -> Result<()> {
        let client = self.client().await?;

        if self
            .inner
            .transaction_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::TransactionAlreadyActive {
                dialect: self.inner.dialect.kind(),
            });
        }

        let started = match client.pin_session().await {
            Ok(()) => self
                .query(self.inner.dialect.begin_transaction_sql())
                .await
                .map(|_| ()),
            Err(error) => Err(error),
        };

        if let Err(error) = started {
            // The begin error is what the caller sees
            if let Err(release_error) = client.release_session().await {
                tracing::warn!(
                    error = %release_error,
                    "failed to release session after failed begin"
                );
            }
            self.inner.transaction_active.store(false, Ordering::SeqCst);
            return Err(error);
        }

        debug_log!("Transaction started on {}", self.inner.dialect.kind());
        Ok(())
    }

    pub(super) async fn commit(&self) -> Result<()> {
        let client = self.client().await?;
        self.require_transaction()?;

        // A failed COMMIT leaves the transaction open so the caller can roll back
        self.query(self.inner.dialect.commit_transaction_sql())
            .await?;

        self.inner.transaction_active.store(false, Ordering::SeqCst);
        client.release_session().await?;
        debug_log!("Transaction committed on {}", self.inner.dialect.kind());
        Ok(())
    }

    pub(super) async fn rollback(&self) -> Result<()> {
        let client = self.client().await?;
        self.require_transaction()?;

        let result = self
            .query(self.inner.dialect.rollback_transaction_sql())
            .await;

        self.inner.transaction_active.store(false, Ordering::SeqCst);
        let released = client.release_session().await;
        debug_log!("Transaction rolled back on {}", self.inner.dialect.kind());

        result?;
        released
    }

    fn require_transaction(&self) -> Result<()> {
        if self.inner.transaction_active.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::NoActiveTransaction {
                dialect: self.inner.dialect.kind(),
            })
        }
    }
}

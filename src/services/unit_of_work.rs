//! Commit-ordered unit of work.
//!
//! The metadata store can roll back; the filesystem cannot. This module
//! keeps the two from diverging by deferring every disk operation until
//! the owning transaction has committed: actions registered with
//! [`UnitOfWork::after_commit`] run exactly once, in registration order,
//! only after a successful commit, and never on rollback or drop.
//!
//! Actions run outside the transaction, so a slow disk write never holds
//! a database lock. An action failure is surfaced to the caller but does
//! not (and cannot) un-commit the metadata change; it is a detectable
//! divergence, logged at warn.

use std::future::Future;
use std::pin::Pin;

use sqlx::{Sqlite, SqliteConnection, Transaction};
use tracing::warn;

use crate::db::DbPool;
use crate::Result;

type PostCommitAction = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// A database transaction with attached post-commit actions.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    after_commit: Vec<PostCommitAction>,
}

impl UnitOfWork {
    /// Begin a new transaction on the pool.
    pub async fn begin(pool: &DbPool) -> Result<Self> {
        Ok(Self {
            tx: pool.begin().await?,
            after_commit: Vec::new(),
        })
    }

    /// Connection for queries that must run inside this transaction.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Schedule an action to run once the transaction commits.
    ///
    /// The action never runs if the transaction rolls back or the unit
    /// of work is dropped.
    pub fn after_commit<F>(&mut self, action: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.after_commit.push(Box::pin(action));
    }

    /// Commit the transaction, then run the scheduled actions in order.
    ///
    /// The first failing action aborts the remainder and its error is
    /// returned; the metadata commit stands either way.
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;

        for action in self.after_commit {
            if let Err(err) = action.await {
                warn!("Post-commit action failed after metadata commit: {}", err);
                return Err(err);
            }
        }

        Ok(())
    }

    /// Roll back the transaction, discarding all scheduled actions.
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

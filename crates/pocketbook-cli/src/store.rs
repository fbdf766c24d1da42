//! JSON snapshot file as a mutation gateway
//!
//! The whole snapshot is read on open and rewritten after every successful
//! mutation. A mutation whose write fails is undone in memory, so the caller
//! sees either the new state on disk or no change at all.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use pocketbook_core::models::{
    Budget, FinancialSnapshot, NewReminder, NewTransaction, RecordChanges, Reminder, Transaction,
};
use pocketbook_core::{InMemoryGateway, MutationGateway, Result};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct FileGateway {
    path: PathBuf,
    inner: InMemoryGateway,
    /// Serializes mutate-then-write so a rollback never undoes another write
    writes: Arc<Mutex<()>>,
}

impl FileGateway {
    /// Open a snapshot file; a missing file starts empty
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let snapshot = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid snapshot file {}", path.display()))?
        } else {
            FinancialSnapshot::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            inner: InMemoryGateway::new(snapshot),
            writes: Arc::new(Mutex::new(())),
        })
    }

    pub fn snapshot(&self) -> FinancialSnapshot {
        self.inner.snapshot()
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.inner.snapshot())?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "Wrote snapshot");
        Ok(())
    }

    /// Apply one in-memory mutation and persist it, rolling back on a failed write
    async fn commit<T>(&self, mutation: impl Future<Output = Result<T>> + Send) -> Result<T> {
        let _write = self.writes.lock().await;
        let before = self.inner.snapshot();
        let value = mutation.await?;
        if let Err(e) = self.persist() {
            warn!(path = %self.path.display(), error = %e, "Snapshot write failed, rolling back");
            self.inner.restore(before);
            return Err(e);
        }
        Ok(value)
    }
}

#[async_trait]
impl MutationGateway for FileGateway {
    async fn create_transaction(&self, data: NewTransaction) -> Result<Transaction> {
        self.commit(self.inner.create_transaction(data)).await
    }

    async fn update_transaction(&self, id: &str, changes: &RecordChanges) -> Result<()> {
        self.commit(self.inner.update_transaction(id, changes)).await
    }

    async fn delete_transaction(&self, id: &str) -> Result<()> {
        self.commit(self.inner.delete_transaction(id)).await
    }

    async fn create_reminder(&self, data: NewReminder) -> Result<Reminder> {
        self.commit(self.inner.create_reminder(data)).await
    }

    async fn update_reminder(&self, id: &str, changes: &RecordChanges) -> Result<()> {
        self.commit(self.inner.update_reminder(id, changes)).await
    }

    async fn delete_reminder(&self, id: &str) -> Result<()> {
        self.commit(self.inner.delete_reminder(id)).await
    }

    async fn save_budget(&self, budget: &Budget) -> Result<()> {
        self.commit(self.inner.save_budget(budget)).await
    }
}

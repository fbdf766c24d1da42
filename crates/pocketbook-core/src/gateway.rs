//! Mutation gateway: the only path by which the core changes stored records
//!
//! The host's document store sits behind [`MutationGateway`]. The core calls it
//! only after the user confirms a staged card (budget_set excepted).

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{
    Budget, FinancialSnapshot, NewReminder, NewTransaction, RecordChanges, Reminder, Transaction,
};

/// Create/update/delete calls against the record store
///
/// Every call either succeeds fully or returns an error; implementations must
/// not leave partial state behind.
#[async_trait]
pub trait MutationGateway: Send + Sync {
    async fn create_transaction(&self, data: NewTransaction) -> Result<Transaction>;

    async fn update_transaction(&self, id: &str, changes: &RecordChanges) -> Result<()>;

    async fn delete_transaction(&self, id: &str) -> Result<()>;

    async fn create_reminder(&self, data: NewReminder) -> Result<Reminder>;

    async fn update_reminder(&self, id: &str, changes: &RecordChanges) -> Result<()>;

    async fn delete_reminder(&self, id: &str) -> Result<()>;

    /// Upsert a budget. Hosts without a budget collection keep the default.
    async fn save_budget(&self, budget: &Budget) -> Result<()> {
        Err(Error::Unsupported(format!(
            "saving budget for {}",
            budget.category
        )))
    }
}

#[derive(Debug, Default)]
struct Store {
    snapshot: FinancialSnapshot,
    next_id: u64,
    fail_remaining: usize,
    fail_always: bool,
}

impl Store {
    /// Next free id; snapshots loaded from disk may already use low numbers
    fn next_id(&mut self, prefix: &str) -> String {
        loop {
            self.next_id += 1;
            let id = format!("{}-{}", prefix, self.next_id);
            let taken = self.snapshot.transactions.iter().any(|t| t.id == id)
                || self.snapshot.reminders.iter().any(|r| r.id == id);
            if !taken {
                return id;
            }
        }
    }

    /// Consume one injected failure, if any
    fn check_failure(&mut self, op: &str) -> Result<()> {
        if self.fail_always {
            return Err(Error::Gateway(format!("{} failed", op)));
        }
        if self.fail_remaining > 0 {
            self.fail_remaining -= 1;
            return Err(Error::Gateway(format!("{} failed", op)));
        }
        Ok(())
    }
}

/// Gateway over an in-process snapshot
///
/// Clones share the same store. Used by tests and as the backing store of the
/// CLI's file gateway.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    inner: Arc<Mutex<Store>>,
}

impl InMemoryGateway {
    pub fn new(snapshot: FinancialSnapshot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Store {
                snapshot,
                ..Store::default()
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>> {
        self.inner
            .lock()
            .map_err(|_| Error::Gateway("store lock poisoned".into()))
    }

    /// Current contents of the store
    pub fn snapshot(&self) -> FinancialSnapshot {
        self.inner
            .lock()
            .map(|store| store.snapshot.clone())
            .unwrap_or_default()
    }

    /// Replace the store contents, e.g. to undo a mutation that could not be
    /// persisted
    pub fn restore(&self, snapshot: FinancialSnapshot) {
        match self.inner.lock() {
            Ok(mut store) => store.snapshot = snapshot,
            Err(poisoned) => poisoned.into_inner().snapshot = snapshot,
        }
    }

    /// Make the next `count` mutations fail
    pub fn fail_next(&self, count: usize) {
        if let Ok(mut store) = self.inner.lock() {
            store.fail_remaining = count;
        }
    }

    /// Make every mutation fail until switched off
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut store) = self.inner.lock() {
            store.fail_always = failing;
        }
    }
}

#[async_trait]
impl MutationGateway for InMemoryGateway {
    async fn create_transaction(&self, data: NewTransaction) -> Result<Transaction> {
        let mut store = self.lock()?;
        store.check_failure("create transaction")?;
        let id = store.next_id("txn");
        let tx = data.into_transaction(id);
        debug!(id = %tx.id, amount = tx.amount, "Created transaction");
        store.snapshot.transactions.push(tx.clone());
        Ok(tx)
    }

    async fn update_transaction(&self, id: &str, changes: &RecordChanges) -> Result<()> {
        let mut store = self.lock()?;
        store.check_failure("update transaction")?;
        let tx = store
            .snapshot
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))?;
        changes.apply_to_transaction(tx);
        Ok(())
    }

    async fn delete_transaction(&self, id: &str) -> Result<()> {
        let mut store = self.lock()?;
        store.check_failure("delete transaction")?;
        let before = store.snapshot.transactions.len();
        store.snapshot.transactions.retain(|t| t.id != id);
        if store.snapshot.transactions.len() == before {
            return Err(Error::NotFound(format!("transaction {}", id)));
        }
        Ok(())
    }

    async fn create_reminder(&self, data: NewReminder) -> Result<Reminder> {
        let mut store = self.lock()?;
        store.check_failure("create reminder")?;
        let id = store.next_id("rem");
        let reminder = data.into_reminder(id);
        debug!(id = %reminder.id, date = %reminder.date, "Created reminder");
        store.snapshot.reminders.push(reminder.clone());
        Ok(reminder)
    }

    async fn update_reminder(&self, id: &str, changes: &RecordChanges) -> Result<()> {
        let mut store = self.lock()?;
        store.check_failure("update reminder")?;
        let reminder = store
            .snapshot
            .reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("reminder {}", id)))?;
        changes.apply_to_reminder(reminder);
        Ok(())
    }

    async fn delete_reminder(&self, id: &str) -> Result<()> {
        let mut store = self.lock()?;
        store.check_failure("delete reminder")?;
        let before = store.snapshot.reminders.len();
        store.snapshot.reminders.retain(|r| r.id != id);
        if store.snapshot.reminders.len() == before {
            return Err(Error::NotFound(format!("reminder {}", id)));
        }
        Ok(())
    }

    async fn save_budget(&self, budget: &Budget) -> Result<()> {
        let mut store = self.lock()?;
        store.check_failure("save budget")?;
        let key = budget.category.to_lowercase();
        match store
            .snapshot
            .budgets
            .iter_mut()
            .find(|b| b.category.to_lowercase() == key)
        {
            Some(existing) => {
                existing.limit = budget.limit;
                existing.period = budget.period;
            }
            None => store.snapshot.budgets.push(budget.clone()),
        }
        Ok(())
    }
}

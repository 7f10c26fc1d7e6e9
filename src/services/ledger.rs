use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::{DocQuery, DocumentStore, Entity, Repository};
use crate::models::school_fees::{self, SchoolFees};

/// Running-balance bookkeeping for fee transactions.
///
/// Every write goes through [`FeeLedger::replay`] for each student+term it
/// touches, under one lock, so `bf`/`bal` always chain from zero in date
/// order.
pub struct FeeLedger {
    fees: Repository<SchoolFees>,
    lock: Arc<Mutex<()>>,
}

impl FeeLedger {
    pub fn new(store: Arc<dyn DocumentStore>, lock: Arc<Mutex<()>>) -> Self {
        Self {
            fees: Repository::new(store),
            lock,
        }
    }

    /// Transactions for one student+term, oldest first.
    pub async fn transactions(&self, student: Uuid, term: Uuid) -> Result<Vec<SchoolFees>, DatabaseError> {
        let mut rows = self
            .fees
            .select_any(DocQuery::new().eq("student", student).eq("academicTerm", term))
            .await?;
        school_fees::sort_ledger(&mut rows);
        Ok(rows)
    }

    pub async fn current_balance(&self, student: Uuid, term: Uuid) -> Result<Decimal, DatabaseError> {
        let rows = self
            .fees
            .select_any(DocQuery::new().eq("student", student).eq("academicTerm", term))
            .await?;
        Ok(school_fees::current_balance(&rows))
    }

    /// Recompute and persist balances for one student+term.
    async fn replay(&self, student: Uuid, term: Uuid) -> Result<Vec<SchoolFees>, DatabaseError> {
        let mut rows = self
            .fees
            .select_any(DocQuery::new().eq("student", student).eq("academicTerm", term))
            .await?;

        let changed = school_fees::replay(&mut rows);
        for row in rows.iter_mut().filter(|row| changed.contains(&row.meta.id)) {
            self.fees.save(row).await?;
        }
        if !changed.is_empty() {
            tracing::debug!("Replayed ledger {}/{}: {} rows rebalanced", student, term, changed.len());
        }
        Ok(rows)
    }

    fn find_in(rows: Vec<SchoolFees>, id: Uuid) -> Result<SchoolFees, DatabaseError> {
        rows.into_iter()
            .find(|row| row.meta.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", SchoolFees::LABEL)))
    }

    pub async fn record(&self, transaction: SchoolFees) -> Result<SchoolFees, DatabaseError> {
        let _guard = self.lock.lock().await;
        self.fees.insert(&transaction).await?;
        let rows = self.replay(transaction.student, transaction.academic_term).await?;
        Self::find_in(rows, transaction.meta.id)
    }

    /// Store an edited transaction. `previous` is the stored version; when the
    /// student or term changed, the ledger it left is replayed too.
    pub async fn amend(&self, previous: &SchoolFees, updated: SchoolFees) -> Result<SchoolFees, DatabaseError> {
        let _guard = self.lock.lock().await;
        self.fees.update(&updated).await?;

        if previous.student != updated.student || previous.academic_term != updated.academic_term {
            self.replay(previous.student, previous.academic_term).await?;
        }
        let rows = self.replay(updated.student, updated.academic_term).await?;
        Self::find_in(rows, updated.meta.id)
    }

    pub async fn remove(&self, id: Uuid) -> Result<SchoolFees, DatabaseError> {
        let _guard = self.lock.lock().await;
        let removed = self
            .fees
            .delete(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", SchoolFees::LABEL)))?;
        self.replay(removed.student, removed.academic_term).await?;
        Ok(removed)
    }
}

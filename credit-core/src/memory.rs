//! In-memory `CreditStore`
//!
//! Units of work are fully serialized: each one holds the store mutex until it
//! commits or is dropped, and edits a private copy of the state that replaces
//! the shared state on commit. The one-active-limit rule is enforced the way
//! the Postgres partial unique index enforces it.

use crate::error::{StoreError, StoreResult};
use crate::store::{CreditStore, TotalsScope, UnitOfWork};
use crate::types::{
    Consumer, ConsumerFilter, CreditLimit, CreditLimitFilter, Paged, RecordStatus, Tenor,
    Transaction, TransactionFilter,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    // insertion order; listings walk these backwards
    consumers: Vec<Consumer>,
    limits: Vec<CreditLimit>,
    transactions: Vec<Transaction>,
}

impl MemoryState {
    fn consumer_mut(&mut self, id: Uuid) -> Option<&mut Consumer> {
        self.consumers.iter_mut().find(|c| c.id == id)
    }

    fn limit_mut(&mut self, id: Uuid) -> Option<&mut CreditLimit> {
        self.limits.iter_mut().find(|l| l.id == id)
    }

    fn transaction_mut(&mut self, id: Uuid) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|t| t.id == id)
    }

    fn active_limit_conflict(&self, consumer_id: Uuid, except: Uuid) -> bool {
        self.limits.iter().any(|l| {
            l.consumer_id == consumer_id && l.id != except && l.status == RecordStatus::Active
        })
    }
}

/// Process-local store for tests and local runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    writes: Arc<AtomicU64>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes made visible by committed units of work
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CreditStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();

        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            pending_writes: 0,
            writes: self.writes.clone(),
        }))
    }

    async fn find_consumer(&self, id: Uuid) -> StoreResult<Option<Consumer>> {
        let state = self.state.lock().await;
        Ok(state.consumers.iter().find(|c| c.id == id).cloned())
    }

    async fn list_consumers(&self, filter: &ConsumerFilter) -> StoreResult<Paged<Consumer>> {
        let state = self.state.lock().await;
        let name = filter.name.as_ref().map(|n| n.to_lowercase());

        let matching = state
            .consumers
            .iter()
            .rev()
            .filter(|c| filter.nik.as_ref().map_or(true, |nik| &c.nik == nik))
            .filter(|c| {
                name.as_ref()
                    .map_or(true, |n| c.full_name.to_lowercase().contains(n))
            })
            .filter(|c| filter.status.map_or(true, |s| c.status == s))
            .filter(|c| filter.min_salary.map_or(true, |min| c.salary >= min))
            .filter(|c| filter.max_salary.map_or(true, |max| c.salary <= max))
            .cloned()
            .collect();

        Ok(Paged::from_sorted(matching, filter.pagination))
    }

    async fn find_credit_limit(&self, id: Uuid) -> StoreResult<Option<CreditLimit>> {
        let state = self.state.lock().await;
        Ok(state.limits.iter().find(|l| l.id == id).cloned())
    }

    async fn list_credit_limits(
        &self,
        filter: &CreditLimitFilter,
    ) -> StoreResult<Paged<CreditLimit>> {
        let state = self.state.lock().await;

        let matching = state
            .limits
            .iter()
            .rev()
            .filter(|l| filter.consumer_id.map_or(true, |id| l.consumer_id == id))
            .filter(|l| filter.status.map_or(true, |s| l.status == s))
            .cloned()
            .collect();

        Ok(Paged::from_sorted(matching, filter.pagination))
    }

    async fn find_transaction(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        let state = self.state.lock().await;
        Ok(state.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> StoreResult<Paged<Transaction>> {
        let state = self.state.lock().await;

        let matching = state
            .transactions
            .iter()
            .rev()
            .filter(|t| filter.consumer_id.map_or(true, |id| t.consumer_id == id))
            .filter(|t| {
                filter
                    .contract_number
                    .as_ref()
                    .map_or(true, |c| t.contract_number.contains(c.as_str()))
            })
            .filter(|t| filter.loan_term.map_or(true, |term| t.loan_term == term))
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();

        Ok(Paged::from_sorted(matching, filter.pagination))
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    pending_writes: u64,
    writes: Arc<AtomicU64>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_consumer(&mut self, id: Uuid) -> StoreResult<Option<Consumer>> {
        Ok(self.working.consumers.iter().find(|c| c.id == id).cloned())
    }

    async fn count_active_consumers_with_nik(
        &mut self,
        nik: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<u64> {
        let count = self
            .working
            .consumers
            .iter()
            .filter(|c| c.nik == nik && c.status == RecordStatus::Active)
            .filter(|c| Some(c.id) != exclude)
            .count();
        Ok(count as u64)
    }

    async fn insert_consumer(&mut self, consumer: &Consumer) -> StoreResult<()> {
        if self.working.consumers.iter().any(|c| c.id == consumer.id) {
            return Err(StoreError::Conflict(format!("consumer {} already exists", consumer.id)));
        }
        self.working.consumers.push(consumer.clone());
        self.pending_writes += 1;
        Ok(())
    }

    async fn update_consumer(&mut self, consumer: &Consumer) -> StoreResult<()> {
        let existing = self
            .working
            .consumer_mut(consumer.id)
            .ok_or_else(|| StoreError::message(format!("consumer {} vanished", consumer.id)))?;
        *existing = consumer.clone();
        self.pending_writes += 1;
        Ok(())
    }

    async fn set_consumer_status(
        &mut self,
        id: Uuid,
        status: RecordStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        match self.working.consumer_mut(id) {
            Some(consumer) => {
                consumer.status = status;
                consumer.updated_at = at;
                self.pending_writes += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn lock_active_limits(&mut self, consumer_id: Uuid) -> StoreResult<Vec<CreditLimit>> {
        // the whole store is already held by this unit of work
        Ok(self
            .working
            .limits
            .iter()
            .filter(|l| l.consumer_id == consumer_id && l.status == RecordStatus::Active)
            .cloned()
            .collect())
    }

    async fn find_active_limit(&mut self, consumer_id: Uuid) -> StoreResult<Option<CreditLimit>> {
        Ok(self
            .working
            .limits
            .iter()
            .rev()
            .find(|l| l.consumer_id == consumer_id && l.status == RecordStatus::Active)
            .cloned())
    }

    async fn find_credit_limit(&mut self, id: Uuid) -> StoreResult<Option<CreditLimit>> {
        Ok(self.working.limits.iter().find(|l| l.id == id).cloned())
    }

    async fn insert_credit_limit(&mut self, limit: &CreditLimit) -> StoreResult<()> {
        if limit.status == RecordStatus::Active
            && self.working.active_limit_conflict(limit.consumer_id, limit.id)
        {
            return Err(StoreError::Conflict(format!(
                "consumer {} already has an active credit limit",
                limit.consumer_id
            )));
        }
        self.working.limits.push(limit.clone());
        self.pending_writes += 1;
        Ok(())
    }

    async fn update_credit_limit(&mut self, limit: &CreditLimit) -> StoreResult<()> {
        let existing = self
            .working
            .limit_mut(limit.id)
            .ok_or_else(|| StoreError::message(format!("credit limit {} vanished", limit.id)))?;
        existing.limits = limit.limits;
        existing.updated_at = limit.updated_at;
        self.pending_writes += 1;
        Ok(())
    }

    async fn set_credit_limit_status(
        &mut self,
        id: Uuid,
        status: RecordStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let consumer_id = match self.working.limits.iter().find(|l| l.id == id) {
            Some(limit) => limit.consumer_id,
            None => return Ok(false),
        };
        if status == RecordStatus::Active && self.working.active_limit_conflict(consumer_id, id) {
            return Err(StoreError::Conflict(format!(
                "consumer {} already has an active credit limit",
                consumer_id
            )));
        }

        if let Some(limit) = self.working.limit_mut(id) {
            limit.status = status;
            limit.updated_at = at;
        }
        self.pending_writes += 1;
        Ok(true)
    }

    async fn sum_transaction_totals(
        &mut self,
        consumer_id: Uuid,
        tenor: Tenor,
        scope: TotalsScope,
    ) -> StoreResult<Decimal> {
        self.working
            .transactions
            .iter()
            .filter(|t| t.consumer_id == consumer_id && t.loan_term == tenor)
            .filter(|t| scope.include_inactive || t.status == RecordStatus::Active)
            .filter(|t| Some(t.id) != scope.exclude)
            .try_fold(Decimal::ZERO, |acc, t| acc.checked_add(t.total_amount))
            .ok_or_else(|| StoreError::message("transaction totals overflow"))
    }

    async fn find_transaction(&mut self, id: Uuid) -> StoreResult<Option<Transaction>> {
        Ok(self.working.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        if self.working.transactions.iter().any(|t| t.id == transaction.id) {
            return Err(StoreError::Conflict(format!(
                "transaction {} already exists",
                transaction.id
            )));
        }
        self.working.transactions.push(transaction.clone());
        self.pending_writes += 1;
        Ok(())
    }

    async fn update_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        let existing = self.working.transaction_mut(transaction.id).ok_or_else(|| {
            StoreError::message(format!("transaction {} vanished", transaction.id))
        })?;
        *existing = transaction.clone();
        self.pending_writes += 1;
        Ok(())
    }

    async fn set_transaction_status(
        &mut self,
        id: Uuid,
        status: RecordStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        match self.working.transaction_mut(id) {
            Some(transaction) => {
                transaction.status = status;
                transaction.updated_at = at;
                self.pending_writes += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork {
            mut guard,
            working,
            pending_writes,
            writes,
        } = *self;
        *guard = working;
        writes.fetch_add(pending_writes, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Pagination, TenorLimits};
    use rust_decimal_macros::dec;

    fn limit(consumer_id: Uuid, status: RecordStatus) -> CreditLimit {
        let now = Utc::now();
        CreditLimit {
            id: Uuid::new_v4(),
            consumer_id,
            limits: TenorLimits::uniform(dec!(1000)),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();
        let consumer_id = Uuid::new_v4();
        let first = limit(consumer_id, RecordStatus::Active);

        let mut uow = store.begin().await.unwrap();
        uow.insert_credit_limit(&first).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.write_count(), 1);
        assert_eq!(store.find_credit_limit(first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_discards_writes() {
        let store = MemoryStore::new();
        let first = limit(Uuid::new_v4(), RecordStatus::Active);

        {
            let mut uow = store.begin().await.unwrap();
            uow.insert_credit_limit(&first).await.unwrap();
        }

        assert_eq!(store.write_count(), 0);
        assert!(store.find_credit_limit(first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_active_limit_is_a_conflict() {
        let store = MemoryStore::new();
        let consumer_id = Uuid::new_v4();

        let mut uow = store.begin().await.unwrap();
        uow.insert_credit_limit(&limit(consumer_id, RecordStatus::Active))
            .await
            .unwrap();
        let err = uow
            .insert_credit_limit(&limit(consumer_id, RecordStatus::Active))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // inactive history rows are fine
        uow.insert_credit_limit(&limit(consumer_id, RecordStatus::Inactive))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_listing_newest_first() {
        let store = MemoryStore::new();
        let consumer_id = Uuid::new_v4();
        let older = limit(consumer_id, RecordStatus::Inactive);
        let newer = limit(consumer_id, RecordStatus::Active);

        let mut uow = store.begin().await.unwrap();
        uow.insert_credit_limit(&older).await.unwrap();
        uow.insert_credit_limit(&newer).await.unwrap();
        uow.commit().await.unwrap();

        let page = store
            .list_credit_limits(&CreditLimitFilter {
                consumer_id: Some(consumer_id),
                status: None,
                pagination: Pagination::default(),
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, newer.id);
    }

    #[tokio::test]
    async fn test_overflowing_totals_are_a_store_error() {
        let store = MemoryStore::new();
        let consumer_id = Uuid::new_v4();
        let now = Utc::now();
        let huge = |contract: &str| Transaction {
            id: Uuid::new_v4(),
            consumer_id,
            contract_number: contract.to_string(),
            otr: Decimal::MAX,
            admin_fee: Decimal::ZERO,
            interest_amount: Decimal::ZERO,
            installment_amount: Decimal::MAX,
            total_amount: Decimal::MAX,
            loan_term: Tenor::OneMonth,
            asset_name: "Yamaha NMAX".to_string(),
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let mut uow = store.begin().await.unwrap();
        uow.insert_transaction(&huge("KP-A")).await.unwrap();
        uow.insert_transaction(&huge("KP-B")).await.unwrap();

        let err = uow
            .sum_transaction_totals(consumer_id, Tenor::OneMonth, TotalsScope::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}

//! Persistence interface consumed by the core
//!
//! A `CreditStore` hands out units of work. Every mutating flow runs inside
//! exactly one `UnitOfWork` and ends in `commit` or `rollback`; dropping an
//! uncommitted unit of work rolls it back.

use crate::error::{CreditError, Result, StoreResult};
use crate::types::{
    Consumer, ConsumerFilter, CreditLimit, CreditLimitFilter, Paged, RecordStatus, Tenor,
    Transaction, TransactionFilter,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Which transactions count towards a tenor total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TotalsScope {
    /// Count inactive transactions as well as active ones
    pub include_inactive: bool,
    /// Transaction whose own total is left out
    pub exclude: Option<Uuid>,
}

/// Transactional view of the store
#[async_trait]
pub trait UnitOfWork: Send {
    // Consumers

    /// Consumer by id
    async fn find_consumer(&mut self, id: Uuid) -> StoreResult<Option<Consumer>>;

    /// Active consumers holding `nik`, optionally ignoring one consumer
    async fn count_active_consumers_with_nik(
        &mut self,
        nik: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<u64>;

    /// Insert a new consumer
    async fn insert_consumer(&mut self, consumer: &Consumer) -> StoreResult<()>;

    /// Overwrite the mutable fields of a consumer
    async fn update_consumer(&mut self, consumer: &Consumer) -> StoreResult<()>;

    /// Set status; `false` when the consumer does not exist
    async fn set_consumer_status(
        &mut self,
        id: Uuid,
        status: RecordStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    // Credit limits

    /// Lock and return every active limit row of a consumer until the unit of
    /// work ends. Concurrent admissions and replacements for the same
    /// consumer queue up here.
    async fn lock_active_limits(&mut self, consumer_id: Uuid) -> StoreResult<Vec<CreditLimit>>;

    /// The consumer's active limit, if any
    async fn find_active_limit(&mut self, consumer_id: Uuid) -> StoreResult<Option<CreditLimit>>;

    /// Credit limit by id
    async fn find_credit_limit(&mut self, id: Uuid) -> StoreResult<Option<CreditLimit>>;

    /// Insert a new credit limit
    async fn insert_credit_limit(&mut self, limit: &CreditLimit) -> StoreResult<()>;

    /// Overwrite the ceilings of a credit limit
    async fn update_credit_limit(&mut self, limit: &CreditLimit) -> StoreResult<()>;

    /// Set status; `false` when the limit does not exist
    async fn set_credit_limit_status(
        &mut self,
        id: Uuid,
        status: RecordStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    // Transactions

    /// Sum of `total_amount` for a consumer at one tenor
    async fn sum_transaction_totals(
        &mut self,
        consumer_id: Uuid,
        tenor: Tenor,
        scope: TotalsScope,
    ) -> StoreResult<Decimal>;

    /// Transaction by id
    async fn find_transaction(&mut self, id: Uuid) -> StoreResult<Option<Transaction>>;

    /// Insert a new transaction
    async fn insert_transaction(&mut self, transaction: &Transaction) -> StoreResult<()>;

    /// Overwrite the financial fields of a transaction
    async fn update_transaction(&mut self, transaction: &Transaction) -> StoreResult<()>;

    /// Set status; `false` when the transaction does not exist
    async fn set_transaction_status(
        &mut self,
        id: Uuid,
        status: RecordStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    // Boundary

    /// Make every write of this unit visible
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discard every write of this unit
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Persistence backend shared by the engines and the HTTP layer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CreditStore: Send + Sync {
    /// Open a unit of work
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;

    /// Consumer by id
    async fn find_consumer(&self, id: Uuid) -> StoreResult<Option<Consumer>>;

    /// Filtered consumer page, newest first
    async fn list_consumers(&self, filter: &ConsumerFilter) -> StoreResult<Paged<Consumer>>;

    /// Credit limit by id
    async fn find_credit_limit(&self, id: Uuid) -> StoreResult<Option<CreditLimit>>;

    /// Filtered credit limit page, newest first
    async fn list_credit_limits(
        &self,
        filter: &CreditLimitFilter,
    ) -> StoreResult<Paged<CreditLimit>>;

    /// Transaction by id
    async fn find_transaction(&self, id: Uuid) -> StoreResult<Option<Transaction>>;

    /// Filtered transaction page, newest first
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> StoreResult<Paged<Transaction>>;
}

/// Roll back and return `err`. A failing rollback is swallowed so the caller
/// sees the original rejection.
pub(crate) async fn abort<T>(uow: Box<dyn UnitOfWork>, err: CreditError) -> Result<T> {
    let _ = uow.rollback().await;
    Err(err)
}

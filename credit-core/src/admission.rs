//! Transaction admission engine
//!
//! Validate → Normalize → Lock + CheckCapacity → Commit, inside one unit of
//! work. A rejected request leaves the store untouched.

use crate::availability::AvailabilityCalculator;
use crate::error::{CreditError, FieldError, Result, StoreResultExt};
use crate::policy::LendingPolicy;
use crate::store::{abort, CreditStore, UnitOfWork};
use crate::types::{RecordStatus, StatusChange, Tenor, Transaction, TransactionRequest};
use crate::validation;
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use uuid::Uuid;

/// Derived amounts of a transaction request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amounts {
    /// Amount drawn against the ceiling
    pub total: Decimal,
    /// Monthly installment
    pub installment: Decimal,
}

/// Fill in `total_amount` and `installment_amount`.
///
/// An explicit total wins unless it is zero; an explicit installment wins
/// unless it is zero or negative. Derived installments are rounded to `scale`
/// places, midpoint away from zero. A derived total that overflows is
/// reported against `total_amount`.
pub fn normalize(
    req: &TransactionRequest,
    tenor: Tenor,
    scale: u32,
) -> std::result::Result<Amounts, FieldError> {
    let total = validation::transaction_total(req)
        .ok_or_else(|| FieldError::new("total_amount", "amount overflow"))?;

    let installment = match req.installment_amount {
        Some(installment) if installment > Decimal::ZERO => installment,
        _ => (total / Decimal::from(tenor.months()))
            .round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero),
    };

    Ok(Amounts { total, installment })
}

/// Admits or rejects transactions against a consumer's credit limit
#[derive(Clone)]
pub struct AdmissionEngine {
    store: Arc<dyn CreditStore>,
    calculator: AvailabilityCalculator,
    policy: LendingPolicy,
}

impl std::fmt::Debug for AdmissionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionEngine")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl AdmissionEngine {
    /// New engine over a store
    pub fn new(store: Arc<dyn CreditStore>, policy: LendingPolicy) -> Self {
        Self {
            calculator: AvailabilityCalculator::new(store.clone(), policy),
            store,
            policy,
        }
    }

    fn prepare(
        &self,
        operation: &'static str,
        req: &TransactionRequest,
    ) -> Result<(Tenor, Amounts)> {
        let tenor = Tenor::from_months(req.loan_term).ok_or(CreditError::InvalidTenor {
            operation,
            loan_term: req.loan_term,
        })?;

        validation::validate_transaction(req)
            .map_err(|errors| CreditError::Validation { operation, errors })?;

        let amounts = normalize(req, tenor, self.policy.installment_scale)
            .map_err(|error| CreditError::Validation {
                operation,
                errors: vec![error],
            })?;
        Ok((tenor, amounts))
    }

    /// Admit a new transaction
    pub async fn create(&self, req: TransactionRequest) -> Result<Transaction> {
        const OP: &str = "create_transaction";

        let (tenor, amounts) = self.prepare(OP, &req)?;
        let mut uow = self.store.begin().await.during(OP)?;

        if uow.find_consumer(req.consumer_id).await.during(OP)?.is_none() {
            return abort(uow, CreditError::not_found(OP, "consumer", req.consumer_id)).await;
        }

        uow.lock_active_limits(req.consumer_id).await.during(OP)?;
        let remaining = self
            .calculator
            .remaining(uow.as_mut(), req.consumer_id, tenor, None)
            .await?;

        if remaining < amounts.total {
            let err = CreditError::InsufficientCreditLimit {
                operation: OP,
                consumer_id: req.consumer_id.to_string(),
                tenor,
                requested: amounts.total,
                remaining,
            };
            return abort(uow, err).await;
        }

        let now = Utc::now();
        let transaction = Transaction {
            id: Uuid::new_v4(),
            consumer_id: req.consumer_id,
            contract_number: req.contract_number,
            otr: req.otr,
            admin_fee: req.admin_fee,
            interest_amount: req.interest_amount,
            installment_amount: amounts.installment,
            total_amount: amounts.total,
            loan_term: tenor,
            asset_name: req.asset_name,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        };

        uow.insert_transaction(&transaction).await.during(OP)?;
        uow.commit().await.during(OP)?;

        Ok(transaction)
    }

    /// Re-admit an existing transaction with new financial fields.
    ///
    /// Identity, consumer and contract number are kept. The transaction's own
    /// previous total does not count against the capacity it is checked for.
    pub async fn update(&self, id: Uuid, req: TransactionRequest) -> Result<Transaction> {
        const OP: &str = "update_transaction";

        let (tenor, amounts) = self.prepare(OP, &req)?;
        let mut uow = self.store.begin().await.during(OP)?;

        let Some(existing) = uow.find_transaction(id).await.during(OP)? else {
            return abort(uow, CreditError::not_found(OP, "transaction", id)).await;
        };

        uow.lock_active_limits(existing.consumer_id).await.during(OP)?;
        let remaining = self
            .calculator
            .remaining(uow.as_mut(), existing.consumer_id, tenor, Some(id))
            .await?;

        if remaining < amounts.total {
            let err = CreditError::InsufficientCreditLimit {
                operation: OP,
                consumer_id: existing.consumer_id.to_string(),
                tenor,
                requested: amounts.total,
                remaining,
            };
            return abort(uow, err).await;
        }

        let updated = Transaction {
            otr: req.otr,
            admin_fee: req.admin_fee,
            interest_amount: req.interest_amount,
            installment_amount: amounts.installment,
            total_amount: amounts.total,
            loan_term: tenor,
            asset_name: req.asset_name,
            updated_at: Utc::now(),
            ..existing
        };

        uow.update_transaction(&updated).await.during(OP)?;
        uow.commit().await.during(OP)?;

        Ok(updated)
    }

    /// Switch the status of several transactions in one unit of work.
    ///
    /// Any unknown id aborts the batch. When inactive transactions do not
    /// count against the ceiling, re-activating one is admitted again.
    pub async fn set_status(&self, change: StatusChange) -> Result<usize> {
        const OP: &str = "update_transaction_status";

        validation::validate_status_change(&change)
            .map_err(|errors| CreditError::Validation { operation: OP, errors })?;

        let mut uow = self.store.begin().await.during(OP)?;
        let now = Utc::now();

        for id in &change.ids {
            let Some(existing) = uow.find_transaction(*id).await.during(OP)? else {
                return abort(uow, CreditError::not_found(OP, "transaction", id)).await;
            };

            let reactivating = change.status == RecordStatus::Active
                && existing.status == RecordStatus::Inactive;
            if reactivating && !self.policy.count_inactive_transactions {
                uow.lock_active_limits(existing.consumer_id).await.during(OP)?;
                let remaining = self
                    .calculator
                    .remaining(uow.as_mut(), existing.consumer_id, existing.loan_term, Some(*id))
                    .await?;
                if remaining < existing.total_amount {
                    let err = CreditError::InsufficientCreditLimit {
                        operation: OP,
                        consumer_id: existing.consumer_id.to_string(),
                        tenor: existing.loan_term,
                        requested: existing.total_amount,
                        remaining,
                    };
                    return abort(uow, err).await;
                }
            }

            uow.set_transaction_status(*id, change.status, now)
                .await
                .during(OP)?;
        }

        uow.commit().await.during(OP)?;
        Ok(change.ids.len())
    }
}

//! Availability calculator
//!
//! Remaining capacity for a tenor is the ceiling of the consumer's active
//! credit limit at that tenor minus the summed `total_amount` of the
//! consumer's transactions at the same tenor. No active limit means no credit.

use crate::error::{CreditError, Result, StoreError, StoreResultExt};
use crate::policy::LendingPolicy;
use crate::store::{CreditStore, TotalsScope, UnitOfWork};
use crate::types::Tenor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Capacity breakdown for one tenor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Tenor
    pub tenor: Tenor,
    /// Active ceiling, zero without an active limit
    pub ceiling: Decimal,
    /// Counted transaction totals
    pub used: Decimal,
    /// `ceiling - used`; negative when a ceiling was lowered below usage
    pub remaining: Decimal,
}

/// Computes remaining borrowing capacity
#[derive(Clone)]
pub struct AvailabilityCalculator {
    store: Arc<dyn CreditStore>,
    policy: LendingPolicy,
}

impl std::fmt::Debug for AvailabilityCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityCalculator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl AvailabilityCalculator {
    /// New calculator over a store
    pub fn new(store: Arc<dyn CreditStore>, policy: LendingPolicy) -> Self {
        Self { store, policy }
    }

    /// Breakdown inside an open unit of work. `exclude` leaves one
    /// transaction's own total out of the sum.
    pub async fn breakdown(
        &self,
        uow: &mut dyn UnitOfWork,
        consumer_id: Uuid,
        tenor: Tenor,
        exclude: Option<Uuid>,
    ) -> Result<Availability> {
        const OP: &str = "check_credit_limit_availability";

        let limit = uow.find_active_limit(consumer_id).await.during(OP)?;
        let Some(limit) = limit else {
            return Ok(Availability {
                tenor,
                ceiling: Decimal::ZERO,
                used: Decimal::ZERO,
                remaining: Decimal::ZERO,
            });
        };

        let scope = TotalsScope {
            include_inactive: self.policy.count_inactive_transactions,
            exclude,
        };
        let used = uow
            .sum_transaction_totals(consumer_id, tenor, scope)
            .await
            .during(OP)?;
        let ceiling = limit.limits.ceiling(tenor);
        let remaining = ceiling
            .checked_sub(used)
            .ok_or_else(|| StoreError::message("remaining capacity overflow"))
            .during(OP)?;

        Ok(Availability {
            tenor,
            ceiling,
            used,
            remaining,
        })
    }

    /// Remaining capacity inside an open unit of work
    pub async fn remaining(
        &self,
        uow: &mut dyn UnitOfWork,
        consumer_id: Uuid,
        tenor: Tenor,
        exclude: Option<Uuid>,
    ) -> Result<Decimal> {
        Ok(self
            .breakdown(uow, consumer_id, tenor, exclude)
            .await?
            .remaining)
    }

    /// Read-only remaining capacity for a raw loan term
    pub async fn check_availability(
        &self,
        consumer_id: Uuid,
        loan_term: i32,
    ) -> Result<Availability> {
        const OP: &str = "check_credit_limit_availability";

        let tenor = Tenor::from_months(loan_term).ok_or(CreditError::InvalidTenor {
            operation: OP,
            loan_term,
        })?;

        let mut uow = self.store.begin().await.during(OP)?;
        let result = self.lookup(uow.as_mut(), consumer_id, &[tenor]).await;
        uow.rollback().await.during(OP)?;

        result?
            .pop()
            .ok_or_else(|| CreditError::not_found(OP, "credit limit", consumer_id))
    }

    /// Read-only breakdown for every tenor
    pub async fn overview(&self, consumer_id: Uuid) -> Result<Vec<Availability>> {
        const OP: &str = "check_credit_limit_availability";

        let mut uow = self.store.begin().await.during(OP)?;
        let result = self.lookup(uow.as_mut(), consumer_id, &Tenor::ALL).await;
        uow.rollback().await.during(OP)?;
        result
    }

    async fn lookup(
        &self,
        uow: &mut dyn UnitOfWork,
        consumer_id: Uuid,
        tenors: &[Tenor],
    ) -> Result<Vec<Availability>> {
        const OP: &str = "check_credit_limit_availability";

        if uow.find_consumer(consumer_id).await.during(OP)?.is_none() {
            return Err(CreditError::not_found(OP, "consumer", consumer_id));
        }

        let mut out = Vec::with_capacity(tenors.len());
        for tenor in tenors {
            out.push(self.breakdown(uow, consumer_id, *tenor, None).await?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{seed, transaction};
    use crate::memory::MemoryStore;
    use crate::types::{RecordStatus, TenorLimits};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_no_active_limit_means_zero() {
        let store = MemoryStore::new();
        let id = seed(&store, None, vec![]).await;
        let calc = AvailabilityCalculator::new(Arc::new(store), LendingPolicy::default());

        for tenor in Tenor::ALL {
            let a = calc.check_availability(id, tenor.months() as i32).await.unwrap();
            assert_eq!(a.remaining, Decimal::ZERO);
        }
    }

    #[tokio::test]
    async fn test_only_same_tenor_counts() {
        let store = MemoryStore::new();
        let placeholder = Uuid::nil();
        let id = seed(
            &store,
            Some(TenorLimits::uniform(dec!(500000))),
            vec![
                transaction(placeholder, Tenor::OneMonth, dec!(300000), RecordStatus::Active),
                transaction(placeholder, Tenor::ThreeMonths, dec!(100000), RecordStatus::Active),
            ],
        )
        .await;
        let calc = AvailabilityCalculator::new(Arc::new(store), LendingPolicy::default());

        let one = calc.check_availability(id, 1).await.unwrap();
        assert_eq!(one.remaining, dec!(200000));
        assert_eq!(one.used, dec!(300000));
        assert_eq!(calc.check_availability(id, 2).await.unwrap().remaining, dec!(500000));
        assert_eq!(calc.check_availability(id, 3).await.unwrap().remaining, dec!(400000));
    }

    #[tokio::test]
    async fn test_inactive_transactions_follow_policy() {
        let store = MemoryStore::new();
        let id = seed(
            &store,
            Some(TenorLimits::uniform(dec!(500000))),
            vec![transaction(Uuid::nil(), Tenor::SixMonths, dec!(200000), RecordStatus::Inactive)],
        )
        .await;
        let store: Arc<dyn CreditStore> = Arc::new(store);

        let counting = AvailabilityCalculator::new(store.clone(), LendingPolicy::default());
        assert_eq!(counting.check_availability(id, 6).await.unwrap().remaining, dec!(300000));

        let lenient = AvailabilityCalculator::new(
            store,
            LendingPolicy {
                count_inactive_transactions: false,
                ..LendingPolicy::default()
            },
        );
        assert_eq!(lenient.check_availability(id, 6).await.unwrap().remaining, dec!(500000));
    }

    #[tokio::test]
    async fn test_invalid_tenor_and_unknown_consumer() {
        let calc =
            AvailabilityCalculator::new(Arc::new(MemoryStore::new()), LendingPolicy::default());

        let err = calc.check_availability(Uuid::new_v4(), 4).await.unwrap_err();
        assert!(matches!(err, CreditError::InvalidTenor { loan_term: 4, .. }));

        let err = calc.check_availability(Uuid::new_v4(), 1).await.unwrap_err();
        assert!(matches!(err, CreditError::NotFound { entity: "consumer", .. }));
    }

    #[tokio::test]
    async fn test_overview_covers_every_tenor() {
        let store = MemoryStore::new();
        let id = seed(
            &store,
            Some(TenorLimits {
                month_1: dec!(100),
                month_2: dec!(200),
                month_3: dec!(300),
                month_6: dec!(600),
            }),
            vec![],
        )
        .await;
        let calc = AvailabilityCalculator::new(Arc::new(store), LendingPolicy::default());

        let overview = calc.overview(id).await.unwrap();
        let remaining: Vec<_> = overview.iter().map(|a| a.remaining).collect();
        assert_eq!(remaining, vec![dec!(100), dec!(200), dec!(300), dec!(600)]);
    }
}

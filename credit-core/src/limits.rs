//! Credit limit lifecycle
//!
//! Creating a limit replaces the consumer's current one: every active row is
//! deactivated individually, then the new row is inserted as active, all in
//! one unit of work.

use crate::error::{CreditError, Result, StoreResultExt};
use crate::store::{abort, CreditStore, UnitOfWork};
use crate::types::{CreditLimit, CreditLimitRequest, RecordStatus, StatusChange};
use crate::validation;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Deactivate every active limit of `consumer_id` except `keep`
async fn deactivate_others(
    uow: &mut dyn UnitOfWork,
    operation: &'static str,
    consumer_id: Uuid,
    keep: Option<Uuid>,
    at: DateTime<Utc>,
) -> Result<usize> {
    let active = uow.lock_active_limits(consumer_id).await.during(operation)?;

    let mut deactivated = 0;
    for limit in active.iter().filter(|l| Some(l.id) != keep) {
        uow.set_credit_limit_status(limit.id, RecordStatus::Inactive, at)
            .await
            .during(operation)?;
        deactivated += 1;
    }
    Ok(deactivated)
}

/// Owns creation, update and status changes of credit limits
#[derive(Clone)]
pub struct CreditLimitManager {
    store: Arc<dyn CreditStore>,
}

impl std::fmt::Debug for CreditLimitManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreditLimitManager").finish_non_exhaustive()
    }
}

impl CreditLimitManager {
    /// New manager over a store
    pub fn new(store: Arc<dyn CreditStore>) -> Self {
        Self { store }
    }

    /// Create a limit, replacing the consumer's active one
    pub async fn create(&self, req: CreditLimitRequest) -> Result<CreditLimit> {
        const OP: &str = "create_credit_limit";

        validation::validate_credit_limit(&req)
            .map_err(|errors| CreditError::Validation { operation: OP, errors })?;

        let mut uow = self.store.begin().await.during(OP)?;
        if uow.find_consumer(req.consumer_id).await.during(OP)?.is_none() {
            return abort(uow, CreditError::not_found(OP, "consumer", req.consumer_id)).await;
        }

        let now = Utc::now();
        deactivate_others(uow.as_mut(), OP, req.consumer_id, None, now).await?;

        let limit = CreditLimit {
            id: Uuid::new_v4(),
            consumer_id: req.consumer_id,
            limits: req.limits,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        };
        uow.insert_credit_limit(&limit).await.during(OP)?;
        uow.commit().await.during(OP)?;

        Ok(limit)
    }

    /// Replace the four ceilings of an existing limit. The owning consumer
    /// cannot change.
    pub async fn update(&self, id: Uuid, req: CreditLimitRequest) -> Result<CreditLimit> {
        const OP: &str = "update_credit_limit";

        validation::validate_credit_limit(&req)
            .map_err(|errors| CreditError::Validation { operation: OP, errors })?;

        let mut uow = self.store.begin().await.during(OP)?;
        let Some(existing) = uow.find_credit_limit(id).await.during(OP)? else {
            return abort(uow, CreditError::not_found(OP, "credit limit", id)).await;
        };

        // admissions against this consumer wait until the new ceilings land
        uow.lock_active_limits(existing.consumer_id).await.during(OP)?;

        let updated = CreditLimit {
            limits: req.limits,
            updated_at: Utc::now(),
            ..existing
        };
        uow.update_credit_limit(&updated).await.during(OP)?;
        uow.commit().await.during(OP)?;

        Ok(updated)
    }

    /// Switch the status of several limits in one unit of work. Activating a
    /// limit deactivates the consumer's other active limits first.
    pub async fn set_status(&self, change: StatusChange) -> Result<usize> {
        const OP: &str = "update_credit_limit_status";

        validation::validate_status_change(&change)
            .map_err(|errors| CreditError::Validation { operation: OP, errors })?;

        let mut uow = self.store.begin().await.during(OP)?;
        let now = Utc::now();

        for id in &change.ids {
            let Some(existing) = uow.find_credit_limit(*id).await.during(OP)? else {
                return abort(uow, CreditError::not_found(OP, "credit limit", id)).await;
            };

            if change.status == RecordStatus::Active {
                deactivate_others(uow.as_mut(), OP, existing.consumer_id, Some(*id), now).await?;
            }
            uow.set_credit_limit_status(*id, change.status, now)
                .await
                .during(OP)?;
        }

        uow.commit().await.during(OP)?;
        Ok(change.ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::seed;
    use crate::memory::MemoryStore;
    use crate::types::{CreditLimitFilter, Pagination, TenorLimits};
    use rust_decimal_macros::dec;

    async fn active_limits(store: &MemoryStore, consumer_id: Uuid) -> Vec<CreditLimit> {
        store
            .list_credit_limits(&CreditLimitFilter {
                consumer_id: Some(consumer_id),
                status: Some(RecordStatus::Active),
                pagination: Pagination::default(),
            })
            .await
            .unwrap()
            .items
    }

    fn request(consumer_id: Uuid, amount: rust_decimal::Decimal) -> CreditLimitRequest {
        CreditLimitRequest {
            consumer_id,
            limits: TenorLimits::uniform(amount),
        }
    }

    #[tokio::test]
    async fn test_create_replaces_active_limit() {
        let store = MemoryStore::new();
        let consumer_id = seed(&store, Some(TenorLimits::uniform(dec!(100000))), vec![]).await;
        let manager = CreditLimitManager::new(Arc::new(store.clone()));
        let before = store.write_count();

        let second = manager.create(request(consumer_id, dec!(750000))).await.unwrap();

        let active = active_limits(&store, consumer_id).await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);
        // one deactivation plus one insert
        assert_eq!(store.write_count(), before + 2);
    }

    #[tokio::test]
    async fn test_create_requires_consumer() {
        let store = MemoryStore::new();
        let manager = CreditLimitManager::new(Arc::new(store.clone()));

        let err = manager.create(request(Uuid::new_v4(), dec!(1))).await.unwrap_err();
        assert!(matches!(err, CreditError::NotFound { entity: "consumer", .. }));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_update_keeps_consumer() {
        let store = MemoryStore::new();
        let consumer_id = seed(&store, None, vec![]).await;
        let manager = CreditLimitManager::new(Arc::new(store.clone()));
        let limit = manager.create(request(consumer_id, dec!(100))).await.unwrap();

        let updated = manager
            .update(limit.id, request(Uuid::new_v4(), dec!(900)))
            .await
            .unwrap();
        assert_eq!(updated.consumer_id, consumer_id);
        assert_eq!(updated.limits, TenorLimits::uniform(dec!(900)));
        assert_eq!(updated.status, RecordStatus::Active);
    }

    #[tokio::test]
    async fn test_activation_keeps_single_active_limit() {
        let store = MemoryStore::new();
        let consumer_id = seed(&store, None, vec![]).await;
        let manager = CreditLimitManager::new(Arc::new(store.clone()));

        let first = manager.create(request(consumer_id, dec!(100))).await.unwrap();
        let second = manager.create(request(consumer_id, dec!(200))).await.unwrap();

        manager
            .set_status(StatusChange {
                ids: vec![first.id],
                status: RecordStatus::Active,
            })
            .await
            .unwrap();

        let active = active_limits(&store, consumer_id).await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, first.id);
        assert_eq!(
            store.find_credit_limit(second.id).await.unwrap().unwrap().status,
            RecordStatus::Inactive
        );
    }

    #[tokio::test]
    async fn test_status_batch_unknown_id() {
        let store = MemoryStore::new();
        let consumer_id = seed(&store, None, vec![]).await;
        let manager = CreditLimitManager::new(Arc::new(store.clone()));
        let limit = manager.create(request(consumer_id, dec!(100))).await.unwrap();

        let err = manager
            .set_status(StatusChange {
                ids: vec![limit.id, Uuid::new_v4()],
                status: RecordStatus::Inactive,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CreditError::NotFound { .. }));
        assert_eq!(active_limits(&store, consumer_id).await.len(), 1);
    }
}

//! Consumer registry

use crate::error::{CreditError, Result, StoreResultExt};
use crate::store::{abort, CreditStore, UnitOfWork};
use crate::types::{Consumer, ConsumerRequest, RecordStatus, StatusChange};
use crate::validation;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

async fn ensure_nik_free(
    uow: &mut dyn UnitOfWork,
    operation: &'static str,
    nik: &str,
    exclude: Option<Uuid>,
) -> Result<()> {
    let holders = uow
        .count_active_consumers_with_nik(nik, exclude)
        .await
        .during(operation)?;
    if holders > 0 {
        return Err(CreditError::Conflict {
            operation,
            message: format!("NIK {} already registered to an active consumer", nik),
        });
    }
    Ok(())
}

/// Creates and maintains consumer profiles. NIK is unique among active
/// consumers.
#[derive(Clone)]
pub struct ConsumerRegistry {
    store: Arc<dyn CreditStore>,
}

impl std::fmt::Debug for ConsumerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerRegistry").finish_non_exhaustive()
    }
}

impl ConsumerRegistry {
    /// New registry over a store
    pub fn new(store: Arc<dyn CreditStore>) -> Self {
        Self { store }
    }

    /// Register a new active consumer
    pub async fn create(&self, req: ConsumerRequest) -> Result<Consumer> {
        const OP: &str = "create_consumer";

        validation::validate_consumer(&req)
            .map_err(|errors| CreditError::Validation { operation: OP, errors })?;

        let mut uow = self.store.begin().await.during(OP)?;
        let nik_check = ensure_nik_free(uow.as_mut(), OP, &req.nik, None).await;
        if let Err(err) = nik_check {
            return abort(uow, err).await;
        }

        let now = Utc::now();
        let consumer = Consumer {
            id: Uuid::new_v4(),
            nik: req.nik,
            full_name: req.full_name,
            legal_name: req.legal_name,
            place_of_birth: req.place_of_birth,
            date_of_birth: req.date_of_birth,
            salary: req.salary,
            ktp_img_url: req.ktp_img_url,
            selfie_img_url: req.selfie_img_url,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        };
        uow.insert_consumer(&consumer).await.during(OP)?;
        uow.commit().await.during(OP)?;

        Ok(consumer)
    }

    /// Overwrite a consumer's profile fields
    pub async fn update(&self, id: Uuid, req: ConsumerRequest) -> Result<Consumer> {
        const OP: &str = "update_consumer";

        validation::validate_consumer(&req)
            .map_err(|errors| CreditError::Validation { operation: OP, errors })?;

        let mut uow = self.store.begin().await.during(OP)?;
        let Some(existing) = uow.find_consumer(id).await.during(OP)? else {
            return abort(uow, CreditError::not_found(OP, "consumer", id)).await;
        };
        let nik_check = ensure_nik_free(uow.as_mut(), OP, &req.nik, Some(id)).await;
        if let Err(err) = nik_check {
            return abort(uow, err).await;
        }

        let updated = Consumer {
            nik: req.nik,
            full_name: req.full_name,
            legal_name: req.legal_name,
            place_of_birth: req.place_of_birth,
            date_of_birth: req.date_of_birth,
            salary: req.salary,
            ktp_img_url: req.ktp_img_url,
            selfie_img_url: req.selfie_img_url,
            updated_at: Utc::now(),
            ..existing
        };
        uow.update_consumer(&updated).await.during(OP)?;
        uow.commit().await.during(OP)?;

        Ok(updated)
    }

    /// Switch the status of several consumers in one unit of work
    pub async fn set_status(&self, change: StatusChange) -> Result<usize> {
        const OP: &str = "update_consumer_status";

        validation::validate_status_change(&change)
            .map_err(|errors| CreditError::Validation { operation: OP, errors })?;

        let mut uow = self.store.begin().await.during(OP)?;
        let now = Utc::now();

        for id in &change.ids {
            let Some(existing) = uow.find_consumer(*id).await.during(OP)? else {
                return abort(uow, CreditError::not_found(OP, "consumer", id)).await;
            };

            if change.status == RecordStatus::Active {
                let nik_check = ensure_nik_free(uow.as_mut(), OP, &existing.nik, Some(*id)).await;
                if let Err(err) = nik_check {
                    return abort(uow, err).await;
                }
            }
            uow.set_consumer_status(*id, change.status, now)
                .await
                .during(OP)?;
        }

        uow.commit().await.during(OP)?;
        Ok(change.ids.len())
    }
}

use crate::errors::Result;
use crate::metrics;
use crate::models::AvailabilityResponse;
use credit_core::{
    AdmissionEngine, AvailabilityCalculator, Consumer, ConsumerFilter, ConsumerRegistry,
    ConsumerRequest, CreditError, CreditLimit, CreditLimitFilter, CreditLimitManager,
    CreditLimitRequest, CreditStore, LendingPolicy, Paged, StatusChange, StoreError, Transaction,
    TransactionFilter, TransactionRequest,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Facade over the credit core used by both HTTP surfaces
pub struct LendingService {
    store: Arc<dyn CreditStore>,
    consumers: ConsumerRegistry,
    limits: CreditLimitManager,
    admission: AdmissionEngine,
    availability: AvailabilityCalculator,
}

fn read_failure(operation: &'static str) -> impl FnOnce(StoreError) -> CreditError {
    move |err| CreditError::from_store(operation, err)
}

fn missing(operation: &'static str, entity: &'static str, id: Uuid) -> CreditError {
    CreditError::NotFound {
        operation,
        entity,
        id: id.to_string(),
    }
}

impl LendingService {
    pub fn new(store: Arc<dyn CreditStore>, policy: LendingPolicy) -> Self {
        LendingService {
            consumers: ConsumerRegistry::new(store.clone()),
            limits: CreditLimitManager::new(store.clone()),
            admission: AdmissionEngine::new(store.clone(), policy),
            availability: AvailabilityCalculator::new(store.clone(), policy),
            store,
        }
    }

    // Consumers

    pub async fn list_consumers(&self, filter: ConsumerFilter) -> Result<Paged<Consumer>> {
        Ok(self
            .store
            .list_consumers(&filter)
            .await
            .map_err(read_failure("list_consumers"))?)
    }

    pub async fn get_consumer(&self, id: Uuid) -> Result<Consumer> {
        const OP: &str = "get_consumer";
        let consumer = self
            .store
            .find_consumer(id)
            .await
            .map_err(read_failure(OP))?;
        Ok(consumer.ok_or_else(|| missing(OP, "consumer", id))?)
    }

    pub async fn create_consumer(&self, request: ConsumerRequest) -> Result<Consumer> {
        let consumer = self.consumers.create(request).await.map_err(|e| {
            warn!("Consumer registration rejected: {}", e);
            e
        })?;

        metrics::CONSUMERS_REGISTERED.inc();
        info!("Registered consumer {}", consumer.id);
        Ok(consumer)
    }

    pub async fn update_consumer(&self, id: Uuid, request: ConsumerRequest) -> Result<Consumer> {
        let consumer = self.consumers.update(id, request).await.map_err(|e| {
            warn!("Consumer {} update rejected: {}", id, e);
            e
        })?;

        info!("Updated consumer {}", id);
        Ok(consumer)
    }

    pub async fn set_consumer_status(&self, change: StatusChange) -> Result<usize> {
        let status = change.status;
        let updated = self.consumers.set_status(change).await.map_err(|e| {
            warn!("Consumer status change rejected: {}", e);
            e
        })?;

        info!("Set {} consumer(s) to {}", updated, status);
        Ok(updated)
    }

    // Credit limits

    pub async fn list_credit_limits(
        &self,
        filter: CreditLimitFilter,
    ) -> Result<Paged<CreditLimit>> {
        Ok(self
            .store
            .list_credit_limits(&filter)
            .await
            .map_err(read_failure("list_credit_limits"))?)
    }

    pub async fn get_credit_limit(&self, id: Uuid) -> Result<CreditLimit> {
        const OP: &str = "get_credit_limit";
        let limit = self
            .store
            .find_credit_limit(id)
            .await
            .map_err(read_failure(OP))?;
        Ok(limit.ok_or_else(|| missing(OP, "credit limit", id))?)
    }

    /// Create a limit, replacing the consumer's current active one
    pub async fn create_credit_limit(&self, request: CreditLimitRequest) -> Result<CreditLimit> {
        let consumer_id = request.consumer_id;
        let limit = self.limits.create(request).await.map_err(|e| {
            warn!("Credit limit for consumer {} rejected: {}", consumer_id, e);
            e
        })?;

        metrics::CREDIT_LIMITS_CREATED.inc();
        info!(
            "Credit limit {} is now active for consumer {}",
            limit.id, limit.consumer_id
        );
        Ok(limit)
    }

    pub async fn update_credit_limit(
        &self,
        id: Uuid,
        request: CreditLimitRequest,
    ) -> Result<CreditLimit> {
        let limit = self.limits.update(id, request).await.map_err(|e| {
            warn!("Credit limit {} update rejected: {}", id, e);
            e
        })?;

        info!("Updated credit limit {}", id);
        Ok(limit)
    }

    pub async fn set_credit_limit_status(&self, change: StatusChange) -> Result<usize> {
        let status = change.status;
        let updated = self.limits.set_status(change).await.map_err(|e| {
            warn!("Credit limit status change rejected: {}", e);
            e
        })?;

        info!("Set {} credit limit(s) to {}", updated, status);
        Ok(updated)
    }

    /// Remaining capacity for one tenor, or every tenor when `tenor` is absent
    pub async fn availability(
        &self,
        consumer_id: Uuid,
        tenor: Option<i32>,
    ) -> Result<AvailabilityResponse> {
        metrics::AVAILABILITY_CHECKS.inc();

        let tenors = match tenor {
            Some(loan_term) => vec![
                self.availability
                    .check_availability(consumer_id, loan_term)
                    .await?,
            ],
            None => self.availability.overview(consumer_id).await?,
        };

        Ok(AvailabilityResponse {
            consumer_id,
            tenors,
        })
    }

    // Transactions

    pub async fn list_transactions(&self, filter: TransactionFilter) -> Result<Paged<Transaction>> {
        Ok(self
            .store
            .list_transactions(&filter)
            .await
            .map_err(read_failure("list_transactions"))?)
    }

    pub async fn get_transaction(&self, id: Uuid) -> Result<Transaction> {
        const OP: &str = "get_transaction";
        let transaction = self
            .store
            .find_transaction(id)
            .await
            .map_err(read_failure(OP))?;
        Ok(transaction.ok_or_else(|| missing(OP, "transaction", id))?)
    }

    /// Admit a new transaction against the consumer's active limit
    pub async fn create_transaction(&self, request: TransactionRequest) -> Result<Transaction> {
        let consumer_id = request.consumer_id;

        match self.admission.create(request).await {
            Ok(transaction) => {
                metrics::TRANSACTIONS_ADMITTED
                    .with_label_values(&[&transaction.loan_term.to_string()])
                    .inc();
                info!(
                    "Admitted transaction {} for consumer {}: {} over {}",
                    transaction.id, consumer_id, transaction.total_amount, transaction.loan_term
                );
                Ok(transaction)
            }
            Err(e) => {
                metrics::TRANSACTIONS_REJECTED
                    .with_label_values(&[e.kind()])
                    .inc();
                warn!("Transaction for consumer {} rejected: {}", consumer_id, e);
                Err(e.into())
            }
        }
    }

    pub async fn update_transaction(
        &self,
        id: Uuid,
        request: TransactionRequest,
    ) -> Result<Transaction> {
        match self.admission.update(id, request).await {
            Ok(transaction) => {
                info!(
                    "Updated transaction {}: {} over {}",
                    id, transaction.total_amount, transaction.loan_term
                );
                Ok(transaction)
            }
            Err(e) => {
                metrics::TRANSACTIONS_REJECTED
                    .with_label_values(&[e.kind()])
                    .inc();
                warn!("Transaction {} update rejected: {}", id, e);
                Err(e.into())
            }
        }
    }

    pub async fn set_transaction_status(&self, change: StatusChange) -> Result<usize> {
        let status = change.status;
        let updated = self.admission.set_status(change).await.map_err(|e| {
            warn!("Transaction status change rejected: {}", e);
            e
        })?;

        info!("Set {} transaction(s) to {}", updated, status);
        Ok(updated)
    }
}

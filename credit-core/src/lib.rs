//! Credit Core
//!
//! Consumer credit limits segmented by loan tenor, and admission of loan
//! transactions drawn against those limits.
//!
//! # Architecture
//!
//! - **Store**: Persistence is an injected `CreditStore`; every mutating flow
//!   runs inside one `UnitOfWork` (begin/commit/rollback)
//! - **Availability**: Remaining capacity = active ceiling for the tenor minus
//!   committed transaction totals at that tenor
//! - **Admission**: Validate → Normalize → Lock + CheckCapacity → Commit
//! - **Replacement**: A new credit limit deactivates the old ones first
//!
//! # Invariants
//!
//! - At most one active credit limit per consumer
//! - Σ(total_amount) at a tenor never exceeds the active ceiling for that tenor
//! - A rejected admission performs no write
//! - NIK is unique among active consumers

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, missing_debug_implementations)]

pub mod admission;
pub mod availability;
pub mod consumers;
pub mod error;
pub mod limits;
pub mod memory;
pub mod policy;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod fixtures;

// Re-exports
pub use admission::{normalize, AdmissionEngine, Amounts};
pub use availability::{Availability, AvailabilityCalculator};
pub use consumers::ConsumerRegistry;
pub use error::{CreditError, FieldError, Result, StoreError, StoreResult};
pub use limits::CreditLimitManager;
pub use memory::MemoryStore;
pub use policy::LendingPolicy;
pub use store::{CreditStore, TotalsScope, UnitOfWork};
pub use types::{
    Consumer, ConsumerFilter, ConsumerRequest, CreditLimit, CreditLimitFilter,
    CreditLimitRequest, Paged, Pagination, RecordStatus, StatusChange, StatusInfo, Tenor,
    TenorLimits, Transaction, TransactionFilter, TransactionRequest,
};

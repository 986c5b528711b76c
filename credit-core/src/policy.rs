//! Lending policy knobs handed to the core engines at construction

use serde::{Deserialize, Serialize};

/// Policy shared by the availability calculator and the admission engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingPolicy {
    /// Count inactive (cancelled) transactions against the ceiling
    pub count_inactive_transactions: bool,
    /// Decimal places kept on derived installment amounts, at most
    /// `validation::MONEY_SCALE`
    pub installment_scale: u32,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        LendingPolicy {
            count_inactive_transactions: true,
            installment_scale: 2,
        }
    }
}

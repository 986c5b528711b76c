//! Domain types for consumers, credit limits and loan transactions

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Loan tenor in months. Only 1, 2, 3 and 6 months are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Tenor {
    /// 1 month
    OneMonth,
    /// 2 months
    TwoMonths,
    /// 3 months
    ThreeMonths,
    /// 6 months
    SixMonths,
}

impl Tenor {
    /// Every tenor, shortest first
    pub const ALL: [Tenor; 4] = [
        Tenor::OneMonth,
        Tenor::TwoMonths,
        Tenor::ThreeMonths,
        Tenor::SixMonths,
    ];

    /// Month count
    pub fn months(self) -> u32 {
        match self {
            Tenor::OneMonth => 1,
            Tenor::TwoMonths => 2,
            Tenor::ThreeMonths => 3,
            Tenor::SixMonths => 6,
        }
    }

    /// Parse a raw month count
    pub fn from_months(months: i32) -> Option<Self> {
        match months {
            1 => Some(Tenor::OneMonth),
            2 => Some(Tenor::TwoMonths),
            3 => Some(Tenor::ThreeMonths),
            6 => Some(Tenor::SixMonths),
            _ => None,
        }
    }
}

/// Raw month count that is not an offered tenor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownTenor(pub i32);

impl fmt::Display for UnknownTenor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loan term {} is not one of 1, 2, 3, 6", self.0)
    }
}

impl std::error::Error for UnknownTenor {}

impl TryFrom<i32> for Tenor {
    type Error = UnknownTenor;

    fn try_from(months: i32) -> Result<Self, Self::Error> {
        Tenor::from_months(months).ok_or(UnknownTenor(months))
    }
}

impl From<Tenor> for i32 {
    fn from(tenor: Tenor) -> Self {
        tenor.months() as i32
    }
}

impl fmt::Display for Tenor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}M", self.months())
    }
}

/// Record status shared by consumers, credit limits and transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    /// Live record
    #[default]
    Active,
    /// Switched off, kept for history
    Inactive,
}

impl RecordStatus {
    /// Storage / wire form
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Active => "ACTIVE",
            RecordStatus::Inactive => "INACTIVE",
        }
    }

    /// Legacy numeric status id still used by older partner integrations
    pub fn legacy_id(self) -> &'static str {
        match self {
            RecordStatus::Active => "1",
            RecordStatus::Inactive => "0",
        }
    }

    /// Status catalogue served to clients
    pub fn catalogue() -> Vec<StatusInfo> {
        [RecordStatus::Active, RecordStatus::Inactive]
            .into_iter()
            .map(|status| StatusInfo {
                id: status.legacy_id().to_string(),
                code: status,
                name: match status {
                    RecordStatus::Active => "Active".to_string(),
                    RecordStatus::Inactive => "Inactive".to_string(),
                },
            })
            .collect()
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" | "1" => Ok(RecordStatus::Active),
            "INACTIVE" | "0" => Ok(RecordStatus::Inactive),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of the status catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusInfo {
    /// Legacy id ("1" / "0")
    pub id: String,
    /// Status code
    pub code: RecordStatus,
    /// Display name
    pub name: String,
}

/// Consumer profile with KYC data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumer {
    /// Record id
    pub id: Uuid,
    /// National identity number (16 digits)
    pub nik: String,
    /// Name as used day to day
    pub full_name: String,
    /// Name on the identity card
    pub legal_name: String,
    /// Place of birth
    pub place_of_birth: String,
    /// Date of birth
    pub date_of_birth: NaiveDate,
    /// Declared monthly salary
    pub salary: Decimal,
    /// Identity card (KTP) scan
    pub ktp_img_url: String,
    /// Selfie holding the identity card
    pub selfie_img_url: String,
    /// Record status
    pub status: RecordStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Create / update payload for a consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerRequest {
    /// 16-digit national identity number
    pub nik: String,
    /// Name as used day to day
    pub full_name: String,
    /// Name on the identity card
    pub legal_name: String,
    /// Place of birth
    pub place_of_birth: String,
    /// Date of birth
    pub date_of_birth: NaiveDate,
    /// Declared monthly salary
    pub salary: Decimal,
    /// Identity card (KTP) scan
    pub ktp_img_url: String,
    /// Selfie holding the identity card
    pub selfie_img_url: String,
}

/// Four independent ceilings, one per tenor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TenorLimits {
    /// 1 month ceiling
    pub month_1: Decimal,
    /// 2 month ceiling
    pub month_2: Decimal,
    /// 3 month ceiling
    pub month_3: Decimal,
    /// 6 month ceiling
    pub month_6: Decimal,
}

impl TenorLimits {
    /// Same ceiling for every tenor
    pub fn uniform(amount: Decimal) -> Self {
        TenorLimits {
            month_1: amount,
            month_2: amount,
            month_3: amount,
            month_6: amount,
        }
    }

    /// Ceiling for a tenor
    pub fn ceiling(&self, tenor: Tenor) -> Decimal {
        match tenor {
            Tenor::OneMonth => self.month_1,
            Tenor::TwoMonths => self.month_2,
            Tenor::ThreeMonths => self.month_3,
            Tenor::SixMonths => self.month_6,
        }
    }
}

/// Credit limit of a consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditLimit {
    /// Record id
    pub id: Uuid,
    /// Owning consumer
    pub consumer_id: Uuid,
    /// Ceilings per tenor
    #[serde(flatten)]
    pub limits: TenorLimits,
    /// Record status
    pub status: RecordStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Create / update payload for a credit limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditLimitRequest {
    /// Owning consumer
    pub consumer_id: Uuid,
    /// Ceilings per tenor
    #[serde(flatten)]
    pub limits: TenorLimits,
}

/// Loan transaction drawn against a credit limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Record id
    pub id: Uuid,
    /// Owning consumer
    pub consumer_id: Uuid,
    /// Financing contract number
    pub contract_number: String,
    /// On-the-road price
    pub otr: Decimal,
    /// Administration fee
    pub admin_fee: Decimal,
    /// Interest over the whole tenor
    pub interest_amount: Decimal,
    /// Monthly installment
    pub installment_amount: Decimal,
    /// Amount drawn against the ceiling
    pub total_amount: Decimal,
    /// Tenor
    pub loan_term: Tenor,
    /// Financed asset
    pub asset_name: String,
    /// Record status
    pub status: RecordStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Create / update payload for a transaction.
///
/// `total_amount` and `installment_amount` are derived when absent (or zero,
/// resp. not positive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Owning consumer
    pub consumer_id: Uuid,
    /// Financing contract number
    #[serde(default)]
    pub contract_number: String,
    /// On-the-road price of the financed asset
    pub otr: Decimal,
    /// Administration fee
    #[serde(default)]
    pub admin_fee: Decimal,
    /// Interest over the whole tenor
    #[serde(default)]
    pub interest_amount: Decimal,
    /// Monthly installment
    #[serde(default)]
    pub installment_amount: Option<Decimal>,
    /// Amount drawn against the ceiling
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    /// Tenor
    pub loan_term: i32,
    /// Financed asset
    #[serde(default)]
    pub asset_name: String,
}

/// Bulk status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    /// Records to change
    pub ids: Vec<Uuid>,
    /// Record status
    pub status: RecordStatus,
}

/// Page request. Pages start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number
    pub page: u32,
    /// Rows per page
    pub size: u32,
}

impl Pagination {
    /// Default page size
    pub const DEFAULT_SIZE: u32 = 10;
    /// Largest page served
    pub const MAX_SIZE: u32 = 100;

    /// Clamp raw query values into a valid page
    pub fn new(page: Option<u32>, size: Option<u32>) -> Self {
        Pagination {
            page: page.unwrap_or(1).max(1),
            size: size
                .unwrap_or(Self::DEFAULT_SIZE)
                .clamp(1, Self::MAX_SIZE),
        }
    }

    /// Rows to skip
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.size as u64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination::new(None, None)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    /// Rows of this page
    pub items: Vec<T>,
    /// Matching rows across all pages
    pub total: u64,
    /// 1-based page number
    pub page: u32,
    /// Rows per page
    pub size: u32,
}

impl<T> Paged<T> {
    /// Slice an already filtered, ordered list
    pub fn from_sorted(all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.size as usize)
            .collect();

        Paged {
            items,
            total,
            page: pagination.page,
            size: pagination.size,
        }
    }
}

/// Consumer listing filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumerFilter {
    /// Exact NIK
    pub nik: Option<String>,
    /// Case-insensitive fragment of the full name
    pub name: Option<String>,
    /// Record status
    pub status: Option<RecordStatus>,
    /// Lowest salary
    pub min_salary: Option<Decimal>,
    /// Highest salary
    pub max_salary: Option<Decimal>,
    /// Page to return
    pub pagination: Pagination,
}

/// Credit limit listing filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreditLimitFilter {
    /// Owning consumer
    pub consumer_id: Option<Uuid>,
    /// Record status
    pub status: Option<RecordStatus>,
    /// Page to return
    pub pagination: Pagination,
}

/// Transaction listing filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Owning consumer
    pub consumer_id: Option<Uuid>,
    /// Fragment of the contract number
    pub contract_number: Option<String>,
    /// Tenor
    pub loan_term: Option<Tenor>,
    /// Record status
    pub status: Option<RecordStatus>,
    /// Page to return
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tenor_parsing() {
        assert_eq!(Tenor::from_months(1), Some(Tenor::OneMonth));
        assert_eq!(Tenor::from_months(6), Some(Tenor::SixMonths));
        assert_eq!(Tenor::from_months(4), None);
        assert_eq!(Tenor::try_from(0), Err(UnknownTenor(0)));
        assert_eq!(i32::from(Tenor::ThreeMonths), 3);
    }

    #[test]
    fn test_tenor_serializes_as_month_count() {
        let json = serde_json::to_string(&Tenor::SixMonths).unwrap();
        assert_eq!(json, "6");
        assert!(serde_json::from_str::<Tenor>("5").is_err());
    }

    #[test]
    fn test_status_parsing_accepts_legacy_ids() {
        assert_eq!("1".parse::<RecordStatus>().unwrap(), RecordStatus::Active);
        assert_eq!("inactive".parse::<RecordStatus>().unwrap(), RecordStatus::Inactive);
        assert!("2".parse::<RecordStatus>().is_err());
        assert_eq!(RecordStatus::catalogue().len(), 2);
    }

    #[test]
    fn test_ceiling_per_tenor() {
        let limits = TenorLimits {
            month_1: dec!(100),
            month_2: dec!(200),
            month_3: dec!(300),
            month_6: dec!(600),
        };
        assert_eq!(limits.ceiling(Tenor::TwoMonths), dec!(200));
        assert_eq!(limits.ceiling(Tenor::SixMonths), dec!(600));
    }

    #[test]
    fn test_pagination_clamps() {
        let p = Pagination::new(Some(0), Some(1000));
        assert_eq!(p.page, 1);
        assert_eq!(p.size, Pagination::MAX_SIZE);
        assert_eq!(Pagination::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn test_paged_slices() {
        let paged =
            Paged::from_sorted((1..=25).collect::<Vec<_>>(), Pagination::new(Some(3), None));
        assert_eq!(paged.total, 25);
        assert_eq!(paged.items, vec![21, 22, 23, 24, 25]);
    }
}

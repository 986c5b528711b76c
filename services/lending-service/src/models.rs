use chrono::{DateTime, NaiveDate, Utc};
use credit_core::{
    Availability, Consumer, ConsumerFilter, CreditLimit, CreditLimitFilter, Pagination,
    RecordStatus, StatusInfo, Tenor, TenorLimits, Transaction, TransactionFilter,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Consumer row as stored in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct ConsumerRow {
    pub id: Uuid,
    pub nik: String,
    pub full_name: String,
    pub legal_name: String,
    pub place_of_birth: String,
    pub date_of_birth: NaiveDate,
    pub salary: Decimal,
    pub ktp_img_url: String,
    pub selfie_img_url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ConsumerRow> for Consumer {
    type Error = String;

    fn try_from(row: ConsumerRow) -> Result<Self, Self::Error> {
        Ok(Consumer {
            id: row.id,
            nik: row.nik,
            full_name: row.full_name,
            legal_name: row.legal_name,
            place_of_birth: row.place_of_birth,
            date_of_birth: row.date_of_birth,
            salary: row.salary,
            ktp_img_url: row.ktp_img_url,
            selfie_img_url: row.selfie_img_url,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Credit limit row
#[derive(Debug, Clone, FromRow)]
pub struct CreditLimitRow {
    pub id: Uuid,
    pub consumer_id: Uuid,
    pub month_1: Decimal,
    pub month_2: Decimal,
    pub month_3: Decimal,
    pub month_6: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CreditLimitRow> for CreditLimit {
    type Error = String;

    fn try_from(row: CreditLimitRow) -> Result<Self, Self::Error> {
        Ok(CreditLimit {
            id: row.id,
            consumer_id: row.consumer_id,
            limits: TenorLimits {
                month_1: row.month_1,
                month_2: row.month_2,
                month_3: row.month_3,
                month_6: row.month_6,
            },
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Transaction row
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub consumer_id: Uuid,
    pub contract_number: String,
    pub otr: Decimal,
    pub admin_fee: Decimal,
    pub interest_amount: Decimal,
    pub installment_amount: Decimal,
    pub total_amount: Decimal,
    pub loan_term: i32,
    pub asset_name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = String;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let loan_term = Tenor::try_from(row.loan_term).map_err(|e| e.to_string())?;

        Ok(Transaction {
            id: row.id,
            consumer_id: row.consumer_id,
            contract_number: row.contract_number,
            otr: row.otr,
            admin_fee: row.admin_fee,
            interest_amount: row.interest_amount,
            installment_amount: row.installment_amount,
            total_amount: row.total_amount,
            loan_term,
            asset_name: row.asset_name,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// Query parameters

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsumerListQuery {
    pub nik: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub min_salary: Option<Decimal>,
    pub max_salary: Option<Decimal>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl ConsumerListQuery {
    pub fn into_filter(self) -> Result<ConsumerFilter, String> {
        Ok(ConsumerFilter {
            nik: self.nik.filter(|n| !n.is_empty()),
            name: self.name.filter(|n| !n.is_empty()),
            status: parse_status(self.status)?,
            min_salary: self.min_salary,
            max_salary: self.max_salary,
            pagination: Pagination::new(self.page, self.size),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreditLimitListQuery {
    pub consumer_id: Option<Uuid>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl CreditLimitListQuery {
    pub fn into_filter(self) -> Result<CreditLimitFilter, String> {
        Ok(CreditLimitFilter {
            consumer_id: self.consumer_id,
            status: parse_status(self.status)?,
            pagination: Pagination::new(self.page, self.size),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionListQuery {
    pub consumer_id: Option<Uuid>,
    pub contract_number: Option<String>,
    pub loan_term: Option<i32>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl TransactionListQuery {
    pub fn into_filter(self) -> Result<TransactionFilter, String> {
        let loan_term = self
            .loan_term
            .map(Tenor::try_from)
            .transpose()
            .map_err(|e| e.to_string())?;

        Ok(TransactionFilter {
            consumer_id: self.consumer_id,
            contract_number: self.contract_number.filter(|c| !c.is_empty()),
            loan_term,
            status: parse_status(self.status)?,
            pagination: Pagination::new(self.page, self.size),
        })
    }
}

/// `?tenor=N` on the availability endpoints; absent means every tenor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityQuery {
    pub tenor: Option<i32>,
}

fn parse_status(raw: Option<String>) -> Result<Option<RecordStatus>, String> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}

// Responses

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusChangeResponse {
    pub updated: usize,
    pub status: RecordStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub consumer_id: Uuid,
    pub tenors: Vec<Availability>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusCatalogueResponse {
    pub statuses: Vec<StatusInfo>,
}

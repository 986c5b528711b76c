//! Request validation
//!
//! One function per request type. Each collects every offending field instead
//! of stopping at the first one.

use crate::error::FieldError;
use crate::types::{ConsumerRequest, CreditLimitRequest, StatusChange, TransactionRequest};
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

/// Upper bound for a declared monthly salary
pub const MAX_SALARY: i64 = 99_999_999_999;

/// Upper bound for any single money amount, derived totals included
pub const MAX_AMOUNT: i64 = 999_999_999_999_999_999;

/// Decimal places stored for money amounts
pub const MONEY_SCALE: u32 = 2;

/// Longest free-text field accepted
pub const MAX_TEXT_LEN: usize = 250;

lazy_static! {
    static ref NIK_PATTERN: Regex = Regex::new(r"^\d{16}$").expect("NIK pattern is valid");
    static ref TEXT_PATTERN: Regex =
        Regex::new(r"^[a-zA-Z0-9\s\-',.&()]{1,250}$").expect("text pattern is valid");
}

type Validation = std::result::Result<(), Vec<FieldError>>;

fn finish(errors: Vec<FieldError>) -> Validation {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_text(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if !TEXT_PATTERN.is_match(value) {
        errors.push(FieldError::new(
            field,
            "must be 1-250 characters of letters, digits, spaces or -',.&()",
        ));
    }
}

fn check_url(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if !validator::validate_url(value) {
        errors.push(FieldError::new(field, "must be a valid URL"));
    }
}

fn check_scale(errors: &mut Vec<FieldError>, field: &str, value: Decimal) {
    // trailing zeros do not count: 100.000 is accepted
    if value.normalize().scale() > MONEY_SCALE {
        errors.push(FieldError::new(field, "must have at most 2 decimal places"));
    }
}

fn check_amount(errors: &mut Vec<FieldError>, field: &str, value: Decimal) {
    if value < Decimal::ZERO {
        errors.push(FieldError::new(field, "must not be negative"));
    } else if value > Decimal::from(MAX_AMOUNT) {
        errors.push(FieldError::new(field, "must be at most 999999999999999999"));
    } else {
        check_scale(errors, field, value);
    }
}

/// `total_amount` of a transaction request: the explicit total unless it is
/// zero, otherwise `otr + admin_fee + interest_amount`. `None` on overflow.
pub fn transaction_total(req: &TransactionRequest) -> Option<Decimal> {
    match req.total_amount {
        Some(total) if !total.is_zero() => Some(total),
        _ => req
            .otr
            .checked_add(req.admin_fee)?
            .checked_add(req.interest_amount),
    }
}

/// Validate a consumer create/update payload
pub fn validate_consumer(req: &ConsumerRequest) -> Validation {
    let mut errors = Vec::new();

    if !NIK_PATTERN.is_match(&req.nik) {
        errors.push(FieldError::new("nik", "must be exactly 16 digits"));
    }
    check_text(&mut errors, "full_name", &req.full_name);
    check_text(&mut errors, "legal_name", &req.legal_name);
    check_text(&mut errors, "place_of_birth", &req.place_of_birth);

    if req.date_of_birth > Utc::now().date_naive() {
        errors.push(FieldError::new("date_of_birth", "must not be in the future"));
    }
    if req.salary < Decimal::ZERO || req.salary > Decimal::from(MAX_SALARY) {
        errors.push(FieldError::new("salary", "must be between 0 and 99999999999"));
    } else {
        check_scale(&mut errors, "salary", req.salary);
    }

    check_url(&mut errors, "ktp_img_url", &req.ktp_img_url);
    check_url(&mut errors, "selfie_img_url", &req.selfie_img_url);

    finish(errors)
}

/// Validate a credit limit create/update payload
pub fn validate_credit_limit(req: &CreditLimitRequest) -> Validation {
    let mut errors = Vec::new();
    check_amount(&mut errors, "month_1", req.limits.month_1);
    check_amount(&mut errors, "month_2", req.limits.month_2);
    check_amount(&mut errors, "month_3", req.limits.month_3);
    check_amount(&mut errors, "month_6", req.limits.month_6);
    finish(errors)
}

/// Validate the amounts and free text of a transaction payload.
///
/// The loan term is not checked here; admission rejects it separately as
/// `InvalidTenor` before anything else runs.
pub fn validate_transaction(req: &TransactionRequest) -> Validation {
    let mut errors = Vec::new();

    check_amount(&mut errors, "otr", req.otr);
    check_amount(&mut errors, "admin_fee", req.admin_fee);
    check_amount(&mut errors, "interest_amount", req.interest_amount);
    match req.total_amount {
        Some(total) if !total.is_zero() => check_amount(&mut errors, "total_amount", total),
        _ => match transaction_total(req) {
            Some(total) if total <= Decimal::from(MAX_AMOUNT) => {}
            _ => errors.push(FieldError::new(
                "total_amount",
                "otr + admin_fee + interest_amount must be at most 999999999999999999",
            )),
        },
    }
    if let Some(installment) = req.installment_amount {
        check_amount(&mut errors, "installment_amount", installment);
    }

    if req.contract_number.chars().count() > MAX_TEXT_LEN {
        errors.push(FieldError::new("contract_number", "must be at most 250 characters"));
    }
    if req.asset_name.chars().count() > MAX_TEXT_LEN {
        errors.push(FieldError::new("asset_name", "must be at most 250 characters"));
    }

    finish(errors)
}

/// Validate a bulk status change
pub fn validate_status_change(req: &StatusChange) -> Validation {
    if req.ids.is_empty() {
        return Err(vec![FieldError::new("ids", "must contain at least one id")]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TenorLimits;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn consumer_request() -> ConsumerRequest {
        ConsumerRequest {
            nik: "3174091203900001".to_string(),
            full_name: "Budi Santoso".to_string(),
            legal_name: "Budi Santoso".to_string(),
            place_of_birth: "Jakarta".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 3, 12).unwrap(),
            salary: dec!(12500000),
            ktp_img_url: "https://cdn.example.com/ktp/1.jpg".to_string(),
            selfie_img_url: "https://cdn.example.com/selfie/1.jpg".to_string(),
        }
    }

    fn fields(result: Validation) -> Vec<String> {
        result.unwrap_err().into_iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_valid_consumer() {
        assert!(validate_consumer(&consumer_request()).is_ok());
    }

    #[test]
    fn test_salary_bounds_inclusive() {
        let mut req = consumer_request();
        req.salary = dec!(99999999999);
        assert!(validate_consumer(&req).is_ok());
        req.salary = dec!(0);
        assert!(validate_consumer(&req).is_ok());
        req.salary = dec!(-1);
        assert_eq!(fields(validate_consumer(&req)), vec!["salary"]);
    }

    #[test]
    fn test_consumer_collects_every_field() {
        let mut req = consumer_request();
        req.nik = "12345".to_string();
        req.full_name = "Budi <script>".to_string();
        req.salary = dec!(100000000000);
        req.selfie_img_url = "not a url".to_string();

        assert_eq!(
            fields(validate_consumer(&req)),
            vec!["nik", "full_name", "salary", "selfie_img_url"]
        );
    }

    #[test]
    fn test_consumer_rejects_future_birth_date() {
        let mut req = consumer_request();
        req.date_of_birth = Utc::now().date_naive() + chrono::Duration::days(2);
        assert_eq!(fields(validate_consumer(&req)), vec!["date_of_birth"]);
    }

    #[test]
    fn test_negative_ceiling_rejected() {
        let req = CreditLimitRequest {
            consumer_id: Uuid::new_v4(),
            limits: TenorLimits {
                month_1: dec!(100),
                month_2: dec!(-1),
                month_3: dec!(0),
                month_6: dec!(600),
            },
        };
        assert_eq!(fields(validate_credit_limit(&req)), vec!["month_2"]);
    }

    #[test]
    fn test_transaction_amounts() {
        let req = TransactionRequest {
            consumer_id: Uuid::new_v4(),
            contract_number: "KP-0001".to_string(),
            otr: dec!(-5),
            admin_fee: dec!(0),
            interest_amount: dec!(0),
            installment_amount: Some(dec!(-1)),
            total_amount: None,
            loan_term: 99,
            asset_name: "Honda Beat".to_string(),
        };
        // loan term is left to admission
        assert_eq!(
            fields(validate_transaction(&req)),
            vec!["otr", "installment_amount"]
        );
    }

    #[test]
    fn test_oversized_amounts_rejected() {
        let req = TransactionRequest {
            consumer_id: Uuid::new_v4(),
            contract_number: "KP-0002".to_string(),
            otr: Decimal::MAX,
            admin_fee: dec!(1),
            interest_amount: dec!(0),
            installment_amount: None,
            total_amount: None,
            loan_term: 1,
            asset_name: "Honda Beat".to_string(),
        };
        assert_eq!(transaction_total(&req), None);
        assert_eq!(fields(validate_transaction(&req)), vec!["otr", "total_amount"]);

        // each part fits, the derived total does not
        let mut req = req;
        req.otr = Decimal::from(MAX_AMOUNT);
        req.admin_fee = dec!(1);
        assert_eq!(fields(validate_transaction(&req)), vec!["total_amount"]);

        req.otr = Decimal::from(MAX_AMOUNT) - dec!(1);
        assert!(validate_transaction(&req).is_ok());

        let limit = CreditLimitRequest {
            consumer_id: Uuid::new_v4(),
            limits: TenorLimits {
                month_1: Decimal::from(MAX_AMOUNT),
                month_2: Decimal::MAX,
                month_3: dec!(0),
                month_6: dec!(0),
            },
        };
        assert_eq!(fields(validate_credit_limit(&limit)), vec!["month_2"]);
    }

    #[test]
    fn test_amounts_limited_to_two_decimal_places() {
        let mut req = TransactionRequest {
            consumer_id: Uuid::new_v4(),
            contract_number: "KP-0003".to_string(),
            otr: dec!(1000.125),
            admin_fee: dec!(10.50),
            interest_amount: dec!(0),
            installment_amount: Some(dec!(333.3333)),
            total_amount: None,
            loan_term: 3,
            asset_name: "Honda Beat".to_string(),
        };
        assert_eq!(fields(validate_transaction(&req)), vec!["otr", "installment_amount"]);

        req.otr = dec!(1000.100);
        req.installment_amount = Some(dec!(333.33));
        assert!(validate_transaction(&req).is_ok());

        let mut consumer = consumer_request();
        consumer.salary = dec!(12500000.001);
        assert_eq!(fields(validate_consumer(&consumer)), vec!["salary"]);

        let limit = CreditLimitRequest {
            consumer_id: Uuid::new_v4(),
            limits: TenorLimits::uniform(dec!(500000.005)),
        };
        assert_eq!(
            fields(validate_credit_limit(&limit)),
            vec!["month_1", "month_2", "month_3", "month_6"]
        );
    }

    #[test]
    fn test_empty_status_change() {
        let req = StatusChange {
            ids: vec![],
            status: crate::types::RecordStatus::Inactive,
        };
        assert!(validate_status_change(&req).is_err());
    }
}

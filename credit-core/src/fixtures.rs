//! Shared test fixtures

use crate::store::{CreditStore, UnitOfWork};
use crate::types::{Consumer, CreditLimit, RecordStatus, Tenor, TenorLimits, Transaction};
use crate::MemoryStore;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

pub(crate) fn consumer() -> Consumer {
    let now = Utc::now();
    Consumer {
        id: Uuid::new_v4(),
        nik: "3174091203900001".to_string(),
        full_name: "Siti Rahma".to_string(),
        legal_name: "Siti Rahma".to_string(),
        place_of_birth: "Bandung".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1992, 7, 1).unwrap(),
        salary: dec!(9000000),
        ktp_img_url: "https://cdn.example.com/ktp.jpg".to_string(),
        selfie_img_url: "https://cdn.example.com/selfie.jpg".to_string(),
        status: RecordStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn transaction(
    consumer_id: Uuid,
    tenor: Tenor,
    total: Decimal,
    status: RecordStatus,
) -> Transaction {
    let now = Utc::now();
    Transaction {
        id: Uuid::new_v4(),
        consumer_id,
        contract_number: "KP-T".to_string(),
        otr: total,
        admin_fee: Decimal::ZERO,
        interest_amount: Decimal::ZERO,
        installment_amount: total,
        total_amount: total,
        loan_term: tenor,
        asset_name: "Yamaha NMAX".to_string(),
        status,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) async fn seed(
    store: &MemoryStore,
    limits: Option<TenorLimits>,
    txns: Vec<Transaction>,
) -> Uuid {
    let c = consumer();
    let mut uow = store.begin().await.unwrap();
    uow.insert_consumer(&c).await.unwrap();
    if let Some(limits) = limits {
        let now = Utc::now();
        uow.insert_credit_limit(&CreditLimit {
            id: Uuid::new_v4(),
            consumer_id: c.id,
            limits,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
    }
    for mut t in txns {
        t.consumer_id = c.id;
        uow.insert_transaction(&t).await.unwrap();
    }
    uow.commit().await.unwrap();
    c.id
}

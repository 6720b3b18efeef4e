//! Behaviour every [`FeeStore`] adapter must share. Each adapter's test module
//! runs [`run_all`] against a fresh, empty instance.
#![allow(clippy::unwrap_used, clippy::float_cmp)]

use super::{FeeFilter, FeeStore, NewFeeRecord, NewStudent, StudentChanges};
use crate::{
    entities::FeeStatus,
    errors::{Error, Result},
};

fn new_student(admission_number: &str, first_name: &str) -> NewStudent {
    NewStudent {
        admission_number: admission_number.to_string(),
        first_name: first_name.to_string(),
        last_name: "Tester".to_string(),
        country_code: "+91".to_string(),
        phone_number: "9876543210".to_string(),
        parent_name: None,
        email: None,
    }
}

fn charge(student_id: i64, amount: f64, status: FeeStatus, month: u32) -> NewFeeRecord {
    NewFeeRecord {
        student_id,
        amount,
        status,
        month,
        year: 2023,
    }
}

pub(crate) async fn run_all(store: &dyn FeeStore) -> Result<()> {
    students_round_trip(store).await?;
    duplicate_admission_number_rejected(store).await?;
    student_updates(store).await?;
    fee_record_filters(store).await?;
    fee_record_status_updates(store).await?;
    missing_rows(store).await?;
    Ok(())
}

async fn students_round_trip(store: &dyn FeeStore) -> Result<()> {
    // Inserted out of order to check the listing order
    let second = store.insert_student(new_student("C-002", "Priya")).await?;
    let first = store.insert_student(new_student("C-001", "Rahul")).await?;

    assert!(first.is_active);
    assert_ne!(first.id, second.id);

    let listed = store.list_students().await?;
    let numbers: Vec<&str> = listed
        .iter()
        .filter(|s| s.admission_number.starts_with("C-"))
        .map(|s| s.admission_number.as_str())
        .collect();
    assert_eq!(numbers, vec!["C-001", "C-002"]);

    let by_id = store.find_student(first.id).await?.unwrap();
    assert_eq!(by_id.admission_number, "C-001");
    assert_eq!(by_id.full_name(), "Rahul Tester");

    let by_number = store
        .find_student_by_admission_number("C-002")
        .await?
        .unwrap();
    assert_eq!(by_number.id, second.id);
    Ok(())
}

async fn duplicate_admission_number_rejected(store: &dyn FeeStore) -> Result<()> {
    store.insert_student(new_student("D-001", "Aryan")).await?;
    let result = store.insert_student(new_student("D-001", "Sneha")).await;
    assert!(matches!(
        result,
        Err(Error::DuplicateAdmissionNumber { ref admission_number }) if admission_number == "D-001"
    ));
    Ok(())
}

async fn student_updates(store: &dyn FeeStore) -> Result<()> {
    let student = store.insert_student(new_student("U-001", "Meera")).await?;

    let updated = store
        .update_student(
            student.id,
            StudentChanges {
                last_name: Some("Kapoor".to_string()),
                email: Some("meera@example.com".to_string()),
                ..StudentChanges::default()
            },
        )
        .await?;
    assert_eq!(updated.first_name, "Meera");
    assert_eq!(updated.last_name, "Kapoor");
    assert_eq!(updated.email.as_deref(), Some("meera@example.com"));

    let inactive = store.set_student_active(student.id, false).await?;
    assert!(!inactive.is_active);

    // Soft removal keeps the row visible to lookups
    let reloaded = store.find_student(student.id).await?.unwrap();
    assert!(!reloaded.is_active);
    assert_eq!(reloaded.last_name, "Kapoor");
    Ok(())
}

async fn fee_record_filters(store: &dyn FeeStore) -> Result<()> {
    let a = store.insert_student(new_student("F-001", "Kabir")).await?;
    let b = store.insert_student(new_student("F-002", "Isha")).await?;

    let a_may = store
        .insert_fee_record(charge(a.id, 1500.0, FeeStatus::Pending, 5))
        .await?;
    let a_may_costume = store
        .insert_fee_record(charge(a.id, 2000.0, FeeStatus::Pending, 5))
        .await?;
    store
        .insert_fee_record(charge(a.id, 1500.0, FeeStatus::Pending, 6))
        .await?;
    store
        .insert_fee_record(charge(b.id, 1800.0, FeeStatus::Settled, 5))
        .await?;

    assert_eq!(a_may.status, FeeStatus::Pending);
    assert_eq!(a_may.amount, 1500.0);
    assert!(a_may_costume.id > a_may.id);

    let a_records = store
        .list_fee_records(&FeeFilter::default().for_student(a.id))
        .await?;
    assert_eq!(a_records.len(), 3);
    assert!(a_records.windows(2).all(|w| w[0].id < w[1].id));

    let pending_may = store
        .list_fee_records(&FeeFilter {
            status: Some(FeeStatus::Pending),
            month: Some(5),
            year: Some(2023),
            student_id: None,
        })
        .await?;
    let ids: Vec<i64> = pending_may
        .iter()
        .filter(|r| r.student_id == a.id || r.student_id == b.id)
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![a_may.id, a_may_costume.id]);

    let settled_for_b = store
        .list_fee_records(&FeeFilter {
            status: Some(FeeStatus::Settled),
            student_id: Some(b.id),
            ..FeeFilter::default()
        })
        .await?;
    assert_eq!(settled_for_b.len(), 1);
    assert_eq!(settled_for_b[0].amount, 1800.0);
    Ok(())
}

async fn fee_record_status_updates(store: &dyn FeeStore) -> Result<()> {
    let student = store.insert_student(new_student("S-001", "Anaya")).await?;
    let record = store
        .insert_fee_record(charge(student.id, 900.0, FeeStatus::Pending, 7))
        .await?;

    let settled = store
        .update_fee_record_status(record.id, FeeStatus::Settled)
        .await?;
    assert_eq!(settled.id, record.id);
    assert_eq!(settled.status, FeeStatus::Settled);

    let reloaded = store.find_fee_record(record.id).await?.unwrap();
    assert_eq!(reloaded.status, FeeStatus::Settled);
    assert_eq!(reloaded.amount, 900.0);
    Ok(())
}

async fn missing_rows(store: &dyn FeeStore) -> Result<()> {
    assert!(store.find_student(9_999).await?.is_none());
    assert!(
        store
            .find_student_by_admission_number("NOPE")
            .await?
            .is_none()
    );
    assert!(store.find_fee_record(9_999).await?.is_none());

    assert!(matches!(
        store.update_fee_record_status(9_999, FeeStatus::Settled).await,
        Err(Error::FeeRecordNotFound { id: 9_999 })
    ));
    assert!(matches!(
        store.set_student_active(9_999, false).await,
        Err(Error::StudentNotFound { .. })
    ));
    assert!(matches!(
        store
            .update_student(9_999, StudentChanges::default())
            .await,
        Err(Error::StudentNotFound { .. })
    ));
    assert!(matches!(
        store
            .insert_fee_record(charge(9_999, 100.0, FeeStatus::Pending, 1))
            .await,
        Err(Error::StudentNotFound { .. })
    ));
    Ok(())
}

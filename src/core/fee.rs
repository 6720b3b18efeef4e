//! Fee business logic - charging students, settling charges and browsing the ledger.
//!
//! New charges always start out pending. Settling and un-settling is a status
//! toggle; fee records are never deleted.

use crate::{
    core::{ledger::BillingPeriod, student::get_student},
    entities::{FeeStatus, fee_record, student},
    errors::{Error, Result},
    store::{FeeFilter, FeeStore, NewFeeRecord},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Smallest chargeable amount; anything less would read as zero in a reminder.
pub const MIN_AMOUNT: f64 = 0.01;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English name of a month (1-12).
#[must_use]
pub fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_NAMES.get(index).copied()
}

/// Short display reference for a fee record, e.g. `TR000042`.
#[must_use]
pub fn fee_reference(id: i64) -> String {
    format!("TR{id:06}")
}

/// Listing criteria; every `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeQuery {
    /// Case-insensitive text matched against admission number, student name and month name
    pub search: Option<String>,
    /// Only this status
    pub status: Option<FeeStatus>,
    /// Only this billing month
    pub month: Option<u32>,
    /// Only this billing year
    pub year: Option<i32>,
}

/// A fee record joined with its student, as shown in listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeView {
    /// Fee record id
    pub id: i64,
    /// Display reference
    pub reference: String,
    /// Owner's admission number
    pub admission_number: String,
    /// Owner's full name
    pub student_name: String,
    /// Charge amount
    pub amount: f64,
    /// Payment state
    pub status: FeeStatus,
    /// When the charge was added
    pub created_at: DateTime<Utc>,
    /// Billing month
    pub month: u32,
    /// Billing year
    pub year: i32,
}

impl FeeView {
    fn new(record: &fee_record::Model, student: &student::Model) -> Self {
        Self {
            id: record.id,
            reference: fee_reference(record.id),
            admission_number: student.admission_number.clone(),
            student_name: student.full_name(),
            amount: record.amount,
            status: record.status,
            created_at: record.created_at,
            month: record.month,
            year: record.year,
        }
    }

    fn matches_search(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.admission_number.to_lowercase().contains(needle)
            || self.student_name.to_lowercase().contains(needle)
            || month_name(self.month).is_some_and(|name| name.to_lowercase().contains(needle))
    }
}

/// Charges a student for a billing period. The record starts out pending.
///
/// # Errors
/// `InvalidAmount` unless the amount is finite and at least [`MIN_AMOUNT`],
/// `StudentNotFound` if the admission number is unknown.
#[instrument(skip(store))]
pub async fn add_fee(
    store: &dyn FeeStore,
    admission_number: &str,
    amount: f64,
    period: BillingPeriod,
) -> Result<fee_record::Model> {
    if !amount.is_finite() || amount < MIN_AMOUNT {
        return Err(Error::InvalidAmount { amount });
    }

    let student = get_student(store, admission_number).await?;
    let record = store
        .insert_fee_record(NewFeeRecord {
            student_id: student.id,
            amount,
            status: FeeStatus::Pending,
            month: period.month(),
            year: period.year(),
        })
        .await?;
    info!(
        "Charged {} {} for {} ({})",
        student.admission_number,
        amount,
        period,
        fee_reference(record.id)
    );
    Ok(record)
}

/// Flips a fee record between pending and settled.
///
/// # Errors
/// `FeeRecordNotFound` if `id` is unknown.
#[instrument(skip(store))]
pub async fn toggle_fee_status(store: &dyn FeeStore, id: i64) -> Result<fee_record::Model> {
    let record = store
        .find_fee_record(id)
        .await?
        .ok_or(Error::FeeRecordNotFound { id })?;
    set_fee_status(store, id, record.status.toggled()).await
}

/// Sets a fee record's status.
///
/// # Errors
/// `FeeRecordNotFound` if `id` is unknown.
pub async fn set_fee_status(
    store: &dyn FeeStore,
    id: i64,
    status: FeeStatus,
) -> Result<fee_record::Model> {
    let updated = store.update_fee_record_status(id, status).await?;
    info!("{} is now {}", fee_reference(id), updated.status);
    Ok(updated)
}

/// Fee records matching `query`, newest first.
pub async fn list_fees(store: &dyn FeeStore, query: &FeeQuery) -> Result<Vec<FeeView>> {
    let filter = FeeFilter {
        status: query.status,
        month: query.month,
        year: query.year,
        student_id: None,
    };
    let records = store.list_fee_records(&filter).await?;
    let students: HashMap<i64, student::Model> = store
        .list_students()
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_lowercase();

    let mut views = Vec::with_capacity(records.len());
    for record in &records {
        let student = students
            .get(&record.student_id)
            .ok_or_else(|| Error::StudentNotFound {
                key: record.student_id.to_string(),
            })?;
        let view = FeeView::new(record, student);
        if view.matches_search(&needle) {
            views.push(view);
        }
    }
    sort_newest_first(&mut views);
    Ok(views)
}

/// Every fee record of one student, newest first.
///
/// # Errors
/// `StudentNotFound` if the admission number is unknown.
pub async fn fees_for_student(store: &dyn FeeStore, admission_number: &str) -> Result<Vec<FeeView>> {
    let student = get_student(store, admission_number).await?;
    let records = store
        .list_fee_records(&FeeFilter::default().for_student(student.id))
        .await?;
    let mut views: Vec<FeeView> = records
        .iter()
        .map(|record| FeeView::new(record, &student))
        .collect();
    sort_newest_first(&mut views);
    Ok(views)
}

fn sort_newest_first(views: &mut [FeeView]) {
    views.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

//! Ledger queries - outstanding balances per student for a billing period.
//!
//! The amount due for a period is the sum of every pending fee record in that
//! period, so a class fee and a costume fee billed for the same month are owed
//! together. Students with nothing pending are left out rather than listed at zero.

use crate::{
    entities::student,
    errors::{Error, Result},
    store::{FeeFilter, FeeStore},
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, instrument};

/// A billing cycle: calendar month and four-digit year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    /// Validates and builds a period.
    ///
    /// # Errors
    /// `InvalidPeriod` if `month` is outside 1-12 or `year` is not four digits.
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(1000..=9999).contains(&year) {
            return Err(Error::InvalidPeriod { month, year });
        }
        Ok(Self { year, month })
    }

    /// The period containing today's date (UTC). Reads the clock on every call.
    #[must_use]
    pub fn current() -> Self {
        Self::containing(Utc::now().date_naive())
    }

    /// The period containing `date`.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Builds a period from optional parts, filling gaps from the current date.
    pub fn resolve(month: Option<u32>, year: Option<i32>) -> Result<Self> {
        let now = Self::current();
        Self::new(month.unwrap_or(now.month), year.unwrap_or(now.year))
    }

    /// Month, 1-12.
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// Four-digit year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

/// Contact number as stored on the student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileNumber {
    /// Dialling prefix
    pub country_code: String,
    /// National number
    pub number: String,
}

/// One student's outstanding balance for a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidBalance {
    /// Student id
    pub id: i64,
    /// Admission number
    pub admission_number: String,
    /// Given and family name
    pub student_name: String,
    /// Where reminders go
    pub mobile_number: MobileNumber,
    /// Sum of pending charges in the period
    pub amount_due: f64,
}

impl UnpaidBalance {
    fn new(student: &student::Model, amount_due: f64) -> Self {
        Self {
            id: student.id,
            admission_number: student.admission_number.clone(),
            student_name: student.full_name(),
            mobile_number: MobileNumber {
                country_code: student.country_code.clone(),
                number: student.phone_number.clone(),
            },
            amount_due,
        }
    }
}

/// Students with a positive pending balance in `period`, ordered by admission number.
///
/// Any store failure aborts the whole call.
///
/// # Errors
/// `Persistence` if the store fails, `StudentNotFound` if a pending record
/// points at a student the store does not know.
#[instrument(skip(store))]
pub async fn unpaid_balances(
    store: &dyn FeeStore,
    period: BillingPeriod,
) -> Result<Vec<UnpaidBalance>> {
    let filter = FeeFilter::pending_in(period);
    let records = store.list_fee_records(&filter).await?;
    if records.is_empty() {
        debug!("No pending fee records for {}", period);
        return Ok(Vec::new());
    }

    let mut seen = HashSet::new();
    let mut totals: BTreeMap<i64, f64> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|r| filter.matches(r) && seen.insert(r.id))
    {
        *totals.entry(record.student_id).or_insert(0.0) += record.amount;
    }

    let students: HashMap<i64, student::Model> = store
        .list_students()
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let mut balances = totals
        .into_iter()
        .filter(|&(_, amount_due)| amount_due > 0.0)
        .map(|(student_id, amount_due)| {
            students
                .get(&student_id)
                .map(|student| UnpaidBalance::new(student, amount_due))
                .ok_or_else(|| Error::StudentNotFound {
                    key: student_id.to_string(),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    balances.sort_by(|a, b| a.admission_number.cmp(&b.admission_number));

    debug!("{} students owe fees for {}", balances.len(), period);
    Ok(balances)
}

/// Sum of one student's pending charges in `period`; `0.0` when nothing is pending.
///
/// # Errors
/// `Persistence` if the store fails.
pub async fn amount_due(
    store: &dyn FeeStore,
    student_id: i64,
    period: BillingPeriod,
) -> Result<f64> {
    let filter = FeeFilter::pending_in(period).for_student(student_id);
    let records = store.list_fee_records(&filter).await?;
    Ok(records
        .iter()
        .filter(|r| filter.matches(r))
        .map(|r| r.amount)
        .sum())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{
        entities::FeeStatus,
        store::{MemoryStore, SeaOrmStore},
        test_utils::*,
    };
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};

    #[test]
    fn test_billing_period_validation() {
        assert!(BillingPeriod::new(1, 2023).is_ok());
        assert!(BillingPeriod::new(12, 2023).is_ok());
        assert!(matches!(
            BillingPeriod::new(0, 2023),
            Err(Error::InvalidPeriod { month: 0, year: 2023 })
        ));
        assert!(BillingPeriod::new(13, 2023).is_err());
        assert!(BillingPeriod::new(5, 23).is_err());
        assert!(BillingPeriod::new(5, 20_230).is_err());
    }

    #[test]
    fn test_billing_period_containing_and_display() {
        let date = NaiveDate::from_ymd_opt(2023, 5, 31).unwrap();
        let period = BillingPeriod::containing(date);
        assert_eq!(period.month(), 5);
        assert_eq!(period.year(), 2023);
        assert_eq!(period.to_string(), "05/2023");
    }

    #[test]
    fn test_resolve_fills_missing_parts_from_today() -> Result<()> {
        let now = BillingPeriod::current();
        assert_eq!(BillingPeriod::resolve(None, None)?, now);
        assert_eq!(BillingPeriod::resolve(Some(3), None)?.year(), now.year());
        assert_eq!(BillingPeriod::resolve(None, Some(2020))?.month(), now.month());
        assert!(BillingPeriod::resolve(Some(14), None).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_rahul_and_priya_scenario() -> Result<()> {
        init_test_tracing();
        let store = setup_sea_store().await?;
        let period = BillingPeriod::new(5, 2023)?;

        let rahul = create_custom_student(&store, "BB2023001", "Rahul", "Sharma").await?;
        let priya = create_custom_student(&store, "BB2023002", "Priya", "Patel").await?;
        create_test_fee(&store, rahul.id, 1500.0, FeeStatus::Pending, period).await?;
        create_test_fee(&store, rahul.id, 2000.0, FeeStatus::Pending, period).await?;
        create_test_fee(&store, priya.id, 1800.0, FeeStatus::Settled, period).await?;

        let balances = unpaid_balances(&store, period).await?;
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].admission_number, "BB2023001");
        assert_eq!(balances[0].student_name, "Rahul Sharma");
        assert_eq!(balances[0].amount_due, 3500.0);
        assert_eq!(balances[0].mobile_number.country_code, "+91");
        Ok(())
    }

    #[tokio::test]
    async fn test_only_target_period_is_counted() -> Result<()> {
        let store = MemoryStore::new();
        let may = BillingPeriod::new(5, 2023)?;
        let june = BillingPeriod::new(6, 2023)?;
        let may_last_year = BillingPeriod::new(5, 2022)?;

        let student = create_test_student(&store, "BB2023001").await?;
        create_test_fee(&store, student.id, 1500.0, FeeStatus::Pending, may).await?;
        create_test_fee(&store, student.id, 700.0, FeeStatus::Pending, june).await?;
        create_test_fee(&store, student.id, 300.0, FeeStatus::Pending, may_last_year).await?;

        let balances = unpaid_balances(&store, may).await?;
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].amount_due, 1500.0);

        assert_eq!(amount_due(&store, student.id, june).await?, 700.0);
        assert_eq!(amount_due(&store, student.id, may_last_year).await?, 300.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_results_are_ordered_by_admission_number() -> Result<()> {
        let store = MemoryStore::new();
        let period = BillingPeriod::new(8, 2024)?;

        for number in ["BB2024003", "BB2024001", "BB2024002"] {
            let student = create_test_student(&store, number).await?;
            create_test_fee(&store, student.id, 1000.0, FeeStatus::Pending, period).await?;
        }

        let numbers: Vec<String> = unpaid_balances(&store, period)
            .await?
            .into_iter()
            .map(|b| b.admission_number)
            .collect();
        assert_eq!(numbers, vec!["BB2024001", "BB2024002", "BB2024003"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_settled_records_are_ignored() -> Result<()> {
        let store = MemoryStore::new();
        let period = BillingPeriod::new(2, 2025)?;

        let student = create_test_student(&store, "BB2025001").await?;
        create_test_fee(&store, student.id, 1200.0, FeeStatus::Pending, period).await?;
        create_test_fee(&store, student.id, 800.0, FeeStatus::Settled, period).await?;

        let balances = unpaid_balances(&store, period).await?;
        assert_eq!(balances[0].amount_due, 1200.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_period_returns_empty_list() -> Result<()> {
        let store = MemoryStore::new();
        create_test_student(&store, "BB2025001").await?;

        let balances = unpaid_balances(&store, BillingPeriod::new(1, 2025)?).await?;
        assert!(balances.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_inactive_students_still_owe() -> Result<()> {
        let store = MemoryStore::new();
        let period = BillingPeriod::new(3, 2024)?;

        let student = create_test_student(&store, "BB2023003").await?;
        create_test_fee(&store, student.id, 1500.0, FeeStatus::Pending, period).await?;
        store.set_student_active(student.id, false).await?;

        let balances = unpaid_balances(&store, period).await?;
        assert_eq!(balances.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_store_failure_aborts_without_partial_result() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_errors([DbErr::Custom("database is locked".to_string())])
            .into_connection();
        let store = SeaOrmStore::new(db);

        let result = unpaid_balances(&store, BillingPeriod::new(5, 2023).unwrap()).await;
        assert!(matches!(result, Err(Error::Persistence { .. })));
    }

    #[tokio::test]
    async fn test_serializes_with_camel_case_fields() -> Result<()> {
        let store = MemoryStore::new();
        let period = BillingPeriod::new(5, 2023)?;
        let student = create_custom_student(&store, "BB2023001", "Rahul", "Sharma").await?;
        create_test_fee(&store, student.id, 1500.0, FeeStatus::Pending, period).await?;

        let balances = unpaid_balances(&store, period).await?;
        let json = serde_json::to_value(&balances[0]).unwrap();
        assert_eq!(json["admissionNumber"], "BB2023001");
        assert_eq!(json["studentName"], "Rahul Sharma");
        assert_eq!(json["mobileNumber"]["countryCode"], "+91");
        assert_eq!(json["amountDue"], 1500.0);
        Ok(())
    }
}

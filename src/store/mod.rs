//! Persistence provider - the narrow interface the fee core reads and writes through.
//!
//! Two adapters implement [`FeeStore`]: [`SeaOrmStore`] over a SQL database and
//! [`MemoryStore`] holding plain vectors. Both are held to the same contract
//! suite, so callers can swap one for the other without noticing.
//!
//! No transactional guarantee spans two calls; each call is consistent on its own.

use crate::{
    core::ledger::BillingPeriod,
    entities::{FeeStatus, fee_record, student},
    errors::Result,
};
use async_trait::async_trait;
use serde::Deserialize;

pub mod memory;
pub mod sea;

#[cfg(test)]
pub(crate) mod contract;

pub use memory::MemoryStore;
pub use sea::SeaOrmStore;

/// Fields required to enrol a student.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewStudent {
    /// Unique external identifier
    pub admission_number: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Dialling prefix
    #[serde(default = "default_country_code")]
    pub country_code: String,
    /// National number
    pub phone_number: String,
    /// Parent or guardian
    #[serde(default)]
    pub parent_name: Option<String>,
    /// Contact email
    #[serde(default)]
    pub email: Option<String>,
}

fn default_country_code() -> String {
    "+91".to_string()
}

/// Partial update for a student; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentChanges {
    /// New given name
    pub first_name: Option<String>,
    /// New family name
    pub last_name: Option<String>,
    /// New dialling prefix
    pub country_code: Option<String>,
    /// New national number
    pub phone_number: Option<String>,
    /// New parent or guardian
    pub parent_name: Option<String>,
    /// New contact email
    pub email: Option<String>,
}

/// Fields required to record a charge.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeeRecord {
    /// Owning student id
    pub student_id: i64,
    /// Charge amount
    pub amount: f64,
    /// Initial status, normally [`FeeStatus::Pending`]
    pub status: FeeStatus,
    /// Billing month
    pub month: u32,
    /// Billing year
    pub year: i32,
}

/// Conjunctive filter over fee records; every `None` matches anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeFilter {
    /// Only records in this state
    pub status: Option<FeeStatus>,
    /// Only records for this billing month
    pub month: Option<u32>,
    /// Only records for this billing year
    pub year: Option<i32>,
    /// Only records owned by this student
    pub student_id: Option<i64>,
}

impl FeeFilter {
    /// Pending records in the given billing period.
    #[must_use]
    pub const fn pending_in(period: BillingPeriod) -> Self {
        Self {
            status: Some(FeeStatus::Pending),
            month: Some(period.month()),
            year: Some(period.year()),
            student_id: None,
        }
    }

    /// Restricts the filter to one student.
    #[must_use]
    pub const fn for_student(mut self, student_id: i64) -> Self {
        self.student_id = Some(student_id);
        self
    }

    /// Whether a record satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, record: &fee_record::Model) -> bool {
        self.status.is_none_or(|s| record.status == s)
            && self.month.is_none_or(|m| record.month == m)
            && self.year.is_none_or(|y| record.year == y)
            && self.student_id.is_none_or(|id| record.student_id == id)
    }
}

/// Operations the fee core needs from durable storage.
///
/// Listings are ordered: students by admission number, fee records by id.
#[async_trait]
pub trait FeeStore: Send + Sync {
    /// All students, active or not.
    async fn list_students(&self) -> Result<Vec<student::Model>>;

    /// Looks up a student by provider key.
    async fn find_student(&self, id: i64) -> Result<Option<student::Model>>;

    /// Looks up a student by admission number.
    async fn find_student_by_admission_number(
        &self,
        admission_number: &str,
    ) -> Result<Option<student::Model>>;

    /// Inserts an active student. Fails with `DuplicateAdmissionNumber` on conflict.
    async fn insert_student(&self, new: NewStudent) -> Result<student::Model>;

    /// Applies a partial update. Fails with `StudentNotFound` if `id` is unknown.
    async fn update_student(&self, id: i64, changes: StudentChanges) -> Result<student::Model>;

    /// Sets the active flag. Fails with `StudentNotFound` if `id` is unknown.
    async fn set_student_active(&self, id: i64, active: bool) -> Result<student::Model>;

    /// Fee records matching `filter`.
    async fn list_fee_records(&self, filter: &FeeFilter) -> Result<Vec<fee_record::Model>>;

    /// Looks up a fee record by id.
    async fn find_fee_record(&self, id: i64) -> Result<Option<fee_record::Model>>;

    /// Records a charge. Fails with `StudentNotFound` if the owner is unknown.
    async fn insert_fee_record(&self, new: NewFeeRecord) -> Result<fee_record::Model>;

    /// Changes a record's status. Fails with `FeeRecordNotFound` if `id` is unknown.
    async fn update_fee_record_status(
        &self,
        id: i64,
        status: FeeStatus,
    ) -> Result<fee_record::Model>;
}

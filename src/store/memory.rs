//! In-memory [`FeeStore`], used in tests and for dry runs without a database.

use super::{FeeFilter, FeeStore, NewFeeRecord, NewStudent, StudentChanges};
use crate::{
    entities::{FeeStatus, fee_record, student},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    students: Vec<student::Model>,
    fee_records: Vec<fee_record::Model>,
    next_student_id: i64,
    next_fee_record_id: i64,
}

/// [`FeeStore`] keeping every row in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| Error::Persistence {
            message: "Failed to acquire in-memory store lock".to_string(),
        })
    }
}

fn student_mut(tables: &mut Tables, id: i64) -> Result<&mut student::Model> {
    tables
        .students
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or_else(|| Error::StudentNotFound {
            key: id.to_string(),
        })
}

#[async_trait]
impl FeeStore for MemoryStore {
    async fn list_students(&self) -> Result<Vec<student::Model>> {
        let mut students = self.lock()?.students.clone();
        students.sort_by(|a, b| a.admission_number.cmp(&b.admission_number));
        Ok(students)
    }

    async fn find_student(&self, id: i64) -> Result<Option<student::Model>> {
        Ok(self.lock()?.students.iter().find(|s| s.id == id).cloned())
    }

    async fn find_student_by_admission_number(
        &self,
        admission_number: &str,
    ) -> Result<Option<student::Model>> {
        Ok(self
            .lock()?
            .students
            .iter()
            .find(|s| s.admission_number == admission_number)
            .cloned())
    }

    async fn insert_student(&self, new: NewStudent) -> Result<student::Model> {
        let mut tables = self.lock()?;
        if tables
            .students
            .iter()
            .any(|s| s.admission_number == new.admission_number)
        {
            return Err(Error::DuplicateAdmissionNumber {
                admission_number: new.admission_number,
            });
        }

        tables.next_student_id += 1;
        let model = student::Model {
            id: tables.next_student_id,
            admission_number: new.admission_number,
            first_name: new.first_name,
            last_name: new.last_name,
            country_code: new.country_code,
            phone_number: new.phone_number,
            parent_name: new.parent_name,
            email: new.email,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.students.push(model.clone());
        Ok(model)
    }

    async fn update_student(&self, id: i64, changes: StudentChanges) -> Result<student::Model> {
        let mut tables = self.lock()?;
        let existing = student_mut(&mut tables, id)?;

        if let Some(first_name) = changes.first_name {
            existing.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            existing.last_name = last_name;
        }
        if let Some(country_code) = changes.country_code {
            existing.country_code = country_code;
        }
        if let Some(phone_number) = changes.phone_number {
            existing.phone_number = phone_number;
        }
        if changes.parent_name.is_some() {
            existing.parent_name = changes.parent_name;
        }
        if changes.email.is_some() {
            existing.email = changes.email;
        }

        Ok(existing.clone())
    }

    async fn set_student_active(&self, id: i64, active: bool) -> Result<student::Model> {
        let mut tables = self.lock()?;
        let existing = student_mut(&mut tables, id)?;
        existing.is_active = active;
        Ok(existing.clone())
    }

    async fn list_fee_records(&self, filter: &FeeFilter) -> Result<Vec<fee_record::Model>> {
        // Rows are appended with increasing ids, so insertion order is id order.
        Ok(self
            .lock()?
            .fee_records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn find_fee_record(&self, id: i64) -> Result<Option<fee_record::Model>> {
        Ok(self.lock()?.fee_records.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_fee_record(&self, new: NewFeeRecord) -> Result<fee_record::Model> {
        let mut tables = self.lock()?;
        if !tables.students.iter().any(|s| s.id == new.student_id) {
            return Err(Error::StudentNotFound {
                key: new.student_id.to_string(),
            });
        }

        tables.next_fee_record_id += 1;
        let model = fee_record::Model {
            id: tables.next_fee_record_id,
            student_id: new.student_id,
            amount: new.amount,
            status: new.status,
            month: new.month,
            year: new.year,
            created_at: Utc::now(),
        };
        tables.fee_records.push(model.clone());
        Ok(model)
    }

    async fn update_fee_record_status(
        &self,
        id: i64,
        status: FeeStatus,
    ) -> Result<fee_record::Model> {
        let mut tables = self.lock()?;
        let record = tables
            .fee_records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(Error::FeeRecordNotFound { id })?;
        record.status = status;
        Ok(record.clone())
    }
}

//! SQL-backed [`FeeStore`] built on `SeaORM`.

use super::{FeeFilter, FeeStore, NewFeeRecord, NewStudent, StudentChanges};
use crate::{
    entities::{FeeRecord, FeeStatus, Student, fee_record, student},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, instrument};

/// [`FeeStore`] over a `SeaORM` connection.
#[derive(Debug)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    /// Wraps an open connection whose tables already exist.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn require_student(&self, id: i64) -> Result<student::Model> {
        Student::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::StudentNotFound {
                key: id.to_string(),
            })
    }
}

#[async_trait]
impl FeeStore for SeaOrmStore {
    async fn list_students(&self) -> Result<Vec<student::Model>> {
        Student::find()
            .order_by_asc(student::Column::AdmissionNumber)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn find_student(&self, id: i64) -> Result<Option<student::Model>> {
        Student::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn find_student_by_admission_number(
        &self,
        admission_number: &str,
    ) -> Result<Option<student::Model>> {
        Student::find()
            .filter(student::Column::AdmissionNumber.eq(admission_number))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self, new), fields(admission_number = %new.admission_number))]
    async fn insert_student(&self, new: NewStudent) -> Result<student::Model> {
        if self
            .find_student_by_admission_number(&new.admission_number)
            .await?
            .is_some()
        {
            return Err(Error::DuplicateAdmissionNumber {
                admission_number: new.admission_number,
            });
        }

        let model = student::ActiveModel {
            admission_number: Set(new.admission_number),
            first_name: Set(new.first_name),
            last_name: Set(new.last_name),
            country_code: Set(new.country_code),
            phone_number: Set(new.phone_number),
            parent_name: Set(new.parent_name),
            email: Set(new.email),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await?;
        info!("Inserted student id {}", inserted.id);
        Ok(inserted)
    }

    async fn update_student(&self, id: i64, changes: StudentChanges) -> Result<student::Model> {
        let existing = self.require_student(id).await?;
        let mut active: student::ActiveModel = existing.into();

        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(country_code) = changes.country_code {
            active.country_code = Set(country_code);
        }
        if let Some(phone_number) = changes.phone_number {
            active.phone_number = Set(phone_number);
        }
        if let Some(parent_name) = changes.parent_name {
            active.parent_name = Set(Some(parent_name));
        }
        if let Some(email) = changes.email {
            active.email = Set(Some(email));
        }

        active.update(&self.db).await.map_err(Into::into)
    }

    async fn set_student_active(&self, id: i64, active_flag: bool) -> Result<student::Model> {
        let existing = self.require_student(id).await?;
        let mut active: student::ActiveModel = existing.into();
        active.is_active = Set(active_flag);
        active.update(&self.db).await.map_err(Into::into)
    }

    async fn list_fee_records(&self, filter: &FeeFilter) -> Result<Vec<fee_record::Model>> {
        let mut query = FeeRecord::find();
        if let Some(status) = filter.status {
            query = query.filter(fee_record::Column::Status.eq(status));
        }
        if let Some(month) = filter.month {
            query = query.filter(fee_record::Column::Month.eq(month));
        }
        if let Some(year) = filter.year {
            query = query.filter(fee_record::Column::Year.eq(year));
        }
        if let Some(student_id) = filter.student_id {
            query = query.filter(fee_record::Column::StudentId.eq(student_id));
        }

        let records = query
            .order_by_asc(fee_record::Column::Id)
            .all(&self.db)
            .await?;
        debug!("Fee record query {:?} matched {} rows", filter, records.len());
        Ok(records)
    }

    async fn find_fee_record(&self, id: i64) -> Result<Option<fee_record::Model>> {
        FeeRecord::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn insert_fee_record(&self, new: NewFeeRecord) -> Result<fee_record::Model> {
        self.require_student(new.student_id).await?;

        let model = fee_record::ActiveModel {
            student_id: Set(new.student_id),
            amount: Set(new.amount),
            status: Set(new.status),
            month: Set(new.month),
            year: Set(new.year),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await?;
        info!(
            "Recorded fee id {} for student {}: {} ({:02}/{})",
            inserted.id, inserted.student_id, inserted.amount, inserted.month, inserted.year
        );
        Ok(inserted)
    }

    #[instrument(skip(self))]
    async fn update_fee_record_status(
        &self,
        id: i64,
        status: FeeStatus,
    ) -> Result<fee_record::Model> {
        let existing = FeeRecord::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(Error::FeeRecordNotFound { id })?;

        let mut active: fee_record::ActiveModel = existing.into();
        active.status = Set(status);
        active.update(&self.db).await.map_err(Into::into)
    }
}

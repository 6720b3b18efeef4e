//! Shared test utilities.
//!
//! In-memory database setup, fixture helpers with sensible defaults, and a
//! notification sender that records what it was asked to send.

use crate::{
    core::ledger::BillingPeriod,
    entities::{FeeStatus, fee_record, student},
    errors::{Error, Result},
    notify::{DeliveryReceipt, NotificationSender},
    store::{FeeStore, NewFeeRecord, NewStudent, SeaOrmStore},
};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A [`SeaOrmStore`] over a fresh in-memory database.
pub async fn setup_sea_store() -> Result<SeaOrmStore> {
    Ok(SeaOrmStore::new(setup_test_db().await?))
}

/// Creates a test student with sensible defaults.
///
/// # Defaults
/// * name: "Test Student"
/// * `country_code`: "+91"
/// * `phone_number`: "9876543210"
pub async fn create_test_student(
    store: &dyn FeeStore,
    admission_number: &str,
) -> Result<student::Model> {
    create_custom_student(store, admission_number, "Test", "Student").await
}

/// Creates a test student with a custom name and the default phone number.
pub async fn create_custom_student(
    store: &dyn FeeStore,
    admission_number: &str,
    first_name: &str,
    last_name: &str,
) -> Result<student::Model> {
    store
        .insert_student(NewStudent {
            admission_number: admission_number.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            country_code: "+91".to_string(),
            phone_number: "9876543210".to_string(),
            parent_name: None,
            email: None,
        })
        .await
}

/// Records a fee straight through the store, bypassing amount validation.
pub async fn create_test_fee(
    store: &dyn FeeStore,
    student_id: i64,
    amount: f64,
    status: FeeStatus,
    period: BillingPeriod,
) -> Result<fee_record::Model> {
    store
        .insert_fee_record(NewFeeRecord {
            student_id,
            amount,
            status,
            month: period.month(),
            year: period.year(),
        })
        .await
}

#[derive(Debug, Default)]
struct Recorded {
    attempts: Vec<String>,
    sent: Vec<(String, String)>,
    failing: Option<String>,
}

/// In-memory sender that records every call and can be told to fail for one destination.
#[derive(Debug, Default)]
pub struct RecordingSender {
    recorded: Mutex<Recorded>,
}

impl RecordingSender {
    /// A sender that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender that rejects messages to `destination`.
    pub fn failing_for(destination: &str) -> Self {
        let sender = Self::new();
        sender.recorded().failing = Some(destination.to_string());
        sender
    }

    /// Stops injecting failures.
    pub fn heal(&self) {
        self.recorded().failing = None;
    }

    /// Successful `(destination, message)` pairs in call order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.recorded().sent.clone()
    }

    /// Every destination tried, successful or not.
    pub fn attempts(&self) -> Vec<String> {
        self.recorded().attempts.clone()
    }

    /// Number of `send` calls.
    pub fn call_count(&self) -> usize {
        self.recorded().attempts.len()
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, destination: &str, message: &str) -> Result<DeliveryReceipt> {
        let mut recorded = self.recorded();
        recorded.attempts.push(destination.to_string());
        if recorded.failing.as_deref() == Some(destination) {
            return Err(Error::Delivery {
                message: format!("simulated failure for {destination}"),
            });
        }
        recorded
            .sent
            .push((destination.to_string(), message.to_string()));
        Ok(DeliveryReceipt {
            delivery_id: format!("TEST_{}", recorded.attempts.len()),
        })
    }
}

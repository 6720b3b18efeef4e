//! Reminder dispatch - sends payment reminders one student at a time.
//!
//! Each recipient moves `Idle -> Sending -> Sent | Failed`. A student who already
//! holds a receipt for the period is skipped with `AlreadySent`, one whose
//! pending balance is zero gets `NothingDue`, and neither touches the sender.
//! Batches run strictly in order and never stop early: every id gets a result.

use crate::{
    core::{
        ledger::{self, BillingPeriod, UnpaidBalance},
        message::{ReminderTemplate, compose_reminder, normalize_destination},
        reminder::{ReminderLedger, ReminderStatus},
    },
    errors::{Error, Result},
    notify::NotificationSender,
    store::FeeStore,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Why a dispatch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// The sender rejected the message; retrying may help
    Delivery,
    /// The student does not exist
    NotFound,
    /// The store could not be read
    Persistence,
    /// Stored data failed a check, e.g. a malformed billing period
    Invalid,
    /// The process is misconfigured
    Configuration,
}

impl ErrorKind {
    fn of(error: &Error) -> Self {
        match error {
            Error::Delivery { .. } => Self::Delivery,
            Error::StudentNotFound { .. } | Error::FeeRecordNotFound { .. } => Self::NotFound,
            Error::Persistence { .. } => Self::Persistence,
            Error::InvalidAmount { .. }
            | Error::InvalidPeriod { .. }
            | Error::Validation { .. }
            | Error::DuplicateAdmissionNumber { .. } => Self::Invalid,
            Error::Config { .. } | Error::EnvVar(_) => Self::Configuration,
        }
    }
}

/// How a single dispatch ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DispatchOutcome {
    /// The sender accepted the reminder and a receipt was recorded
    Sent,
    /// A receipt for this period already exists; nothing was sent
    AlreadySent,
    /// The student owes nothing for the period; nothing was sent
    NothingDue,
    /// Another dispatch for this student and period is running; nothing was sent
    InFlight,
    /// The dispatch failed and may be retried
    Failed {
        /// Failure category
        kind: ErrorKind,
        /// Human-readable cause
        message: String,
    },
}

/// Per-recipient result of [`Dispatcher::send_one`] and [`Dispatcher::send_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    /// Recipient
    pub student_id: i64,
    /// `true` for `Sent` and `AlreadySent`
    pub success: bool,
    /// Delivery id of the receipt, new or existing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,
    /// Failure category, present only when the dispatch failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Detailed outcome
    pub outcome: DispatchOutcome,
}

impl DispatchResult {
    fn new(student_id: i64, outcome: DispatchOutcome, delivery_id: Option<String>) -> Self {
        let success = matches!(outcome, DispatchOutcome::Sent | DispatchOutcome::AlreadySent);
        let error_kind = match &outcome {
            DispatchOutcome::Failed { kind, .. } => Some(*kind),
            _ => None,
        };
        Self {
            student_id,
            success,
            delivery_id,
            error_kind,
            outcome,
        }
    }

    fn failed(student_id: i64, error: &Error) -> Self {
        Self::new(
            student_id,
            DispatchOutcome::Failed {
                kind: ErrorKind::of(error),
                message: error.to_string(),
            },
            None,
        )
    }

    /// Failure category, if the dispatch failed.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }
}

/// An unpaid balance together with its reminder state, for listing screens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReminder {
    /// Who owes what
    #[serde(flatten)]
    pub balance: UnpaidBalance,
    /// Whether they were reminded this period
    pub reminder: ReminderStatus,
}

/// Coordinates ledger lookups, message composition, sending and receipts.
pub struct Dispatcher {
    store: Arc<dyn FeeStore>,
    sender: Arc<dyn NotificationSender>,
    reminders: Arc<ReminderLedger>,
    template: ReminderTemplate,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("reminders", &self.reminders)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Wires the collaborators together. The reminder ledger is shared so that
    /// callers can read reminder state while the dispatcher writes it.
    #[must_use]
    pub fn new(
        store: Arc<dyn FeeStore>,
        sender: Arc<dyn NotificationSender>,
        reminders: Arc<ReminderLedger>,
        template: ReminderTemplate,
    ) -> Self {
        Self {
            store,
            sender,
            reminders,
            template,
        }
    }

    /// The receipt ledger this dispatcher writes to.
    #[must_use]
    pub fn reminders(&self) -> &ReminderLedger {
        &self.reminders
    }

    /// Unpaid balances for `period`, each annotated with its reminder state.
    ///
    /// # Errors
    /// Same as [`ledger::unpaid_balances`].
    pub async fn pending_reminders(&self, period: BillingPeriod) -> Result<Vec<PendingReminder>> {
        let balances = ledger::unpaid_balances(self.store.as_ref(), period).await?;
        Ok(balances
            .into_iter()
            .map(|balance| {
                let reminder = self.reminders.status(balance.id, period);
                PendingReminder { balance, reminder }
            })
            .collect())
    }

    /// Sends one reminder for `period`, re-reading the balance from the store.
    ///
    /// Never returns an error; failures are reported in the result.
    #[instrument(skip(self))]
    pub async fn send_one(&self, student_id: i64, period: BillingPeriod) -> DispatchResult {
        if let Some(result) = self.already_sent(student_id, period) {
            return result;
        }

        let Some(_sending) = self.reminders.try_begin(student_id, period) else {
            info!("Reminder for student {} already in progress", student_id);
            return DispatchResult::new(student_id, DispatchOutcome::InFlight, None);
        };

        // A concurrent dispatch may have finished between the check and the claim
        if let Some(result) = self.already_sent(student_id, period) {
            return result;
        }

        match self.deliver(student_id, period).await {
            Ok(Some(delivery_id)) => {
                info!("Reminder sent to student {}: {}", student_id, delivery_id);
                DispatchResult::new(student_id, DispatchOutcome::Sent, Some(delivery_id))
            }
            Ok(None) => {
                info!("Student {} owes nothing for {}", student_id, period);
                DispatchResult::new(student_id, DispatchOutcome::NothingDue, None)
            }
            Err(error) => {
                warn!("Reminder to student {} failed: {}", student_id, error);
                DispatchResult::failed(student_id, &error)
            }
        }
    }

    /// Sends reminders to each id in order, one at a time.
    ///
    /// The returned results line up with `student_ids`.
    #[instrument(skip(self, student_ids), fields(count = student_ids.len()))]
    pub async fn send_all(&self, student_ids: &[i64], period: BillingPeriod) -> Vec<DispatchResult> {
        let mut results = Vec::with_capacity(student_ids.len());
        for &student_id in student_ids {
            results.push(self.send_one(student_id, period).await);
        }

        let sent = results
            .iter()
            .filter(|r| r.outcome == DispatchOutcome::Sent)
            .count();
        let failed = results.iter().filter(|r| r.error_kind().is_some()).count();
        info!(
            "Reminder batch for {}: {} sent, {} failed, {} total",
            period,
            sent,
            failed,
            results.len()
        );
        results
    }

    /// Reminds every student with an unpaid balance in `period`.
    ///
    /// # Errors
    /// Returns the ledger error if the unpaid list cannot be built; individual
    /// send failures are reported in the results instead.
    pub async fn send_all_pending(&self, period: BillingPeriod) -> Result<Vec<DispatchResult>> {
        let ids: Vec<i64> = ledger::unpaid_balances(self.store.as_ref(), period)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();
        Ok(self.send_all(&ids, period).await)
    }

    fn already_sent(&self, student_id: i64, period: BillingPeriod) -> Option<DispatchResult> {
        let status = self.reminders.status(student_id, period);
        status.sent.then(|| {
            DispatchResult::new(student_id, DispatchOutcome::AlreadySent, status.delivery_id)
        })
    }

    /// `Ok(None)` when nothing is due.
    async fn deliver(&self, student_id: i64, period: BillingPeriod) -> Result<Option<String>> {
        let student = self
            .store
            .find_student(student_id)
            .await?
            .ok_or_else(|| Error::StudentNotFound {
                key: student_id.to_string(),
            })?;

        let amount_due = ledger::amount_due(self.store.as_ref(), student_id, period).await?;
        if !is_payable(amount_due) {
            return Ok(None);
        }

        let message = compose_reminder(&self.template, &student.full_name(), amount_due);
        let destination = normalize_destination(&student.country_code, &student.phone_number);

        let receipt = self
            .sender
            .send(&destination, &message)
            .await
            .map_err(|e| match e {
                Error::Delivery { .. } => e,
                other => Error::Delivery {
                    message: other.to_string(),
                },
            })?;

        self.reminders
            .mark_sent(student_id, period, receipt.delivery_id.clone(), Utc::now());
        Ok(Some(receipt.delivery_id))
    }
}

/// Whether a balance shows as at least one cent once rounded for the message.
fn is_payable(amount_due: f64) -> bool {
    (amount_due * 100.0).round() >= 1.0
}

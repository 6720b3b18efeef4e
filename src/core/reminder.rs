//! Reminder receipts - which students were already reminded for a billing period.
//!
//! Receipts are keyed by `(student, period)` so a reminder sent in May does not
//! block June's. The ledger lives for the process only; it is an operational
//! guard against visible double sends, not a billing record.

use crate::core::ledger::BillingPeriod;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

type ReceiptKey = (i64, BillingPeriod);

/// Proof of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderReceipt {
    /// Id returned by the notification sender
    pub delivery_id: String,
    /// When the sender accepted the message
    pub sent_at: DateTime<Utc>,
}

/// Reminder state for one student and period, as shown to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderStatus {
    /// A reminder was delivered
    pub sent: bool,
    /// When it was delivered
    pub sent_at: Option<DateTime<Utc>>,
    /// Sender's delivery id
    pub delivery_id: Option<String>,
}

#[derive(Debug, Default)]
struct LedgerState {
    receipts: HashMap<ReceiptKey, ReminderReceipt>,
    in_flight: HashSet<ReceiptKey>,
}

/// Per-student, per-period reminder receipts plus the set of sends in progress.
#[derive(Debug, Default)]
pub struct ReminderLedger {
    state: Mutex<LedgerState>,
}

impl ReminderLedger {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        // Every critical section is a single map operation, so a poisoned
        // lock still guards consistent data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a delivery, replacing any earlier receipt for the same key.
    pub fn mark_sent(
        &self,
        student_id: i64,
        period: BillingPeriod,
        delivery_id: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) {
        let receipt = ReminderReceipt {
            delivery_id: delivery_id.into(),
            sent_at,
        };
        debug!(
            "Reminder receipt for student {} in {}: {}",
            student_id, period, receipt.delivery_id
        );
        self.state().receipts.insert((student_id, period), receipt);
    }

    /// Current state; `sent: false` when no receipt exists.
    #[must_use]
    pub fn status(&self, student_id: i64, period: BillingPeriod) -> ReminderStatus {
        self.state()
            .receipts
            .get(&(student_id, period))
            .map_or_else(ReminderStatus::default, |receipt| ReminderStatus {
                sent: true,
                sent_at: Some(receipt.sent_at),
                delivery_id: Some(receipt.delivery_id.clone()),
            })
    }

    /// Whether a dispatch for this key is currently running.
    #[must_use]
    pub fn is_in_flight(&self, student_id: i64, period: BillingPeriod) -> bool {
        self.state().in_flight.contains(&(student_id, period))
    }

    /// Number of receipts held.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.state().receipts.len()
    }

    /// Drops every receipt. Intended for tests.
    pub fn reset(&self) {
        let mut state = self.state();
        state.receipts.clear();
        state.in_flight.clear();
    }

    /// Claims the key for a dispatch. Returns `None` if another dispatch holds it;
    /// the claim is released when the guard drops.
    #[must_use]
    pub fn try_begin(&self, student_id: i64, period: BillingPeriod) -> Option<SendingGuard<'_>> {
        let key = (student_id, period);
        let claimed = self.state().in_flight.insert(key);
        claimed.then(|| SendingGuard { ledger: self, key })
    }
}

/// Marks a `(student, period)` as being sent to until dropped.
#[derive(Debug)]
pub struct SendingGuard<'a> {
    ledger: &'a ReminderLedger,
    key: ReceiptKey,
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.ledger.state().in_flight.remove(&self.key);
    }
}

//! Core business logic - framework-agnostic fee, roster and reminder operations.
//!
//! Everything here talks to persistence through [`crate::store::FeeStore`] and to
//! the outside world through [`crate::notify::NotificationSender`].

/// Sending reminders and reporting per-recipient outcomes
pub mod dispatch;
/// Charging students and settling fee records
pub mod fee;
/// Billing periods and unpaid-balance aggregation
pub mod ledger;
/// Reminder wording and destination normalisation
pub mod message;
/// Which students were already reminded in a period
pub mod reminder;
/// Studio-wide dashboard figures
pub mod report;
/// Enrolment, edits and soft removal of students
pub mod student;

//! Notification sender - the outbound channel reminders are handed to.
//!
//! The real messaging provider sits behind [`NotificationSender`]; this crate
//! ships only [`LogSender`], a dry-run channel that logs each message and hands
//! back a mock delivery id.

use crate::errors::Result;
use async_trait::async_trait;
use serde::Serialize;

pub mod log_sender;

pub use log_sender::LogSender;

/// What the channel returns for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    /// Provider-assigned message id
    pub delivery_id: String,
}

/// Accepts a message for a destination or fails.
///
/// Implementations report every failure as `Error::Delivery`; callers must not
/// assume retries, ordering or confirmation beyond the returned id.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Hands `message` to the channel for `destination` (a normalised, dialable number).
    async fn send(&self, destination: &str, message: &str) -> Result<DeliveryReceipt>;
}

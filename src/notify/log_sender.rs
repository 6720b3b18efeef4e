//! Dry-run sender: logs the reminder instead of contacting a provider.

use super::{DeliveryReceipt, NotificationSender};
use crate::{
    config::studio::NotifierConfig,
    errors::{Error, Result},
};
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

/// Logs each message through `tracing` and returns a `MOCK_` delivery id.
#[derive(Debug, Clone)]
pub struct LogSender {
    sender: String,
}

impl LogSender {
    /// Builds a sender for the configured outbound address.
    ///
    /// # Errors
    /// `Config` if the address is blank.
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        let sender = config.sender.trim();
        if sender.is_empty() {
            return Err(Error::Config {
                message: "notifier.sender must not be empty".to_string(),
            });
        }
        Ok(Self {
            sender: sender.to_string(),
        })
    }

    /// The outbound address messages appear to come from.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }
}

fn is_dialable(destination: &str) -> bool {
    destination
        .strip_prefix('+')
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(&self, destination: &str, message: &str) -> Result<DeliveryReceipt> {
        if !is_dialable(destination) {
            return Err(Error::Delivery {
                message: format!("'{destination}' is not a dialable number"),
            });
        }

        let id = Uuid::new_v4().simple().to_string();
        let delivery_id = format!("MOCK_{}", id[..8].to_ascii_uppercase());
        info!(
            from = %self.sender,
            to = %destination,
            delivery_id = %delivery_id,
            "Dry-run reminder:\n{}",
            message
        );
        Ok(DeliveryReceipt { delivery_id })
    }
}

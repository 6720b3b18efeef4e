//! Studio configuration loading from config.toml
//!
//! The file names the outbound notifier address, may override the reminder
//! wording, and may list students to enrol on first run.

use crate::{
    core::message::ReminderTemplate,
    errors::{Error, Result},
    store::NewStudent,
};
use serde::Deserialize;
use std::path::Path;

/// Where the configuration is read from when `STUDIO_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
pub struct StudioConfig {
    /// Notification sender settings
    pub notifier: NotifierConfig,
    /// Reminder wording overrides
    #[serde(default)]
    pub reminder: ReminderTemplate,
    /// Students enrolled at startup when their admission number is not present yet
    #[serde(default)]
    pub students: Vec<NewStudent>,
}

/// `[notifier]` table
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Address messages are sent from
    pub sender: String,
}

/// Loads studio configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - `[notifier] sender` is missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<StudioConfig> {
    let path = path.as_ref();
    tracing::debug!("Loading studio configuration from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    parse_config(&contents)
}

/// Loads studio configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<StudioConfig> {
    load_config(DEFAULT_CONFIG_PATH)
}

fn parse_config(contents: &str) -> Result<StudioConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

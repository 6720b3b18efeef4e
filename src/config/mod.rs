//! Application configuration - environment variables plus `config.toml`.

/// Database configuration and connection management
pub mod database;

/// Studio configuration loading from config.toml
pub mod studio;

use crate::errors::Result;
use std::env::VarError;
use studio::StudioConfig;
use tracing::info;

const CONFIG_PATH_VAR: &str = "STUDIO_CONFIG";

/// Everything the binary needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Connection string from `DATABASE_URL`
    pub database_url: String,
    /// Parsed `config.toml`
    pub studio: StudioConfig,
}

/// Reads `DATABASE_URL` and the studio configuration file.
///
/// The file path comes from `STUDIO_CONFIG`, defaulting to `config.toml`.
///
/// # Errors
/// `Config` if the database URL is missing or the file cannot be read or parsed,
/// `EnvVar` if `STUDIO_CONFIG` is not valid unicode.
pub fn load_app_configuration() -> Result<AppConfig> {
    let database_url = database::get_database_url()?;
    let (path, studio) = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => {
            let studio = studio::load_config(&path)?;
            (path, studio)
        }
        Err(VarError::NotPresent) => (
            studio::DEFAULT_CONFIG_PATH.to_string(),
            studio::load_default_config()?,
        ),
        Err(e) => return Err(e.into()),
    };
    info!(
        "Loaded configuration from {} ({} seed students)",
        path,
        studio.students.len()
    );
    Ok(AppConfig {
        database_url,
        studio,
    })
}

//! Database configuration - connecting to `SQLite` and creating the schema.
//!
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the models.

use crate::entities::{FeeRecord, Student};
use crate::errors::{Error, Result};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::info;

/// Reads the connection string from `DATABASE_URL`.
///
/// # Errors
/// `Config` if the variable is unset or blank.
pub fn get_database_url() -> Result<String> {
    database_url_from(std::env::var("DATABASE_URL").ok())
}

fn database_url_from(value: Option<String>) -> Result<String> {
    value
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| Error::Config {
            message: "DATABASE_URL must be set, e.g. sqlite://data/studio.sqlite?mode=rwc"
                .to_string(),
        })
}

/// Opens a connection pool for `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    let db = Database::connect(database_url).await?;
    info!("Connected to database");
    Ok(db)
}

/// Creates the `students` and `fee_records` tables if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut student_table = schema.create_table_from_entity(Student);
    student_table.if_not_exists();
    let mut fee_record_table = schema.create_table_from_entity(FeeRecord);
    fee_record_table.if_not_exists();

    db.execute(builder.build(&student_table)).await?;
    db.execute(builder.build(&fee_record_table)).await?;

    Ok(())
}

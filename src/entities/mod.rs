//! Entity module - Contains the SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod fee_record;
pub mod student;

// Re-export specific types to avoid conflicts
pub use fee_record::{Entity as FeeRecord, FeeStatus, Model as FeeRecordModel};
pub use student::{Entity as Student, Model as StudentModel};

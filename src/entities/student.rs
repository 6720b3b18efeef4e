//! Student entity - one row per enrolled student.
//!
//! Students are identified externally by their `admission_number` and are never
//! physically deleted; `is_active` is flipped instead.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    /// Provider-assigned key
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stable external identifier (e.g. `BB2023001`)
    #[sea_orm(unique)]
    pub admission_number: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Dialling prefix, with or without a leading `+`
    pub country_code: String,
    /// National number as entered; may contain spaces or hyphens
    pub phone_number: String,
    /// Parent or guardian, if recorded
    pub parent_name: Option<String>,
    /// Contact email, if recorded
    pub email: Option<String>,
    /// Soft-removal flag
    pub is_active: bool,
    /// When the student was added
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Given name and family name joined by a single space.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Defines relationships between Student and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One student has many fee records
    #[sea_orm(has_many = "super::fee_record::Entity")]
    FeeRecords,
}

impl Related<super::fee_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

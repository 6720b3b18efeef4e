//! Fee record entity - a single charge owed by a student for a billing period.
//!
//! A student may carry several records for the same `month`/`year`; the amount
//! due for that period is the sum of the pending ones.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment state of a fee record
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    /// Still owed
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Paid
    #[sea_orm(string_value = "settled")]
    Settled,
}

impl FeeStatus {
    /// The other state; used by the admin toggle.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Settled,
            Self::Settled => Self::Pending,
        }
    }

    /// Lowercase label, matching the stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Settled => "settled",
        }
    }
}

impl std::fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeeStatus {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "unpaid" => Ok(Self::Pending),
            "settled" | "paid" => Ok(Self::Settled),
            other => Err(crate::errors::Error::Validation {
                message: format!("Unknown fee status '{other}'"),
            }),
        }
    }
}

/// Fee record database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fee_records")]
pub struct Model {
    /// Unique identifier for the fee record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning student
    pub student_id: i64,
    /// Charge amount, always positive
    pub amount: f64,
    /// `pending` or `settled`
    pub status: FeeStatus,
    /// Billing month, 1-12
    pub month: u32,
    /// Billing year, four digits
    pub year: i32,
    /// When the charge was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `FeeRecord` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each fee record belongs to one student
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

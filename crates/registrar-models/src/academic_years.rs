//! Academic year models and DTOs.
//!
//! An academic year is the root of temporal scoping: classes, periods and
//! enrollments all belong to exactly one year. At most one year is current.

use crate::ids::AcademicYearId;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AcademicYear {
    pub id: AcademicYearId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Only one year is current at any time
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AcademicYear {
    /// Display label such as `2024/2025`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.start_date.year(), self.end_date.year())
    }
}

/// DTO for creating an academic year.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAcademicYearDto {
    pub start_date: NaiveDate,
    /// Must be after `start_date`
    pub end_date: NaiveDate,
    /// Make this the current year, demoting any other
    #[serde(default)]
    pub is_current: bool,
}

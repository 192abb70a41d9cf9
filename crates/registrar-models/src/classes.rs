//! Class models and DTOs.
//!
//! A class is a named group of students for one academic year, with a fixed
//! capacity. Occupancy is never stored; it is counted from active
//! enrollments whenever it is read.

use crate::ids::{AcademicYearId, ClassId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Class {
    pub id: ClassId,
    /// Name of the class, unique within its academic year (e.g., "10A")
    pub name: String,
    /// Level or grade (e.g., "Grade 10"), may be empty
    pub level: String,
    /// Maximum number of seats
    pub capacity: i32,
    pub academic_year_id: AcademicYearId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Class {
    pub fn is_full_at(&self, occupancy: i64) -> bool {
        occupancy >= i64::from(self.capacity)
    }
}

/// Class together with its occupancy, computed at read time.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ClassWithStats {
    #[serde(flatten)]
    pub class: Class,
    /// Seats taken by active or transferred-in students
    pub occupancy: i64,
    pub is_full: bool,
    pub remaining_seats: i64,
}

impl ClassWithStats {
    pub fn new(class: Class, occupancy: i64) -> Self {
        let is_full = class.is_full_at(occupancy);
        let remaining_seats = (i64::from(class.capacity) - occupancy).max(0);
        Self {
            class,
            occupancy,
            is_full,
            remaining_seats,
        }
    }
}

/// DTO for creating a class.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateClassDto {
    /// Name of the class (1-100 characters)
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Level (0-50 characters)
    #[validate(length(max = 50))]
    #[serde(default)]
    pub level: String,
    /// Capacity, at least 1
    #[validate(range(min = 1))]
    pub capacity: i32,
    pub academic_year_id: AcademicYearId,
}

/// DTO for updating a class. The academic year cannot change.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateClassDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 50))]
    pub level: Option<String>,
    /// New capacity; may not drop below the current occupancy
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
}

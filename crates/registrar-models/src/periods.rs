//! Period (term/semester) models and DTOs.
//!
//! Periods subdivide an academic year. Periods of the same year never
//! overlap, and at most one period per year is current.

use crate::ids::{AcademicYearId, PeriodId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Period {
    pub id: PeriodId,
    /// Name of the period (e.g., "First Semester")
    pub name: String,
    pub academic_year_id: AcademicYearId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Only one period per academic year is current
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Period {
    /// Half-open overlap test: a period ending on the day another starts
    /// does not overlap it.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date < end && start < self.end_date
    }
}

/// DTO for creating a period.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePeriodDto {
    /// Name of the period (1-50 characters)
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    pub academic_year_id: AcademicYearId,
    pub start_date: NaiveDate,
    /// Must be after `start_date`
    pub end_date: NaiveDate,
    /// Make this the current period of its year
    #[serde(default)]
    pub is_current: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn first_semester() -> Period {
        Period {
            id: PeriodId::new(),
            name: "First Semester".to_string(),
            academic_year_id: AcademicYearId::new(),
            start_date: date(2024, 9, 1),
            end_date: date(2025, 1, 31),
            is_current: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_overlaps() {
        let p = first_semester();
        assert!(p.overlaps(date(2025, 1, 15), date(2025, 6, 30)));
        assert!(p.overlaps(date(2024, 8, 1), date(2024, 9, 2)));
        assert!(!p.overlaps(date(2025, 1, 31), date(2025, 6, 30)));
        assert!(!p.overlaps(date(2025, 2, 1), date(2025, 6, 30)));
    }

    #[test]
    fn test_create_period_dto_validation() {
        let valid = CreatePeriodDto {
            name: "Term 1".to_string(),
            academic_year_id: AcademicYearId::new(),
            start_date: date(2024, 9, 1),
            end_date: date(2024, 12, 20),
            is_current: false,
        };
        assert!(valid.validate().is_ok());

        let empty_name = CreatePeriodDto {
            name: String::new(),
            ..valid.clone()
        };
        assert!(empty_name.validate().is_err());

        let long_name = CreatePeriodDto {
            name: "x".repeat(51),
            ..valid
        };
        assert!(long_name.validate().is_err());
    }
}

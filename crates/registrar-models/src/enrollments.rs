//! Enrollment models, the status lifecycle and DTOs.

use crate::ids::{AcademicYearId, ClassId, EnrollmentId, EnrollmentTransferId, StudentId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

/// Lifecycle of an enrollment.
///
/// `Active` is the only non-terminal status. Every other status is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "enrollment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Transferred,
    Graduated,
    Withdrawn,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Transferred => "transferred",
            EnrollmentStatus::Graduated => "graduated",
            EnrollmentStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, EnrollmentStatus::Active)
    }

    /// Whether an enrollment in this status occupies a seat in its class.
    ///
    /// A transferred enrollment sits in the class it was moved to.
    pub fn holds_seat(&self) -> bool {
        matches!(self, EnrollmentStatus::Active | EnrollmentStatus::Transferred)
    }

    pub fn can_transition_to(&self, next: EnrollmentStatus) -> bool {
        matches!(
            (self, next),
            (
                EnrollmentStatus::Active,
                EnrollmentStatus::Transferred | EnrollmentStatus::Graduated | EnrollmentStatus::Withdrawn
            )
        )
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EnrollmentStatus::Active),
            "transferred" => Ok(EnrollmentStatus::Transferred),
            "graduated" => Ok(EnrollmentStatus::Graduated),
            "withdrawn" => Ok(EnrollmentStatus::Withdrawn),
            other => Err(format!("unknown enrollment status `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub class_id: ClassId,
    /// Always equal to the class's academic year
    pub academic_year_id: AcademicYearId,
    pub enrollment_date: NaiveDate,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn holds_seat(&self) -> bool {
        self.status.holds_seat()
    }
}

/// History row written when an enrollment is moved to another class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EnrollmentTransfer {
    pub id: EnrollmentTransferId,
    pub enrollment_id: EnrollmentId,
    pub from_class_id: ClassId,
    pub to_class_id: ClassId,
    pub effective_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// DTO for enrolling a student in a class.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEnrollmentDto {
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub academic_year_id: AcademicYearId,
    /// Defaults to today
    pub enrollment_date: Option<NaiveDate>,
}

/// DTO for changing the status of an enrollment.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TransitionEnrollmentDto {
    pub status: EnrollmentStatus,
    /// Required when `status` is `transferred`
    pub target_class_id: Option<ClassId>,
    /// Date the transfer takes effect; defaults to today
    pub effective_date: Option<NaiveDate>,
}

/// Result of a status transition.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TransitionOutcome {
    /// The enrollment in its new status, pointing at its new class after a
    /// transfer
    pub enrollment: Enrollment,
    pub transfer: Option<EnrollmentTransfer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [EnrollmentStatus; 4] = [
        EnrollmentStatus::Active,
        EnrollmentStatus::Transferred,
        EnrollmentStatus::Graduated,
        EnrollmentStatus::Withdrawn,
    ];

    #[test]
    fn test_only_active_is_not_terminal() {
        assert!(!EnrollmentStatus::Active.is_terminal());
        assert!(EnrollmentStatus::Transferred.is_terminal());
        assert!(EnrollmentStatus::Graduated.is_terminal());
        assert!(EnrollmentStatus::Withdrawn.is_terminal());
    }

    #[test]
    fn test_transition_table() {
        for from in ALL {
            for to in ALL {
                let expected = from == EnrollmentStatus::Active && to != EnrollmentStatus::Active;
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_seat_holders() {
        assert!(EnrollmentStatus::Active.holds_seat());
        assert!(EnrollmentStatus::Transferred.holds_seat());
        assert!(!EnrollmentStatus::Graduated.holds_seat());
        assert!(!EnrollmentStatus::Withdrawn.holds_seat());
    }

    #[test]
    fn test_status_parse() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<EnrollmentStatus>().unwrap(), status);
        }
        assert!("expelled".parse::<EnrollmentStatus>().is_err());
    }

    #[test]
    fn test_status_serde_is_snake_case() {
        let json = serde_json::to_string(&EnrollmentStatus::Withdrawn).unwrap();
        assert_eq!(json, r#""withdrawn""#);
    }
}

//! Grades, derived values and weighted averages.
//!
//! A grade is stored exactly as entered (`value` out of `max_value`).
//! Its normalized value on the 20-point scale and its percentage are
//! computed on read and never persisted.

use crate::ids::{EnrollmentId, GradeId, PeriodId, SubjectId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Scale every grade is normalized to.
pub const NORMALIZED_SCALE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "grade_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GradeType {
    Exam,
    Test,
    Homework,
    Oral,
    Project,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Grade {
    pub id: GradeId,
    pub enrollment_id: EnrollmentId,
    pub subject_id: SubjectId,
    pub period_id: Option<PeriodId>,
    pub value: f64,
    pub max_value: f64,
    pub grade_type: GradeType,
    pub grade_date: NaiveDate,
    /// Weight of this grade within its subject
    pub coefficient: f64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Grade {
    /// Value rescaled to 20 points.
    pub fn normalized_value(&self) -> f64 {
        self.value / self.max_value * NORMALIZED_SCALE
    }

    pub fn percentage(&self) -> f64 {
        self.value / self.max_value * 100.0
    }

    pub fn view(self) -> GradeView {
        GradeView::from(self)
    }
}

/// A grade together with its derived values.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GradeView {
    #[serde(flatten)]
    pub grade: Grade,
    pub normalized_value: f64,
    pub percentage: f64,
}

impl From<Grade> for GradeView {
    fn from(grade: Grade) -> Self {
        Self {
            normalized_value: grade.normalized_value(),
            percentage: grade.percentage(),
            grade,
        }
    }
}

fn default_max_value() -> f64 {
    NORMALIZED_SCALE
}

fn default_coefficient() -> f64 {
    1.0
}

/// DTO for recording a grade.
///
/// `value` is checked against `max_value` by the grading service so that
/// an out-of-range value is reported as a rule violation.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordGradeDto {
    pub enrollment_id: EnrollmentId,
    pub subject_id: SubjectId,
    pub period_id: Option<PeriodId>,
    pub value: f64,
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_max_value")]
    pub max_value: f64,
    pub grade_type: GradeType,
    /// Defaults to today
    pub grade_date: Option<NaiveDate>,
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_coefficient")]
    pub coefficient: f64,
    #[validate(length(max = 500))]
    pub comment: Option<String>,
}

/// Weighted average of one subject for one enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SubjectAverage {
    pub subject_id: SubjectId,
    pub subject_name: String,
    /// Weight of the subject in the overall average
    pub coefficient: f64,
    /// Average on the 20-point scale
    pub average: f64,
    pub grade_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReportCard {
    pub enrollment_id: EnrollmentId,
    /// `None` covers every period of the year
    pub period_id: Option<PeriodId>,
    pub subjects: Vec<SubjectAverage>,
    pub overall_average: f64,
}

/// Σ(normalized · coefficient) / Σcoefficient over `grades`.
///
/// Returns `None` when there is nothing to average.
pub fn weighted_average<'a, I>(grades: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a Grade>,
{
    let (weighted, weights) = grades.into_iter().fold((0.0, 0.0), |(sum, w), g| {
        (sum + g.normalized_value() * g.coefficient, w + g.coefficient)
    });
    (weights > 0.0).then(|| weighted / weights)
}

/// Average of subject averages, weighted by each subject's coefficient.
pub fn overall_average(subjects: &[SubjectAverage]) -> Option<f64> {
    let (weighted, weights) = subjects.iter().fold((0.0, 0.0), |(sum, w), s| {
        (sum + s.average * s.coefficient, w + s.coefficient)
    });
    (weights > 0.0).then(|| weighted / weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(value: f64, max_value: f64, coefficient: f64) -> Grade {
        Grade {
            id: GradeId::new(),
            enrollment_id: EnrollmentId::new(),
            subject_id: SubjectId::new(),
            period_id: None,
            value,
            max_value,
            grade_type: GradeType::Test,
            grade_date: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
            coefficient,
            comment: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(average: f64, coefficient: f64) -> SubjectAverage {
        SubjectAverage {
            subject_id: SubjectId::new(),
            subject_name: "Subject".to_string(),
            coefficient,
            average,
            grade_count: 1,
        }
    }

    #[test]
    fn test_normalized_value() {
        assert_eq!(grade(15.0, 20.0, 1.0).normalized_value(), 15.0);
        assert_eq!(grade(8.0, 10.0, 1.0).normalized_value(), 16.0);
        assert_eq!(grade(45.0, 60.0, 1.0).percentage(), 75.0);
    }

    #[test]
    fn test_view_carries_derived_values() {
        let view = grade(8.0, 10.0, 2.0).view();
        assert_eq!(view.normalized_value, 16.0);
        assert_eq!(view.percentage, 80.0);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["normalized_value"], 16.0);
        assert_eq!(json["value"], 8.0);
    }

    #[test]
    fn test_weighted_average() {
        // (10 * 1 + 16 * 3) / 4 = 14.5
        let grades = [grade(10.0, 20.0, 1.0), grade(8.0, 10.0, 3.0)];
        assert_eq!(weighted_average(&grades), Some(14.5));
    }

    #[test]
    fn test_weighted_average_empty() {
        let none: [Grade; 0] = [];
        assert_eq!(weighted_average(&none), None);
    }

    #[test]
    fn test_overall_average_uses_subject_coefficients() {
        // (12 * 2 + 18 * 1) / 3 = 14
        let lines = [line(12.0, 2.0), line(18.0, 1.0)];
        assert_eq!(overall_average(&lines), Some(14.0));
        assert_eq!(overall_average(&[]), None);
    }

    #[test]
    fn test_record_grade_dto_validation() {
        let dto: RecordGradeDto = serde_json::from_str(&format!(
            r#"{{"enrollment_id": "{}", "subject_id": "{}", "value": 15, "grade_type": "exam"}}"#,
            EnrollmentId::new(),
            SubjectId::new()
        ))
        .unwrap();
        assert_eq!(dto.max_value, 20.0);
        assert_eq!(dto.coefficient, 1.0);
        assert!(dto.validate().is_ok());

        let zero_max = RecordGradeDto {
            max_value: 0.0,
            ..dto.clone()
        };
        assert!(zero_max.validate().is_err());

        let zero_coef = RecordGradeDto {
            coefficient: 0.0,
            ..dto
        };
        assert!(zero_coef.validate().is_err());
    }
}

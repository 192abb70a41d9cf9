//! Subject models and DTOs.

use crate::ids::{SubjectId, TeacherId};
use chrono::{DateTime, Utc};
use registrar_core::serde::deserialize_optional_id;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Subject {
    pub id: SubjectId,
    /// Unique subject name (e.g., "Mathematics")
    pub name: String,
    /// Unique short code (e.g., "MATH")
    pub code: String,
    pub description: Option<String>,
    /// Weight of the subject in the overall average
    pub coefficient: f64,
    /// Teacher used when an assignment names none
    pub default_teacher_id: Option<TeacherId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

fn default_coefficient() -> f64 {
    1.0
}

/// DTO for creating a subject.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSubjectDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    pub description: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_coefficient")]
    pub coefficient: f64,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub default_teacher_id: Option<TeacherId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_subject_dto_defaults() {
        let dto: CreateSubjectDto = serde_json::from_str(
            r#"{"name": "Mathematics", "code": "MATH", "default_teacher_id": ""}"#,
        )
        .unwrap();
        assert_eq!(dto.coefficient, 1.0);
        assert!(dto.is_active);
        assert!(dto.default_teacher_id.is_none());
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_coefficient_must_be_positive() {
        let dto = CreateSubjectDto {
            name: "Physics".to_string(),
            code: "PHY".to_string(),
            description: None,
            coefficient: 0.0,
            default_teacher_id: None,
            is_active: true,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_code_length() {
        let dto = CreateSubjectDto {
            name: "Physics".to_string(),
            code: "X".repeat(21),
            description: None,
            coefficient: 2.0,
            default_teacher_id: None,
            is_active: true,
        };
        assert!(dto.validate().is_err());
    }
}

//! People: profiles, teachers and students.
//!
//! A [`Profile`] holds the personal details and the role supplied to the
//! identity layer. Teachers and students extend a profile with their
//! school-specific fields.

use crate::ids::{ProfileId, StudentId, TeacherId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

/// Role of a person, as supplied by the identity layer.
///
/// The engine records the role but never gates an operation on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "profile_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SystemAdministrator,
    Director,
    Secretary,
    StudentPresident,
    Teacher,
    Student,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::SystemAdministrator,
        Role::Director,
        Role::Secretary,
        Role::StudentPresident,
        Role::Teacher,
        Role::Student,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SystemAdministrator => "system_administrator",
            Role::Director => "director",
            Role::Secretary => "secretary",
            Role::StudentPresident => "student_president",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role `{}`", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "gender")]
pub enum Gender {
    #[sqlx(rename = "M")]
    #[serde(rename = "M")]
    Male,
    #[sqlx(rename = "F")]
    #[serde(rename = "F")]
    Female,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Profile {
    pub id: ProfileId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Teacher {
    pub id: TeacherId,
    pub profile_id: ProfileId,
    pub specialty: Option<String>,
    /// Unique staff number
    pub employee_id: String,
    pub hire_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: StudentId,
    pub profile_id: ProfileId,
    /// Unique registration number
    pub student_number: String,
    pub date_of_birth: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Student with the profile it extends, as listed on a class roster.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StudentWithProfile {
    #[serde(flatten)]
    pub student: Student,
    pub profile: Profile,
}

/// DTO for creating a profile.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProfileDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub role: Role,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
}

/// DTO for registering a teacher together with their profile.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTeacherDto {
    #[validate(nested)]
    pub profile: CreateProfileDto,
    #[validate(length(max = 100))]
    pub specialty: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub employee_id: String,
    pub hire_date: NaiveDate,
}

/// DTO for registering a student together with their profile.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(nested)]
    pub profile: CreateProfileDto,
    #[validate(length(min = 1, max = 20))]
    pub student_number: String,
    pub date_of_birth: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_dto(role: Role) -> CreateProfileDto {
        CreateProfileDto {
            first_name: "Amina".to_string(),
            last_name: "Diallo".to_string(),
            email: "amina.diallo@example.com".to_string(),
            role,
            phone: None,
            gender: Some(Gender::Female),
            birth_date: None,
            address: None,
        }
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("principal".parse::<Role>().is_err());
    }

    #[test]
    fn test_gender_serializes_as_letter() {
        assert_eq!(serde_json::to_string(&Gender::Male).unwrap(), r#""M""#);
        let gender: Gender = serde_json::from_str(r#""F""#).unwrap();
        assert_eq!(gender, Gender::Female);
    }

    #[test]
    fn test_nested_profile_validation() {
        let valid = CreateStudentDto {
            profile: profile_dto(Role::Student),
            student_number: "S-0001".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2010, 3, 14).unwrap(),
        };
        assert!(valid.validate().is_ok());

        let mut bad_email = valid.clone();
        bad_email.profile.email = "not-an-email".to_string();
        let err = registrar_core::AppError::from(bad_email.validate().unwrap_err());
        assert_eq!(err.to_string(), "profile.email is invalid");
    }

    #[test]
    fn test_teacher_requires_employee_id() {
        let dto = CreateTeacherDto {
            profile: profile_dto(Role::Teacher),
            specialty: Some("Mathematics".to_string()),
            employee_id: String::new(),
            hire_date: NaiveDate::from_ymd_opt(2020, 9, 1).unwrap(),
        };
        assert!(dto.validate().is_err());
    }
}

//! Curriculum assignments: which subject is taught to which class, in which
//! period, by which teacher.

use crate::ids::{ClassId, ClassSubjectId, PeriodId, SubjectId, TeacherId};
use chrono::{DateTime, Utc};
use registrar_core::serde::deserialize_optional_id;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ClassSubject {
    pub id: ClassSubjectId,
    pub class_id: ClassId,
    pub subject_id: SubjectId,
    pub teacher_id: Option<TeacherId>,
    /// `None` means every period of the class's academic year
    pub period_id: Option<PeriodId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClassSubject {
    /// Whether this row applies to `period`. An all-periods row covers any
    /// period; a period-specific row only covers that period.
    pub fn covers(&self, period: Option<PeriodId>) -> bool {
        match self.period_id {
            None => true,
            Some(own) => Some(own) == period,
        }
    }

    /// Two rows for the same class and subject collide when they name the
    /// same period, or when either of them spans all periods.
    pub fn collides_with(&self, period: Option<PeriodId>) -> bool {
        self.period_id.is_none() || period.is_none() || self.period_id == period
    }
}

fn default_true() -> bool {
    true
}

/// DTO for assigning a subject to a class.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateClassSubjectDto {
    pub class_id: ClassId,
    pub subject_id: SubjectId,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub teacher_id: Option<TeacherId>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub period_id: Option<PeriodId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Where a resolved teacher came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TeacherSource {
    /// The assignment row names a teacher
    Assignment,
    /// Fallback to the subject's default teacher
    SubjectDefault,
    Unassigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct TeacherResolution {
    pub teacher_id: Option<TeacherId>,
    pub source: TeacherSource,
}

impl TeacherResolution {
    pub const UNASSIGNED: TeacherResolution = TeacherResolution {
        teacher_id: None,
        source: TeacherSource::Unassigned,
    };

    /// Resolves assignment teacher, then subject default.
    pub fn resolve(assigned: Option<TeacherId>, subject_default: Option<TeacherId>) -> Self {
        match (assigned, subject_default) {
            (Some(teacher_id), _) => Self {
                teacher_id: Some(teacher_id),
                source: TeacherSource::Assignment,
            },
            (None, Some(teacher_id)) => Self {
                teacher_id: Some(teacher_id),
                source: TeacherSource::SubjectDefault,
            },
            (None, None) => Self::UNASSIGNED,
        }
    }
}

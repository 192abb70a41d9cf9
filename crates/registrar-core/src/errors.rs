//! Error types returned by every Registrar operation.
//!
//! [`RuleViolation`] is the taxonomy of recoverable business-rule failures.
//! [`StoreError`] is what a persistence backend reports. [`AppError`] is the
//! single error type returned by services, and it renders itself as an HTTP
//! response for whichever presentation layer hosts the engine.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;
use validator::{ValidationErrors, ValidationErrorsKind};

pub type AppResult<T> = Result<T, AppError>;

/// A business rule rejected the operation. Nothing was written.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleViolation {
    #[error("end date {end} must be after start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("student {student_id} already has an enrollment for academic year {academic_year_id}")]
    DuplicateEnrollment {
        student_id: Uuid,
        academic_year_id: Uuid,
    },

    #[error("class {class_id} is full ({occupancy}/{capacity})")]
    CapacityExceeded {
        class_id: Uuid,
        capacity: i32,
        occupancy: i64,
    },

    #[error(
        "class {class_id} belongs to academic year {class_year_id}, not {requested_year_id}"
    )]
    YearMismatch {
        class_id: Uuid,
        class_year_id: Uuid,
        requested_year_id: Uuid,
    },

    #[error("cannot change enrollment status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("subject {subject_id} is already assigned to class {class_id} for {}", PeriodScope(.period_id))]
    DuplicateAssignment {
        class_id: Uuid,
        subject_id: Uuid,
        period_id: Option<Uuid>,
    },

    #[error("grade value {value} must be between 0 and {max_value}")]
    OutOfRange { value: f64, max_value: f64 },

    #[error("period {period_id} belongs to academic year {period_year_id}, expected {expected_year_id}")]
    PeriodYearMismatch {
        period_id: Uuid,
        period_year_id: Uuid,
        expected_year_id: Uuid,
    },

    #[error("subject {subject_id} is not taught to class {class_id} for {}", PeriodScope(.period_id))]
    UnassignedSubject {
        class_id: Uuid,
        subject_id: Uuid,
        period_id: Option<Uuid>,
    },

    #[error("attendance for enrollment {enrollment_id} in subject {subject_id} on {date} is already recorded")]
    DuplicateAttendance {
        enrollment_id: Uuid,
        subject_id: Uuid,
        date: NaiveDate,
    },

    #[error("no grades found for {0}")]
    NoData(String),

    #[error("period dates {start} to {end} overlap with existing period {existing}")]
    PeriodOverlap {
        existing: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("end time {end} must be after start time {start}")]
    InvalidTimeRange { start: NaiveTime, end: NaiveTime },

    #[error("{owner} is already scheduled on {weekday} between {start} and {end}")]
    ScheduleOverlap {
        /// `class <id>` or `teacher <id>`
        owner: String,
        weekday: String,
        start: NaiveTime,
        end: NaiveTime,
    },
}

struct PeriodScope<'a>(&'a Option<Uuid>);

impl fmt::Display for PeriodScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "period {}", id),
            None => f.write_str("all periods"),
        }
    }
}

impl RuleViolation {
    /// Stable machine-readable code, one per rule.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRange { .. } => "invalid_range",
            Self::DuplicateEnrollment { .. } => "duplicate_enrollment",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::YearMismatch { .. } => "year_mismatch",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::DuplicateAssignment { .. } => "duplicate_assignment",
            Self::OutOfRange { .. } => "out_of_range",
            Self::PeriodYearMismatch { .. } => "period_year_mismatch",
            Self::UnassignedSubject { .. } => "unassigned_subject",
            Self::DuplicateAttendance { .. } => "duplicate_attendance",
            Self::NoData(_) => "no_data",
            Self::PeriodOverlap { .. } => "period_overlap",
            Self::InvalidTimeRange { .. } => "invalid_time_range",
            Self::ScheduleOverlap { .. } => "schedule_overlap",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::DuplicateEnrollment { .. }
            | Self::CapacityExceeded { .. }
            | Self::DuplicateAssignment { .. }
            | Self::DuplicateAttendance { .. }
            | Self::PeriodOverlap { .. }
            | Self::ScheduleOverlap { .. } => StatusCode::CONFLICT,
            Self::NoData(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// Failure reported by a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A hard uniqueness constraint rejected the write.
    #[error("unique constraint `{constraint}` violated")]
    UniqueViolation { constraint: String },

    /// The transaction lost a serialization race and may be retried.
    #[error("transaction could not be serialized")]
    SerializationFailure,

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn unique(constraint: impl Into<String>) -> Self {
        Self::UniqueViolation {
            constraint: constraint.into(),
        }
    }

    pub fn is_serialization_failure(&self) -> bool {
        matches!(self, Self::SerializationFailure)
    }

    /// Name of the violated constraint, if this is a uniqueness failure.
    pub fn violated_constraint(&self) -> Option<&str> {
        match self {
            Self::UniqueViolation { constraint } => Some(constraint),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(format!("{} {}", entity, id))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Rule violated by this error, if any.
    pub fn rule(&self) -> Option<&RuleViolation> {
        match self {
            Self::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_serialization_failure())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Rule(rule) => rule.status(),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Storage(StoreError::UniqueViolation { .. }) => StatusCode::CONFLICT,
            Self::Storage(StoreError::SerializationFailure) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(StoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Rule(rule) => rule.code(),
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation",
            Self::Storage(_) => "storage",
        }
    }
}

/// Collects every failure, nested structs and list items included, as
/// `path: message` or `path is invalid`.
fn collect_errors(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(failures) => {
                for failure in failures {
                    out.push(match &failure.message {
                        Some(msg) if prefix.is_empty() => msg.to_string(),
                        Some(msg) => format!("{}: {}", path, msg),
                        None => format!("{} is invalid", path),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_errors(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_errors(nested, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

fn format_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect_errors(errors, "", &mut messages);
    messages.sort();
    messages.join(", ")
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(format_errors(&errors))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Storage(StoreError::Backend(err)) => {
                tracing::error!(error = %err, "Storage backend error");
                "A storage error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

//! Strongly-typed ID newtypes for every Registrar entity.
//!
//! Each entity gets its own wrapper around `Uuid`, so an `EnrollmentId` can
//! never be passed where a `StudentId` is expected.
//!
//! ```ignore
//! use registrar_models::ids::{ClassId, StudentId};
//!
//! fn roster(class: ClassId) { /* ... */ }
//!
//! roster(ClassId::new());      // OK
//! // roster(StudentId::new()); // Compile error
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize, sqlx::Type, ToSchema,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        #[schema(value_type = String, format = "uuid")]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Deterministic id, for fixtures.
            pub const fn from_u128(v: u128) -> Self {
                Self(Uuid::from_u128(v))
            }

            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

define_id!(
    /// ID of an academic year.
    AcademicYearId
);

define_id!(
    /// ID of a period (term or semester) inside an academic year.
    PeriodId
);

define_id!(
    /// ID of a class (a group of students for one academic year).
    ClassId
);

define_id!(
    /// ID of a subject.
    SubjectId
);

define_id!(
    /// ID of a person's profile.
    ProfileId
);

define_id!(
    /// ID of a teacher.
    TeacherId
);

define_id!(
    /// ID of a student.
    StudentId
);

define_id!(
    /// ID of a curriculum assignment (subject taught to a class).
    ClassSubjectId
);

define_id!(
    /// ID of an enrollment (student placed in a class for a year).
    EnrollmentId
);

define_id!(
    /// ID of one recorded move of an enrollment between classes.
    EnrollmentTransferId
);

define_id!(
    /// ID of a weekly timetable slot.
    ScheduleId
);

define_id!(
    /// ID of a grade.
    GradeId
);

define_id!(
    /// ID of an attendance record.
    AttendanceId
);

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "0b5e7c1a-44d2-4f0e-9a3b-6c1d2e3f4a5b";

    #[test]
    fn test_fresh_ids_differ() {
        assert_ne!(ClassId::new(), ClassId::new());
        assert_ne!(EnrollmentId::default(), EnrollmentId::default());
    }

    #[test]
    fn test_debug_carries_type_name() {
        let id = EnrollmentId::from_u128(7);
        let debug = format!("{:?}", id);
        assert!(debug.starts_with("EnrollmentId("), "{}", debug);
    }

    #[test]
    fn test_parse_and_display() {
        let id: StudentId = RAW.parse().unwrap();
        assert_eq!(id.to_string(), RAW);
        assert!("10A".parse::<StudentId>().is_err());
    }

    #[test]
    fn test_json_is_a_bare_string() {
        let id: SubjectId = RAW.parse().unwrap();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(RAW.to_string()));
        assert_eq!(serde_json::from_value::<SubjectId>(json).unwrap(), id);
    }

    #[test]
    fn test_uuid_conversions() {
        let period = PeriodId::from_u128(42);
        let raw: Uuid = period.into();
        assert_eq!(PeriodId::from(raw), period);
        assert_eq!(period.into_inner(), Uuid::from_u128(42));
    }
}

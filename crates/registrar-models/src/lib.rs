//! # Registrar Models
//!
//! Domain entities and DTOs for the Registrar rules engine.
//!
//! Entities derive `FromRow` for the PostgreSQL store and `ToSchema` for
//! whichever presentation layer documents them. DTOs carry their own
//! `validator` rules; business rules live in the services.
//!
//! # Modules
//!
//! - [`ids`]: typed UUID identifiers
//! - [`academic_years`], [`periods`]: the academic calendar
//! - [`classes`], [`subjects`], [`people`]: registry entities
//! - [`curriculum`]: class-subject assignments
//! - [`schedules`]: weekly timetable slots for those assignments
//! - [`enrollments`]: enrollment records and their status lifecycle
//! - [`grades`], [`attendance`]: marks and presence records

pub mod academic_years;
pub mod attendance;
pub mod classes;
pub mod curriculum;
pub mod enrollments;
pub mod grades;
pub mod ids;
pub mod people;
pub mod periods;
pub mod schedules;
pub mod subjects;

pub use academic_years::{AcademicYear, CreateAcademicYearDto};
pub use attendance::{Attendance, AttendanceStatus, AttendanceSummary, RecordAttendanceDto};
pub use classes::{Class, ClassWithStats, CreateClassDto, UpdateClassDto};
pub use curriculum::{ClassSubject, CreateClassSubjectDto, TeacherResolution, TeacherSource};
pub use enrollments::{
    CreateEnrollmentDto, Enrollment, EnrollmentStatus, EnrollmentTransfer,
    TransitionEnrollmentDto, TransitionOutcome,
};
pub use grades::{Grade, GradeType, GradeView, RecordGradeDto, ReportCard, SubjectAverage};
pub use ids::*;
pub use people::{
    CreateProfileDto, CreateStudentDto, CreateTeacherDto, Gender, Profile, Role, Student,
    StudentWithProfile, Teacher,
};
pub use periods::{CreatePeriodDto, Period};
pub use schedules::{CreateScheduleDto, Schedule, Weekday};
pub use subjects::{CreateSubjectDto, Subject};

//! Storage traits.
//!
//! Every service operation runs against one [`StoreTx`]. Dropping a
//! transaction without calling [`StoreTx::commit`] discards all of its
//! writes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use registrar_core::StoreError;
use registrar_models::{
    AcademicYear, AcademicYearId, Attendance, Class, ClassId, ClassSubject, ClassSubjectId,
    Enrollment, EnrollmentId, EnrollmentStatus, EnrollmentTransfer, Grade, Period, PeriodId,
    Profile, ProfileId, Schedule, Student, StudentId, Subject, SubjectId, Teacher, TeacherId,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// A backend able to open isolated transactions.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

/// One isolated unit of work.
///
/// Implementations must behave as if transactions ran one after another,
/// and must reject writes that break a uniqueness constraint listed in
/// [`crate::constraints`].
#[async_trait]
pub trait StoreTx: Send {
    // Academic years
    async fn insert_academic_year(&mut self, year: &AcademicYear) -> StoreResult<()>;
    async fn academic_year(&mut self, id: AcademicYearId) -> StoreResult<Option<AcademicYear>>;
    async fn academic_years(&mut self) -> StoreResult<Vec<AcademicYear>>;
    async fn current_academic_year(&mut self) -> StoreResult<Option<AcademicYear>>;
    /// Clears the current flag on every year.
    async fn demote_academic_years(&mut self, now: DateTime<Utc>) -> StoreResult<()>;
    async fn promote_academic_year(
        &mut self,
        id: AcademicYearId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<AcademicYear>>;

    // Periods
    async fn insert_period(&mut self, period: &Period) -> StoreResult<()>;
    async fn period(&mut self, id: PeriodId) -> StoreResult<Option<Period>>;
    async fn periods_for_year(&mut self, year: AcademicYearId) -> StoreResult<Vec<Period>>;
    async fn current_period(&mut self, year: AcademicYearId) -> StoreResult<Option<Period>>;
    /// Clears the current flag on every period of `year`.
    async fn demote_periods(&mut self, year: AcademicYearId, now: DateTime<Utc>)
    -> StoreResult<()>;
    async fn promote_period(
        &mut self,
        id: PeriodId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Period>>;

    // Classes
    async fn insert_class(&mut self, class: &Class) -> StoreResult<()>;
    async fn class(&mut self, id: ClassId) -> StoreResult<Option<Class>>;
    /// Reads a class and holds it against concurrent writers until the
    /// transaction ends.
    async fn lock_class(&mut self, id: ClassId) -> StoreResult<Option<Class>>;
    async fn classes_for_year(&mut self, year: AcademicYearId) -> StoreResult<Vec<Class>>;
    async fn update_class(&mut self, class: &Class) -> StoreResult<()>;

    // Subjects
    async fn insert_subject(&mut self, subject: &Subject) -> StoreResult<()>;
    async fn subject(&mut self, id: SubjectId) -> StoreResult<Option<Subject>>;
    async fn subjects(&mut self) -> StoreResult<Vec<Subject>>;

    // People
    async fn insert_profile(&mut self, profile: &Profile) -> StoreResult<()>;
    async fn profile(&mut self, id: ProfileId) -> StoreResult<Option<Profile>>;
    async fn insert_teacher(&mut self, teacher: &Teacher) -> StoreResult<()>;
    async fn teacher(&mut self, id: TeacherId) -> StoreResult<Option<Teacher>>;
    async fn teachers(&mut self) -> StoreResult<Vec<Teacher>>;
    async fn insert_student(&mut self, student: &Student) -> StoreResult<()>;
    async fn student(&mut self, id: StudentId) -> StoreResult<Option<Student>>;
    async fn students(&mut self) -> StoreResult<Vec<Student>>;

    // Curriculum
    async fn insert_class_subject(&mut self, row: &ClassSubject) -> StoreResult<()>;
    async fn class_subject(&mut self, id: ClassSubjectId) -> StoreResult<Option<ClassSubject>>;
    /// Every assignment row, in any period, of `subject` to `class`.
    async fn class_subjects(
        &mut self,
        class: ClassId,
        subject: SubjectId,
    ) -> StoreResult<Vec<ClassSubject>>;
    async fn class_subjects_for_class(&mut self, class: ClassId) -> StoreResult<Vec<ClassSubject>>;

    // Timetable
    async fn insert_schedule(&mut self, slot: &Schedule) -> StoreResult<()>;
    /// Slots of every assignment of `class`, by weekday then start time.
    async fn schedules_for_class(&mut self, class: ClassId) -> StoreResult<Vec<Schedule>>;
    /// Slots whose assignment resolves to `teacher`, either named on the
    /// assignment or as the subject's default teacher.
    async fn schedules_for_teacher(&mut self, teacher: TeacherId) -> StoreResult<Vec<Schedule>>;

    // Enrollments
    async fn insert_enrollment(&mut self, enrollment: &Enrollment) -> StoreResult<()>;
    async fn enrollment(&mut self, id: EnrollmentId) -> StoreResult<Option<Enrollment>>;
    async fn enrollments_for_student(&mut self, student: StudentId)
    -> StoreResult<Vec<Enrollment>>;
    async fn enrollments_for_class(&mut self, class: ClassId) -> StoreResult<Vec<Enrollment>>;
    async fn has_enrollment(
        &mut self,
        student: StudentId,
        year: AcademicYearId,
    ) -> StoreResult<bool>;
    /// Enrollments in `class` whose status holds a seat.
    async fn count_seated_enrollments(&mut self, class: ClassId) -> StoreResult<i64>;
    async fn set_enrollment_status(
        &mut self,
        id: EnrollmentId,
        status: EnrollmentStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Enrollment>>;
    /// Points the enrollment at `to` and marks it transferred.
    async fn transfer_enrollment(
        &mut self,
        id: EnrollmentId,
        to: ClassId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Enrollment>>;
    async fn insert_enrollment_transfer(&mut self, transfer: &EnrollmentTransfer)
    -> StoreResult<()>;
    async fn transfers_for_enrollment(
        &mut self,
        enrollment: EnrollmentId,
    ) -> StoreResult<Vec<EnrollmentTransfer>>;

    // Grades
    async fn insert_grade(&mut self, grade: &Grade) -> StoreResult<()>;
    async fn grades_for_enrollment(&mut self, enrollment: EnrollmentId) -> StoreResult<Vec<Grade>>;

    // Attendance
    async fn insert_attendance(&mut self, record: &Attendance) -> StoreResult<()>;
    async fn attendance_exists(
        &mut self,
        enrollment: EnrollmentId,
        subject: SubjectId,
        date: NaiveDate,
    ) -> StoreResult<bool>;
    async fn attendance_for_enrollment(
        &mut self,
        enrollment: EnrollmentId,
    ) -> StoreResult<Vec<Attendance>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

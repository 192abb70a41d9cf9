//! PostgreSQL store.
//!
//! Each transaction runs at `SERIALIZABLE` isolation. Capacity checks also
//! take a row lock on the class (`SELECT ... FOR UPDATE`), so concurrent
//! enrollments into one class queue behind each other instead of failing
//! late with a serialization error.

use crate::store::{Store, StoreResult, StoreTx};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use registrar_core::StoreError;
use registrar_models::{
    AcademicYear, AcademicYearId, Attendance, Class, ClassId, ClassSubject, ClassSubjectId,
    Enrollment, EnrollmentId, EnrollmentStatus, EnrollmentTransfer, Grade, Period, PeriodId,
    Profile, ProfileId, Schedule, Student, StudentId, Subject, SubjectId, Teacher, TeacherId,
};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

macro_rules! year_columns {
    () => {
        "id, start_date, end_date, is_current, created_at, updated_at"
    };
}

macro_rules! period_columns {
    () => {
        "id, name, academic_year_id, start_date, end_date, is_current, created_at, updated_at"
    };
}

macro_rules! class_columns {
    () => {
        "id, name, level, capacity, academic_year_id, created_at, updated_at"
    };
}

macro_rules! subject_columns {
    () => {
        "id, name, code, description, coefficient, default_teacher_id, is_active, created_at, updated_at"
    };
}

macro_rules! profile_columns {
    () => {
        "id, first_name, last_name, email, role, phone, gender, birth_date, address, created_at, updated_at"
    };
}

macro_rules! teacher_columns {
    () => {
        "id, profile_id, specialty, employee_id, hire_date, is_active, created_at, updated_at"
    };
}

macro_rules! student_columns {
    () => {
        "id, profile_id, student_number, date_of_birth, is_active, created_at, updated_at"
    };
}

macro_rules! class_subject_columns {
    () => {
        "id, class_id, subject_id, teacher_id, period_id, is_active, created_at, updated_at"
    };
}

macro_rules! enrollment_columns {
    () => {
        "id, student_id, class_id, academic_year_id, enrollment_date, status, created_at, updated_at"
    };
}

macro_rules! transfer_columns {
    () => {
        "id, enrollment_id, from_class_id, to_class_id, effective_date, created_at"
    };
}

macro_rules! grade_columns {
    () => {
        "id, enrollment_id, subject_id, period_id, value, max_value, grade_type, grade_date, coefficient, comment, created_at, updated_at"
    };
}

macro_rules! attendance_columns {
    () => {
        "id, enrollment_id, teacher_id, subject_id, date, status, reason, created_at, updated_at"
    };
}

/// Translates a driver error into the store's error vocabulary.
pub(crate) fn pg_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::unique(db_err.constraint().unwrap_or("unknown"));
        }
        // serialization_failure, deadlock_detected
        if matches!(db_err.code().as_deref(), Some("40001") | Some("40P01")) {
            return StoreError::SerializationFailure;
        }
    }
    StoreError::Backend(Box::new(err))
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    #[instrument(skip(self))]
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let mut tx = self.pool.begin().await.map_err(pg_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(pg_error)?;
        Ok(Box::new(PgTx { tx }))
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn insert_academic_year(&mut self, year: &AcademicYear) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO academic_years (id, start_date, end_date, is_current, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(year.id)
        .bind(year.start_date)
        .bind(year.end_date)
        .bind(year.is_current)
        .bind(year.created_at)
        .bind(year.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn academic_year(&mut self, id: AcademicYearId) -> StoreResult<Option<AcademicYear>> {
        sqlx::query_as::<_, AcademicYear>(concat!(
            "SELECT ",
            year_columns!(),
            " FROM academic_years WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn academic_years(&mut self) -> StoreResult<Vec<AcademicYear>> {
        sqlx::query_as::<_, AcademicYear>(concat!(
            "SELECT ",
            year_columns!(),
            " FROM academic_years ORDER BY start_date DESC"
        ))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn current_academic_year(&mut self) -> StoreResult<Option<AcademicYear>> {
        sqlx::query_as::<_, AcademicYear>(concat!(
            "SELECT ",
            year_columns!(),
            " FROM academic_years WHERE is_current"
        ))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn demote_academic_years(&mut self, now: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE academic_years SET is_current = FALSE, updated_at = $1 WHERE is_current")
            .bind(now)
            .execute(&mut *self.tx)
            .await
            .map_err(pg_error)?;
        Ok(())
    }

    async fn promote_academic_year(
        &mut self,
        id: AcademicYearId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<AcademicYear>> {
        sqlx::query_as::<_, AcademicYear>(concat!(
            "UPDATE academic_years SET is_current = TRUE, updated_at = $2 WHERE id = $1 RETURNING ",
            year_columns!()
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn insert_period(&mut self, period: &Period) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO periods (id, name, academic_year_id, start_date, end_date, is_current, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(period.id)
        .bind(&period.name)
        .bind(period.academic_year_id)
        .bind(period.start_date)
        .bind(period.end_date)
        .bind(period.is_current)
        .bind(period.created_at)
        .bind(period.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn period(&mut self, id: PeriodId) -> StoreResult<Option<Period>> {
        sqlx::query_as::<_, Period>(concat!(
            "SELECT ",
            period_columns!(),
            " FROM periods WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn periods_for_year(&mut self, year: AcademicYearId) -> StoreResult<Vec<Period>> {
        sqlx::query_as::<_, Period>(concat!(
            "SELECT ",
            period_columns!(),
            " FROM periods WHERE academic_year_id = $1 ORDER BY start_date"
        ))
        .bind(year)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn current_period(&mut self, year: AcademicYearId) -> StoreResult<Option<Period>> {
        sqlx::query_as::<_, Period>(concat!(
            "SELECT ",
            period_columns!(),
            " FROM periods WHERE academic_year_id = $1 AND is_current"
        ))
        .bind(year)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn demote_periods(
        &mut self,
        year: AcademicYearId,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE periods SET is_current = FALSE, updated_at = $2 WHERE academic_year_id = $1 AND is_current",
        )
        .bind(year)
        .bind(now)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn promote_period(
        &mut self,
        id: PeriodId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Period>> {
        sqlx::query_as::<_, Period>(concat!(
            "UPDATE periods SET is_current = TRUE, updated_at = $2 WHERE id = $1 RETURNING ",
            period_columns!()
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn insert_class(&mut self, class: &Class) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO classes (id, name, level, capacity, academic_year_id, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(class.id)
        .bind(&class.name)
        .bind(&class.level)
        .bind(class.capacity)
        .bind(class.academic_year_id)
        .bind(class.created_at)
        .bind(class.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn class(&mut self, id: ClassId) -> StoreResult<Option<Class>> {
        sqlx::query_as::<_, Class>(concat!(
            "SELECT ",
            class_columns!(),
            " FROM classes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn lock_class(&mut self, id: ClassId) -> StoreResult<Option<Class>> {
        sqlx::query_as::<_, Class>(concat!(
            "SELECT ",
            class_columns!(),
            " FROM classes WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn classes_for_year(&mut self, year: AcademicYearId) -> StoreResult<Vec<Class>> {
        sqlx::query_as::<_, Class>(concat!(
            "SELECT ",
            class_columns!(),
            " FROM classes WHERE academic_year_id = $1 ORDER BY name"
        ))
        .bind(year)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn update_class(&mut self, class: &Class) -> StoreResult<()> {
        sqlx::query(
            "UPDATE classes SET name = $2, level = $3, capacity = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(class.id)
        .bind(&class.name)
        .bind(&class.level)
        .bind(class.capacity)
        .bind(class.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn insert_subject(&mut self, subject: &Subject) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO subjects (id, name, code, description, coefficient, default_teacher_id, is_active, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(subject.id)
        .bind(&subject.name)
        .bind(&subject.code)
        .bind(&subject.description)
        .bind(subject.coefficient)
        .bind(subject.default_teacher_id)
        .bind(subject.is_active)
        .bind(subject.created_at)
        .bind(subject.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn subject(&mut self, id: SubjectId) -> StoreResult<Option<Subject>> {
        sqlx::query_as::<_, Subject>(concat!(
            "SELECT ",
            subject_columns!(),
            " FROM subjects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn subjects(&mut self) -> StoreResult<Vec<Subject>> {
        sqlx::query_as::<_, Subject>(concat!(
            "SELECT ",
            subject_columns!(),
            " FROM subjects ORDER BY name"
        ))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn insert_profile(&mut self, profile: &Profile) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO profiles (id, first_name, last_name, email, role, phone, gender, birth_date, address, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(profile.id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.email)
        .bind(profile.role)
        .bind(&profile.phone)
        .bind(profile.gender)
        .bind(profile.birth_date)
        .bind(&profile.address)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn profile(&mut self, id: ProfileId) -> StoreResult<Option<Profile>> {
        sqlx::query_as::<_, Profile>(concat!(
            "SELECT ",
            profile_columns!(),
            " FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn insert_teacher(&mut self, teacher: &Teacher) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO teachers (id, profile_id, specialty, employee_id, hire_date, is_active, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(teacher.id)
        .bind(teacher.profile_id)
        .bind(&teacher.specialty)
        .bind(&teacher.employee_id)
        .bind(teacher.hire_date)
        .bind(teacher.is_active)
        .bind(teacher.created_at)
        .bind(teacher.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn teacher(&mut self, id: TeacherId) -> StoreResult<Option<Teacher>> {
        sqlx::query_as::<_, Teacher>(concat!(
            "SELECT ",
            teacher_columns!(),
            " FROM teachers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn teachers(&mut self) -> StoreResult<Vec<Teacher>> {
        sqlx::query_as::<_, Teacher>(concat!(
            "SELECT ",
            teacher_columns!(),
            " FROM teachers ORDER BY created_at"
        ))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn insert_student(&mut self, student: &Student) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO students (id, profile_id, student_number, date_of_birth, is_active, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(student.id)
        .bind(student.profile_id)
        .bind(&student.student_number)
        .bind(student.date_of_birth)
        .bind(student.is_active)
        .bind(student.created_at)
        .bind(student.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn student(&mut self, id: StudentId) -> StoreResult<Option<Student>> {
        sqlx::query_as::<_, Student>(concat!(
            "SELECT ",
            student_columns!(),
            " FROM students WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn students(&mut self) -> StoreResult<Vec<Student>> {
        sqlx::query_as::<_, Student>(concat!(
            "SELECT ",
            student_columns!(),
            " FROM students ORDER BY created_at"
        ))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn insert_class_subject(&mut self, row: &ClassSubject) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO class_subjects (id, class_id, subject_id, teacher_id, period_id, is_active, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(row.id)
        .bind(row.class_id)
        .bind(row.subject_id)
        .bind(row.teacher_id)
        .bind(row.period_id)
        .bind(row.is_active)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn class_subject(&mut self, id: ClassSubjectId) -> StoreResult<Option<ClassSubject>> {
        sqlx::query_as::<_, ClassSubject>(concat!(
            "SELECT ",
            class_subject_columns!(),
            " FROM class_subjects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn class_subjects(
        &mut self,
        class: ClassId,
        subject: SubjectId,
    ) -> StoreResult<Vec<ClassSubject>> {
        sqlx::query_as::<_, ClassSubject>(concat!(
            "SELECT ",
            class_subject_columns!(),
            " FROM class_subjects WHERE class_id = $1 AND subject_id = $2"
        ))
        .bind(class)
        .bind(subject)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn class_subjects_for_class(&mut self, class: ClassId) -> StoreResult<Vec<ClassSubject>> {
        sqlx::query_as::<_, ClassSubject>(concat!(
            "SELECT ",
            class_subject_columns!(),
            " FROM class_subjects WHERE class_id = $1 ORDER BY created_at"
        ))
        .bind(class)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn insert_schedule(&mut self, slot: &Schedule) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO schedules (id, class_subject_id, weekday, start_time, end_time, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(slot.id)
        .bind(slot.class_subject_id)
        .bind(slot.weekday)
        .bind(slot.start_time)
        .bind(slot.end_time)
        .bind(slot.created_at)
        .bind(slot.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn schedules_for_class(&mut self, class: ClassId) -> StoreResult<Vec<Schedule>> {
        sqlx::query_as::<_, Schedule>(
            r#"SELECT s.id, s.class_subject_id, s.weekday, s.start_time, s.end_time, s.created_at, s.updated_at
               FROM schedules s
               JOIN class_subjects cs ON cs.id = s.class_subject_id
               WHERE cs.class_id = $1
               ORDER BY s.weekday, s.start_time"#,
        )
        .bind(class)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn schedules_for_teacher(&mut self, teacher: TeacherId) -> StoreResult<Vec<Schedule>> {
        sqlx::query_as::<_, Schedule>(
            r#"SELECT s.id, s.class_subject_id, s.weekday, s.start_time, s.end_time, s.created_at, s.updated_at
               FROM schedules s
               JOIN class_subjects cs ON cs.id = s.class_subject_id
               JOIN subjects sub ON sub.id = cs.subject_id
               WHERE COALESCE(cs.teacher_id, sub.default_teacher_id) = $1
               ORDER BY s.weekday, s.start_time"#,
        )
        .bind(teacher)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn insert_enrollment(&mut self, enrollment: &Enrollment) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO enrollments (id, student_id, class_id, academic_year_id, enrollment_date, status, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(enrollment.id)
        .bind(enrollment.student_id)
        .bind(enrollment.class_id)
        .bind(enrollment.academic_year_id)
        .bind(enrollment.enrollment_date)
        .bind(enrollment.status)
        .bind(enrollment.created_at)
        .bind(enrollment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn enrollment(&mut self, id: EnrollmentId) -> StoreResult<Option<Enrollment>> {
        sqlx::query_as::<_, Enrollment>(concat!(
            "SELECT ",
            enrollment_columns!(),
            " FROM enrollments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn enrollments_for_student(
        &mut self,
        student: StudentId,
    ) -> StoreResult<Vec<Enrollment>> {
        sqlx::query_as::<_, Enrollment>(concat!(
            "SELECT ",
            enrollment_columns!(),
            " FROM enrollments WHERE student_id = $1 ORDER BY created_at"
        ))
        .bind(student)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn enrollments_for_class(&mut self, class: ClassId) -> StoreResult<Vec<Enrollment>> {
        sqlx::query_as::<_, Enrollment>(concat!(
            "SELECT ",
            enrollment_columns!(),
            " FROM enrollments WHERE class_id = $1 ORDER BY created_at"
        ))
        .bind(class)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn has_enrollment(
        &mut self,
        student: StudentId,
        year: AcademicYearId,
    ) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE student_id = $1 AND academic_year_id = $2)",
        )
        .bind(student)
        .bind(year)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn count_seated_enrollments(&mut self, class: ClassId) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM enrollments WHERE class_id = $1 AND status IN ('active', 'transferred')",
        )
        .bind(class)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn set_enrollment_status(
        &mut self,
        id: EnrollmentId,
        status: EnrollmentStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Enrollment>> {
        sqlx::query_as::<_, Enrollment>(concat!(
            "UPDATE enrollments SET status = $2, updated_at = $3 WHERE id = $1 RETURNING ",
            enrollment_columns!()
        ))
        .bind(id)
        .bind(status)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn transfer_enrollment(
        &mut self,
        id: EnrollmentId,
        to: ClassId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Enrollment>> {
        sqlx::query_as::<_, Enrollment>(concat!(
            "UPDATE enrollments SET class_id = $2, status = 'transferred', updated_at = $3 WHERE id = $1 RETURNING ",
            enrollment_columns!()
        ))
        .bind(id)
        .bind(to)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn insert_enrollment_transfer(
        &mut self,
        transfer: &EnrollmentTransfer,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO enrollment_transfers (id, enrollment_id, from_class_id, to_class_id, effective_date, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(transfer.id)
        .bind(transfer.enrollment_id)
        .bind(transfer.from_class_id)
        .bind(transfer.to_class_id)
        .bind(transfer.effective_date)
        .bind(transfer.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn transfers_for_enrollment(
        &mut self,
        enrollment: EnrollmentId,
    ) -> StoreResult<Vec<EnrollmentTransfer>> {
        sqlx::query_as::<_, EnrollmentTransfer>(concat!(
            "SELECT ",
            transfer_columns!(),
            " FROM enrollment_transfers WHERE enrollment_id = $1 ORDER BY created_at"
        ))
        .bind(enrollment)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn insert_grade(&mut self, grade: &Grade) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO grades (id, enrollment_id, subject_id, period_id, value, max_value, grade_type, grade_date, coefficient, comment, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(grade.id)
        .bind(grade.enrollment_id)
        .bind(grade.subject_id)
        .bind(grade.period_id)
        .bind(grade.value)
        .bind(grade.max_value)
        .bind(grade.grade_type)
        .bind(grade.grade_date)
        .bind(grade.coefficient)
        .bind(&grade.comment)
        .bind(grade.created_at)
        .bind(grade.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn grades_for_enrollment(&mut self, enrollment: EnrollmentId) -> StoreResult<Vec<Grade>> {
        sqlx::query_as::<_, Grade>(concat!(
            "SELECT ",
            grade_columns!(),
            " FROM grades WHERE enrollment_id = $1 ORDER BY grade_date"
        ))
        .bind(enrollment)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn insert_attendance(&mut self, record: &Attendance) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO attendance (id, enrollment_id, teacher_id, subject_id, date, status, reason, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(record.id)
        .bind(record.enrollment_id)
        .bind(record.teacher_id)
        .bind(record.subject_id)
        .bind(record.date)
        .bind(record.status)
        .bind(&record.reason)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(pg_error)?;
        Ok(())
    }

    async fn attendance_exists(
        &mut self,
        enrollment: EnrollmentId,
        subject: SubjectId,
        date: NaiveDate,
    ) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM attendance WHERE enrollment_id = $1 AND subject_id = $2 AND date = $3)",
        )
        .bind(enrollment)
        .bind(subject)
        .bind(date)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn attendance_for_enrollment(
        &mut self,
        enrollment: EnrollmentId,
    ) -> StoreResult<Vec<Attendance>> {
        sqlx::query_as::<_, Attendance>(concat!(
            "SELECT ",
            attendance_columns!(),
            " FROM attendance WHERE enrollment_id = $1 ORDER BY date"
        ))
        .bind(enrollment)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(pg_error)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(pg_error)
    }
}

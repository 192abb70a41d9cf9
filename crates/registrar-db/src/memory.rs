//! Embedded in-memory store.
//!
//! A transaction takes the store's async mutex for its whole lifetime and
//! works on a private copy of the state. `commit` swaps the copy in, so a
//! dropped or failed transaction leaves the state untouched and concurrent
//! transactions run strictly one after another.

use crate::constraints;
use crate::store::{Store, StoreResult, StoreTx};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use registrar_core::StoreError;
use registrar_models::{
    AcademicYear, AcademicYearId, Attendance, Class, ClassId, ClassSubject, ClassSubjectId,
    Enrollment, EnrollmentId, EnrollmentStatus, EnrollmentTransfer, Grade, Period, PeriodId,
    Profile, ProfileId, Schedule, Student, StudentId, Subject, SubjectId, Teacher, TeacherId,
};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    academic_years: Vec<AcademicYear>,
    periods: Vec<Period>,
    classes: Vec<Class>,
    subjects: Vec<Subject>,
    profiles: Vec<Profile>,
    teachers: Vec<Teacher>,
    students: Vec<Student>,
    class_subjects: Vec<ClassSubject>,
    schedules: Vec<Schedule>,
    enrollments: Vec<Enrollment>,
    enrollment_transfers: Vec<EnrollmentTransfer>,
    grades: Vec<Grade>,
    attendance: Vec<Attendance>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

fn reject_if(taken: bool, constraint: &str) -> StoreResult<()> {
    if taken {
        Err(StoreError::unique(constraint))
    } else {
        Ok(())
    }
}

fn find<T: Clone>(rows: &[T], pred: impl Fn(&T) -> bool) -> Option<T> {
    rows.iter().find(|row| pred(row)).cloned()
}

fn filter<T: Clone>(rows: &[T], pred: impl Fn(&T) -> bool) -> Vec<T> {
    rows.iter().filter(|row| pred(row)).cloned().collect()
}

fn sorted_slots(mut slots: Vec<Schedule>) -> Vec<Schedule> {
    slots.sort_by_key(|s| (s.weekday, s.start_time));
    slots
}

impl MemoryState {
    fn teacher_of(&self, row: &ClassSubject) -> Option<TeacherId> {
        row.teacher_id.or_else(|| {
            self.subjects
                .iter()
                .find(|s| s.id == row.subject_id)
                .and_then(|s| s.default_teacher_id)
        })
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_academic_year(&mut self, year: &AcademicYear) -> StoreResult<()> {
        reject_if(
            year.is_current && self.work.academic_years.iter().any(|y| y.is_current),
            constraints::ACADEMIC_YEARS_ONE_CURRENT,
        )?;
        self.work.academic_years.push(year.clone());
        Ok(())
    }

    async fn academic_year(&mut self, id: AcademicYearId) -> StoreResult<Option<AcademicYear>> {
        Ok(find(&self.work.academic_years, |y| y.id == id))
    }

    async fn academic_years(&mut self) -> StoreResult<Vec<AcademicYear>> {
        let mut years = self.work.academic_years.clone();
        years.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(years)
    }

    async fn current_academic_year(&mut self) -> StoreResult<Option<AcademicYear>> {
        Ok(find(&self.work.academic_years, |y| y.is_current))
    }

    async fn demote_academic_years(&mut self, now: DateTime<Utc>) -> StoreResult<()> {
        for year in self.work.academic_years.iter_mut().filter(|y| y.is_current) {
            year.is_current = false;
            year.updated_at = now;
        }
        Ok(())
    }

    async fn promote_academic_year(
        &mut self,
        id: AcademicYearId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<AcademicYear>> {
        reject_if(
            self.work
                .academic_years
                .iter()
                .any(|y| y.is_current && y.id != id),
            constraints::ACADEMIC_YEARS_ONE_CURRENT,
        )?;
        Ok(self
            .work
            .academic_years
            .iter_mut()
            .find(|y| y.id == id)
            .map(|year| {
                year.is_current = true;
                year.updated_at = now;
                year.clone()
            }))
    }

    async fn insert_period(&mut self, period: &Period) -> StoreResult<()> {
        reject_if(
            period.is_current
                && self
                    .work
                    .periods
                    .iter()
                    .any(|p| p.is_current && p.academic_year_id == period.academic_year_id),
            constraints::PERIODS_ONE_CURRENT_PER_YEAR,
        )?;
        self.work.periods.push(period.clone());
        Ok(())
    }

    async fn period(&mut self, id: PeriodId) -> StoreResult<Option<Period>> {
        Ok(find(&self.work.periods, |p| p.id == id))
    }

    async fn periods_for_year(&mut self, year: AcademicYearId) -> StoreResult<Vec<Period>> {
        let mut periods = filter(&self.work.periods, |p| p.academic_year_id == year);
        periods.sort_by_key(|p| p.start_date);
        Ok(periods)
    }

    async fn current_period(&mut self, year: AcademicYearId) -> StoreResult<Option<Period>> {
        Ok(find(&self.work.periods, |p| {
            p.academic_year_id == year && p.is_current
        }))
    }

    async fn demote_periods(
        &mut self,
        year: AcademicYearId,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        for period in self
            .work
            .periods
            .iter_mut()
            .filter(|p| p.academic_year_id == year && p.is_current)
        {
            period.is_current = false;
            period.updated_at = now;
        }
        Ok(())
    }

    async fn promote_period(
        &mut self,
        id: PeriodId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Period>> {
        let Some(year) = self
            .work
            .periods
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.academic_year_id)
        else {
            return Ok(None);
        };
        reject_if(
            self.work
                .periods
                .iter()
                .any(|p| p.academic_year_id == year && p.is_current && p.id != id),
            constraints::PERIODS_ONE_CURRENT_PER_YEAR,
        )?;
        Ok(self
            .work
            .periods
            .iter_mut()
            .find(|p| p.id == id)
            .map(|period| {
                period.is_current = true;
                period.updated_at = now;
                period.clone()
            }))
    }

    async fn insert_class(&mut self, class: &Class) -> StoreResult<()> {
        reject_if(
            self.work.classes.iter().any(|c| {
                c.academic_year_id == class.academic_year_id && c.name == class.name
            }),
            constraints::CLASSES_NAME_YEAR,
        )?;
        self.work.classes.push(class.clone());
        Ok(())
    }

    async fn class(&mut self, id: ClassId) -> StoreResult<Option<Class>> {
        Ok(find(&self.work.classes, |c| c.id == id))
    }

    async fn lock_class(&mut self, id: ClassId) -> StoreResult<Option<Class>> {
        // The transaction already holds the whole state exclusively.
        self.class(id).await
    }

    async fn classes_for_year(&mut self, year: AcademicYearId) -> StoreResult<Vec<Class>> {
        let mut classes = filter(&self.work.classes, |c| c.academic_year_id == year);
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(classes)
    }

    async fn update_class(&mut self, class: &Class) -> StoreResult<()> {
        reject_if(
            self.work.classes.iter().any(|c| {
                c.id != class.id
                    && c.academic_year_id == class.academic_year_id
                    && c.name == class.name
            }),
            constraints::CLASSES_NAME_YEAR,
        )?;
        if let Some(existing) = self.work.classes.iter_mut().find(|c| c.id == class.id) {
            *existing = class.clone();
        }
        Ok(())
    }

    async fn insert_subject(&mut self, subject: &Subject) -> StoreResult<()> {
        reject_if(
            self.work.subjects.iter().any(|s| s.name == subject.name),
            constraints::SUBJECTS_NAME,
        )?;
        reject_if(
            self.work.subjects.iter().any(|s| s.code == subject.code),
            constraints::SUBJECTS_CODE,
        )?;
        self.work.subjects.push(subject.clone());
        Ok(())
    }

    async fn subject(&mut self, id: SubjectId) -> StoreResult<Option<Subject>> {
        Ok(find(&self.work.subjects, |s| s.id == id))
    }

    async fn subjects(&mut self) -> StoreResult<Vec<Subject>> {
        let mut subjects = self.work.subjects.clone();
        subjects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subjects)
    }

    async fn insert_profile(&mut self, profile: &Profile) -> StoreResult<()> {
        reject_if(
            self.work.profiles.iter().any(|p| p.email == profile.email),
            constraints::PROFILES_EMAIL,
        )?;
        self.work.profiles.push(profile.clone());
        Ok(())
    }

    async fn profile(&mut self, id: ProfileId) -> StoreResult<Option<Profile>> {
        Ok(find(&self.work.profiles, |p| p.id == id))
    }

    async fn insert_teacher(&mut self, teacher: &Teacher) -> StoreResult<()> {
        reject_if(
            self.work
                .teachers
                .iter()
                .any(|t| t.employee_id == teacher.employee_id),
            constraints::TEACHERS_EMPLOYEE_ID,
        )?;
        self.work.teachers.push(teacher.clone());
        Ok(())
    }

    async fn teacher(&mut self, id: TeacherId) -> StoreResult<Option<Teacher>> {
        Ok(find(&self.work.teachers, |t| t.id == id))
    }

    async fn teachers(&mut self) -> StoreResult<Vec<Teacher>> {
        Ok(self.work.teachers.clone())
    }

    async fn insert_student(&mut self, student: &Student) -> StoreResult<()> {
        reject_if(
            self.work
                .students
                .iter()
                .any(|s| s.student_number == student.student_number),
            constraints::STUDENTS_STUDENT_NUMBER,
        )?;
        self.work.students.push(student.clone());
        Ok(())
    }

    async fn student(&mut self, id: StudentId) -> StoreResult<Option<Student>> {
        Ok(find(&self.work.students, |s| s.id == id))
    }

    async fn students(&mut self) -> StoreResult<Vec<Student>> {
        Ok(self.work.students.clone())
    }

    async fn insert_class_subject(&mut self, row: &ClassSubject) -> StoreResult<()> {
        reject_if(
            self.work.class_subjects.iter().any(|cs| {
                cs.class_id == row.class_id
                    && cs.subject_id == row.subject_id
                    && cs.period_id == row.period_id
            }),
            constraints::CLASS_SUBJECTS_CLASS_SUBJECT_PERIOD,
        )?;
        self.work.class_subjects.push(row.clone());
        Ok(())
    }

    async fn class_subject(&mut self, id: ClassSubjectId) -> StoreResult<Option<ClassSubject>> {
        Ok(find(&self.work.class_subjects, |cs| cs.id == id))
    }

    async fn class_subjects(
        &mut self,
        class: ClassId,
        subject: SubjectId,
    ) -> StoreResult<Vec<ClassSubject>> {
        Ok(filter(&self.work.class_subjects, |cs| {
            cs.class_id == class && cs.subject_id == subject
        }))
    }

    async fn class_subjects_for_class(&mut self, class: ClassId) -> StoreResult<Vec<ClassSubject>> {
        Ok(filter(&self.work.class_subjects, |cs| cs.class_id == class))
    }

    async fn insert_schedule(&mut self, slot: &Schedule) -> StoreResult<()> {
        self.work.schedules.push(slot.clone());
        Ok(())
    }

    async fn schedules_for_class(&mut self, class: ClassId) -> StoreResult<Vec<Schedule>> {
        let state = &self.work;
        let slots = filter(&state.schedules, |slot| {
            state
                .class_subjects
                .iter()
                .any(|cs| cs.id == slot.class_subject_id && cs.class_id == class)
        });
        Ok(sorted_slots(slots))
    }

    async fn schedules_for_teacher(&mut self, teacher: TeacherId) -> StoreResult<Vec<Schedule>> {
        let state = &self.work;
        let slots = filter(&state.schedules, |slot| {
            state
                .class_subjects
                .iter()
                .find(|cs| cs.id == slot.class_subject_id)
                .is_some_and(|cs| state.teacher_of(cs) == Some(teacher))
        });
        Ok(sorted_slots(slots))
    }

    async fn insert_enrollment(&mut self, enrollment: &Enrollment) -> StoreResult<()> {
        reject_if(
            self.work.enrollments.iter().any(|e| {
                e.student_id == enrollment.student_id
                    && e.academic_year_id == enrollment.academic_year_id
            }),
            constraints::ENROLLMENTS_STUDENT_YEAR,
        )?;
        self.work.enrollments.push(enrollment.clone());
        Ok(())
    }

    async fn enrollment(&mut self, id: EnrollmentId) -> StoreResult<Option<Enrollment>> {
        Ok(find(&self.work.enrollments, |e| e.id == id))
    }

    async fn enrollments_for_student(
        &mut self,
        student: StudentId,
    ) -> StoreResult<Vec<Enrollment>> {
        Ok(filter(&self.work.enrollments, |e| e.student_id == student))
    }

    async fn enrollments_for_class(&mut self, class: ClassId) -> StoreResult<Vec<Enrollment>> {
        Ok(filter(&self.work.enrollments, |e| e.class_id == class))
    }

    async fn has_enrollment(
        &mut self,
        student: StudentId,
        year: AcademicYearId,
    ) -> StoreResult<bool> {
        Ok(self
            .work
            .enrollments
            .iter()
            .any(|e| e.student_id == student && e.academic_year_id == year))
    }

    async fn count_seated_enrollments(&mut self, class: ClassId) -> StoreResult<i64> {
        Ok(self
            .work
            .enrollments
            .iter()
            .filter(|e| e.class_id == class && e.holds_seat())
            .count() as i64)
    }

    async fn set_enrollment_status(
        &mut self,
        id: EnrollmentId,
        status: EnrollmentStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Enrollment>> {
        Ok(self
            .work
            .enrollments
            .iter_mut()
            .find(|e| e.id == id)
            .map(|enrollment| {
                enrollment.status = status;
                enrollment.updated_at = now;
                enrollment.clone()
            }))
    }

    async fn transfer_enrollment(
        &mut self,
        id: EnrollmentId,
        to: ClassId,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Enrollment>> {
        Ok(self
            .work
            .enrollments
            .iter_mut()
            .find(|e| e.id == id)
            .map(|enrollment| {
                enrollment.class_id = to;
                enrollment.status = EnrollmentStatus::Transferred;
                enrollment.updated_at = now;
                enrollment.clone()
            }))
    }

    async fn insert_enrollment_transfer(
        &mut self,
        transfer: &EnrollmentTransfer,
    ) -> StoreResult<()> {
        self.work.enrollment_transfers.push(transfer.clone());
        Ok(())
    }

    async fn transfers_for_enrollment(
        &mut self,
        enrollment: EnrollmentId,
    ) -> StoreResult<Vec<EnrollmentTransfer>> {
        let mut transfers = filter(&self.work.enrollment_transfers, |t| {
            t.enrollment_id == enrollment
        });
        transfers.sort_by_key(|t| t.created_at);
        Ok(transfers)
    }

    async fn insert_grade(&mut self, grade: &Grade) -> StoreResult<()> {
        self.work.grades.push(grade.clone());
        Ok(())
    }

    async fn grades_for_enrollment(&mut self, enrollment: EnrollmentId) -> StoreResult<Vec<Grade>> {
        let mut grades = filter(&self.work.grades, |g| g.enrollment_id == enrollment);
        grades.sort_by_key(|g| g.grade_date);
        Ok(grades)
    }

    async fn insert_attendance(&mut self, record: &Attendance) -> StoreResult<()> {
        reject_if(
            self.work.attendance.iter().any(|a| {
                a.enrollment_id == record.enrollment_id
                    && a.subject_id == record.subject_id
                    && a.date == record.date
            }),
            constraints::ATTENDANCE_ENROLLMENT_SUBJECT_DATE,
        )?;
        self.work.attendance.push(record.clone());
        Ok(())
    }

    async fn attendance_exists(
        &mut self,
        enrollment: EnrollmentId,
        subject: SubjectId,
        date: NaiveDate,
    ) -> StoreResult<bool> {
        Ok(self.work.attendance.iter().any(|a| {
            a.enrollment_id == enrollment && a.subject_id == subject && a.date == date
        }))
    }

    async fn attendance_for_enrollment(
        &mut self,
        enrollment: EnrollmentId,
    ) -> StoreResult<Vec<Attendance>> {
        let mut records = filter(&self.work.attendance, |a| a.enrollment_id == enrollment);
        records.sort_by_key(|a| a.date);
        Ok(records)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

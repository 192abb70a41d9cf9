//! Curriculum Assignment Index.
//!
//! A `ClassSubject` row with no period applies to every period of the
//! class's year. Such a row conflicts with any period-specific row for the
//! same class and subject, and the other way round.
//!
//! Timetable slots hang off those rows. Two slots clash when they share a
//! weekday, their times overlap and their rows can be live in the same
//! period; a clash counts for the class and for the teacher the row
//! resolves to.

use chrono::Utc;
use registrar_core::{AppError, AppResult, RuleViolation};
use registrar_db::{StoreTx, constraints};
use registrar_models::{
    ClassId, ClassSubject, ClassSubjectId, CreateClassSubjectDto, CreateScheduleDto, PeriodId,
    Schedule, ScheduleId, SubjectId, TeacherId, TeacherResolution,
};
use tracing::{info, instrument};
use validator::Validate;

use crate::modules::calendar::CalendarService;
use crate::modules::classes::ClassService;
use crate::modules::people::PeopleService;
use crate::modules::subjects::SubjectService;
use crate::state::AppState;
use crate::utils::retry::{on_constraint, with_retry};

pub struct CurriculumService;

/// First slot in `slots` that clashes with the new slot for `row`.
async fn find_clash(
    tx: &mut dyn StoreTx,
    slots: Vec<Schedule>,
    row: &ClassSubject,
    dto: &CreateScheduleDto,
) -> AppResult<Option<Schedule>> {
    for slot in slots {
        if !slot.overlaps(dto.weekday, dto.start_time, dto.end_time) {
            continue;
        }
        let other = tx
            .class_subject(slot.class_subject_id)
            .await?
            .ok_or_else(|| AppError::not_found("Class subject", slot.class_subject_id))?;
        if other.collides_with(row.period_id) {
            return Ok(Some(slot));
        }
    }
    Ok(None)
}

impl CurriculumService {
    pub(crate) async fn require_class_subject(
        tx: &mut dyn StoreTx,
        id: ClassSubjectId,
    ) -> AppResult<ClassSubject> {
        tx.class_subject(id)
            .await?
            .ok_or_else(|| AppError::not_found("Class subject", id))
    }

    /// True when a row exists for exactly `period`, or for all periods.
    pub(crate) async fn is_assigned_in(
        tx: &mut dyn StoreTx,
        class: ClassId,
        subject: SubjectId,
        period: Option<PeriodId>,
    ) -> AppResult<bool> {
        let rows = tx.class_subjects(class, subject).await?;
        Ok(rows.iter().any(|row| row.covers(period)))
    }

    #[instrument(skip(state))]
    pub async fn assign(state: &AppState, dto: CreateClassSubjectDto) -> AppResult<ClassSubject> {
        dto.validate()?;

        let dto = &dto;
        with_retry(&state.transactions, "assign_subject", || async move {
            let mut tx = state.begin().await?;
            let class = ClassService::require_class(tx.as_mut(), dto.class_id).await?;
            SubjectService::require_subject(tx.as_mut(), dto.subject_id).await?;
            if let Some(teacher_id) = dto.teacher_id {
                PeopleService::require_teacher(tx.as_mut(), teacher_id).await?;
            }
            if let Some(period_id) = dto.period_id {
                let period = CalendarService::require_period(tx.as_mut(), period_id).await?;
                if period.academic_year_id != class.academic_year_id {
                    return Err(RuleViolation::PeriodYearMismatch {
                        period_id: period_id.into_inner(),
                        period_year_id: period.academic_year_id.into_inner(),
                        expected_year_id: class.academic_year_id.into_inner(),
                    }
                    .into());
                }
            }

            let duplicate = || -> AppError {
                RuleViolation::DuplicateAssignment {
                    class_id: dto.class_id.into_inner(),
                    subject_id: dto.subject_id.into_inner(),
                    period_id: dto.period_id.map(PeriodId::into_inner),
                }
                .into()
            };

            let existing = tx.class_subjects(dto.class_id, dto.subject_id).await?;
            if existing.iter().any(|row| row.collides_with(dto.period_id)) {
                return Err(duplicate());
            }

            let now = Utc::now();
            let row = ClassSubject {
                id: ClassSubjectId::new(),
                class_id: dto.class_id,
                subject_id: dto.subject_id,
                teacher_id: dto.teacher_id,
                period_id: dto.period_id,
                is_active: dto.is_active,
                created_at: now,
                updated_at: now,
            };
            tx.insert_class_subject(&row).await.map_err(|e| {
                on_constraint(e, constraints::CLASS_SUBJECTS_CLASS_SUBJECT_PERIOD, duplicate)
            })?;
            tx.commit().await?;

            info!(
                class_id = %row.class_id,
                subject_id = %row.subject_id,
                period_id = ?row.period_id,
                "Subject assigned to class"
            );
            Ok(row)
        })
        .await
    }

    #[instrument(skip(state))]
    pub async fn is_assigned(
        state: &AppState,
        class: ClassId,
        subject: SubjectId,
        period: Option<PeriodId>,
    ) -> AppResult<bool> {
        let mut tx = state.begin().await?;
        Self::is_assigned_in(tx.as_mut(), class, subject, period).await
    }

    /// Teacher responsible for `subject` in `class` during `period`.
    ///
    /// The period-specific row wins over the all-periods row. A row without
    /// a teacher falls back to the subject's default teacher. Without any
    /// row the subject is not taught to the class, so nobody is resolved.
    #[instrument(skip(state))]
    pub async fn teacher_of(
        state: &AppState,
        class: ClassId,
        subject: SubjectId,
        period: Option<PeriodId>,
    ) -> AppResult<TeacherResolution> {
        let mut tx = state.begin().await?;
        ClassService::require_class(tx.as_mut(), class).await?;
        let subject_row = SubjectService::require_subject(tx.as_mut(), subject).await?;

        let rows = tx.class_subjects(class, subject).await?;
        let row = rows
            .iter()
            .find(|row| period.is_some() && row.period_id == period)
            .or_else(|| rows.iter().find(|row| row.period_id.is_none()));

        Ok(match row {
            Some(row) => TeacherResolution::resolve(row.teacher_id, subject_row.default_teacher_id),
            None => TeacherResolution::UNASSIGNED,
        })
    }

    #[instrument(skip(state))]
    pub async fn assignments_for_class(
        state: &AppState,
        class: ClassId,
    ) -> AppResult<Vec<ClassSubject>> {
        let mut tx = state.begin().await?;
        ClassService::require_class(tx.as_mut(), class).await?;
        Ok(tx.class_subjects_for_class(class).await?)
    }

    /// Places an assignment on the weekly timetable.
    ///
    /// Fails with [`RuleViolation::InvalidTimeRange`] unless the slot ends
    /// after it starts, and with [`RuleViolation::ScheduleOverlap`] when the
    /// class or the resolved teacher is already busy at that time.
    #[instrument(skip(state))]
    pub async fn add_schedule(state: &AppState, dto: CreateScheduleDto) -> AppResult<Schedule> {
        dto.validate()?;
        if dto.end_time <= dto.start_time {
            return Err(RuleViolation::InvalidTimeRange {
                start: dto.start_time,
                end: dto.end_time,
            }
            .into());
        }

        let dto = &dto;
        with_retry(&state.transactions, "add_schedule", || async move {
            let mut tx = state.begin().await?;
            let row = Self::require_class_subject(tx.as_mut(), dto.class_subject_id).await?;
            let class = ClassService::lock_class(tx.as_mut(), row.class_id).await?;
            let subject = SubjectService::require_subject(tx.as_mut(), row.subject_id).await?;

            let overlap = |owner: String, slot: Schedule| -> AppError {
                RuleViolation::ScheduleOverlap {
                    owner,
                    weekday: slot.weekday.to_string(),
                    start: slot.start_time,
                    end: slot.end_time,
                }
                .into()
            };

            let class_slots = tx.schedules_for_class(class.id).await?;
            if let Some(slot) = find_clash(tx.as_mut(), class_slots, &row, dto).await? {
                return Err(overlap(format!("class {}", class.name), slot));
            }

            let teacher = TeacherResolution::resolve(row.teacher_id, subject.default_teacher_id);
            if let Some(teacher_id) = teacher.teacher_id {
                let teacher_slots = tx.schedules_for_teacher(teacher_id).await?;
                if let Some(slot) = find_clash(tx.as_mut(), teacher_slots, &row, dto).await? {
                    return Err(overlap(format!("teacher {}", teacher_id), slot));
                }
            }

            let now = Utc::now();
            let slot = Schedule {
                id: ScheduleId::new(),
                class_subject_id: row.id,
                weekday: dto.weekday,
                start_time: dto.start_time,
                end_time: dto.end_time,
                created_at: now,
                updated_at: now,
            };
            tx.insert_schedule(&slot).await?;
            tx.commit().await?;

            info!(
                class_id = %class.id,
                subject_id = %row.subject_id,
                weekday = %slot.weekday,
                start = %slot.start_time,
                end = %slot.end_time,
                "Timetable slot added"
            );
            Ok(slot)
        })
        .await
    }

    /// Weekly timetable of a class, Monday first.
    #[instrument(skip(state))]
    pub async fn class_timetable(state: &AppState, class: ClassId) -> AppResult<Vec<Schedule>> {
        let mut tx = state.begin().await?;
        ClassService::require_class(tx.as_mut(), class).await?;
        Ok(tx.schedules_for_class(class).await?)
    }

    #[instrument(skip(state))]
    pub async fn teacher_timetable(
        state: &AppState,
        teacher: TeacherId,
    ) -> AppResult<Vec<Schedule>> {
        let mut tx = state.begin().await?;
        PeopleService::require_teacher(tx.as_mut(), teacher).await?;
        Ok(tx.schedules_for_teacher(teacher).await?)
    }
}

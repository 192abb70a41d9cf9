//! Grading & Attendance Validator.
//!
//! Every grade passes the same ordered checks before it is written:
//!
//! 1. the value lies within `0..=max_value`
//! 2. the grade's period belongs to the enrollment's academic year
//! 3. the subject is taught to the enrollment's class for that period,
//!    either by a period-specific or an all-periods assignment
//!
//! Attendance is only checked for duplicates. It is not tied to the
//! curriculum the way grades are.

use chrono::Utc;
use registrar_core::{AppError, AppResult, RuleViolation};
use registrar_db::{StoreTx, constraints};
use registrar_models::grades::{overall_average, weighted_average};
use registrar_models::{
    Attendance, AttendanceId, AttendanceSummary, EnrollmentId, Grade, GradeId, GradeView,
    PeriodId, RecordAttendanceDto, RecordGradeDto, ReportCard, SubjectAverage, SubjectId,
};
use std::collections::BTreeMap;
use tracing::{info, instrument};
use validator::Validate;

use crate::modules::calendar::CalendarService;
use crate::modules::curriculum::CurriculumService;
use crate::modules::enrollments::EnrollmentService;
use crate::modules::people::PeopleService;
use crate::modules::subjects::SubjectService;
use crate::state::AppState;
use crate::utils::retry::{on_constraint, with_retry};

pub struct GradingService;

fn in_period(grade: &Grade, period: Option<PeriodId>) -> bool {
    period.is_none() || grade.period_id == period
}

fn scope(enrollment: EnrollmentId, subject: Option<SubjectId>, period: Option<PeriodId>) -> String {
    let mut scope = format!("enrollment {}", enrollment);
    if let Some(subject) = subject {
        scope.push_str(&format!(" in subject {}", subject));
    }
    if let Some(period) = period {
        scope.push_str(&format!(" during period {}", period));
    }
    scope
}

impl GradingService {
    #[instrument(skip(state))]
    pub async fn record_grade(state: &AppState, dto: RecordGradeDto) -> AppResult<GradeView> {
        dto.validate()?;
        if !(0.0..=dto.max_value).contains(&dto.value) {
            return Err(RuleViolation::OutOfRange {
                value: dto.value,
                max_value: dto.max_value,
            }
            .into());
        }

        let dto = &dto;
        with_retry(&state.transactions, "record_grade", || async move {
            let mut tx = state.begin().await?;
            let enrollment =
                EnrollmentService::require_enrollment(tx.as_mut(), dto.enrollment_id).await?;
            SubjectService::require_subject(tx.as_mut(), dto.subject_id).await?;

            if let Some(period_id) = dto.period_id {
                let period = CalendarService::require_period(tx.as_mut(), period_id).await?;
                if period.academic_year_id != enrollment.academic_year_id {
                    return Err(RuleViolation::PeriodYearMismatch {
                        period_id: period_id.into_inner(),
                        period_year_id: period.academic_year_id.into_inner(),
                        expected_year_id: enrollment.academic_year_id.into_inner(),
                    }
                    .into());
                }
            }

            let assigned = CurriculumService::is_assigned_in(
                tx.as_mut(),
                enrollment.class_id,
                dto.subject_id,
                dto.period_id,
            )
            .await?;
            if !assigned {
                return Err(RuleViolation::UnassignedSubject {
                    class_id: enrollment.class_id.into_inner(),
                    subject_id: dto.subject_id.into_inner(),
                    period_id: dto.period_id.map(PeriodId::into_inner),
                }
                .into());
            }

            let now = Utc::now();
            let grade = Grade {
                id: GradeId::new(),
                enrollment_id: dto.enrollment_id,
                subject_id: dto.subject_id,
                period_id: dto.period_id,
                value: dto.value,
                max_value: dto.max_value,
                grade_type: dto.grade_type,
                grade_date: dto.grade_date.unwrap_or_else(|| now.date_naive()),
                coefficient: dto.coefficient,
                comment: dto.comment.clone(),
                created_at: now,
                updated_at: now,
            };
            tx.insert_grade(&grade).await?;
            tx.commit().await?;

            info!(
                grade_id = %grade.id,
                enrollment_id = %grade.enrollment_id,
                subject_id = %grade.subject_id,
                "Grade recorded"
            );
            Ok(grade.view())
        })
        .await
    }

    #[instrument(skip(state))]
    pub async fn record_attendance(
        state: &AppState,
        dto: RecordAttendanceDto,
    ) -> AppResult<Attendance> {
        dto.validate()?;

        let dto = &dto;
        with_retry(&state.transactions, "record_attendance", || async move {
            let mut tx = state.begin().await?;
            EnrollmentService::require_enrollment(tx.as_mut(), dto.enrollment_id).await?;
            PeopleService::require_teacher(tx.as_mut(), dto.teacher_id).await?;
            SubjectService::require_subject(tx.as_mut(), dto.subject_id).await?;

            let duplicate = || -> AppError {
                RuleViolation::DuplicateAttendance {
                    enrollment_id: dto.enrollment_id.into_inner(),
                    subject_id: dto.subject_id.into_inner(),
                    date: dto.date,
                }
                .into()
            };

            if tx
                .attendance_exists(dto.enrollment_id, dto.subject_id, dto.date)
                .await?
            {
                return Err(duplicate());
            }

            let now = Utc::now();
            let record = Attendance {
                id: AttendanceId::new(),
                enrollment_id: dto.enrollment_id,
                teacher_id: dto.teacher_id,
                subject_id: dto.subject_id,
                date: dto.date,
                status: dto.status,
                reason: dto.reason.clone(),
                created_at: now,
                updated_at: now,
            };
            tx.insert_attendance(&record).await.map_err(|e| {
                on_constraint(e, constraints::ATTENDANCE_ENROLLMENT_SUBJECT_DATE, duplicate)
            })?;
            tx.commit().await?;

            info!(attendance_id = %record.id, status = ?record.status, "Attendance recorded");
            Ok(record)
        })
        .await
    }

    async fn grades_in(
        tx: &mut dyn StoreTx,
        enrollment: EnrollmentId,
    ) -> AppResult<Vec<Grade>> {
        EnrollmentService::require_enrollment(tx, enrollment).await?;
        Ok(tx.grades_for_enrollment(enrollment).await?)
    }

    #[instrument(skip(state))]
    pub async fn grades_for_enrollment(
        state: &AppState,
        enrollment: EnrollmentId,
    ) -> AppResult<Vec<GradeView>> {
        let mut tx = state.begin().await?;
        let grades = Self::grades_in(tx.as_mut(), enrollment).await?;
        Ok(grades.into_iter().map(GradeView::from).collect())
    }

    /// Weighted average, on 20 points, of one subject. `None` as period
    /// averages over the whole year.
    #[instrument(skip(state))]
    pub async fn average_for_subject(
        state: &AppState,
        enrollment: EnrollmentId,
        subject: SubjectId,
        period: Option<PeriodId>,
    ) -> AppResult<f64> {
        let mut tx = state.begin().await?;
        let grades = Self::grades_in(tx.as_mut(), enrollment).await?;

        weighted_average(
            grades
                .iter()
                .filter(|g| g.subject_id == subject && in_period(g, period)),
        )
        .ok_or_else(|| RuleViolation::NoData(scope(enrollment, Some(subject), period)).into())
    }

    /// Per-subject averages weighted by grade coefficients, combined into an
    /// overall average weighted by subject coefficients.
    #[instrument(skip(state))]
    pub async fn report_card(
        state: &AppState,
        enrollment: EnrollmentId,
        period: Option<PeriodId>,
    ) -> AppResult<ReportCard> {
        let mut tx = state.begin().await?;
        let grades = Self::grades_in(tx.as_mut(), enrollment).await?;

        let mut by_subject: BTreeMap<SubjectId, Vec<&Grade>> = BTreeMap::new();
        for grade in grades.iter().filter(|g| in_period(g, period)) {
            by_subject.entry(grade.subject_id).or_default().push(grade);
        }

        let mut subjects = Vec::with_capacity(by_subject.len());
        for (subject_id, grades) in by_subject {
            let Some(average) = weighted_average(grades.iter().copied()) else {
                continue;
            };
            let subject = SubjectService::require_subject(tx.as_mut(), subject_id).await?;
            subjects.push(SubjectAverage {
                subject_id,
                subject_name: subject.name,
                coefficient: subject.coefficient,
                average,
                grade_count: grades.len(),
            });
        }
        subjects.sort_by(|a, b| a.subject_name.cmp(&b.subject_name));

        let overall = overall_average(&subjects)
            .ok_or_else(|| AppError::from(RuleViolation::NoData(scope(enrollment, None, period))))?;

        Ok(ReportCard {
            enrollment_id: enrollment,
            period_id: period,
            subjects,
            overall_average: overall,
        })
    }

    #[instrument(skip(state))]
    pub async fn overall_average(
        state: &AppState,
        enrollment: EnrollmentId,
        period: Option<PeriodId>,
    ) -> AppResult<f64> {
        Ok(Self::report_card(state, enrollment, period)
            .await?
            .overall_average)
    }

    #[instrument(skip(state))]
    pub async fn attendance_summary(
        state: &AppState,
        enrollment: EnrollmentId,
    ) -> AppResult<AttendanceSummary> {
        let mut tx = state.begin().await?;
        EnrollmentService::require_enrollment(tx.as_mut(), enrollment).await?;
        let records = tx.attendance_for_enrollment(enrollment).await?;
        Ok(AttendanceSummary::tally(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_describes_filters() {
        let enrollment = EnrollmentId::from_u128(1);
        assert_eq!(
            scope(enrollment, None, None),
            format!("enrollment {}", enrollment)
        );

        let subject = SubjectId::from_u128(2);
        let period = PeriodId::from_u128(3);
        let text = scope(enrollment, Some(subject), Some(period));
        assert!(text.contains(&format!("in subject {}", subject)));
        assert!(text.ends_with(&format!("during period {}", period)));
    }
}

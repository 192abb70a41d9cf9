//! Enrollment Ledger.
//!
//! Capacity is checked and the enrollment written in one transaction with
//! the class row locked, so concurrent enrollments can never push a class
//! past its capacity.

use chrono::Utc;
use registrar_core::{AppError, AppResult, RuleViolation};
use registrar_db::{StoreTx, constraints};
use registrar_models::{
    AcademicYearId, ClassId, ClassWithStats, CreateEnrollmentDto, Enrollment, EnrollmentId,
    EnrollmentStatus, EnrollmentTransfer, EnrollmentTransferId, StudentId, StudentWithProfile,
    TransitionEnrollmentDto, TransitionOutcome,
};
use tracing::{info, instrument};
use validator::Validate;

use crate::modules::classes::ClassService;
use crate::modules::people::PeopleService;
use crate::state::AppState;
use crate::utils::retry::{on_constraint, with_retry};

pub struct EnrollmentService;

fn duplicate(student: StudentId, year: AcademicYearId) -> AppError {
    RuleViolation::DuplicateEnrollment {
        student_id: student.into_inner(),
        academic_year_id: year.into_inner(),
    }
    .into()
}

impl EnrollmentService {
    pub(crate) async fn require_enrollment(
        tx: &mut dyn StoreTx,
        id: EnrollmentId,
    ) -> AppResult<Enrollment> {
        tx.enrollment(id)
            .await?
            .ok_or_else(|| AppError::not_found("Enrollment", id))
    }

    /// Places a student in a class for an academic year.
    ///
    /// Checks run in a fixed order: the class must exist, belong to the
    /// requested year, the student must have no enrollment for that year,
    /// and the class must have a free seat.
    #[instrument(skip(state))]
    pub async fn enroll(state: &AppState, dto: CreateEnrollmentDto) -> AppResult<Enrollment> {
        dto.validate()?;

        let dto = &dto;
        with_retry(&state.transactions, "enroll", || async move {
            let mut tx = state.begin().await?;
            let class = ClassService::lock_class(tx.as_mut(), dto.class_id).await?;
            PeopleService::require_student(tx.as_mut(), dto.student_id).await?;

            if class.academic_year_id != dto.academic_year_id {
                return Err(RuleViolation::YearMismatch {
                    class_id: class.id.into_inner(),
                    class_year_id: class.academic_year_id.into_inner(),
                    requested_year_id: dto.academic_year_id.into_inner(),
                }
                .into());
            }

            if tx.has_enrollment(dto.student_id, dto.academic_year_id).await? {
                return Err(duplicate(dto.student_id, dto.academic_year_id));
            }

            let occupancy = tx.count_seated_enrollments(class.id).await?;
            if class.is_full_at(occupancy) {
                return Err(RuleViolation::CapacityExceeded {
                    class_id: class.id.into_inner(),
                    capacity: class.capacity,
                    occupancy,
                }
                .into());
            }

            let now = Utc::now();
            let enrollment = Enrollment {
                id: EnrollmentId::new(),
                student_id: dto.student_id,
                class_id: class.id,
                academic_year_id: class.academic_year_id,
                enrollment_date: dto.enrollment_date.unwrap_or_else(|| now.date_naive()),
                status: EnrollmentStatus::Active,
                created_at: now,
                updated_at: now,
            };
            tx.insert_enrollment(&enrollment).await.map_err(|e| {
                on_constraint(e, constraints::ENROLLMENTS_STUDENT_YEAR, || {
                    duplicate(dto.student_id, dto.academic_year_id)
                })
            })?;
            tx.commit().await?;

            info!(
                enrollment_id = %enrollment.id,
                student_id = %enrollment.student_id,
                class_id = %enrollment.class_id,
                occupancy = occupancy + 1,
                capacity = class.capacity,
                "Student enrolled"
            );
            Ok(enrollment)
        })
        .await
    }

    /// Moves an active enrollment to a terminal status.
    ///
    /// A student keeps one enrollment record per year, so a transfer points
    /// that record at the target class, marks it `transferred` and logs the
    /// move in the transfer history. The target must belong to the same year
    /// and have a free seat; the moving student does not count against it
    /// when it is the class they are leaving.
    #[instrument(skip(state))]
    pub async fn transition_status(
        state: &AppState,
        id: EnrollmentId,
        dto: TransitionEnrollmentDto,
    ) -> AppResult<TransitionOutcome> {
        dto.validate()?;
        match (dto.status, dto.target_class_id) {
            (EnrollmentStatus::Transferred, None) => {
                return Err(AppError::validation("A transfer requires a target class"));
            }
            (status, Some(_)) if status != EnrollmentStatus::Transferred => {
                return Err(AppError::validation(
                    "A target class is only accepted for a transfer",
                ));
            }
            _ => {}
        }

        let dto = &dto;
        with_retry(&state.transactions, "transition_enrollment", || async move {
            let mut tx = state.begin().await?;
            let enrollment = Self::require_enrollment(tx.as_mut(), id).await?;

            if !enrollment.status.can_transition_to(dto.status) {
                return Err(RuleViolation::InvalidTransition {
                    from: enrollment.status.to_string(),
                    to: dto.status.to_string(),
                }
                .into());
            }

            let now = Utc::now();
            let (updated, transfer) = match dto.target_class_id {
                Some(target_id) => {
                    let target = ClassService::lock_class(tx.as_mut(), target_id).await?;
                    if target.academic_year_id != enrollment.academic_year_id {
                        return Err(RuleViolation::YearMismatch {
                            class_id: target.id.into_inner(),
                            class_year_id: target.academic_year_id.into_inner(),
                            requested_year_id: enrollment.academic_year_id.into_inner(),
                        }
                        .into());
                    }

                    let mut occupancy = tx.count_seated_enrollments(target.id).await?;
                    if target.id == enrollment.class_id {
                        occupancy -= 1;
                    }
                    if target.is_full_at(occupancy) {
                        return Err(RuleViolation::CapacityExceeded {
                            class_id: target.id.into_inner(),
                            capacity: target.capacity,
                            occupancy,
                        }
                        .into());
                    }

                    let updated = tx
                        .transfer_enrollment(id, target.id, now)
                        .await?
                        .ok_or_else(|| AppError::not_found("Enrollment", id))?;
                    let transfer = EnrollmentTransfer {
                        id: EnrollmentTransferId::new(),
                        enrollment_id: id,
                        from_class_id: enrollment.class_id,
                        to_class_id: target.id,
                        effective_date: dto.effective_date.unwrap_or_else(|| now.date_naive()),
                        created_at: now,
                    };
                    tx.insert_enrollment_transfer(&transfer).await?;
                    (updated, Some(transfer))
                }
                None => {
                    let updated = tx
                        .set_enrollment_status(id, dto.status, now)
                        .await?
                        .ok_or_else(|| AppError::not_found("Enrollment", id))?;
                    (updated, None)
                }
            };
            tx.commit().await?;

            info!(
                enrollment_id = %id,
                from = %enrollment.status,
                to = %dto.status,
                class_id = %updated.class_id,
                "Enrollment status changed"
            );
            Ok(TransitionOutcome {
                enrollment: updated,
                transfer,
            })
        })
        .await
    }

    /// Class moves of an enrollment, oldest first.
    #[instrument(skip(state))]
    pub async fn transfer_history(
        state: &AppState,
        id: EnrollmentId,
    ) -> AppResult<Vec<EnrollmentTransfer>> {
        let mut tx = state.begin().await?;
        Self::require_enrollment(tx.as_mut(), id).await?;
        Ok(tx.transfers_for_enrollment(id).await?)
    }

    #[instrument(skip(state))]
    pub async fn get_enrollment(state: &AppState, id: EnrollmentId) -> AppResult<Enrollment> {
        let mut tx = state.begin().await?;
        Self::require_enrollment(tx.as_mut(), id).await
    }

    /// Number of seats taken in a class: active enrollments plus students
    /// transferred into it.
    #[instrument(skip(state))]
    pub async fn occupancy(state: &AppState, class: ClassId) -> AppResult<i64> {
        let mut tx = state.begin().await?;
        ClassService::require_class(tx.as_mut(), class).await?;
        Ok(tx.count_seated_enrollments(class).await?)
    }

    #[instrument(skip(state))]
    pub async fn is_full(state: &AppState, class: ClassId) -> AppResult<bool> {
        Ok(Self::class_with_stats(state, class).await?.is_full)
    }

    #[instrument(skip(state))]
    pub async fn class_with_stats(state: &AppState, class: ClassId) -> AppResult<ClassWithStats> {
        let mut tx = state.begin().await?;
        let class = ClassService::require_class(tx.as_mut(), class).await?;
        let occupancy = tx.count_seated_enrollments(class.id).await?;
        Ok(ClassWithStats::new(class, occupancy))
    }

    /// Students holding a seat in a class.
    #[instrument(skip(state))]
    pub async fn class_roster(
        state: &AppState,
        class: ClassId,
    ) -> AppResult<Vec<StudentWithProfile>> {
        let mut tx = state.begin().await?;
        ClassService::require_class(tx.as_mut(), class).await?;

        let enrollments = tx.enrollments_for_class(class).await?;
        let mut roster = Vec::new();
        for enrollment in enrollments.into_iter().filter(Enrollment::holds_seat) {
            let student = PeopleService::require_student(tx.as_mut(), enrollment.student_id).await?;
            roster.push(PeopleService::with_profile(tx.as_mut(), student).await?);
        }
        roster.sort_by(|a, b| {
            (&a.profile.last_name, &a.profile.first_name)
                .cmp(&(&b.profile.last_name, &b.profile.first_name))
        });
        Ok(roster)
    }

    /// Every enrollment of a student, one per academic year.
    #[instrument(skip(state))]
    pub async fn enrollments_for_student(
        state: &AppState,
        student: StudentId,
    ) -> AppResult<Vec<Enrollment>> {
        let mut tx = state.begin().await?;
        PeopleService::require_student(tx.as_mut(), student).await?;
        Ok(tx.enrollments_for_student(student).await?)
    }
}

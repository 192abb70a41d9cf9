//! Profiles, teachers and students.
//!
//! A teacher or student is registered together with its profile in one
//! transaction, so a rejected staff number never leaves an orphan profile.

use chrono::{DateTime, Utc};
use registrar_core::{AppError, AppResult, StoreError};
use registrar_db::{StoreTx, constraints};
use registrar_models::{
    CreateProfileDto, CreateStudentDto, CreateTeacherDto, Profile, ProfileId, Student, StudentId,
    StudentWithProfile, Teacher, TeacherId,
};
use tracing::{info, instrument};
use validator::Validate;

use crate::state::AppState;
use crate::utils::retry::with_retry;

pub struct PeopleService;

fn new_profile(dto: &CreateProfileDto, now: DateTime<Utc>) -> Profile {
    Profile {
        id: ProfileId::new(),
        first_name: dto.first_name.clone(),
        last_name: dto.last_name.clone(),
        email: dto.email.clone(),
        role: dto.role,
        phone: dto.phone.clone(),
        gender: dto.gender,
        birth_date: dto.birth_date,
        address: dto.address.clone(),
        created_at: now,
        updated_at: now,
    }
}

fn map_people_conflict(err: StoreError, dto_email: &str) -> AppError {
    match err.violated_constraint() {
        Some(constraints::PROFILES_EMAIL) => {
            AppError::conflict(format!("Email {} is already registered", dto_email))
        }
        Some(constraints::TEACHERS_EMPLOYEE_ID) => {
            AppError::conflict("Employee ID is already in use")
        }
        Some(constraints::STUDENTS_STUDENT_NUMBER) => {
            AppError::conflict("Student number is already in use")
        }
        _ => err.into(),
    }
}

impl PeopleService {
    pub(crate) async fn require_teacher(tx: &mut dyn StoreTx, id: TeacherId) -> AppResult<Teacher> {
        tx.teacher(id)
            .await?
            .ok_or_else(|| AppError::not_found("Teacher", id))
    }

    pub(crate) async fn require_student(tx: &mut dyn StoreTx, id: StudentId) -> AppResult<Student> {
        tx.student(id)
            .await?
            .ok_or_else(|| AppError::not_found("Student", id))
    }

    pub(crate) async fn with_profile(
        tx: &mut dyn StoreTx,
        student: Student,
    ) -> AppResult<StudentWithProfile> {
        let profile = tx
            .profile(student.profile_id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile", student.profile_id))?;
        Ok(StudentWithProfile { student, profile })
    }

    #[instrument(skip(state))]
    pub async fn create_teacher(state: &AppState, dto: CreateTeacherDto) -> AppResult<Teacher> {
        dto.validate()?;

        let dto = &dto;
        with_retry(&state.transactions, "create_teacher", || async move {
            let mut tx = state.begin().await?;
            let now = Utc::now();
            let profile = new_profile(&dto.profile, now);
            let teacher = Teacher {
                id: TeacherId::new(),
                profile_id: profile.id,
                specialty: dto.specialty.clone(),
                employee_id: dto.employee_id.clone(),
                hire_date: dto.hire_date,
                is_active: true,
                created_at: now,
                updated_at: now,
            };

            tx.insert_profile(&profile)
                .await
                .map_err(|e| map_people_conflict(e, &profile.email))?;
            tx.insert_teacher(&teacher)
                .await
                .map_err(|e| map_people_conflict(e, &profile.email))?;
            tx.commit().await?;

            info!(teacher_id = %teacher.id, employee_id = %teacher.employee_id, "Teacher registered");
            Ok(teacher)
        })
        .await
    }

    #[instrument(skip(state))]
    pub async fn create_student(state: &AppState, dto: CreateStudentDto) -> AppResult<Student> {
        dto.validate()?;

        let dto = &dto;
        with_retry(&state.transactions, "create_student", || async move {
            let mut tx = state.begin().await?;
            let now = Utc::now();
            let profile = new_profile(&dto.profile, now);
            let student = Student {
                id: StudentId::new(),
                profile_id: profile.id,
                student_number: dto.student_number.clone(),
                date_of_birth: dto.date_of_birth,
                is_active: true,
                created_at: now,
                updated_at: now,
            };

            tx.insert_profile(&profile)
                .await
                .map_err(|e| map_people_conflict(e, &profile.email))?;
            tx.insert_student(&student)
                .await
                .map_err(|e| map_people_conflict(e, &profile.email))?;
            tx.commit().await?;

            info!(student_id = %student.id, student_number = %student.student_number, "Student registered");
            Ok(student)
        })
        .await
    }

    #[instrument(skip(state))]
    pub async fn get_profile(state: &AppState, id: ProfileId) -> AppResult<Profile> {
        let mut tx = state.begin().await?;
        tx.profile(id)
            .await?
            .ok_or_else(|| AppError::not_found("Profile", id))
    }

    #[instrument(skip(state))]
    pub async fn get_teacher(state: &AppState, id: TeacherId) -> AppResult<Teacher> {
        let mut tx = state.begin().await?;
        Self::require_teacher(tx.as_mut(), id).await
    }

    #[instrument(skip(state))]
    pub async fn list_teachers(state: &AppState) -> AppResult<Vec<Teacher>> {
        let mut tx = state.begin().await?;
        Ok(tx.teachers().await?)
    }

    #[instrument(skip(state))]
    pub async fn get_student(state: &AppState, id: StudentId) -> AppResult<StudentWithProfile> {
        let mut tx = state.begin().await?;
        let student = Self::require_student(tx.as_mut(), id).await?;
        Self::with_profile(tx.as_mut(), student).await
    }

    #[instrument(skip(state))]
    pub async fn list_students(state: &AppState) -> AppResult<Vec<Student>> {
        let mut tx = state.begin().await?;
        Ok(tx.students().await?)
    }
}

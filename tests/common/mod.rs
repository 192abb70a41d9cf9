#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use registrar::AppState;
use registrar::modules::{
    CalendarService, ClassService, CurriculumService, EnrollmentService, PeopleService,
    SubjectService,
};
use registrar_core::{AppError, AppResult, RuleViolation};
use registrar_models::{
    AcademicYear, AcademicYearId, Class, ClassId, ClassSubject, CreateAcademicYearDto,
    CreateClassDto, CreateClassSubjectDto, CreateEnrollmentDto, CreatePeriodDto,
    CreateProfileDto, CreateScheduleDto, CreateStudentDto, CreateSubjectDto, CreateTeacherDto,
    Enrollment,
    EnrollmentId, GradeType, Period, PeriodId, RecordGradeDto, Role, Student, StudentId, Subject,
    SubjectId, Teacher, TeacherId, Weekday,
};
use uuid::Uuid;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

pub fn generate_unique_email() -> String {
    format!("{}@example.com", unique("user."))
}

/// The rule an error carries; panics on any other error.
pub fn rule(err: AppError) -> RuleViolation {
    match err {
        AppError::Rule(rule) => rule,
        other => panic!("expected a rule violation, got {:?}", other),
    }
}

/// School year running from September of `start_year` to June of the next.
pub async fn create_year(state: &AppState, start_year: i32, is_current: bool) -> AcademicYear {
    CalendarService::create_academic_year(
        state,
        CreateAcademicYearDto {
            start_date: date(start_year, 9, 1),
            end_date: date(start_year + 1, 6, 30),
            is_current,
        },
    )
    .await
    .unwrap()
}

pub async fn create_period(
    state: &AppState,
    year: AcademicYearId,
    name: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Period {
    CalendarService::create_period(
        state,
        CreatePeriodDto {
            name: name.to_string(),
            academic_year_id: year,
            start_date: start,
            end_date: end,
            is_current: false,
        },
    )
    .await
    .unwrap()
}

pub async fn create_class(
    state: &AppState,
    year: AcademicYearId,
    name: &str,
    capacity: i32,
) -> Class {
    ClassService::create_class(
        state,
        CreateClassDto {
            name: name.to_string(),
            level: "Grade 10".to_string(),
            capacity,
            academic_year_id: year,
        },
    )
    .await
    .unwrap()
}

pub async fn create_subject(
    state: &AppState,
    name: &str,
    coefficient: f64,
    default_teacher_id: Option<TeacherId>,
) -> Subject {
    SubjectService::create_subject(
        state,
        CreateSubjectDto {
            name: name.to_string(),
            code: unique("S"),
            description: None,
            coefficient,
            default_teacher_id,
            is_active: true,
        },
    )
    .await
    .unwrap()
}

fn profile(first_name: &str, last_name: &str, role: Role) -> CreateProfileDto {
    CreateProfileDto {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: generate_unique_email(),
        role,
        phone: None,
        gender: None,
        birth_date: None,
        address: None,
    }
}

pub async fn create_teacher(state: &AppState) -> Teacher {
    PeopleService::create_teacher(
        state,
        CreateTeacherDto {
            profile: profile("Test", "Teacher", Role::Teacher),
            specialty: None,
            employee_id: unique("E"),
            hire_date: date(2020, 9, 1),
        },
    )
    .await
    .unwrap()
}

pub async fn create_student(state: &AppState, first_name: &str, last_name: &str) -> Student {
    PeopleService::create_student(
        state,
        CreateStudentDto {
            profile: profile(first_name, last_name, Role::Student),
            student_number: unique("N"),
            date_of_birth: date(2009, 5, 12),
        },
    )
    .await
    .unwrap()
}

pub async fn assign(
    state: &AppState,
    class: ClassId,
    subject: SubjectId,
    teacher: Option<TeacherId>,
    period: Option<PeriodId>,
) -> ClassSubject {
    CurriculumService::assign(state, assign_dto(class, subject, teacher, period))
        .await
        .unwrap()
}

pub fn assign_dto(
    class: ClassId,
    subject: SubjectId,
    teacher: Option<TeacherId>,
    period: Option<PeriodId>,
) -> CreateClassSubjectDto {
    CreateClassSubjectDto {
        class_id: class,
        subject_id: subject,
        teacher_id: teacher,
        period_id: period,
        is_active: true,
    }
}

/// Timetable slot from `HH:MM` strings.
pub fn slot_dto(row: &ClassSubject, weekday: Weekday, start: &str, end: &str) -> CreateScheduleDto {
    let time = |t: &str| NaiveTime::parse_from_str(t, "%H:%M").unwrap();
    CreateScheduleDto {
        class_subject_id: row.id,
        weekday,
        start_time: time(start),
        end_time: time(end),
    }
}

pub fn enroll_dto(student: StudentId, class: ClassId, year: AcademicYearId) -> CreateEnrollmentDto {
    CreateEnrollmentDto {
        student_id: student,
        class_id: class,
        academic_year_id: year,
        enrollment_date: Some(date(2024, 9, 2)),
    }
}

pub async fn enroll(
    state: &AppState,
    student: StudentId,
    class: &Class,
) -> AppResult<Enrollment> {
    EnrollmentService::enroll(state, enroll_dto(student, class.id, class.academic_year_id)).await
}

pub fn grade_dto(
    enrollment: EnrollmentId,
    subject: SubjectId,
    period: Option<PeriodId>,
    value: f64,
    max_value: f64,
) -> RecordGradeDto {
    RecordGradeDto {
        enrollment_id: enrollment,
        subject_id: subject,
        period_id: period,
        value,
        max_value,
        grade_type: GradeType::Test,
        grade_date: Some(date(2024, 10, 15)),
        coefficient: 1.0,
        comment: None,
    }
}

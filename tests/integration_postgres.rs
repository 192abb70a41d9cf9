//! The same rules against PostgreSQL. Requires `DATABASE_URL`; run with
//! `cargo test -- --ignored`.

mod common;

use common::{
    assign, create_class, create_period, create_student, create_subject, create_teacher,
    create_year, date, enroll, enroll_dto, grade_dto, rule, slot_dto,
};
use futures::future::join_all;
use registrar::AppState;
use registrar::modules::{
    CalendarService, CurriculumService, EnrollmentService, GradingService, PeopleService,
};
use registrar_config::TransactionConfig;
use registrar_core::{AppError, RuleViolation};
use registrar_db::PgStore;
use registrar_models::{
    ClassId, CreateProfileDto, CreateStudentDto, EnrollmentStatus, Role, TransitionEnrollmentDto,
    Weekday,
};
use sqlx::PgPool;

fn state(pool: PgPool) -> AppState {
    AppState::new(PgStore::new(pool), TransactionConfig::default())
}

fn transfer_to(target: ClassId) -> TransitionEnrollmentDto {
    TransitionEnrollmentDto {
        status: EnrollmentStatus::Transferred,
        target_class_id: Some(target),
        effective_date: None,
    }
}

#[sqlx::test(migrations = "crates/registrar-db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn test_pg_current_year_is_exclusive(pool: PgPool) {
    let state = state(pool.clone());
    let first = create_year(&state, 2023, true).await;
    let second = create_year(&state, 2024, true).await;

    CalendarService::set_current_year(&state, first.id).await.unwrap();

    let current: Vec<(uuid::Uuid,)> =
        sqlx::query_as("SELECT id FROM academic_years WHERE is_current")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(current, vec![(first.id.into_inner(),)]);
    assert!(!CalendarService::get_year(&state, second.id).await.unwrap().is_current);
}

#[sqlx::test(migrations = "crates/registrar-db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn test_pg_capacity_under_concurrency(pool: PgPool) {
    let state = state(pool);
    let year = create_year(&state, 2024, true).await;
    let class = create_class(&state, year.id, "10A", 1).await;

    let mut students = Vec::new();
    for i in 0..6 {
        students.push(create_student(&state, "Student", &format!("N{}", i)).await);
    }

    let attempts = students.iter().map(|student| {
        let state = state.clone();
        let dto = enroll_dto(student.id, class.id, year.id);
        tokio::spawn(async move { EnrollmentService::enroll(&state, dto).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(EnrollmentService::occupancy(&state, class.id).await.unwrap(), 1);
}

#[sqlx::test(migrations = "crates/registrar-db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn test_pg_withdrawal_frees_seat(pool: PgPool) {
    let state = state(pool);
    let year = create_year(&state, 2024, true).await;
    let class = create_class(&state, year.id, "10A", 1).await;
    let alice = create_student(&state, "Alice", "Martin").await;
    let bob = create_student(&state, "Bob", "Durand").await;

    let a = enroll(&state, alice.id, &class).await.unwrap();
    let err = enroll(&state, bob.id, &class).await.unwrap_err();
    assert!(matches!(rule(err), RuleViolation::CapacityExceeded { .. }));

    EnrollmentService::transition_status(
        &state,
        a.id,
        TransitionEnrollmentDto {
            status: EnrollmentStatus::Withdrawn,
            target_class_id: None,
            effective_date: None,
        },
    )
    .await
    .unwrap();
    enroll(&state, bob.id, &class).await.unwrap();
}

#[sqlx::test(migrations = "crates/registrar-db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn test_pg_duplicate_email_is_conflict(pool: PgPool) {
    let state = state(pool);
    let dto = |number: &str| CreateStudentDto {
        profile: CreateProfileDto {
            first_name: "Alice".to_string(),
            last_name: "Martin".to_string(),
            email: "alice.martin@example.com".to_string(),
            role: Role::Student,
            phone: None,
            gender: None,
            birth_date: None,
            address: None,
        },
        student_number: number.to_string(),
        date_of_birth: date(2009, 5, 12),
    };

    PeopleService::create_student(&state, dto("N1")).await.unwrap();
    let err = PeopleService::create_student(&state, dto("N2"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[sqlx::test(migrations = "crates/registrar-db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn test_pg_grade_round_trip(pool: PgPool) {
    let state = state(pool);
    let year = create_year(&state, 2024, true).await;
    let s1 = create_period(&state, year.id, "S1", date(2024, 9, 1), date(2025, 2, 1)).await;
    let class = create_class(&state, year.id, "10A", 30).await;
    let student = create_student(&state, "Alice", "Martin").await;
    let enrollment = enroll(&state, student.id, &class).await.unwrap();
    let maths = create_subject(&state, "Mathematics", 4.0, None).await;
    assign(&state, class.id, maths.id, None, None).await;

    GradingService::record_grade(
        &state,
        grade_dto(enrollment.id, maths.id, Some(s1.id), 8.0, 10.0),
    )
    .await
    .unwrap();

    let grades = GradingService::grades_for_enrollment(&state, enrollment.id)
        .await
        .unwrap();
    assert_eq!(grades.len(), 1);
    assert_eq!(grades[0].normalized_value, 16.0);

    let card = GradingService::report_card(&state, enrollment.id, None)
        .await
        .unwrap();
    assert_eq!(card.overall_average, 16.0);
}

#[sqlx::test(migrations = "crates/registrar-db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn test_pg_transfer_keeps_one_row_per_year(pool: PgPool) {
    let state = state(pool.clone());
    let year = create_year(&state, 2024, true).await;
    let from = create_class(&state, year.id, "10A", 5).await;
    let to = create_class(&state, year.id, "10B", 5).await;
    let student = create_student(&state, "Alice", "Martin").await;
    let enrollment = enroll(&state, student.id, &from).await.unwrap();

    let outcome = EnrollmentService::transition_status(&state, enrollment.id, transfer_to(to.id))
        .await
        .unwrap();
    assert_eq!(outcome.enrollment.class_id, to.id);

    let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM enrollments WHERE student_id = $1")
        .bind(student.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    let err = enroll(&state, student.id, &from).await.unwrap_err();
    assert!(matches!(rule(err), RuleViolation::DuplicateEnrollment { .. }));
    assert_eq!(
        EnrollmentService::transfer_history(&state, enrollment.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[sqlx::test(migrations = "crates/registrar-db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn test_pg_transfer_into_own_full_class(pool: PgPool) {
    let state = state(pool);
    let year = create_year(&state, 2024, true).await;
    let class = create_class(&state, year.id, "10A", 1).await;
    let student = create_student(&state, "Alice", "Martin").await;
    let enrollment = enroll(&state, student.id, &class).await.unwrap();

    let outcome = EnrollmentService::transition_status(&state, enrollment.id, transfer_to(class.id))
        .await
        .unwrap();
    assert_eq!(outcome.enrollment.status, EnrollmentStatus::Transferred);
    assert_eq!(EnrollmentService::occupancy(&state, class.id).await.unwrap(), 1);
}

#[sqlx::test(migrations = "crates/registrar-db/migrations")]
#[ignore = "requires a PostgreSQL database"]
async fn test_pg_teacher_double_booking(pool: PgPool) {
    let state = state(pool);
    let year = create_year(&state, 2024, true).await;
    let a = create_class(&state, year.id, "10A", 30).await;
    let b = create_class(&state, year.id, "10B", 30).await;
    let teacher = create_teacher(&state).await;
    let maths = create_subject(&state, "Mathematics", 4.0, Some(teacher.id)).await;
    let a_row = assign(&state, a.id, maths.id, None, None).await;
    let b_row = assign(&state, b.id, maths.id, None, None).await;

    CurriculumService::add_schedule(&state, slot_dto(&a_row, Weekday::Monday, "08:00", "09:00"))
        .await
        .unwrap();
    let err = CurriculumService::add_schedule(
        &state,
        slot_dto(&b_row, Weekday::Monday, "08:30", "09:30"),
    )
    .await
    .unwrap_err();
    assert!(matches!(rule(err), RuleViolation::ScheduleOverlap { .. }));

    CurriculumService::add_schedule(&state, slot_dto(&b_row, Weekday::Monday, "09:00", "10:00"))
        .await
        .unwrap();
    let timetable = CurriculumService::teacher_timetable(&state, teacher.id)
        .await
        .unwrap();
    assert_eq!(timetable.len(), 2);
}

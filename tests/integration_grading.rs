mod common;

use common::{
    assign, create_class, create_period, create_student, create_subject, create_teacher,
    create_year, date, enroll, grade_dto, rule,
};
use registrar::AppState;
use registrar::modules::GradingService;
use registrar_core::{AppError, RuleViolation};
use registrar_models::{
    AttendanceStatus, Class, Enrollment, Period, RecordAttendanceDto, Subject,
};

struct Fixture {
    state: AppState,
    class: Class,
    s1: Period,
    s2: Period,
    enrollment: Enrollment,
}

async fn setup() -> Fixture {
    let state = AppState::in_memory();
    let year = create_year(&state, 2024, true).await;
    let s1 = create_period(&state, year.id, "S1", date(2024, 9, 1), date(2025, 2, 1)).await;
    let s2 = create_period(&state, year.id, "S2", date(2025, 2, 1), date(2025, 6, 30)).await;
    let class = create_class(&state, year.id, "10A", 30).await;
    let student = create_student(&state, "Alice", "Martin").await;
    let enrollment = enroll(&state, student.id, &class).await.unwrap();
    Fixture {
        state,
        class,
        s1,
        s2,
        enrollment,
    }
}

async fn taught_subject(f: &Fixture, name: &str, coefficient: f64) -> Subject {
    let subject = create_subject(&f.state, name, coefficient, None).await;
    assign(&f.state, f.class.id, subject.id, None, None).await;
    subject
}

#[tokio::test]
async fn test_normalized_value_and_percentage() {
    let f = setup().await;
    let maths = taught_subject(&f, "Mathematics", 4.0).await;

    let on_twenty = GradingService::record_grade(
        &f.state,
        grade_dto(f.enrollment.id, maths.id, Some(f.s1.id), 15.0, 20.0),
    )
    .await
    .unwrap();
    assert_eq!(on_twenty.normalized_value, 15.0);
    assert_eq!(on_twenty.percentage, 75.0);

    let on_ten = GradingService::record_grade(
        &f.state,
        grade_dto(f.enrollment.id, maths.id, Some(f.s1.id), 8.0, 10.0),
    )
    .await
    .unwrap();
    assert_eq!(on_ten.normalized_value, 16.0);
    assert_eq!(on_ten.grade.value, 8.0);
    assert_eq!(on_ten.grade.max_value, 10.0);
}

#[tokio::test]
async fn test_value_must_lie_within_scale() {
    let f = setup().await;
    let maths = taught_subject(&f, "Mathematics", 4.0).await;

    for value in [21.0, -0.5] {
        let err = GradingService::record_grade(
            &f.state,
            grade_dto(f.enrollment.id, maths.id, None, value, 20.0),
        )
        .await
        .unwrap_err();
        match rule(err) {
            RuleViolation::OutOfRange {
                value: got,
                max_value,
            } => {
                assert_eq!(got, value);
                assert_eq!(max_value, 20.0);
            }
            other => panic!("unexpected rule {:?}", other),
        }
    }

    // Both bounds are inclusive
    for value in [0.0, 20.0] {
        GradingService::record_grade(
            &f.state,
            grade_dto(f.enrollment.id, maths.id, None, value, 20.0),
        )
        .await
        .unwrap();
    }

    let grades = GradingService::grades_for_enrollment(&f.state, f.enrollment.id)
        .await
        .unwrap();
    assert_eq!(grades.len(), 2);
    assert!(
        grades
            .iter()
            .all(|g| (0.0..=g.grade.max_value).contains(&g.grade.value))
    );
}

#[tokio::test]
async fn test_max_value_must_be_positive() {
    let f = setup().await;
    let maths = taught_subject(&f, "Mathematics", 4.0).await;

    let err = GradingService::record_grade(
        &f.state,
        grade_dto(f.enrollment.id, maths.id, None, 0.0, 0.0),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_period_from_another_year_is_rejected() {
    let state = AppState::in_memory();
    let y2023 = create_year(&state, 2023, false).await;
    let y2024 = create_year(&state, 2024, true).await;
    let p1 = create_period(&state, y2023.id, "P1", date(2023, 9, 1), date(2024, 2, 1)).await;
    let class = create_class(&state, y2024.id, "10A", 30).await;
    let student = create_student(&state, "Alice", "Martin").await;
    let enrollment = enroll(&state, student.id, &class).await.unwrap();
    let subject = create_subject(&state, "Mathematics", 4.0, None).await;
    assign(&state, class.id, subject.id, None, None).await;

    let err = GradingService::record_grade(
        &state,
        grade_dto(enrollment.id, subject.id, Some(p1.id), 15.0, 20.0),
    )
    .await
    .unwrap_err();
    match rule(err) {
        RuleViolation::PeriodYearMismatch {
            period_year_id,
            expected_year_id,
            ..
        } => {
            assert_eq!(period_year_id, y2023.id.into_inner());
            assert_eq!(expected_year_id, y2024.id.into_inner());
        }
        other => panic!("unexpected rule {:?}", other),
    }
}

#[tokio::test]
async fn test_grade_requires_assigned_subject() {
    let f = setup().await;
    let physics = create_subject(&f.state, "Physics", 3.0, None).await;

    let err = GradingService::record_grade(
        &f.state,
        grade_dto(f.enrollment.id, physics.id, Some(f.s1.id), 12.0, 20.0),
    )
    .await
    .unwrap_err();
    assert!(matches!(rule(err), RuleViolation::UnassignedSubject { .. }));

    // A row for another period does not help
    assign(&f.state, f.class.id, physics.id, None, Some(f.s2.id)).await;
    let err = GradingService::record_grade(
        &f.state,
        grade_dto(f.enrollment.id, physics.id, Some(f.s1.id), 12.0, 20.0),
    )
    .await
    .unwrap_err();
    assert!(matches!(rule(err), RuleViolation::UnassignedSubject { .. }));

    GradingService::record_grade(
        &f.state,
        grade_dto(f.enrollment.id, physics.id, Some(f.s2.id), 12.0, 20.0),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_all_periods_assignment_accepts_any_period() {
    let f = setup().await;
    let history = taught_subject(&f, "History", 2.0).await;

    for period in [Some(f.s1.id), Some(f.s2.id), None] {
        GradingService::record_grade(
            &f.state,
            grade_dto(f.enrollment.id, history.id, period, 10.0, 20.0),
        )
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn test_out_of_range_reported_before_lookups() {
    let f = setup().await;
    let unknown = registrar_models::SubjectId::new();

    let err = GradingService::record_grade(
        &f.state,
        grade_dto(f.enrollment.id, unknown, None, 25.0, 20.0),
    )
    .await
    .unwrap_err();
    assert!(matches!(rule(err), RuleViolation::OutOfRange { .. }));

    let err = GradingService::record_grade(
        &f.state,
        grade_dto(f.enrollment.id, unknown, None, 5.0, 20.0),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_subject_average_weights_grades() {
    let f = setup().await;
    let maths = taught_subject(&f, "Mathematics", 4.0).await;

    let mut exam = grade_dto(f.enrollment.id, maths.id, Some(f.s1.id), 18.0, 20.0);
    exam.coefficient = 2.0;
    GradingService::record_grade(&f.state, exam).await.unwrap();
    GradingService::record_grade(
        &f.state,
        grade_dto(f.enrollment.id, maths.id, Some(f.s1.id), 6.0, 10.0),
    )
    .await
    .unwrap();
    GradingService::record_grade(
        &f.state,
        grade_dto(f.enrollment.id, maths.id, Some(f.s2.id), 10.0, 20.0),
    )
    .await
    .unwrap();

    // (18 * 2 + 12 * 1) / 3
    let s1 = GradingService::average_for_subject(&f.state, f.enrollment.id, maths.id, Some(f.s1.id))
        .await
        .unwrap();
    assert!((s1 - 16.0).abs() < 1e-9);

    // (36 + 12 + 10) / 4
    let year = GradingService::average_for_subject(&f.state, f.enrollment.id, maths.id, None)
        .await
        .unwrap();
    assert!((year - 14.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_report_card_weights_subjects() {
    let f = setup().await;
    let maths = taught_subject(&f, "Mathematics", 3.0).await;
    let english = taught_subject(&f, "English", 1.0).await;
    taught_subject(&f, "Art", 1.0).await;

    for (subject, value) in [(&maths, 16.0), (&maths, 12.0), (&english, 10.0)] {
        GradingService::record_grade(
            &f.state,
            grade_dto(f.enrollment.id, subject.id, Some(f.s1.id), value, 20.0),
        )
        .await
        .unwrap();
    }

    let card = GradingService::report_card(&f.state, f.enrollment.id, Some(f.s1.id))
        .await
        .unwrap();

    // Ungraded subjects are left out; lines are sorted by subject name
    let names: Vec<_> = card.subjects.iter().map(|s| s.subject_name.as_str()).collect();
    assert_eq!(names, ["English", "Mathematics"]);
    assert_eq!(card.subjects[1].average, 14.0);
    assert_eq!(card.subjects[1].grade_count, 2);

    // (14 * 3 + 10 * 1) / 4
    assert!((card.overall_average - 13.0).abs() < 1e-9);

    let overall = GradingService::overall_average(&f.state, f.enrollment.id, Some(f.s1.id))
        .await
        .unwrap();
    assert_eq!(overall, card.overall_average);
}

#[tokio::test]
async fn test_no_grades_means_no_average() {
    let f = setup().await;
    let maths = taught_subject(&f, "Mathematics", 4.0).await;
    GradingService::record_grade(
        &f.state,
        grade_dto(f.enrollment.id, maths.id, Some(f.s1.id), 11.0, 20.0),
    )
    .await
    .unwrap();

    let err = GradingService::report_card(&f.state, f.enrollment.id, Some(f.s2.id))
        .await
        .unwrap_err();
    assert!(matches!(rule(err), RuleViolation::NoData(_)));

    let err = GradingService::average_for_subject(&f.state, f.enrollment.id, maths.id, Some(f.s2.id))
        .await
        .unwrap_err();
    assert!(matches!(rule(err), RuleViolation::NoData(_)));
}

#[tokio::test]
async fn test_attendance_duplicates_and_summary() {
    let f = setup().await;
    let teacher = create_teacher(&f.state).await;
    // Attendance does not require a curriculum assignment
    let sport = create_subject(&f.state, "Physical Education", 1.0, None).await;

    let record = |day: u32, status: AttendanceStatus| RecordAttendanceDto {
        enrollment_id: f.enrollment.id,
        teacher_id: teacher.id,
        subject_id: sport.id,
        date: date(2024, 10, day),
        status,
        reason: None,
    };

    for (day, status) in [
        (1, AttendanceStatus::Present),
        (2, AttendanceStatus::Absent),
        (3, AttendanceStatus::Late),
        (4, AttendanceStatus::Present),
    ] {
        GradingService::record_attendance(&f.state, record(day, status))
            .await
            .unwrap();
    }

    let err = GradingService::record_attendance(&f.state, record(2, AttendanceStatus::Excused))
        .await
        .unwrap_err();
    assert!(matches!(rule(err), RuleViolation::DuplicateAttendance { .. }));

    let summary = GradingService::attendance_summary(&f.state, f.enrollment.id)
        .await
        .unwrap();
    assert_eq!(summary.present, 2);
    assert_eq!(summary.absent, 1);
    assert_eq!(summary.late, 1);
    assert_eq!(summary.excused, 0);
    assert_eq!(summary.total(), 4);
}

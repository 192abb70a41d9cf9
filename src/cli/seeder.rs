//! Fake data for demos and manual testing.
//!
//! Seeding goes through the services, so seeded data obeys every rule the
//! engine enforces. Each run creates a new current academic year.

use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use fake::Fake;
use fake::faker::address::en::StreetName;
use fake::faker::name::en::{FirstName, LastName};
use fake::faker::phone_number::en::CellNumber;
use rand::Rng;
use rand::seq::SliceRandom;
use registrar_db::PgPool;
use registrar_models::{
    AcademicYear, CreateAcademicYearDto, CreateClassDto, CreateClassSubjectDto,
    CreateEnrollmentDto, CreatePeriodDto, CreateProfileDto, CreateStudentDto, CreateSubjectDto,
    CreateTeacherDto, Gender, GradeType, RecordGradeDto, Role, Subject, Teacher,
};
use std::time::Instant;
use uuid::Uuid;

use crate::modules::calendar::CalendarService;
use crate::modules::classes::ClassService;
use crate::modules::curriculum::CurriculumService;
use crate::modules::enrollments::EnrollmentService;
use crate::modules::grading::GradingService;
use crate::modules::people::PeopleService;
use crate::modules::subjects::SubjectService;
use crate::state::AppState;

/// Domain used by every seeded profile, so seeded people can be cleared.
pub const SEED_EMAIL_DOMAIN: &str = "example.com";

const SUBJECTS: [(&str, &str, f64); 6] = [
    ("Mathematics", "MATH", 4.0),
    ("French", "FR", 3.0),
    ("English", "EN", 2.0),
    ("Physics", "PHY", 3.0),
    ("History", "HIST", 2.0),
    ("Physical Education", "PE", 1.0),
];

const GRADE_TYPES: [GradeType; 5] = [
    GradeType::Exam,
    GradeType::Test,
    GradeType::Homework,
    GradeType::Oral,
    GradeType::Project,
];

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub classes: usize,
    pub students_per_class: usize,
    pub teachers: usize,
    pub grades_per_subject: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            classes: 3,
            students_per_class: 10,
            teachers: 4,
            grades_per_subject: 2,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub teachers: usize,
    pub classes: usize,
    pub students: usize,
    pub grades: usize,
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn fake_profile(role: Role) -> CreateProfileDto {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();
    let local: String = format!("{}.{}.{}", first_name, last_name, short_id())
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .collect::<String>()
        .to_lowercase();
    let gender = if rand::thread_rng().gen_bool(0.5) {
        Gender::Male
    } else {
        Gender::Female
    };
    let street: String = StreetName().fake();

    CreateProfileDto {
        email: format!("{}@{}", local, SEED_EMAIL_DOMAIN),
        first_name,
        last_name,
        role,
        phone: Some(CellNumber().fake::<String>().chars().take(20).collect()),
        gender: Some(gender),
        birth_date: None,
        address: Some(street),
    }
}

/// First day of the school year containing `today`, September to June.
fn school_year_start(today: NaiveDate) -> Option<NaiveDate> {
    let year = if today.month() >= 9 {
        today.year()
    } else {
        today.year() - 1
    };
    NaiveDate::from_ymd_opt(year, 9, 1)
}

/// `10A` to `10Z`, then `10A2` to `10Z2` and so on.
fn class_name(index: usize) -> String {
    let letter = char::from(b'A' + (index % 26) as u8);
    match index / 26 {
        0 => format!("10{}", letter),
        round => format!("10{}{}", letter, round + 1),
    }
}

fn date(year: i32, month: u32, day: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .with_context(|| format!("invalid date {}-{}-{}", year, month, day))
}

async fn seed_calendar(state: &AppState) -> anyhow::Result<AcademicYear> {
    let start = school_year_start(Utc::now().date_naive()).context("invalid school year")?;
    let y = start.year();

    let year = CalendarService::create_academic_year(
        state,
        CreateAcademicYearDto {
            start_date: start,
            end_date: date(y + 1, 6, 30)?,
            is_current: true,
        },
    )
    .await?;

    for (name, from, to, is_current) in [
        ("First Semester", date(y, 9, 1)?, date(y + 1, 2, 1)?, true),
        ("Second Semester", date(y + 1, 2, 1)?, date(y + 1, 6, 30)?, false),
    ] {
        CalendarService::create_period(
            state,
            CreatePeriodDto {
                name: name.to_string(),
                academic_year_id: year.id,
                start_date: from,
                end_date: to,
                is_current,
            },
        )
        .await?;
    }
    Ok(year)
}

async fn seed_subjects(state: &AppState, teachers: &[Teacher]) -> anyhow::Result<Vec<Subject>> {
    let existing = SubjectService::list_subjects(state).await?;
    let mut subjects = Vec::with_capacity(SUBJECTS.len());

    for (i, (name, code, coefficient)) in SUBJECTS.into_iter().enumerate() {
        if let Some(subject) = existing.iter().find(|s| s.code == code) {
            subjects.push(subject.clone());
            continue;
        }
        let subject = SubjectService::create_subject(
            state,
            CreateSubjectDto {
                name: name.to_string(),
                code: code.to_string(),
                description: None,
                coefficient,
                default_teacher_id: teachers.get(i % teachers.len().max(1)).map(|t| t.id),
                is_active: true,
            },
        )
        .await?;
        subjects.push(subject);
    }
    Ok(subjects)
}

/// Seeds a current academic year with classes, teachers, students,
/// assignments and grades.
pub async fn seed_database(state: &AppState, config: SeedConfig) -> anyhow::Result<SeedSummary> {
    let start_time = Instant::now();
    let mut summary = SeedSummary::default();

    println!("🌱 Starting database seeding...");
    println!(
        "   - {} classes, {} students per class, {} teachers",
        config.classes, config.students_per_class, config.teachers
    );

    let year = seed_calendar(state).await?;
    let current_period = CalendarService::current_period(state, year.id).await?;
    println!("   ✓ Academic year {} with two semesters", year.label());

    let mut teachers = Vec::with_capacity(config.teachers);
    for _ in 0..config.teachers {
        let teacher = PeopleService::create_teacher(
            state,
            CreateTeacherDto {
                profile: fake_profile(Role::Teacher),
                specialty: None,
                employee_id: format!("EMP-{}", short_id()),
                hire_date: date(year.start_date.year() - 2, 9, 1)?,
            },
        )
        .await?;
        teachers.push(teacher);
    }
    summary.teachers = teachers.len();

    let subjects = seed_subjects(state, &teachers).await?;
    println!(
        "   ✓ {} teachers and {} subjects",
        teachers.len(),
        subjects.len()
    );

    let capacity = i32::try_from(config.students_per_class.max(1))
        .context("students per class does not fit in a class capacity")?;

    for class_idx in 0..config.classes {
        let class = ClassService::create_class(
            state,
            CreateClassDto {
                name: class_name(class_idx),
                level: "Grade 10".to_string(),
                capacity,
                academic_year_id: year.id,
            },
        )
        .await?;
        summary.classes += 1;

        for subject in &subjects {
            let teacher_id = teachers.choose(&mut rand::thread_rng()).map(|t| t.id);
            CurriculumService::assign(
                state,
                CreateClassSubjectDto {
                    class_id: class.id,
                    subject_id: subject.id,
                    teacher_id,
                    period_id: None,
                    is_active: true,
                },
            )
            .await?;
        }

        for n in 0..config.students_per_class {
            let student = PeopleService::create_student(
                state,
                CreateStudentDto {
                    profile: fake_profile(Role::Student),
                    student_number: format!("S{}{:03}", short_id(), n),
                    date_of_birth: date(year.start_date.year() - 15, 1 + (n % 12) as u32, 15)?,
                },
            )
            .await?;
            let enrollment = EnrollmentService::enroll(
                state,
                CreateEnrollmentDto {
                    student_id: student.id,
                    class_id: class.id,
                    academic_year_id: year.id,
                    enrollment_date: Some(year.start_date),
                },
            )
            .await?;
            summary.students += 1;

            for subject in &subjects {
                for _ in 0..config.grades_per_subject {
                    let (value, grade_type) = {
                        let mut rng = rand::thread_rng();
                        let value = f64::from(rng.gen_range(0..=40u32)) / 2.0;
                        let grade_type = *GRADE_TYPES.choose(&mut rng).unwrap_or(&GradeType::Test);
                        (value, grade_type)
                    };
                    GradingService::record_grade(
                        state,
                        RecordGradeDto {
                            enrollment_id: enrollment.id,
                            subject_id: subject.id,
                            period_id: current_period.as_ref().map(|p| p.id),
                            value,
                            max_value: 20.0,
                            grade_type,
                            grade_date: Some(year.start_date),
                            coefficient: 1.0,
                            comment: None,
                        },
                    )
                    .await?;
                    summary.grades += 1;
                }
            }
        }
        println!("   ✓ Class {} filled", class.name);
    }

    println!(
        "\n✅ Seeding complete! {} students in {} classes, {} grades in {:?}",
        summary.students,
        summary.classes,
        summary.grades,
        start_time.elapsed()
    );
    Ok(summary)
}

/// Deletes seeded people and every academic year, class and subject.
pub async fn clear_seeded_data(db: &PgPool) -> anyhow::Result<()> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded data...");

    let mut tx = db.begin().await?;

    let profiles_deleted = sqlx::query("DELETE FROM profiles WHERE email LIKE $1")
        .bind(format!("%@{}", SEED_EMAIL_DOMAIN))
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let years_deleted = sqlx::query("DELETE FROM academic_years")
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let subjects_deleted = sqlx::query("DELETE FROM subjects")
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    println!(
        "   ✓ Deleted {} profiles, {} academic years and {} subjects in {:?}",
        profiles_deleted,
        years_deleted,
        subjects_deleted,
        start_time.elapsed()
    );
    println!("✅ Seeded data cleared successfully!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_school_year_start() {
        let october = NaiveDate::from_ymd_opt(2024, 10, 3).unwrap();
        let march = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        assert_eq!(
            school_year_start(october),
            NaiveDate::from_ymd_opt(2024, 9, 1)
        );
        assert_eq!(school_year_start(march), NaiveDate::from_ymd_opt(2024, 9, 1));
    }

    #[test]
    fn test_class_names_stay_unique_past_z() {
        assert_eq!(class_name(0), "10A");
        assert_eq!(class_name(25), "10Z");
        assert_eq!(class_name(26), "10A2");
        assert_eq!(class_name(53), "10B3");

        let names: std::collections::HashSet<_> = (0..80).map(class_name).collect();
        assert_eq!(names.len(), 80);
    }

    #[tokio::test]
    async fn test_oversized_class_is_rejected() {
        let state = AppState::in_memory();
        let config = SeedConfig {
            classes: 1,
            students_per_class: usize::MAX,
            teachers: 1,
            grades_per_subject: 0,
        };

        let err = seed_database(&state, config).await.unwrap_err();
        assert!(err.to_string().contains("class capacity"), "{:#}", err);
    }

    #[test]
    fn test_fake_profile_email() {
        let profile = fake_profile(Role::Student);
        assert!(profile.email.ends_with("@example.com"));
        assert!(validator::Validate::validate(&profile).is_ok());
    }

    #[tokio::test]
    async fn test_seed_in_memory() {
        let state = AppState::in_memory();
        let config = SeedConfig {
            classes: 2,
            students_per_class: 3,
            teachers: 2,
            grades_per_subject: 1,
        };

        let summary = seed_database(&state, config).await.unwrap();
        assert_eq!(summary.classes, 2);
        assert_eq!(summary.students, 6);
        assert_eq!(summary.grades, 6 * SUBJECTS.len());

        let year = CalendarService::current_year(&state).await.unwrap().unwrap();
        let classes = ClassService::list_classes(&state, year.id).await.unwrap();
        assert!(classes.iter().all(|c| c.is_full));
    }
}

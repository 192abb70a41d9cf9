//! Administration commands behind `registrar-cli`.

pub mod seeder;

use anyhow::Context;
use registrar_config::{DatabaseConfig, TransactionConfig};
use registrar_db::{PgPool, PgStore, init_db_pool, run_migrations};
use registrar_models::{ReportCard, Schedule};

use crate::state::AppState;

/// Connects to PostgreSQL and builds the service state on top of it.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<(PgPool, AppState)> {
    let pool = init_db_pool(config)
        .await
        .context("Failed to connect to database")?;
    let state = AppState::new(PgStore::new(pool.clone()), TransactionConfig::from_env());
    Ok((pool, state))
}

pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    run_migrations(pool)
        .await
        .context("Failed to run migrations")?;
    Ok(())
}

/// Renders a report card as a plain-text table.
pub fn format_report_card(card: &ReportCard) -> String {
    let width = card
        .subjects
        .iter()
        .map(|line| line.subject_name.len())
        .max()
        .unwrap_or(0)
        .max("Subject".len());

    let mut out = format!(
        "{:<width$}  {:>5}  {:>7}  {:>6}\n",
        "Subject",
        "Coef",
        "Average",
        "Grades",
        width = width
    );
    for line in &card.subjects {
        out.push_str(&format!(
            "{:<width$}  {:>5.1}  {:>7.2}  {:>6}\n",
            line.subject_name,
            line.coefficient,
            line.average,
            line.grade_count,
            width = width
        ));
    }
    out.push_str(&format!(
        "{:<width$}  {:>5}  {:>7.2}\n",
        "Overall",
        "",
        card.overall_average,
        width = width
    ));
    out
}

/// One line per slot: weekday, time range and assignment id.
pub fn format_timetable(slots: &[Schedule]) -> String {
    slots
        .iter()
        .map(|slot| {
            format!(
                "{:<9}  {}-{}  {}\n",
                slot.weekday,
                slot.start_time.format("%H:%M"),
                slot.end_time.format("%H:%M"),
                slot.class_subject_id
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use registrar_models::{
        ClassSubjectId, EnrollmentId, ScheduleId, SubjectAverage, SubjectId, Weekday,
    };

    #[test]
    fn test_format_report_card() {
        let card = ReportCard {
            enrollment_id: EnrollmentId::new(),
            period_id: None,
            subjects: vec![SubjectAverage {
                subject_id: SubjectId::new(),
                subject_name: "Mathematics".to_string(),
                coefficient: 4.0,
                average: 14.5,
                grade_count: 3,
            }],
            overall_average: 14.5,
        };

        let text = format_report_card(&card);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Subject"));
        assert!(lines[1].starts_with("Mathematics"));
        assert!(lines[1].contains("14.50"));
        assert!(lines[2].starts_with("Overall"));
    }

    #[test]
    fn test_format_timetable() {
        let row = ClassSubjectId::from_u128(1);
        let slot = Schedule {
            id: ScheduleId::new(),
            class_subject_id: row,
            weekday: Weekday::Wednesday,
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let text = format_timetable(&[slot]);
        assert_eq!(text, format!("wednesday  08:00-09:30  {}\n", row));
    }
}

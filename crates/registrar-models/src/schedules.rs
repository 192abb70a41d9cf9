//! Weekly timetable slots.
//!
//! A slot places one curriculum assignment on a weekday between two times.
//! Slots are half-open, so a lesson ending at 09:00 does not clash with one
//! starting at 09:00.

use crate::ids::{ClassSubjectId, ScheduleId};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

/// School days. Sunday is never scheduled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
    ToSchema,
)]
#[sqlx(type_name = "weekday", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 6] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weekday::ALL
            .into_iter()
            .find(|day| day.as_str() == s)
            .ok_or_else(|| format!("unknown weekday `{}`", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Schedule {
    pub id: ScheduleId,
    pub class_subject_id: ClassSubjectId,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    /// Always after `start_time`
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    pub fn overlaps(&self, weekday: Weekday, start: NaiveTime, end: NaiveTime) -> bool {
        self.weekday == weekday && self.start_time < end && start < self.end_time
    }
}

/// DTO for placing an assignment on the timetable.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateScheduleDto {
    pub class_subject_id: ClassSubjectId,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

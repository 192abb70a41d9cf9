//! Attendance records.

use crate::ids::{AttendanceId, EnrollmentId, SubjectId, TeacherId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "attendance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Attendance {
    pub id: AttendanceId,
    pub enrollment_id: EnrollmentId,
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordAttendanceDto {
    pub enrollment_id: EnrollmentId,
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Attendance counts per status for one enrollment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub excused: u32,
}

impl AttendanceSummary {
    pub fn tally<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Attendance>,
    {
        records
            .into_iter()
            .fold(Self::default(), |mut summary, record| {
                match record.status {
                    AttendanceStatus::Present => summary.present += 1,
                    AttendanceStatus::Absent => summary.absent += 1,
                    AttendanceStatus::Late => summary.late += 1,
                    AttendanceStatus::Excused => summary.excused += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> u32 {
        self.present + self.absent + self.late + self.excused
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::lifecycle::LifecycleStatus;

/// Natural key of a register: one per (date, class, section).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct RegisterKey {
    #[schema(example = "2026-10-19", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = 7)]
    pub class_id: u64,
    #[schema(example = 2)]
    pub section_id: u64,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceRegister {
    pub id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub class_id: u64,
    pub section_id: u64,
    pub status: LifecycleStatus,
    pub marked_by: u64,
}

impl AttendanceRegister {
    pub fn key(&self) -> RegisterKey {
        RegisterKey {
            date: self.date,
            class_id: self.class_id,
            section_id: self.section_id,
        }
    }
}

/// One student's mark inside a register, as submitted and as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceEntry {
    #[schema(example = 1042)]
    pub student_id: u64,
    pub status: AttendanceStatus,
    #[serde(default)]
    #[schema(example = "Bus was late", nullable = true)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct AttendanceCounts {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub excused: u32,
    pub total: u32,
}

impl AttendanceCounts {
    pub fn tally(entries: &[AttendanceEntry]) -> Self {
        let mut counts = AttendanceCounts::default();
        for entry in entries {
            match entry.status {
                AttendanceStatus::Present => counts.present += 1,
                AttendanceStatus::Absent => counts.absent += 1,
                AttendanceStatus::Late => counts.late += 1,
                AttendanceStatus::Excused => counts.excused += 1,
            }
            counts.total += 1;
        }
        counts
    }
}

/// Row of the student-facing history. Only finalized registers produce these.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StudentAttendanceEntry {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
}

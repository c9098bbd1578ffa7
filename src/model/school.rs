use serde::Serialize;
use utoipa::ToSchema;

/// Where a student currently sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema, sqlx::FromRow)]
pub struct StudentPlacement {
    pub student_id: u64,
    pub name: String,
    pub class_id: u64,
    pub section_id: u64,
}

/// A teacher's registered roles in one (class, section).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionAssignment {
    pub homeroom: bool,
    pub subject_ids: Vec<u64>,
}

impl SectionAssignment {
    pub fn teaches_section(&self) -> bool {
        self.homeroom || !self.subject_ids.is_empty()
    }

    pub fn may_enter_marks(&self, subject_id: u64) -> bool {
        self.homeroom || self.subject_ids.contains(&subject_id)
    }
}

/// Notification toggles, one row in the store. Fetched per request and passed
/// down explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationSettings {
    pub attendance: bool,
    pub results: bool,
    pub fees: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            attendance: true,
            results: true,
            fees: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PushTarget {
    pub student_id: u64,
    pub token: String,
}

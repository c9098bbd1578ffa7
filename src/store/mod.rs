//! Datastore seam. The engine only talks to these traits; `mysql` is the
//! production adapter and `memory` backs the unit tests.

use async_trait::async_trait;
use derive_more::Display;

use crate::model::{
    assessment::{Assessment, MarkEntry, NewAssessment},
    attendance::{AttendanceEntry, AttendanceRegister, RegisterKey, StudentAttendanceEntry},
    fee::{FeeOverride, FeeStructure, NewPayment, Payment},
    marksheet::MarksheetLink,
    school::{NotificationSettings, PushTarget, SectionAssignment, StudentPlacement},
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

pub use mysql::MySqlStore;

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "duplicate key: {}", _0)]
    Duplicate(String),
    /// A foreign key pointed at a row that does not exist.
    #[display(fmt = "missing reference: {}", _0)]
    MissingReference(String),
    /// A stored value could not be mapped onto its closed type.
    #[display(fmt = "corrupt row: {}", _0)]
    Corrupt(String),
    #[display(fmt = "database error: {}", _0)]
    Database(String),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::MissingReference(db_err.message().to_string());
            }
        }
        StoreError::Database(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a write guarded on the parent still being a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedWrite {
    Applied,
    /// Parent was finalized (or vanished) before the write could land.
    Rejected,
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn student_placement(&self, student_id: u64) -> StoreResult<Option<StudentPlacement>>;

    async fn students_in_section(
        &self,
        class_id: u64,
        section_id: u64,
    ) -> StoreResult<Vec<StudentPlacement>>;

    async fn section_assignment(
        &self,
        teacher_id: u64,
        class_id: u64,
        section_id: u64,
    ) -> StoreResult<SectionAssignment>;

    async fn subject_exists(&self, subject_id: u64) -> StoreResult<bool>;

    async fn notification_settings(&self) -> StoreResult<NotificationSettings>;

    async fn push_targets(&self, student_ids: &[u64]) -> StoreResult<Vec<PushTarget>>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn fee_structures_for_class(&self, class_id: u64) -> StoreResult<Vec<FeeStructure>>;

    async fn fee_structure(&self, structure_id: u64) -> StoreResult<Option<FeeStructure>>;

    async fn payments_for_student(
        &self,
        student_id: u64,
        structure_ids: &[u64],
    ) -> StoreResult<Vec<Payment>>;

    async fn overrides_for_student(
        &self,
        student_id: u64,
        structure_ids: &[u64],
    ) -> StoreResult<Vec<FeeOverride>>;

    async fn insert_payment(&self, payment: &NewPayment) -> StoreResult<u64>;

    async fn upsert_override(&self, fee_override: &FeeOverride) -> StoreResult<()>;

    async fn delete_override(&self, student_id: u64, fee_structure_id: u64) -> StoreResult<()>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_register(&self, key: &RegisterKey) -> StoreResult<Option<AttendanceRegister>>;

    /// Get-or-create on the natural key. Concurrent callers observe the same row.
    async fn open_register(
        &self,
        key: &RegisterKey,
        marked_by: u64,
    ) -> StoreResult<AttendanceRegister>;

    /// Delete-all then insert-all, only while the register is a draft.
    async fn replace_records(
        &self,
        register_id: u64,
        marked_by: u64,
        records: &[AttendanceEntry],
    ) -> StoreResult<GuardedWrite>;

    /// Conditional draft -> finalized.
    async fn finalize_register(&self, register_id: u64) -> StoreResult<GuardedWrite>;

    async fn register_records(&self, register_id: u64) -> StoreResult<Vec<AttendanceEntry>>;

    async fn finalized_records_for_student(
        &self,
        student_id: u64,
        month: u32,
        year: i32,
    ) -> StoreResult<Vec<StudentAttendanceEntry>>;
}

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn insert_assessment(&self, assessment: &NewAssessment) -> StoreResult<u64>;

    async fn insert_marks(&self, assessment_id: u64, marks: &[MarkEntry]) -> StoreResult<()>;

    async fn find_assessment(&self, assessment_id: u64) -> StoreResult<Option<Assessment>>;

    async fn list_assessments(
        &self,
        class_id: u64,
        section_id: u64,
    ) -> StoreResult<Vec<Assessment>>;

    async fn exam_assessments(
        &self,
        exam_id: u64,
        class_id: u64,
        section_id: u64,
    ) -> StoreResult<Vec<Assessment>>;

    async fn assessment_marks(&self, assessment_id: u64) -> StoreResult<Vec<MarkEntry>>;

    /// Marks of several assessments as `(assessment_id, entry)` pairs.
    async fn marks_for_assessments(
        &self,
        assessment_ids: &[u64],
    ) -> StoreResult<Vec<(u64, MarkEntry)>>;

    async fn replace_marks(
        &self,
        assessment_id: u64,
        marks: &[MarkEntry],
    ) -> StoreResult<GuardedWrite>;

    async fn finalize_assessment(&self, assessment_id: u64) -> StoreResult<GuardedWrite>;

    /// Removes a draft assessment and its marks.
    async fn delete_assessment(&self, assessment_id: u64) -> StoreResult<GuardedWrite>;

    /// Unconditional removal, used to compensate a half-finished create.
    async fn discard_assessment(&self, assessment_id: u64) -> StoreResult<()>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn marksheet_link(
        &self,
        student_id: u64,
        exam_id: u64,
    ) -> StoreResult<Option<MarksheetLink>>;

    async fn marksheet_links_for_exam(
        &self,
        exam_id: u64,
        student_ids: &[u64],
    ) -> StoreResult<Vec<MarksheetLink>>;

    async fn upsert_marksheet_link(&self, link: &MarksheetLink) -> StoreResult<()>;
}

/// Everything a request handler needs from the datastore.
pub trait SchoolStore:
    DirectoryStore + LedgerStore + AttendanceStore + AssessmentStore + ResultStore
{
}

impl<T> SchoolStore for T where
    T: DirectoryStore + LedgerStore + AttendanceStore + AssessmentStore + ResultStore
{
}

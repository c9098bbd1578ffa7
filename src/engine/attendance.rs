use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::{Actor, SectionNeed, authorize_section, ensure_students_in_section, ensure_unique_students};
use crate::{
    error::{AppError, AppResult},
    model::{
        attendance::{
            AttendanceCounts, AttendanceEntry, AttendanceRegister, AttendanceStatus, RegisterKey,
            StudentAttendanceEntry,
        },
        lifecycle::LifecycleStatus,
        school::NotificationSettings,
    },
    notify::{DomainEvent, EventSink},
    store::{AttendanceStore, DirectoryStore, GuardedWrite},
};

pub const LOCKED_MESSAGE: &str = "Attendance is already FINALIZED. No edits allowed.";
const MAX_REMARKS_LEN: usize = 255;

/// Register state as exposed to clients; `NotStarted` means no row exists yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegisterState {
    NotStarted,
    Draft,
    Finalized,
}

impl From<LifecycleStatus> for RegisterState {
    fn from(status: LifecycleStatus) -> Self {
        match status {
            LifecycleStatus::Draft => RegisterState::Draft,
            LifecycleStatus::Finalized => RegisterState::Finalized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceStatusView {
    pub status: RegisterState,
    pub is_finalized: bool,
    pub counts: AttendanceCounts,
    pub register_id: Option<u64>,
}

/// Staff view of one register, draft records included.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSheet {
    pub key: RegisterKey,
    pub status: RegisterState,
    pub is_finalized: bool,
    pub register_id: Option<u64>,
    pub marked_by: Option<u64>,
    pub counts: AttendanceCounts,
    pub records: Vec<AttendanceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StudentAttendanceReport {
    pub student_id: u64,
    pub month: u32,
    pub year: i32,
    pub summary: AttendanceCounts,
    pub entries: Vec<StudentAttendanceEntry>,
}

fn validate_records(records: &[AttendanceEntry]) -> AppResult<()> {
    if records.is_empty() {
        return Err(AppError::validation("records must not be empty"));
    }
    ensure_unique_students(records.iter().map(|r| r.student_id))?;
    if let Some(r) = records
        .iter()
        .find(|r| r.remarks.as_deref().is_some_and(|s| s.chars().count() > MAX_REMARKS_LEN))
    {
        return Err(AppError::validation(format!(
            "remarks for student {} exceed {MAX_REMARKS_LEN} characters",
            r.student_id
        )));
    }
    Ok(())
}

/// Creates the register on first call, replaces the whole record set on later
/// calls while it is a draft. Calling twice with the same records leaves the
/// same stored state.
pub async fn mark_attendance<S>(
    store: &S,
    actor: &Actor,
    key: RegisterKey,
    records: &[AttendanceEntry],
) -> AppResult<AttendanceRegister>
where
    S: AttendanceStore + DirectoryStore + ?Sized,
{
    validate_records(records)?;
    let ids: Vec<u64> = records.iter().map(|r| r.student_id).collect();
    ensure_students_in_section(store, key.class_id, key.section_id, &ids).await?;
    authorize_section(store, actor, key.class_id, key.section_id, SectionNeed::Teaching).await?;

    let register = store.open_register(&key, actor.user_id).await?;
    if register.status.is_finalized() {
        warn!(register_id = register.id, "Rejected edit of finalized register");
        return Err(AppError::EditLocked(LOCKED_MESSAGE.to_string()));
    }

    match store
        .replace_records(register.id, actor.user_id, records)
        .await?
    {
        GuardedWrite::Applied => {
            info!(
                register_id = register.id,
                date = %key.date,
                class_id = key.class_id,
                section_id = key.section_id,
                records = records.len(),
                "Attendance draft saved"
            );
            Ok(AttendanceRegister {
                marked_by: actor.user_id,
                ..register
            })
        }
        GuardedWrite::Rejected => {
            warn!(register_id = register.id, "Register finalized while saving draft");
            Err(AppError::EditLocked(LOCKED_MESSAGE.to_string()))
        }
    }
}

/// One-way draft -> finalized. Emits the cohort event after the commit.
pub async fn finalize_attendance<S>(
    store: &S,
    actor: &Actor,
    settings: &NotificationSettings,
    sink: &dyn EventSink,
    key: RegisterKey,
) -> AppResult<AttendanceRegister>
where
    S: AttendanceStore + DirectoryStore + ?Sized,
{
    let register = store.find_register(&key).await?.ok_or_else(|| {
        AppError::not_found("No attendance register found for this date, class and section")
    })?;

    authorize_section(store, actor, key.class_id, key.section_id, SectionNeed::Teaching).await?;

    if register.status.is_finalized() {
        return Err(AppError::AlreadyFinalized(
            "Attendance is already FINALIZED".to_string(),
        ));
    }

    if store.finalize_register(register.id).await? == GuardedWrite::Rejected {
        return Err(AppError::AlreadyFinalized(
            "Attendance is already FINALIZED".to_string(),
        ));
    }

    info!(register_id = register.id, date = %key.date, "Attendance finalized");

    let finalized = AttendanceRegister {
        status: LifecycleStatus::Finalized,
        ..register
    };

    if settings.attendance {
        match store.register_records(finalized.id).await {
            Ok(records) => {
                let (present, absent) = cohorts(&records);
                sink.emit(DomainEvent::AttendanceFinalized {
                    register_id: finalized.id,
                    key,
                    present,
                    absent,
                });
            }
            Err(e) => warn!(error = %e, register_id = finalized.id, "Skipping attendance notification"),
        }
    }

    Ok(finalized)
}

/// Present and late students hear one message, absentees another. Excused
/// absences are not notified.
fn cohorts(records: &[AttendanceEntry]) -> (Vec<u64>, Vec<u64>) {
    let mut present = Vec::new();
    let mut absent = Vec::new();
    for r in records {
        match r.status {
            AttendanceStatus::Present | AttendanceStatus::Late => present.push(r.student_id),
            AttendanceStatus::Absent => absent.push(r.student_id),
            AttendanceStatus::Excused => {}
        }
    }
    (present, absent)
}

pub async fn attendance_status<S>(store: &S, key: &RegisterKey) -> AppResult<AttendanceStatusView>
where
    S: AttendanceStore + ?Sized,
{
    let sheet = attendance_sheet(store, key).await?;
    Ok(AttendanceStatusView {
        status: sheet.status,
        is_finalized: sheet.is_finalized,
        counts: sheet.counts,
        register_id: sheet.register_id,
    })
}

pub async fn attendance_sheet<S>(store: &S, key: &RegisterKey) -> AppResult<AttendanceSheet>
where
    S: AttendanceStore + ?Sized,
{
    let Some(register) = store.find_register(key).await? else {
        return Ok(AttendanceSheet {
            key: *key,
            status: RegisterState::NotStarted,
            is_finalized: false,
            register_id: None,
            marked_by: None,
            counts: AttendanceCounts::default(),
            records: Vec::new(),
        });
    };

    let records = store.register_records(register.id).await?;
    Ok(AttendanceSheet {
        key: *key,
        status: register.status.into(),
        is_finalized: register.status.is_finalized(),
        register_id: Some(register.id),
        marked_by: Some(register.marked_by),
        counts: AttendanceCounts::tally(&records),
        records,
    })
}

/// Monthly history for one student. Only finalized registers contribute.
pub async fn student_attendance_report<S>(
    store: &S,
    student_id: u64,
    month: u32,
    year: i32,
) -> AppResult<StudentAttendanceReport>
where
    S: AttendanceStore + ?Sized,
{
    if !(1..=12).contains(&month) {
        return Err(AppError::validation("month must be between 1 and 12"));
    }
    if !(2000..=2100).contains(&year) {
        return Err(AppError::validation("year is out of range"));
    }

    let entries = store
        .finalized_records_for_student(student_id, month, year)
        .await?;

    let mut summary = AttendanceCounts::default();
    for e in &entries {
        match e.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::Late => summary.late += 1,
            AttendanceStatus::Excused => summary.excused += 1,
        }
        summary.total += 1;
    }

    Ok(StudentAttendanceReport {
        student_id,
        month,
        year,
        summary,
        entries,
    })
}

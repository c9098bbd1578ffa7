use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use super::{
    Actor,
    gate::{LockDecision, is_locked},
    ledger::load_fee_status_for,
    placement_of,
};
use crate::{
    error::{AppError, AppResult},
    model::{
        assessment::Assessment,
        marksheet::{APPROVAL_SENTINEL, MarksheetLink, MarksheetState},
        school::NotificationSettings,
    },
    notify::{DomainEvent, EventSink},
    store::{AssessmentStore, DirectoryStore, LedgerStore, ResultStore},
};

const PASS_PERCENT: i64 = 35;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SubjectResult {
    pub assessment_id: u64,
    pub subject_id: u64,
    #[schema(example = "Mathematics")]
    pub subject_name: String,
    #[schema(value_type = String, example = "42")]
    pub marks_obtained: Decimal,
    #[schema(value_type = String, example = "100")]
    pub max_marks: Decimal,
    pub passed: bool,
    pub is_finalized: bool,
}

/// What a student may see for one exam. Raw marks are always present; the
/// official document is withheld while fees are pending.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StudentResult {
    pub student_id: u64,
    pub exam_id: u64,
    pub marks: Vec<SubjectResult>,
    #[schema(value_type = String)]
    pub total_obtained: Decimal,
    #[schema(value_type = String)]
    pub total_max: Decimal,
    /// Either a document URL or the `APPROVED` marker. Null while locked.
    pub marksheet_url: Option<String>,
    pub approved: bool,
    pub locked: bool,
    pub lock_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GridSubject {
    pub assessment_id: u64,
    pub subject_id: u64,
    pub subject_name: String,
    #[schema(value_type = String)]
    pub max_marks: Decimal,
    pub is_finalized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GridStudent {
    pub student_id: u64,
    pub name: String,
    /// Aligned with `subjects`; null where no mark was entered.
    #[schema(value_type = Vec<String>)]
    pub marks: Vec<Option<Decimal>>,
    #[schema(value_type = String)]
    pub total_obtained: Decimal,
    #[schema(value_type = String)]
    pub total_max: Decimal,
    pub marksheet: MarksheetState,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ExamResultsGrid {
    pub exam_id: u64,
    pub class_id: u64,
    pub section_id: u64,
    pub subjects: Vec<GridSubject>,
    pub students: Vec<GridStudent>,
}

/// `obtained / max >= 0.35`, evaluated without division.
pub fn passed(obtained: Decimal, max: Decimal) -> bool {
    max > Decimal::ZERO && obtained * Decimal::from(100) >= max * Decimal::from(PASS_PERCENT)
}

pub async fn student_result<S>(
    store: &S,
    student_id: u64,
    exam_id: u64,
    as_of: NaiveDate,
) -> AppResult<StudentResult>
where
    S: DirectoryStore + LedgerStore + AssessmentStore + ResultStore + ?Sized,
{
    let placement = placement_of(store, student_id).await?;
    let report = load_fee_status_for(store, &placement, as_of).await?;
    let LockDecision { locked, reason } = is_locked(&report);

    let papers = store
        .exam_assessments(exam_id, placement.class_id, placement.section_id)
        .await?;
    let ids: Vec<u64> = papers.iter().map(|a| a.id).collect();
    let obtained: HashMap<u64, Decimal> = if ids.is_empty() {
        HashMap::new()
    } else {
        store
            .marks_for_assessments(&ids)
            .await?
            .into_iter()
            .filter(|(_, m)| m.student_id == student_id)
            .map(|(aid, m)| (aid, m.marks_obtained))
            .collect()
    };

    let marks: Vec<SubjectResult> = papers
        .iter()
        .filter_map(|paper| {
            obtained.get(&paper.id).map(|&got| SubjectResult {
                assessment_id: paper.id,
                subject_id: paper.subject_id,
                subject_name: paper.subject_name.clone(),
                marks_obtained: got,
                max_marks: paper.max_marks,
                passed: passed(got, paper.max_marks),
                is_finalized: paper.status.is_finalized(),
            })
        })
        .collect();

    let total_obtained = marks.iter().map(|m| m.marks_obtained).sum();
    let total_max = marks.iter().map(|m| m.max_marks).sum();

    let link = store.marksheet_link(student_id, exam_id).await?;
    let (marksheet_url, approved) = match (&link, locked) {
        (_, true) | (None, _) => (None, false),
        (Some(l), false) => (Some(l.file_url.clone()), true),
    };

    if locked && link.is_some() {
        info!(student_id, exam_id, "Marksheet withheld: fees pending");
    }

    Ok(StudentResult {
        student_id,
        exam_id,
        marks,
        total_obtained,
        total_max,
        marksheet_url,
        approved,
        locked,
        lock_reason: reason,
    })
}

/// Every student of the section against every paper of the exam.
pub async fn exam_results_grid<S>(
    store: &S,
    exam_id: u64,
    class_id: u64,
    section_id: u64,
) -> AppResult<ExamResultsGrid>
where
    S: DirectoryStore + AssessmentStore + ResultStore + ?Sized,
{
    let papers = store.exam_assessments(exam_id, class_id, section_id).await?;
    let roster = store.students_in_section(class_id, section_id).await?;

    let ids: Vec<u64> = papers.iter().map(|a| a.id).collect();
    let mut cells: HashMap<(u64, u64), Decimal> = HashMap::new();
    if !ids.is_empty() {
        for (aid, m) in store.marks_for_assessments(&ids).await? {
            cells.insert((aid, m.student_id), m.marks_obtained);
        }
    }

    let student_ids: Vec<u64> = roster.iter().map(|s| s.student_id).collect();
    let links: HashMap<u64, MarksheetLink> = if student_ids.is_empty() {
        HashMap::new()
    } else {
        store
            .marksheet_links_for_exam(exam_id, &student_ids)
            .await?
            .into_iter()
            .map(|l| (l.student_id, l))
            .collect()
    };

    let subjects = papers.iter().map(grid_subject).collect();
    let students = roster
        .into_iter()
        .map(|s| {
            let marks: Vec<Option<Decimal>> = papers
                .iter()
                .map(|p| cells.get(&(p.id, s.student_id)).copied())
                .collect();
            GridStudent {
                total_obtained: marks.iter().flatten().copied().sum(),
                total_max: papers.iter().map(|p| p.max_marks).sum(),
                marksheet: MarksheetState::of(links.get(&s.student_id)),
                student_id: s.student_id,
                name: s.name,
                marks,
            }
        })
        .collect();

    Ok(ExamResultsGrid {
        exam_id,
        class_id,
        section_id,
        subjects,
        students,
    })
}

fn grid_subject(a: &Assessment) -> GridSubject {
    GridSubject {
        assessment_id: a.id,
        subject_id: a.subject_id,
        subject_name: a.subject_name.clone(),
        max_marks: a.max_marks,
        is_finalized: a.status.is_finalized(),
    }
}

/// Approval without a document; stores the sentinel in place of a URL.
pub async fn approve_result<S>(
    store: &S,
    actor: &Actor,
    settings: &NotificationSettings,
    sink: &dyn EventSink,
    student_id: u64,
    exam_id: u64,
) -> AppResult<MarksheetLink>
where
    S: DirectoryStore + AssessmentStore + ResultStore + ?Sized,
{
    publish_marksheet(
        store,
        actor,
        settings,
        sink,
        student_id,
        exam_id,
        APPROVAL_SENTINEL.to_string(),
    )
    .await
}

pub async fn publish_marksheet<S>(
    store: &S,
    actor: &Actor,
    settings: &NotificationSettings,
    sink: &dyn EventSink,
    student_id: u64,
    exam_id: u64,
    file_url: String,
) -> AppResult<MarksheetLink>
where
    S: DirectoryStore + AssessmentStore + ResultStore + ?Sized,
{
    actor.require_admin()?;
    let file_url = validate_file_url(&file_url)?;

    let placement = placement_of(store, student_id).await?;
    let papers = store
        .exam_assessments(exam_id, placement.class_id, placement.section_id)
        .await?;
    if papers.is_empty() {
        return Err(AppError::not_found(format!(
            "Exam {exam_id} has no papers for this student's class"
        )));
    }

    let link = MarksheetLink {
        student_id,
        exam_id,
        file_url,
    };
    store.upsert_marksheet_link(&link).await?;
    info!(
        student_id,
        exam_id,
        approval_only = link.is_approval_only(),
        "Marksheet published"
    );

    if settings.results {
        sink.emit(DomainEvent::MarksheetPublished {
            student_id,
            exam_id,
        });
    }

    Ok(link)
}

fn validate_file_url(raw: &str) -> AppResult<String> {
    let url = raw.trim();
    if url == APPROVAL_SENTINEL {
        return Ok(url.to_string());
    }
    if url.is_empty() || url.len() > 1024 {
        return Err(AppError::validation("file_url must be 1-1024 characters"));
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(AppError::validation(format!(
            "file_url must be an http(s) link or \"{APPROVAL_SENTINEL}\""
        )));
    }
    Ok(url.to_string())
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::{Actor, SectionNeed, authorize_section, ensure_students_in_section, ensure_unique_students};
use crate::{
    error::{AppError, AppResult},
    model::{
        assessment::{Assessment, AssessmentKind, MarkEntry, NewAssessment},
        lifecycle::LifecycleStatus,
        school::NotificationSettings,
    },
    notify::{DomainEvent, EventSink},
    store::{AssessmentStore, DirectoryStore, GuardedWrite},
};

pub const LOCKED_MESSAGE: &str = "Assessment is already FINALIZED. No edits allowed.";

/// Caller-supplied fields of a new class test or exam paper.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentDraft {
    pub kind: AssessmentKind,
    pub exam_id: Option<u64>,
    pub class_id: u64,
    pub section_id: u64,
    pub subject_id: u64,
    pub title: String,
    pub max_marks: Decimal,
    pub held_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AssessmentDetail {
    pub assessment: Assessment,
    pub is_finalized: bool,
    pub marks: Vec<MarkEntry>,
}

const MAX_TITLE_LEN: usize = 200;

/// Largest value a DECIMAL(6,2) marks column holds.
const MARKS_CEILING: Decimal = Decimal::from_parts(999_999, 0, 0, false, 2);

fn validate_draft(draft: &AssessmentDraft) -> AppResult<()> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    if draft.max_marks <= Decimal::ZERO {
        return Err(AppError::validation("max_marks must be greater than zero"));
    }
    if draft.max_marks.scale() > 2 || draft.max_marks > MARKS_CEILING {
        return Err(AppError::validation(format!(
            "max_marks must have at most two decimal places and not exceed {MARKS_CEILING}"
        )));
    }
    match (draft.kind, draft.exam_id) {
        (AssessmentKind::ExamSubject, None) => {
            Err(AppError::validation("exam_id is required for exam subjects"))
        }
        (AssessmentKind::ClassTest, Some(_)) => {
            Err(AppError::validation("class tests cannot belong to an exam"))
        }
        _ => Ok(()),
    }
}

fn validate_marks(marks: &[MarkEntry], max_marks: Decimal) -> AppResult<()> {
    ensure_unique_students(marks.iter().map(|m| m.student_id))?;
    for m in marks {
        if m.marks_obtained.scale() > 2 {
            return Err(AppError::validation(format!(
                "marks for student {} have more than two decimal places",
                m.student_id
            )));
        }
        if m.marks_obtained < Decimal::ZERO || m.marks_obtained > max_marks {
            return Err(AppError::validation(format!(
                "marks for student {} must be between 0 and {max_marks}",
                m.student_id
            )));
        }
    }
    Ok(())
}

fn student_ids(marks: &[MarkEntry]) -> Vec<u64> {
    marks.iter().map(|m| m.student_id).collect()
}

/// Inserts the draft and its marks. A failed marks insert removes the
/// assessment row again so no orphan draft is left behind.
pub async fn create_assessment<S>(
    store: &S,
    actor: &Actor,
    draft: AssessmentDraft,
    marks: &[MarkEntry],
) -> AppResult<Assessment>
where
    S: AssessmentStore + DirectoryStore + ?Sized,
{
    validate_draft(&draft)?;
    validate_marks(marks, draft.max_marks)?;
    if !store.subject_exists(draft.subject_id).await? {
        return Err(AppError::not_found(format!(
            "Subject {} not found",
            draft.subject_id
        )));
    }
    ensure_students_in_section(store, draft.class_id, draft.section_id, &student_ids(marks)).await?;
    authorize_section(
        store,
        actor,
        draft.class_id,
        draft.section_id,
        SectionNeed::Subject(draft.subject_id),
    )
    .await?;

    let new = NewAssessment {
        kind: draft.kind,
        exam_id: draft.exam_id,
        class_id: draft.class_id,
        section_id: draft.section_id,
        subject_id: draft.subject_id,
        title: draft.title.trim().to_string(),
        max_marks: draft.max_marks,
        held_on: draft.held_on,
        created_by: actor.user_id,
    };

    let id = store.insert_assessment(&new).await?;

    if !marks.is_empty() {
        if let Err(e) = store.insert_marks(id, marks).await {
            error!(error = %e, assessment_id = id, "Marks insert failed, rolling back assessment");
            if let Err(cleanup) = store.discard_assessment(id).await {
                error!(error = %cleanup, assessment_id = id, "Compensating delete failed");
            }
            return Err(e.into());
        }
    }

    info!(assessment_id = id, kind = %new.kind, marks = marks.len(), "Assessment created");

    store
        .find_assessment(id)
        .await?
        .ok_or_else(|| AppError::Upstream("Assessment vanished after insert".to_string()))
}

/// Replaces marks and/or finalizes. Anything on a finalized assessment is
/// rejected with `EditLocked`.
pub async fn update_assessment<S>(
    store: &S,
    actor: &Actor,
    settings: &NotificationSettings,
    sink: &dyn EventSink,
    assessment_id: u64,
    marks: Option<&[MarkEntry]>,
    finalize: bool,
) -> AppResult<Assessment>
where
    S: AssessmentStore + DirectoryStore + ?Sized,
{
    let assessment = find(store, assessment_id).await?;

    if marks.is_none() && !finalize {
        return Err(AppError::validation(
            "Nothing to update: provide records or finalize",
        ));
    }

    authorize_section(
        store,
        actor,
        assessment.class_id,
        assessment.section_id,
        SectionNeed::Subject(assessment.subject_id),
    )
    .await?;

    if assessment.status.is_finalized() {
        warn!(assessment_id, "Rejected edit of finalized assessment");
        return Err(AppError::EditLocked(LOCKED_MESSAGE.to_string()));
    }

    if let Some(marks) = marks {
        validate_marks(marks, assessment.max_marks)?;
        ensure_students_in_section(
            store,
            assessment.class_id,
            assessment.section_id,
            &student_ids(marks),
        )
        .await?;

        if store.replace_marks(assessment_id, marks).await? == GuardedWrite::Rejected {
            return Err(AppError::EditLocked(LOCKED_MESSAGE.to_string()));
        }
        info!(assessment_id, marks = marks.len(), "Assessment marks replaced");
    }

    if !finalize {
        return Ok(assessment);
    }

    if store.finalize_assessment(assessment_id).await? == GuardedWrite::Rejected {
        return Err(AppError::EditLocked(LOCKED_MESSAGE.to_string()));
    }
    info!(assessment_id, "Assessment finalized");

    if settings.results {
        match store.assessment_marks(assessment_id).await {
            Ok(stored) => sink.emit(DomainEvent::AssessmentFinalized {
                assessment_id,
                title: assessment.title.clone(),
                subject_name: assessment.subject_name.clone(),
                student_ids: student_ids(&stored),
            }),
            Err(e) => warn!(error = %e, assessment_id, "Skipping marks notification"),
        }
    }

    Ok(Assessment {
        status: LifecycleStatus::Finalized,
        ..assessment
    })
}

pub async fn delete_assessment<S>(store: &S, actor: &Actor, assessment_id: u64) -> AppResult<()>
where
    S: AssessmentStore + DirectoryStore + ?Sized,
{
    let assessment = find(store, assessment_id).await?;
    authorize_section(
        store,
        actor,
        assessment.class_id,
        assessment.section_id,
        SectionNeed::Subject(assessment.subject_id),
    )
    .await?;

    if assessment.status.is_finalized()
        || store.delete_assessment(assessment_id).await? == GuardedWrite::Rejected
    {
        warn!(assessment_id, "Rejected delete of finalized assessment");
        return Err(AppError::EditLocked(LOCKED_MESSAGE.to_string()));
    }

    info!(assessment_id, "Assessment deleted");
    Ok(())
}

pub async fn assessment_detail<S>(store: &S, assessment_id: u64) -> AppResult<AssessmentDetail>
where
    S: AssessmentStore + ?Sized,
{
    let assessment = find(store, assessment_id).await?;
    let marks = store.assessment_marks(assessment_id).await?;
    Ok(AssessmentDetail {
        is_finalized: assessment.status.is_finalized(),
        assessment,
        marks,
    })
}

pub async fn list_assessments<S>(
    store: &S,
    class_id: u64,
    section_id: u64,
    kind: Option<AssessmentKind>,
) -> AppResult<Vec<Assessment>>
where
    S: AssessmentStore + ?Sized,
{
    let mut all = store.list_assessments(class_id, section_id).await?;
    if let Some(kind) = kind {
        all.retain(|a| a.kind == kind);
    }
    Ok(all)
}

async fn find<S>(store: &S, assessment_id: u64) -> AppResult<Assessment>
where
    S: AssessmentStore + ?Sized,
{
    store
        .find_assessment(assessment_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Assessment {assessment_id} not found")))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        engine::fixtures::{admin, day, teacher},
        notify::testing::RecordingSink,
        store::{StoreError, memory::MemoryStore},
    };

    const MATHS: u64 = 42;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_subject(MATHS, "Mathematics");
        store.add_student(1, "Asha", 5, 1);
        store.add_student(2, "Bilal", 5, 1);
        store.add_student(9, "Elsewhere", 6, 1);
        store.assign_subject(8, 5, 1, MATHS);
        store.assign_homeroom(7, 5, 1);
        store
    }

    fn class_test() -> AssessmentDraft {
        AssessmentDraft {
            kind: AssessmentKind::ClassTest,
            exam_id: None,
            class_id: 5,
            section_id: 1,
            subject_id: MATHS,
            title: "Unit test 1".into(),
            max_marks: dec!(50),
            held_on: day(2026, 10, 12),
        }
    }

    fn mark(student_id: u64, marks: Decimal) -> MarkEntry {
        MarkEntry {
            student_id,
            marks_obtained: marks,
        }
    }

    #[actix_web::test]
    async fn finalized_test_rejects_new_records_and_delete() {
        let store = seeded();
        let sink = RecordingSink::default();
        let settings = NotificationSettings::default();
        let actor = teacher(8);

        let created = create_assessment(&store, &actor, class_test(), &[])
            .await
            .unwrap();
        assert_eq!(created.status, LifecycleStatus::Draft);
        assert_eq!(created.subject_name, "Mathematics");

        let marks = [mark(1, dec!(40)), mark(2, dec!(22.5))];
        let finalized = update_assessment(
            &store,
            &actor,
            &settings,
            &sink,
            created.id,
            Some(&marks[..]),
            true,
        )
        .await
        .unwrap();
        assert_eq!(finalized.status, LifecycleStatus::Finalized);

        let before = assessment_detail(&store, created.id).await.unwrap();
        assert_eq!(before.marks.len(), 2);

        let err = update_assessment(
            &store,
            &actor,
            &settings,
            &sink,
            created.id,
            Some(&[mark(1, dec!(50))][..]),
            false,
        )
        .await
        .unwrap_err();
        assert_eq!(err, AppError::EditLocked(LOCKED_MESSAGE.to_string()));

        let err = update_assessment(&store, &actor, &settings, &sink, created.id, None, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EditLocked(_)));

        let err = delete_assessment(&store, &actor, created.id).await.unwrap_err();
        assert!(matches!(err, AppError::EditLocked(_)));

        let after = assessment_detail(&store, created.id).await.unwrap();
        assert_eq!(before, after);
    }

    #[actix_web::test]
    async fn finalize_emits_marks_event_once() {
        let store = seeded();
        let sink = RecordingSink::default();
        let created = create_assessment(&store, &teacher(8), class_test(), &[mark(1, dec!(10))])
            .await
            .unwrap();

        update_assessment(
            &store,
            &teacher(8),
            &NotificationSettings::default(),
            &sink,
            created.id,
            None,
            true,
        )
        .await
        .unwrap();

        assert_eq!(
            sink.events(),
            vec![DomainEvent::AssessmentFinalized {
                assessment_id: created.id,
                title: "Unit test 1".into(),
                subject_name: "Mathematics".into(),
                student_ids: vec![1],
            }]
        );
    }

    #[actix_web::test]
    async fn failed_marks_insert_leaves_no_orphan_draft() {
        let store = seeded();
        store.fail_next_marks_insert();

        let err = create_assessment(&store, &teacher(8), class_test(), &[mark(1, dec!(10))])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
        assert_eq!(store.assessment_count(), 0);
    }

    #[actix_web::test]
    async fn unassigned_teacher_writes_nothing() {
        let store = seeded();
        store.assign_subject(11, 5, 1, 77);

        let err = create_assessment(&store, &teacher(11), class_test(), &[mark(1, dec!(10))])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
        assert_eq!(store.assessment_count(), 0);

        let created = create_assessment(&store, &teacher(8), class_test(), &[mark(1, dec!(10))])
            .await
            .unwrap();
        let err = update_assessment(
            &store,
            &teacher(11),
            &NotificationSettings::default(),
            &RecordingSink::default(),
            created.id,
            Some(&[mark(1, dec!(49))][..]),
            false,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
        let detail = assessment_detail(&store, created.id).await.unwrap();
        assert_eq!(detail.marks, vec![mark(1, dec!(10))]);
    }

    #[actix_web::test]
    async fn homeroom_teacher_may_enter_any_subject() {
        let store = seeded();
        create_assessment(&store, &teacher(7), class_test(), &[mark(2, dec!(33))])
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn marks_are_range_checked() {
        let store = seeded();
        for bad in [dec!(-1), dec!(50.5)] {
            let err = create_assessment(&store, &admin(), class_test(), &[mark(1, bad)])
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        let err = create_assessment(&store, &admin(), class_test(), &[mark(9, dec!(1))])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.assessment_count(), 0);
    }

    #[actix_web::test]
    async fn marks_must_fit_two_decimal_columns() {
        let store = seeded();

        let mut huge = class_test();
        huge.max_marks = dec!(100000);
        let err = create_assessment(&store, &admin(), huge, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut fine_grained = class_test();
        fine_grained.max_marks = dec!(50.125);
        let err = create_assessment(&store, &admin(), fine_grained, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = create_assessment(&store, &admin(), class_test(), &[mark(1, dec!(34.995))])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.assessment_count(), 0);

        let mut widest = class_test();
        widest.max_marks = dec!(9999.99);
        create_assessment(&store, &admin(), widest, &[mark(1, dec!(9999.99))])
            .await
            .unwrap();
    }

    #[test]
    fn marks_ceiling_matches_marks_column() {
        assert_eq!(MARKS_CEILING, dec!(9999.99));
    }

    #[actix_web::test]
    async fn unknown_subject_is_not_found() {
        let store = seeded();
        let mut draft = class_test();
        draft.subject_id = 999;
        let err = create_assessment(&store, &admin(), draft.clone(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.assessment_count(), 0);

        let new = NewAssessment {
            kind: draft.kind,
            exam_id: None,
            class_id: draft.class_id,
            section_id: draft.section_id,
            subject_id: draft.subject_id,
            title: draft.title,
            max_marks: draft.max_marks,
            held_on: draft.held_on,
            created_by: 1,
        };
        let err = store.insert_assessment(&new).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));
    }

    #[actix_web::test]
    async fn title_limit_counts_characters_not_bytes() {
        let store = seeded();
        let mut accented = class_test();
        accented.title = "é".repeat(MAX_TITLE_LEN);
        create_assessment(&store, &admin(), accented, &[]).await.unwrap();

        let mut too_long = class_test();
        too_long.title = "é".repeat(MAX_TITLE_LEN + 1);
        let err = create_assessment(&store, &admin(), too_long, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[actix_web::test]
    async fn exam_subjects_need_an_exam() {
        let store = seeded();
        let draft = AssessmentDraft {
            kind: AssessmentKind::ExamSubject,
            ..class_test()
        };
        let err = create_assessment(&store, &admin(), draft, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[actix_web::test]
    async fn empty_update_is_a_validation_error() {
        let store = seeded();
        let created = create_assessment(&store, &admin(), class_test(), &[])
            .await
            .unwrap();
        let err = update_assessment(
            &store,
            &admin(),
            &NotificationSettings::default(),
            &RecordingSink::default(),
            created.id,
            None,
            false,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[actix_web::test]
    async fn draft_can_be_deleted() {
        let store = seeded();
        let created = create_assessment(&store, &admin(), class_test(), &[mark(1, dec!(5))])
            .await
            .unwrap();
        delete_assessment(&store, &admin(), created.id).await.unwrap();
        let err = assessment_detail(&store, created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[actix_web::test]
    async fn list_filters_by_kind() {
        let store = seeded();
        create_assessment(&store, &admin(), class_test(), &[]).await.unwrap();
        let exam_paper = AssessmentDraft {
            kind: AssessmentKind::ExamSubject,
            exam_id: Some(3),
            ..class_test()
        };
        create_assessment(&store, &admin(), exam_paper, &[]).await.unwrap();

        assert_eq!(list_assessments(&store, 5, 1, None).await.unwrap().len(), 2);
        let tests = list_assessments(&store, 5, 1, Some(AssessmentKind::ClassTest))
            .await
            .unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].kind, AssessmentKind::ClassTest);
    }
}

//! Academic ledger and gating rules. Handlers call into these functions; all
//! persistence goes through the `store` traits so the rules can be exercised
//! without a database.

use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    model::{role::Role, school::StudentPlacement},
    store::DirectoryStore,
};

pub mod assessment;
pub mod attendance;
pub mod fees;
pub mod gate;
pub mod ledger;
pub mod results;

/// The authenticated caller as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: u64,
    pub role: Role,
    /// Teacher id or student id, depending on `role`.
    pub profile_id: Option<u64>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin only"))
        }
    }

    pub fn require_staff(&self) -> AppResult<()> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::forbidden("Staff only"))
        }
    }

    /// Staff may read any student; a student only themselves.
    pub fn ensure_can_view_student(&self, student_id: u64) -> AppResult<()> {
        match self.role {
            Role::Admin | Role::Teacher => Ok(()),
            Role::Student if self.profile_id == Some(student_id) => Ok(()),
            Role::Student => Err(AppError::forbidden(
                "Students may only view their own records",
            )),
        }
    }
}

/// Which assignment a teacher must hold in the section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionNeed {
    /// Homeroom or any subject in the section.
    Teaching,
    Homeroom,
    /// Subject teacher for this subject, or homeroom.
    Subject(u64),
}

pub(crate) async fn authorize_section<S>(
    store: &S,
    actor: &Actor,
    class_id: u64,
    section_id: u64,
    need: SectionNeed,
) -> AppResult<()>
where
    S: DirectoryStore + ?Sized,
{
    match actor.role {
        Role::Admin => return Ok(()),
        Role::Student => return Err(AppError::forbidden("Staff only")),
        Role::Teacher => {}
    }

    let teacher_id = actor
        .profile_id
        .ok_or_else(|| AppError::forbidden("No teacher profile"))?;

    let assignment = store
        .section_assignment(teacher_id, class_id, section_id)
        .await?;

    let allowed = match need {
        SectionNeed::Teaching => assignment.teaches_section(),
        SectionNeed::Homeroom => assignment.homeroom,
        SectionNeed::Subject(subject_id) => assignment.may_enter_marks(subject_id),
    };

    if allowed {
        Ok(())
    } else {
        tracing::warn!(teacher_id, class_id, section_id, ?need, "Section authorization failed");
        Err(AppError::forbidden(match need {
            SectionNeed::Teaching => "You are not assigned to this class section",
            SectionNeed::Homeroom => "Only the class teacher of this section may do this",
            SectionNeed::Subject(_) => {
                "You are neither the subject teacher nor the class teacher for this section"
            }
        }))
    }
}

pub(crate) async fn placement_of<S>(store: &S, student_id: u64) -> AppResult<StudentPlacement>
where
    S: DirectoryStore + ?Sized,
{
    store
        .student_placement(student_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Student {student_id} has no class placement")))
}

/// Rejects repeated student ids in one submission.
pub(crate) fn ensure_unique_students(ids: impl IntoIterator<Item = u64>) -> AppResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(AppError::validation(format!(
                "Student {id} appears more than once"
            )));
        }
    }
    Ok(())
}

pub(crate) async fn ensure_students_in_section<S>(
    store: &S,
    class_id: u64,
    section_id: u64,
    ids: &[u64],
) -> AppResult<()>
where
    S: DirectoryStore + ?Sized,
{
    if ids.is_empty() {
        return Ok(());
    }

    let enrolled: HashSet<u64> = store
        .students_in_section(class_id, section_id)
        .await?
        .into_iter()
        .map(|s| s.student_id)
        .collect();

    let stray: Vec<String> = ids
        .iter()
        .filter(|id| !enrolled.contains(id))
        .map(|id| id.to_string())
        .collect();

    if stray.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Students not enrolled in this section: {}",
            stray.join(", ")
        )))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[actix_web::test]
    async fn homeroom_teacher_passes_every_section_check() {
        let store = MemoryStore::new();
        store.assign_homeroom(7, 1, 1);
        let actor = fixtures::teacher(7);

        for need in [SectionNeed::Teaching, SectionNeed::Homeroom, SectionNeed::Subject(42)] {
            authorize_section(&store, &actor, 1, 1, need).await.unwrap();
        }
    }

    #[actix_web::test]
    async fn subject_teacher_is_limited_to_their_subject() {
        let store = MemoryStore::new();
        store.assign_subject(8, 1, 1, 42);
        let actor = fixtures::teacher(8);

        authorize_section(&store, &actor, 1, 1, SectionNeed::Subject(42))
            .await
            .unwrap();
        authorize_section(&store, &actor, 1, 1, SectionNeed::Teaching)
            .await
            .unwrap();
        let err = authorize_section(&store, &actor, 1, 1, SectionNeed::Subject(43))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
        let err = authorize_section(&store, &actor, 1, 1, SectionNeed::Homeroom)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }

    #[actix_web::test]
    async fn students_never_pass_section_checks() {
        let store = MemoryStore::new();
        let err = authorize_section(&store, &fixtures::student(3), 1, 1, SectionNeed::Teaching)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }

    #[test]
    fn duplicate_students_are_rejected() {
        assert!(ensure_unique_students([1, 2, 3]).is_ok());
        assert!(matches!(
            ensure_unique_students([1, 2, 1]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn students_only_see_themselves() {
        let me = fixtures::student(5);
        assert!(me.ensure_can_view_student(5).is_ok());
        assert!(me.ensure_can_view_student(6).is_err());
        assert!(fixtures::teacher(1).ensure_can_view_student(6).is_ok());
    }
}

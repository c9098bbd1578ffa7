use serde::Serialize;
use utoipa::ToSchema;

/// Stored in `file_url` when an admin approves a result without attaching a
/// document. Clients compare against this literal.
pub const APPROVAL_SENTINEL: &str = "APPROVED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MarksheetLink {
    pub student_id: u64,
    pub exam_id: u64,
    pub file_url: String,
}

impl MarksheetLink {
    pub fn is_approval_only(&self) -> bool {
        self.file_url == APPROVAL_SENTINEL
    }

    pub fn state(&self) -> MarksheetState {
        if self.is_approval_only() {
            MarksheetState::Approved
        } else {
            MarksheetState::Uploaded
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MarksheetState {
    Pending,
    Approved,
    Uploaded,
}

impl MarksheetState {
    pub fn of(link: Option<&MarksheetLink>) -> Self {
        link.map(MarksheetLink::state).unwrap_or(MarksheetState::Pending)
    }
}

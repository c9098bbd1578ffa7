use serde::Serialize;
use utoipa::ToSchema;

use crate::model::fee::FeeStatusReport;

pub const FEES_PENDING: &str = "Fees Pending";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LockDecision {
    pub locked: bool,
    #[schema(example = "Fees Pending", nullable = true)]
    pub reason: Option<String>,
}

/// Locked exactly when the ledger says the student is a defaulter.
pub fn is_locked(report: &FeeStatusReport) -> LockDecision {
    if report.is_defaulter {
        LockDecision {
            locked: true,
            reason: Some(FEES_PENDING.to_string()),
        }
    } else {
        LockDecision {
            locked: false,
            reason: None,
        }
    }
}

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Two-state workflow shared by attendance registers and assessments.
/// `Finalized` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleStatus {
    Draft,
    Finalized,
}

impl LifecycleStatus {
    pub fn is_finalized(self) -> bool {
        self == LifecycleStatus::Finalized
    }
}

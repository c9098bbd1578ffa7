use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::lifecycle::LifecycleStatus;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssessmentKind {
    ClassTest,
    ExamSubject,
}

/// A class test or one subject paper of an exam.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Assessment {
    pub id: u64,
    pub kind: AssessmentKind,
    pub exam_id: Option<u64>,
    pub class_id: u64,
    pub section_id: u64,
    pub subject_id: u64,
    pub subject_name: String,
    pub title: String,
    #[schema(value_type = String, example = "50")]
    pub max_marks: Decimal,
    #[schema(value_type = String, format = "date")]
    pub held_on: NaiveDate,
    pub created_by: u64,
    pub status: LifecycleStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAssessment {
    pub kind: AssessmentKind,
    pub exam_id: Option<u64>,
    pub class_id: u64,
    pub section_id: u64,
    pub subject_id: u64,
    pub title: String,
    pub max_marks: Decimal,
    pub held_on: NaiveDate,
    pub created_by: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct MarkEntry {
    #[schema(example = 1042)]
    pub student_id: u64,
    #[schema(value_type = String, example = "42.5")]
    pub marks_obtained: Decimal,
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// What a class owes for one fee type. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeeStructure {
    pub id: u64,
    pub class_id: u64,
    pub fee_type_id: u64,
    pub fee_type_name: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Online,
    Cheque,
}

/// Append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: u64,
    pub student_id: u64,
    pub fee_structure_id: u64,
    pub amount_paid: Decimal,
    pub paid_on: NaiveDate,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub student_id: u64,
    pub fee_structure_id: u64,
    pub amount_paid: Decimal,
    pub paid_on: NaiveDate,
    pub method: PaymentMethod,
    pub recorded_by: u64,
}

/// Manual "paid" mark placed by a homeroom teacher. Payments are untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeeOverride {
    pub student_id: u64,
    pub fee_structure_id: u64,
    pub set_by: u64,
    pub set_on: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeeLineStatus {
    Paid,
    Pending,
}

/// Requested value for the manual override endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ManualFeeStatus {
    Paid,
    Unpaid,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FeeLine {
    pub structure_id: u64,
    pub fee_type_id: u64,
    #[schema(example = "Tuition")]
    pub fee_type_name: String,
    #[schema(example = "2026-04-10", value_type = String, format = "date")]
    pub due_date: NaiveDate,
    #[schema(example = "1000.00", value_type = String)]
    pub total_amount: Decimal,
    #[schema(example = "600.00", value_type = String)]
    pub paid_amount: Decimal,
    #[schema(example = "400.00", value_type = String)]
    pub due_amount: Decimal,
    pub status: FeeLineStatus,
    /// Settled by a manual override rather than by payments.
    pub overridden: bool,
}

/// Derived view of a student's ledger; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FeeStatusReport {
    pub student_id: u64,
    pub class_id: u64,
    #[schema(value_type = String, format = "date")]
    pub as_of: NaiveDate,
    pub per_structure: Vec<FeeLine>,
    #[schema(value_type = String)]
    pub total_paid: Decimal,
    #[schema(value_type = String)]
    pub total_due: Decimal,
    pub is_defaulter: bool,
}

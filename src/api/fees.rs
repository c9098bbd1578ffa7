use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::engine::{
    fees::{self, PaymentRequest},
    gate::is_locked,
    ledger::load_fee_status,
};
use crate::error::AppError;
use crate::model::fee::{FeeStatusReport, ManualFeeStatus, Payment, PaymentMethod};
use crate::notify::EventSink;
use crate::store::{DirectoryStore, SchoolStore};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeeStatusQuery {
    #[param(example = 1042)]
    pub student_id: u64,
}

/// Ledger summary together with the result-gate decision it implies.
#[derive(Serialize, ToSchema)]
pub struct FeeStatusResponse {
    #[serde(flatten)]
    pub report: FeeStatusReport,
    pub locked: bool,
    #[schema(example = "Fees Pending", nullable = true)]
    pub lock_reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetFeeStatus {
    #[schema(example = 1042)]
    pub student_id: u64,
    #[schema(example = 3)]
    pub fee_structure_id: u64,
    #[schema(example = "paid")]
    pub status: ManualFeeStatus,
}

#[derive(Deserialize, ToSchema)]
pub struct RecordPayment {
    #[schema(example = 1042)]
    pub student_id: u64,
    #[schema(example = 3)]
    pub fee_structure_id: u64,
    #[schema(example = "400.00", value_type = String)]
    pub amount_paid: Decimal,
    /// Defaults to today at the school
    #[schema(example = "2026-10-19", format = "date", value_type = Option<String>)]
    pub paid_on: Option<NaiveDate>,
    #[schema(example = "cash")]
    pub method: PaymentMethod,
}

#[derive(Serialize, ToSchema)]
pub struct PaymentResponse {
    #[schema(example = 88)]
    pub id: u64,
    pub student_id: u64,
    pub fee_structure_id: u64,
    #[schema(value_type = String, example = "400.00")]
    pub amount_paid: Decimal,
    #[schema(value_type = String, format = "date")]
    pub paid_on: NaiveDate,
    pub method: PaymentMethod,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            student_id: p.student_id,
            fee_structure_id: p.fee_structure_id,
            amount_paid: p.amount_paid,
            paid_on: p.paid_on,
            method: p.method,
        }
    }
}

fn with_gate(report: FeeStatusReport) -> FeeStatusResponse {
    let gate = is_locked(&report);
    FeeStatusResponse {
        report,
        locked: gate.locked,
        lock_reason: gate.reason,
    }
}

/// Per-structure dues and defaulter flag as of today
#[utoipa::path(
    get,
    path = "/api/fees/status",
    params(FeeStatusQuery),
    responses(
        (status = 200, description = "Fee status", body = FeeStatusResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Students may only view themselves"),
        (status = 404, description = "Student not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Fees"
)]
pub async fn fee_status(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    config: web::Data<Config>,
    query: web::Query<FeeStatusQuery>,
) -> Result<HttpResponse, AppError> {
    auth.actor().ensure_can_view_student(query.student_id)?;
    let report = load_fee_status(store.get_ref(), query.student_id, config.today()).await?;
    Ok(HttpResponse::Ok().json(with_gate(report)))
}

/// Class teacher marks a fee as settled (or clears that mark)
#[utoipa::path(
    put,
    path = "/api/fees/status",
    request_body = SetFeeStatus,
    responses(
        (status = 200, description = "Updated fee status", body = FeeStatusResponse),
        (status = 400, description = "Structure does not apply to the student"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the class teacher or an admin"),
        (status = 404, description = "Student or fee structure not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Fees"
)]
pub async fn set_fee_status(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    config: web::Data<Config>,
    body: web::Json<SetFeeStatus>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let report = fees::set_fee_status(
        store.get_ref(),
        &auth.actor(),
        body.student_id,
        body.fee_structure_id,
        body.status,
        config.today(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(with_gate(report)))
}

/// Append a payment to the ledger
#[utoipa::path(
    post,
    path = "/api/fees/payments",
    request_body = RecordPayment,
    responses(
        (status = 201, description = "Payment recorded", body = PaymentResponse),
        (status = 400, description = "Invalid amount or structure"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Student or fee structure not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Fees"
)]
pub async fn record_payment(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    sink: web::Data<dyn EventSink>,
    config: web::Data<Config>,
    body: web::Json<RecordPayment>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let settings = store.notification_settings().await?;
    let payment = fees::record_payment(
        store.get_ref(),
        &auth.actor(),
        &settings,
        sink.get_ref(),
        PaymentRequest {
            student_id: body.student_id,
            fee_structure_id: body.fee_structure_id,
            amount_paid: body.amount_paid,
            paid_on: body.paid_on.unwrap_or_else(|| config.today()),
            method: body.method,
        },
    )
    .await?;
    Ok(HttpResponse::Created().json(PaymentResponse::from(payment)))
}

use crate::auth::auth::AuthUser;
use crate::engine::attendance::{
    self as register, AttendanceSheet, AttendanceStatusView, StudentAttendanceReport,
};
use crate::error::AppError;
use crate::model::attendance::{AttendanceEntry, RegisterKey};
use crate::notify::EventSink;
use crate::store::{DirectoryStore, SchoolStore};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RegisterQuery {
    /// Register date (YYYY-MM-DD)
    #[param(value_type = String, example = "2026-10-19")]
    pub date: NaiveDate,
    #[param(example = 7)]
    pub class_id: u64,
    #[param(example = 2)]
    pub section_id: u64,
}

impl RegisterQuery {
    fn key(&self) -> RegisterKey {
        RegisterKey {
            date: self.date,
            class_id: self.class_id,
            section_id: self.section_id,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct MarkAttendance {
    #[schema(example = "2026-10-19", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = 7)]
    pub class_id: u64,
    #[schema(example = 2)]
    pub section_id: u64,
    pub records: Vec<AttendanceEntry>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentReportQuery {
    #[param(example = 1042)]
    pub student_id: u64,
    /// 1-12
    #[param(example = 10)]
    pub month: u32,
    #[param(example = 2026)]
    pub year: i32,
}

/// Draft / finalized state and counts of one register
#[utoipa::path(
    get,
    path = "/api/attendance/status",
    params(RegisterQuery),
    responses(
        (status = 200, description = "Register state", body = AttendanceStatusView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_status(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    query: web::Query<RegisterQuery>,
) -> Result<HttpResponse, AppError> {
    auth.actor().require_staff()?;
    let view = register::attendance_status(store.get_ref(), &query.key()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Register with every stored record
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(RegisterQuery),
    responses(
        (status = 200, description = "Register sheet", body = AttendanceSheet),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_sheet(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    query: web::Query<RegisterQuery>,
) -> Result<HttpResponse, AppError> {
    auth.actor().require_staff()?;
    let sheet = register::attendance_sheet(store.get_ref(), &query.key()).await?;
    Ok(HttpResponse::Ok().json(sheet))
}

/// Save the day's attendance as a draft
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = MarkAttendance,
    responses(
        (status = 200, description = "Draft saved", body = Object, example = json!({
            "message": "Attendance saved as draft",
            "register_id": 31,
            "status": "draft"
        })),
        (status = 400, description = "Invalid records"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not assigned to the section, or already finalized", body = Object, example = json!({
            "error": "edit_locked",
            "message": "Attendance is already FINALIZED. No edits allowed."
        })),
        (status = 503, description = "Datastore unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    body: web::Json<MarkAttendance>,
) -> Result<impl Responder, AppError> {
    let body = body.into_inner();
    let key = RegisterKey {
        date: body.date,
        class_id: body.class_id,
        section_id: body.section_id,
    };

    let saved =
        register::mark_attendance(store.get_ref(), &auth.actor(), key, &body.records).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Attendance saved as draft",
        "register_id": saved.id,
        "status": saved.status,
    })))
}

/// Lock the register and notify students
#[utoipa::path(
    post,
    path = "/api/attendance/finalize",
    request_body = RegisterKey,
    responses(
        (status = 200, description = "Finalized", body = Object, example = json!({
            "message": "Attendance finalized",
            "register_id": 31,
            "status": "finalized"
        })),
        (status = 400, description = "Already finalized"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not assigned to the section"),
        (status = 404, description = "No register for this date and section")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn finalize_attendance(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    sink: web::Data<dyn EventSink>,
    body: web::Json<RegisterKey>,
) -> Result<impl Responder, AppError> {
    let settings = store.notification_settings().await?;
    let finalized = register::finalize_attendance(
        store.get_ref(),
        &auth.actor(),
        &settings,
        sink.get_ref(),
        body.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Attendance finalized",
        "register_id": finalized.id,
        "status": finalized.status,
    })))
}

/// Monthly history of one student, finalized registers only
#[utoipa::path(
    get,
    path = "/api/attendance/student-report",
    params(StudentReportQuery),
    responses(
        (status = 200, description = "Monthly report", body = StudentAttendanceReport),
        (status = 400, description = "Invalid month or year"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Students may only view themselves")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn student_report(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    query: web::Query<StudentReportQuery>,
) -> Result<HttpResponse, AppError> {
    auth.actor().ensure_can_view_student(query.student_id)?;
    let report = register::student_attendance_report(
        store.get_ref(),
        query.student_id,
        query.month,
        query.year,
    )
    .await?;
    Ok(HttpResponse::Ok().json(report))
}

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::engine::results::{self, ExamResultsGrid, StudentResult};
use crate::error::AppError;
use crate::model::marksheet::MarksheetLink;
use crate::notify::EventSink;
use crate::store::{DirectoryStore, SchoolStore};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct UploadMarksheet {
    #[schema(example = 1042)]
    pub student_id: u64,
    #[schema(example = 5)]
    pub exam_id: u64,
    /// Document link, or `APPROVED` to publish without a document
    #[schema(example = "https://files.example.org/marksheets/1042-5.pdf")]
    pub file_url: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ApproveResult {
    #[schema(example = 1042)]
    pub student_id: u64,
    #[schema(example = 5)]
    pub exam_id: u64,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentResultQuery {
    #[param(example = 1042)]
    pub student_id: u64,
    #[param(example = 5)]
    pub exam_id: u64,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GridQuery {
    #[param(example = 5)]
    pub exam_id: u64,
    #[param(example = 7)]
    pub class_id: u64,
    #[param(example = 2)]
    pub section_id: u64,
}

fn published(message: &str, link: &MarksheetLink) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": message,
        "student_id": link.student_id,
        "exam_id": link.exam_id,
        "file_url": link.file_url,
        "state": link.state(),
    }))
}

/// Attach a marksheet document to a student's exam result
#[utoipa::path(
    post,
    path = "/api/exams/marksheets/upload",
    request_body = UploadMarksheet,
    responses(
        (status = 200, description = "Marksheet published", body = Object, example = json!({
            "message": "Marksheet published",
            "student_id": 1042,
            "exam_id": 5,
            "file_url": "https://files.example.org/marksheets/1042-5.pdf",
            "state": "uploaded"
        })),
        (status = 400, description = "Invalid file_url"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Student or exam not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Exams"
)]
pub async fn upload_marksheet(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    sink: web::Data<dyn EventSink>,
    body: web::Json<UploadMarksheet>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let settings = store.notification_settings().await?;
    let link = results::publish_marksheet(
        store.get_ref(),
        &auth.actor(),
        &settings,
        sink.get_ref(),
        body.student_id,
        body.exam_id,
        body.file_url,
    )
    .await?;
    Ok(published("Marksheet published", &link))
}

/// Publish a result without a document
#[utoipa::path(
    post,
    path = "/api/exams/results/approve",
    request_body = ApproveResult,
    responses(
        (status = 200, description = "Result approved", body = Object, example = json!({
            "message": "Result approved",
            "student_id": 1042,
            "exam_id": 5,
            "file_url": "APPROVED",
            "state": "approved"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Student or exam not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Exams"
)]
pub async fn approve_result(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    sink: web::Data<dyn EventSink>,
    body: web::Json<ApproveResult>,
) -> Result<HttpResponse, AppError> {
    let settings = store.notification_settings().await?;
    let link = results::approve_result(
        store.get_ref(),
        &auth.actor(),
        &settings,
        sink.get_ref(),
        body.student_id,
        body.exam_id,
    )
    .await?;
    Ok(published("Result approved", &link))
}

/// One student's exam result, gated on fees
#[utoipa::path(
    get,
    path = "/api/exams/student-result",
    params(StudentResultQuery),
    responses(
        (status = 200, description = "Result; marksheet withheld while fees are pending", body = StudentResult),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Students may only view themselves"),
        (status = 404, description = "Student not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Exams"
)]
pub async fn student_result(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    config: web::Data<Config>,
    query: web::Query<StudentResultQuery>,
) -> Result<HttpResponse, AppError> {
    auth.actor().ensure_can_view_student(query.student_id)?;
    let result =
        results::student_result(store.get_ref(), query.student_id, query.exam_id, config.today())
            .await?;
    Ok(HttpResponse::Ok().json(result))
}

/// Section-wide marks grid for one exam
#[utoipa::path(
    get,
    path = "/api/exams/results/grid",
    params(GridQuery),
    responses(
        (status = 200, description = "Students by subject", body = ExamResultsGrid),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Exams"
)]
pub async fn results_grid(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    query: web::Query<GridQuery>,
) -> Result<HttpResponse, AppError> {
    auth.actor().require_admin()?;
    let grid =
        results::exam_results_grid(store.get_ref(), query.exam_id, query.class_id, query.section_id)
            .await?;
    Ok(HttpResponse::Ok().json(grid))
}

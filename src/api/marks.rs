use crate::auth::auth::AuthUser;
use crate::engine::assessment::{self, AssessmentDetail, AssessmentDraft};
use crate::error::AppError;
use crate::model::assessment::{Assessment, AssessmentKind, MarkEntry};
use crate::notify::EventSink;
use crate::store::{DirectoryStore, SchoolStore};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AssessmentFilter {
    #[param(example = 7)]
    pub class_id: u64,
    #[param(example = 2)]
    pub section_id: u64,
    /// Only class tests or only exam papers
    pub kind: Option<AssessmentKind>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateAssessment {
    #[schema(example = "class_test")]
    pub kind: AssessmentKind,
    /// Required for exam papers
    #[schema(example = json!(null))]
    pub exam_id: Option<u64>,
    #[schema(example = 7)]
    pub class_id: u64,
    #[schema(example = 2)]
    pub section_id: u64,
    #[schema(example = 4)]
    pub subject_id: u64,
    #[schema(example = "Fractions quiz")]
    pub title: String,
    #[schema(example = "20", value_type = String)]
    pub max_marks: Decimal,
    #[schema(example = "2026-10-19", format = "date", value_type = String)]
    pub held_on: NaiveDate,
    #[serde(default)]
    pub records: Vec<MarkEntry>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAssessment {
    /// Replaces every mark when present
    pub records: Option<Vec<MarkEntry>>,
    /// Lock the assessment after applying `records`
    #[serde(default)]
    pub finalize: bool,
}

/// Class tests and exam papers of a section
#[utoipa::path(
    get,
    path = "/api/marks",
    params(AssessmentFilter),
    responses(
        (status = 200, description = "Assessments, newest first", body = [Assessment]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Marks"
)]
pub async fn list_assessments(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    query: web::Query<AssessmentFilter>,
) -> Result<HttpResponse, AppError> {
    auth.actor().require_staff()?;
    let list =
        assessment::list_assessments(store.get_ref(), query.class_id, query.section_id, query.kind)
            .await?;
    Ok(HttpResponse::Ok().json(list))
}

/// Create a draft assessment, optionally with its first marks
#[utoipa::path(
    post,
    path = "/api/marks",
    request_body = CreateAssessment,
    responses(
        (status = 201, description = "Draft created", body = Assessment),
        (status = 400, description = "Invalid assessment or marks"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the subject or class teacher")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Marks"
)]
pub async fn create_assessment(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    body: web::Json<CreateAssessment>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let draft = AssessmentDraft {
        kind: body.kind,
        exam_id: body.exam_id,
        class_id: body.class_id,
        section_id: body.section_id,
        subject_id: body.subject_id,
        title: body.title,
        max_marks: body.max_marks,
        held_on: body.held_on,
    };
    let created =
        assessment::create_assessment(store.get_ref(), &auth.actor(), draft, &body.records).await?;
    Ok(HttpResponse::Created().json(created))
}

/// Assessment with its marks
#[utoipa::path(
    get,
    path = "/api/marks/{id}",
    params(
        ("id" = u64, Path, description = "Assessment id")
    ),
    responses(
        (status = 200, description = "Assessment detail", body = AssessmentDetail),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Assessment not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Marks"
)]
pub async fn get_assessment(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.actor().require_staff()?;
    let detail = assessment::assessment_detail(store.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Replace marks and/or finalize
#[utoipa::path(
    put,
    path = "/api/marks/{id}",
    params(
        ("id" = u64, Path, description = "Assessment id")
    ),
    request_body = UpdateAssessment,
    responses(
        (status = 200, description = "Updated assessment", body = Assessment),
        (status = 400, description = "Invalid marks"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not permitted, or already finalized", body = Object, example = json!({
            "error": "edit_locked",
            "message": "Assessment is already FINALIZED. No edits allowed."
        })),
        (status = 404, description = "Assessment not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Marks"
)]
pub async fn update_assessment(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    sink: web::Data<dyn EventSink>,
    path: web::Path<u64>,
    body: web::Json<UpdateAssessment>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let settings = store.notification_settings().await?;
    let updated = assessment::update_assessment(
        store.get_ref(),
        &auth.actor(),
        &settings,
        sink.get_ref(),
        path.into_inner(),
        body.records.as_deref(),
        body.finalize,
    )
    .await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Delete a draft assessment
#[utoipa::path(
    delete,
    path = "/api/marks/{id}",
    params(
        ("id" = u64, Path, description = "Assessment id")
    ),
    responses(
        (status = 200, description = "Deleted", body = Object, example = json!({
            "message": "Assessment deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not permitted, or already finalized"),
        (status = 404, description = "Assessment not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Marks"
)]
pub async fn delete_assessment(
    auth: AuthUser,
    store: web::Data<dyn SchoolStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    assessment::delete_assessment(store.get_ref(), &auth.actor(), id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Assessment deleted" })))
}

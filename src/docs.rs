use crate::api::attendance::MarkAttendance;
use crate::api::exams::{ApproveResult, UploadMarksheet};
use crate::api::fees::{FeeStatusResponse, PaymentResponse, RecordPayment, SetFeeStatus};
use crate::api::marks::{CreateAssessment, UpdateAssessment};
use crate::engine::assessment::AssessmentDetail;
use crate::engine::attendance::{
    AttendanceSheet, AttendanceStatusView, RegisterState, StudentAttendanceReport,
};
use crate::engine::gate::LockDecision;
use crate::engine::results::{
    ExamResultsGrid, GridStudent, GridSubject, StudentResult, SubjectResult,
};
use crate::model::assessment::{Assessment, AssessmentKind, MarkEntry};
use crate::model::attendance::{
    AttendanceCounts, AttendanceEntry, AttendanceStatus, RegisterKey, StudentAttendanceEntry,
};
use crate::model::fee::{FeeLine, FeeLineStatus, FeeStatusReport, ManualFeeStatus, PaymentMethod};
use crate::model::lifecycle::LifecycleStatus;
use crate::model::marksheet::MarksheetState;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Academic Ledger API",
        version = "1.0.0",
        description = r#"
## Academic Ledger & Gating Engine

Back-office rules for a school: fee ledgers, daily attendance registers,
class tests and exam marks, and fee-gated result publication.

### Key Features
- **Attendance**
  - Draft registers per date, class and section; finalize locks them
- **Marks**
  - Class tests and exam papers with a draft / finalized lifecycle
- **Fees**
  - Append-only payments, per-structure dues and the defaulter flag
- **Exams**
  - Results and marksheets, withheld while fees are pending

### Security
Every endpoint expects a **JWT Bearer** access token. Roles: admin,
teacher, student. Teachers act only on sections they are assigned to.

### Errors
Failures return `{"error": <code>, "message": <text>}`.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::attendance_status,
        crate::api::attendance::attendance_sheet,
        crate::api::attendance::mark_attendance,
        crate::api::attendance::finalize_attendance,
        crate::api::attendance::student_report,

        crate::api::fees::fee_status,
        crate::api::fees::set_fee_status,
        crate::api::fees::record_payment,

        crate::api::exams::upload_marksheet,
        crate::api::exams::approve_result,
        crate::api::exams::student_result,
        crate::api::exams::results_grid,

        crate::api::marks::list_assessments,
        crate::api::marks::create_assessment,
        crate::api::marks::get_assessment,
        crate::api::marks::update_assessment,
        crate::api::marks::delete_assessment
    ),
    components(
        schemas(
            MarkAttendance,
            RegisterKey,
            AttendanceEntry,
            AttendanceStatus,
            AttendanceCounts,
            AttendanceStatusView,
            AttendanceSheet,
            RegisterState,
            StudentAttendanceEntry,
            StudentAttendanceReport,
            LifecycleStatus,
            FeeStatusResponse,
            FeeStatusReport,
            FeeLine,
            FeeLineStatus,
            LockDecision,
            SetFeeStatus,
            ManualFeeStatus,
            RecordPayment,
            PaymentResponse,
            PaymentMethod,
            UploadMarksheet,
            ApproveResult,
            StudentResult,
            SubjectResult,
            ExamResultsGrid,
            GridSubject,
            GridStudent,
            MarksheetState,
            CreateAssessment,
            UpdateAssessment,
            Assessment,
            AssessmentKind,
            AssessmentDetail,
            MarkEntry
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Daily attendance registers"),
        (name = "Fees", description = "Fee ledger and defaulter status"),
        (name = "Exams", description = "Exam results and marksheets"),
        (name = "Marks", description = "Class tests and exam papers"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

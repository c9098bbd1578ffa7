use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};

use super::*;
use crate::model::{
    assessment::AssessmentKind,
    attendance::AttendanceStatus,
    fee::PaymentMethod,
    lifecycle::LifecycleStatus,
};

/// `sqlx` adapter over the shared MySQL schema in `migrations/`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn parse<T: FromStr>(column: &str, raw: &str) -> StoreResult<T> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("{column}: unexpected value '{raw}'")))
}

/// Appends ` IN (?, ?, ...)` bound to `ids`.
fn push_in_list(qb: &mut QueryBuilder<'_, MySql>, ids: &[u64]) {
    qb.push(" IN (");
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(")");
}

#[derive(FromRow)]
struct PaymentRow {
    id: u64,
    student_id: u64,
    fee_structure_id: u64,
    amount_paid: Decimal,
    paid_on: NaiveDate,
    method: String,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> StoreResult<Self> {
        Ok(Payment {
            id: row.id,
            student_id: row.student_id,
            fee_structure_id: row.fee_structure_id,
            amount_paid: row.amount_paid,
            paid_on: row.paid_on,
            method: parse::<PaymentMethod>("fee_payments.method", &row.method)?,
        })
    }
}

#[derive(FromRow)]
struct RegisterRow {
    id: u64,
    date: NaiveDate,
    class_id: u64,
    section_id: u64,
    status: String,
    marked_by: u64,
}

impl TryFrom<RegisterRow> for AttendanceRegister {
    type Error = StoreError;

    fn try_from(row: RegisterRow) -> StoreResult<Self> {
        Ok(AttendanceRegister {
            id: row.id,
            date: row.date,
            class_id: row.class_id,
            section_id: row.section_id,
            status: parse::<LifecycleStatus>("attendance_registers.status", &row.status)?,
            marked_by: row.marked_by,
        })
    }
}

#[derive(FromRow)]
struct RecordRow {
    student_id: u64,
    status: String,
    remarks: Option<String>,
}

impl TryFrom<RecordRow> for AttendanceEntry {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> StoreResult<Self> {
        Ok(AttendanceEntry {
            student_id: row.student_id,
            status: parse::<AttendanceStatus>("attendance_records.status", &row.status)?,
            remarks: row.remarks,
        })
    }
}

#[derive(FromRow)]
struct HistoryRow {
    date: NaiveDate,
    status: String,
    remarks: Option<String>,
}

#[derive(FromRow)]
struct AssessmentRow {
    id: u64,
    kind: String,
    exam_id: Option<u64>,
    class_id: u64,
    section_id: u64,
    subject_id: u64,
    subject_name: String,
    title: String,
    max_marks: Decimal,
    held_on: NaiveDate,
    created_by: u64,
    status: String,
}

impl TryFrom<AssessmentRow> for Assessment {
    type Error = StoreError;

    fn try_from(row: AssessmentRow) -> StoreResult<Self> {
        Ok(Assessment {
            id: row.id,
            kind: parse::<AssessmentKind>("assessments.kind", &row.kind)?,
            exam_id: row.exam_id,
            class_id: row.class_id,
            section_id: row.section_id,
            subject_id: row.subject_id,
            subject_name: row.subject_name,
            title: row.title,
            max_marks: row.max_marks,
            held_on: row.held_on,
            created_by: row.created_by,
            status: parse::<LifecycleStatus>("assessments.status", &row.status)?,
        })
    }
}

#[derive(FromRow)]
struct MarkRow {
    assessment_id: u64,
    student_id: u64,
    marks_obtained: Decimal,
}

#[derive(FromRow)]
struct AssignmentRow {
    subject_id: Option<u64>,
}

#[derive(FromRow)]
struct SettingsRow {
    attendance_enabled: bool,
    results_enabled: bool,
    fees_enabled: bool,
}

const ASSESSMENT_SELECT: &str = r#"
    SELECT a.id, a.kind, a.exam_id, a.class_id, a.section_id, a.subject_id,
           s.name AS subject_name, a.title, a.max_marks, a.held_on, a.created_by, a.status
    FROM assessments a
    JOIN subjects s ON s.id = a.subject_id
"#;

fn collect<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl DirectoryStore for MySqlStore {
    async fn student_placement(&self, student_id: u64) -> StoreResult<Option<StudentPlacement>> {
        let row = sqlx::query_as::<_, StudentPlacement>(
            r#"
            SELECT id AS student_id, full_name AS name, class_id, section_id
            FROM students
            WHERE id = ?
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn students_in_section(
        &self,
        class_id: u64,
        section_id: u64,
    ) -> StoreResult<Vec<StudentPlacement>> {
        let rows = sqlx::query_as::<_, StudentPlacement>(
            r#"
            SELECT id AS student_id, full_name AS name, class_id, section_id
            FROM students
            WHERE class_id = ? AND section_id = ?
            ORDER BY full_name, id
            "#,
        )
        .bind(class_id)
        .bind(section_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn section_assignment(
        &self,
        teacher_id: u64,
        class_id: u64,
        section_id: u64,
    ) -> StoreResult<SectionAssignment> {
        // NULL subject marks the homeroom row.
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT CAST(NULL AS UNSIGNED) AS subject_id
            FROM class_teachers
            WHERE teacher_id = ? AND class_id = ? AND section_id = ?
            UNION ALL
            SELECT subject_id
            FROM subject_teachers
            WHERE teacher_id = ? AND class_id = ? AND section_id = ?
            "#,
        )
        .bind(teacher_id)
        .bind(class_id)
        .bind(section_id)
        .bind(teacher_id)
        .bind(class_id)
        .bind(section_id)
        .fetch_all(&self.pool)
        .await?;

        let mut assignment = SectionAssignment::default();
        for row in rows {
            match row.subject_id {
                None => assignment.homeroom = true,
                Some(subject_id) => assignment.subject_ids.push(subject_id),
            }
        }
        Ok(assignment)
    }

    async fn subject_exists(&self, subject_id: u64) -> StoreResult<bool> {
        let found: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM subjects WHERE id = ?)")
            .bind(subject_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(found != 0)
    }

    async fn notification_settings(&self) -> StoreResult<NotificationSettings> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT attendance_enabled, results_enabled, fees_enabled
            FROM notification_settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(|r| NotificationSettings {
                attendance: r.attendance_enabled,
                results: r.results_enabled,
                fees: r.fees_enabled,
            })
            .unwrap_or_default())
    }

    async fn push_targets(&self, student_ids: &[u64]) -> StoreResult<Vec<PushTarget>> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<MySql>::new("SELECT student_id, token FROM push_tokens WHERE student_id");
        push_in_list(&mut qb, student_ids);
        let rows = qb
            .build_query_as::<PushTarget>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl LedgerStore for MySqlStore {
    async fn fee_structures_for_class(&self, class_id: u64) -> StoreResult<Vec<FeeStructure>> {
        let rows = sqlx::query_as::<_, FeeStructure>(
            r#"
            SELECT f.id, f.class_id, f.fee_type_id, t.name AS fee_type_name, f.amount, f.due_date
            FROM class_fee_structures f
            JOIN fee_types t ON t.id = f.fee_type_id
            WHERE f.class_id = ?
            ORDER BY f.due_date, f.id
            "#,
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn fee_structure(&self, structure_id: u64) -> StoreResult<Option<FeeStructure>> {
        let row = sqlx::query_as::<_, FeeStructure>(
            r#"
            SELECT f.id, f.class_id, f.fee_type_id, t.name AS fee_type_name, f.amount, f.due_date
            FROM class_fee_structures f
            JOIN fee_types t ON t.id = f.fee_type_id
            WHERE f.id = ?
            "#,
        )
        .bind(structure_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn payments_for_student(
        &self,
        student_id: u64,
        structure_ids: &[u64],
    ) -> StoreResult<Vec<Payment>> {
        if structure_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<MySql>::new(
            r#"
            SELECT id, student_id, class_fee_structure_id AS fee_structure_id,
                   amount_paid, paid_on, method
            FROM fee_payments
            WHERE student_id = "#,
        );
        qb.push_bind(student_id);
        qb.push(" AND class_fee_structure_id");
        push_in_list(&mut qb, structure_ids);
        qb.push(" ORDER BY paid_on, id");

        let rows = qb
            .build_query_as::<PaymentRow>()
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }

    async fn overrides_for_student(
        &self,
        student_id: u64,
        structure_ids: &[u64],
    ) -> StoreResult<Vec<FeeOverride>> {
        if structure_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<MySql>::new(
            r#"
            SELECT student_id, class_fee_structure_id AS fee_structure_id, set_by, set_on
            FROM fee_overrides
            WHERE student_id = "#,
        );
        qb.push_bind(student_id);
        qb.push(" AND class_fee_structure_id");
        push_in_list(&mut qb, structure_ids);

        let rows = qb
            .build_query_as::<FeeOverride>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert_payment(&self, payment: &NewPayment) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO fee_payments
                (student_id, class_fee_structure_id, amount_paid, paid_on, method, recorded_by)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.student_id)
        .bind(payment.fee_structure_id)
        .bind(payment.amount_paid)
        .bind(payment.paid_on)
        .bind(payment.method.as_ref())
        .bind(payment.recorded_by)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn upsert_override(&self, fee_override: &FeeOverride) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO fee_overrides (student_id, class_fee_structure_id, set_by, set_on)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE set_by = VALUES(set_by), set_on = VALUES(set_on)
            "#,
        )
        .bind(fee_override.student_id)
        .bind(fee_override.fee_structure_id)
        .bind(fee_override.set_by)
        .bind(fee_override.set_on)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_override(&self, student_id: u64, fee_structure_id: u64) -> StoreResult<()> {
        sqlx::query(
            "DELETE FROM fee_overrides WHERE student_id = ? AND class_fee_structure_id = ?",
        )
        .bind(student_id)
        .bind(fee_structure_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn find_register(&self, key: &RegisterKey) -> StoreResult<Option<AttendanceRegister>> {
        let row = sqlx::query_as::<_, RegisterRow>(
            r#"
            SELECT id, date, class_id, section_id, status, marked_by
            FROM attendance_registers
            WHERE date = ? AND class_id = ? AND section_id = ?
            "#,
        )
        .bind(key.date)
        .bind(key.class_id)
        .bind(key.section_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(AttendanceRegister::try_from).transpose()
    }

    async fn open_register(
        &self,
        key: &RegisterKey,
        marked_by: u64,
    ) -> StoreResult<AttendanceRegister> {
        // The unique key turns a racing second insert into a no-op.
        sqlx::query(
            r#"
            INSERT INTO attendance_registers (date, class_id, section_id, status, marked_by)
            VALUES (?, ?, ?, 'draft', ?)
            ON DUPLICATE KEY UPDATE id = id
            "#,
        )
        .bind(key.date)
        .bind(key.class_id)
        .bind(key.section_id)
        .bind(marked_by)
        .execute(&self.pool)
        .await?;

        self.find_register(key)
            .await?
            .ok_or_else(|| StoreError::Database("register missing after upsert".to_string()))
    }

    async fn replace_records(
        &self,
        register_id: u64,
        marked_by: u64,
        records: &[AttendanceEntry],
    ) -> StoreResult<GuardedWrite> {
        let mut tx = self.pool.begin().await?;

        let status: Option<String> = sqlx::query_scalar(
            "SELECT status FROM attendance_registers WHERE id = ? FOR UPDATE",
        )
        .bind(register_id)
        .fetch_optional(&mut *tx)
        .await?;

        if status.as_deref() != Some(LifecycleStatus::Draft.as_ref()) {
            tx.rollback().await?;
            return Ok(GuardedWrite::Rejected);
        }

        sqlx::query("DELETE FROM attendance_records WHERE register_id = ?")
            .bind(register_id)
            .execute(&mut *tx)
            .await?;

        if !records.is_empty() {
            let mut qb = QueryBuilder::<MySql>::new(
                "INSERT INTO attendance_records (register_id, student_id, status, remarks) ",
            );
            qb.push_values(records, |mut b, r| {
                b.push_bind(register_id)
                    .push_bind(r.student_id)
                    .push_bind(r.status.as_ref())
                    .push_bind(r.remarks.as_deref());
            });
            qb.build().execute(&mut *tx).await?;
        }

        sqlx::query("UPDATE attendance_registers SET marked_by = ? WHERE id = ?")
            .bind(marked_by)
            .bind(register_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(GuardedWrite::Applied)
    }

    async fn finalize_register(&self, register_id: u64) -> StoreResult<GuardedWrite> {
        let result = sqlx::query(
            r#"
            UPDATE attendance_registers
            SET status = 'finalized', finalized_at = NOW()
            WHERE id = ? AND status = 'draft'
            "#,
        )
        .bind(register_id)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 1 {
            GuardedWrite::Applied
        } else {
            GuardedWrite::Rejected
        })
    }

    async fn register_records(&self, register_id: u64) -> StoreResult<Vec<AttendanceEntry>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT student_id, status, remarks
            FROM attendance_records
            WHERE register_id = ?
            ORDER BY student_id
            "#,
        )
        .bind(register_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn finalized_records_for_student(
        &self,
        student_id: u64,
        month: u32,
        year: i32,
    ) -> StoreResult<Vec<StudentAttendanceEntry>> {
        let Some(from) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return Ok(Vec::new());
        };
        let until = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| StoreError::Corrupt(format!("no month after {year}-{month}")))?;

        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT r.date, a.status, a.remarks
            FROM attendance_records a
            JOIN attendance_registers r ON r.id = a.register_id
            WHERE a.student_id = ?
              AND r.status = 'finalized'
              AND r.date >= ? AND r.date < ?
            ORDER BY r.date
            "#,
        )
        .bind(student_id)
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(StudentAttendanceEntry {
                    date: row.date,
                    status: parse("attendance_records.status", &row.status)?,
                    remarks: row.remarks,
                })
            })
            .collect()
    }
}

#[async_trait]
impl AssessmentStore for MySqlStore {
    async fn insert_assessment(&self, assessment: &NewAssessment) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO assessments
                (kind, exam_id, class_id, section_id, subject_id, title, max_marks, held_on, created_by, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'draft')
            "#,
        )
        .bind(assessment.kind.as_ref())
        .bind(assessment.exam_id)
        .bind(assessment.class_id)
        .bind(assessment.section_id)
        .bind(assessment.subject_id)
        .bind(&assessment.title)
        .bind(assessment.max_marks)
        .bind(assessment.held_on)
        .bind(assessment.created_by)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn insert_marks(&self, assessment_id: u64, marks: &[MarkEntry]) -> StoreResult<()> {
        if marks.is_empty() {
            return Ok(());
        }
        let mut qb = QueryBuilder::<MySql>::new(
            "INSERT INTO marks (assessment_id, student_id, marks_obtained) ",
        );
        qb.push_values(marks, |mut b, m| {
            b.push_bind(assessment_id)
                .push_bind(m.student_id)
                .push_bind(m.marks_obtained);
        });
        qb.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn find_assessment(&self, assessment_id: u64) -> StoreResult<Option<Assessment>> {
        let row = sqlx::query_as::<_, AssessmentRow>(&format!("{ASSESSMENT_SELECT} WHERE a.id = ?"))
            .bind(assessment_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Assessment::try_from).transpose()
    }

    async fn list_assessments(
        &self,
        class_id: u64,
        section_id: u64,
    ) -> StoreResult<Vec<Assessment>> {
        let rows = sqlx::query_as::<_, AssessmentRow>(&format!(
            "{ASSESSMENT_SELECT} WHERE a.class_id = ? AND a.section_id = ? ORDER BY a.held_on DESC, a.id DESC"
        ))
        .bind(class_id)
        .bind(section_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn exam_assessments(
        &self,
        exam_id: u64,
        class_id: u64,
        section_id: u64,
    ) -> StoreResult<Vec<Assessment>> {
        let rows = sqlx::query_as::<_, AssessmentRow>(&format!(
            "{ASSESSMENT_SELECT} WHERE a.exam_id = ? AND a.class_id = ? AND a.section_id = ? \
             AND a.kind = 'exam_subject' ORDER BY s.name, a.id"
        ))
        .bind(exam_id)
        .bind(class_id)
        .bind(section_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn assessment_marks(&self, assessment_id: u64) -> StoreResult<Vec<MarkEntry>> {
        let rows = sqlx::query_as::<_, MarkEntry>(
            r#"
            SELECT student_id, marks_obtained
            FROM marks
            WHERE assessment_id = ?
            ORDER BY student_id
            "#,
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn marks_for_assessments(
        &self,
        assessment_ids: &[u64],
    ) -> StoreResult<Vec<(u64, MarkEntry)>> {
        if assessment_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<MySql>::new(
            "SELECT assessment_id, student_id, marks_obtained FROM marks WHERE assessment_id",
        );
        push_in_list(&mut qb, assessment_ids);

        let rows = qb.build_query_as::<MarkRow>().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.assessment_id,
                    MarkEntry {
                        student_id: r.student_id,
                        marks_obtained: r.marks_obtained,
                    },
                )
            })
            .collect())
    }

    async fn replace_marks(
        &self,
        assessment_id: u64,
        marks: &[MarkEntry],
    ) -> StoreResult<GuardedWrite> {
        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM assessments WHERE id = ? FOR UPDATE")
                .bind(assessment_id)
                .fetch_optional(&mut *tx)
                .await?;

        if status.as_deref() != Some(LifecycleStatus::Draft.as_ref()) {
            tx.rollback().await?;
            return Ok(GuardedWrite::Rejected);
        }

        sqlx::query("DELETE FROM marks WHERE assessment_id = ?")
            .bind(assessment_id)
            .execute(&mut *tx)
            .await?;

        if !marks.is_empty() {
            let mut qb = QueryBuilder::<MySql>::new(
                "INSERT INTO marks (assessment_id, student_id, marks_obtained) ",
            );
            qb.push_values(marks, |mut b, m| {
                b.push_bind(assessment_id)
                    .push_bind(m.student_id)
                    .push_bind(m.marks_obtained);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(GuardedWrite::Applied)
    }

    async fn finalize_assessment(&self, assessment_id: u64) -> StoreResult<GuardedWrite> {
        let result = sqlx::query(
            "UPDATE assessments SET status = 'finalized' WHERE id = ? AND status = 'draft'",
        )
        .bind(assessment_id)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 1 {
            GuardedWrite::Applied
        } else {
            GuardedWrite::Rejected
        })
    }

    async fn delete_assessment(&self, assessment_id: u64) -> StoreResult<GuardedWrite> {
        // marks go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM assessments WHERE id = ? AND status = 'draft'")
            .bind(assessment_id)
            .execute(&self.pool)
            .await?;

        Ok(if result.rows_affected() == 1 {
            GuardedWrite::Applied
        } else {
            GuardedWrite::Rejected
        })
    }

    async fn discard_assessment(&self, assessment_id: u64) -> StoreResult<()> {
        sqlx::query("DELETE FROM assessments WHERE id = ?")
            .bind(assessment_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ResultStore for MySqlStore {
    async fn marksheet_link(
        &self,
        student_id: u64,
        exam_id: u64,
    ) -> StoreResult<Option<MarksheetLink>> {
        let row = sqlx::query_as::<_, MarksheetLink>(
            "SELECT student_id, exam_id, file_url FROM marksheets WHERE student_id = ? AND exam_id = ?",
        )
        .bind(student_id)
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn marksheet_links_for_exam(
        &self,
        exam_id: u64,
        student_ids: &[u64],
    ) -> StoreResult<Vec<MarksheetLink>> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<MySql>::new(
            "SELECT student_id, exam_id, file_url FROM marksheets WHERE exam_id = ",
        );
        qb.push_bind(exam_id);
        qb.push(" AND student_id");
        push_in_list(&mut qb, student_ids);

        let rows = qb
            .build_query_as::<MarksheetLink>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn upsert_marksheet_link(&self, link: &MarksheetLink) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO marksheets (student_id, exam_id, file_url)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE file_url = VALUES(file_url)
            "#,
        )
        .bind(link.student_id)
        .bind(link.exam_id)
        .bind(&link.file_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

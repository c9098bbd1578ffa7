use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::Datelike;

use super::*;
use crate::model::lifecycle::LifecycleStatus;

#[derive(Default)]
struct Inner {
    next_id: u64,
    students: Vec<StudentPlacement>,
    subjects: HashMap<u64, String>,
    homerooms: HashSet<(u64, u64, u64)>,
    subject_teachers: Vec<(u64, u64, u64, u64)>,
    settings: NotificationSettings,
    push_tokens: Vec<PushTarget>,
    fee_structures: Vec<FeeStructure>,
    payments: Vec<Payment>,
    overrides: Vec<FeeOverride>,
    registers: Vec<AttendanceRegister>,
    records: HashMap<u64, Vec<AttendanceEntry>>,
    assessments: Vec<Assessment>,
    marks: HashMap<u64, Vec<MarkEntry>>,
    links: Vec<MarksheetLink>,
    fail_marks_insert: bool,
}

impl Inner {
    fn id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process store for tests. Each call takes the lock once, which gives the
/// same per-statement atomicity the database provides.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut guard = self.inner.lock().unwrap();
        f(&mut guard)
    }

    pub fn add_student(&self, student_id: u64, name: &str, class_id: u64, section_id: u64) {
        self.with(|s| {
            s.students.push(StudentPlacement {
                student_id,
                name: name.to_string(),
                class_id,
                section_id,
            })
        });
    }

    pub fn add_subject(&self, subject_id: u64, name: &str) {
        self.with(|s| s.subjects.insert(subject_id, name.to_string()));
    }

    pub fn assign_homeroom(&self, teacher_id: u64, class_id: u64, section_id: u64) {
        self.with(|s| s.homerooms.insert((teacher_id, class_id, section_id)));
    }

    pub fn assign_subject(&self, teacher_id: u64, class_id: u64, section_id: u64, subject_id: u64) {
        self.with(|s| {
            s.subject_teachers
                .push((teacher_id, class_id, section_id, subject_id))
        });
    }

    pub fn add_push_token(&self, student_id: u64, token: &str) {
        self.with(|s| {
            s.push_tokens.push(PushTarget {
                student_id,
                token: token.to_string(),
            })
        });
    }

    pub fn set_settings(&self, settings: NotificationSettings) {
        self.with(|s| s.settings = settings);
    }

    pub fn add_fee_structure(&self, structure: FeeStructure) {
        self.with(|s| s.fee_structures.push(structure));
    }

    pub fn add_payment(&self, payment: Payment) {
        self.with(|s| s.payments.push(payment));
    }

    pub fn fail_next_marks_insert(&self) {
        self.with(|s| s.fail_marks_insert = true);
    }

    pub fn register_count(&self) -> usize {
        self.with(|s| s.registers.len())
    }

    pub fn assessment_count(&self) -> usize {
        self.with(|s| s.assessments.len())
    }

    pub fn assessment_ids(&self) -> Vec<u64> {
        self.with(|s| s.assessments.iter().map(|a| a.id).collect())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn student_placement(&self, student_id: u64) -> StoreResult<Option<StudentPlacement>> {
        Ok(self.with(|s| {
            s.students
                .iter()
                .find(|p| p.student_id == student_id)
                .cloned()
        }))
    }

    async fn students_in_section(
        &self,
        class_id: u64,
        section_id: u64,
    ) -> StoreResult<Vec<StudentPlacement>> {
        Ok(self.with(|s| {
            s.students
                .iter()
                .filter(|p| p.class_id == class_id && p.section_id == section_id)
                .cloned()
                .collect()
        }))
    }

    async fn section_assignment(
        &self,
        teacher_id: u64,
        class_id: u64,
        section_id: u64,
    ) -> StoreResult<SectionAssignment> {
        Ok(self.with(|s| SectionAssignment {
            homeroom: s.homerooms.contains(&(teacher_id, class_id, section_id)),
            subject_ids: s
                .subject_teachers
                .iter()
                .filter(|(t, c, sec, _)| *t == teacher_id && *c == class_id && *sec == section_id)
                .map(|(_, _, _, subject)| *subject)
                .collect(),
        }))
    }

    async fn subject_exists(&self, subject_id: u64) -> StoreResult<bool> {
        Ok(self.with(|s| s.subjects.contains_key(&subject_id)))
    }

    async fn notification_settings(&self) -> StoreResult<NotificationSettings> {
        Ok(self.with(|s| s.settings))
    }

    async fn push_targets(&self, student_ids: &[u64]) -> StoreResult<Vec<PushTarget>> {
        Ok(self.with(|s| {
            s.push_tokens
                .iter()
                .filter(|t| student_ids.contains(&t.student_id))
                .cloned()
                .collect()
        }))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn fee_structures_for_class(&self, class_id: u64) -> StoreResult<Vec<FeeStructure>> {
        Ok(self.with(|s| {
            s.fee_structures
                .iter()
                .filter(|f| f.class_id == class_id)
                .cloned()
                .collect()
        }))
    }

    async fn fee_structure(&self, structure_id: u64) -> StoreResult<Option<FeeStructure>> {
        Ok(self.with(|s| {
            s.fee_structures
                .iter()
                .find(|f| f.id == structure_id)
                .cloned()
        }))
    }

    async fn payments_for_student(
        &self,
        student_id: u64,
        structure_ids: &[u64],
    ) -> StoreResult<Vec<Payment>> {
        Ok(self.with(|s| {
            s.payments
                .iter()
                .filter(|p| p.student_id == student_id && structure_ids.contains(&p.fee_structure_id))
                .cloned()
                .collect()
        }))
    }

    async fn overrides_for_student(
        &self,
        student_id: u64,
        structure_ids: &[u64],
    ) -> StoreResult<Vec<FeeOverride>> {
        Ok(self.with(|s| {
            s.overrides
                .iter()
                .filter(|o| o.student_id == student_id && structure_ids.contains(&o.fee_structure_id))
                .cloned()
                .collect()
        }))
    }

    async fn insert_payment(&self, payment: &NewPayment) -> StoreResult<u64> {
        Ok(self.with(|s| {
            let id = s.id();
            s.payments.push(Payment {
                id,
                student_id: payment.student_id,
                fee_structure_id: payment.fee_structure_id,
                amount_paid: payment.amount_paid,
                paid_on: payment.paid_on,
                method: payment.method,
            });
            id
        }))
    }

    async fn upsert_override(&self, fee_override: &FeeOverride) -> StoreResult<()> {
        self.with(|s| {
            s.overrides.retain(|o| {
                !(o.student_id == fee_override.student_id
                    && o.fee_structure_id == fee_override.fee_structure_id)
            });
            s.overrides.push(fee_override.clone());
        });
        Ok(())
    }

    async fn delete_override(&self, student_id: u64, fee_structure_id: u64) -> StoreResult<()> {
        self.with(|s| {
            s.overrides
                .retain(|o| !(o.student_id == student_id && o.fee_structure_id == fee_structure_id))
        });
        Ok(())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_register(&self, key: &RegisterKey) -> StoreResult<Option<AttendanceRegister>> {
        Ok(self.with(|s| s.registers.iter().find(|r| r.key() == *key).cloned()))
    }

    async fn open_register(
        &self,
        key: &RegisterKey,
        marked_by: u64,
    ) -> StoreResult<AttendanceRegister> {
        Ok(self.with(|s| {
            if let Some(existing) = s.registers.iter().find(|r| r.key() == *key) {
                return existing.clone();
            }
            let register = AttendanceRegister {
                id: s.id(),
                date: key.date,
                class_id: key.class_id,
                section_id: key.section_id,
                status: LifecycleStatus::Draft,
                marked_by,
            };
            s.registers.push(register.clone());
            register
        }))
    }

    async fn replace_records(
        &self,
        register_id: u64,
        marked_by: u64,
        records: &[AttendanceEntry],
    ) -> StoreResult<GuardedWrite> {
        Ok(self.with(|s| {
            match s
                .registers
                .iter_mut()
                .find(|r| r.id == register_id && r.status == LifecycleStatus::Draft)
            {
                Some(register) => {
                    register.marked_by = marked_by;
                    s.records.insert(register_id, records.to_vec());
                    GuardedWrite::Applied
                }
                None => GuardedWrite::Rejected,
            }
        }))
    }

    async fn finalize_register(&self, register_id: u64) -> StoreResult<GuardedWrite> {
        Ok(self.with(|s| {
            match s
                .registers
                .iter_mut()
                .find(|r| r.id == register_id && r.status == LifecycleStatus::Draft)
            {
                Some(register) => {
                    register.status = LifecycleStatus::Finalized;
                    GuardedWrite::Applied
                }
                None => GuardedWrite::Rejected,
            }
        }))
    }

    async fn register_records(&self, register_id: u64) -> StoreResult<Vec<AttendanceEntry>> {
        Ok(self.with(|s| s.records.get(&register_id).cloned().unwrap_or_default()))
    }

    async fn finalized_records_for_student(
        &self,
        student_id: u64,
        month: u32,
        year: i32,
    ) -> StoreResult<Vec<StudentAttendanceEntry>> {
        Ok(self.with(|s| {
            let mut out: Vec<StudentAttendanceEntry> = s
                .registers
                .iter()
                .filter(|r| {
                    r.status == LifecycleStatus::Finalized
                        && r.date.month() == month
                        && r.date.year() == year
                })
                .filter_map(|r| {
                    s.records
                        .get(&r.id)?
                        .iter()
                        .find(|e| e.student_id == student_id)
                        .map(|e| StudentAttendanceEntry {
                            date: r.date,
                            status: e.status,
                            remarks: e.remarks.clone(),
                        })
                })
                .collect();
            out.sort_by_key(|e| e.date);
            out
        }))
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn insert_assessment(&self, assessment: &NewAssessment) -> StoreResult<u64> {
        self.with(|s| {
            let Some(subject_name) = s.subjects.get(&assessment.subject_id).cloned() else {
                return Err(StoreError::MissingReference(format!(
                    "subject {}",
                    assessment.subject_id
                )));
            };
            let id = s.id();
            s.assessments.push(Assessment {
                id,
                kind: assessment.kind,
                exam_id: assessment.exam_id,
                class_id: assessment.class_id,
                section_id: assessment.section_id,
                subject_id: assessment.subject_id,
                subject_name,
                title: assessment.title.clone(),
                max_marks: assessment.max_marks,
                held_on: assessment.held_on,
                created_by: assessment.created_by,
                status: LifecycleStatus::Draft,
            });
            Ok(id)
        })
    }

    async fn insert_marks(&self, assessment_id: u64, marks: &[MarkEntry]) -> StoreResult<()> {
        self.with(|s| {
            if std::mem::take(&mut s.fail_marks_insert) {
                return Err(StoreError::Database("injected marks failure".into()));
            }
            s.marks.insert(assessment_id, marks.to_vec());
            Ok(())
        })
    }

    async fn find_assessment(&self, assessment_id: u64) -> StoreResult<Option<Assessment>> {
        Ok(self.with(|s| {
            s.assessments
                .iter()
                .find(|a| a.id == assessment_id)
                .cloned()
        }))
    }

    async fn list_assessments(
        &self,
        class_id: u64,
        section_id: u64,
    ) -> StoreResult<Vec<Assessment>> {
        Ok(self.with(|s| {
            s.assessments
                .iter()
                .filter(|a| a.class_id == class_id && a.section_id == section_id)
                .cloned()
                .collect()
        }))
    }

    async fn exam_assessments(
        &self,
        exam_id: u64,
        class_id: u64,
        section_id: u64,
    ) -> StoreResult<Vec<Assessment>> {
        Ok(self.with(|s| {
            s.assessments
                .iter()
                .filter(|a| {
                    a.exam_id == Some(exam_id) && a.class_id == class_id && a.section_id == section_id
                })
                .cloned()
                .collect()
        }))
    }

    async fn assessment_marks(&self, assessment_id: u64) -> StoreResult<Vec<MarkEntry>> {
        Ok(self.with(|s| s.marks.get(&assessment_id).cloned().unwrap_or_default()))
    }

    async fn marks_for_assessments(
        &self,
        assessment_ids: &[u64],
    ) -> StoreResult<Vec<(u64, MarkEntry)>> {
        Ok(self.with(|s| {
            assessment_ids
                .iter()
                .flat_map(|aid| {
                    s.marks
                        .get(aid)
                        .into_iter()
                        .flatten()
                        .map(move |m| (*aid, m.clone()))
                })
                .collect()
        }))
    }

    async fn replace_marks(
        &self,
        assessment_id: u64,
        marks: &[MarkEntry],
    ) -> StoreResult<GuardedWrite> {
        Ok(self.with(|s| {
            let draft = s
                .assessments
                .iter()
                .any(|a| a.id == assessment_id && a.status == LifecycleStatus::Draft);
            if !draft {
                return GuardedWrite::Rejected;
            }
            s.marks.insert(assessment_id, marks.to_vec());
            GuardedWrite::Applied
        }))
    }

    async fn finalize_assessment(&self, assessment_id: u64) -> StoreResult<GuardedWrite> {
        Ok(self.with(|s| {
            match s
                .assessments
                .iter_mut()
                .find(|a| a.id == assessment_id && a.status == LifecycleStatus::Draft)
            {
                Some(a) => {
                    a.status = LifecycleStatus::Finalized;
                    GuardedWrite::Applied
                }
                None => GuardedWrite::Rejected,
            }
        }))
    }

    async fn delete_assessment(&self, assessment_id: u64) -> StoreResult<GuardedWrite> {
        Ok(self.with(|s| {
            let before = s.assessments.len();
            s.assessments
                .retain(|a| !(a.id == assessment_id && a.status == LifecycleStatus::Draft));
            if s.assessments.len() == before {
                return GuardedWrite::Rejected;
            }
            s.marks.remove(&assessment_id);
            GuardedWrite::Applied
        }))
    }

    async fn discard_assessment(&self, assessment_id: u64) -> StoreResult<()> {
        self.with(|s| {
            s.assessments.retain(|a| a.id != assessment_id);
            s.marks.remove(&assessment_id);
        });
        Ok(())
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn marksheet_link(
        &self,
        student_id: u64,
        exam_id: u64,
    ) -> StoreResult<Option<MarksheetLink>> {
        Ok(self.with(|s| {
            s.links
                .iter()
                .find(|l| l.student_id == student_id && l.exam_id == exam_id)
                .cloned()
        }))
    }

    async fn marksheet_links_for_exam(
        &self,
        exam_id: u64,
        student_ids: &[u64],
    ) -> StoreResult<Vec<MarksheetLink>> {
        Ok(self.with(|s| {
            s.links
                .iter()
                .filter(|l| l.exam_id == exam_id && student_ids.contains(&l.student_id))
                .cloned()
                .collect()
        }))
    }

    async fn upsert_marksheet_link(&self, link: &MarksheetLink) -> StoreResult<()> {
        self.with(|s| {
            s.links
                .retain(|l| !(l.student_id == link.student_id && l.exam_id == link.exam_id));
            s.links.push(link.clone());
        });
        Ok(())
    }
}

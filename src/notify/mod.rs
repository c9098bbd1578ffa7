//! Outbound events raised after a committed transition, and the sink that
//! carries them to the push dispatcher. Delivery never feeds back into the
//! request that raised the event.

use rust_decimal::Decimal;
use serde_json::{Value, json};

use crate::model::attendance::RegisterKey;

pub mod dispatch;

pub use dispatch::{HttpPushDispatcher, LogDispatcher, PushDispatcher, PushNotifier};

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    AttendanceFinalized {
        register_id: u64,
        key: RegisterKey,
        present: Vec<u64>,
        absent: Vec<u64>,
    },
    AssessmentFinalized {
        assessment_id: u64,
        title: String,
        subject_name: String,
        student_ids: Vec<u64>,
    },
    MarksheetPublished {
        student_id: u64,
        exam_id: u64,
    },
    PaymentRecorded {
        payment_id: u64,
        student_id: u64,
        amount: Decimal,
    },
}

/// One message addressed to a cohort of students.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub student_ids: Vec<u64>,
    pub title: String,
    pub body: String,
    pub data: Value,
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::AttendanceFinalized { .. } => "attendance_finalized",
            DomainEvent::AssessmentFinalized { .. } => "assessment_finalized",
            DomainEvent::MarksheetPublished { .. } => "marksheet_published",
            DomainEvent::PaymentRecorded { .. } => "payment_recorded",
        }
    }

    /// Splits the event into per-cohort messages. Empty cohorts produce nothing.
    pub fn notifications(&self) -> Vec<Notification> {
        let mut out = Vec::new();
        match self {
            DomainEvent::AttendanceFinalized {
                register_id,
                key,
                present,
                absent,
            } => {
                let data = json!({
                    "type": "attendance",
                    "register_id": register_id,
                    "date": key.date.to_string(),
                });
                if !present.is_empty() {
                    out.push(Notification {
                        student_ids: present.clone(),
                        title: "Attendance marked".to_string(),
                        body: format!("You were marked present on {}.", key.date),
                        data: data.clone(),
                    });
                }
                if !absent.is_empty() {
                    out.push(Notification {
                        student_ids: absent.clone(),
                        title: "Absence recorded".to_string(),
                        body: format!(
                            "You were marked absent on {}. Contact your class teacher if this is wrong.",
                            key.date
                        ),
                        data,
                    });
                }
            }
            DomainEvent::AssessmentFinalized {
                assessment_id,
                title,
                subject_name,
                student_ids,
            } => {
                if !student_ids.is_empty() {
                    out.push(Notification {
                        student_ids: student_ids.clone(),
                        title: "Marks published".to_string(),
                        body: format!("Marks for {title} ({subject_name}) are now available."),
                        data: json!({ "type": "marks", "assessment_id": assessment_id }),
                    });
                }
            }
            DomainEvent::MarksheetPublished {
                student_id,
                exam_id,
            } => out.push(Notification {
                student_ids: vec![*student_id],
                title: "Result approved".to_string(),
                body: "Your official result has been published.".to_string(),
                data: json!({ "type": "result", "exam_id": exam_id }),
            }),
            DomainEvent::PaymentRecorded {
                payment_id,
                student_id,
                amount,
            } => out.push(Notification {
                student_ids: vec![*student_id],
                title: "Payment received".to_string(),
                body: format!("A payment of {amount} has been recorded."),
                data: json!({ "type": "fee", "payment_id": payment_id }),
            }),
        }
        out
    }
}

/// Accepts events after commit. Implementations must not block or fail the caller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn attendance_event_splits_present_and_absent_cohorts() {
        let event = DomainEvent::AttendanceFinalized {
            register_id: 9,
            key: RegisterKey {
                date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                class_id: 1,
                section_id: 1,
            },
            present: vec![1, 3],
            absent: vec![2],
        };

        let notes = event.notifications();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].student_ids, vec![1, 3]);
        assert!(notes[0].body.contains("present"));
        assert_eq!(notes[1].student_ids, vec![2]);
        assert!(notes[1].body.contains("absent"));
    }

    #[test]
    fn empty_cohort_is_skipped() {
        let event = DomainEvent::AttendanceFinalized {
            register_id: 1,
            key: RegisterKey {
                date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                class_id: 1,
                section_id: 1,
            },
            present: vec![1],
            absent: vec![],
        };
        assert_eq!(event.notifications().len(), 1);
    }
}

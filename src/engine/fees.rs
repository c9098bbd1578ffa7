use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;

use super::{Actor, SectionNeed, authorize_section, ledger::load_fee_status_for, placement_of};
use crate::{
    error::{AppError, AppResult},
    model::{
        fee::{FeeOverride, FeeStatusReport, FeeStructure, ManualFeeStatus, NewPayment, Payment, PaymentMethod},
        school::{NotificationSettings, StudentPlacement},
    },
    notify::{DomainEvent, EventSink},
    store::{DirectoryStore, LedgerStore},
};

/// Largest value the DECIMAL(12,2) ledger column holds, 9999999999.99.
const AMOUNT_CEILING: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub student_id: u64,
    pub fee_structure_id: u64,
    pub amount_paid: Decimal,
    pub paid_on: NaiveDate,
    pub method: PaymentMethod,
}

/// Looks up a structure and checks it applies to the student's class.
async fn structure_for<S>(
    store: &S,
    placement: &StudentPlacement,
    fee_structure_id: u64,
) -> AppResult<FeeStructure>
where
    S: LedgerStore + ?Sized,
{
    let structure = store
        .fee_structure(fee_structure_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Fee structure {fee_structure_id} not found")))?;

    if structure.class_id != placement.class_id {
        return Err(AppError::validation(format!(
            "Fee structure {fee_structure_id} does not apply to student {}'s class",
            placement.student_id
        )));
    }
    Ok(structure)
}

/// Appends a payment to the ledger. Admin only.
pub async fn record_payment<S>(
    store: &S,
    actor: &Actor,
    settings: &NotificationSettings,
    sink: &dyn EventSink,
    req: PaymentRequest,
) -> AppResult<Payment>
where
    S: DirectoryStore + LedgerStore + ?Sized,
{
    actor.require_admin()?;

    if req.amount_paid <= Decimal::ZERO {
        return Err(AppError::validation("amount_paid must be greater than zero"));
    }
    if req.amount_paid.scale() > 2 {
        return Err(AppError::validation("amount_paid has more than two decimal places"));
    }
    if req.amount_paid > AMOUNT_CEILING {
        return Err(AppError::validation(format!(
            "amount_paid must not exceed {AMOUNT_CEILING}"
        )));
    }

    let placement = placement_of(store, req.student_id).await?;
    structure_for(store, &placement, req.fee_structure_id).await?;

    let id = store
        .insert_payment(&NewPayment {
            student_id: req.student_id,
            fee_structure_id: req.fee_structure_id,
            amount_paid: req.amount_paid,
            paid_on: req.paid_on,
            method: req.method,
            recorded_by: actor.user_id,
        })
        .await?;

    info!(
        payment_id = id,
        student_id = req.student_id,
        fee_structure_id = req.fee_structure_id,
        amount = %req.amount_paid,
        "Payment recorded"
    );

    if settings.fees {
        sink.emit(DomainEvent::PaymentRecorded {
            payment_id: id,
            student_id: req.student_id,
            amount: req.amount_paid,
        });
    }

    Ok(Payment {
        id,
        student_id: req.student_id,
        fee_structure_id: req.fee_structure_id,
        amount_paid: req.amount_paid,
        paid_on: req.paid_on,
        method: req.method,
    })
}

/// Manual paid/unpaid mark by the student's homeroom teacher. `Paid` settles
/// the line through an override; `Unpaid` removes the override so the line
/// follows its payments again.
pub async fn set_fee_status<S>(
    store: &S,
    actor: &Actor,
    student_id: u64,
    fee_structure_id: u64,
    status: ManualFeeStatus,
    today: NaiveDate,
) -> AppResult<FeeStatusReport>
where
    S: DirectoryStore + LedgerStore + ?Sized,
{
    let placement = placement_of(store, student_id).await?;
    structure_for(store, &placement, fee_structure_id).await?;
    authorize_section(
        store,
        actor,
        placement.class_id,
        placement.section_id,
        SectionNeed::Homeroom,
    )
    .await?;

    match status {
        ManualFeeStatus::Paid => {
            store
                .upsert_override(&FeeOverride {
                    student_id,
                    fee_structure_id,
                    set_by: actor.user_id,
                    set_on: today,
                })
                .await?
        }
        ManualFeeStatus::Unpaid => store.delete_override(student_id, fee_structure_id).await?,
    }

    info!(student_id, fee_structure_id, ?status, set_by = actor.user_id, "Fee status overridden");

    load_fee_status_for(store, &placement, today).await
}

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::placement_of;
use crate::{
    error::AppResult,
    model::{
        fee::{FeeLine, FeeLineStatus, FeeOverride, FeeStatusReport, FeeStructure, Payment},
        school::StudentPlacement,
    },
    store::{DirectoryStore, LedgerStore},
};

/// Turns a class's fee structures and one student's payments into a report.
///
/// `total_due` counts every structure, future-dated ones included, while
/// `is_defaulter` only looks at structures due on or before `as_of`.
pub fn compute_fee_status(
    student_id: u64,
    class_id: u64,
    structures: &[FeeStructure],
    payments: &[Payment],
    overrides: &[FeeOverride],
    as_of: NaiveDate,
) -> FeeStatusReport {
    let mut per_structure = Vec::with_capacity(structures.len());
    let mut total_paid = Decimal::ZERO;
    let mut total_due = Decimal::ZERO;
    let mut is_defaulter = false;

    for structure in structures {
        let paid_amount: Decimal = payments
            .iter()
            .filter(|p| p.student_id == student_id && p.fee_structure_id == structure.id)
            .map(|p| p.amount_paid)
            .sum();

        let overridden = overrides
            .iter()
            .any(|o| o.student_id == student_id && o.fee_structure_id == structure.id);

        let due_amount = if overridden {
            Decimal::ZERO
        } else {
            (structure.amount - paid_amount).max(Decimal::ZERO)
        };

        if structure.due_date <= as_of && due_amount > Decimal::ZERO {
            is_defaulter = true;
        }

        total_paid += paid_amount;
        total_due += due_amount;

        per_structure.push(FeeLine {
            structure_id: structure.id,
            fee_type_id: structure.fee_type_id,
            fee_type_name: structure.fee_type_name.clone(),
            due_date: structure.due_date,
            total_amount: structure.amount,
            paid_amount,
            due_amount,
            status: if due_amount.is_zero() {
                FeeLineStatus::Paid
            } else {
                FeeLineStatus::Pending
            },
            overridden,
        });
    }

    FeeStatusReport {
        student_id,
        class_id,
        as_of,
        per_structure,
        total_paid,
        total_due,
        is_defaulter,
    }
}

pub async fn load_fee_status<S>(
    store: &S,
    student_id: u64,
    as_of: NaiveDate,
) -> AppResult<FeeStatusReport>
where
    S: DirectoryStore + LedgerStore + ?Sized,
{
    let placement = placement_of(store, student_id).await?;
    load_fee_status_for(store, &placement, as_of).await
}

/// Same as [`load_fee_status`] when the placement is already known.
pub async fn load_fee_status_for<S>(
    store: &S,
    placement: &StudentPlacement,
    as_of: NaiveDate,
) -> AppResult<FeeStatusReport>
where
    S: LedgerStore + ?Sized,
{
    let structures = store.fee_structures_for_class(placement.class_id).await?;
    if structures.is_empty() {
        return Ok(compute_fee_status(
            placement.student_id,
            placement.class_id,
            &[],
            &[],
            &[],
            as_of,
        ));
    }

    let ids: Vec<u64> = structures.iter().map(|s| s.id).collect();
    let payments = store.payments_for_student(placement.student_id, &ids).await?;
    let overrides = store.overrides_for_student(placement.student_id, &ids).await?;

    let report = compute_fee_status(
        placement.student_id,
        placement.class_id,
        &structures,
        &payments,
        &overrides,
        as_of,
    );

    tracing::debug!(
        student_id = placement.student_id,
        total_due = %report.total_due,
        is_defaulter = report.is_defaulter,
        "Fee status computed"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        engine::fixtures::day,
        error::AppError,
        model::fee::PaymentMethod,
        store::memory::MemoryStore,
    };

    fn structure(id: u64, amount: Decimal, due_date: NaiveDate) -> FeeStructure {
        FeeStructure {
            id,
            class_id: 10,
            fee_type_id: id,
            fee_type_name: format!("fee-{id}"),
            amount,
            due_date,
        }
    }

    fn payment(id: u64, structure_id: u64, amount: Decimal) -> Payment {
        Payment {
            id,
            student_id: 1,
            fee_structure_id: structure_id,
            amount_paid: amount,
            paid_on: day(2026, 9, 1),
            method: PaymentMethod::Cash,
        }
    }

    #[test]
    fn partial_payment_past_due_makes_a_defaulter() {
        let today = day(2026, 10, 19);
        let structures = [structure(1, dec!(1000), day(2026, 10, 18))];
        let payments = [payment(1, 1, dec!(250)), payment(2, 1, dec!(350))];

        let report = compute_fee_status(1, 10, &structures, &payments, &[], today);

        let line = &report.per_structure[0];
        assert_eq!(line.paid_amount, dec!(600));
        assert_eq!(line.due_amount, dec!(400));
        assert_eq!(line.status, FeeLineStatus::Pending);
        assert_eq!(report.total_due, dec!(400));
        assert!(report.is_defaulter);
    }

    #[test]
    fn future_due_date_is_reported_but_does_not_lock() {
        let today = day(2026, 10, 19);
        let structures = [structure(1, dec!(1000), day(2026, 10, 20))];
        let payments = [payment(1, 1, dec!(600))];

        let report = compute_fee_status(1, 10, &structures, &payments, &[], today);

        assert_eq!(report.per_structure[0].due_amount, dec!(400));
        assert_eq!(report.total_due, dec!(400));
        assert!(!report.is_defaulter);
    }

    #[test]
    fn due_today_counts_as_past_due() {
        let today = day(2026, 10, 19);
        let report = compute_fee_status(
            1,
            10,
            &[structure(1, dec!(50), today)],
            &[],
            &[],
            today,
        );
        assert!(report.is_defaulter);
    }

    #[test]
    fn no_structures_is_vacuously_paid() {
        let report = compute_fee_status(1, 10, &[], &[], &[], day(2026, 10, 19));
        assert!(!report.is_defaulter);
        assert_eq!(report.total_due, Decimal::ZERO);
        assert!(report.per_structure.is_empty());
    }

    #[test]
    fn overpayment_clamps_due_at_zero() {
        let today = day(2026, 10, 19);
        let report = compute_fee_status(
            1,
            10,
            &[structure(1, dec!(500), day(2026, 1, 1))],
            &[payment(1, 1, dec!(700))],
            &[],
            today,
        );
        let line = &report.per_structure[0];
        assert_eq!(line.paid_amount, dec!(700));
        assert_eq!(line.due_amount, Decimal::ZERO);
        assert_eq!(line.status, FeeLineStatus::Paid);
        assert!(!report.is_defaulter);
    }

    #[test]
    fn fractional_payments_sum_exactly() {
        let today = day(2026, 10, 19);
        let payments: Vec<Payment> = (1..=10).map(|i| payment(i, 1, dec!(0.10))).collect();
        let report = compute_fee_status(
            1,
            10,
            &[structure(1, dec!(1.00), day(2026, 1, 1))],
            &payments,
            &[],
            today,
        );
        assert_eq!(report.per_structure[0].due_amount, Decimal::ZERO);
        assert!(!report.is_defaulter);
    }

    #[test]
    fn payments_against_other_structures_are_ignored() {
        let today = day(2026, 10, 19);
        let structures = [
            structure(1, dec!(100), day(2026, 1, 1)),
            structure(2, dec!(200), day(2026, 1, 1)),
        ];
        let payments = [payment(1, 2, dec!(200)), payment(2, 99, dec!(100))];

        let report = compute_fee_status(1, 10, &structures, &payments, &[], today);

        assert_eq!(report.per_structure[0].due_amount, dec!(100));
        assert_eq!(report.per_structure[1].due_amount, Decimal::ZERO);
        assert_eq!(report.total_paid, dec!(200));
        assert!(report.is_defaulter);
    }

    #[test]
    fn override_settles_a_line_without_payments() {
        let today = day(2026, 10, 19);
        let overrides = [FeeOverride {
            student_id: 1,
            fee_structure_id: 1,
            set_by: 7,
            set_on: today,
        }];
        let report = compute_fee_status(
            1,
            10,
            &[structure(1, dec!(1000), day(2026, 1, 1))],
            &[],
            &overrides,
            today,
        );
        let line = &report.per_structure[0];
        assert!(line.overridden);
        assert_eq!(line.status, FeeLineStatus::Paid);
        assert_eq!(line.paid_amount, Decimal::ZERO);
        assert!(!report.is_defaulter);
    }

    #[test]
    fn totals_match_sum_of_clamped_dues_across_mixed_ledgers() {
        let today = day(2026, 10, 19);
        let structures = [
            structure(1, dec!(1200.50), day(2026, 4, 1)),
            structure(2, dec!(300), day(2026, 12, 1)),
            structure(3, dec!(75.25), day(2026, 10, 19)),
            structure(4, dec!(10), day(2027, 1, 1)),
        ];
        let ledgers: [&[(u64, Decimal)]; 4] = [
            &[],
            &[(1, dec!(1200.50)), (3, dec!(75.25))],
            &[(1, dec!(1300)), (2, dec!(100)), (4, dec!(3.33))],
            &[(2, dec!(300)), (3, dec!(75.24))],
        ];

        for entries in ledgers {
            let payments: Vec<Payment> = entries
                .iter()
                .enumerate()
                .map(|(i, (sid, amt))| payment(i as u64, *sid, *amt))
                .collect();
            let report = compute_fee_status(1, 10, &structures, &payments, &[], today);

            let expected_due: Decimal = structures
                .iter()
                .map(|s| {
                    let paid: Decimal = payments
                        .iter()
                        .filter(|p| p.fee_structure_id == s.id)
                        .map(|p| p.amount_paid)
                        .sum();
                    (s.amount - paid).max(Decimal::ZERO)
                })
                .sum();
            let expected_defaulter = report
                .per_structure
                .iter()
                .any(|l| l.due_date <= today && l.due_amount > Decimal::ZERO);

            assert_eq!(report.total_due, expected_due);
            assert_eq!(report.is_defaulter, expected_defaulter);
        }
    }

    #[actix_web::test]
    async fn load_requires_a_placement() {
        let store = MemoryStore::new();
        let err = load_fee_status(&store, 404, day(2026, 10, 19))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[actix_web::test]
    async fn load_reads_structures_payments_and_overrides() {
        let store = MemoryStore::new();
        store.add_student(1, "Asha", 10, 1);
        store.add_fee_structure(structure(1, dec!(1000), day(2026, 10, 18)));
        store.add_fee_structure(structure(2, dec!(500), day(2026, 10, 18)));
        store.add_payment(payment(1, 1, dec!(600)));
        store
            .upsert_override(&FeeOverride {
                student_id: 1,
                fee_structure_id: 2,
                set_by: 7,
                set_on: day(2026, 10, 1),
            })
            .await
            .unwrap();

        let report = load_fee_status(&store, 1, day(2026, 10, 19)).await.unwrap();
        assert_eq!(report.total_due, dec!(400));
        assert!(report.is_defaulter);
        assert!(report.per_structure[1].overridden);
    }
}

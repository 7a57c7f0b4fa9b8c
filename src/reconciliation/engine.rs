//! Batch reconciliation of payments against outstanding invoices

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::{OutstandingRule, ReconcileConfig};
use crate::matching::InvoiceSelector;
use crate::types::*;

/// Everything one reconciliation run decided
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    /// Attached payments, in the order they were attached
    pub updated_payments: Vec<Payment>,
    /// Invoices that received payments, in first-touch order, in their final state
    pub updated_invoices: Vec<Invoice>,
    pub matches: Vec<MatchResult>,
    pub unattached: Vec<UnattachedPayment>,
    /// Payments handed to the run
    pub payments_scanned: usize,
    /// Invoices handed to the run
    pub invoices_scanned: usize,
}

impl ReconciliationOutcome {
    /// Whether there is nothing to persist
    pub fn is_empty(&self) -> bool {
        self.updated_payments.is_empty() && self.updated_invoices.is_empty()
    }

    /// Id of the invoice a payment was attached to in this run
    pub fn invoice_for(&self, payment_id: &str) -> Option<&str> {
        self.matches
            .iter()
            .find(|result| result.payment_id == payment_id)
            .map(|result| result.invoice_id.as_str())
    }
}

/// Links each payment to at most one invoice
///
/// A run is synchronous and owns its working copies of payments and
/// invoices; identical inputs always yield identical outcomes.
pub struct ReconciliationEngine {
    selector: InvoiceSelector,
    outstanding: OutstandingRule,
    attached_attribute: Option<AttributeValue>,
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new(&ReconcileConfig::default())
    }
}

impl ReconciliationEngine {
    pub fn new(config: &ReconcileConfig) -> Self {
        Self {
            selector: InvoiceSelector::with_entity_keys(
                config.strategy.matcher(),
                config.entity_keys.clone(),
            ),
            outstanding: config.outstanding,
            attached_attribute: config.attached_attribute.clone(),
        }
    }

    /// The rule deciding which invoices still take payments
    pub fn outstanding_rule(&self) -> OutstandingRule {
        self.outstanding
    }

    /// Attach payments to the invoices they settle
    ///
    /// Payments are processed in input order. Each one is offered only the
    /// invoices that are still outstanding after the payments before it were
    /// applied, and stops at the first invoice that qualifies.
    pub fn reconcile(&self, payments: Vec<Payment>, invoices: Vec<Invoice>) -> ReconciliationOutcome {
        let mut outcome = ReconciliationOutcome {
            payments_scanned: payments.len(),
            invoices_scanned: invoices.len(),
            ..ReconciliationOutcome::default()
        };

        let mut invoices = invoices;
        let mut touched = vec![false; invoices.len()];
        let mut touch_order = Vec::new();

        for mut payment in payments {
            if payment.is_attached_to_invoice {
                outcome.unattached.push(Self::leave(&payment, UnattachedReason::AlreadyAttached));
                continue;
            }

            let candidates = invoices
                .iter()
                .enumerate()
                .filter(|(_, invoice)| self.outstanding.is_outstanding(invoice));

            let selection = match self.selector.select(&payment, candidates) {
                Ok(selection) => selection,
                Err(reason) => {
                    outcome.unattached.push(Self::leave(&payment, reason));
                    continue;
                }
            };

            let invoice = &mut invoices[selection.index];
            payment.attach_to(invoice.reference(), self.attached_attribute.as_ref());

            // A payment already listed on the invoice was counted before
            if invoice.apply_payment(&payment) && !touched[selection.index] {
                touched[selection.index] = true;
                touch_order.push(selection.index);
            }

            info!(
                "attached payment {} ({}) to invoice {} ({:?})",
                payment.id, payment.amount, invoice.id, selection.evidence
            );
            outcome.matches.push(MatchResult {
                payment_id: payment.id.clone(),
                invoice_id: invoice.id.clone(),
                evidence: selection.evidence,
            });
            outcome.updated_payments.push(payment);
        }

        let mut slots: Vec<Option<Invoice>> = invoices.into_iter().map(Some).collect();
        outcome.updated_invoices = touch_order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();

        outcome
    }

    fn leave(payment: &Payment, reason: UnattachedReason) -> UnattachedPayment {
        debug!("payment {} left unattached: {}", payment.id, reason);
        UnattachedPayment {
            payment_id: payment.id.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MatchStrategy, ReconcileConfig};
    use chrono::NaiveDate;

    const AMOUNT: i64 = 4_048_750;

    fn invoice(name: &str, day: u32, total: i64) -> Invoice {
        Invoice::new(
            format!("inv-{name}"),
            name.to_string(),
            NaiveDate::from_ymd_opt(2025, 2, day).unwrap(),
            total,
        )
        .with_entity(EntityKind::Agent, EntityRef::new("counterparty/acme"))
        .with_entity(EntityKind::OrganizationAccount, EntityRef::new("account/main"))
        .with_entity(EntityKind::Organization, EntityRef::new("organization/we"))
    }

    fn payment(id: &str, purpose: &str, amount: i64) -> Payment {
        Payment::new(id.to_string(), amount, Some(purpose.to_string()))
            .with_entity(EntityKind::Agent, EntityRef::new("counterparty/acme"))
            .with_entity(EntityKind::OrganizationAccount, EntityRef::new("account/main"))
            .with_entity(EntityKind::Organization, EntityRef::new("organization/we"))
    }

    fn same_unit_engine() -> ReconciliationEngine {
        ReconciliationEngine::new(
            &ReconcileConfig::default().with_outstanding(OutstandingRule::same_unit()),
        )
    }

    #[test]
    fn test_each_payment_finds_its_own_invoice() {
        let engine = ReconciliationEngine::default();
        let invoices: Vec<Invoice> = (1000..1005).map(|n| invoice(&n.to_string(), 19, AMOUNT)).collect();
        let payments: Vec<Payment> = (1000..1005)
            .rev()
            .map(|n| payment(&format!("pay-{n}"), &format!("Оплата по сч/ф {n} от 19.02.2025"), AMOUNT))
            .collect();

        let outcome = engine.reconcile(payments, invoices);

        assert_eq!(outcome.matches.len(), 5);
        for n in 1000..1005 {
            assert_eq!(
                outcome.invoice_for(&format!("pay-{n}")),
                Some(format!("inv-{n}").as_str())
            );
        }
        // Invoices are listed in the order payments reached them
        let names: Vec<&str> = outcome.updated_invoices.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["1004", "1003", "1002", "1001", "1000"]);
    }

    #[test]
    fn test_legacy_strategy_ignores_cited_number() {
        let engine = ReconciliationEngine::new(
            &ReconcileConfig::default()
                .with_strategy(MatchStrategy::Legacy)
                .with_outstanding(OutstandingRule::same_unit()),
        );
        let invoices = vec![invoice("2000", 19, AMOUNT * 3)];
        let payments = vec![
            payment("pay-a", "Оплата по сч/ф 1020 от 19.02.2025", AMOUNT * 3),
            payment("pay-b", "Оплата по сч/ф 1021 от 19.02.2025", 1),
        ];

        let outcome = engine.reconcile(payments, invoices);
        assert_eq!(outcome.invoice_for("pay-a"), Some("inv-2000"));
        // Fully paid by the first payment, so the second finds nothing
        assert_eq!(outcome.invoice_for("pay-b"), None);
    }

    #[test]
    fn test_attachment_updates_both_records() {
        let engine = same_unit_engine();
        let invoices = vec![invoice("1020", 19, AMOUNT)];
        let payments = vec![payment("pay-1", "Оплата по сч/ф 1020 от 19.02.2025", 1_000)];

        let outcome = engine.reconcile(payments, invoices);

        let paid = &outcome.updated_payments[0];
        assert!(paid.is_attached_to_invoice);
        assert_eq!(paid.linked_invoice().map(EntityRef::key), Some("invoiceout/inv-1020"));

        let invoice = &outcome.updated_invoices[0];
        assert_eq!(invoice.paid, 1_000);
        assert_eq!(invoice.payments, vec![paid.reference()]);
    }

    #[test]
    fn test_partial_payments_accumulate_within_a_run() {
        let engine = same_unit_engine();
        let invoices = vec![invoice("1020", 19, 3_000)];
        let payments = vec![
            payment("pay-1", "счет 1020 от 19.02.2025", 1_000),
            payment("pay-2", "счет 1020 от 19.02.2025", 2_000),
            payment("pay-3", "счет 1020 от 19.02.2025", 500),
        ];

        let outcome = engine.reconcile(payments, invoices);

        assert_eq!(outcome.updated_payments.len(), 2);
        assert_eq!(outcome.updated_invoices.len(), 1);
        assert_eq!(outcome.updated_invoices[0].paid, 3_000);
        assert_eq!(outcome.updated_invoices[0].payments.len(), 2);
        // The invoice was settled before the third payment came along
        assert_eq!(
            outcome.unattached,
            vec![UnattachedPayment {
                payment_id: "pay-3".to_string(),
                reason: UnattachedReason::NoMatchFound,
            }]
        );
    }

    #[test]
    fn test_legacy_scale_closes_invoice_after_first_payment() {
        let engine = ReconciliationEngine::default();
        let invoices = vec![invoice("1020", 19, 3_000)];
        let payments = vec![
            payment("pay-1", "счет 1020 от 19.02.2025", 30),
            payment("pay-2", "счет 1020 от 19.02.2025", 10),
        ];

        let outcome = engine.reconcile(payments, invoices);
        assert_eq!(outcome.invoice_for("pay-1"), Some("inv-1020"));
        assert_eq!(outcome.invoice_for("pay-2"), None);
    }

    #[test]
    fn test_unmatched_payments_are_left_out_of_batches() {
        let engine = ReconciliationEngine::default();
        let invoices = vec![invoice("1020", 19, AMOUNT)];
        let mut no_account = payment("pay-2", "счет 1020 от 19.02.2025", AMOUNT);
        no_account.organization_account = None;
        let payments = vec![payment("pay-1", "Возврат средств", AMOUNT), no_account];

        let outcome = engine.reconcile(payments, invoices);

        assert!(outcome.is_empty());
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.payments_scanned, 2);
        assert_eq!(outcome.invoices_scanned, 1);
        let reasons: Vec<UnattachedReason> = outcome.unattached.iter().map(|u| u.reason).collect();
        assert_eq!(
            reasons,
            vec![UnattachedReason::NoMatchFound, UnattachedReason::MissingAccount]
        );
    }

    #[test]
    fn test_already_attached_payment_is_skipped() {
        let engine = ReconciliationEngine::default();
        let mut attached = payment("pay-1", "счет 1020 от 19.02.2025", AMOUNT);
        attached.is_attached_to_invoice = true;

        let outcome = engine.reconcile(vec![attached], vec![invoice("1020", 19, AMOUNT)]);
        assert!(outcome.is_empty());
        assert_eq!(outcome.unattached[0].reason, UnattachedReason::AlreadyAttached);
    }

    #[test]
    fn test_payment_listed_on_invoice_is_not_counted_twice() {
        let engine = same_unit_engine();
        let pending = payment("pay-1", "счет 1020 от 19.02.2025", 1_000);
        let mut invoice = invoice("1020", 19, AMOUNT);
        invoice.paid = 1_000;
        invoice.payments.push(pending.reference());

        let outcome = engine.reconcile(vec![pending], vec![invoice]);

        assert_eq!(outcome.updated_payments.len(), 1);
        assert!(outcome.updated_invoices.is_empty());
    }

    #[test]
    fn test_attached_attribute_is_flagged() {
        let flag = AttributeValue {
            meta: Meta::new("attributes/is-attached"),
            name: Some("isAttachedToInvoice".to_string()),
            value: false,
        };
        let engine = ReconciliationEngine::new(&ReconcileConfig::default().with_attached_attribute(flag));
        let mut stale = payment("pay-1", "счет 1020 от 19.02.2025", AMOUNT);
        stale.attributes.push(AttributeValue {
            meta: Meta::new("attributes/is-attached"),
            name: None,
            value: false,
        });

        let outcome = engine.reconcile(vec![stale], vec![invoice("1020", 19, AMOUNT)]);

        let attributes = &outcome.updated_payments[0].attributes;
        assert_eq!(attributes.len(), 1);
        assert!(attributes[0].value);
        assert_eq!(attributes[0].name.as_deref(), Some("isAttachedToInvoice"));
    }

    #[test]
    fn test_duplicate_number_and_date_links_first_listed() {
        let engine = ReconciliationEngine::default();
        // Same number and date, distinct records
        let twin = |id: &str| {
            Invoice::new(
                id.to_string(),
                "1020".to_string(),
                NaiveDate::from_ymd_opt(2025, 2, 19).unwrap(),
                AMOUNT,
            )
            .with_entity(EntityKind::Agent, EntityRef::new("counterparty/acme"))
            .with_entity(EntityKind::OrganizationAccount, EntityRef::new("account/main"))
            .with_entity(EntityKind::Organization, EntityRef::new("organization/we"))
        };
        let invoices = vec![twin("inv-A"), twin("inv-B")];
        let payments = vec![payment("pay-1", "Оплата по сч/ф 1020 от 19.02.2025", AMOUNT)];

        let outcome = engine.reconcile(payments, invoices);

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.invoice_for("pay-1"), Some("inv-A"));
        let ids: Vec<&str> = outcome.updated_invoices.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["inv-A"]);
        assert_eq!(
            outcome.updated_payments[0].linked_invoice().map(EntityRef::key),
            Some("invoiceout/inv-A")
        );
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let engine = ReconciliationEngine::default();
        let invoices = vec![invoice("1021", 19, AMOUNT), invoice("1020", 19, AMOUNT)];
        let payments = vec![
            payment("pay-1", "Оплата по сч/ф 1020 от 19.02.2025", AMOUNT),
            payment("pay-2", "Возврат средств", AMOUNT),
        ];

        let first = engine.reconcile(payments.clone(), invoices.clone());
        let second = engine.reconcile(payments, invoices);
        assert_eq!(first, second);
        assert_eq!(first.invoice_for("pay-1"), Some("inv-1020"));
    }
}

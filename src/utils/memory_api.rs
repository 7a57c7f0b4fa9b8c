//! In-memory accounting API for testing

use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::OutstandingRule;
use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct Records {
    payments: Vec<Payment>,
    invoices: Vec<Invoice>,
    submissions: Vec<SubmissionKind>,
    fail_submissions: bool,
}

/// Which update endpoint a submission went to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Payments,
    Invoices,
}

/// In-memory accounting API for testing and development
///
/// Records keep insertion order. Clones share the same records, so a test
/// can keep a handle while a service owns another.
#[derive(Debug, Clone)]
pub struct MemoryApi {
    records: Arc<RwLock<Records>>,
    outstanding: OutstandingRule,
}

impl MemoryApi {
    /// Create an empty API judging invoices with the default outstanding rule
    pub fn new() -> Self {
        Self::with_outstanding_rule(OutstandingRule::default())
    }

    pub fn with_outstanding_rule(outstanding: OutstandingRule) -> Self {
        Self {
            records: Arc::new(RwLock::new(Records::default())),
            outstanding,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Records> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Records> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a payment, replacing any with the same id
    pub fn insert_payment(&self, payment: Payment) {
        let mut records = self.write();
        match records.payments.iter_mut().find(|p| p.id == payment.id) {
            Some(existing) => *existing = payment,
            None => records.payments.push(payment),
        }
    }

    /// Store an invoice, replacing any with the same id
    pub fn insert_invoice(&self, invoice: Invoice) {
        let mut records = self.write();
        match records.invoices.iter_mut().find(|i| i.id == invoice.id) {
            Some(existing) => *existing = invoice,
            None => records.invoices.push(invoice),
        }
    }

    pub fn payment(&self, id: &str) -> Option<Payment> {
        self.read().payments.iter().find(|p| p.id == id).cloned()
    }

    pub fn invoice(&self, id: &str) -> Option<Invoice> {
        self.read().invoices.iter().find(|i| i.id == id).cloned()
    }

    /// Update endpoints called so far, in call order
    pub fn submissions(&self) -> Vec<SubmissionKind> {
        self.read().submissions.clone()
    }

    /// Make every following submission fail
    pub fn fail_submissions(&self, fail: bool) {
        self.write().fail_submissions = fail;
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        *self.write() = Records::default();
    }
}

impl Default for MemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

fn payment_id(payment: &Payment) -> &str {
    &payment.id
}

fn invoice_id(invoice: &Invoice) -> &str {
    &invoice.id
}

fn replace_all<T: Clone>(
    stored: &mut [T],
    updates: &[T],
    id_of: fn(&T) -> &str,
    entity: &'static str,
) -> ReconcileResult<()> {
    // Validate first so a bad batch changes nothing
    let positions = updates
        .iter()
        .map(|update| {
            stored
                .iter()
                .position(|record| id_of(record) == id_of(update))
                .ok_or_else(|| ReconcileError::NotFound {
                    entity,
                    id: id_of(update).to_string(),
                })
        })
        .collect::<ReconcileResult<Vec<usize>>>()?;

    for (position, update) in positions.into_iter().zip(updates) {
        stored[position] = update.clone();
    }
    Ok(())
}

#[async_trait]
impl AccountingApi for MemoryApi {
    async fn list_outstanding_invoices(&self) -> ReconcileResult<Vec<Invoice>> {
        Ok(self
            .read()
            .invoices
            .iter()
            .filter(|invoice| self.outstanding.is_outstanding(invoice))
            .cloned()
            .collect())
    }

    async fn list_unattached_payments(&self) -> ReconcileResult<Vec<Payment>> {
        Ok(self
            .read()
            .payments
            .iter()
            .filter(|payment| !payment.is_attached_to_invoice)
            .cloned()
            .collect())
    }

    async fn submit_payment_updates(&mut self, payments: &[Payment]) -> ReconcileResult<()> {
        let mut records = self.write();
        if records.fail_submissions {
            return Err(ReconcileError::Api("payment update rejected".to_string()));
        }
        replace_all(&mut records.payments, payments, payment_id, "Payment")?;
        records.submissions.push(SubmissionKind::Payments);
        Ok(())
    }

    async fn submit_invoice_updates(&mut self, invoices: &[Invoice]) -> ReconcileResult<()> {
        let mut records = self.write();
        if records.fail_submissions {
            return Err(ReconcileError::Api("invoice update rejected".to_string()));
        }
        replace_all(&mut records.invoices, invoices, invoice_id, "Invoice")?;
        records.submissions.push(SubmissionKind::Invoices);
        Ok(())
    }
}

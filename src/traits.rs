//! Traits for the accounting API seam and pluggable purpose matching

use async_trait::async_trait;

use crate::types::*;

/// Client for the accounting platform holding payments and invoices
///
/// The reconciliation core never talks to the network itself; any backend
/// (HTTP API, database, in-memory) can drive it by implementing these methods.
#[async_trait]
pub trait AccountingApi: Send + Sync {
    /// List invoices that are not yet fully paid
    async fn list_outstanding_invoices(&self) -> ReconcileResult<Vec<Invoice>>;

    /// List payments not yet attached to any invoice
    async fn list_unattached_payments(&self) -> ReconcileResult<Vec<Payment>>;

    /// Persist changed payments
    async fn submit_payment_updates(&mut self, payments: &[Payment]) -> ReconcileResult<()>;

    /// Persist changed invoices
    async fn submit_invoice_updates(&mut self, invoices: &[Invoice]) -> ReconcileResult<()>;
}

/// Decides from the purpose text whether a payment settles an invoice
///
/// Counterparty identity is checked before a matcher is consulted, so
/// implementations only look at purpose, number, date and amount.
pub trait PurposeMatcher: Send + Sync {
    /// Evidence for the match, or the reason the invoice was rejected
    ///
    /// `ParseMiss` must depend on the payment alone: callers stop scanning
    /// further invoices once it is returned.
    fn match_purpose(
        &self,
        invoice: &Invoice,
        payment: &Payment,
    ) -> Result<MatchEvidence, CandidateRejection>;
}

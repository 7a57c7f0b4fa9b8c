//! Sync run: fetch, reconcile, persist

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::ReconcileConfig;
use crate::reconciliation::{ReconciliationEngine, ReconciliationOutcome};
use crate::traits::AccountingApi;
use crate::types::*;

/// Summary of a completed sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub payments_scanned: usize,
    pub invoices_scanned: usize,
    pub matched: usize,
    pub unattached: usize,
    pub payments_submitted: usize,
    pub invoices_submitted: usize,
}

/// Drives reconciliation against an accounting API backend
pub struct SyncService<A: AccountingApi> {
    api: A,
    engine: ReconciliationEngine,
}

impl<A: AccountingApi> SyncService<A> {
    /// Create a sync service with the default configuration
    pub fn new(api: A) -> Self {
        Self {
            api,
            engine: ReconciliationEngine::default(),
        }
    }

    /// Create a sync service with a custom configuration
    pub fn with_config(api: A, config: &ReconcileConfig) -> ReconcileResult<Self> {
        config.validate()?;
        Ok(Self {
            api,
            engine: ReconciliationEngine::new(config),
        })
    }

    /// The backend this service talks to
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetch open records and decide every attachment without persisting anything
    pub async fn plan(&self) -> ReconcileResult<ReconciliationOutcome> {
        let rule = self.engine.outstanding_rule();
        let invoices: Vec<Invoice> = self
            .api
            .list_outstanding_invoices()
            .await?
            .into_iter()
            .filter(|invoice| rule.is_outstanding(invoice))
            .collect();
        let payments = self.api.list_unattached_payments().await?;

        Ok(self.engine.reconcile(payments, invoices))
    }

    /// Persist the batches of a planned outcome
    ///
    /// Empty batches are not submitted. Payments go first; when a submission
    /// fails the outcome is left intact so the caller can retry.
    pub async fn apply(&mut self, outcome: &ReconciliationOutcome) -> ReconcileResult<()> {
        if !outcome.updated_payments.is_empty() {
            self.api
                .submit_payment_updates(&outcome.updated_payments)
                .await
                .inspect_err(|e| warn!("payment update failed: {e}"))?;
            info!("submitted {} payment updates", outcome.updated_payments.len());
        }

        if !outcome.updated_invoices.is_empty() {
            self.api
                .submit_invoice_updates(&outcome.updated_invoices)
                .await
                .inspect_err(|e| warn!("invoice update failed: {e}"))?;
            info!("submitted {} invoice updates", outcome.updated_invoices.len());
        }

        Ok(())
    }

    /// Plan and apply in one go
    pub async fn run(&mut self) -> ReconcileResult<SyncReport> {
        let outcome = self.plan().await?;
        self.apply(&outcome).await?;

        let report = SyncReport {
            payments_scanned: outcome.payments_scanned,
            invoices_scanned: outcome.invoices_scanned,
            matched: outcome.matches.len(),
            unattached: outcome.unattached.len(),
            payments_submitted: outcome.updated_payments.len(),
            invoices_submitted: outcome.updated_invoices.len(),
        };
        info!(
            "sync finished: {} of {} payments attached",
            report.matched, report.payments_scanned
        );
        Ok(report)
    }
}

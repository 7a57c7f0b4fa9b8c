//! Picks the invoice a payment settles

use log::{debug, trace};

use crate::matching::entity::entities_match;
use crate::traits::PurposeMatcher;
use crate::types::*;

/// Invoice chosen for a payment, with its position among the candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub evidence: MatchEvidence,
}

/// Scans candidate invoices for the one a payment settles
pub struct InvoiceSelector {
    matcher: Box<dyn PurposeMatcher>,
    entity_keys: Vec<EntityKind>,
}

impl InvoiceSelector {
    /// Create a selector comparing every counterparty role
    pub fn new(matcher: Box<dyn PurposeMatcher>) -> Self {
        Self::with_entity_keys(matcher, EntityKind::ALL.to_vec())
    }

    /// Create a selector comparing only the given roles
    pub fn with_entity_keys(matcher: Box<dyn PurposeMatcher>, entity_keys: Vec<EntityKind>) -> Self {
        Self {
            matcher,
            entity_keys,
        }
    }

    /// Check whether a single invoice qualifies for the payment
    ///
    /// Identity is compared first; the purpose is only parsed for invoices
    /// of the same counterparties.
    pub fn evaluate(
        &self,
        payment: &Payment,
        invoice: &Invoice,
    ) -> Result<MatchEvidence, CandidateRejection> {
        entities_match(invoice, payment, &self.entity_keys)?;
        self.matcher.match_purpose(invoice, payment)
    }

    /// Find the first candidate the payment settles
    ///
    /// Candidates are `(index, invoice)` pairs scanned in the given order; the
    /// index is handed back so callers can locate the invoice in their own
    /// collection. A payment without a bank account or purpose is unattachable.
    pub fn select<'a, I>(&self, payment: &Payment, candidates: I) -> Result<Selection, UnattachedReason>
    where
        I: IntoIterator<Item = (usize, &'a Invoice)>,
    {
        let has_account = payment
            .organization_account
            .as_ref()
            .is_some_and(|account| !account.is_empty());
        if !has_account {
            return Err(UnattachedReason::MissingAccount);
        }
        if payment.purpose_text().is_none() {
            return Err(UnattachedReason::MissingPurpose);
        }

        for (index, invoice) in candidates {
            match self.evaluate(payment, invoice) {
                Ok(evidence) => return Ok(Selection { index, evidence }),
                Err(CandidateRejection::ParseMiss) => {
                    // Nothing later in the list can match either
                    debug!("payment {}: {}", payment.id, CandidateRejection::ParseMiss);
                    return Err(UnattachedReason::NoMatchFound);
                }
                Err(rejection) => {
                    trace!("payment {} vs invoice {}: {}", payment.id, invoice.id, rejection);
                }
            }
        }

        Err(UnattachedReason::NoMatchFound)
    }

    /// Convenience form of [`select`](Self::select) over a slice
    pub fn select_invoice<'a>(&self, payment: &Payment, invoices: &'a [Invoice]) -> Option<&'a Invoice> {
        self.select(payment, invoices.iter().enumerate())
            .ok()
            .map(|selection| &invoices[selection.index])
    }
}

//! Purpose matching strategies

use crate::matching::purpose::{digit_tokens, extract_number_and_date};
use crate::traits::PurposeMatcher;
use crate::types::*;

/// Match on the invoice number and issue date cited in the purpose
///
/// Amount is never consulted: several invoices can share a date and an
/// amount, and a payment may settle only part of an invoice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberAndDateMatcher;

impl PurposeMatcher for NumberAndDateMatcher {
    fn match_purpose(
        &self,
        invoice: &Invoice,
        payment: &Payment,
    ) -> Result<MatchEvidence, CandidateRejection> {
        let purpose = payment
            .purpose_text()
            .ok_or(CandidateRejection::ParseMiss)?;
        let reference = extract_number_and_date(purpose).ok_or(CandidateRejection::ParseMiss)?;

        if reference.number != invoice.name || reference.date != invoice.issue_date() {
            return Err(CandidateRejection::ReferenceMismatch);
        }

        Ok(MatchEvidence::NumberAndDate {
            number: reference.number,
            date: reference.date,
        })
    }
}

/// Number token anywhere in the purpose, else same amount and issue date
///
/// Kept for integrations that still depend on it. When several invoices
/// share a date and an amount it attaches every such payment to the first
/// of them; prefer [`NumberAndDateMatcher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyMatcher;

impl LegacyMatcher {
    fn number_in_purpose(invoice_number: &str, purpose: &str) -> bool {
        let invoice_number = invoice_number.trim();
        let numeric = invoice_number.parse::<u64>().ok();

        digit_tokens(purpose).any(|token| match numeric {
            Some(number) => token.parse::<u64>().ok() == Some(number),
            None => token == invoice_number,
        })
    }
}

impl PurposeMatcher for LegacyMatcher {
    fn match_purpose(
        &self,
        invoice: &Invoice,
        payment: &Payment,
    ) -> Result<MatchEvidence, CandidateRejection> {
        let purpose = payment
            .purpose_text()
            .ok_or(CandidateRejection::ParseMiss)?;

        if Self::number_in_purpose(&invoice.name, purpose) {
            return Ok(MatchEvidence::NumberToken {
                number: invoice.name.clone(),
            });
        }

        if invoice.total == payment.amount && purpose.contains(&invoice.normalized_date()) {
            return Ok(MatchEvidence::AmountAndDate {
                amount: payment.amount,
                date: invoice.issue_date(),
            });
        }

        Err(CandidateRejection::ReferenceMismatch)
    }
}

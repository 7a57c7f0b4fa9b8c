//! Counterparty identity checks between a payment and an invoice

use crate::types::*;

/// Compare two optional references by identity key
///
/// Missing references and references with an empty key never match,
/// not even each other.
pub fn same_entity(
    kind: EntityKind,
    left: Option<&EntityRef>,
    right: Option<&EntityRef>,
) -> Result<(), CandidateRejection> {
    match (left, right) {
        (Some(left), Some(right)) if !left.is_empty() && !right.is_empty() => {
            if left.key() == right.key() {
                Ok(())
            } else {
                Err(CandidateRejection::EntityMismatch(kind))
            }
        }
        _ => Err(CandidateRejection::MalformedEntityReference(kind)),
    }
}

/// Check that `invoice` and `payment` name the same counterparties for every role in `keys`
///
/// An invoice without a bank account is rejected before any role is compared.
pub fn entities_match(
    invoice: &Invoice,
    payment: &Payment,
    keys: &[EntityKind],
) -> Result<(), CandidateRejection> {
    let has_account = invoice
        .organization_account
        .as_ref()
        .is_some_and(|account| !account.is_empty());
    if !has_account {
        return Err(CandidateRejection::MissingInvoiceAccount);
    }

    for &kind in keys {
        same_entity(kind, invoice.entity(kind), payment.entity(kind))?;
    }

    Ok(())
}

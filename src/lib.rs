//! # Payment Reconciler
//!
//! Links incoming bank payments to the sales invoices they settle, and
//! updates both records to reflect the settlement.
//!
//! ## Features
//!
//! - **Purpose parsing**: Extract the invoice number and date a payer cited in free text
//! - **Counterparty gate**: Agent, bank account and organization must agree before any text is read
//! - **Deterministic selection**: First qualifying invoice in list order, never two invoices per payment
//! - **Partial settlement**: Paid amounts accumulate across payments and runs
//! - **Pluggable strategies**: Corrected number-and-date matching, or the legacy amount-and-date rule
//! - **API abstraction**: Backend-agnostic design with a trait-based accounting client
//!
//! ## Quick Start
//!
//! ```rust
//! use payment_reconciler::{EntityKind, EntityRef, Invoice, Payment, ReconciliationEngine};
//! use chrono::NaiveDate;
//!
//! let account = EntityRef::new("organizationaccount/main");
//! let customer = EntityRef::new("counterparty/acme");
//! let us = EntityRef::new("organization/we");
//!
//! let invoice = Invoice::new(
//!     "inv-1".to_string(),
//!     "1020".to_string(),
//!     NaiveDate::from_ymd_opt(2025, 2, 19).unwrap(),
//!     4_048_750,
//! )
//! .with_entity(EntityKind::Agent, customer.clone())
//! .with_entity(EntityKind::OrganizationAccount, account.clone())
//! .with_entity(EntityKind::Organization, us.clone());
//!
//! let payment = Payment::new(
//!     "pay-1".to_string(),
//!     4_048_750,
//!     Some("Оплата по сч/ф 1020 от 19.02.2025".to_string()),
//! )
//! .with_entity(EntityKind::Agent, customer)
//! .with_entity(EntityKind::OrganizationAccount, account)
//! .with_entity(EntityKind::Organization, us);
//!
//! let outcome = ReconciliationEngine::default().reconcile(vec![payment], vec![invoice]);
//! assert_eq!(outcome.invoice_for("pay-1"), Some("inv-1"));
//! ```

pub mod config;
pub mod matching;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use matching::*;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;

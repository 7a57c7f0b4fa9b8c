//! Core types and data structures for payment reconciliation

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata block carried by every platform entity and entity reference
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Meta {
    /// Canonical URI of the entity; used as its identity key
    #[serde(default)]
    pub href: String,
    /// Platform entity type (`paymentin`, `invoiceout`, `counterparty`, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

impl Meta {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            entity_type: None,
        }
    }
}

/// Opaque pointer to another platform record, compared by identity key only
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(default)]
    pub meta: Meta,
}

impl EntityRef {
    /// Create a reference from an identity key
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            meta: Meta::new(href),
        }
    }

    /// The identity key of the referenced record
    pub fn key(&self) -> &str {
        self.meta.href.trim()
    }

    /// A reference without an identity key points nowhere
    pub fn is_empty(&self) -> bool {
        self.key().is_empty()
    }
}

/// Counterparty roles compared between a payment and an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    /// The customer paying the invoice
    Agent,
    /// Our bank account receiving the money
    OrganizationAccount,
    /// Our legal entity issuing the invoice
    Organization,
}

impl EntityKind {
    /// Every role, in the order they are compared
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Agent,
        EntityKind::OrganizationAccount,
        EntityKind::Organization,
    ];
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Agent => "agent",
            EntityKind::OrganizationAccount => "organizationAccount",
            EntityKind::Organization => "organization",
        };
        f.write_str(name)
    }
}

/// Value of a custom boolean attribute on a payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub meta: Meta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub value: bool,
}

/// Incoming bank payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Unique identifier of the payment
    pub id: String,
    /// Platform metadata; `meta.href` is what invoices link back to
    #[serde(default)]
    pub meta: Meta,
    /// Amount in minor units
    #[serde(rename = "sum")]
    pub amount: i64,
    /// Free-text purpose written by the payer
    #[serde(rename = "paymentPurpose", default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub agent: Option<EntityRef>,
    #[serde(default)]
    pub organization_account: Option<EntityRef>,
    #[serde(default)]
    pub organization: Option<EntityRef>,
    /// Whether the payment has already been linked to an invoice
    #[serde(default)]
    pub is_attached_to_invoice: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeValue>,
    /// Invoices this payment settles
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<EntityRef>,
}

impl Payment {
    /// Create an unattached payment with no counterparties
    pub fn new(id: String, amount: i64, purpose: Option<String>) -> Self {
        Self {
            meta: Meta::new(format!("paymentin/{id}")),
            id,
            amount,
            purpose,
            agent: None,
            organization_account: None,
            organization: None,
            is_attached_to_invoice: false,
            attributes: Vec::new(),
            operations: Vec::new(),
        }
    }

    /// Builder-style setter for a counterparty reference
    pub fn with_entity(mut self, kind: EntityKind, entity: EntityRef) -> Self {
        *self.entity_slot(kind) = Some(entity);
        self
    }

    /// Get the counterparty reference for a role
    pub fn entity(&self, kind: EntityKind) -> Option<&EntityRef> {
        match kind {
            EntityKind::Agent => self.agent.as_ref(),
            EntityKind::OrganizationAccount => self.organization_account.as_ref(),
            EntityKind::Organization => self.organization.as_ref(),
        }
    }

    fn entity_slot(&mut self, kind: EntityKind) -> &mut Option<EntityRef> {
        match kind {
            EntityKind::Agent => &mut self.agent,
            EntityKind::OrganizationAccount => &mut self.organization_account,
            EntityKind::Organization => &mut self.organization,
        }
    }

    /// Purpose text, if it carries anything besides whitespace
    pub fn purpose_text(&self) -> Option<&str> {
        self.purpose
            .as_deref()
            .map(str::trim)
            .filter(|purpose| !purpose.is_empty())
    }

    /// Reference other records use to point at this payment
    pub fn reference(&self) -> EntityRef {
        EntityRef {
            meta: self.meta.clone(),
        }
    }

    /// The invoice this payment was linked to, if any
    pub fn linked_invoice(&self) -> Option<&EntityRef> {
        self.operations.first()
    }

    /// Mark the payment as settling `invoice`
    pub fn attach_to(&mut self, invoice: EntityRef, flag_attribute: Option<&AttributeValue>) {
        self.is_attached_to_invoice = true;
        self.operations = vec![invoice];

        if let Some(attribute) = flag_attribute {
            self.attributes
                .retain(|existing| existing.meta.href != attribute.meta.href);
            self.attributes.push(AttributeValue {
                value: true,
                ..attribute.clone()
            });
        }
    }
}

/// Sales invoice issued to a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Unique identifier of the invoice
    pub id: String,
    #[serde(default)]
    pub meta: Meta,
    /// Display number; only purely numeric numbers can be cited by a purpose
    pub name: String,
    /// Issue timestamp
    #[serde(with = "moment_format")]
    pub moment: NaiveDateTime,
    /// Invoice total in minor units
    #[serde(rename = "sum")]
    pub total: i64,
    /// Amount paid so far
    #[serde(rename = "payedSum", default)]
    pub paid: i64,
    #[serde(default)]
    pub agent: Option<EntityRef>,
    #[serde(default)]
    pub organization_account: Option<EntityRef>,
    #[serde(default)]
    pub organization: Option<EntityRef>,
    /// Payments already linked to this invoice, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payments: Vec<EntityRef>,
}

impl Invoice {
    /// Create an unpaid invoice issued at midnight of `date`
    pub fn new(id: String, name: String, date: NaiveDate, total: i64) -> Self {
        Self {
            meta: Meta::new(format!("invoiceout/{id}")),
            id,
            name,
            moment: date.and_time(chrono::NaiveTime::MIN),
            total,
            paid: 0,
            agent: None,
            organization_account: None,
            organization: None,
            payments: Vec::new(),
        }
    }

    /// Builder-style setter for a counterparty reference
    pub fn with_entity(mut self, kind: EntityKind, entity: EntityRef) -> Self {
        match kind {
            EntityKind::Agent => self.agent = Some(entity),
            EntityKind::OrganizationAccount => self.organization_account = Some(entity),
            EntityKind::Organization => self.organization = Some(entity),
        }
        self
    }

    /// Get the counterparty reference for a role
    pub fn entity(&self, kind: EntityKind) -> Option<&EntityRef> {
        match kind {
            EntityKind::Agent => self.agent.as_ref(),
            EntityKind::OrganizationAccount => self.organization_account.as_ref(),
            EntityKind::Organization => self.organization.as_ref(),
        }
    }

    /// Issue date without the time of day
    pub fn issue_date(&self) -> NaiveDate {
        self.moment.date()
    }

    /// Issue date as payers write it: `DD.MM.YYYY`
    pub fn normalized_date(&self) -> String {
        self.issue_date().format(NORMALIZED_DATE_FORMAT).to_string()
    }

    /// Reference other records use to point at this invoice
    pub fn reference(&self) -> EntityRef {
        EntityRef {
            meta: self.meta.clone(),
        }
    }

    /// Whether `payment` is already among the linked payments
    pub fn has_payment(&self, payment: &EntityRef) -> bool {
        !payment.is_empty() && self.payments.iter().any(|linked| linked.key() == payment.key())
    }

    /// Link a payment and add its amount to the paid total
    ///
    /// Returns `false` without touching the invoice when the payment is already linked.
    pub fn apply_payment(&mut self, payment: &Payment) -> bool {
        let reference = payment.reference();
        if self.has_payment(&reference) {
            return false;
        }
        self.paid = self.paid.saturating_add(payment.amount);
        self.payments.push(reference);
        true
    }
}

/// Date format used for every date compared during matching
pub const NORMALIZED_DATE_FORMAT: &str = "%d.%m.%Y";

/// Serde adapter for the platform's `moment` timestamps
pub mod moment_format {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
    const READ_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

    pub fn serialize<S: Serializer>(moment: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&moment.format(WRITE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(raw.trim()).ok_or_else(|| de::Error::custom(format!("invalid moment: {raw}")))
    }

    /// Parse a timestamp, accepting a bare date as midnight
    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        READ_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .map(|date| date.and_time(NaiveTime::MIN))
            })
    }
}

/// Invoice number and date cited in a payment purpose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposeReference {
    /// Digits exactly as written after the invoice prefix
    pub number: String,
    pub date: NaiveDate,
}

impl PurposeReference {
    /// Cited date as `DD.MM.YYYY`
    pub fn normalized_date(&self) -> String {
        self.date.format(NORMALIZED_DATE_FORMAT).to_string()
    }
}

/// What convinced a matcher that a payment settles an invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchEvidence {
    /// Purpose cites the invoice number and issue date
    NumberAndDate { number: String, date: NaiveDate },
    /// Invoice number appears among the digit runs of the purpose
    NumberToken { number: String },
    /// Same amount and the issue date appears in the purpose
    AmountAndDate { amount: i64, date: NaiveDate },
}

/// Why a single candidate invoice was passed over for a payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateRejection {
    /// Invoice has no bank account and can never be settled by a bank payment
    MissingInvoiceAccount,
    /// Both sides reference different records
    EntityMismatch(EntityKind),
    /// One or both sides carry an empty identity key
    MalformedEntityReference(EntityKind),
    /// Purpose text contains no recognizable invoice reference
    ParseMiss,
    /// Purpose cites a different invoice
    ReferenceMismatch,
}

impl fmt::Display for CandidateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateRejection::MissingInvoiceAccount => write!(f, "invoice has no bank account"),
            CandidateRejection::EntityMismatch(kind) => write!(f, "{kind} differs"),
            CandidateRejection::MalformedEntityReference(kind) => {
                write!(f, "{kind} reference has no identity key")
            }
            CandidateRejection::ParseMiss => write!(f, "no invoice reference in purpose"),
            CandidateRejection::ReferenceMismatch => write!(f, "purpose cites another invoice"),
        }
    }
}

/// Why a payment was left without an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnattachedReason {
    /// Payment has no bank account reference
    MissingAccount,
    /// Payment has no purpose text
    MissingPurpose,
    /// Payment was attached in an earlier run
    AlreadyAttached,
    /// Every candidate invoice was rejected
    NoMatchFound,
}

impl fmt::Display for UnattachedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnattachedReason::MissingAccount => "payment has no bank account",
            UnattachedReason::MissingPurpose => "payment has no purpose",
            UnattachedReason::AlreadyAttached => "payment is already attached",
            UnattachedReason::NoMatchFound => "no invoice matched",
        };
        f.write_str(text)
    }
}

/// A payment linked to the invoice it settles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub payment_id: String,
    pub invoice_id: String,
    pub evidence: MatchEvidence,
}

/// A payment the run could not link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnattachedPayment {
    pub payment_id: String,
    pub reason: UnattachedReason,
}

/// Errors that can occur around a reconciliation run
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Accounting API error: {0}")]
    Api(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

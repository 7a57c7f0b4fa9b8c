//! Run configuration

use serde::{Deserialize, Serialize};

use crate::matching::{LegacyMatcher, NumberAndDateMatcher};
use crate::traits::PurposeMatcher;
use crate::types::*;

/// Scale applied to the paid amount by the host integration's outstanding check
///
/// The integration compares `total > paid * 100` even though both fields are
/// in minor units. Set `paid_scale` to 1 once stored amounts are confirmed to
/// share a unit.
pub const LEGACY_PAID_SCALE: i64 = 100;

/// Which purpose matcher a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Invoice number and issue date cited in the purpose
    #[default]
    NumberAndDate,
    /// Number token, else amount and date; misattaches same-day same-amount invoices
    Legacy,
}

impl MatchStrategy {
    /// Build the matcher implementing this strategy
    pub fn matcher(self) -> Box<dyn PurposeMatcher> {
        match self {
            MatchStrategy::NumberAndDate => Box::new(NumberAndDateMatcher),
            MatchStrategy::Legacy => Box::new(LegacyMatcher),
        }
    }
}

/// Decides whether an invoice still awaits payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingRule {
    pub paid_scale: i64,
}

impl OutstandingRule {
    /// Compare total and paid amount in the same unit
    pub fn same_unit() -> Self {
        Self { paid_scale: 1 }
    }

    pub fn is_outstanding(&self, invoice: &Invoice) -> bool {
        invoice.total > invoice.paid.saturating_mul(self.paid_scale)
    }
}

impl Default for OutstandingRule {
    fn default() -> Self {
        Self {
            paid_scale: LEGACY_PAID_SCALE,
        }
    }
}

/// Settings for one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub strategy: MatchStrategy,

    /// Counterparty roles that must agree between payment and invoice
    #[serde(default = "default_entity_keys")]
    pub entity_keys: Vec<EntityKind>,

    #[serde(default)]
    pub outstanding: OutstandingRule,

    /// Custom payment attribute flagged `true` on attachment, if the account uses one
    #[serde(default)]
    pub attached_attribute: Option<AttributeValue>,
}

fn default_entity_keys() -> Vec<EntityKind> {
    EntityKind::ALL.to_vec()
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::default(),
            entity_keys: default_entity_keys(),
            outstanding: OutstandingRule::default(),
            attached_attribute: None,
        }
    }
}

impl ReconcileConfig {
    pub fn with_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_outstanding(mut self, outstanding: OutstandingRule) -> Self {
        self.outstanding = outstanding;
        self
    }

    pub fn with_attached_attribute(mut self, attribute: AttributeValue) -> Self {
        self.attached_attribute = Some(attribute);
        self
    }

    /// Reject settings a run cannot work with
    pub fn validate(&self) -> ReconcileResult<()> {
        if self.outstanding.paid_scale <= 0 {
            return Err(ReconcileError::InvalidConfig(format!(
                "paid_scale must be positive, got {}",
                self.outstanding.paid_scale
            )));
        }

        if self.entity_keys.is_empty() {
            return Err(ReconcileError::InvalidConfig(
                "at least one entity key must be compared".to_string(),
            ));
        }

        if let Some(attribute) = &self.attached_attribute {
            if attribute.meta.href.trim().is_empty() {
                return Err(ReconcileError::InvalidConfig(
                    "attached_attribute needs a meta.href".to_string(),
                ));
            }
        }

        Ok(())
    }
}

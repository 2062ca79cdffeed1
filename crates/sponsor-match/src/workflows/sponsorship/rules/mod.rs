//! Weighted matching rules and the store that persists them.

mod defaults;
mod fields;
mod store;

pub use defaults::default_rules;
pub use fields::{CriterionValue, FieldValue, MatchField, SponsorField, StudentField};
pub use store::{RuleStore, RuleStoreError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::RuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Academic,
    Financial,
    Demographic,
    Preference,
    Custom,
}

/// Rule priority; the derived ordering runs from `Low` to `Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePriority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    In,
    NotIn,
    Between,
}

/// Single field/operator/value comparison inside a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCriterion {
    pub field: MatchField,
    pub operator: Operator,
    pub value: CriterionValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<CriterionValue>,
    pub weight: f64,
}

/// Named, weighted group of criteria scored as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingRule {
    pub id: RuleId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: RuleCategory,
    pub priority: RulePriority,
    pub criteria: Vec<RuleCriterion>,
    pub weight: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-supplied rule body; timestamps are owned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: RuleCategory,
    pub priority: RulePriority,
    pub criteria: Vec<RuleCriterion>,
    pub weight: f64,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

impl MatchingRule {
    pub fn from_draft(id: RuleId, draft: RuleDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            category: draft.category,
            priority: draft.priority,
            criteria: draft.criteria,
            weight: draft.weight,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), RuleValidationError> {
        if self.name.trim().is_empty() {
            return Err(RuleValidationError::MissingName);
        }
        if !weight_in_range(self.weight) {
            return Err(RuleValidationError::RuleWeightOutOfRange(self.weight));
        }
        for (index, criterion) in self.criteria.iter().enumerate() {
            if !weight_in_range(criterion.weight) {
                return Err(RuleValidationError::CriterionWeightOutOfRange {
                    index,
                    weight: criterion.weight,
                });
            }
            if criterion.operator == Operator::Between && criterion.value2.is_none() {
                return Err(RuleValidationError::MissingUpperBound { index });
            }
        }
        Ok(())
    }
}

fn weight_in_range(weight: f64) -> bool {
    weight.is_finite() && (0.0..=100.0).contains(&weight)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleValidationError {
    #[error("rule name must not be blank")]
    MissingName,
    #[error("rule weight {0} must be between 0 and 100")]
    RuleWeightOutOfRange(f64),
    #[error("criterion {index} weight {weight} must be between 0 and 100")]
    CriterionWeightOutOfRange { index: usize, weight: f64 },
    #[error("criterion {index} uses `between` without an upper bound")]
    MissingUpperBound { index: usize },
}

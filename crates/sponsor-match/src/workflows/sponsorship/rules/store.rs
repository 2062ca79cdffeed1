use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use super::super::domain::RuleId;
use super::super::repository::{RepositoryError, ResultRepository, RuleRepository};
use super::super::scoring::MatchingResult;
use super::{default_rules, MatchingRule, RuleValidationError};

/// Persistence-backed access to matching rules and the results they produce.
pub struct RuleStore<R> {
    repository: Arc<R>,
}

impl<R> RuleStore<R>
where
    R: RuleRepository + ResultRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Seed the default rule set into an empty store and return the loaded rules.
    ///
    /// A second call is a no-op once rules exist. Store failures are logged and yield an
    /// empty rule set so callers can keep serving.
    pub fn initialize_rules(&self, now: DateTime<Utc>) -> Vec<MatchingRule> {
        match self.seed_if_empty(now) {
            Ok(rules) => rules,
            Err(err) => {
                error!(error = %err, "matching rule initialization failed; continuing without rules");
                Vec::new()
            }
        }
    }

    fn seed_if_empty(&self, now: DateTime<Utc>) -> Result<Vec<MatchingRule>, RepositoryError> {
        let existing = self.repository.list_rules()?;
        if !existing.is_empty() {
            debug!(count = existing.len(), "matching rules already present");
            return Ok(ordered(existing));
        }

        let defaults = default_rules(now);
        for rule in &defaults {
            self.repository.upsert_rule(rule.clone())?;
        }
        info!(count = defaults.len(), "seeded default matching rules");
        Ok(ordered(defaults))
    }

    /// All rules, highest priority first, creation order within a priority.
    pub fn get_matching_rules(&self) -> Result<Vec<MatchingRule>, RepositoryError> {
        Ok(ordered(self.repository.list_rules()?))
    }

    pub fn active_rules(&self) -> Result<Vec<MatchingRule>, RepositoryError> {
        let mut rules = self.get_matching_rules()?;
        rules.retain(|rule| rule.is_active);
        Ok(rules)
    }

    /// Upsert by id. An existing rule keeps its creation timestamp.
    pub fn save_matching_rule(
        &self,
        mut rule: MatchingRule,
        now: DateTime<Utc>,
    ) -> Result<MatchingRule, RuleStoreError> {
        rule.validate()?;

        let existing = self
            .repository
            .list_rules()?
            .into_iter()
            .find(|candidate| candidate.id == rule.id);
        rule.created_at = existing.map(|previous| previous.created_at).unwrap_or(now);
        rule.updated_at = now;

        let saved = self.repository.upsert_rule(rule)?;
        info!(rule_id = %saved.id, active = saved.is_active, "matching rule saved");
        Ok(saved)
    }

    pub fn delete_matching_rule(&self, id: &RuleId) -> Result<(), RepositoryError> {
        self.repository.delete_rule(id)?;
        info!(rule_id = %id, "matching rule deleted");
        Ok(())
    }

    pub fn save_results(&self, results: &[MatchingResult]) -> Result<(), RepositoryError> {
        if results.is_empty() {
            return Ok(());
        }
        self.repository.save_results(results)
    }
}

fn ordered(mut rules: Vec<MatchingRule>) -> Vec<MatchingRule> {
    rules.sort_by_key(|rule| (Reverse(rule.priority), rule.created_at));
    rules
}

#[derive(Debug, thiserror::Error)]
pub enum RuleStoreError {
    #[error(transparent)]
    Validation(#[from] RuleValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

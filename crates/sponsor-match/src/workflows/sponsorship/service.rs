use std::sync::Arc;

use tracing::info;

use super::allocation::{
    AllocationError, AllocationResolver, AllocationView, ConflictReport, SponsorAllocation,
};
use super::bulk::{BulkMatchingError, BulkMatchingJob, BulkMatchingOrchestrator};
use super::clock::{Clock, SystemClock};
use super::config::MatchingConfig;
use super::domain::{AllocationId, JobId, RuleId, SponsorId, StudentId};
use super::finder::{MatchError, MatchFinder, MatchQuery};
use super::repository::{MatchingStore, NotificationPublisher, RepositoryError};
use super::rules::{MatchingRule, RuleDraft, RuleStore, RuleStoreError, RuleValidationError};
use super::scoring::{MatchingResult, ScoringEngine};

/// Service composing the rule store, finder, allocation resolver, and bulk orchestrator.
pub struct SponsorshipMatchingService<S, N> {
    store: Arc<S>,
    rules: RuleStore<S>,
    finder: MatchFinder<S>,
    engine: ScoringEngine,
    allocations: AllocationResolver<S, N>,
    config: MatchingConfig,
    clock: Arc<dyn Clock>,
}

impl<S, N> SponsorshipMatchingService<S, N>
where
    S: MatchingStore + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: MatchingConfig) -> Self {
        Self::with_clock(store, notifier, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<S>,
        notifier: Arc<N>,
        config: MatchingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = ScoringEngine::new();
        Self {
            rules: RuleStore::new(store.clone()),
            finder: MatchFinder::new(store.clone(), engine),
            engine,
            allocations: AllocationResolver::new(store.clone(), notifier, config.clone()),
            store,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Seed default rules when the store is empty; never fails.
    pub fn initialize_rules(&self) -> Vec<MatchingRule> {
        self.rules.initialize_rules(self.clock.now())
    }

    pub fn matching_rules(&self) -> Result<Vec<MatchingRule>, SponsorshipServiceError> {
        Ok(self.rules.get_matching_rules()?)
    }

    pub fn save_rule(
        &self,
        id: RuleId,
        draft: RuleDraft,
    ) -> Result<MatchingRule, SponsorshipServiceError> {
        let now = self.clock.now();
        let rule = MatchingRule::from_draft(id, draft, now);
        Ok(self.rules.save_matching_rule(rule, now)?)
    }

    pub fn delete_rule(&self, id: &RuleId) -> Result<(), SponsorshipServiceError> {
        Ok(self.rules.delete_matching_rule(id)?)
    }

    pub fn find_matches(
        &self,
        query: &MatchQuery,
    ) -> Result<Vec<MatchingResult>, SponsorshipServiceError> {
        let rules = self.rules.active_rules()?;
        Ok(self.finder.find_matches(query, &rules, self.clock.now())?)
    }

    /// Score one pair regardless of sponsor availability. `None` when either profile is missing.
    pub fn evaluate_pair(
        &self,
        student_id: &StudentId,
        sponsor_id: &SponsorId,
    ) -> Result<Option<MatchingResult>, SponsorshipServiceError> {
        let Some(student) = self.store.student(student_id)? else {
            return Ok(None);
        };
        let Some(sponsor) = self.store.sponsor(sponsor_id)? else {
            return Ok(None);
        };
        student
            .validate()
            .map_err(|source| MatchError::InvalidProfile {
                student_id: student_id.clone(),
                source,
            })?;

        let rules = self.rules.active_rules()?;
        Ok(Some(self.engine.evaluate_match(
            &student,
            &sponsor,
            &rules,
            self.clock.now(),
        )))
    }

    pub fn run_bulk_matching(&self) -> Result<BulkMatchingJob, SponsorshipServiceError> {
        let orchestrator = BulkMatchingOrchestrator::new(
            self.store.as_ref(),
            &self.rules,
            &self.finder,
            &self.allocations,
            &self.config,
            self.clock.as_ref(),
        );
        Ok(orchestrator.run()?)
    }

    pub fn job(&self, id: &JobId) -> Result<BulkMatchingJob, SponsorshipServiceError> {
        let job = self.store.job(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(job)
    }

    pub fn create_assignment(
        &self,
        result: &MatchingResult,
    ) -> Result<Option<SponsorAllocation>, SponsorshipServiceError> {
        Ok(self.allocations.create_assignment(result, self.clock.now())?)
    }

    /// Manual assignment: score the pair, persist the result, and allocate.
    pub fn assign_pair(
        &self,
        student_id: &StudentId,
        sponsor_id: &SponsorId,
    ) -> Result<Option<SponsorAllocation>, SponsorshipServiceError> {
        let result = self
            .evaluate_pair(student_id, sponsor_id)?
            .ok_or(RepositoryError::NotFound)?;
        self.rules.save_results(std::slice::from_ref(&result))?;
        info!(%student_id, %sponsor_id, score = result.score, "manual assignment requested");
        self.create_assignment(&result)
    }

    pub fn resolve_conflicts(&self) -> Result<ConflictReport, SponsorshipServiceError> {
        Ok(self.allocations.resolve_conflicts(self.clock.now())?)
    }

    pub fn approve_allocation(
        &self,
        id: &AllocationId,
    ) -> Result<SponsorAllocation, SponsorshipServiceError> {
        Ok(self.allocations.approve_allocation(id, self.clock.now())?)
    }

    pub fn reject_allocation(
        &self,
        id: &AllocationId,
    ) -> Result<SponsorAllocation, SponsorshipServiceError> {
        Ok(self.allocations.reject_allocation(id, self.clock.now())?)
    }

    pub fn allocations_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<AllocationView>, SponsorshipServiceError> {
        let now = self.clock.now();
        Ok(self
            .store
            .allocations_for_student(student_id)?
            .iter()
            .map(|allocation| allocation.view(now))
            .collect())
    }

    pub fn allocations_for_sponsor(
        &self,
        sponsor_id: &SponsorId,
    ) -> Result<Vec<AllocationView>, SponsorshipServiceError> {
        let now = self.clock.now();
        Ok(self
            .store
            .allocations_for_sponsor(sponsor_id)?
            .iter()
            .map(|allocation| allocation.view(now))
            .collect())
    }
}

/// Error raised by the sponsorship matching service.
#[derive(Debug, thiserror::Error)]
pub enum SponsorshipServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Rule(#[from] RuleValidationError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Bulk(#[from] BulkMatchingError),
}

impl From<RuleStoreError> for SponsorshipServiceError {
    fn from(value: RuleStoreError) -> Self {
        match value {
            RuleStoreError::Validation(err) => Self::Rule(err),
            RuleStoreError::Repository(err) => Self::Repository(err),
        }
    }
}

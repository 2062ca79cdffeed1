//! Sponsor to student matching: weighted rules, scoring, ranked search, bulk runs and
//! capacity-aware allocation.

pub mod allocation;
pub mod bulk;
pub mod clock;
pub mod config;
pub mod domain;
pub mod finder;
pub mod memory;
pub mod repository;
pub mod router;
pub mod rules;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use allocation::{
    AllocationError, AllocationResolver, AllocationStatus, AllocationView, ConflictReport,
    SponsorAllocation,
};
pub use bulk::{BulkMatchingError, BulkMatchingJob, BulkMatchingOrchestrator, JobStatus};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::MatchingConfig;
pub use domain::{
    AllocationId, Demographics, FinancialNeed, FundingRange, JobId, ProfileError, RuleId,
    SponsorId, SponsorProfile, StudentId, StudentProfile,
};
pub use finder::{MatchError, MatchFinder, MatchQuery, DEFAULT_MATCH_LIMIT};
pub use memory::InMemoryStore;
pub use repository::{
    AllocationInsert, AllocationRepository, JobRepository, MatchingStore, Notification,
    NotificationError, NotificationPublisher, ProfileRepository, RepositoryError,
    ResultRepository, RuleRepository, ALLOCATED_TEMPLATE, APPROVED_TEMPLATE,
};
pub use router::sponsorship_router;
pub use rules::{
    default_rules, CriterionValue, MatchField, MatchingRule, Operator, RuleCategory,
    RuleCriterion, RuleDraft, RulePriority, RuleStore, RuleStoreError, RuleValidationError,
    SponsorField, StudentField,
};
pub use scoring::{ConfidenceLevel, MatchingResult, RuleScore, ScoringEngine};
pub use service::{SponsorshipMatchingService, SponsorshipServiceError};

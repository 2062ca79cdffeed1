use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::allocation::SponsorAllocation;
use super::bulk::BulkMatchingJob;
use super::domain::{
    AllocationId, JobId, RuleId, SponsorId, SponsorProfile, StudentId, StudentProfile,
};
use super::rules::MatchingRule;
use super::scoring::MatchingResult;

/// Read access to the student and sponsor profile tables.
pub trait ProfileRepository: Send + Sync {
    fn student(&self, id: &StudentId) -> Result<Option<StudentProfile>, RepositoryError>;
    fn students(&self) -> Result<Vec<StudentProfile>, RepositoryError>;
    fn sponsor(&self, id: &SponsorId) -> Result<Option<SponsorProfile>, RepositoryError>;
    fn sponsors(&self) -> Result<Vec<SponsorProfile>, RepositoryError>;
    /// Students holding an open sponsorship request addressed to the sponsor.
    fn students_with_open_requests(
        &self,
        sponsor: &SponsorId,
    ) -> Result<Vec<StudentProfile>, RepositoryError>;
}

/// Rules are listed in insertion order; ordering by priority happens in the rule store.
pub trait RuleRepository: Send + Sync {
    fn list_rules(&self) -> Result<Vec<MatchingRule>, RepositoryError>;
    fn upsert_rule(&self, rule: MatchingRule) -> Result<MatchingRule, RepositoryError>;
    /// Fails with [`RepositoryError::NotFound`] when the id is unknown.
    fn delete_rule(&self, id: &RuleId) -> Result<(), RepositoryError>;
}

pub trait ResultRepository: Send + Sync {
    fn save_results(&self, results: &[MatchingResult]) -> Result<(), RepositoryError>;
    fn results_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<MatchingResult>, RepositoryError>;
}

/// Outcome of a capacity-guarded allocation insert.
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationInsert {
    Inserted(SponsorAllocation),
    Duplicate,
    AtCapacity { open: usize, capacity: u32 },
}

pub trait AllocationRepository: Send + Sync {
    fn allocation(&self, id: &AllocationId) -> Result<Option<SponsorAllocation>, RepositoryError>;
    fn allocation_for_pair(
        &self,
        sponsor: &SponsorId,
        student: &StudentId,
    ) -> Result<Option<SponsorAllocation>, RepositoryError>;
    fn allocations_for_sponsor(
        &self,
        sponsor: &SponsorId,
    ) -> Result<Vec<SponsorAllocation>, RepositoryError>;
    fn allocations_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<SponsorAllocation>, RepositoryError>;
    /// Allocations whose stored status is not terminal. Lazily expired rows are included;
    /// callers filter with [`SponsorAllocation::is_open`].
    fn open_allocations(&self) -> Result<Vec<SponsorAllocation>, RepositoryError>;
    /// Fails with [`RepositoryError::Conflict`] when the pair already has an allocation.
    fn insert_allocation(
        &self,
        allocation: SponsorAllocation,
    ) -> Result<SponsorAllocation, RepositoryError>;
    fn update_allocation(&self, allocation: SponsorAllocation) -> Result<(), RepositoryError>;

    /// Duplicate check, capacity check and insert as one step.
    ///
    /// The default composes the individual calls and is only as safe as sequential use.
    /// Stores that can do so should override it with a conditional insert.
    fn insert_if_below_capacity(
        &self,
        allocation: SponsorAllocation,
        capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<AllocationInsert, RepositoryError> {
        if self
            .allocation_for_pair(&allocation.sponsor_id, &allocation.student_id)?
            .is_some()
        {
            return Ok(AllocationInsert::Duplicate);
        }

        let open = self
            .allocations_for_sponsor(&allocation.sponsor_id)?
            .iter()
            .filter(|existing| existing.is_open(now))
            .count();
        if open >= capacity as usize {
            return Ok(AllocationInsert::AtCapacity { open, capacity });
        }

        match self.insert_allocation(allocation) {
            Ok(stored) => Ok(AllocationInsert::Inserted(stored)),
            Err(RepositoryError::Conflict) => Ok(AllocationInsert::Duplicate),
            Err(other) => Err(other),
        }
    }
}

pub trait JobRepository: Send + Sync {
    fn insert_job(&self, job: BulkMatchingJob) -> Result<BulkMatchingJob, RepositoryError>;
    fn update_job(&self, job: BulkMatchingJob) -> Result<(), RepositoryError>;
    fn job(&self, id: &JobId) -> Result<Option<BulkMatchingJob>, RepositoryError>;
}

/// Every table the matching engine touches.
pub trait MatchingStore:
    ProfileRepository + RuleRepository + ResultRepository + AllocationRepository + JobRepository
{
}

impl<T> MatchingStore for T where
    T: ProfileRepository + RuleRepository + ResultRepository + AllocationRepository + JobRepository
{
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

pub const ALLOCATED_TEMPLATE: &str = "sponsorship-allocated";
pub const APPROVED_TEMPLATE: &str = "sponsorship-approved";

/// Outbound notification hook (e-mail, in-app, push adapters).
pub trait NotificationPublisher: Send + Sync {
    fn send(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: String,
    pub template_id: String,
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

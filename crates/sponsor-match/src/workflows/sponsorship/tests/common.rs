use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::sponsorship::allocation::{AllocationStatus, SponsorAllocation};
use crate::workflows::sponsorship::bulk::BulkMatchingJob;
use crate::workflows::sponsorship::clock::FixedClock;
use crate::workflows::sponsorship::config::MatchingConfig;
use crate::workflows::sponsorship::domain::{
    AllocationId, Demographics, FinancialNeed, FundingRange, JobId, RuleId, SponsorId,
    SponsorProfile, StudentId, StudentProfile,
};
use crate::workflows::sponsorship::memory::InMemoryStore;
use crate::workflows::sponsorship::repository::{
    AllocationRepository, JobRepository, Notification, NotificationError, NotificationPublisher,
    ProfileRepository, RepositoryError, ResultRepository, RuleRepository,
};
use crate::workflows::sponsorship::rules::MatchingRule;
use crate::workflows::sponsorship::scoring::{ConfidenceLevel, MatchingResult};
use crate::workflows::sponsorship::service::SponsorshipMatchingService;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Student satisfying every default rule except the rural background preference.
pub(super) fn student(id: &str) -> StudentProfile {
    StudentProfile {
        id: StudentId::from(id),
        academic_level: Some("undergraduate".to_string()),
        field_of_study: Some("Computer Science".to_string()),
        gpa: Some(3.8),
        financial_need: Some(FinancialNeed::Critical),
        household_income: Some(18_000.0),
        location: Some("Nairobi".to_string()),
        demographics: Demographics {
            first_generation: Some(true),
            rural_background: Some(false),
            ..Demographics::default()
        },
        extracurriculars: vec!["robotics club".to_string()],
        achievements: vec!["dean's list".to_string()],
        profile_complete: true,
        documents_verified: true,
    }
}

/// Student sharing nothing with [`sponsor`] beyond the engagement rule.
pub(super) fn weak_student(id: &str) -> StudentProfile {
    StudentProfile {
        id: StudentId::from(id),
        academic_level: Some("doctoral".to_string()),
        field_of_study: Some("History".to_string()),
        gpa: Some(2.1),
        financial_need: Some(FinancialNeed::Low),
        household_income: Some(140_000.0),
        location: Some("Lisbon".to_string()),
        demographics: Demographics::default(),
        extracurriculars: vec!["chess".to_string()],
        achievements: Vec::new(),
        profile_complete: true,
        documents_verified: true,
    }
}

/// Student with nothing filled in; scores zero against every default rule.
pub(super) fn blank_student(id: &str) -> StudentProfile {
    StudentProfile {
        id: StudentId::from(id),
        academic_level: None,
        field_of_study: None,
        gpa: None,
        financial_need: None,
        household_income: None,
        location: None,
        demographics: Demographics::default(),
        extracurriculars: Vec::new(),
        achievements: Vec::new(),
        profile_complete: true,
        documents_verified: true,
    }
}

pub(super) fn sponsor(id: &str) -> SponsorProfile {
    SponsorProfile {
        id: SponsorId::from(id),
        organization_name: format!("{id} Foundation"),
        organization_type: Some("foundation".to_string()),
        preferred_academic_levels: vec!["undergraduate".to_string()],
        preferred_fields: vec!["computer science".to_string(), "engineering".to_string()],
        preferred_locations: vec!["Nairobi".to_string(), "Mombasa".to_string()],
        preferred_demographics: vec!["first_generation".to_string()],
        minimum_gpa: Some(3.0),
        maximum_household_income: Some(60_000.0),
        funding_amount_range: FundingRange {
            min: 1000.0,
            max: 5000.0,
        },
        capacity: None,
        is_active: true,
        is_verified: true,
    }
}

pub(super) fn matching_result(student: &str, sponsor: &str, score: f64) -> MatchingResult {
    MatchingResult {
        student_id: StudentId::from(student),
        sponsor_id: SponsorId::from(sponsor),
        score,
        matched_criteria: Vec::new(),
        unmatched_criteria: Vec::new(),
        components: Vec::new(),
        funding_amount: 2500,
        confidence_level: ConfidenceLevel::from_score(score),
        calculated_at: now(),
    }
}

pub(super) fn allocation(id: &str, sponsor: &str, student: &str, score: f64) -> SponsorAllocation {
    SponsorAllocation {
        id: AllocationId::from(id),
        sponsor_id: SponsorId::from(sponsor),
        student_id: StudentId::from(student),
        status: AllocationStatus::Pending,
        match_score: score,
        amount: 2500,
        assignment_date: now(),
        expiry_date: now() + Duration::days(7),
        notes: String::new(),
    }
}

pub(super) fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(now()))
}

pub(super) fn build_service() -> (
    SponsorshipMatchingService<InMemoryStore, MemoryNotifier>,
    Arc<InMemoryStore>,
    Arc<MemoryNotifier>,
) {
    build_service_with(MatchingConfig::default())
}

pub(super) fn build_service_with(
    config: MatchingConfig,
) -> (
    SponsorshipMatchingService<InMemoryStore, MemoryNotifier>,
    Arc<InMemoryStore>,
    Arc<MemoryNotifier>,
) {
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = SponsorshipMatchingService::with_clock(
        store.clone(),
        notifier.clone(),
        config,
        fixed_clock(),
    );
    service.initialize_rules();
    (service, store, notifier)
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl NotificationPublisher for FailingNotifier {
    fn send(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }
}

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

/// Store whose every call fails as if the database were down.
pub(super) struct UnavailableStore;

impl ProfileRepository for UnavailableStore {
    fn student(&self, _id: &StudentId) -> Result<Option<StudentProfile>, RepositoryError> {
        offline()
    }

    fn students(&self) -> Result<Vec<StudentProfile>, RepositoryError> {
        offline()
    }

    fn sponsor(&self, _id: &SponsorId) -> Result<Option<SponsorProfile>, RepositoryError> {
        offline()
    }

    fn sponsors(&self) -> Result<Vec<SponsorProfile>, RepositoryError> {
        offline()
    }

    fn students_with_open_requests(
        &self,
        _sponsor: &SponsorId,
    ) -> Result<Vec<StudentProfile>, RepositoryError> {
        offline()
    }
}

impl RuleRepository for UnavailableStore {
    fn list_rules(&self) -> Result<Vec<MatchingRule>, RepositoryError> {
        offline()
    }

    fn upsert_rule(&self, _rule: MatchingRule) -> Result<MatchingRule, RepositoryError> {
        offline()
    }

    fn delete_rule(&self, _id: &RuleId) -> Result<(), RepositoryError> {
        offline()
    }
}

impl ResultRepository for UnavailableStore {
    fn save_results(&self, _results: &[MatchingResult]) -> Result<(), RepositoryError> {
        offline()
    }

    fn results_for_student(
        &self,
        _student: &StudentId,
    ) -> Result<Vec<MatchingResult>, RepositoryError> {
        offline()
    }
}

impl AllocationRepository for UnavailableStore {
    fn allocation(&self, _id: &AllocationId) -> Result<Option<SponsorAllocation>, RepositoryError> {
        offline()
    }

    fn allocation_for_pair(
        &self,
        _sponsor: &SponsorId,
        _student: &StudentId,
    ) -> Result<Option<SponsorAllocation>, RepositoryError> {
        offline()
    }

    fn allocations_for_sponsor(
        &self,
        _sponsor: &SponsorId,
    ) -> Result<Vec<SponsorAllocation>, RepositoryError> {
        offline()
    }

    fn allocations_for_student(
        &self,
        _student: &StudentId,
    ) -> Result<Vec<SponsorAllocation>, RepositoryError> {
        offline()
    }

    fn open_allocations(&self) -> Result<Vec<SponsorAllocation>, RepositoryError> {
        offline()
    }

    fn insert_allocation(
        &self,
        _allocation: SponsorAllocation,
    ) -> Result<SponsorAllocation, RepositoryError> {
        offline()
    }

    fn update_allocation(&self, _allocation: SponsorAllocation) -> Result<(), RepositoryError> {
        offline()
    }
}

/// Jobs persist, but profile reads fail; used to drive a bulk run into the failed state.
#[derive(Default)]
pub(super) struct JobOnlyStore {
    pub(super) jobs: Mutex<Vec<BulkMatchingJob>>,
}

impl JobOnlyStore {
    pub(super) fn last_job(&self) -> Option<BulkMatchingJob> {
        self.jobs.lock().expect("job mutex poisoned").last().cloned()
    }
}

impl JobRepository for UnavailableStore {
    fn insert_job(&self, _job: BulkMatchingJob) -> Result<BulkMatchingJob, RepositoryError> {
        offline()
    }

    fn update_job(&self, _job: BulkMatchingJob) -> Result<(), RepositoryError> {
        offline()
    }

    fn job(&self, _id: &JobId) -> Result<Option<BulkMatchingJob>, RepositoryError> {
        offline()
    }
}

impl ProfileRepository for JobOnlyStore {
    fn student(&self, id: &StudentId) -> Result<Option<StudentProfile>, RepositoryError> {
        UnavailableStore.student(id)
    }

    fn students(&self) -> Result<Vec<StudentProfile>, RepositoryError> {
        UnavailableStore.students()
    }

    fn sponsor(&self, id: &SponsorId) -> Result<Option<SponsorProfile>, RepositoryError> {
        UnavailableStore.sponsor(id)
    }

    fn sponsors(&self) -> Result<Vec<SponsorProfile>, RepositoryError> {
        UnavailableStore.sponsors()
    }

    fn students_with_open_requests(
        &self,
        sponsor: &SponsorId,
    ) -> Result<Vec<StudentProfile>, RepositoryError> {
        UnavailableStore.students_with_open_requests(sponsor)
    }
}

impl RuleRepository for JobOnlyStore {
    fn list_rules(&self) -> Result<Vec<MatchingRule>, RepositoryError> {
        Ok(Vec::new())
    }

    fn upsert_rule(&self, rule: MatchingRule) -> Result<MatchingRule, RepositoryError> {
        Ok(rule)
    }

    fn delete_rule(&self, _id: &RuleId) -> Result<(), RepositoryError> {
        Err(RepositoryError::NotFound)
    }
}

impl ResultRepository for JobOnlyStore {
    fn save_results(&self, _results: &[MatchingResult]) -> Result<(), RepositoryError> {
        Ok(())
    }

    fn results_for_student(
        &self,
        _student: &StudentId,
    ) -> Result<Vec<MatchingResult>, RepositoryError> {
        Ok(Vec::new())
    }
}

impl AllocationRepository for JobOnlyStore {
    fn allocation(&self, id: &AllocationId) -> Result<Option<SponsorAllocation>, RepositoryError> {
        UnavailableStore.allocation(id)
    }

    fn allocation_for_pair(
        &self,
        sponsor: &SponsorId,
        student: &StudentId,
    ) -> Result<Option<SponsorAllocation>, RepositoryError> {
        UnavailableStore.allocation_for_pair(sponsor, student)
    }

    fn allocations_for_sponsor(
        &self,
        sponsor: &SponsorId,
    ) -> Result<Vec<SponsorAllocation>, RepositoryError> {
        UnavailableStore.allocations_for_sponsor(sponsor)
    }

    fn allocations_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<SponsorAllocation>, RepositoryError> {
        UnavailableStore.allocations_for_student(student)
    }

    fn open_allocations(&self) -> Result<Vec<SponsorAllocation>, RepositoryError> {
        UnavailableStore.open_allocations()
    }

    fn insert_allocation(
        &self,
        allocation: SponsorAllocation,
    ) -> Result<SponsorAllocation, RepositoryError> {
        UnavailableStore.insert_allocation(allocation)
    }

    fn update_allocation(&self, allocation: SponsorAllocation) -> Result<(), RepositoryError> {
        UnavailableStore.update_allocation(allocation)
    }
}

impl JobRepository for JobOnlyStore {
    fn insert_job(&self, job: BulkMatchingJob) -> Result<BulkMatchingJob, RepositoryError> {
        self.jobs
            .lock()
            .expect("job mutex poisoned")
            .push(job.clone());
        Ok(job)
    }

    fn update_job(&self, job: BulkMatchingJob) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.lock().expect("job mutex poisoned");
        match jobs.iter_mut().find(|existing| existing.id == job.id) {
            Some(existing) => {
                *existing = job;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn job(&self, id: &JobId) -> Result<Option<BulkMatchingJob>, RepositoryError> {
        Ok(self
            .jobs
            .lock()
            .expect("job mutex poisoned")
            .iter()
            .find(|job| &job.id == id)
            .cloned())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

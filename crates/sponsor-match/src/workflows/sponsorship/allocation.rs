use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::MatchingConfig;
use super::domain::{AllocationId, SponsorId, StudentId};
use super::repository::{
    AllocationInsert, AllocationRepository, Notification, NotificationPublisher,
    ProfileRepository, RepositoryError, ALLOCATED_TEMPLATE, APPROVED_TEMPLATE,
};
use super::scoring::MatchingResult;

/// Allocation lifecycle. `Pending` and `Approved` hold sponsor capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl AllocationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AllocationStatus::Pending => "pending",
            AllocationStatus::Approved => "approved",
            AllocationStatus::Rejected => "rejected",
            AllocationStatus::Expired => "expired",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, AllocationStatus::Rejected | AllocationStatus::Expired)
    }

    pub const fn can_transition_to(self, next: AllocationStatus) -> bool {
        matches!(
            (self, next),
            (AllocationStatus::Pending, AllocationStatus::Approved)
                | (AllocationStatus::Pending, AllocationStatus::Rejected)
                | (AllocationStatus::Pending, AllocationStatus::Expired)
                | (AllocationStatus::Approved, AllocationStatus::Rejected)
        )
    }
}

/// Sponsor commitment to fund one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SponsorAllocation {
    pub id: AllocationId,
    pub sponsor_id: SponsorId,
    pub student_id: StudentId,
    pub status: AllocationStatus,
    pub match_score: f64,
    pub amount: u64,
    pub assignment_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub notes: String,
}

impl SponsorAllocation {
    /// Status as observed at `now`; pending allocations past their expiry read as expired.
    pub fn effective_status(&self, now: DateTime<Utc>) -> AllocationStatus {
        if self.status == AllocationStatus::Pending && now >= self.expiry_date {
            AllocationStatus::Expired
        } else {
            self.status
        }
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        !self.effective_status(now).is_terminal()
    }

    fn append_note(&mut self, note: &str) {
        if self.notes.is_empty() {
            self.notes = note.to_string();
        } else {
            self.notes.push_str("; ");
            self.notes.push_str(note);
        }
    }

    pub fn view(&self, now: DateTime<Utc>) -> AllocationView {
        AllocationView {
            id: self.id.clone(),
            sponsor_id: self.sponsor_id.clone(),
            student_id: self.student_id.clone(),
            status: self.effective_status(now).label(),
            match_score: self.match_score,
            amount: self.amount,
            assignment_date: self.assignment_date,
            expiry_date: self.expiry_date,
            notes: self.notes.clone(),
        }
    }
}

/// Allocation as exposed to API callers, with lazy expiry applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationView {
    pub id: AllocationId,
    pub sponsor_id: SponsorId,
    pub student_id: StudentId,
    pub status: &'static str,
    pub match_score: f64,
    pub amount: u64,
    pub assignment_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub notes: String,
}

/// Summary of one conflict resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub examined: usize,
    pub kept: usize,
    pub rejected: Vec<AllocationId>,
    pub sponsors_over_capacity: Vec<SponsorId>,
}

/// Creates allocations under sponsor capacity and reconciles overlaps.
pub struct AllocationResolver<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    config: MatchingConfig,
}

impl<S, N> AllocationResolver<S, N>
where
    S: AllocationRepository + ProfileRepository,
    N: NotificationPublisher,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: MatchingConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Turn a match into a pending allocation.
    ///
    /// Returns `Ok(None)` when the pair already has an allocation, the sponsor is at
    /// capacity, or the sponsor no longer exists or is not accepting students.
    pub fn create_assignment(
        &self,
        result: &MatchingResult,
        now: DateTime<Utc>,
    ) -> Result<Option<SponsorAllocation>, RepositoryError> {
        let Some(sponsor) = self.store.sponsor(&result.sponsor_id)? else {
            debug!(sponsor_id = %result.sponsor_id, "sponsor missing; skipping assignment");
            return Ok(None);
        };
        if !sponsor.accepts_students() {
            debug!(sponsor_id = %result.sponsor_id, "sponsor not accepting students; skipping assignment");
            return Ok(None);
        }
        let expiry_date = self.expiry_from(now)?;
        let capacity = sponsor.capacity_or(self.config.max_students_per_sponsor);

        let allocation = SponsorAllocation {
            id: AllocationId(Uuid::new_v4().to_string()),
            sponsor_id: result.sponsor_id.clone(),
            student_id: result.student_id.clone(),
            status: AllocationStatus::Pending,
            match_score: result.score,
            amount: result.funding_amount,
            assignment_date: now,
            expiry_date,
            notes: format!(
                "auto-assigned with match score {:.2} ({} confidence)",
                result.score,
                result.confidence_level.label()
            ),
        };

        match self
            .store
            .insert_if_below_capacity(allocation, capacity, now)?
        {
            AllocationInsert::Inserted(stored) => {
                info!(
                    allocation_id = %stored.id,
                    sponsor_id = %stored.sponsor_id,
                    student_id = %stored.student_id,
                    score = stored.match_score,
                    "sponsor allocation created"
                );
                if self.config.notification_enabled {
                    self.notify_allocated(&stored, &sponsor.organization_name);
                }
                Ok(Some(stored))
            }
            AllocationInsert::Duplicate => {
                debug!(
                    sponsor_id = %result.sponsor_id,
                    student_id = %result.student_id,
                    "allocation already exists for pair"
                );
                Ok(None)
            }
            AllocationInsert::AtCapacity { open, capacity } => {
                debug!(sponsor_id = %result.sponsor_id, open, capacity, "sponsor at capacity");
                Ok(None)
            }
        }
    }

    /// Expiry must land strictly after `now`; an already expired allocation would never
    /// count against capacity.
    fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, RepositoryError> {
        let days = self.config.allocation_expiry_days;
        Duration::try_days(days)
            .filter(|window| *window > Duration::zero())
            .and_then(|window| now.checked_add_signed(window))
            .ok_or_else(|| {
                RepositoryError::InvalidRecord(format!(
                    "allocation expiry of {days} days is out of range"
                ))
            })
    }

    /// Demote allocations beyond each sponsor's capacity.
    ///
    /// Open allocations are walked by match score (then recency) descending; the first
    /// `capacity` per sponsor are kept and the remainder rejected.
    pub fn resolve_conflicts(&self, now: DateTime<Utc>) -> Result<ConflictReport, RepositoryError> {
        let mut open: Vec<SponsorAllocation> = self
            .store
            .open_allocations()?
            .into_iter()
            .filter(|allocation| allocation.is_open(now))
            .collect();

        open.sort_by(|a, b| {
            b.match_score
                .total_cmp(&a.match_score)
                .then_with(|| b.assignment_date.cmp(&a.assignment_date))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut capacities: HashMap<SponsorId, u32> = HashMap::new();
        let mut accepted: HashMap<SponsorId, u32> = HashMap::new();
        let mut over_capacity = BTreeSet::new();
        let mut report = ConflictReport {
            examined: open.len(),
            ..ConflictReport::default()
        };

        for mut allocation in open {
            let capacity = match capacities.get(&allocation.sponsor_id) {
                Some(capacity) => *capacity,
                None => {
                    let capacity = self
                        .store
                        .sponsor(&allocation.sponsor_id)?
                        .map(|sponsor| sponsor.capacity_or(self.config.max_students_per_sponsor))
                        .unwrap_or(self.config.max_students_per_sponsor);
                    capacities.insert(allocation.sponsor_id.clone(), capacity);
                    capacity
                }
            };

            let count = accepted.entry(allocation.sponsor_id.clone()).or_insert(0);
            if *count < capacity {
                *count += 1;
                report.kept += 1;
                continue;
            }

            allocation.status = AllocationStatus::Rejected;
            allocation.append_note(&format!(
                "rejected during conflict resolution: sponsor capacity {capacity} exceeded"
            ));
            over_capacity.insert(allocation.sponsor_id.clone());
            report.rejected.push(allocation.id.clone());
            self.store.update_allocation(allocation)?;
        }

        report.sponsors_over_capacity = over_capacity.into_iter().collect();
        if !report.rejected.is_empty() {
            info!(
                rejected = report.rejected.len(),
                sponsors = report.sponsors_over_capacity.len(),
                "allocation conflicts resolved"
            );
        }
        Ok(report)
    }

    pub fn approve_allocation(
        &self,
        id: &AllocationId,
        now: DateTime<Utc>,
    ) -> Result<SponsorAllocation, AllocationError> {
        let allocation = self.transition(id, AllocationStatus::Approved, "approved", now)?;
        if self.config.notification_enabled {
            self.notify_approved(&allocation);
        }
        Ok(allocation)
    }

    pub fn reject_allocation(
        &self,
        id: &AllocationId,
        now: DateTime<Utc>,
    ) -> Result<SponsorAllocation, AllocationError> {
        self.transition(id, AllocationStatus::Rejected, "rejected manually", now)
    }

    fn transition(
        &self,
        id: &AllocationId,
        next: AllocationStatus,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<SponsorAllocation, AllocationError> {
        let mut allocation = self
            .store
            .allocation(id)?
            .ok_or_else(|| AllocationError::NotFound(id.clone()))?;

        let current = allocation.effective_status(now);
        if !current.can_transition_to(next) {
            return Err(AllocationError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        allocation.status = next;
        allocation.append_note(note);
        self.store.update_allocation(allocation.clone())?;
        info!(allocation_id = %allocation.id, status = next.label(), "allocation status changed");
        Ok(allocation)
    }

    fn notify_allocated(&self, allocation: &SponsorAllocation, sponsor_name: &str) {
        let mut variables = BTreeMap::new();
        variables.insert("allocation_id".to_string(), allocation.id.to_string());
        variables.insert("sponsor_name".to_string(), sponsor_name.to_string());
        variables.insert("amount".to_string(), allocation.amount.to_string());
        variables.insert("match_score".to_string(), format!("{:.2}", allocation.match_score));
        variables.insert(
            "expiry_date".to_string(),
            allocation.expiry_date.format("%Y-%m-%d").to_string(),
        );

        for user_id in [allocation.student_id.as_str(), allocation.sponsor_id.as_str()] {
            self.dispatch(Notification {
                user_id: user_id.to_string(),
                template_id: ALLOCATED_TEMPLATE.to_string(),
                variables: variables.clone(),
            });
        }
    }

    fn notify_approved(&self, allocation: &SponsorAllocation) {
        let mut variables = BTreeMap::new();
        variables.insert("allocation_id".to_string(), allocation.id.to_string());
        variables.insert("amount".to_string(), allocation.amount.to_string());

        self.dispatch(Notification {
            user_id: allocation.student_id.to_string(),
            template_id: APPROVED_TEMPLATE.to_string(),
            variables,
        });
    }

    fn dispatch(&self, notification: Notification) {
        let user_id = notification.user_id.clone();
        let template_id = notification.template_id.clone();
        if let Err(err) = self.notifier.send(notification) {
            warn!(%user_id, %template_id, error = %err, "notification delivery failed");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("allocation {0} not found")]
    NotFound(AllocationId),
    #[error("allocation cannot move from {} to {}", .from.label(), .to.label())]
    InvalidTransition {
        from: AllocationStatus,
        to: AllocationStatus,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::allocation::SponsorAllocation;
use super::bulk::BulkMatchingJob;
use super::domain::{
    AllocationId, JobId, RuleId, SponsorId, SponsorProfile, StudentId, StudentProfile,
};
use super::repository::{
    AllocationInsert, AllocationRepository, JobRepository, ProfileRepository, RepositoryError,
    ResultRepository, RuleRepository,
};
use super::rules::MatchingRule;
use super::scoring::MatchingResult;

#[derive(Default)]
struct Tables {
    students: BTreeMap<StudentId, StudentProfile>,
    sponsors: BTreeMap<SponsorId, SponsorProfile>,
    requests: BTreeSet<(SponsorId, StudentId)>,
    rules: Vec<MatchingRule>,
    results: Vec<MatchingResult>,
    allocations: Vec<SponsorAllocation>,
    jobs: BTreeMap<JobId, BulkMatchingJob>,
}

/// Process-local datastore backing the demo service and tests.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    pub fn put_student(&self, student: StudentProfile) -> Result<(), RepositoryError> {
        self.tables()?.students.insert(student.id.clone(), student);
        Ok(())
    }

    pub fn put_sponsor(&self, sponsor: SponsorProfile) -> Result<(), RepositoryError> {
        self.tables()?.sponsors.insert(sponsor.id.clone(), sponsor);
        Ok(())
    }

    /// Record an open sponsorship request from a student to a sponsor.
    pub fn open_request(
        &self,
        student: &StudentId,
        sponsor: &SponsorId,
    ) -> Result<(), RepositoryError> {
        self.tables()?
            .requests
            .insert((sponsor.clone(), student.clone()));
        Ok(())
    }

    pub fn all_allocations(&self) -> Result<Vec<SponsorAllocation>, RepositoryError> {
        Ok(self.tables()?.allocations.clone())
    }
}

impl ProfileRepository for InMemoryStore {
    fn student(&self, id: &StudentId) -> Result<Option<StudentProfile>, RepositoryError> {
        Ok(self.tables()?.students.get(id).cloned())
    }

    fn students(&self) -> Result<Vec<StudentProfile>, RepositoryError> {
        Ok(self.tables()?.students.values().cloned().collect())
    }

    fn sponsor(&self, id: &SponsorId) -> Result<Option<SponsorProfile>, RepositoryError> {
        Ok(self.tables()?.sponsors.get(id).cloned())
    }

    fn sponsors(&self) -> Result<Vec<SponsorProfile>, RepositoryError> {
        Ok(self.tables()?.sponsors.values().cloned().collect())
    }

    fn students_with_open_requests(
        &self,
        sponsor: &SponsorId,
    ) -> Result<Vec<StudentProfile>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .requests
            .iter()
            .filter(|(requested, _)| requested == sponsor)
            .filter_map(|(_, student)| tables.students.get(student).cloned())
            .collect())
    }
}

impl RuleRepository for InMemoryStore {
    fn list_rules(&self) -> Result<Vec<MatchingRule>, RepositoryError> {
        Ok(self.tables()?.rules.clone())
    }

    fn upsert_rule(&self, rule: MatchingRule) -> Result<MatchingRule, RepositoryError> {
        let mut tables = self.tables()?;
        match tables.rules.iter_mut().find(|existing| existing.id == rule.id) {
            Some(existing) => *existing = rule.clone(),
            None => tables.rules.push(rule.clone()),
        }
        Ok(rule)
    }

    fn delete_rule(&self, id: &RuleId) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let before = tables.rules.len();
        tables.rules.retain(|rule| &rule.id != id);
        if tables.rules.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

impl ResultRepository for InMemoryStore {
    /// Keeps the latest result per (student, sponsor) pair.
    fn save_results(&self, results: &[MatchingResult]) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        for result in results {
            tables.results.retain(|existing| {
                existing.student_id != result.student_id || existing.sponsor_id != result.sponsor_id
            });
            tables.results.push(result.clone());
        }
        Ok(())
    }

    fn results_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<MatchingResult>, RepositoryError> {
        Ok(self
            .tables()?
            .results
            .iter()
            .filter(|result| &result.student_id == student)
            .cloned()
            .collect())
    }
}

impl AllocationRepository for InMemoryStore {
    fn allocation(&self, id: &AllocationId) -> Result<Option<SponsorAllocation>, RepositoryError> {
        Ok(self
            .tables()?
            .allocations
            .iter()
            .find(|allocation| &allocation.id == id)
            .cloned())
    }

    fn allocation_for_pair(
        &self,
        sponsor: &SponsorId,
        student: &StudentId,
    ) -> Result<Option<SponsorAllocation>, RepositoryError> {
        Ok(self
            .tables()?
            .allocations
            .iter()
            .find(|allocation| &allocation.sponsor_id == sponsor && &allocation.student_id == student)
            .cloned())
    }

    fn allocations_for_sponsor(
        &self,
        sponsor: &SponsorId,
    ) -> Result<Vec<SponsorAllocation>, RepositoryError> {
        Ok(self
            .tables()?
            .allocations
            .iter()
            .filter(|allocation| &allocation.sponsor_id == sponsor)
            .cloned()
            .collect())
    }

    fn allocations_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<SponsorAllocation>, RepositoryError> {
        Ok(self
            .tables()?
            .allocations
            .iter()
            .filter(|allocation| &allocation.student_id == student)
            .cloned()
            .collect())
    }

    fn open_allocations(&self) -> Result<Vec<SponsorAllocation>, RepositoryError> {
        Ok(self
            .tables()?
            .allocations
            .iter()
            .filter(|allocation| !allocation.status.is_terminal())
            .cloned()
            .collect())
    }

    fn insert_allocation(
        &self,
        allocation: SponsorAllocation,
    ) -> Result<SponsorAllocation, RepositoryError> {
        let mut tables = self.tables()?;
        insert_unique(&mut tables, allocation)
    }

    fn update_allocation(&self, allocation: SponsorAllocation) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let existing = tables
            .allocations
            .iter_mut()
            .find(|existing| existing.id == allocation.id)
            .ok_or(RepositoryError::NotFound)?;
        *existing = allocation;
        Ok(())
    }

    fn insert_if_below_capacity(
        &self,
        allocation: SponsorAllocation,
        capacity: u32,
        now: DateTime<Utc>,
    ) -> Result<AllocationInsert, RepositoryError> {
        let mut tables = self.tables()?;

        if tables.allocations.iter().any(|existing| {
            existing.sponsor_id == allocation.sponsor_id
                && existing.student_id == allocation.student_id
        }) {
            return Ok(AllocationInsert::Duplicate);
        }

        let open = tables
            .allocations
            .iter()
            .filter(|existing| existing.sponsor_id == allocation.sponsor_id && existing.is_open(now))
            .count();
        if open >= capacity as usize {
            return Ok(AllocationInsert::AtCapacity { open, capacity });
        }

        insert_unique(&mut tables, allocation).map(AllocationInsert::Inserted)
    }
}

fn insert_unique(
    tables: &mut Tables,
    allocation: SponsorAllocation,
) -> Result<SponsorAllocation, RepositoryError> {
    let duplicate = tables.allocations.iter().any(|existing| {
        existing.id == allocation.id
            || (existing.sponsor_id == allocation.sponsor_id
                && existing.student_id == allocation.student_id)
    });
    if duplicate {
        return Err(RepositoryError::Conflict);
    }
    tables.allocations.push(allocation.clone());
    Ok(allocation)
}

impl JobRepository for InMemoryStore {
    fn insert_job(&self, job: BulkMatchingJob) -> Result<BulkMatchingJob, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.jobs.contains_key(&job.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn update_job(&self, job: BulkMatchingJob) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.jobs.get_mut(&job.id) {
            Some(existing) => {
                *existing = job;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn job(&self, id: &JobId) -> Result<Option<BulkMatchingJob>, RepositoryError> {
        Ok(self.tables()?.jobs.get(id).cloned())
    }
}

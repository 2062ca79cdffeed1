use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::allocation::AllocationResolver;
use super::clock::Clock;
use super::config::MatchingConfig;
use super::domain::{JobId, SponsorProfile, StudentProfile};
use super::finder::{MatchError, MatchFinder, MatchQuery};
use super::repository::{MatchingStore, NotificationPublisher, RepositoryError};
use super::rules::{MatchingRule, RuleStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    const fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

/// Report of one end-to-end bulk matching run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkMatchingJob {
    pub id: JobId,
    pub status: JobStatus,
    pub total_students: usize,
    pub total_sponsors: usize,
    pub processed_students: usize,
    pub matches_found: usize,
    pub assignments_made: usize,
    pub errors: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BulkMatchingJob {
    pub fn new(id: JobId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            total_students: 0,
            total_sponsors: 0,
            processed_students: 0,
            matches_found: 0,
            assignments_made: 0,
            errors: Vec::new(),
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Advance the job; statuses are never revisited.
    pub fn transition(
        &mut self,
        next: JobStatus,
        now: DateTime<Utc>,
    ) -> Result<(), JobTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(JobTransitionError {
                from: self.status,
                to: next,
            });
        }

        if next == JobStatus::Running {
            self.started_at = Some(now);
        }
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("bulk matching job cannot move from {} to {}", .from.label(), .to.label())]
pub struct JobTransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum BulkMatchingError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Transition(#[from] JobTransitionError),
}

#[derive(Debug, thiserror::Error)]
enum StudentFailure {
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Saved matches count even when the follow-up assignment fails.
struct StudentOutcome {
    matches: usize,
    assignment: Result<bool, RepositoryError>,
}

/// Runs matching across every eligible student, one batch at a time.
///
/// Students are processed sequentially so the capacity check in allocation creation never
/// races with itself inside a run.
pub struct BulkMatchingOrchestrator<'a, S, N> {
    store: &'a S,
    rules: &'a RuleStore<S>,
    finder: &'a MatchFinder<S>,
    allocations: &'a AllocationResolver<S, N>,
    config: &'a MatchingConfig,
    clock: &'a dyn Clock,
}

impl<'a, S, N> BulkMatchingOrchestrator<'a, S, N>
where
    S: MatchingStore,
    N: NotificationPublisher,
{
    pub fn new(
        store: &'a S,
        rules: &'a RuleStore<S>,
        finder: &'a MatchFinder<S>,
        allocations: &'a AllocationResolver<S, N>,
        config: &'a MatchingConfig,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            store,
            rules,
            finder,
            allocations,
            config,
            clock,
        }
    }

    /// Execute a full run and return the job report.
    ///
    /// Per-student failures land in `errors` and the job still completes. Failures loading
    /// the run inputs mark the job failed and are returned.
    pub fn run(&self) -> Result<BulkMatchingJob, BulkMatchingError> {
        let job = BulkMatchingJob::new(JobId(Uuid::new_v4().to_string()), self.clock.now());
        let mut job = self.store.insert_job(job)?;
        info!(job_id = %job.id, "bulk matching job created");

        match self.execute(&mut job) {
            Ok(()) => Ok(job),
            Err(err) => {
                self.mark_failed(&mut job, &err);
                Err(err)
            }
        }
    }

    fn execute(&self, job: &mut BulkMatchingJob) -> Result<(), BulkMatchingError> {
        job.transition(JobStatus::Running, self.clock.now())?;
        self.store.update_job(job.clone())?;

        let (students, sponsors, rules) = self.load_inputs()?;
        job.total_students = students.len();
        job.total_sponsors = sponsors.len();
        info!(
            job_id = %job.id,
            students = job.total_students,
            sponsors = job.total_sponsors,
            rules = rules.len(),
            "bulk matching started"
        );

        let batch_size = self.config.batch_size.max(1);
        for (index, batch) in students.chunks(batch_size).enumerate() {
            for student in batch {
                match self.process_student(student, &rules) {
                    Ok(outcome) => {
                        job.matches_found += outcome.matches;
                        match outcome.assignment {
                            Ok(true) => job.assignments_made += 1,
                            Ok(false) => {}
                            Err(err) => {
                                warn!(job_id = %job.id, student_id = %student.id, error = %err, "assignment failed");
                                job.errors.push(format!(
                                    "student {}: assignment failed: {}",
                                    student.id, err
                                ));
                            }
                        }
                    }
                    Err(err) => {
                        warn!(job_id = %job.id, student_id = %student.id, error = %err, "student matching failed");
                        job.errors.push(format!("student {}: {}", student.id, err));
                    }
                }
                job.processed_students += 1;
            }

            self.store.update_job(job.clone())?;
            info!(
                job_id = %job.id,
                batch = index + 1,
                processed = job.processed_students,
                total = job.total_students,
                "bulk matching batch complete"
            );
        }

        job.transition(JobStatus::Completed, self.clock.now())?;
        self.store.update_job(job.clone())?;
        info!(
            job_id = %job.id,
            matches = job.matches_found,
            assignments = job.assignments_made,
            errors = job.errors.len(),
            "bulk matching completed"
        );
        Ok(())
    }

    fn load_inputs(
        &self,
    ) -> Result<(Vec<StudentProfile>, Vec<SponsorProfile>, Vec<MatchingRule>), BulkMatchingError>
    {
        let mut students = self.store.students()?;
        students.retain(StudentProfile::is_eligible);

        let mut sponsors = self.store.sponsors()?;
        sponsors.retain(SponsorProfile::accepts_students);

        let rules = self.rules.active_rules()?;
        Ok((students, sponsors, rules))
    }

    fn process_student(
        &self,
        student: &StudentProfile,
        rules: &[MatchingRule],
    ) -> Result<StudentOutcome, StudentFailure> {
        let now = self.clock.now();
        let query = MatchQuery::for_student(student.id.clone(), self.config.max_matches_per_student);

        let mut matches = self.finder.find_matches(&query, rules, now)?;
        matches.retain(|result| result.score >= self.config.min_score_threshold);

        self.rules.save_results(&matches)?;

        let assignment = match matches.first() {
            Some(best) if self.config.auto_assign_enabled => self
                .allocations
                .create_assignment(best, now)
                .map(|created| created.is_some()),
            _ => Ok(false),
        };

        Ok(StudentOutcome {
            matches: matches.len(),
            assignment,
        })
    }

    fn mark_failed(&self, job: &mut BulkMatchingJob, err: &BulkMatchingError) {
        error!(job_id = %job.id, error = %err, "bulk matching failed");
        job.errors.push(err.to_string());
        if job.transition(JobStatus::Failed, self.clock.now()).is_ok() {
            if let Err(update_err) = self.store.update_job(job.clone()) {
                warn!(job_id = %job.id, error = %update_err, "could not persist failed job state");
            }
        }
    }
}

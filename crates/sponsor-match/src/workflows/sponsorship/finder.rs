use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::{
    FinancialNeed, ProfileError, SponsorId, SponsorProfile, StudentId, StudentProfile,
};
use super::repository::{ProfileRepository, RepositoryError};
use super::rules::MatchingRule;
use super::scoring::{MatchingResult, ScoringEngine};

pub const DEFAULT_MATCH_LIMIT: usize = 10;

fn default_limit() -> usize {
    DEFAULT_MATCH_LIMIT
}

/// Match request anchored on a student, a sponsor, or free-form student criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchQuery {
    #[serde(default)]
    pub student_id: Option<StudentId>,
    #[serde(default)]
    pub sponsor_id: Option<SponsorId>,
    #[serde(default)]
    pub academic_level: Option<String>,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub financial_need: Option<FinancialNeed>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for MatchQuery {
    fn default() -> Self {
        Self {
            student_id: None,
            sponsor_id: None,
            academic_level: None,
            field_of_study: None,
            location: None,
            financial_need: None,
            limit: DEFAULT_MATCH_LIMIT,
        }
    }
}

impl MatchQuery {
    pub fn for_student(student_id: StudentId, limit: usize) -> Self {
        Self {
            student_id: Some(student_id),
            limit,
            ..Self::default()
        }
    }

    pub fn for_sponsor(sponsor_id: SponsorId, limit: usize) -> Self {
        Self {
            sponsor_id: Some(sponsor_id),
            limit,
            ..Self::default()
        }
    }

    fn admits(&self, student: &StudentProfile) -> bool {
        text_filter(&self.academic_level, &student.academic_level)
            && text_filter(&self.field_of_study, &student.field_of_study)
            && text_filter(&self.location, &student.location)
            && self
                .financial_need
                .map_or(true, |need| student.financial_need == Some(need))
    }
}

fn text_filter(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match (wanted, actual) {
        (None, _) => true,
        (Some(wanted), Some(actual)) => wanted.trim().eq_ignore_ascii_case(actual.trim()),
        (Some(_), None) => false,
    }
}

/// Loads candidates and ranks them through the scoring engine.
pub struct MatchFinder<P> {
    profiles: Arc<P>,
    engine: ScoringEngine,
}

impl<P> MatchFinder<P>
where
    P: ProfileRepository,
{
    pub fn new(profiles: Arc<P>, engine: ScoringEngine) -> Self {
        Self { profiles, engine }
    }

    /// Ranked, truncated matches with a positive score. A missing anchor yields no matches.
    pub fn find_matches(
        &self,
        query: &MatchQuery,
        rules: &[MatchingRule],
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchingResult>, MatchError> {
        let mut results = if let Some(student_id) = &query.student_id {
            let Some(student) = self.profiles.student(student_id)? else {
                debug!(%student_id, "student not found; no matches");
                return Ok(Vec::new());
            };
            student
                .validate()
                .map_err(|source| MatchError::InvalidProfile {
                    student_id: student_id.clone(),
                    source,
                })?;
            let sponsors = self.accepting_sponsors()?;
            self.score_pairs(std::slice::from_ref(&student), &sponsors, rules, now)
        } else if let Some(sponsor_id) = &query.sponsor_id {
            let Some(sponsor) = self.profiles.sponsor(sponsor_id)? else {
                debug!(%sponsor_id, "sponsor not found; no matches");
                return Ok(Vec::new());
            };
            if !sponsor.accepts_students() {
                debug!(%sponsor_id, "sponsor not accepting students; no matches");
                return Ok(Vec::new());
            }
            let students = valid_students(self.profiles.students_with_open_requests(sponsor_id)?);
            self.score_pairs(&students, std::slice::from_ref(&sponsor), rules, now)
        } else {
            let students: Vec<StudentProfile> = valid_students(self.profiles.students()?)
                .into_iter()
                .filter(|student| query.admits(student))
                .collect();
            let sponsors = self.accepting_sponsors()?;
            self.score_pairs(&students, &sponsors, rules, now)
        };

        results.retain(|result| result.score > 0.0);
        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.student_id.cmp(&b.student_id))
                .then_with(|| a.sponsor_id.cmp(&b.sponsor_id))
        });
        results.truncate(query.limit);
        Ok(results)
    }

    fn accepting_sponsors(&self) -> Result<Vec<SponsorProfile>, RepositoryError> {
        let mut sponsors = self.profiles.sponsors()?;
        sponsors.retain(SponsorProfile::accepts_students);
        Ok(sponsors)
    }

    fn score_pairs(
        &self,
        students: &[StudentProfile],
        sponsors: &[SponsorProfile],
        rules: &[MatchingRule],
        now: DateTime<Utc>,
    ) -> Vec<MatchingResult> {
        let mut results = Vec::with_capacity(students.len() * sponsors.len());
        for student in students {
            for sponsor in sponsors {
                results.push(self.engine.evaluate_match(student, sponsor, rules, now));
            }
        }
        results
    }
}

fn valid_students(students: Vec<StudentProfile>) -> Vec<StudentProfile> {
    students
        .into_iter()
        .filter(|student| match student.validate() {
            Ok(()) => true,
            Err(err) => {
                warn!(student_id = %student.id, error = %err, "skipping malformed student profile");
                false
            }
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("student {student_id} has an invalid profile: {source}")]
    InvalidProfile {
        student_id: StudentId,
        source: ProfileError,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

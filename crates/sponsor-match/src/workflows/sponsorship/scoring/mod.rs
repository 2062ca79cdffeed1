mod funding;
mod operators;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{RuleId, SponsorId, SponsorProfile, StudentId, StudentProfile};
use super::rules::{MatchingRule, RuleCategory, RuleCriterion};

pub const HIGH_CONFIDENCE_SCORE: f64 = 80.0;
pub const MEDIUM_CONFIDENCE_SCORE: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_CONFIDENCE_SCORE {
            ConfidenceLevel::High
        } else if score >= MEDIUM_CONFIDENCE_SCORE {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }
}

/// Contribution of one rule to a match, kept for audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleScore {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub category: RuleCategory,
    pub weight: f64,
    pub score: f64,
    pub criteria_met: usize,
    pub criteria_total: usize,
}

/// Scored student/sponsor pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingResult {
    pub student_id: StudentId,
    pub sponsor_id: SponsorId,
    pub score: f64,
    pub matched_criteria: Vec<String>,
    pub unmatched_criteria: Vec<String>,
    pub components: Vec<RuleScore>,
    pub funding_amount: u64,
    pub confidence_level: ConfidenceLevel,
    pub calculated_at: DateTime<Utc>,
}

/// Stateless evaluator applying weighted rules to a student/sponsor pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate_match(
        &self,
        student: &StudentProfile,
        sponsor: &SponsorProfile,
        rules: &[MatchingRule],
        now: DateTime<Utc>,
    ) -> MatchingResult {
        let mut components = Vec::new();
        let mut matched_criteria = Vec::new();
        let mut unmatched_criteria = Vec::new();
        let mut weighted_total = 0.0;
        let mut weight_sum = 0.0;

        for rule in rules.iter().filter(|rule| rule.is_active) {
            let component = score_rule(rule, student, sponsor);

            if component.score > 0.0 {
                matched_criteria.push(rule.name.clone());
            } else {
                unmatched_criteria.push(rule.name.clone());
            }

            weighted_total += component.score * rule.weight;
            weight_sum += rule.weight;
            components.push(component);
        }

        let raw = if weight_sum > 0.0 {
            weighted_total / weight_sum
        } else {
            0.0
        };
        let score = round_two(raw.clamp(0.0, 100.0));

        MatchingResult {
            student_id: student.id.clone(),
            sponsor_id: sponsor.id.clone(),
            score,
            matched_criteria,
            unmatched_criteria,
            components,
            funding_amount: funding::recommended_funding(
                sponsor.funding_amount_range,
                score,
                student.financial_need,
            ),
            confidence_level: ConfidenceLevel::from_score(score),
            calculated_at: now,
        }
    }
}

fn score_rule(rule: &MatchingRule, student: &StudentProfile, sponsor: &SponsorProfile) -> RuleScore {
    let mut weighted_total = 0.0;
    let mut weight_sum = 0.0;
    let mut criteria_met = 0;

    for criterion in &rule.criteria {
        let met = criterion_met(criterion, student, sponsor);
        if met {
            criteria_met += 1;
            weighted_total += 100.0 * criterion.weight;
        }
        weight_sum += criterion.weight;
    }

    let score = if weight_sum > 0.0 {
        weighted_total / weight_sum
    } else {
        0.0
    };

    RuleScore {
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        category: rule.category,
        weight: rule.weight,
        score,
        criteria_met,
        criteria_total: rule.criteria.len(),
    }
}

fn criterion_met(
    criterion: &RuleCriterion,
    student: &StudentProfile,
    sponsor: &SponsorProfile,
) -> bool {
    let left = criterion.field.resolve(student, sponsor);
    let right = criterion.value.resolve(sponsor);
    let upper = criterion.value2.as_ref().map(|value| value.resolve(sponsor));

    operators::matches(criterion.operator, &left, &right, upper.as_ref())
}

fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

use super::common::*;
use crate::workflows::sponsorship::domain::RuleId;
use crate::workflows::sponsorship::rules::{
    default_rules, CriterionValue, MatchField, MatchingRule, Operator, RuleCategory,
    RuleCriterion, RulePriority, StudentField,
};
use crate::workflows::sponsorship::scoring::{ConfidenceLevel, MatchingResult, ScoringEngine};

fn rule_score(result: &MatchingResult, id: &str) -> f64 {
    result
        .components
        .iter()
        .find(|component| component.rule_id.as_str() == id)
        .map(|component| component.score)
        .expect("rule component present")
}

fn gpa_rule(id: &str, threshold: f64, weight: f64) -> MatchingRule {
    MatchingRule {
        id: RuleId::from(id),
        name: format!("gpa above {threshold}"),
        description: None,
        category: RuleCategory::Custom,
        priority: RulePriority::Medium,
        criteria: vec![RuleCriterion {
            field: MatchField::Student(StudentField::Gpa),
            operator: Operator::GreaterThan,
            value: CriterionValue::Number(threshold),
            value2: None,
            weight: 100.0,
        }],
        weight,
        is_active: true,
        created_at: now(),
        updated_at: now(),
    }
}

#[test]
fn strong_candidate_scores_high_with_need_adjusted_funding() {
    let engine = ScoringEngine::new();
    let result = engine.evaluate_match(
        &student("stu-1"),
        &sponsor("sp-1"),
        &default_rules(now()),
        now(),
    );

    assert!(result.score >= 80.0, "score was {}", result.score);
    assert_eq!(result.score, 98.0);
    assert_eq!(result.confidence_level, ConfidenceLevel::High);

    let expected = ((1000.0 + 4000.0 * result.score / 100.0) * 1.2_f64).round() as u64;
    assert_eq!(result.funding_amount, expected);
    assert_eq!(result.funding_amount, 5904);

    assert_eq!(result.unmatched_criteria, vec!["Rural background support".to_string()]);
    assert_eq!(result.matched_criteria.len(), 9);
    assert_eq!(result.calculated_at, now());
}

#[test]
fn academic_mismatch_zeroes_academic_preference_rules() {
    let mut candidate = student("stu-2");
    candidate.academic_level = Some("doctoral".to_string());
    candidate.field_of_study = Some("History".to_string());

    let result = ScoringEngine::new().evaluate_match(
        &candidate,
        &sponsor("sp-1"),
        &default_rules(now()),
        now(),
    );

    assert_eq!(rule_score(&result, "rule-academic-level"), 0.0);
    assert_eq!(rule_score(&result, "rule-field-of-study"), 0.0);
    assert_eq!(result.score, 68.0);
    assert_eq!(result.confidence_level, ConfidenceLevel::Medium);
}

#[test]
fn weak_candidate_keeps_partial_credit() {
    let result = ScoringEngine::new().evaluate_match(
        &weak_student("stu-3"),
        &sponsor("sp-1"),
        &default_rules(now()),
        now(),
    );

    assert_eq!(rule_score(&result, "rule-engagement"), 60.0);
    assert_eq!(result.score, 0.6);
    assert_eq!(result.confidence_level, ConfidenceLevel::Low);
    assert_eq!(result.matched_criteria, vec!["Extracurricular engagement".to_string()]);
}

#[test]
fn blank_profile_never_errors_and_scores_zero() {
    let result = ScoringEngine::new().evaluate_match(
        &blank_student("stu-4"),
        &sponsor("sp-1"),
        &default_rules(now()),
        now(),
    );

    assert_eq!(result.score, 0.0);
    assert!(result.matched_criteria.is_empty());
    assert_eq!(result.unmatched_criteria.len(), 10);
    assert_eq!(result.funding_amount, 1000);
}

#[test]
fn sponsor_without_preferences_does_not_match_preference_rules() {
    let mut open_sponsor = sponsor("sp-open");
    open_sponsor.preferred_academic_levels.clear();
    open_sponsor.preferred_fields.clear();
    open_sponsor.minimum_gpa = None;

    let result = ScoringEngine::new().evaluate_match(
        &student("stu-5"),
        &open_sponsor,
        &default_rules(now()),
        now(),
    );

    assert_eq!(rule_score(&result, "rule-academic-level"), 0.0);
    assert_eq!(rule_score(&result, "rule-field-of-study"), 0.0);
    // Only the literal "gpa above 3.5" criterion (weight 30 of 100) still applies.
    assert_eq!(rule_score(&result, "rule-gpa-requirement"), 30.0);
}

#[test]
fn inactive_rules_are_ignored() {
    let mut rules = vec![gpa_rule("strict", 3.9, 50.0), gpa_rule("lenient", 3.0, 50.0)];
    rules[0].is_active = false;

    let result = ScoringEngine::new().evaluate_match(&student("stu-6"), &sponsor("sp-1"), &rules, now());

    assert_eq!(result.components.len(), 1);
    assert_eq!(result.score, 100.0);
    assert!(result.unmatched_criteria.is_empty());
}

#[test]
fn no_active_rules_scores_zero() {
    let mut rules = default_rules(now());
    for rule in &mut rules {
        rule.is_active = false;
    }

    let result = ScoringEngine::new().evaluate_match(&student("stu-7"), &sponsor("sp-1"), &rules, now());

    assert_eq!(result.score, 0.0);
    assert_eq!(result.confidence_level, ConfidenceLevel::Low);
    assert!(result.components.is_empty());
}

#[test]
fn weighted_average_rounds_to_two_decimals() {
    let rules = vec![
        gpa_rule("met", 3.0, 1.0),
        gpa_rule("unmet-a", 3.9, 1.0),
        gpa_rule("unmet-b", 3.95, 1.0),
    ];

    let result = ScoringEngine::new().evaluate_match(&student("stu-8"), &sponsor("sp-1"), &rules, now());

    assert_eq!(result.score, 33.33);
}

#[test]
fn zero_weight_rules_do_not_divide_by_zero() {
    let rules = vec![gpa_rule("weightless", 3.0, 0.0)];

    let result = ScoringEngine::new().evaluate_match(&student("stu-9"), &sponsor("sp-1"), &rules, now());

    assert_eq!(result.score, 0.0);
    assert_eq!(rule_score(&result, "weightless"), 100.0);
}

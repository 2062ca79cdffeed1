use std::sync::Arc;

use chrono::Duration;

use super::common::*;
use crate::workflows::sponsorship::allocation::AllocationError;
use crate::workflows::sponsorship::clock::FixedClock;
use crate::workflows::sponsorship::config::MatchingConfig;
use crate::workflows::sponsorship::domain::{AllocationId, RuleId, SponsorId, StudentId};
use crate::workflows::sponsorship::finder::{MatchError, MatchQuery};
use crate::workflows::sponsorship::repository::{RepositoryError, ResultRepository};
use crate::workflows::sponsorship::rules::{
    CriterionValue, MatchField, Operator, RuleCategory, RuleCriterion, RuleDraft, RulePriority,
    RuleValidationError, StudentField,
};
use crate::workflows::sponsorship::service::{
    SponsorshipMatchingService, SponsorshipServiceError,
};

fn draft(name: &str, weight: f64) -> RuleDraft {
    RuleDraft {
        name: name.to_string(),
        description: None,
        category: RuleCategory::Preference,
        priority: RulePriority::High,
        criteria: vec![RuleCriterion {
            field: MatchField::Student(StudentField::Extracurriculars),
            operator: Operator::Contains,
            value: CriterionValue::Text("Robotics Club".to_string()),
            value2: None,
            weight: 100.0,
        }],
        weight,
        is_active: true,
    }
}

#[test]
fn initialize_rules_is_idempotent_through_the_service() {
    let (service, _, _) = build_service();

    assert_eq!(service.initialize_rules().len(), 10);
    assert_eq!(service.matching_rules().expect("rules").len(), 10);
}

#[test]
fn saved_rules_take_part_in_scoring() {
    let (service, store, _) = build_service();
    store.put_student(student("stu-1")).expect("put");
    store.put_sponsor(sponsor("sp-1")).expect("put");

    let before = service
        .evaluate_pair(&StudentId::from("stu-1"), &SponsorId::from("sp-1"))
        .expect("evaluate")
        .expect("pair exists");

    let saved = service
        .save_rule(RuleId::from("rule-robotics"), draft("Robotics bonus", 100.0))
        .expect("save");
    assert_eq!(saved.created_at, now());

    let after = service
        .evaluate_pair(&StudentId::from("stu-1"), &SponsorId::from("sp-1"))
        .expect("evaluate")
        .expect("pair exists");

    assert_eq!(before.score, 98.0);
    assert_eq!(after.score, 99.0);
    assert_eq!(after.components.len(), 11);
}

#[test]
fn invalid_rule_drafts_are_rejected() {
    let (service, _, _) = build_service();

    let outcome = service.save_rule(RuleId::from("rule-bad"), draft("Too heavy", 250.0));

    assert!(matches!(
        outcome,
        Err(SponsorshipServiceError::Rule(
            RuleValidationError::RuleWeightOutOfRange(_)
        ))
    ));
}

#[test]
fn deleting_missing_rule_is_not_found() {
    let (service, _, _) = build_service();

    assert!(matches!(
        service.delete_rule(&RuleId::from("rule-missing")),
        Err(SponsorshipServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[test]
fn find_matches_uses_active_rules() {
    let (service, store, _) = build_service();
    store.put_student(student("stu-1")).expect("put");
    store.put_sponsor(sponsor("sp-1")).expect("put");

    let mut disabled = draft("Robotics bonus", 100.0);
    disabled.is_active = false;
    service
        .save_rule(RuleId::from("rule-robotics"), disabled)
        .expect("save");

    let results = service
        .find_matches(&MatchQuery::for_student(StudentId::from("stu-1"), 5))
        .expect("matches");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].score, 98.0);
    assert_eq!(results[0].components.len(), 10);
}

#[test]
fn evaluate_pair_reports_missing_profiles_and_invalid_students() {
    let (service, store, _) = build_service();
    let mut broken = student("stu-broken");
    broken.household_income = Some(f64::INFINITY);
    store.put_student(broken).expect("put");
    store.put_sponsor(sponsor("sp-1")).expect("put");

    assert!(service
        .evaluate_pair(&StudentId::from("ghost"), &SponsorId::from("sp-1"))
        .expect("no error")
        .is_none());
    assert!(matches!(
        service.evaluate_pair(&StudentId::from("stu-broken"), &SponsorId::from("sp-1")),
        Err(SponsorshipServiceError::Match(MatchError::InvalidProfile { .. }))
    ));
}

#[test]
fn assign_pair_scores_saves_and_allocates() {
    let (service, store, notifier) = build_service();
    store.put_student(student("stu-1")).expect("put");
    store.put_sponsor(sponsor("sp-1")).expect("put");

    let allocation = service
        .assign_pair(&StudentId::from("stu-1"), &SponsorId::from("sp-1"))
        .expect("assign")
        .expect("allocated");

    assert_eq!(allocation.match_score, 98.0);
    assert_eq!(allocation.amount, 5904);
    assert_eq!(
        store
            .results_for_student(&StudentId::from("stu-1"))
            .expect("results")
            .len(),
        1
    );
    assert_eq!(notifier.sent().len(), 2);

    let second = service
        .assign_pair(&StudentId::from("stu-1"), &SponsorId::from("sp-1"))
        .expect("assign again");
    assert!(second.is_none());

    assert!(matches!(
        service.assign_pair(&StudentId::from("stu-1"), &SponsorId::from("sp-gone")),
        Err(SponsorshipServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[test]
fn allocation_views_report_effective_status() {
    let (service, store, notifier) = build_service();
    store.put_student(student("stu-1")).expect("put");
    store.put_sponsor(sponsor("sp-1")).expect("put");

    service
        .assign_pair(&StudentId::from("stu-1"), &SponsorId::from("sp-1"))
        .expect("assign")
        .expect("allocated");

    let service = SponsorshipMatchingService::with_clock(
        store,
        notifier,
        MatchingConfig::default(),
        Arc::new(FixedClock(now() + Duration::days(8))),
    );

    let by_student = service
        .allocations_for_student(&StudentId::from("stu-1"))
        .expect("views");
    let by_sponsor = service
        .allocations_for_sponsor(&SponsorId::from("sp-1"))
        .expect("views");

    assert_eq!(by_student.len(), 1);
    assert_eq!(by_student[0].status, "expired");
    assert_eq!(by_student, by_sponsor);
}

#[test]
fn manual_assignment_to_paused_sponsor_is_refused() {
    let (service, store, notifier) = build_service();
    let mut paused = sponsor("sp-off");
    paused.is_active = false;
    paused.is_verified = false;
    store.put_student(student("stu-1")).expect("put");
    store.put_sponsor(paused).expect("put");

    let outcome = service
        .assign_pair(&StudentId::from("stu-1"), &SponsorId::from("sp-off"))
        .expect("no error");

    assert!(outcome.is_none());
    assert!(service
        .allocations_for_sponsor(&SponsorId::from("sp-off"))
        .expect("views")
        .is_empty());
    assert!(notifier.sent().is_empty());
}

#[test]
fn approve_and_reject_go_through_the_resolver() {
    let (service, store, _) = build_service();
    store.put_student(student("stu-1")).expect("put");
    store.put_sponsor(sponsor("sp-1")).expect("put");
    let allocation = service
        .assign_pair(&StudentId::from("stu-1"), &SponsorId::from("sp-1"))
        .expect("assign")
        .expect("allocated");

    let approved = service.approve_allocation(&allocation.id).expect("approve");
    assert_eq!(approved.status.label(), "approved");

    let rejected = service.reject_allocation(&allocation.id).expect("reject");
    assert_eq!(rejected.status.label(), "rejected");

    assert!(matches!(
        service.approve_allocation(&AllocationId::from("missing")),
        Err(SponsorshipServiceError::Allocation(AllocationError::NotFound(_)))
    ));
}

#[test]
fn unavailable_store_surfaces_repository_errors() {
    let service = SponsorshipMatchingService::with_clock(
        Arc::new(UnavailableStore),
        Arc::new(MemoryNotifier::default()),
        MatchingConfig::default(),
        fixed_clock(),
    );

    assert!(service.initialize_rules().is_empty());
    assert!(matches!(
        service.matching_rules(),
        Err(SponsorshipServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
    assert!(matches!(
        service.resolve_conflicts(),
        Err(SponsorshipServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
}

use crate::infra::{
    demo_sponsors, demo_students, seed_demo_profiles, start_of_day, LoggingNotificationPublisher,
};
use chrono::{NaiveDate, Utc};
use clap::Args;
use serde::Serialize;
use sponsor_match::error::AppError;
use sponsor_match::workflows::sponsorship::{
    default_rules, AllocationView, BulkMatchingJob, ConflictReport, FixedClock, InMemoryStore,
    MatchQuery, MatchingConfig, MatchingResult, Notification, SponsorshipMatchingService,
    SponsorshipServiceError,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for scoring and allocation expiry (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Run matching without creating allocations.
    #[arg(long)]
    pub(crate) no_auto_assign: bool,
    /// Emit the full outcome as JSON instead of a text summary.
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RulesArgs {
    /// Emit the rule set as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct DemoOutcome {
    pub(crate) job: BulkMatchingJob,
    pub(crate) top_matches: Vec<MatchingResult>,
    pub(crate) conflicts: ConflictReport,
    pub(crate) allocations: Vec<AllocationView>,
    pub(crate) notifications: Vec<Notification>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        as_of,
        no_auto_assign,
        json,
    } = args;

    let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
    let outcome = build_demo(as_of, !no_auto_assign)?;

    if json {
        match serde_json::to_string_pretty(&outcome) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Demo payload unavailable: {err}"),
        }
        return Ok(());
    }

    render_demo(&outcome, as_of, !no_auto_assign);
    Ok(())
}

pub(crate) fn build_demo(as_of: NaiveDate, auto_assign: bool) -> Result<DemoOutcome, AppError> {
    let store = Arc::new(InMemoryStore::new());
    seed_demo_profiles(&store).map_err(SponsorshipServiceError::from)?;

    let notifier = Arc::new(LoggingNotificationPublisher::default());
    let config = MatchingConfig {
        auto_assign_enabled: auto_assign,
        ..MatchingConfig::default()
    };
    let service = SponsorshipMatchingService::with_clock(
        store,
        notifier.clone(),
        config,
        Arc::new(FixedClock(start_of_day(as_of))),
    );
    service.initialize_rules();

    let job = service.run_bulk_matching()?;

    let mut top_matches = Vec::new();
    for student in demo_students() {
        let matches = service.find_matches(&MatchQuery::for_student(student.id.clone(), 1))?;
        top_matches.extend(matches);
    }

    let conflicts = service.resolve_conflicts()?;

    let mut allocations = Vec::new();
    for sponsor in demo_sponsors() {
        allocations.extend(service.allocations_for_sponsor(&sponsor.id)?);
    }

    Ok(DemoOutcome {
        job,
        top_matches,
        conflicts,
        allocations,
        notifications: notifier.delivered(),
    })
}

fn render_demo(outcome: &DemoOutcome, as_of: NaiveDate, auto_assign: bool) {
    let job = &outcome.job;
    println!("Sponsorship matching demo (as of {as_of})");
    println!(
        "Auto-assignment: {}",
        if auto_assign { "enabled" } else { "disabled" }
    );

    println!("\nBulk run {} -> {}", job.id, job.status.label());
    println!(
        "- {} students x {} sponsors | {} processed",
        job.total_students, job.total_sponsors, job.processed_students
    );
    println!(
        "- {} matches above threshold | {} allocations created",
        job.matches_found, job.assignments_made
    );
    if job.errors.is_empty() {
        println!("- Errors: none");
    } else {
        println!("- Errors:");
        for error in &job.errors {
            println!("    - {error}");
        }
    }

    println!("\nBest sponsor per student");
    for result in &outcome.top_matches {
        println!(
            "- {} -> {}: score {:.2} ({}) | funding {}",
            result.student_id,
            result.sponsor_id,
            result.score,
            result.confidence_level.label(),
            result.funding_amount
        );
        if !result.unmatched_criteria.is_empty() {
            println!("    unmatched: {}", result.unmatched_criteria.join(", "));
        }
    }

    let conflicts = &outcome.conflicts;
    println!(
        "\nConflict check: {} examined, {} kept, {} rejected",
        conflicts.examined,
        conflicts.kept,
        conflicts.rejected.len()
    );

    if outcome.allocations.is_empty() {
        println!("\nAllocations: none");
    } else {
        println!("\nAllocations");
        for view in &outcome.allocations {
            println!(
                "- {} | {} -> {} | {} | amount {} | expires {}",
                view.id,
                view.sponsor_id,
                view.student_id,
                view.status,
                view.amount,
                view.expiry_date.date_naive()
            );
        }
    }

    if outcome.notifications.is_empty() {
        println!("\nNotifications: none dispatched");
    } else {
        println!("\nNotifications");
        for notification in &outcome.notifications {
            println!(
                "- template={} -> {}",
                notification.template_id, notification.user_id
            );
        }
    }
}

pub(crate) fn run_rules(args: RulesArgs) -> Result<(), AppError> {
    let rules = default_rules(Utc::now());

    if args.json {
        match serde_json::to_string_pretty(&rules) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Rule payload unavailable: {err}"),
        }
        return Ok(());
    }

    println!("Default matching rules");
    let mut total_weight = 0.0;
    for rule in &rules {
        total_weight += rule.weight;
        println!(
            "- {} [{:?}, {:?}] weight {} -> {}",
            rule.name,
            rule.category,
            rule.priority,
            rule.weight,
            rule.description.as_deref().unwrap_or("no description")
        );
    }
    println!("Total weight: {total_weight}");
    Ok(())
}

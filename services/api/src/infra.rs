use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use sponsor_match::workflows::sponsorship::{
    Demographics, FinancialNeed, FundingRange, InMemoryStore, Notification, NotificationError,
    NotificationPublisher, RepositoryError, SponsorId, SponsorProfile, StudentId, StudentProfile,
};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notification sink for environments without a delivery provider; records and logs.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotificationPublisher {
    delivered: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationPublisher for LoggingNotificationPublisher {
    fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            user_id = %notification.user_id,
            template_id = %notification.template_id,
            "notification dispatched"
        );
        self.delivered
            .lock()
            .map_err(|_| NotificationError::Transport("notification log poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

impl LoggingNotificationPublisher {
    pub(crate) fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Midnight UTC on the given day.
pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[allow(clippy::too_many_arguments)]
fn demo_student(
    id: &str,
    level: &str,
    field: &str,
    gpa: f64,
    need: FinancialNeed,
    income: f64,
    location: &str,
    first_generation: bool,
) -> StudentProfile {
    StudentProfile {
        id: StudentId::from(id),
        academic_level: Some(level.to_string()),
        field_of_study: Some(field.to_string()),
        gpa: Some(gpa),
        financial_need: Some(need),
        household_income: Some(income),
        location: Some(location.to_string()),
        demographics: Demographics {
            first_generation: Some(first_generation),
            rural_background: Some(!first_generation),
            ..Demographics::default()
        },
        extracurriculars: vec!["coding club".to_string()],
        achievements: Vec::new(),
        profile_complete: true,
        documents_verified: true,
    }
}

/// Small fixed population used by `serve --seed-demo` and the `demo` command.
pub(crate) fn demo_students() -> Vec<StudentProfile> {
    let mut unverified = demo_student(
        "stu-1006",
        "undergraduate",
        "Nursing",
        3.6,
        FinancialNeed::High,
        21_000.0,
        "Kisumu",
        true,
    );
    unverified.documents_verified = false;

    vec![
        demo_student(
            "stu-1001",
            "undergraduate",
            "Computer Science",
            3.9,
            FinancialNeed::Critical,
            12_500.0,
            "Nairobi",
            true,
        ),
        demo_student(
            "stu-1002",
            "undergraduate",
            "Electrical Engineering",
            3.4,
            FinancialNeed::High,
            28_000.0,
            "Mombasa",
            false,
        ),
        demo_student(
            "stu-1003",
            "graduate",
            "Public Health",
            3.7,
            FinancialNeed::Medium,
            41_000.0,
            "Kisumu",
            true,
        ),
        demo_student(
            "stu-1004",
            "undergraduate",
            "Nursing",
            2.8,
            FinancialNeed::Critical,
            9_000.0,
            "Nakuru",
            false,
        ),
        demo_student(
            "stu-1005",
            "secondary",
            "General Studies",
            3.1,
            FinancialNeed::Low,
            95_000.0,
            "Eldoret",
            false,
        ),
        unverified,
    ]
}

pub(crate) fn demo_sponsors() -> Vec<SponsorProfile> {
    vec![
        SponsorProfile {
            id: SponsorId::from("sp-tech-futures"),
            organization_name: "Tech Futures Fund".to_string(),
            organization_type: Some("corporate".to_string()),
            preferred_academic_levels: vec!["undergraduate".to_string()],
            preferred_fields: vec![
                "Computer Science".to_string(),
                "Electrical Engineering".to_string(),
            ],
            preferred_locations: vec!["Nairobi".to_string(), "Mombasa".to_string()],
            preferred_demographics: vec!["first_generation".to_string()],
            minimum_gpa: Some(3.2),
            maximum_household_income: Some(45_000.0),
            funding_amount_range: FundingRange {
                min: 1500.0,
                max: 6000.0,
            },
            capacity: Some(1),
            is_active: true,
            is_verified: true,
        },
        SponsorProfile {
            id: SponsorId::from("sp-health-alliance"),
            organization_name: "Community Health Alliance".to_string(),
            organization_type: Some("foundation".to_string()),
            preferred_academic_levels: vec![
                "undergraduate".to_string(),
                "graduate".to_string(),
            ],
            preferred_fields: vec!["Public Health".to_string(), "Nursing".to_string()],
            preferred_locations: vec!["Kisumu".to_string(), "Nakuru".to_string()],
            preferred_demographics: vec!["rural_background".to_string()],
            minimum_gpa: Some(2.5),
            maximum_household_income: Some(60_000.0),
            funding_amount_range: FundingRange {
                min: 1000.0,
                max: 4000.0,
            },
            capacity: None,
            is_active: true,
            is_verified: true,
        },
        SponsorProfile {
            id: SponsorId::from("sp-pending-review"),
            organization_name: "Harbor Scholars Circle".to_string(),
            organization_type: Some("individual".to_string()),
            preferred_academic_levels: Vec::new(),
            preferred_fields: Vec::new(),
            preferred_locations: Vec::new(),
            preferred_demographics: Vec::new(),
            minimum_gpa: None,
            maximum_household_income: None,
            funding_amount_range: FundingRange {
                min: 500.0,
                max: 1500.0,
            },
            capacity: None,
            is_active: true,
            is_verified: false,
        },
    ]
}

pub(crate) fn seed_demo_profiles(store: &InMemoryStore) -> Result<(), RepositoryError> {
    for student in demo_students() {
        store.put_student(student)?;
    }
    for sponsor in demo_sponsors() {
        store.put_sponsor(sponsor)?;
    }
    store.open_request(
        &StudentId::from("stu-1003"),
        &SponsorId::from("sp-health-alliance"),
    )?;
    store.open_request(
        &StudentId::from("stu-1004"),
        &SponsorId::from("sp-health-alliance"),
    )?;
    Ok(())
}

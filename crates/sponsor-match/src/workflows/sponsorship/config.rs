use serde::{Deserialize, Serialize};

/// Tunables for matching, bulk orchestration, and allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub batch_size: usize,
    pub max_matches_per_student: usize,
    pub min_score_threshold: f64,
    pub auto_assign_enabled: bool,
    pub max_students_per_sponsor: u32,
    pub notification_enabled: bool,
    pub allocation_expiry_days: i64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_matches_per_student: 5,
            min_score_threshold: 60.0,
            auto_assign_enabled: true,
            max_students_per_sponsor: 10,
            notification_enabled: true,
            allocation_expiry_days: 7,
        }
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

identifier!(
    /// Identifier of a student account.
    StudentId
);
identifier!(
    /// Identifier of a sponsor organization account.
    SponsorId
);
identifier!(RuleId);
identifier!(AllocationId);
identifier!(JobId);

/// Self-declared financial need band captured on the student profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialNeed {
    Low,
    Medium,
    High,
    Critical,
}

impl FinancialNeed {
    pub const fn label(self) -> &'static str {
        match self {
            FinancialNeed::Low => "low",
            FinancialNeed::Medium => "medium",
            FinancialNeed::High => "high",
            FinancialNeed::Critical => "critical",
        }
    }

    /// Multiplier applied to the recommended funding amount.
    pub const fn funding_multiplier(self) -> f64 {
        match self {
            FinancialNeed::Critical => 1.2,
            FinancialNeed::High => 1.1,
            FinancialNeed::Medium => 1.0,
            FinancialNeed::Low => 0.9,
        }
    }
}

/// Demographic attributes used by demographic matching rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    #[serde(default)]
    pub first_generation: Option<bool>,
    #[serde(default)]
    pub rural_background: Option<bool>,
    #[serde(default)]
    pub disability_status: Option<bool>,
    #[serde(default)]
    pub ethnicity: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl Demographics {
    /// Flatten into the tag vocabulary sponsors use for `preferred_demographics`.
    pub fn tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if self.first_generation == Some(true) {
            tags.push("first_generation".to_string());
        }
        if self.rural_background == Some(true) {
            tags.push("rural_background".to_string());
        }
        if self.disability_status == Some(true) {
            tags.push("disability".to_string());
        }
        if let Some(ethnicity) = &self.ethnicity {
            tags.push(ethnicity.trim().to_ascii_lowercase());
        }
        if let Some(gender) = &self.gender {
            tags.push(gender.trim().to_ascii_lowercase());
        }
        tags
    }
}

/// Student side of a match. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    #[serde(default)]
    pub academic_level: Option<String>,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub gpa: Option<f64>,
    #[serde(default)]
    pub financial_need: Option<FinancialNeed>,
    #[serde(default)]
    pub household_income: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub demographics: Demographics,
    #[serde(default)]
    pub extracurriculars: Vec<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub profile_complete: bool,
    #[serde(default)]
    pub documents_verified: bool,
}

impl StudentProfile {
    /// Students enter bulk matching once the profile is complete and documents verified.
    pub fn is_eligible(&self) -> bool {
        self.profile_complete && self.documents_verified
    }

    /// Reject numeric data that cannot be scored meaningfully.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if let Some(gpa) = self.gpa {
            if !gpa.is_finite() || gpa < 0.0 {
                return Err(ProfileError::InvalidGpa(gpa));
            }
        }
        if let Some(income) = self.household_income {
            if !income.is_finite() || income < 0.0 {
                return Err(ProfileError::InvalidHouseholdIncome(income));
            }
        }
        Ok(())
    }
}

/// Inclusive funding band a sponsor offers per student.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundingRange {
    pub min: f64,
    pub max: f64,
}

/// Sponsor side of a match. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SponsorProfile {
    pub id: SponsorId,
    pub organization_name: String,
    #[serde(default)]
    pub organization_type: Option<String>,
    #[serde(default)]
    pub preferred_academic_levels: Vec<String>,
    #[serde(default)]
    pub preferred_fields: Vec<String>,
    #[serde(default)]
    pub preferred_locations: Vec<String>,
    #[serde(default)]
    pub preferred_demographics: Vec<String>,
    #[serde(default)]
    pub minimum_gpa: Option<f64>,
    #[serde(default)]
    pub maximum_household_income: Option<f64>,
    pub funding_amount_range: FundingRange,
    /// Overrides the configured `max_students_per_sponsor` when present.
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
}

impl SponsorProfile {
    pub fn accepts_students(&self) -> bool {
        self.is_active && self.is_verified
    }

    pub fn capacity_or(&self, default_capacity: u32) -> u32 {
        self.capacity.unwrap_or(default_capacity)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("gpa {0} is not a valid non-negative number")]
    InvalidGpa(f64),
    #[error("household income {0} is not a valid non-negative amount")]
    InvalidHouseholdIncome(f64),
}

use serde::{Deserialize, Serialize};

use super::super::domain::{SponsorProfile, StudentProfile};

/// Value produced by a field resolver, ready for operator comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Missing,
    Text(String),
    Number(f64),
    Flag(bool),
    List(Vec<String>),
}

impl FieldValue {
    fn text(value: Option<&String>) -> Self {
        match value {
            Some(text) if !text.trim().is_empty() => FieldValue::Text(text.clone()),
            _ => FieldValue::Missing,
        }
    }

    fn number(value: Option<f64>) -> Self {
        value.map(FieldValue::Number).unwrap_or(FieldValue::Missing)
    }

    fn flag(value: Option<bool>) -> Self {
        value.map(FieldValue::Flag).unwrap_or(FieldValue::Missing)
    }

    /// Empty lists carry no preference and resolve as missing.
    fn list(values: &[String]) -> Self {
        if values.is_empty() {
            FieldValue::Missing
        } else {
            FieldValue::List(values.to_vec())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

/// Student attributes a criterion may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentField {
    AcademicLevel,
    FieldOfStudy,
    Gpa,
    FinancialNeed,
    HouseholdIncome,
    Location,
    FirstGeneration,
    RuralBackground,
    DisabilityStatus,
    Ethnicity,
    Gender,
    DemographicTags,
    Extracurriculars,
    ExtracurricularCount,
    Achievements,
    AchievementCount,
}

impl StudentField {
    pub fn resolve(self, student: &StudentProfile) -> FieldValue {
        match self {
            StudentField::AcademicLevel => FieldValue::text(student.academic_level.as_ref()),
            StudentField::FieldOfStudy => FieldValue::text(student.field_of_study.as_ref()),
            StudentField::Gpa => FieldValue::number(student.gpa),
            StudentField::FinancialNeed => student
                .financial_need
                .map(|need| FieldValue::Text(need.label().to_string()))
                .unwrap_or(FieldValue::Missing),
            StudentField::HouseholdIncome => FieldValue::number(student.household_income),
            StudentField::Location => FieldValue::text(student.location.as_ref()),
            StudentField::FirstGeneration => FieldValue::flag(student.demographics.first_generation),
            StudentField::RuralBackground => FieldValue::flag(student.demographics.rural_background),
            StudentField::DisabilityStatus => {
                FieldValue::flag(student.demographics.disability_status)
            }
            StudentField::Ethnicity => FieldValue::text(student.demographics.ethnicity.as_ref()),
            StudentField::Gender => FieldValue::text(student.demographics.gender.as_ref()),
            StudentField::DemographicTags => FieldValue::list(&student.demographics.tags()),
            StudentField::Extracurriculars => FieldValue::list(&student.extracurriculars),
            StudentField::ExtracurricularCount => {
                FieldValue::Number(student.extracurriculars.len() as f64)
            }
            StudentField::Achievements => FieldValue::list(&student.achievements),
            StudentField::AchievementCount => FieldValue::Number(student.achievements.len() as f64),
        }
    }
}

/// Sponsor attributes a criterion may read or compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SponsorField {
    OrganizationType,
    PreferredAcademicLevels,
    PreferredFields,
    PreferredLocations,
    PreferredDemographics,
    MinimumGpa,
    MaximumHouseholdIncome,
    FundingMin,
    FundingMax,
}

impl SponsorField {
    pub fn resolve(self, sponsor: &SponsorProfile) -> FieldValue {
        match self {
            SponsorField::OrganizationType => FieldValue::text(sponsor.organization_type.as_ref()),
            SponsorField::PreferredAcademicLevels => {
                FieldValue::list(&sponsor.preferred_academic_levels)
            }
            SponsorField::PreferredFields => FieldValue::list(&sponsor.preferred_fields),
            SponsorField::PreferredLocations => FieldValue::list(&sponsor.preferred_locations),
            SponsorField::PreferredDemographics => {
                FieldValue::list(&sponsor.preferred_demographics)
            }
            SponsorField::MinimumGpa => FieldValue::number(sponsor.minimum_gpa),
            SponsorField::MaximumHouseholdIncome => {
                FieldValue::number(sponsor.maximum_household_income)
            }
            SponsorField::FundingMin => FieldValue::Number(sponsor.funding_amount_range.min),
            SponsorField::FundingMax => FieldValue::Number(sponsor.funding_amount_range.max),
        }
    }
}

/// Left-hand side of a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "side", content = "name", rename_all = "snake_case")]
pub enum MatchField {
    Student(StudentField),
    Sponsor(SponsorField),
}

impl MatchField {
    pub fn resolve(self, student: &StudentProfile, sponsor: &SponsorProfile) -> FieldValue {
        match self {
            MatchField::Student(field) => field.resolve(student),
            MatchField::Sponsor(field) => field.resolve(sponsor),
        }
    }
}

/// Right-hand side of a criterion: a literal or a sponsor attribute looked up per pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CriterionValue {
    Text(String),
    Number(f64),
    Flag(bool),
    List(Vec<String>),
    SponsorField(SponsorField),
}

impl CriterionValue {
    pub fn resolve(&self, sponsor: &SponsorProfile) -> FieldValue {
        match self {
            CriterionValue::Text(text) => FieldValue::Text(text.clone()),
            CriterionValue::Number(number) => FieldValue::Number(*number),
            CriterionValue::Flag(flag) => FieldValue::Flag(*flag),
            CriterionValue::List(values) => FieldValue::List(values.clone()),
            CriterionValue::SponsorField(field) => field.resolve(sponsor),
        }
    }
}

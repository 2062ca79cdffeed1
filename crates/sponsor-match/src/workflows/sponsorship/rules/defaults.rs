use chrono::{DateTime, Utc};

use super::super::domain::RuleId;
use super::{
    CriterionValue, MatchField, MatchingRule, Operator, RuleCategory, RuleCriterion,
    RulePriority, SponsorField, StudentField,
};

/// Rule set seeded into an empty store. Academic and financial rules carry 85 of the
/// 100 weight points so a student satisfying both lands in the high confidence band.
pub fn default_rules(now: DateTime<Utc>) -> Vec<MatchingRule> {
    vec![
        rule(
            "rule-academic-level",
            "Academic level preference",
            RuleCategory::Academic,
            RulePriority::High,
            15.0,
            vec![criterion(
                StudentField::AcademicLevel,
                Operator::In,
                CriterionValue::SponsorField(SponsorField::PreferredAcademicLevels),
                None,
                100.0,
            )],
            now,
        ),
        rule(
            "rule-field-of-study",
            "Field of study alignment",
            RuleCategory::Academic,
            RulePriority::High,
            15.0,
            vec![criterion(
                StudentField::FieldOfStudy,
                Operator::In,
                CriterionValue::SponsorField(SponsorField::PreferredFields),
                None,
                100.0,
            )],
            now,
        ),
        rule(
            "rule-gpa-requirement",
            "GPA requirement",
            RuleCategory::Academic,
            RulePriority::Critical,
            20.0,
            vec![
                criterion(
                    StudentField::Gpa,
                    Operator::Between,
                    CriterionValue::SponsorField(SponsorField::MinimumGpa),
                    Some(CriterionValue::Number(5.0)),
                    70.0,
                ),
                criterion(
                    StudentField::Gpa,
                    Operator::GreaterThan,
                    CriterionValue::Number(3.5),
                    None,
                    30.0,
                ),
            ],
            now,
        ),
        rule(
            "rule-financial-need",
            "Financial need priority",
            RuleCategory::Financial,
            RulePriority::Critical,
            20.0,
            vec![criterion(
                StudentField::FinancialNeed,
                Operator::In,
                CriterionValue::List(vec!["high".to_string(), "critical".to_string()]),
                None,
                100.0,
            )],
            now,
        ),
        rule(
            "rule-household-income",
            "Household income ceiling",
            RuleCategory::Financial,
            RulePriority::High,
            15.0,
            vec![criterion(
                StudentField::HouseholdIncome,
                Operator::Between,
                CriterionValue::Number(0.0),
                Some(CriterionValue::SponsorField(
                    SponsorField::MaximumHouseholdIncome,
                )),
                100.0,
            )],
            now,
        ),
        rule(
            "rule-location",
            "Location preference",
            RuleCategory::Preference,
            RulePriority::Medium,
            5.0,
            vec![criterion(
                StudentField::Location,
                Operator::In,
                CriterionValue::SponsorField(SponsorField::PreferredLocations),
                None,
                100.0,
            )],
            now,
        ),
        rule(
            "rule-first-generation",
            "First generation support",
            RuleCategory::Demographic,
            RulePriority::Medium,
            4.0,
            vec![criterion(
                StudentField::FirstGeneration,
                Operator::Equals,
                CriterionValue::Flag(true),
                None,
                100.0,
            )],
            now,
        ),
        rule(
            "rule-rural-background",
            "Rural background support",
            RuleCategory::Demographic,
            RulePriority::Low,
            2.0,
            vec![criterion(
                StudentField::RuralBackground,
                Operator::Equals,
                CriterionValue::Flag(true),
                None,
                100.0,
            )],
            now,
        ),
        rule(
            "rule-demographic-preference",
            "Sponsor demographic preference",
            RuleCategory::Demographic,
            RulePriority::Medium,
            3.0,
            vec![criterion(
                StudentField::DemographicTags,
                Operator::In,
                CriterionValue::SponsorField(SponsorField::PreferredDemographics),
                None,
                100.0,
            )],
            now,
        ),
        rule(
            "rule-engagement",
            "Extracurricular engagement",
            RuleCategory::Custom,
            RulePriority::Low,
            1.0,
            vec![
                criterion(
                    StudentField::ExtracurricularCount,
                    Operator::GreaterThan,
                    CriterionValue::Number(0.0),
                    None,
                    60.0,
                ),
                criterion(
                    StudentField::AchievementCount,
                    Operator::GreaterThan,
                    CriterionValue::Number(0.0),
                    None,
                    40.0,
                ),
            ],
            now,
        ),
    ]
}

fn rule(
    id: &str,
    name: &str,
    category: RuleCategory,
    priority: RulePriority,
    weight: f64,
    criteria: Vec<RuleCriterion>,
    now: DateTime<Utc>,
) -> MatchingRule {
    MatchingRule {
        id: RuleId(id.to_string()),
        name: name.to_string(),
        description: None,
        category,
        priority,
        criteria,
        weight,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn criterion(
    field: StudentField,
    operator: Operator,
    value: CriterionValue,
    value2: Option<CriterionValue>,
    weight: f64,
) -> RuleCriterion {
    RuleCriterion {
        field: MatchField::Student(field),
        operator,
        value,
        value2,
        weight,
    }
}

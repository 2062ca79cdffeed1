use super::super::domain::{FinancialNeed, FundingRange};

/// Recommended award: scale from the range minimum toward its maximum by score, then apply
/// the need multiplier. Rounded to whole currency units.
pub(crate) fn recommended_funding(
    range: FundingRange,
    score: f64,
    need: Option<FinancialNeed>,
) -> u64 {
    let span = (range.max - range.min).max(0.0);
    let base = range.min + span * (score.clamp(0.0, 100.0) / 100.0);
    let multiplier = need.map(FinancialNeed::funding_multiplier).unwrap_or(1.0);
    let amount = (base * multiplier).round();

    if amount.is_finite() && amount > 0.0 {
        amount as u64
    } else {
        0
    }
}

use super::super::rules::{FieldValue, Operator};

const NUMBER_EPSILON: f64 = 1e-9;

/// Boolean comparison of a resolved field against its target(s).
///
/// Missing values on either side never match.
pub(crate) fn matches(
    operator: Operator,
    left: &FieldValue,
    right: &FieldValue,
    upper: Option<&FieldValue>,
) -> bool {
    if left.is_missing() || right.is_missing() {
        return false;
    }

    match operator {
        Operator::Equals => values_equal(left, right),
        Operator::NotEquals => !values_equal(left, right),
        Operator::GreaterThan => numbers(left, right).is_some_and(|(l, r)| l > r),
        Operator::LessThan => numbers(left, right).is_some_and(|(l, r)| l < r),
        Operator::Contains => contains(left, right),
        Operator::In => member_of(left, right),
        Operator::NotIn => match right {
            FieldValue::List(_) => !member_of(left, right),
            _ => false,
        },
        Operator::Between => match (left, right, upper) {
            (FieldValue::Number(value), FieldValue::Number(low), Some(FieldValue::Number(high))) => {
                *value >= *low && *value <= *high
            }
            _ => false,
        },
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn values_equal(left: &FieldValue, right: &FieldValue) -> bool {
    match (left, right) {
        (FieldValue::Text(l), FieldValue::Text(r)) => normalize(l) == normalize(r),
        (FieldValue::Number(l), FieldValue::Number(r)) => (l - r).abs() < NUMBER_EPSILON,
        (FieldValue::Flag(l), FieldValue::Flag(r)) => l == r,
        (FieldValue::List(l), FieldValue::List(r)) => {
            l.len() == r.len()
                && l.iter()
                    .zip(r.iter())
                    .all(|(a, b)| normalize(a) == normalize(b))
        }
        _ => false,
    }
}

fn numbers(left: &FieldValue, right: &FieldValue) -> Option<(f64, f64)> {
    match (left, right) {
        (FieldValue::Number(l), FieldValue::Number(r)) => Some((*l, *r)),
        _ => None,
    }
}

fn list_contains(list: &[String], needle: &str) -> bool {
    let needle = normalize(needle);
    list.iter().any(|item| normalize(item) == needle)
}

fn contains(left: &FieldValue, right: &FieldValue) -> bool {
    match (left, right) {
        (FieldValue::List(items), FieldValue::Text(needle)) => list_contains(items, needle),
        (FieldValue::List(items), FieldValue::List(needles)) => {
            needles.iter().any(|needle| list_contains(items, needle))
        }
        (FieldValue::Text(haystack), FieldValue::Text(needle)) => {
            normalize(haystack).contains(&normalize(needle))
        }
        _ => false,
    }
}

fn member_of(left: &FieldValue, right: &FieldValue) -> bool {
    let FieldValue::List(allowed) = right else {
        return false;
    };

    match left {
        FieldValue::Text(value) => list_contains(allowed, value),
        FieldValue::List(values) => values.iter().any(|value| list_contains(allowed, value)),
        FieldValue::Number(value) => allowed
            .iter()
            .filter_map(|item| item.trim().parse::<f64>().ok())
            .any(|candidate| (candidate - value).abs() < NUMBER_EPSILON),
        FieldValue::Flag(flag) => list_contains(allowed, if *flag { "true" } else { "false" }),
        FieldValue::Missing => false,
    }
}

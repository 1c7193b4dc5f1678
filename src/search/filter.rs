//! Compilation of [`FilterSpec`] into the engine's filter grammar
//!
//! Output uses `attr = "value"`, `attr != "value"`, parenthesised `OR`
//! groups and `>=` / `<=` comparisons, joined with ` AND `. Attribute names
//! are trusted: they have already passed the per-index allow-list.

use super::query::{DateBound, FilterScalar, FilterSpec};

/// Compile a filter spec; `None` when it produces no clauses
pub fn compile_filter(spec: &FilterSpec) -> Option<String> {
    let mut clauses: Vec<String> = Vec::new();

    for (attribute, value) in &spec.equal {
        let values = value.values();
        if let Some(clause) = any_of_clause(attribute, values) {
            clauses.push(clause);
        }
    }

    for (attribute, values) in &spec.any_of {
        if let Some(clause) = any_of_clause(attribute, values.iter().collect()) {
            clauses.push(clause);
        }
    }

    for (attribute, value) in &spec.not_equal {
        for scalar in value.values() {
            clauses.push(format!("{} != {}", attribute, literal(scalar)));
        }
    }

    for (attribute, range) in &spec.range {
        if let Some(min) = range.min {
            clauses.push(format!("{} >= {}", attribute, min));
        }
        if let Some(max) = range.max {
            clauses.push(format!("{} <= {}", attribute, max));
        }
    }

    if let Some(min_date) = spec.min_date {
        clauses.push(format!("date_min >= {}", min_date));
    }
    if let Some(max_date) = spec.max_date {
        clauses.push(format!("date_max <= {}", max_date));
    }
    if let (Some(bound), Some(diff), Some(min_date)) =
        (spec.at_most_or_least, spec.date_diff, spec.min_date)
    {
        let latest = min_date.saturating_add(diff);
        clauses.push(match bound {
            DateBound::AtMost => format!("date_max <= {}", latest),
            DateBound::AtLeast => format!("date_max >= {}", latest),
        });
    }

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

fn any_of_clause(attribute: &str, values: Vec<&FilterScalar>) -> Option<String> {
    match values.as_slice() {
        [] => None,
        [single] => Some(format!("{} = {}", attribute, literal(single))),
        many => {
            let alternatives: Vec<String> = many
                .iter()
                .map(|value| format!("{} = {}", attribute, literal(value)))
                .collect();
            Some(format!("({})", alternatives.join(" OR ")))
        }
    }
}

/// Engine literal: strings quoted with `\` escapes, numbers and booleans bare
fn literal(value: &FilterScalar) -> String {
    match value {
        FilterScalar::Text(text) => quote(text),
        other => other.to_string(),
    }
}

fn quote(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

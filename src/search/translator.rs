//! Request parameters to [`SearchQuery`]
//!
//! Parsing is lenient: malformed numbers fall back to defaults and
//! attributes outside the index's allow-lists are dropped instead of
//! failing the request. [`sanitize_filters`] is the only place where the
//! filterable allow-list is enforced.

use super::query::{DateBound, FilterScalar, FilterSpec, NumericRange, SearchQuery, SortSpec};
use super::registry::IndexRegistration;
use crate::config::QueryConfig;

/// Parameters never treated as attribute filters
const RESERVED: &[&str] = &[
    "q",
    "sort",
    "ordering",
    "limit",
    "offset",
    "facets",
    "page",
    "page_size",
    "selected_facets",
    "min_date",
    "max_date",
    "at_most_or_least",
    "date_diff",
];

/// Raw query string pairs, in request order; keys may repeat
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First non-blank value for `key`, trimmed
    pub fn first(&self, key: &str) -> Option<&str> {
        self.all(key).into_iter().next()
    }

    /// Every non-blank value for `key`, trimmed
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }
}

impl From<Vec<(String, String)>> for QueryParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// Build the query for one index from request parameters
pub fn parse_search_query(
    registration: &IndexRegistration,
    params: &QueryParams,
    limits: &QueryConfig,
) -> SearchQuery {
    let max_limit = limits.max_limit.max(1);
    let default_limit = limits.default_limit.clamp(1, max_limit);

    let limit = params
        .first("limit")
        .or_else(|| params.first("page_size"))
        .and_then(|raw| raw.parse::<i64>().ok())
        .map(|n| n.clamp(1, max_limit as i64) as usize)
        .unwrap_or(default_limit);

    let offset = match params.first("offset").and_then(|raw| raw.parse::<i64>().ok()) {
        Some(n) => n.max(0) as usize,
        None => params
            .first("page")
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(|page| {
                usize::try_from(page.max(1) - 1)
                    .unwrap_or(usize::MAX)
                    .saturating_mul(limit)
            })
            .unwrap_or(0),
    };

    let filters = sanitize_filters(registration, parse_filter_spec(registration, params));

    SearchQuery {
        q: params.first("q").unwrap_or_default().to_string(),
        filters,
        sort: parse_sort(registration, params),
        limit,
        offset,
        facets: parse_facet_attributes(registration, params),
    }
}

/// Collect filter intent from `selected_facets`, attribute parameters and
/// the date parameters. Nothing is validated here.
pub fn parse_filter_spec(registration: &IndexRegistration, params: &QueryParams) -> FilterSpec {
    let mut spec = FilterSpec::default();

    for entry in params.all("selected_facets") {
        let Some((attribute, value)) = entry.split_once(':') else {
            continue;
        };
        let (attribute, value) = (attribute.trim(), value.trim());
        if !attribute.is_empty() && !value.is_empty() {
            spec.add_equal(facet_name(registration, attribute), value);
        }
    }

    for (key, value) in params.iter() {
        let value = value.trim();
        if value.is_empty() || RESERVED.contains(&key) {
            continue;
        }

        if let Some(attribute) = key.strip_suffix("__not") {
            spec.add_not_equal(facet_name(registration, attribute), value);
        } else if let Some(attribute) = key.strip_suffix("__in") {
            let entry = spec
                .any_of
                .entry(facet_name(registration, attribute))
                .or_default();
            for item in value.split(',').map(str::trim).filter(|v| !v.is_empty()) {
                let item = FilterScalar::from(item);
                if !entry.contains(&item) {
                    entry.push(item);
                }
            }
        } else if let Some(attribute) = key.strip_suffix("__gte") {
            if let Some(min) = parse_bound(value) {
                range_entry(&mut spec, registration, attribute).min = Some(min);
            }
        } else if let Some(attribute) = key.strip_suffix("__lte") {
            if let Some(max) = parse_bound(value) {
                range_entry(&mut spec, registration, attribute).max = Some(max);
            }
        } else {
            spec.add_equal(facet_name(registration, key), value);
        }
    }

    spec.min_date = params.first("min_date").and_then(parse_int);
    spec.max_date = params.first("max_date").and_then(parse_int);
    spec.at_most_or_least = params.first("at_most_or_least").and_then(DateBound::parse);
    spec.date_diff = params.first("date_diff").and_then(parse_int);

    spec
}

/// Drop every attribute the index does not declare filterable
pub fn sanitize_filters(registration: &IndexRegistration, mut spec: FilterSpec) -> FilterSpec {
    let before = spec.attributes().count();

    spec.equal.retain(|attribute, _| registration.is_filterable(attribute));
    spec.not_equal.retain(|attribute, _| registration.is_filterable(attribute));
    spec.any_of.retain(|attribute, _| registration.is_filterable(attribute));
    spec.range.retain(|attribute, _| registration.is_filterable(attribute));

    if !registration.is_filterable("date_min") {
        spec.min_date = None;
    }
    if !registration.is_filterable("date_max") {
        spec.max_date = None;
        spec.at_most_or_least = None;
        spec.date_diff = None;
    }

    let dropped = before - spec.attributes().count();
    if dropped > 0 {
        tracing::debug!(
            index_type = %registration.index_type,
            dropped,
            "Dropped filters on non-filterable attributes"
        );
    }
    spec
}

/// `-attr`, `attr:desc`, `attr:asc` or `attr`; `None` unless sortable
pub fn parse_sort(registration: &IndexRegistration, params: &QueryParams) -> Option<SortSpec> {
    let raw = params.first("sort").or_else(|| params.first("ordering"))?;

    let sort = if let Some(attribute) = raw.strip_prefix('-') {
        SortSpec::desc(attribute.trim())
    } else if let Some(attribute) = raw.strip_suffix(":desc") {
        SortSpec::desc(attribute.trim())
    } else if let Some(attribute) = raw.strip_suffix(":asc") {
        SortSpec::asc(attribute.trim())
    } else {
        SortSpec::asc(raw)
    };

    registration.is_sortable(&sort.attribute).then_some(sort)
}

/// Requested facets through the allow-list, or the index defaults
pub fn parse_facet_attributes(registration: &IndexRegistration, params: &QueryParams) -> Vec<String> {
    match params.first("facets").map(str::trim).filter(|raw| !raw.is_empty()) {
        // An explicit list is honoured even when nothing in it is allowed
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| facet_name(registration, name))
            .filter(|name| registration.is_filterable(name))
            .collect(),
        None => registration
            .default_facet_attributes
            .iter()
            .map(|name| name.to_string())
            .collect(),
    }
}

/// Faceted UIs send `type_exact`; the index knows `type`
fn facet_name(registration: &IndexRegistration, attribute: &str) -> String {
    match attribute.strip_suffix("_exact") {
        Some(bare) if registration.is_filterable(bare) => bare.to_string(),
        _ => attribute.to_string(),
    }
}

fn range_entry<'a>(
    spec: &'a mut FilterSpec,
    registration: &IndexRegistration,
    attribute: &str,
) -> &'a mut NumericRange {
    spec.range
        .entry(facet_name(registration, attribute))
        .or_default()
}

fn parse_int(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

/// Range bounds must be finite; `NaN` and `inf` parse but the engine rejects them
fn parse_bound(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::filter::compile_filter;
    use crate::search::query::{FilterValue, DEFAULT_LIMIT, MAX_LIMIT};
    use crate::search::{IndexRegistry, IndexType, SortDirection};

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs.iter().copied().collect()
    }

    fn parse(index_type: IndexType, pairs: &[(&str, &str)]) -> SearchQuery {
        let registry = IndexRegistry::new();
        parse_search_query(registry.get(index_type), &params(pairs), &QueryConfig::default())
    }

    #[test]
    fn test_limit_and_offset_clamping() {
        assert_eq!(parse(IndexType::ItemParts, &[]).limit, DEFAULT_LIMIT);
        assert_eq!(parse(IndexType::ItemParts, &[("limit", "0")]).limit, 1);
        assert_eq!(parse(IndexType::ItemParts, &[("limit", "-4")]).limit, 1);
        assert_eq!(parse(IndexType::ItemParts, &[("limit", "5000")]).limit, MAX_LIMIT);
        assert_eq!(parse(IndexType::ItemParts, &[("limit", "ten")]).limit, DEFAULT_LIMIT);
        assert_eq!(parse(IndexType::ItemParts, &[("offset", "-3")]).offset, 0);
        assert_eq!(parse(IndexType::ItemParts, &[("offset", "x")]).offset, 0);
        assert_eq!(parse(IndexType::ItemParts, &[("offset", "40")]).offset, 40);
    }

    #[test]
    fn test_page_aliases() {
        let query = parse(IndexType::ItemParts, &[("page", "3"), ("page_size", "10")]);
        assert_eq!(query.limit, 10);
        assert_eq!(query.offset, 20);
    }

    #[test]
    fn test_query_term_is_trimmed() {
        assert_eq!(parse(IndexType::Scribes, &[("q", "  Eadwig ")]).q, "Eadwig");
        assert_eq!(parse(IndexType::Scribes, &[]).q, "");
    }

    #[test]
    fn test_selected_facets_strip_exact_suffix() {
        let query = parse(
            IndexType::ItemParts,
            &[
                ("selected_facets", "type_exact:charter"),
                ("selected_facets", "format:roll"),
                ("selected_facets", "malformed"),
            ],
        );
        assert_eq!(query.filters.equal["type"], FilterValue::from("charter"));
        assert_eq!(query.filters.equal["format"], FilterValue::from("roll"));
        assert_eq!(query.filters.equal.len(), 2);
    }

    #[test]
    fn test_repeated_parameter_becomes_or_list() {
        let query = parse(
            IndexType::ItemParts,
            &[("type", "charter"), ("type", "letter")],
        );
        assert_eq!(
            compile_filter(&query.filters).as_deref(),
            Some(r#"(type = "charter" OR type = "letter")"#)
        );
    }

    #[test]
    fn test_not_suffix_routes_to_not_equal() {
        let query = parse(IndexType::ItemParts, &[("type__not", "charter")]);
        assert!(query.filters.equal.is_empty());
        assert_eq!(query.filters.not_equal["type"], FilterValue::from("charter"));
    }

    #[test]
    fn test_in_and_range_suffixes() {
        let query = parse(
            IndexType::ItemParts,
            &[
                ("repository_city__in", "London, Oxford,,London"),
                ("number_of_images__gte", "2"),
                ("number_of_images__lte", "nine"),
            ],
        );
        assert_eq!(
            query.filters.any_of["repository_city"],
            vec![FilterScalar::from("London"), FilterScalar::from("Oxford")]
        );
        assert_eq!(query.filters.range["number_of_images"].min, Some(2.0));
        assert_eq!(query.filters.range["number_of_images"].max, None);
    }

    #[test]
    fn test_unknown_attributes_are_dropped_on_every_path() {
        let registry = IndexRegistry::new();
        let registration = registry.get(IndexType::Scribes);
        let query = parse_search_query(
            registration,
            &params(&[
                ("selected_facets", "password:x"),
                ("secret", "y"),
                ("secret__not", "z"),
                ("secret__in", "a,b"),
                ("secret__gte", "1"),
                ("scriptorium", "Canterbury"),
            ]),
            &QueryConfig::default(),
        );
        for attribute in query.filters.attributes() {
            assert!(registration.is_filterable(attribute), "{} leaked", attribute);
        }
        assert_eq!(query.filters.attributes().count(), 1);
        assert_eq!(
            compile_filter(&query.filters).as_deref(),
            Some(r#"scriptorium = "Canterbury""#)
        );
    }

    #[test]
    fn test_date_parameters() {
        let query = parse(
            IndexType::ItemParts,
            &[
                ("min_date", "900"),
                ("at_most_or_least", "at most"),
                ("date_diff", "50"),
                ("max_date", "soon"),
            ],
        );
        assert_eq!(query.filters.min_date, Some(900));
        assert_eq!(query.filters.max_date, None);
        assert!(compile_filter(&query.filters)
            .unwrap()
            .contains("date_max <= 950"));
    }

    #[test]
    fn test_date_parameters_dropped_without_date_attributes() {
        let query = parse(IndexType::Scribes, &[("min_date", "900"), ("max_date", "1000")]);
        assert_eq!(compile_filter(&query.filters), None);
    }

    #[test]
    fn test_sort_forms_and_allow_list() {
        let sort = parse(IndexType::ItemParts, &[("sort", "-shelfmark")]).sort.unwrap();
        assert_eq!(sort.attribute, "shelfmark");
        assert_eq!(sort.direction, SortDirection::Desc);

        let sort = parse(IndexType::ItemParts, &[("ordering", "date_min:asc")])
            .sort
            .unwrap();
        assert_eq!(sort.to_engine(), "date_min:asc");

        let sort = parse(IndexType::ItemParts, &[("sort", "type:desc")]).sort.unwrap();
        assert_eq!(sort.to_ordering(), "-type");

        assert!(parse(IndexType::ItemParts, &[("sort", "format")]).sort.is_none());
        assert!(parse(IndexType::Scribes, &[("sort", "-password")]).sort.is_none());
    }

    #[test]
    fn test_facets_default_and_filtered() {
        let registry = IndexRegistry::new();
        let defaults: Vec<String> = registry
            .get(IndexType::Hands)
            .default_facet_attributes
            .iter()
            .map(|f| f.to_string())
            .collect();
        assert_eq!(parse(IndexType::Hands, &[]).facets, defaults);
        assert_eq!(
            parse(IndexType::Hands, &[("facets", "place, secret ,date")]).facets,
            vec!["place", "date"]
        );
        assert!(parse(IndexType::Hands, &[("facets", "secret")]).facets.is_empty());
        assert_eq!(parse(IndexType::Hands, &[("facets", " ")]).facets, defaults);
    }

    #[test]
    fn test_huge_page_saturates_offset() {
        let query = parse(
            IndexType::ItemParts,
            &[("page", "9223372036854775807"), ("page_size", "100")],
        );
        assert_eq!(query.limit, 100);
        assert_eq!(query.offset, usize::MAX);

        let query = parse(IndexType::ItemParts, &[("page", "-9223372036854775808")]);
        assert_eq!(query.offset, 0);
    }

    #[test]
    fn test_non_finite_range_bounds_are_dropped() {
        let query = parse(
            IndexType::ItemParts,
            &[
                ("number_of_images__gte", "NaN"),
                ("number_of_images__lte", "inf"),
                ("date_min__gte", "-infinity"),
            ],
        );
        assert!(query.filters.range.is_empty());
        assert_eq!(compile_filter(&query.filters), None);

        let query = parse(
            IndexType::ItemParts,
            &[("number_of_images__gte", "NaN"), ("number_of_images__lte", "12")],
        );
        assert_eq!(query.filters.range["number_of_images"].min, None);
        assert_eq!(
            compile_filter(&query.filters).as_deref(),
            Some("number_of_images <= 12")
        );
    }

    #[test]
    fn test_configured_limits() {
        let registry = IndexRegistry::new();
        let limits = QueryConfig {
            default_limit: 5,
            max_limit: 10,
        };
        let registration = registry.get(IndexType::Graphs);
        assert_eq!(
            parse_search_query(registration, &params(&[]), &limits).limit,
            5
        );
        assert_eq!(
            parse_search_query(registration, &params(&[("limit", "50")]), &limits).limit,
            10
        );
    }
}

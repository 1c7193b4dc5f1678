//! Search query building

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Page size used when a request names none
pub const DEFAULT_LIMIT: usize = 20;

/// Hard upper bound on the page size
pub const MAX_LIMIT: usize = 100;

/// A single value compared against a document attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for FilterScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterScalar::Bool(b) => write!(f, "{}", b),
            FilterScalar::Int(n) => write!(f, "{}", n),
            FilterScalar::Float(x) => write!(f, "{}", x),
            FilterScalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FilterScalar {
    fn from(value: &str) -> Self {
        FilterScalar::Text(value.to_string())
    }
}

impl From<String> for FilterScalar {
    fn from(value: String) -> Self {
        FilterScalar::Text(value)
    }
}

impl From<i64> for FilterScalar {
    fn from(value: i64) -> Self {
        FilterScalar::Int(value)
    }
}

impl From<bool> for FilterScalar {
    fn from(value: bool) -> Self {
        FilterScalar::Bool(value)
    }
}

/// One value, or several values of which any may match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(FilterScalar),
    Any(Vec<FilterScalar>),
}

impl FilterValue {
    /// Add `value`, turning a single value into an OR list
    pub fn push(&mut self, value: FilterScalar) {
        match self {
            FilterValue::One(existing) => {
                if *existing != value {
                    *self = FilterValue::Any(vec![existing.clone(), value]);
                }
            }
            FilterValue::Any(values) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
    }

    pub fn values(&self) -> Vec<&FilterScalar> {
        match self {
            FilterValue::One(value) => vec![value],
            FilterValue::Any(values) => values.iter().collect(),
        }
    }
}

impl From<FilterScalar> for FilterValue {
    fn from(value: FilterScalar) -> Self {
        FilterValue::One(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::One(value.into())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::One(value.into())
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(values: Vec<&str>) -> Self {
        values.into_iter().collect()
    }
}

impl<T: Into<FilterScalar>> FromIterator<T> for FilterValue {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        FilterValue::Any(iter.into_iter().map(Into::into).collect())
    }
}

/// Inclusive numeric bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// How `date_diff` relates the latest date to `min_date`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateBound {
    AtMost,
    AtLeast,
}

impl DateBound {
    /// Accepts the request forms `"at most"` and `"at least"`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "at most" | "at_most" => Some(DateBound::AtMost),
            "at least" | "at_least" => Some(DateBound::AtLeast),
            _ => None,
        }
    }
}

/// Structured, engine-agnostic filter description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// `attr = value`, or an OR group for several values
    pub equal: BTreeMap<String, FilterValue>,
    /// `attr != value` for every value
    pub not_equal: BTreeMap<String, FilterValue>,
    /// Explicit membership lists
    pub any_of: BTreeMap<String, Vec<FilterScalar>>,
    /// `attr >= min` / `attr <= max`
    pub range: BTreeMap<String, NumericRange>,
    pub min_date: Option<i64>,
    pub max_date: Option<i64>,
    pub at_most_or_least: Option<DateBound>,
    pub date_diff: Option<i64>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        *self == FilterSpec::default()
    }

    /// Every attribute name referenced by the attribute maps
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.equal
            .keys()
            .chain(self.not_equal.keys())
            .chain(self.any_of.keys())
            .chain(self.range.keys())
            .map(String::as_str)
    }

    /// Add a value to the equality map, merging into an OR list
    pub fn add_equal(&mut self, attribute: impl Into<String>, value: impl Into<FilterScalar>) {
        add_value(&mut self.equal, attribute.into(), value.into());
    }

    /// Add a value to the not-equal map
    pub fn add_not_equal(&mut self, attribute: impl Into<String>, value: impl Into<FilterScalar>) {
        add_value(&mut self.not_equal, attribute.into(), value.into());
    }
}

fn add_value(map: &mut BTreeMap<String, FilterValue>, attribute: String, value: FilterScalar) {
    match map.get_mut(&attribute) {
        Some(existing) => existing.push(value),
        None => {
            map.insert(attribute, FilterValue::One(value));
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Single-attribute ordering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortSpec {
    pub attribute: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Engine sort expression, e.g. `shelfmark:desc`
    pub fn to_engine(&self) -> String {
        match self.direction {
            SortDirection::Asc => format!("{}:asc", self.attribute),
            SortDirection::Desc => format!("{}:desc", self.attribute),
        }
    }

    /// Request form, e.g. `-shelfmark`
    pub fn to_ordering(&self) -> String {
        match self.direction {
            SortDirection::Asc => self.attribute.clone(),
            SortDirection::Desc => format!("-{}", self.attribute),
        }
    }
}

/// Validated search request for one index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchQuery {
    /// Free-text term; empty matches everything
    pub q: String,

    /// Filters, already restricted to filterable attributes
    pub filters: FilterSpec,

    /// Optional ordering; relevance when absent
    pub sort: Option<SortSpec>,

    /// Page size in `1..=MAX_LIMIT`
    pub limit: usize,

    /// Number of hits to skip
    pub offset: usize,

    /// Attributes to compute facet distributions for
    pub facets: Vec<String>,
}

impl SearchQuery {
    /// Create a new search query
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into().trim().to_string(),
            filters: FilterSpec::default(),
            sort: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
            facets: Vec::new(),
        }
    }

    /// Set filters
    pub fn with_filters(mut self, filters: FilterSpec) -> Self {
        self.filters = filters;
        self
    }

    /// Set sorting
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set limit, clamped into `1..=MAX_LIMIT`
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    /// Set offset
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Set facet attributes
    pub fn with_facets(mut self, facets: Vec<String>) -> Self {
        self.facets = facets;
        self
    }
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self::new("")
    }
}

/// One page of hits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHits {
    pub hits: Vec<serde_json::Value>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

/// Numeric bounds of a facet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FacetStats {
    pub min: f64,
    pub max: f64,
}

/// Facet distributions for the current filter
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FacetResult {
    /// attribute -> value -> count
    pub distribution: BTreeMap<String, BTreeMap<String, u64>>,
    /// attribute -> numeric bounds, for numeric facets
    pub stats: BTreeMap<String, FacetStats>,
}

/// Hits and facets computed by one engine request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacetedSearch {
    pub page: SearchHits,
    pub facets: FacetResult,
}

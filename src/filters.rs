//! Filter declarations and application
//!
//! A filter is a declared, named predicate generator bound to one field,
//! carrying validation rules and an apply strategy. Two kinds exist: text
//! filters with a single active match mode, and select filters constrained
//! to an enumerated option set.
//!
//! Two different rejection policies apply to bad input, on purpose:
//! values failing declared validation rules abort the whole request, while
//! select values outside the declared option set are silently dropped and
//! the filter simply stays inactive.

use indexmap::IndexMap;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::Result;
use crate::fields::humanize;
use crate::query::SelectQuery;
use crate::request::TableRequest;
use crate::validate;

/// String-comparison strategy of a text filter
///
/// Exactly one mode is active at a time; the fluent setters replace the
/// previous mode rather than stacking flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    StartsWith,
    EndsWith,
    FullSearch,
}

/// Text filter with a configurable match mode
#[derive(Debug, Clone)]
pub struct TextFilter {
    pub field: String,
    pub label: String,
    mode: MatchMode,
    rules: Vec<String>,
    /// Declared default value shown when the request supplies none
    pub value: Option<Value>,
}

impl TextFilter {
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        let label = humanize(&field);
        Self {
            field,
            label,
            mode: MatchMode::Exact,
            rules: Vec::new(),
            value: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Match the whole value: `field = value`
    pub fn exact(mut self) -> Self {
        self.mode = MatchMode::Exact;
        self
    }

    /// Prefix match: `field LIKE 'value%'`
    pub fn starts_with(mut self) -> Self {
        self.mode = MatchMode::StartsWith;
        self
    }

    /// Suffix match: `field LIKE '%value'`
    pub fn ends_with(mut self) -> Self {
        self.mode = MatchMode::EndsWith;
        self
    }

    /// Substring match: `field LIKE '%value%'`
    pub fn full_search(mut self) -> Self {
        self.mode = MatchMode::FullSearch;
        self
    }

    /// Declare validation rules, replacing any previous declaration
    pub fn rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules = rules.into_iter().map(Into::into).collect();
        self
    }

    /// Declared default value
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }
}

/// Select filter constrained to an enumerated option set
#[derive(Debug, Clone)]
pub struct SelectFilter {
    pub field: String,
    pub label: String,
    /// Option key mapped to its display value, in declaration order
    pub options: IndexMap<String, Value>,
    pub multiple: bool,
    rules: Vec<String>,
    /// Declared default value shown when the request supplies none
    pub value: Option<Value>,
}

impl SelectFilter {
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        let label = humanize(&field);
        Self {
            field,
            label,
            options: IndexMap::new(),
            multiple: false,
            rules: Vec::new(),
            value: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Declare the option set, replacing any previous declaration
    pub fn options<I, K, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.options = options
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Add a single option
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Accept a sequence of values and apply set membership instead of
    /// equality
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Declare validation rules, replacing any previous declaration
    pub fn rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules = rules.into_iter().map(Into::into).collect();
        self
    }

    /// Declared default value
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    fn is_member(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => self.options.contains_key(s),
            Value::Number(n) => self.options.contains_key(&n.to_string()),
            _ => false,
        }
    }
}

/// A declared filter of either kind
#[derive(Debug, Clone)]
pub enum Filter {
    Text(TextFilter),
    Select(SelectFilter),
}

impl From<TextFilter> for Filter {
    fn from(filter: TextFilter) -> Self {
        Self::Text(filter)
    }
}

impl From<SelectFilter> for Filter {
    fn from(filter: SelectFilter) -> Self {
        Self::Select(filter)
    }
}

/// Render a scalar as the string bound into a pattern predicate
fn pattern_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

impl Filter {
    /// Request key this filter listens on
    pub fn key(&self) -> &str {
        match self {
            Self::Text(f) => &f.field,
            Self::Select(f) => &f.field,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Text(f) => &f.label,
            Self::Select(f) => &f.label,
        }
    }

    /// Declared validation rules, verbatim; empty when none declared
    pub fn get_rules(&self) -> &[String] {
        match self {
            Self::Text(f) => &f.rules,
            Self::Select(f) => &f.rules,
        }
    }

    /// Normalize a raw request value into the value this filter would apply
    ///
    /// Returns `None` when the filter stays inactive: absent or empty input
    /// for any filter, and select values outside the declared option set.
    /// The payload transform uses the same acceptance decision, so UI state
    /// and applied predicates cannot disagree.
    pub fn accepts(&self, raw: &Value) -> Option<Value> {
        match self {
            Self::Text(_) => match raw {
                Value::Null => None,
                Value::String(s) if s.is_empty() => None,
                Value::String(_) | Value::Number(_) | Value::Bool(_) => Some(raw.clone()),
                _ => None,
            },
            Self::Select(filter) => {
                if filter.multiple {
                    let candidates: Vec<Value> = match raw {
                        Value::Array(items) => items.clone(),
                        Value::Null => return None,
                        scalar => vec![scalar.clone()],
                    };
                    let members: Vec<Value> = candidates
                        .into_iter()
                        .filter(|v| filter.is_member(v))
                        .collect();
                    if members.is_empty() {
                        None
                    } else {
                        Some(Value::Array(members))
                    }
                } else if filter.is_member(raw) {
                    Some(raw.clone())
                } else {
                    None
                }
            }
        }
    }

    /// Validate presence and apply the filter's predicate
    ///
    /// Absent, empty, or non-member values leave the query untouched; this
    /// is the silent-ignore path, not an error.
    pub fn apply(&self, query: &mut SelectQuery, raw: &Value) {
        match self.accepts(raw) {
            Some(value) => self.where_filter(query, &value),
            None => debug!(filter = self.key(), "filter value not accepted, skipping"),
        }
    }

    /// Add exactly one predicate for an accepted value
    pub fn where_filter(&self, query: &mut SelectQuery, value: &Value) {
        match self {
            Self::Text(filter) => match filter.mode {
                MatchMode::Exact => query.where_eq(&filter.field, value.clone()),
                MatchMode::StartsWith => {
                    query.where_pattern(&filter.field, format!("{}%", pattern_text(value)));
                }
                MatchMode::EndsWith => {
                    query.where_pattern(&filter.field, format!("%{}", pattern_text(value)));
                }
                MatchMode::FullSearch => {
                    query.where_pattern(&filter.field, format!("%{}%", pattern_text(value)));
                }
            },
            Self::Select(filter) => {
                if filter.multiple {
                    let values = match value {
                        Value::Array(items) => items.clone(),
                        scalar => vec![scalar.clone()],
                    };
                    query.where_in(&filter.field, values);
                } else {
                    query.where_eq(&filter.field, value.clone());
                }
            }
        }
    }

    /// Serializable state for the payload, bound to the live request value
    /// when one was accepted
    pub fn describe(&self, live_value: Option<&Value>) -> Value {
        match self {
            Self::Text(filter) => {
                let value = live_value.cloned().or_else(|| filter.value.clone());
                json!({
                    "key": filter.field,
                    "label": filter.label,
                    "value": value,
                    "exact": filter.mode == MatchMode::Exact,
                    "startsWith": filter.mode == MatchMode::StartsWith,
                    "endsWith": filter.mode == MatchMode::EndsWith,
                    "fullSearch": filter.mode == MatchMode::FullSearch,
                })
            }
            Self::Select(filter) => {
                let value = live_value.cloned().or_else(|| filter.value.clone());
                json!({
                    "key": filter.field,
                    "label": filter.label,
                    "value": value,
                    "options": filter.options,
                    "multiple": filter.multiple,
                })
            }
        }
    }
}

/// Insertion-ordered collection of filters, keyed by field
#[derive(Debug, Clone, Default)]
pub struct FilterCollection {
    filters: IndexMap<String, Filter>,
}

impl FilterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter, replacing any previous declaration for the same key
    pub fn push(&mut self, filter: impl Into<Filter>) {
        let filter = filter.into();
        self.filters.insert(filter.key().to_string(), filter);
    }

    pub fn get(&self, key: &str) -> Option<&Filter> {
        self.filters.get(key)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Iterate filters in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.values()
    }

    /// Merge every member's declared rules into one field-keyed mapping
    ///
    /// Each field carries exactly the rules its own filter declared.
    pub fn get_validation_rules(&self) -> IndexMap<String, Vec<String>> {
        self.filters
            .values()
            .filter(|f| !f.get_rules().is_empty())
            .map(|f| (f.key().to_string(), f.get_rules().to_vec()))
            .collect()
    }

    /// Run the merged rules against request filter input
    ///
    /// Fails with an aggregated validation error before any filter touches
    /// the query; a failure here must prevent query mutation entirely.
    pub fn validate_filter_input(&self, input: &IndexMap<String, Value>) -> Result<()> {
        validate::validate(input, &self.get_validation_rules())
    }

    /// Apply every filter with a value present in the request, in
    /// declaration order
    pub fn apply(&self, request: &TableRequest, query: &mut SelectQuery) {
        for filter in self.filters.values() {
            if let Some(raw) = request.filter.get(filter.key()) {
                filter.apply(query, raw);
            }
        }
    }

    /// Re-index the collection by an arbitrary attribute
    ///
    /// Returns a new view; the original keeps its ordering and keys.
    /// Supported attributes: `field`/`key` and `label`.
    pub fn key_by(&self, attribute: &str) -> IndexMap<String, &Filter> {
        self.filters
            .values()
            .map(|f| match attribute {
                "label" => (f.label().to_string(), f),
                _ => (f.key().to_string(), f),
            })
            .collect()
    }
}

impl From<Vec<Filter>> for FilterCollection {
    fn from(filters: Vec<Filter>) -> Self {
        let mut collection = Self::new();
        for filter in filters {
            collection.push(filter);
        }
        collection
    }
}

//! Normalized request parameters
//!
//! `TableRequest` is a read-only snapshot of the query-string keys the
//! engine recognizes: `sort`, `search`, `filter`, `columns`, `page`, and
//! `perPage`. It is created once per request and never mutated by the
//! composition stages; when a default sort needs to be synthesized, that
//! happens in a stage-local value, not here.
//!
//! Malformed optional parameters (non-numeric page, unparseable keys)
//! degrade to their defaults rather than failing the request.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Default page when the request supplies none
pub const DEFAULT_PAGE: u32 = 1;

/// Default page size when the request supplies none
pub const DEFAULT_PER_PAGE: u32 = 15;

/// Reserved search key for whole-table search
pub const GLOBAL_SEARCH_KEY: &str = "global";

/// Read-only snapshot of the table-relevant request parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableRequest {
    /// Sort target; a `-` prefix requests descending order
    pub sort: Option<String>,
    /// Per-field search values; the key `global` is reserved for
    /// whole-table search
    pub search: IndexMap<String, String>,
    /// Declared-filter values keyed by filter key
    pub filter: IndexMap<String, Value>,
    /// Explicit allow-set of enabled column keys
    pub columns: Option<Vec<String>>,
    #[serde(deserialize_with = "de_page")]
    pub page: u32,
    #[serde(rename = "perPage", deserialize_with = "de_per_page")]
    pub per_page: u32,
}

/// Deserialize `page`, degrading zero to the default like every other
/// construction path
fn de_page<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let page = u32::deserialize(deserializer)?;
    Ok(if page >= 1 { page } else { DEFAULT_PAGE })
}

/// Deserialize `perPage`, degrading zero to the default
fn de_per_page<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let per_page = u32::deserialize(deserializer)?;
    Ok(if per_page >= 1 { per_page } else { DEFAULT_PER_PAGE })
}

impl Default for TableRequest {
    fn default() -> Self {
        Self {
            sort: None,
            search: IndexMap::new(),
            filter: IndexMap::new(),
            columns: None,
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl TableRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a decoded query string as key/value pairs
    ///
    /// Understands the bracketed key convention the payload contract names:
    /// `search[name]=foo`, `filter[color]=blue`, `filter[color][]=blue`
    /// (repeatable), and `columns[]=id` (repeatable). Scalar and sequence
    /// forms of the same filter key may not be mixed; the last shape wins.
    pub fn from_query_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut request = Self::default();

        for (key, value) in pairs {
            match key {
                "sort" if !value.is_empty() => request.sort = Some(value.to_string()),
                "page" => {
                    request.page = value.parse().ok().filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE);
                }
                "perPage" => {
                    request.per_page = value
                        .parse()
                        .ok()
                        .filter(|p| *p >= 1)
                        .unwrap_or(DEFAULT_PER_PAGE);
                }
                "columns[]" => {
                    request
                        .columns
                        .get_or_insert_with(Vec::new)
                        .push(value.to_string());
                }
                _ => {
                    if let Some((base, inner, sequence)) = split_bracketed(key) {
                        match base {
                            "search" => {
                                request.search.insert(inner.to_string(), value.to_string());
                            }
                            "filter" if sequence => {
                                let entry = request
                                    .filter
                                    .entry(inner.to_string())
                                    .or_insert_with(|| Value::Array(Vec::new()));
                                if let Value::Array(items) = entry {
                                    items.push(Value::String(value.to_string()));
                                } else {
                                    *entry = Value::Array(vec![Value::String(value.to_string())]);
                                }
                            }
                            "filter" => {
                                request
                                    .filter
                                    .insert(inner.to_string(), Value::String(value.to_string()));
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        request
    }

    /// Whether the request carries a whole-table search value
    pub fn has_global_search(&self) -> bool {
        self.search.contains_key(GLOBAL_SEARCH_KEY)
    }

    /// The whole-table search value, when present
    pub fn global_search(&self) -> Option<&str> {
        self.search.get(GLOBAL_SEARCH_KEY).map(String::as_str)
    }

    /// Row offset of the requested page
    pub fn offset(&self) -> i64 {
        (i64::from(self.page.max(1)) - 1) * i64::from(self.per_page)
    }

    // Fluent setters, mainly for resource callers and tests.

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_search(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.search.insert(field.into(), value.into());
        self
    }

    pub fn with_global_search(self, value: impl Into<String>) -> Self {
        self.with_search(GLOBAL_SEARCH_KEY, value)
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(key.into(), value.into());
        self
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }
}

/// Split `base[inner]` or `base[inner][]` into its parts
fn split_bracketed(key: &str) -> Option<(&str, &str, bool)> {
    let open = key.find('[')?;
    let base = &key[..open];
    let rest = &key[open..];

    let (inner_part, sequence) = match rest.strip_suffix("[]") {
        Some(head) => (head, true),
        None => (rest, false),
    };

    let inner = inner_part.strip_prefix('[')?.strip_suffix(']')?;
    if base.is_empty() || inner.is_empty() {
        return None;
    }
    Some((base, inner, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // =========================================================================
    // Defaults and Fluent Setters
    // =========================================================================

    #[test]
    fn test_defaults() {
        let request = TableRequest::default();
        assert!(request.sort.is_none());
        assert!(request.search.is_empty());
        assert!(request.filter.is_empty());
        assert!(request.columns.is_none());
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, 15);
    }

    #[test]
    fn test_offset() {
        assert_eq!(TableRequest::default().offset(), 0);
        assert_eq!(TableRequest::default().with_page(3).offset(), 30);
        assert_eq!(
            TableRequest::default().with_page(2).with_per_page(50).offset(),
            50
        );
    }

    #[test]
    fn test_fluent_setters_clamp() {
        let request = TableRequest::default().with_page(0).with_per_page(0);
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, 1);
    }

    #[test]
    fn test_global_search_helpers() {
        let request = TableRequest::default().with_global_search("1");
        assert!(request.has_global_search());
        assert_eq!(request.global_search(), Some("1"));

        let plain = TableRequest::default().with_search("name", "foo");
        assert!(!plain.has_global_search());
    }

    // =========================================================================
    // Query-Pair Parsing
    // =========================================================================

    #[test]
    fn test_parse_scalar_keys() {
        let request = TableRequest::from_query_pairs([
            ("sort", "-name"),
            ("page", "2"),
            ("perPage", "25"),
        ]);

        assert_eq!(request.sort.as_deref(), Some("-name"));
        assert_eq!(request.page, 2);
        assert_eq!(request.per_page, 25);
    }

    #[test]
    fn test_parse_bracketed_search_and_filter() {
        let request = TableRequest::from_query_pairs([
            ("search[global]", "widgets"),
            ("search[name]", "foo"),
            ("filter[color]", "blue"),
        ]);

        assert_eq!(request.global_search(), Some("widgets"));
        assert_eq!(request.search.get("name").unwrap(), "foo");
        assert_eq!(request.filter.get("color").unwrap(), &json!("blue"));
    }

    #[test]
    fn test_parse_filter_sequence() {
        let request = TableRequest::from_query_pairs([
            ("filter[color][]", "blue"),
            ("filter[color][]", "red"),
        ]);

        assert_eq!(request.filter.get("color").unwrap(), &json!(["blue", "red"]));
    }

    #[test]
    fn test_parse_columns() {
        let request =
            TableRequest::from_query_pairs([("columns[]", "id"), ("columns[]", "name")]);

        assert_eq!(
            request.columns,
            Some(vec!["id".to_string(), "name".to_string()])
        );
    }

    #[test]
    fn test_malformed_numbers_degrade_to_defaults() {
        let request = TableRequest::from_query_pairs([
            ("page", "abc"),
            ("perPage", "-5"),
        ]);

        assert_eq!(request.page, DEFAULT_PAGE);
        assert_eq!(request.per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_unrecognized_keys_are_ignored() {
        let request = TableRequest::from_query_pairs([
            ("unknown", "x"),
            ("filter[", "y"),
            ("[color]", "z"),
        ]);

        assert!(request.filter.is_empty());
        assert!(request.search.is_empty());
    }

    // =========================================================================
    // Deserialization
    // =========================================================================

    #[test]
    fn test_deserialize_from_json_body() {
        let request: TableRequest = serde_json::from_value(json!({
            "sort": "-name",
            "search": {"global": "foo"},
            "filter": {"color": ["blue", "red"]},
            "perPage": 50
        }))
        .unwrap();

        assert_eq!(request.sort.as_deref(), Some("-name"));
        assert_eq!(request.global_search(), Some("foo"));
        assert_eq!(request.per_page, 50);
        assert_eq!(request.page, 1);
    }

    #[test]
    fn test_deserialize_zero_page_sizes_degrade_to_defaults() {
        let request: TableRequest = serde_json::from_value(json!({
            "page": 0,
            "perPage": 0
        }))
        .unwrap();

        assert_eq!(request.page, DEFAULT_PAGE);
        assert_eq!(request.per_page, DEFAULT_PER_PAGE);
    }
}

//! Table payload building
//!
//! Transforms the declared fields and filters plus the live request state
//! into the serializable descriptor a table UI consumes: columns with
//! enabled flags, search rows with current values, filter states, and
//! pagination metadata. Pure and deterministic: identical inputs produce
//! byte-identical serialized output, helped by insertion-ordered maps
//! everywhere on the wire.
//!
//! Empty collections serialize as `{}`, not `[]`; consumers expect a keyed
//! object shape even when no items are declared.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::fields::FieldCollection;
use crate::filters::FilterCollection;
use crate::request::{GLOBAL_SEARCH_KEY, TableRequest};

/// One page of records with pagination metadata
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<Value>,
    pub total: i64,
    pub current_page: u32,
    pub per_page: u32,
    pub last_page: u32,
}

impl Page {
    pub fn new(items: Vec<Value>, total: i64, current_page: u32, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let last_page = if total <= 0 {
            1
        } else {
            ((total + i64::from(per_page) - 1) / i64::from(per_page)) as u32
        };
        Self {
            items,
            total,
            current_page,
            per_page,
            last_page,
        }
    }
}

/// Column state in the descriptor
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ColumnEntry {
    pub key: String,
    pub label: String,
    pub enabled: bool,
}

/// Search row state in the descriptor
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchEntry {
    pub key: String,
    pub label: String,
    pub value: Option<String>,
    pub enabled: bool,
}

/// Serializable UI state for the current request
///
/// Declaration order drives the member order of every map; a column is
/// never removed for being disabled, only flagged.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableDescriptor {
    pub sort: Option<String>,
    pub page: u32,
    pub columns: IndexMap<String, ColumnEntry>,
    pub search: IndexMap<String, SearchEntry>,
    pub filters: IndexMap<String, Value>,
    pub downloadable: bool,
    pub download: u8,
}

/// Build the descriptor from declarations and the live request state
///
/// The filter transform reuses each filter's own acceptance decision, so a
/// value the apply stage would silently drop is also absent from the
/// descriptor, and the filter shows its declared default instead.
pub fn build_payload(
    fields: &FieldCollection,
    filters: &FilterCollection,
    request: &TableRequest,
    global_search_enabled: bool,
    downloadable: bool,
) -> TableDescriptor {
    let mut columns = IndexMap::new();
    for field in fields.iter() {
        let enabled = match &request.columns {
            Some(allowed) => allowed.contains(&field.attribute),
            None => true,
        };
        columns.insert(
            field.attribute.clone(),
            ColumnEntry {
                key: field.attribute.clone(),
                label: field.label.clone(),
                enabled,
            },
        );
    }

    let mut search = IndexMap::new();
    if global_search_enabled {
        search.insert(
            GLOBAL_SEARCH_KEY.to_string(),
            SearchEntry {
                key: GLOBAL_SEARCH_KEY.to_string(),
                label: GLOBAL_SEARCH_KEY.to_string(),
                value: None,
                enabled: false,
            },
        );
    }
    for field in fields.searchable() {
        search.insert(
            field.attribute.clone(),
            SearchEntry {
                key: field.attribute.clone(),
                label: field.label.clone(),
                value: None,
                enabled: false,
            },
        );
    }
    for (key, value) in &request.search {
        if value.is_empty() {
            continue;
        }
        if let Some(entry) = search.get_mut(key) {
            entry.value = Some(value.clone());
            entry.enabled = true;
        }
    }

    let mut filter_states = IndexMap::new();
    for filter in filters.iter() {
        let live = request
            .filter
            .get(filter.key())
            .and_then(|raw| filter.accepts(raw));
        filter_states.insert(filter.key().to_string(), filter.describe(live.as_ref()));
    }

    TableDescriptor {
        sort: request.sort.clone(),
        page: request.page,
        columns,
        search,
        filters: filter_states,
        downloadable,
        download: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::fields::Field;
    use crate::filters::SelectFilter;

    fn fields() -> FieldCollection {
        FieldCollection::from(vec![
            Field::new("id").sortable(),
            Field::new("name").searchable(),
            Field::new("email").searchable(),
        ])
    }

    fn color_filters() -> FilterCollection {
        FilterCollection::from(vec![
            SelectFilter::new("colors")
                .options([("blue", "blue"), ("red", "red"), ("green", "green")])
                .default_value("green")
                .into(),
        ])
    }

    // =========================================================================
    // Column Transform
    // =========================================================================

    #[test]
    fn test_columns_enabled_without_allow_set() {
        let descriptor = build_payload(
            &fields(),
            &FilterCollection::new(),
            &TableRequest::default(),
            true,
            false,
        );

        assert!(descriptor.columns.values().all(|c| c.enabled));
        let keys: Vec<&String> = descriptor.columns.keys().collect();
        assert_eq!(keys, ["id", "name", "email"]);
    }

    #[test]
    fn test_allow_set_flags_columns_without_removing() {
        let request = TableRequest::default().with_columns(["id", "name"]);
        let descriptor =
            build_payload(&fields(), &FilterCollection::new(), &request, true, false);

        assert_eq!(descriptor.columns.len(), 3);
        assert!(descriptor.columns["id"].enabled);
        assert!(descriptor.columns["name"].enabled);
        assert!(!descriptor.columns["email"].enabled);
    }

    // =========================================================================
    // Search Transform
    // =========================================================================

    #[test]
    fn test_global_entry_is_prepended() {
        let descriptor = build_payload(
            &fields(),
            &FilterCollection::new(),
            &TableRequest::default(),
            true,
            false,
        );

        let keys: Vec<&String> = descriptor.search.keys().collect();
        assert_eq!(keys, ["global", "name", "email"]);
        assert_eq!(descriptor.search["global"].value, None);
    }

    #[test]
    fn test_global_entry_absent_when_disabled() {
        let descriptor = build_payload(
            &fields(),
            &FilterCollection::new(),
            &TableRequest::default(),
            false,
            false,
        );

        assert!(!descriptor.search.contains_key("global"));
        assert_eq!(descriptor.search.len(), 2);
    }

    #[test]
    fn test_request_search_values_fill_rows() {
        let request = TableRequest::default()
            .with_global_search("widgets")
            .with_search("name", "foo");
        let descriptor =
            build_payload(&fields(), &FilterCollection::new(), &request, true, false);

        assert_eq!(descriptor.search["global"].value.as_deref(), Some("widgets"));
        assert!(descriptor.search["global"].enabled);
        assert_eq!(descriptor.search["name"].value.as_deref(), Some("foo"));
        assert!(descriptor.search["name"].enabled);
        assert!(!descriptor.search["email"].enabled);
    }

    #[test]
    fn test_unknown_search_key_is_ignored() {
        let request = TableRequest::default().with_search("unknown", "x");
        let descriptor =
            build_payload(&fields(), &FilterCollection::new(), &request, true, false);

        assert!(!descriptor.search.contains_key("unknown"));
    }

    // =========================================================================
    // Filter Transform
    // =========================================================================

    #[test]
    fn test_filter_live_value_set_when_member() {
        let request = TableRequest::default().with_filter("colors", json!("blue"));
        let descriptor = build_payload(&fields(), &color_filters(), &request, true, false);

        assert_eq!(descriptor.filters["colors"]["value"], json!("blue"));
    }

    #[test]
    fn test_filter_keeps_default_on_non_member_value() {
        let request = TableRequest::default().with_filter("colors", json!("purple"));
        let descriptor = build_payload(&fields(), &color_filters(), &request, true, false);

        // Declared default survives; no error raised
        assert_eq!(descriptor.filters["colors"]["value"], json!("green"));
    }

    // =========================================================================
    // Serialization Shape
    // =========================================================================

    #[test]
    fn test_empty_maps_serialize_as_objects() {
        let descriptor = build_payload(
            &FieldCollection::new(),
            &FilterCollection::new(),
            &TableRequest::default(),
            false,
            false,
        );

        let serialized = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(serialized["columns"], json!({}));
        assert_eq!(serialized["search"], json!({}));
        assert_eq!(serialized["filters"], json!({}));
        assert_eq!(serialized["download"], json!(0));
        assert_eq!(serialized["downloadable"], json!(false));
    }

    #[test]
    fn test_payload_contract_fields() {
        let request = TableRequest::default().with_sort("-name").with_page(2);
        let descriptor = build_payload(&fields(), &color_filters(), &request, true, true);

        let serialized = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(serialized["sort"], json!("-name"));
        assert_eq!(serialized["page"], json!(2));
        assert_eq!(serialized["downloadable"], json!(true));
        assert_eq!(
            serialized["columns"]["id"],
            json!({"key": "id", "label": "Id", "enabled": true})
        );
    }

    #[test]
    fn test_payload_is_idempotent() {
        let request = TableRequest::default()
            .with_sort("-name")
            .with_search("name", "foo")
            .with_filter("colors", json!("red"))
            .with_columns(["id"]);

        let first = serde_json::to_string(&build_payload(
            &fields(),
            &color_filters(),
            &request,
            true,
            true,
        ))
        .unwrap();
        let second = serde_json::to_string(&build_payload(
            &fields(),
            &color_filters(),
            &request,
            true,
            true,
        ))
        .unwrap();

        assert_eq!(first, second);
    }

    // =========================================================================
    // Page
    // =========================================================================

    #[test]
    fn test_page_last_page_rounds_up() {
        let page = Page::new(vec![], 31, 1, 15);
        assert_eq!(page.last_page, 3);
    }

    #[test]
    fn test_page_exact_multiple_does_not_round_up() {
        let page = Page::new(vec![], 30, 2, 15);
        assert_eq!(page.last_page, 2);
    }

    #[test]
    fn test_page_empty_total_has_one_page() {
        let page = Page::new(vec![], 0, 1, 15);
        assert_eq!(page.last_page, 1);
    }

    #[test]
    fn test_page_serializes_camel_case() {
        let page = Page::new(vec![json!({"id": 1})], 1, 1, 15);
        let serialized = serde_json::to_value(&page).unwrap();

        assert_eq!(serialized["currentPage"], json!(1));
        assert_eq!(serialized["perPage"], json!(15));
        assert_eq!(serialized["lastPage"], json!(1));
        assert_eq!(serialized["total"], json!(1));
    }
}

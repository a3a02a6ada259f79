//! Resource - staged query composition over one request lifecycle
//!
//! A `Resource` declares the queryable surface of one table: its fields,
//! filters, sort defaults, and hooks. Per request it walks a fixed stage
//! order, each stage conditionally mutating the query:
//!
//! 1. default sort (hook, or synthesized sort parameter)
//! 2. explicit sort from the request
//! 3. global-filter hook
//! 4. registered parameter filters
//! 5. per-field search
//! 6. declared filters
//!
//! Filter-rule validation runs before stage 1; a failure there leaves the
//! query untouched. Every other anomaly (unknown sort field, unknown search
//! field, non-member filter value) is a silent no-op, never an error.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo};
use tracing::debug;

use crate::error::{Result, TableError};
use crate::fields::{Field, FieldCollection};
use crate::filters::{Filter, FilterCollection};
use crate::payload::{Page, TableDescriptor, build_payload};
use crate::query::{Driver, SelectQuery};
use crate::request::TableRequest;
use crate::sql::sanitize::validate_identifier;

type GlobalFilterFn = Box<dyn Fn(&mut SelectQuery, &str) + Send + Sync>;
type ParameterFilterFn = Box<dyn Fn(&mut SelectQuery, &Value) + Send + Sync>;
type DefaultSortFn = Box<dyn Fn(&mut SelectQuery) + Send + Sync>;

/// How a resource sorts when the request specifies nothing
pub enum DefaultSort {
    None,
    /// Synthesize a sort parameter for the explicit-sort stage to consume
    Attribute(String),
    /// Imperative ordering applied directly to the query
    Hook(DefaultSortFn),
}

impl fmt::Debug for DefaultSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "DefaultSort::None"),
            Self::Attribute(attr) => write!(f, "DefaultSort::Attribute({:?})", attr),
            Self::Hook(_) => write!(f, "DefaultSort::Hook"),
        }
    }
}

/// A declared table resource: fields, filters, hooks, and pagination config
pub struct Resource {
    table: String,
    driver: Driver,
    fields: FieldCollection,
    filters: FilterCollection,
    default_sort: DefaultSort,
    global_filter: Option<GlobalFilterFn>,
    parameters: IndexMap<String, Value>,
    parameter_filters: IndexMap<String, ParameterFilterFn>,
    global_search_enabled: bool,
    downloadable: bool,
}

impl Resource {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            driver: Driver::Postgres,
            fields: FieldCollection::new(),
            filters: FilterCollection::new(),
            default_sort: DefaultSort::Attribute("id".to_string()),
            global_filter: None,
            parameters: IndexMap::new(),
            parameter_filters: IndexMap::new(),
            global_search_enabled: true,
            downloadable: false,
        }
    }

    /// Select the connection driver the query renders for
    pub fn driver(mut self, driver: Driver) -> Self {
        self.driver = driver;
        self
    }

    /// Declare a field
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare fields in bulk
    pub fn fields(mut self, fields: Vec<Field>) -> Self {
        for field in fields {
            self.fields.push(field);
        }
        self
    }

    /// Declare a filter
    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Declare filters in bulk
    pub fn filters(mut self, filters: Vec<Filter>) -> Self {
        for filter in filters {
            self.filters.push(filter);
        }
        self
    }

    /// Sort by this attribute when the request specifies no sort
    pub fn default_sort(mut self, attribute: impl Into<String>) -> Self {
        self.default_sort = DefaultSort::Attribute(attribute.into());
        self
    }

    /// Apply a custom ordering when the request specifies no sort
    pub fn default_sort_with<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut SelectQuery) + Send + Sync + 'static,
    {
        self.default_sort = DefaultSort::Hook(Box::new(hook));
        self
    }

    /// Leave the query unordered when the request specifies no sort
    pub fn no_default_sort(mut self) -> Self {
        self.default_sort = DefaultSort::None;
        self
    }

    /// Hook invoked with the `search[global]` value when one is present
    pub fn global_filter<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut SelectQuery, &str) + Send + Sync + 'static,
    {
        self.global_filter = Some(Box::new(hook));
        self
    }

    /// Attach an out-of-band parameter, typically from the route
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Attach parameters in bulk
    pub fn parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in parameters {
            self.parameters.insert(key.into(), value.into());
        }
        self
    }

    /// Register the filter hook for a parameter key
    ///
    /// An explicit registration map: the hook runs during the
    /// parameter-filter stage when its key is present in `parameters`.
    pub fn parameter_filter<F>(mut self, key: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&mut SelectQuery, &Value) + Send + Sync + 'static,
    {
        self.parameter_filters.insert(key.into(), Box::new(hook));
        self
    }

    /// Disable the synthetic global search row in the payload
    pub fn disable_global_search(mut self) -> Self {
        self.global_search_enabled = false;
        self
    }

    /// Mark the table as downloadable in the payload
    pub fn downloadable(mut self) -> Self {
        self.downloadable = true;
        self
    }

    pub fn parameter_value(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// Contract checks on the declarations themselves
    ///
    /// Declaration mistakes (missing table, unusable identifiers) surface
    /// here as configuration errors before any stage runs.
    fn check_declarations(&self) -> Result<()> {
        validate_identifier(&self.table)
            .map_err(|e| TableError::configuration(format!("Invalid table name: {}", e)))?;

        for field in self.fields.iter() {
            validate_identifier(&field.attribute).map_err(|e| {
                TableError::configuration(format!("Invalid field attribute: {}", e))
            })?;
        }

        for filter in self.filters.iter() {
            validate_identifier(filter.key())
                .map_err(|e| TableError::configuration(format!("Invalid filter key: {}", e)))?;
        }

        Ok(())
    }

    /// Compose the query for one request
    ///
    /// Runs the stages in their fixed order. Filter-rule validation happens
    /// first; when it fails, the returned error carries every failing field
    /// and no predicate has been applied.
    pub fn build_query(&self, request: &TableRequest) -> Result<SelectQuery> {
        self.check_declarations()?;
        self.filters.validate_filter_input(&request.filter)?;

        let mut query = SelectQuery::new(&self.table, self.driver);

        self.apply_sort(request, &mut query);
        self.apply_global_filter(request, &mut query);
        self.apply_parameter_filters(&mut query);
        self.apply_search(request, &mut query);
        self.filters.apply(request, &mut query);

        Ok(query)
    }

    /// Stages 1 and 2: default sort, then explicit sort
    ///
    /// A configured default attribute is synthesized into a sort parameter
    /// so both paths flow through the same field matching.
    fn apply_sort(&self, request: &TableRequest, query: &mut SelectQuery) {
        let sort = match &request.sort {
            Some(sort) => Some(sort.clone()),
            None => match &self.default_sort {
                DefaultSort::Attribute(attribute) => Some(attribute.clone()),
                DefaultSort::Hook(hook) => {
                    hook(query);
                    None
                }
                DefaultSort::None => None,
            },
        };

        let Some(sort) = sort else { return };

        let descending = sort.starts_with('-');
        let attribute = sort.strip_prefix('-').unwrap_or(&sort);

        match self.fields.get(attribute) {
            Some(field) if field.sortable => {
                field.sort_strategy.apply(query, descending, attribute);
            }
            _ => debug!(sort = attribute, "sort target not a sortable field, skipping"),
        }
    }

    /// Stage 3: resource-defined whole-table filter
    fn apply_global_filter(&self, request: &TableRequest, query: &mut SelectQuery) {
        if let (Some(hook), Some(value)) = (&self.global_filter, request.global_search()) {
            hook(query, value);
        }
    }

    /// Stage 4: registered per-parameter filter hooks, in declaration order
    fn apply_parameter_filters(&self, query: &mut SelectQuery) {
        for (key, value) in &self.parameters {
            if let Some(hook) = self.parameter_filters.get(key) {
                hook(query, value);
            } else {
                debug!(parameter = key.as_str(), "no filter registered for parameter");
            }
        }
    }

    /// Stage 5: case-insensitive substring search on declared searchable
    /// fields
    fn apply_search(&self, request: &TableRequest, query: &mut SelectQuery) {
        for field in self.fields.searchable() {
            if let Some(value) = request.search.get(&field.attribute) {
                if !value.is_empty() {
                    query.where_like(&field.attribute, value);
                }
            }
        }
    }

    /// Compose, execute, and page the query against the pool
    pub async fn paginate(&self, pool: &PgPool, request: &TableRequest) -> Result<Page> {
        let query = self.build_query(request)?;

        let count_sql = query.count_sql();
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for param in query.params() {
            count_query = bind_scalar_value(count_query, param);
        }
        let total = count_query.fetch_one(pool).await?;

        let select_sql = query.select_sql(&[], i64::from(request.per_page), request.offset());
        let mut select_query = sqlx::query(&select_sql);
        for param in query.params() {
            select_query = bind_value(select_query, param);
        }
        let rows = select_query.fetch_all(pool).await?;

        let items = rows.iter().map(row_to_json).collect();

        Ok(Page::new(items, total, request.page, request.per_page))
    }

    /// Build the UI descriptor for the current request state
    pub fn descriptor(&self, request: &TableRequest) -> TableDescriptor {
        build_payload(
            &self.fields,
            &self.filters,
            request,
            self.global_search_enabled,
            self.downloadable,
        )
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("table", &self.table)
            .field("driver", &self.driver)
            .field("fields", &self.fields.len())
            .field("filters", &self.filters.len())
            .field("default_sort", &self.default_sort)
            .finish_non_exhaustive()
    }
}

/// Bind one composed parameter with its natural Postgres type
fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::String(s) => query.bind(s.as_str()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::Bool(b) => query.bind(*b),
        Value::Null => query.bind(Option::<String>::None),
        other => query.bind(other.clone()),
    }
}

/// Same as `bind_value` for the scalar count query
fn bind_scalar_value<'q>(
    query: sqlx::query::QueryScalar<'q, Postgres, i64, PgArguments>,
    value: &'q Value,
) -> sqlx::query::QueryScalar<'q, Postgres, i64, PgArguments> {
    match value {
        Value::String(s) => query.bind(s.as_str()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::Bool(b) => query.bind(*b),
        Value::Null => query.bind(Option::<String>::None),
        other => query.bind(other.clone()),
    }
}

/// Decode a fetched row into a JSON object keyed by column name
///
/// Column types are resolved from the row metadata; anything the decoder
/// does not recognize becomes null rather than failing the page.
fn row_to_json(row: &PgRow) -> Value {
    let mut object = serde_json::Map::new();

    for (index, column) in row.columns().iter().enumerate() {
        let value = match column.type_info().name() {
            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
                .try_get::<Option<String>, _>(index)
                .ok()
                .flatten()
                .map(Value::String),
            "INT2" => row
                .try_get::<Option<i16>, _>(index)
                .ok()
                .flatten()
                .map(|v| Value::from(i64::from(v))),
            "INT4" => row
                .try_get::<Option<i32>, _>(index)
                .ok()
                .flatten()
                .map(|v| Value::from(i64::from(v))),
            "INT8" => row
                .try_get::<Option<i64>, _>(index)
                .ok()
                .flatten()
                .map(Value::from),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(index)
                .ok()
                .flatten()
                .and_then(|v| serde_json::Number::from_f64(f64::from(v)))
                .map(Value::Number),
            "FLOAT8" => row
                .try_get::<Option<f64>, _>(index)
                .ok()
                .flatten()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            "BOOL" => row
                .try_get::<Option<bool>, _>(index)
                .ok()
                .flatten()
                .map(Value::Bool),
            "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(index).ok().flatten(),
            "TIMESTAMPTZ" => row
                .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
                .ok()
                .flatten()
                .map(|v| Value::String(v.to_rfc3339())),
            "TIMESTAMP" => row
                .try_get::<Option<chrono::NaiveDateTime>, _>(index)
                .ok()
                .flatten()
                .map(|v| Value::String(v.to_string())),
            _ => row
                .try_get::<Option<String>, _>(index)
                .ok()
                .flatten()
                .map(Value::String),
        };

        object.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }

    Value::Object(object)
}

//! # table-resource
//!
//! Request-driven query composition and table payload building for SQL
//! data tables.
//!
//! This crate translates untrusted table-state request parameters (sort,
//! search, filters, column selection, pagination) into a safe, fully
//! parameterized SQL query plus a serializable descriptor of the table UI
//! state. Declarations are made once per resource; every request is then
//! checked against them, so unknown sorts and non-member filter values can
//! never reach the database.
//!
//! ## Features
//!
//! - **Declarative Fields and Filters**: Columns, search targets, text and
//!   select filters declared fluently per resource
//! - **Staged Query Composition**: Sort, global filter, parameter filters,
//!   search, and declared filters applied in a fixed order
//! - **Validation Before Mutation**: Declared rules are checked up front
//!   and failures aggregate per field before any query state changes
//! - **SQL Injection Prevention**: All identifiers are validated and
//!   quoted; all values are bound as parameters
//! - **UI Descriptor Payload**: Deterministic, insertion-ordered JSON
//!   state for table frontends
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use table_resource::{Field, Resource, SelectFilter, TableRequest, TextFilter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = sqlx::PgPool::connect("postgres://localhost/mydb").await?;
//!
//!     let users = Resource::new("users")
//!         .fields(vec![
//!             Field::new("id").sortable(),
//!             Field::new("name").sortable().searchable(),
//!             Field::new("email").searchable(),
//!         ])
//!         .filter(TextFilter::new("email").starts_with())
//!         .filter(SelectFilter::new("status").options([
//!             ("active", "Active"),
//!             ("suspended", "Suspended"),
//!         ]));
//!
//!     // Typically parsed from the incoming query string
//!     let request = TableRequest::from_query_pairs([
//!         ("sort", "-name"),
//!         ("search[global]", "widgets"),
//!         ("filter[status]", "active"),
//!         ("page", "2"),
//!     ]);
//!
//!     let page = users.paginate(&pool, &request).await?;
//!     let descriptor = users.descriptor(&request);
//!
//!     println!("{} of {} rows", page.items.len(), page.total);
//!     println!("{}", serde_json::to_string(&descriptor)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Rejection Policies
//!
//! Two distinct policies coexist. A value that fails a declared validation
//! rule raises [`TableError::Validation`] with every failure aggregated. A
//! select value outside the declared options is silently ignored: no
//! predicate, no error, and the descriptor shows the filter's default.

pub mod error;
pub mod fields;
pub mod filters;
pub mod payload;
pub mod query;
pub mod request;
pub mod resource;
pub mod sql;
pub mod validate;

// Re-export main types for convenience
pub use error::{Result, TableError, ValidationErrors};
pub use fields::{Field, FieldCollection, SortStrategy};
pub use filters::{Filter, FilterCollection, MatchMode, SelectFilter, TextFilter};
pub use payload::{ColumnEntry, Page, SearchEntry, TableDescriptor};
pub use query::{Driver, SelectQuery};
pub use request::{DEFAULT_PAGE, DEFAULT_PER_PAGE, GLOBAL_SEARCH_KEY, TableRequest};
pub use resource::{DefaultSort, Resource};

// Re-export SQL utilities for advanced users
pub use sql::{quote_identifier, validate_identifier};

//! SQL rendering utilities
//!
//! Identifier quoting/validation and the `SelectQuery` renderer live here.
//! All predicate values are bound through `$n` placeholders; identifiers are
//! validated against declarations and quoted before they reach a statement.

pub mod sanitize;

pub use sanitize::{quote_identifier, validate_identifier};

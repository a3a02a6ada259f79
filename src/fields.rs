//! Field declarations for table resources
//!
//! A `Field` is a declared column exposed for display, sorting, and/or
//! per-field search. Fields are built fluently during resource setup and are
//! read-only at request time.

use std::fmt;

use indexmap::IndexMap;

use crate::query::SelectQuery;

/// Derive a display label from an attribute name: `first_name` -> `First Name`
pub(crate) fn humanize(attribute: &str) -> String {
    attribute
        .split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// How a sortable field applies its order clause
pub enum SortStrategy {
    /// Order by the column itself
    Column,
    /// Resource-supplied ordering, invoked with (query, descending, attribute)
    Custom(Box<dyn Fn(&mut SelectQuery, bool, &str) + Send + Sync>),
}

impl SortStrategy {
    /// Apply this strategy to the query
    pub fn apply(&self, query: &mut SelectQuery, descending: bool, attribute: &str) {
        match self {
            Self::Column => query.order_by(attribute, descending),
            Self::Custom(strategy) => strategy(query, descending, attribute),
        }
    }
}

impl fmt::Debug for SortStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column => write!(f, "SortStrategy::Column"),
            Self::Custom(_) => write!(f, "SortStrategy::Custom"),
        }
    }
}

/// A declared column of a table resource
#[derive(Debug)]
pub struct Field {
    /// Column attribute name, also the key the request refers to it by
    pub attribute: String,
    /// Display label; derived from the attribute unless set explicitly
    pub label: String,
    /// Whether an explicit `sort` parameter may target this field
    pub sortable: bool,
    /// Whether per-field search may target this field
    pub searchable: bool,
    /// Ordering behavior when this field is the sort target
    pub sort_strategy: SortStrategy,
}

impl Field {
    pub fn new(attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        let label = humanize(&attribute);
        Self {
            attribute,
            label,
            sortable: false,
            searchable: false,
            sort_strategy: SortStrategy::Column,
        }
    }

    /// Override the derived display label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Allow the request to sort by this field
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Allow per-field search on this field
    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    /// Allow sorting with a custom strategy instead of a plain column order
    pub fn sortable_with<F>(mut self, strategy: F) -> Self
    where
        F: Fn(&mut SelectQuery, bool, &str) + Send + Sync + 'static,
    {
        self.sortable = true;
        self.sort_strategy = SortStrategy::Custom(Box::new(strategy));
        self
    }
}

/// Insertion-ordered collection of fields, keyed by attribute
///
/// Declaration order drives serialization order in the payload, so the
/// backing structure preserves it.
#[derive(Debug, Default)]
pub struct FieldCollection {
    fields: IndexMap<String, Field>,
}

impl FieldCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any previous declaration for the same attribute
    pub fn push(&mut self, field: Field) {
        self.fields.insert(field.attribute.clone(), field);
    }

    pub fn get(&self, attribute: &str) -> Option<&Field> {
        self.fields.get(attribute)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Fields the request may search on, in declaration order
    pub fn searchable(&self) -> impl Iterator<Item = &Field> {
        self.fields.values().filter(|f| f.searchable)
    }
}

impl From<Vec<Field>> for FieldCollection {
    fn from(fields: Vec<Field>) -> Self {
        let mut collection = Self::new();
        for field in fields {
            collection.push(field);
        }
        collection
    }
}

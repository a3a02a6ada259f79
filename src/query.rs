//! SelectQuery - the narrow query-builder capability the composer mutates
//!
//! Exposes exactly the operations the composition stages need: `where_op`,
//! `where_in`, `where_like`, `where_raw`, and `order_by`. Conditions are
//! conjunctive and rendered in the order they were added, with `$n`
//! placeholders and values collected for binding. Keeping this a concrete
//! value type lets tests assert on rendered SQL and bindings without a
//! database.

use serde_json::Value;

use crate::sql::sanitize::quote_identifier;

/// Connection driver the query renders for
///
/// Case-insensitive matching differs between drivers: PostgreSQL has a
/// native `ILIKE`, the others get a lowercase-wrapped column with `LIKE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Postgres,
    Mysql,
    Sqlite,
}

impl Driver {
    /// Resolve a connection driver name as reported by the data source
    ///
    /// Unknown names fall back to `Sqlite` semantics (no native
    /// case-insensitive operator), the conservative choice.
    pub fn from_name(name: &str) -> Self {
        match name {
            "pgsql" | "postgres" | "postgresql" => Self::Postgres,
            "mysql" | "mariadb" => Self::Mysql,
            _ => Self::Sqlite,
        }
    }

    /// Whether the driver supports a native case-insensitive LIKE
    pub fn supports_ilike(self) -> bool {
        matches!(self, Self::Postgres)
    }
}

/// A single SELECT under composition
///
/// Built up by the resource stages, then rendered to a count statement and a
/// paged select statement.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: String,
    driver: Driver,
    conditions: Vec<String>,
    params: Vec<Value>,
    order: Vec<(String, bool)>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>, driver: Driver) -> Self {
        Self {
            table: table.into(),
            driver,
            conditions: Vec::new(),
            params: Vec::new(),
            order: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Conditions added so far, in application order
    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    /// Values bound so far, in placeholder order
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Order clauses added so far as (field, descending) pairs
    pub fn order(&self) -> &[(String, bool)] {
        &self.order
    }

    fn next_placeholder(&self) -> String {
        format!("${}", self.params.len() + 1)
    }

    /// Add a comparison predicate: `"field" op $n`
    pub fn where_op(&mut self, field: &str, op: &str, value: Value) {
        let clause = format!("{} {} {}", quote_identifier(field), op, self.next_placeholder());
        self.conditions.push(clause);
        self.params.push(value);
    }

    /// Add an equality predicate: `"field" = $n`
    pub fn where_eq(&mut self, field: &str, value: Value) {
        self.where_op(field, "=", value);
    }

    /// Add a set-membership predicate: `"field" IN ($n, $n+1, ...)`
    ///
    /// Values are bound in input order.
    pub fn where_in(&mut self, field: &str, values: Vec<Value>) {
        if values.is_empty() {
            return;
        }
        let mut placeholders = Vec::with_capacity(values.len());
        for value in values {
            placeholders.push(self.next_placeholder());
            self.params.push(value);
        }
        self.conditions.push(format!(
            "{} IN ({})",
            quote_identifier(field),
            placeholders.join(", ")
        ));
    }

    /// Add a pattern predicate: `"field" LIKE $n` binding the value verbatim
    ///
    /// The caller supplies the wildcards, so prefix, suffix, and substring
    /// matches all go through here.
    pub fn where_pattern(&mut self, field: &str, pattern: impl Into<String>) {
        let clause = format!("{} LIKE {}", quote_identifier(field), self.next_placeholder());
        self.conditions.push(clause);
        self.params.push(Value::String(pattern.into()));
    }

    /// Add a driver-aware case-insensitive substring predicate
    ///
    /// PostgreSQL gets the native `ILIKE` on the raw column; drivers without
    /// it get `LOWER("field") LIKE` with a lowercased binding. The binding is
    /// lowercased either way so the two render paths match the same rows.
    pub fn where_like(&mut self, field: &str, value: &str) {
        let pattern = format!("%{}%", value.to_lowercase());
        let clause = if self.driver.supports_ilike() {
            format!("{} ILIKE {}", quote_identifier(field), self.next_placeholder())
        } else {
            format!("LOWER({}) LIKE {}", quote_identifier(field), self.next_placeholder())
        };
        self.conditions.push(clause);
        self.params.push(Value::String(pattern));
    }

    /// Add a raw predicate with `?` placeholders
    ///
    /// Each `?` is rewritten to the next `$n` placeholder. Intended for
    /// global-filter hooks that need a shape the fixed vocabulary does not
    /// cover; the clause text is the hook author's responsibility.
    pub fn where_raw(&mut self, clause: &str, params: Vec<Value>) {
        let mut rewritten = String::with_capacity(clause.len());
        let mut remaining = clause;
        for value in params {
            match remaining.find('?') {
                Some(pos) => {
                    rewritten.push_str(&remaining[..pos]);
                    rewritten.push_str(&self.next_placeholder());
                    remaining = &remaining[pos + 1..];
                    self.params.push(value);
                }
                None => break,
            }
        }
        rewritten.push_str(remaining);
        self.conditions.push(rewritten);
    }

    /// Add an order clause
    pub fn order_by(&mut self, field: &str, descending: bool) {
        self.order.push((field.to_string(), descending));
    }

    fn where_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    fn order_sql(&self) -> String {
        if self.order.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = self
            .order
            .iter()
            .map(|(field, descending)| {
                format!(
                    "{} {}",
                    quote_identifier(field),
                    if *descending { "DESC" } else { "ASC" }
                )
            })
            .collect();
        format!(" ORDER BY {}", parts.join(", "))
    }

    /// Render the paged select statement
    ///
    /// An empty column list selects `*`.
    pub fn select_sql(&self, columns: &[String], limit: i64, offset: i64) -> String {
        let column_sql = if columns.is_empty() {
            "*".to_string()
        } else {
            columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
            column_sql,
            quote_identifier(&self.table),
            self.where_sql(),
            self.order_sql(),
            limit,
            offset
        )
    }

    /// Render the matching count statement (no order, no page window)
    pub fn count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM {}{}",
            quote_identifier(&self.table),
            self.where_sql()
        )
    }
}

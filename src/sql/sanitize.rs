//! SQL identifier sanitization
//!
//! Column and table names in this crate come from resource declarations, not
//! from the request, but they still pass through validation and quoting
//! before being rendered into a statement.

use regex::Regex;

/// Reserved keywords that are rejected as bare column or table names.
///
/// Not the full reserved list of any one engine; these are the words shared
/// across the drivers this crate targets that break an unquoted identifier.
pub const RESERVED_WORDS: &[&str] = &[
    "ALL", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN", "CREATE",
    "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXISTS", "FALSE", "FOR",
    "FROM", "GROUP", "HAVING", "IN", "INSERT", "INTO", "IS", "JOIN", "LIKE", "LIMIT", "NOT",
    "NULL", "OFFSET", "ON", "OR", "ORDER", "PRIMARY", "SELECT", "SET", "TABLE", "THEN", "TO",
    "TRUE", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "WHEN", "WHERE", "WITH",
];

/// Quote an identifier for safe interpolation into a statement
///
/// Wraps the identifier in double quotes, doubling any embedded quote.
pub fn quote_identifier(identifier: &str) -> String {
    let escaped = identifier.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Validate a declared table or column name
///
/// Rules:
/// - Must start with a lowercase letter
/// - May contain only lowercase letters, digits, and underscores
/// - Must not be a reserved keyword
///
/// Declarations carrying names that fail this check are a programmer error;
/// the composer surfaces them as configuration errors before any stage runs.
pub fn validate_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Identifier cannot be empty".to_string());
    }

    let re = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    if !re.is_match(name) {
        return Err(format!(
            "Identifier '{}' is invalid. Must start with a lowercase letter and contain only lowercase letters, digits, and underscores.",
            name
        ));
    }

    if RESERVED_WORDS.contains(&name.to_uppercase().as_str()) {
        return Err(format!(
            "Identifier '{}' is a reserved keyword and cannot be used.",
            name
        ));
    }

    Ok(())
}

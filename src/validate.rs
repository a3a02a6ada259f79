//! Rule-string validation for filter input
//!
//! Filters declare validation as ordered rule strings (`"numeric"`,
//! `"string|max:255"`, `"in:draft,published"`). This module parses those
//! strings into checks and evaluates untrusted request input against them,
//! aggregating every failure instead of stopping at the first.
//!
//! An unknown rule string is a declaration mistake and surfaces as a
//! configuration error, distinct from input failing a valid rule.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Result, TableError, ValidationErrors};

/// A parsed validation rule
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Required,
    String,
    Numeric,
    Integer,
    Boolean,
    Array,
    Max(f64),
    Min(f64),
    In(Vec<String>),
}

impl Rule {
    /// Parse a single rule token
    pub fn parse(token: &str) -> Result<Self> {
        let (name, arg) = match token.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (token, None),
        };

        match (name, arg) {
            ("required", None) => Ok(Self::Required),
            ("string", None) => Ok(Self::String),
            ("numeric", None) => Ok(Self::Numeric),
            ("integer", None) => Ok(Self::Integer),
            ("boolean", None) => Ok(Self::Boolean),
            ("array", None) => Ok(Self::Array),
            ("max", Some(arg)) => arg
                .parse()
                .map(Self::Max)
                .map_err(|_| TableError::configuration(format!("Invalid max rule argument: '{}'", arg))),
            ("min", Some(arg)) => arg
                .parse()
                .map(Self::Min)
                .map_err(|_| TableError::configuration(format!("Invalid min rule argument: '{}'", arg))),
            ("in", Some(arg)) => Ok(Self::In(arg.split(',').map(str::to_string).collect())),
            _ => Err(TableError::configuration(format!(
                "Unknown validation rule: '{}'",
                token
            ))),
        }
    }

    /// Check a present value against this rule
    ///
    /// `Required` is handled by the caller since it is the only rule that
    /// fires on an absent value.
    fn check(&self, value: &Value) -> std::result::Result<(), String> {
        match self {
            Self::Required => Ok(()),
            Self::String => match value {
                Value::String(_) => Ok(()),
                _ => Err("must be a string".to_string()),
            },
            Self::Numeric => match value {
                Value::Number(_) => Ok(()),
                Value::String(s) if s.parse::<f64>().is_ok() => Ok(()),
                _ => Err("must be numeric".to_string()),
            },
            Self::Integer => match value {
                Value::Number(n) if n.is_i64() => Ok(()),
                Value::String(s) if s.parse::<i64>().is_ok() => Ok(()),
                _ => Err("must be an integer".to_string()),
            },
            Self::Boolean => match value {
                Value::Bool(_) => Ok(()),
                Value::String(s) => match s.as_str() {
                    "true" | "false" | "0" | "1" => Ok(()),
                    _ => Err("must be a boolean".to_string()),
                },
                _ => Err("must be a boolean".to_string()),
            },
            Self::Array => match value {
                Value::Array(_) => Ok(()),
                _ => Err("must be an array".to_string()),
            },
            Self::Max(limit) => match size_of(value) {
                Some(size) if size <= *limit => Ok(()),
                Some(_) => Err(max_message(value, *limit)),
                None => Err(max_message(value, *limit)),
            },
            Self::Min(limit) => match size_of(value) {
                Some(size) if size >= *limit => Ok(()),
                Some(_) => Err(min_message(value, *limit)),
                None => Err(min_message(value, *limit)),
            },
            Self::In(allowed) => match value {
                Value::String(s) if allowed.contains(s) => Ok(()),
                Value::Number(n) if allowed.contains(&n.to_string()) => Ok(()),
                _ => Err(format!("must be one of: {}", allowed.join(", "))),
            },
        }
    }
}

/// Size used by max/min: character count for strings, magnitude for
/// numbers, element count for arrays.
fn size_of(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Number(n) => n.as_f64(),
        Value::Array(items) => Some(items.len() as f64),
        _ => None,
    }
}

fn max_message(value: &Value, limit: f64) -> String {
    match value {
        Value::String(_) => format!("must not be greater than {} characters", limit),
        Value::Array(_) => format!("must not have more than {} items", limit),
        _ => format!("must not be greater than {}", limit),
    }
}

fn min_message(value: &Value, limit: f64) -> String {
    match value {
        Value::String(_) => format!("must be at least {} characters", limit),
        Value::Array(_) => format!("must have at least {} items", limit),
        _ => format!("must be at least {}", limit),
    }
}

/// Parse declared rule strings, splitting pipe-compound declarations
///
/// `["string|max:255"]` and `["string", "max:255"]` are equivalent.
pub fn parse_rules(rules: &[String]) -> Result<Vec<Rule>> {
    let mut parsed = Vec::new();
    for declaration in rules {
        for token in declaration.split('|').filter(|t| !t.is_empty()) {
            parsed.push(Rule::parse(token)?);
        }
    }
    Ok(parsed)
}

/// Validate request input against a merged per-field rule mapping
///
/// Every failing field is collected; the call fails as a whole with the
/// aggregated set. Absent (or null) fields fail only `required`.
pub fn validate(
    input: &IndexMap<String, Value>,
    rules: &IndexMap<String, Vec<String>>,
) -> Result<()> {
    let mut errors = ValidationErrors::new();

    for (field, declarations) in rules {
        let parsed = parse_rules(declarations)?;
        let value = input.get(field).filter(|v| !v.is_null());

        match value {
            Some(value) => {
                for rule in &parsed {
                    if let Err(message) = rule.check(value) {
                        errors.add(field.clone(), message);
                    }
                }
            }
            None => {
                if parsed.contains(&Rule::Required) {
                    errors.add(field.clone(), "is required");
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TableError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules_for(field: &str, declarations: &[&str]) -> IndexMap<String, Vec<String>> {
        let mut rules = IndexMap::new();
        rules.insert(
            field.to_string(),
            declarations.iter().map(|s| s.to_string()).collect(),
        );
        rules
    }

    fn input_for(field: &str, value: Value) -> IndexMap<String, Value> {
        let mut input = IndexMap::new();
        input.insert(field.to_string(), value);
        input
    }

    // =========================================================================
    // Rule Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_simple_rules() {
        assert_eq!(Rule::parse("numeric").unwrap(), Rule::Numeric);
        assert_eq!(Rule::parse("string").unwrap(), Rule::String);
        assert_eq!(Rule::parse("max:5").unwrap(), Rule::Max(5.0));
        assert_eq!(
            Rule::parse("in:draft,published").unwrap(),
            Rule::In(vec!["draft".to_string(), "published".to_string()])
        );
    }

    #[test]
    fn test_parse_pipe_compound_declaration() {
        let parsed = parse_rules(&["string|max:255".to_string()]).unwrap();
        assert_eq!(parsed, vec![Rule::String, Rule::Max(255.0)]);
    }

    #[test]
    fn test_unknown_rule_is_configuration_error() {
        let err = Rule::parse("exists:users").unwrap_err();
        match err {
            TableError::Configuration(msg) => assert!(msg.contains("exists:users")),
            _ => panic!("Expected Configuration"),
        }
    }

    #[test]
    fn test_bad_max_argument_is_configuration_error() {
        assert!(matches!(
            Rule::parse("max:abc"),
            Err(TableError::Configuration(_))
        ));
    }

    // =========================================================================
    // Rule Check Tests
    // =========================================================================

    #[test]
    fn test_string_rule() {
        assert!(validate(&input_for("name", json!("bob")), &rules_for("name", &["string"])).is_ok());
        assert!(validate(&input_for("name", json!(42)), &rules_for("name", &["string"])).is_err());
    }

    #[test]
    fn test_numeric_rule_accepts_numeric_strings() {
        let rules = rules_for("id", &["numeric"]);
        assert!(validate(&input_for("id", json!(5)), &rules).is_ok());
        assert!(validate(&input_for("id", json!("5")), &rules).is_ok());
        assert!(validate(&input_for("id", json!("5.5")), &rules).is_ok());
        assert!(validate(&input_for("id", json!("five")), &rules).is_err());
    }

    #[test]
    fn test_integer_rule() {
        let rules = rules_for("id", &["integer"]);
        assert!(validate(&input_for("id", json!(5)), &rules).is_ok());
        assert!(validate(&input_for("id", json!("5")), &rules).is_ok());
        assert!(validate(&input_for("id", json!(5.5)), &rules).is_err());
    }

    #[test]
    fn test_max_rule_counts_string_characters() {
        let rules = rules_for("name", &["string", "max:5"]);
        assert!(validate(&input_for("name", json!("jo")), &rules).is_ok());
        assert!(validate(&input_for("name", json!("joebob")), &rules).is_err());
    }

    #[test]
    fn test_max_rule_compares_number_magnitude() {
        let rules = rules_for("age", &["numeric", "max:100"]);
        assert!(validate(&input_for("age", json!(99)), &rules).is_ok());
        assert!(validate(&input_for("age", json!(101)), &rules).is_err());
    }

    #[test]
    fn test_min_rule() {
        let rules = rules_for("name", &["min:3"]);
        assert!(validate(&input_for("name", json!("bob")), &rules).is_ok());
        assert!(validate(&input_for("name", json!("bo")), &rules).is_err());
    }

    #[test]
    fn test_in_rule() {
        let rules = rules_for("status", &["in:draft,published"]);
        assert!(validate(&input_for("status", json!("draft")), &rules).is_ok());
        assert!(validate(&input_for("status", json!("deleted")), &rules).is_err());
    }

    #[test]
    fn test_array_rule() {
        let rules = rules_for("tags", &["array", "max:2"]);
        assert!(validate(&input_for("tags", json!(["a", "b"])), &rules).is_ok());
        assert!(validate(&input_for("tags", json!(["a", "b", "c"])), &rules).is_err());
    }

    // =========================================================================
    // Absence and Aggregation Tests
    // =========================================================================

    #[test]
    fn test_absent_field_skips_non_required_rules() {
        let rules = rules_for("name", &["string", "max:5"]);
        assert!(validate(&IndexMap::new(), &rules).is_ok());
    }

    #[test]
    fn test_null_treated_as_absent() {
        let rules = rules_for("name", &["string"]);
        assert!(validate(&input_for("name", Value::Null), &rules).is_ok());
    }

    #[test]
    fn test_absent_field_fails_required() {
        let rules = rules_for("name", &["required", "string"]);
        let err = validate(&IndexMap::new(), &rules).unwrap_err();
        match err {
            TableError::Validation(errors) => {
                assert_eq!(errors.get("name").unwrap()[0], "is required");
            }
            _ => panic!("Expected Validation"),
        }
    }

    #[test]
    fn test_failures_aggregate_across_fields_and_rules() {
        let mut rules = IndexMap::new();
        rules.insert("id".to_string(), vec!["numeric".to_string()]);
        rules.insert(
            "name".to_string(),
            vec!["string".to_string(), "max:3".to_string()],
        );

        let mut input = IndexMap::new();
        input.insert("id".to_string(), json!("abc"));
        input.insert("name".to_string(), json!("joebob"));

        match validate(&input, &rules).unwrap_err() {
            TableError::Validation(errors) => {
                assert!(errors.get("id").is_some());
                assert!(errors.get("name").is_some());
            }
            _ => panic!("Expected Validation"),
        }
    }

    #[test]
    fn test_extra_input_without_rules_passes() {
        let rules = rules_for("id", &["numeric"]);
        let mut input = input_for("id", json!(1));
        input.insert("unknown".to_string(), json!("anything"));
        assert!(validate(&input, &rules).is_ok());
    }
}

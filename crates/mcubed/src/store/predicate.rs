//! The record query language: a conjunction of per-field equality terms.

use common::protocol::INSENSITIVE_SUFFIX;
use serde_json::Value;

use super::Record;

/// How a single predicate term compares string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSensitivity {
    /// Strict equality (type and value).
    Sensitive,
    /// Case-folded comparison when both sides are strings; strict otherwise.
    Insensitive,
}

/// One `(field, expected, case)` entry of a [`Predicate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub field: String,
    pub expected: Value,
    pub case: CaseSensitivity,
}

impl Term {
    fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.get(&self.field) else {
            return false;
        };
        match (self.case, actual, &self.expected) {
            (CaseSensitivity::Insensitive, Value::String(a), Value::String(e)) => {
                a.to_lowercase() == e.to_lowercase()
            }
            _ => actual == &self.expected,
        }
    }
}

/// A field-name → expected-value filter. A record matches iff every term
/// matches; the empty predicate matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<Term>,
}

impl Predicate {
    /// The empty predicate.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add a case-sensitive equality term.
    pub fn with(mut self, field: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.terms.push(Term {
            field: field.into(),
            expected: expected.into(),
            case: CaseSensitivity::Sensitive,
        });
        self
    }

    /// Add a case-insensitive equality term.
    pub fn with_ignore_case(mut self, field: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.terms.push(Term {
            field: field.into(),
            expected: expected.into(),
            case: CaseSensitivity::Insensitive,
        });
        self
    }

    /// Parse wire-level query pairs. A key ending in `-insensitive` produces a
    /// case-insensitive term on the field name without the suffix. Values stay
    /// strings: query parameters carry no type information.
    pub fn from_query<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        pairs
            .into_iter()
            .fold(Self::all(), |predicate, (key, value)| {
                let key = key.as_ref();
                match key.strip_suffix(INSENSITIVE_SUFFIX) {
                    Some(field) if !field.is_empty() => {
                        predicate.with_ignore_case(field, Value::String(value.into()))
                    }
                    _ => predicate.with(key, Value::String(value.into())),
                }
            })
    }

    /// Whether `record` satisfies every term.
    pub fn matches(&self, record: &Record) -> bool {
        self.terms.iter().all(|t| t.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_predicate_matches_everything() {
        assert!(Predicate::all().matches(&record(json!({}))));
        assert!(Predicate::all().matches(&record(json!({"a": 1}))));
    }

    #[test]
    fn insensitive_marker_folds_case_for_strings() {
        let foo = record(json!({"name": "Foo"}));
        let insensitive = Predicate::from_query([("name-insensitive", "foo")]);
        let sensitive = Predicate::from_query([("name", "foo")]);
        assert!(insensitive.matches(&foo));
        assert!(!sensitive.matches(&foo));
    }

    #[test]
    fn strict_equality_distinguishes_types() {
        let r = record(json!({"qty": 3, "flag": true}));
        assert!(Predicate::all().with("qty", 3).matches(&r));
        assert!(!Predicate::all().with("qty", "3").matches(&r));
        assert!(!Predicate::all().with_ignore_case("flag", "TRUE").matches(&r));
        assert!(Predicate::all().with_ignore_case("flag", true).matches(&r));
    }

    #[test]
    fn every_term_must_match() {
        let r = record(json!({"a": "x", "b": "y"}));
        assert!(Predicate::all().with("a", "x").with("b", "y").matches(&r));
        assert!(!Predicate::all().with("a", "x").with("b", "z").matches(&r));
    }

    #[test]
    fn missing_field_never_matches() {
        let r = record(json!({"a": "x"}));
        assert!(!Predicate::all().with("b", Value::Null).matches(&r));
    }

    #[test]
    fn bare_suffix_is_a_literal_field_name() {
        let p = Predicate::from_query([("-insensitive", "v")]);
        assert_eq!(p.terms[0].field, "-insensitive");
        assert_eq!(p.terms[0].case, CaseSensitivity::Sensitive);
    }
}

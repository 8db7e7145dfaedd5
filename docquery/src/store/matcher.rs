//! In-process evaluation of filter expressions against JSON documents.
//!
//! Semantics follow document-store conventions: equality against an array
//! field matches any element, a missing field equals `null`, range operators
//! only compare numbers with numbers and strings with strings, `$in []`
//! matches nothing and `$nin []` matches everything.

use crate::document::{get_path, Document};
use crate::error::{DocQueryError, Result};
use crate::filter::{Combinator, FieldConstraint, FilterExpression, Operator, Predicate};
use crate::pagination::{SortDirection, SortSpec};
use crate::value::{ObjectId, RegexPattern, Value};
use regex::Regex;
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::collections::HashMap;

const NEGATIVE_PREFIX: &str = "^(?!";
const NEGATIVE_SUFFIX: &str = ").*$";

/// A compiled pattern. The `regex` crate has no lookahead, so the negated
/// form `^(?!X).*$` is evaluated as "does not match `^X`", with `.` matching
/// line breaks so the exclusion covers the whole value.
#[derive(Debug)]
enum CompiledPattern {
    Match(Regex),
    Inverted(Regex),
}

impl CompiledPattern {
    fn compile(pattern: &str) -> Result<Self> {
        let compiled = match pattern
            .strip_prefix(NEGATIVE_PREFIX)
            .and_then(|rest| rest.strip_suffix(NEGATIVE_SUFFIX))
        {
            Some(inner) => Regex::new(&format!("(?s)^(?:{inner})")).map(CompiledPattern::Inverted),
            None => Regex::new(pattern).map(CompiledPattern::Match),
        };
        compiled.map_err(|e| DocQueryError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            CompiledPattern::Match(re) => re.is_match(text),
            CompiledPattern::Inverted(re) => !re.is_match(text),
        }
    }
}

/// A filter expression with its patterns compiled, ready to test documents.
#[derive(Debug)]
pub struct Matcher<'a> {
    filter: &'a FilterExpression,
    patterns: HashMap<&'a str, CompiledPattern>,
}

impl<'a> Matcher<'a> {
    /// Compile every pattern in `filter`. Fails on the first invalid one.
    pub fn new(filter: &'a FilterExpression) -> Result<Self> {
        let mut patterns = HashMap::new();
        collect_patterns(filter, &mut patterns)?;
        Ok(Matcher { filter, patterns })
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.expression_matches(self.filter, doc)
    }

    fn expression_matches(&self, expr: &FilterExpression, doc: &Document) -> bool {
        expr.predicates().iter().all(|p| self.predicate_matches(p, doc))
    }

    fn predicate_matches(&self, predicate: &Predicate, doc: &Document) -> bool {
        match predicate {
            Predicate::Field { name, constraint } => {
                self.constraint_matches(get_path(doc, name), constraint)
            }
            Predicate::Combinator {
                op: Combinator::And,
                clauses,
            } => clauses.iter().all(|c| self.expression_matches(c, doc)),
            Predicate::Combinator {
                op: Combinator::Or,
                clauses,
            } => clauses.iter().any(|c| self.expression_matches(c, doc)),
        }
    }

    fn constraint_matches(&self, actual: Option<&Json>, constraint: &FieldConstraint) -> bool {
        match constraint {
            FieldConstraint::Equals(expected) => self.equals(actual, expected),
            FieldConstraint::Pattern(re) => self.pattern_matches(actual, re),
            FieldConstraint::Operators(ops) => ops
                .iter()
                .all(|(op, operand)| self.operator_matches(actual, *op, operand)),
        }
    }

    fn operator_matches(&self, actual: Option<&Json>, op: Operator, operand: &Value) -> bool {
        match op {
            Operator::Ne => !self.equals(actual, operand),
            Operator::In => self.is_member(actual, operand),
            Operator::Nin => !self.is_member(actual, operand),
            Operator::Gt => compares(actual, operand, |o| o == Ordering::Greater),
            Operator::Gte => compares(actual, operand, |o| o != Ordering::Less),
            Operator::Lt => compares(actual, operand, |o| o == Ordering::Less),
            Operator::Lte => compares(actual, operand, |o| o != Ordering::Greater),
        }
    }

    fn is_member(&self, actual: Option<&Json>, operand: &Value) -> bool {
        match operand {
            Value::Array(candidates) => candidates.iter().any(|c| self.equals(actual, c)),
            single => self.equals(actual, single),
        }
    }

    fn equals(&self, actual: Option<&Json>, expected: &Value) -> bool {
        match (actual, expected) {
            (_, Value::Regex(re)) => self.pattern_matches(actual, re),
            (None, Value::Null) => true,
            (None, _) => false,
            (Some(json @ Json::Array(items)), _) => {
                json_equals(json, expected) || items.iter().any(|item| json_equals(item, expected))
            }
            (Some(json), _) => json_equals(json, expected),
        }
    }

    fn pattern_matches(&self, actual: Option<&Json>, re: &RegexPattern) -> bool {
        let Some(compiled) = self.patterns.get(re.as_str()) else {
            return false;
        };
        match actual {
            Some(Json::String(s)) => compiled.is_match(s),
            Some(Json::Array(items)) => items
                .iter()
                .any(|item| item.as_str().is_some_and(|s| compiled.is_match(s))),
            _ => false,
        }
    }
}

fn collect_patterns<'a>(
    expr: &'a FilterExpression,
    patterns: &mut HashMap<&'a str, CompiledPattern>,
) -> Result<()> {
    for predicate in expr.predicates() {
        match predicate {
            Predicate::Field { constraint, .. } => match constraint {
                FieldConstraint::Pattern(re) => add_pattern(re, patterns)?,
                FieldConstraint::Equals(value) => collect_value_patterns(value, patterns)?,
                FieldConstraint::Operators(ops) => {
                    for (_, value) in ops {
                        collect_value_patterns(value, patterns)?;
                    }
                }
            },
            Predicate::Combinator { clauses, .. } => {
                for clause in clauses {
                    collect_patterns(clause, patterns)?;
                }
            }
        }
    }
    Ok(())
}

fn collect_value_patterns<'a>(
    value: &'a Value,
    patterns: &mut HashMap<&'a str, CompiledPattern>,
) -> Result<()> {
    match value {
        Value::Regex(re) => add_pattern(re, patterns),
        Value::Array(items) => {
            for item in items {
                collect_value_patterns(item, patterns)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn add_pattern<'a>(
    re: &'a RegexPattern,
    patterns: &mut HashMap<&'a str, CompiledPattern>,
) -> Result<()> {
    if !patterns.contains_key(re.as_str()) {
        patterns.insert(re.as_str(), CompiledPattern::compile(re.as_str())?);
    }
    Ok(())
}

fn json_equals(json: &Json, expected: &Value) -> bool {
    match (json, expected) {
        (Json::Null, Value::Null) => true,
        (Json::Bool(a), Value::Bool(b)) => a == b,
        (Json::Number(n), Value::Int(i)) => match n.as_i64() {
            Some(a) => a == *i,
            None => n.as_f64() == Some(*i as f64),
        },
        (Json::Number(n), Value::Float(f)) => n.as_f64() == Some(*f),
        (Json::String(a), Value::String(b)) => a == b,
        (Json::Object(_), Value::ObjectId(id)) => ObjectId::from_json(json) == Some(*id),
        (Json::Array(items), Value::Array(expected)) => {
            items.len() == expected.len()
                && items.iter().zip(expected).all(|(a, b)| json_equals(a, b))
        }
        _ => false,
    }
}

/// Range comparison within one type bracket. Array fields match when any
/// element satisfies the comparison.
fn compares(actual: Option<&Json>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match actual {
        Some(Json::Array(items)) => items
            .iter()
            .any(|item| compare_scalar(item, operand).is_some_and(&accept)),
        Some(json) => compare_scalar(json, operand).is_some_and(accept),
        None => false,
    }
}

fn compare_scalar(json: &Json, operand: &Value) -> Option<Ordering> {
    match (json, operand) {
        (Json::Number(n), Value::Int(i)) => match n.as_i64() {
            Some(a) => Some(a.cmp(i)),
            None => n.as_f64()?.partial_cmp(&(*i as f64)),
        },
        (Json::Number(n), Value::Float(f)) => n.as_f64()?.partial_cmp(f),
        (Json::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Json::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Json::Object(_), Value::ObjectId(id)) => ObjectId::from_json(json).map(|a| a.cmp(id)),
        _ => None,
    }
}

// ── Sorting ──────────────────────────────────────────────────────────

fn type_rank(json: Option<&Json>) -> u8 {
    match json {
        None | Some(Json::Null) => 0,
        Some(Json::Number(_)) => 1,
        Some(Json::String(_)) => 2,
        Some(Json::Object(_)) => 3,
        Some(Json::Array(_)) => 4,
        Some(Json::Bool(_)) => 5,
    }
}

/// Total order over JSON values: null < numbers < strings < objects < arrays < booleans.
pub fn compare_json(a: Option<&Json>, b: Option<&Json>) -> Ordering {
    let by_rank = type_rank(a).cmp(&type_rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }
    match (a, b) {
        (Some(Json::Number(x)), Some(Json::Number(y))) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x
                    .as_f64()
                    .unwrap_or_default()
                    .partial_cmp(&y.as_f64().unwrap_or_default())
                    .unwrap_or(Ordering::Equal),
            }
        }
        (Some(Json::String(x)), Some(Json::String(y))) => x.cmp(y),
        (Some(Json::Bool(x)), Some(Json::Bool(y))) => x.cmp(y),
        (Some(Json::Array(x)), Some(Json::Array(y))) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_json(Some(l), Some(r));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Some(x @ Json::Object(_)), Some(y @ Json::Object(_))) => {
            match (ObjectId::from_json(x), ObjectId::from_json(y)) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x.to_string().cmp(&y.to_string()),
            }
        }
        _ => Ordering::Equal,
    }
}

/// Stable sort of documents on one field.
pub fn sort_documents(documents: &mut [Document], sort: &SortSpec) {
    documents.sort_by(|a, b| {
        let ord = compare_json(get_path(a, &sort.field), get_path(b, &sort.field));
        match sort.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterBuilder;
    use serde_json::json;

    fn doc(value: Json) -> Document {
        crate::document::from_json(value).unwrap()
    }

    fn matches(builder: &FilterBuilder, value: Json) -> bool {
        Matcher::new(builder.filters()).unwrap().matches(&doc(value))
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(matches(&FilterBuilder::new(), json!({ "a": 1 })));
    }

    #[test]
    fn test_equality() {
        let mut b = FilterBuilder::new();
        b.equal("store", "118");
        assert!(matches(&b, json!({ "store": "118" })));
        assert!(!matches(&b, json!({ "store": 118 })));
        assert!(!matches(&b, json!({ "other": "118" })));
        assert!(matches(&b, json!({ "store": ["101", "118"] })));
    }

    #[test]
    fn test_numeric_equality_across_representations() {
        let mut b = FilterBuilder::new();
        b.equal_numeric("region", 3.0);
        assert!(matches(&b, json!({ "region": 3 })));
        assert!(matches(&b, json!({ "region": 3.0 })));
    }

    #[test]
    fn test_ne_matches_missing_field() {
        let mut b = FilterBuilder::new();
        b.not_equal("meat_type", "BL");
        assert!(matches(&b, json!({ "store": "1" })));
        assert!(!matches(&b, json!({ "meat_type": "BL" })));
    }

    #[test]
    fn test_ranges_are_type_bracketed() {
        let mut b = FilterBuilder::new();
        b.greater_than("region", 3);
        assert!(matches(&b, json!({ "region": 4 })));
        assert!(!matches(&b, json!({ "region": 3 })));
        assert!(!matches(&b, json!({ "region": "9" })));

        let mut s = FilterBuilder::new();
        s.greater_equal_than("store", "125");
        assert!(matches(&s, json!({ "store": "200" })));
        assert!(!matches(&s, json!({ "store": "1000" })));
    }

    #[test]
    fn test_reversed_between_matches_nothing() {
        let mut b = FilterBuilder::new();
        b.between_number("price", 10.0, 1.0);
        for price in [0, 1, 5, 10, 11] {
            assert!(!matches(&b, json!({ "price": price })));
        }
    }

    #[test]
    fn test_empty_in_and_nin() {
        let mut b = FilterBuilder::new();
        b.in_values("store", Vec::<&str>::new());
        assert!(!matches(&b, json!({ "store": "101" })));
        assert!(!matches(&b, json!({})));

        let mut n = FilterBuilder::new();
        n.not_in("store", Vec::<&str>::new());
        assert!(matches(&n, json!({ "store": "101" })));
        assert!(matches(&n, json!({})));
    }

    #[test]
    fn test_like_semantics() {
        let cases = [
            ("%abc%", "xxabcxx", true),
            ("%abc%", "xxabxx", false),
            ("abc%", "abcdef", true),
            ("abc%", "xabc", false),
            ("%abc", "xyzabc", true),
            ("%abc", "abcx", false),
            ("abc", "abc", true),
            ("abc", "abcd", false),
        ];
        for (pattern, text, expected) in cases {
            let re = crate::pattern::to_regex(pattern);
            let mut b = FilterBuilder::new();
            b.equal("f", re);
            assert_eq!(matches(&b, json!({ "f": text })), expected, "{pattern} vs {text}");
        }
    }

    #[test]
    fn test_like_not_inverts() {
        let mut b = FilterBuilder::new();
        b.like_not("owner_group", "FL");
        assert!(matches(&b, json!({ "owner_group": "TX-01" })));
        assert!(!matches(&b, json!({ "owner_group": "NFL-2" })));
        assert!(!matches(&b, json!({ "owner_group": 4 })));
    }

    #[test]
    fn test_like_not_spans_lines() {
        let mut b = FilterBuilder::new();
        b.like_not("notes", "FL");
        assert!(!matches(&b, json!({ "notes": "ok\nFL-22" })));
        assert!(!matches(&b, json!({ "notes": "FL\nok" })));
        assert!(matches(&b, json!({ "notes": "ok\nTX-01" })));
    }

    #[test]
    fn test_unbalanced_negative_pattern_is_rejected() {
        let mut b = FilterBuilder::new();
        b.equal("f", crate::pattern::to_negative_regex("abc%"));
        let err = Matcher::new(b.filters()).unwrap_err();
        assert!(matches!(err, DocQueryError::Pattern { .. }));
    }

    #[test]
    fn test_combinators() {
        let mut b = FilterBuilder::new();
        b.equal("job", "X").and([
            FilterBuilder::new().greater_equal_than("store", "125"),
            FilterBuilder::new().not_in("store", ["149", "159"]),
        ]);
        assert!(matches(&b, json!({ "job": "X", "store": "130" })));
        assert!(!matches(&b, json!({ "job": "X", "store": "149" })));
        assert!(!matches(&b, json!({ "job": "Y", "store": "130" })));

        let mut or = FilterBuilder::new();
        or.or([
            FilterBuilder::new().equal("store", "310"),
            FilterBuilder::new().equal("beer_wine", "Mexican"),
        ]);
        assert!(matches(&or, json!({ "beer_wine": "Mexican" })));
        assert!(!matches(&or, json!({ "store": "311" })));
    }

    #[test]
    fn test_empty_combinators() {
        let mut and = FilterBuilder::new();
        and.and(Vec::<FilterBuilder>::new());
        assert!(matches(&and, json!({ "a": 1 })));

        let mut or = FilterBuilder::new();
        or.or(Vec::<FilterBuilder>::new());
        assert!(!matches(&or, json!({ "a": 1 })));
    }

    #[test]
    fn test_quick_search_matches_text_and_number() {
        let mut b = FilterBuilder::new();
        b.quick_search(&["store", "name"], "118", Vec::new());
        assert!(matches(&b, json!({ "store": "1184", "name": "x" })));
        assert!(matches(&b, json!({ "store": 118, "name": "x" })));
        assert!(!matches(&b, json!({ "store": 1180, "name": "x118" })));
    }

    #[test]
    fn test_object_id_equality() {
        let id = ObjectId::parse_str("5e7567cf62f8c9a8749ee19a").unwrap();
        let mut b = FilterBuilder::new();
        b.in_values("_id", [id]);
        assert!(matches(&b, json!({ "_id": { "$oid": "5e7567cf62f8c9a8749ee19a" } })));
        assert!(!matches(&b, json!({ "_id": "5e7567cf62f8c9a8749ee19a" })));
    }

    #[test]
    fn test_sort_documents() {
        let mut docs = vec![
            doc(json!({ "n": 1, "store": "b" })),
            doc(json!({ "n": 2 })),
            doc(json!({ "n": 3, "store": "a" })),
            doc(json!({ "n": 4, "store": 7 })),
        ];
        sort_documents(&mut docs, &SortSpec::ascending("store"));
        let order: Vec<_> = docs.iter().map(|d| d["n"].clone()).collect();
        assert_eq!(order, vec![json!(2), json!(4), json!(3), json!(1)]);

        sort_documents(&mut docs, &SortSpec::descending("store"));
        let order: Vec<_> = docs.iter().map(|d| d["n"].clone()).collect();
        assert_eq!(order, vec![json!(1), json!(3), json!(4), json!(2)]);
    }
}

// Filter builder - fluent accumulation of predicates into a filter expression

mod expression;
mod numeric;

pub use expression::{Combinator, FieldConstraint, FilterExpression, Operator, Predicate};
pub use numeric::parse_numeric;

use crate::pattern;
use crate::value::{RegexPattern, Value};
use std::borrow::Borrow;

/// Builds a [`FilterExpression`] through chained calls.
///
/// Every method returns the same builder, so a later call on a field already
/// present overwrites it. `equal_array` and `quick_search` append to the `$or`
/// clause list instead. No method fails: empty patterns, empty header lists and
/// reversed ranges produce a no-op or a filter that matches nothing.
///
/// ```
/// use docquery::filter::FilterBuilder;
///
/// let mut builder = FilterBuilder::new();
/// builder
///     .equal("job", "USS010350")
///     .not_equal("meat_type", "BL")
///     .like("owner_group", "FL")
///     .in_values("store", ["101", "105", "108"]);
/// assert_eq!(builder.filters().len(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterBuilder {
    filters: FilterExpression,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The accumulated expression.
    pub fn filters(&self) -> &FilterExpression {
        &self.filters
    }

    pub fn into_filters(self) -> FilterExpression {
        self.filters
    }

    pub fn clear(&mut self) -> &mut Self {
        self.filters.clear();
        self
    }

    /// `field` equals any of `values`, expressed as one `$or` clause per value.
    pub fn equal_array<V: Into<Value>>(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        for value in values {
            self.filters.push_clause(
                Combinator::Or,
                FilterExpression::field(field, FieldConstraint::Equals(value.into())),
            );
        }
        self
    }

    pub fn equal(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.filters
            .set_field(field, FieldConstraint::Equals(value.into()));
        self
    }

    pub fn equal_numeric(&mut self, field: &str, value: f64) -> &mut Self {
        self.equal(field, value)
    }

    pub fn not_equal(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.set_operator(field, Operator::Ne, value)
    }

    pub fn not_equal_number(&mut self, field: &str, value: f64) -> &mut Self {
        self.set_operator(field, Operator::Ne, value)
    }

    /// Inclusive range. The bounds are not checked: `start > end` matches nothing.
    pub fn between(
        &mut self,
        field: &str,
        start: impl Into<Value>,
        end: impl Into<Value>,
    ) -> &mut Self {
        self.filters.set_field(
            field,
            FieldConstraint::Operators(vec![
                (Operator::Gte, start.into()),
                (Operator::Lte, end.into()),
            ]),
        );
        self
    }

    pub fn between_number(&mut self, field: &str, start: f64, end: f64) -> &mut Self {
        self.between(field, start, end)
    }

    /// `field` is one of `values`. An empty list matches nothing.
    pub fn in_values<V: Into<Value>>(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.set_operator(field, Operator::In, collect_values(values))
    }

    /// `field` is none of `values`. An empty list matches everything.
    pub fn not_in<V: Into<Value>>(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.set_operator(field, Operator::Nin, collect_values(values))
    }

    pub fn greater_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.set_operator(field, Operator::Gt, value)
    }

    pub fn greater_equal_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.set_operator(field, Operator::Gte, value)
    }

    pub fn less_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.set_operator(field, Operator::Lt, value)
    }

    pub fn less_equal_than(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.set_operator(field, Operator::Lte, value)
    }

    /// `field` contains `value`, with `%` inside `value` acting as a wildcard.
    /// An empty `value` leaves the builder untouched.
    pub fn like(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            return self;
        }
        let regex = pattern::to_regex(&format!("%{value}%"));
        self.filters.set_field(field, FieldConstraint::Pattern(regex));
        self
    }

    /// `field` does not contain `value`. An empty `value` leaves the builder untouched.
    pub fn like_not(&mut self, field: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            return self;
        }
        let regex = pattern::to_negative_regex(&format!("%{value}%"));
        self.filters.set_field(field, FieldConstraint::Pattern(regex));
        self
    }

    /// Set `$and` to the expressions of `builders`, replacing any earlier `$and`.
    pub fn and<B: Borrow<FilterBuilder>>(
        &mut self,
        builders: impl IntoIterator<Item = B>,
    ) -> &mut Self {
        self.glue(Combinator::And, builders)
    }

    /// Set `$or` to the expressions of `builders`, replacing any earlier `$or`.
    pub fn or<B: Borrow<FilterBuilder>>(
        &mut self,
        builders: impl IntoIterator<Item = B>,
    ) -> &mut Self {
        self.glue(Combinator::Or, builders)
    }

    pub fn and_expressions(
        &mut self,
        expressions: impl IntoIterator<Item = FilterExpression>,
    ) -> &mut Self {
        self.filters
            .set_clauses(Combinator::And, expressions.into_iter().collect());
        self
    }

    pub fn or_expressions(
        &mut self,
        expressions: impl IntoIterator<Item = FilterExpression>,
    ) -> &mut Self {
        self.filters
            .set_clauses(Combinator::Or, expressions.into_iter().collect());
        self
    }

    /// Match `value` as a prefix against every header, OR-ed together.
    ///
    /// For each header a `^value.*` pattern clause is appended to `$or`, plus an
    /// exact numeric clause when `value` is a number (so `"118"` also finds a
    /// numeric field equal to 118). `extra_or_clauses` follow verbatim. Nothing
    /// happens when `value` or `headers` is empty.
    pub fn quick_search<H: AsRef<str>>(
        &mut self,
        headers: &[H],
        value: &str,
        extra_or_clauses: impl IntoIterator<Item = FilterExpression>,
    ) -> &mut Self {
        if value.is_empty() || headers.is_empty() {
            return self;
        }
        let numeric = parse_numeric(value);
        let regex = pattern::to_regex(&format!("{value}%"));

        for header in headers {
            let header = header.as_ref();
            self.filters.push_clause(
                Combinator::Or,
                FilterExpression::field(header, FieldConstraint::Pattern(regex.clone())),
            );
            if let Some(number) = &numeric {
                self.filters.push_clause(
                    Combinator::Or,
                    FilterExpression::field(header, FieldConstraint::Equals(number.clone())),
                );
            }
        }
        for clause in extra_or_clauses {
            self.filters.push_clause(Combinator::Or, clause);
        }
        self
    }

    /// Anchor `value` at both ends without expanding interior `%`.
    pub fn strict_regex(&self, value: &str) -> RegexPattern {
        pattern::strict_regex(value)
    }

    fn set_operator(&mut self, field: &str, op: Operator, value: impl Into<Value>) -> &mut Self {
        self.filters
            .set_field(field, FieldConstraint::operator(op, value));
        self
    }

    fn glue<B: Borrow<FilterBuilder>>(
        &mut self,
        op: Combinator,
        builders: impl IntoIterator<Item = B>,
    ) -> &mut Self {
        let clauses = builders
            .into_iter()
            .map(|b| b.borrow().filters().clone())
            .collect();
        self.filters.set_clauses(op, clauses);
        self
    }
}

impl From<FilterExpression> for FilterBuilder {
    fn from(filters: FilterExpression) -> Self {
        FilterBuilder { filters }
    }
}

impl From<FilterBuilder> for FilterExpression {
    fn from(builder: FilterBuilder) -> Self {
        builder.into_filters()
    }
}

fn collect_values<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Value {
    Value::Array(values.into_iter().map(Into::into).collect())
}

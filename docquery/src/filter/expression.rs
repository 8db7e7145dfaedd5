use crate::error::{DocQueryError, Result};
use crate::value::{ObjectId, RegexPattern, Value, REGEX_KEY};
use bson::{Bson, Document};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Comparison and set-membership operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Ne => "$ne",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::In => "$in",
            Operator::Nin => "$nin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "$ne" => Some(Operator::Ne),
            "$gt" => Some(Operator::Gt),
            "$gte" => Some(Operator::Gte),
            "$lt" => Some(Operator::Lt),
            "$lte" => Some(Operator::Lte),
            "$in" => Some(Operator::In),
            "$nin" => Some(Operator::Nin),
            _ => None,
        }
    }
}

/// Logical combinator keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::And => "$and",
            Combinator::Or => "$or",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "$and" => Some(Combinator::And),
            "$or" => Some(Combinator::Or),
            _ => None,
        }
    }
}

/// The constraint placed on a single field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldConstraint {
    /// Implicit equality
    Equals(Value),
    /// Operator map, e.g. `{$gte: a, $lte: b}`
    Operators(Vec<(Operator, Value)>),
    /// Regular-expression match
    Pattern(RegexPattern),
}

impl FieldConstraint {
    pub fn operator(op: Operator, value: impl Into<Value>) -> Self {
        FieldConstraint::Operators(vec![(op, value.into())])
    }

    /// Look up the operand of one operator in an operator map.
    pub fn get(&self, op: Operator) -> Option<&Value> {
        match self {
            FieldConstraint::Operators(ops) => {
                ops.iter().find(|(o, _)| *o == op).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            FieldConstraint::Equals(value) => value.to_bson(),
            FieldConstraint::Pattern(re) => Bson::RegularExpression(re.to_bson()),
            FieldConstraint::Operators(ops) => {
                let mut doc = Document::new();
                for (op, value) in ops {
                    doc.insert(op.as_str(), value.to_bson());
                }
                Bson::Document(doc)
            }
        }
    }

    fn from_json(field: &str, json: &serde_json::Value) -> Result<Self> {
        let map = match json {
            serde_json::Value::Object(map)
                if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) =>
            {
                map
            }
            other => return Ok(FieldConstraint::Equals(Value::from_json(other)?)),
        };

        if ObjectId::from_json(json).is_some() {
            return Ok(FieldConstraint::Equals(Value::from_json(json)?));
        }
        if let Some(pattern) = map.get(REGEX_KEY) {
            return match (map.len(), pattern) {
                (1, serde_json::Value::String(p)) => {
                    Ok(FieldConstraint::Pattern(RegexPattern::new(p.clone())))
                }
                _ => Err(DocQueryError::Filter(format!(
                    "'{field}': $regex must be the only key and hold a string"
                ))),
            };
        }

        let mut ops = Vec::with_capacity(map.len());
        for (key, operand) in map {
            let op = Operator::parse(key).ok_or_else(|| {
                DocQueryError::Filter(format!("'{field}': unknown operator {key}"))
            })?;
            if matches!(op, Operator::In | Operator::Nin) && !operand.is_array() {
                return Err(DocQueryError::Filter(format!(
                    "'{field}': {key} needs an array"
                )));
            }
            ops.push((op, Value::from_json(operand)?));
        }
        Ok(FieldConstraint::Operators(ops))
    }
}

impl Serialize for FieldConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldConstraint::Equals(value) => value.serialize(serializer),
            FieldConstraint::Pattern(re) => re.serialize(serializer),
            FieldConstraint::Operators(ops) => {
                let mut map = serializer.serialize_map(Some(ops.len()))?;
                for (op, value) in ops {
                    map.serialize_entry(op.as_str(), value)?;
                }
                map.end()
            }
        }
    }
}

/// One entry of a filter expression: a field constraint or a combinator node.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Field {
        name: String,
        constraint: FieldConstraint,
    },
    Combinator {
        op: Combinator,
        clauses: Vec<FilterExpression>,
    },
}

impl Predicate {
    fn same_key(&self, other: &Predicate) -> bool {
        match (self, other) {
            (Predicate::Field { name: a, .. }, Predicate::Field { name: b, .. }) => a == b,
            (Predicate::Combinator { op: a, .. }, Predicate::Combinator { op: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// An ordered set of predicates, keyed by field name or combinator.
///
/// Writing a key that already exists replaces the entry in place; new keys
/// are appended.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterExpression {
    predicates: Vec<Predicate>,
}

impl FilterExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// An expression holding a single field constraint.
    pub fn field(name: impl Into<String>, constraint: FieldConstraint) -> Self {
        let mut expr = Self::new();
        expr.set_field(name, constraint);
        expr
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn get(&self, name: &str) -> Option<&FieldConstraint> {
        self.predicates.iter().find_map(|p| match p {
            Predicate::Field { name: n, constraint } if n == name => Some(constraint),
            _ => None,
        })
    }

    pub fn clauses(&self, op: Combinator) -> Option<&[FilterExpression]> {
        self.predicates.iter().find_map(|p| match p {
            Predicate::Combinator { op: o, clauses } if *o == op => Some(clauses.as_slice()),
            _ => None,
        })
    }

    pub fn set_field(&mut self, name: impl Into<String>, constraint: FieldConstraint) {
        self.upsert(Predicate::Field {
            name: name.into(),
            constraint,
        });
    }

    /// Replace the clause list of a combinator.
    pub fn set_clauses(&mut self, op: Combinator, clauses: Vec<FilterExpression>) {
        self.upsert(Predicate::Combinator { op, clauses });
    }

    /// Append one clause to a combinator, creating it when absent.
    pub fn push_clause(&mut self, op: Combinator, clause: FilterExpression) {
        for predicate in &mut self.predicates {
            if let Predicate::Combinator { op: o, clauses } = predicate {
                if *o == op {
                    clauses.push(clause);
                    return;
                }
            }
        }
        self.predicates.push(Predicate::Combinator {
            op,
            clauses: vec![clause],
        });
    }

    fn upsert(&mut self, predicate: Predicate) {
        match self.predicates.iter_mut().find(|p| p.same_key(&predicate)) {
            Some(existing) => *existing = predicate,
            None => self.predicates.push(predicate),
        }
    }

    pub fn clear(&mut self) {
        self.predicates.clear();
    }

    /// Extended-JSON form handed to the store.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// BSON query document for a store driver. Patterns become BSON regular
    /// expressions rather than `$regex` operators.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for predicate in &self.predicates {
            match predicate {
                Predicate::Field { name, constraint } => {
                    doc.insert(name.clone(), constraint.to_bson());
                }
                Predicate::Combinator { op, clauses } => {
                    let clauses = clauses
                        .iter()
                        .map(|clause| Bson::Document(clause.to_document()))
                        .collect::<Vec<_>>();
                    doc.insert(op.as_str(), clauses);
                }
            }
        }
        doc
    }

    /// Parse the extended-JSON form, e.g.
    /// `{"job": "X", "store": {"$gte": "125"}, "$or": [{"a": 1}]}`.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let map = json.as_object().ok_or_else(|| {
            DocQueryError::Filter(format!("filter must be a JSON object, got {json}"))
        })?;

        let mut expr = Self::new();
        for (key, value) in map {
            if let Some(op) = Combinator::parse(key) {
                let items = value.as_array().ok_or_else(|| {
                    DocQueryError::Filter(format!("{key} needs an array of filters"))
                })?;
                let clauses = items
                    .iter()
                    .map(FilterExpression::from_json)
                    .collect::<Result<Vec<_>>>()?;
                expr.set_clauses(op, clauses);
            } else if key.starts_with('$') {
                return Err(DocQueryError::Filter(format!(
                    "unknown top-level operator {key}"
                )));
            } else {
                expr.set_field(key.clone(), FieldConstraint::from_json(key, value)?);
            }
        }
        Ok(expr)
    }
}

impl Serialize for FilterExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.predicates.len()))?;
        for predicate in &self.predicates {
            match predicate {
                Predicate::Field { name, constraint } => map.serialize_entry(name, constraint)?,
                Predicate::Combinator { op, clauses } => {
                    map.serialize_entry(op.as_str(), clauses)?
                }
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_overwrite_keeps_position() {
        let mut expr = FilterExpression::new();
        expr.set_field("a", FieldConstraint::Equals(1.into()));
        expr.set_field("b", FieldConstraint::Equals(2.into()));
        expr.set_field("a", FieldConstraint::Equals(3.into()));
        assert_eq!(expr.to_json(), json!({ "a": 3, "b": 2 }));
        assert_eq!(expr.len(), 2);
    }

    #[test]
    fn test_field_and_combinator_keys_do_not_collide() {
        let mut expr = FilterExpression::new();
        expr.set_field("$or", FieldConstraint::Equals("literal".into()));
        expr.push_clause(Combinator::Or, FilterExpression::new());
        assert_eq!(expr.len(), 2);
    }

    #[test]
    fn test_push_clause_appends() {
        let mut expr = FilterExpression::new();
        expr.push_clause(
            Combinator::Or,
            FilterExpression::field("a", FieldConstraint::Equals(1.into())),
        );
        expr.push_clause(
            Combinator::Or,
            FilterExpression::field("b", FieldConstraint::Equals(2.into())),
        );
        assert_eq!(expr.to_json(), json!({ "$or": [{ "a": 1 }, { "b": 2 }] }));
    }

    #[test]
    fn test_from_json() {
        let json = json!({
            "job": "USS010350",
            "store": { "$gte": "125", "$lte": "300" },
            "owner_group": { "$regex": ".*FL.*" },
            "_id": { "$oid": "5e7567cf62f8c9a8749ee19a" },
            "$or": [{ "region": 3 }, { "region": { "$in": [4, 5] } }]
        });
        let expr = FilterExpression::from_json(&json).unwrap();

        assert_eq!(
            expr.get("store").and_then(|c| c.get(Operator::Lte)),
            Some(&Value::from("300"))
        );
        assert_eq!(
            expr.get("owner_group"),
            Some(&FieldConstraint::Pattern(RegexPattern::new(".*FL.*")))
        );
        assert!(matches!(
            expr.get("_id"),
            Some(FieldConstraint::Equals(Value::ObjectId(_)))
        ));
        assert_eq!(expr.clauses(Combinator::Or).map(|c| c.len()), Some(2));
        assert_eq!(expr.to_json(), json);
    }

    #[test]
    fn test_to_document() {
        let mut expr = FilterExpression::new();
        expr.set_field("job", FieldConstraint::Equals("X".into()));
        expr.set_field(
            "owner_group",
            FieldConstraint::Pattern(RegexPattern::new(".*FL.*")),
        );
        expr.push_clause(
            Combinator::And,
            FilterExpression::field("store", FieldConstraint::operator(Operator::Gte, "125")),
        );

        let doc = expr.to_document();
        assert_eq!(doc.get_str("job").unwrap(), "X");
        match doc.get("owner_group") {
            Some(Bson::RegularExpression(re)) => assert_eq!(re.pattern, ".*FL.*"),
            other => panic!("unexpected owner_group: {other:?}"),
        }
        let clauses = doc.get_array("$and").unwrap();
        assert_eq!(clauses.len(), 1);
        let store = clauses[0].as_document().unwrap().get_document("store").unwrap();
        assert_eq!(store.get_str("$gte").unwrap(), "125");
        assert_eq!(
            doc.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["job", "owner_group", "$and"]
        );
    }

    #[test]
    fn test_from_json_rejects_unknown_operators() {
        assert!(FilterExpression::from_json(&json!({ "a": { "$near": 1 } })).is_err());
        assert!(FilterExpression::from_json(&json!({ "$nor": [] })).is_err());
        assert!(FilterExpression::from_json(&json!({ "a": { "$in": 1 } })).is_err());
        assert!(FilterExpression::from_json(&json!(["a"])).is_err());
    }
}

// SPDX-License-Identifier: MIT

//! Structured AND/OR condition evaluation
//!
//! Object nodes are conjunctions over field entries, array nodes are
//! disjunctions. Entries for fields the values record does not carry are
//! skipped. A clause that cannot be interpreted resolves to a context
//! default: `true` inside an AND node so it never blocks, `false` inside an
//! OR node so it never satisfies.

use super::operand::Operand;
use super::types::{FieldClause, FieldMap, OrTerm};
use super::values::Values;
use serde_json::Value;
use std::cmp::Ordering;

/// Clause text that matches any value when wildcards are enabled
pub const ANY_WILDCARD: &str = "any";

/// Operators accepted at the start of a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
}

impl ClauseOp {
    // two-character operators must be tried before their one-character prefixes
    const TABLE: [(&'static str, ClauseOp); 7] = [
        ("==", ClauseOp::Eq),
        ("!=", ClauseOp::NotEq),
        ("<=", ClauseOp::Lte),
        (">=", ClauseOp::Gte),
        ("<", ClauseOp::Lt),
        (">", ClauseOp::Gt),
        ("in", ClauseOp::In),
    ];
}

/// An operator clause split into operator and raw right-hand side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpClause<'a> {
    pub op: ClauseOp,
    pub rhs: &'a str,
}

impl<'a> OpClause<'a> {
    /// Split `"<op> <rhs>"`; the operator must be followed by whitespace
    pub fn split(clause: &'a str) -> Option<Self> {
        let clause = clause.trim();
        ClauseOp::TABLE.iter().find_map(|(symbol, op)| {
            let rest = clause.strip_prefix(*symbol)?;
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            Some(OpClause {
                op: *op,
                rhs: rest.trim(),
            })
        })
    }

    /// Parse the right-hand side as exactly one JSON value
    pub fn operand(&self) -> Option<Value> {
        match serde_json::from_str::<Value>(&format!("[{}]", self.rhs)) {
            Ok(Value::Array(mut items)) if items.len() == 1 => items.pop(),
            _ => None,
        }
    }

    /// Apply the clause to a field value
    pub fn apply(&self, value: &Operand, default: bool) -> bool {
        let Some(rhs) = self.operand() else {
            log::debug!("clause right-hand side '{}' is not a JSON value", self.rhs);
            return default;
        };
        compare(self.op, value, &rhs, default)
    }
}

/// Compare a field value against a parsed clause operand
pub fn compare(op: ClauseOp, value: &Operand, rhs: &Value, default: bool) -> bool {
    let expected = Operand::from(rhs);
    match op {
        ClauseOp::Eq => value.loose_eq(&expected),
        ClauseOp::NotEq => !value.loose_eq(&expected),
        ClauseOp::Lt => value.compare(&expected) == Some(Ordering::Less),
        ClauseOp::Lte => matches!(
            value.compare(&expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        ClauseOp::Gt => value.compare(&expected) == Some(Ordering::Greater),
        ClauseOp::Gte => matches!(
            value.compare(&expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        ClauseOp::In => match expected {
            Operand::List(items) => {
                *value != Operand::Str(String::new())
                    && items.iter().any(|i| i.same_value_zero(value))
            }
            _ => default,
        },
    }
}

/// Evaluate a single clause string against a field value
///
/// Text that is not an operator clause, or whose right-hand side does not
/// parse, resolves to `default`.
pub fn exec_clause(clause: &str, value: &Operand, default: bool) -> bool {
    match OpClause::split(clause) {
        Some(parsed) => parsed.apply(value, default),
        None => default,
    }
}

/// Walks AND/OR trees against one values record
#[derive(Debug, Clone, Copy)]
pub struct StructuredEvaluator<'a> {
    values: &'a Values,
    any_wildcard: bool,
}

impl<'a> StructuredEvaluator<'a> {
    pub fn new(values: &'a Values) -> Self {
        Self {
            values,
            any_wildcard: false,
        }
    }

    /// Treat the clause `any` as matching every value
    pub fn with_any_wildcard(mut self, enabled: bool) -> Self {
        self.any_wildcard = enabled;
        self
    }

    /// AND node: every handled entry must hold
    pub fn all(&self, map: &FieldMap) -> bool {
        map.iter()
            .filter(|(field, _)| self.values.contains(field))
            .all(|(field, clause)| self.field_holds(field, clause))
    }

    /// OR node: some element must hold; `field` is the field a parent AND
    /// entry attached this list to
    pub fn any(&self, terms: &[OrTerm], field: Option<&str>) -> bool {
        terms.iter().any(|term| match term {
            OrTerm::AllOf(map) => self.all(map),
            OrTerm::AnyOf(nested) => self.any(nested, None),
            OrTerm::Clause(clause) => match field {
                Some(field) => self.clause_holds(clause, field, false),
                None => false,
            },
            OrTerm::Ignored(_) => false,
        })
    }

    fn field_holds(&self, field: &str, clause: &FieldClause) -> bool {
        match clause {
            FieldClause::AllOf(map) => self.all(map),
            FieldClause::AnyOf(terms) => self.any(terms, Some(field)),
            FieldClause::Clause(clause) => {
                if OpClause::split(clause).is_none() && !self.is_wildcard(clause) {
                    // not an operator clause at all; the entry does not take part
                    return true;
                }
                self.clause_holds(clause, field, true)
            }
            FieldClause::Equals(scalar) => {
                compare(ClauseOp::Eq, &self.value_of(field), scalar, true)
            }
        }
    }

    fn clause_holds(&self, clause: &str, field: &str, default: bool) -> bool {
        if self.is_wildcard(clause) {
            return true;
        }
        exec_clause(clause, &self.value_of(field), default)
    }

    fn is_wildcard(&self, clause: &str) -> bool {
        self.any_wildcard && clause.trim() == ANY_WILDCARD
    }

    fn value_of(&self, field: &str) -> Operand {
        self.values
            .get(field)
            .map(Operand::from)
            .unwrap_or(Operand::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::types::Condition;
    use serde_json::json;

    fn map(value: Value) -> FieldMap {
        match Condition::from_json(&value).unwrap() {
            Condition::AllOf(map) => map,
            other => panic!("Expected AllOf, got {:?}", other),
        }
    }

    fn terms(value: Value) -> Vec<OrTerm> {
        match Condition::from_json(&value).unwrap() {
            Condition::AnyOf(terms) => terms,
            other => panic!("Expected AnyOf, got {:?}", other),
        }
    }

    #[test]
    fn test_split_clause() {
        assert_eq!(
            OpClause::split(">= 3"),
            Some(OpClause {
                op: ClauseOp::Gte,
                rhs: "3"
            })
        );
        assert_eq!(OpClause::split("  <   2  ").unwrap().op, ClauseOp::Lt);
        assert_eq!(OpClause::split("in [1, 2]").unwrap().rhs, "[1, 2]");
        assert!(OpClause::split(">=3").is_none());
        assert!(OpClause::split("any").is_none());
        assert!(OpClause::split("==").is_none());
        assert!(OpClause::split("inside 3").is_none());
    }

    #[test]
    fn test_operand_must_be_single_json_value() {
        assert_eq!(OpClause::split("== 3").unwrap().operand(), Some(json!(3)));
        assert_eq!(
            OpClause::split("== \"a\"").unwrap().operand(),
            Some(json!("a"))
        );
        assert_eq!(OpClause::split("== 1, 2").unwrap().operand(), None);
        assert_eq!(OpClause::split("== 'a'").unwrap().operand(), None);
        assert_eq!(OpClause::split("== abc").unwrap().operand(), None);
    }

    #[test]
    fn test_exec_clause_operators() {
        let two = Operand::Number(2.0);
        assert!(exec_clause("== 2", &two, false));
        assert!(exec_clause("== \"2\"", &two, false));
        assert!(exec_clause("!= 3", &two, false));
        assert!(exec_clause("< 3", &two, false));
        assert!(exec_clause("<= 2", &two, false));
        assert!(exec_clause("> 1", &two, false));
        assert!(exec_clause(">= 2", &two, false));
        assert!(!exec_clause("> 2", &two, true));
        assert!(exec_clause("in [1, 2, 3]", &two, false));
        assert!(!exec_clause("in [\"2\"]", &two, true));
    }

    #[test]
    fn test_exec_clause_defaults() {
        let two = Operand::Number(2.0);
        assert!(exec_clause("== nope", &two, true));
        assert!(!exec_clause("== nope", &two, false));
        assert!(exec_clause("in 3", &two, true));
        assert!(!exec_clause("in 3", &two, false));
        assert!(exec_clause("not a clause", &two, true));
    }

    #[test]
    fn test_in_never_matches_empty_string() {
        let empty = Operand::Str(String::new());
        assert!(!exec_clause("in [\"\", \"a\"]", &empty, true));
    }

    #[test]
    fn test_and_node() {
        let values = Values::new().with("gameMode", 2).with("region", 3);
        let evaluator = StructuredEvaluator::new(&values);

        assert!(evaluator.all(&map(json!({ "gameMode": ">= 1", "region": 3 }))));
        assert!(!evaluator.all(&map(json!({ "gameMode": ">= 1", "region": 4 }))));
        assert!(evaluator.all(&map(json!({}))));
    }

    #[test]
    fn test_and_skips_unknown_fields() {
        let values = Values::new().with("region", 3);
        let evaluator = StructuredEvaluator::new(&values);

        assert!(evaluator.all(&map(json!({ "region": 3, "other": "== 9" }))));
        assert!(!evaluator.all(&map(json!({ "region": 4, "other": "== 9" }))));
    }

    #[test]
    fn test_and_ignores_non_operator_strings() {
        let values = Values::new().with("region", 3).with("gameMode", 0);
        let evaluator = StructuredEvaluator::new(&values);

        assert!(evaluator.all(&map(json!({ "region": "any", "gameMode": "== 0" }))));
        assert!(!evaluator.all(&map(json!({ "region": "any", "gameMode": ">= 1" }))));
    }

    #[test]
    fn test_field_list_is_or_over_field() {
        let values = Values::new().with("gameMode", 2).with("region", 3);
        let evaluator = StructuredEvaluator::new(&values);
        let condition = map(json!({ "gameMode": [">= 1", "<= 2"], "region": 3 }));
        assert!(evaluator.all(&condition));

        let values = Values::new().with("gameMode", 0).with("region", 3);
        let condition = map(json!({ "gameMode": ["== 1", "== 2"], "region": 3 }));
        assert!(!StructuredEvaluator::new(&values).all(&condition));
    }

    #[test]
    fn test_or_node() {
        let values = Values::new().with("region", 3);
        let evaluator = StructuredEvaluator::new(&values);

        assert!(!evaluator.any(&[], None));
        assert!(evaluator.any(&terms(json!([{ "region": 1 }, { "region": 3 }])), None));
        assert!(!evaluator.any(&terms(json!([{ "region": 1 }, [{ "region": 2 }]])), None));
        assert!(evaluator.any(&terms(json!([[{ "region": "> 2" }]])), None));
    }

    #[test]
    fn test_or_strings_need_a_field() {
        let values = Values::new().with("region", 3);
        let evaluator = StructuredEvaluator::new(&values);

        assert!(!evaluator.any(&terms(json!(["== 3"])), None));
        assert!(evaluator.any(&terms(json!(["== 3"])), Some("region")));
        assert!(!evaluator.any(&terms(json!([3, null])), Some("region")));
    }

    #[test]
    fn test_nested_list_loses_field_context() {
        let values = Values::new().with("region", 3);
        let evaluator = StructuredEvaluator::new(&values);
        assert!(!evaluator.all(&map(json!({ "region": [["== 3"]] }))));
    }

    #[test]
    fn test_malformed_clause_defaults_by_context() {
        let values = Values::new().with("region", 3);
        let evaluator = StructuredEvaluator::new(&values);

        assert!(evaluator.all(&map(json!({ "region": "== three" }))));
        assert!(!evaluator.all(&map(json!({ "region": ["== three"] }))));
    }

    #[test]
    fn test_null_and_bool_shorthand() {
        let values = Values::new().with("region", Value::Null).with("cleared", true);
        let evaluator = StructuredEvaluator::new(&values);

        assert!(evaluator.all(&map(json!({ "region": null }))));
        assert!(evaluator.all(&map(json!({ "cleared": true }))));
        assert!(evaluator.all(&map(json!({ "cleared": 1 }))));
        assert!(!evaluator.all(&map(json!({ "cleared": false }))));
    }

    #[test]
    fn test_any_wildcard() {
        let values = Values::new().with("region", 3);
        let plain = StructuredEvaluator::new(&values);
        let wildcard = plain.with_any_wildcard(true);

        assert!(plain.all(&map(json!({ "region": "any" }))));
        assert!(wildcard.all(&map(json!({ "region": "any" }))));

        let list = terms(json!(["any"]));
        assert!(!plain.any(&list, Some("region")));
        assert!(wildcard.any(&list, Some("region")));
    }
}

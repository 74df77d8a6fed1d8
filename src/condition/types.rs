// SPDX-License-Identifier: MIT

//! Condition shapes as they appear in checklist content
//!
//! A condition is authored in JSON as one of:
//! - a string: a text expression such as `"gameMode >= 1 && region < 3"`
//! - an array: any one element must hold
//! - an object: every recognized field entry must hold

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field name to clause mapping (AND node)
pub type FieldMap = BTreeMap<String, FieldClause>;

/// A gating condition
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Condition {
    /// Free-text boolean expression
    Text(String),
    /// OR node
    AnyOf(Vec<OrTerm>),
    /// AND node
    AllOf(FieldMap),
}

/// Value attached to a field inside an AND node
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FieldClause {
    /// Operator clause such as `">= 2"` or `"in [1, 2]"`
    Clause(String),
    /// Any of the terms must hold for this field
    AnyOf(Vec<OrTerm>),
    /// Nested AND node
    AllOf(FieldMap),
    /// Scalar shorthand for `== <scalar>`
    Equals(Value),
}

/// Element of an OR node
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OrTerm {
    /// Operator clause, applied to the field the list is attached to
    Clause(String),
    /// Nested OR node
    AnyOf(Vec<OrTerm>),
    /// Nested AND node
    AllOf(FieldMap),
    /// Anything else; never satisfies the list
    Ignored(Value),
}

impl Condition {
    /// Interpret a JSON value as a condition
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        Condition::deserialize(value)
    }
}

impl From<&str> for Condition {
    fn from(expr: &str) -> Self {
        Condition::Text(expr.to_string())
    }
}

impl From<String> for Condition {
    fn from(expr: String) -> Self {
        Condition::Text(expr)
    }
}

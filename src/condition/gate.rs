// SPDX-License-Identifier: MIT

//! Single entry point for deciding whether gated content is unlocked

use super::compiler::ExpressionCompiler;
use super::structured::StructuredEvaluator;
use super::types::Condition;
use super::values::Values;
use crate::config::GateConfig;
use serde_json::Value;

/// Evaluates gating conditions against progression values
///
/// Owns the compiled-expression cache; share one `Gate` (behind an `Arc`
/// when threads are involved) so every caller benefits from it.
pub struct Gate {
    compiler: ExpressionCompiler,
    any_wildcard: bool,
}

impl Gate {
    pub fn new() -> Self {
        Self::from_config(&GateConfig::default())
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            compiler: ExpressionCompiler::with_capacity(config.cache_capacity),
            any_wildcard: config.any_wildcard,
        }
    }

    /// Evaluate a condition
    pub fn evaluate(&self, condition: &Condition, values: &Values) -> bool {
        match condition {
            Condition::Text(expr) => self.compiler.evaluate(expr, values),
            Condition::AnyOf(terms) => self.structured(values).any(terms, None),
            Condition::AllOf(map) => self.structured(values).all(map),
        }
    }

    /// Whether content guarded by `condition` is available; no condition
    /// means the content is not gated
    pub fn is_unlocked(&self, condition: Option<&Condition>, values: &Values) -> bool {
        match condition {
            Some(condition) => self.evaluate(condition, values),
            None => true,
        }
    }

    /// Inverse of [`Gate::is_unlocked`]
    pub fn is_disabled(&self, condition: Option<&Condition>, values: &Values) -> bool {
        !self.is_unlocked(condition, values)
    }

    /// [`Gate::is_unlocked`] for raw JSON content; JSON that is not a string,
    /// array or object never unlocks
    pub fn is_unlocked_json(&self, condition: Option<&Value>, values: &Values) -> bool {
        let Some(raw) = condition else {
            return true;
        };
        match Condition::from_json(raw) {
            Ok(condition) => self.evaluate(&condition, values),
            Err(e) => {
                log::warn!("Unsupported condition {}: {}", raw, e);
                false
            }
        }
    }

    pub fn compiler(&self) -> &ExpressionCompiler {
        &self.compiler
    }

    fn structured<'a>(&self, values: &'a Values) -> StructuredEvaluator<'a> {
        StructuredEvaluator::new(values).with_any_wildcard(self.any_wildcard)
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn condition(value: Value) -> Condition {
        Condition::from_json(&value).unwrap()
    }

    #[test]
    fn test_dispatch_text() {
        let gate = Gate::new();
        let values = Values::new().with("gameMode", 1);
        assert!(gate.evaluate(&Condition::from("gameMode == 1"), &values));
        assert!(!gate.evaluate(&Condition::from("gameMode == 2"), &values));
        assert_eq!(gate.compiler().cache_len(), 2);
    }

    #[test]
    fn test_dispatch_structured() {
        let gate = Gate::new();
        let values = Values::new().with("gameMode", 1).with("region", 2);
        assert!(gate.evaluate(&condition(json!({ "gameMode": 1 })), &values));
        assert!(gate.evaluate(&condition(json!([{ "region": 5 }, { "region": 2 }])), &values));
        assert!(!gate.evaluate(&condition(json!([])), &values));
        assert_eq!(gate.compiler().cache_len(), 0);
    }

    #[test]
    fn test_missing_condition_is_unlocked() {
        let gate = Gate::new();
        let values = Values::new();
        assert!(gate.is_unlocked(None, &values));
        assert!(!gate.is_disabled(None, &values));
        assert!(gate.is_unlocked_json(None, &values));
    }

    #[test]
    fn test_is_disabled_negates() {
        let gate = Gate::new();
        let values = Values::new().with("region", 1);
        let locked = condition(json!({ "region": ">= 3" }));
        assert!(gate.is_disabled(Some(&locked), &values));
        assert!(!gate.is_unlocked(Some(&locked), &values));
    }

    #[test]
    fn test_unsupported_json_never_unlocks() {
        let gate = Gate::new();
        let values = Values::new().with("region", 1);
        assert!(!gate.is_unlocked_json(Some(&json!(1)), &values));
        assert!(!gate.is_unlocked_json(Some(&json!(null)), &values));
        assert!(gate.is_unlocked_json(Some(&json!("region == 1")), &values));
    }

    #[test]
    fn test_any_wildcard_follows_config() {
        let values = Values::new().with("region", 1);
        let terms = condition(json!({ "region": ["any"] }));

        assert!(Gate::new().evaluate(&terms, &values));

        let strict = Gate::from_config(&GateConfig {
            cache_capacity: None,
            any_wildcard: false,
        });
        assert!(!strict.evaluate(&terms, &values));
    }

    #[test]
    fn test_cache_capacity_from_config() {
        let gate = Gate::from_config(&GateConfig {
            cache_capacity: Some(1),
            any_wildcard: true,
        });
        let values = Values::new().with("a", 1);
        gate.evaluate(&Condition::from("a == 1"), &values);
        gate.evaluate(&Condition::from("a == 2"), &values);
        assert_eq!(gate.compiler().cache_len(), 1);
    }
}

// SPDX-License-Identifier: MIT

//! Caching compiler for text condition expressions
//!
//! Each distinct trimmed source compiles once. Compiled predicates are shared
//! through `Arc`, so a lookup hands out the predicate without holding the
//! cache lock during evaluation. The cache is unbounded unless a capacity is
//! configured, in which case the least recently used entry is evicted.

use super::ast::Expr;
use super::evaluator::evaluate;
use super::parser::parse;
use super::values::Values;
use crate::error::{CompileError, EvalError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// An executable form of a text expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    source: String,
    expr: Expr,
    fields: Vec<String>,
}

impl CompiledPredicate {
    /// Compile without caching
    pub fn compile(source: &str) -> Result<Self, CompileError> {
        let source = source.trim();
        let expr = parse(source)?;
        let fields = expr.fields().into_iter().map(str::to_string).collect();
        Ok(Self {
            source: source.to_string(),
            expr,
            fields,
        })
    }

    /// Trimmed source text
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Field names the expression references
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Evaluate against `values`, reporting why evaluation failed
    ///
    /// Every referenced field must be present in `values`, even ones a
    /// short-circuit would never read.
    pub fn check(&self, values: &Values) -> Result<bool, EvalError> {
        if let Some(missing) = self.fields.iter().find(|f| !values.contains(f)) {
            return Err(EvalError::UnknownField(missing.clone()));
        }
        evaluate(&self.expr, values).map(|result| result.truthy())
    }

    /// Evaluate against `values`; failures are logged and count as no match
    pub fn test(&self, values: &Values) -> bool {
        match self.check(values) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Condition '{}' rejected: {}", self.source, e);
                false
            }
        }
    }
}

struct CacheEntry {
    predicate: Arc<CompiledPredicate>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Predicates keyed by source, linked from most to least recently used
///
/// Entries live in a `Vec` and link to each other by index, so lookups,
/// promotion and eviction are all O(1).
#[derive(Default)]
struct PredicateCache {
    index: HashMap<String, usize>,
    entries: Vec<CacheEntry>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: Option<NonZeroUsize>,
}

impl PredicateCache {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, source: &str) -> bool {
        self.index.contains_key(source)
    }

    fn clear(&mut self) {
        self.index.clear();
        self.entries.clear();
        self.head = None;
        self.tail = None;
    }

    fn get(&mut self, source: &str) -> Option<Arc<CompiledPredicate>> {
        let idx = *self.index.get(source)?;
        self.move_to_front(idx);
        Some(self.entries[idx].predicate.clone())
    }

    /// Insert unless another caller got there first; returns the cached predicate
    fn insert(&mut self, predicate: Arc<CompiledPredicate>) -> Arc<CompiledPredicate> {
        if let Some(existing) = self.get(predicate.source()) {
            return existing;
        }

        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity.get() {
                self.evict_lru();
            }
        }

        let idx = self.entries.len();
        self.entries.push(CacheEntry {
            predicate: predicate.clone(),
            prev: None,
            next: self.head,
        });
        if let Some(head) = self.head {
            self.entries[head].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
        self.index.insert(predicate.source().to_string(), idx);
        predicate
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.entries[idx].prev = None;
        self.entries[idx].next = self.head;
        if let Some(head) = self.head {
            self.entries[head].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let CacheEntry { prev, next, .. } = self.entries[idx];
        match prev {
            Some(prev) => self.entries[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.entries[next].prev = prev,
            None => self.tail = prev,
        }
    }

    fn evict_lru(&mut self) {
        let Some(idx) = self.tail else {
            return;
        };
        self.unlink(idx);
        let evicted = self.entries.swap_remove(idx);
        self.index.remove(evicted.predicate.source());
        log::debug!("Evicting cached condition '{}'", evicted.predicate.source());

        // the last entry now sits at `idx`; repoint its neighbours
        if idx < self.entries.len() {
            let CacheEntry { prev, next, .. } = self.entries[idx];
            match prev {
                Some(prev) => self.entries[prev].next = Some(idx),
                None => self.head = Some(idx),
            }
            match next {
                Some(next) => self.entries[next].prev = Some(idx),
                None => self.tail = Some(idx),
            }
            if let Some(slot) = self.index.get_mut(self.entries[idx].predicate.source()) {
                *slot = idx;
            }
        }
    }
}

/// Compiles text expressions and caches the results by source text
pub struct ExpressionCompiler {
    cache: Mutex<PredicateCache>,
}

impl ExpressionCompiler {
    /// Compiler with an unbounded cache
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(PredicateCache::default()),
        }
    }

    /// Compiler whose cache keeps at most `capacity` predicates;
    /// `None` or zero means unbounded
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            cache: Mutex::new(PredicateCache {
                capacity: capacity.and_then(NonZeroUsize::new),
                ..PredicateCache::default()
            }),
        }
    }

    /// Compile `expr`, reusing a cached predicate for the same trimmed source
    pub fn compile(&self, expr: &str) -> Result<Arc<CompiledPredicate>, CompileError> {
        let source = expr.trim();
        if let Some(predicate) = self.cache.lock().get(source) {
            log::debug!("Condition cache hit: '{}'", source);
            return Ok(predicate);
        }

        log::debug!("Condition cache miss: '{}'", source);
        let predicate = Arc::new(CompiledPredicate::compile(source)?);
        Ok(self.cache.lock().insert(predicate))
    }

    /// Compile (or fetch) `expr` and test it against `values`
    ///
    /// Expressions that fail to compile are logged and count as no match.
    pub fn evaluate(&self, expr: &str, values: &Values) -> bool {
        match self.compile(expr) {
            Ok(predicate) => predicate.test(values),
            Err(e) => {
                log::warn!("Condition '{}' failed to compile: {}", expr.trim(), e);
                false
            }
        }
    }

    /// Number of cached predicates
    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Whether `expr` currently has a cached predicate
    pub fn is_cached(&self, expr: &str) -> bool {
        self.cache.lock().contains(expr.trim())
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

impl Default for ExpressionCompiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_caches_by_trimmed_source() {
        let compiler = ExpressionCompiler::new();
        let a = compiler.compile("region == 2").unwrap();
        let b = compiler.compile("  region == 2 \n").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(compiler.cache_len(), 1);
        assert_eq!(a.source(), "region == 2");
    }

    #[test]
    fn test_cached_predicate_serves_different_values() {
        let compiler = ExpressionCompiler::new();
        let expr = "gameMode >= 1 && region < 3";

        assert!(compiler.evaluate(expr, &Values::new().with("gameMode", 1).with("region", 2)));
        assert!(!compiler.evaluate(expr, &Values::new().with("gameMode", 0).with("region", 2)));
        assert!(!compiler.evaluate(expr, &Values::new().with("gameMode", 2).with("region", 3)));
        assert_eq!(compiler.cache_len(), 1);
    }

    #[test]
    fn test_failed_compilation_is_not_cached() {
        let compiler = ExpressionCompiler::new();
        assert!(!compiler.evaluate("region = 2", &Values::new().with("region", 2)));
        assert!(compiler.compile("region = 2").is_err());
        assert_eq!(compiler.cache_len(), 0);
    }

    #[test]
    fn test_unknown_field_rejected_even_when_short_circuited() {
        let predicate = CompiledPredicate::compile("region == 1 || other == 2").unwrap();
        let values = Values::new().with("region", 1);
        assert_eq!(
            predicate.check(&values),
            Err(EvalError::UnknownField("other".to_string()))
        );
        assert!(!predicate.test(&values));

        let values = values.with("other", 0);
        assert_eq!(predicate.check(&values), Ok(true));
    }

    #[test]
    fn test_unknown_field_does_not_poison_cache() {
        let compiler = ExpressionCompiler::new();
        assert!(!compiler.evaluate("field == 1", &Values::new().with("other", 1)));
        assert!(compiler.evaluate("field == 1", &Values::new().with("field", 1)));
    }

    #[test]
    fn test_predicate_fields() {
        let predicate = CompiledPredicate::compile("a > 1 && b in [a, 'a']").unwrap();
        assert_eq!(predicate.fields(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_bounded_cache_evicts_least_recently_used() {
        let compiler = ExpressionCompiler::with_capacity(Some(2));
        compiler.compile("a == 1").unwrap();
        compiler.compile("a == 2").unwrap();
        // touch the first so the second becomes the eviction candidate
        compiler.compile("a == 1").unwrap();
        compiler.compile("a == 3").unwrap();

        assert_eq!(compiler.cache_len(), 2);
        assert!(compiler.is_cached("a == 1"));
        assert!(!compiler.is_cached("a == 2"));
        assert!(compiler.is_cached("a == 3"));
    }

    #[test]
    fn test_eviction_order_follows_use() {
        let compiler = ExpressionCompiler::with_capacity(Some(3));
        for i in 0..3 {
            compiler.compile(&format!("a == {}", i)).unwrap();
        }
        // recency, newest first: 0, 2, 1
        compiler.compile("a == 2").unwrap();
        compiler.compile("a == 0").unwrap();

        compiler.compile("a == 3").unwrap();
        assert!(!compiler.is_cached("a == 1"));
        compiler.compile("a == 4").unwrap();
        assert!(!compiler.is_cached("a == 2"));
        compiler.compile("a == 5").unwrap();
        assert!(!compiler.is_cached("a == 0"));

        assert_eq!(compiler.cache_len(), 3);
        for i in 3..6 {
            assert!(compiler.is_cached(&format!("a == {}", i)));
        }
    }

    #[test]
    fn test_cache_links_stay_consistent() {
        let mut cache = PredicateCache {
            capacity: NonZeroUsize::new(4),
            ..PredicateCache::default()
        };
        for i in 0..50 {
            let source = format!("n == {}", i % 7);
            let predicate = Arc::new(CompiledPredicate::compile(&source).unwrap());
            cache.insert(predicate);
            cache.get(&format!("n == {}", (i * 3) % 7));
        }
        assert_eq!(cache.len(), 4);

        let mut order = Vec::new();
        let mut cursor = cache.head;
        while let Some(idx) = cursor {
            let source = cache.entries[idx].predicate.source();
            assert_eq!(cache.index[source], idx);
            order.push(idx);
            cursor = cache.entries[idx].next;
        }
        assert_eq!(order.len(), 4);
        assert_eq!(cache.tail, order.last().copied());
    }

    #[test]
    fn test_zero_capacity_means_unbounded() {
        let compiler = ExpressionCompiler::with_capacity(Some(0));
        for i in 0..10 {
            compiler.compile(&format!("a == {}", i)).unwrap();
        }
        assert_eq!(compiler.cache_len(), 10);
    }

    #[test]
    fn test_clear_cache() {
        let compiler = ExpressionCompiler::new();
        compiler.compile("a == 1").unwrap();
        compiler.clear_cache();
        assert_eq!(compiler.cache_len(), 0);
    }

    #[test]
    fn test_concurrent_compilation() {
        let compiler = Arc::new(ExpressionCompiler::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let compiler = compiler.clone();
                std::thread::spawn(move || {
                    let values = Values::new().with("n", i);
                    compiler.evaluate("n % 2 == 0", &values)
                })
            })
            .collect();

        let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, vec![true, false, true, false, true, false, true, false]);
        assert_eq!(compiler.cache_len(), 1);
    }
}

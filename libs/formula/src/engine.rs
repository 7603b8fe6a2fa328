//! Main formula engine
//!
//! Orchestrates the pipeline: Parse → AST → Validate → Evaluate, with a
//! bounded AST cache keyed by the formula string. Parsing is idempotent,
//! so a cache hit is indistinguishable from a fresh parse.

use crate::ast::Expr;
use crate::diagnostics::Validation;
use crate::error::{Error, Result};
use crate::eval::Evaluator;
use crate::parser;
use crate::validator;
use astrea_chart::{ChartSource, DignityConfig, Planet};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Default number of parsed formulas kept in the AST cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Engine construction options.
#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub cache_capacity: usize,
    /// Planets enumerated by the `planet` aggregation domain.
    pub domain: Vec<Planet>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            domain: Planet::CLASSICAL.to_vec(),
        }
    }
}

/// Outcome of running one formula against one chart.
///
/// `value` is `None` when fatal diagnostics rejected the formula before
/// evaluation; advisory findings ride along either way.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub value: Option<bool>,
    pub validation: Validation,
}

/// Main formula engine
///
/// Holds the shared dignity configuration and the AST cache. The engine is
/// safe to share across threads: the configuration is immutable and cache
/// access is serialized; cached ASTs themselves are immutable.
pub struct Engine {
    config: Arc<DignityConfig>,
    options: EngineOptions,
    cache: Mutex<LruCache<String, Arc<Expr>>>,
}

impl Engine {
    /// Create a new engine over a dignity configuration.
    pub fn new(config: Arc<DignityConfig>) -> Self {
        Self::with_options(config, EngineOptions::default())
    }

    pub fn with_options(config: Arc<DignityConfig>, options: EngineOptions) -> Self {
        let capacity = NonZeroUsize::new(options.cache_capacity.max(1))
            .expect("capacity clamped to at least 1");
        Self {
            config,
            options,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn config(&self) -> &Arc<DignityConfig> {
        &self.config
    }

    /// Parse a formula, consulting the cache first.
    pub fn parse_cached(&self, formula: &str) -> Result<Arc<Expr>> {
        {
            let mut cache = self.cache.lock().unwrap();
            if let Some(ast) = cache.get(formula) {
                return Ok(Arc::clone(ast));
            }
        }

        let ast = Arc::new(parser::parse(formula)?);

        {
            let mut cache = self.cache.lock().unwrap();
            cache.put(formula.to_string(), Arc::clone(&ast));
        }

        Ok(ast)
    }

    /// Parse and validate without evaluating.
    pub fn check(&self, formula: &str) -> Result<Validation> {
        let ast = self.parse_cached(formula)?;
        Ok(validator::validate(&ast, &self.config))
    }

    /// Full pipeline: parse, validate, and evaluate unless rejected.
    pub fn run(&self, formula: &str, chart: &dyn ChartSource) -> Result<Outcome> {
        let ast = self.parse_cached(formula)?;
        let validation = validator::validate(&ast, &self.config);
        if validation.is_fatal() {
            return Ok(Outcome {
                value: None,
                validation,
            });
        }

        let evaluator = Evaluator::with_domain(chart, &self.config, &self.options.domain);
        let value = evaluator.evaluate_bool(&ast)?;
        Ok(Outcome {
            value: Some(value),
            validation,
        })
    }

    /// Convenience wrapper around [`Engine::run`] that turns a rejection
    /// into [`Error::Rejected`].
    pub fn evaluate(&self, formula: &str, chart: &dyn ChartSource) -> Result<bool> {
        let outcome = self.run(formula, chart)?;
        match outcome.value {
            Some(value) => Ok(value),
            None => Err(Error::Rejected(outcome.validation)),
        }
    }

    /// Drop all cached ASTs.
    pub fn clear_cache(&self) {
        self.cache.lock().unwrap().clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }
}

//! Formula DSL engine - parse, validate and evaluate chart predicates
//!
//! This crate implements a small, strongly-validated query language that
//! evaluates predicates against a computed natal chart:
//!
//! ```text
//! formula:str ── Lexer ── tokens ── Parser ── AST ── Validator ── diagnostics
//!                                              │
//!                                              └── Evaluator(AST, Chart, Config) ── bool
//! ```
//!
//! The [`Engine`] ties the stages together and memoizes parsed ASTs in a
//! bounded cache. Typical use:
//!
//! ```rust
//! use astrea_chart::{Chart, DignityConfig};
//! use astrea_formula::Engine;
//! use std::sync::Arc;
//!
//! # fn example(chart: &Chart) -> astrea_formula::Result<()> {
//! let engine = Engine::new(Arc::new(DignityConfig::modern()));
//! let outcome = engine.run("Sun.Sign == Aries AND NOT Mercury.Retrograde", chart)?;
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod validator;

// Re-export main types
pub use ast::{CmpOp, DomainKind, Expr, Literal, PropKind, Quantifier};
pub use diagnostics::{BindingValue, Diagnostic, RuleCode, Severity, Validation};
pub use engine::{Engine, EngineOptions, Outcome};
pub use error::{Error, Result};
pub use eval::{evaluate, Evaluator, Value};
pub use lexer::tokenize;
pub use parser::parse;
pub use validator::validate;

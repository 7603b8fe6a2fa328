//! Structured diagnostics emitted by the astrological validator
//!
//! A diagnostic carries a stable rule code, a message key into the host's
//! localization catalog, named bindings for interpolation, and optional
//! replacement suggestions. The core never renders human-readable text
//! itself; callers format diagnostics from code, key and bindings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Diagnostic severity. `Error` is fatal: evaluation must not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Stable rule codes. The wire form (`as_str`) is part of the public
/// contract and must never change for an existing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleCode {
    #[serde(rename = "V-RETRO-LUMINARY")]
    RetroLuminary,
    #[serde(rename = "V-RETRO-ANGLE")]
    RetroAngle,
    #[serde(rename = "V-ASP-SELF")]
    AspSelf,
    #[serde(rename = "V-HOUSE-RANGE")]
    HouseRange,
    #[serde(rename = "V-DEGREE-RANGE")]
    DegreeRange,
    #[serde(rename = "V-RULER-MISUSE")]
    RulerMisuse,
    #[serde(rename = "V-DIGNITY-SIGN-MISMATCH")]
    DignitySignMismatch,
    #[serde(rename = "V-DIGNITY-CONFLICT")]
    DignityConflict,
    #[serde(rename = "V-MODE-MISMATCH")]
    ModeMismatch,
    #[serde(rename = "V-ORB-LARGE")]
    OrbLarge,
    #[serde(rename = "V-TYPE")]
    Type,
}

impl RuleCode {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleCode::RetroLuminary => "V-RETRO-LUMINARY",
            RuleCode::RetroAngle => "V-RETRO-ANGLE",
            RuleCode::AspSelf => "V-ASP-SELF",
            RuleCode::HouseRange => "V-HOUSE-RANGE",
            RuleCode::DegreeRange => "V-DEGREE-RANGE",
            RuleCode::RulerMisuse => "V-RULER-MISUSE",
            RuleCode::DignitySignMismatch => "V-DIGNITY-SIGN-MISMATCH",
            RuleCode::DignityConflict => "V-DIGNITY-CONFLICT",
            RuleCode::ModeMismatch => "V-MODE-MISMATCH",
            RuleCode::OrbLarge => "V-ORB-LARGE",
            RuleCode::Type => "V-TYPE",
        }
    }
}

impl fmt::Display for RuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named value interpolated into a localized diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingValue {
    Str(String),
    Num(f64),
}

impl From<&str> for BindingValue {
    fn from(value: &str) -> Self {
        BindingValue::Str(value.to_string())
    }
}

impl From<String> for BindingValue {
    fn from(value: String) -> Self {
        BindingValue::Str(value)
    }
}

impl From<f64> for BindingValue {
    fn from(value: f64) -> Self {
        BindingValue::Num(value)
    }
}

impl From<u32> for BindingValue {
    fn from(value: u32) -> Self {
        BindingValue::Num(value as f64)
    }
}

/// Individual validation finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: RuleCode,
    pub message_key: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, BindingValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: RuleCode, message_key: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message_key: message_key.into(),
            bindings: BTreeMap::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn warning(code: RuleCode, message_key: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message_key: message_key.into(),
            bindings: BTreeMap::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_binding(mut self, name: impl Into<String>, value: impl Into<BindingValue>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

/// Outcome of validating one formula: all findings, advisory or fatal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Validation {
    pub issues: Vec<Diagnostic>,
}

impl Validation {
    pub fn new(issues: Vec<Diagnostic>) -> Self {
        Self { issues }
    }

    /// True when no fatal issue was found; warnings may still be present.
    pub fn valid(&self) -> bool {
        !self.is_fatal()
    }

    pub fn is_fatal(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
            .count()
    }

    /// Codes of all findings, in emission order.
    pub fn codes(&self) -> Vec<&'static str> {
        self.issues.iter().map(|issue| issue.code.as_str()).collect()
    }

    pub fn has_code(&self, code: RuleCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return f.write_str("no findings");
        }
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", issue.code)?;
        }
        Ok(())
    }
}

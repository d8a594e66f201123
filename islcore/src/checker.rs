//! Runtime contract checking.
//!
//! A [`ContractChecker`] evaluates preconditions, postconditions and invariants against an
//! [`EvaluationContext`] and records violations. A contract that evaluates to a falsy value
//! is *violated*; a contract whose evaluation fails is *unevaluable*. The two are reported
//! separately and only violations are recorded.
//!
//! Example
//! ```
//! use islcore::checker::{CheckerConfig, CheckOutcome, Contract, ContractChecker, ContractKind};
//! use islcore::context::{ContextOptions, create_evaluation_context};
//! use islir::ir::builder::IrBuilder;
//!
//! let b = IrBuilder::new();
//! let contract = Contract::new(
//!     ContractKind::Precondition,
//!     "password_length",
//!     b.ge(b.string_length(b.input_field("password")), b.int(8)),
//! );
//! let ctx = create_evaluation_context(ContextOptions::new().input("password", "short"));
//!
//! let mut checker = ContractChecker::new(CheckerConfig::default());
//! assert!(matches!(checker.check(&contract, &ctx), CheckOutcome::Violated(_)));
//! assert!(checker.has_violations());
//! ```
use std::path::Path;

use chrono::{DateTime, Utc};
use islir::{ir::IrExpr, normalize::normalize, serialize_ir};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIs};

use crate::{
    context::EvaluationContext,
    eval::evaluate,
    utils::error::{EvalError, IslError, IslResult},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    Precondition,
    Postcondition,
    Invariant,
}

/// Named contract expression.
#[derive(Debug, Clone)]
pub struct Contract {
    pub kind: ContractKind,
    pub name: String,
    /// Human-readable description reported with violations; defaults to the name.
    pub message: String,
    expression: IrExpr,
    canonical: String,
}

impl Contract {
    /// The expression is normalized once here; [`Contract::canonical`] is its stable form.
    pub fn new(kind: ContractKind, name: impl Into<String>, expression: IrExpr) -> Self {
        let name = name.into();
        let expression = normalize(&expression);
        Self {
            kind,
            message: name.clone(),
            name,
            canonical: serialize_ir(&expression),
            expression,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn expression(&self) -> &IrExpr {
        &self.expression
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

/// Record of a violated contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub kind: ContractKind,
    pub contract: String,
    pub message: String,
    /// Canonical form of the violated expression.
    pub expression: String,
    /// What the expression evaluated to.
    pub actual: Value,
    /// Clock of the context the check ran against.
    pub timestamp: DateTime<Utc>,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} violation] {}: {} (got {})",
            self.kind, self.message, self.expression, self.actual
        )
    }
}

#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum CheckOutcome {
    Satisfied,
    Violated(Violation),
    Unevaluable(EvalError),
    /// Checks of this contract kind are disabled by the configuration.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub enable_preconditions: bool,
    pub enable_postconditions: bool,
    pub enable_invariants: bool,
    /// Emit a `warn` record for every violation.
    pub log_violations: bool,
    /// Stop [`ContractChecker::check_all`] at the first violated or unevaluable contract.
    pub fail_fast: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            enable_preconditions: true,
            enable_postconditions: true,
            enable_invariants: true,
            log_violations: true,
            fail_fast: false,
        }
    }
}

impl CheckerConfig {
    pub fn from_toml_str(text: &str) -> IslResult<Self> {
        toml::from_str(text).map_err(|e| IslError::ConfigParse {
            source: e,
            file: "<inline>".to_string(),
        })
    }

    /// Load a checker configuration from a TOML file. Missing keys take their defaults.
    pub fn load_from_toml(path: &Path) -> IslResult<Self> {
        let toml_str = std::fs::read_to_string(path)?;

        toml::from_str(&toml_str).map_err(|e| IslError::ConfigParse {
            source: e,
            file: path.display().to_string(),
        })
    }

    fn enabled(&self, kind: ContractKind) -> bool {
        match kind {
            ContractKind::Precondition => self.enable_preconditions,
            ContractKind::Postcondition => self.enable_postconditions,
            ContractKind::Invariant => self.enable_invariants,
        }
    }
}

/// Evaluates contracts and accumulates violations.
#[derive(Debug, Default)]
pub struct ContractChecker {
    config: CheckerConfig,
    violations: Vec<Violation>,
}

impl ContractChecker {
    pub fn new(config: CheckerConfig) -> Self {
        Self {
            config,
            violations: Vec::new(),
        }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    pub fn check(&mut self, contract: &Contract, ctx: &EvaluationContext) -> CheckOutcome {
        if !self.config.enabled(contract.kind) {
            return CheckOutcome::Skipped;
        }
        match evaluate(contract.expression(), ctx) {
            Ok(value) if value.truthy() => CheckOutcome::Satisfied,
            Ok(actual) => {
                let violation = Violation {
                    kind: contract.kind,
                    contract: contract.name.clone(),
                    message: contract.message.clone(),
                    expression: contract.canonical().to_string(),
                    actual,
                    timestamp: ctx.now(),
                };
                if self.config.log_violations {
                    log::warn!("{violation}");
                }
                self.violations.push(violation.clone());
                CheckOutcome::Violated(violation)
            }
            Err(error) => {
                log::error!(
                    "{} '{}' could not be evaluated: {}",
                    contract.kind,
                    contract.name,
                    error
                );
                CheckOutcome::Unevaluable(error)
            }
        }
    }

    /// Check contracts in order. With `fail_fast`, stops after the first outcome that is
    /// neither satisfied nor skipped.
    pub fn check_all<'c>(
        &mut self,
        contracts: impl IntoIterator<Item = &'c Contract>,
        ctx: &EvaluationContext,
    ) -> Vec<CheckOutcome> {
        let mut outcomes = Vec::new();
        for contract in contracts {
            let outcome = self.check(contract, ctx);
            let failed = outcome.is_violated() || outcome.is_unevaluable();
            outcomes.push(outcome);
            if failed && self.config.fail_fast {
                break;
            }
        }
        outcomes
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn clear_violations(&mut self) {
        self.violations.clear();
    }
}

/// Cache key for the result of evaluating `ir` in `ctx`: the canonical IR joined with the
/// context snapshot.
pub fn verification_key(ir: &IrExpr, ctx: &EvaluationContext) -> String {
    format!("{}|{}", serialize_ir(&normalize(ir)), ctx.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_keys() {
        let config = CheckerConfig::from_toml_str("fail_fast = true").unwrap();
        assert!(config.fail_fast);
        assert!(config.log_violations);
        assert!(config.enable_postconditions);
    }

    #[test]
    fn config_rejects_wrong_types() {
        assert!(matches!(
            CheckerConfig::from_toml_str("fail_fast = \"yes\""),
            Err(IslError::ConfigParse { .. })
        ));
    }
}

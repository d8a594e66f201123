//! Runtime side of ISL contracts: values, evaluation contexts, the IR evaluator and a
//! contract checker.
//!
//! IR comes from the [`islir`] crate. Build a context with [`create_evaluation_context`],
//! evaluate with [`evaluate`], or hand named contracts to a [`checker::ContractChecker`]
//! to collect violations. Scenarios can be loaded from TOML through [`scenario::Scenario`].
//!
//! Example
//! ```
//! use islcore::prelude::*;
//! use islir::prelude::IrBuilder;
//!
//! let b = IrBuilder::new();
//! let ir = b.entity_count("User", None);
//! let ctx = create_evaluation_context(
//!     ContextOptions::new().entity("User", vec![Value::record([("id", Value::from("u1"))])]),
//! );
//! assert_eq!(evaluate(&ir, &ctx).unwrap(), Value::Int(1));
//! ```

pub mod checker;
pub mod context;
pub mod eval;
pub mod scenario;
pub mod utils;
pub mod value;

pub extern crate chrono;
pub extern crate islir;

pub use context::create_evaluation_context;
pub use eval::{evaluate, evaluate_condition};

pub mod prelude {
    //! Convenient re-exports for end users.
    pub use crate::checker::{
        CheckOutcome, CheckerConfig, Contract, ContractChecker, ContractKind, Violation,
        verification_key,
    };
    pub use crate::context::{ContextOptions, EntityStore, EvaluationContext, StateSnapshot};
    pub use crate::scenario::Scenario;
    pub use crate::utils::error::{EvalError, EvalResult, IslError, IslResult};
    pub use crate::value::{Record, Value};
    pub use crate::{create_evaluation_context, evaluate, evaluate_condition};
}

use thiserror::Error;

/// Failure of a single evaluation. Absent values, empty collections and zero divisors are
/// not errors; they resolve to defined values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("IR node of kind '{kind}' cannot be evaluated (no compilation rule produced it)")]
    UnsupportedNode { kind: String },

    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("Function '{function}' expects {expected} argument(s), found {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("Operation '{operation}' expects {expected}, found {found}")]
    TypeMismatch {
        operation: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid regular expression '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Function '{function}' is undefined over an empty list")]
    EmptyReduction { function: String },
}

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum IslError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse scenario file '{file}': {source}")]
    ScenarioParse {
        source: toml::de::Error,
        file: String,
    },

    #[error("Failed to parse checker configuration '{file}': {source}")]
    ConfigParse {
        source: toml::de::Error,
        file: String,
    },

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Evaluation failed: {0}")]
    Eval(#[from] EvalError),
}

pub type IslResult<T> = Result<T, IslError>;

use crate::eval::EvalError;

/// Errors raised while building or executing a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Query has an invalid structure
    InvalidQuery(String),
    /// Record value has the wrong type for the operator
    TypeMismatch {
        path: String,
        op: &'static str,
        found: &'static str,
    },
    /// Pattern could not be compiled
    InvalidPattern(String),
    /// `$expr` failed to evaluate
    Eval(EvalError),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery(msg) => write!(f, "Invalid query: {msg}"),
            Self::TypeMismatch { path, op, found } => {
                write!(f, "Type mismatch: {op} cannot be applied to {path} ({found})")
            }
            Self::InvalidPattern(msg) => write!(f, "Invalid pattern: {msg}"),
            Self::Eval(err) => write!(f, "Expression error: {err}"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Eval(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EvalError> for QueryError {
    fn from(err: EvalError) -> Self {
        Self::Eval(err)
    }
}

impl From<regex::Error> for QueryError {
    fn from(err: regex::Error) -> Self {
        Self::InvalidPattern(err.to_string())
    }
}

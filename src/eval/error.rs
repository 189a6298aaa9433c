/// Errors raised while building or evaluating an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Expression has an invalid structure
    InvalidExpression(String),
    /// Operator key is not part of the expression language
    UnknownOperator(String),
    /// Operand has the wrong type for the operator
    TypeMismatch { op: &'static str, found: &'static str },
    /// Division by zero attempted
    DivisionByZero,
    /// Aggregation operator used while evaluating a single row
    AggregateOutsideRowSet(&'static str),
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidExpression(msg) => write!(f, "Invalid expression: {msg}"),
            Self::UnknownOperator(op) => write!(f, "Unknown operator: {op}"),
            Self::TypeMismatch { op, found } => {
                write!(f, "Type mismatch: {op} does not accept a {found} operand")
            }
            Self::DivisionByZero => write!(f, "Division by zero"),
            Self::AggregateOutsideRowSet(op) => {
                write!(f, "{op} can only be evaluated over a row set")
            }
        }
    }
}

impl std::error::Error for EvalError {}

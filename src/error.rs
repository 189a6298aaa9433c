use crate::driver::DriverError;
use crate::eval::EvalError;
use crate::query::QueryError;
use crate::schema::ModelError;

/// Any error surfaced by a driver operation
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Model(ModelError),
    Query(QueryError),
    Eval(EvalError),
    Driver(DriverError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model(e) => write!(f, "Model error: {e}"),
            Self::Query(e) => write!(f, "Query error: {e}"),
            Self::Eval(e) => write!(f, "Evaluation error: {e}"),
            Self::Driver(e) => write!(f, "Driver error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Model(e) => Some(e),
            Self::Query(e) => Some(e),
            Self::Eval(e) => Some(e),
            Self::Driver(e) => Some(e),
        }
    }
}

impl From<ModelError> for Error {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<QueryError> for Error {
    fn from(e: QueryError) -> Self {
        Self::Query(e)
    }
}

impl From<EvalError> for Error {
    fn from(e: EvalError) -> Self {
        Self::Eval(e)
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Self::Driver(e.into())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Self::Driver(e.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

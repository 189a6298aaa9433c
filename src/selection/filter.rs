use crate::ast::Datum;
use crate::eval::Eval;
use crate::query::{FieldQuery, Query};
use crate::schema::{Model, ModelError, Primary};
use crate::selection::row::Row;
use regex::Regex;

/// Input accepted wherever a driver operation selects rows.
#[derive(Default)]
pub enum Filter {
    /// Every row.
    #[default]
    All,
    Query(Query),
    /// Primary key equals the value.
    Key(Datum),
    /// Primary key is one of the values.
    Keys(Vec<Datum>),
    /// Primary key matches the pattern.
    Pattern(Regex),
    /// Expression built from the selection's row.
    Callback(Box<dyn FnOnce(&Row) -> Eval + Send>),
}

impl Filter {
    pub fn callback(f: impl FnOnce(&Row) -> Eval + Send + 'static) -> Self {
        Self::Callback(Box::new(f))
    }

    /// Turn the filter into a query against `model`. Key shorthands need a
    /// single-field primary key.
    pub fn resolve(self, model: &Model, row: &Row) -> Result<Query, ModelError> {
        let shorthand = match self {
            Self::All => return Ok(Query::all()),
            Self::Query(query) => return Ok(query),
            Self::Callback(f) => return Ok(Query::expr(f(row))),
            Self::Key(value) => FieldQuery::Equal(value),
            Self::Keys(values) => FieldQuery::In(values),
            Self::Pattern(pattern) => FieldQuery::Regex(pattern),
        };
        match model.primary() {
            Primary::Single(key) => Ok(Query::field(key, shorthand)),
            Primary::Composite(_) => Err(ModelError::CompositePrimaryKey(model.name().to_string())),
        }
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "All"),
            Self::Query(query) => f.debug_tuple("Query").field(query).finish(),
            Self::Key(value) => f.debug_tuple("Key").field(value).finish(),
            Self::Keys(values) => f.debug_tuple("Keys").field(values).finish(),
            Self::Pattern(pattern) => f.debug_tuple("Pattern").field(pattern).finish(),
            Self::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

impl From<Query> for Filter {
    fn from(query: Query) -> Self {
        Self::Query(query)
    }
}

impl From<Datum> for Filter {
    fn from(value: Datum) -> Self {
        Self::Key(value)
    }
}

impl From<i64> for Filter {
    fn from(value: i64) -> Self {
        Self::Key(Datum::Int(value))
    }
}

impl From<&str> for Filter {
    fn from(value: &str) -> Self {
        Self::Key(Datum::from(value))
    }
}

impl From<Vec<Datum>> for Filter {
    fn from(values: Vec<Datum>) -> Self {
        Self::Keys(values)
    }
}

impl From<Regex> for Filter {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

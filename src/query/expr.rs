use crate::ast::{Datum, Document};
use crate::eval::Eval;
use crate::query::error::QueryError;
use regex::Regex;

/// A boolean predicate over one record. Entries are ANDed together; an empty
/// query matches everything.
#[derive(Debug, Clone, Default)]
pub struct Query {
    entries: Vec<QueryEntry>,
}

#[derive(Debug, Clone)]
pub enum QueryEntry {
    And(Vec<Query>),
    Or(Vec<Query>),
    Not(Box<Query>),
    Expr(Eval),
    Field(String, FieldQuery),
}

/// Predicate applied to the value found at a field path.
#[derive(Debug, Clone)]
pub enum FieldQuery {
    /// Shorthand value equality; `null` also matches a missing value.
    Equal(Datum),
    /// Shorthand membership.
    In(Vec<Datum>),
    /// Shorthand pattern match.
    Regex(Regex),
    /// Every operator must pass.
    Ops(Vec<FieldOp>),
    /// Sub-query against an object value. Only reachable through `$el`.
    Match(Box<Query>),
}

#[derive(Debug, Clone)]
pub enum FieldOp {
    Eq(Datum),
    Ne(Datum),
    Gt(Datum),
    Gte(Datum),
    Lt(Datum),
    Lte(Datum),
    In(Vec<Datum>),
    Nin(Vec<Datum>),
    Regex(Regex),
    /// The record value is the pattern, tested case-insensitively against
    /// the given text.
    RegexFor(String),
    /// Any element of an array value satisfies the sub-predicate.
    El(Box<FieldQuery>),
    Size(usize),
    BitsAllSet(i64),
    BitsAllClear(i64),
    BitsAnySet(i64),
    BitsAnyClear(i64),
    Exists(bool),
}

impl FieldOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq(_) => "$eq",
            Self::Ne(_) => "$ne",
            Self::Gt(_) => "$gt",
            Self::Gte(_) => "$gte",
            Self::Lt(_) => "$lt",
            Self::Lte(_) => "$lte",
            Self::In(_) => "$in",
            Self::Nin(_) => "$nin",
            Self::Regex(_) => "$regex",
            Self::RegexFor(_) => "$regexFor",
            Self::El(_) => "$el",
            Self::Size(_) => "$size",
            Self::BitsAllSet(_) => "$bitsAllSet",
            Self::BitsAllClear(_) => "$bitsAllClear",
            Self::BitsAnySet(_) => "$bitsAnySet",
            Self::BitsAnyClear(_) => "$bitsAnyClear",
            Self::Exists(_) => "$exists",
        }
    }
}

impl FieldQuery {
    pub fn regex(pattern: &str) -> Result<Self, QueryError> {
        Ok(Self::Regex(Regex::new(pattern)?))
    }

    pub fn equal(value: impl Into<Datum>) -> Self {
        Self::Equal(value.into())
    }
}

impl Query {
    /// A query matching every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn field(path: &str, query: FieldQuery) -> Self {
        Self::all().with(path, query)
    }

    pub fn and(queries: Vec<Query>) -> Self {
        Self::from_entry(QueryEntry::And(queries))
    }

    pub fn or(queries: Vec<Query>) -> Self {
        Self::from_entry(QueryEntry::Or(queries))
    }

    pub fn not(query: Query) -> Self {
        Self::from_entry(QueryEntry::Not(Box::new(query)))
    }

    pub fn expr(expr: Eval) -> Self {
        Self::from_entry(QueryEntry::Expr(expr))
    }

    fn from_entry(entry: QueryEntry) -> Self {
        Self {
            entries: vec![entry],
        }
    }

    /// Add a field predicate to this query.
    pub fn with(mut self, path: &str, query: FieldQuery) -> Self {
        self.entries.push(QueryEntry::Field(path.to_string(), query));
        self
    }

    pub fn push(&mut self, entry: QueryEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[QueryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a query from its structural form, e.g.
    /// `{"age": {"$gte": 18}, "$or": [{"role": "admin"}, {"role": "owner"}]}`.
    pub fn parse(value: &Datum) -> Result<Self, QueryError> {
        match value {
            Datum::Object(fields) => parse_query(fields),
            other => Err(QueryError::InvalidQuery(format!(
                "expected an object, got {}",
                other.kind()
            ))),
        }
    }
}

fn parse_query(fields: &Document) -> Result<Query, QueryError> {
    let mut query = Query::all();
    for (key, value) in fields {
        match key.as_str() {
            "$and" => query.push(QueryEntry::And(parse_list(key, value)?)),
            "$or" => query.push(QueryEntry::Or(parse_list(key, value)?)),
            "$not" => query.push(QueryEntry::Not(Box::new(Query::parse(value)?))),
            "$expr" => query.push(QueryEntry::Expr(Eval::parse(value)?)),
            op if op.starts_with('$') => {
                return Err(QueryError::InvalidQuery(format!("unknown operator {op}")));
            }
            path => parse_field(&mut query, path, value)?,
        }
    }
    Ok(query)
}

fn parse_list(key: &str, value: &Datum) -> Result<Vec<Query>, QueryError> {
    match value {
        Datum::Array(items) => items.iter().map(Query::parse).collect(),
        other => Err(QueryError::InvalidQuery(format!(
            "{key} expects an array, got {}",
            other.kind()
        ))),
    }
}

/// Plain nested objects are flattened into dotted paths.
fn parse_field(query: &mut Query, path: &str, value: &Datum) -> Result<(), QueryError> {
    if let Datum::Object(fields) = value {
        if !fields.is_empty() && !is_operator_map(path, fields)? {
            for (key, nested) in fields {
                parse_field(query, &format!("{path}.{key}"), nested)?;
            }
            return Ok(());
        }
    }
    query.push(QueryEntry::Field(path.to_string(), parse_field_query(path, value)?));
    Ok(())
}

fn is_operator_map(path: &str, fields: &Document) -> Result<bool, QueryError> {
    let operators = fields.keys().filter(|k| k.starts_with('$')).count();
    if operators > 0 && operators < fields.len() {
        return Err(QueryError::InvalidQuery(format!(
            "{path} mixes operators and plain keys"
        )));
    }
    Ok(operators > 0)
}

fn parse_field_query(path: &str, value: &Datum) -> Result<FieldQuery, QueryError> {
    match value {
        Datum::Array(items) => Ok(FieldQuery::In(items.clone())),
        Datum::Object(fields) if !fields.is_empty() && is_operator_map(path, fields)? => fields
            .iter()
            .map(|(op, arg)| parse_op(path, op, arg))
            .collect::<Result<_, _>>()
            .map(FieldQuery::Ops),
        other => Ok(FieldQuery::Equal(other.clone())),
    }
}

fn parse_op(path: &str, op: &str, arg: &Datum) -> Result<FieldOp, QueryError> {
    let invalid = |expected: &str| {
        QueryError::InvalidQuery(format!(
            "{op} on {path} expects {expected}, got {}",
            arg.kind()
        ))
    };
    let list = || arg.as_array().map(<[Datum]>::to_vec).ok_or_else(|| invalid("an array"));
    let mask = || arg.as_i64().ok_or_else(|| invalid("an integer"));

    Ok(match op {
        "$eq" => FieldOp::Eq(arg.clone()),
        "$ne" => FieldOp::Ne(arg.clone()),
        "$gt" => FieldOp::Gt(arg.clone()),
        "$gte" => FieldOp::Gte(arg.clone()),
        "$lt" => FieldOp::Lt(arg.clone()),
        "$lte" => FieldOp::Lte(arg.clone()),
        "$in" => FieldOp::In(list()?),
        "$nin" => FieldOp::Nin(list()?),
        "$regex" => {
            let pattern = arg.as_str().ok_or_else(|| invalid("a pattern"))?;
            FieldOp::Regex(Regex::new(pattern)?)
        }
        "$regexFor" => FieldOp::RegexFor(arg.as_str().ok_or_else(|| invalid("a string"))?.to_string()),
        "$el" => FieldOp::El(Box::new(parse_element_query(path, arg)?)),
        "$size" => {
            let size = arg
                .as_i64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| invalid("a non-negative integer"))?;
            FieldOp::Size(size)
        }
        "$bitsAllSet" => FieldOp::BitsAllSet(mask()?),
        "$bitsAllClear" => FieldOp::BitsAllClear(mask()?),
        "$bitsAnySet" => FieldOp::BitsAnySet(mask()?),
        "$bitsAnyClear" => FieldOp::BitsAnyClear(mask()?),
        "$exists" => match arg {
            Datum::Bool(flag) => FieldOp::Exists(*flag),
            _ => return Err(invalid("a boolean")),
        },
        other => {
            return Err(QueryError::InvalidQuery(format!(
                "unknown operator {other} on {path}"
            )));
        }
    })
}

/// `$el` takes a field predicate, or a plain object queried against object
/// elements.
fn parse_element_query(path: &str, arg: &Datum) -> Result<FieldQuery, QueryError> {
    match arg {
        Datum::Object(fields) if !fields.is_empty() && !is_operator_map(path, fields)? => {
            Ok(FieldQuery::Match(Box::new(parse_query(fields)?)))
        }
        other => parse_field_query(path, other),
    }
}

pub mod error;
pub mod expr;


pub use error::QueryError;
pub use expr::{FieldOp, FieldQuery, Query, QueryEntry};

use crate::ast::{Datum, Document, get_path};
use crate::config::Mode;
use crate::eval::Evaluator;
use crate::eval::utils::{compare_values, datum_to_bool, datums_equal};
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;

/// Handler for matching records against a query
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor<'a> {
    reference: Option<&'a str>,
    mode: Mode,
}

impl<'a> QueryExecutor<'a> {
    pub const fn new(reference: Option<&'a str>, mode: Mode) -> Self {
        Self { reference, mode }
    }

    /// Check whether `record` satisfies every entry of `query`.
    pub fn matches(&self, record: &Document, query: &Query) -> Result<bool, QueryError> {
        for entry in query.entries() {
            if !self.matches_entry(record, entry)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn matches_entry(&self, record: &Document, entry: &QueryEntry) -> Result<bool, QueryError> {
        match entry {
            QueryEntry::And(queries) => {
                for query in queries {
                    if !self.matches(record, query)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            QueryEntry::Or(queries) => {
                for query in queries {
                    if self.matches(record, query)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            QueryEntry::Not(query) => Ok(!self.matches(record, query)?),
            QueryEntry::Expr(expr) => {
                let value = Evaluator::row(record, self.reference).evaluate(expr)?;
                Ok(datum_to_bool(&value))
            }
            QueryEntry::Field(path, query) => match get_path(record, path) {
                Some(value) => self.recover(path, self.test_field(path, value, query)),
                None => Ok(absent_matches(query)),
            },
        }
    }

    /// Apply the mode to a predicate result: strict mode surfaces failures,
    /// lenient mode reports them as a non-match.
    fn recover(&self, path: &str, result: Result<bool, QueryError>) -> Result<bool, QueryError> {
        match result {
            Err(err @ QueryError::Eval(_)) => Err(err),
            Err(err) if self.mode.is_strict() => Err(err),
            Err(err) => {
                log::debug!("predicate on {path} treated as no match: {err}");
                Ok(false)
            }
            ok => ok,
        }
    }

    fn test_field(&self, path: &str, value: &Datum, query: &FieldQuery) -> Result<bool, QueryError> {
        match query {
            FieldQuery::Equal(expected) => Ok(datums_equal(value, expected)),
            FieldQuery::In(items) => Ok(contains(items, value)),
            FieldQuery::Regex(pattern) => {
                let subject = regex_subject(path, "$regex", value)?;
                Ok(pattern.is_match(&subject))
            }
            FieldQuery::Ops(ops) => {
                for op in ops {
                    if !self.test_op(path, value, op)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            FieldQuery::Match(query) => match value {
                Datum::Object(fields) => self.matches(fields, query),
                other => Err(mismatch(path, "$el", other)),
            },
        }
    }

    fn test_op(&self, path: &str, value: &Datum, op: &FieldOp) -> Result<bool, QueryError> {
        let ordered = |expected: &Datum, accept: fn(Ordering) -> bool| {
            compare_values(value, expected)
                .map(accept)
                .ok_or_else(|| mismatch(path, op.as_str(), value))
        };

        match op {
            FieldOp::Eq(expected) => Ok(datums_equal(value, expected)),
            FieldOp::Ne(expected) => Ok(!datums_equal(value, expected)),
            FieldOp::Gt(expected) => ordered(expected, Ordering::is_gt),
            FieldOp::Gte(expected) => ordered(expected, Ordering::is_ge),
            FieldOp::Lt(expected) => ordered(expected, Ordering::is_lt),
            FieldOp::Lte(expected) => ordered(expected, Ordering::is_le),
            FieldOp::Regex(pattern) => Ok(pattern.is_match(&regex_subject(path, "$regex", value)?)),
            FieldOp::RegexFor(text) => {
                let Datum::String(source) = value else {
                    return Err(mismatch(path, "$regexFor", value));
                };
                Ok(case_insensitive(source)?.is_match(text))
            }
            FieldOp::El(query) => {
                let Datum::Array(items) = value else {
                    return Err(mismatch(path, "$el", value));
                };
                for item in items {
                    if self.recover(path, self.test_field(path, item, query))? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            FieldOp::Size(size) => match value {
                Datum::Array(items) => Ok(items.len() == *size),
                other => Err(mismatch(path, "$size", other)),
            },
            FieldOp::BitsAllSet(mask) => bits(path, op, value, |d| (d & mask) == *mask),
            FieldOp::BitsAllClear(mask) => bits(path, op, value, |d| (d & mask) == 0),
            FieldOp::BitsAnySet(mask) => bits(path, op, value, |d| (d & mask) != 0),
            FieldOp::BitsAnyClear(mask) => bits(path, op, value, |d| (d & mask) != *mask),
            FieldOp::In(items) => Ok(contains(items, value)),
            FieldOp::Nin(items) => Ok(!contains(items, value)),
            FieldOp::Exists(flag) => Ok(!value.is_null() == *flag),
        }
    }
}

/// A predicate on a field the record lacks does not match, whatever the
/// mode. `{"$exists": false}` is the one operator that holds for it.
fn absent_matches(query: &FieldQuery) -> bool {
    match query {
        FieldQuery::Ops(ops) => {
            !ops.is_empty() && ops.iter().all(|op| matches!(op, FieldOp::Exists(false)))
        }
        _ => false,
    }
}

fn mismatch(path: &str, op: &'static str, value: &Datum) -> QueryError {
    QueryError::TypeMismatch {
        path: path.to_string(),
        op,
        found: value.kind(),
    }
}

fn contains(items: &[Datum], value: &Datum) -> bool {
    items.iter().any(|item| datums_equal(item, value))
}

/// Scalars are matched through their text form.
fn regex_subject(path: &str, op: &'static str, value: &Datum) -> Result<String, QueryError> {
    match value {
        Datum::String(s) => Ok(s.clone()),
        Datum::Int(_) | Datum::Float(_) | Datum::Decimal(_) | Datum::Bool(_) => {
            Ok(value.to_string())
        }
        other => Err(mismatch(path, op, other)),
    }
}

fn case_insensitive(source: &str) -> Result<Regex, QueryError> {
    Ok(RegexBuilder::new(source).case_insensitive(true).build()?)
}

fn bits(
    path: &str,
    op: &FieldOp,
    value: &Datum,
    test: impl Fn(i64) -> bool,
) -> Result<bool, QueryError> {
    value
        .as_i64()
        .map(test)
        .ok_or_else(|| mismatch(path, op.as_str(), value))
}

/// Check a record against a query. `reference` scopes `$expr` field
/// references to one selection.
pub fn execute_query(
    record: &Document,
    query: &Query,
    reference: Option<&str>,
    mode: Mode,
) -> Result<bool, QueryError> {
    QueryExecutor::new(reference, mode).matches(record, query)
}

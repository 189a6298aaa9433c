pub mod error;
pub mod expr;
pub mod update;
pub mod utils;


pub use error::EvalError;
pub use expr::{Aggregate, CompareOp, Eval, FieldRef};
pub use update::{Update, execute_update};

use crate::ast::{Datum, Document, get_path};
use crate::eval::utils::{
    Number, compare_values, datum_to_bool, datum_to_number, datums_equal,
};

/// What an expression is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    /// A single record; aggregation operators are rejected.
    Row(&'a Document),
    /// A row set; only aggregation operators may address fields.
    Rows(&'a [Document]),
}

/// Handler for evaluating expressions against a record or a row set
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    scope: Scope<'a>,
    reference: Option<&'a str>,
}

impl<'a> Evaluator<'a> {
    /// Evaluate against one record
    pub const fn row(data: &'a Document, reference: Option<&'a str>) -> Self {
        Self {
            scope: Scope::Row(data),
            reference,
        }
    }

    /// Evaluate against a row set (aggregate context)
    pub const fn rows(rows: &'a [Document], reference: Option<&'a str>) -> Self {
        Self {
            scope: Scope::Rows(rows),
            reference,
        }
    }

    pub fn evaluate(&self, expr: &Eval) -> Result<Datum, EvalError> {
        match expr {
            Eval::Literal(datum) => Ok(datum.clone()),
            Eval::Field(field) => Ok(self.lookup(field)),
            Eval::If {
                cond,
                then,
                otherwise,
            } => {
                if datum_to_bool(&self.evaluate(cond)?) {
                    self.evaluate(then)
                } else {
                    self.evaluate(otherwise)
                }
            }
            Eval::IfNull(args) => {
                for arg in args {
                    let value = self.evaluate(arg)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                Ok(Datum::Null)
            }
            Eval::Add(args) => self.fold(args, "$add", Number::Int(0), Number::add),
            Eval::Multiply(args) => self.fold(args, "$multiply", Number::Int(1), Number::mul),
            Eval::Subtract(left, right) => {
                let (l, r) = self.operands(left, right, "$subtract")?;
                Ok(l.sub(r).into_datum())
            }
            Eval::Divide(left, right) => {
                let (l, r) = self.operands(left, right, "$divide")?;
                Ok(l.div(r)?.into_datum())
            }
            Eval::Concat(args) => {
                let mut out = String::new();
                for arg in args {
                    match self.evaluate(arg)? {
                        Datum::Null => {}
                        value => out.push_str(&value.to_string()),
                    }
                }
                Ok(Datum::String(out))
            }
            Eval::Compare(op, left, right) => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                Ok(Datum::Bool(compare(*op, &l, &r)))
            }
            Eval::And(args) => {
                for arg in args {
                    if !datum_to_bool(&self.evaluate(arg)?) {
                        return Ok(Datum::Bool(false));
                    }
                }
                Ok(Datum::Bool(true))
            }
            Eval::Or(args) => {
                for arg in args {
                    if datum_to_bool(&self.evaluate(arg)?) {
                        return Ok(Datum::Bool(true));
                    }
                }
                Ok(Datum::Bool(false))
            }
            Eval::Not(arg) => Ok(Datum::Bool(!datum_to_bool(&self.evaluate(arg)?))),
            Eval::Number(arg) => datum_to_number(&self.evaluate(arg)?),
            Eval::Aggregate(op, arg) => match self.scope {
                Scope::Rows(rows) => self.aggregate(*op, arg, rows),
                Scope::Row(_) => Err(EvalError::AggregateOutsideRowSet(op.as_str())),
            },
        }
    }

    /// Field lookup; references bound to another selection resolve to null.
    fn lookup(&self, field: &FieldRef) -> Datum {
        let Scope::Row(data) = self.scope else {
            return Datum::Null;
        };
        if let (Some(expected), Some(actual)) = (self.reference, field.reference.as_deref()) {
            if expected != actual {
                return Datum::Null;
            }
        }
        get_path(data, &field.path).cloned().unwrap_or(Datum::Null)
    }

    fn operands(
        &self,
        left: &Eval,
        right: &Eval,
        op: &'static str,
    ) -> Result<(Number, Number), EvalError> {
        let l = Number::expect(&self.evaluate(left)?, op)?;
        let r = Number::expect(&self.evaluate(right)?, op)?;
        Ok((l, r))
    }

    fn fold(
        &self,
        args: &[Eval],
        op: &'static str,
        seed: Number,
        step: fn(Number, Number) -> Number,
    ) -> Result<Datum, EvalError> {
        let mut acc = seed;
        for arg in args {
            acc = step(acc, Number::expect(&self.evaluate(arg)?, op)?);
        }
        Ok(acc.into_datum())
    }

    fn aggregate(&self, op: Aggregate, arg: &Eval, rows: &[Document]) -> Result<Datum, EvalError> {
        let values = rows
            .iter()
            .map(|row| Evaluator::row(row, self.reference).evaluate(arg))
            .collect::<Result<Vec<_>, _>>()?;

        match op {
            Aggregate::Sum => Ok(sum(&values, op)?.into_datum()),
            Aggregate::Avg => {
                if rows.is_empty() {
                    return Ok(Datum::Float(f64::NAN));
                }
                let len = i64::try_from(rows.len()).unwrap_or(i64::MAX);
                Ok(sum(&values, op)?.div(Number::Int(len))?.into_datum())
            }
            Aggregate::Min => Ok(extreme(values, std::cmp::Ordering::Less)
                .unwrap_or(Datum::Float(f64::INFINITY))),
            Aggregate::Max => Ok(extreme(values, std::cmp::Ordering::Greater)
                .unwrap_or(Datum::Float(f64::NEG_INFINITY))),
            Aggregate::Count => {
                let mut distinct: Vec<Datum> = Vec::new();
                for value in values {
                    if !distinct.iter().any(|seen| datums_equal(seen, &value)) {
                        distinct.push(value);
                    }
                }
                Ok(Datum::Int(i64::try_from(distinct.len()).unwrap_or(i64::MAX)))
            }
        }
    }
}

fn compare(op: CompareOp, left: &Datum, right: &Datum) -> bool {
    match op {
        CompareOp::Eq => datums_equal(left, right),
        CompareOp::Ne => !datums_equal(left, right),
        CompareOp::Gt => compare_values(left, right).is_some_and(|o| o.is_gt()),
        CompareOp::Gte => compare_values(left, right).is_some_and(|o| o.is_ge()),
        CompareOp::Lt => compare_values(left, right).is_some_and(|o| o.is_lt()),
        CompareOp::Lte => compare_values(left, right).is_some_and(|o| o.is_le()),
    }
}

/// Null values are skipped; anything else non-numeric is an error.
fn sum(values: &[Datum], op: Aggregate) -> Result<Number, EvalError> {
    values
        .iter()
        .filter(|v| !v.is_null())
        .try_fold(Number::Int(0), |acc, v| {
            Ok(acc.add(Number::expect(v, op.as_str())?))
        })
}

fn extreme(values: Vec<Datum>, wanted: std::cmp::Ordering) -> Option<Datum> {
    values
        .into_iter()
        .filter(|v| !v.is_null())
        .fold(None, |best, value| match best {
            Some(current) if compare_values(&value, &current) != Some(wanted) => Some(current),
            _ => Some(value),
        })
}

/// Evaluate an expression against a single record.
pub fn execute_eval(data: &Document, expr: &Eval) -> Result<Datum, EvalError> {
    Evaluator::row(data, None).evaluate(expr)
}

/// Evaluate an aggregate expression against a row set.
pub fn execute_aggr(rows: &[Document], expr: &Eval) -> Result<Datum, EvalError> {
    Evaluator::rows(rows, None).evaluate(expr)
}

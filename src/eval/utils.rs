use crate::ast::Datum;
use crate::eval::error::EvalError;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::cmp::Ordering;

/// Numeric view of a datum used by arithmetic and aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
    Decimal(Decimal),
}

impl Number {
    pub const fn from_datum(datum: &Datum) -> Option<Self> {
        match datum {
            Datum::Int(i) => Some(Self::Int(*i)),
            Datum::Float(f) => Some(Self::Float(*f)),
            Datum::Decimal(d) => Some(Self::Decimal(*d)),
            _ => None,
        }
    }

    /// Like `from_datum` but reports the offending operand for `op`.
    pub fn expect(datum: &Datum, op: &'static str) -> Result<Self, EvalError> {
        match Self::from_datum(datum) {
            Some(n) => Ok(n),
            None => Err(EvalError::TypeMismatch {
                op,
                found: datum.kind(),
            }),
        }
    }

    pub fn into_datum(self) -> Datum {
        match self {
            Self::Int(i) => Datum::Int(i),
            Self::Float(f) => Datum::Float(f),
            Self::Decimal(d) => Datum::Decimal(d),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
            Self::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
        }
    }

    fn as_decimal(self) -> Option<Decimal> {
        match self {
            Self::Int(i) => Some(Decimal::from(i)),
            Self::Float(f) => Decimal::from_f64(f),
            Self::Decimal(d) => Some(d),
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Self::Int(i) => i == 0,
            Self::Float(f) => f == 0.0,
            Self::Decimal(d) => d.is_zero(),
        }
    }

    fn combine(
        self,
        rhs: Self,
        int_op: fn(i64, i64) -> Option<i64>,
        dec_op: fn(Decimal, Decimal) -> Option<Decimal>,
        float_op: fn(f64, f64) -> f64,
    ) -> Self {
        let float = || Self::Float(float_op(self.as_f64(), rhs.as_f64()));
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => int_op(a, b).map_or_else(float, Self::Int),
            (Self::Float(_), _) | (_, Self::Float(_)) => float(),
            (a, b) => match (a.as_decimal(), b.as_decimal()) {
                (Some(x), Some(y)) => dec_op(x, y).map_or_else(float, Self::Decimal),
                _ => float(),
            },
        }
    }

    pub fn add(self, rhs: Self) -> Self {
        self.combine(rhs, i64::checked_add, Decimal::checked_add, |a, b| a + b)
    }

    pub fn sub(self, rhs: Self) -> Self {
        self.combine(rhs, i64::checked_sub, Decimal::checked_sub, |a, b| a - b)
    }

    pub fn mul(self, rhs: Self) -> Self {
        self.combine(rhs, i64::checked_mul, Decimal::checked_mul, |a, b| a * b)
    }

    /// Integer division stays integral only when exact.
    pub fn div(self, rhs: Self) -> Result<Self, EvalError> {
        if rhs.is_zero() {
            return Err(EvalError::DivisionByZero);
        }
        Ok(self.combine(
            rhs,
            |a, b| {
                if a.checked_rem(b) == Some(0) {
                    a.checked_div(b)
                } else {
                    None
                }
            },
            Decimal::checked_div,
            |a, b| a / b,
        ))
    }
}

fn compare_numbers(a: &Datum, b: &Datum) -> Option<Ordering> {
    match (a, b) {
        (Datum::Int(x), Datum::Int(y)) => Some(x.cmp(y)),
        (Datum::Decimal(x), Datum::Decimal(y)) => Some(x.cmp(y)),
        (Datum::Decimal(x), Datum::Int(y)) => Some(x.cmp(&Decimal::from(*y))),
        (Datum::Int(x), Datum::Decimal(y)) => Some(Decimal::from(*x).cmp(y)),
        _ => {
            let x = Number::from_datum(a)?.as_f64();
            let y = Number::from_datum(b)?.as_f64();
            x.partial_cmp(&y)
        }
    }
}

/// Check if two datums are equal by value: numbers across representations,
/// dates by timestamp, containers structurally.
pub fn datums_equal(a: &Datum, b: &Datum) -> bool {
    match (a, b) {
        _ if a.is_number() && b.is_number() => compare_numbers(a, b) == Some(Ordering::Equal),
        (Datum::Array(x), Datum::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| datums_equal(l, r))
        }
        (Datum::Object(x), Datum::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, l)| y.get(k).is_some_and(|r| datums_equal(l, r)))
        }
        _ => a == b,
    }
}

/// Compare two datum values. Returns `None` when the kinds cannot be ordered
/// against each other.
pub fn compare_values(a: &Datum, b: &Datum) -> Option<Ordering> {
    match (a, b) {
        _ if a.is_number() && b.is_number() => compare_numbers(a, b),
        (Datum::String(x), Datum::String(y)) => Some(x.cmp(y)),
        (Datum::Bool(x), Datum::Bool(y)) => Some(x.cmp(y)),
        (Datum::Date(x), Datum::Date(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

const fn sort_rank(datum: Option<&Datum>) -> u8 {
    match datum {
        None | Some(Datum::Null) => 0,
        Some(Datum::Bool(_)) => 1,
        Some(Datum::Int(_) | Datum::Float(_) | Datum::Decimal(_)) => 2,
        Some(Datum::String(_)) => 3,
        Some(Datum::Date(_)) => 4,
        Some(Datum::Array(_)) => 5,
        Some(Datum::Object(_)) => 6,
    }
}

/// Total order used for sorting: missing and null values first, then values
/// grouped by kind.
pub fn sort_order(a: Option<&Datum>, b: Option<&Datum>) -> Ordering {
    sort_rank(a).cmp(&sort_rank(b)).then_with(|| match (a, b) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    })
}

/// Convert a datum to boolean value
pub fn datum_to_bool(datum: &Datum) -> bool {
    match datum {
        Datum::Null => false,
        Datum::Bool(b) => *b,
        Datum::Int(i) => *i != 0,
        Datum::Float(f) => *f != 0.0 && !f.is_nan(),
        Datum::Decimal(d) => !d.is_zero(),
        Datum::String(s) => !s.is_empty(),
        Datum::Date(_) | Datum::Array(_) | Datum::Object(_) => true,
    }
}

/// Convert a datum to a number for `$number`
pub fn datum_to_number(datum: &Datum) -> Result<Datum, EvalError> {
    match datum {
        Datum::Int(_) | Datum::Float(_) | Datum::Decimal(_) => Ok(datum.clone()),
        Datum::Null => Ok(Datum::Int(0)),
        Datum::Bool(b) => Ok(Datum::Int(i64::from(*b))),
        Datum::Date(d) => Ok(Datum::Float(d.timestamp_millis() as f64 / 1000.0)),
        Datum::String(s) => {
            let s = s.trim();
            Ok(s.parse::<i64>().map_or_else(
                |_| Datum::Float(s.parse::<f64>().unwrap_or(f64::NAN)),
                Datum::Int,
            ))
        }
        other => Err(EvalError::TypeMismatch {
            op: "$number",
            found: other.kind(),
        }),
    }
}

use crate::ast::{Datum, Document};
use crate::eval::error::EvalError;

/// A `$` leaf: a dotted path, optionally bound to a selection reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub reference: Option<String>,
    pub path: String,
}

impl FieldRef {
    pub fn new(reference: Option<&str>, path: &str) -> Self {
        Self {
            reference: reference.map(ToString::to_string),
            path: path.to_string(),
        }
    }
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reference {
            Some(reference) => write!(f, "{reference}.{}", self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "$eq" => Some(Self::Eq),
            "$ne" => Some(Self::Ne),
            "$gt" => Some(Self::Gt),
            "$gte" => Some(Self::Gte),
            "$lt" => Some(Self::Lt),
            "$lte" => Some(Self::Lte),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl Aggregate {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "$sum",
            Self::Avg => "$avg",
            Self::Min => "$min",
            Self::Max => "$max",
            Self::Count => "$count",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "$sum" => Some(Self::Sum),
            "$avg" => Some(Self::Avg),
            "$min" => Some(Self::Min),
            "$max" => Some(Self::Max),
            "$count" => Some(Self::Count),
            _ => None,
        }
    }
}

/// Computed-value expression. Each node carries exactly one operator, so an
/// expression that mixes operators cannot be represented.
#[derive(Debug, Clone, PartialEq)]
pub enum Eval {
    Literal(Datum),
    Field(FieldRef),
    If {
        cond: Box<Eval>,
        then: Box<Eval>,
        otherwise: Box<Eval>,
    },
    IfNull(Vec<Eval>),
    Add(Vec<Eval>),
    Multiply(Vec<Eval>),
    Subtract(Box<Eval>, Box<Eval>),
    Divide(Box<Eval>, Box<Eval>),
    Concat(Vec<Eval>),
    Compare(CompareOp, Box<Eval>, Box<Eval>),
    And(Vec<Eval>),
    Or(Vec<Eval>),
    Not(Box<Eval>),
    Number(Box<Eval>),
    Aggregate(Aggregate, Box<Eval>),
}

impl Eval {
    pub fn lit(value: impl Into<Datum>) -> Self {
        Self::Literal(value.into())
    }

    pub fn field(path: &str) -> Self {
        Self::Field(FieldRef::new(None, path))
    }

    pub fn if_else(cond: Eval, then: Eval, otherwise: Eval) -> Self {
        Self::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn if_null(args: Vec<Eval>) -> Self {
        Self::IfNull(args)
    }

    pub fn add(args: Vec<Eval>) -> Self {
        Self::Add(args)
    }

    pub fn multiply(args: Vec<Eval>) -> Self {
        Self::Multiply(args)
    }

    pub fn subtract(left: Eval, right: Eval) -> Self {
        Self::Subtract(Box::new(left), Box::new(right))
    }

    pub fn divide(left: Eval, right: Eval) -> Self {
        Self::Divide(Box::new(left), Box::new(right))
    }

    pub fn concat(args: Vec<Eval>) -> Self {
        Self::Concat(args)
    }

    pub fn compare(op: CompareOp, left: Eval, right: Eval) -> Self {
        Self::Compare(op, Box::new(left), Box::new(right))
    }

    pub fn equals(left: Eval, right: Eval) -> Self {
        Self::compare(CompareOp::Eq, left, right)
    }

    pub fn not_equals(left: Eval, right: Eval) -> Self {
        Self::compare(CompareOp::Ne, left, right)
    }

    pub fn gt(left: Eval, right: Eval) -> Self {
        Self::compare(CompareOp::Gt, left, right)
    }

    pub fn gte(left: Eval, right: Eval) -> Self {
        Self::compare(CompareOp::Gte, left, right)
    }

    pub fn lt(left: Eval, right: Eval) -> Self {
        Self::compare(CompareOp::Lt, left, right)
    }

    pub fn lte(left: Eval, right: Eval) -> Self {
        Self::compare(CompareOp::Lte, left, right)
    }

    pub fn and(args: Vec<Eval>) -> Self {
        Self::And(args)
    }

    pub fn or(args: Vec<Eval>) -> Self {
        Self::Or(args)
    }

    pub fn not(arg: Eval) -> Self {
        Self::Not(Box::new(arg))
    }

    pub fn number(arg: Eval) -> Self {
        Self::Number(Box::new(arg))
    }

    pub fn aggregate(op: Aggregate, arg: Eval) -> Self {
        Self::Aggregate(op, Box::new(arg))
    }

    pub fn sum(arg: Eval) -> Self {
        Self::aggregate(Aggregate::Sum, arg)
    }

    pub fn avg(arg: Eval) -> Self {
        Self::aggregate(Aggregate::Avg, arg)
    }

    pub fn min(arg: Eval) -> Self {
        Self::aggregate(Aggregate::Min, arg)
    }

    pub fn max(arg: Eval) -> Self {
        Self::aggregate(Aggregate::Max, arg)
    }

    pub fn count(arg: Eval) -> Self {
        Self::aggregate(Aggregate::Count, arg)
    }

    /// Whether the expression contains an aggregation operator anywhere.
    pub fn is_aggregate(&self) -> bool {
        match self {
            Self::Aggregate(..) => true,
            Self::Literal(_) | Self::Field(_) => false,
            Self::If {
                cond,
                then,
                otherwise,
            } => cond.is_aggregate() || then.is_aggregate() || otherwise.is_aggregate(),
            Self::IfNull(args)
            | Self::Add(args)
            | Self::Multiply(args)
            | Self::Concat(args)
            | Self::And(args)
            | Self::Or(args) => args.iter().any(Self::is_aggregate),
            Self::Subtract(l, r) | Self::Divide(l, r) | Self::Compare(_, l, r) => {
                l.is_aggregate() || r.is_aggregate()
            }
            Self::Not(arg) | Self::Number(arg) => arg.is_aggregate(),
        }
    }

    /// Build an expression from its structural form, e.g.
    /// `{"$add": [{"$": "a"}, 1]}`.
    pub fn parse(value: &Datum) -> Result<Self, EvalError> {
        match value {
            Datum::Object(fields) => parse_operator(fields),
            Datum::Array(_) => Err(EvalError::InvalidExpression(
                "array is not an expression".to_string(),
            )),
            other => Ok(Self::Literal(other.clone())),
        }
    }
}

impl From<Datum> for Eval {
    fn from(value: Datum) -> Self {
        Self::Literal(value)
    }
}

impl From<bool> for Eval {
    fn from(value: bool) -> Self {
        Self::lit(value)
    }
}

impl From<i64> for Eval {
    fn from(value: i64) -> Self {
        Self::lit(value)
    }
}

impl From<f64> for Eval {
    fn from(value: f64) -> Self {
        Self::lit(value)
    }
}

impl From<&str> for Eval {
    fn from(value: &str) -> Self {
        Self::lit(value)
    }
}

impl From<String> for Eval {
    fn from(value: String) -> Self {
        Self::lit(value)
    }
}

fn parse_operator(fields: &Document) -> Result<Eval, EvalError> {
    let mut keys = fields.keys().filter(|k| k.starts_with('$'));
    let Some(key) = keys.next() else {
        return Err(EvalError::InvalidExpression(
            "object without an operator is not an expression".to_string(),
        ));
    };
    if fields.len() > 1 {
        let found = fields.keys().cloned().collect::<Vec<_>>().join(", ");
        return Err(EvalError::InvalidExpression(format!(
            "expected a single operator, found {found}"
        )));
    }
    let arg = &fields[key];

    if let Some(op) = CompareOp::from_key(key) {
        let (left, right) = parse_pair(key, arg)?;
        return Ok(Eval::compare(op, left, right));
    }
    if let Some(op) = Aggregate::from_key(key) {
        let arg = match arg {
            Datum::String(path) => Eval::field(path),
            other => Eval::parse(other)?,
        };
        return Ok(Eval::aggregate(op, arg));
    }

    match key.as_str() {
        "$" => parse_field_ref(arg),
        "$if" => {
            let mut args = parse_list(key, arg)?;
            if args.len() != 3 {
                return Err(arity(key, 3, args.len()));
            }
            let otherwise = args.remove(2);
            let then = args.remove(1);
            let cond = args.remove(0);
            Ok(Eval::if_else(cond, then, otherwise))
        }
        "$ifNull" => {
            let args = parse_list(key, arg)?;
            if args.is_empty() {
                return Err(arity(key, 1, 0));
            }
            Ok(Eval::IfNull(args))
        }
        "$add" => Ok(Eval::Add(parse_list(key, arg)?)),
        "$multiply" => Ok(Eval::Multiply(parse_list(key, arg)?)),
        "$concat" => Ok(Eval::Concat(parse_list(key, arg)?)),
        "$and" => Ok(Eval::And(parse_list(key, arg)?)),
        "$or" => Ok(Eval::Or(parse_list(key, arg)?)),
        "$subtract" => {
            let (left, right) = parse_pair(key, arg)?;
            Ok(Eval::subtract(left, right))
        }
        "$divide" => {
            let (left, right) = parse_pair(key, arg)?;
            Ok(Eval::divide(left, right))
        }
        "$not" => Ok(Eval::not(Eval::parse(arg)?)),
        "$number" => Ok(Eval::number(Eval::parse(arg)?)),
        other => Err(EvalError::UnknownOperator(other.to_string())),
    }
}

fn parse_field_ref(arg: &Datum) -> Result<Eval, EvalError> {
    match arg {
        Datum::String(path) => Ok(Eval::field(path)),
        Datum::Array(parts) => match parts.as_slice() {
            [Datum::String(reference), Datum::String(path)] => {
                Ok(Eval::Field(FieldRef::new(Some(reference), path)))
            }
            _ => Err(EvalError::InvalidExpression(
                "$ expects [reference, path]".to_string(),
            )),
        },
        other => Err(EvalError::InvalidExpression(format!(
            "$ expects a path, got {}",
            other.kind()
        ))),
    }
}

fn parse_list(key: &str, arg: &Datum) -> Result<Vec<Eval>, EvalError> {
    match arg {
        Datum::Array(items) => items.iter().map(Eval::parse).collect(),
        other => Err(EvalError::InvalidExpression(format!(
            "{key} expects an array, got {}",
            other.kind()
        ))),
    }
}

fn parse_pair(key: &str, arg: &Datum) -> Result<(Eval, Eval), EvalError> {
    let mut args = parse_list(key, arg)?;
    if args.len() != 2 {
        return Err(arity(key, 2, args.len()));
    }
    let right = args.remove(1);
    let left = args.remove(0);
    Ok((left, right))
}

fn arity(key: &str, expected: usize, found: usize) -> EvalError {
    EvalError::InvalidExpression(format!(
        "{key} expects {expected} operand(s), got {found}"
    ))
}

use crate::ast::{Datum, Document, set_path};
use crate::eval::error::EvalError;
use crate::eval::expr::Eval;
use crate::eval::Evaluator;
use std::collections::BTreeMap;

/// Assignments keyed by dotted path. Every value is computed from the record
/// as it was before the update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    entries: BTreeMap<String, Eval>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: &str, value: impl Into<Eval>) -> Self {
        self.insert(path, value);
        self
    }

    pub fn insert(&mut self, path: &str, value: impl Into<Eval>) {
        self.entries.insert(path.to_string(), value.into());
    }

    pub fn get(&self, path: &str) -> Option<&Eval> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Eval)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse every value of a structural update map as an expression.
    pub fn parse(source: &Document) -> Result<Self, EvalError> {
        let entries = source
            .iter()
            .map(|(k, v)| Ok((k.clone(), Eval::parse(v)?)))
            .collect::<Result<_, EvalError>>()?;
        Ok(Self { entries })
    }
}

/// Every value becomes a literal assignment.
impl From<Document> for Update {
    fn from(source: Document) -> Self {
        Self {
            entries: source
                .into_iter()
                .map(|(k, v)| (k, Eval::Literal(v)))
                .collect(),
        }
    }
}

/// Apply `update` to `data` in place. All expressions see the original record,
/// so assignments never depend on each other.
pub fn execute_update(
    data: &mut Document,
    update: &Update,
    reference: Option<&str>,
) -> Result<(), EvalError> {
    let values = {
        let evaluator = Evaluator::row(data, reference);
        update
            .iter()
            .map(|(path, expr)| Ok((path, evaluator.evaluate(expr)?)))
            .collect::<Result<Vec<(&str, Datum)>, EvalError>>()?
    };
    for (path, value) in values {
        set_path(data, path, value);
    }
    Ok(())
}

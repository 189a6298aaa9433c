pub mod cursor;
pub mod filter;
pub mod plan;
pub mod row;

#[cfg(test)]
mod tests;

pub use cursor::Cursor;
pub use filter::Filter;
pub use plan::{Direction, Modifier, Plan, Projection};
pub use row::Row;

use crate::ast::{Datum, Document};
use crate::config::Mode;
use crate::driver::{Driver, DriverError};
use crate::error::Result;
use crate::eval::{Eval, EvalError, Evaluator};
use crate::query::QueryError;
use crate::schema::{Model, ModelError};
use std::sync::Arc;

/// Read plan under construction. Every builder call consumes the selection
/// and `execute` is terminal.
#[derive(Debug, Clone)]
pub struct Selection {
    plan: Plan,
    mode: Mode,
}

impl Selection {
    pub fn new(model: Arc<Model>, filter: Filter, mode: Mode) -> std::result::Result<Self, ModelError> {
        let row = Row::generate();
        let query = filter.resolve(&model, &row)?;
        Ok(Self {
            plan: Plan {
                reference: row.reference().to_string(),
                table: model.name().to_string(),
                model,
                query,
                projection: None,
                modifier: Modifier::default(),
            },
            mode,
        })
    }

    pub const fn plan(&self) -> &Plan {
        &self.plan
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Field reference builder bound to this selection.
    pub fn row(&self) -> Row {
        Row::new(&self.plan.reference)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.plan.modifier.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.plan.modifier.offset = offset;
        self
    }

    /// Append a sort key; the first call is the primary sort key.
    pub fn order_by(self, field: &str, direction: Direction) -> Self {
        self.order_by_with(|row| row.field(field), direction)
    }

    pub fn order_by_with(mut self, key: impl FnOnce(&Row) -> Eval, direction: Direction) -> Self {
        let expr = key(&self.row());
        self.plan.modifier.sort.push((expr, direction));
        self
    }

    /// Keep only the given declared fields.
    pub fn project(mut self, fields: &[&str]) -> std::result::Result<Self, ModelError> {
        for field in fields {
            self.plan.model.check_path(field)?;
        }
        self.plan.projection = Some(Projection::Fields(
            fields.iter().map(ToString::to_string).collect(),
        ));
        Ok(self)
    }

    /// Compute each output field from the row.
    pub fn project_with<I, K>(mut self, build: impl FnOnce(&Row) -> I) -> Self
    where
        I: IntoIterator<Item = (K, Eval)>,
        K: Into<String>,
    {
        let entries = build(&self.row())
            .into_iter()
            .map(|(name, expr)| (name.into(), expr))
            .collect();
        self.plan.projection = Some(Projection::Computed(entries));
        self
    }

    /// Switch to aggregate mode: executing yields one value computed over
    /// the selected rows.
    pub fn evaluate(self, build: impl FnOnce(&Row) -> Eval) -> Evaluation {
        let expr = build(&self.row());
        Evaluation {
            plan: self.plan,
            expr,
            mode: self.mode,
        }
    }

    pub fn filter(&self, record: &Document) -> std::result::Result<bool, QueryError> {
        self.plan.filter(record, self.mode)
    }

    pub fn truncate(&self, rows: Vec<Document>) -> std::result::Result<Vec<Document>, EvalError> {
        self.plan.truncate(rows)
    }

    pub fn reshape(&self, record: &Document) -> std::result::Result<Document, EvalError> {
        self.plan.reshape(record)
    }

    pub async fn execute<D: Driver + ?Sized>(self, driver: &D) -> Result<Vec<Document>> {
        match driver.execute(Executable::Selection(self)).await? {
            Output::Rows(rows) => Ok(rows),
            Output::Value(_) => Err(DriverError::other("selection produced a value").into()),
        }
    }
}

/// Aggregate-mode plan.
#[derive(Debug, Clone)]
pub struct Evaluation {
    plan: Plan,
    expr: Eval,
    mode: Mode,
}

impl Evaluation {
    pub const fn plan(&self) -> &Plan {
        &self.plan
    }

    pub const fn expr(&self) -> &Eval {
        &self.expr
    }

    pub fn filter(&self, record: &Document) -> std::result::Result<bool, QueryError> {
        self.plan.filter(record, self.mode)
    }

    /// Evaluate the expression over already selected rows.
    pub fn aggregate(&self, rows: &[Document]) -> std::result::Result<Datum, EvalError> {
        Evaluator::rows(rows, Some(&self.plan.reference)).evaluate(&self.expr)
    }

    pub async fn execute<D: Driver + ?Sized>(self, driver: &D) -> Result<Datum> {
        match driver.execute(Executable::Evaluation(self)).await? {
            Output::Value(value) => Ok(value),
            Output::Rows(_) => Err(DriverError::other("evaluation produced rows").into()),
        }
    }
}

/// Plan handed to `Driver::execute`.
#[derive(Debug, Clone)]
pub enum Executable {
    Selection(Selection),
    Evaluation(Evaluation),
}

impl Executable {
    pub const fn plan(&self) -> &Plan {
        match self {
            Self::Selection(selection) => selection.plan(),
            Self::Evaluation(evaluation) => evaluation.plan(),
        }
    }
}

impl From<Selection> for Executable {
    fn from(selection: Selection) -> Self {
        Self::Selection(selection)
    }
}

impl From<Evaluation> for Executable {
    fn from(evaluation: Evaluation) -> Self {
        Self::Evaluation(evaluation)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Rows(Vec<Document>),
    Value(Datum),
}

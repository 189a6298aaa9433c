use crate::ast::{Datum, Document, get_path, set_path};
use crate::config::Mode;
use crate::eval::utils::sort_order;
use crate::eval::{Eval, EvalError, Evaluator};
use crate::query::{Query, QueryError, execute_query};
use crate::schema::Model;
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction \"{other}\"")),
        }
    }
}

/// Pagination and ordering of a plan. The first sort key is the primary one.
#[derive(Debug, Clone, Default)]
pub struct Modifier {
    pub limit: Option<usize>,
    pub offset: usize,
    pub sort: Vec<(Eval, Direction)>,
}

/// Output shape of a selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Keep these declared paths.
    Fields(Vec<String>),
    /// Output name mapped to a computed value.
    Computed(Vec<(String, Eval)>),
}

impl Projection {
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Fields(paths) => paths.clone(),
            Self::Computed(entries) => entries.iter().map(|(name, _)| name.clone()).collect(),
        }
    }
}

/// Declarative read plan handed to a driver.
#[derive(Debug, Clone)]
pub struct Plan {
    pub reference: String,
    pub table: String,
    pub model: Arc<Model>,
    pub query: Query,
    pub projection: Option<Projection>,
    pub modifier: Modifier,
}

impl Plan {
    /// Whether `record` satisfies the plan's query.
    pub fn filter(&self, record: &Document, mode: Mode) -> Result<bool, QueryError> {
        execute_query(record, &self.query, Some(&self.reference), mode)
    }

    /// Sort by the modifier's keys (stable, later keys break ties), then
    /// apply offset and limit.
    pub fn truncate(&self, rows: Vec<Document>) -> Result<Vec<Document>, EvalError> {
        let Modifier {
            limit,
            offset,
            sort,
        } = &self.modifier;

        let mut rows = if sort.is_empty() {
            rows
        } else {
            let mut keyed = rows
                .into_iter()
                .map(|row| {
                    let evaluator = Evaluator::row(&row, Some(&self.reference));
                    let keys = sort
                        .iter()
                        .map(|(expr, _)| evaluator.evaluate(expr))
                        .collect::<Result<Vec<Datum>, _>>()?;
                    Ok((keys, row))
                })
                .collect::<Result<Vec<_>, EvalError>>()?;
            keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, sort));
            keyed.into_iter().map(|(_, row)| row).collect()
        };

        rows.drain(..(*offset).min(rows.len()));
        if let Some(limit) = limit {
            rows.truncate(*limit);
        }
        Ok(rows)
    }

    /// Apply the projection to a record.
    pub fn reshape(&self, record: &Document) -> Result<Document, EvalError> {
        let Some(projection) = &self.projection else {
            return Ok(record.clone());
        };
        let mut out = Document::new();
        match projection {
            Projection::Fields(paths) => {
                for path in paths {
                    if let Some(value) = get_path(record, path) {
                        set_path(&mut out, path, value.clone());
                    }
                }
            }
            Projection::Computed(entries) => {
                let evaluator = Evaluator::row(record, Some(&self.reference));
                for (name, expr) in entries {
                    set_path(&mut out, name, evaluator.evaluate(expr)?);
                }
            }
        }
        Ok(out)
    }
}

fn compare_keys(a: &[Datum], b: &[Datum], sort: &[(Eval, Direction)]) -> Ordering {
    for ((x, y), (_, direction)) in a.iter().zip(b).zip(sort) {
        let order = match direction {
            Direction::Asc => sort_order(Some(x), Some(y)),
            Direction::Desc => sort_order(Some(y), Some(x)),
        };
        if order != Ordering::Equal {
            return order;
        }
    }
    Ordering::Equal
}

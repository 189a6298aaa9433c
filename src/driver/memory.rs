use crate::ast::{Datum, Document, get_path};
use crate::config::Config;
use crate::driver::{Driver, DriverError, DriverErrorCode, Stats, TableStats};
use crate::error::Result;
use crate::eval::utils::datums_equal;
use crate::eval::{Eval, Update, execute_update};
use crate::schema::{Model, Primary, Registry};
use crate::selection::{Executable, Filter, Output};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Reference backend keeping msgpack-encoded rows in memory.
#[derive(Debug)]
pub struct MemoryDriver {
    registry: Registry,
    config: Config,
    tables: RwLock<BTreeMap<String, Vec<Vec<u8>>>>,
}

impl MemoryDriver {
    pub fn new(registry: Registry, config: Config) -> Self {
        Self {
            registry,
            config,
            tables: RwLock::new(BTreeMap::new()),
        }
    }

    async fn load(&self, table: &str) -> Result<Vec<Document>> {
        let tables = self.tables.read().await;
        decode_rows(tables.get(table).map(Vec::as_slice).unwrap_or_default())
    }

    /// Replace the rows of `table` with the result of `mutate`, holding the
    /// write lock throughout so concurrent writers cannot interleave.
    async fn modify<T>(
        &self,
        table: &str,
        mutate: impl FnOnce(&mut Vec<Document>) -> Result<T> + Send,
    ) -> Result<T> {
        let mut tables = self.tables.write().await;
        let mut rows = decode_rows(tables.get(table).map(Vec::as_slice).unwrap_or_default())?;
        let out = mutate(&mut rows)?;
        tables.insert(table.to_string(), encode_rows(&rows)?);
        Ok(out)
    }
}

fn decode_rows(rows: &[Vec<u8>]) -> Result<Vec<Document>> {
    rows.iter()
        .map(|bytes| -> Result<Document> { Ok(rmp_serde::from_slice(bytes)?) })
        .collect()
}

fn encode_rows(rows: &[Document]) -> Result<Vec<Vec<u8>>> {
    rows.iter()
        .map(|row| -> Result<Vec<u8>> { Ok(rmp_serde::to_vec(row)?) })
        .collect()
}

/// Values of `keys` in `row`, or `None` when any of them is unset.
fn key_values<'a>(row: &'a Document, keys: &[&str]) -> Option<Vec<&'a Datum>> {
    keys.iter()
        .map(|key| get_path(row, key).filter(|value| !value.is_null()))
        .collect()
}

fn same_key(row: &Document, keys: &[&str], values: &[&Datum]) -> bool {
    key_values(row, keys).is_some_and(|found| {
        found
            .iter()
            .zip(values)
            .all(|(a, b)| datums_equal(a, b))
    })
}

/// Fail when two rows share the values of the primary key or of a unique
/// key set.
fn check_unique(model: &Model, rows: &[Document]) -> Result<()> {
    let primary = model.primary_keys();
    let unique = model
        .unique()
        .iter()
        .map(|keys| keys.iter().map(String::as_str).collect::<Vec<_>>());
    for keys in std::iter::once(primary).chain(unique) {
        for (i, row) in rows.iter().enumerate() {
            let Some(values) = key_values(row, &keys) else {
                continue;
            };
            if rows[i + 1..].iter().any(|other| same_key(other, &keys, &values)) {
                return Err(DriverError::duplicate_entry(format!(
                    "duplicate entry for ({}) in {}",
                    keys.join(", "),
                    model.name()
                ))
                .into());
            }
        }
    }
    Ok(())
}

fn next_key(rows: &[Document], key: &str) -> Result<i64> {
    let max = rows
        .iter()
        .filter_map(|row| get_path(row, key).and_then(Datum::as_i64))
        .max();
    match max {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or_else(|| {
            DriverError::new(
                DriverErrorCode::Other("auto-increment".to_string()),
                format!("no key left after {max} for \"{key}\""),
            )
            .into()
        }),
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn config(&self) -> &Config {
        &self.config
    }

    async fn create(&self, table: &str, data: Document) -> Result<Document> {
        log::trace!("create in {table}");
        let model = self.resolve_table(table)?;
        let mut record = model.create(&data)?;
        let record = self
            .modify(table, |rows| {
                if let (true, Primary::Single(key)) = (model.auto_inc(), model.primary()) {
                    if get_path(&record, key).is_none_or(Datum::is_null) {
                        record.insert(key.clone(), Datum::Int(next_key(rows, key)?));
                    }
                }
                rows.push(record.clone());
                check_unique(&model, rows)?;
                Ok(record)
            })
            .await?;
        Ok(model.resolve_data(&record, None))
    }

    async fn remove(&self, table: &str, filter: Filter) -> Result<()> {
        log::trace!("remove from {table}");
        let selection = self.select(table, filter)?;
        self.modify(table, |rows| {
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows.drain(..) {
                if !selection.filter(&row)? {
                    kept.push(row);
                }
            }
            *rows = kept;
            Ok(())
        })
        .await
    }

    async fn set(&self, table: &str, filter: Filter, update: Update) -> Result<()> {
        log::trace!("set in {table}");
        let model = self.resolve_update(table, &update)?;
        let selection = self.select(table, filter)?;
        let reference = selection.plan().reference.as_str();
        self.modify(table, |rows| {
            for row in rows.iter_mut() {
                if selection.filter(row)? {
                    execute_update(row, &update, Some(reference))?;
                }
            }
            check_unique(&model, rows)
        })
        .await
    }

    async fn upsert(
        &self,
        table: &str,
        updates: Vec<Update>,
        keys: Option<Vec<String>>,
    ) -> Result<()> {
        log::trace!("upsert {} row(s) into {table}", updates.len());
        let model = self.resolve_table(table)?;
        let keys = keys.unwrap_or_else(|| {
            model
                .primary_keys()
                .into_iter()
                .map(ToString::to_string)
                .collect()
        });
        let keys = keys.iter().map(String::as_str).collect::<Vec<_>>();

        self.modify(table, |rows| {
            for update in &updates {
                for path in update.keys() {
                    model.check_path(path)?;
                }
                let values = keys
                    .iter()
                    .map(|key| match update.get(key) {
                        Some(Eval::Literal(value)) => Ok(value),
                        _ => Err(DriverError::unsupported_expression(format!(
                            "upsert key \"{key}\" must be a literal value"
                        ))),
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let mut matched = false;
                for row in rows.iter_mut() {
                    if same_key(row, &keys, &values) {
                        execute_update(row, update, None)?;
                        matched = true;
                    }
                }
                if !matched {
                    let mut data = Document::new();
                    execute_update(&mut data, update, None)?;
                    rows.push(model.create(&data)?);
                }
            }
            check_unique(&model, rows)
        })
        .await
    }

    async fn execute(&self, executable: Executable) -> Result<Output> {
        let plan = executable.plan();
        log::trace!("execute on {} as {}", plan.table, plan.reference);
        let mut selected = Vec::new();
        for row in self.load(&plan.table).await? {
            let matches = match &executable {
                Executable::Selection(selection) => selection.filter(&row)?,
                Executable::Evaluation(evaluation) => evaluation.filter(&row)?,
            };
            if matches {
                selected.push(row);
            }
        }
        let selected = plan.truncate(selected)?;

        match &executable {
            Executable::Selection(selection) => {
                let names = plan.projection.as_ref().map(|p| p.names());
                let rows = selected
                    .iter()
                    .map(|row| -> Result<Document> {
                        let shaped = selection.reshape(row)?;
                        Ok(plan.model.resolve_data(&shaped, names.as_deref()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Output::Rows(rows))
            }
            Executable::Evaluation(evaluation) => {
                Ok(Output::Value(evaluation.aggregate(&selected)?))
            }
        }
    }

    async fn stats(&self) -> Result<Stats> {
        let tables = self.tables.read().await;
        let mut stats = Stats::default();
        for table in self.registry.tables() {
            let rows = tables.get(table).map(Vec::as_slice).unwrap_or_default();
            let size: usize = rows.iter().map(Vec::len).sum();
            stats.size += size;
            stats.tables.insert(
                table.to_string(),
                TableStats {
                    count: rows.len(),
                    size,
                },
            );
        }
        Ok(stats)
    }

    async fn drop_all(&self) -> Result<()> {
        log::trace!("drop all tables");
        self.tables.write().await.clear();
        Ok(())
    }
}

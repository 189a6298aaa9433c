pub mod error;
pub mod memory;

pub use error::{DriverError, DriverErrorCode};
pub use memory::MemoryDriver;

use crate::ast::{Datum, Document};
use crate::config::Config;
use crate::error::Result;
use crate::eval::{Eval, Update};
use crate::schema::{Model, ModelError, Registry};
use crate::selection::{Cursor, Executable, Filter, Output, Selection};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub count: usize,
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub size: usize,
    pub tables: BTreeMap<String, TableStats>,
}

/// Contract every storage backend implements. Backends supply the physical
/// operations; model resolution, selection building and record shaping are
/// provided.
#[async_trait]
pub trait Driver: Send + Sync {
    fn registry(&self) -> &Registry;

    fn config(&self) -> &Config;

    /// Insert a new record built from `data` and return it.
    async fn create(&self, table: &str, data: Document) -> Result<Document>;

    /// Delete every row matching `filter`.
    async fn remove(&self, table: &str, filter: Filter) -> Result<()>;

    /// Apply `update` to every row matching `filter`.
    async fn set(&self, table: &str, filter: Filter, update: Update) -> Result<()>;

    /// Update the row sharing the key values of each update, inserting it
    /// when there is none. `keys` defaults to the primary key.
    async fn upsert(&self, table: &str, updates: Vec<Update>, keys: Option<Vec<String>>)
    -> Result<()>;

    async fn execute(&self, executable: Executable) -> Result<Output>;

    async fn stats(&self) -> Result<Stats>;

    /// Remove all stored data.
    async fn drop_all(&self) -> Result<()>;

    fn resolve_table(&self, table: &str) -> Result<Arc<Model>> {
        Ok(self.registry().resolve(table)?)
    }

    fn select(&self, table: &str, filter: Filter) -> Result<Selection> {
        let model = self.resolve_table(table)?;
        Ok(Selection::new(model, filter, self.config().mode)?)
    }

    async fn get(&self, table: &str, filter: Filter, cursor: Cursor) -> Result<Vec<Document>> {
        let selection = cursor.apply(self.select(table, filter)?)?;
        selection.execute(self).await
    }

    #[deprecated(note = "use `select(..).evaluate(..)` instead")]
    async fn eval(&self, table: &str, expr: Eval, filter: Filter) -> Result<Datum> {
        self.select(table, filter)?
            .evaluate(|_| expr)
            .execute(self)
            .await
    }

    /// Reject updates to primary keys or to undeclared fields.
    fn resolve_update(&self, table: &str, update: &Update) -> Result<Arc<Model>> {
        let model = self.resolve_table(table)?;
        let keys = model.primary_keys();
        for path in update.keys() {
            if keys.contains(&path) {
                return Err(ModelError::PrimaryKeyUpdate {
                    table: table.to_string(),
                    key: path.to_string(),
                }
                .into());
            }
            model.check_path(path)?;
        }
        Ok(model)
    }

    /// Shape a stored record for callers.
    fn resolve_data(
        &self,
        table: &str,
        record: &Document,
        projection: Option<&[String]>,
    ) -> Result<Document> {
        Ok(self.resolve_table(table)?.resolve_data(record, projection))
    }
}

use crate::schema::error::ModelError;
use crate::schema::model::{FieldDef, Model, ModelConfig};
use std::collections::BTreeMap;
use std::sync::Arc;

/// All models of a driver, keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    models: BTreeMap<String, Arc<Model>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add fields and index settings to the model of `table`, creating it on
    /// first use. A failed extension leaves the registered model unchanged.
    pub fn extend<I, K>(
        &mut self,
        table: &str,
        fields: I,
        config: ModelConfig,
    ) -> Result<Arc<Model>, ModelError>
    where
        I: IntoIterator<Item = (K, FieldDef)>,
        K: Into<String>,
    {
        let mut model = match self.models.get(table) {
            Some(existing) => Model::clone(existing),
            None => Model::new(table),
        };
        model.extend(fields, config)?;
        let model = Arc::new(model);
        self.models.insert(table.to_string(), Arc::clone(&model));
        Ok(model)
    }

    pub fn get(&self, table: &str) -> Option<Arc<Model>> {
        self.models.get(table).cloned()
    }

    pub fn resolve(&self, table: &str) -> Result<Arc<Model>, ModelError> {
        self.get(table)
            .ok_or_else(|| ModelError::UnknownTable(table.to_string()))
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

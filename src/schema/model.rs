use crate::ast::{Datum, Document, get_path, object_at, set_path};
use crate::schema::error::ModelError;
use crate::schema::field::{Field, FieldType};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type Getter = Arc<dyn Fn(&Document) -> Datum + Send + Sync>;
pub type Setter = Arc<dyn Fn(&mut Document, Datum) + Send + Sync>;

/// A computed, non-persisted accessor. The getter and setter receive the
/// object found at the accessor's parent path.
#[derive(Clone)]
pub struct Internal {
    getter: Getter,
    setter: Option<Setter>,
}

impl Internal {
    pub fn getter(getter: impl Fn(&Document) -> Datum + Send + Sync + 'static) -> Self {
        Self {
            getter: Arc::new(getter),
            setter: None,
        }
    }

    pub fn with_setter(mut self, setter: impl Fn(&mut Document, Datum) + Send + Sync + 'static) -> Self {
        self.setter = Some(Arc::new(setter));
        self
    }
}

impl std::fmt::Debug for Internal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Internal")
            .field("setter", &self.setter.is_some())
            .finish_non_exhaustive()
    }
}

/// Value contributed to a model under a dotted path.
#[derive(Debug, Clone)]
pub enum FieldDef {
    Field(Field),
    Internal(Internal),
}

impl From<Field> for FieldDef {
    fn from(field: Field) -> Self {
        Self::Field(field)
    }
}

impl From<FieldType> for FieldDef {
    fn from(ty: FieldType) -> Self {
        Self::Field(Field::new(ty))
    }
}

impl From<Internal> for FieldDef {
    fn from(internal: Internal) -> Self {
        Self::Internal(internal)
    }
}

/// Shorthand declaration such as `"string(64)"` or `"decimal(10,2)"`.
impl TryFrom<&str> for FieldDef {
    type Error = ModelError;

    fn try_from(source: &str) -> Result<Self, Self::Error> {
        Ok(Self::Field(source.parse()?))
    }
}

/// Shorthand string or descriptor object.
impl TryFrom<&Datum> for FieldDef {
    type Error = ModelError;

    fn try_from(definition: &Datum) -> Result<Self, Self::Error> {
        Ok(Self::Field(Field::parse(definition)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primary {
    Single(String),
    Composite(Vec<String>),
}

impl Primary {
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Single(key) => vec![key.as_str()],
            Self::Composite(keys) => keys.iter().map(String::as_str).collect(),
        }
    }
}

impl Default for Primary {
    fn default() -> Self {
        Self::Single("id".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub key: String,
}

/// Index settings contributed by one `extend` call. Unset options leave the
/// model's current value untouched.
#[derive(Debug, Clone, Default)]
pub struct ModelConfig {
    pub primary: Option<Primary>,
    pub unique: Vec<Vec<String>>,
    pub foreign: BTreeMap<String, ForeignKey>,
    pub auto_inc: Option<bool>,
}

impl ModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary(mut self, key: &str) -> Self {
        self.primary = Some(Primary::Single(key.to_string()));
        self
    }

    pub fn composite(mut self, keys: &[&str]) -> Self {
        self.primary = Some(Primary::Composite(
            keys.iter().map(ToString::to_string).collect(),
        ));
        self
    }

    pub fn unique(mut self, keys: &[&str]) -> Self {
        self.unique.push(keys.iter().map(ToString::to_string).collect());
        self
    }

    pub fn foreign(mut self, field: &str, table: &str, key: &str) -> Self {
        self.foreign.insert(
            field.to_string(),
            ForeignKey {
                table: table.to_string(),
                key: key.to_string(),
            },
        );
        self
    }

    pub fn auto_inc(mut self) -> Self {
        self.auto_inc = Some(true);
        self
    }
}

/// Per-table schema: typed fields, index configuration and computed
/// accessors.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    fields: BTreeMap<String, Field>,
    internals: BTreeMap<String, Internal>,
    primary: Primary,
    unique: Vec<Vec<String>>,
    foreign: BTreeMap<String, ForeignKey>,
    auto_inc: bool,
}

impl Model {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: BTreeMap::new(),
            internals: BTreeMap::new(),
            primary: Primary::default(),
            unique: Vec::new(),
            foreign: BTreeMap::new(),
            auto_inc: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn fields(&self) -> &BTreeMap<String, Field> {
        &self.fields
    }

    pub const fn primary(&self) -> &Primary {
        &self.primary
    }

    pub fn primary_keys(&self) -> Vec<&str> {
        self.primary.keys()
    }

    pub fn unique(&self) -> &[Vec<String>] {
        &self.unique
    }

    pub const fn foreign(&self) -> &BTreeMap<String, ForeignKey> {
        &self.foreign
    }

    pub const fn auto_inc(&self) -> bool {
        self.auto_inc
    }

    pub fn field(&self, path: &str) -> Option<&Field> {
        self.fields.get(path)
    }

    /// Merge field definitions and index settings into the model. Redefined
    /// fields override the previous definition. Fails when a primary or
    /// unique key has no field after the merge.
    pub fn extend<I, K>(&mut self, fields: I, config: ModelConfig) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = (K, FieldDef)>,
        K: Into<String>,
    {
        for (path, def) in fields {
            let path = path.into();
            match def {
                FieldDef::Field(field) => {
                    if let Some(previous) = self.fields.get(&path) {
                        if *previous != field {
                            log::warn!(
                                "model {}: field \"{path}\" redefined as {}",
                                self.name,
                                field.ty
                            );
                        }
                    }
                    self.fields.insert(path, field);
                }
                FieldDef::Internal(internal) => {
                    self.internals.insert(path, internal);
                }
            }
        }

        if let Some(primary) = config.primary {
            self.primary = primary;
        }
        for keys in config.unique {
            if !self.unique.contains(&keys) {
                self.unique.push(keys);
            }
        }
        self.foreign.extend(config.foreign);
        if let Some(auto_inc) = config.auto_inc {
            self.auto_inc = auto_inc;
        }

        self.validate()
    }

    fn validate(&self) -> Result<(), ModelError> {
        let primary = self.primary.keys();
        let unique = self.unique.iter().flatten().map(String::as_str);
        for key in primary.into_iter().chain(unique) {
            if !self.fields.contains_key(key) {
                return Err(ModelError::MissingIndexField {
                    table: self.name.clone(),
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The declared field at `path`, or the json field `path` lies under.
    pub fn resolve_path(&self, path: &str) -> Option<&Field> {
        if let Some(field) = self.fields.get(path) {
            return Some(field);
        }
        let mut prefix = path;
        while let Some((parent, _)) = prefix.rsplit_once('.') {
            if let Some(field) = self.fields.get(parent) {
                return (field.ty == FieldType::Json).then_some(field);
            }
            prefix = parent;
        }
        None
    }

    /// Check that `path` addresses a declared field.
    pub fn check_path(&self, path: &str) -> Result<&Field, ModelError> {
        self.resolve_path(path).ok_or_else(|| self.unknown_field(path))
    }

    fn unknown_field(&self, path: &str) -> ModelError {
        ModelError::UnknownField {
            table: self.name.clone(),
            path: path.to_string(),
        }
    }

    fn has_nested_fields(&self, prefix: &str) -> bool {
        let prefix = format!("{prefix}.");
        self.fields.keys().any(|path| path.starts_with(&prefix))
    }

    /// Flatten a nested record into dotted paths of declared fields. Fails
    /// with `unknown field` on any path the model does not declare.
    pub fn format(&self, source: &Document) -> Result<Document, ModelError> {
        let mut out = Document::new();
        self.flatten(source, "", true, &mut out)?;
        Ok(out)
    }

    /// Like [`Model::format`] but keeps unknown paths as they are.
    pub fn format_lenient(&self, source: &Document) -> Document {
        let mut out = Document::new();
        // Only strict flattening can fail.
        let _ = self.flatten(source, "", false, &mut out);
        out
    }

    fn flatten(
        &self,
        source: &Document,
        prefix: &str,
        strict: bool,
        out: &mut Document,
    ) -> Result<(), ModelError> {
        for (key, value) in source {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            if self.internals.contains_key(&path) {
                continue;
            }
            if self.fields.contains_key(&path) {
                out.insert(path, value.clone());
                continue;
            }
            match value {
                Datum::Object(nested) if self.has_nested_fields(&path) => {
                    self.flatten(nested, &path, strict, out)?;
                }
                Datum::Null if self.has_nested_fields(&path) => {}
                _ if self.resolve_path(&path).is_some() || !strict => {
                    out.insert(path, value.clone());
                }
                _ => return Err(self.unknown_field(&path)),
            }
        }
        Ok(())
    }

    /// Rebuild a nested record from dotted paths. Values of time fields keep
    /// only their time of day on 1970-01-01; date strings become dates.
    pub fn parse(&self, source: &Document) -> Document {
        let mut out = Document::new();
        for (path, value) in source {
            let value = match self.fields.get(path) {
                Some(field) => normalize(field.ty, value.clone()),
                None => value.clone(),
            };
            set_path(&mut out, path, value);
        }
        out
    }

    /// A fresh record: every non-key field at its initial value, overlaid
    /// with `data`.
    pub fn create(&self, data: &Document) -> Result<Document, ModelError> {
        let keys = self.primary_keys();
        let mut flat: Document = self
            .fields
            .iter()
            .filter(|(path, _)| !keys.contains(&path.as_str()))
            .map(|(path, field)| (path.clone(), field.initial_value()))
            .collect();
        flat.extend(self.format(data)?);
        Ok(self.parse(&flat))
    }

    /// Shape a stored record for callers: declared fields missing from the
    /// record become null. With a projection only the projected paths are
    /// kept.
    pub fn resolve_data(&self, record: &Document, projection: Option<&[String]>) -> Document {
        let mut flat = self.format_lenient(record);
        match projection {
            Some(names) => {
                flat.retain(|path, _| names.iter().any(|name| covers(name, path)));
                for name in names {
                    if self.fields.contains_key(name) && !flat.keys().any(|p| covers(name, p)) {
                        flat.insert(name.clone(), Datum::Null);
                    }
                }
            }
            None => {
                for path in self.fields.keys() {
                    flat.entry(path.clone()).or_insert(Datum::Null);
                }
            }
        }
        self.parse(&flat)
    }

    /// Read a computed accessor registered at `path`.
    pub fn get_computed(&self, record: &Document, path: &str) -> Result<Datum, ModelError> {
        let internal = self
            .internals
            .get(path)
            .ok_or_else(|| self.unknown_field(path))?;
        let (parent, _) = path.rsplit_once('.').unwrap_or(("", path));
        let empty = Document::new();
        let target = if parent.is_empty() {
            record
        } else {
            get_path(record, parent)
                .and_then(Datum::as_object)
                .unwrap_or(&empty)
        };
        Ok((internal.getter)(target))
    }

    /// Write through a computed accessor registered at `path`.
    pub fn set_computed(
        &self,
        record: &mut Document,
        path: &str,
        value: Datum,
    ) -> Result<(), ModelError> {
        let internal = self
            .internals
            .get(path)
            .ok_or_else(|| self.unknown_field(path))?;
        let setter = internal.setter.as_ref().ok_or_else(|| ModelError::ReadOnlyField {
            table: self.name.clone(),
            path: path.to_string(),
        })?;
        let (parent, _) = path.rsplit_once('.').unwrap_or(("", path));
        if let Some(target) = object_at(record, parent) {
            setter(target, value);
        }
        Ok(())
    }
}

/// Whether `path` is the projected `name` or lies underneath it.
fn covers(name: &str, path: &str) -> bool {
    path == name
        || path
            .strip_prefix(name)
            .is_some_and(|rest| rest.starts_with('.'))
}

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn normalize(ty: FieldType, value: Datum) -> Datum {
    match (ty, value) {
        (FieldType::Time, Datum::Date(date)) => at_epoch(date.time()),
        (FieldType::Time, Datum::String(text)) => {
            match NaiveTime::parse_from_str(&text, "%H:%M:%S%.f") {
                Ok(time) => at_epoch(time),
                Err(_) => Datum::String(text),
            }
        }
        (FieldType::Timestamp | FieldType::Date, Datum::String(text)) => {
            match DateTime::parse_from_rfc3339(&text) {
                Ok(date) => Datum::Date(date.with_timezone(&Utc)),
                Err(_) => Datum::String(text),
            }
        }
        (_, value) => value,
    }
}

fn at_epoch(time: NaiveTime) -> Datum {
    Datum::Date(epoch().and_time(time).and_utc())
}

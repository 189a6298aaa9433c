use crate::eval::{Eval, FieldRef};
use uuid::Uuid;

/// Builds field references bound to one selection. Callbacks receive a `Row`
/// and address columns with `row.field("a.b")` instead of raw paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    reference: String,
}

impl Row {
    pub fn new(reference: &str) -> Self {
        Self {
            reference: reference.to_string(),
        }
    }

    /// A row with a fresh random reference.
    pub fn generate() -> Self {
        let mut reference = Uuid::new_v4().simple().to_string();
        reference.truncate(8);
        Self { reference }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn field(&self, path: &str) -> Eval {
        Eval::Field(FieldRef::new(Some(&self.reference), path))
    }
}

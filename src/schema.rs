pub mod error;
pub mod field;
pub mod model;
pub mod registry;

#[cfg(test)]
mod tests;

pub use error::ModelError;
pub use field::{Field, FieldType};
pub use model::{FieldDef, ForeignKey, Getter, Internal, Model, ModelConfig, Primary, Setter};
pub use registry::Registry;

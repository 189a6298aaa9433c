/// Schema misuse errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// No model is registered under the table name
    UnknownTable(String),
    /// Path is not a declared field of the model
    UnknownField { table: String, path: String },
    /// Field definition could not be parsed
    InvalidField(String),
    /// Primary or unique key refers to an undeclared field
    MissingIndexField { table: String, key: String },
    /// Key shorthand used against a composite primary key
    CompositePrimaryKey(String),
    /// Update attempted to change a primary key
    PrimaryKeyUpdate { table: String, key: String },
    /// Computed field has no setter
    ReadOnlyField { table: String, path: String },
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTable(table) => write!(f, "unknown table \"{table}\""),
            Self::UnknownField { table, path } => {
                write!(f, "unknown field \"{path}\" in model {table}")
            }
            Self::InvalidField(msg) => write!(f, "invalid field: {msg}"),
            Self::MissingIndexField { table, key } => {
                write!(f, "index key \"{key}\" of model {table} has no field")
            }
            Self::CompositePrimaryKey(table) => write!(
                f,
                "model {table} has a composite primary key, a key shorthand cannot address it"
            ),
            Self::PrimaryKeyUpdate { table, key } => {
                write!(f, "cannot update primary key \"{key}\" of model {table}")
            }
            Self::ReadOnlyField { table, path } => {
                write!(f, "computed field \"{path}\" of model {table} is read-only")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub mod ast;
pub mod config;
pub mod driver;
pub mod error;
pub mod eval;
pub mod query;
pub mod schema;
pub mod selection;

// Re-export commonly used types
pub use ast::{Datum, Document, document, get_path, set_path};
pub use config::{Config, Mode};
pub use driver::{Driver, DriverError, DriverErrorCode, MemoryDriver, Stats, TableStats};
pub use error::{Error, Result};
pub use eval::{Eval, EvalError, Update, execute_aggr, execute_eval, execute_update};
pub use query::{FieldOp, FieldQuery, Query, QueryError, execute_query};
pub use schema::{
    Field, FieldDef, FieldType, Internal, Model, ModelConfig, ModelError, Primary, Registry,
};
pub use selection::{
    Cursor, Direction, Evaluation, Executable, Filter, Output, Projection, Row, Selection,
};

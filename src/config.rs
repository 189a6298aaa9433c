use clap::{Args, ValueEnum};
use serde::Deserialize;

/// How query predicates react to values they cannot evaluate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// A predicate that fails to evaluate does not match.
    #[default]
    Lenient,
    /// Predicate failures are returned to the caller.
    Strict,
}

impl Mode {
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

/// Settings shared by a driver and the selections built against it.
#[derive(Debug, Clone, Default, Args, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Query evaluation mode.
    #[arg(long = "query-mode", env = "TABULA_QUERY_MODE", value_enum, default_value_t = Mode::Lenient)]
    pub mode: Mode,
}

impl Config {
    pub const fn strict() -> Self {
        Self { mode: Mode::Strict }
    }
}

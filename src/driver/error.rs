#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverErrorCode {
    /// A primary or unique key is already taken
    DuplicateEntry,
    /// The backend cannot execute the expression shape
    UnsupportedExpression,
    /// Backend specific failure
    Other(String),
}

impl DriverErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::DuplicateEntry => "duplicate-entry",
            Self::UnsupportedExpression => "unsupported-expression",
            Self::Other(code) => code,
        }
    }
}

/// Failure reported by a storage backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub code: DriverErrorCode,
    pub message: String,
}

impl DriverError {
    pub fn new(code: DriverErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn duplicate_entry(message: impl Into<String>) -> Self {
        Self::new(DriverErrorCode::DuplicateEntry, message)
    }

    pub fn unsupported_expression(message: impl Into<String>) -> Self {
        Self::new(DriverErrorCode::UnsupportedExpression, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(DriverErrorCode::Other("driver".to_string()), message)
    }

    pub fn code(&self) -> &str {
        self.code.as_str()
    }
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message)
    }
}

impl std::error::Error for DriverError {}

impl From<rmp_serde::encode::Error> for DriverError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Self::new(DriverErrorCode::Other("encoding".to_string()), e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for DriverError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Self::new(DriverErrorCode::Other("decoding".to_string()), e.to_string())
    }
}

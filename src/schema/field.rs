use crate::ast::{Datum, Document};
use crate::schema::error::ModelError;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Unsigned,
    Float,
    Double,
    Decimal,
    Char,
    String,
    Text,
    Boolean,
    Timestamp,
    Date,
    Time,
    List,
    Json,
}

impl FieldType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Unsigned => "unsigned",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Char => "char",
            Self::String => "string",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Date => "date",
            Self::Time => "time",
            Self::List => "list",
            Self::Json => "json",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "integer" | "int" => Self::Integer,
            "unsigned" => Self::Unsigned,
            "float" => Self::Float,
            "double" => Self::Double,
            "decimal" => Self::Decimal,
            "char" => Self::Char,
            "string" | "varchar" => Self::String,
            "text" => Self::Text,
            "boolean" | "bool" => Self::Boolean,
            "timestamp" => Self::Timestamp,
            "date" => Self::Date,
            "time" => Self::Time,
            "list" => Self::List,
            "json" => Self::Json,
            _ => return None,
        })
    }

    /// Value a non-nullable field of this type starts with.
    pub fn default_value(&self) -> Datum {
        match self {
            Self::Integer | Self::Unsigned => Datum::Int(0),
            Self::Float | Self::Double => Datum::Float(0.0),
            Self::Decimal => Datum::Decimal(Decimal::ZERO),
            Self::Char | Self::String | Self::Text => Datum::String(String::new()),
            Self::Boolean => Datum::Bool(false),
            Self::List => Datum::Array(Vec::new()),
            Self::Json => Datum::Object(Document::new()),
            Self::Timestamp | Self::Date | Self::Time => Datum::Null,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub ty: FieldType,
    pub length: Option<u32>,
    pub nullable: bool,
    /// Explicit default; `None` falls back to the type default.
    pub initial: Option<Datum>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl Field {
    pub const fn new(ty: FieldType) -> Self {
        Self {
            ty,
            length: None,
            nullable: false,
            initial: None,
            precision: None,
            scale: None,
        }
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn initial(mut self, value: impl Into<Datum>) -> Self {
        self.initial = Some(value.into());
        self
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        let mut field = Self::new(FieldType::Decimal);
        field.precision = Some(precision);
        field.scale = Some(scale);
        field
    }

    /// The value a new record receives for this field.
    pub fn initial_value(&self) -> Datum {
        match &self.initial {
            Some(value) => value.clone(),
            None if self.nullable => Datum::Null,
            None => self.ty.default_value(),
        }
    }

    /// Fill in the type default so every parsed field carries its initial
    /// value explicitly.
    fn normalized(mut self) -> Self {
        self.initial = Some(self.initial_value());
        self
    }

    /// Parse a field definition: either a shorthand string such as
    /// `"string(64)"` or `"decimal(10,2)"`, or a descriptor object
    /// `{"type": "string", "length": 64, "nullable": true, "initial": "x"}`.
    pub fn parse(definition: &Datum) -> Result<Self, ModelError> {
        match definition {
            Datum::String(source) => Self::parse_shorthand(source),
            Datum::Object(descriptor) => Self::parse_descriptor(descriptor),
            other => Err(ModelError::InvalidField(format!(
                "expected a type name or descriptor, got {}",
                other.kind()
            ))),
        }
    }

    fn parse_shorthand(source: &str) -> Result<Self, ModelError> {
        let invalid = || ModelError::InvalidField(format!("unrecognized field type \"{source}\""));
        let text = source.trim();
        let (name, args) = match text.split_once('(') {
            Some((name, rest)) => {
                let inner = rest.trim_end().strip_suffix(')').ok_or_else(invalid)?;
                let args = inner
                    .split(',')
                    .map(|arg| arg.trim().parse::<u32>().map_err(|_| invalid()))
                    .collect::<Result<Vec<_>, _>>()?;
                (name.trim(), args)
            }
            None => (text, Vec::new()),
        };

        let ty = FieldType::from_name(name).ok_or_else(invalid)?;
        let mut field = Self::new(ty);
        match (ty, args.as_slice()) {
            (_, []) => {}
            (FieldType::Decimal, [precision]) => field.precision = Some(*precision),
            (FieldType::Decimal, [precision, scale]) => {
                field.precision = Some(*precision);
                field.scale = Some(*scale);
            }
            (_, [length]) => field.length = Some(*length),
            _ => return Err(invalid()),
        }
        Ok(field.normalized())
    }

    fn parse_descriptor(descriptor: &Document) -> Result<Self, ModelError> {
        let ty = descriptor
            .get("type")
            .and_then(Datum::as_str)
            .and_then(FieldType::from_name)
            .ok_or_else(|| ModelError::InvalidField("descriptor needs a known \"type\"".to_string()))?;
        let number = |key: &str| -> Result<Option<u32>, ModelError> {
            descriptor
                .get(key)
                .map(|value| {
                    value
                        .as_i64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| ModelError::InvalidField(format!("\"{key}\" must be a size")))
                })
                .transpose()
        };

        let field = Self {
            ty,
            length: number("length")?,
            nullable: matches!(descriptor.get("nullable"), Some(Datum::Bool(true))),
            initial: descriptor.get("initial").cloned(),
            precision: number("precision")?,
            scale: number("scale")?,
        };
        Ok(field.normalized())
    }
}

impl FromStr for Field {
    type Err = ModelError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse_shorthand(source)
    }
}

impl From<FieldType> for Field {
    fn from(ty: FieldType) -> Self {
        Self::new(ty)
    }
}

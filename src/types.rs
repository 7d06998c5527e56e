//! Type catalog: abstract field-type tags and their physical column types.
//!
//! Each tag owns a typed options record. Options arrive from the metadata store as a
//! JSON object and are decoded with `deny_unknown_fields`, so a misspelled or
//! unsupported key fails when the descriptor is compiled instead of at DDL time.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Binary,
    Bool,
    Date,
    Datetime,
    Decimal,
    Email,
    Float,
    Integer,
    Json,
    String,
    Text,
}

impl FieldType {
    pub const ALL: [FieldType; 11] = [
        FieldType::Binary,
        FieldType::Bool,
        FieldType::Date,
        FieldType::Datetime,
        FieldType::Decimal,
        FieldType::Email,
        FieldType::Float,
        FieldType::Integer,
        FieldType::Json,
        FieldType::String,
        FieldType::Text,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            FieldType::Binary => "binary",
            FieldType::Bool => "bool",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Decimal => "decimal",
            FieldType::Email => "email",
            FieldType::Float => "float",
            FieldType::Integer => "integer",
            FieldType::Json => "json",
            FieldType::String => "string",
            FieldType::Text => "text",
        }
    }

    pub fn from_tag(tag: &str) -> Option<FieldType> {
        FieldType::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    /// Resolve this type plus its raw options into a physical column type.
    /// Returns the column type and whether a UNIQUE constraint was requested.
    pub fn resolve(&self, options: Option<&serde_json::Map<String, serde_json::Value>>) -> Result<Resolved, String> {
        let resolved = match self {
            FieldType::String | FieldType::Email => {
                let o: LengthOptions = decode(options)?;
                let default_len = if *self == FieldType::Email { 254 } else { 255 };
                let len = o.max_length.unwrap_or(default_len);
                if len == 0 { return Err("max_length must be positive".to_string()); }
                Resolved { column_type: ColumnType::Varchar(len), unique: o.unique }
            }
            FieldType::Decimal => {
                let o: DecimalOptions = decode(options)?;
                let precision = match (o.max_digits, o.decimal_places) {
                    (None, None) => None,
                    (Some(digits), Some(places)) => {
                        if digits == 0 || digits > 1000 { return Err(format!("max_digits {} out of range 1..=1000", digits)); }
                        if places > digits { return Err(format!("decimal_places {} exceeds max_digits {}", places, digits)); }
                        Some((digits, places))
                    }
                    _ => return Err("max_digits and decimal_places must be given together".to_string()),
                };
                Resolved { column_type: ColumnType::Numeric(precision), unique: o.unique }
            }
            other => {
                let o: PlainOptions = decode(options)?;
                let column_type = match other {
                    FieldType::Binary => ColumnType::Bytea,
                    FieldType::Bool => ColumnType::Boolean,
                    FieldType::Date => ColumnType::Date,
                    FieldType::Datetime => ColumnType::TimestampTz,
                    FieldType::Float => ColumnType::DoublePrecision,
                    FieldType::Integer => ColumnType::Integer,
                    FieldType::Json => ColumnType::Jsonb,
                    _ => ColumnType::Text,
                };
                Resolved { column_type, unique: o.unique }
            }
        };
        Ok(resolved)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.tag()) }
}

impl FromStr for FieldType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::from_tag(s).ok_or_else(|| format!("unknown field type '{}'", s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub column_type: ColumnType,
    pub unique: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlainOptions {
    #[serde(default)]
    unique: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LengthOptions {
    max_length: Option<u32>,
    #[serde(default)]
    unique: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DecimalOptions {
    max_digits: Option<u32>,
    decimal_places: Option<u32>,
    #[serde(default)]
    unique: bool,
}

fn decode<T: DeserializeOwned + Default>(options: Option<&serde_json::Map<String, serde_json::Value>>) -> Result<T, String> {
    match options {
        None => Ok(T::default()),
        Some(map) => serde_json::from_value(serde_json::Value::Object(map.clone())).map_err(|e| e.to_string()),
    }
}

/// Physical PostgreSQL column types produced by the catalog, plus the engine's synthetic columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Serial,
    Boolean,
    Integer,
    Varchar(u32),
    Text,
    Jsonb,
    Numeric(Option<(u32, u32)>),
    Date,
    TimestampTz,
    Bytea,
    DoublePrecision,
    TsVector,
}

impl ColumnType {
    pub fn sql(&self) -> String {
        match self {
            ColumnType::Serial => "serial".to_string(),
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::Integer => "integer".to_string(),
            ColumnType::Varchar(n) => format!("varchar({})", n),
            ColumnType::Text => "text".to_string(),
            ColumnType::Jsonb => "jsonb".to_string(),
            ColumnType::Numeric(None) => "numeric".to_string(),
            ColumnType::Numeric(Some((p, s))) => format!("numeric({}, {})", p, s),
            ColumnType::Date => "date".to_string(),
            ColumnType::TimestampTz => "timestamp with time zone".to_string(),
            ColumnType::Bytea => "bytea".to_string(),
            ColumnType::DoublePrecision => "double precision".to_string(),
            ColumnType::TsVector => "tsvector".to_string(),
        }
    }

    /// Type a text parameter is cast to before comparing against this column.
    pub fn param_cast(&self) -> &'static str {
        match self {
            ColumnType::Serial | ColumnType::Integer => "integer",
            ColumnType::Boolean => "boolean",
            ColumnType::Varchar(_) | ColumnType::Text => "text",
            ColumnType::Jsonb => "jsonb",
            ColumnType::Numeric(_) => "numeric",
            ColumnType::Date => "date",
            ColumnType::TimestampTz => "timestamp with time zone",
            ColumnType::Bytea => "bytea",
            ColumnType::DoublePrecision => "double precision",
            ColumnType::TsVector => "tsvector",
        }
    }
}

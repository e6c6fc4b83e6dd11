use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// Target-language type of a generated field or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// 16-bit integer.
    Short,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    Long,
    /// Arbitrary-precision decimal.
    BigDecimal,
    /// Single-precision float.
    Float,
    /// Double-precision float.
    Double,
    /// Boolean / bit.
    Boolean,
    /// Raw bytes.
    Bytes,
    /// Calendar date.
    LocalDate,
    /// Time of day.
    LocalTime,
    /// Timestamp without zone.
    LocalDateTime,
    /// Timestamp with offset.
    OffsetDateTime,
    /// Text, and the fallback for anything unrecognized.
    String,
}

impl TargetType {
    /// Every target type, in declaration order.
    pub const ALL: [TargetType; 13] = [
        TargetType::Short,
        TargetType::Integer,
        TargetType::Long,
        TargetType::BigDecimal,
        TargetType::Float,
        TargetType::Double,
        TargetType::Boolean,
        TargetType::Bytes,
        TargetType::LocalDate,
        TargetType::LocalTime,
        TargetType::LocalDateTime,
        TargetType::OffsetDateTime,
        TargetType::String,
    ];

    /// Type name as written in generated source.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Short => "Short",
            TargetType::Integer => "Integer",
            TargetType::Long => "Long",
            TargetType::BigDecimal => "BigDecimal",
            TargetType::Float => "Float",
            TargetType::Double => "Double",
            TargetType::Boolean => "Boolean",
            TargetType::Bytes => "byte[]",
            TargetType::LocalDate => "LocalDate",
            TargetType::LocalTime => "LocalTime",
            TargetType::LocalDateTime => "LocalDateTime",
            TargetType::OffsetDateTime => "OffsetDateTime",
            TargetType::String => "String",
        }
    }

    /// Fully-qualified import needed to use this type, if it is not built in.
    pub fn import(self) -> Option<&'static str> {
        match self {
            TargetType::BigDecimal => Some("java.math.BigDecimal"),
            TargetType::LocalDate => Some("java.time.LocalDate"),
            TargetType::LocalTime => Some("java.time.LocalTime"),
            TargetType::LocalDateTime => Some("java.time.LocalDateTime"),
            TargetType::OffsetDateTime => Some("java.time.OffsetDateTime"),
            _ => None,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        TargetType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Invalid target type: {s}"))
    }
}

impl Serialize for TargetType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Driver-level type label used when binding a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum DriverType {
    Smallint,
    Tinyint,
    Integer,
    Bigint,
    Decimal,
    Numeric,
    Real,
    Double,
    Boolean,
    Bit,
    Binary,
    Varbinary,
    Blob,
    Date,
    Time,
    Timestamp,
    TimestampWithTimezone,
    Varchar,
    Char,
    Clob,
}

impl DriverType {
    /// Label as written in generated binding code.
    pub fn as_str(self) -> &'static str {
        match self {
            DriverType::Smallint => "SMALLINT",
            DriverType::Tinyint => "TINYINT",
            DriverType::Integer => "INTEGER",
            DriverType::Bigint => "BIGINT",
            DriverType::Decimal => "DECIMAL",
            DriverType::Numeric => "NUMERIC",
            DriverType::Real => "REAL",
            DriverType::Double => "DOUBLE",
            DriverType::Boolean => "BOOLEAN",
            DriverType::Bit => "BIT",
            DriverType::Binary => "BINARY",
            DriverType::Varbinary => "VARBINARY",
            DriverType::Blob => "BLOB",
            DriverType::Date => "DATE",
            DriverType::Time => "TIME",
            DriverType::Timestamp => "TIMESTAMP",
            DriverType::TimestampWithTimezone => "TIMESTAMP_WITH_TIMEZONE",
            DriverType::Varchar => "VARCHAR",
            DriverType::Char => "CHAR",
            DriverType::Clob => "CLOB",
        }
    }
}

impl fmt::Display for DriverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in table: normalized source type name -> (target type, driver type).
const BUILTIN: &[(&str, TargetType, DriverType)] = &[
    ("smallint", TargetType::Short, DriverType::Smallint),
    ("int2", TargetType::Short, DriverType::Smallint),
    ("tinyint", TargetType::Short, DriverType::Tinyint),
    ("integer", TargetType::Integer, DriverType::Integer),
    ("int", TargetType::Integer, DriverType::Integer),
    ("int4", TargetType::Integer, DriverType::Integer),
    ("mediumint", TargetType::Integer, DriverType::Integer),
    ("serial", TargetType::Integer, DriverType::Integer),
    ("bigint", TargetType::Long, DriverType::Bigint),
    ("int8", TargetType::Long, DriverType::Bigint),
    ("bigserial", TargetType::Long, DriverType::Bigint),
    ("decimal", TargetType::BigDecimal, DriverType::Decimal),
    ("numeric", TargetType::BigDecimal, DriverType::Numeric),
    ("number", TargetType::BigDecimal, DriverType::Numeric),
    ("money", TargetType::BigDecimal, DriverType::Decimal),
    ("real", TargetType::Float, DriverType::Real),
    ("float4", TargetType::Float, DriverType::Real),
    ("float", TargetType::Double, DriverType::Double),
    ("float8", TargetType::Double, DriverType::Double),
    ("double", TargetType::Double, DriverType::Double),
    ("double precision", TargetType::Double, DriverType::Double),
    ("boolean", TargetType::Boolean, DriverType::Boolean),
    ("bool", TargetType::Boolean, DriverType::Boolean),
    ("bit", TargetType::Boolean, DriverType::Bit),
    ("binary", TargetType::Bytes, DriverType::Binary),
    ("varbinary", TargetType::Bytes, DriverType::Varbinary),
    ("blob", TargetType::Bytes, DriverType::Blob),
    ("longblob", TargetType::Bytes, DriverType::Blob),
    ("bytea", TargetType::Bytes, DriverType::Varbinary),
    ("date", TargetType::LocalDate, DriverType::Date),
    ("time", TargetType::LocalTime, DriverType::Time),
    ("timestamp", TargetType::LocalDateTime, DriverType::Timestamp),
    ("datetime", TargetType::LocalDateTime, DriverType::Timestamp),
    ("timestamp without time zone", TargetType::LocalDateTime, DriverType::Timestamp),
    ("timestamptz", TargetType::OffsetDateTime, DriverType::TimestampWithTimezone),
    ("timestamp with time zone", TargetType::OffsetDateTime, DriverType::TimestampWithTimezone),
    ("timestamp_with_timezone", TargetType::OffsetDateTime, DriverType::TimestampWithTimezone),
    ("varchar", TargetType::String, DriverType::Varchar),
    ("character varying", TargetType::String, DriverType::Varchar),
    ("varchar2", TargetType::String, DriverType::Varchar),
    ("nvarchar", TargetType::String, DriverType::Varchar),
    ("char", TargetType::String, DriverType::Char),
    ("character", TargetType::String, DriverType::Char),
    ("nchar", TargetType::String, DriverType::Char),
    ("text", TargetType::String, DriverType::Varchar),
    ("uuid", TargetType::String, DriverType::Varchar),
    ("clob", TargetType::String, DriverType::Clob),
    ("longtext", TargetType::String, DriverType::Clob),
];

const FALLBACK: (TargetType, DriverType) = (TargetType::String, DriverType::Varchar);

/// Reduce a source type name to its lookup key.
///
/// Drops any parenthesized arguments (`VARCHAR(100)`, `DECIMAL(12, 2)`),
/// collapses internal whitespace and lowercases. Returns `None` when nothing
/// is left.
pub fn normalize_type_name(source_type_name: &str) -> Option<String> {
    let without_args: String = {
        let mut depth = 0usize;
        source_type_name
            .chars()
            .filter(|c| match c {
                '(' => {
                    depth += 1;
                    false
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    false
                }
                _ => depth == 0,
            })
            .collect()
    };
    let key = without_args
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();
    (!key.is_empty()).then_some(key)
}

/// Maps source database type names to target and driver types.
///
/// Built once (optionally with overrides) and then only read.
#[derive(Debug, Clone)]
pub struct TypeMapper {
    table: HashMap<String, (TargetType, DriverType)>,
}

impl Default for TypeMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeMapper {
    /// Mapper over the built-in table.
    pub fn new() -> Self {
        let table = BUILTIN
            .iter()
            .map(|(name, target, driver)| ((*name).to_string(), (*target, *driver)))
            .collect();
        Self { table }
    }

    /// Mapper with `source type -> target type` overrides applied on top of
    /// the built-in table. An override naming an unknown target type is a
    /// configuration error.
    pub fn with_overrides<'a, I>(overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut mapper = Self::new();
        for (source, target) in overrides {
            let key = normalize_type_name(source)
                .ok_or_else(|| Error::Config("type override with empty source type".to_string()))?;
            let target = TargetType::from_str(target)
                .map_err(|e| Error::Config(format!("type override for '{source}': {e}")))?;
            let driver = mapper
                .table
                .get(&key)
                .map(|(_, driver)| *driver)
                .unwrap_or_else(|| default_driver_for(target));
            mapper.table.insert(key, (target, driver));
        }
        Ok(mapper)
    }

    fn lookup(&self, source_type_name: &str) -> Result<(TargetType, DriverType)> {
        let key = normalize_type_name(source_type_name)
            .ok_or_else(|| Error::invalid("sourceTypeName must not be empty"))?;
        match self.table.get(&key) {
            Some(entry) => Ok(*entry),
            None => {
                tracing::debug!(
                    source_type = source_type_name,
                    "unrecognized source type; using text fallback"
                );
                Ok(FALLBACK)
            }
        }
    }

    /// Target-language type for a source type name.
    pub fn target_type_for(&self, source_type_name: &str) -> Result<TargetType> {
        self.lookup(source_type_name).map(|(target, _)| target)
    }

    /// Driver binding type for a source type name.
    pub fn source_driver_type_for(&self, source_type_name: &str) -> Result<DriverType> {
        self.lookup(source_type_name).map(|(_, driver)| driver)
    }

    /// Whether the name maps through the table rather than the fallback.
    pub fn is_known(&self, source_type_name: &str) -> bool {
        normalize_type_name(source_type_name).is_some_and(|key| self.table.contains_key(&key))
    }
}

fn default_driver_for(target: TargetType) -> DriverType {
    match target {
        TargetType::Short => DriverType::Smallint,
        TargetType::Integer => DriverType::Integer,
        TargetType::Long => DriverType::Bigint,
        TargetType::BigDecimal => DriverType::Decimal,
        TargetType::Float => DriverType::Real,
        TargetType::Double => DriverType::Double,
        TargetType::Boolean => DriverType::Boolean,
        TargetType::Bytes => DriverType::Varbinary,
        TargetType::LocalDate => DriverType::Date,
        TargetType::LocalTime => DriverType::Time,
        TargetType::LocalDateTime => DriverType::Timestamp,
        TargetType::OffsetDateTime => DriverType::TimestampWithTimezone,
        TargetType::String => DriverType::Varchar,
    }
}

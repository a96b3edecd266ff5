//! Unified value model
//!
//! Connectors hand over cells as [`GenericValue`]s: the column the cell belongs
//! to plus a [`RawValue`] in whatever shape the store produced it (a CSV string,
//! a typed SQL scalar, a nullable wrapper, raw bytes). [`normalize`] turns any
//! of them into a [`CanonicalValue`] chosen by the column's declared
//! [`ColumnType`], and [`equal`] compares canonical values without any further
//! coercion.

use crate::error::{Result, TabreconError};
use crate::schema::Column;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Accepted textual date format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Accepted textual date-time format (second precision)
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    String,
    Date,
    Datetime,
    Bytes,
    /// Type unknown or unconvertible; never valid for a real column
    Null,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::String => "string",
            ColumnType::Date => "date",
            ColumnType::Datetime => "datetime",
            ColumnType::Bytes => "bytes",
            ColumnType::Null => "null",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "int" | "integer" => Ok(Self::Int),
            "float" | "double" => Ok(Self::Float),
            "bool" | "boolean" => Ok(Self::Bool),
            "string" | "text" => Ok(Self::String),
            "date" => Ok(Self::Date),
            "datetime" | "timestamp" => Ok(Self::Datetime),
            "bytes" | "blob" => Ok(Self::Bytes),
            "null" => Ok(Self::Null),
            other => Err(format!("Unknown column type: {}", other)),
        }
    }
}

/// A cell exactly as a connector produced it
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// No value (SQL NULL, empty nullable wrapper, empty CSV cell)
    Null,
    /// Textual cell from CSV or spreadsheet sources
    Text(String),
    Int(i64),
    /// Unsigned value that may not fit in an i64
    UInt(u64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Datetime(NaiveDateTime),
    Bytes(Vec<u8>),
    /// Native value with no normalization path, described by its type name
    Unsupported(String),
}

impl RawValue {
    /// Short name of the native representation, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Text(_) => "text",
            RawValue::Int(_) => "integer",
            RawValue::UInt(_) => "unsigned integer",
            RawValue::Float(_) => "float",
            RawValue::Bool(_) => "boolean",
            RawValue::Date(_) => "date",
            RawValue::Datetime(_) => "datetime",
            RawValue::Bytes(_) => "bytes",
            RawValue::Unsupported(_) => "unsupported native value",
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => f.write_str("NULL"),
            RawValue::Text(s) => f.write_str(s),
            RawValue::Int(i) => write!(f, "{}", i),
            RawValue::UInt(u) => write!(f, "{}", u),
            RawValue::Float(x) => write!(f, "{}", x),
            RawValue::Bool(b) => write!(f, "{}", b),
            RawValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            RawValue::Datetime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            RawValue::Bytes(b) => f.write_str(&hex_bytes(b)),
            RawValue::Unsupported(desc) => write!(f, "<{}>", desc),
        }
    }
}

macro_rules! raw_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for RawValue {
            fn from(v: $t) -> Self {
                RawValue::Int(i64::from(v))
            }
        })*
    };
}

raw_from_signed!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for RawValue {
    fn from(v: u64) -> Self {
        RawValue::UInt(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(v)
    }
}

impl From<f32> for RawValue {
    // Widen through the shortest decimal form so 1.1f32 matches the text "1.1"
    fn from(v: f32) -> Self {
        RawValue::Float(v.to_string().parse().unwrap_or(f64::from(v)))
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<NaiveDate> for RawValue {
    fn from(v: NaiveDate) -> Self {
        RawValue::Date(v)
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(v: NaiveDateTime) -> Self {
        RawValue::Datetime(v)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(v: Vec<u8>) -> Self {
        RawValue::Bytes(v)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(RawValue::Null, Into::into)
    }
}

/// Normalized, cross-store comparable form of a cell
#[derive(Debug, Clone)]
pub enum CanonicalValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Date(NaiveDate),
    /// Always truncated to whole seconds
    Datetime(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl CanonicalValue {
    /// The column type this canonical form mirrors
    pub fn kind(&self) -> ColumnType {
        match self {
            CanonicalValue::Null => ColumnType::Null,
            CanonicalValue::Int(_) => ColumnType::Int,
            CanonicalValue::Float(_) => ColumnType::Float,
            CanonicalValue::Bool(_) => ColumnType::Bool,
            CanonicalValue::String(_) => ColumnType::String,
            CanonicalValue::Date(_) => ColumnType::Date,
            CanonicalValue::Datetime(_) => ColumnType::Datetime,
            CanonicalValue::Bytes(_) => ColumnType::Bytes,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CanonicalValue::Null)
    }

    /// Canonical textual form; `None` for null
    pub fn to_text(&self) -> Option<String> {
        match self {
            CanonicalValue::Null => None,
            CanonicalValue::Int(i) => Some(i.to_string()),
            CanonicalValue::Float(x) => Some(x.to_string()),
            CanonicalValue::Bool(b) => Some(b.to_string()),
            CanonicalValue::String(s) => Some(s.clone()),
            CanonicalValue::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
            CanonicalValue::Datetime(dt) => Some(dt.format(DATETIME_FORMAT).to_string()),
            CanonicalValue::Bytes(b) => Some(hex_bytes(b)),
        }
    }
}

impl PartialEq for CanonicalValue {
    fn eq(&self, other: &Self) -> bool {
        equal(self, other)
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("NULL"),
        }
    }
}

/// A single cell: the column it belongs to and its raw native value
#[derive(Debug, Clone, PartialEq)]
pub struct GenericValue {
    column: Arc<Column>,
    raw: RawValue,
}

impl GenericValue {
    pub fn new(column: Arc<Column>, raw: impl Into<RawValue>) -> Self {
        Self {
            column,
            raw: raw.into(),
        }
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn column_name(&self) -> &str {
        &self.column.name
    }

    pub fn raw(&self) -> &RawValue {
        &self.raw
    }

    /// Normalize against this value's own column
    pub fn normalize(&self) -> Result<CanonicalValue> {
        normalize(self)
    }

    /// Canonical text when the value normalizes, raw text otherwise; `None` for null
    pub fn display_text(&self) -> Option<String> {
        match self.normalize() {
            Ok(value) => value.to_text(),
            Err(_) => match &self.raw {
                RawValue::Null => None,
                raw => Some(raw.to_string()),
            },
        }
    }
}

impl Serialize for GenericValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.display_text() {
            Some(text) => serializer.serialize_str(&text),
            None => serializer.serialize_none(),
        }
    }
}

/// Normalize a cell against the column it carries
pub fn normalize(value: &GenericValue) -> Result<CanonicalValue> {
    normalize_as(&value.raw, &value.column)
}

/// Normalize a raw value against an explicit column definition.
///
/// The declared type picks the canonical form. Textual input is parsed,
/// typed input is mapped directly, and null maps to null whatever the
/// column's `not_null` flag says.
pub fn normalize_as(raw: &RawValue, column: &Column) -> Result<CanonicalValue> {
    let column_type = column.column_type;
    let mismatch = || TabreconError::value_conversion(&column.name, column_type, raw.to_string());

    if column_type == ColumnType::Null {
        return Err(TabreconError::unsupported_conversion(
            &column.name,
            column_type,
            raw.kind(),
        ));
    }

    match raw {
        RawValue::Null => return Ok(CanonicalValue::Null),
        RawValue::Unsupported(desc) => {
            return Err(TabreconError::unsupported_conversion(
                &column.name,
                column_type,
                desc.clone(),
            ))
        }
        _ => {}
    }

    match column_type {
        ColumnType::Int => match raw {
            RawValue::Int(i) => Ok(CanonicalValue::Int(*i)),
            RawValue::UInt(u) => i64::try_from(*u).map(CanonicalValue::Int).map_err(|_| mismatch()),
            RawValue::Float(x) if x.fract() == 0.0 && x.abs() < 9.2e18 => {
                Ok(CanonicalValue::Int(*x as i64))
            }
            RawValue::Text(s) => s.trim().parse().map(CanonicalValue::Int).map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        ColumnType::Float => match raw {
            RawValue::Float(x) => Ok(CanonicalValue::Float(canonical_float(*x))),
            RawValue::Int(i) => Ok(CanonicalValue::Float(*i as f64)),
            RawValue::UInt(u) => Ok(CanonicalValue::Float(*u as f64)),
            RawValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(|x| CanonicalValue::Float(canonical_float(x)))
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        ColumnType::Bool => match raw {
            RawValue::Bool(b) => Ok(CanonicalValue::Bool(*b)),
            RawValue::Int(0) | RawValue::UInt(0) => Ok(CanonicalValue::Bool(false)),
            RawValue::Int(1) | RawValue::UInt(1) => Ok(CanonicalValue::Bool(true)),
            RawValue::Text(s) => parse_bool(s).map(CanonicalValue::Bool).ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ColumnType::String => match raw {
            RawValue::Text(s) => Ok(CanonicalValue::String(s.clone())),
            RawValue::Bytes(b) => String::from_utf8(b.clone())
                .map(CanonicalValue::String)
                .map_err(|_| mismatch()),
            RawValue::Int(_)
            | RawValue::UInt(_)
            | RawValue::Float(_)
            | RawValue::Bool(_)
            | RawValue::Date(_)
            | RawValue::Datetime(_) => Ok(CanonicalValue::String(raw.to_string())),
            _ => Err(mismatch()),
        },
        ColumnType::Date => match raw {
            RawValue::Date(d) => Ok(CanonicalValue::Date(*d)),
            RawValue::Datetime(dt) => Ok(CanonicalValue::Date(dt.date())),
            RawValue::Text(s) => parse_date(s).map(CanonicalValue::Date).ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ColumnType::Datetime => match raw {
            RawValue::Datetime(dt) => Ok(CanonicalValue::Datetime(truncate_seconds(*dt))),
            RawValue::Date(d) => Ok(CanonicalValue::Datetime(d.and_time(NaiveTime::MIN))),
            RawValue::Text(s) => parse_datetime(s)
                .map(CanonicalValue::Datetime)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ColumnType::Bytes => match raw {
            RawValue::Bytes(b) => Ok(CanonicalValue::Bytes(b.clone())),
            RawValue::Text(_) => Err(TabreconError::unsupported_conversion(
                &column.name,
                column_type,
                raw.kind(),
            )),
            _ => Err(mismatch()),
        },
        ColumnType::Null => Err(TabreconError::unsupported_conversion(
            &column.name,
            column_type,
            raw.kind(),
        )),
    }
}

// chrono accepts unpadded and signed fields, so the parse must round-trip
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .filter(|d| d.format(DATE_FORMAT).to_string() == s)
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .ok()
        .filter(|dt| dt.format(DATETIME_FORMAT).to_string() == s)
}

/// Typed equality between canonical values.
///
/// Null equals only null, different kinds never compare equal, and floats
/// are equal only when bit-identical.
pub fn equal(a: &CanonicalValue, b: &CanonicalValue) -> bool {
    match (a, b) {
        (CanonicalValue::Null, CanonicalValue::Null) => true,
        (CanonicalValue::Int(x), CanonicalValue::Int(y)) => x == y,
        (CanonicalValue::Float(x), CanonicalValue::Float(y)) => x.to_bits() == y.to_bits(),
        (CanonicalValue::Bool(x), CanonicalValue::Bool(y)) => x == y,
        (CanonicalValue::String(x), CanonicalValue::String(y)) => x == y,
        (CanonicalValue::Date(x), CanonicalValue::Date(y)) => x == y,
        (CanonicalValue::Datetime(x), CanonicalValue::Datetime(y)) => x == y,
        (CanonicalValue::Bytes(x), CanonicalValue::Bytes(y)) => x == y,
        _ => false,
    }
}

fn canonical_float(x: f64) -> f64 {
    if x.is_nan() {
        f64::NAN
    } else {
        x
    }
}

fn truncate_seconds(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(dt)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

//! Schemaless document to fixed-schema [`Row`] conversion.
//!
//! Conversion happens in two explicit steps per column:
//! 1. **Resolve** the column's dotted field path against the document, yielding an
//!    optional BSON value (missing, `null`, and `undefined` are all "no value").
//! 2. **Coerce** the value through the table for the column's [`ColumnType`].
//!
//! Missing fields become [`Value::Null`]; documents are sparse and that is not an
//! error. A value that is present but cannot be coerced fails the whole document with
//! an [`ErrorKind::Conversion`](crate::ErrorKind::Conversion) error instead of being
//! nulled.

use crate::error::{ReaderError, ReaderResult};
use crate::schema::{ColumnDescriptor, ColumnSpec, ColumnType};
use crate::value::{Row, Value};
use bson::oid::ObjectId;
use bson::{Bson, Document};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Stateless converter bound to one column spec.
///
/// Cloning is cheap (the column spec is reference-counted), and a single converter can be
/// shared by any number of concurrently running readers.
#[derive(Debug, Clone)]
pub struct RowConverter {
    columns: ColumnSpec,
}

impl RowConverter {
    #[must_use]
    pub const fn new(columns: ColumnSpec) -> Self {
        Self { columns }
    }

    #[must_use]
    pub const fn columns(&self) -> &ColumnSpec {
        &self.columns
    }

    /// Convert one document into a row with one value per column, in spec order.
    ///
    /// # Errors
    /// Returns a conversion error naming the first column whose value could not be
    /// coerced to its declared type.
    pub fn convert(&self, doc: &Document) -> ReaderResult<Row> {
        let mut values = Vec::with_capacity(self.columns.len());
        for col in self.columns.iter() {
            let value = if let Some(constant) = &col.value {
                coerce(&Bson::String(constant.clone()), col)
            } else {
                match resolve_path(doc, col.field_path()) {
                    Some(raw) => coerce(raw, col),
                    None => Ok(Value::Null),
                }
            };
            values.push(value.map_err(|e| {
                ReaderError::conversion(format!(
                    "column '{}' ({}): {}",
                    col.name, col.column_type, e.message
                ))
            })?);
        }
        Ok(Row::new(values))
    }
}

/// Look up a dotted path, descending through sub-documents and array indices.
///
/// Returns `None` when any segment is missing or the final value is `null`/`undefined`.
#[must_use]
pub fn resolve_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    match lookup_path(doc, path)? {
        Bson::Null | Bson::Undefined => None,
        other => Some(other),
    }
}

/// Raw lookup; an explicit `null` is returned as `Some(Bson::Null)`.
pub(crate) fn lookup_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(sub) => sub.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Coerce one resolved BSON value to the column's declared type.
///
/// # Errors
/// Returns a conversion error describing the rejected source value.
pub fn coerce(raw: &Bson, col: &ColumnDescriptor) -> ReaderResult<Value> {
    match col.column_type {
        ColumnType::String => to_string_value(raw, col.splitter.as_deref()).map(Value::String),
        ColumnType::Int => to_i64(raw).and_then(|v| {
            i32::try_from(v)
                .map(Value::Int)
                .map_err(|_| ReaderError::conversion(format!("{v} is out of range for int")))
        }),
        ColumnType::Long => to_i64(raw).map(Value::Long),
        ColumnType::Double => to_f64(raw).map(Value::Double),
        ColumnType::Decimal => to_decimal(raw).map(Value::Decimal),
        ColumnType::Boolean => to_bool(raw).map(Value::Boolean),
        ColumnType::Date => to_date(raw).map(Value::Date),
        ColumnType::Timestamp => to_timestamp(raw).map(Value::Timestamp),
        ColumnType::ObjectId => match raw {
            Bson::ObjectId(oid) => Ok(Value::ObjectId(oid.to_hex())),
            Bson::String(s) => ObjectId::parse_str(s.trim())
                .map(|oid| Value::ObjectId(oid.to_hex()))
                .map_err(|_| reject(raw, "objectid")),
            _ => Err(reject(raw, "objectid")),
        },
        ColumnType::Binary => match raw {
            Bson::Binary(bin) => Ok(Value::Binary(bin.bytes.clone())),
            _ => Err(reject(raw, "binary")),
        },
    }
}

fn reject(raw: &Bson, target: &str) -> ReaderError {
    ReaderError::conversion(format!(
        "cannot convert {:?} value {raw} to {target}",
        raw.element_type()
    ))
}

fn to_string_value(raw: &Bson, splitter: Option<&str>) -> ReaderResult<String> {
    Ok(match raw {
        Bson::String(s) | Bson::Symbol(s) => s.clone(),
        Bson::Int32(v) => v.to_string(),
        Bson::Int64(v) => v.to_string(),
        Bson::Double(v) => v.to_string(),
        Bson::Boolean(v) => v.to_string(),
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::DateTime(dt) => dt.to_chrono().to_rfc3339(),
        Bson::Decimal128(_) => decimal_text(raw)?,
        Bson::Array(items) if splitter.is_some() => {
            let sep = splitter.unwrap_or_default();
            let parts = items
                .iter()
                .map(|item| to_string_value(item, None))
                .collect::<ReaderResult<Vec<_>>>()?;
            parts.join(sep)
        }
        other => other.clone().into_relaxed_extjson().to_string(),
    })
}

fn parse_number<T: std::str::FromStr>(s: &str, raw: &Bson, target: &str) -> ReaderResult<T> {
    s.trim().parse::<T>().map_err(|_| reject(raw, target))
}

/// 2^63, exactly representable as `f64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn to_i64(raw: &Bson) -> ReaderResult<i64> {
    match raw {
        Bson::Int32(v) => Ok(i64::from(*v)),
        Bson::Int64(v) => Ok(*v),
        Bson::Double(v) if v.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(v) => {
            Ok(*v as i64)
        }
        Bson::String(s) => parse_number::<i64>(s, raw, "integer"),
        _ => Err(reject(raw, "integer")),
    }
}

fn to_f64(raw: &Bson) -> ReaderResult<f64> {
    match raw {
        Bson::Int32(v) => Ok(f64::from(*v)),
        Bson::Int64(v) => Ok(*v as f64),
        Bson::Double(v) => Ok(*v),
        Bson::Decimal128(_) => {
            let text = decimal_text(raw)?;
            parse_number::<f64>(&text, raw, "double")
        }
        Bson::String(s) => parse_number::<f64>(s, raw, "double"),
        _ => Err(reject(raw, "double")),
    }
}

fn to_decimal(raw: &Bson) -> ReaderResult<String> {
    match raw {
        Bson::Decimal128(_) => decimal_text(raw),
        Bson::Int32(v) => Ok(v.to_string()),
        Bson::Int64(v) => Ok(v.to_string()),
        Bson::Double(v) if v.is_finite() => Ok(v.to_string()),
        Bson::String(s) => {
            if !parse_number::<f64>(s, raw, "decimal")?.is_finite() {
                return Err(reject(raw, "decimal"));
            }
            Ok(s.trim().to_string())
        }
        _ => Err(reject(raw, "decimal")),
    }
}

/// Textual form of a Decimal128, taken from its canonical extended JSON rendering.
fn decimal_text(raw: &Bson) -> ReaderResult<String> {
    match raw.clone().into_relaxed_extjson() {
        serde_json::Value::Object(map) => map
            .get("$numberDecimal")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| reject(raw, "decimal")),
        _ => Err(reject(raw, "decimal")),
    }
}

fn to_bool(raw: &Bson) -> ReaderResult<bool> {
    match raw {
        Bson::Boolean(v) => Ok(*v),
        Bson::Int32(0) | Bson::Int64(0) => Ok(false),
        Bson::Int32(1) | Bson::Int64(1) => Ok(true),
        Bson::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(true),
        Bson::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(reject(raw, "boolean")),
    }
}

fn to_date(raw: &Bson) -> ReaderResult<NaiveDate> {
    match raw {
        Bson::DateTime(dt) => Ok(dt.to_chrono().date_naive()),
        Bson::String(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| {
                    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc).date_naive())
                })
                .map_err(|_| reject(raw, "date"))
        }
        _ => Err(reject(raw, "date")),
    }
}

fn to_timestamp(raw: &Bson) -> ReaderResult<DateTime<Utc>> {
    match raw {
        Bson::DateTime(dt) => Ok(dt.to_chrono()),
        Bson::Timestamp(ts) => Utc
            .timestamp_opt(i64::from(ts.time), 0)
            .single()
            .ok_or_else(|| reject(raw, "timestamp")),
        Bson::Int64(millis) => Utc
            .timestamp_millis_opt(*millis)
            .single()
            .ok_or_else(|| reject(raw, "timestamp")),
        Bson::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|_| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|naive| naive.and_utc())
                })
                .map_err(|_| reject(raw, "timestamp"))
        }
        _ => Err(reject(raw, "timestamp")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_resolve_nested_and_array_paths() {
        let d = doc! { "a": { "b": [10, { "c": "deep" }] }, "n": null };
        assert_eq!(resolve_path(&d, "a.b.0"), Some(&Bson::Int32(10)));
        assert_eq!(
            resolve_path(&d, "a.b.1.c"),
            Some(&Bson::String("deep".into()))
        );
        assert_eq!(resolve_path(&d, "a.b.7"), None);
        assert_eq!(resolve_path(&d, "a.x"), None);
        assert_eq!(resolve_path(&d, "n"), None);
    }

    #[test]
    fn test_integral_double_narrows_to_int() {
        let col = ColumnDescriptor::new("x", ColumnType::Int);
        assert_eq!(coerce(&Bson::Double(42.0), &col).unwrap(), Value::Int(42));
        assert!(coerce(&Bson::Double(42.5), &col).is_err());
        assert!(coerce(&Bson::Int64(i64::from(i32::MAX) + 1), &col).is_err());
    }
}

//! Filter text to native MongoDB predicate.
//!
//! The filter is authored outside this crate (usually inside a job file) and treated
//! as opaque: it is parsed once, up front, and shared read-only by every split. Text
//! is accepted as plain JSON or MongoDB Extended JSON, so `{"_id": {"$oid": "..."}}`
//! and `{"ts": {"$gte": {"$date": "2024-01-01T00:00:00Z"}}}` both produce typed BSON.
//!
//! Shell-style text such as `{age: {$gt: 40}}` or `{'name': 'ada'}` is accepted too:
//! anything strict JSON rejects is retried as JSON5 before it is reported.

use crate::error::{ErrorKind, IntoReaderError, ReaderError, ReaderResult};
use bson::{Bson, Document};

/// Parse optional filter text into a query document.
///
/// Absent, empty, or whitespace-only text means "no filter": every document in the
/// collection qualifies.
///
/// # Errors
/// Returns an [`ErrorKind::Configuration`] error if the text is neither JSON nor
/// relaxed shell syntax, is not valid Extended JSON, or does not describe a document
/// at the top level.
pub fn build_filter(text: Option<&str>) -> ReaderResult<Option<Document>> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    let json: serde_json::Value = match serde_json::from_str(text) {
        Ok(json) => json,
        Err(strict) => json5::from_str(text).map_err(|_| {
            ReaderError::configuration("filter is not valid JSON").with_source(strict.to_string())
        })?,
    };
    let bson = Bson::try_from(json).into_reader_error(
        ErrorKind::Configuration,
        "filter is not valid extended JSON",
    )?;

    match bson {
        Bson::Document(doc) => Ok(Some(doc)),
        other => Err(ReaderError::configuration(format!(
            "filter must be a query document, got {:?}",
            other.element_type()
        ))),
    }
}

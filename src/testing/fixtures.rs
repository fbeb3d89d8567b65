//! Pre-built documents and column specs for common scan scenarios.

use crate::error::ReaderResult;
use crate::schema::{ColumnDescriptor, ColumnSpec, ColumnType};
use bson::{doc, oid::ObjectId, DateTime, Document};

/// `n` documents `{ "seq": i, "label": "doc-i" }` for `i` in `0..n`.
///
/// # Example
///
/// ```
/// use ironbeam_mongo::testing::numbered_documents;
///
/// let docs = numbered_documents(3);
/// assert_eq!(docs[2].get_i64("seq").unwrap(), 2);
/// ```
#[must_use]
pub fn numbered_documents(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| doc! { "seq": i as i64, "label": format!("doc-{i}") })
        .collect()
}

/// Column spec `(seq: long, label: string)` matching [`numbered_documents`].
///
/// # Errors
/// Never fails for this fixed spec; the result mirrors [`ColumnSpec::new`].
pub fn numbered_column_spec() -> ReaderResult<ColumnSpec> {
    ColumnSpec::new(vec![
        ColumnDescriptor::new("seq", ColumnType::Long),
        ColumnDescriptor::new("label", ColumnType::String),
    ])
}

/// A small, heterogeneous "people" collection.
///
/// Covers nested documents, arrays, missing fields, explicit nulls, and mixed
/// numeric widths.
#[must_use]
pub fn sample_people_documents() -> Vec<Document> {
    let oid = |hex: &str| ObjectId::parse_str(hex).unwrap_or_default();
    vec![
        doc! {
            "_id": oid("64b7f0a1c2d3e4f5a6b7c8d1"),
            "name": "Ada",
            "age": 36_i32,
            "score": 91.5,
            "active": true,
            "joined": DateTime::from_millis(1_614_816_000_000),
            "address": { "city": "London", "zip": "NW1" },
            "tags": ["math", "engines"],
        },
        doc! {
            "_id": oid("64b7f0a1c2d3e4f5a6b7c8d2"),
            "name": "Alan",
            "age": 41_i64,
            "score": 88,
            "active": false,
            "joined": DateTime::from_millis(1_577_836_800_000),
            "address": { "city": "Manchester" },
            "tags": ["logic"],
        },
        doc! {
            "_id": oid("64b7f0a1c2d3e4f5a6b7c8d3"),
            "name": "Grace",
            "age": 85_i32,
            "score": null,
            "active": true,
            "joined": DateTime::from_millis(1_262_304_000_000),
            "tags": [],
        },
        doc! {
            "_id": oid("64b7f0a1c2d3e4f5a6b7c8d4"),
            "name": "Edsger",
            "active": false,
            "address": { "city": "Nuenen", "zip": "5671" },
        },
    ]
}

/// Column spec over [`sample_people_documents`], one column per supported shape.
///
/// # Errors
/// Never fails for this fixed spec; the result mirrors [`ColumnSpec::new`].
pub fn sample_people_column_spec() -> ReaderResult<ColumnSpec> {
    ColumnSpec::new(vec![
        ColumnDescriptor::new("id", ColumnType::ObjectId).with_path("_id"),
        ColumnDescriptor::new("name", ColumnType::String),
        ColumnDescriptor::new("age", ColumnType::Int),
        ColumnDescriptor::new("score", ColumnType::Double),
        ColumnDescriptor::new("active", ColumnType::Boolean),
        ColumnDescriptor::new("joined", ColumnType::Date),
        ColumnDescriptor::new("city", ColumnType::String).with_path("address.city"),
        ColumnDescriptor::new("tags", ColumnType::String).with_splitter(","),
    ])
}

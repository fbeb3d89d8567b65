//! JSON Lines (JSONL) export of converted rows.
//!
//! Each row is written as one JSON object keyed by column name, in column order:
//!
//! ```text
//! {"name":"ada","age":36,"joined":"2021-03-04"}
//! ```
//!
//! [`write_splits_jsonl_par`] (feature `parallel-io`) writes one part file per split
//! in parallel and joins the parts in split order, so the final file is identical
//! to the sequential output.

use crate::schema::ColumnSpec;
use crate::value::Row;
use anyhow::{Context, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// Borrowed view of a row that serializes as `{column: value, ...}`.
pub struct Record<'a> {
    columns: &'a ColumnSpec,
    row: &'a Row,
}

impl<'a> Record<'a> {
    #[must_use]
    pub const fn new(columns: &'a ColumnSpec, row: &'a Row) -> Self {
        Self { columns, row }
    }
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in self.columns.names().zip(self.row.values()) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    Ok(())
}

fn write_records<W: Write>(w: &mut W, columns: &ColumnSpec, rows: &[Row]) -> Result<()> {
    for (i, row) in rows.iter().enumerate() {
        serde_json::to_writer(&mut *w, &Record::new(columns, row))
            .with_context(|| format!("serialize row #{i}"))?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// Write rows as a JSONL file. Parent directories are created as needed.
///
/// # Returns
/// The number of rows written.
///
/// # Errors
/// Returns an error if the file cannot be created or a row fails to serialize.
pub fn write_rows_jsonl(path: impl AsRef<Path>, columns: &ColumnSpec, rows: &[Row]) -> Result<usize> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    write_records(&mut w, columns, rows).with_context(|| format!("write {}", path.display()))?;
    w.flush()?;
    Ok(rows.len())
}

/// Write per-split row batches in parallel, keeping split order in the final file.
///
/// Each split is serialized to `<path>.jsonl.part<i>` on the rayon pool; the parts
/// are then concatenated in index order and removed.
///
/// # Returns
/// The total number of rows written.
///
/// # Errors
/// Returns an error if a part or the output file cannot be created or written.
#[cfg(feature = "parallel-io")]
pub fn write_splits_jsonl_par(
    path: impl AsRef<Path>,
    columns: &ColumnSpec,
    splits: &[Vec<Row>],
) -> Result<usize> {
    use rayon::prelude::*;
    use std::path::PathBuf;

    let path = path.as_ref();
    ensure_parent(path)?;
    let part_paths: Vec<PathBuf> = (0..splits.len())
        .map(|i| path.with_extension(format!("jsonl.part{i}")))
        .collect();

    part_paths
        .par_iter()
        .zip(splits.par_iter())
        .try_for_each(|(p, rows)| -> Result<()> {
            let f = File::create(p).with_context(|| format!("create {}", p.display()))?;
            let mut w = BufWriter::new(f);
            write_records(&mut w, columns, rows)
                .with_context(|| format!("write {}", p.display()))?;
            w.flush()?;
            Ok(())
        })?;

    let mut out = BufWriter::new(
        File::create(path).with_context(|| format!("create {}", path.display()))?,
    );
    for p in &part_paths {
        let mut r = BufReader::new(File::open(p)?);
        std::io::copy(&mut r, &mut out)?;
    }
    out.flush()?;
    for p in part_paths {
        if let Err(e) = std::fs::remove_file(&p) {
            warn!(part = %p.display(), error = %e, "failed to remove part file");
        }
    }
    Ok(splits.iter().map(Vec::len).sum())
}

/// Read a JSONL file back as JSON objects, skipping blank lines.
///
/// # Errors
/// Returns an error if the file cannot be read or a line is not a JSON object.
pub fn read_jsonl_records(path: impl AsRef<Path>) -> Result<Vec<Map<String, JsonValue>>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for (i, line) in BufReader::new(f).lines().enumerate() {
        let line = line.with_context(|| format!("read line {} in {}", i + 1, path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).with_context(|| {
            format!("parse JSONL line {} in {}: {}", i + 1, path.display(), line)
        })?;
        out.push(record);
    }
    Ok(out)
}

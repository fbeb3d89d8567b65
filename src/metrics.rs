//! Scan metrics.
//!
//! [`ScanMetrics`] is a cheap, clonable handle over a set of atomic counters. One
//! handle is shared by the source and every reader it creates, so the counters
//! aggregate across concurrently running splits.
//!
//! # Example
//!
//! ```no_run
//! use ironbeam_mongo::metrics::ScanMetrics;
//!
//! # fn main() -> anyhow::Result<()> {
//! let metrics = ScanMetrics::new();
//! metrics.record_start();
//! // ... plan and read splits with readers created `.with_metrics(metrics.clone())`
//! metrics.record_end();
//!
//! metrics.print();
//! metrics.save_to_file("scan-metrics.json")?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Thread-safe counters for one collection scan.
#[derive(Clone, Default)]
pub struct ScanMetrics {
    inner: Arc<ScanMetricsInner>,
}

#[derive(Default)]
struct ScanMetricsInner {
    splits_planned: AtomicU64,
    splits_opened: AtomicU64,
    splits_completed: AtomicU64,
    splits_failed: AtomicU64,
    rows_read: AtomicU64,
    conversion_errors: AtomicU64,
    start_time: Mutex<Option<Instant>>,
    end_time: Mutex<Option<Instant>>,
}

const DESCRIPTIONS: [(&str, &str); 6] = [
    ("splits_planned", "Splits produced by the planner"),
    ("splits_opened", "Splits whose cursor was opened"),
    ("splits_completed", "Splits read to the end of their window"),
    ("splits_failed", "Splits that failed to open or read"),
    ("rows_read", "Rows converted and handed to the caller"),
    ("conversion_errors", "Documents rejected by the column spec"),
];

impl ScanMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_plan(&self, n: usize) {
        self.inner
            .splits_planned
            .fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn split_opened(&self) {
        self.inner.splits_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn split_completed(&self) {
        self.inner.splits_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn split_failed(&self, conversion: bool) {
        self.inner.splits_failed.fetch_add(1, Ordering::Relaxed);
        if conversion {
            self.inner.conversion_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn row_read(&self) {
        self.inner.rows_read.fetch_add(1, Ordering::Relaxed);
    }

    /// # Panics
    ///
    /// Panics if the timing mutex is poisoned
    pub fn record_start(&self) {
        *self.inner.start_time.lock().unwrap() = Some(Instant::now());
    }

    /// # Panics
    ///
    /// Panics if the timing mutex is poisoned
    pub fn record_end(&self) {
        *self.inner.end_time.lock().unwrap() = Some(Instant::now());
    }

    /// Elapsed scan time, if both start and end were recorded.
    ///
    /// # Panics
    ///
    /// Panics if the timing mutex is poisoned
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        let start = *self.inner.start_time.lock().unwrap();
        let end = *self.inner.end_time.lock().unwrap();
        match (start, end) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    #[must_use]
    pub fn splits_planned(&self) -> u64 {
        self.inner.splits_planned.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn splits_opened(&self) -> u64 {
        self.inner.splits_opened.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn splits_completed(&self) -> u64 {
        self.inner.splits_completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn conversion_errors(&self) -> u64 {
        self.inner.conversion_errors.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn rows_read(&self) -> u64 {
        self.inner.rows_read.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn splits_failed(&self) -> u64 {
        self.inner.splits_failed.load(Ordering::Relaxed)
    }

    /// Current value of every counter, keyed by name.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, u64> {
        let i = &self.inner;
        [
            ("splits_planned", &i.splits_planned),
            ("splits_opened", &i.splits_opened),
            ("splits_completed", &i.splits_completed),
            ("splits_failed", &i.splits_failed),
            ("rows_read", &i.rows_read),
            ("conversion_errors", &i.conversion_errors),
        ]
        .into_iter()
        .map(|(name, counter)| (name.to_string(), counter.load(Ordering::Relaxed)))
        .collect()
    }

    /// All counters as a JSON object of `{ name: { value, description } }`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let snapshot = self.snapshot();
        let mut metrics_json = serde_json::Map::new();
        for (name, description) in DESCRIPTIONS {
            metrics_json.insert(
                name.to_string(),
                json!({ "value": snapshot.get(name).copied().unwrap_or(0), "description": description }),
            );
        }
        if let Some(elapsed) = self.elapsed() {
            metrics_json.insert(
                "execution_time_ms".to_string(),
                json!({
                    "value": elapsed.as_millis() as u64,
                    "description": "Total scan time in milliseconds",
                }),
            );
        }
        Value::Object(metrics_json)
    }

    /// Print all counters to stdout in a human-readable format.
    pub fn print(&self) {
        println!("\n=========== Scan Metrics ===========");
        if let Some(elapsed) = self.elapsed() {
            println!(
                "Execution Time: {:.3}s ({} ms)",
                elapsed.as_secs_f64(),
                elapsed.as_millis()
            );
            println!("------------------------------------");
        }
        let snapshot = self.snapshot();
        for (name, description) in DESCRIPTIONS {
            println!(
                "{}: {} ({})",
                name,
                snapshot.get(name).copied().unwrap_or(0),
                description
            );
        }
        println!("====================================\n");
    }

    /// Save all counters to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let mut file = File::create(path)?;
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        file.write_all(formatted.as_bytes())?;
        Ok(())
    }
}

//! Error type shared by every reader component.
//!
//! Errors are grouped by [`ErrorKind`] so that a host engine can decide whether a
//! failed split is worth retrying (connection and read failures) or whether the job
//! is misconfigured (configuration and conversion failures). Nothing in this crate
//! swallows an error; every failure propagates to the caller.

use std::error::Error;
use std::fmt;

/// Error raised by planning, reading, or converting a MongoDB split.
#[derive(Debug, Clone)]
pub struct ReaderError {
    pub message: String,
    pub kind: ErrorKind,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed filter text, invalid config, or an unusable column spec.
    Configuration,
    /// The store could not be reached or refused the credentials.
    Connection,
    /// Cursor failure mid-iteration, or a reader used outside its lifecycle.
    Read,
    /// A document field could not be coerced to its declared column type.
    Conversion,
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {source})")?;
        }
        Ok(())
    }
}

impl Error for ReaderError {}

impl ReaderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Read, message)
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conversion, message)
    }
}

pub type ReaderResult<T> = Result<T, ReaderError>;

/// Convert foreign error types into a [`ReaderError`] of a chosen kind.
pub trait IntoReaderError<T> {
    /// Map the error side of a `Result` onto `kind`, prefixing `context`.
    ///
    /// # Errors
    ///
    /// Returns a `ReaderError` with the specified kind if the Result is an error
    fn into_reader_error(self, kind: ErrorKind, context: &str) -> ReaderResult<T>;
}

impl<T, E: Error> IntoReaderError<T> for Result<T, E> {
    fn into_reader_error(self, kind: ErrorKind, context: &str) -> ReaderResult<T> {
        self.map_err(|e| ReaderError::new(kind, context).with_source(e.to_string()))
    }
}

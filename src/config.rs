//! Reader configuration.
//!
//! [`MongoReaderConfig`] is built once (from a job file, a JSON string, or the
//! environment), validated, and then only ever read. Field names follow the reader's
//! job-file conventions:
//!
//! ```json
//! {
//!   "hostPorts": "db1.internal:27017,db2.internal:27017",
//!   "username": "etl",
//!   "password": "secret",
//!   "database": "shop",
//!   "collectionName": "orders",
//!   "column": [
//!     { "name": "_id", "type": "objectid" },
//!     { "name": "total", "type": "double" },
//!     { "name": "city", "type": "string", "path": "shipping.city" }
//!   ],
//!   "filter": "{\"status\": \"paid\"}",
//!   "fetchSize": 1000
//! }
//! ```

use crate::error::{ErrorKind, IntoReaderError, ReaderError, ReaderResult};
use crate::schema::{ColumnDescriptor, ColumnSpec};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

/// Port used for hosts listed without one.
pub const DEFAULT_PORT: u16 = 27017;

static HOST_PORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\[(?P<ipv6>[0-9A-Fa-f:.]+)\]|(?P<host>[A-Za-z0-9._-]+))(?::(?P<port>\d{1,5}))?$")
        .expect("valid host regex")
});

// Characters MongoDB forbids in database names.
static DATABASE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[^/\\. "$*<>:|?]{1,63}$"#).expect("valid database regex"));

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoReaderConfig {
    /// Comma-separated `host[:port]` seed list; IPv6 hosts are bracketed (`[::1]:27017`).
    pub host_ports: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    pub database: String,
    #[serde(alias = "collection")]
    pub collection_name: String,
    #[serde(rename = "column", alias = "columns")]
    pub columns: Vec<ColumnDescriptor>,
    /// Query document text (JSON / Extended JSON); empty means no filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Cursor batch size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_size: Option<u32>,
    /// Database holding the user's credentials; defaults to `database`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_source: Option<String>,
}

impl MongoReaderConfig {
    pub fn new(
        host_ports: impl Into<String>,
        database: impl Into<String>,
        collection_name: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
    ) -> Self {
        Self {
            host_ports: host_ports.into(),
            username: None,
            password: None,
            database: database.into(),
            collection_name: collection_name.into(),
            columns,
            filter: None,
            fetch_size: None,
            auth_source: None,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub const fn with_fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = Some(fetch_size);
        self
    }

    /// Parse a config from JSON text.
    ///
    /// # Errors
    /// Returns a configuration error if the JSON does not match the expected shape.
    pub fn from_json_str(json: &str) -> ReaderResult<Self> {
        serde_json::from_str(json)
            .into_reader_error(ErrorKind::Configuration, "invalid reader config JSON")
    }

    /// Read and parse a JSON config file.
    ///
    /// # Errors
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> ReaderResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).into_reader_error(
            ErrorKind::Configuration,
            &format!("read config {}", path.display()),
        )?;
        Self::from_json_str(&text)
    }

    /// Build a config from `{prefix}*` environment variables.
    ///
    /// Recognised suffixes (case-insensitive): `HOST_PORTS`, `USERNAME`, `PASSWORD`,
    /// `DATABASE`, `COLLECTION`, `COLUMNS` (a JSON array of column descriptors),
    /// `FILTER`, `FETCH_SIZE`, `AUTH_SOURCE`.
    ///
    /// # Errors
    /// Returns a configuration error if a required variable is missing or malformed.
    pub fn from_env(prefix: &str) -> ReaderResult<Self> {
        Self::from_vars(prefix, std::env::vars())
    }

    /// Same as [`from_env`](Self::from_env) over an explicit variable list.
    ///
    /// # Errors
    /// Returns a configuration error if a required variable is missing or malformed.
    pub fn from_vars(
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> ReaderResult<Self> {
        let mut found: HashMap<String, String> = HashMap::new();
        for (key, value) in vars {
            if let Some(name) = key.strip_prefix(prefix) {
                found.insert(name.to_lowercase(), value);
            }
        }
        let mut take = |name: &str| found.remove(name).filter(|v| !v.trim().is_empty());
        let required = |value: Option<String>, name: &str| {
            value.ok_or_else(|| {
                ReaderError::configuration(format!(
                    "missing environment variable {prefix}{}",
                    name.to_uppercase()
                ))
            })
        };

        let host_ports = required(take("host_ports"), "host_ports")?;
        let database = required(take("database"), "database")?;
        let collection_name = required(take("collection"), "collection")?;
        let columns_json = required(take("columns"), "columns")?;
        let columns: Vec<ColumnDescriptor> = serde_json::from_str(&columns_json)
            .into_reader_error(ErrorKind::Configuration, "invalid column list")?;
        let fetch_size = take("fetch_size")
            .map(|v| v.trim().parse::<u32>())
            .transpose()
            .into_reader_error(ErrorKind::Configuration, "invalid fetch size")?;

        Ok(Self {
            host_ports,
            username: take("username"),
            password: take("password"),
            database,
            collection_name,
            columns,
            filter: take("filter"),
            fetch_size,
            auth_source: take("auth_source"),
        })
    }

    /// Check the host list, names, credentials and column spec.
    ///
    /// # Errors
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> ReaderResult<()> {
        self.hosts()?;
        if !DATABASE_NAME.is_match(&self.database) {
            return Err(ReaderError::configuration(format!(
                "invalid database name '{}'",
                self.database
            )));
        }
        validate_collection_name(&self.collection_name)?;
        if self.password.is_some() && self.username.is_none() {
            return Err(ReaderError::configuration(
                "a password was configured without a username",
            ));
        }
        if self.fetch_size == Some(0) {
            return Err(ReaderError::configuration("fetchSize must be positive"));
        }
        self.column_spec()?;
        Ok(())
    }

    /// Parsed seed list as `(host, port)` pairs.
    ///
    /// # Errors
    /// Returns a configuration error if the list is empty or an entry is malformed.
    pub fn hosts(&self) -> ReaderResult<Vec<(String, u16)>> {
        let mut hosts = Vec::new();
        for entry in self.host_ports.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let caps = HOST_PORT.captures(entry).ok_or_else(|| {
                ReaderError::configuration(format!("invalid host entry '{entry}'"))
            })?;
            let port = match caps.name("port") {
                Some(p) => p.as_str().parse::<u16>().map_err(|_| {
                    ReaderError::configuration(format!("invalid port in host entry '{entry}'"))
                })?,
                None => DEFAULT_PORT,
            };
            let host = caps
                .name("host")
                .or_else(|| caps.name("ipv6"))
                .map_or_else(String::new, |m| m.as_str().to_string());
            hosts.push((host, port));
        }
        if hosts.is_empty() {
            return Err(ReaderError::configuration("hostPorts lists no hosts"));
        }
        Ok(hosts)
    }

    /// # Errors
    /// Returns a configuration error if the columns do not form a valid spec.
    pub fn column_spec(&self) -> ReaderResult<ColumnSpec> {
        ColumnSpec::new(self.columns.clone())
    }

    #[must_use]
    pub fn auth_source(&self) -> &str {
        self.auth_source.as_deref().unwrap_or(&self.database)
    }

    /// `hosts/database.collection`, safe for logs.
    #[must_use]
    pub fn describe_target(&self) -> String {
        format!(
            "mongodb://{}/{}.{}",
            self.host_ports, self.database, self.collection_name
        )
    }
}

impl fmt::Debug for MongoReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoReaderConfig")
            .field("host_ports", &self.host_ports)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("collection_name", &self.collection_name)
            .field("columns", &self.columns)
            .field("filter", &self.filter)
            .field("fetch_size", &self.fetch_size)
            .field("auth_source", &self.auth_source)
            .finish()
    }
}

fn validate_collection_name(name: &str) -> ReaderResult<()> {
    if name.is_empty() {
        return Err(ReaderError::configuration("collection name cannot be empty"));
    }
    if name.contains('$') || name.contains('\0') {
        return Err(ReaderError::configuration(format!(
            "collection name '{name}' contains invalid characters"
        )));
    }
    if name.starts_with("system.") {
        return Err(ReaderError::configuration(format!(
            "collection name '{name}' is reserved"
        )));
    }
    Ok(())
}

use anyhow::Result;
use ironbeam_mongo::config::DEFAULT_PORT;
use ironbeam_mongo::{ColumnType, ErrorKind, MongoReaderConfig};
use std::fs;

const JOB: &str = r#"{
    "hostPorts": "db1.internal:27018, db2.internal",
    "username": "etl",
    "password": "s3cret",
    "database": "shop",
    "collectionName": "orders",
    "column": [
        { "name": "id", "type": "objectid", "path": "_id" },
        { "name": "total", "type": "double" },
        { "name": "items", "type": "varchar", "splitter": ";" },
        { "name": "origin", "type": "string", "value": "mongo" }
    ],
    "filter": "{\"status\": \"paid\"}",
    "fetchSize": 500
}"#;

#[test]
fn parses_job_file_fields() -> Result<()> {
    let config = MongoReaderConfig::from_json_str(JOB)?;
    config.validate()?;
    assert_eq!(config.collection_name, "orders");
    assert_eq!(config.fetch_size, Some(500));
    assert_eq!(config.auth_source(), "shop");
    assert_eq!(
        config.hosts()?,
        vec![
            ("db1.internal".to_string(), 27018),
            ("db2.internal".to_string(), DEFAULT_PORT),
        ]
    );

    let spec = config.column_spec()?;
    assert_eq!(spec.names().collect::<Vec<_>>(), ["id", "total", "items", "origin"]);
    assert_eq!(spec[2].column_type, ColumnType::String);
    assert_eq!(spec[0].field_path(), "_id");
    assert_eq!(spec[3].value.as_deref(), Some("mongo"));
    Ok(())
}

#[test]
fn loads_from_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("job.json");
    fs::write(&path, JOB)?;
    let config = MongoReaderConfig::from_json_file(&path)?;
    assert_eq!(config.database, "shop");

    let missing = MongoReaderConfig::from_json_file(dir.path().join("nope.json")).unwrap_err();
    assert_eq!(missing.kind, ErrorKind::Configuration);
    Ok(())
}

#[test]
fn accepts_alternate_field_names() -> Result<()> {
    let config = MongoReaderConfig::from_json_str(
        r#"{"hostPorts": "h", "database": "d", "collection": "c",
            "columns": [{"name": "n", "type": "bigint"}]}"#,
    )?;
    assert_eq!(config.collection_name, "c");
    assert_eq!(config.columns[0].column_type, ColumnType::Long);
    Ok(())
}

#[test]
fn malformed_json_is_configuration_error() {
    let err = MongoReaderConfig::from_json_str(r#"{"hostPorts": 5}"#).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[test]
fn password_never_leaks() -> Result<()> {
    let config = MongoReaderConfig::from_json_str(JOB)?;
    let debug = format!("{config:?}");
    assert!(!debug.contains("s3cret"), "{debug}");
    assert!(debug.contains("<redacted>"));

    let json = serde_json::to_string(&config)?;
    assert!(!json.contains("s3cret"), "{json}");
    assert!(!config.describe_target().contains("s3cret"));
    Ok(())
}

#[test]
fn validate_rejects_bad_values() -> Result<()> {
    let base = MongoReaderConfig::from_json_str(JOB)?;

    let mut bad_host = base.clone();
    bad_host.host_ports = "db1:notaport".into();
    let mut no_hosts = base.clone();
    no_hosts.host_ports = " , ".into();
    let mut bad_db = base.clone();
    bad_db.database = "shop.prod".into();
    let mut reserved = base.clone();
    reserved.collection_name = "system.profile".into();
    let mut dollar = base.clone();
    dollar.collection_name = "orders$x".into();
    let mut orphan_password = base.clone();
    orphan_password.username = None;
    let mut zero_fetch = base.clone();
    zero_fetch.fetch_size = Some(0);
    let mut no_columns = base.clone();
    no_columns.columns.clear();
    let mut dup_columns = base.clone();
    dup_columns.columns.push(base.columns[0].clone());

    for (label, config) in [
        ("bad host", bad_host),
        ("no hosts", no_hosts),
        ("bad database", bad_db),
        ("reserved collection", reserved),
        ("dollar collection", dollar),
        ("password without user", orphan_password),
        ("zero fetch size", zero_fetch),
        ("no columns", no_columns),
        ("duplicate columns", dup_columns),
    ] {
        let err = config.validate().expect_err(label);
        assert_eq!(err.kind, ErrorKind::Configuration, "{label}");
    }
    Ok(())
}

#[test]
fn bracketed_ipv6_hosts_are_accepted() -> Result<()> {
    let mut config = MongoReaderConfig::from_json_str(JOB)?;
    config.host_ports = "[::1]:27019, [fe80::2], db3".into();
    config.validate()?;
    assert_eq!(
        config.hosts()?,
        vec![
            ("::1".to_string(), 27019),
            ("fe80::2".to_string(), DEFAULT_PORT),
            ("db3".to_string(), DEFAULT_PORT),
        ]
    );

    config.host_ports = "[::1".into();
    assert_eq!(config.hosts().unwrap_err().kind, ErrorKind::Configuration);
    Ok(())
}

#[test]
fn constant_that_does_not_fit_its_type_fails_validation() -> Result<()> {
    let config = MongoReaderConfig::from_json_str(
        r#"{"hostPorts": "h", "database": "d", "collectionName": "c",
            "column": [{"name": "batch", "type": "int", "value": "not-an-int"}]}"#,
    )?;
    let err = config.validate().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
    assert!(err.message.contains("batch"), "{}", err.message);
    Ok(())
}

#[test]
fn splitter_requires_string_column() -> Result<()> {
    let config = MongoReaderConfig::from_json_str(
        r#"{"hostPorts": "h", "database": "d", "collectionName": "c",
            "column": [{"name": "n", "type": "long", "splitter": ","}]}"#,
    )?;
    assert_eq!(config.validate().unwrap_err().kind, ErrorKind::Configuration);
    Ok(())
}

#[test]
fn builds_from_prefixed_variables() -> Result<()> {
    let vars = [
        ("JOB_MONGO_HOST_PORTS", "mongo:27017"),
        ("JOB_MONGO_DATABASE", "analytics"),
        ("JOB_MONGO_COLLECTION", "events"),
        ("JOB_MONGO_COLUMNS", r#"[{"name": "kind", "type": "string"}]"#),
        ("JOB_MONGO_FETCH_SIZE", "64"),
        ("JOB_MONGO_AUTH_SOURCE", "admin"),
        ("JOB_MONGO_FILTER", ""),
        ("OTHER_DATABASE", "ignored"),
    ]
    .map(|(k, v)| (k.to_string(), v.to_string()));

    let config = MongoReaderConfig::from_vars("JOB_MONGO_", vars)?;
    config.validate()?;
    assert_eq!(config.database, "analytics");
    assert_eq!(config.collection_name, "events");
    assert_eq!(config.fetch_size, Some(64));
    assert_eq!(config.auth_source(), "admin");
    assert_eq!(config.filter, None);
    Ok(())
}

#[test]
fn missing_required_variable_is_named() {
    let vars = [("JOB_DATABASE".to_string(), "analytics".to_string())];
    let err = MongoReaderConfig::from_vars("JOB_", vars).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
    assert!(err.message.contains("JOB_HOST_PORTS"), "{}", err.message);
}

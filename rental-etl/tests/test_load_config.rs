use rental_etl::load_config::{load_config, SinkKind, DEFAULT_DATABASE};
use rental_etl::mongo::{MongoSettings, DEFAULT_HOST, DEFAULT_PORT};
use rental_etl_core::load::{EmptyInputPolicy, LoadStrategy, DEFAULT_COLLECTION};
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

/// A full config maps every key onto the typed config.
#[test]
fn test_load_config_all_keys() {
    let file = config_file(
        r#"
clean:
  raw_path: data/listings_Paris.csv
  canonical_path: data/cleaned_listings.csv
load:
  sink: memory
  database: staging_db
  collection: paris_listings
  strategy: stage_and_swap
  on_empty_input: skip
  timeout_secs: 5
"#,
    );

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.clean.raw_path, PathBuf::from("data/listings_Paris.csv"));
    assert_eq!(
        config.clean.canonical_path,
        PathBuf::from("data/cleaned_listings.csv")
    );
    assert_eq!(config.load.sink, SinkKind::Memory);
    assert_eq!(config.load.database, "staging_db");
    assert_eq!(config.load.timeout(), Some(Duration::from_secs(5)));
    assert_eq!(config.load.policy.collection, "paris_listings");
    assert_eq!(config.load.policy.strategy, LoadStrategy::StageAndSwap);
    assert_eq!(config.load.policy.on_empty_input, EmptyInputPolicy::Skip);

    let pipeline = config.pipeline();
    assert_eq!(pipeline.clean, config.clean);
    assert_eq!(pipeline.load, config.load.policy);
}

/// Everything under `load` is optional.
#[test]
fn test_load_config_defaults() {
    let file = config_file(
        r#"
clean:
  raw_path: in.csv
  canonical_path: out.csv
"#,
    );

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.load.sink, SinkKind::Mongo);
    assert_eq!(config.load.database, DEFAULT_DATABASE);
    assert_eq!(config.load.timeout(), None);
    assert_eq!(config.load.policy.collection, DEFAULT_COLLECTION);
    assert_eq!(config.load.policy.strategy, LoadStrategy::ClearThenInsert);
    assert_eq!(config.load.policy.on_empty_input, EmptyInputPolicy::Clear);
}

#[test]
fn test_load_config_missing_file() {
    let err = load_config("/definitely/not/here/config.yaml").expect_err("Must fail");
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_load_config_rejects_unknown_strategy() {
    let file = config_file(
        r#"
clean:
  raw_path: in.csv
  canonical_path: out.csv
load:
  strategy: upsert
"#,
    );
    let err = load_config(file.path()).expect_err("Unknown strategy must fail");
    assert!(err.to_string().contains("Failed to parse config YAML"));
}

#[test]
fn test_load_config_requires_clean_section() {
    let file = config_file("load:\n  sink: memory\n");
    assert!(load_config(file.path()).is_err());
}

#[test]
#[serial]
fn test_mongo_settings_from_env() {
    env::set_var("MONGO_USER", "etl");
    env::set_var("MONGO_PASS", "secret");
    env::remove_var("MONGO_HOST");
    env::remove_var("MONGO_PORT");

    let settings = MongoSettings::from_env().expect("Settings should load");
    assert_eq!(settings.user, "etl");
    assert_eq!(settings.password, "secret");
    assert_eq!(settings.host, DEFAULT_HOST);
    assert_eq!(settings.port, DEFAULT_PORT);

    env::set_var("MONGO_HOST", "mongo.internal");
    env::set_var("MONGO_PORT", "27018");
    let settings = MongoSettings::from_env().expect("Settings should load");
    assert_eq!(settings.host, "mongo.internal");
    assert_eq!(settings.port, 27018);

    env::remove_var("MONGO_HOST");
    env::remove_var("MONGO_PORT");
}

#[test]
#[serial]
fn test_mongo_settings_require_credentials() {
    env::remove_var("MONGO_USER");
    env::set_var("MONGO_PASS", "secret");
    let err = MongoSettings::from_env().expect_err("Missing user must fail");
    assert!(err.to_string().contains("MONGO_USER"));

    env::set_var("MONGO_USER", "etl");
    env::remove_var("MONGO_PASS");
    let err = MongoSettings::from_env().expect_err("Missing password must fail");
    assert!(err.to_string().contains("MONGO_PASS"));

    env::set_var("MONGO_PASS", "secret");
    env::set_var("MONGO_PORT", "not-a-port");
    let err = MongoSettings::from_env().expect_err("Bad port must fail");
    assert!(err.to_string().contains("MONGO_PORT"));

    env::remove_var("MONGO_USER");
    env::remove_var("MONGO_PASS");
    env::remove_var("MONGO_PORT");
}

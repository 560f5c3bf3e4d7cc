use std::fs;

use rental_etl_core::clean::clean_records;
use rental_etl_core::error::PipelineError;
use rental_etl_core::tabular::{read_canonical, read_raw_records, write_canonical};
use tempfile::tempdir;

const RAW_CSV: &str = "\
id,name,price,amenities,host_is_superhost,last_review,latitude,longitude,scrape_id
101,\"Loft, canal view\",\"$1,050.00\",\"[\"\"Wifi\"\", \"\"Washer\"\"]\",t,2024-03-01,48.87,2.36,2024
102,Studio,$75.00,[],f,,,,2024
";

#[test]
fn test_raw_read_keeps_every_row_and_column() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("listings.csv");
    fs::write(&path, RAW_CSV).unwrap();

    let records = read_raw_records(&path).expect("Raw read should succeed");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("name"), Some("Loft, canal view"));
    assert_eq!(records[0].get("price"), Some("$1,050.00"));
    assert_eq!(records[0].get("amenities"), Some(r#"["Wifi", "Washer"]"#));
    assert_eq!(records[0].get("scrape_id"), Some("2024"));
    assert_eq!(records[1].get("last_review"), None, "Blank cells read as missing");
}

#[test]
fn test_raw_read_replaces_invalid_utf8() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("latin1.csv");
    let mut bytes = b"id,price,name\n1,$10,Caf".to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(b" du coin\n");
    fs::write(&path, bytes).unwrap();

    let records = read_raw_records(&path).expect("Invalid bytes must not fail the read");
    assert_eq!(records[0].get("name"), Some("Caf\u{FFFD} du coin"));
}

#[test]
fn test_short_rows_lack_trailing_columns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ragged.csv");
    fs::write(&path, "id,price,name\n1,$10\n").unwrap();

    let records = read_raw_records(&path).expect("Ragged rows should be tolerated");
    assert_eq!(records[0].get("price"), Some("$10"));
    assert_eq!(records[0].get("name"), None);
}

#[test]
fn test_missing_source_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.csv");

    match read_raw_records(&path) {
        Err(PipelineError::SourceNotFound(missing)) => assert_eq!(missing, path),
        other => panic!("Expected SourceNotFound, got {other:?}"),
    }
    assert!(matches!(
        read_canonical(&path),
        Err(PipelineError::SourceNotFound(_))
    ));
}

#[test]
fn test_canonical_file_round_trips() {
    let dir = tempdir().unwrap();
    let raw_path = dir.path().join("listings.csv");
    let canonical_path = dir.path().join("out").join("listings_clean.csv");
    fs::write(&raw_path, RAW_CSV).unwrap();

    let cleaned = clean_records(read_raw_records(&raw_path).unwrap());
    assert_eq!(cleaned.records.len(), 2);
    write_canonical(&canonical_path, &cleaned.records).expect("Write should succeed");

    let reread = read_canonical(&canonical_path).expect("Read back should succeed");
    assert_eq!(reread, cleaned.records);
    assert_eq!(reread[0].amenities, vec!["Wifi", "Washer"]);
    assert_eq!(reread[0].price, 1050.0);
    assert!(reread[1].amenities.is_empty());
    assert_eq!(reread[1].last_review, None);
}

#[test]
fn test_canonical_write_overwrites_previous_file() {
    let dir = tempdir().unwrap();
    let raw_path = dir.path().join("listings.csv");
    let canonical_path = dir.path().join("listings_clean.csv");
    fs::write(&raw_path, RAW_CSV).unwrap();
    let cleaned = clean_records(read_raw_records(&raw_path).unwrap());

    write_canonical(&canonical_path, &cleaned.records).unwrap();
    write_canonical(&canonical_path, &cleaned.records[..1]).unwrap();

    let reread = read_canonical(&canonical_path).unwrap();
    assert_eq!(reread.len(), 1);
    assert_eq!(reread[0].id, Some(101));
}

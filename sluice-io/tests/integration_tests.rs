//! End-to-end file conversion tests

use flate2::read::GzDecoder;
use serde_json::json;
use sluice_io::{convert, convert_file, Algorithm, ConvertOptions, RecordFormat};
use std::io::{Cursor, Read, Write};

fn comments_json() -> Vec<u8> {
    serde_json::to_vec(&json!([
        {"postId": 1, "id": 10, "name": "alpha", "body": "first comment"},
        {"postId": 1, "id": 11, "name": "beta", "body": "second comment"},
        {"postId": 2, "id": 12, "name": "gamma", "body": "third comment"}
    ]))
    .unwrap()
}

fn fields(names: &[&str]) -> Option<Vec<String>> {
    Some(names.iter().map(|name| name.to_string()).collect())
}

#[test]
fn test_json_to_csv_projection() {
    let opts = ConvertOptions {
        format: RecordFormat::Csv,
        fields: fields(&["postId", "name", "body"]),
        ..ConvertOptions::default()
    };

    let mut output = Vec::new();
    let summary = convert(Cursor::new(comments_json()), &mut output, &opts).unwrap();

    assert_eq!(summary.records, 3);
    let text = String::from_utf8(output).unwrap();
    assert_eq!(
        text,
        "1;\"alpha\";\"first comment\"\n\
         1;\"beta\";\"second comment\"\n\
         2;\"gamma\";\"third comment\"\n"
    );
}

#[test]
fn test_json_to_csv_gzip() {
    let opts = ConvertOptions {
        format: RecordFormat::Csv,
        fields: fields(&["name"]),
        archive: Some(Algorithm::Gzip),
        ..ConvertOptions::default()
    };

    let mut output = Vec::new();
    convert(Cursor::new(comments_json()), &mut output, &opts).unwrap();

    let mut unpacked = String::new();
    GzDecoder::new(Cursor::new(output))
        .read_to_string(&mut unpacked)
        .unwrap();
    assert_eq!(unpacked, "\"alpha\"\n\"beta\"\n\"gamma\"\n");
}

#[test]
fn test_json_passthrough_is_valid_array() {
    let opts = ConvertOptions {
        format: RecordFormat::Json,
        ..ConvertOptions::default()
    };

    let mut output = Vec::new();
    convert(Cursor::new(comments_json()), &mut output, &opts).unwrap();

    let reparsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let original: serde_json::Value = serde_json::from_slice(&comments_json()).unwrap();
    assert_eq!(reparsed, original);
}

#[test]
fn test_convert_file_paths() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("comments.json");
    let output_path = dir.path().join("comments.csv");

    std::fs::File::create(&input_path)
        .unwrap()
        .write_all(&comments_json())
        .unwrap();

    let opts = ConvertOptions {
        format: RecordFormat::Csv,
        fields: fields(&["id"]),
        delimiter: ",".to_string(),
        ..ConvertOptions::default()
    };
    let summary = convert_file(&input_path, &output_path, &opts).unwrap();

    assert_eq!(summary.records, 3);
    assert_eq!(
        std::fs::read_to_string(&output_path).unwrap(),
        "10\n11\n12\n"
    );
}

#[test]
fn test_truncated_input_fails() {
    let opts = ConvertOptions::default();
    let mut output = Vec::new();
    let truncated = &comments_json()[..40];
    assert!(convert(Cursor::new(truncated.to_vec()), &mut output, &opts).is_err());
}

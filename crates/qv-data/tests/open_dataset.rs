//! Integration tests: load a specification from disk and resolve queries.

use qv_core::{ParamValue, QueryMode};
use qv_data::{Database, DataError, DiagnosticKind, SpecADatabase};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn write_spec(dir: &TempDir, document: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.path().join("info.json");
    fs::write(&path, serde_json::to_string_pretty(document).unwrap()).unwrap();
    path
}

fn grid_document() -> serde_json::Value {
    json!({
        "arguments": {
            "a": { "label": "A", "type": "range", "values": [2, 1], "default": 1 },
            "b": { "label": "B", "type": "range", "values": [20, 10], "default": 10 },
            "c": { "label": "C", "type": "set", "values": ["x", "y"], "default": "y" }
        },
        "metadata": { "camera": "orbit" },
        "name_pattern": "{c}/img_{a}_{b}_{a}.png"
    })
}

#[tokio::test]
async fn test_open_resolves_relative_to_document() {
    let dir = TempDir::new().unwrap();
    let path = write_spec(&dir, &grid_document());

    let db = SpecADatabase::open(&path).await.unwrap();
    let qs = db.query_set().unwrap();
    let result = db.resolve(&qs).unwrap();

    let base = format!("{}/", dir.path().to_string_lossy());
    assert_eq!(result.single().unwrap().address, format!("{}y/img_1_10_1.png", base));
    assert_eq!(db.spec().unwrap().metadata, json!({ "camera": "orbit" }));
}

#[tokio::test]
async fn test_matrix_grid() {
    let dir = TempDir::new().unwrap();
    let path = write_spec(&dir, &grid_document());
    let db = SpecADatabase::open(&path).await.unwrap();
    let qs = db.query_set().unwrap();

    qs.set_matrix_axes("a", "b").unwrap();
    qs.parameter("a").unwrap().select_index_range(0, 1).unwrap();
    qs.parameter("b").unwrap().select_index_range(0, 1).unwrap();

    let result = db.resolve(&qs).unwrap();
    let matrix = result.matrix().unwrap();
    assert_eq!(matrix.cell_count(), 4);

    let base = format!("{}/", dir.path().to_string_lossy());
    for (a, b) in [(1, 10), (1, 20), (2, 10), (2, 20)] {
        let descriptor = matrix.get(&ParamValue::from(a), &ParamValue::from(b)).unwrap();
        assert_eq!(descriptor.address, format!("{}y/img_{}_{}_{}.png", base, a, b, a));
    }

    assert_eq!(
        result.snapshot.mode,
        QueryMode::Matrix { axis1: "a".into(), axis2: "b".into() }
    );
}

#[tokio::test]
async fn test_invalid_document_reports_problems() {
    let dir = TempDir::new().unwrap();
    let path = write_spec(
        &dir,
        &json!({
            "arguments": { "a": { "label": "A", "type": "range", "values": [1], "default": 1 } },
            "metadata": {},
            "name_pattern": "{a}_{missing}.png"
        }),
    );

    match SpecADatabase::open(&path).await {
        Err(DataError::InvalidSpec(diagnostics)) => {
            assert_eq!(diagnostics.len(), 1);
            assert_eq!(diagnostics[0].kind, DiagnosticKind::UnknownPlaceholder);
        }
        other => panic!("expected an invalid specification, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_name_pattern() {
    let dir = TempDir::new().unwrap();
    let path = write_spec(&dir, &json!({ "arguments": {}, "metadata": {} }));
    assert!(matches!(SpecADatabase::open(&path).await, Err(DataError::InvalidSpec(_))));
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result = SpecADatabase::open(dir.path().join("absent.json")).await;
    assert!(matches!(result, Err(DataError::Io(_))));
}
